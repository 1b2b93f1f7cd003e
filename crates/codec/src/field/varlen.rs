// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

//! Variable-length escaping for data compared without space padding.
//!
//! Data is cut into 8 byte groups, each followed by a flag byte. The current
//! format flags a group that is followed by more data with 9 and the final
//! group with its used byte count. The legacy format flags every group with
//! `255 - padding` and always ends on a partially filled group, so input that
//! is an exact multiple of 8 bytes carries an extra all-padding group.

use rowkey_core::{
	Result,
	error::diagnostic::codec::CodecError,
	netbuf::{NetReader, NetWriter},
	return_error,
};

const GROUP: usize = 8;
const ESCAPE_LENGTH: u8 = 9;
const LEGACY_FULL: u8 = 255;

/// Maximum encoded size of `len` bytes.
pub(super) fn encoded_size(len: usize, legacy: bool) -> usize {
	if legacy {
		(len / GROUP + 1) * (GROUP + 1)
	} else {
		len.div_ceil(GROUP).max(1) * (GROUP + 1)
	}
}

pub(super) fn pack(src: &[u8], legacy: bool, out: &mut NetWriter) {
	let mut rest = src;
	loop {
		let copy = rest.len().min(GROUP);
		out.write(&rest[..copy]);
		out.allocate(GROUP - copy);
		rest = &rest[copy..];

		if legacy {
			let padding = GROUP - copy;
			out.write_u8(LEGACY_FULL - padding as u8);
			if padding != 0 {
				break;
			}
		} else if rest.is_empty() {
			out.write_u8(copy as u8);
			break;
		} else {
			out.write_u8(ESCAPE_LENGTH);
		}
	}
}

/// Used bytes of a group and whether it is the last one.
fn group_usage(flag: u8, legacy: bool) -> Result<(usize, bool)> {
	if legacy {
		let used = GROUP as i32 - (LEGACY_FULL as i32 - flag as i32);
		if !(0..=GROUP as i32).contains(&used) {
			return_error!(CodecError::corrupted(format!("invalid legacy group flag {}", flag)));
		}
		Ok((used as usize, used < GROUP as i32))
	} else {
		if flag > ESCAPE_LENGTH {
			return_error!(CodecError::corrupted(format!("invalid group flag {}", flag)));
		}
		if flag == ESCAPE_LENGTH {
			Ok((GROUP, false))
		} else {
			Ok((flag as usize, true))
		}
	}
}

fn walk(reader: &mut NetReader<'_>, legacy: bool, mut out: Option<&mut Vec<u8>>) -> Result<()> {
	loop {
		let group = match reader.read(GROUP + 1) {
			Some(group) => group,
			None => return_error!(CodecError::corrupted("key ends inside a variable-length group")),
		};
		let (used, last) = group_usage(group[GROUP], legacy)?;
		if let Some(out) = out.as_deref_mut() {
			out.extend_from_slice(&group[..used]);
		}
		if last {
			return Ok(());
		}
	}
}

pub(super) fn unpack(reader: &mut NetReader<'_>, legacy: bool) -> Result<Vec<u8>> {
	let mut out = Vec::new();
	walk(reader, legacy, Some(&mut out))?;
	Ok(out)
}

pub(super) fn skip(reader: &mut NetReader<'_>, legacy: bool) -> Result<()> {
	walk(reader, legacy, None)
}
