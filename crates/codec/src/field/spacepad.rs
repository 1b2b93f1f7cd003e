// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

//! Segmented encoding for data compared as if padded with spaces.
//!
//! The weight string is cut into segments of `segment_size - 1` bytes plus a
//! marker byte telling how the rest of the string compares against an
//! endless run of spaces. The final segment is padded with the space weight
//! and marked [`EQUAL`]. Trailing spaces of the value never reach the key, so
//! `"a"` and `"a  "` share their image.

use std::cmp::Ordering;

use rowkey_core::{
	Result,
	error::diagnostic::codec::CodecError,
	netbuf::{NetReader, NetWriter},
	return_error,
};

pub(super) const LESS: u8 = 1;
pub(super) const EQUAL: u8 = 2;
pub(super) const GREATER: u8 = 3;

/// Counts below this mean "some padding is not real", above it "spaces were
/// trimmed beyond the padding".
pub(super) const TRIMMED_CHARS_OFFSET: usize = 8;

/// What [`pack`] put into the key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) struct Packed {
	/// Weight bytes copied from the input.
	pub consumed: usize,
	/// Space weight bytes appended to fill the final segment.
	pub padding: usize,
}

/// Maximum image size for a weight string of up to `xfrm_len` bytes.
pub(super) fn max_image_len(xfrm_len: usize, segment_size: usize, extra_segments: usize) -> usize {
	(xfrm_len / (segment_size - 1) + extra_segments) * segment_size
}

fn compare_with_spaces(rest: &[u8], space: &[u8]) -> Ordering {
	for (idx, b) in rest.iter().enumerate() {
		match b.cmp(&space[idx % space.len()]) {
			Ordering::Equal => continue,
			other => return other,
		}
	}
	Ordering::Equal
}

pub(super) fn pack(weights: &[u8], segment_size: usize, space: &[u8], out: &mut NetWriter) -> Packed {
	let payload = segment_size - 1;
	let mut pos = 0;
	loop {
		let copy = payload.min(weights.len() - pos);
		out.write(&weights[pos..pos + copy]);
		pos += copy;

		let padding = payload - copy;
		if padding > 0 {
			out.write(&space.iter().copied().cycle().take(padding).collect::<Vec<u8>>());
			out.write_u8(EQUAL);
			return Packed {
				consumed: pos,
				padding,
			};
		}

		match compare_with_spaces(&weights[pos..], space) {
			Ordering::Less => out.write_u8(LESS),
			Ordering::Greater => out.write_u8(GREATER),
			Ordering::Equal => {
				out.write_u8(EQUAL);
				return Packed {
					consumed: pos,
					padding: 0,
				};
			}
		}
	}
}

pub(super) fn write_count(out: &mut NetWriter, two_bytes: bool, count: usize) {
	if two_bytes {
		out.write_u16(count as u16);
	} else {
		out.write_u8(count as u8);
	}
}

/// Reads the trimmed-space count, returning `(padding_chars, extra_spaces)`.
pub(super) fn read_count(reader: &mut NetReader<'_>, two_bytes: bool) -> Result<(usize, usize)> {
	let count = if two_bytes {
		reader.read_u16().map(|v| v as usize)
	} else {
		reader.read_u8().map(|v| v as usize)
	};
	match count {
		Some(count) if count <= TRIMMED_CHARS_OFFSET => Ok((TRIMMED_CHARS_OFFSET - count, 0)),
		Some(count) => Ok((0, count - TRIMMED_CHARS_OFFSET)),
		None => return_error!(CodecError::corrupted("unpack info ends before the trimmed space count")),
	}
}

fn segment<'a>(reader: &mut NetReader<'a>, segment_size: usize) -> Result<(&'a [u8], u8)> {
	match reader.read(segment_size) {
		Some(seg) => Ok((&seg[..segment_size - 1], seg[segment_size - 1])),
		None => return_error!(CodecError::corrupted("key ends inside a space-padded segment")),
	}
}

/// Collects the weight bytes of one value, leaving out `padding_bytes` of
/// the final segment.
pub(super) fn unpack(reader: &mut NetReader<'_>, segment_size: usize, padding_bytes: usize) -> Result<Vec<u8>> {
	let mut out = Vec::new();
	loop {
		let (data, marker) = segment(reader, segment_size)?;
		match marker {
			EQUAL => {
				if padding_bytes > data.len() {
					return_error!(CodecError::corrupted(format!(
						"{} padding bytes do not fit a {} byte segment",
						padding_bytes,
						data.len()
					)));
				}
				out.extend_from_slice(&data[..data.len() - padding_bytes]);
				return Ok(out);
			}
			LESS | GREATER => out.extend_from_slice(data),
			other => return_error!(CodecError::corrupted(format!("invalid segment marker {}", other))),
		}
	}
}

pub(super) fn skip(reader: &mut NetReader<'_>, segment_size: usize) -> Result<()> {
	loop {
		match segment(reader, segment_size)?.1 {
			EQUAL => return Ok(()),
			LESS | GREATER => continue,
			other => return_error!(CodecError::corrupted(format!("invalid segment marker {}", other))),
		}
	}
}
