// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

//! Optional fixed-size fields that precede the unpack data of secondary
//! index values. Each set bit of an index's flag word reserves one field,
//! laid out in bit order.

/// Bytes of the TTL timestamp field.
pub const TTL_RECORD_SIZE: usize = 8;

const FLAG_LENGTHS: [usize; 1] = [TTL_RECORD_SIZE];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum IndexFlag {
	Ttl = 1,
}

impl IndexFlag {
	pub fn bit(self) -> u32 {
		self as u32
	}

	pub fn is_set(self, flags: u32) -> bool {
		flags & self.bit() != 0
	}
}

/// Offset and length of the field of `flag`, given the flag word of an
/// index. `None` asks for the combined length of all fields.
pub fn index_flag_offset(flags: u32, flag: Option<IndexFlag>) -> (usize, usize) {
	let mut offset = 0;
	for (bit, len) in FLAG_LENGTHS.iter().enumerate() {
		let mask = 1u32 << bit;
		if flag.is_some_and(|flag| flag.bit() & mask != 0) {
			return (offset, *len);
		}
		if flags & mask != 0 {
			offset += len;
		}
	}
	(offset, 0)
}

/// Bytes reserved for all flag fields.
pub fn total_flags_length(flags: u32) -> usize {
	index_flag_offset(flags, None).0
}
