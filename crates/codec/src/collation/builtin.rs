// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use super::{CollationDef, PadAttribute, Weigher};

pub const LATIN1_SWEDISH_CI_ID: u32 = 8;
pub const UTF8MB3_GENERAL_CI_ID: u32 = 33;
pub const UTF8MB4_GENERAL_CI_ID: u32 = 45;
pub const UTF8MB4_BIN_ID: u32 = 46;
pub const LATIN1_BIN_ID: u32 = 47;
pub const BINARY_COLLATION_ID: u32 = 63;
pub const UTF8MB3_BIN_ID: u32 = 83;

const LATIN1_SWEDISH_HIGH: [u8; 64] = [
	65, 65, 65, 65, 92, 91, 92, 67, 69, 69, 69, 69, 73, 73, 73, 73, //
	68, 78, 79, 79, 79, 79, 93, 215, 216, 85, 85, 85, 89, 89, 222, 223, //
	65, 65, 65, 65, 92, 91, 92, 67, 69, 69, 69, 69, 73, 73, 73, 73, //
	68, 78, 79, 79, 79, 79, 93, 247, 216, 85, 85, 85, 89, 89, 222, 255,
];

fn latin1_swedish_sort_order() -> Vec<u8> {
	let mut table: Vec<u8> = (0..=255u8).collect();
	for byte in b'a'..=b'z' {
		table[byte as usize] = byte.to_ascii_uppercase();
	}
	table[0xC0..].copy_from_slice(&LATIN1_SWEDISH_HIGH);
	table
}

fn def(id: u32, name: &str, mbmaxlen: u8, weigher: Weigher) -> CollationDef {
	CollationDef {
		id,
		name: name.to_string(),
		mbminlen: 1,
		mbmaxlen,
		weigher,
		pad: PadAttribute::PadSpace,
		levels: 1,
		reversible: false,
	}
}

pub(super) fn definitions() -> Vec<CollationDef> {
	let general_ci = Weigher::Unicode {
		weight_len: 2,
		case_insensitive: true,
	};
	vec![
		CollationDef {
			pad: PadAttribute::NoPad,
			..def(BINARY_COLLATION_ID, "binary", 1, Weigher::Binary)
		},
		CollationDef {
			reversible: true,
			..def(
				LATIN1_SWEDISH_CI_ID,
				"latin1_swedish_ci",
				1,
				Weigher::SortTable {
					sort_order: latin1_swedish_sort_order(),
				},
			)
		},
		def(LATIN1_BIN_ID, "latin1_bin", 1, Weigher::Identity),
		def(UTF8MB3_GENERAL_CI_ID, "utf8mb3_general_ci", 3, general_ci.clone()),
		def(UTF8MB3_BIN_ID, "utf8mb3_bin", 3, Weigher::Utf8Bin),
		def(UTF8MB4_GENERAL_CI_ID, "utf8mb4_general_ci", 4, general_ci),
		def(
			UTF8MB4_BIN_ID,
			"utf8mb4_bin",
			4,
			Weigher::Unicode {
				weight_len: 3,
				case_insensitive: false,
			},
		),
	]
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_swedish_table() {
		let table = latin1_swedish_sort_order();
		assert_eq!(table.len(), 256);
		assert_eq!(table[b'a' as usize], b'A');
		assert_eq!(table[b'{' as usize], b'{');
		assert_eq!(table[0xE5], 91);
		assert_eq!(table[0xFF], 255);
	}

	#[test]
	fn test_ids_unique() {
		let mut ids: Vec<u32> = definitions().iter().map(|d| d.id).collect();
		ids.sort();
		ids.dedup();
		assert_eq!(ids.len(), definitions().len());
	}
}
