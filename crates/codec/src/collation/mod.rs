// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

//! Collations: how character data turns into sort weights.
//!
//! A [`CollationDef`] is plain configuration. The registry wraps each
//! definition into a [`Collation`], which owns the mem-comparable image of
//! the pad character and, for reversible 8-bit sort tables, a lazily built
//! [`SimpleCodec`].

mod bits;
mod builtin;
mod registry;
mod simple;
mod weight;

pub use bits::{BitReader, BitWriter};
pub use builtin::{
	BINARY_COLLATION_ID, LATIN1_BIN_ID, LATIN1_SWEDISH_CI_ID, UTF8MB3_BIN_ID, UTF8MB3_GENERAL_CI_ID, UTF8MB4_BIN_ID,
	UTF8MB4_GENERAL_CI_ID,
};
use once_cell::sync::OnceCell;
pub use registry::CollationRegistry;
use rowkey_core::{Result, error::diagnostic::codec::CodecError, return_error};
use serde::Deserialize;
pub use simple::SimpleCodec;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PadAttribute {
	#[default]
	PadSpace,
	NoPad,
}

/// How a character sequence maps to its weight string.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Weigher {
	/// Bytes are their own weights and no padding applies.
	Binary,
	/// Bytes are their own weights; comparison pads with spaces.
	Identity,
	/// Each character weighs its code point as two big-endian bytes.
	Utf8Bin,
	/// One weight byte per input byte, looked up in a 256 entry table.
	SortTable {
		sort_order: Vec<u8>,
	},
	/// Each UTF-8 character weighs `weight_len` big-endian bytes.
	Unicode {
		weight_len: u8,
		#[serde(default)]
		case_insensitive: bool,
	},
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CollationDef {
	pub id: u32,
	pub name: String,
	#[serde(default = "one")]
	pub mbminlen: u8,
	pub mbmaxlen: u8,
	pub weigher: Weigher,
	#[serde(default)]
	pub pad: PadAttribute,
	/// Number of comparison levels. Anything above one cannot be expressed
	/// with the space-padded encoding.
	#[serde(default = "one")]
	pub levels: u8,
	/// Whether the sort table may be inverted with the bit-packed codec.
	#[serde(default)]
	pub reversible: bool,
}

fn one() -> u8 {
	1
}

impl CollationDef {
	fn validate(&self) -> Result<()> {
		let reason = match &self.weigher {
			_ if self.mbmaxlen == 0 || self.mbmaxlen > 4 => Some(format!("mbmaxlen {} is not in 1..=4", self.mbmaxlen)),
			_ if self.levels == 0 => Some("levels must be at least 1".to_string()),
			Weigher::SortTable {
				sort_order,
			} if sort_order.len() != 256 => Some(format!("sort_order has {} entries, expected 256", sort_order.len())),
			Weigher::Binary | Weigher::Identity | Weigher::SortTable {
				..
			} if self.mbmaxlen != 1 => Some(format!("`{}` weighs bytes but mbmaxlen is {}", self.name, self.mbmaxlen)),
			Weigher::Unicode {
				weight_len,
				..
			} if !matches!(weight_len, 2 | 3) => Some(format!("weight_len {} is not 2 or 3", weight_len)),
			Weigher::Utf8Bin if self.mbmaxlen != 3 => Some("utf8_bin weighs 3 byte characters".to_string()),
			_ => None,
		};
		match reason {
			Some(reason) => return_error!(CodecError::InvalidCollation {
				reason
			}),
			None => Ok(()),
		}
	}
}

/// Mem-comparable form of the pad character.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpaceInfo {
	/// `xfrm(' ')`
	pub xfrm: Vec<u8>,
	/// Byte length of the space character itself.
	pub mb_len: usize,
}

#[derive(Debug)]
pub struct Collation {
	def: CollationDef,
	space: SpaceInfo,
	codec: OnceCell<Option<SimpleCodec>>,
}

impl Collation {
	pub fn new(def: CollationDef) -> Result<Self> {
		def.validate()?;
		let mut xfrm = Vec::new();
		weight::xfrm(&def.weigher, b" ", &mut xfrm);
		Ok(Self {
			def,
			space: SpaceInfo {
				xfrm,
				mb_len: 1,
			},
			codec: OnceCell::new(),
		})
	}

	pub fn id(&self) -> u32 {
		self.def.id
	}

	pub fn name(&self) -> &str {
		&self.def.name
	}

	pub fn def(&self) -> &CollationDef {
		&self.def
	}

	pub fn mbmaxlen(&self) -> usize {
		self.def.mbmaxlen as usize
	}

	pub fn levels(&self) -> u8 {
		self.def.levels
	}

	pub fn is_binary(&self) -> bool {
		matches!(self.def.weigher, Weigher::Binary)
	}

	/// True when the weight string can be turned back into the value
	/// without any side data.
	pub fn weights_are_value(&self) -> bool {
		matches!(self.def.weigher, Weigher::Binary | Weigher::Identity | Weigher::Utf8Bin)
	}

	pub fn is_utf8_bin(&self) -> bool {
		matches!(self.def.weigher, Weigher::Utf8Bin)
	}

	pub fn space(&self) -> &SpaceInfo {
		&self.space
	}

	pub fn pad_char(&self) -> u8 {
		if self.is_binary() { 0x00 } else { b' ' }
	}

	/// Bytes of weight produced per character.
	pub fn weight_len(&self) -> usize {
		match &self.def.weigher {
			Weigher::Binary
			| Weigher::Identity
			| Weigher::SortTable {
				..
			} => 1,
			Weigher::Utf8Bin => 2,
			Weigher::Unicode {
				weight_len,
				..
			} => *weight_len as usize,
		}
	}

	/// Segment size of the space-padded encoding. Chosen so the image of a
	/// space never straddles two segments.
	pub fn segment_size(&self) -> usize {
		if self.weight_len() == 3 { 10 } else { 9 }
	}

	/// Upper bound of the weight string for `byte_len` bytes of data.
	pub fn max_xfrm_len(&self, byte_len: usize) -> usize {
		byte_len.div_ceil(self.mbmaxlen()) * self.weight_len()
	}

	pub fn xfrm_into(&self, src: &[u8], out: &mut Vec<u8>) {
		weight::xfrm(&self.def.weigher, src, out);
	}

	/// Length of `src` without trailing spaces.
	pub fn trimmed_len(&self, src: &[u8]) -> usize {
		if self.is_binary() {
			return src.len();
		}
		src.iter().rposition(|b| *b != b' ').map_or(0, |pos| pos + 1)
	}

	/// Byte length of the first `nchars` characters of `src`.
	pub fn char_prefix_len(&self, src: &[u8], nchars: usize) -> usize {
		if self.mbmaxlen() == 1 {
			return src.len().min(nchars);
		}
		weight::utf8_prefix_len(src, nchars)
	}

	/// Restores character data from 2-byte code point weights.
	pub(crate) fn decode_ucs2(&self, weights: &[u8], out: &mut Vec<u8>) -> Result<()> {
		weight::decode_ucs2(weights, out)
	}

	/// The reversible codec, built on first use. `None` when the definition
	/// is not eligible.
	pub fn simple_codec(&self) -> Option<&SimpleCodec> {
		self.codec
			.get_or_init(|| match &self.def.weigher {
				Weigher::SortTable {
					sort_order,
				} if self.def.reversible => {
					debug!(collation = %self.def.name, "building reversible collation codec");
					Some(SimpleCodec::build(sort_order))
				}
				_ => None,
			})
			.as_ref()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn registry() -> &'static CollationRegistry {
		CollationRegistry::global()
	}

	#[test]
	fn test_space_images() {
		let latin1 = registry().get(LATIN1_BIN_ID).unwrap();
		assert_eq!(latin1.space().xfrm, vec![0x20]);
		assert_eq!(latin1.segment_size(), 9);

		let utf8 = registry().get(UTF8MB3_BIN_ID).unwrap();
		assert_eq!(utf8.space().xfrm, vec![0x00, 0x20]);

		let utf8mb4 = registry().get(UTF8MB4_BIN_ID).unwrap();
		assert_eq!(utf8mb4.space().xfrm, vec![0x00, 0x00, 0x20]);
		assert_eq!(utf8mb4.segment_size(), 10);
	}

	#[test]
	fn test_max_xfrm_len() {
		let utf8 = registry().get(UTF8MB3_GENERAL_CI_ID).unwrap();
		assert_eq!(utf8.max_xfrm_len(30), 20);
		let latin1 = registry().get(LATIN1_SWEDISH_CI_ID).unwrap();
		assert_eq!(latin1.max_xfrm_len(10), 10);
	}

	#[test]
	fn test_trimmed_len() {
		let latin1 = registry().get(LATIN1_BIN_ID).unwrap();
		assert_eq!(latin1.trimmed_len(b"ab  "), 2);
		assert_eq!(latin1.trimmed_len(b"   "), 0);
		let binary = registry().get(BINARY_COLLATION_ID).unwrap();
		assert_eq!(binary.trimmed_len(b"ab  "), 4);
	}

	#[test]
	fn test_only_reversible_tables_get_codec() {
		assert!(registry().get(LATIN1_SWEDISH_CI_ID).unwrap().simple_codec().is_some());
		assert!(registry().get(UTF8MB4_GENERAL_CI_ID).unwrap().simple_codec().is_none());

		let mut sort_order: Vec<u8> = (0..=255u8).collect();
		sort_order[b'b' as usize] = b'a';
		let irreversible = Collation::new(CollationDef {
			id: 900,
			name: "test_irreversible".to_string(),
			mbminlen: 1,
			mbmaxlen: 1,
			weigher: Weigher::SortTable {
				sort_order,
			},
			pad: PadAttribute::PadSpace,
			levels: 1,
			reversible: false,
		})
		.unwrap();
		assert!(irreversible.simple_codec().is_none());
	}

	#[test]
	fn test_rejects_short_sort_table() {
		let err = Collation::new(CollationDef {
			id: 901,
			name: "short".to_string(),
			mbminlen: 1,
			mbmaxlen: 1,
			weigher: Weigher::SortTable {
				sort_order: vec![0; 10],
			},
			pad: PadAttribute::PadSpace,
			levels: 1,
			reversible: true,
		})
		.unwrap_err();
		assert_eq!(err.code(), "CODEC_009");
	}
}
