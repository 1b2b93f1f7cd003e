// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use rowkey_core::{Result, error::diagnostic::codec::CodecError, return_error};

use super::Weigher;

const REPLACEMENT_WEIGHT: u32 = 0xFFFD;

fn utf8_char_len(lead: u8) -> usize {
	match lead {
		0x00..=0x7F => 1,
		0xC0..=0xDF => 2,
		0xE0..=0xEF => 3,
		0xF0..=0xF7 => 4,
		_ => 1,
	}
}

/// Decodes one character. Malformed sequences decode to U+FFFD and
/// consume at least one byte.
fn next_char(src: &[u8]) -> (char, usize) {
	let len = utf8_char_len(src[0]).min(src.len());
	let ch = std::str::from_utf8(&src[..len]).ok().and_then(|s| s.chars().next());
	match ch {
		Some(ch) => (ch, len),
		None => (char::REPLACEMENT_CHARACTER, 1),
	}
}

struct Chars<'a> {
	src: &'a [u8],
}

impl Iterator for Chars<'_> {
	type Item = (char, usize);

	fn next(&mut self) -> Option<Self::Item> {
		if self.src.is_empty() {
			return None;
		}
		let (ch, len) = next_char(self.src);
		self.src = &self.src[len..];
		Some((ch, len))
	}
}

fn chars(src: &[u8]) -> Chars<'_> {
	Chars {
		src,
	}
}

pub(super) fn utf8_prefix_len(src: &[u8], nchars: usize) -> usize {
	chars(src).take(nchars).map(|(_, len)| len).sum()
}

fn fold_case(ch: char) -> char {
	let mut upper = ch.to_uppercase();
	match (upper.next(), upper.next()) {
		(Some(single), None) => single,
		_ => ch,
	}
}

fn push_weight(out: &mut Vec<u8>, weight: u32, len: usize) {
	let bytes = weight.to_be_bytes();
	out.extend_from_slice(&bytes[4 - len..]);
}

pub(super) fn xfrm(weigher: &Weigher, src: &[u8], out: &mut Vec<u8>) {
	match weigher {
		Weigher::Binary | Weigher::Identity => out.extend_from_slice(src),
		Weigher::SortTable {
			sort_order,
		} => out.extend(src.iter().map(|b| sort_order[*b as usize])),
		Weigher::Utf8Bin => {
			for (ch, _) in chars(src) {
				let code = ch as u32;
				push_weight(out, if code > 0xFFFF { REPLACEMENT_WEIGHT } else { code }, 2);
			}
		}
		Weigher::Unicode {
			weight_len,
			case_insensitive,
		} => {
			let len = *weight_len as usize;
			for (ch, _) in chars(src) {
				let ch = if *case_insensitive { fold_case(ch) } else { ch };
				let code = ch as u32;
				let weight = if len == 2 && code > 0xFFFF { REPLACEMENT_WEIGHT } else { code };
				push_weight(out, weight, len);
			}
		}
	}
}

pub(super) fn decode_ucs2(weights: &[u8], out: &mut Vec<u8>) -> Result<()> {
	if weights.len() % 2 != 0 {
		return_error!(CodecError::corrupted("odd number of bytes in a two byte weight string"));
	}
	let mut buf = [0u8; 4];
	for pair in weights.chunks_exact(2) {
		let code = u16::from_be_bytes([pair[0], pair[1]]) as u32;
		match char::from_u32(code) {
			Some(ch) => out.extend_from_slice(ch.encode_utf8(&mut buf).as_bytes()),
			None => return_error!(CodecError::corrupted(format!("weight {:#06x} is not a character", code))),
		}
	}
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;

	fn weigh(weigher: &Weigher, src: &[u8]) -> Vec<u8> {
		let mut out = Vec::new();
		xfrm(weigher, src, &mut out);
		out
	}

	#[test]
	fn test_utf8_bin_weights() {
		assert_eq!(weigh(&Weigher::Utf8Bin, "aé".as_bytes()), vec![0x00, 0x61, 0x00, 0xe9]);
	}

	#[test]
	fn test_case_insensitive_weights_match() {
		let ci = Weigher::Unicode {
			weight_len: 2,
			case_insensitive: true,
		};
		assert_eq!(weigh(&ci, b"Hello"), weigh(&ci, b"hELLO"));
	}

	#[test]
	fn test_supplementary_characters() {
		let mb4 = Weigher::Unicode {
			weight_len: 3,
			case_insensitive: false,
		};
		assert_eq!(weigh(&mb4, "😀".as_bytes()), vec![0x01, 0xf6, 0x00]);
		let general = Weigher::Unicode {
			weight_len: 2,
			case_insensitive: true,
		};
		assert_eq!(weigh(&general, "😀".as_bytes()), vec![0xff, 0xfd]);
	}

	#[test]
	fn test_malformed_input_still_weighs() {
		assert_eq!(weigh(&Weigher::Utf8Bin, &[0xff, b'a']), vec![0xff, 0xfd, 0x00, 0x61]);
	}

	#[test]
	fn test_prefix_len_counts_characters() {
		assert_eq!(utf8_prefix_len("aéb".as_bytes(), 2), 3);
		assert_eq!(utf8_prefix_len(b"ab", 5), 2);
	}

	#[test]
	fn test_decode_ucs2() {
		let mut out = Vec::new();
		decode_ucs2(&[0x00, 0x68, 0x00, 0xe9], &mut out).unwrap();
		assert_eq!(out, "hé".as_bytes());
		assert!(decode_ucs2(&[0xd8, 0x00], &mut Vec::new()).is_err());
		assert!(decode_ucs2(&[0x00], &mut Vec::new()).is_err());
	}
}
