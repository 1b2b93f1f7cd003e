// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use rowkey_core::{Result, error::diagnostic::codec::CodecError, return_error};
use smallvec::SmallVec;

use super::{BitReader, BitWriter};

/// Inverts a single-byte sort table.
///
/// Every weight maps back to the bytes that share it. The position of a byte
/// among those siblings is its code, written with just enough bits to tell
/// the siblings apart. Weights with a single pre-image need no bits at all.
#[derive(Debug)]
pub struct SimpleCodec {
	sort_order: Box<[u8; 256]>,
	enc_idx: Box<[u8; 256]>,
	enc_size: Box<[u8; 256]>,
	dec_size: Box<[u8; 256]>,
	dec_count: Box<[u16; 256]>,
	dec_idx: Vec<[u8; 256]>,
}

fn bits_for(n: usize) -> u8 {
	if n <= 1 {
		return 0;
	}
	(usize::BITS - (n - 1).leading_zeros()) as u8
}

impl SimpleCodec {
	pub(super) fn build(table: &[u8]) -> Self {
		let mut sort_order = Box::new([0u8; 256]);
		sort_order.copy_from_slice(&table[..256]);

		let mut rev: Vec<SmallVec<[u8; 4]>> = vec![SmallVec::new(); 256];
		for byte in 0..=255u8 {
			rev[sort_order[byte as usize] as usize].push(byte);
		}
		let max_conflicts = rev.iter().map(|siblings| siblings.len()).max().unwrap_or(1);

		let mut enc_idx = Box::new([0u8; 256]);
		let mut enc_size = Box::new([0u8; 256]);
		let mut dec_size = Box::new([0u8; 256]);
		let mut dec_count = Box::new([0u16; 256]);
		let mut dec_idx = vec![[0u8; 256]; max_conflicts];

		for (weight, siblings) in rev.iter().enumerate() {
			let size = bits_for(siblings.len());
			dec_size[weight] = size;
			dec_count[weight] = siblings.len() as u16;
			for (idx, byte) in siblings.iter().enumerate() {
				enc_idx[*byte as usize] = idx as u8;
				enc_size[*byte as usize] = size;
				dec_idx[idx][weight] = *byte;
			}
		}

		Self {
			sort_order,
			enc_idx,
			enc_size,
			dec_size,
			dec_count,
			dec_idx,
		}
	}

	pub fn weight(&self, byte: u8) -> u8 {
		self.sort_order[byte as usize]
	}

	/// Writes the codes that disambiguate `src` from its weight string.
	pub fn encode(&self, src: &[u8], writer: &mut BitWriter<'_>) {
		for byte in src {
			writer.write(self.enc_size[*byte as usize] as u32, self.enc_idx[*byte as usize] as u32);
		}
	}

	/// Restores the bytes behind `weights`, consuming one code per weight.
	pub fn decode(&self, weights: &[u8], reader: &mut BitReader<'_, '_>, out: &mut Vec<u8>) -> Result<()> {
		for weight in weights {
			let size = self.dec_size[*weight as usize] as u32;
			let idx = match reader.read(size) {
				Some(idx) => idx as usize,
				None => return_error!(CodecError::corrupted("unpack info ends inside a collation code")),
			};
			// codes past the weight's own siblings would read another weight's row
			match self.dec_idx.get(idx) {
				Some(row) if idx < self.dec_count[*weight as usize] as usize => out.push(row[*weight as usize]),
				_ => return_error!(CodecError::corrupted(format!(
					"collation code {} is out of range for weight {:#04x}",
					idx, weight
				))),
			}
		}
		Ok(())
	}

	/// True if no weight needs disambiguation bits.
	pub fn is_bijective(&self) -> bool {
		self.dec_size.iter().all(|size| *size == 0)
	}
}
