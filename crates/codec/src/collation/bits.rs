// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use rowkey_core::netbuf::{NetReader, NetWriter};

/// Packs variable-width codes into whole bytes of a [`NetWriter`].
///
/// A fresh byte is appended whenever the previous one is full. Codes are
/// split most significant chunk first; each chunk lands at the current bit
/// offset of the open byte.
pub struct BitWriter<'a> {
	out: &'a mut NetWriter,
	pos: usize,
	current: u8,
	offset: u32,
}

impl<'a> BitWriter<'a> {
	pub fn new(out: &'a mut NetWriter) -> Self {
		Self {
			out,
			pos: 0,
			current: 0,
			offset: 0,
		}
	}

	pub fn write(&mut self, mut size: u32, value: u32) {
		while size > 0 {
			if self.offset == 0 {
				self.pos = self.out.allocate(1);
				self.current = 0;
			}
			let bits = size.min(8 - self.offset);
			let chunk = (value >> (size - bits)) & ((1 << bits) - 1);
			self.current |= (chunk << self.offset) as u8;
			self.out.write_at(self.pos, &[self.current]);
			size -= bits;
			self.offset = (self.offset + bits) & 7;
		}
	}
}

/// Reads codes written by [`BitWriter`].
pub struct BitReader<'r, 'a> {
	reader: &'r mut NetReader<'a>,
	current: u8,
	offset: u32,
}

impl<'r, 'a> BitReader<'r, 'a> {
	pub fn new(reader: &'r mut NetReader<'a>) -> Self {
		Self {
			reader,
			current: 0,
			offset: 0,
		}
	}

	/// `None` when the underlying buffer runs out.
	pub fn read(&mut self, mut size: u32) -> Option<u32> {
		let mut ret = 0u32;
		while size > 0 {
			if self.offset == 0 {
				self.current = self.reader.read_u8()?;
			}
			let bits = size.min(8 - self.offset);
			ret <<= bits;
			ret |= (self.current as u32 >> self.offset) & ((1 << bits) - 1);
			size -= bits;
			self.offset = (self.offset + bits) & 7;
		}
		Some(ret)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_codes_share_bytes() {
		let mut out = NetWriter::new();
		let mut writer = BitWriter::new(&mut out);
		writer.write(1, 1);
		writer.write(2, 2);
		writer.write(0, 0);
		assert_eq!(out.as_slice(), &[0b101]);
	}

	#[test]
	fn test_code_spanning_bytes() {
		let mut out = NetWriter::new();
		{
			let mut writer = BitWriter::new(&mut out);
			writer.write(5, 0b10110);
			writer.write(6, 0b110011);
			writer.write(3, 0b001);
		}
		assert_eq!(out.len(), 2);

		let data = out.into_inner();
		let mut net = NetReader::new(&data);
		let mut reader = BitReader::new(&mut net);
		assert_eq!(reader.read(5), Some(0b10110));
		assert_eq!(reader.read(6), Some(0b110011));
		assert_eq!(reader.read(3), Some(0b001));
		assert_eq!(reader.read(8), None);
	}
}
