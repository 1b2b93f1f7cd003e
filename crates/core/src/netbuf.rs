// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

//! Network byte order (big-endian) cursors.
//!
//! [`NetWriter`] appends to an owned, growable buffer. [`NetReader`] walks a
//! borrowed slice and checks the remaining length before every read, so a
//! truncated input surfaces as `None` instead of an out-of-bounds access.

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NetWriter {
	buf: Vec<u8>,
}

impl NetWriter {
	pub fn new() -> Self {
		Self {
			buf: Vec::new(),
		}
	}

	pub fn with_capacity(capacity: usize) -> Self {
		Self {
			buf: Vec::with_capacity(capacity),
		}
	}

	#[inline]
	pub fn write(&mut self, bytes: &[u8]) {
		self.buf.extend_from_slice(bytes);
	}

	#[inline]
	pub fn write_u8(&mut self, value: u8) {
		self.buf.push(value);
	}

	#[inline]
	pub fn write_u16(&mut self, value: u16) {
		self.buf.extend_from_slice(&value.to_be_bytes());
	}

	#[inline]
	pub fn write_u32(&mut self, value: u32) {
		self.buf.extend_from_slice(&value.to_be_bytes());
	}

	#[inline]
	pub fn write_u64(&mut self, value: u64) {
		self.buf.extend_from_slice(&value.to_be_bytes());
	}

	/// Appends `n` zero bytes, returning the position of the first.
	pub fn allocate(&mut self, n: usize) -> usize {
		let pos = self.buf.len();
		self.buf.resize(pos + n, 0);
		pos
	}

	/// Overwrites already-written bytes. Returns false when `pos..pos+len`
	/// is not inside the buffer.
	pub fn write_at(&mut self, pos: usize, bytes: &[u8]) -> bool {
		match self.buf.get_mut(pos..pos + bytes.len()) {
			Some(dst) => {
				dst.copy_from_slice(bytes);
				true
			}
			None => false,
		}
	}

	pub fn write_u16_at(&mut self, pos: usize, value: u16) -> bool {
		self.write_at(pos, &value.to_be_bytes())
	}

	#[inline]
	pub fn len(&self) -> usize {
		self.buf.len()
	}

	#[inline]
	pub fn is_empty(&self) -> bool {
		self.buf.is_empty()
	}

	pub fn truncate(&mut self, len: usize) {
		self.buf.truncate(len);
	}

	pub fn clear(&mut self) {
		self.buf.clear();
	}

	pub fn as_slice(&self) -> &[u8] {
		&self.buf
	}

	pub fn into_inner(self) -> Vec<u8> {
		self.buf
	}
}

#[derive(Debug, Clone, Copy)]
pub struct NetReader<'a> {
	data: &'a [u8],
	pos: usize,
}

impl<'a> NetReader<'a> {
	pub fn new(data: &'a [u8]) -> Self {
		Self {
			data,
			pos: 0,
		}
	}

	pub fn empty() -> Self {
		Self::new(&[])
	}

	/// Consumes `n` bytes, or nothing at all when fewer remain.
	#[inline]
	pub fn read(&mut self, n: usize) -> Option<&'a [u8]> {
		if self.remaining() < n {
			return None;
		}
		let out = &self.data[self.pos..self.pos + n];
		self.pos += n;
		Some(out)
	}

	#[inline]
	pub fn read_u8(&mut self) -> Option<u8> {
		self.read(1).map(|b| b[0])
	}

	#[inline]
	pub fn read_u16(&mut self) -> Option<u16> {
		self.read(2).map(|b| u16::from_be_bytes([b[0], b[1]]))
	}

	#[inline]
	pub fn read_u32(&mut self) -> Option<u32> {
		self.read(4).map(|b| u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
	}

	#[inline]
	pub fn read_u64(&mut self) -> Option<u64> {
		self.read(8).map(|b| {
			let mut raw = [0u8; 8];
			raw.copy_from_slice(b);
			u64::from_be_bytes(raw)
		})
	}

	pub fn peek_u8(&self) -> Option<u8> {
		self.data.get(self.pos).copied()
	}

	#[inline]
	pub fn remaining(&self) -> usize {
		self.data.len() - self.pos
	}

	#[inline]
	pub fn position(&self) -> usize {
		self.pos
	}

	/// The unread tail.
	pub fn rest(&self) -> &'a [u8] {
		&self.data[self.pos..]
	}

	/// Bytes consumed since `from`, a position previously returned by
	/// [`position`](Self::position).
	pub fn consumed_since(&self, from: usize) -> &'a [u8] {
		&self.data[from..self.pos]
	}
}
