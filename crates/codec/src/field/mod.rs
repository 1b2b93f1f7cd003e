// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

//! Per key part packing.
//!
//! A [`FieldPacker`] is decided once per key part from the column type, the
//! collation and the index format. It turns a column value into its
//! mem-comparable image, optionally writing side data that makes the image
//! reversible, and reads both back.

mod numeric;
mod spacepad;
mod varlen;

use std::sync::Arc;

use rowkey_core::{
	Error, Result,
	error::diagnostic::codec::CodecError,
	internal_error,
	netbuf::{NetReader, NetWriter},
	return_error,
};
use tracing::warn;

use crate::{
	ColumnDef, ColumnType, Value,
	collation::{BitReader, BitWriter, Collation, CollationRegistry, PadAttribute, SimpleCodec},
};

/// Byte width of a hidden primary key image.
pub const HIDDEN_PK_LEN: usize = 8;

/// How a key part lays out its image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
	Integer {
		width: usize,
		unsigned: bool,
	},
	Float,
	Double,
	/// Native storage image copied as is (DECIMAL, temporal types, YEAR).
	Verbatim {
		width: usize,
	},
	NewDate,
	/// Prefix of a BLOB/TEXT value. Binary data carries its length last.
	Blob {
		length_bytes: usize,
	},
	/// Fixed-width weight string padded to the column length (CHAR).
	SortKey,
	VarLength {
		legacy: bool,
	},
	SpacePad {
		segment_size: usize,
	},
	HiddenPk,
}

/// How a key part restores its value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unpack {
	Integer {
		unsigned: bool,
	},
	Float,
	Double,
	NewDate,
	/// The image is the value.
	BinaryStr,
	/// The image holds 2-byte code points.
	Utf8Str,
	Varchar,
	VarcharSpacePad,
	Simple,
	SimpleVarcharSpacePad,
	Unknown,
	UnknownVarchar,
}

/// What a key part writes to the unpack info besides its image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MakeUnpack {
	/// Nothing beyond the trimmed space count.
	Dummy,
	Simple,
	SimpleVarchar,
	Unknown,
	UnknownVarchar,
}

/// Index format switches that influence packer setup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct FieldFormat {
	pub legacy_varbinary: bool,
	pub covered_bitmap: bool,
	pub unknown_collation_index_only: bool,
}

#[derive(Debug)]
pub struct FieldPacker {
	column: Option<usize>,
	name: String,
	encoding: Encoding,
	max_image_len: usize,
	maybe_null: bool,
	covered: bool,
	is_varchar: bool,
	key_length: usize,
	field_length: usize,
	collation: Option<Arc<Collation>>,
	unpack: Option<Unpack>,
	make_unpack: Option<MakeUnpack>,
	two_byte_info: bool,
	stores_value: bool,
	trim_unpacked: bool,
}

fn corrupted(reason: impl Into<String>) -> Error {
	CodecError::corrupted(reason).into()
}

fn trim_spaces(mut data: Vec<u8>) -> Vec<u8> {
	let len = data.iter().rposition(|b| *b != b' ').map_or(0, |pos| pos + 1);
	data.truncate(len);
	data
}

impl FieldPacker {
	fn base(column: Option<usize>, name: &str, encoding: Encoding, max_image_len: usize) -> Self {
		Self {
			column,
			name: name.to_string(),
			encoding,
			max_image_len,
			maybe_null: false,
			covered: true,
			is_varchar: false,
			key_length: max_image_len,
			field_length: max_image_len,
			collation: None,
			unpack: None,
			make_unpack: None,
			two_byte_info: false,
			stores_value: false,
			trim_unpacked: false,
		}
	}

	/// The synthetic 8 byte row id of tables without a primary key.
	pub fn hidden_pk() -> Self {
		Self {
			unpack: Some(Unpack::Integer {
				unsigned: true,
			}),
			..Self::base(None, "hidden_pk", Encoding::HiddenPk, HIDDEN_PK_LEN)
		}
	}

	pub(crate) fn new(column_no: usize, column: &ColumnDef, prefix_len: Option<u32>, format: &FieldFormat) -> Result<Self> {
		let fixed = |encoding, width, unpack| Self {
			unpack: Some(unpack),
			maybe_null: column.nullable,
			..Self::base(Some(column_no), &column.name, encoding, width)
		};

		if let Some((width, unsigned)) = column.ty.integer_width() {
			return Ok(fixed(
				Encoding::Integer {
					width,
					unsigned,
				},
				width,
				Unpack::Integer {
					unsigned,
				},
			));
		}
		if let Some(width) = column.ty.verbatim_width() {
			return Ok(fixed(
				Encoding::Verbatim {
					width,
				},
				width,
				Unpack::BinaryStr,
			));
		}

		match column.ty {
			ColumnType::Float => Ok(fixed(Encoding::Float, 4, Unpack::Float)),
			ColumnType::Double => Ok(fixed(Encoding::Double, 8, Unpack::Double)),
			ColumnType::Date => Ok(fixed(Encoding::NewDate, 3, Unpack::NewDate)),
			ColumnType::Blob {
				length_bytes,
			} => Self::new_blob(column_no, column, length_bytes as usize, prefix_len),
			ColumnType::Char {
				length,
			} => Self::new_string(column_no, column, length, false, prefix_len, format),
			ColumnType::Varchar {
				length,
			} => Self::new_string(column_no, column, length, true, prefix_len, format),
			_ => return_error!(CodecError::UnsupportedColumn {
				column: column.name.clone(),
				reason: "no key encoding for this type".to_string(),
			}),
		}
	}

	fn new_blob(column_no: usize, column: &ColumnDef, length_bytes: usize, prefix_len: Option<u32>) -> Result<Self> {
		let Some(key_length) = prefix_len else {
			return_error!(CodecError::UnsupportedColumn {
				column: column.name.clone(),
				reason: "BLOB and TEXT key parts need a prefix length".to_string(),
			});
		};
		if !(1..=4).contains(&length_bytes) {
			return_error!(CodecError::UnsupportedColumn {
				column: column.name.clone(),
				reason: format!("BLOB length width {} is not in 1..=4", length_bytes),
			});
		}
		let collation = CollationRegistry::global().get(column.collation)?;
		let key_length = key_length as usize;
		let length_bytes = if collation.is_binary() { length_bytes } else { 0 };

		Ok(Self {
			maybe_null: column.nullable,
			covered: false,
			key_length,
			field_length: key_length,
			collation: Some(collation),
			..Self::base(
				Some(column_no),
				&column.name,
				Encoding::Blob {
					length_bytes,
				},
				key_length + length_bytes,
			)
		})
	}

	fn new_string(
		column_no: usize,
		column: &ColumnDef,
		length: u32,
		varchar: bool,
		prefix_len: Option<u32>,
		format: &FieldFormat,
	) -> Result<Self> {
		let collation = CollationRegistry::global().get(column.collation)?;
		let field_length = length as usize * collation.mbmaxlen();
		let key_length = prefix_len.map_or(field_length, |len| (len as usize).min(field_length));
		let xfrm_len = collation.max_xfrm_len(key_length);

		let mut packer = Self {
			maybe_null: column.nullable,
			is_varchar: varchar,
			key_length,
			field_length,
			..Self::base(Some(column_no), &column.name, Encoding::SortKey, xfrm_len)
		};
		if varchar {
			packer.encoding = Encoding::VarLength {
				legacy: format.legacy_varbinary,
			};
			packer.max_image_len = varlen::encoded_size(xfrm_len, format.legacy_varbinary);
			packer.two_byte_info = field_length + 8 >= 0x100;
		}

		if collation.is_binary() {
			packer.unpack = Some(if varchar { Unpack::Varchar } else { Unpack::BinaryStr });
		} else if collation.weights_are_value() {
			if varchar {
				packer.use_space_pad(&collation, xfrm_len, 1);
				packer.unpack = Some(Unpack::VarcharSpacePad);
				packer.make_unpack = Some(MakeUnpack::Dummy);
			} else {
				packer.unpack = Some(if collation.is_utf8_bin() { Unpack::Utf8Str } else { Unpack::BinaryStr });
			}
		} else {
			if varchar {
				if collation.levels() == 1 && collation.def().pad == PadAttribute::PadSpace {
					packer.use_space_pad(&collation, xfrm_len, collation.mbmaxlen());
				} else {
					warn!(
						collation = collation.name(),
						column = %column.name,
						"collation cannot use space-padded keys, comparing without padding"
					);
				}
			}

			let space_padded = matches!(
				packer.encoding,
				Encoding::SpacePad {
					..
				} | Encoding::SortKey
			);
			if space_padded && collation.simple_codec().is_some() {
				packer.make_unpack = Some(if varchar { MakeUnpack::SimpleVarchar } else { MakeUnpack::Simple });
				packer.unpack = Some(if varchar { Unpack::SimpleVarcharSpacePad } else { Unpack::Simple });
			} else if format.unknown_collation_index_only {
				packer.stores_value = true;
				packer.make_unpack = Some(if varchar { MakeUnpack::UnknownVarchar } else { MakeUnpack::Unknown });
				packer.unpack = Some(if varchar { Unpack::UnknownVarchar } else { Unpack::Unknown });
			} else {
				packer.covered = false;
			}
		}
		packer.trim_unpacked = !varchar && !collation.is_binary();

		if key_length != field_length {
			packer.covered = false;
			// only VARCHAR prefixes can prove per row that they hold the whole value
			if !varchar || !format.covered_bitmap {
				packer.unpack = None;
				packer.make_unpack = None;
				packer.stores_value = true;
			}
		}

		packer.collation = Some(collation);
		Ok(packer)
	}

	fn use_space_pad(&mut self, collation: &Collation, xfrm_len: usize, extra_segments: usize) {
		let segment_size = collation.segment_size();
		self.encoding = Encoding::SpacePad {
			segment_size,
		};
		self.max_image_len = spacepad::max_image_len(xfrm_len, segment_size, extra_segments);
	}

	/// Position of the column in the table, `None` for the hidden primary key.
	pub fn column(&self) -> Option<usize> {
		self.column
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	pub fn encoding(&self) -> Encoding {
		self.encoding
	}

	/// Upper bound of the image, without the NULL marker.
	pub fn max_image_len(&self) -> usize {
		self.max_image_len
	}

	pub fn maybe_null(&self) -> bool {
		self.maybe_null
	}

	/// True when every value of this part can be restored from the index.
	pub fn covered(&self) -> bool {
		self.covered
	}

	pub fn is_varchar(&self) -> bool {
		self.is_varchar
	}

	pub fn is_hidden_pk(&self) -> bool {
		self.encoding == Encoding::HiddenPk
	}

	/// Indexed length in bytes.
	pub fn key_length(&self) -> usize {
		self.key_length
	}

	pub fn field_length(&self) -> usize {
		self.field_length
	}

	pub fn can_unpack(&self) -> bool {
		self.unpack.is_some()
	}

	pub fn unpack_kind(&self) -> Option<Unpack> {
		self.unpack
	}

	pub fn make_unpack_kind(&self) -> Option<MakeUnpack> {
		self.make_unpack
	}

	pub fn uses_unpack_info(&self) -> bool {
		self.make_unpack.is_some()
	}

	pub fn stores_value(&self) -> bool {
		self.stores_value
	}

	/// Whether a row can cover this part only sometimes, which is what the
	/// covered bitmap tracks.
	pub fn needs_covered_bit(&self) -> bool {
		self.is_varchar && !self.covered
	}

	fn collation(&self) -> Result<&Arc<Collation>> {
		self.collation.as_ref().ok_or_else(|| internal_error!("key part `{}` has no collation", self.name).into())
	}

	fn simple_codec(&self) -> Result<&SimpleCodec> {
		self.collation()?
			.simple_codec()
			.ok_or_else(|| internal_error!("key part `{}` has no reversible collation", self.name).into())
	}

	fn bytes<'v>(&self, value: &'v Value) -> Result<&'v [u8]> {
		match value.as_bytes() {
			Some(data) => Ok(data),
			None => return_error!(CodecError::TypeMismatch {
				column: self.name.clone(),
				expected: "bytes",
			}),
		}
	}

	/// The part of a string value that goes into the key.
	fn key_data<'v>(&self, value: &'v Value) -> Result<&'v [u8]> {
		let data = self.bytes(value)?;
		let collation = self.collation()?;
		let nchars = self.key_length / collation.mbmaxlen();
		let len = collation.char_prefix_len(data, nchars).min(self.key_length);

		if len < data.len() && self.key_length == self.field_length {
			// CHAR drops trailing spaces anyway; a VARCHAR keeps them, so excess spaces are data
			let only_spaces = !self.is_varchar && !collation.is_binary() && data[len..].iter().all(|b| *b == b' ');
			if !only_spaces {
				if collation.is_binary() && !self.is_varchar {
					return_error!(CodecError::InvalidLength {
						column: self.name.clone(),
						expected: self.field_length,
						actual: data.len(),
					});
				}
				return_error!(CodecError::ValueOutOfRange {
					column: self.name.clone(),
					value: value.to_string(),
				});
			}
		}
		Ok(&data[..len])
	}

	fn pad_image(collation: &Collation, n: usize, key: &mut NetWriter) {
		if collation.is_binary() {
			key.allocate(n);
		} else {
			let pad: Vec<u8> = collation.space().xfrm.iter().copied().cycle().take(n).collect();
			key.write(&pad);
		}
	}

	/// Appends the NULL marker (for nullable parts) and the image of `value`.
	/// Side data goes to `unpack` when given. Returns whether the value was
	/// NULL.
	pub(crate) fn pack_field(&self, value: &Value, key: &mut NetWriter, unpack: Option<&mut NetWriter>) -> Result<bool> {
		if value.is_null() {
			if !self.maybe_null {
				return_error!(CodecError::TypeMismatch {
					column: self.name.clone(),
					expected: "non-null",
				});
			}
			key.write_u8(0);
			return Ok(true);
		}
		if self.maybe_null {
			key.write_u8(1);
		}

		let side = if self.uses_unpack_info() { unpack } else { None };
		match self.encoding {
			Encoding::Integer {
				width,
				unsigned,
			} => numeric::pack_integer(&self.name, value, width, unsigned, key)?,
			Encoding::Float => numeric::pack_float(&self.name, value, key)?,
			Encoding::Double => numeric::pack_double(&self.name, value, key)?,
			Encoding::NewDate => numeric::pack_newdate(&self.name, value, key)?,
			Encoding::Verbatim {
				width,
			} => {
				let data = self.bytes(value)?;
				if data.len() != width {
					return_error!(CodecError::InvalidLength {
						column: self.name.clone(),
						expected: width,
						actual: data.len(),
					});
				}
				key.write(data);
			}
			Encoding::HiddenPk => match value {
				Value::UInt(id) => key.write_u64(*id),
				Value::Int(id) if *id >= 0 => key.write_u64(*id as u64),
				_ => return_error!(CodecError::TypeMismatch {
					column: self.name.clone(),
					expected: "unsigned integer",
				}),
			},
			Encoding::Blob {
				length_bytes,
			} => self.pack_blob(self.bytes(value)?, length_bytes, key)?,
			Encoding::SortKey => {
				let data = self.key_data(value)?;
				let collation = self.collation()?;
				let mut image = Vec::with_capacity(self.max_image_len);
				collation.xfrm_into(data, &mut image);
				image.truncate(self.max_image_len);
				key.write(&image);
				Self::pad_image(collation, self.max_image_len - image.len(), key);
				if let Some(side) = side {
					self.make_unpack_info(data, data, side)?;
				}
			}
			Encoding::VarLength {
				legacy,
			} => {
				let data = self.key_data(value)?;
				let mut weights = Vec::with_capacity(data.len());
				self.collation()?.xfrm_into(data, &mut weights);
				varlen::pack(&weights, legacy, key);
				if let Some(side) = side {
					self.make_unpack_info(data, data, side)?;
				}
			}
			Encoding::SpacePad {
				segment_size,
			} => {
				let data = self.key_data(value)?;
				let collation = self.collation()?;
				let trimmed = collation.trimmed_len(data);
				let mut weights = Vec::with_capacity(trimmed * collation.weight_len());
				collation.xfrm_into(&data[..trimmed], &mut weights);
				let space = &collation.space().xfrm;
				let packed = spacepad::pack(&weights, segment_size, space, key);

				if let Some(side) = side {
					let weight_len = collation.weight_len();
					let removed = data.len() - trimmed;
					let dropped = (weights.len() - packed.consumed) / weight_len;
					let pad_chars = packed.padding / space.len();
					if !self.stores_value {
						let count = spacepad::TRIMMED_CHARS_OFFSET + removed + dropped - pad_chars;
						spacepad::write_count(side, self.two_byte_info, count);
					}
					// characters whose weights the key image carries
					let encoded = packed.consumed / weight_len + pad_chars.min(removed);
					let coded = &data[..collation.char_prefix_len(data, encoded)];
					self.make_unpack_info(data, coded, side)?;
				}
			}
		}
		Ok(false)
	}

	fn pack_blob(&self, data: &[u8], length_bytes: usize, key: &mut NetWriter) -> Result<()> {
		let collation = self.collation()?;
		if data.is_empty() && collation.pad_char() == 0 {
			key.allocate(self.max_image_len);
			return Ok(());
		}
		if collation.is_binary() {
			let take = data.len().min(self.key_length);
			key.write(&data[..take]);
			key.allocate(self.key_length - take);
			// shorter values sort before longer ones sharing the prefix
			key.write(&(take as u32).to_be_bytes()[4 - length_bytes..]);
		} else {
			let mut weights = Vec::with_capacity(self.key_length);
			collation.xfrm_into(data, &mut weights);
			weights.truncate(self.key_length);
			key.write(&weights);
			Self::pad_image(collation, self.key_length - weights.len(), key);
		}
		Ok(())
	}

	/// `data` is the value as it went into the key, `coded` the characters
	/// whose weights the key image actually carries.
	fn make_unpack_info(&self, data: &[u8], coded: &[u8], side: &mut NetWriter) -> Result<()> {
		match self.make_unpack {
			None | Some(MakeUnpack::Dummy) => {}
			Some(MakeUnpack::Simple) => {
				let mut padded = data.to_vec();
				padded.resize(self.field_length, b' ');
				self.simple_codec()?.encode(&padded, &mut BitWriter::new(side));
			}
			Some(MakeUnpack::SimpleVarchar) => {
				self.simple_codec()?.encode(coded, &mut BitWriter::new(side));
			}
			Some(MakeUnpack::Unknown) => {
				side.write(data);
				let pad = self.field_length.saturating_sub(data.len());
				side.write(&vec![b' '; pad]);
			}
			Some(MakeUnpack::UnknownVarchar) => {
				spacepad::write_count(side, self.field_length > 0xff, data.len());
				side.write(data);
			}
		}
		Ok(())
	}

	/// Writes the hidden primary key image.
	pub(crate) fn pack_hidden_pk(&self, id: u64, key: &mut NetWriter) {
		key.write_u64(id);
	}

	fn fixed<'a>(&self, key: &mut NetReader<'a>) -> Result<&'a [u8]> {
		key.read(self.max_image_len)
			.ok_or_else(|| corrupted(format!("key ends inside the `{}` key part", self.name)))
	}

	pub(crate) fn skip_image(&self, key: &mut NetReader<'_>) -> Result<()> {
		match self.encoding {
			Encoding::VarLength {
				legacy,
			} => varlen::skip(key, legacy),
			Encoding::SpacePad {
				segment_size,
			} => spacepad::skip(key, segment_size),
			_ => self.fixed(key).map(|_| ()),
		}
	}

	/// Reads the NULL marker. `Ok(true)` means the part is NULL and carries no
	/// image.
	fn read_null_marker(&self, key: &mut NetReader<'_>) -> Result<bool> {
		if !self.maybe_null {
			return Ok(false);
		}
		match key.read_u8() {
			Some(0) => Ok(true),
			Some(1) => Ok(false),
			Some(marker) => Err(corrupted(format!("invalid NULL marker {}", marker))),
			None => Err(corrupted("key ends before a NULL marker")),
		}
	}

	/// Moves past this part without restoring it.
	pub(crate) fn skip_field(&self, key: &mut NetReader<'_>) -> Result<()> {
		if self.read_null_marker(key)? {
			return Ok(());
		}
		self.skip_image(key)
	}

	/// Restores the value of this part. `side` is the unpack info positioned
	/// at this part's side data; pass an empty reader when there is none.
	pub(crate) fn unpack_field(&self, key: &mut NetReader<'_>, side: &mut NetReader<'_>) -> Result<Value> {
		if self.read_null_marker(key)? {
			return Ok(Value::Null);
		}
		let Some(unpack) = self.unpack else {
			return Err(internal_error!("key part `{}` cannot be unpacked", self.name).into());
		};

		let value = match unpack {
			Unpack::Integer {
				unsigned,
			} => numeric::unpack_integer(self.fixed(key)?, unsigned),
			Unpack::Float => numeric::unpack_float(self.fixed(key)?),
			Unpack::Double => numeric::unpack_double(self.fixed(key)?),
			Unpack::NewDate => numeric::unpack_newdate(self.fixed(key)?),
			Unpack::BinaryStr => Value::bytes(self.fixed(key)?),
			Unpack::Utf8Str => {
				let mut out = Vec::with_capacity(self.field_length);
				self.collation()?.decode_ucs2(self.fixed(key)?, &mut out)?;
				Value::Bytes(out)
			}
			Unpack::Varchar => {
				let Encoding::VarLength {
					legacy,
				} = self.encoding
				else {
					return Err(internal_error!("key part `{}` is not variable-length", self.name).into());
				};
				Value::Bytes(varlen::unpack(key, legacy)?)
			}
			Unpack::VarcharSpacePad => {
				let collation = self.collation()?;
				let (weights, extra) = self.unpack_space_padded(collation, key, side)?;
				let mut out = if collation.is_utf8_bin() {
					let mut out = Vec::with_capacity(weights.len() + extra);
					collation.decode_ucs2(&weights, &mut out)?;
					out
				} else {
					weights
				};
				out.resize(out.len() + extra, collation.pad_char());
				Value::Bytes(out)
			}
			Unpack::Simple => {
				let weights = self.fixed(key)?;
				let mut out = Vec::with_capacity(weights.len());
				self.simple_codec()?.decode(weights, &mut BitReader::new(side), &mut out)?;
				Value::Bytes(out)
			}
			Unpack::SimpleVarcharSpacePad => {
				let collation = self.collation()?;
				let (weights, extra) = self.unpack_space_padded(collation, key, side)?;
				let mut out = Vec::with_capacity(weights.len() + extra);
				self.simple_codec()?.decode(&weights, &mut BitReader::new(side), &mut out)?;
				out.resize(out.len() + extra, b' ');
				Value::Bytes(out)
			}
			Unpack::Unknown => {
				self.skip_image(key)?;
				match side.read(self.field_length) {
					Some(data) => Value::bytes(data),
					None => return Err(corrupted(format!("unpack info lacks the value of `{}`", self.name))),
				}
			}
			Unpack::UnknownVarchar => {
				self.skip_image(key)?;
				let len = if self.field_length > 0xff {
					side.read_u16().map(|len| len as usize)
				} else {
					side.read_u8().map(|len| len as usize)
				};
				match len.and_then(|len| side.read(len)) {
					Some(data) => Value::bytes(data),
					None => return Err(corrupted(format!("unpack info lacks the value of `{}`", self.name))),
				}
			}
		};

		Ok(match value {
			Value::Bytes(data) if self.trim_unpacked => Value::Bytes(trim_spaces(data)),
			value => value,
		})
	}

	fn unpack_space_padded(
		&self,
		collation: &Collation,
		key: &mut NetReader<'_>,
		side: &mut NetReader<'_>,
	) -> Result<(Vec<u8>, usize)> {
		let Encoding::SpacePad {
			segment_size,
		} = self.encoding
		else {
			return Err(internal_error!("key part `{}` is not space-padded", self.name).into());
		};
		let (padding_chars, extra) = spacepad::read_count(side, self.two_byte_info)?;
		let weights = spacepad::unpack(key, segment_size, padding_chars * collation.space().xfrm.len())?;
		Ok((weights, extra))
	}
}
