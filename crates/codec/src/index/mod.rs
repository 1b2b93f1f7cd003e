// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

//! Index definitions and the translation between rows and index entries.
//!
//! An index entry is a key of the form `[index number:4]{key part}*` and an
//! optional value holding the unpack info:
//!
//! ```text
//! [index flag fields][tag:1][length:2][covered bitmap:2]?{part side data}*[0x01][key crc:4][value crc:4]?
//! ```
//!
//! Secondary keys end with the primary key columns they do not already
//! contain, so the base row can be located from the secondary key alone.

pub mod flags;
pub mod format;
pub mod qualifier;
mod stats;

use std::{fmt::Write as _, sync::Arc};

pub use flags::IndexFlag;
pub use format::IndexType;
use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use rowkey_core::{
	IndexId, Result,
	error::diagnostic::codec::CodecError,
	internal_error,
	netbuf::{NetReader, NetWriter},
	return_error,
};
pub use stats::IndexStats;
use tracing::{debug, error, instrument};
use xxhash_rust::xxh3::xxh3_64;

use crate::{
	CodecConfig, INDEX_NUMBER_SIZE, PartialRow, TableSchema, Value,
	field::{FieldFormat, FieldPacker},
};

const UNPACK_DATA_TAG: u8 = 0x02;
const UNPACK_COVERED_DATA_TAG: u8 = 0x03;
const UNPACK_HEADER_SIZE: usize = 3;
const UNPACK_COVERED_HEADER_SIZE: usize = 5;

const CHECKSUM_DATA_TAG: u8 = 0x01;
const CHECKSUM_SIZE: usize = 4;
const CHECKSUM_CHUNK_SIZE: usize = 1 + 2 * CHECKSUM_SIZE;

/// Key parts tracked by the covered bitmap.
pub const MAX_REF_PARTS: usize = 16;

pub const HIDDEN_PK_NAME: &str = "HIDDEN_PK_ID";

const MAX_HEXDUMP_LEN: usize = 1000;

/// Row debug checksum: the low half of xxh3.
pub fn checksum(data: &[u8]) -> u32 {
	xxh3_64(data) as u32
}

fn unpack_header_size(tag: u8) -> Option<usize> {
	match tag {
		UNPACK_DATA_TAG => Some(UNPACK_HEADER_SIZE),
		UNPACK_COVERED_DATA_TAG => Some(UNPACK_COVERED_HEADER_SIZE),
		_ => None,
	}
}

fn corrupted(reason: impl Into<String>) -> rowkey_core::Error {
	CodecError::corrupted(reason).into()
}

fn hexdump(data: &[u8]) -> String {
	let shown = data.len().min(MAX_HEXDUMP_LEN / 2);
	let mut out = String::with_capacity(shown * 2 + 2);
	for b in &data[..shown] {
		let _ = write!(out, "{:02x}", b);
	}
	if shown < data.len() {
		out.push_str("..");
	}
	out
}

/// Persistent attributes of an index, as stored in the dictionary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexInfo {
	pub id: IndexId,
	pub dict_version: u16,
	pub index_type: IndexType,
	pub kv_version: u16,
	pub flags: u32,
	pub ttl_duration: u64,
}

/// Controls for [`IndexDef::pack_record`].
#[derive(Debug, Clone, Default)]
pub struct PackOptions {
	/// Pack only the first `n` key parts. `None` or `Some(0)` packs all of
	/// them, including the primary key tail.
	pub n_key_parts: Option<usize>,
	/// Row id for tables with a hidden primary key. Without it the hidden
	/// key part is left out.
	pub hidden_pk_id: Option<u64>,
	pub unpack_info: bool,
	/// Append row debug checksums to the unpack info of secondary entries.
	pub store_checksums: bool,
	/// TTL timestamp written into the TTL flag field.
	pub ttl_bytes: Option<[u8; 8]>,
}

impl PackOptions {
	pub fn with_unpack_info(mut self) -> Self {
		self.unpack_info = true;
		self
	}

	pub fn with_key_parts(mut self, n: usize) -> Self {
		self.n_key_parts = Some(n);
		self
	}

	pub fn with_hidden_pk_id(mut self, id: u64) -> Self {
		self.hidden_pk_id = Some(id);
		self
	}

	pub fn with_checksums(mut self) -> Self {
		self.store_checksums = true;
		self
	}

	pub fn with_ttl_bytes(mut self, ttl: [u8; 8]) -> Self {
		self.ttl_bytes = Some(ttl);
		self
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackedKey {
	pub key: Vec<u8>,
	pub unpack_info: Option<Vec<u8>>,
	pub n_null_fields: usize,
	/// Byte offset of the TTL column inside the key.
	pub ttl_pk_offset: Option<usize>,
}

#[derive(Debug)]
struct Layout {
	packers: Vec<FieldPacker>,
	/// For each part, its position in the primary key.
	pk_part_no: Vec<Option<usize>>,
	pk_key_parts: usize,
	/// Parts declared by the user, without the primary key tail.
	user_key_parts: usize,
	ttl_column: Option<usize>,
	ttl_pk_key_part: Option<usize>,
	max_length: usize,
	max_part_len: usize,
}

/// One index of one table. The byte layout is derived from the table
/// schema on first use and cached.
#[derive(Debug)]
pub struct IndexDef {
	info: IndexInfo,
	keyno: Option<usize>,
	name: String,
	schema: Arc<TableSchema>,
	config: CodecConfig,
	is_reverse_cf: bool,
	is_per_partition_cf: bool,
	total_flags_len: usize,
	stats: Mutex<IndexStats>,
	layout: OnceCell<Layout>,
}

impl IndexDef {
	/// `keyno` is the position of the key in `schema.keys`, `None` for the
	/// hidden primary key.
	pub fn new(info: IndexInfo, keyno: Option<usize>, schema: Arc<TableSchema>) -> Self {
		let name = match keyno {
			Some(keyno) => schema.keys.get(keyno).map(|key| key.name.clone()).unwrap_or_default(),
			None => HIDDEN_PK_NAME.to_string(),
		};
		Self {
			info,
			keyno,
			name,
			schema,
			config: CodecConfig::default(),
			is_reverse_cf: false,
			is_per_partition_cf: false,
			total_flags_len: flags::total_flags_length(info.flags),
			stats: Mutex::new(IndexStats::new(info.id)),
			layout: OnceCell::new(),
		}
	}

	pub fn with_config(mut self, config: CodecConfig) -> Self {
		self.config = config;
		self
	}

	pub fn with_reverse_cf(mut self, reverse: bool) -> Self {
		self.is_reverse_cf = reverse;
		self
	}

	pub fn with_per_partition_cf(mut self, per_partition: bool) -> Self {
		self.is_per_partition_cf = per_partition;
		self
	}

	pub fn with_stats(self, stats: IndexStats) -> Self {
		*self.stats.lock() = stats;
		self
	}

	pub fn info(&self) -> &IndexInfo {
		&self.info
	}

	pub fn id(&self) -> IndexId {
		self.info.id
	}

	pub fn index_number(&self) -> u32 {
		self.info.id.index_id
	}

	pub fn index_type(&self) -> IndexType {
		self.info.index_type
	}

	pub fn kv_version(&self) -> u16 {
		self.info.kv_version
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	pub fn keyno(&self) -> Option<usize> {
		self.keyno
	}

	pub fn schema(&self) -> &Arc<TableSchema> {
		&self.schema
	}

	pub fn is_primary(&self) -> bool {
		self.info.index_type.is_primary()
	}

	pub fn is_secondary(&self) -> bool {
		self.info.index_type == IndexType::Secondary
	}

	pub fn is_reverse_cf(&self) -> bool {
		self.is_reverse_cf
	}

	pub fn is_per_partition_cf(&self) -> bool {
		self.is_per_partition_cf
	}

	pub fn has_ttl(&self) -> bool {
		self.info.ttl_duration > 0
	}

	pub fn has_index_flag(&self, flag: IndexFlag) -> bool {
		flag.is_set(self.info.flags)
	}

	pub fn stats(&self) -> IndexStats {
		self.stats.lock().clone()
	}

	pub fn set_stats(&self, stats: IndexStats) {
		*self.stats.lock() = stats;
	}

	/// Applies `f` to the statistics under the lock.
	pub fn update_stats<R>(&self, f: impl FnOnce(&mut IndexStats) -> R) -> R {
		f(&mut self.stats.lock())
	}

	/// Old indexes use the `255 - padding` variable-length groups.
	pub fn use_legacy_varbinary_format(&self) -> bool {
		!self.info.index_type.format_at_least(self.info.kv_version, format::PRIMARY_UPDATE2, format::SECONDARY_UPDATE2)
	}

	pub fn use_covered_bitmap_format(&self) -> bool {
		self.is_secondary() && self.info.kv_version >= format::SECONDARY_UPDATE3
	}

	/// Computes the byte layout now instead of on first use.
	pub fn setup(&self) -> Result<()> {
		self.layout().map(|_| ())
	}

	fn layout(&self) -> Result<&Layout> {
		self.layout.get_or_try_init(|| self.build_layout())
	}

	#[instrument(name = "codec::index::setup", level = "debug", skip(self), fields(index = %self.info.id))]
	fn build_layout(&self) -> Result<Layout> {
		let schema = &self.schema;
		let hidden_pk_exists = schema.has_hidden_pk();
		let format = FieldFormat {
			legacy_varbinary: self.use_legacy_varbinary_format(),
			covered_bitmap: self.use_covered_bitmap_format(),
			unknown_collation_index_only: self.config.unknown_collation_index_only,
		};
		// validated when the table was created
		let ttl_column = qualifier::ttl_column(schema).unwrap_or(None);

		let mut packers = Vec::new();
		let mut pk_part_no = Vec::new();
		let mut pk_key_parts = 0;
		let user_key_parts;

		if self.info.index_type == IndexType::HiddenPrimary {
			packers.push(FieldPacker::hidden_pk());
			pk_part_no.push(None);
			user_key_parts = 1;
		} else {
			let Some(key) = self.keyno.and_then(|keyno| schema.keys.get(keyno)) else {
				return Err(internal_error!("index {} has no key definition in `{}`", self.info.id, schema.name).into());
			};
			user_key_parts = key.parts.len();
			let pk = if self.is_secondary() { schema.primary_key() } else { None };

			let mut parts: Vec<(usize, Option<u32>, Option<usize>)> = key
				.parts
				.iter()
				.map(|part| {
					let pk_no = pk.and_then(|pk| pk.parts.iter().position(|p| p.column == part.column));
					(part.column, part.prefix_len, pk_no)
				})
				.collect();

			if self.is_secondary() {
				match pk {
					Some(pk) => {
						pk_key_parts = pk.parts.len();
						for (pk_no, pk_part) in pk.parts.iter().enumerate() {
							let present = key
								.parts
								.iter()
								.any(|p| p.column == pk_part.column && p.prefix_len == pk_part.prefix_len);
							if !present {
								parts.push((pk_part.column, pk_part.prefix_len, Some(pk_no)));
							}
						}
					}
					None if hidden_pk_exists => pk_key_parts = 1,
					None => {}
				}
			}

			for (column_no, prefix_len, pk_no) in parts {
				let Some(column) = schema.columns.get(column_no) else {
					return_error!(CodecError::UnsupportedColumn {
						column: format!("#{}", column_no),
						reason: format!("key `{}` refers to a missing column", key.name),
					});
				};
				packers.push(FieldPacker::new(column_no, column, prefix_len, &format)?);
				pk_part_no.push(pk_no);
			}

			if self.is_secondary() && hidden_pk_exists {
				packers.push(FieldPacker::hidden_pk());
				pk_part_no.push(Some(0));
			}
		}

		let mut max_length = INDEX_NUMBER_SIZE;
		let mut max_part_len = 0;
		let mut ttl_pk_key_part = None;
		for (i, packer) in packers.iter().enumerate() {
			max_length += packer.max_image_len() + usize::from(packer.maybe_null());
			max_part_len = max_part_len.max(packer.max_image_len());
			if ttl_column.is_some() && packer.column() == ttl_column {
				ttl_pk_key_part = Some(i);
			}
		}

		debug!(name = %self.name, parts = packers.len(), max_length, "index layout ready");
		Ok(Layout {
			packers,
			pk_part_no,
			pk_key_parts,
			user_key_parts,
			ttl_column,
			ttl_pk_key_part,
			max_length,
			max_part_len,
		})
	}

	/// Number of key parts, including the primary key tail.
	pub fn key_parts(&self) -> Result<usize> {
		Ok(self.layout()?.packers.len())
	}

	pub fn field_packers(&self) -> Result<&[FieldPacker]> {
		Ok(&self.layout()?.packers)
	}

	/// Upper bound of a packed key.
	pub fn max_storage_fmt_length(&self) -> Result<usize> {
		Ok(self.layout()?.max_length)
	}

	pub fn max_part_len(&self) -> Result<usize> {
		Ok(self.layout()?.max_part_len)
	}

	pub fn ttl_column(&self) -> Result<Option<usize>> {
		Ok(self.layout()?.ttl_column)
	}

	/// Packs the index columns of `row` into a key and, on request, the
	/// unpack info needed to restore them.
	pub fn pack_record(&self, row: &[Value], opts: &PackOptions) -> Result<PackedKey> {
		let layout = self.layout()?;
		let hidden_pk_exists = self.schema.has_hidden_pk();
		let total_parts = layout.packers.len();
		let n_key_parts = match opts.n_key_parts {
			Some(n) if n != 0 => n.min(total_parts),
			_ if hidden_pk_exists && opts.hidden_pk_id.is_none() => total_parts.saturating_sub(1),
			_ => total_parts,
		};
		let parts = &layout.packers[..n_key_parts];

		let mut key = NetWriter::with_capacity(layout.max_length);
		key.write_u32(self.info.id.index_id);

		let store_covered_bitmap =
			opts.unpack_info && self.use_covered_bitmap_format() && parts.iter().any(|p| !p.covered());
		let tag = if store_covered_bitmap { UNPACK_COVERED_DATA_TAG } else { UNPACK_DATA_TAG };

		let mut unpack = opts.unpack_info.then(NetWriter::new);
		let mut unpack_start = 0;
		let mut covered_bitmap_pos = None;
		if let Some(side) = unpack.as_mut() {
			if self.is_secondary() && self.total_flags_len > 0 {
				side.allocate(self.total_flags_len);
				if let (true, Some(ttl)) = (self.has_ttl(), opts.ttl_bytes) {
					let (offset, len) = flags::index_flag_offset(self.info.flags, Some(IndexFlag::Ttl));
					side.write_at(offset, &ttl[..len]);
				}
			}
			unpack_start = side.len();
			side.write_u8(tag);
			// patched once the length is known
			side.write_u16(0);
			if store_covered_bitmap {
				covered_bitmap_pos = Some(side.allocate(2));
			}
		}

		let mut covered_bits: u16 = 0;
		let mut bitmap_pos = 0;
		let mut n_null_fields = 0;
		let mut ttl_pk_offset = None;

		for (i, packer) in parts.iter().enumerate() {
			let Some(column) = packer.column() else {
				let Some(id) = opts.hidden_pk_id else {
					return Err(internal_error!("index {} needs a hidden primary key id", self.info.id).into());
				};
				packer.pack_hidden_pk(id, &mut key);
				break;
			};
			let Some(value) = row.get(column) else {
				return Err(internal_error!("row has {} columns, key part needs column {}", row.len(), column).into());
			};

			if self.has_ttl() && layout.ttl_pk_key_part == Some(i) {
				ttl_pk_offset = Some(key.len());
			}

			if packer.pack_field(value, &mut key, unpack.as_mut())? {
				n_null_fields += 1;
			}

			if store_covered_bitmap && packer.needs_covered_bit() && bitmap_pos < MAX_REF_PARTS {
				let data_len = value.as_bytes().map_or(0, <[u8]>::len);
				if packer.can_unpack() && data_len <= packer.key_length() {
					covered_bits |= 1 << bitmap_pos;
				}
				bitmap_pos += 1;
			}
		}

		let unpack_info = match unpack {
			None => None,
			Some(mut side) => {
				let len = side.len() - unpack_start;
				let Ok(len16) = u16::try_from(len) else {
					return Err(internal_error!("unpack info of {} bytes does not fit its header", len).into());
				};
				// secondary entries without side data need no value at all
				if self.is_secondary() && unpack_header_size(tag) == Some(len) && covered_bits == 0 {
					side.truncate(unpack_start);
				} else {
					side.write_u16_at(unpack_start + 1, len16);
					if let Some(pos) = covered_bitmap_pos {
						side.write_u16_at(pos, covered_bits);
					}
				}

				if self.is_secondary() && (opts.store_checksums || self.config.store_row_debug_checksums) {
					let key_crc = checksum(key.as_slice());
					let value_crc = checksum(side.as_slice());
					side.write_u8(CHECKSUM_DATA_TAG);
					side.write_u32(key_crc);
					side.write_u32(value_crc);
				}
				Some(side.into_inner())
			}
		};

		Ok(PackedKey {
			key: key.into_inner(),
			unpack_info,
			n_null_fields,
			ttl_pk_offset,
		})
	}

	/// Key of a hidden primary key index.
	pub fn pack_hidden_pk(&self, hidden_pk_id: u64) -> Result<Vec<u8>> {
		let layout = self.layout()?;
		let Some(packer) = layout.packers.first().filter(|p| p.is_hidden_pk()) else {
			return Err(internal_error!("index {} is not a hidden primary key", self.info.id).into());
		};
		let mut key = NetWriter::with_capacity(layout.max_length);
		key.write_u32(self.info.id.index_id);
		packer.pack_hidden_pk(hidden_pk_id, &mut key);
		Ok(key.into_inner())
	}

	/// Packs the leading key parts given in key order, for range bounds.
	/// An empty tuple yields the bare index number.
	pub fn pack_index_tuple(&self, key_values: &[Value]) -> Result<Vec<u8>> {
		let layout = self.layout()?;
		if key_values.is_empty() {
			return Ok(self.info.id.index_id.to_be_bytes().to_vec());
		}
		let mut row = vec![Value::Null; self.schema.columns.len()];
		let mut opts = PackOptions::default().with_key_parts(key_values.len());
		for (packer, value) in layout.packers.iter().zip(key_values) {
			match (packer.column(), value) {
				(Some(column), value) => row[column] = value.clone(),
				(None, Value::UInt(id)) => opts.hidden_pk_id = Some(*id),
				(None, Value::Int(id)) if *id >= 0 => opts.hidden_pk_id = Some(*id as u64),
				(None, _) => return_error!(CodecError::TypeMismatch {
					column: HIDDEN_PK_NAME.to_string(),
					expected: "unsigned integer",
				}),
			}
		}
		Ok(self.pack_record(&row, &opts)?.key)
	}

	fn skip_index_number(reader: &mut NetReader<'_>) -> Result<()> {
		match reader.read(INDEX_NUMBER_SIZE) {
			Some(_) => Ok(()),
			None => Err(corrupted("key is shorter than an index number")),
		}
	}

	/// Restores the columns stored in an index entry. Columns the entry
	/// cannot restore stay `None`.
	pub fn unpack_record(&self, key: &[u8], unpack_info: Option<&[u8]>) -> Result<PartialRow> {
		let layout = self.layout()?;
		let info = unpack_info.unwrap_or_default();
		let mut reader = NetReader::new(key);
		let mut side = NetReader::new(info);
		Self::skip_index_number(&mut reader)?;

		// flag fields, unpack data and checksums, in that order, each optional
		if side.remaining() > 0
			&& self.is_secondary()
			&& self.total_flags_len > 0
			&& side.read(self.total_flags_len).is_none()
		{
			return Err(corrupted("unpack info ends inside the index flag fields"));
		}

		let header = side.peek_u8().and_then(|tag| unpack_header_size(tag).map(|size| (tag, size)));
		let mut covered_bits = None;
		if let Some((tag, size)) = header {
			let Some(bytes) = side.read(size) else {
				return Err(corrupted("unpack info ends inside its header"));
			};
			if tag == UNPACK_COVERED_DATA_TAG {
				covered_bits = Some(u16::from_be_bytes([bytes[3], bytes[4]]));
			}
		}
		let has_unpack_info = header.is_some();

		let mut row: PartialRow = vec![None; self.schema.columns.len()];
		let mut bitmap_pos = 0;
		for packer in &layout.packers {
			let Some(column) = packer.column() else {
				packer.skip_field(&mut reader)?;
				continue;
			};

			let mut covered = true;
			if let (Some(bits), true) = (covered_bits, packer.needs_covered_bit()) {
				covered = bitmap_pos < MAX_REF_PARTS && bits & (1 << bitmap_pos) != 0;
				bitmap_pos += 1;
			}

			if !packer.can_unpack() {
				packer.skip_field(&mut reader)?;
				continue;
			}
			// restorable parts are always decoded so their side data is consumed
			let value = if has_unpack_info {
				packer.unpack_field(&mut reader, &mut side)?
			} else {
				packer.unpack_field(&mut reader, &mut NetReader::empty())?
			};
			if covered && column < row.len() {
				row[column] = Some(value);
			}
		}

		if side.peek_u8() == Some(CHECKSUM_DATA_TAG) {
			side.read_u8();
			let (Some(stored_key), Some(stored_value)) = (side.read_u32(), side.read_u32()) else {
				return Err(corrupted("unpack info ends inside the checksums"));
			};
			if self.config.verify_row_debug_checksums {
				self.verify_checksum(true, key, stored_key)?;
				self.verify_checksum(false, &info[..info.len() - CHECKSUM_CHUNK_SIZE], stored_value)?;
			}
		}

		if reader.remaining() != 0 {
			return Err(corrupted(format!("{} unexpected bytes after the last key part", reader.remaining())));
		}
		if side.remaining() != 0 {
			return Err(corrupted(format!("{} unexpected bytes after the unpack info", side.remaining())));
		}
		Ok(row)
	}

	fn verify_checksum(&self, is_key: bool, data: &[u8], stored: u32) -> Result<()> {
		let computed = checksum(data);
		if computed == stored {
			return Ok(());
		}
		error!(
			index = %self.info.id,
			part = if is_key { "key" } else { "value" },
			len = data.len(),
			data = %hexdump(data),
			"checksum mismatch in key-value pair"
		);
		return_error!(CodecError::ChecksumMismatch {
			is_key,
			stored,
			computed,
		})
	}

	/// Index of the first key part whose encoding differs, `None` when both
	/// keys are equal part by part.
	pub fn compare_keys(&self, key1: &[u8], key2: &[u8]) -> Result<Option<usize>> {
		let layout = self.layout()?;
		let mut reader1 = NetReader::new(key1);
		let mut reader2 = NetReader::new(key2);
		Self::skip_index_number(&mut reader1)?;
		Self::skip_index_number(&mut reader2)?;

		for (i, packer) in layout.packers.iter().enumerate() {
			if packer.maybe_null() {
				let (Some(null1), Some(null2)) = (reader1.read_u8(), reader2.read_u8()) else {
					return Err(corrupted("key ends before a NULL marker"));
				};
				if null1 != null2 {
					return Ok(Some(i));
				}
				if null1 == 0 {
					continue;
				}
			}
			let start1 = reader1.position();
			let start2 = reader2.position();
			packer.skip_image(&mut reader1)?;
			packer.skip_image(&mut reader2)?;
			if reader1.consumed_since(start1) != reader2.consumed_since(start2) {
				return Ok(Some(i));
			}
		}
		Ok(None)
	}

	/// Length of the key at the start of a zero-padded buffer.
	pub fn key_length(&self, key: &[u8]) -> Result<usize> {
		let layout = self.layout()?;
		let mut reader = NetReader::new(key);
		Self::skip_index_number(&mut reader)?;
		for packer in &layout.packers {
			packer.skip_field(&mut reader)?;
		}
		Ok(reader.position())
	}

	/// Mem-comparable primary key, index number included, cut out of a
	/// secondary key.
	pub fn get_primary_key_tuple(&self, pk: &IndexDef, key: &[u8]) -> Result<Vec<u8>> {
		if !self.is_secondary() {
			return Err(internal_error!("index {} is not a secondary index", self.info.id).into());
		}
		let layout = self.layout()?;
		let mut reader = NetReader::new(key);
		Self::skip_index_number(&mut reader)?;

		let mut pk_parts: Vec<Option<&[u8]>> = vec![None; layout.pk_key_parts];
		for (packer, pk_no) in layout.packers.iter().zip(&layout.pk_part_no) {
			let start = reader.position();
			packer.skip_field(&mut reader)?;
			if let Some(slot) = pk_no.and_then(|no| pk_parts.get_mut(no)) {
				*slot = Some(reader.consumed_since(start));
			}
		}

		let mut out = NetWriter::with_capacity(key.len());
		out.write_u32(pk.index_number());
		for part in pk_parts {
			match part {
				Some(part) => out.write(part),
				None => return Err(internal_error!("index {} lacks a primary key part", self.info.id).into()),
			}
		}
		Ok(out.into_inner())
	}

	/// The user declared parts of a secondary key, index number included,
	/// and how many of them are NULL.
	pub fn get_memcmp_sk_parts(&self, key: &[u8]) -> Result<(Vec<u8>, usize)> {
		let layout = self.layout()?;
		let mut reader = NetReader::new(key);
		Self::skip_index_number(&mut reader)?;

		let mut n_null_fields = 0;
		for packer in &layout.packers[..layout.user_key_parts.min(layout.packers.len())] {
			if packer.maybe_null() && reader.peek_u8() == Some(0) {
				n_null_fields += 1;
			}
			packer.skip_field(&mut reader)?;
		}
		Ok((reader.consumed_since(0).to_vec(), n_null_fields))
	}

	/// True when the unpack info ends with row debug checksums.
	pub fn unpack_info_has_checksum(&self, unpack_info: &[u8]) -> bool {
		let mut rest = unpack_info;
		if self.is_secondary() && self.total_flags_len > 0 {
			rest = rest.get(self.total_flags_len..).unwrap_or_default();
		}
		if let Some(size) = rest.first().and_then(|tag| unpack_header_size(*tag)) {
			if rest.len() >= size {
				let len = u16::from_be_bytes([rest[1], rest[2]]) as usize;
				rest = rest.get(len..).unwrap_or_default();
			}
		}
		rest.len() == CHECKSUM_CHUNK_SIZE && rest[0] == CHECKSUM_DATA_TAG
	}

	/// Bits of the covered bitmap a lookup reading `read_set` (by column)
	/// needs. `None` when the lookup can never be served from this index.
	pub fn get_lookup_bitmap(&self, read_set: &[bool]) -> Result<Option<u16>> {
		let layout = self.layout()?;
		let mut map: u16 = 0;
		let mut pos = 0;
		let mut maybe_covered = vec![false; read_set.len()];

		for packer in &layout.packers {
			let Some(column) = packer.column() else {
				continue;
			};
			let requested = read_set.get(column).copied().unwrap_or(false);
			if packer.covered() {
				if requested {
					maybe_covered[column] = true;
				}
				continue;
			}
			if packer.is_varchar() {
				if pos >= MAX_REF_PARTS {
					return Ok(None);
				}
				if requested {
					map |= 1 << pos;
					maybe_covered[column] = true;
				}
				pos += 1;
			} else if requested {
				return Ok(None);
			}
		}

		if read_set.iter().zip(&maybe_covered).any(|(requested, covered)| *requested && !covered) {
			return Ok(None);
		}
		Ok(Some(map))
	}

	/// True when the entry holds every value the lookup needs.
	pub fn covers_lookup(&self, unpack_info: Option<&[u8]>, lookup_bitmap: Option<u16>) -> bool {
		let Some(lookup) = lookup_bitmap else {
			return false;
		};
		if !self.use_covered_bitmap_format() {
			return false;
		}
		let info = unpack_info.unwrap_or_default();
		let header = info.get(self.total_flags_len..).unwrap_or_default();
		if header.len() < UNPACK_COVERED_HEADER_SIZE || header[0] != UNPACK_COVERED_DATA_TAG {
			return false;
		}
		let covered = u16::from_be_bytes([header[3], header[4]]);
		lookup & !covered == 0
	}

	/// True when every key part can always be restored.
	pub fn can_cover_lookup(&self) -> Result<bool> {
		Ok(self.layout()?.packers.iter().all(FieldPacker::covered))
	}

	/// Increments a packed tuple in place, leaving the first byte alone.
	/// Returns how many bytes changed.
	pub fn successor(packed: &mut [u8]) -> usize {
		let mut changed = 0;
		for b in packed.iter_mut().skip(1).rev() {
			changed += 1;
			if *b != 0xff {
				*b += 1;
				break;
			}
			*b = 0;
		}
		changed
	}

	/// Decrements a packed tuple in place, leaving the first byte alone.
	pub fn predecessor(packed: &mut [u8]) -> usize {
		let mut changed = 0;
		for b in packed.iter_mut().skip(1).rev() {
			changed += 1;
			if *b != 0 {
				*b -= 1;
				break;
			}
			*b = 0xff;
		}
		changed
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::{
		ColumnDef, ColumnType, KeyDef, KeyPartDef,
		collation::{LATIN1_BIN_ID, LATIN1_SWEDISH_CI_ID},
	};

	fn info(index_id: u32, index_type: IndexType) -> IndexInfo {
		IndexInfo {
			id: IndexId::new(0, index_id),
			dict_version: 5,
			index_type,
			kv_version: index_type.latest_format(),
			flags: 0,
			ttl_duration: 0,
		}
	}

	/// `t(a INT PRIMARY KEY, b VARCHAR(10) latin1_bin, KEY kb(b))`
	fn table() -> Arc<TableSchema> {
		Arc::new(
			TableSchema::new(
				"test.t",
				vec![
					ColumnDef::new(
						"a",
						ColumnType::Int {
							unsigned: false,
						},
					)
					.not_null(),
					ColumnDef::new(
						"b",
						ColumnType::Varchar {
							length: 10,
						},
					)
					.with_collation(LATIN1_BIN_ID),
				],
			)
			.with_primary_key(KeyDef::new("PRIMARY", vec![KeyPartDef::column(0)]))
			.with_key(KeyDef::new("kb", vec![KeyPartDef::column(1)])),
		)
	}

	fn row(a: i64, b: &str) -> Vec<Value> {
		vec![Value::Int(a), Value::from(b)]
	}

	#[test]
	fn test_primary_key_image() {
		let pk = IndexDef::new(info(256, IndexType::Primary), Some(0), table());
		let packed = pk.pack_record(&row(1, "hi"), &PackOptions::default()).unwrap();
		assert_eq!(packed.key, vec![0, 0, 1, 0, 0x80, 0, 0, 1]);
		assert_eq!(packed.unpack_info, None);
		assert_eq!(pk.max_storage_fmt_length().unwrap(), 8);
	}

	#[test]
	fn test_index_extension() {
		let table = table();
		let pk = IndexDef::new(info(256, IndexType::Primary), Some(0), table.clone());
		let sk = IndexDef::new(info(257, IndexType::Secondary), Some(1), table);
		assert_eq!(sk.key_parts().unwrap(), 2);

		let packed = sk.pack_record(&row(7, "hi"), &PackOptions::default().with_unpack_info()).unwrap();
		let mut expected = vec![0, 0, 1, 1, 0x01];
		expected.extend_from_slice(b"hi      \x02");
		expected.extend_from_slice(&[0x80, 0, 0, 7]);
		assert_eq!(packed.key, expected);

		let pk_tuple = sk.get_primary_key_tuple(&pk, &packed.key).unwrap();
		assert_eq!(pk_tuple, pk.pack_record(&row(7, "zzz"), &PackOptions::default()).unwrap().key);

		let (sk_parts, nulls) = sk.get_memcmp_sk_parts(&packed.key).unwrap();
		assert_eq!(sk_parts, packed.key[..14].to_vec());
		assert_eq!(nulls, 0);

		let restored = sk.unpack_record(&packed.key, packed.unpack_info.as_deref()).unwrap();
		assert_eq!(restored, vec![Some(Value::Int(7)), Some(Value::from("hi"))]);
	}

	#[test]
	fn test_trailing_spaces_restored_from_unpack_info() {
		let sk = IndexDef::new(info(257, IndexType::Secondary), Some(1), table());
		let packed = sk.pack_record(&row(1, "ab  "), &PackOptions::default().with_unpack_info()).unwrap();
		let plain = sk.pack_record(&row(1, "ab"), &PackOptions::default().with_unpack_info()).unwrap();
		assert_eq!(packed.key, plain.key);
		assert_ne!(packed.unpack_info, plain.unpack_info);

		let restored = sk.unpack_record(&packed.key, packed.unpack_info.as_deref()).unwrap();
		assert_eq!(restored[1], Some(Value::from("ab  ")));
	}

	#[test]
	fn test_null_sorts_first_and_counts() {
		let sk = IndexDef::new(info(257, IndexType::Secondary), Some(1), table());
		let null = sk.pack_record(&vec![Value::Int(5), Value::Null], &PackOptions::default()).unwrap();
		let empty = sk.pack_record(&row(1, ""), &PackOptions::default()).unwrap();
		assert!(null.key < empty.key);
		assert_eq!(null.n_null_fields, 1);

		let (_, nulls) = sk.get_memcmp_sk_parts(&null.key).unwrap();
		assert_eq!(nulls, 1);
		let restored = sk.unpack_record(&null.key, None).unwrap();
		assert_eq!(restored, vec![Some(Value::Int(5)), Some(Value::Null)]);
	}

	#[test]
	fn test_key_part_cutoff() {
		let sk = IndexDef::new(info(257, IndexType::Secondary), Some(1), table());
		let full = sk.pack_record(&row(3, "x"), &PackOptions::default()).unwrap();
		let prefix = sk.pack_record(&row(3, "x"), &PackOptions::default().with_key_parts(1)).unwrap();
		assert!(full.key.starts_with(&prefix.key));
		assert_eq!(prefix.key.len(), 4 + 1 + 9);

		let bound = sk.pack_index_tuple(&[Value::from("x")]).unwrap();
		assert_eq!(bound, prefix.key);
		assert_eq!(sk.pack_index_tuple(&[]).unwrap(), vec![0, 0, 1, 1]);
	}

	#[test]
	fn test_compare_keys() {
		let sk = IndexDef::new(info(257, IndexType::Secondary), Some(1), table());
		let pack = |a, b| sk.pack_record(&row(a, b), &PackOptions::default()).unwrap().key;
		assert_eq!(sk.compare_keys(&pack(1, "a"), &pack(1, "a  ")).unwrap(), None);
		assert_eq!(sk.compare_keys(&pack(1, "a"), &pack(1, "b")).unwrap(), Some(0));
		assert_eq!(sk.compare_keys(&pack(1, "a"), &pack(2, "a")).unwrap(), Some(1));

		let null = sk.pack_record(&vec![Value::Int(1), Value::Null], &PackOptions::default()).unwrap().key;
		assert_eq!(sk.compare_keys(&null, &pack(1, "")).unwrap(), Some(0));
		assert!(sk.compare_keys(&[0, 0], &null).is_err());
	}

	#[test]
	fn test_corrupt_keys_are_errors() {
		let sk = IndexDef::new(info(257, IndexType::Secondary), Some(1), table());
		let packed = sk.pack_record(&row(1, "hi"), &PackOptions::default().with_unpack_info()).unwrap();

		let truncated = &packed.key[..packed.key.len() - 1];
		assert_eq!(sk.unpack_record(truncated, packed.unpack_info.as_deref()).unwrap_err().code(), "CODEC_001");

		let mut trailing = packed.key.clone();
		trailing.push(0);
		assert!(sk.unpack_record(&trailing, packed.unpack_info.as_deref()).is_err());

		let mut bad_marker = packed.key.clone();
		bad_marker[4] = 9;
		assert!(sk.unpack_record(&bad_marker, packed.unpack_info.as_deref()).is_err());
	}

	#[test]
	fn test_checksums() {
		let config = CodecConfig::default().with_store_row_debug_checksums(true).with_verify_row_debug_checksums(true);
		let sk = IndexDef::new(info(257, IndexType::Secondary), Some(1), table()).with_config(config);
		let packed = sk.pack_record(&row(1, "hi"), &PackOptions::default().with_unpack_info()).unwrap();
		let unpack_info = packed.unpack_info.clone().unwrap();
		assert!(sk.unpack_info_has_checksum(&unpack_info));
		assert!(sk.unpack_record(&packed.key, Some(&unpack_info)).is_ok());

		let mut other_key = packed.key.clone();
		let last = other_key.len() - 1;
		other_key[last] = 8;
		let err = sk.unpack_record(&other_key, Some(&unpack_info)).unwrap_err();
		assert_eq!(err.code(), "CODEC_002");

		let plain = IndexDef::new(info(257, IndexType::Secondary), Some(1), table());
		let packed = plain.pack_record(&row(1, "hi"), &PackOptions::default().with_unpack_info()).unwrap();
		assert!(!plain.unpack_info_has_checksum(packed.unpack_info.as_deref().unwrap()));
	}

	#[test]
	fn test_stray_unpack_info_bytes_are_errors() {
		let sk = IndexDef::new(info(257, IndexType::Secondary), Some(1), table());
		let packed = sk.pack_record(&row(1, "hi"), &PackOptions::default().with_unpack_info()).unwrap();
		let mut unpack_info = packed.unpack_info.clone().unwrap();
		unpack_info.push(0x7f);
		let err = sk.unpack_record(&packed.key, Some(&unpack_info)).unwrap_err();
		assert_eq!(err.code(), "CODEC_001");

		let config = CodecConfig::default().with_store_row_debug_checksums(true);
		let checked = IndexDef::new(info(257, IndexType::Secondary), Some(1), table()).with_config(config);
		let packed = checked.pack_record(&row(1, "hi"), &PackOptions::default().with_unpack_info()).unwrap();
		let unpack_info = packed.unpack_info.clone().unwrap();
		// checksums are skipped, not verified, when verification is off
		assert!(checked.unpack_record(&packed.key, Some(&unpack_info)).is_ok());

		let mut trailing = unpack_info.clone();
		trailing.push(0);
		assert_eq!(checked.unpack_record(&packed.key, Some(&trailing)).unwrap_err().code(), "CODEC_001");

		let short = &unpack_info[..unpack_info.len() - 1];
		assert_eq!(checked.unpack_record(&packed.key, Some(short)).unwrap_err().code(), "CODEC_001");
	}

	#[test]
	fn test_empty_unpack_info_is_dropped() {
		let table = Arc::new(
			TableSchema::new(
				"test.n",
				vec![
					ColumnDef::new(
						"a",
						ColumnType::BigInt {
							unsigned: false,
						},
					)
					.not_null(),
					ColumnDef::new("b", ColumnType::Double),
				],
			)
			.with_primary_key(KeyDef::new("PRIMARY", vec![KeyPartDef::column(0)]))
			.with_key(KeyDef::new("kb", vec![KeyPartDef::column(1)])),
		);
		let sk = IndexDef::new(info(300, IndexType::Secondary), Some(1), table.clone());
		let row = vec![Value::Int(-4), Value::Double(2.5)];
		let packed = sk.pack_record(&row, &PackOptions::default().with_unpack_info()).unwrap();
		assert_eq!(packed.unpack_info, Some(vec![]));
		let restored = sk.unpack_record(&packed.key, None).unwrap();
		assert_eq!(restored, vec![Some(Value::Int(-4)), Some(Value::Double(2.5))]);

		let pk = IndexDef::new(info(299, IndexType::Primary), Some(0), table);
		let packed = pk.pack_record(&row, &PackOptions::default().with_unpack_info()).unwrap();
		assert_eq!(packed.unpack_info, Some(vec![UNPACK_DATA_TAG, 0, 3]));
	}

	fn prefix_table() -> Arc<TableSchema> {
		Arc::new(
			TableSchema::new(
				"test.p",
				vec![
					ColumnDef::new(
						"id",
						ColumnType::Int {
							unsigned: true,
						},
					)
					.not_null(),
					ColumnDef::new(
						"name",
						ColumnType::Varchar {
							length: 32,
						},
					)
					.with_collation(LATIN1_SWEDISH_CI_ID),
					ColumnDef::new("n", ColumnType::Double),
				],
			)
			.with_primary_key(KeyDef::new("PRIMARY", vec![KeyPartDef::column(0)]))
			.with_key(KeyDef::new("kname", vec![KeyPartDef::prefix(1, 4)])),
		)
	}

	#[test]
	fn test_covered_bitmap() {
		let sk = IndexDef::new(info(400, IndexType::Secondary), Some(1), prefix_table());
		assert!(sk.use_covered_bitmap_format());
		assert!(!sk.can_cover_lookup().unwrap());

		let short = vec![Value::UInt(1), Value::from("Bob"), Value::Double(0.0)];
		let long = vec![Value::UInt(2), Value::from("Roberta"), Value::Double(0.0)];
		let short = sk.pack_record(&short, &PackOptions::default().with_unpack_info()).unwrap();
		let long = sk.pack_record(&long, &PackOptions::default().with_unpack_info()).unwrap();
		let short_info = short.unpack_info.clone().unwrap();
		let long_info = long.unpack_info.clone().unwrap();
		assert_eq!(&short_info[..1], &[UNPACK_COVERED_DATA_TAG]);
		assert_eq!(&short_info[3..5], &[0, 1]);
		assert_eq!(&long_info[3..5], &[0, 0]);

		let lookup = sk.get_lookup_bitmap(&[true, true, false]).unwrap();
		assert_eq!(lookup, Some(1));
		assert!(sk.covers_lookup(Some(&short_info), lookup));
		assert!(!sk.covers_lookup(Some(&long_info), lookup));
		assert_eq!(sk.get_lookup_bitmap(&[true, false, true]).unwrap(), None);

		let restored = sk.unpack_record(&short.key, Some(&short_info)).unwrap();
		assert_eq!(restored, vec![Some(Value::UInt(1)), Some(Value::from("Bob")), None]);
		let restored = sk.unpack_record(&long.key, Some(&long_info)).unwrap();
		assert_eq!(restored, vec![Some(Value::UInt(2)), None, None]);
	}

	#[test]
	fn test_old_secondary_format_never_covers_prefixes() {
		let mut old = info(400, IndexType::Secondary);
		old.kv_version = format::SECONDARY_UPDATE2;
		let sk = IndexDef::new(old, Some(1), prefix_table());
		assert!(!sk.use_covered_bitmap_format());
		let row = vec![Value::UInt(1), Value::from("Bob"), Value::Double(0.0)];
		let packed = sk.pack_record(&row, &PackOptions::default().with_unpack_info()).unwrap();
		let restored = sk.unpack_record(&packed.key, packed.unpack_info.as_deref()).unwrap();
		assert_eq!(restored, vec![Some(Value::UInt(1)), None, None]);
		assert!(!sk.covers_lookup(packed.unpack_info.as_deref(), Some(1)));
	}

	#[test]
	fn test_legacy_varbinary_format() {
		let table = Arc::new(
			TableSchema::new(
				"test.v",
				vec![
					ColumnDef::new(
						"v",
						ColumnType::Varchar {
							length: 8,
						},
					)
					.not_null(),
				],
			)
			.with_primary_key(KeyDef::new("PRIMARY", vec![KeyPartDef::column(0)])),
		);
		let mut old = info(500, IndexType::Primary);
		old.kv_version = format::PRIMARY_UPDATE1;
		let legacy = IndexDef::new(old, Some(0), table.clone());
		let current = IndexDef::new(info(500, IndexType::Primary), Some(0), table);
		assert!(legacy.use_legacy_varbinary_format());

		let row = vec![Value::from("abcdefgh")];
		let legacy_key = legacy.pack_record(&row, &PackOptions::default()).unwrap().key;
		let current_key = current.pack_record(&row, &PackOptions::default()).unwrap().key;
		assert_eq!(legacy_key.len(), 4 + 18);
		assert_eq!(current_key.len(), 4 + 9);
		assert_eq!(legacy.unpack_record(&legacy_key, None).unwrap(), vec![Some(Value::from("abcdefgh"))]);
		assert_eq!(current.unpack_record(&current_key, None).unwrap(), vec![Some(Value::from("abcdefgh"))]);
	}

	fn hidden_table() -> Arc<TableSchema> {
		Arc::new(
			TableSchema::new(
				"test.h",
				vec![ColumnDef::new(
					"c",
					ColumnType::SmallInt {
						unsigned: false,
					},
				)],
			)
			.with_key(KeyDef::new("kc", vec![KeyPartDef::column(0)])),
		)
	}

	#[test]
	fn test_hidden_primary_key() {
		let table = hidden_table();
		let pk = IndexDef::new(info(600, IndexType::HiddenPrimary), None, table.clone());
		let sk = IndexDef::new(info(601, IndexType::Secondary), Some(0), table);
		assert_eq!(pk.name(), HIDDEN_PK_NAME);

		let pk_key = pk.pack_hidden_pk(42).unwrap();
		assert_eq!(pk_key, vec![0, 0, 2, 0x58, 0, 0, 0, 0, 0, 0, 0, 42]);
		assert_eq!(pk.unpack_record(&pk_key, None).unwrap(), vec![None]);

		let row = vec![Value::Int(-1)];
		let with_id = sk.pack_record(&row, &PackOptions::default().with_hidden_pk_id(42)).unwrap();
		assert_eq!(with_id.key, vec![0, 0, 2, 0x59, 1, 0x7f, 0xff, 0, 0, 0, 0, 0, 0, 0, 42]);
		let without_id = sk.pack_record(&row, &PackOptions::default()).unwrap();
		assert_eq!(without_id.key, with_id.key[..7].to_vec());

		assert_eq!(sk.get_primary_key_tuple(&pk, &with_id.key).unwrap(), pk_key);
		assert_eq!(sk.unpack_record(&with_id.key, None).unwrap(), vec![Some(Value::Int(-1))]);
		assert!(sk.pack_hidden_pk(1).is_err());
	}

	#[test]
	fn test_ttl_flag_and_offset() {
		let table = Arc::new(
			TableSchema::new(
				"test.ttl",
				vec![
					ColumnDef::new(
						"ts",
						ColumnType::BigInt {
							unsigned: true,
						},
					)
					.not_null(),
					ColumnDef::new(
						"v",
						ColumnType::Int {
							unsigned: false,
						},
					),
				],
			)
			.with_primary_key(KeyDef::new("PRIMARY", vec![KeyPartDef::column(1), KeyPartDef::column(0)]))
			.with_key(KeyDef::new("kv", vec![KeyPartDef::column(1)]))
			.with_comment("ttl_duration=60;ttl_col=ts"),
		);
		let mut pk_info = info(700, IndexType::Primary);
		pk_info.ttl_duration = 60;
		pk_info.flags = IndexFlag::Ttl.bit();
		let pk = IndexDef::new(pk_info, Some(0), table.clone());
		let row = vec![Value::UInt(1_700_000_000), Value::Int(3)];
		let packed = pk.pack_record(&row, &PackOptions::default()).unwrap();
		assert_eq!(packed.ttl_pk_offset, Some(4 + 1 + 4));
		assert_eq!(pk.ttl_column().unwrap(), Some(0));

		let mut sk_info = info(701, IndexType::Secondary);
		sk_info.ttl_duration = 60;
		sk_info.flags = IndexFlag::Ttl.bit();
		let sk = IndexDef::new(sk_info, Some(1), table);
		let ttl = 1_700_000_000u64.to_be_bytes();
		let packed = sk.pack_record(&row, &PackOptions::default().with_unpack_info().with_ttl_bytes(ttl)).unwrap();
		let unpack_info = packed.unpack_info.clone().unwrap();
		assert_eq!(&unpack_info[..8], &ttl);
		assert_eq!(
			sk.unpack_record(&packed.key, Some(&unpack_info)).unwrap(),
			vec![Some(Value::UInt(1_700_000_000)), Some(Value::Int(3))]
		);
	}

	#[test]
	fn test_key_length_of_padded_buffer() {
		let sk = IndexDef::new(info(257, IndexType::Secondary), Some(1), table());
		let mut key = sk.pack_record(&row(9, "abc"), &PackOptions::default()).unwrap().key;
		let len = key.len();
		key.extend_from_slice(&[0; 6]);
		assert_eq!(sk.key_length(&key).unwrap(), len);
	}

	#[test]
	fn test_successor_and_predecessor() {
		let mut key = vec![0x00, 0x01, 0xff, 0xff];
		assert_eq!(IndexDef::successor(&mut key), 3);
		assert_eq!(key, vec![0x00, 0x02, 0x00, 0x00]);
		assert_eq!(IndexDef::predecessor(&mut key), 3);
		assert_eq!(key, vec![0x00, 0x01, 0xff, 0xff]);

		let mut top = vec![0x07, 0xff];
		assert_eq!(IndexDef::successor(&mut top), 1);
		assert_eq!(top, vec![0x07, 0x00]);
	}

	#[test]
	fn test_missing_key_definition() {
		let sk = IndexDef::new(info(800, IndexType::Secondary), Some(9), table());
		assert_eq!(sk.setup().unwrap_err().code(), "INTERNAL_001");
	}
}
