// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

//! Values of the dictionary records. Each starts with a 2 byte version.

use rowkey_codec::{IndexFlag, IndexInfo, IndexType, format::PRIMARY_TTL};
use rowkey_core::{
	IndexId, Result,
	error::diagnostic::dictionary::DictionaryError,
	netbuf::{NetReader, NetWriter},
	return_error,
};

pub const INDEX_INFO_VERSION_INITIAL: u16 = 1;
/// Adds the key format version.
pub const INDEX_INFO_VERSION_KV_FORMAT: u16 = 2;
/// The key format is validated at startup.
pub const INDEX_INFO_VERSION_VERIFY_KV_FORMAT: u16 = 3;
pub const INDEX_INFO_VERSION_TTL: u16 = 4;
pub const INDEX_INFO_VERSION_FIELD_FLAGS: u16 = 5;
pub const INDEX_INFO_VERSION_LATEST: u16 = INDEX_INFO_VERSION_FIELD_FLAGS;

pub const DDL_ENTRY_VERSION: u16 = 1;
pub const CF_DEFINITION_VERSION: u16 = 1;
pub const MAX_INDEX_ID_VERSION: u16 = 1;
pub const ONGOING_INDEX_VERSION: u16 = 1;
pub const AUTO_INCREMENT_VERSION: u16 = 1;

/// Column family flags.
pub const REVERSE_CF_FLAG: u32 = 1;
/// No longer written. Reported when found.
pub const AUTO_CF_FLAG: u32 = 2;
pub const PER_PARTITION_CF_FLAG: u32 = 4;

fn invalid_size(record: &'static str, data: &[u8]) -> DictionaryError {
	DictionaryError::InvalidRecordSize {
		record,
		size: data.len(),
	}
}

/// `[version][index type:1][kv version:2][flags:4][ttl duration:8]`
pub fn encode_index_info(info: &IndexInfo) -> Vec<u8> {
	let mut out = NetWriter::with_capacity(17);
	out.write_u16(INDEX_INFO_VERSION_LATEST);
	out.write_u8(info.index_type.as_u8());
	out.write_u16(info.kv_version);
	out.write_u32(info.flags);
	out.write_u64(info.ttl_duration);
	out.into_inner()
}

pub fn decode_index_info(id: IndexId, data: &[u8]) -> Result<IndexInfo> {
	const RECORD: &str = "index info";
	let mut reader = NetReader::new(data);
	let version = reader.read_u16().ok_or_else(|| invalid_size(RECORD, data))?;
	let expected = match version {
		INDEX_INFO_VERSION_FIELD_FLAGS => Some(17),
		INDEX_INFO_VERSION_TTL => Some(13),
		INDEX_INFO_VERSION_KV_FORMAT | INDEX_INFO_VERSION_VERIFY_KV_FORMAT => None,
		_ => return_error!(DictionaryError::UnknownVersion {
			record: RECORD,
			version,
		}),
	};
	if expected.is_some_and(|len| len != data.len()) {
		return Err(invalid_size(RECORD, data).into());
	}

	let raw_type = reader.read_u8().ok_or_else(|| invalid_size(RECORD, data))?;
	let kv_version = reader.read_u16().ok_or_else(|| invalid_size(RECORD, data))?;
	let mut flags = 0;
	let mut ttl_duration = 0;
	match version {
		INDEX_INFO_VERSION_FIELD_FLAGS => {
			flags = reader.read_u32().ok_or_else(|| invalid_size(RECORD, data))?;
			ttl_duration = reader.read_u64().ok_or_else(|| invalid_size(RECORD, data))?;
		}
		INDEX_INFO_VERSION_TTL => {
			ttl_duration = reader.read_u64().ok_or_else(|| invalid_size(RECORD, data))?;
			if kv_version == PRIMARY_TTL && ttl_duration > 0 {
				flags = IndexFlag::Ttl.bit();
			}
		}
		_ => {}
	}

	let Some(index_type) = IndexType::from_u8(raw_type) else {
		return_error!(DictionaryError::UnknownIndexType {
			index_id: id,
			index_type: raw_type,
		});
	};
	if kv_version > index_type.latest_format() {
		return_error!(DictionaryError::FormatTooNew {
			index_id: id,
			kv_version,
			supported: index_type.latest_format(),
		});
	}

	Ok(IndexInfo {
		id,
		dict_version: version,
		index_type,
		kv_version,
		flags,
		ttl_duration,
	})
}

/// `[version]{[cf id:4][index number:4]}*`
pub fn encode_ddl_entry(ids: &[IndexId]) -> Vec<u8> {
	let mut out = NetWriter::with_capacity(2 + 8 * ids.len());
	out.write_u16(DDL_ENTRY_VERSION);
	for id in ids {
		out.write(&id.to_bytes());
	}
	out.into_inner()
}

pub fn decode_ddl_entry(data: &[u8]) -> Result<Vec<IndexId>> {
	const RECORD: &str = "ddl entry";
	let mut reader = NetReader::new(data);
	let version = reader.read_u16().ok_or_else(|| invalid_size(RECORD, data))?;
	if version != DDL_ENTRY_VERSION {
		return_error!(DictionaryError::UnknownVersion {
			record: RECORD,
			version,
		});
	}
	if reader.remaining() % 8 != 0 {
		return Err(invalid_size(RECORD, data).into());
	}
	let mut ids = Vec::with_capacity(reader.remaining() / 8);
	while let Some(raw) = reader.read(8) {
		ids.push(IndexId::from_bytes(raw).ok_or_else(|| invalid_size(RECORD, data))?);
	}
	Ok(ids)
}

/// `[version][flags:4]`
pub fn encode_cf_flags(flags: u32) -> Vec<u8> {
	let mut out = NetWriter::with_capacity(6);
	out.write_u16(CF_DEFINITION_VERSION);
	out.write_u32(flags);
	out.into_inner()
}

pub fn decode_cf_flags(data: &[u8]) -> Result<u32> {
	versioned_u32("cf definition", CF_DEFINITION_VERSION, data)
}

/// `[version][max index number:4]`
pub fn encode_max_index_id(index_number: u32) -> Vec<u8> {
	let mut out = NetWriter::with_capacity(6);
	out.write_u16(MAX_INDEX_ID_VERSION);
	out.write_u32(index_number);
	out.into_inner()
}

pub fn decode_max_index_id(data: &[u8]) -> Result<u32> {
	versioned_u32("max index id", MAX_INDEX_ID_VERSION, data)
}

fn versioned_u32(record: &'static str, expected: u16, data: &[u8]) -> Result<u32> {
	let mut reader = NetReader::new(data);
	let version = reader.read_u16().ok_or_else(|| invalid_size(record, data))?;
	if version != expected {
		return_error!(DictionaryError::UnknownVersion {
			record,
			version,
		});
	}
	let value = reader.read_u32().ok_or_else(|| invalid_size(record, data))?;
	if reader.remaining() != 0 {
		return Err(invalid_size(record, data).into());
	}
	Ok(value)
}

/// Value of an ongoing create or drop marker, a bare version.
pub fn encode_ongoing() -> Vec<u8> {
	ONGOING_INDEX_VERSION.to_be_bytes().to_vec()
}

/// `[version][value:8]`
pub fn encode_auto_incr(value: u64) -> Vec<u8> {
	let mut out = NetWriter::with_capacity(10);
	out.write_u16(AUTO_INCREMENT_VERSION);
	out.write_u64(value);
	out.into_inner()
}

/// Versions up to the current one are readable.
pub fn decode_auto_incr(data: &[u8]) -> Result<u64> {
	const RECORD: &str = "auto increment";
	let mut reader = NetReader::new(data);
	let version = reader.read_u16().ok_or_else(|| invalid_size(RECORD, data))?;
	if version > AUTO_INCREMENT_VERSION {
		return_error!(DictionaryError::UnknownVersion {
			record: RECORD,
			version,
		});
	}
	reader.read_u64().ok_or_else(|| invalid_size(RECORD, data).into())
}
