// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

//! Keys of the dictionary records. Every key starts with a 4 byte big-endian
//! record type, so each type occupies its own range of the system column
//! family and can be scanned by prefix.

use rowkey_core::{
	IndexId,
	netbuf::{NetReader, NetWriter},
};

/// Index numbers up to this value are reserved for the dictionary itself.
pub const END_DICT_INDEX_ID: u32 = 255;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum RecordType {
	DdlEntry = 1,
	IndexInfo = 2,
	CfDefinition = 3,
	/// Reserved; never written.
	BinlogInfo = 4,
	DropIndexOngoing = 5,
	IndexStatistics = 6,
	MaxIndexId = 7,
	CreateIndexOngoing = 8,
	AutoInc = 9,
}

impl RecordType {
	pub fn prefix(self) -> [u8; 4] {
		(self as u32).to_be_bytes()
	}
}

pub trait DictKey: Sized {
	fn encode(&self) -> Vec<u8>;

	fn decode(key: &[u8]) -> Option<Self>;
}

/// `[type][cf id][index number]`, the key of every per-index record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexKey {
	pub record: RecordType,
	pub id: IndexId,
}

impl IndexKey {
	pub const LEN: usize = 12;

	pub fn new(record: RecordType, id: IndexId) -> Self {
		Self {
			record,
			id,
		}
	}
}

impl DictKey for IndexKey {
	fn encode(&self) -> Vec<u8> {
		let mut out = NetWriter::with_capacity(Self::LEN);
		out.write(&self.record.prefix());
		out.write(&self.id.to_bytes());
		out.into_inner()
	}

	/// The record type is not checked against a known value; callers decode
	/// keys found under a prefix they scanned for.
	fn decode(key: &[u8]) -> Option<Self> {
		if key.len() != Self::LEN {
			return None;
		}
		let mut reader = NetReader::new(key);
		let record = match reader.read_u32()? {
			1 => RecordType::DdlEntry,
			2 => RecordType::IndexInfo,
			3 => RecordType::CfDefinition,
			4 => RecordType::BinlogInfo,
			5 => RecordType::DropIndexOngoing,
			6 => RecordType::IndexStatistics,
			7 => RecordType::MaxIndexId,
			8 => RecordType::CreateIndexOngoing,
			9 => RecordType::AutoInc,
			_ => return None,
		};
		let id = IndexId::from_bytes(reader.read(8)?)?;
		Some(Self {
			record,
			id,
		})
	}
}

/// `[type][table name]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DdlEntryKey {
	pub name: String,
}

impl DictKey for DdlEntryKey {
	fn encode(&self) -> Vec<u8> {
		let mut out = NetWriter::with_capacity(4 + self.name.len());
		out.write(&RecordType::DdlEntry.prefix());
		out.write(self.name.as_bytes());
		out.into_inner()
	}

	fn decode(key: &[u8]) -> Option<Self> {
		let name = key.strip_prefix(&RecordType::DdlEntry.prefix())?;
		let name = String::from_utf8(name.to_vec()).ok()?;
		Some(Self {
			name,
		})
	}
}

/// `[type][cf id]`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CfDefinitionKey {
	pub cf_id: u32,
}

impl DictKey for CfDefinitionKey {
	fn encode(&self) -> Vec<u8> {
		let mut out = NetWriter::with_capacity(8);
		out.write(&RecordType::CfDefinition.prefix());
		out.write_u32(self.cf_id);
		out.into_inner()
	}

	fn decode(key: &[u8]) -> Option<Self> {
		let rest = key.strip_prefix(&RecordType::CfDefinition.prefix())?;
		let mut reader = NetReader::new(rest);
		let cf_id = reader.read_u32()?;
		if reader.remaining() != 0 {
			return None;
		}
		Some(Self {
			cf_id,
		})
	}
}

/// `[type]`, a singleton.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MaxIndexIdKey;

impl DictKey for MaxIndexIdKey {
	fn encode(&self) -> Vec<u8> {
		RecordType::MaxIndexId.prefix().to_vec()
	}

	fn decode(key: &[u8]) -> Option<Self> {
		(key == RecordType::MaxIndexId.prefix()).then_some(Self)
	}
}
