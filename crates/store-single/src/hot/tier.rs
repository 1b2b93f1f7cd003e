// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

//! Store enum.
//!
//! Dispatches to either the in-memory skiplist or the SQLite implementation.

use rowkey_core::{CfId, Result};

use super::{memory::MemoryStorage, sqlite::SqliteStorage};
use crate::{ColumnFamily, KvStorage, SqliteConfig, WriteBatch};

#[derive(Clone)]
#[repr(u8)]
pub enum KvStore {
	/// In-memory storage (non-persistent)
	Memory(MemoryStorage) = 0,
	/// SQLite-based persistent storage
	Sqlite(SqliteStorage) = 1,
}

impl KvStore {
	/// Create a new in-memory backend
	pub fn memory() -> Self {
		Self::Memory(MemoryStorage::new())
	}

	/// Create a new SQLite backend with in-memory database
	pub fn sqlite_in_memory() -> Result<Self> {
		Ok(Self::Sqlite(SqliteStorage::in_memory()?))
	}

	/// Create a new SQLite backend with the given configuration
	pub fn sqlite(config: SqliteConfig) -> Result<Self> {
		Ok(Self::Sqlite(SqliteStorage::new(config)?))
	}
}

impl KvStorage for KvStore {
	#[inline]
	fn get(&self, cf: CfId, key: &[u8]) -> Result<Option<Vec<u8>>> {
		match self {
			Self::Memory(s) => s.get(cf, key),
			Self::Sqlite(s) => s.get(cf, key),
		}
	}

	#[inline]
	fn scan_prefix(&self, cf: CfId, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>> {
		match self {
			Self::Memory(s) => s.scan_prefix(cf, prefix),
			Self::Sqlite(s) => s.scan_prefix(cf, prefix),
		}
	}

	#[inline]
	fn commit(&self, batch: WriteBatch, sync: bool) -> Result<()> {
		match self {
			Self::Memory(s) => s.commit(batch, sync),
			Self::Sqlite(s) => s.commit(batch, sync),
		}
	}

	#[inline]
	fn column_family(&self, name: &str) -> Result<ColumnFamily> {
		match self {
			Self::Memory(s) => s.column_family(name),
			Self::Sqlite(s) => s.column_family(name),
		}
	}

	#[inline]
	fn column_families(&self) -> Result<Vec<ColumnFamily>> {
		match self {
			Self::Memory(s) => s.column_families(),
			Self::Sqlite(s) => s.column_families(),
		}
	}

	#[inline]
	fn crash_after(&self, staged: usize) {
		match self {
			Self::Memory(s) => s.crash_after(staged),
			Self::Sqlite(s) => s.crash_after(staged),
		}
	}
}

#[cfg(test)]
pub mod tests {
	use super::*;

	#[test]
	fn test_memory_backend() {
		let storage = KvStore::memory();

		let mut batch = WriteBatch::new();
		batch.put(0, b"key".to_vec(), b"value".to_vec());
		storage.commit(batch, false).unwrap();
		assert_eq!(storage.get(0, b"key").unwrap().as_deref(), Some(b"value".as_slice()));
	}

	#[test]
	fn test_sqlite_backend() {
		let storage = KvStore::sqlite_in_memory().unwrap();

		let mut batch = WriteBatch::new();
		batch.put(0, b"key".to_vec(), b"value".to_vec());
		storage.commit(batch, false).unwrap();
		assert_eq!(storage.get(0, b"key").unwrap().as_deref(), Some(b"value".as_slice()));
	}

	#[test]
	fn test_backends_agree_on_prefix_scan() {
		for storage in [KvStore::memory(), KvStore::sqlite_in_memory().unwrap()] {
			let mut batch = WriteBatch::new();
			batch.put(0, vec![0, 0, 0, 2, 1], b"x".to_vec());
			batch.put(0, vec![0, 0, 0, 1, 9], b"y".to_vec());
			batch.put(0, vec![0, 0, 0, 2, 0], b"z".to_vec());
			storage.commit(batch, false).unwrap();

			let keys: Vec<Vec<u8>> =
				storage.scan_prefix(0, &[0, 0, 0, 2]).unwrap().into_iter().map(|(k, _)| k).collect();
			assert_eq!(keys, vec![vec![0, 0, 0, 2, 0], vec![0, 0, 0, 2, 1]]);
		}
	}
}
