// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use std::{ops::Deref, sync::Arc};

use crossbeam_skiplist::SkipMap;
use indexmap::IndexMap;
use parking_lot::{Mutex, RwLock};
use rowkey_core::{CfId, Delta, Result};
use tracing::{instrument, trace};

use crate::{
	ColumnFamily, DEFAULT_CF_ID, DEFAULT_CF_NAME, KvStorage, SYSTEM_CF_ID, SYSTEM_CF_NAME, WriteBatch,
	crash::CrashPoint,
};

type EntryKey = (CfId, Vec<u8>);

#[derive(Clone)]
pub struct MemoryStorage(Arc<MemoryInner>);

pub struct MemoryInner {
	entries: SkipMap<EntryKey, Vec<u8>>,
	column_families: Mutex<IndexMap<String, CfId>>,
	// readers take it shared so a batch is never observed half-applied
	apply: RwLock<()>,
	crash: CrashPoint,
}

impl Deref for MemoryStorage {
	type Target = MemoryInner;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}

impl Default for MemoryStorage {
	fn default() -> Self {
		Self::new()
	}
}

impl MemoryStorage {
	pub fn new() -> Self {
		let mut column_families = IndexMap::new();
		column_families.insert(DEFAULT_CF_NAME.to_string(), DEFAULT_CF_ID);
		column_families.insert(SYSTEM_CF_NAME.to_string(), SYSTEM_CF_ID);

		Self(Arc::new(MemoryInner {
			entries: SkipMap::new(),
			column_families: Mutex::new(column_families),
			apply: RwLock::new(()),
			crash: CrashPoint::default(),
		}))
	}
}

impl KvStorage for MemoryStorage {
	fn get(&self, cf: CfId, key: &[u8]) -> Result<Option<Vec<u8>>> {
		let _guard = self.apply.read();
		Ok(self.entries.get(&(cf, key.to_vec())).map(|entry| entry.value().clone()))
	}

	fn scan_prefix(&self, cf: CfId, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>> {
		let _guard = self.apply.read();
		let start: EntryKey = (cf, prefix.to_vec());
		Ok(self
			.entries
			.range(start..)
			.take_while(|entry| {
				let (entry_cf, key) = entry.key();
				*entry_cf == cf && key.starts_with(prefix)
			})
			.map(|entry| (entry.key().1.clone(), entry.value().clone()))
			.collect())
	}

	#[instrument(name = "store::memory::commit", level = "trace", skip(self, batch), fields(len = batch.len()))]
	fn commit(&self, batch: WriteBatch, sync: bool) -> Result<()> {
		let mut staged = Vec::with_capacity(batch.len());
		for (idx, delta) in batch.into_deltas().into_iter().enumerate() {
			self.crash.check(idx)?;
			staged.push(delta);
		}

		let _guard = self.apply.write();
		for delta in staged {
			match delta {
				Delta::Set {
					cf,
					key,
					value,
				} => {
					self.entries.insert((cf, key), value);
				}
				Delta::Remove {
					cf,
					key,
				} => {
					self.entries.remove(&(cf, key));
				}
			}
		}
		trace!(sync, "memory batch applied");
		Ok(())
	}

	fn column_family(&self, name: &str) -> Result<ColumnFamily> {
		let mut column_families = self.column_families.lock();
		if let Some(id) = column_families.get(name) {
			return Ok(ColumnFamily::new(*id, name));
		}
		let id = column_families.values().copied().max().map_or(DEFAULT_CF_ID, |max| max + 1);
		column_families.insert(name.to_string(), id);
		Ok(ColumnFamily::new(id, name))
	}

	fn column_families(&self) -> Result<Vec<ColumnFamily>> {
		Ok(self.column_families.lock().iter().map(|(name, id)| ColumnFamily::new(*id, name.clone())).collect())
	}

	fn crash_after(&self, staged: usize) {
		self.crash.arm(staged);
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_get_and_remove() {
		let storage = MemoryStorage::new();
		let mut batch = WriteBatch::new();
		batch.put(0, b"key".to_vec(), b"value".to_vec());
		storage.commit(batch, false).unwrap();
		assert_eq!(storage.get(0, b"key").unwrap(), Some(b"value".to_vec()));
		assert_eq!(storage.get(1, b"key").unwrap(), None);

		let mut batch = WriteBatch::new();
		batch.delete(0, b"key".to_vec());
		storage.commit(batch, false).unwrap();
		assert_eq!(storage.get(0, b"key").unwrap(), None);
	}

	#[test]
	fn test_scan_prefix_stays_in_cf() {
		let storage = MemoryStorage::new();
		let mut batch = WriteBatch::new();
		batch.put(0, vec![1, 2], vec![0]);
		batch.put(0, vec![1, 1], vec![1]);
		batch.put(0, vec![2, 0], vec![2]);
		batch.put(1, vec![1, 0], vec![3]);
		storage.commit(batch, false).unwrap();

		let found = storage.scan_prefix(0, &[1]).unwrap();
		assert_eq!(found, vec![(vec![1, 1], vec![1]), (vec![1, 2], vec![0])]);
	}

	#[test]
	fn test_crash_applies_nothing() {
		let storage = MemoryStorage::new();
		let mut batch = WriteBatch::new();
		batch.put(0, b"a".to_vec(), b"1".to_vec());
		batch.put(0, b"b".to_vec(), b"2".to_vec());
		storage.crash_after(1);

		let err = storage.commit(batch, true).unwrap_err();
		assert_eq!(err.code(), "STORE_002");
		assert_eq!(storage.get(0, b"a").unwrap(), None);
		assert_eq!(storage.get(0, b"b").unwrap(), None);
	}

	#[test]
	fn test_column_family_ids() {
		let storage = MemoryStorage::new();
		assert_eq!(storage.column_family("default").unwrap().id, DEFAULT_CF_ID);
		assert_eq!(storage.column_family("__system__").unwrap().id, SYSTEM_CF_ID);
		let cf = storage.column_family("rev:cf1").unwrap();
		assert_eq!(cf.id, 2);
		assert_eq!(storage.column_family("rev:cf1").unwrap(), cf);
		assert_eq!(storage.column_families().unwrap().len(), 3);
	}
}
