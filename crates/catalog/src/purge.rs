// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

//! Removes the data of dropped indexes.
//!
//! A drop only commits a marker. This pass deletes every key of each marked
//! index, then clears the marker together with the index's dictionary
//! records. Running it again after a crash is harmless: the marker is
//! cleared last, so an interrupted purge just starts over.

use rowkey_core::{Result, netbuf::NetWriter};
use rowkey_store_single::KvStorage;
use tracing::{debug, info, instrument};

use crate::{ddl::DdlManager, dict::IndexOperation};

/// Purges every index with a pending drop and returns how many were
/// finished.
#[instrument(name = "catalog::purge", level = "debug", skip(ddl))]
pub fn purge_dropped_indexes(ddl: &DdlManager) -> Result<usize> {
	let dict = ddl.dict();
	let ids = dict.get_ongoing_index_operation(IndexOperation::Drop)?;
	if ids.is_empty() {
		return Ok(0);
	}

	for id in &ids {
		let mut prefix = NetWriter::with_capacity(4);
		prefix.write_u32(id.index_id);
		let keys = dict.store().scan_prefix(id.cf_id, prefix.as_slice())?;

		let mut batch = dict.begin();
		for (key, _) in &keys {
			batch.delete(id.cf_id, key.as_slice());
		}
		dict.commit(batch, false)?;
		debug!(index = %id, keys = keys.len(), "index data removed");
	}

	let ids: Vec<_> = ids.into_iter().collect();
	dict.finish_indexes_operation(&ids, IndexOperation::Drop)?;
	ddl.remove_uncommitted_keydefs(&ids);
	info!(indexes = ids.len(), "dropped indexes purged");
	Ok(ids.len())
}

#[cfg(test)]
mod tests {
	use std::sync::Arc;

	use rowkey_core::IndexId;
	use rowkey_store_single::{DEFAULT_CF_ID, KvStore};
	use rowkey_testing::fixtures::simple_table;

	use super::*;
	use crate::{CatalogConfig, DictManager};

	fn ddl() -> DdlManager {
		let dict = Arc::new(DictManager::init(KvStore::memory()).unwrap());
		DdlManager::init(dict, CatalogConfig::default(), |_| None).unwrap()
	}

	fn index_key(id: IndexId, suffix: u8) -> Vec<u8> {
		let mut key = id.index_id.to_be_bytes().to_vec();
		key.push(suffix);
		key
	}

	#[test]
	fn test_nothing_to_purge() {
		assert_eq!(purge_dropped_indexes(&ddl()).unwrap(), 0);
	}

	#[test]
	fn test_purge_removes_only_dropped_data() {
		let ddl = ddl();
		let table = ddl.create_table(simple_table("db.t")).unwrap();
		let pk = table.indexes()[0].id();
		let sk = table.indexes()[1].id();

		let mut batch = ddl.dict().begin();
		for suffix in 0..3 {
			batch.put(DEFAULT_CF_ID, index_key(pk, suffix), b"row".to_vec());
			batch.put(DEFAULT_CF_ID, index_key(sk, suffix), Vec::new());
		}
		ddl.dict().commit(batch, false).unwrap();

		ddl.drop_index("db.t", "kb").unwrap();
		assert_eq!(purge_dropped_indexes(&ddl).unwrap(), 1);

		let store = ddl.dict().store();
		assert!(store.scan_prefix(DEFAULT_CF_ID, &sk.index_id.to_be_bytes()).unwrap().is_empty());
		assert_eq!(store.scan_prefix(DEFAULT_CF_ID, &pk.index_id.to_be_bytes()).unwrap().len(), 3);
		assert!(ddl.dict().is_drop_index_empty().unwrap());
		assert!(ddl.dict().get_index_info(sk).unwrap().is_none());
		assert!(ddl.find_by_id(sk).is_none());
		assert!(ddl.find_by_id(pk).is_some());

		assert_eq!(purge_dropped_indexes(&ddl).unwrap(), 0);
	}
}
