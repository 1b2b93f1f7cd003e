// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use std::{
	collections::HashMap,
	sync::{
		Arc,
		atomic::{AtomicU64, Ordering},
	},
};

use rowkey_codec::{IndexDef, IndexType, TableSchema};
use rowkey_core::{IndexId, Result, error::diagnostic::dictionary::DictionaryError, return_error};
use rowkey_store_single::WriteBatch;

use crate::{
	dict::{
		DdlEntryKey, DictKey, DictManager, PER_PARTITION_CF_FLAG, REVERSE_CF_FLAG,
		record::{INDEX_INFO_VERSION_LATEST, encode_ddl_entry},
	},
	name::TableName,
};

/// One table as registered in the catalog: its indexes in key order, the
/// primary key (possibly hidden) first.
#[derive(Debug)]
pub struct TableDef {
	name: String,
	schema: Arc<TableSchema>,
	indexes: Vec<Arc<IndexDef>>,
	auto_incr_val: AtomicU64,
	hidden_pk_val: AtomicU64,
}

impl TableDef {
	pub fn new(name: impl Into<String>, schema: Arc<TableSchema>, indexes: Vec<Arc<IndexDef>>) -> Self {
		Self {
			name: name.into(),
			schema,
			indexes,
			auto_incr_val: AtomicU64::new(0),
			hidden_pk_val: AtomicU64::new(0),
		}
	}

	/// Position in `schema.keys` of each index slot. The first slot is the
	/// primary key, `None` when it is hidden.
	pub fn key_order(schema: &TableSchema) -> Vec<Option<usize>> {
		let mut order = vec![schema.primary_key];
		order.extend(schema.secondary_keys().map(|(keyno, _)| Some(keyno)));
		order
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	pub fn table_name(&self) -> TableName<'_> {
		TableName::parse(&self.name)
	}

	pub fn is_system_table(&self) -> bool {
		self.table_name().is_system_table()
	}

	pub fn schema(&self) -> &Arc<TableSchema> {
		&self.schema
	}

	pub fn indexes(&self) -> &[Arc<IndexDef>] {
		&self.indexes
	}

	pub fn index_ids(&self) -> Vec<IndexId> {
		self.indexes.iter().map(|index| index.id()).collect()
	}

	/// The index holding the rows, and the auto-increment value.
	pub fn primary(&self) -> Option<&Arc<IndexDef>> {
		self.indexes.iter().find(|index| index.index_type().is_primary())
	}

	pub fn index(&self, id: IndexId) -> Option<&Arc<IndexDef>> {
		self.indexes.iter().find(|index| index.id() == id)
	}

	pub fn index_by_name(&self, name: &str) -> Option<&Arc<IndexDef>> {
		self.indexes.iter().find(|index| index.name() == name)
	}

	pub fn has_hidden_pk(&self) -> bool {
		self.primary().is_some_and(|pk| pk.index_type() == IndexType::HiddenPrimary)
	}

	pub fn auto_incr_val(&self) -> u64 {
		self.auto_incr_val.load(Ordering::Relaxed)
	}

	/// Raises the auto-increment value to at least `value`.
	pub fn raise_auto_incr_val(&self, value: u64) {
		self.auto_incr_val.fetch_max(value, Ordering::Relaxed);
	}

	pub fn hidden_pk_val(&self) -> u64 {
		self.hidden_pk_val.load(Ordering::Relaxed)
	}

	/// Next row id for a table with a hidden primary key.
	pub fn next_hidden_pk_val(&self) -> u64 {
		self.hidden_pk_val.fetch_add(1, Ordering::Relaxed) + 1
	}

	pub fn raise_hidden_pk_val(&self, value: u64) {
		self.hidden_pk_val.fetch_max(value, Ordering::Relaxed);
	}

	/// The same indexes and counters under another name.
	pub fn renamed(&self, name: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			schema: self.schema.clone(),
			indexes: self.indexes.clone(),
			auto_incr_val: AtomicU64::new(self.auto_incr_val()),
			hidden_pk_val: AtomicU64::new(self.hidden_pk_val()),
		}
	}

	/// A copy with a replaced index list, keeping the counters.
	pub fn with_indexes(&self, schema: Arc<TableSchema>, indexes: Vec<Arc<IndexDef>>) -> Self {
		Self {
			name: self.name.clone(),
			schema,
			indexes,
			auto_incr_val: AtomicU64::new(self.auto_incr_val()),
			hidden_pk_val: AtomicU64::new(self.hidden_pk_val()),
		}
	}

	pub fn ddl_key(&self) -> Vec<u8> {
		DdlEntryKey {
			name: self.name.clone(),
		}
		.encode()
	}

	/// Stages the DDL entry, the index infos and the column family flags of
	/// this table.
	pub fn put_dict(&self, dict: &DictManager, batch: &mut WriteBatch) -> Result<()> {
		let mut staged_flags = HashMap::new();
		for index in &self.indexes {
			put_index_dict(dict, batch, index, &mut staged_flags)?;
		}
		dict.put_key(batch, self.ddl_key(), encode_ddl_entry(&self.index_ids()));
		Ok(())
	}
}

/// Stages the index info of `index` and registers its column family. A
/// column family shared with different reverse-order flags is refused; the
/// per-partition flag is not compared. `staged_flags` carries flags staged
/// earlier in the same batch.
pub(crate) fn put_index_dict(
	dict: &DictManager,
	batch: &mut WriteBatch,
	index: &IndexDef,
	staged_flags: &mut HashMap<u32, u32>,
) -> Result<()> {
	let id = index.id();
	let mut flags = 0;
	if index.is_reverse_cf() {
		flags |= REVERSE_CF_FLAG;
	}
	if index.is_per_partition_cf() {
		flags |= PER_PARTITION_CF_FLAG;
	}

	let existing = match staged_flags.get(&id.cf_id) {
		Some(flags) => Some(*flags),
		None => dict.get_cf_flags(id.cf_id)?,
	};
	match existing {
		Some(existing) => {
			if existing & !PER_PARTITION_CF_FLAG != flags & !PER_PARTITION_CF_FLAG {
				return_error!(DictionaryError::CfFlagsConflict {
					cf_id: id.cf_id,
					existing,
					requested: flags,
				});
			}
		}
		None => {
			dict.add_cf_flags(batch, id.cf_id, flags);
			staged_flags.insert(id.cf_id, flags);
		}
	}

	let mut info = *index.info();
	info.dict_version = INDEX_INFO_VERSION_LATEST;
	dict.add_or_update_index_cf_mapping(batch, &info);
	Ok(())
}

#[cfg(test)]
mod tests {
	use rowkey_codec::{IndexInfo, format::SECONDARY_LATEST};
	use rowkey_store_single::KvStore;
	use rowkey_testing::fixtures::{hidden_pk_table, simple_table};

	use super::*;

	fn index(schema: &Arc<TableSchema>, keyno: Option<usize>, index_type: IndexType, id: IndexId) -> Arc<IndexDef> {
		let info = IndexInfo {
			id,
			dict_version: INDEX_INFO_VERSION_LATEST,
			index_type,
			kv_version: index_type.latest_format(),
			flags: 0,
			ttl_duration: 0,
		};
		Arc::new(IndexDef::new(info, keyno, schema.clone()))
	}

	fn simple() -> TableDef {
		let schema = Arc::new(simple_table("db.t"));
		let pk = index(&schema, Some(0), IndexType::Primary, IndexId::new(0, 256));
		let kb = index(&schema, Some(1), IndexType::Secondary, IndexId::new(0, 257));
		TableDef::new("db.t", schema, vec![pk, kb])
	}

	#[test]
	fn test_key_order() {
		assert_eq!(TableDef::key_order(&simple_table("db.t")), vec![Some(0), Some(1)]);
		assert_eq!(TableDef::key_order(&hidden_pk_table("db.h")), vec![None, Some(0)]);
	}

	#[test]
	fn test_lookups() {
		let table = simple();
		assert_eq!(table.primary().map(|pk| pk.id()), Some(IndexId::new(0, 256)));
		assert_eq!(table.index_by_name("kb").map(|kb| kb.id()), Some(IndexId::new(0, 257)));
		assert!(table.index(IndexId::new(0, 300)).is_none());
		assert!(!table.has_hidden_pk());
		assert_eq!(table.table_name().table, "t");
	}

	#[test]
	fn test_counters() {
		let table = simple();
		table.raise_auto_incr_val(10);
		table.raise_auto_incr_val(4);
		assert_eq!(table.auto_incr_val(), 10);
		assert_eq!(table.next_hidden_pk_val(), 1);
		assert_eq!(table.next_hidden_pk_val(), 2);

		let renamed = table.renamed("db.u");
		assert_eq!(renamed.name(), "db.u");
		assert_eq!(renamed.auto_incr_val(), 10);
		assert_eq!(renamed.hidden_pk_val(), 2);
		assert!(Arc::ptr_eq(&renamed.indexes()[1], &table.indexes()[1]));
	}

	#[test]
	fn test_put_dict() {
		let dict = DictManager::init(KvStore::memory()).unwrap();
		let table = simple();
		let mut batch = dict.begin();
		table.put_dict(&dict, &mut batch).unwrap();
		dict.commit(batch, false).unwrap();

		let stored = dict.get_value(&table.ddl_key()).unwrap().unwrap();
		assert_eq!(crate::dict::record::decode_ddl_entry(&stored).unwrap(), table.index_ids());
		let info = dict.get_index_info(IndexId::new(0, 257)).unwrap().unwrap();
		assert_eq!(info.kv_version, SECONDARY_LATEST);
	}

	#[test]
	fn test_put_dict_refuses_flag_conflict() {
		let dict = DictManager::init(KvStore::memory()).unwrap();
		let schema = Arc::new(simple_table("db.t"));
		let pk = index(&schema, Some(0), IndexType::Primary, IndexId::new(0, 256));
		let reverse = Arc::new(
			IndexDef::new(*index(&schema, Some(1), IndexType::Secondary, IndexId::new(0, 257)).info(), Some(1), schema.clone())
				.with_reverse_cf(true),
		);
		let table = TableDef::new("db.t", schema, vec![pk, reverse]);

		let mut batch = dict.begin();
		let err = table.put_dict(&dict, &mut batch).unwrap_err();
		assert_eq!(err.code(), "DICT_004");
	}

	#[test]
	fn test_per_partition_flag_is_not_compared() {
		let dict = DictManager::init(KvStore::memory()).unwrap();
		let schema = Arc::new(simple_table("db.t#P#p0"));
		let pk = Arc::new(
			IndexDef::new(*index(&schema, Some(0), IndexType::Primary, IndexId::new(0, 256)).info(), Some(0), schema.clone())
				.with_per_partition_cf(true),
		);
		let table = TableDef::new("db.t#P#p0", schema, vec![pk]);

		let mut batch = dict.begin();
		table.put_dict(&dict, &mut batch).unwrap();
	}
}
