// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use std::{collections::HashMap, sync::Arc};

use rowkey_codec::{IndexDef, IndexFlag, IndexInfo, IndexType, KeyDef, TableSchema, qualifier};
use rowkey_core::{IndexId, Result, error::diagnostic::catalog::CatalogError, return_error};
use rowkey_store_single::{DEFAULT_CF_NAME, KvStorage, WriteBatch};
use tracing::{info, instrument};

use super::DdlManager;
use crate::{
	dict::{IndexOperation, record::INDEX_INFO_VERSION_LATEST},
	table::{TableDef, put_index_dict},
};

/// Column families whose name starts with this keep keys in reverse order.
pub const REVERSE_CF_PREFIX: &str = "rev:";

fn table_not_found(name: &str) -> CatalogError {
	CatalogError::TableNotFound {
		name: name.to_string(),
	}
}

impl DdlManager {
	/// Registers a new table: allocates a number for every index, commits
	/// the dictionary records and publishes the table.
	#[instrument(name = "catalog::ddl::create_table", level = "debug", skip(self, schema), fields(table = %schema.name))]
	pub fn create_table(&self, schema: TableSchema) -> Result<Arc<TableDef>> {
		if self.find(&schema.name).is_some() {
			return_error!(CatalogError::TableAlreadyExists {
				name: schema.name,
			});
		}
		let schema = Arc::new(schema);
		let mut indexes = Vec::new();
		for keyno in TableDef::key_order(&schema) {
			let index_type = match keyno {
				None => IndexType::HiddenPrimary,
				Some(keyno) if Some(keyno) == schema.primary_key => IndexType::Primary,
				Some(_) => IndexType::Secondary,
			};
			indexes.push(self.build_index(&schema, keyno, index_type)?);
		}
		let table = TableDef::new(schema.name.clone(), schema, indexes);

		let _guard = self.dict.lock();
		if self.find(table.name()).is_some() {
			return_error!(CatalogError::TableAlreadyExists {
				name: table.name().to_string(),
			});
		}
		self.write_locked(table, self.dict.begin())
	}

	fn build_index(&self, schema: &Arc<TableSchema>, keyno: Option<usize>, index_type: IndexType) -> Result<Arc<IndexDef>> {
		let ttl_duration = qualifier::ttl_duration(schema)?.unwrap_or(0);
		let flags = if ttl_duration > 0 { IndexFlag::Ttl.bit() } else { 0 };

		let comment = keyno.and_then(|keyno| schema.keys.get(keyno)).map_or("", |key| key.comment.as_str());
		let qualified = qualifier::cf_name(comment, schema.partition());
		let cf_name = qualified.as_ref().map_or(DEFAULT_CF_NAME, |found| found.value);
		let per_partition = qualified.as_ref().is_some_and(|found| found.per_partition);
		let cf = self.dict.store().column_family(cf_name)?;

		let number = self.get_and_update_next_number()?;
		let info = IndexInfo {
			id: IndexId::new(cf.id, number),
			dict_version: INDEX_INFO_VERSION_LATEST,
			index_type,
			kv_version: index_type.latest_format(),
			flags,
			ttl_duration,
		};
		let index = IndexDef::new(info, keyno, schema.clone())
			.with_config(self.config.codec)
			.with_reverse_cf(cf_name.starts_with(REVERSE_CF_PREFIX))
			.with_per_partition_cf(per_partition);
		index.setup()?;
		Ok(Arc::new(index))
	}

	/// Unpublishes a table and marks all its indexes for purge. The index
	/// definitions stay reachable by id until the purge finished.
	#[instrument(name = "catalog::ddl::drop_table", level = "debug", skip(self))]
	pub fn drop_table(&self, name: &str) -> Result<()> {
		let _guard = self.dict.lock();
		let table = self.find(name).ok_or_else(|| table_not_found(name))?;

		let mut batch = self.dict.begin();
		self.dict.delete_key(&mut batch, table.ddl_key());
		self.dict.add_drop_table(&mut batch, &table.index_ids())?;

		// reachable through the side map before they leave the published set
		self.add_uncommitted_keydefs(table.indexes());
		if let Err(err) = self.dict.commit(batch, self.config.sync_commits) {
			self.remove_uncommitted_keydefs(&table.index_ids());
			return Err(err);
		}
		self.published.write().remove(name);
		info!(table = name, indexes = table.indexes().len(), "table dropped");
		Ok(())
	}

	/// Removes one secondary index from a table and marks it for purge.
	#[instrument(name = "catalog::ddl::drop_index", level = "debug", skip(self))]
	pub fn drop_index(&self, table_name: &str, index_name: &str) -> Result<Arc<TableDef>> {
		let _guard = self.dict.lock();
		let table = self.find(table_name).ok_or_else(|| table_not_found(table_name))?;
		let Some(index) = table.index_by_name(index_name).cloned() else {
			return_error!(CatalogError::IndexNotFound {
				table: table_name.to_string(),
				name: index_name.to_string(),
			});
		};
		if index.is_primary() {
			return_error!(CatalogError::PrimaryKeyDrop {
				table: table_name.to_string(),
			});
		}

		let mut schema = (**table.schema()).clone();
		if let Some(keyno) = index.keyno() {
			schema.keys.remove(keyno);
			schema.primary_key = schema.primary_key.map(|pk| if pk > keyno { pk - 1 } else { pk });
		}
		let remaining = table.indexes().iter().filter(|other| other.id() != index.id()).cloned().collect();
		let altered = table.with_indexes(Arc::new(schema), remaining);

		let mut batch = self.dict.begin();
		self.dict.add_drop_index(&mut batch, &[index.id()])?;
		self.add_uncommitted_keydefs(&[index.clone()]);
		self.write_locked(altered, batch).inspect_err(|_| self.remove_uncommitted_keydefs(&[index.id()]))
	}

	/// Starts an online build of a new secondary index. The index is
	/// reachable by id but not through its table until
	/// [`commit_create_index`](Self::commit_create_index).
	#[instrument(name = "catalog::ddl::begin_create_index", level = "debug", skip(self, key))]
	pub fn begin_create_index(&self, table_name: &str, key: KeyDef) -> Result<Arc<IndexDef>> {
		let table = self.find(table_name).ok_or_else(|| table_not_found(table_name))?;
		let schema = Arc::new((**table.schema()).clone().with_key(key));
		let keyno = schema.keys.len() - 1;
		let index = self.build_index(&schema, Some(keyno), IndexType::Secondary)?;

		let _guard = self.dict.lock();
		let mut batch = self.dict.begin();
		self.dict.add_create_index(&mut batch, &[index.id()]);
		put_index_dict(&self.dict, &mut batch, &index, &mut HashMap::new())?;
		self.dict.commit(batch, self.config.sync_commits)?;
		self.add_uncommitted_keydefs(&[index.clone()]);
		Ok(index)
	}

	/// Publishes an index built online. The new table entry and the end
	/// of the create marker commit together.
	#[instrument(name = "catalog::ddl::commit_create_index", level = "debug", skip(self))]
	pub fn commit_create_index(&self, table_name: &str, id: IndexId) -> Result<Arc<TableDef>> {
		let _guard = self.dict.lock();
		let table = self.find(table_name).ok_or_else(|| table_not_found(table_name))?;
		let building = self.building_index(id)?;
		let Some(key) = building.keyno().and_then(|keyno| building.schema().keys.get(keyno)).cloned() else {
			return_error!(CatalogError::IndexNotBuilding {
				index_id: id,
			});
		};

		// the table may have changed since the build started
		let schema = Arc::new((**table.schema()).clone().with_key(key));
		let index = IndexDef::new(*building.info(), Some(schema.keys.len() - 1), schema.clone())
			.with_config(self.config.codec)
			.with_reverse_cf(building.is_reverse_cf())
			.with_per_partition_cf(building.is_per_partition_cf())
			.with_stats(building.stats());
		index.setup()?;

		let mut indexes = table.indexes().to_vec();
		indexes.push(Arc::new(index));
		let altered = table.with_indexes(schema, indexes);

		let mut batch = self.dict.begin();
		self.dict.end_ongoing_index_operation(&mut batch, id, IndexOperation::Create);
		let altered = self.write_locked(altered, batch)?;
		self.remove_uncommitted_keydefs(&[id]);
		Ok(altered)
	}

	/// Gives up an online build. The partially built index is purged like
	/// a dropped one.
	#[instrument(name = "catalog::ddl::abort_create_index", level = "debug", skip(self))]
	pub fn abort_create_index(&self, id: IndexId) -> Result<()> {
		let _guard = self.dict.lock();
		self.building_index(id)?;
		let mut batch = self.dict.begin();
		self.dict.add_drop_index(&mut batch, &[id])?;
		self.dict.commit(batch, self.config.sync_commits)
	}

	/// An index started by `begin_create_index` and neither committed nor
	/// aborted yet.
	fn building_index(&self, id: IndexId) -> Result<Arc<IndexDef>> {
		let index = self.uncommitted.get(&id).map(|entry| entry.value().clone());
		match index {
			Some(index) if self.dict.is_index_operation_ongoing(id, IndexOperation::Create)? => Ok(index),
			_ => return_error!(CatalogError::IndexNotBuilding {
				index_id: id,
			}),
		}
	}

	/// Moves a table to a new name, keeping its index definitions and ids.
	#[instrument(name = "catalog::ddl::rename", level = "debug", skip(self))]
	pub fn rename(&self, from: &str, to: &str) -> Result<Arc<TableDef>> {
		let _guard = self.dict.lock();
		let table = self.find(from).ok_or_else(|| table_not_found(from))?;
		if self.find(to).is_some() {
			return_error!(CatalogError::TableAlreadyExists {
				name: to.to_string(),
			});
		}

		let renamed = table.renamed(to);
		let mut batch = self.dict.begin();
		self.dict.delete_key(&mut batch, table.ddl_key());
		renamed.put_dict(&self.dict, &mut batch)?;
		self.dict.commit(batch, self.config.sync_commits)?;

		let renamed = Arc::new(renamed);
		let mut published = self.published.write();
		published.remove(from);
		published.put(renamed.clone());
		Ok(renamed)
	}

	/// Stores a new auto-increment value for a table. The stored value
	/// never decreases.
	#[instrument(name = "catalog::ddl::update_auto_incr", level = "trace", skip(self))]
	pub fn update_auto_incr(&self, table_name: &str, value: u64) -> Result<()> {
		let table = self.find(table_name).ok_or_else(|| table_not_found(table_name))?;
		let Some(pk) = table.primary() else {
			return Ok(());
		};
		let _guard = self.dict.lock();
		let mut batch = self.dict.begin();
		self.dict.put_auto_incr_val(&mut batch, pk.id(), value, false)?;
		self.dict.commit(batch, false)?;
		table.raise_auto_incr_val(value);
		Ok(())
	}

	/// `put_and_write` for callers already holding the dictionary lock.
	pub(super) fn write_locked(&self, table: TableDef, mut batch: WriteBatch) -> Result<Arc<TableDef>> {
		table.put_dict(&self.dict, &mut batch)?;
		self.dict.commit(batch, self.config.sync_commits)?;
		Ok(self.put(table))
	}
}

#[cfg(test)]
mod tests {
	use rowkey_codec::{KeyPartDef, PackOptions};
	use rowkey_store_single::KvStore;
	use rowkey_testing::fixtures::{hidden_pk_table, simple_row, simple_table};

	use super::*;
	use crate::{CatalogConfig, DictManager};

	fn open(store: KvStore) -> DdlManager {
		let dict = Arc::new(DictManager::init(store).unwrap());
		DdlManager::init(dict, CatalogConfig::default(), |name| Some(Arc::new(simple_table(name)))).unwrap()
	}

	#[test]
	fn test_create_table() {
		let ddl = open(KvStore::memory());
		let table = ddl.create_table(simple_table("db.t")).unwrap();
		assert_eq!(table.indexes().len(), 2);
		assert_eq!(table.indexes()[0].index_type(), IndexType::Primary);
		assert_eq!(table.indexes()[1].index_type(), IndexType::Secondary);
		assert_eq!(table.indexes()[0].id(), IndexId::new(0, 256));
		assert_eq!(table.indexes()[1].id(), IndexId::new(0, 257));

		let err = ddl.create_table(simple_table("db.t")).unwrap_err();
		assert_eq!(err.code(), "CATALOG_001");
		assert_eq!(ddl.table_count(), 1);
	}

	#[test]
	fn test_hidden_primary_key() {
		let ddl = open(KvStore::memory());
		let table = ddl.create_table(hidden_pk_table("db.h")).unwrap();
		assert!(table.has_hidden_pk());
		assert_eq!(table.indexes()[0].index_type(), IndexType::HiddenPrimary);
		assert_eq!(table.indexes()[0].keyno(), None);
	}

	#[test]
	fn test_cf_from_comment() {
		let ddl = open(KvStore::memory());
		let mut schema = simple_table("db.c");
		schema.keys[1] = schema.keys[1].clone().with_comment("cfname=rev:cold");
		let table = ddl.create_table(schema).unwrap();
		let sk = &table.indexes()[1];
		assert!(sk.is_reverse_cf());
		assert_ne!(sk.id().cf_id, table.indexes()[0].id().cf_id);
		assert_eq!(ddl.dict().get_cf_flags(sk.id().cf_id).unwrap(), Some(crate::dict::REVERSE_CF_FLAG));
	}

	#[test]
	fn test_tables_survive_reopen() {
		let store = KvStore::memory();
		let ddl = open(store.clone());
		ddl.create_table(simple_table("db.t")).unwrap();
		ddl.update_auto_incr("db.t", 41).unwrap();
		ddl.update_auto_incr("db.t", 7).unwrap();
		ddl.cleanup();
		drop(ddl);

		let ddl = open(store);
		let table = ddl.find("db.t").unwrap();
		assert_eq!(table.auto_incr_val(), 41);
		assert_eq!(table.index_ids(), vec![IndexId::new(0, 256), IndexId::new(0, 257)]);
		assert_eq!(ddl.find_indexdef("db.t", "kb").unwrap().keyno(), Some(1));
		assert_eq!(ddl.sequence().peek(), 258);
	}

	#[test]
	fn test_drop_table() {
		let ddl = open(KvStore::memory());
		let table = ddl.create_table(simple_table("db.t")).unwrap();
		ddl.drop_table("db.t").unwrap();

		assert!(ddl.find("db.t").is_none());
		for id in table.index_ids() {
			assert!(ddl.dict().is_index_operation_ongoing(id, IndexOperation::Drop).unwrap());
			assert!(ddl.find_by_id(id).is_some());
			assert!(ddl.safe_get_table_name(id).is_none());
		}
		assert_eq!(ddl.drop_table("db.t").unwrap_err().code(), "CATALOG_002");
	}

	#[test]
	fn test_drop_index() {
		let ddl = open(KvStore::memory());
		let table = ddl.create_table(simple_table("db.t")).unwrap();
		let kb = table.indexes()[1].id();

		assert_eq!(ddl.drop_index("db.t", "PRIMARY").unwrap_err().code(), "CATALOG_008");
		assert_eq!(ddl.drop_index("db.t", "nope").unwrap_err().code(), "CATALOG_007");

		let altered = ddl.drop_index("db.t", "kb").unwrap();
		assert_eq!(altered.indexes().len(), 1);
		assert_eq!(altered.schema().keys.len(), 1);
		assert!(ddl.find_indexdef("db.t", "kb").is_none());
		assert_eq!(ddl.find_by_id(kb).unwrap().name(), "kb");
		assert!(ddl.dict().is_index_operation_ongoing(kb, IndexOperation::Drop).unwrap());
	}

	#[test]
	fn test_online_index_build() {
		let ddl = open(KvStore::memory());
		ddl.create_table(simple_table("db.t")).unwrap();

		let key = KeyDef::new("ka", vec![KeyPartDef::column(0), KeyPartDef::column(1)]);
		let index = ddl.begin_create_index("db.t", key).unwrap();
		assert!(ddl.dict().is_index_operation_ongoing(index.id(), IndexOperation::Create).unwrap());
		assert!(ddl.find_by_id(index.id()).is_some());
		assert!(ddl.find_indexdef("db.t", "ka").is_none());

		let packed = index.pack_record(&simple_row(3, "x"), &PackOptions::default()).unwrap();
		assert_eq!(&packed.key[..4], &index.id().index_id.to_be_bytes());

		let table = ddl.commit_create_index("db.t", index.id()).unwrap();
		assert_eq!(table.indexes().len(), 3);
		assert_eq!(table.schema().keys.len(), 3);
		assert!(!ddl.dict().is_index_operation_ongoing(index.id(), IndexOperation::Create).unwrap());
		assert_eq!(ddl.safe_get_table_name(index.id()).as_deref(), Some("db.t"));
	}

	#[test]
	fn test_aborted_index_build_is_dropped() {
		let ddl = open(KvStore::memory());
		ddl.create_table(simple_table("db.t")).unwrap();
		let index = ddl.begin_create_index("db.t", KeyDef::new("ka", vec![KeyPartDef::column(0)])).unwrap();

		ddl.abort_create_index(index.id()).unwrap();
		assert!(ddl.dict().is_index_operation_ongoing(index.id(), IndexOperation::Drop).unwrap());
		assert_eq!(ddl.find("db.t").unwrap().indexes().len(), 2);
	}

	#[test]
	fn test_abort_refuses_published_index() {
		let store = KvStore::memory();
		let ddl = open(store.clone());
		let table = ddl.create_table(simple_table("db.t")).unwrap();
		let pk = table.indexes()[0].id();

		let err = ddl.abort_create_index(pk).unwrap_err();
		assert_eq!(err.code(), "CATALOG_009");
		assert!(ddl.dict().is_drop_index_empty().unwrap());
		assert_eq!(crate::purge_dropped_indexes(&ddl).unwrap(), 0);
		assert!(ddl.dict().get_index_info(pk).unwrap().is_some());

		assert_eq!(ddl.abort_create_index(IndexId::new(0, 999)).unwrap_err().code(), "CATALOG_009");
		assert_eq!(ddl.commit_create_index("db.t", pk).unwrap_err().code(), "CATALOG_009");
	}

	#[test]
	fn test_aborted_build_cannot_be_committed() {
		let ddl = open(KvStore::memory());
		ddl.create_table(simple_table("db.t")).unwrap();
		let index = ddl.begin_create_index("db.t", KeyDef::new("ka", vec![KeyPartDef::column(0)])).unwrap();
		ddl.abort_create_index(index.id()).unwrap();

		assert_eq!(ddl.abort_create_index(index.id()).unwrap_err().code(), "CATALOG_009");
		assert_eq!(ddl.commit_create_index("db.t", index.id()).unwrap_err().code(), "CATALOG_009");
		assert!(ddl.find_indexdef("db.t", "ka").is_none());
	}

	#[test]
	fn test_commit_build_after_concurrent_drop() {
		let ddl = open(KvStore::memory());
		let table = ddl.create_table(simple_table("db.t")).unwrap();
		let kb = table.indexes()[1].id();

		let index = ddl.begin_create_index("db.t", KeyDef::new("ka", vec![KeyPartDef::column(0)])).unwrap();
		ddl.drop_index("db.t", "kb").unwrap();
		let committed = ddl.commit_create_index("db.t", index.id()).unwrap();

		let names: Vec<_> = committed.schema().keys.iter().map(|key| key.name.as_str()).collect();
		assert_eq!(names, vec!["PRIMARY", "ka"]);
		assert_eq!(committed.index_ids(), vec![table.indexes()[0].id(), index.id()]);
		assert!(ddl.find_indexdef("db.t", "kb").is_none());
		assert_eq!(ddl.find_indexdef("db.t", "ka").unwrap().keyno(), Some(1));
		assert!(ddl.dict().is_index_operation_ongoing(kb, IndexOperation::Drop).unwrap());
	}

	#[test]
	fn test_rename() {
		let store = KvStore::memory();
		let ddl = open(store.clone());
		let table = ddl.create_table(simple_table("db.t")).unwrap();
		ddl.create_table(simple_table("db.u")).unwrap();

		assert_eq!(ddl.rename("db.t", "db.u").unwrap_err().code(), "CATALOG_001");
		assert_eq!(ddl.rename("db.x", "db.y").unwrap_err().code(), "CATALOG_002");

		let renamed = ddl.rename("db.t", "db.v").unwrap();
		assert_eq!(renamed.index_ids(), table.index_ids());
		assert!(ddl.find("db.t").is_none());
		assert_eq!(ddl.safe_get_table_name(table.index_ids()[0]).as_deref(), Some("db.v"));
		ddl.cleanup();
		drop(ddl);

		let ddl = open(store);
		assert!(ddl.find("db.t").is_none());
		assert_eq!(ddl.find("db.v").unwrap().index_ids(), table.index_ids());
	}

	#[test]
	fn test_failed_rename_changes_nothing() {
		let store = KvStore::memory();
		let ddl = open(store.clone());
		ddl.create_table(simple_table("db.t")).unwrap();

		store.crash_after(1);
		assert_eq!(ddl.rename("db.t", "db.v").unwrap_err().code(), "DICT_006");
		assert!(ddl.find("db.t").is_some());
		assert!(ddl.find("db.v").is_none());
		ddl.cleanup();
		drop(ddl);

		let ddl = open(store);
		assert!(ddl.find("db.t").is_some());
		assert!(ddl.find("db.v").is_none());
	}

	#[test]
	fn test_failed_drop_keeps_table() {
		let store = KvStore::memory();
		let ddl = open(store.clone());
		let table = ddl.create_table(simple_table("db.t")).unwrap();

		store.crash_after(0);
		assert_eq!(ddl.drop_table("db.t").unwrap_err().code(), "DICT_006");
		assert!(ddl.find("db.t").is_some());
		assert!(ddl.dict().is_drop_index_empty().unwrap());
		assert_eq!(ddl.safe_get_table_name(table.index_ids()[1]).as_deref(), Some("db.t"));
	}
}
