// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

//! The in-memory catalog.
//!
//! Table definitions are published behind one reader-writer lock. Lookups
//! take the shared side and hand out `Arc`s, so a reader keeps an index
//! definition alive even when a concurrent drop unpublishes it. Every
//! schema change is committed to the dictionary first and published only
//! after the commit succeeded.

use std::{
	collections::{BTreeSet, HashMap},
	sync::Arc,
};

use dashmap::DashMap;
use indexmap::IndexMap;
use parking_lot::{Mutex, RwLock};
use rowkey_codec::{IndexDef, IndexStats, IndexType, TableSchema};
use rowkey_core::{
	IndexId, Result,
	error::diagnostic::{catalog::CatalogError, dictionary::DictionaryError},
	return_error,
};
use rowkey_store_single::{KvStorage, WriteBatch};
use tracing::{debug, error, info, instrument, warn};

use crate::{
	config::CatalogConfig,
	dict::{AUTO_CF_FLAG, DdlEntryKey, DictKey, DictManager, IndexKey, PER_PARTITION_CF_FLAG, REVERSE_CF_FLAG, RecordType, record},
	sequence::SequenceGenerator,
	stats::{PendingStats, StatsWorker},
	table::TableDef,
};

pub use alter::REVERSE_CF_PREFIX;

mod alter;

#[derive(Default)]
struct Published {
	tables: IndexMap<String, Arc<TableDef>>,
	/// Index id to owning table and slot in its index list.
	index_num_to_keydef: HashMap<IndexId, (String, usize)>,
}

impl Published {
	fn put(&mut self, table: Arc<TableDef>) {
		for (slot, id) in table.index_ids().into_iter().enumerate() {
			self.index_num_to_keydef.insert(id, (table.name().to_string(), slot));
		}
		self.tables.insert(table.name().to_string(), table);
	}

	fn remove(&mut self, name: &str) -> Option<Arc<TableDef>> {
		let table = self.tables.shift_remove(name)?;
		for id in table.index_ids() {
			if self.index_num_to_keydef.get(&id).is_some_and(|(owner, _)| owner == name) {
				self.index_num_to_keydef.remove(&id);
			}
		}
		Some(table)
	}

	fn find(&self, id: IndexId) -> Option<&Arc<IndexDef>> {
		let (name, slot) = self.index_num_to_keydef.get(&id)?;
		self.tables.get(name)?.indexes().get(*slot)
	}
}

pub struct DdlManager {
	dict: Arc<DictManager>,
	config: CatalogConfig,
	sequence: SequenceGenerator,
	published: RwLock<Published>,
	/// Indexes not (or no longer) reachable through a table: online builds
	/// in progress and dropped indexes awaiting purge.
	uncommitted: DashMap<IndexId, Arc<IndexDef>>,
	stats: Arc<PendingStats>,
	worker: Mutex<Option<StatsWorker>>,
}

impl DdlManager {
	/// Loads every table of the dictionary. `schemas` supplies the SQL
	/// metadata of a table by full name; a table without one is loaded
	/// with an empty schema and its indexes stay unusable until the table
	/// is registered again.
	#[instrument(name = "catalog::ddl::init", level = "debug", skip(dict, config, schemas))]
	pub fn init<F>(dict: Arc<DictManager>, config: CatalogConfig, schemas: F) -> Result<Self>
	where
		F: Fn(&str) -> Option<Arc<TableSchema>>,
	{
		let max_index_id = dict.get_max_index_id()?.unwrap_or(0);
		let mut published = Published::default();

		let prefix = RecordType::DdlEntry.prefix();
		for (key, value) in dict.store().scan_prefix(dict.system_cf().id, &prefix)? {
			let name = match DdlEntryKey::decode(&key) {
				Some(entry) if !entry.name.is_empty() => entry.name,
				_ => {
					error!(len = key.len(), "ddl entry key is corrupt");
					return_error!(DictionaryError::InvalidRecordSize {
						record: "ddl entry key",
						size: key.len(),
					});
				}
			};
			let ids = record::decode_ddl_entry(&value)?;
			let table = Self::load_table(&dict, &config, &name, &ids, max_index_id, &schemas)?;
			published.put(Arc::new(table));
		}

		let count = published.tables.len();
		let stats = Arc::new(PendingStats::new(dict.clone()));
		let worker = StatsWorker::new(config.stats_worker.clone(), stats.clone())?;
		let manager = Self {
			sequence: SequenceGenerator::starting_after(Some(max_index_id)),
			dict,
			config,
			published: RwLock::new(published),
			uncommitted: DashMap::new(),
			stats,
			worker: Mutex::new(Some(worker)),
		};

		if manager.config.validate_auto_increment {
			manager.validate_auto_incr()?;
		}
		info!("loaded DDL data for {} tables", count);
		Ok(manager)
	}

	fn load_table<F>(
		dict: &DictManager,
		config: &CatalogConfig,
		name: &str,
		ids: &[IndexId],
		max_index_id: u32,
		schemas: &F,
	) -> Result<TableDef>
	where
		F: Fn(&str) -> Option<Arc<TableSchema>>,
	{
		let schema = schemas(name).unwrap_or_else(|| {
			warn!(table = name, "no schema for table, its indexes stay unusable");
			Arc::new(TableSchema::new(name, Vec::new()))
		});
		let order = TableDef::key_order(&schema);

		let mut indexes = Vec::with_capacity(ids.len());
		for (slot, id) in ids.iter().enumerate() {
			let Some(info) = dict.get_index_info(*id)? else {
				error!(table = name, index = %id, "could not get index information");
				return_error!(CatalogError::MissingIndexInfo {
					table: name.to_string(),
					index_id: *id,
				});
			};
			if id.index_id > max_index_id {
				error!(index = %id, max = max_index_id, "index id above the max index id");
				return_error!(CatalogError::IndexIdBeyondMax {
					index_id: *id,
					max: max_index_id,
				});
			}
			let Some(cf_flags) = dict.get_cf_flags(id.cf_id)? else {
				error!(table = name, cf = id.cf_id, "could not get column family flags");
				return_error!(CatalogError::MissingCfFlags {
					table: name.to_string(),
					cf_id: id.cf_id,
				});
			};
			if cf_flags & AUTO_CF_FLAG != 0 {
				error!(table = name, cf = id.cf_id, "the defunct AUTO_CF_FLAG is enabled");
			}

			let keyno = match info.index_type {
				IndexType::HiddenPrimary => None,
				_ => order.get(slot).copied().flatten().or(Some(slot)),
			};
			let stats = dict.get_stats(*id)?.unwrap_or_else(|| IndexStats::new(*id));
			let index = IndexDef::new(info, keyno, schema.clone())
				.with_config(config.codec)
				.with_reverse_cf(cf_flags & REVERSE_CF_FLAG != 0)
				.with_per_partition_cf(cf_flags & PER_PARTITION_CF_FLAG != 0)
				.with_stats(stats);
			indexes.push(Arc::new(index));
		}

		let table = TableDef::new(name, schema, indexes);
		if let Some(pk) = table.primary() {
			if let Some(value) = dict.get_auto_incr_val(pk.id())? {
				table.raise_auto_incr_val(value);
			}
		}
		debug!(table = name, indexes = ids.len(), "table loaded");
		Ok(table)
	}

	pub fn dict(&self) -> &Arc<DictManager> {
		&self.dict
	}

	pub fn config(&self) -> &CatalogConfig {
		&self.config
	}

	pub fn sequence(&self) -> &SequenceGenerator {
		&self.sequence
	}

	/// Allocates a new, durable index number.
	pub fn get_and_update_next_number(&self) -> Result<u32> {
		self.sequence.get_and_update_next_number(&self.dict)
	}

	#[instrument(name = "catalog::ddl::find", level = "trace", skip(self))]
	pub fn find(&self, name: &str) -> Option<Arc<TableDef>> {
		self.published.read().tables.get(name).cloned()
	}

	/// The index with `id`: a published one, else an index being built or
	/// awaiting purge.
	#[instrument(name = "catalog::ddl::find_by_id", level = "trace", skip(self))]
	pub fn find_by_id(&self, id: IndexId) -> Option<Arc<IndexDef>> {
		let published = self.published.read();
		if let Some(index) = published.find(id) {
			return Some(index.clone());
		}
		if published.index_num_to_keydef.contains_key(&id) {
			return None;
		}
		self.uncommitted.get(&id).map(|entry| entry.value().clone())
	}

	/// Like [`find_by_id`](Self::find_by_id), but only returns an index
	/// whose byte layout can be built.
	pub fn safe_find(&self, id: IndexId) -> Option<Arc<IndexDef>> {
		self.find_by_id(id).filter(|index| index.setup().is_ok())
	}

	/// An index of a table by index name.
	pub fn find_indexdef(&self, table: &str, index: &str) -> Option<Arc<IndexDef>> {
		self.find(table)?.index_by_name(index).cloned()
	}

	pub fn safe_get_table_name(&self, id: IndexId) -> Option<String> {
		self.published.read().index_num_to_keydef.get(&id).map(|(name, _)| name.clone())
	}

	pub fn add_uncommitted_keydefs(&self, indexes: &[Arc<IndexDef>]) {
		for index in indexes {
			self.uncommitted.insert(index.id(), index.clone());
		}
	}

	pub fn remove_uncommitted_keydefs(&self, ids: &[IndexId]) {
		for id in ids {
			self.uncommitted.remove(id);
		}
	}

	/// Ids of all published indexes.
	pub fn get_all_index_ids(&self) -> BTreeSet<IndexId> {
		self.published.read().index_num_to_keydef.keys().copied().collect()
	}

	pub fn table_count(&self) -> usize {
		self.published.read().tables.len()
	}

	/// Publishes `table` in memory only, replacing a table of the same name.
	pub fn put(&self, table: TableDef) -> Arc<TableDef> {
		let table = Arc::new(table);
		let mut published = self.published.write();
		published.remove(table.name());
		published.put(table.clone());
		table
	}

	/// Unpublishes a table in memory only. Readers holding its indexes keep
	/// them alive.
	pub fn remove(&self, name: &str) -> Option<Arc<TableDef>> {
		self.published.write().remove(name)
	}

	/// Stages `table` into `batch`, commits and then publishes it.
	#[instrument(name = "catalog::ddl::put", level = "debug", skip(self, table, batch), fields(table = table.name()))]
	pub fn put_and_write(&self, table: TableDef, batch: WriteBatch) -> Result<Arc<TableDef>> {
		let _guard = self.dict.lock();
		self.write_locked(table, batch)
	}

	/// Replaces the statistics of each index.
	pub fn set_stats(&self, stats: Vec<IndexStats>) {
		let published = self.published.read();
		for src in stats {
			let Some(index) = self.lookup(&published, src.gl_index_id) else {
				continue;
			};
			index.set_stats(src.clone());
			self.stats.insert(src);
		}
	}

	/// Adds `new_data` to and subtracts `deleted_data` from the statistics
	/// of each index, and queues them for writing.
	pub fn adjust_stats(&self, new_data: &[IndexStats], deleted_data: &[IndexStats]) {
		let published = self.published.read();
		for (data, increment) in [(new_data, true), (deleted_data, false)] {
			for src in data {
				let Some(index) = self.lookup(&published, src.gl_index_id) else {
					continue;
				};
				let key_parts = index.key_parts().unwrap_or(0);
				let estimated_len = index.max_storage_fmt_length().unwrap_or(0) as i64;
				let merged = index.update_stats(|stats| {
					if stats.distinct_keys_per_prefix.len() < key_parts {
						stats.distinct_keys_per_prefix.resize(key_parts, 0);
					}
					stats.merge(src, increment, estimated_len);
					stats.clone()
				});
				self.stats.insert(merged);
			}
		}
		drop(published);

		if !self.stats.is_empty() {
			if let Some(worker) = self.worker.lock().as_ref() {
				worker.queue_save();
			}
		}
	}

	/// Writes all queued statistics now.
	#[instrument(name = "catalog::ddl::persist_stats", level = "debug", skip(self))]
	pub fn persist_stats(&self, sync: bool) -> Result<()> {
		self.stats.persist(sync)
	}

	fn lookup(&self, published: &Published, id: IndexId) -> Option<Arc<IndexDef>> {
		published.find(id).cloned().or_else(|| self.uncommitted.get(&id).map(|entry| entry.value().clone()))
	}

	/// Hands every published table to `scanner`, stopping at the first error.
	pub fn scan_for_tables<S>(&self, mut scanner: S) -> Result<()>
	where
		S: FnMut(&Arc<TableDef>) -> Result<()>,
	{
		let published = self.published.read();
		for table in published.tables.values() {
			scanner(table)?;
		}
		Ok(())
	}

	/// Checks every stored auto-increment value: its key and value must be
	/// well formed and it must belong to the primary key of a live table.
	#[instrument(name = "catalog::ddl::validate_auto_incr", level = "debug", skip(self))]
	pub fn validate_auto_incr(&self) -> Result<()> {
		let prefix = RecordType::AutoInc.prefix();
		for (key, value) in self.dict.store().scan_prefix(self.dict.system_cf().id, &prefix)? {
			let Some(key) = IndexKey::decode(&key) else {
				return_error!(DictionaryError::InvalidRecordSize {
					record: "auto increment key",
					size: key.len(),
				});
			};
			if value.len() <= 2 {
				return_error!(DictionaryError::InvalidRecordSize {
					record: "auto increment",
					size: value.len(),
				});
			}
			let live_primary = self.dict.get_index_info(key.id)?.is_some_and(|info| info.index_type.is_primary());
			if !live_primary {
				warn!(index = %key.id, "auto increment found for an index that is not a primary key");
				return_error!(CatalogError::AutoIncrementOrphan {
					index_id: key.id,
				});
			}
			record::decode_auto_incr(&value)?;
		}
		Ok(())
	}

	/// Stops the statistics worker after a final flush and forgets all
	/// tables.
	#[instrument(name = "catalog::ddl::cleanup", level = "debug", skip(self))]
	pub fn cleanup(&self) {
		if let Some(mut worker) = self.worker.lock().take() {
			worker.stop();
		}
		let mut published = self.published.write();
		published.tables.clear();
		published.index_num_to_keydef.clear();
		self.uncommitted.clear();
	}
}

impl Drop for DdlManager {
	fn drop(&mut self) {
		if let Some(mut worker) = self.worker.get_mut().take() {
			worker.stop();
		}
	}
}
