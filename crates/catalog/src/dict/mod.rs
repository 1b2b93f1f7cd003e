// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

//! The persistent dictionary.
//!
//! All metadata lives in the system column family as small versioned
//! records (see [`key`] and [`record`]). Mutations are staged into a
//! [`WriteBatch`] and become visible together on [`DictManager::commit`].
//! Dropping or creating an index online leaves a marker record behind until
//! the operation finishes, so [`DictManager::init`] can finish drops and
//! undo creates that a crash interrupted.

use std::collections::BTreeSet;

use parking_lot::{Mutex, MutexGuard};
use rowkey_codec::{IndexInfo, IndexStats};
use rowkey_core::{
	CfId, Error, IndexId, IntoDiagnostic, Result,
	error::diagnostic::dictionary::DictionaryError,
	return_error,
};
use rowkey_store_single::{ColumnFamily, DEFAULT_CF_NAME, KvStorage, KvStore, SYSTEM_CF_NAME, WriteBatch};
use tracing::{debug, error, info, instrument, warn};

pub use key::{CfDefinitionKey, DdlEntryKey, DictKey, END_DICT_INDEX_ID, IndexKey, MaxIndexIdKey, RecordType};
pub use record::{AUTO_CF_FLAG, PER_PARTITION_CF_FLAG, REVERSE_CF_FLAG};

pub mod key;
pub mod record;

/// A long running index operation tracked by a marker record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndexOperation {
	Create,
	Drop,
}

impl IndexOperation {
	fn record(self) -> RecordType {
		match self {
			IndexOperation::Create => RecordType::CreateIndexOngoing,
			IndexOperation::Drop => RecordType::DropIndexOngoing,
		}
	}
}

pub struct DictManager {
	store: KvStore,
	system_cf: ColumnFamily,
	default_cf: ColumnFamily,
	lock: Mutex<()>,
}

impl DictManager {
	/// Opens the dictionary without running startup recovery.
	pub fn new(store: KvStore) -> Result<Self> {
		let system_cf = store.column_family(SYSTEM_CF_NAME)?;
		let default_cf = store.column_family(DEFAULT_CF_NAME)?;
		Ok(Self {
			store,
			system_cf,
			default_cf,
			lock: Mutex::new(()),
		})
	}

	/// Opens the dictionary, finishes interrupted drops, rolls back
	/// interrupted creates and registers the built-in column families.
	#[instrument(name = "dict::init", level = "debug", skip(store))]
	pub fn init(store: KvStore) -> Result<Self> {
		let dict = Self::new(store)?;
		dict.resume_drop_indexes()?;
		dict.rollback_ongoing_index_creation()?;

		let mut batch = dict.begin();
		dict.add_cf_flags(&mut batch, dict.system_cf.id, 0);
		dict.add_cf_flags(&mut batch, dict.default_cf.id, 0);
		dict.commit(batch, true)?;
		Ok(dict)
	}

	pub fn store(&self) -> &KvStore {
		&self.store
	}

	pub fn system_cf(&self) -> &ColumnFamily {
		&self.system_cf
	}

	pub fn default_cf(&self) -> &ColumnFamily {
		&self.default_cf
	}

	/// Serializes read-modify-write sequences over dictionary records.
	pub fn lock(&self) -> MutexGuard<'_, ()> {
		self.lock.lock()
	}

	pub fn begin(&self) -> WriteBatch {
		WriteBatch::new()
	}

	#[instrument(name = "dict::commit", level = "debug", skip(self, batch), fields(len = batch.len()))]
	pub fn commit(&self, batch: WriteBatch, sync: bool) -> Result<()> {
		if batch.is_empty() {
			return Ok(());
		}
		self.store.commit(batch, sync).map_err(|err| {
			error!(error = %err, "dictionary commit failed");
			Error(DictionaryError::CommitFailed.into_diagnostic().with_cause(err.diagnostic()))
		})
	}

	pub fn put_key(&self, batch: &mut WriteBatch, key: Vec<u8>, value: Vec<u8>) {
		batch.put(self.system_cf.id, key, value);
	}

	pub fn delete_key(&self, batch: &mut WriteBatch, key: Vec<u8>) {
		batch.delete(self.system_cf.id, key);
	}

	pub fn get_value(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
		self.store.get(self.system_cf.id, key)
	}

	/// Records (or replaces) the index info of `info.id`.
	pub fn add_or_update_index_cf_mapping(&self, batch: &mut WriteBatch, info: &IndexInfo) {
		let key = IndexKey::new(RecordType::IndexInfo, info.id);
		self.put_key(batch, key.encode(), record::encode_index_info(info));
	}

	/// Removes the index info together with the statistics and the
	/// auto-increment value of the index.
	pub fn delete_index_info(&self, batch: &mut WriteBatch, id: IndexId) {
		for record in [RecordType::IndexInfo, RecordType::IndexStatistics, RecordType::AutoInc] {
			self.delete_key(batch, IndexKey::new(record, id).encode());
		}
	}

	pub fn get_index_info(&self, id: IndexId) -> Result<Option<IndexInfo>> {
		let key = IndexKey::new(RecordType::IndexInfo, id);
		match self.get_value(&key.encode())? {
			Some(value) => record::decode_index_info(id, &value).map(Some),
			None => Ok(None),
		}
	}

	pub fn add_cf_flags(&self, batch: &mut WriteBatch, cf_id: CfId, flags: u32) {
		let key = CfDefinitionKey {
			cf_id,
		};
		self.put_key(batch, key.encode(), record::encode_cf_flags(flags));
	}

	pub fn get_cf_flags(&self, cf_id: CfId) -> Result<Option<u32>> {
		let key = CfDefinitionKey {
			cf_id,
		};
		match self.get_value(&key.encode())? {
			Some(value) => record::decode_cf_flags(&value).map(Some),
			None => Ok(None),
		}
	}

	pub fn start_ongoing_index_operation(&self, batch: &mut WriteBatch, id: IndexId, op: IndexOperation) {
		let key = IndexKey::new(op.record(), id);
		self.put_key(batch, key.encode(), record::encode_ongoing());
	}

	pub fn end_ongoing_index_operation(&self, batch: &mut WriteBatch, id: IndexId, op: IndexOperation) {
		self.delete_key(batch, IndexKey::new(op.record(), id).encode());
	}

	pub fn is_index_operation_ongoing(&self, id: IndexId, op: IndexOperation) -> Result<bool> {
		Ok(self.get_value(&IndexKey::new(op.record(), id).encode())?.is_some())
	}

	/// Every index with a pending `op` marker.
	pub fn get_ongoing_index_operation(&self, op: IndexOperation) -> Result<BTreeSet<IndexId>> {
		let prefix = op.record().prefix();
		let mut ids = BTreeSet::new();
		for (key, _) in self.store.scan_prefix(self.system_cf.id, &prefix)? {
			let Some(key) = IndexKey::decode(&key) else {
				return_error!(DictionaryError::InvalidRecordSize {
					record: "ongoing index operation",
					size: key.len(),
				});
			};
			ids.insert(key.id);
		}
		Ok(ids)
	}

	pub fn is_drop_index_empty(&self) -> Result<bool> {
		Ok(self.get_ongoing_index_operation(IndexOperation::Drop)?.is_empty())
	}

	/// Marks all indexes of a dropped table for removal.
	pub fn add_drop_table(&self, batch: &mut WriteBatch, ids: &[IndexId]) -> Result<()> {
		self.add_drop_index(batch, ids)
	}

	/// Marks `ids` drop-ongoing. An index still being built loses its
	/// create marker in the same batch.
	pub fn add_drop_index(&self, batch: &mut WriteBatch, ids: &[IndexId]) -> Result<()> {
		for id in ids {
			let building = self.is_index_operation_ongoing(*id, IndexOperation::Create)?;
			self.log_start_drop_index(*id, "Begin", building)?;
			self.start_drop_index(batch, *id, building);
		}
		Ok(())
	}

	fn start_drop_index(&self, batch: &mut WriteBatch, id: IndexId, building: bool) {
		self.start_ongoing_index_operation(batch, id, IndexOperation::Drop);
		if building {
			self.end_ongoing_index_operation(batch, id, IndexOperation::Create);
		}
	}

	pub fn add_create_index(&self, batch: &mut WriteBatch, ids: &[IndexId]) {
		for id in ids {
			info!(index = %id, "Begin index creation");
			self.start_ongoing_index_operation(batch, *id, IndexOperation::Create);
		}
	}

	/// Completes a create or a drop of `ids`. A finished drop also clears
	/// a leftover create marker and the index's dictionary records.
	#[instrument(name = "dict::finish_indexes_operation", level = "debug", skip(self, ids))]
	pub fn finish_indexes_operation(&self, ids: &[IndexId], op: IndexOperation) -> Result<()> {
		let mut batch = self.begin();
		let incomplete_creates = self.get_ongoing_index_operation(IndexOperation::Create)?;

		for id in ids {
			if self.is_index_operation_ongoing(*id, op)? {
				self.end_ongoing_index_operation(&mut batch, *id, op);
				if op == IndexOperation::Drop && incomplete_creates.contains(id) {
					self.end_ongoing_index_operation(&mut batch, *id, IndexOperation::Create);
				}
			}
			if op == IndexOperation::Drop {
				self.delete_index_info(&mut batch, *id);
			}
		}
		self.commit(batch, true)
	}

	/// Checks pending drops left by a previous run. The purge itself picks
	/// them up later.
	#[instrument(name = "dict::resume_drop_indexes", level = "debug", skip(self))]
	pub fn resume_drop_indexes(&self) -> Result<()> {
		let ids = self.get_ongoing_index_operation(IndexOperation::Drop)?;
		let max = self.get_max_index_id()?.unwrap_or(0);
		for id in ids {
			if self.get_index_info(id)?.is_none() {
				// a rolled back create may never have written its info
				warn!(index = %id, "dropped index has no index info");
			}
			info!(index = %id, "Resume drop index");
			if id.index_id > max {
				error!(index = %id, max, "dropped index is above the max index id");
				return_error!(DictionaryError::MaxIndexIdRegression {
					current: max,
					requested: id.index_id,
				});
			}
		}
		Ok(())
	}

	/// Turns every unfinished create into a drop.
	#[instrument(name = "dict::rollback_ongoing_index_creation", level = "debug", skip(self))]
	pub fn rollback_ongoing_index_creation(&self) -> Result<()> {
		let mut batch = self.begin();
		for id in self.get_ongoing_index_operation(IndexOperation::Create)? {
			info!(index = %id, "Removing incomplete create index");
			self.start_drop_index(&mut batch, id, true);
		}
		self.commit(batch, true)
	}

	fn log_start_drop_index(&self, id: IndexId, action: &str, building: bool) -> Result<()> {
		if !building && self.get_index_info(id)?.is_none() {
			error!(index = %id, "dropped index has no index info");
			return_error!(DictionaryError::MissingIndexInfo {
				index_id: id,
			});
		}
		info!(index = %id, "{} drop index", action);
		Ok(())
	}

	pub fn get_max_index_id(&self) -> Result<Option<u32>> {
		match self.get_value(&MaxIndexIdKey.encode())? {
			Some(value) => record::decode_max_index_id(&value).map(Some),
			None => Ok(None),
		}
	}

	/// Stages a new max index number. Moving it backwards is refused.
	pub fn update_max_index_id(&self, batch: &mut WriteBatch, index_number: u32) -> Result<()> {
		if let Some(current) = self.get_max_index_id()? {
			if current > index_number {
				error!(current, requested = index_number, "max index id would move backwards");
				return_error!(DictionaryError::MaxIndexIdRegression {
					current,
					requested: index_number,
				});
			}
		}
		self.put_key(batch, MaxIndexIdKey.encode(), record::encode_max_index_id(index_number));
		Ok(())
	}

	pub fn add_stats(&self, batch: &mut WriteBatch, stats: &[IndexStats]) {
		for stat in stats {
			let key = IndexKey::new(RecordType::IndexStatistics, stat.gl_index_id);
			self.put_key(batch, key.encode(), stat.to_bytes());
		}
	}

	pub fn get_stats(&self, id: IndexId) -> Result<Option<IndexStats>> {
		let key = IndexKey::new(RecordType::IndexStatistics, id);
		match self.get_value(&key.encode())? {
			Some(value) => IndexStats::from_bytes(&value).map(Some),
			None => Ok(None),
		}
	}

	/// Without `overwrite` the stored value only ever grows: the larger of
	/// the stored and the given value is written.
	pub fn put_auto_incr_val(&self, batch: &mut WriteBatch, id: IndexId, value: u64, overwrite: bool) -> Result<()> {
		let value = if overwrite {
			value
		} else {
			self.get_auto_incr_val(id)?.map_or(value, |stored| stored.max(value))
		};
		let key = IndexKey::new(RecordType::AutoInc, id);
		self.put_key(batch, key.encode(), record::encode_auto_incr(value));
		debug!(index = %id, value, "auto increment staged");
		Ok(())
	}

	pub fn get_auto_incr_val(&self, id: IndexId) -> Result<Option<u64>> {
		let key = IndexKey::new(RecordType::AutoInc, id);
		match self.get_value(&key.encode())? {
			Some(value) => record::decode_auto_incr(&value).map(Some),
			None => Ok(None),
		}
	}
}
