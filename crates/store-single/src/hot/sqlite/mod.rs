// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

mod config;

use std::{
	ops::Deref,
	path::{Path, PathBuf},
	sync::Arc,
};

pub use config::{JournalMode, OpenFlags, SqliteConfig, SynchronousMode, TempStore};
use parking_lot::Mutex;
use rowkey_core::{CfId, Delta, Result, error::diagnostic::store::StoreError};
use rusqlite::{Connection, OptionalExtension, params};
use tracing::{debug, instrument, trace};

use crate::{
	ColumnFamily, DEFAULT_CF_ID, DEFAULT_CF_NAME, KvStorage, SYSTEM_CF_ID, SYSTEM_CF_NAME, WriteBatch,
	crash::CrashPoint,
};

#[derive(Clone)]
pub struct SqliteStorage(Arc<SqliteInner>);

pub struct SqliteInner {
	conn: Mutex<Connection>,
	journal_mode: JournalMode,
	crash: CrashPoint,
}

impl Deref for SqliteStorage {
	type Target = SqliteInner;
	fn deref(&self) -> &Self::Target {
		&self.0
	}
}

fn backend(err: rusqlite::Error) -> StoreError {
	StoreError::backend(err)
}

impl SqliteStorage {
	/// Open (or create) the database described by `config`.
	pub fn new(config: SqliteConfig) -> Result<Self> {
		let conn = if config.is_in_memory() {
			Connection::open_in_memory_with_flags(config.flags.to_rusqlite()).map_err(backend)?
		} else {
			let db_path = Self::resolve_db_path(&config.path)?;
			debug!(path = %db_path.display(), "opening sqlite store");
			Connection::open_with_flags(db_path, config.flags.to_rusqlite()).map_err(backend)?
		};

		conn.pragma_update(None, "journal_mode", config.journal_mode.as_str()).map_err(backend)?;
		conn.pragma_update(None, "synchronous", config.synchronous_mode.as_str()).map_err(backend)?;
		conn.pragma_update(None, "temp_store", config.temp_store.as_str()).map_err(backend)?;

		conn.execute_batch(
			"BEGIN;
			 CREATE TABLE IF NOT EXISTS entries (
			     cf      INTEGER NOT NULL,
			     key     BLOB NOT NULL,
			     value   BLOB NOT NULL,
			     PRIMARY KEY (cf, key)
			 ) WITHOUT ROWID;

			 CREATE TABLE IF NOT EXISTS column_families (
			     name    TEXT NOT NULL,
			     id      INTEGER NOT NULL UNIQUE,
			     PRIMARY KEY (name)
			 );
			 COMMIT;",
		)
		.map_err(backend)?;

		conn.execute(
			"INSERT OR IGNORE INTO column_families (name, id) VALUES (?1, ?2), (?3, ?4)",
			params![DEFAULT_CF_NAME, DEFAULT_CF_ID, SYSTEM_CF_NAME, SYSTEM_CF_ID],
		)
		.map_err(backend)?;

		Ok(Self(Arc::new(SqliteInner {
			conn: Mutex::new(conn),
			journal_mode: config.journal_mode,
			crash: CrashPoint::default(),
		})))
	}

	pub fn in_memory() -> Result<Self> {
		Self::new(SqliteConfig::in_memory())
	}

	fn resolve_db_path(config_path: &Path) -> Result<PathBuf> {
		if config_path.extension().is_none() {
			// Path is a directory, ensure it exists and create db file inside
			std::fs::create_dir_all(config_path).map_err(StoreError::backend)?;
			Ok(config_path.join("rowkey.db"))
		} else {
			if let Some(parent) = config_path.parent() {
				std::fs::create_dir_all(parent).map_err(StoreError::backend)?;
			}
			Ok(config_path.to_path_buf())
		}
	}
}

impl KvStorage for SqliteStorage {
	fn get(&self, cf: CfId, key: &[u8]) -> Result<Option<Vec<u8>>> {
		let conn = self.conn.lock();
		Ok(conn
			.query_row(
				"SELECT value FROM entries WHERE cf = ?1 AND key = ?2",
				params![cf, key],
				|row| row.get::<_, Vec<u8>>(0),
			)
			.optional()
			.map_err(backend)?)
	}

	fn scan_prefix(&self, cf: CfId, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>> {
		let conn = self.conn.lock();
		let mut stmt = conn
			.prepare_cached("SELECT key, value FROM entries WHERE cf = ?1 AND key >= ?2 ORDER BY key ASC")
			.map_err(backend)?;
		let rows = stmt
			.query_map(params![cf, prefix], |row| Ok((row.get::<_, Vec<u8>>(0)?, row.get::<_, Vec<u8>>(1)?)))
			.map_err(backend)?;

		let mut result = Vec::new();
		for row in rows {
			let (key, value) = row.map_err(backend)?;
			if !key.starts_with(prefix) {
				break;
			}
			result.push((key, value));
		}
		Ok(result)
	}

	#[instrument(name = "store::sqlite::commit", level = "trace", skip(self, batch), fields(len = batch.len()))]
	fn commit(&self, batch: WriteBatch, sync: bool) -> Result<()> {
		let mut conn = self.conn.lock();
		// dropping the transaction without commit rolls it back
		let tx = conn.transaction().map_err(backend)?;
		for (idx, delta) in batch.deltas().iter().enumerate() {
			self.crash.check(idx)?;
			match delta {
				Delta::Set {
					cf,
					key,
					value,
				} => {
					tx.execute(
						"INSERT OR REPLACE INTO entries (cf, key, value) VALUES (?1, ?2, ?3)",
						params![cf, key, value],
					)
					.map_err(backend)?;
				}
				Delta::Remove {
					cf,
					key,
				} => {
					tx.execute("DELETE FROM entries WHERE cf = ?1 AND key = ?2", params![cf, key])
						.map_err(backend)?;
				}
			}
		}
		tx.commit().map_err(backend)?;

		if sync && self.journal_mode == JournalMode::Wal {
			conn.query_row("PRAGMA wal_checkpoint(FULL)", [], |_| Ok(())).map_err(backend)?;
		}
		trace!(sync, "sqlite batch committed");
		Ok(())
	}

	fn column_family(&self, name: &str) -> Result<ColumnFamily> {
		let conn = self.conn.lock();
		let existing = conn
			.query_row("SELECT id FROM column_families WHERE name = ?1", params![name], |row| row.get::<_, u32>(0))
			.optional()
			.map_err(backend)?;
		if let Some(id) = existing {
			return Ok(ColumnFamily::new(id, name));
		}

		let id: u32 = conn
			.query_row("SELECT COALESCE(MAX(id), -1) + 1 FROM column_families", [], |row| row.get(0))
			.map_err(backend)?;
		conn.execute("INSERT INTO column_families (name, id) VALUES (?1, ?2)", params![name, id])
			.map_err(backend)?;
		debug!(cf = name, id, "created column family");
		Ok(ColumnFamily::new(id, name))
	}

	fn column_families(&self) -> Result<Vec<ColumnFamily>> {
		let conn = self.conn.lock();
		let mut stmt = conn.prepare("SELECT id, name FROM column_families ORDER BY id").map_err(backend)?;
		let rows = stmt
			.query_map([], |row| Ok(ColumnFamily::new(row.get::<_, u32>(0)?, row.get::<_, String>(1)?)))
			.map_err(backend)?;
		let mut result = Vec::new();
		for row in rows {
			result.push(row.map_err(backend)?);
		}
		Ok(result)
	}

	fn crash_after(&self, staged: usize) {
		self.crash.arm(staged);
	}
}

#[cfg(test)]
mod tests {
	use rowkey_testing::tempdir::temp_dir;

	use super::*;

	#[test]
	fn test_resolve_db_path_with_directory() {
		temp_dir(|temp_path| {
			let dir_path = temp_path.join("mydb");

			let result = SqliteStorage::resolve_db_path(&dir_path).unwrap();
			assert_eq!(result, dir_path.join("rowkey.db"));
			assert!(dir_path.is_dir());

			Ok(())
		})
		.expect("test failed");
	}

	#[test]
	fn test_resolve_db_path_with_file() {
		temp_dir(|temp_path| {
			let file_path = temp_path.join("nested").join("custom.db");

			let result = SqliteStorage::resolve_db_path(&file_path).unwrap();
			assert_eq!(result, file_path);
			assert!(temp_path.join("nested").is_dir());

			Ok(())
		})
		.expect("test failed");
	}

	#[test]
	fn test_scan_prefix_order() {
		let storage = SqliteStorage::in_memory().unwrap();
		let mut batch = WriteBatch::new();
		batch.put(0, vec![1, 0xff], vec![2]);
		batch.put(0, vec![1, 0x00], vec![1]);
		batch.put(0, vec![2], vec![3]);
		batch.put(5, vec![1, 0x10], vec![4]);
		storage.commit(batch, false).unwrap();

		let found = storage.scan_prefix(0, &[1]).unwrap();
		assert_eq!(found, vec![(vec![1, 0x00], vec![1]), (vec![1, 0xff], vec![2])]);
	}

	#[test]
	fn test_crash_rolls_back() {
		let storage = SqliteStorage::in_memory().unwrap();
		let mut batch = WriteBatch::new();
		batch.put(0, b"a".to_vec(), b"1".to_vec());
		batch.put(0, b"b".to_vec(), b"2".to_vec());
		storage.crash_after(1);

		assert!(storage.commit(batch, false).is_err());
		assert_eq!(storage.get(0, b"a").unwrap(), None);
	}

	#[test]
	fn test_durable_across_reopen() {
		temp_dir(|path| {
			{
				let storage = SqliteStorage::new(SqliteConfig::safe(path)).unwrap();
				let cf = storage.column_family("cf_a").unwrap();
				let mut batch = WriteBatch::new();
				batch.put(cf.id, b"k".to_vec(), b"v".to_vec());
				storage.commit(batch, true).unwrap();
			}

			let storage = SqliteStorage::new(SqliteConfig::safe(path)).unwrap();
			let cf = storage.column_family("cf_a").unwrap();
			assert_eq!(cf.id, 2);
			assert_eq!(storage.get(cf.id, b"k").unwrap(), Some(b"v".to_vec()));
			Ok(())
		})
		.expect("test failed");
	}
}
