// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use rowkey_core::{CfId, Result};

use crate::{ColumnFamily, WriteBatch};

/// The ordered key-value store as seen by the codec and catalog: total byte
/// order per column family, point reads, prefix iteration and atomic batch
/// writes.
pub trait KvStorage: Send + Sync {
	fn get(&self, cf: CfId, key: &[u8]) -> Result<Option<Vec<u8>>>;

	/// All entries of `cf` whose key starts with `prefix`, in key order.
	fn scan_prefix(&self, cf: CfId, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>>;

	/// Applies every mutation of `batch` or none of them. With `sync` the
	/// write is durable when this returns.
	fn commit(&self, batch: WriteBatch, sync: bool) -> Result<()>;

	/// Returns the handle for `name`, creating the column family if needed.
	fn column_family(&self, name: &str) -> Result<ColumnFamily>;

	fn column_families(&self) -> Result<Vec<ColumnFamily>>;

	/// Makes the next commit fail after staging `staged` entries, without
	/// applying any of them.
	fn crash_after(&self, staged: usize);
}
