// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

#![cfg_attr(not(debug_assertions), deny(warnings))]

pub use batch::WriteBatch;
pub use cf::{ColumnFamily, DEFAULT_CF_ID, DEFAULT_CF_NAME, SYSTEM_CF_ID, SYSTEM_CF_NAME};
pub use hot::{
	memory::MemoryStorage,
	sqlite::{JournalMode, OpenFlags, SqliteConfig, SqliteStorage, SynchronousMode, TempStore},
	tier::KvStore,
};
pub use tier::KvStorage;

mod batch;
mod cf;
mod crash;
pub mod hot;
mod tier;
