// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use std::path::{Path, PathBuf};

use serde::Deserialize;

pub(crate) const IN_MEMORY_PATH: &str = ":memory:";

/// Configuration for the SQLite backend.
#[derive(Debug, Clone, Deserialize)]
pub struct SqliteConfig {
	/// Database file, or a directory that receives `rowkey.db`.
	pub path: PathBuf,
	pub flags: OpenFlags,
	pub journal_mode: JournalMode,
	pub synchronous_mode: SynchronousMode,
	pub temp_store: TempStore,
}

impl SqliteConfig {
	pub fn new(path: impl AsRef<Path>) -> Self {
		Self {
			path: path.as_ref().to_path_buf(),
			flags: OpenFlags::default(),
			journal_mode: JournalMode::Wal,
			synchronous_mode: SynchronousMode::Normal,
			temp_store: TempStore::Memory,
		}
	}

	/// Full durability on every commit.
	pub fn safe(path: impl AsRef<Path>) -> Self {
		Self {
			synchronous_mode: SynchronousMode::Full,
			temp_store: TempStore::File,
			..Self::new(path)
		}
	}

	/// No fsync and an in-memory journal, for tests and benchmarks.
	pub fn fast(path: impl AsRef<Path>) -> Self {
		Self {
			journal_mode: JournalMode::Memory,
			synchronous_mode: SynchronousMode::Off,
			..Self::new(path)
		}
	}

	pub fn in_memory() -> Self {
		Self {
			journal_mode: JournalMode::Memory,
			synchronous_mode: SynchronousMode::Off,
			..Self::new(IN_MEMORY_PATH)
		}
	}

	pub fn journal_mode(mut self, mode: JournalMode) -> Self {
		self.journal_mode = mode;
		self
	}

	pub fn synchronous_mode(mut self, mode: SynchronousMode) -> Self {
		self.synchronous_mode = mode;
		self
	}

	pub fn temp_store(mut self, store: TempStore) -> Self {
		self.temp_store = store;
		self
	}

	pub fn flags(mut self, flags: OpenFlags) -> Self {
		self.flags = flags;
		self
	}

	pub(crate) fn is_in_memory(&self) -> bool {
		self.path.as_os_str() == IN_MEMORY_PATH
	}
}

#[derive(Debug, Clone, Deserialize)]
pub struct OpenFlags {
	pub read_write: bool,
	pub create: bool,
	pub full_mutex: bool,
	pub no_mutex: bool,
	pub shared_cache: bool,
	pub private_cache: bool,
	pub uri: bool,
}

impl Default for OpenFlags {
	fn default() -> Self {
		Self {
			read_write: true,
			create: true,
			full_mutex: true,
			no_mutex: false,
			shared_cache: false,
			private_cache: false,
			uri: false,
		}
	}
}

impl OpenFlags {
	pub fn read_write(mut self, enabled: bool) -> Self {
		self.read_write = enabled;
		self
	}

	pub fn create(mut self, enabled: bool) -> Self {
		self.create = enabled;
		self
	}

	pub fn full_mutex(mut self) -> Self {
		self.full_mutex = true;
		self.no_mutex = false;
		self
	}

	pub fn no_mutex(mut self) -> Self {
		self.no_mutex = true;
		self.full_mutex = false;
		self
	}

	pub(crate) fn to_rusqlite(&self) -> rusqlite::OpenFlags {
		let mut flags = rusqlite::OpenFlags::empty();

		if self.read_write {
			flags |= rusqlite::OpenFlags::SQLITE_OPEN_READ_WRITE;
		} else {
			flags |= rusqlite::OpenFlags::SQLITE_OPEN_READ_ONLY;
		}
		if self.create {
			flags |= rusqlite::OpenFlags::SQLITE_OPEN_CREATE;
		}
		if self.full_mutex {
			flags |= rusqlite::OpenFlags::SQLITE_OPEN_FULL_MUTEX;
		}
		if self.no_mutex {
			flags |= rusqlite::OpenFlags::SQLITE_OPEN_NO_MUTEX;
		}
		if self.shared_cache {
			flags |= rusqlite::OpenFlags::SQLITE_OPEN_SHARED_CACHE;
		}
		if self.private_cache {
			flags |= rusqlite::OpenFlags::SQLITE_OPEN_PRIVATE_CACHE;
		}
		if self.uri {
			flags |= rusqlite::OpenFlags::SQLITE_OPEN_URI;
		}
		flags
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum JournalMode {
	Delete,
	Truncate,
	Persist,
	Memory,
	Wal,
	Off,
}

impl JournalMode {
	pub fn as_str(&self) -> &'static str {
		match self {
			JournalMode::Delete => "DELETE",
			JournalMode::Truncate => "TRUNCATE",
			JournalMode::Persist => "PERSIST",
			JournalMode::Memory => "MEMORY",
			JournalMode::Wal => "WAL",
			JournalMode::Off => "OFF",
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum SynchronousMode {
	Off,
	Normal,
	Full,
	Extra,
}

impl SynchronousMode {
	pub fn as_str(&self) -> &'static str {
		match self {
			SynchronousMode::Off => "OFF",
			SynchronousMode::Normal => "NORMAL",
			SynchronousMode::Full => "FULL",
			SynchronousMode::Extra => "EXTRA",
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum TempStore {
	Default,
	File,
	Memory,
}

impl TempStore {
	pub fn as_str(&self) -> &'static str {
		match self {
			TempStore::Default => "DEFAULT",
			TempStore::File => "FILE",
			TempStore::Memory => "MEMORY",
		}
	}
}
