// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

//! Index statistics waiting to be written to the dictionary.
//!
//! Readers always see the statistics held by the index definitions; this
//! map only tracks which of them changed since the last write.

use std::{collections::HashMap, sync::Arc};

use parking_lot::Mutex;
use rowkey_codec::IndexStats;
use rowkey_core::{IndexId, Result};
use tracing::{instrument, trace};

pub use worker::StatsWorker;

use crate::dict::DictManager;

mod worker;

pub struct PendingStats {
	dict: Arc<DictManager>,
	pending: Mutex<HashMap<IndexId, IndexStats>>,
}

impl PendingStats {
	pub fn new(dict: Arc<DictManager>) -> Self {
		Self {
			dict,
			pending: Mutex::new(HashMap::new()),
		}
	}

	pub fn insert(&self, stats: IndexStats) {
		self.pending.lock().insert(stats.gl_index_id, stats);
	}

	pub fn is_empty(&self) -> bool {
		self.pending.lock().is_empty()
	}

	pub fn len(&self) -> usize {
		self.pending.lock().len()
	}

	/// Writes out and forgets everything pending.
	#[instrument(name = "catalog::stats::persist", level = "trace", skip(self))]
	pub fn persist(&self, sync: bool) -> Result<()> {
		let drained: Vec<IndexStats> = self.pending.lock().drain().map(|(_, stats)| stats).collect();
		if drained.is_empty() {
			return Ok(());
		}
		trace!(count = drained.len(), "persisting index statistics");
		let mut batch = self.dict.begin();
		self.dict.add_stats(&mut batch, &drained);
		self.dict.commit(batch, sync)
	}
}
