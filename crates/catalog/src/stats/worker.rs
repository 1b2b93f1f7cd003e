// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

//! Background worker that writes queued index statistics.
//!
//! Statistics change on every write to an index. Instead of a dictionary
//! commit per change, changes are collected in [`PendingStats`] and this
//! worker flushes them at most once per flush interval.

use std::{
	sync::{
		Arc,
		atomic::{AtomicBool, Ordering},
	},
	thread::{self, JoinHandle},
	time::{Duration, Instant},
};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, bounded};
use rowkey_core::{Result, internal_error};
use tracing::{debug, error, trace};

use super::PendingStats;
use crate::config::StatsWorkerConfig;

enum StatsMessage {
	/// Statistics changed; flush them soon.
	Request,
	Shutdown,
}

pub struct StatsWorker {
	sender: Sender<StatsMessage>,
	running: Arc<AtomicBool>,
	worker: Option<JoinHandle<()>>,
}

impl StatsWorker {
	pub fn new(config: StatsWorkerConfig, stats: Arc<PendingStats>) -> Result<Self> {
		let (sender, receiver) = bounded(config.channel_capacity);
		let running = Arc::new(AtomicBool::new(true));

		let worker_running = Arc::clone(&running);
		let worker = thread::Builder::new()
			.name("stats-worker".to_string())
			.spawn(move || {
				Self::worker_loop(receiver, stats, config, worker_running);
			})
			.map_err(|err| internal_error!("failed to spawn stats worker thread: {}", err))?;

		Ok(Self {
			sender,
			running,
			worker: Some(worker),
		})
	}

	/// Asks for a flush. A full channel already holds a pending request.
	#[inline]
	pub fn queue_save(&self) {
		let _ = self.sender.try_send(StatsMessage::Request);
	}

	/// Flushes what is pending and waits for the thread to finish.
	pub fn stop(&mut self) {
		if !self.running.swap(false, Ordering::AcqRel) {
			return;
		}

		let _ = self.sender.send(StatsMessage::Shutdown);

		if let Some(worker) = self.worker.take() {
			let _ = worker.join();
		}
	}

	fn worker_loop(
		receiver: Receiver<StatsMessage>,
		stats: Arc<PendingStats>,
		config: StatsWorkerConfig,
		running: Arc<AtomicBool>,
	) {
		debug!("Stats worker started");

		let mut dirty = false;
		let mut last_flush = Instant::now();

		while running.load(Ordering::Acquire) {
			match receiver.recv_timeout(Duration::from_millis(10)) {
				Ok(StatsMessage::Request) => {
					dirty = true;
				}
				Ok(StatsMessage::Shutdown) => {
					debug!("Stats worker received shutdown signal");
					break;
				}
				Err(RecvTimeoutError::Timeout) => {}
				Err(RecvTimeoutError::Disconnected) => {
					debug!("Stats worker channel disconnected");
					break;
				}
			}

			if dirty && last_flush.elapsed() >= config.flush_interval {
				Self::flush(&stats);
				dirty = false;
				last_flush = Instant::now();
			}
		}

		Self::flush(&stats);
		debug!("Stats worker stopped");
	}

	fn flush(stats: &PendingStats) {
		if stats.is_empty() {
			return;
		}
		trace!("Stats worker flushing {} entries", stats.len());
		if let Err(err) = stats.persist(false) {
			error!(error = %err, "failed to persist index statistics");
		}
	}
}

impl Drop for StatsWorker {
	fn drop(&mut self) {
		self.stop();
	}
}

#[cfg(test)]
mod tests {
	use rowkey_codec::IndexStats;
	use rowkey_core::IndexId;
	use rowkey_store_single::KvStore;

	use super::*;
	use crate::dict::DictManager;

	fn setup(flush_interval: Duration) -> (Arc<DictManager>, Arc<PendingStats>, StatsWorker) {
		let dict = Arc::new(DictManager::init(KvStore::memory()).unwrap());
		let pending = Arc::new(PendingStats::new(dict.clone()));
		let config = StatsWorkerConfig::default().with_flush_interval(flush_interval);
		let worker = StatsWorker::new(config, pending.clone()).unwrap();
		(dict, pending, worker)
	}

	#[test]
	fn test_flushes_after_interval() {
		let (dict, pending, worker) = setup(Duration::from_millis(5));
		let id = IndexId::new(0, 256);
		pending.insert(IndexStats::new(id));
		worker.queue_save();

		let deadline = Instant::now() + Duration::from_secs(5);
		while dict.get_stats(id).unwrap().is_none() && Instant::now() < deadline {
			thread::sleep(Duration::from_millis(5));
		}
		assert!(dict.get_stats(id).unwrap().is_some());
		assert!(pending.is_empty());
	}

	#[test]
	fn test_stop_flushes_pending() {
		let (dict, pending, mut worker) = setup(Duration::from_secs(3600));
		let id = IndexId::new(0, 300);
		pending.insert(IndexStats::new(id));
		worker.queue_save();
		worker.stop();
		assert_eq!(dict.get_stats(id).unwrap(), Some(IndexStats::new(id)));

		worker.stop();
	}
}
