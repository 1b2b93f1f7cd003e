// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use std::time::Duration;

use rowkey_codec::CodecConfig;
use serde::Deserialize;

/// Configuration for the background statistics worker.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StatsWorkerConfig {
	/// Maximum number of queued flush requests.
	pub channel_capacity: usize,
	/// Maximum time queued statistics wait before they are written.
	pub flush_interval: Duration,
}

impl Default for StatsWorkerConfig {
	fn default() -> Self {
		Self {
			channel_capacity: 1024,
			flush_interval: Duration::from_millis(50),
		}
	}
}

impl StatsWorkerConfig {
	pub fn with_channel_capacity(mut self, capacity: usize) -> Self {
		self.channel_capacity = capacity;
		self
	}

	pub fn with_flush_interval(mut self, interval: Duration) -> Self {
		self.flush_interval = interval;
		self
	}
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
	/// Applied to every index definition the catalog builds.
	pub codec: CodecConfig,
	pub stats_worker: StatsWorkerConfig,
	/// Commit DDL batches durably.
	pub sync_commits: bool,
	/// Check stored auto-increment values against live primary keys at
	/// startup.
	pub validate_auto_increment: bool,
}

impl Default for CatalogConfig {
	fn default() -> Self {
		Self {
			codec: CodecConfig::default(),
			stats_worker: StatsWorkerConfig::default(),
			sync_commits: true,
			validate_auto_increment: true,
		}
	}
}

impl CatalogConfig {
	pub fn with_codec(mut self, codec: CodecConfig) -> Self {
		self.codec = codec;
		self
	}

	pub fn with_stats_worker(mut self, config: StatsWorkerConfig) -> Self {
		self.stats_worker = config;
		self
	}

	pub fn with_sync_commits(mut self, sync: bool) -> Self {
		self.sync_commits = sync;
		self
	}

	pub fn with_validate_auto_increment(mut self, validate: bool) -> Self {
		self.validate_auto_increment = validate;
		self
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_partial_json() {
		let config: CatalogConfig = serde_json::from_str(r#"{"sync_commits": false}"#).unwrap();
		assert!(!config.sync_commits);
		assert!(config.validate_auto_increment);
		assert_eq!(config.stats_worker.channel_capacity, 1024);
		assert_eq!(config.codec, CodecConfig::default());
		assert_eq!(config.stats_worker.flush_interval, Duration::from_millis(50));
	}
}
