// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use rowkey_core::{
	IndexId, Result,
	error::diagnostic::dictionary::DictionaryError,
	netbuf::{NetReader, NetWriter},
	return_error,
};

const RECORD: &str = "index statistics";

const VERSION_INITIAL: u16 = 1;
/// Adds the per entry type counters.
const VERSION_ENTRY_TYPES: u16 = 2;

/// Size and cardinality estimates of one index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexStats {
	pub gl_index_id: IndexId,
	pub data_size: i64,
	pub rows: i64,
	pub actual_disk_size: i64,
	pub entry_deletes: i64,
	pub entry_single_deletes: i64,
	pub entry_merges: i64,
	pub entry_others: i64,
	/// Distinct values of each key prefix, `[n]` covering the first `n + 1`
	/// key parts.
	pub distinct_keys_per_prefix: Vec<i64>,
}

impl IndexStats {
	pub fn new(gl_index_id: IndexId) -> Self {
		Self {
			gl_index_id,
			data_size: 0,
			rows: 0,
			actual_disk_size: 0,
			entry_deletes: 0,
			entry_single_deletes: 0,
			entry_merges: 0,
			entry_others: 0,
			distinct_keys_per_prefix: Vec::new(),
		}
	}

	/// Adds (or with `increment == false` subtracts) `other`. A missing
	/// disk size is estimated as `estimated_data_len` per row.
	pub fn merge(&mut self, other: &IndexStats, increment: bool, estimated_data_len: i64) {
		self.gl_index_id = other.gl_index_id;
		if self.distinct_keys_per_prefix.len() < other.distinct_keys_per_prefix.len() {
			self.distinct_keys_per_prefix.resize(other.distinct_keys_per_prefix.len(), 0);
		}
		let sign = if increment { 1 } else { -1 };
		let disk_size = if other.actual_disk_size != 0 {
			other.actual_disk_size
		} else {
			estimated_data_len * other.rows
		};

		self.rows += sign * other.rows;
		self.data_size += sign * other.data_size;
		self.actual_disk_size += sign * disk_size;
		self.entry_deletes += sign * other.entry_deletes;
		self.entry_single_deletes += sign * other.entry_single_deletes;
		self.entry_merges += sign * other.entry_merges;
		self.entry_others += sign * other.entry_others;
		for (mine, theirs) in self.distinct_keys_per_prefix.iter_mut().zip(&other.distinct_keys_per_prefix) {
			*mine += sign * theirs;
		}
	}

	/// `[version:2][index id:8][data_size][rows][actual_disk_size][prefix count]
	/// [deletes][single deletes][merges][others][distinct:8]*`
	pub fn to_bytes(&self) -> Vec<u8> {
		let mut out = NetWriter::with_capacity(2 + 8 * (9 + self.distinct_keys_per_prefix.len()));
		out.write_u16(VERSION_ENTRY_TYPES);
		out.write(&self.gl_index_id.to_bytes());
		for value in [self.data_size, self.rows, self.actual_disk_size, self.distinct_keys_per_prefix.len() as i64] {
			out.write_u64(value as u64);
		}
		for value in [self.entry_deletes, self.entry_single_deletes, self.entry_merges, self.entry_others] {
			out.write_u64(value as u64);
		}
		for value in &self.distinct_keys_per_prefix {
			out.write_u64(*value as u64);
		}
		out.into_inner()
	}

	pub fn from_bytes(data: &[u8]) -> Result<Self> {
		let invalid_size = || DictionaryError::InvalidRecordSize {
			record: RECORD,
			size: data.len(),
		};
		let mut reader = NetReader::new(data);
		let version = reader.read_u16().ok_or_else(invalid_size)?;
		if version != VERSION_INITIAL && version != VERSION_ENTRY_TYPES {
			return_error!(DictionaryError::UnknownVersion {
				record: RECORD,
				version,
			});
		}

		let gl_index_id = reader.read(8).and_then(IndexId::from_bytes).ok_or_else(invalid_size)?;
		let mut next = || reader.read_u64().map(|v| v as i64).ok_or_else(invalid_size);
		let mut stats = IndexStats::new(gl_index_id);
		stats.data_size = next()?;
		stats.rows = next()?;
		stats.actual_disk_size = next()?;
		let prefixes = next()?;
		if version >= VERSION_ENTRY_TYPES {
			stats.entry_deletes = next()?;
			stats.entry_single_deletes = next()?;
			stats.entry_merges = next()?;
			stats.entry_others = next()?;
		}
		if prefixes < 0 {
			return Err(invalid_size().into());
		}
		for _ in 0..prefixes {
			stats.distinct_keys_per_prefix.push(next()?);
		}
		if reader.remaining() != 0 {
			return Err(invalid_size().into());
		}
		Ok(stats)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn sample() -> IndexStats {
		IndexStats {
			data_size: 4096,
			rows: 100,
			actual_disk_size: 2048,
			entry_deletes: 3,
			entry_single_deletes: 1,
			entry_merges: 0,
			entry_others: 2,
			distinct_keys_per_prefix: vec![10, 100],
			..IndexStats::new(IndexId::new(0, 260))
		}
	}

	#[test]
	fn test_bytes() {
		let stats = sample();
		let bytes = stats.to_bytes();
		assert_eq!(&bytes[..2], &[0, 2]);
		assert_eq!(bytes.len(), 2 + 8 + 8 * 8 + 2 * 8);
		assert_eq!(IndexStats::from_bytes(&bytes).unwrap(), stats);
	}

	#[test]
	fn test_initial_version() {
		let mut out = NetWriter::new();
		out.write_u16(VERSION_INITIAL);
		out.write(&IndexId::new(0, 300).to_bytes());
		for value in [10u64, 5, 20, 1, 5] {
			out.write_u64(value);
		}
		let stats = IndexStats::from_bytes(out.as_slice()).unwrap();
		assert_eq!(stats.rows, 5);
		assert_eq!(stats.distinct_keys_per_prefix, vec![5]);
		assert_eq!(stats.entry_deletes, 0);
	}

	#[test]
	fn test_rejects_bad_records() {
		let mut bytes = sample().to_bytes();
		bytes[1] = 9;
		assert_eq!(IndexStats::from_bytes(&bytes).unwrap_err().code(), "DICT_001");

		let bytes = sample().to_bytes();
		assert_eq!(IndexStats::from_bytes(&bytes[..bytes.len() - 1]).unwrap_err().code(), "DICT_002");
	}

	#[test]
	fn test_merge() {
		let mut total = IndexStats::new(IndexId::new(0, 260));
		total.merge(&sample(), true, 0);
		total.merge(&sample(), true, 0);
		assert_eq!(total.rows, 200);
		assert_eq!(total.distinct_keys_per_prefix, vec![20, 200]);

		total.merge(&sample(), false, 0);
		assert_eq!(total, sample());

		let mut estimated = IndexStats::new(IndexId::new(0, 260));
		let delta = IndexStats {
			rows: 4,
			..IndexStats::new(IndexId::new(0, 260))
		};
		estimated.merge(&delta, true, 16);
		assert_eq!(estimated.actual_disk_size, 64);
	}
}
