// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use parking_lot::Mutex;
use rowkey_core::{Error, Result, error::diagnostic::sequence::sequence_exhausted};
use tracing::{instrument, trace};

use crate::dict::{DictManager, END_DICT_INDEX_ID};

/// Hands out index numbers. Every number is made durable as the new max
/// index id before it is returned, so numbers are never reused, not even
/// across a crash.
#[derive(Debug)]
pub struct SequenceGenerator {
	next: Mutex<u64>,
}

impl SequenceGenerator {
	pub fn new(next: u32) -> Self {
		Self {
			next: Mutex::new(next as u64),
		}
	}

	/// Continues after the stored max index id, skipping the numbers
	/// reserved for the dictionary.
	pub fn starting_after(max_index_id: Option<u32>) -> Self {
		let last = max_index_id.unwrap_or(0).max(END_DICT_INDEX_ID);
		Self {
			next: Mutex::new(last as u64 + 1),
		}
	}

	/// The number the next call will return.
	pub fn peek(&self) -> u64 {
		*self.next.lock()
	}

	#[instrument(name = "catalog::sequence::next", level = "debug", skip(self, dict))]
	pub fn get_and_update_next_number(&self, dict: &DictManager) -> Result<u32> {
		let mut next = self.next.lock();
		let number = u32::try_from(*next).map_err(|_| Error(sequence_exhausted(u32::MAX)))?;
		*next += 1;

		let mut batch = dict.begin();
		dict.update_max_index_id(&mut batch, number)?;
		dict.commit(batch, true)?;
		trace!(number, "index number allocated");
		Ok(number)
	}
}
