// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use rowkey_core::{CfId, Delta};

/// Mutations staged for one atomic commit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteBatch {
	deltas: Vec<Delta>,
}

impl WriteBatch {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn put(&mut self, cf: CfId, key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) {
		self.deltas.push(Delta::Set {
			cf,
			key: key.into(),
			value: value.into(),
		});
	}

	pub fn delete(&mut self, cf: CfId, key: impl Into<Vec<u8>>) {
		self.deltas.push(Delta::Remove {
			cf,
			key: key.into(),
		});
	}

	pub fn len(&self) -> usize {
		self.deltas.len()
	}

	pub fn is_empty(&self) -> bool {
		self.deltas.is_empty()
	}

	pub fn deltas(&self) -> &[Delta] {
		&self.deltas
	}

	pub fn into_deltas(self) -> Vec<Delta> {
		self.deltas
	}
}
