// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use crate::CfId;

/// One staged mutation of a write batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delta {
	Set {
		cf: CfId,
		key: Vec<u8>,
		value: Vec<u8>,
	},
	Remove {
		cf: CfId,
		key: Vec<u8>,
	},
}

impl Delta {
	pub fn cf(&self) -> CfId {
		match self {
			Self::Set {
				cf,
				..
			}
			| Self::Remove {
				cf,
				..
			} => *cf,
		}
	}

	/// Returns the key
	pub fn key(&self) -> &[u8] {
		match self {
			Self::Set {
				key,
				..
			}
			| Self::Remove {
				key,
				..
			} => key,
		}
	}

	/// Returns the value, if None, it means the entry is marked as remove.
	pub fn value(&self) -> Option<&[u8]> {
		match self {
			Self::Set {
				value,
				..
			} => Some(value),
			Self::Remove {
				..
			} => None,
		}
	}
}
