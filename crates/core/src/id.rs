// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use std::fmt::{self, Display, Formatter};

use serde::{Deserialize, Serialize};

/// Identifier of a column family (an independently ordered partition of the
/// key-value store).
pub type CfId = u32;

/// Global index identity: the column family an index lives in plus its index
/// number. Index numbers are assigned from a persisted high-water mark and are
/// never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct IndexId {
	pub cf_id: CfId,
	pub index_id: u32,
}

impl IndexId {
	pub const fn new(cf_id: CfId, index_id: u32) -> Self {
		Self {
			cf_id,
			index_id,
		}
	}

	/// Serialized form `[cf_id:4][index_id:4]`, big-endian.
	pub fn to_bytes(&self) -> [u8; 8] {
		let mut out = [0u8; 8];
		out[..4].copy_from_slice(&self.cf_id.to_be_bytes());
		out[4..].copy_from_slice(&self.index_id.to_be_bytes());
		out
	}

	pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
		if bytes.len() != 8 {
			return None;
		}
		Some(Self {
			cf_id: u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]),
			index_id: u32::from_be_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]),
		})
	}
}

impl Display for IndexId {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		write!(f, "({},{})", self.cf_id, self.index_id)
	}
}
