// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use rowkey_core::CfId;

pub const DEFAULT_CF_NAME: &str = "default";
pub const DEFAULT_CF_ID: CfId = 0;

/// Column family holding the persistent dictionary.
pub const SYSTEM_CF_NAME: &str = "__system__";
pub const SYSTEM_CF_ID: CfId = 1;

/// Handle of one column family.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ColumnFamily {
	pub id: CfId,
	pub name: String,
}

impl ColumnFamily {
	pub fn new(id: CfId, name: impl Into<String>) -> Self {
		Self {
			id,
			name: name.into(),
		}
	}

	pub fn default_cf() -> Self {
		Self::new(DEFAULT_CF_ID, DEFAULT_CF_NAME)
	}

	pub fn system_cf() -> Self {
		Self::new(SYSTEM_CF_ID, SYSTEM_CF_NAME)
	}
}
