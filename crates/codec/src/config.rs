// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CodecConfig {
	/// Keep a verbatim copy of string values in the unpack info when the
	/// collation has no reverse mapping, so such columns stay readable from
	/// the index alone.
	pub unknown_collation_index_only: bool,
	/// Append key and value checksums to secondary index entries.
	pub store_row_debug_checksums: bool,
	/// Verify stored checksums while unpacking.
	pub verify_row_debug_checksums: bool,
}

impl Default for CodecConfig {
	fn default() -> Self {
		Self {
			unknown_collation_index_only: true,
			store_row_debug_checksums: false,
			verify_row_debug_checksums: false,
		}
	}
}

impl CodecConfig {
	pub fn with_unknown_collation_index_only(mut self, enabled: bool) -> Self {
		self.unknown_collation_index_only = enabled;
		self
	}

	pub fn with_store_row_debug_checksums(mut self, enabled: bool) -> Self {
		self.store_row_debug_checksums = enabled;
		self
	}

	pub fn with_verify_row_debug_checksums(mut self, enabled: bool) -> Self {
		self.verify_row_debug_checksums = enabled;
		self
	}
}
