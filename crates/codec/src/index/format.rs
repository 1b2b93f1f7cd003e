// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

//! Index kinds and key format versions.
//!
//! A format version is stored with every index and never changes for the
//! lifetime of that index. It selects between encodings that were improved
//! over time, so data written by older releases stays readable.

use serde::{Deserialize, Serialize};

pub const PRIMARY_INITIAL: u16 = 10;
/// Unpack info for CHAR and VARCHAR in primary keys.
pub const PRIMARY_UPDATE1: u16 = 11;
/// Variable-length groups flagged 9/used-count instead of `255 - padding`.
pub const PRIMARY_UPDATE2: u16 = 12;
/// Primary keys may carry a TTL record.
pub const PRIMARY_TTL: u16 = 13;
pub const PRIMARY_LATEST: u16 = PRIMARY_TTL;

pub const SECONDARY_INITIAL: u16 = 10;
pub const SECONDARY_UPDATE1: u16 = 11;
pub const SECONDARY_UPDATE2: u16 = 12;
/// Covered bitmaps and index flag fields in the unpack info.
pub const SECONDARY_UPDATE3: u16 = 13;
pub const SECONDARY_LATEST: u16 = SECONDARY_UPDATE3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum IndexType {
	Primary = 1,
	Secondary = 2,
	HiddenPrimary = 3,
}

impl IndexType {
	pub fn from_u8(value: u8) -> Option<Self> {
		match value {
			1 => Some(IndexType::Primary),
			2 => Some(IndexType::Secondary),
			3 => Some(IndexType::HiddenPrimary),
			_ => None,
		}
	}

	pub fn as_u8(self) -> u8 {
		self as u8
	}

	pub fn is_primary(self) -> bool {
		matches!(self, IndexType::Primary | IndexType::HiddenPrimary)
	}

	/// Newest key format this build writes for the kind.
	pub fn latest_format(self) -> u16 {
		if self.is_primary() { PRIMARY_LATEST } else { SECONDARY_LATEST }
	}

	/// True when `kv_version` reaches the minimum for this kind.
	pub fn format_at_least(self, kv_version: u16, primary_min: u16, secondary_min: u16) -> bool {
		if self.is_primary() { kv_version >= primary_min } else { kv_version >= secondary_min }
	}
}
