// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

#![cfg_attr(not(debug_assertions), deny(warnings))]

pub use collation::{Collation, CollationDef, CollationRegistry, PadAttribute, Weigher};
pub use config::CodecConfig;
pub use field::FieldPacker;
pub use index::{IndexDef, IndexFlag, IndexInfo, IndexStats, IndexType, PackOptions, PackedKey, format, qualifier};
pub use schema::{ColumnDef, ColumnType, KeyDef, KeyPartDef, TableSchema};
pub use value::{PartialRow, Row, Value};

pub mod collation;
mod config;
pub mod field;
pub mod index;
mod schema;
mod value;

/// Width of the big-endian index number that prefixes every key.
pub const INDEX_NUMBER_SIZE: usize = 4;
