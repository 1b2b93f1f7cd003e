// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

#![cfg_attr(not(debug_assertions), deny(warnings))]

pub use config::{CatalogConfig, StatsWorkerConfig};
pub use ddl::{DdlManager, REVERSE_CF_PREFIX};
pub use dict::{DictManager, IndexOperation};
pub use name::TableName;
pub use purge::purge_dropped_indexes;
pub use sequence::SequenceGenerator;
pub use stats::{PendingStats, StatsWorker};
pub use table::TableDef;

mod config;
mod ddl;
pub mod dict;
mod name;
mod purge;
mod sequence;
mod stats;
mod table;
