// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

//! Full table names of the form `db.table`, with `#P#partition` appended
//! for one partition of a partitioned table.

const PARTITION_SEP: &str = "#P#";

const SYSTEM_DATABASES: [&str; 3] = ["mysql", "performance_schema", "information_schema"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableName<'a> {
	pub db: &'a str,
	pub table: &'a str,
	pub partition: Option<&'a str>,
}

impl<'a> TableName<'a> {
	/// Splits a full name. A name without a database part has an empty `db`.
	pub fn parse(full: &'a str) -> Self {
		let (db, rest) = full.split_once('.').unwrap_or(("", full));
		let (table, partition) = match rest.split_once(PARTITION_SEP) {
			Some((table, partition)) => (table, Some(partition).filter(|p| !p.is_empty())),
			None => (rest, None),
		};
		Self {
			db,
			table,
			partition,
		}
	}

	pub fn is_system_table(&self) -> bool {
		SYSTEM_DATABASES.contains(&self.db)
	}
}
