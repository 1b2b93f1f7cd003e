// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

//! Table schemas shared by tests.

use rowkey_codec::{
	ColumnDef, ColumnType, KeyDef, KeyPartDef, TableSchema, Value,
	collation::{LATIN1_BIN_ID, LATIN1_SWEDISH_CI_ID, UTF8MB4_BIN_ID},
};

/// `t(a INT PRIMARY KEY, b VARCHAR(10), KEY kb(b))` under `name`.
pub fn simple_table(name: &str) -> TableSchema {
	TableSchema::new(
		name,
		vec![
			ColumnDef::new(
				"a",
				ColumnType::Int {
					unsigned: false,
				},
			)
			.not_null(),
			ColumnDef::new(
				"b",
				ColumnType::Varchar {
					length: 10,
				},
			)
			.with_collation(LATIN1_BIN_ID),
		],
	)
	.with_primary_key(KeyDef::new("PRIMARY", vec![KeyPartDef::column(0)]))
	.with_key(KeyDef::new("kb", vec![KeyPartDef::column(1)]))
}

pub fn simple_row(a: i64, b: &str) -> Vec<Value> {
	vec![Value::Int(a), Value::from(b)]
}

/// `(c SMALLINT, d VARCHAR(20) latin1_swedish_ci, KEY kc(c))`, no primary key.
pub fn hidden_pk_table(name: &str) -> TableSchema {
	TableSchema::new(
		name,
		vec![
			ColumnDef::new(
				"c",
				ColumnType::SmallInt {
					unsigned: false,
				},
			),
			ColumnDef::new(
				"d",
				ColumnType::Varchar {
					length: 20,
				},
			)
			.with_collation(LATIN1_SWEDISH_CI_ID),
		],
	)
	.with_key(KeyDef::new("kc", vec![KeyPartDef::column(0)]))
}

/// One column of every supported key type, a primary key on `id` and a
/// secondary index over the remaining columns.
pub fn all_types_table(name: &str) -> TableSchema {
	let columns = vec![
		ColumnDef::new(
			"id",
			ColumnType::BigInt {
				unsigned: true,
			},
		)
		.not_null(),
		ColumnDef::new(
			"ti",
			ColumnType::TinyInt {
				unsigned: false,
			},
		),
		ColumnDef::new(
			"mi",
			ColumnType::MediumInt {
				unsigned: true,
			},
		),
		ColumnDef::new("f", ColumnType::Float),
		ColumnDef::new("d", ColumnType::Double),
		ColumnDef::new(
			"dec",
			ColumnType::Decimal {
				precision: 10,
				scale: 2,
			},
		),
		ColumnDef::new(
			"dt",
			ColumnType::DateTime {
				fsp: 0,
			},
		),
		ColumnDef::new("day", ColumnType::Date),
		ColumnDef::new("y", ColumnType::Year),
		ColumnDef::new(
			"bin",
			ColumnType::Char {
				length: 4,
			},
		),
		ColumnDef::new(
			"ch",
			ColumnType::Char {
				length: 6,
			},
		)
		.with_collation(LATIN1_SWEDISH_CI_ID),
		ColumnDef::new(
			"vb",
			ColumnType::Varchar {
				length: 12,
			},
		),
		ColumnDef::new(
			"vc",
			ColumnType::Varchar {
				length: 12,
			},
		)
		.with_collation(UTF8MB4_BIN_ID),
	];
	let secondary = (1..columns.len()).map(KeyPartDef::column).collect();
	TableSchema::new(name, columns)
		.with_primary_key(KeyDef::new("PRIMARY", vec![KeyPartDef::column(0)]))
		.with_key(KeyDef::new("kall", secondary))
}

/// A row for [`all_types_table`]; `n` varies every column.
pub fn all_types_row(n: u8) -> Vec<Value> {
	vec![
		Value::UInt(n as u64),
		Value::Int(n as i64 / 2 - 64),
		Value::UInt(n as u64 * 1000),
		Value::Float(n as f32 / 4.0),
		Value::Double(-(n as f64) * 1.5),
		Value::bytes([0x80, 0, 0, n, 0x10]),
		Value::bytes([0x99, 0xb2, 0x42, 0x00, n]),
		Value::UInt(738_000 + n as u64),
		Value::bytes([n]),
		Value::bytes([b'k', n, 0, 0]),
		Value::bytes(format!("Row{}", n)),
		Value::bytes(vec![n; (n % 12) as usize]),
		Value::bytes(format!("été {}  ", n)),
	]
}
