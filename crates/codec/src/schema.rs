// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

//! SQL metadata consumed by index setup. These describe an already
//! resolved table; nothing here parses SQL.

use serde::Deserialize;

use crate::collation::BINARY_COLLATION_ID;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnType {
	TinyInt {
		unsigned: bool,
	},
	SmallInt {
		unsigned: bool,
	},
	MediumInt {
		unsigned: bool,
	},
	Int {
		unsigned: bool,
	},
	BigInt {
		unsigned: bool,
	},
	Float,
	Double,
	Decimal {
		precision: u8,
		scale: u8,
	},
	DateTime {
		fsp: u8,
	},
	Timestamp {
		fsp: u8,
	},
	Time {
		fsp: u8,
	},
	Year,
	Date,
	/// CHAR(n) or BINARY(n); `length` counts characters.
	Char {
		length: u32,
	},
	/// VARCHAR(n) or VARBINARY(n); `length` counts characters.
	Varchar {
		length: u32,
	},
	/// BLOB/TEXT family, `length_bytes` is the width of the stored length
	/// (1 for TINYBLOB up to 4 for LONGBLOB).
	Blob {
		length_bytes: u8,
	},
}

const DIG2BYTES: [usize; 10] = [0, 1, 1, 2, 2, 3, 3, 4, 4, 4];
const DIG_PER_DEC: usize = 9;

/// Size of the binary DECIMAL image.
pub(crate) fn decimal_bin_size(precision: u8, scale: u8) -> usize {
	let scale = scale as usize;
	let intg = (precision as usize).saturating_sub(scale);
	let intg0 = intg / DIG_PER_DEC;
	let frac0 = scale / DIG_PER_DEC;
	intg0 * 4 + DIG2BYTES[intg % DIG_PER_DEC] + frac0 * 4 + DIG2BYTES[scale % DIG_PER_DEC]
}

fn fsp_bytes(fsp: u8) -> usize {
	(fsp.min(6) as usize + 1) / 2
}

impl ColumnType {
	/// Width of the integer image, if this is an integer type.
	pub(crate) fn integer_width(&self) -> Option<(usize, bool)> {
		match *self {
			ColumnType::TinyInt {
				unsigned,
			} => Some((1, unsigned)),
			ColumnType::SmallInt {
				unsigned,
			} => Some((2, unsigned)),
			ColumnType::MediumInt {
				unsigned,
			} => Some((3, unsigned)),
			ColumnType::Int {
				unsigned,
			} => Some((4, unsigned)),
			ColumnType::BigInt {
				unsigned,
			} => Some((8, unsigned)),
			_ => None,
		}
	}

	/// Width of types whose native image is copied into the key verbatim.
	pub(crate) fn verbatim_width(&self) -> Option<usize> {
		match *self {
			ColumnType::Decimal {
				precision,
				scale,
			} => Some(decimal_bin_size(precision, scale)),
			ColumnType::DateTime {
				fsp,
			} => Some(5 + fsp_bytes(fsp)),
			ColumnType::Timestamp {
				fsp,
			} => Some(4 + fsp_bytes(fsp)),
			ColumnType::Time {
				fsp,
			} => Some(3 + fsp_bytes(fsp)),
			ColumnType::Year => Some(1),
			_ => None,
		}
	}

	pub fn is_string(&self) -> bool {
		matches!(
			self,
			ColumnType::Char {
				..
			} | ColumnType::Varchar {
				..
			}
		)
	}

	pub fn is_varchar(&self) -> bool {
		matches!(
			self,
			ColumnType::Varchar {
				..
			}
		)
	}

	pub fn is_unsigned_bigint(&self) -> bool {
		matches!(
			self,
			ColumnType::BigInt {
				unsigned: true
			}
		)
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ColumnDef {
	pub name: String,
	pub ty: ColumnType,
	#[serde(default = "default_nullable")]
	pub nullable: bool,
	#[serde(default = "default_collation")]
	pub collation: u32,
}

fn default_nullable() -> bool {
	true
}

fn default_collation() -> u32 {
	BINARY_COLLATION_ID
}

impl ColumnDef {
	pub fn new(name: impl Into<String>, ty: ColumnType) -> Self {
		Self {
			name: name.into(),
			ty,
			nullable: true,
			collation: BINARY_COLLATION_ID,
		}
	}

	pub fn not_null(mut self) -> Self {
		self.nullable = false;
		self
	}

	pub fn with_collation(mut self, collation: u32) -> Self {
		self.collation = collation;
		self
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct KeyPartDef {
	pub column: usize,
	/// Key part length in bytes when only a prefix of the column is
	/// indexed.
	#[serde(default)]
	pub prefix_len: Option<u32>,
}

impl KeyPartDef {
	pub fn column(column: usize) -> Self {
		Self {
			column,
			prefix_len: None,
		}
	}

	pub fn prefix(column: usize, prefix_len: u32) -> Self {
		Self {
			column,
			prefix_len: Some(prefix_len),
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct KeyDef {
	pub name: String,
	pub parts: Vec<KeyPartDef>,
	#[serde(default)]
	pub comment: String,
}

impl KeyDef {
	pub fn new(name: impl Into<String>, parts: Vec<KeyPartDef>) -> Self {
		Self {
			name: name.into(),
			parts,
			comment: String::new(),
		}
	}

	pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
		self.comment = comment.into();
		self
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TableSchema {
	/// Normalized `db.table`, with `#P#partition` appended for partitions.
	pub name: String,
	pub columns: Vec<ColumnDef>,
	pub keys: Vec<KeyDef>,
	/// Position of the primary key in `keys`; `None` means the table gets a
	/// hidden primary key.
	#[serde(default)]
	pub primary_key: Option<usize>,
	#[serde(default)]
	pub comment: String,
}

impl TableSchema {
	pub fn new(name: impl Into<String>, columns: Vec<ColumnDef>) -> Self {
		Self {
			name: name.into(),
			columns,
			keys: Vec::new(),
			primary_key: None,
			comment: String::new(),
		}
	}

	pub fn with_primary_key(mut self, key: KeyDef) -> Self {
		self.primary_key = Some(self.keys.len());
		self.keys.push(key);
		self
	}

	pub fn with_key(mut self, key: KeyDef) -> Self {
		self.keys.push(key);
		self
	}

	pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
		self.comment = comment.into();
		self
	}

	pub fn has_hidden_pk(&self) -> bool {
		self.primary_key.is_none()
	}

	pub fn primary_key(&self) -> Option<&KeyDef> {
		self.primary_key.and_then(|idx| self.keys.get(idx))
	}

	pub fn column_index(&self, name: &str) -> Option<usize> {
		self.columns.iter().position(|c| c.name.eq_ignore_ascii_case(name))
	}

	/// Partition suffix of the table name, if any.
	pub fn partition(&self) -> Option<&str> {
		self.name.split_once("#P#").map(|(_, part)| part).filter(|p| !p.is_empty())
	}

	/// Secondary keys in declaration order, with their position in `keys`.
	pub fn secondary_keys(&self) -> impl Iterator<Item = (usize, &KeyDef)> {
		self.keys.iter().enumerate().filter(move |(idx, _)| Some(*idx) != self.primary_key)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_decimal_bin_size() {
		assert_eq!(decimal_bin_size(10, 0), 5);
		assert_eq!(decimal_bin_size(18, 9), 8);
		assert_eq!(decimal_bin_size(5, 2), 3);
		assert_eq!(decimal_bin_size(65, 30), 30);
	}

	#[test]
	fn test_temporal_widths() {
		assert_eq!(
			ColumnType::DateTime {
				fsp: 0
			}
			.verbatim_width(),
			Some(5)
		);
		assert_eq!(
			ColumnType::DateTime {
				fsp: 6
			}
			.verbatim_width(),
			Some(8)
		);
		assert_eq!(
			ColumnType::Timestamp {
				fsp: 3
			}
			.verbatim_width(),
			Some(6)
		);
		assert_eq!(
			ColumnType::Time {
				fsp: 1
			}
			.verbatim_width(),
			Some(4)
		);
	}

	#[test]
	fn test_partition_suffix() {
		let table = TableSchema::new("db.t#P#p3", vec![]);
		assert_eq!(table.partition(), Some("p3"));
		assert_eq!(TableSchema::new("db.t", vec![]).partition(), None);
	}
}
