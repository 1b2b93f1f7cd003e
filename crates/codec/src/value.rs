// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use std::fmt::{self, Display, Formatter};

/// A resolved column value as handed over by the SQL layer.
///
/// Integers of every width travel as `Int`/`UInt`. DECIMAL, temporal types
/// and strings travel as `Bytes` in their native storage image (the binary
/// decimal form, the packed temporal form, or the character data).
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
	Null,
	Int(i64),
	UInt(u64),
	Float(f32),
	Double(f64),
	Bytes(Vec<u8>),
}

/// A table row, indexed by column position.
pub type Row = Vec<Value>;

/// A row recovered from an index entry. `None` marks columns the entry
/// does not carry or cannot restore.
pub type PartialRow = Vec<Option<Value>>;

impl Value {
	pub fn is_null(&self) -> bool {
		matches!(self, Value::Null)
	}

	pub fn bytes(data: impl AsRef<[u8]>) -> Self {
		Value::Bytes(data.as_ref().to_vec())
	}

	pub fn as_bytes(&self) -> Option<&[u8]> {
		match self {
			Value::Bytes(b) => Some(b),
			_ => None,
		}
	}
}

impl Display for Value {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		match self {
			Value::Null => f.write_str("NULL"),
			Value::Int(v) => write!(f, "{}", v),
			Value::UInt(v) => write!(f, "{}", v),
			Value::Float(v) => write!(f, "{}", v),
			Value::Double(v) => write!(f, "{}", v),
			Value::Bytes(b) => write!(f, "{}", String::from_utf8_lossy(b)),
		}
	}
}

impl From<i64> for Value {
	fn from(v: i64) -> Self {
		Value::Int(v)
	}
}

impl From<u64> for Value {
	fn from(v: u64) -> Self {
		Value::UInt(v)
	}
}

impl From<&str> for Value {
	fn from(v: &str) -> Self {
		Value::Bytes(v.as_bytes().to_vec())
	}
}
