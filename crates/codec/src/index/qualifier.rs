// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

//! `name=value` settings embedded in table and index comments.
//!
//! A comment such as `cfname=hot;ttl_duration=3600;p1_ttl_duration=60` is a
//! `;`-separated list of assignments. A `<partition>_` prefixed assignment
//! applies to that partition only and wins over the plain one.

use rowkey_core::{Result, error::diagnostic::codec::CodecError, return_error};

use crate::{ColumnType, TableSchema};

pub const CF_NAME: &str = "cfname";
pub const TTL_DURATION: &str = "ttl_duration";
pub const TTL_COL: &str = "ttl_col";

const QUALIFIER_SEP: char = ';';
const VALUE_SEP: char = '=';
const PER_PARTITION_SEP: char = '_';

/// A qualifier value and whether it came from a per-partition assignment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Qualified<'a> {
	pub value: &'a str,
	pub per_partition: bool,
}

fn find<'a>(comment: &'a str, prefix: &str) -> Option<Option<&'a str>> {
	comment.split(QUALIFIER_SEP).map(str::trim).filter(|token| !token.is_empty()).find_map(|token| {
		if !token.starts_with(prefix) {
			return None;
		}
		let mut parts = token.split(VALUE_SEP).filter(|part| !part.is_empty());
		// a prefix match that is not a clean assignment yields no value
		Some(match (parts.next(), parts.next(), parts.next()) {
			(Some(_), Some(value), None) => Some(value.trim()),
			_ => None,
		})
	})
}

/// Looks up `qualifier` in `comment`, trying the partition specific form
/// first when `partition` is given.
pub fn parse<'a>(comment: &'a str, partition: Option<&str>, qualifier: &str) -> Option<Qualified<'a>> {
	if let Some(partition) = partition {
		let prefix = format!("{}{}{}{}", partition, PER_PARTITION_SEP, qualifier, VALUE_SEP);
		if let Some(found) = find(comment, &prefix) {
			return found.map(|value| Qualified {
				value,
				per_partition: true,
			});
		}
	}
	let prefix = format!("{}{}", qualifier, VALUE_SEP);
	find(comment, &prefix).flatten().map(|value| Qualified {
		value,
		per_partition: false,
	})
}

/// Column family requested by an index comment.
pub fn cf_name<'a>(comment: &'a str, partition: Option<&str>) -> Option<Qualified<'a>> {
	parse(comment, partition, CF_NAME)
}

fn parse_unsigned(value: &str) -> Option<u64> {
	match value.strip_prefix("0x").or_else(|| value.strip_prefix("0X")) {
		Some(hex) => u64::from_str_radix(hex, 16).ok(),
		None => value.parse().ok(),
	}
}

/// TTL in seconds from the table comment. A present but non-positive or
/// non-numeric duration is an error.
pub fn ttl_duration(schema: &TableSchema) -> Result<Option<u64>> {
	let Some(found) = parse(&schema.comment, schema.partition(), TTL_DURATION) else {
		return Ok(None);
	};
	match parse_unsigned(found.value) {
		Some(duration) if duration > 0 => Ok(Some(duration)),
		_ => return_error!(CodecError::QualifierFormat {
			qualifier: TTL_DURATION,
			value: found.value.to_string(),
		}),
	}
}

/// Position of the TTL column named by the table comment. It must be a NOT
/// NULL unsigned BIGINT.
pub fn ttl_column(schema: &TableSchema) -> Result<Option<usize>> {
	let Some(found) = parse(&schema.comment, schema.partition(), TTL_COL) else {
		return Ok(None);
	};
	let valid = schema.column_index(found.value).filter(|idx| {
		let column = &schema.columns[*idx];
		!column.nullable
			&& column.ty
				== ColumnType::BigInt {
					unsigned: true,
				}
	});
	match valid {
		Some(idx) => Ok(Some(idx)),
		None => return_error!(CodecError::QualifierFormat {
			qualifier: TTL_COL,
			value: found.value.to_string(),
		}),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::ColumnDef;

	#[test]
	fn test_plain_qualifier() {
		let found = parse("foo;cfname=hot ; bar", None, CF_NAME).unwrap();
		assert_eq!(found.value, "hot");
		assert!(!found.per_partition);
		assert!(parse("cfname_x=1", None, CF_NAME).is_none());
	}

	#[test]
	fn test_partition_wins() {
		let comment = "cfname=all;p1_cfname=one";
		let found = cf_name(comment, Some("p1")).unwrap();
		assert_eq!(found.value, "one");
		assert!(found.per_partition);
		assert_eq!(cf_name(comment, Some("p2")).unwrap().value, "all");
	}

	#[test]
	fn test_malformed_assignment_has_no_value() {
		assert!(parse("cfname=a=b", None, CF_NAME).is_none());
		assert!(parse("p1_cfname=", Some("p1"), CF_NAME).is_none());
	}

	fn ttl_table(comment: &str) -> TableSchema {
		TableSchema::new(
			"db.t",
			vec![
				ColumnDef::new(
					"ts",
					ColumnType::BigInt {
						unsigned: true,
					},
				)
				.not_null(),
				ColumnDef::new(
					"n",
					ColumnType::BigInt {
						unsigned: true,
					},
				),
			],
		)
		.with_comment(comment)
	}

	#[test]
	fn test_ttl_duration() {
		assert_eq!(ttl_duration(&ttl_table("ttl_duration=3600")).unwrap(), Some(3600));
		assert_eq!(ttl_duration(&ttl_table("ttl_duration=0x10")).unwrap(), Some(16));
		assert_eq!(ttl_duration(&ttl_table("")).unwrap(), None);
		let err = ttl_duration(&ttl_table("ttl_duration=soon")).unwrap_err();
		assert_eq!(err.code(), "CODEC_007");
		assert!(ttl_duration(&ttl_table("ttl_duration=0")).is_err());
	}

	#[test]
	fn test_ttl_column() {
		assert_eq!(ttl_column(&ttl_table("ttl_col=TS")).unwrap(), Some(0));
		assert!(ttl_column(&ttl_table("ttl_col=n")).is_err());
		assert!(ttl_column(&ttl_table("ttl_col=missing")).is_err());
	}
}
