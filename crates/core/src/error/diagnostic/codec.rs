// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use crate::{
	Error,
	error::{Diagnostic, IntoDiagnostic},
};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CodecError {
	#[error("corrupted key or unpack info: {reason}")]
	Corrupted {
		reason: String,
	},

	#[error("{} checksum mismatch", checksum_kind(.is_key))]
	ChecksumMismatch {
		is_key: bool,
		stored: u32,
		computed: u32,
	},

	#[error("value {value} is out of range for column `{column}`")]
	ValueOutOfRange {
		column: String,
		value: String,
	},

	#[error("column `{column}` expects {expected} bytes, got {actual}")]
	InvalidLength {
		column: String,
		expected: usize,
		actual: usize,
	},

	#[error("column `{column}` expects a {expected} value")]
	TypeMismatch {
		column: String,
		expected: &'static str,
	},

	#[error("column `{column}` cannot be indexed: {reason}")]
	UnsupportedColumn {
		column: String,
		reason: String,
	},

	#[error("invalid `{qualifier}` value `{value}`")]
	QualifierFormat {
		qualifier: &'static str,
		value: String,
	},

	#[error("unknown collation {id}")]
	UnknownCollation {
		id: u32,
	},

	#[error("invalid collation definition: {reason}")]
	InvalidCollation {
		reason: String,
	},
}

fn checksum_kind(is_key: &bool) -> &'static str {
	if *is_key { "key" } else { "value" }
}

impl CodecError {
	pub fn corrupted(reason: impl Into<String>) -> Self {
		CodecError::Corrupted {
			reason: reason.into(),
		}
	}
}

impl IntoDiagnostic for CodecError {
	fn into_diagnostic(self) -> Diagnostic {
		let message = self.to_string();
		match self {
			CodecError::Corrupted {
				..
			} => Diagnostic {
				code: "CODEC_001".to_string(),
				message,
				label: Some("data corruption detected".to_string()),
				help: Some("the stored bytes do not match the index definition; check the index for consistency"
					.to_string()),
				notes: vec![],
				cause: None,
			},
			CodecError::ChecksumMismatch {
				stored,
				computed,
				..
			} => Diagnostic {
				code: "CODEC_002".to_string(),
				message,
				label: Some("row debug checksum does not match".to_string()),
				help: None,
				notes: vec![format!("stored {:08x}, computed {:08x}", stored, computed)],
				cause: None,
			},
			CodecError::ValueOutOfRange {
				..
			} => Diagnostic {
				code: "CODEC_003".to_string(),
				message,
				label: Some("value does not fit the column type".to_string()),
				help: None,
				notes: vec![],
				cause: None,
			},
			CodecError::InvalidLength {
				..
			} => Diagnostic {
				code: "CODEC_004".to_string(),
				message,
				label: Some("fixed-width value has the wrong length".to_string()),
				help: None,
				notes: vec![],
				cause: None,
			},
			CodecError::TypeMismatch {
				..
			} => Diagnostic {
				code: "CODEC_005".to_string(),
				message,
				label: Some("value variant does not match the column type".to_string()),
				help: None,
				notes: vec![],
				cause: None,
			},
			CodecError::UnsupportedColumn {
				..
			} => Diagnostic {
				code: "CODEC_006".to_string(),
				message,
				label: Some("unsupported key part".to_string()),
				help: None,
				notes: vec![],
				cause: None,
			},
			CodecError::QualifierFormat {
				qualifier,
				..
			} => Diagnostic {
				code: "CODEC_007".to_string(),
				message,
				label: Some("malformed comment qualifier".to_string()),
				help: Some(match qualifier {
					"ttl_duration" => "ttl_duration must be a positive integer".to_string(),
					"ttl_col" => "ttl_col must name a NOT NULL unsigned BIGINT column".to_string(),
					_ => format!("check the `{}` qualifier", qualifier),
				}),
				notes: vec![],
				cause: None,
			},
			CodecError::UnknownCollation {
				..
			} => Diagnostic {
				code: "CODEC_008".to_string(),
				message,
				label: Some("collation is not registered".to_string()),
				help: Some("register the collation definition before opening the table".to_string()),
				notes: vec![],
				cause: None,
			},
			CodecError::InvalidCollation {
				..
			} => Diagnostic {
				code: "CODEC_009".to_string(),
				message,
				label: Some("collation definition rejected".to_string()),
				help: None,
				notes: vec![],
				cause: None,
			},
		}
	}
}

impl From<CodecError> for Error {
	fn from(err: CodecError) -> Self {
		Error(err.into_diagnostic())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_corruption_code() {
		let err: Error = CodecError::corrupted("bad null marker").into();
		assert_eq!(err.code(), "CODEC_001");
		assert!(err.to_string().contains("bad null marker"));
	}

	#[test]
	fn test_checksum_notes() {
		let diagnostic = CodecError::ChecksumMismatch {
			is_key: true,
			stored: 1,
			computed: 2,
		}
		.into_diagnostic();
		assert_eq!(diagnostic.message, "key checksum mismatch");
		assert_eq!(diagnostic.notes, vec!["stored 00000001, computed 00000002".to_string()]);
	}
}
