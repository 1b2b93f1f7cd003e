// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use crate::{
	Error, IndexId,
	error::{Diagnostic, IntoDiagnostic},
};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DictionaryError {
	#[error("{record} record has unsupported version {version}")]
	UnknownVersion {
		record: &'static str,
		version: u16,
	},

	#[error("{record} record has invalid size {size}")]
	InvalidRecordSize {
		record: &'static str,
		size: usize,
	},

	#[error("index {index_id} uses key format {kv_version}, newer than supported {supported}")]
	FormatTooNew {
		index_id: IndexId,
		kv_version: u16,
		supported: u16,
	},

	#[error("column family {cf_id} flags {requested:#x} conflict with stored flags {existing:#x}")]
	CfFlagsConflict {
		cf_id: u32,
		existing: u32,
		requested: u32,
	},

	#[error("max index id would move backwards from {current} to {requested}")]
	MaxIndexIdRegression {
		current: u32,
		requested: u32,
	},

	#[error("dictionary commit failed")]
	CommitFailed,

	#[error("index {index_id} has unknown index type {index_type}")]
	UnknownIndexType {
		index_id: IndexId,
		index_type: u8,
	},

	#[error("index {index_id} is being dropped but has no index info")]
	MissingIndexInfo {
		index_id: IndexId,
	},
}

impl IntoDiagnostic for DictionaryError {
	fn into_diagnostic(self) -> Diagnostic {
		let message = self.to_string();
		let (code, label, help) = match &self {
			DictionaryError::UnknownVersion {
				..
			} => (
				"DICT_001",
				"unsupported dictionary record version",
				Some("the data directory was written by a newer release"),
			),
			DictionaryError::InvalidRecordSize {
				..
			} => ("DICT_002", "dictionary record is truncated or padded", None),
			DictionaryError::FormatTooNew {
				..
			} => (
				"DICT_003",
				"index key format is newer than this build",
				Some("upgrade before opening this data directory"),
			),
			DictionaryError::CfFlagsConflict {
				..
			} => (
				"DICT_004",
				"column family is shared with incompatible flags",
				Some("use a different column family or the same reverse-order setting"),
			),
			DictionaryError::MaxIndexIdRegression {
				..
			} => ("DICT_005", "index identities must never be reused", None),
			DictionaryError::CommitFailed => {
				("DICT_006", "atomic dictionary write did not complete", None)
			}
			DictionaryError::UnknownIndexType {
				..
			} => ("DICT_007", "index info record is corrupt", None),
			DictionaryError::MissingIndexInfo {
				..
			} => (
				"DICT_008",
				"dictionary is inconsistent",
				Some("only indexes left behind by an unfinished create may lack index info"),
			),
		};

		Diagnostic {
			code: code.to_string(),
			message,
			label: Some(label.to_string()),
			help: help.map(str::to_string),
			notes: vec![],
			cause: None,
		}
	}
}

impl From<DictionaryError> for Error {
	fn from(err: DictionaryError) -> Self {
		Error(err.into_diagnostic())
	}
}
