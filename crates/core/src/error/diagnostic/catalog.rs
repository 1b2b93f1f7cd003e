// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use crate::{
	Error, IndexId,
	error::{Diagnostic, IntoDiagnostic},
};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CatalogError {
	#[error("table `{name}` already exists")]
	TableAlreadyExists {
		name: String,
	},

	#[error("table `{name}` not found")]
	TableNotFound {
		name: String,
	},

	#[error("index {index_id} is above the stored max index id {max}")]
	IndexIdBeyondMax {
		index_id: IndexId,
		max: u32,
	},

	#[error("auto increment value stored for {index_id}, which is not a live primary key")]
	AutoIncrementOrphan {
		index_id: IndexId,
	},

	#[error("table `{table}` references index {index_id} without index info")]
	MissingIndexInfo {
		table: String,
		index_id: IndexId,
	},

	#[error("table `{table}` uses column family {cf_id}, which has no stored flags")]
	MissingCfFlags {
		table: String,
		cf_id: u32,
	},

	#[error("index `{name}` not found on table `{table}`")]
	IndexNotFound {
		table: String,
		name: String,
	},

	#[error("the primary key of table `{table}` cannot be dropped on its own")]
	PrimaryKeyDrop {
		table: String,
	},

	#[error("index {index_id} is not being built")]
	IndexNotBuilding {
		index_id: IndexId,
	},
}

impl IntoDiagnostic for CatalogError {
	fn into_diagnostic(self) -> Diagnostic {
		let message = self.to_string();
		match self {
			CatalogError::TableAlreadyExists {
				..
			} => Diagnostic {
				code: "CATALOG_001".to_string(),
				message,
				label: Some("duplicate table name".to_string()),
				help: Some("choose a different name or drop the existing table first".to_string()),
				notes: vec![],
				cause: None,
			},
			CatalogError::TableNotFound {
				..
			} => Diagnostic {
				code: "CATALOG_002".to_string(),
				message,
				label: Some("unknown table".to_string()),
				help: None,
				notes: vec![],
				cause: None,
			},
			CatalogError::IndexIdBeyondMax {
				..
			} => Diagnostic {
				code: "CATALOG_003".to_string(),
				message,
				label: Some("dictionary is inconsistent".to_string()),
				help: Some("the max index id record was lost or rolled back".to_string()),
				notes: vec![],
				cause: None,
			},
			CatalogError::AutoIncrementOrphan {
				..
			} => Diagnostic {
				code: "CATALOG_004".to_string(),
				message,
				label: Some("dictionary is inconsistent".to_string()),
				help: None,
				notes: vec![],
				cause: None,
			},
			CatalogError::MissingIndexInfo {
				..
			} => Diagnostic {
				code: "CATALOG_005".to_string(),
				message,
				label: Some("dictionary is inconsistent".to_string()),
				help: None,
				notes: vec![],
				cause: None,
			},
			CatalogError::MissingCfFlags {
				..
			} => Diagnostic {
				code: "CATALOG_006".to_string(),
				message,
				label: Some("dictionary is inconsistent".to_string()),
				help: None,
				notes: vec![],
				cause: None,
			},
			CatalogError::IndexNotFound {
				..
			} => Diagnostic {
				code: "CATALOG_007".to_string(),
				message,
				label: Some("unknown index".to_string()),
				help: None,
				notes: vec![],
				cause: None,
			},
			CatalogError::PrimaryKeyDrop {
				..
			} => Diagnostic {
				code: "CATALOG_008".to_string(),
				message,
				label: Some("rows are stored in the primary key".to_string()),
				help: Some("drop the table instead".to_string()),
				notes: vec![],
				cause: None,
			},
			CatalogError::IndexNotBuilding {
				..
			} => Diagnostic {
				code: "CATALOG_009".to_string(),
				message,
				label: Some("only an unfinished index build can be committed or aborted".to_string()),
				help: Some("use drop_index for a published index".to_string()),
				notes: vec![],
				cause: None,
			},
		}
	}
}

impl From<CatalogError> for Error {
	fn from(err: CatalogError) -> Self {
		Error(err.into_diagnostic())
	}
}
