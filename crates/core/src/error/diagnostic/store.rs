// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use crate::{
	Error,
	error::{Diagnostic, IntoDiagnostic},
};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StoreError {
	#[error("storage backend failure: {reason}")]
	Backend {
		reason: String,
	},

	#[error("simulated crash after staging {staged} entries")]
	InjectedCrash {
		staged: usize,
	},

	#[error("unknown column family `{name}`")]
	UnknownColumnFamily {
		name: String,
	},
}

impl StoreError {
	pub fn backend(reason: impl ToString) -> Self {
		StoreError::Backend {
			reason: reason.to_string(),
		}
	}
}

impl IntoDiagnostic for StoreError {
	fn into_diagnostic(self) -> Diagnostic {
		let message = self.to_string();
		let (code, label) = match &self {
			StoreError::Backend {
				..
			} => ("STORE_001", "the key-value store rejected the operation"),
			StoreError::InjectedCrash {
				..
			} => ("STORE_002", "crash injected by test"),
			StoreError::UnknownColumnFamily {
				..
			} => ("STORE_003", "column family does not exist"),
		};
		Diagnostic {
			code: code.to_string(),
			message,
			label: Some(label.to_string()),
			help: None,
			notes: vec![],
			cause: None,
		}
	}
}

impl From<StoreError> for Error {
	fn from(err: StoreError) -> Self {
		Error(err.into_diagnostic())
	}
}
