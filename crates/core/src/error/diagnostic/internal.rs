// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use crate::error::Diagnostic;

pub fn internal(reason: impl Into<String>) -> Diagnostic {
	Diagnostic {
		code: "INTERNAL_001".to_string(),
		message: reason.into(),
		label: Some("internal invariant violated".to_string()),
		help: Some("this is a bug, please report it together with the log output".to_string()),
		notes: vec![],
		cause: None,
	}
}
