// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use crate::error::Diagnostic;

pub fn subscriber_init_failed(reason: impl Into<String>) -> Diagnostic {
	Diagnostic {
		code: "TRACING_001".to_string(),
		message: format!("failed to install the tracing subscriber: {}", reason.into()),
		label: None,
		help: Some("a process can install only one global subscriber".to_string()),
		notes: vec![],
		cause: None,
	}
}

pub fn invalid_filter(filter: &str, reason: impl Into<String>) -> Diagnostic {
	Diagnostic {
		code: "TRACING_002".to_string(),
		message: format!("invalid log filter `{}`", filter),
		label: Some(reason.into()),
		help: Some("use directives such as `info` or `rowkey_catalog=debug,warn`".to_string()),
		notes: vec![],
		cause: None,
	}
}
