// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use crate::error::Diagnostic;

pub fn sequence_exhausted(last: u32) -> Diagnostic {
	Diagnostic {
		code: "SEQUENCE_001".to_string(),
		message: format!("index number sequence is exhausted after `{}`", last),
		label: Some("no more index numbers can be generated".to_string()),
		help: Some(format!("maximum index number is `{}`", u32::MAX)),
		notes: vec![],
		cause: None,
	}
}
