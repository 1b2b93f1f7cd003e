// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use std::fmt::{self, Display, Formatter, Write};

use serde::{Deserialize, Serialize};

pub mod diagnostic;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
	pub code: String,
	pub message: String,
	pub label: Option<String>,
	pub help: Option<String>,
	pub notes: Vec<String>,
	pub cause: Option<Box<Diagnostic>>,
}

impl Diagnostic {
	pub fn with_cause(mut self, cause: Diagnostic) -> Self {
		self.cause = Some(Box::new(cause));
		self
	}

	pub fn render(&self) -> String {
		let mut out = String::new();
		self.render_into(&mut out, 0);
		out
	}

	fn render_into(&self, out: &mut String, depth: usize) {
		let indent = "  ".repeat(depth);
		let _ = writeln!(out, "{}{}: {}", indent, self.code, self.message);
		if let Some(label) = &self.label {
			let _ = writeln!(out, "{}  = {}", indent, label);
		}
		if let Some(help) = &self.help {
			let _ = writeln!(out, "{}  help: {}", indent, help);
		}
		for note in &self.notes {
			let _ = writeln!(out, "{}  note: {}", indent, note);
		}
		if let Some(cause) = &self.cause {
			let _ = writeln!(out, "{}caused by:", indent);
			cause.render_into(out, depth + 1);
		}
	}
}

impl Display for Diagnostic {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.write_fmt(format_args!("{}", self.code))
	}
}

pub trait IntoDiagnostic {
	fn into_diagnostic(self) -> Diagnostic;
}

impl IntoDiagnostic for Diagnostic {
	fn into_diagnostic(self) -> Diagnostic {
		self
	}
}

#[derive(Debug, Clone, PartialEq)]
pub struct Error(pub Diagnostic);

impl Display for Error {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		let out = self.0.render();
		f.write_str(out.trim_end())
	}
}

impl Error {
	pub fn diagnostic(self) -> Diagnostic {
		self.0
	}

	pub fn code(&self) -> &str {
		&self.0.code
	}
}

impl std::error::Error for Error {}

impl From<Diagnostic> for Error {
	fn from(diagnostic: Diagnostic) -> Self {
		Error(diagnostic)
	}
}

#[macro_export]
macro_rules! return_error {
	($diagnostic:expr) => {
		return Err($crate::Error($crate::IntoDiagnostic::into_diagnostic($diagnostic)))
	};
}

#[macro_export]
macro_rules! error {
	($diagnostic:expr) => {
		$crate::Error($crate::IntoDiagnostic::into_diagnostic($diagnostic))
	};
}

#[macro_export]
macro_rules! internal_error {
	($($arg:tt)*) => {
		$crate::error::diagnostic::internal::internal(format!($($arg)*))
	};
}
