// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use rowkey_core::{
	Error, Result,
	error::diagnostic::subscriber::{invalid_filter, subscriber_init_failed},
};
use serde::Deserialize;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_FILTER: &str = "info";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
	#[default]
	Text,
	Json,
}

/// Settings of the log output, as read from a config file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct TracingConfig {
	/// `EnvFilter` directives. `RUST_LOG` wins when set.
	pub filter: String,
	pub format: Format,
	pub with_target: bool,
	pub with_ansi: bool,
}

impl Default for TracingConfig {
	fn default() -> Self {
		Self {
			filter: DEFAULT_FILTER.to_string(),
			format: Format::Text,
			with_target: true,
			with_ansi: true,
		}
	}
}

#[derive(Debug, Clone, Default)]
pub struct TracingBuilder {
	config: TracingConfig,
}

impl TracingBuilder {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn from_config(config: TracingConfig) -> Self {
		Self {
			config,
		}
	}

	pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
		self.config.filter = filter.into();
		self
	}

	pub fn with_format(mut self, format: Format) -> Self {
		self.config.format = format;
		self
	}

	pub fn with_target(mut self, with_target: bool) -> Self {
		self.config.with_target = with_target;
		self
	}

	pub fn with_ansi(mut self, with_ansi: bool) -> Self {
		self.config.with_ansi = with_ansi;
		self
	}

	pub fn config(&self) -> &TracingConfig {
		&self.config
	}

	fn env_filter(&self) -> Result<EnvFilter> {
		if let Ok(filter) = EnvFilter::try_from_default_env() {
			return Ok(filter);
		}
		EnvFilter::try_new(&self.config.filter)
			.map_err(|err| Error(invalid_filter(&self.config.filter, err.to_string())))
	}

	/// Installs the subscriber globally. Fails when one is already set.
	pub fn build(self) -> Result<()> {
		let filter = self.env_filter()?;
		let registry = tracing_subscriber::registry().with(filter);
		let installed = match self.config.format {
			Format::Text => registry
				.with(fmt::layer().with_target(self.config.with_target).with_ansi(self.config.with_ansi))
				.try_init(),
			Format::Json => registry.with(fmt::layer().json().with_target(self.config.with_target)).try_init(),
		};
		installed.map_err(|err| Error(subscriber_init_failed(err.to_string())))?;
		tracing::debug!(format = ?self.config.format, "tracing subscriber installed");
		Ok(())
	}
}
