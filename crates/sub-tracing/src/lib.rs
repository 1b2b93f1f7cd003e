// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

#![cfg_attr(not(debug_assertions), deny(warnings))]

//! Installs the process wide `tracing` subscriber.
//!
//! The library crates only emit events through `tracing`; an embedding
//! process calls [`TracingBuilder::build`] once to decide where they go.

pub use builder::{Format, TracingBuilder, TracingConfig};

mod builder;
