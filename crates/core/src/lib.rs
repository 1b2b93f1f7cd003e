// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

#![cfg_attr(not(debug_assertions), deny(warnings))]

pub use delta::Delta;
pub use error::{Diagnostic, Error, IntoDiagnostic};
pub use id::{CfId, IndexId};

pub mod delta;
pub mod error;
pub mod id;
pub mod netbuf;

pub type Result<T> = std::result::Result<T, Error>;
