// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

//! Diagnostic constructors grouped by area.
//!
//! Codec, dictionary, catalog and store failures are modelled as `thiserror`
//! enums that convert into a [`Diagnostic`](super::Diagnostic) with a stable
//! code. Single-purpose failures are plain constructor functions.

pub mod catalog;
pub mod codec;
pub mod dictionary;
pub mod internal;
pub mod sequence;
pub mod store;
pub mod subscriber;
