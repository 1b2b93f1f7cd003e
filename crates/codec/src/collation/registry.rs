// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use std::{collections::HashMap, sync::Arc};

use once_cell::sync::Lazy;
use parking_lot::RwLock;
use rowkey_core::{Result, error::diagnostic::codec::CodecError, return_error};
use tracing::{debug, instrument, warn};

use super::{Collation, CollationDef, builtin};

static GLOBAL: Lazy<CollationRegistry> = Lazy::new(CollationRegistry::with_builtins);

/// Collations known to the codec, keyed by id.
pub struct CollationRegistry {
	collations: RwLock<HashMap<u32, Arc<Collation>>>,
}

impl CollationRegistry {
	pub fn empty() -> Self {
		Self {
			collations: RwLock::new(HashMap::new()),
		}
	}

	pub fn with_builtins() -> Self {
		let registry = Self::empty();
		for def in builtin::definitions() {
			let name = def.name.clone();
			if let Err(err) = registry.register(def) {
				warn!(collation = %name, %err, "skipping builtin collation");
			}
		}
		registry
	}

	/// Process wide registry, pre-populated with the builtin collations.
	pub fn global() -> &'static CollationRegistry {
		&GLOBAL
	}

	pub fn get(&self, id: u32) -> Result<Arc<Collation>> {
		match self.collations.read().get(&id) {
			Some(collation) => Ok(collation.clone()),
			None => return_error!(CodecError::UnknownCollation {
				id
			}),
		}
	}

	/// Adds or replaces a collation. Existing index definitions keep the
	/// collation they were set up with.
	pub fn register(&self, def: CollationDef) -> Result<Arc<Collation>> {
		let collation = Arc::new(Collation::new(def)?);
		let previous = self.collations.write().insert(collation.id(), collation.clone());
		if previous.is_some() {
			debug!(id = collation.id(), name = collation.name(), "replaced collation");
		}
		Ok(collation)
	}

	/// Registers every definition of a JSON array.
	#[instrument(name = "codec::collation::load_json", level = "debug", skip(self, json))]
	pub fn load_json(&self, json: &str) -> Result<Vec<Arc<Collation>>> {
		let defs: Vec<CollationDef> = match serde_json::from_str(json) {
			Ok(defs) => defs,
			Err(err) => return_error!(CodecError::InvalidCollation {
				reason: err.to_string()
			}),
		};
		defs.into_iter().map(|def| self.register(def)).collect()
	}

	pub fn ids(&self) -> Vec<u32> {
		let mut ids: Vec<u32> = self.collations.read().keys().copied().collect();
		ids.sort_unstable();
		ids
	}
}
