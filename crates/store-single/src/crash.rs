// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use std::sync::atomic::{AtomicUsize, Ordering};

use rowkey_core::{Result, error::diagnostic::store::StoreError, return_error};
use tracing::warn;

/// One-shot failure injection for commits. While armed, the next commit
/// fails once it has staged the configured number of entries.
#[derive(Debug, Default)]
pub(crate) struct CrashPoint {
	// 0 = disarmed, n + 1 = crash after n staged entries
	armed: AtomicUsize,
}

impl CrashPoint {
	pub(crate) fn arm(&self, staged: usize) {
		self.armed.store(staged.saturating_add(1), Ordering::Release);
	}

	pub(crate) fn check(&self, staged: usize) -> Result<()> {
		let armed = self.armed.load(Ordering::Acquire);
		if armed != 0 && staged + 1 >= armed {
			if self.armed.compare_exchange(armed, 0, Ordering::AcqRel, Ordering::Acquire).is_ok() {
				warn!(staged, "injected crash during commit");
				return_error!(StoreError::InjectedCrash {
					staged
				});
			}
		}
		Ok(())
	}
}
