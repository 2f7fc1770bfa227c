// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Background work helpers.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::runtime::Handle;
use tracing::warn;

/// Spawns `future` on the ambient tokio runtime.
///
/// Tracking entry points are synchronous, so background work rides on
/// whatever runtime the host is running. Without one the work is skipped and
/// `false` is returned.
pub(crate) fn spawn_detached<F>(operation: &'static str, future: F) -> bool
where
	F: Future<Output = ()> + Send + 'static,
{
	match Handle::try_current() {
		Ok(handle) => {
			handle.spawn(future);
			true
		}
		Err(_) => {
			warn!(operation, "No tokio runtime available, skipping background work");
			false
		}
	}
}

/// Single-flight marker for a background operation.
#[derive(Debug, Clone, Default)]
pub(crate) struct InFlight {
	busy: Arc<AtomicBool>,
}

impl InFlight {
	pub(crate) fn new() -> Self {
		Self::default()
	}

	/// Claims the slot, or returns `None` if an operation is already running.
	pub(crate) fn try_begin(&self) -> Option<InFlightGuard> {
		self.busy
			.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
			.ok()
			.map(|_| InFlightGuard {
				busy: Arc::clone(&self.busy),
			})
	}

	#[cfg(test)]
	pub(crate) fn is_busy(&self) -> bool {
		self.busy.load(Ordering::Acquire)
	}
}

/// Releases the slot when dropped, including when the task is aborted.
#[derive(Debug)]
pub(crate) struct InFlightGuard {
	busy: Arc<AtomicBool>,
}

impl Drop for InFlightGuard {
	fn drop(&mut self) {
		self.busy.store(false, Ordering::Release);
	}
}
