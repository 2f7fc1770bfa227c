// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Events waiting for the property id.

use std::collections::VecDeque;

use loom_commerce_core::TrackingEvent;

/// FIFO buffer of events held until the property id is known.
///
/// The queue lives in memory only and is unbounded.
#[derive(Debug, Default)]
pub struct PendingEventQueue {
	events: VecDeque<TrackingEvent>,
}

impl PendingEventQueue {
	pub fn push(&mut self, event: TrackingEvent) {
		self.events.push_back(event);
	}

	/// Removes and returns every queued event, oldest first.
	pub fn take_all(&mut self) -> Vec<TrackingEvent> {
		self.events.drain(..).collect()
	}

	pub fn len(&self) -> usize {
		self.events.len()
	}

	pub fn is_empty(&self) -> bool {
		self.events.is_empty()
	}
}
