// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Legacy analytics beacons.
//!
//! Merchants enrolled in an offer program still feed the older analytics
//! pipeline. These beacons share the telemetry endpoint but carry their own
//! fixed variable set.

/// Legacy analytics events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LegacyEvent {
	/// The merchant integration started (`analytics-init`).
	ConnectionStarted,
	/// A purchase completed.
	Purchase,
	/// The shopper backed out of the merchant flow (`analytics-cancel`).
	MerchantUserCancel,
}

impl LegacyEvent {
	/// Maps a view or custom event name to the legacy event it triggers.
	pub fn for_event_name(event_name: &str) -> Option<Self> {
		match event_name {
			"analytics-init" => Some(LegacyEvent::ConnectionStarted),
			"analytics-cancel" => Some(LegacyEvent::MerchantUserCancel),
			_ => None,
		}
	}

	/// The fixed variables identifying this event.
	pub fn fields(&self) -> [(&'static str, &'static str); 7] {
		let (fltp, es) = match self {
			LegacyEvent::ConnectionStarted => ("store-cash", "connectionStarted"),
			LegacyEvent::Purchase => ("analytics", "txnSuccess"),
			LegacyEvent::MerchantUserCancel => ("analytics", "customerCancel"),
		};

		[
			("fltp", fltp),
			("es", es),
			("website", "muse"),
			("feature", "offer"),
			("subfeature1", "store-cash"),
			("subfeature2", "sdk"),
			("flavor", es),
		]
	}
}
