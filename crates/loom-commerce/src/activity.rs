// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Third-party activity tracker.
//!
//! Some merchants also run a recommendation engine that wants shopper activity.
//! Each activity is reshaped into the payload that engine expects before it is
//! handed over. Activity tracking is best effort and never affects the
//! tracking beacons.

use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::debug;

/// Activities forwarded to the activity tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActivityKind {
	AddToCart,
	RemoveFromCart,
	SetCart,
	Purchase,
	Search,
	BrowseSection,
	BrowsePromo,
	BrowseProduct,
	AddToWishList,
	RemoveFromWishList,
	SetWishList,
	AddToFavorites,
	RemoveFromFavorites,
	SetFavoriteList,
	Track,
}

impl ActivityKind {
	pub fn as_str(&self) -> &'static str {
		match self {
			ActivityKind::AddToCart => "addToCart",
			ActivityKind::RemoveFromCart => "removeFromCart",
			ActivityKind::SetCart => "setCart",
			ActivityKind::Purchase => "purchase",
			ActivityKind::Search => "search",
			ActivityKind::BrowseSection => "browse_section",
			ActivityKind::BrowsePromo => "browse_promo",
			ActivityKind::BrowseProduct => "browse_product",
			ActivityKind::AddToWishList => "addToWishList",
			ActivityKind::RemoveFromWishList => "removeFromWishList",
			ActivityKind::SetWishList => "setWishList",
			ActivityKind::AddToFavorites => "addToFavorites",
			ActivityKind::RemoveFromFavorites => "removeFromFavorites",
			ActivityKind::SetFavoriteList => "setFavoriteList",
			ActivityKind::Track => "track",
		}
	}

	/// Parses an activity name as used by the public entry points.
	pub fn from_name(name: &str) -> Option<Self> {
		let kind = match name {
			"addToCart" => ActivityKind::AddToCart,
			"removeFromCart" => ActivityKind::RemoveFromCart,
			"setCart" => ActivityKind::SetCart,
			"purchase" => ActivityKind::Purchase,
			"search" => ActivityKind::Search,
			"viewSection" | "browse_section" => ActivityKind::BrowseSection,
			"viewPromo" | "browse_promo" => ActivityKind::BrowsePromo,
			"viewProduct" | "browse_product" => ActivityKind::BrowseProduct,
			"addToWishList" => ActivityKind::AddToWishList,
			"removeFromWishList" => ActivityKind::RemoveFromWishList,
			"setWishList" => ActivityKind::SetWishList,
			"addToFavorites" => ActivityKind::AddToFavorites,
			"removeFromFavorites" => ActivityKind::RemoveFromFavorites,
			"setFavoriteList" => ActivityKind::SetFavoriteList,
			"track" => ActivityKind::Track,
			_ => return None,
		};
		Some(kind)
	}
}

impl std::fmt::Display for ActivityKind {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}", self.as_str())
	}
}

/// Receives shopper activity.
pub trait ActivityTracker: Send + Sync + 'static {
	/// Returns `false` to have activities skipped before they are reshaped.
	fn is_enabled(&self) -> bool {
		true
	}

	fn track_activity(&self, kind: ActivityKind, payload: Value);
}

/// Type alias for a shared activity tracker.
pub type SharedActivityTracker = Arc<dyn ActivityTracker>;

/// Activity tracker that drops everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpActivityTracker;

impl ActivityTracker for NoOpActivityTracker {
	fn is_enabled(&self) -> bool {
		false
	}

	fn track_activity(&self, _kind: ActivityKind, _payload: Value) {}
}

/// Forwards caller input to the configured activity tracker.
#[derive(Clone)]
pub struct ActivitySink {
	tracker: SharedActivityTracker,
}

impl ActivitySink {
	pub fn new(tracker: SharedActivityTracker) -> Self {
		Self { tracker }
	}

	pub fn forward(&self, kind: ActivityKind, input: &Value) {
		if !self.tracker.is_enabled() {
			return;
		}
		debug!(activity = %kind, "Forwarding activity");
		self.tracker.track_activity(kind, activity_payload(kind, input));
	}
}

impl Default for ActivitySink {
	fn default() -> Self {
		Self::new(Arc::new(NoOpActivityTracker))
	}
}

/// Reshapes caller input into the payload the activity tracker expects.
///
/// | Kind | Payload |
/// |------|---------|
/// | `setCart`, `track` | input unchanged |
/// | `addToCart`, `removeFromCart` | `deal_id`, `option_id`, `count`, `price` |
/// | `purchase` | `deal_id`, `option_id`, `count` |
/// | `search` | `text` |
/// | wish list, favorites, `browse_product` | `deal_id` from `dealId`, `item_group_id` from `itemGroupId` |
/// | `browse_section` | `name`, `refinements` |
/// | `browse_promo` | `name`, `id` |
pub fn activity_payload(kind: ActivityKind, input: &Value) -> Value {
	match kind {
		ActivityKind::SetCart | ActivityKind::Track => input.clone(),
		ActivityKind::AddToCart | ActivityKind::RemoveFromCart => pick(
			input,
			&[
				("deal_id", "deal_id"),
				("option_id", "option_id"),
				("count", "count"),
				("price", "price"),
			],
		),
		ActivityKind::Purchase => pick(
			input,
			&[("deal_id", "deal_id"), ("option_id", "option_id"), ("count", "count")],
		),
		ActivityKind::Search => pick(input, &[("text", "text")]),
		ActivityKind::AddToWishList
		| ActivityKind::RemoveFromWishList
		| ActivityKind::SetWishList
		| ActivityKind::AddToFavorites
		| ActivityKind::RemoveFromFavorites
		| ActivityKind::SetFavoriteList
		| ActivityKind::BrowseProduct => pick(
			input,
			&[("deal_id", "dealId"), ("item_group_id", "itemGroupId")],
		),
		ActivityKind::BrowseSection => {
			pick(input, &[("name", "name"), ("refinements", "refinements")])
		}
		ActivityKind::BrowsePromo => pick(input, &[("name", "name"), ("id", "id")]),
	}
}

// Copies `source` fields to `target` names, skipping absent ones.
fn pick(input: &Value, fields: &[(&str, &str)]) -> Value {
	let mut out = Map::new();
	for (target, source) in fields {
		if let Some(value) = input.get(source).filter(|v| !v.is_null()) {
			out.insert(target.to_string(), value.clone());
		}
	}
	Value::Object(out)
}

#[cfg(test)]
mod tests {
	use super::*;
	use parking_lot::Mutex;
	use serde_json::json;

	#[derive(Default)]
	struct Recording {
		seen: Mutex<Vec<(ActivityKind, Value)>>,
	}

	impl ActivityTracker for Recording {
		fn track_activity(&self, kind: ActivityKind, payload: Value) {
			self.seen.lock().push((kind, payload));
		}
	}

	#[test]
	fn names_round_trip_through_aliases() {
		assert_eq!(ActivityKind::from_name("viewProduct"), Some(ActivityKind::BrowseProduct));
		assert_eq!(ActivityKind::from_name("browse_product"), Some(ActivityKind::BrowseProduct));
		assert_eq!(ActivityKind::from_name("setFavoriteList"), Some(ActivityKind::SetFavoriteList));
		assert_eq!(ActivityKind::from_name("unknown"), None);
		assert_eq!(ActivityKind::BrowsePromo.to_string(), "browse_promo");
	}

	#[test]
	fn cart_payload_keeps_engine_fields() {
		let input = json!({ "deal_id": "d1", "option_id": "o1", "count": 2, "price": 9.5, "items": [] });
		assert_eq!(
			activity_payload(ActivityKind::AddToCart, &input),
			json!({ "deal_id": "d1", "option_id": "o1", "count": 2, "price": 9.5 })
		);
		assert_eq!(
			activity_payload(ActivityKind::Purchase, &input),
			json!({ "deal_id": "d1", "option_id": "o1", "count": 2 })
		);
	}

	#[test]
	fn product_payload_renames_fields() {
		let input = json!({ "dealId": "d1", "itemGroupId": "g1", "extra": true });
		assert_eq!(
			activity_payload(ActivityKind::AddToWishList, &input),
			json!({ "deal_id": "d1", "item_group_id": "g1" })
		);
	}

	#[test]
	fn set_cart_and_track_pass_through() {
		let input = json!({ "items": [{ "id": "a" }] });
		assert_eq!(activity_payload(ActivityKind::SetCart, &input), input);
		assert_eq!(activity_payload(ActivityKind::Track, &input), input);
	}

	#[test]
	fn non_object_input_becomes_empty_object() {
		assert_eq!(activity_payload(ActivityKind::Search, &json!("shoes")), json!({}));
	}

	#[test]
	fn disabled_tracker_is_skipped() {
		let sink = ActivitySink::default();
		sink.forward(ActivityKind::Search, &json!({ "text": "shoes" }));

		let recording = Arc::new(Recording::default());
		let sink = ActivitySink::new(recording.clone());
		sink.forward(ActivityKind::Search, &json!({ "text": "shoes", "page": 2 }));

		let seen = recording.seen.lock();
		assert_eq!(seen.as_slice(), [(ActivityKind::Search, json!({ "text": "shoes" }))]);
	}
}
