// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Canonical tracking events.
//!
//! Every public tracking call is normalized into a [`TrackingEvent`] before it
//! reaches the router. Events are immutable once built; the router consumes
//! each one exactly once, either directly or when the pending queue drains.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// The cart mutation carried by a cart event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CartEventKind {
	Add,
	Remove,
	Set,
	Cancel,
}

impl CartEventKind {
	/// Returns the public entry-point name for this mutation.
	pub fn as_str(&self) -> &'static str {
		match self {
			CartEventKind::Add => "addToCart",
			CartEventKind::Remove => "removeFromCart",
			CartEventKind::Set => "setCart",
			CartEventKind::Cancel => "cancelCart",
		}
	}
}

impl std::fmt::Display for CartEventKind {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}", self.as_str())
	}
}

/// The kind of a tracking event, which decides how the router fans it out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
	Cart(CartEventKind),
	Purchase,
	View,
	Custom,
}

impl EventKind {
	/// Returns the tracking type reported to the telemetry endpoints.
	pub fn tracking_type(&self) -> &'static str {
		match self {
			EventKind::Cart(CartEventKind::Cancel) => "cancelCart",
			EventKind::Cart(_) => "cartEvent",
			EventKind::Purchase => "purchase",
			EventKind::View => "view",
			EventKind::Custom => "customEvent",
		}
	}
}

/// A single line item in a cart or purchase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
	pub id: String,
	pub quantity: u32,
	pub price: f64,
	/// Caller-supplied item fields the SDK does not interpret (name, url, ...).
	#[serde(flatten)]
	pub attributes: Map<String, Value>,
}

/// Payload of an add, remove or set cart event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartPayload {
	pub items: Vec<CartItem>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub cart_id: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub currency_code: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub total: Option<f64>,
}

/// Payload of a purchase event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchasePayload {
	pub items: Vec<CartItem>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub cart_id: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub currency_code: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub total: Option<f64>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub order_id: Option<String>,
}

/// Payload of a page view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewPayload {
	pub event_name: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub shopper_id: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub merchant_provided_user_id: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub encrypted_account_number: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub cart_id: Option<String>,
}

/// Payload of a merchant-defined custom event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomEventPayload {
	pub event_name: String,
	/// Opaque caller data, sent as a JSON string.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub event_data: Option<Value>,
}

/// Normalized merchant user declared through `setUser`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserData {
	#[serde(skip_serializing_if = "Option::is_none")]
	pub id: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub email: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub name: Option<String>,
}

/// The canonical payload of a tracking event.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum EventPayload {
	Cart(CartPayload),
	Purchase(PurchasePayload),
	View(ViewPayload),
	Custom(CustomEventPayload),
	/// A cart cancellation, pinned to the cart id active when it was issued.
	Cancel {
		#[serde(rename = "cartId", skip_serializing_if = "Option::is_none")]
		cart_id: Option<String>,
	},
}

impl EventPayload {
	/// Cart id the merchant declared on this payload, if any.
	///
	/// A cancellation's pinned id is not a declaration and is not returned here.
	pub fn declared_cart_id(&self) -> Option<&str> {
		match self {
			EventPayload::Cart(p) => p.cart_id.as_deref(),
			EventPayload::Purchase(p) => p.cart_id.as_deref(),
			EventPayload::View(_) | EventPayload::Custom(_) | EventPayload::Cancel { .. } => None,
		}
	}

	/// Cart id that must be reported for this event instead of the current one.
	pub fn reported_cart_id(&self) -> Option<&str> {
		match self {
			EventPayload::Cancel { cart_id } => cart_id.as_deref(),
			other => other.declared_cart_id(),
		}
	}

	/// Currency code the merchant declared on this payload, if any.
	pub fn declared_currency(&self) -> Option<&str> {
		match self {
			EventPayload::Cart(p) => p.currency_code.as_deref(),
			EventPayload::Purchase(p) => p.currency_code.as_deref(),
			_ => None,
		}
	}

	/// Event name of a view or custom event.
	pub fn event_name(&self) -> Option<&str> {
		match self {
			EventPayload::View(p) => Some(&p.event_name),
			EventPayload::Custom(p) => Some(&p.event_name),
			_ => None,
		}
	}

	/// Converts the payload into a JSON object.
	pub fn to_value(&self) -> Value {
		serde_json::to_value(self).unwrap_or_default()
	}
}

/// A normalized event ready for routing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrackingEvent {
	pub kind: EventKind,
	pub payload: EventPayload,
	pub timestamp: DateTime<Utc>,
}

impl TrackingEvent {
	/// Creates a new event stamped with the current time.
	pub fn new(kind: EventKind, payload: EventPayload) -> Self {
		Self {
			kind,
			payload,
			timestamp: Utc::now(),
		}
	}

	/// Creates an add, remove or set cart event.
	pub fn cart(kind: CartEventKind, payload: CartPayload) -> Self {
		Self::new(EventKind::Cart(kind), EventPayload::Cart(payload))
	}

	/// Creates a cart cancellation pinned to `cart_id`.
	pub fn cancel_cart(cart_id: Option<String>) -> Self {
		Self::new(
			EventKind::Cart(CartEventKind::Cancel),
			EventPayload::Cancel { cart_id },
		)
	}

	pub fn purchase(payload: PurchasePayload) -> Self {
		Self::new(EventKind::Purchase, EventPayload::Purchase(payload))
	}

	pub fn view(payload: ViewPayload) -> Self {
		Self::new(EventKind::View, EventPayload::View(payload))
	}

	pub fn custom(payload: CustomEventPayload) -> Self {
		Self::new(EventKind::Custom, EventPayload::Custom(payload))
	}

	/// Returns the tracking type reported to the telemetry endpoints.
	pub fn tracking_type(&self) -> &'static str {
		self.kind.tracking_type()
	}
}
