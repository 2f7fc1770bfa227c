// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Normalization and validation of caller payloads.
//!
//! Merchants call the tracker with loosely shaped JSON. These functions turn
//! that input into the canonical payload types and reject anything missing a
//! required field. They are pure: persisting anything derived from the input
//! is the calling entry point's job.
//!
//! Accepted legacy shapes:
//!
//! | Input | Canonical |
//! |-------|-----------|
//! | `products: [...]` | `items` |
//! | item `sku` | item `id` |
//! | numeric strings for `quantity` / `price` / `total` | numbers |
//! | `{ user: { id, email, name } }` | flat [`UserData`] |

use serde_json::{Map, Value};

use crate::error::{Result, ValidationError};
use crate::event::{CartItem, CartPayload, CustomEventPayload, PurchasePayload, UserData};

/// Normalizes an add, remove or set cart payload.
pub fn normalize_cart(input: &Value) -> Result<CartPayload> {
	let obj = as_object(input)?;
	Ok(CartPayload {
		items: parse_items(obj)?,
		cart_id: optional_string(obj, "cartId")?,
		currency_code: optional_string(obj, "currencyCode")?,
		total: optional_amount(obj, "total")?,
	})
}

/// Normalizes a purchase payload.
///
/// Amount fields are optional; only the item list is required for attribution.
pub fn normalize_purchase(input: &Value) -> Result<PurchasePayload> {
	let obj = as_object(input)?;
	Ok(PurchasePayload {
		items: parse_items(obj)?,
		cart_id: optional_string(obj, "cartId")?,
		currency_code: optional_string(obj, "currencyCode")?,
		total: optional_amount(obj, "total")?,
		order_id: optional_string(obj, "orderId")?,
	})
}

/// Normalizes a `setUser` payload, flat or nested under `user`.
pub fn normalize_user(input: &Value) -> Result<UserData> {
	let obj = as_object(input)?;
	let user = match obj.get("user") {
		Some(nested @ Value::Object(_)) => as_object(nested)?,
		Some(Value::Null) | None => obj,
		Some(_) => return Err(ValidationError::InvalidField { field: "user" }),
	};

	Ok(UserData {
		id: optional_string(user, "id")?,
		email: optional_string(user, "email")?,
		name: optional_string(user, "name")?,
	})
}

/// Normalizes a custom event.
pub fn normalize_custom_event(event_name: &str, data: Option<Value>) -> Result<CustomEventPayload> {
	let event_name = event_name.trim();
	if event_name.is_empty() {
		return Err(ValidationError::MissingEventName);
	}

	Ok(CustomEventPayload {
		event_name: event_name.to_string(),
		event_data: data.filter(|v| !v.is_null()),
	})
}

fn as_object(value: &Value) -> Result<&Map<String, Value>> {
	value.as_object().ok_or(ValidationError::NotAnObject)
}

fn parse_items(obj: &Map<String, Value>) -> Result<Vec<CartItem>> {
	let raw = obj.get("items").or_else(|| obj.get("products"));
	let items = match raw {
		Some(Value::Array(items)) => items,
		Some(Value::Null) | None => return Err(ValidationError::EmptyItems),
		Some(_) => return Err(ValidationError::InvalidField { field: "items" }),
	};

	if items.is_empty() {
		return Err(ValidationError::EmptyItems);
	}

	items
		.iter()
		.enumerate()
		.map(|(index, item)| parse_item(index, item))
		.collect()
}

fn parse_item(index: usize, value: &Value) -> Result<CartItem> {
	let obj = value
		.as_object()
		.ok_or(ValidationError::MissingItemId { index })?;

	let id = obj
		.get("id")
		.or_else(|| obj.get("sku"))
		.and_then(identifier)
		.ok_or(ValidationError::MissingItemId { index })?;

	let quantity = obj
		.get("quantity")
		.and_then(positive_integer)
		.ok_or(ValidationError::InvalidQuantity { index })?;

	let price = obj
		.get("price")
		.and_then(non_negative_number)
		.ok_or(ValidationError::InvalidPrice { index })?;

	let attributes = obj
		.iter()
		.filter(|(k, _)| !matches!(k.as_str(), "id" | "sku" | "quantity" | "price"))
		.map(|(k, v)| (k.clone(), v.clone()))
		.collect();

	Ok(CartItem {
		id,
		quantity,
		price,
		attributes,
	})
}

fn identifier(value: &Value) -> Option<String> {
	match value {
		Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
		Value::Number(n) => Some(n.to_string()),
		_ => None,
	}
}

fn positive_integer(value: &Value) -> Option<u32> {
	let n = match value {
		Value::Number(n) => match n.as_u64() {
			Some(n) => n,
			None => {
				let f = n.as_f64()?;
				if f.fract() != 0.0 || f < 1.0 {
					return None;
				}
				f as u64
			}
		},
		Value::String(s) => s.trim().parse::<u64>().ok()?,
		_ => return None,
	};

	if n == 0 {
		return None;
	}
	u32::try_from(n).ok()
}

fn non_negative_number(value: &Value) -> Option<f64> {
	let n = match value {
		Value::Number(n) => n.as_f64()?,
		Value::String(s) => s.trim().parse::<f64>().ok()?,
		_ => return None,
	};

	(n.is_finite() && n >= 0.0).then_some(n)
}

fn optional_string(obj: &Map<String, Value>, field: &'static str) -> Result<Option<String>> {
	match obj.get(field) {
		None | Some(Value::Null) => Ok(None),
		Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
		Some(Value::String(s)) => Ok(Some(s.trim().to_string())),
		Some(Value::Number(n)) => Ok(Some(n.to_string())),
		Some(_) => Err(ValidationError::InvalidField { field }),
	}
}

fn optional_amount(obj: &Map<String, Value>, field: &'static str) -> Result<Option<f64>> {
	match obj.get(field) {
		None | Some(Value::Null) => Ok(None),
		Some(value) => non_negative_number(value)
			.map(Some)
			.ok_or(ValidationError::InvalidField { field }),
	}
}
