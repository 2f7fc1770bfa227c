// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Validation errors raised while normalizing caller payloads.

use thiserror::Error;

/// A caller-supplied payload is missing a required field or has a malformed one.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
	/// The payload is not a JSON object.
	#[error("payload must be a JSON object")]
	NotAnObject,

	/// A cart or purchase payload carries no line items.
	#[error("at least one item is required")]
	EmptyItems,

	/// A line item has no usable identifier.
	#[error("item {index}: missing identifier")]
	MissingItemId { index: usize },

	/// A line item quantity is absent, zero, negative or fractional.
	#[error("item {index}: quantity must be a positive integer")]
	InvalidQuantity { index: usize },

	/// A line item price is absent, negative or not a number.
	#[error("item {index}: price must be a non-negative number")]
	InvalidPrice { index: usize },

	/// A custom event was fired without a name.
	#[error("event name must be a non-empty string")]
	MissingEventName,

	/// An optional field is present but has the wrong type.
	#[error("field `{field}` has an invalid type")]
	InvalidField { field: &'static str },
}

/// Result type alias for normalization.
pub type Result<T> = std::result::Result<T, ValidationError>;

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn item_errors_name_the_offending_index() {
		let err = ValidationError::InvalidQuantity { index: 3 };
		assert_eq!(err.to_string(), "item 3: quantity must be a positive integer");
	}

	#[test]
	fn field_errors_name_the_field() {
		let err = ValidationError::InvalidField { field: "currencyCode" };
		assert_eq!(err.to_string(), "field `currencyCode` has an invalid type");
	}
}
