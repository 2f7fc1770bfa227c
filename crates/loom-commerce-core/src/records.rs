// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Shapes of the values the SDK persists, and their expiry rules.
//!
//! Every value is stored as JSON. Entries that expire carry a `createdAt`
//! timestamp in epoch milliseconds.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::container::ContainerSummary;
use crate::identity::VerifiedIdentity;

pub const ONE_HOUR_MS: i64 = 60 * 60 * 1000;
pub const SEVEN_DAYS_MS: i64 = 7 * 24 * ONE_HOUR_MS;

/// Default lifetime of a cart id.
pub const CART_TTL_MS: i64 = SEVEN_DAYS_MS;
/// Default lifetime of a cached container.
pub const CONTAINER_TTL_MS: i64 = ONE_HOUR_MS;
/// Default lifetime of a cached identity answer.
pub const IDENTITY_TTL_MS: i64 = ONE_HOUR_MS;

/// Current time in epoch milliseconds.
pub fn now_millis() -> i64 {
	Utc::now().timestamp_millis()
}

/// Generates a random id for carts and shoppers.
pub fn generate_id() -> String {
	Uuid::new_v4().simple().to_string()
}

/// Returns `true` once more than `ttl_ms` has passed since `created_at`.
pub fn is_expired(created_at: i64, ttl_ms: i64, now: i64) -> bool {
	now.saturating_sub(created_at) > ttl_ms
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartRecord {
	pub cart_id: String,
	pub created_at: i64,
}

impl CartRecord {
	pub fn new(cart_id: impl Into<String>) -> Self {
		Self {
			cart_id: cart_id.into(),
			created_at: now_millis(),
		}
	}
}

/// Stored shopper ids. Neither id expires.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub user_id: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub merchant_provided_user_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerRecord {
	pub container_summary: ContainerSummary,
	pub created_at: i64,
}

impl ContainerRecord {
	pub fn new(container_summary: ContainerSummary) -> Self {
		Self {
			container_summary,
			created_at: now_millis(),
		}
	}
}

/// A cached identity answer, stored as the identity or as `false`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CachedIdentity {
	Known(VerifiedIdentity),
	Unknown(bool),
}

impl CachedIdentity {
	/// The "asked recently, nobody found" marker.
	pub fn unknown() -> Self {
		CachedIdentity::Unknown(false)
	}

	pub fn identity(&self) -> Option<&VerifiedIdentity> {
		match self {
			CachedIdentity::Known(identity) => Some(identity),
			CachedIdentity::Unknown(_) => None,
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentityRecord {
	pub identity: CachedIdentity,
	pub created_at: i64,
}

impl IdentityRecord {
	pub fn new(identity: CachedIdentity) -> Self {
		Self {
			identity,
			created_at: now_millis(),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;

	#[test]
	fn expiry_is_strictly_after_ttl() {
		assert!(!is_expired(1_000, 500, 1_500));
		assert!(is_expired(1_000, 500, 1_501));
		assert!(!is_expired(1_000, 500, 900));
	}

	#[test]
	fn generated_ids_are_unique() {
		assert_ne!(generate_id(), generate_id());
		assert_eq!(generate_id().len(), 32);
	}

	#[test]
	fn cart_record_wire_shape() {
		let record = CartRecord {
			cart_id: "c1".to_string(),
			created_at: 42,
		};
		assert_eq!(
			serde_json::to_value(&record).unwrap(),
			json!({ "cartId": "c1", "createdAt": 42 })
		);
	}

	#[test]
	fn identity_record_stores_false_for_unknown() {
		let record = IdentityRecord {
			identity: CachedIdentity::unknown(),
			created_at: 7,
		};
		let value = serde_json::to_value(&record).unwrap();
		assert_eq!(value, json!({ "identity": false, "createdAt": 7 }));

		let back: IdentityRecord = serde_json::from_value(value).unwrap();
		assert_eq!(back.identity.identity(), None);
	}

	#[test]
	fn identity_record_reads_known_identity() {
		let record: IdentityRecord = serde_json::from_value(json!({
			"identity": { "encryptedAccountNumber": "EAN", "confidenceScore": 100 },
			"createdAt": 1
		}))
		.unwrap();

		let identity = record.identity.identity().unwrap();
		assert_eq!(identity.encrypted_account_number, "EAN");
	}

	#[test]
	fn user_record_tolerates_partial_entries() {
		let record: UserRecord =
			serde_json::from_value(json!({ "merchantProvidedUserId": "m1" })).unwrap();
		assert_eq!(record.user_id, None);
		assert_eq!(record.merchant_provided_user_id.as_deref(), Some("m1"));
	}
}
