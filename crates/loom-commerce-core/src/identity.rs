// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Shopper identity types.
//!
//! A shopper is known by up to three ids:
//! - a generated shopper id, always present and owned by the SDK
//! - a verified id confirmed by the identity service
//! - a merchant-provided id declared through `setUser`
//!
//! The verified id wins over the generated one when present. The merchant id
//! is an extra attribute and never replaces either.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Confidence score the identity service must report for an identity to count.
pub const VERIFIED_CONFIDENCE_SCORE: u32 = 100;

/// An identity returned by the identity service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifiedIdentity {
	pub encrypted_account_number: String,
	#[serde(default, deserialize_with = "score_from_any")]
	pub confidence_score: u32,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub identification_type: Option<String>,
}

impl VerifiedIdentity {
	/// Returns `true` only for an exact maximum confidence match.
	pub fn is_verified(&self) -> bool {
		self.confidence_score == VERIFIED_CONFIDENCE_SCORE
	}
}

// The service has reported the score both as a number and as a string.
fn score_from_any<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
	D: Deserializer<'de>,
{
	let value = Value::deserialize(deserializer)?;
	let score = match &value {
		Value::Number(n) => n.as_f64().map(|f| f.trunc()),
		Value::String(s) => s.trim().parse::<f64>().ok().map(f64::trunc),
		_ => None,
	};
	Ok(score
		.filter(|s| (0.0..=f64::from(u32::MAX)).contains(s))
		.map(|s| s as u32)
		.unwrap_or(0))
}

/// Result of one identity handshake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentityOutcome {
	/// The service answered with an identity.
	Confirmed(VerifiedIdentity),
	/// The service answered but could not identify the shopper.
	Unconfirmed,
	/// The service did not answer in time.
	TimedOut,
}

/// What the identity handshake is asked with.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentityRequest {
	pub device_info: Value,
	pub country: String,
	pub query_host: String,
}

/// Where the primary user id came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentitySource {
	Generated,
	Verified,
}

/// All ids known for the current shopper.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserIds {
	pub shopper_id: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub verified_id: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub merchant_provided_user_id: Option<String>,
}

impl UserIds {
	/// The id events are attributed to: verified when available, generated otherwise.
	pub fn primary_id(&self) -> &str {
		self.verified_id.as_deref().unwrap_or(&self.shopper_id)
	}

	pub fn source(&self) -> IdentitySource {
		if self.verified_id.is_some() {
			IdentitySource::Verified
		} else {
			IdentitySource::Generated
		}
	}
}
