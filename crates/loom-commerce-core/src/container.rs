// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Property containers.
//!
//! A container is the merchant's tracking configuration as returned by the
//! container service. The SDK only keeps a summary of it: the container id
//! (the property id every event is attributed to) and the id of the offer
//! program, whose presence turns on the legacy analytics beacons.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Tag definition that carries offer program configuration.
pub const OFFERS_TAG: &str = "offers";
/// Configuration entry holding the offer program id.
pub const OFFER_PROGRAM_ID: &str = "offer-program-id";

/// Container descriptor as returned by the container service.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Container {
	pub id: String,
	#[serde(default)]
	pub integration_type: String,
	#[serde(default)]
	pub owner_id: String,
	#[serde(default)]
	pub tags: Vec<ContainerTag>,
	#[serde(default, rename = "jlAccessToken")]
	pub jl_access_token: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ContainerTag {
	pub tag_definition_id: String,
	#[serde(default)]
	pub configuration: Vec<TagConfiguration>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TagConfiguration {
	pub id: String,
	#[serde(default)]
	pub value: Value,
}

/// The parts of a container the SDK keeps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerSummary {
	pub id: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub program_id: Option<String>,
	#[serde(default)]
	pub integration_type: String,
	#[serde(default)]
	pub mrid: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub jl_access_token: Option<String>,
}

impl From<Container> for ContainerSummary {
	fn from(container: Container) -> Self {
		let program_id = container
			.tags
			.iter()
			.find(|tag| tag.tag_definition_id == OFFERS_TAG)
			.and_then(|tag| {
				tag.configuration
					.iter()
					.find(|entry| entry.id == OFFER_PROGRAM_ID)
			})
			.and_then(|entry| match &entry.value {
				Value::String(s) if !s.is_empty() => Some(s.clone()),
				Value::Number(n) => Some(n.to_string()),
				_ => None,
			});

		Self {
			id: container.id,
			program_id,
			integration_type: container.integration_type,
			mrid: container.owner_id,
			jl_access_token: container.jl_access_token.filter(|t| !t.is_empty()),
		}
	}
}

/// The resolved property an event is attributed to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PropertyContext {
	pub property_id: String,
	pub program_id: Option<String>,
	pub created_at: DateTime<Utc>,
}

impl PropertyContext {
	/// Returns `true` when a merchant program is active for this property.
	pub fn has_program(&self) -> bool {
		self.program_id.is_some()
	}
}
