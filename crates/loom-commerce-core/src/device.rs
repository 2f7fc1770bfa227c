// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Device and browser details reported with telemetry.
//!
//! Fingerprinting happens in the host; the SDK only carries what it is given.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceInfo {
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub device_height: Option<u32>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub device_width: Option<u32>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub browser_height: Option<u32>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub browser_width: Option<u32>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub color_depth: Option<u32>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub screen_height: Option<u32>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub screen_width: Option<u32>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub device_type: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub browser_type: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub rosetta_language: Option<String>,
	/// Page domain and path.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub location: Option<String>,
}
