// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Tracker configuration.
//!
//! [`TrackerConfig`] is assembled and validated by
//! [`CommerceTrackerBuilder`](crate::CommerceTrackerBuilder); it is the single
//! context every component reads from.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use loom_commerce_core::records::{CART_TTL_MS, CONTAINER_TTL_MS, IDENTITY_TTL_MS};
use loom_commerce_core::{DeviceInfo, UserData};
use reqwest::Url;
use serde_json::Value;

use crate::error::{Result, TrackerError};

/// Query parameter on the page URL that turns on debug logging.
pub const DEBUG_QUERY_PARAM: &str = "loomDebug";

/// Default country reported to the identity service.
pub const DEFAULT_COUNTRY: &str = "US";

const TELEMETRY_PATH: &str = "/api/commerce/ts";
const BEACON_PATH: &str = "/api/commerce/track";
const PROPERTY_PATH: &str = "/api/commerce/containers";
const TOKEN_PATH: &str = "/api/commerce/partner-token";

/// Builds the tracking beacon URL from the tracking type and the beacon data.
pub type BeaconUrlBuilder = Arc<dyn Fn(&str, &Value) -> String + Send + Sync>;

/// Builds the user access token URL.
pub type TokenUrlBuilder = Arc<dyn Fn() -> String + Send + Sync>;

/// Backend endpoints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
	/// Telemetry beacon for views, custom events and legacy analytics.
	pub telemetry: Url,
	/// Base of the tracking beacon; the tracking type is appended as a path segment.
	pub beacon: String,
	/// Container service.
	pub property: Url,
	/// Access token service used by `get_identity`.
	pub access_token: Url,
	/// User access token service used by `get_user_access_token`.
	pub user_token: Url,
}

impl Endpoints {
	/// Derives every endpoint from the server base URL.
	pub fn from_base(base_url: &str) -> Result<Self> {
		let base = base_url.trim_end_matches('/');
		Url::parse(base).map_err(|_| TrackerError::InvalidBaseUrl)?;

		Ok(Self {
			telemetry: parse_endpoint("telemetry", &format!("{base}{TELEMETRY_PATH}"))?,
			beacon: format!("{base}{BEACON_PATH}"),
			property: parse_endpoint("property", &format!("{base}{PROPERTY_PATH}"))?,
			access_token: parse_endpoint("access_token", &format!("{base}{TOKEN_PATH}"))?,
			user_token: parse_endpoint("user_token", &format!("{base}{TOKEN_PATH}"))?,
		})
	}
}

pub(crate) fn parse_endpoint(name: &'static str, url: &str) -> Result<Url> {
	Url::parse(url.trim_end_matches('/')).map_err(|_| TrackerError::InvalidEndpoint(name))
}

/// Validated tracker configuration.
#[derive(Clone)]
pub struct TrackerConfig {
	/// Merchant ids; the first one is used for lookups.
	pub merchant_ids: Vec<String>,
	pub client_id: Option<String>,
	pub partner_attribution_id: Option<String>,
	/// The page the tracker runs on. Its origin keys the container lookup.
	pub page_url: Url,
	pub endpoints: Endpoints,
	pub device_info: DeviceInfo,
	pub country: String,
	/// Host the identity service is queried through.
	pub identity_query_host: String,
	/// Initial currency; later replaced by any currency an event declares.
	pub currency_code: Option<String>,
	/// Merchant user declared at construction.
	pub user: Option<UserData>,
	pub cart_ttl_ms: i64,
	pub property_ttl_ms: i64,
	pub identity_ttl_ms: i64,
	pub request_timeout: Duration,
	pub identity_timeout: Duration,
	pub debug: bool,
	pub beacon_url_builder: Option<BeaconUrlBuilder>,
	pub token_url_builder: Option<TokenUrlBuilder>,
}

impl TrackerConfig {
	/// Creates a configuration with default settings.
	pub fn new(base_url: &str, page_url: &str) -> Result<Self> {
		let page_url = Url::parse(page_url).map_err(|_| TrackerError::InvalidPageUrl)?;
		let endpoints = Endpoints::from_base(base_url)?;
		let debug = debug_requested(&page_url);

		Ok(Self {
			merchant_ids: Vec::new(),
			client_id: None,
			partner_attribution_id: None,
			identity_query_host: page_url.origin().ascii_serialization(),
			page_url,
			endpoints,
			device_info: DeviceInfo::default(),
			country: DEFAULT_COUNTRY.to_string(),
			currency_code: None,
			user: None,
			cart_ttl_ms: CART_TTL_MS,
			property_ttl_ms: CONTAINER_TTL_MS,
			identity_ttl_ms: IDENTITY_TTL_MS,
			request_timeout: Duration::from_secs(30),
			identity_timeout: Duration::from_secs(10),
			debug,
			beacon_url_builder: None,
			token_url_builder: None,
		})
	}

	/// The merchant id used for container and token lookups.
	pub fn merchant_id(&self) -> Option<&str> {
		self.merchant_ids.first().map(String::as_str)
	}

	/// Scheme, host and port of the page.
	pub fn origin(&self) -> String {
		self.page_url.origin().ascii_serialization()
	}

	/// URL for the user access token request.
	pub fn user_token_url(&self) -> String {
		match &self.token_url_builder {
			Some(build) => build(),
			None => self.endpoints.user_token.to_string(),
		}
	}
}

impl fmt::Debug for TrackerConfig {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("TrackerConfig")
			.field("merchant_ids", &self.merchant_ids)
			.field("client_id", &self.client_id)
			.field("page_url", &self.page_url.as_str())
			.field("endpoints", &self.endpoints)
			.field("currency_code", &self.currency_code)
			.field("debug", &self.debug)
			.field("beacon_url_builder", &self.beacon_url_builder.is_some())
			.field("token_url_builder", &self.token_url_builder.is_some())
			.finish_non_exhaustive()
	}
}

fn debug_requested(page_url: &Url) -> bool {
	page_url
		.query_pairs()
		.any(|(key, value)| key == DEBUG_QUERY_PARAM && !value.is_empty() && value != "false")
}
