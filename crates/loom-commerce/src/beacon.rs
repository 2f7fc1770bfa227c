// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Beacon sinks.
//!
//! Every sink ends in a fire-and-forget GET through a [`BeaconTransport`]. The
//! response is never read and nothing is retried.
//!
//! Two encodings are used:
//!
//! - **Telemetry**: flat query variables for views, custom events and the
//!   legacy analytics beacons. Empty values are dropped.
//! - **Tracking**: the event payload enriched with cart, user and property
//!   context, JSON encoded, base64 encoded and sent as the `data` parameter.

use std::sync::Arc;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use chrono::Local;
use loom_commerce_core::{
	CartEventKind, DeviceInfo, EventKind, EventPayload, IdentitySource, PropertyContext,
	TrackingEvent, UserIds, VerifiedIdentity,
};
use reqwest::{Client, Url};
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::config::{BeaconUrlBuilder, TrackerConfig};
use crate::http::SDK_VERSION;
use crate::legacy::LegacyEvent;
use crate::task::spawn_detached;

const PRODUCT: &str = "loomcommerce";
const COMPONENT: &str = "loomcommercesdk";
const IMPRESSION: &str = "im";

/// Sends a beacon URL.
pub trait BeaconTransport: Send + Sync + 'static {
	/// Fires the request. Must not block and must not fail observably.
	fn fire(&self, url: String);
}

/// Type alias for a shared beacon transport.
pub type SharedBeaconTransport = Arc<dyn BeaconTransport>;

/// Default transport: a detached GET on the ambient runtime.
pub struct HttpBeaconTransport {
	http_client: Client,
}

impl HttpBeaconTransport {
	pub fn new(http_client: Client) -> Self {
		Self { http_client }
	}
}

impl BeaconTransport for HttpBeaconTransport {
	fn fire(&self, url: String) {
		let http_client = self.http_client.clone();
		spawn_detached("beacon", async move {
			match http_client.get(url).send().await {
				Ok(response) => debug!(status = response.status().as_u16(), "Beacon delivered"),
				Err(e) => debug!(error = %e, "Beacon failed"),
			}
		});
	}
}

/// Per-event context resolved by the router just before dispatch.
#[derive(Debug, Clone)]
pub struct EventContext {
	pub property: PropertyContext,
	pub cart_id: String,
	pub currency_code: Option<String>,
	pub user: UserIds,
	pub identity: Option<VerifiedIdentity>,
}

/// Per-tracker values stamped on every beacon.
#[derive(Clone)]
pub struct BeaconSettings {
	pub telemetry_url: Url,
	pub beacon_base: String,
	pub merchant_ids: Vec<String>,
	pub client_id: Option<String>,
	pub partner_attribution_id: Option<String>,
	pub device_info: DeviceInfo,
	pub url_builder: Option<BeaconUrlBuilder>,
	pub debug: bool,
}

impl BeaconSettings {
	pub fn from_config(config: &TrackerConfig) -> Self {
		Self {
			telemetry_url: config.endpoints.telemetry.clone(),
			beacon_base: config.endpoints.beacon.clone(),
			merchant_ids: config.merchant_ids.clone(),
			client_id: config.client_id.clone(),
			partner_attribution_id: config.partner_attribution_id.clone(),
			device_info: config.device_info.clone(),
			url_builder: config.beacon_url_builder.clone(),
			debug: config.debug,
		}
	}

	fn mrid(&self) -> Option<&str> {
		self.merchant_ids.first().map(String::as_str)
	}
}

/// The telemetry, tracking and legacy analytics sinks.
pub struct Sinks {
	transport: SharedBeaconTransport,
	settings: BeaconSettings,
}

impl Sinks {
	pub fn new(transport: SharedBeaconTransport, settings: BeaconSettings) -> Self {
		Self {
			transport,
			settings,
		}
	}

	/// Sends a view or custom event as flat telemetry variables.
	pub fn telemetry(&self, event: &TrackingEvent, ctx: &EventContext) {
		let vars = telemetry_variables(event, ctx, &self.settings);
		let mut url = self.settings.telemetry_url.clone();
		url.query_pairs_mut().extend_pairs(vars);
		self.send(event.tracking_type(), url.into());
	}

	/// Sends an event through the tracking beacon.
	pub fn track(&self, event: &TrackingEvent, ctx: &EventContext) {
		let tracking_type = event.tracking_type();
		let data = track_data(event, ctx, &self.settings);
		let url = match &self.settings.url_builder {
			Some(build) => build(tracking_type, &data),
			None => format!(
				"{}/{}?data={}",
				self.settings.beacon_base,
				tracking_type,
				encode_data(&data)
			),
		};
		self.send(tracking_type, url);
	}

	/// Sends a legacy analytics beacon.
	pub fn legacy(&self, event: LegacyEvent, property: &PropertyContext) {
		let mut vars: Vec<(&'static str, String)> = event
			.fields()
			.iter()
			.map(|(key, value)| (*key, value.to_string()))
			.collect();
		put(&mut vars, "mrid", self.settings.mrid());
		put(&mut vars, "client_id", self.settings.client_id.as_deref());
		put(&mut vars, "item", Some(&property.property_id));
		put(&mut vars, "t", Some(chrono::Utc::now().timestamp_millis()));

		let mut url = self.settings.telemetry_url.clone();
		url.query_pairs_mut().extend_pairs(vars);
		self.send("legacy", url.into());
	}

	fn send(&self, kind: &'static str, url: String) {
		if self.settings.debug {
			info!(kind, url = %url, "Sending beacon");
		} else {
			debug!(kind, "Sending beacon");
		}
		self.transport.fire(url);
	}
}

/// Flat telemetry variables for a view or custom event.
pub fn telemetry_variables(
	event: &TrackingEvent,
	ctx: &EventContext,
	settings: &BeaconSettings,
) -> Vec<(&'static str, String)> {
	let device = &settings.device_info;
	let view = match &event.payload {
		EventPayload::View(view) => Some(view),
		_ => None,
	};
	let event_data = match &event.payload {
		EventPayload::Custom(custom) => custom.event_data.as_ref(),
		_ => None,
	};
	let event_name = event.payload.event_name();
	let page = event_name.map(|name| format!("{PRODUCT}:{name}"));

	let mut vars = Vec::with_capacity(32);
	put(&mut vars, "dh", device.device_height);
	put(&mut vars, "dw", device.device_width);
	put(&mut vars, "bh", device.browser_height);
	put(&mut vars, "bw", device.browser_width);
	put(&mut vars, "cd", device.color_depth);
	put(&mut vars, "sh", device.screen_height);
	put(&mut vars, "sw", device.screen_width);
	put(&mut vars, "dvis", device.device_type.as_deref());
	put(&mut vars, "btyp", device.browser_type.as_deref());
	put(&mut vars, "rosetta_language", device.rosetta_language.as_deref());
	put(&mut vars, "ru", device.location.as_deref());

	// The cached identity takes precedence over what the event carried.
	put(&mut vars, "confidence_score", ctx.identity.as_ref().map(|i| i.confidence_score));
	put(
		&mut vars,
		"identifier_used",
		ctx.identity.as_ref().and_then(|i| i.identification_type.as_deref()),
	);
	put(
		&mut vars,
		"unverified_cust_id",
		ctx.identity
			.as_ref()
			.map(|i| i.encrypted_account_number.as_str())
			.or_else(|| view.and_then(|v| v.encrypted_account_number.as_deref())),
	);

	put(&mut vars, "item", Some(&ctx.property.property_id));
	put(&mut vars, "mrid", settings.mrid());
	put(&mut vars, "client_id", settings.client_id.as_deref());
	put(&mut vars, "bn_code", settings.partner_attribution_id.as_deref());
	put(&mut vars, "event_name", event_name);
	put(&mut vars, "event_type", Some(event.tracking_type()));
	put(&mut vars, "sinfo", event_data.map(Value::to_string));
	put(&mut vars, "page", page.as_deref());
	put(&mut vars, "pgrp", page.as_deref());
	put(&mut vars, "comp", Some(COMPONENT));
	put(&mut vars, "e", Some(IMPRESSION));
	put(&mut vars, "t", Some(event.timestamp.timestamp_millis()));
	put(&mut vars, "g", Some(timezone_offset_minutes()));
	put(
		&mut vars,
		"external_id",
		view.and_then(|v| v.merchant_provided_user_id.as_deref())
			.or(ctx.user.merchant_provided_user_id.as_deref()),
	);
	put(
		&mut vars,
		"shopper_id",
		view.and_then(|v| v.shopper_id.as_deref())
			.or(Some(ctx.user.shopper_id.as_str())),
	);
	put(
		&mut vars,
		"merchant_cart_id",
		view.and_then(|v| v.cart_id.as_deref()),
	);
	put(&mut vars, "product", Some(PRODUCT));
	vars
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct BeaconUser<'a> {
	id: &'a str,
	source: IdentitySource,
	#[serde(skip_serializing_if = "Option::is_none")]
	merchant_provided_user_id: Option<&'a str>,
	shopper_id: &'a str,
}

/// The tracking beacon data for a cart, purchase or cancel event.
pub fn track_data(event: &TrackingEvent, ctx: &EventContext, settings: &BeaconSettings) -> Value {
	let mut data = match event.payload.to_value() {
		Value::Object(map) => map,
		_ => Map::new(),
	};

	if let EventKind::Cart(kind) = event.kind {
		if kind != CartEventKind::Cancel {
			data.insert("cartEventType".to_string(), Value::from(kind.as_str()));
		}
	}

	if let Some(currency) = &ctx.currency_code {
		data.insert("currencyCode".to_string(), Value::from(currency.as_str()));
	}
	data.insert("cartId".to_string(), Value::from(ctx.cart_id.as_str()));
	let user = BeaconUser {
		id: ctx.user.primary_id(),
		source: ctx.user.source(),
		merchant_provided_user_id: ctx.user.merchant_provided_user_id.as_deref(),
		shopper_id: &ctx.user.shopper_id,
	};
	data.insert("user".to_string(), serde_json::to_value(user).unwrap_or_default());
	data.insert(
		"propertyId".to_string(),
		Value::from(ctx.property.property_id.as_str()),
	);
	data.insert("trackingType".to_string(), Value::from(event.tracking_type()));
	if let Some(client_id) = &settings.client_id {
		data.insert("clientId".to_string(), Value::from(client_id.as_str()));
	}
	data.insert(
		"merchantId".to_string(),
		Value::from(settings.merchant_ids.join(",")),
	);
	data.insert(
		"deviceInfo".to_string(),
		serde_json::to_value(&settings.device_info).unwrap_or_default(),
	);
	data.insert("version".to_string(), Value::from(SDK_VERSION));

	Value::Object(data)
}

/// JSON, then base64, then URL-encoded for use as a query value.
pub fn encode_data(data: &Value) -> String {
	let encoded = STANDARD.encode(data.to_string());
	url::form_urlencoded::byte_serialize(encoded.as_bytes()).collect()
}

fn put<V: ToString>(vars: &mut Vec<(&'static str, String)>, key: &'static str, value: Option<V>) {
	if let Some(value) = value {
		let value = value.to_string();
		if !value.is_empty() {
			vars.push((key, value));
		}
	}
}

// Minutes to add to local time to get UTC, as browsers report it.
fn timezone_offset_minutes() -> i32 {
	-Local::now().offset().local_minus_utc() / 60
}
