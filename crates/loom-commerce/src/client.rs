// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Commerce tracker client.

use std::sync::Arc;
use std::time::Duration;

use loom_commerce_core::{
	normalize_cart, normalize_custom_event, normalize_purchase, normalize_user, CartEventKind,
	DeviceInfo, IdentityRequest, PropertyContext, TrackingEvent, UserIds, ViewPayload,
};
use reqwest::Client;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::activity::{ActivityKind, ActivitySink, SharedActivityTracker};
use crate::beacon::{BeaconSettings, HttpBeaconTransport, SharedBeaconTransport, Sinks};
use crate::cart::CartState;
use crate::config::{parse_endpoint, BeaconUrlBuilder, TokenUrlBuilder, TrackerConfig};
use crate::error::{Result, TrackerError};
use crate::property::{HttpPropertySource, PropertyResolver, SharedPropertySource};
use crate::router::Router;
use crate::storage::{MemoryStore, SharedStore};
use crate::token::{fetch_access_token, fetch_user_access_token, UserAccessToken};
use crate::user::{SharedIdentityProvider, UserManager};

/// Builder for constructing a CommerceTracker.
pub struct CommerceTrackerBuilder {
	base_url: Option<String>,
	page_url: Option<String>,
	merchant_ids: Vec<String>,
	client_id: Option<String>,
	partner_attribution_id: Option<String>,
	device_info: DeviceInfo,
	country: Option<String>,
	identity_query_host: Option<String>,
	currency_code: Option<String>,
	user: Option<Value>,
	telemetry_url: Option<String>,
	beacon_url: Option<String>,
	property_url: Option<String>,
	access_token_url: Option<String>,
	user_token_url: Option<String>,
	cart_ttl: Option<Duration>,
	property_ttl: Option<Duration>,
	identity_ttl: Option<Duration>,
	request_timeout: Option<Duration>,
	identity_timeout: Option<Duration>,
	debug: Option<bool>,
	beacon_url_builder: Option<BeaconUrlBuilder>,
	token_url_builder: Option<TokenUrlBuilder>,
	store: Option<SharedStore>,
	property_source: Option<SharedPropertySource>,
	identity_provider: Option<SharedIdentityProvider>,
	beacon_transport: Option<SharedBeaconTransport>,
	activity_tracker: Option<SharedActivityTracker>,
}

impl CommerceTrackerBuilder {
	/// Creates a new builder with default settings.
	pub fn new() -> Self {
		Self {
			base_url: None,
			page_url: None,
			merchant_ids: Vec::new(),
			client_id: None,
			partner_attribution_id: None,
			device_info: DeviceInfo::default(),
			country: None,
			identity_query_host: None,
			currency_code: None,
			user: None,
			telemetry_url: None,
			beacon_url: None,
			property_url: None,
			access_token_url: None,
			user_token_url: None,
			cart_ttl: None,
			property_ttl: None,
			identity_ttl: None,
			request_timeout: None,
			identity_timeout: None,
			debug: None,
			beacon_url_builder: None,
			token_url_builder: None,
			store: None,
			property_source: None,
			identity_provider: None,
			beacon_transport: None,
			activity_tracker: None,
		}
	}

	/// Sets the base URL every endpoint is derived from.
	///
	/// Example: `https://loom.ghuntley.com`
	pub fn base_url(mut self, url: impl Into<String>) -> Self {
		self.base_url = Some(url.into());
		self
	}

	/// Sets the URL of the page being tracked.
	pub fn page_url(mut self, url: impl Into<String>) -> Self {
		self.page_url = Some(url.into());
		self
	}

	/// Adds a merchant id. The first one is used for lookups; all are reported.
	pub fn merchant_id(mut self, id: impl Into<String>) -> Self {
		self.merchant_ids.push(id.into());
		self
	}

	pub fn client_id(mut self, id: impl Into<String>) -> Self {
		self.client_id = Some(id.into());
		self
	}

	pub fn partner_attribution_id(mut self, id: impl Into<String>) -> Self {
		self.partner_attribution_id = Some(id.into());
		self
	}

	/// Sets the device details reported with telemetry.
	pub fn device_info(mut self, device_info: DeviceInfo) -> Self {
		self.device_info = device_info;
		self
	}

	pub fn country(mut self, country: impl Into<String>) -> Self {
		self.country = Some(country.into());
		self
	}

	/// Sets the host the identity service is queried through.
	pub fn identity_query_host(mut self, host: impl Into<String>) -> Self {
		self.identity_query_host = Some(host.into());
		self
	}

	pub fn currency_code(mut self, currency: impl Into<String>) -> Self {
		self.currency_code = Some(currency.into());
		self
	}

	/// Declares the merchant's user, flat or nested under `user`.
	///
	/// The `id` becomes the merchant-provided user id.
	pub fn user(mut self, user: Value) -> Self {
		self.user = Some(user);
		self
	}

	pub fn telemetry_url(mut self, url: impl Into<String>) -> Self {
		self.telemetry_url = Some(url.into());
		self
	}

	/// Sets the base of the tracking beacon URL.
	pub fn beacon_url(mut self, url: impl Into<String>) -> Self {
		self.beacon_url = Some(url.into());
		self
	}

	pub fn property_url(mut self, url: impl Into<String>) -> Self {
		self.property_url = Some(url.into());
		self
	}

	pub fn access_token_url(mut self, url: impl Into<String>) -> Self {
		self.access_token_url = Some(url.into());
		self
	}

	pub fn user_token_url(mut self, url: impl Into<String>) -> Self {
		self.user_token_url = Some(url.into());
		self
	}

	pub fn cart_ttl(mut self, ttl: Duration) -> Self {
		self.cart_ttl = Some(ttl);
		self
	}

	pub fn property_ttl(mut self, ttl: Duration) -> Self {
		self.property_ttl = Some(ttl);
		self
	}

	pub fn identity_ttl(mut self, ttl: Duration) -> Self {
		self.identity_ttl = Some(ttl);
		self
	}

	/// Sets the HTTP request timeout.
	pub fn request_timeout(mut self, timeout: Duration) -> Self {
		self.request_timeout = Some(timeout);
		self
	}

	/// Sets how long an identity handshake may take.
	pub fn identity_timeout(mut self, timeout: Duration) -> Self {
		self.identity_timeout = Some(timeout);
		self
	}

	/// Forces debug logging on or off, overriding the page URL.
	pub fn debug(mut self, enabled: bool) -> Self {
		self.debug = Some(enabled);
		self
	}

	/// Replaces how tracking beacon URLs are built.
	///
	/// # Example
	///
	/// ```ignore
	/// let tracker = CommerceTracker::builder()
	///     .base_url("https://loom.example.com")
	///     .page_url("https://shop.example.com/")
	///     .beacon_url_builder(|tracking_type, data| {
	///         format!("https://beacons.example.com/{tracking_type}?cart={}", data["cartId"])
	///     })
	///     .build()?;
	/// ```
	pub fn beacon_url_builder(
		mut self,
		build: impl Fn(&str, &Value) -> String + Send + Sync + 'static,
	) -> Self {
		self.beacon_url_builder = Some(Arc::new(build));
		self
	}

	/// Replaces how the user access token URL is built.
	pub fn token_url_builder(mut self, build: impl Fn() -> String + Send + Sync + 'static) -> Self {
		self.token_url_builder = Some(Arc::new(build));
		self
	}

	/// Sets the persistent store. Defaults to an in-memory store.
	pub fn store(mut self, store: SharedStore) -> Self {
		self.store = Some(store);
		self
	}

	/// Sets the container source. Defaults to the container service.
	pub fn property_source(mut self, source: SharedPropertySource) -> Self {
		self.property_source = Some(source);
		self
	}

	/// Sets the identity handshake. Without one no identity is ever confirmed.
	pub fn identity_provider(mut self, provider: SharedIdentityProvider) -> Self {
		self.identity_provider = Some(provider);
		self
	}

	/// Sets the beacon transport. Defaults to a detached HTTP GET.
	pub fn beacon_transport(mut self, transport: SharedBeaconTransport) -> Self {
		self.beacon_transport = Some(transport);
		self
	}

	/// Sets the third-party activity tracker. Defaults to none.
	pub fn activity_tracker(mut self, tracker: SharedActivityTracker) -> Self {
		self.activity_tracker = Some(tracker);
		self
	}

	/// Builds the CommerceTracker.
	///
	/// Resolves the cart and shopper ids and, on a tokio runtime, starts the
	/// property fetch and identity handshake in the background.
	pub fn build(self) -> Result<CommerceTracker> {
		let base_url = self.base_url.ok_or(TrackerError::InvalidBaseUrl)?;
		let page_url = self.page_url.ok_or(TrackerError::InvalidPageUrl)?;
		let mut config = TrackerConfig::new(&base_url, &page_url)?;

		if let Some(url) = self.telemetry_url {
			config.endpoints.telemetry = parse_endpoint("telemetry", &url)?;
		}
		if let Some(url) = self.beacon_url {
			config.endpoints.beacon = parse_endpoint("beacon", &url)?
				.as_str()
				.trim_end_matches('/')
				.to_string();
		}
		if let Some(url) = self.property_url {
			config.endpoints.property = parse_endpoint("property", &url)?;
		}
		if let Some(url) = self.access_token_url {
			config.endpoints.access_token = parse_endpoint("access_token", &url)?;
		}
		if let Some(url) = self.user_token_url {
			config.endpoints.user_token = parse_endpoint("user_token", &url)?;
		}

		config.merchant_ids = self.merchant_ids;
		config.client_id = self.client_id;
		config.partner_attribution_id = self.partner_attribution_id;
		config.device_info = self.device_info;
		if let Some(country) = self.country {
			config.country = country;
		}
		if let Some(host) = self.identity_query_host {
			config.identity_query_host = host;
		}
		config.currency_code = self.currency_code;
		config.user = self.user.as_ref().map(normalize_user).transpose()?;
		if let Some(ttl) = self.cart_ttl {
			config.cart_ttl_ms = millis(ttl);
		}
		if let Some(ttl) = self.property_ttl {
			config.property_ttl_ms = millis(ttl);
		}
		if let Some(ttl) = self.identity_ttl {
			config.identity_ttl_ms = millis(ttl);
		}
		if let Some(timeout) = self.request_timeout {
			config.request_timeout = timeout;
		}
		if let Some(timeout) = self.identity_timeout {
			config.identity_timeout = timeout;
		}
		if let Some(debug) = self.debug {
			config.debug = debug;
		}
		config.beacon_url_builder = self.beacon_url_builder;
		config.token_url_builder = self.token_url_builder;

		let http_client = crate::http::builder()
			.timeout(config.request_timeout)
			.build()
			.map_err(TrackerError::RequestFailed)?;

		let store = self.store.unwrap_or_else(|| Arc::new(MemoryStore::new()));
		let source = self.property_source.unwrap_or_else(|| {
			Arc::new(HttpPropertySource::new(
				http_client.clone(),
				config.endpoints.property.clone(),
			))
		});
		let transport = self
			.beacon_transport
			.unwrap_or_else(|| Arc::new(HttpBeaconTransport::new(http_client.clone())));
		let activity = self
			.activity_tracker
			.map(ActivitySink::new)
			.unwrap_or_default();

		let property = Arc::new(PropertyResolver::new(
			store.clone(),
			source,
			config.merchant_id().map(str::to_string),
			config.origin(),
			config.property_ttl_ms,
		));
		let cart = CartState::new(store.clone(), config.cart_ttl_ms);
		let users = UserManager::new(
			store,
			self.identity_provider,
			IdentityRequest {
				device_info: serde_json::to_value(&config.device_info).unwrap_or_default(),
				country: config.country.clone(),
				query_host: config.identity_query_host.clone(),
			},
			config.identity_ttl_ms,
			config.identity_timeout,
		);
		let router = Arc::new(Router::new(
			Arc::clone(&property),
			cart.clone(),
			users.clone(),
			config.currency_code.clone(),
			Sinks::new(transport, BeaconSettings::from_config(&config)),
		));

		let weak = Arc::downgrade(&router);
		property.on_resolved(move || {
			if let Some(router) = weak.upgrade() {
				router.drain();
			}
		});

		let tracker = CommerceTracker {
			inner: Arc::new(CommerceTrackerInner {
				config,
				http_client,
				router,
				property,
				cart,
				users,
				activity,
			}),
		};
		tracker.setup_user_and_cart();
		tracker.inner.property.lookup();

		if tracker.inner.config.debug {
			info!("Commerce tracker debug mode on");
		}
		info!(
			page_url = %tracker.inner.config.page_url,
			merchant_id = ?tracker.inner.config.merchant_id(),
			"Commerce tracker initialized"
		);

		Ok(tracker)
	}
}

impl Default for CommerceTrackerBuilder {
	fn default() -> Self {
		Self::new()
	}
}

fn millis(duration: Duration) -> i64 {
	i64::try_from(duration.as_millis()).unwrap_or(i64::MAX)
}

struct CommerceTrackerInner {
	config: TrackerConfig,
	http_client: Client,
	router: Arc<Router>,
	property: Arc<PropertyResolver>,
	cart: CartState,
	users: UserManager,
	activity: ActivitySink,
}

/// Client for tracking commerce events.
///
/// Tracking calls never fail and never block: invalid input is logged and
/// dropped, and events wait in memory until the property id is known.
///
/// # Example
///
/// ```ignore
/// use loom_commerce::CommerceTracker;
/// use serde_json::json;
///
/// let tracker = CommerceTracker::builder()
///     .base_url("https://loom.ghuntley.com")
///     .page_url("https://shop.example.com/checkout")
///     .merchant_id("MERCHANT1")
///     .client_id("client_xxx")
///     .build()?;
///
/// tracker.view_page();
/// tracker.add_to_cart(&json!({
///     "items": [{ "id": "sku-1", "quantity": 1, "price": 19.99 }],
///     "currencyCode": "USD"
/// }));
/// tracker.purchase(&json!({
///     "items": [{ "id": "sku-1", "quantity": 1, "price": 19.99 }],
///     "total": 19.99
/// }));
/// ```
#[derive(Clone)]
pub struct CommerceTracker {
	inner: Arc<CommerceTrackerInner>,
}

impl CommerceTracker {
	/// Creates a new builder for constructing a CommerceTracker.
	pub fn builder() -> CommerceTrackerBuilder {
		CommerceTrackerBuilder::new()
	}

	pub fn config(&self) -> &TrackerConfig {
		&self.inner.config
	}

	pub fn add_to_cart(&self, data: &Value) {
		self.cart_event(CartEventKind::Add, ActivityKind::AddToCart, data);
	}

	pub fn remove_from_cart(&self, data: &Value) {
		self.cart_event(CartEventKind::Remove, ActivityKind::RemoveFromCart, data);
	}

	pub fn set_cart(&self, data: &Value) {
		self.cart_event(CartEventKind::Set, ActivityKind::SetCart, data);
	}

	pub fn purchase(&self, data: &Value) {
		match normalize_purchase(data) {
			Ok(payload) => {
				self.inner.activity.forward(ActivityKind::Purchase, data);
				self.inner.router.submit(TrackingEvent::purchase(payload));
			}
			Err(e) => warn!(entry_point = "purchase", error = %e, "Invalid payload, event dropped"),
		}
	}

	/// Reports the current cart as cancelled, then starts a new cart.
	pub fn cancel_cart(&self) {
		let cart_id = self.inner.cart.get_or_create_valid_cart_id();
		self.inner
			.router
			.submit(TrackingEvent::cancel_cart(Some(cart_id)));

		if let Err(e) = self.inner.cart.create_new_cart_id() {
			warn!(entry_point = "cancelCart", error = %e, "Failed to start a new cart");
		}
	}

	pub fn set_cart_id(&self, cart_id: &str) {
		if cart_id.is_empty() {
			warn!(entry_point = "setCartId", "Empty cart id ignored");
			return;
		}
		if let Err(e) = self.inner.cart.set_cart_id(cart_id) {
			warn!(entry_point = "setCartId", error = %e, "Failed to persist cart id");
		}
	}

	/// Records the merchant's id for the shopper. Sends nothing.
	pub fn set_user(&self, data: &Value) {
		let result = normalize_user(data)
			.map_err(TrackerError::from)
			.and_then(|user| self.inner.users.set_merchant_user(&user));
		if let Err(e) = result {
			warn!(entry_point = "setUser", error = %e, "Failed to set user");
		}
	}

	/// Overrides the property id for this session and releases queued events.
	pub fn set_property_id(&self, property_id: impl Into<String>) {
		self.inner.property.set_property_id(property_id);
		self.inner.router.drain();
	}

	pub fn custom_event(&self, event_name: &str, data: Option<Value>) {
		match normalize_custom_event(event_name, data) {
			Ok(payload) => self.inner.router.submit(TrackingEvent::custom(payload)),
			Err(e) => warn!(entry_point = "customEvent", error = %e, "Invalid payload, event dropped"),
		}
	}

	pub fn view_page(&self) {
		let ids = self.inner.users.user_ids();
		let cart_id = self.inner.cart.get_or_create_valid_cart_id();

		self.inner.router.submit(TrackingEvent::view(ViewPayload {
			event_name: "pageView".to_string(),
			shopper_id: Some(ids.shopper_id),
			merchant_provided_user_id: ids.merchant_provided_user_id,
			encrypted_account_number: ids.verified_id,
			cart_id: Some(cart_id),
		}));
	}

	/// Requests an access token for `mrid`.
	pub async fn get_identity(&self, mrid: &str) -> Result<String> {
		let config = &self.inner.config;
		fetch_access_token(
			&self.inner.http_client,
			config.endpoints.access_token.as_str(),
			mrid,
			config.client_id.as_deref(),
		)
		.await
		.inspect_err(|e| warn!(entry_point = "getIdentity", error = %e, "No token could be created"))
	}

	/// Requests a user access token for the configured merchant.
	pub async fn get_user_access_token(&self) -> UserAccessToken {
		let config = &self.inner.config;
		fetch_user_access_token(
			&self.inner.http_client,
			&config.user_token_url(),
			config.merchant_id(),
			config.client_id.as_deref(),
		)
		.await
	}

	/// Calls an entry point by name.
	///
	/// Each call reaches the activity tracker once. Cart and purchase entry
	/// points forward their own validated input; every other type is
	/// forwarded under its activity name, or as `track` when it has none.
	pub fn track(&self, tracking_type: &str, data: &Value) {
		match tracking_type {
			"addToCart" => return self.add_to_cart(data),
			"removeFromCart" => return self.remove_from_cart(data),
			"setCart" => return self.set_cart(data),
			"purchase" => return self.purchase(data),
			_ => {}
		}

		let activity = ActivityKind::from_name(tracking_type);
		self.inner
			.activity
			.forward(activity.unwrap_or(ActivityKind::Track), data);

		match tracking_type {
			"cancelCart" => self.cancel_cart(),
			"setUser" => self.set_user(data),
			"viewPage" => self.view_page(),
			"setCartId" => match data.as_str().or_else(|| data.get("cartId").and_then(Value::as_str)) {
				Some(cart_id) => self.set_cart_id(cart_id),
				None => warn!(entry_point = "track", tracking_type, "Missing cart id"),
			},
			"setPropertyId" => match data.as_str().or_else(|| data.get("propertyId").and_then(Value::as_str)) {
				Some(property_id) => self.set_property_id(property_id),
				None => warn!(entry_point = "track", tracking_type, "Missing property id"),
			},
			"customEvent" => {
				let event_name = data.get("eventName").and_then(Value::as_str).unwrap_or_default();
				self.custom_event(event_name, data.get("eventData").cloned());
			}
			_ if activity.is_some() => {}
			other => debug!(entry_point = "track", tracking_type = other, "Unknown tracking type"),
		}
	}

	/// Forwards an activity to the activity tracker only.
	pub fn track_activity(&self, kind: ActivityKind, data: &Value) {
		self.inner.activity.forward(kind, data);
	}

	/// Fetches the property now and releases queued events on success.
	pub async fn refresh_property(&self) -> Result<PropertyContext> {
		let property = self.inner.property.refresh().await?;
		self.inner.router.drain();
		Ok(property)
	}

	/// The property id events are attributed to, fetching in the background
	/// when it is missing or expired. A stale id is still returned.
	pub fn property_id(&self) -> Option<String> {
		self.inner
			.property
			.lookup()
			.property_id()
			.map(str::to_string)
	}

	/// The resolved property, without starting a fetch.
	pub fn property(&self) -> Option<PropertyContext> {
		self.inner.property.get_property()
	}

	/// Number of events waiting for the property id.
	pub fn pending_len(&self) -> usize {
		self.inner.router.pending_len()
	}

	pub fn user_ids(&self) -> UserIds {
		self.inner.users.user_ids()
	}

	pub fn cart_id(&self) -> String {
		self.inner.cart.get_or_create_valid_cart_id()
	}

	pub fn currency_code(&self) -> Option<String> {
		self.inner.router.currency_code()
	}

	fn cart_event(&self, kind: CartEventKind, activity: ActivityKind, data: &Value) {
		match normalize_cart(data) {
			Ok(payload) => {
				self.inner.activity.forward(activity, data);
				self.inner.router.submit(TrackingEvent::cart(kind, payload));
			}
			Err(e) => warn!(entry_point = kind.as_str(), error = %e, "Invalid payload, event dropped"),
		}
	}

	fn setup_user_and_cart(&self) {
		let inner = &self.inner;
		inner.cart.get_or_create_valid_cart_id();

		let result = inner.users.shopper_id().and_then(|_| match &inner.config.user {
			Some(user) => inner.users.set_merchant_user(user),
			None => Ok(()),
		});

		if let Err(e) = result {
			warn!(error = %e, "Cart or shopper id unavailable, starting fresh");
			if let Err(e) = inner.cart.create_new_cart_id() {
				warn!(error = %e, "Failed to start a new cart");
			}
			inner.users.regenerate_shopper_id();
		}

		// Kicks off the identity handshake when the cached answer is missing or old.
		inner.users.identity();
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;

	fn builder() -> CommerceTrackerBuilder {
		CommerceTracker::builder()
			.base_url("https://loom.example.com/")
			.page_url("https://shop.example.com/cart")
			.merchant_id("M1")
	}

	#[test]
	fn build_requires_base_and_page_urls() {
		let result = CommerceTracker::builder().page_url("https://shop.example.com").build();
		assert!(matches!(result, Err(TrackerError::InvalidBaseUrl)));

		let result = CommerceTracker::builder().base_url("https://loom.example.com").build();
		assert!(matches!(result, Err(TrackerError::InvalidPageUrl)));
	}

	#[test]
	fn build_rejects_bad_endpoint_override() {
		let result = builder().telemetry_url("::").build();
		assert!(matches!(result, Err(TrackerError::InvalidEndpoint("telemetry"))));
	}

	#[test]
	fn build_rejects_invalid_user() {
		let result = builder().user(json!("abc")).build();
		assert!(matches!(result, Err(TrackerError::Validation(_))));
	}

	#[test]
	fn build_applies_configuration() {
		let tracker = builder()
			.merchant_id("M2")
			.client_id("client-1")
			.currency_code("USD")
			.beacon_url("https://beacons.example.com/t/")
			.cart_ttl(Duration::from_secs(60))
			.debug(true)
			.build()
			.unwrap();

		let config = tracker.config();
		assert_eq!(config.merchant_ids, ["M1", "M2"]);
		assert_eq!(config.merchant_id(), Some("M1"));
		assert_eq!(config.endpoints.beacon, "https://beacons.example.com/t");
		assert_eq!(config.cart_ttl_ms, 60_000);
		assert!(config.debug);
		assert_eq!(tracker.currency_code().as_deref(), Some("USD"));
	}

	#[test]
	fn configured_user_becomes_merchant_provided_id() {
		let tracker = builder().user(json!({ "user": { "id": "abc" } })).build().unwrap();
		let ids = tracker.user_ids();
		assert_eq!(ids.merchant_provided_user_id.as_deref(), Some("abc"));
		assert_ne!(ids.shopper_id, "abc");
	}

	#[test]
	fn invalid_cart_call_is_dropped() {
		let tracker = builder().build().unwrap();
		tracker.add_to_cart(&json!({ "items": [] }));
		tracker.set_cart(&json!("not an object"));
		assert_eq!(tracker.pending_len(), 0);
	}

	#[test]
	fn calls_before_resolution_are_queued() {
		let tracker = builder().build().unwrap();
		tracker.view_page();
		tracker.custom_event("signup", None);
		tracker.custom_event("", None);
		assert_eq!(tracker.pending_len(), 2);
	}

	#[test]
	fn cancel_cart_rotates_cart_id() {
		let tracker = builder().build().unwrap();
		let before = tracker.cart_id();
		tracker.cancel_cart();
		assert_ne!(tracker.cart_id(), before);
	}

	#[test]
	fn track_dispatches_by_name() {
		let tracker = builder().build().unwrap();
		tracker.track("setCartId", &json!("cart-7"));
		assert_eq!(tracker.cart_id(), "cart-7");

		tracker.track("customEvent", &json!({ "eventName": "signup" }));
		assert_eq!(tracker.pending_len(), 1);

		tracker.track("setPropertyId", &json!({ "propertyId": "X" }));
		assert_eq!(tracker.pending_len(), 0);
		assert_eq!(tracker.property().unwrap().property_id, "X");
		assert_eq!(tracker.property_id().as_deref(), Some("X"));
	}

	#[derive(Default)]
	struct RecordingActivity {
		seen: parking_lot::Mutex<Vec<ActivityKind>>,
	}

	impl crate::activity::ActivityTracker for RecordingActivity {
		fn track_activity(&self, kind: ActivityKind, _payload: Value) {
			self.seen.lock().push(kind);
		}
	}

	#[test]
	fn track_reaches_activity_tracker_once() {
		let activity = Arc::new(RecordingActivity::default());
		let tracker = builder().activity_tracker(activity.clone()).build().unwrap();

		tracker.track("search", &json!({ "text": "shoes" }));
		tracker.track(
			"addToCart",
			&json!({ "items": [{ "id": "sku", "quantity": 1, "price": 2.0 }] }),
		);
		tracker.track("customEvent", &json!({ "eventName": "signup" }));
		tracker.track("addToCart", &json!({ "items": [] }));

		assert_eq!(
			activity.seen.lock().as_slice(),
			[ActivityKind::Search, ActivityKind::AddToCart, ActivityKind::Track]
		);
	}
}
