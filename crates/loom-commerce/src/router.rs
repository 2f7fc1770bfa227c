// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Event routing.
//!
//! The router decides whether an event goes out now or waits for the property
//! id, and fans dispatched events out to the sinks:
//!
//! | Event | Legacy beacon (program active) | Primary sink |
//! |-------|--------------------------------|--------------|
//! | view, custom `analytics-init` | connection started | telemetry |
//! | view, custom `analytics-cancel` | merchant user cancel | telemetry |
//! | other view, custom | - | telemetry |
//! | purchase | purchase | tracking |
//! | cart, cancel | - | tracking |
//!
//! Events only wait while the property is unresolved. Waiting events are
//! replayed in arrival order by [`Router::drain`]; anything submitted while a
//! drain runs is queued behind them, so each event is dispatched once and in
//! order.

use std::sync::Arc;

use loom_commerce_core::{EventKind, PropertyContext, TrackingEvent};
use parking_lot::{Mutex, RwLock};
use tracing::{debug, warn};

use crate::beacon::{EventContext, Sinks};
use crate::cart::CartState;
use crate::legacy::LegacyEvent;
use crate::property::PropertyResolver;
use crate::queue::PendingEventQueue;
use crate::user::UserManager;

#[derive(Debug, Default)]
struct RouterState {
	queue: PendingEventQueue,
	draining: bool,
}

pub struct Router {
	state: Mutex<RouterState>,
	property: Arc<PropertyResolver>,
	cart: CartState,
	users: UserManager,
	currency_code: RwLock<Option<String>>,
	sinks: Sinks,
}

impl Router {
	pub fn new(
		property: Arc<PropertyResolver>,
		cart: CartState,
		users: UserManager,
		currency_code: Option<String>,
		sinks: Sinks,
	) -> Self {
		Self {
			state: Mutex::new(RouterState::default()),
			property,
			cart,
			users,
			currency_code: RwLock::new(currency_code),
			sinks,
		}
	}

	/// Routes a normalized event.
	///
	/// A cart id or currency declared on the event takes effect immediately,
	/// even if the event itself has to wait.
	pub fn submit(&self, event: TrackingEvent) {
		self.apply_declarations(&event);

		let property = {
			let mut state = self.state.lock();
			if state.draining {
				debug!(tracking_type = event.tracking_type(), "Queued behind drain");
				state.queue.push(event);
				return;
			}

			match self.property.lookup().into_context() {
				None => {
					state.queue.push(event);
					debug!(pending = state.queue.len(), "Property unresolved, event queued");
					return;
				}
				Some(_) if !state.queue.is_empty() => {
					// Older events are still waiting; keep arrival order.
					state.queue.push(event);
					drop(state);
					self.drain();
					return;
				}
				Some(property) => property,
			}
		};

		self.dispatch(&event, &property);
	}

	/// Replays every queued event in arrival order.
	///
	/// Does nothing while the property is unresolved. Safe to call from a
	/// sink or concurrently with another drain.
	pub fn drain(&self) {
		let mut state = self.state.lock();
		if state.draining {
			return;
		}
		state.draining = true;

		loop {
			if state.queue.is_empty() {
				break;
			}
			let Some(property) = self.property.lookup().into_context() else {
				debug!(pending = state.queue.len(), "Drain deferred, property unresolved");
				break;
			};

			let batch = state.queue.take_all();
			debug!(count = batch.len(), property_id = %property.property_id, "Draining queued events");
			drop(state);

			for event in &batch {
				self.dispatch(event, &property);
			}

			state = self.state.lock();
		}

		state.draining = false;
	}

	/// Number of events waiting for the property id.
	pub fn pending_len(&self) -> usize {
		self.state.lock().queue.len()
	}

	pub fn currency_code(&self) -> Option<String> {
		self.currency_code.read().clone()
	}

	fn apply_declarations(&self, event: &TrackingEvent) {
		if let Some(cart_id) = event.payload.declared_cart_id() {
			if let Err(e) = self.cart.set_cart_id(cart_id) {
				warn!(error = %e, "Failed to persist declared cart id");
			}
		}
		if let Some(currency) = event.payload.declared_currency() {
			*self.currency_code.write() = Some(currency.to_string());
		}
	}

	fn dispatch(&self, event: &TrackingEvent, property: &PropertyContext) {
		let ctx = self.context(event, property);

		match event.kind {
			EventKind::View | EventKind::Custom => {
				if property.has_program() {
					if let Some(legacy) = event.payload.event_name().and_then(LegacyEvent::for_event_name) {
						self.sinks.legacy(legacy, property);
					}
				}
				self.sinks.telemetry(event, &ctx);
			}
			EventKind::Purchase => {
				if property.has_program() {
					self.sinks.legacy(LegacyEvent::Purchase, property);
				}
				self.sinks.track(event, &ctx);
			}
			EventKind::Cart(_) => self.sinks.track(event, &ctx),
		}

		debug!(
			tracking_type = event.tracking_type(),
			property_id = %property.property_id,
			"Event dispatched"
		);
	}

	fn context(&self, event: &TrackingEvent, property: &PropertyContext) -> EventContext {
		let cart_id = match event.payload.reported_cart_id() {
			Some(cart_id) => cart_id.to_string(),
			None => self.cart.get_or_create_valid_cart_id(),
		};
		let (user, identity) = self.users.snapshot();

		EventContext {
			property: property.clone(),
			cart_id,
			currency_code: self.currency_code(),
			user,
			identity,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::time::Duration;

	use async_trait::async_trait;
	use loom_commerce_core::records::{CART_TTL_MS, ONE_HOUR_MS};
	use proptest::prelude::*;
	use loom_commerce_core::{
		CartEventKind, CartItem, CartPayload, Container, CustomEventPayload, IdentityRequest,
	};
	use reqwest::Url;
	use serde_json::{json, Map};

	use crate::beacon::{BeaconSettings, BeaconTransport};
	use crate::error::{Result, TrackerError};
	use crate::property::PropertySource;
	use crate::storage::MemoryStore;

	#[derive(Default)]
	struct Recording {
		urls: Mutex<Vec<String>>,
	}

	impl BeaconTransport for Recording {
		fn fire(&self, url: String) {
			self.urls.lock().push(url);
		}
	}

	struct Offline;

	#[async_trait]
	impl PropertySource for Offline {
		async fn fetch_container(&self, _merchant_id: &str, _origin: &str) -> Result<Container> {
			Err(TrackerError::Resolution("offline".to_string()))
		}
	}

	fn router() -> (Arc<Recording>, Arc<PropertyResolver>, Router) {
		let store = Arc::new(MemoryStore::new());
		let property = Arc::new(PropertyResolver::new(
			store.clone(),
			Arc::new(Offline),
			Some("M1".to_string()),
			"https://shop.example.com".to_string(),
			ONE_HOUR_MS,
		));
		let users = UserManager::new(
			store.clone(),
			None,
			IdentityRequest {
				device_info: json!({}),
				country: "US".to_string(),
				query_host: "https://shop.example.com".to_string(),
			},
			ONE_HOUR_MS,
			Duration::from_secs(10),
		);
		let transport = Arc::new(Recording::default());
		let settings = BeaconSettings {
			telemetry_url: Url::parse("https://loom.example.com/api/commerce/ts").unwrap(),
			beacon_base: "https://loom.example.com/api/commerce/track".to_string(),
			merchant_ids: vec!["M1".to_string()],
			client_id: None,
			partner_attribution_id: None,
			device_info: Default::default(),
			url_builder: None,
			debug: false,
		};
		let router = Router::new(
			property.clone(),
			CartState::new(store, CART_TTL_MS),
			users,
			None,
			Sinks::new(transport.clone(), settings),
		);
		(transport, property, router)
	}

	fn add(cart_id: Option<&str>, currency: Option<&str>) -> TrackingEvent {
		TrackingEvent::cart(
			CartEventKind::Add,
			CartPayload {
				items: vec![CartItem {
					id: "sku".to_string(),
					quantity: 1,
					price: 1.0,
					attributes: Map::new(),
				}],
				cart_id: cart_id.map(str::to_string),
				currency_code: currency.map(str::to_string),
				total: None,
			},
		)
	}

	fn custom(name: &str) -> TrackingEvent {
		TrackingEvent::custom(CustomEventPayload {
			event_name: name.to_string(),
			event_data: None,
		})
	}

	#[test]
	fn unresolved_events_wait() {
		let (transport, _, router) = router();
		router.submit(add(None, None));
		router.submit(custom("a"));

		assert_eq!(router.pending_len(), 2);
		assert!(transport.urls.lock().is_empty());
	}

	#[test]
	fn declarations_apply_while_queued() {
		let (_, _, router) = router();
		router.submit(add(Some("merchant-cart"), Some("GBP")));

		assert_eq!(router.pending_len(), 1);
		assert_eq!(router.cart.get_or_create_valid_cart_id(), "merchant-cart");
		assert_eq!(router.currency_code().as_deref(), Some("GBP"));
	}

	#[test]
	fn drain_replays_in_order_once() {
		let (transport, property, router) = router();
		router.submit(custom("first"));
		router.submit(add(None, None));
		router.submit(custom("third"));

		property.set_property_id("X");
		router.drain();
		router.drain();

		let urls = transport.urls.lock();
		assert_eq!(urls.len(), 3);
		assert!(urls[0].contains("event_name=first"));
		assert!(urls[1].contains("/track/cartEvent?"));
		assert!(urls[2].contains("event_name=third"));
		assert!(urls.iter().all(|u| u.contains("item=X") || u.contains("/track/")));
		assert_eq!(router.pending_len(), 0);
	}

	#[test]
	fn drain_without_property_keeps_queue() {
		let (transport, _, router) = router();
		router.submit(custom("a"));
		router.drain();

		assert_eq!(router.pending_len(), 1);
		assert!(transport.urls.lock().is_empty());
	}

	#[test]
	fn resolved_property_dispatches_directly() {
		let (transport, property, router) = router();
		property.set_property_id("X");
		router.submit(custom("now"));

		assert_eq!(router.pending_len(), 0);
		assert_eq!(transport.urls.lock().len(), 1);
	}

	#[test]
	fn legacy_beacons_need_a_program() {
		let (transport, property, router) = router();
		property.set_property_id("X");

		router.submit(custom("analytics-init"));
		let urls = transport.urls.lock();
		assert_eq!(urls.len(), 1);
		assert!(!urls[0].contains("es=connectionStarted"));
	}

	proptest! {
		#[test]
		fn drain_preserves_arrival_order(
			names in proptest::collection::vec("[a-z]{1,8}", 1..20),
			resolve_at in 0usize..20,
		) {
			let (transport, property, router) = router();
			for (index, name) in names.iter().enumerate() {
				if index == resolve_at {
					property.set_property_id("X");
					router.drain();
				}
				router.submit(custom(name));
			}
			property.set_property_id("X");
			router.drain();

			let urls = transport.urls.lock();
			prop_assert_eq!(urls.len(), names.len());
			for (url, name) in urls.iter().zip(&names) {
				let expected = format!("event_name={name}&");
				prop_assert!(url.contains(&expected));
			}
			prop_assert_eq!(router.pending_len(), 0);
		}
	}
}
