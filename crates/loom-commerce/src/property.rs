// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Property resolution.
//!
//! The property id comes from the merchant's container, fetched by merchant id
//! and page origin and cached for an hour. Lookups never wait on the network:
//!
//! | Cache | Override | Lookup | Fetch |
//! |-------|----------|--------|-------|
//! | fresh | - | `Resolved` | no |
//! | expired | - | `Stale` | yes |
//! | absent or corrupt | - | `Unresolved` | yes |
//! | any | set | `Forced` | as above |
//!
//! Only one background fetch runs at a time. A failed fetch leaves the cache
//! as it was; the next lookup tries again.

use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use loom_commerce_core::records::{is_expired, now_millis};
use loom_commerce_core::{Container, ContainerRecord, ContainerSummary, PropertyContext};
use parking_lot::RwLock;
use reqwest::{Client, Url};
use tracing::{debug, info, warn};

use crate::error::{Result, TrackerError};
use crate::storage::{keys, read_json, write_json, SharedStore};
use crate::task::{spawn_detached, InFlight};

/// Fetches container descriptors.
#[async_trait]
pub trait PropertySource: Send + Sync + 'static {
	async fn fetch_container(&self, merchant_id: &str, origin: &str) -> Result<Container>;
}

/// Type alias for a shared property source.
pub type SharedPropertySource = Arc<dyn PropertySource>;

/// Container service client.
///
/// Issues `GET {url}?mrid=..&url=..&jlAccessToken=true`.
pub struct HttpPropertySource {
	http_client: Client,
	url: Url,
}

impl HttpPropertySource {
	pub fn new(http_client: Client, url: Url) -> Self {
		Self { http_client, url }
	}
}

#[async_trait]
impl PropertySource for HttpPropertySource {
	async fn fetch_container(&self, merchant_id: &str, origin: &str) -> Result<Container> {
		let response = self
			.http_client
			.get(self.url.clone())
			.query(&[
				("mrid", merchant_id),
				("url", origin),
				("jlAccessToken", "true"),
			])
			.send()
			.await?;

		if !response.status().is_success() {
			let status = response.status().as_u16();
			let message = response.text().await.unwrap_or_default();
			return Err(TrackerError::ServerError { status, message });
		}

		Ok(response.json().await?)
	}
}

/// Outcome of a property lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropertyLookup {
	/// Cached and fresh.
	Resolved(PropertyContext),
	/// Cached but expired; a refresh has been started.
	Stale(PropertyContext),
	/// Set explicitly for this session.
	Forced(PropertyContext),
	/// Nothing known yet.
	Unresolved,
}

impl PropertyLookup {
	pub fn context(&self) -> Option<&PropertyContext> {
		match self {
			PropertyLookup::Resolved(ctx) | PropertyLookup::Stale(ctx) | PropertyLookup::Forced(ctx) => {
				Some(ctx)
			}
			PropertyLookup::Unresolved => None,
		}
	}

	pub fn into_context(self) -> Option<PropertyContext> {
		match self {
			PropertyLookup::Resolved(ctx) | PropertyLookup::Stale(ctx) | PropertyLookup::Forced(ctx) => {
				Some(ctx)
			}
			PropertyLookup::Unresolved => None,
		}
	}

	pub fn property_id(&self) -> Option<&str> {
		self.context().map(|ctx| ctx.property_id.as_str())
	}

	pub fn is_resolved(&self) -> bool {
		!matches!(self, PropertyLookup::Unresolved)
	}
}

type ResolvedCallback = Box<dyn Fn() + Send + Sync>;

pub struct PropertyResolver {
	store: SharedStore,
	source: SharedPropertySource,
	merchant_id: Option<String>,
	origin: String,
	ttl_ms: i64,
	forced: RwLock<Option<String>>,
	in_flight: InFlight,
	on_resolved: OnceLock<ResolvedCallback>,
}

impl PropertyResolver {
	pub fn new(
		store: SharedStore,
		source: SharedPropertySource,
		merchant_id: Option<String>,
		origin: String,
		ttl_ms: i64,
	) -> Self {
		Self {
			store,
			source,
			merchant_id,
			origin,
			ttl_ms,
			forced: RwLock::new(None),
			in_flight: InFlight::new(),
			on_resolved: OnceLock::new(),
		}
	}

	/// Registers the hook run after each successful background fetch.
	///
	/// Only the first registration takes effect.
	pub fn on_resolved(&self, callback: impl Fn() + Send + Sync + 'static) {
		if self.on_resolved.set(Box::new(callback)).is_err() {
			warn!("Property resolution hook already registered");
		}
	}

	/// Looks up the property, starting a background fetch when the cache is
	/// expired or absent.
	pub fn lookup(self: &Arc<Self>) -> PropertyLookup {
		let (lookup, needs_refresh) = self.read();
		if needs_refresh {
			self.spawn_refresh();
		}
		lookup
	}

	/// The property events are attributed to. Never starts a fetch.
	pub fn get_property(&self) -> Option<PropertyContext> {
		self.read().0.into_context()
	}

	/// Overrides the property id for the rest of the session.
	pub fn set_property_id(&self, property_id: impl Into<String>) {
		let property_id = property_id.into();
		info!(property_id = %property_id, "Property id set explicitly");
		*self.forced.write() = Some(property_id);
	}

	/// Fetches the container now and caches it.
	///
	/// Does not run the resolution hook; callers that need the queue drained
	/// do that themselves.
	pub async fn refresh(&self) -> Result<PropertyContext> {
		let merchant_id = self
			.merchant_id
			.as_deref()
			.ok_or(TrackerError::MissingMerchantId)?;

		let container = self.source.fetch_container(merchant_id, &self.origin).await?;
		let summary = ContainerSummary::from(container);
		if summary.id.is_empty() {
			return Err(TrackerError::Resolution("container has no id".to_string()));
		}

		let record = ContainerRecord::new(summary);
		write_json(self.store.as_ref(), keys::CONTAINER, &record)?;
		debug!(property_id = %record.container_summary.id, "Property resolved");

		Ok(self
			.context_from(Some(&record))
			.unwrap_or_else(|| to_context(&record)))
	}

	fn spawn_refresh(self: &Arc<Self>) {
		if self.merchant_id.is_none() {
			debug!("No merchant id, property fetch skipped");
			return;
		}
		let Some(guard) = self.in_flight.try_begin() else {
			debug!("Property fetch already in flight");
			return;
		};

		let resolver = Arc::clone(self);
		spawn_detached("property_fetch", async move {
			let result = resolver.refresh().await;
			// Release before the hook so a lookup made from it can fetch again.
			drop(guard);
			match result {
				Ok(_) => {
					if let Some(callback) = resolver.on_resolved.get() {
						callback();
					}
				}
				Err(e) => warn!(error = %e, "Property fetch failed"),
			}
		});
	}

	fn read(&self) -> (PropertyLookup, bool) {
		let record = match read_json::<ContainerRecord>(self.store.as_ref(), keys::CONTAINER) {
			Ok(record) => record.filter(|r| !r.container_summary.id.is_empty()),
			Err(e) => {
				warn!(error = %e, "Discarding unreadable container");
				None
			}
		};

		let stale = record
			.as_ref()
			.map_or(true, |r| is_expired(r.created_at, self.ttl_ms, now_millis()));

		let forced = self.forced.read().is_some();
		let lookup = match (forced, self.context_from(record.as_ref())) {
			(true, Some(ctx)) => PropertyLookup::Forced(ctx),
			(false, Some(ctx)) if stale => PropertyLookup::Stale(ctx),
			(false, Some(ctx)) => PropertyLookup::Resolved(ctx),
			(_, None) => PropertyLookup::Unresolved,
		};
		(lookup, stale)
	}

	fn context_from(&self, record: Option<&ContainerRecord>) -> Option<PropertyContext> {
		let forced = self.forced.read().clone();
		match (forced, record) {
			(Some(property_id), Some(record)) => Some(PropertyContext {
				property_id,
				..to_context(record)
			}),
			(Some(property_id), None) => Some(PropertyContext {
				property_id,
				program_id: None,
				created_at: Utc::now(),
			}),
			(None, Some(record)) => Some(to_context(record)),
			(None, None) => None,
		}
	}
}

fn to_context(record: &ContainerRecord) -> PropertyContext {
	PropertyContext {
		property_id: record.container_summary.id.clone(),
		program_id: record.container_summary.program_id.clone(),
		created_at: DateTime::<Utc>::from_timestamp_millis(record.created_at).unwrap_or_else(Utc::now),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::sync::atomic::{AtomicUsize, Ordering};

	use loom_commerce_core::records::ONE_HOUR_MS;
	use serde_json::json;
	use wiremock::matchers::{method, path, query_param};
	use wiremock::{Mock, MockServer, ResponseTemplate};

	use crate::storage::{KeyValueStore, MemoryStore};

	struct Counting {
		calls: AtomicUsize,
		container: Option<Container>,
	}

	#[async_trait]
	impl PropertySource for Counting {
		async fn fetch_container(&self, _merchant_id: &str, _origin: &str) -> Result<Container> {
			self.calls.fetch_add(1, Ordering::SeqCst);
			self.container
				.clone()
				.ok_or_else(|| TrackerError::Resolution("unavailable".to_string()))
		}
	}

	fn container(id: &str) -> Container {
		serde_json::from_value(json!({
			"id": id,
			"integration_type": "sdk",
			"owner_id": "M1",
			"tags": [
				{ "tag_definition_id": "offers", "configuration": [
					{ "id": "offer-program-id", "value": "prog-1" }
				]}
			]
		}))
		.unwrap()
	}

	fn resolver(
		store: Arc<MemoryStore>,
		container: Option<Container>,
	) -> (Arc<Counting>, Arc<PropertyResolver>) {
		let source = Arc::new(Counting {
			calls: AtomicUsize::new(0),
			container,
		});
		let resolver = Arc::new(PropertyResolver::new(
			store,
			source.clone(),
			Some("M1".to_string()),
			"https://shop.example.com".to_string(),
			ONE_HOUR_MS,
		));
		(source, resolver)
	}

	fn seed(store: &MemoryStore, id: &str, age_ms: i64) {
		let record = ContainerRecord {
			container_summary: ContainerSummary::from(container(id)),
			created_at: now_millis() - age_ms,
		};
		write_json(store, keys::CONTAINER, &record).unwrap();
	}

	#[test]
	fn fresh_cache_resolves_without_fetch() {
		let store = Arc::new(MemoryStore::new());
		seed(&store, "prop-1", 0);
		let (_, resolver) = resolver(store, None);

		let lookup = resolver.lookup();
		assert!(matches!(lookup, PropertyLookup::Resolved(_)));
		assert_eq!(lookup.property_id(), Some("prop-1"));
		assert_eq!(
			lookup.context().and_then(|c| c.program_id.as_deref()),
			Some("prog-1")
		);
		assert!(!resolver.in_flight.is_busy());
	}

	#[test]
	fn override_wins_even_without_cache() {
		let (_, resolver) = resolver(Arc::new(MemoryStore::new()), None);
		assert_eq!(resolver.get_property(), None);

		resolver.set_property_id("X");
		let property = resolver.get_property().unwrap();
		assert_eq!(property.property_id, "X");
		assert!(!property.has_program());
	}

	#[test]
	fn override_keeps_cached_program() {
		let store = Arc::new(MemoryStore::new());
		seed(&store, "prop-1", 0);
		let (_, resolver) = resolver(store, None);

		resolver.set_property_id("X");
		let lookup = resolver.lookup();
		assert!(matches!(lookup, PropertyLookup::Forced(_)));
		let ctx = lookup.into_context().unwrap();
		assert_eq!(ctx.property_id, "X");
		assert_eq!(ctx.program_id.as_deref(), Some("prog-1"));
	}

	#[tokio::test]
	async fn stale_cache_is_served_and_fetched_once() {
		let store = Arc::new(MemoryStore::new());
		seed(&store, "old", 2 * ONE_HOUR_MS);
		let (source, resolver) = resolver(store, Some(container("new")));

		assert!(matches!(resolver.lookup(), PropertyLookup::Stale(_)));
		assert!(matches!(resolver.lookup(), PropertyLookup::Stale(_)));

		while resolver.in_flight.is_busy() {
			tokio::task::yield_now().await;
		}
		assert_eq!(source.calls.load(Ordering::SeqCst), 1);
		let lookup = resolver.lookup();
		assert!(matches!(lookup, PropertyLookup::Resolved(_)));
		assert_eq!(lookup.property_id(), Some("new"));
	}

	#[tokio::test]
	async fn absent_cache_fetches_and_runs_hook() {
		let store = Arc::new(MemoryStore::new());
		let (_, resolver) = resolver(store, Some(container("prop-9")));
		let (tx, rx) = tokio::sync::oneshot::channel();
		let tx = parking_lot::Mutex::new(Some(tx));
		resolver.on_resolved(move || {
			if let Some(tx) = tx.lock().take() {
				let _ = tx.send(());
			}
		});

		assert_eq!(resolver.lookup(), PropertyLookup::Unresolved);
		rx.await.unwrap();
		assert_eq!(resolver.get_property().unwrap().property_id, "prop-9");
	}

	#[tokio::test]
	async fn failed_fetch_keeps_cache() {
		let store = Arc::new(MemoryStore::new());
		seed(&store, "old", 2 * ONE_HOUR_MS);
		let (_, resolver) = resolver(store, None);

		assert!(resolver.refresh().await.is_err());
		assert_eq!(resolver.get_property().unwrap().property_id, "old");
	}

	#[tokio::test]
	async fn empty_container_id_is_a_failure() {
		let store = Arc::new(MemoryStore::new());
		let (_, resolver) = resolver(store.clone(), Some(container("")));

		let result = resolver.refresh().await;
		assert!(matches!(result, Err(TrackerError::Resolution(_))));
		assert!(store.get(keys::CONTAINER).is_none());
	}

	#[tokio::test]
	async fn missing_merchant_id_fails_fetch() {
		let resolver = PropertyResolver::new(
			Arc::new(MemoryStore::new()),
			Arc::new(Counting {
				calls: AtomicUsize::new(0),
				container: Some(container("p")),
			}),
			None,
			"https://shop.example.com".to_string(),
			ONE_HOUR_MS,
		);
		assert!(matches!(
			resolver.refresh().await,
			Err(TrackerError::MissingMerchantId)
		));
	}

	#[tokio::test]
	async fn lookup_without_merchant_id_spawns_nothing() {
		let source = Arc::new(Counting {
			calls: AtomicUsize::new(0),
			container: Some(container("p")),
		});
		let resolver = Arc::new(PropertyResolver::new(
			Arc::new(MemoryStore::new()),
			source.clone(),
			None,
			"https://shop.example.com".to_string(),
			ONE_HOUR_MS,
		));

		assert_eq!(resolver.lookup(), PropertyLookup::Unresolved);
		assert!(!resolver.in_flight.is_busy());
		tokio::time::sleep(std::time::Duration::from_millis(20)).await;
		assert_eq!(resolver.lookup(), PropertyLookup::Unresolved);
		assert_eq!(source.calls.load(Ordering::SeqCst), 0);
	}

	#[test]
	fn corrupt_cache_is_unresolved() {
		let store = Arc::new(MemoryStore::new());
		store.set(keys::CONTAINER, "{".to_string()).unwrap();
		let (_, resolver) = resolver(store, None);
		assert_eq!(resolver.get_property(), None);
	}

	#[tokio::test]
	async fn http_source_sends_merchant_and_origin() {
		let server = MockServer::start().await;
		Mock::given(method("GET"))
			.and(path("/api/commerce/containers"))
			.and(query_param("mrid", "M1"))
			.and(query_param("url", "https://shop.example.com"))
			.and(query_param("jlAccessToken", "true"))
			.respond_with(ResponseTemplate::new(200).set_body_json(json!({
				"id": "prop-1",
				"integration_type": "sdk",
				"owner_id": "M1",
				"tags": [],
				"jlAccessToken": "jl"
			})))
			.expect(1)
			.mount(&server)
			.await;

		let url = Url::parse(&format!("{}/api/commerce/containers", server.uri())).unwrap();
		let source = HttpPropertySource::new(Client::new(), url);
		let container = source
			.fetch_container("M1", "https://shop.example.com")
			.await
			.unwrap();

		assert_eq!(container.id, "prop-1");
		assert_eq!(container.jl_access_token.as_deref(), Some("jl"));
	}

	#[tokio::test]
	async fn http_source_maps_error_status() {
		let server = MockServer::start().await;
		Mock::given(method("GET"))
			.respond_with(ResponseTemplate::new(404).set_body_string("no container"))
			.mount(&server)
			.await;

		let url = Url::parse(&server.uri()).unwrap();
		let source = HttpPropertySource::new(Client::new(), url);
		let result = source.fetch_container("M1", "https://shop.example.com").await;

		assert!(matches!(
			result,
			Err(TrackerError::ServerError { status: 404, ref message }) if message == "no container"
		));
	}
}
