// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Shopper identity resolution.
//!
//! The generated shopper id is created once and never replaced. A verified
//! identity from the identity service is cached for an hour; once expired the
//! cached answer is still used while a single background handshake refreshes
//! it. A merchant-provided id is stored alongside and only ever reported as an
//! extra attribute.
//!
//! # Implementing an identity provider
//!
//! ```ignore
//! use async_trait::async_trait;
//! use loom_commerce::{IdentityOutcome, IdentityProvider, IdentityRequest};
//!
//! struct Handshake;
//!
//! #[async_trait]
//! impl IdentityProvider for Handshake {
//!     async fn confirm_identity(&self, request: &IdentityRequest) -> IdentityOutcome {
//!         IdentityOutcome::Unconfirmed
//!     }
//! }
//! ```

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use loom_commerce_core::records::{generate_id, is_expired, now_millis};
use loom_commerce_core::{
	CachedIdentity, IdentityOutcome, IdentityRecord, IdentityRequest, UserData, UserIds,
	UserRecord, VerifiedIdentity,
};
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::storage::{keys, read_json, write_json, SharedStore};
use crate::task::{spawn_detached, InFlight};

/// The cross-origin identity handshake.
///
/// Implementations should not apply their own timeout; the caller bounds each
/// handshake and maps an overrun to [`IdentityOutcome::TimedOut`].
#[async_trait]
pub trait IdentityProvider: Send + Sync + 'static {
	async fn confirm_identity(&self, request: &IdentityRequest) -> IdentityOutcome;
}

/// Type alias for a shared identity provider.
pub type SharedIdentityProvider = Arc<dyn IdentityProvider>;

#[derive(Clone)]
pub struct UserManager {
	store: SharedStore,
	provider: Option<SharedIdentityProvider>,
	request: IdentityRequest,
	identity_ttl_ms: i64,
	identity_timeout: Duration,
	in_flight: InFlight,
}

impl UserManager {
	pub fn new(
		store: SharedStore,
		provider: Option<SharedIdentityProvider>,
		request: IdentityRequest,
		identity_ttl_ms: i64,
		identity_timeout: Duration,
	) -> Self {
		Self {
			store,
			provider,
			request,
			identity_ttl_ms,
			identity_timeout,
			in_flight: InFlight::new(),
		}
	}

	/// Returns the generated shopper id, creating and persisting it if absent.
	pub fn shopper_id(&self) -> Result<String> {
		let mut record = self.read_user();
		if let Some(id) = record.user_id.clone() {
			return Ok(id);
		}

		let id = generate_id();
		record.user_id = Some(id.clone());
		write_json(self.store.as_ref(), keys::USER, &record)?;
		debug!(shopper_id = %id, "Generated shopper id");
		Ok(id)
	}

	/// Replaces the generated shopper id with a fresh one.
	///
	/// Only used to recover from unusable storage at startup.
	pub fn regenerate_shopper_id(&self) -> String {
		let id = generate_id();
		let record = UserRecord {
			user_id: Some(id.clone()),
			merchant_provided_user_id: self.read_user().merchant_provided_user_id,
		};
		if let Err(e) = write_json(self.store.as_ref(), keys::USER, &record) {
			warn!(error = %e, "Failed to persist regenerated shopper id");
		}
		id
	}

	/// Stores the merchant's own id for the shopper.
	///
	/// The generated shopper id is kept as is. A user without an id leaves the
	/// stored merchant id untouched.
	pub fn set_merchant_user(&self, user: &UserData) -> Result<()> {
		let Some(merchant_id) = user.id.as_deref().filter(|id| !id.is_empty()) else {
			return Ok(());
		};

		let mut record = self.read_user();
		if record.user_id.is_none() {
			record.user_id = Some(generate_id());
		}
		record.merchant_provided_user_id = Some(merchant_id.to_string());
		write_json(self.store.as_ref(), keys::USER, &record)?;
		Ok(())
	}

	/// Returns the cached verified identity, refreshing it in the background
	/// when it is missing, unreadable or expired.
	pub fn identity(&self) -> Option<VerifiedIdentity> {
		match read_json::<IdentityRecord>(self.store.as_ref(), keys::IDENTITY) {
			Ok(Some(record)) => {
				if is_expired(record.created_at, self.identity_ttl_ms, now_millis()) {
					self.refresh_identity();
				}
				record.identity.identity().cloned()
			}
			Ok(None) => {
				self.refresh_identity();
				None
			}
			Err(e) => {
				warn!(error = %e, "Discarding unreadable identity");
				self.refresh_identity();
				None
			}
		}
	}

	/// All ids known for the shopper, along with the verified identity behind
	/// `verified_id`.
	pub fn snapshot(&self) -> (UserIds, Option<VerifiedIdentity>) {
		let shopper_id = self.shopper_id().unwrap_or_else(|e| {
			warn!(error = %e, "Failed to persist shopper id");
			self.read_user().user_id.unwrap_or_default()
		});
		let identity = self.identity().filter(VerifiedIdentity::is_verified);
		let ids = UserIds {
			shopper_id,
			verified_id: identity
				.as_ref()
				.map(|identity| identity.encrypted_account_number.clone()),
			merchant_provided_user_id: self.read_user().merchant_provided_user_id,
		};
		(ids, identity)
	}

	pub fn user_ids(&self) -> UserIds {
		self.snapshot().0
	}

	/// Starts a background handshake unless one is already running or no
	/// provider is configured.
	pub fn refresh_identity(&self) {
		if self.provider.is_none() {
			return;
		}
		let Some(guard) = self.in_flight.try_begin() else {
			debug!("Identity handshake already in flight");
			return;
		};

		let manager = self.clone();
		spawn_detached("identity_handshake", async move {
			let _guard = guard;
			manager.confirm_identity().await;
		});
	}

	/// Runs one handshake and records its outcome.
	///
	/// Returns `None` when no provider is configured.
	pub async fn confirm_identity(&self) -> Option<IdentityOutcome> {
		let provider = self.provider.as_ref()?;
		let handshake = provider.confirm_identity(&self.request);
		let outcome = tokio::time::timeout(self.identity_timeout, handshake)
			.await
			.unwrap_or(IdentityOutcome::TimedOut);

		self.record_outcome(&outcome);
		Some(outcome)
	}

	fn record_outcome(&self, outcome: &IdentityOutcome) {
		let cached = match outcome {
			IdentityOutcome::Confirmed(identity) if identity.is_verified() => {
				info!("Shopper identity confirmed");
				CachedIdentity::Known(identity.clone())
			}
			IdentityOutcome::Confirmed(identity) => {
				debug!(
					confidence_score = identity.confidence_score,
					"Identity below confidence threshold"
				);
				CachedIdentity::unknown()
			}
			IdentityOutcome::Unconfirmed => CachedIdentity::unknown(),
			IdentityOutcome::TimedOut => {
				warn!(timeout = ?self.identity_timeout, "Identity handshake timed out");
				return;
			}
		};

		// A negative answer is stored too so the service is not asked again
		// until it expires.
		if let Err(e) = write_json(self.store.as_ref(), keys::IDENTITY, &IdentityRecord::new(cached)) {
			warn!(error = %e, "Failed to persist identity");
		}
	}

	fn read_user(&self) -> UserRecord {
		read_json::<UserRecord>(self.store.as_ref(), keys::USER)
			.unwrap_or_else(|e| {
				warn!(error = %e, "Discarding unreadable user record");
				None
			})
			.unwrap_or_default()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::sync::atomic::{AtomicUsize, Ordering};

	use loom_commerce_core::records::ONE_HOUR_MS;
	use serde_json::json;

	use crate::storage::{KeyValueStore, MemoryStore};

	struct Fixed {
		outcome: IdentityOutcome,
		calls: AtomicUsize,
	}

	#[async_trait]
	impl IdentityProvider for Fixed {
		async fn confirm_identity(&self, _request: &IdentityRequest) -> IdentityOutcome {
			self.calls.fetch_add(1, Ordering::SeqCst);
			self.outcome.clone()
		}
	}

	struct Silent;

	#[async_trait]
	impl IdentityProvider for Silent {
		async fn confirm_identity(&self, _request: &IdentityRequest) -> IdentityOutcome {
			std::future::pending().await
		}
	}

	fn request() -> IdentityRequest {
		IdentityRequest {
			device_info: json!({}),
			country: "US".to_string(),
			query_host: "https://identity.example.com".to_string(),
		}
	}

	fn identity(score: u32) -> VerifiedIdentity {
		VerifiedIdentity {
			encrypted_account_number: "EAN-1".to_string(),
			confidence_score: score,
			identification_type: Some("cookie".to_string()),
		}
	}

	fn manager(
		store: Arc<MemoryStore>,
		provider: Option<SharedIdentityProvider>,
	) -> UserManager {
		UserManager::new(
			store,
			provider,
			request(),
			ONE_HOUR_MS,
			Duration::from_secs(10),
		)
	}

	fn fixed(outcome: IdentityOutcome) -> Arc<Fixed> {
		Arc::new(Fixed {
			outcome,
			calls: AtomicUsize::new(0),
		})
	}

	#[test]
	fn shopper_id_is_stable() {
		let users = manager(Arc::new(MemoryStore::new()), None);
		let first = users.shopper_id().unwrap();
		assert_eq!(users.shopper_id().unwrap(), first);
	}

	#[test]
	fn merchant_user_keeps_generated_id() {
		let store = Arc::new(MemoryStore::new());
		let users = manager(store.clone(), None);
		let shopper = users.shopper_id().unwrap();

		users
			.set_merchant_user(&UserData {
				id: Some("abc".to_string()),
				..Default::default()
			})
			.unwrap();

		let record: UserRecord = read_json(store.as_ref(), keys::USER).unwrap().unwrap();
		assert_eq!(record.user_id.as_deref(), Some(shopper.as_str()));
		assert_eq!(record.merchant_provided_user_id.as_deref(), Some("abc"));
	}

	#[test]
	fn merchant_user_without_id_is_ignored() {
		let store = Arc::new(MemoryStore::new());
		let users = manager(store.clone(), None);
		users.set_merchant_user(&UserData::default()).unwrap();
		assert!(store.get(keys::USER).is_none());
	}

	#[tokio::test]
	async fn confirmed_identity_is_cached() {
		let store = Arc::new(MemoryStore::new());
		let provider = fixed(IdentityOutcome::Confirmed(identity(100)));
		let users = manager(store.clone(), Some(provider.clone()));

		let outcome = users.confirm_identity().await;
		assert!(matches!(outcome, Some(IdentityOutcome::Confirmed(_))));

		let (ids, verified) = users.snapshot();
		assert_eq!(ids.verified_id.as_deref(), Some("EAN-1"));
		assert_eq!(verified.unwrap().identification_type.as_deref(), Some("cookie"));
		assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
	}

	#[tokio::test]
	async fn low_confidence_is_stored_as_unknown() {
		let store = Arc::new(MemoryStore::new());
		let users = manager(store.clone(), Some(fixed(IdentityOutcome::Confirmed(identity(99)))));

		users.confirm_identity().await;

		let record: IdentityRecord = read_json(store.as_ref(), keys::IDENTITY).unwrap().unwrap();
		assert_eq!(record.identity, CachedIdentity::unknown());
		assert_eq!(users.user_ids().verified_id, None);
	}

	#[tokio::test(start_paused = true)]
	async fn timeout_stores_nothing() {
		let store = Arc::new(MemoryStore::new());
		let users = manager(store.clone(), Some(Arc::new(Silent)));

		let outcome = users.confirm_identity().await;
		assert_eq!(outcome, Some(IdentityOutcome::TimedOut));
		assert!(store.get(keys::IDENTITY).is_none());
	}

	#[tokio::test]
	async fn no_provider_means_no_handshake() {
		let users = manager(Arc::new(MemoryStore::new()), None);
		assert_eq!(users.confirm_identity().await, None);
		assert_eq!(users.identity(), None);
	}

	#[tokio::test]
	async fn expired_identity_is_returned_and_refreshed_once() {
		let store = Arc::new(MemoryStore::new());
		let stale = IdentityRecord {
			identity: CachedIdentity::Known(identity(100)),
			created_at: now_millis() - 2 * ONE_HOUR_MS,
		};
		write_json(store.as_ref(), keys::IDENTITY, &stale).unwrap();

		let provider = fixed(IdentityOutcome::Unconfirmed);
		let users = manager(store.clone(), Some(provider.clone()));

		assert_eq!(users.identity(), Some(identity(100)));
		assert_eq!(users.identity(), Some(identity(100)));

		while users.in_flight.is_busy() {
			tokio::task::yield_now().await;
		}
		assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
		assert_eq!(users.identity(), None);
	}
}
