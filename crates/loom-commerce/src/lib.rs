// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Rust SDK for Loom commerce tracking.
//!
//! This crate records shopper commerce activity (cart changes, purchases,
//! page views and custom events) and reports it to the Loom telemetry and
//! tracking endpoints, attributed to the merchant's property.
//!
//! # Overview
//!
//! - Tracking calls are synchronous and never fail; invalid input is logged
//!   and dropped
//! - Events wait in memory until the property id is resolved, then go out
//!   once each, in order
//! - The cart id, shopper id, property and verified identity are cached in a
//!   pluggable [`KeyValueStore`] with per-record expiry
//! - Background work (property fetch, identity handshake, beacons) runs on
//!   the ambient tokio runtime
//!
//! # Example
//!
//! ```ignore
//! use loom_commerce::CommerceTracker;
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), loom_commerce::TrackerError> {
//!     let tracker = CommerceTracker::builder()
//!         .base_url("https://loom.ghuntley.com")
//!         .page_url("https://shop.example.com/checkout")
//!         .merchant_id("MERCHANT1")
//!         .currency_code("USD")
//!         .build()?;
//!
//!     tracker.add_to_cart(&json!({
//!         "items": [{ "id": "sku-1", "quantity": 2, "price": 10.0 }]
//!     }));
//!     tracker.purchase(&json!({
//!         "items": [{ "id": "sku-1", "quantity": 2, "price": 10.0 }],
//!         "total": 20.0
//!     }));
//!
//!     Ok(())
//! }
//! ```

pub mod activity;
pub mod beacon;
pub mod cart;
pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod legacy;
pub mod property;
pub mod storage;
pub mod token;
pub mod user;

mod queue;
mod router;
mod task;

pub use activity::{
	activity_payload, ActivityKind, ActivitySink, ActivityTracker, NoOpActivityTracker,
	SharedActivityTracker,
};
pub use beacon::{BeaconTransport, EventContext, HttpBeaconTransport, SharedBeaconTransport};
pub use client::{CommerceTracker, CommerceTrackerBuilder};
pub use config::{BeaconUrlBuilder, Endpoints, TokenUrlBuilder, TrackerConfig};
pub use error::{Result, TrackerError};
pub use http::{SDK_NAME, SDK_VERSION};
pub use legacy::LegacyEvent;
pub use property::{
	HttpPropertySource, PropertyLookup, PropertyResolver, PropertySource, SharedPropertySource,
};
pub use storage::{KeyValueStore, MemoryStore, SharedStore, StorageError};
pub use token::UserAccessToken;
pub use user::{IdentityProvider, SharedIdentityProvider};

// Re-export core types for convenience
pub use loom_commerce_core::{
	CartEventKind, Container, DeviceInfo, EventKind, IdentityOutcome, IdentityRequest,
	PropertyContext, TrackingEvent, UserData, UserIds, ValidationError, VerifiedIdentity,
};
