// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Core types for Loom commerce tracking.
//!
//! This crate holds the pure parts of the commerce tracker: the canonical
//! event model, payload normalization and validation, container parsing,
//! shopper identity types and the shapes of persisted state. It performs no
//! I/O; the `loom-commerce` SDK builds on it.

pub mod container;
pub mod device;
pub mod error;
pub mod event;
pub mod identity;
pub mod normalize;
pub mod records;

pub use container::{Container, ContainerSummary, ContainerTag, PropertyContext, TagConfiguration};
pub use device::DeviceInfo;
pub use error::{Result, ValidationError};
pub use event::{
	CartEventKind, CartItem, CartPayload, CustomEventPayload, EventKind, EventPayload,
	PurchasePayload, TrackingEvent, UserData, ViewPayload,
};
pub use identity::{
	IdentityOutcome, IdentityRequest, IdentitySource, UserIds, VerifiedIdentity,
	VERIFIED_CONFIDENCE_SCORE,
};
pub use normalize::{normalize_cart, normalize_custom_event, normalize_purchase, normalize_user};
pub use records::{
	CachedIdentity, CartRecord, ContainerRecord, IdentityRecord, UserRecord, CART_TTL_MS,
	CONTAINER_TTL_MS, IDENTITY_TTL_MS,
};
