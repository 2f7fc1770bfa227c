// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Cart id state.
//!
//! A cart id lives for a fixed window from its creation. Reading an expired,
//! missing or corrupt entry mints a fresh id.

use loom_commerce_core::records::{generate_id, is_expired, now_millis};
use loom_commerce_core::CartRecord;
use tracing::{debug, warn};

use crate::error::Result;
use crate::storage::{keys, read_json, write_json, SharedStore};

#[derive(Clone)]
pub struct CartState {
	store: SharedStore,
	ttl_ms: i64,
}

impl CartState {
	pub fn new(store: SharedStore, ttl_ms: i64) -> Self {
		Self { store, ttl_ms }
	}

	/// Returns the current cart id, creating a new one if needed.
	///
	/// A failed write is logged; the new id is still returned so the caller can
	/// attribute the event in hand.
	pub fn get_or_create_valid_cart_id(&self) -> String {
		match read_json::<CartRecord>(self.store.as_ref(), keys::CART) {
			Ok(Some(record)) if !is_expired(record.created_at, self.ttl_ms, now_millis()) => {
				return record.cart_id;
			}
			Ok(Some(record)) => debug!(cart_id = %record.cart_id, "Cart id expired"),
			Ok(None) => {}
			Err(e) => warn!(error = %e, "Discarding unreadable cart id"),
		}

		let cart_id = generate_id();
		if let Err(e) = self.store_cart_id(&cart_id) {
			warn!(error = %e, "Failed to persist new cart id");
		}
		cart_id
	}

	/// Adopts a merchant-declared cart id, restarting its expiry window.
	pub fn set_cart_id(&self, cart_id: &str) -> Result<()> {
		self.store_cart_id(cart_id)
	}

	/// Replaces the cart id with a fresh one and returns it.
	pub fn create_new_cart_id(&self) -> Result<String> {
		let cart_id = generate_id();
		self.store_cart_id(&cart_id)?;
		debug!(cart_id = %cart_id, "Created new cart id");
		Ok(cart_id)
	}

	fn store_cart_id(&self, cart_id: &str) -> Result<()> {
		write_json(self.store.as_ref(), keys::CART, &CartRecord::new(cart_id))?;
		Ok(())
	}
}
