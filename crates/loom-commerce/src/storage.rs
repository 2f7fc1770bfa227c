// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Persistent key-value storage seam.
//!
//! In a browser this is local storage; the SDK only needs string get/set/remove
//! and stores every value as JSON. Writes from several tracker instances over
//! the same store are not coordinated: the last write wins.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

/// Storage keys used by the SDK.
pub mod keys {
	pub const CART: &str = "loom-commerce-cart";
	pub const USER: &str = "loom-commerce-user";
	pub const CONTAINER: &str = "loom-commerce-container";
	pub const IDENTITY: &str = "loom-commerce-identity";
}

/// Errors raised while reading or writing persisted state.
#[derive(Debug, Error)]
pub enum StorageError {
	/// A stored value is not valid JSON for its expected shape.
	#[error("corrupt value under `{key}`: {source}")]
	Corrupt {
		key: String,
		#[source]
		source: serde_json::Error,
	},

	/// A value could not be serialized.
	#[error("could not encode value for `{key}`: {source}")]
	Encode {
		key: String,
		#[source]
		source: serde_json::Error,
	},

	/// The backing store rejected a write.
	#[error("write to `{key}` rejected: {message}")]
	WriteRejected { key: String, message: String },
}

/// A string key-value store.
pub trait KeyValueStore: Send + Sync {
	fn get(&self, key: &str) -> Option<String>;

	fn set(&self, key: &str, value: String) -> Result<(), StorageError>;

	fn remove(&self, key: &str);
}

/// Type alias for a shared store.
pub type SharedStore = Arc<dyn KeyValueStore>;

/// In-memory store, the default when no persistent store is configured.
#[derive(Debug, Default)]
pub struct MemoryStore {
	entries: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
	pub fn new() -> Self {
		Self::default()
	}

	/// Returns the number of stored entries.
	pub fn len(&self) -> usize {
		self.entries.read().len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.read().is_empty()
	}
}

impl KeyValueStore for MemoryStore {
	fn get(&self, key: &str) -> Option<String> {
		self.entries.read().get(key).cloned()
	}

	fn set(&self, key: &str, value: String) -> Result<(), StorageError> {
		self.entries.write().insert(key.to_string(), value);
		Ok(())
	}

	fn remove(&self, key: &str) {
		self.entries.write().remove(key);
	}
}

/// Reads and decodes a JSON value. Absent keys are `Ok(None)`.
pub fn read_json<T: DeserializeOwned>(
	store: &dyn KeyValueStore,
	key: &str,
) -> Result<Option<T>, StorageError> {
	let Some(raw) = store.get(key) else {
		return Ok(None);
	};

	serde_json::from_str(&raw)
		.map(Some)
		.map_err(|source| StorageError::Corrupt {
			key: key.to_string(),
			source,
		})
}

/// Encodes and writes a JSON value.
pub fn write_json<T: Serialize>(
	store: &dyn KeyValueStore,
	key: &str,
	value: &T,
) -> Result<(), StorageError> {
	let raw = serde_json::to_string(value).map_err(|source| StorageError::Encode {
		key: key.to_string(),
		source,
	})?;
	store.set(key, raw)
}
