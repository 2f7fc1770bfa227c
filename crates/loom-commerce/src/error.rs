// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Error types for the commerce tracking SDK.
//!
//! Public tracking calls never return these: they are logged and the call
//! becomes a no-op. They surface from the builder, the token calls and the
//! lower-level resolvers.

use loom_commerce_core::ValidationError;
use thiserror::Error;

use crate::storage::StorageError;

/// Commerce tracking SDK errors.
#[derive(Debug, Error)]
pub enum TrackerError {
	/// Base URL is missing or not a valid URL.
	#[error("invalid base URL")]
	InvalidBaseUrl,

	/// Page URL is missing or not a valid URL.
	#[error("invalid page URL")]
	InvalidPageUrl,

	/// A configured endpoint is not a valid URL.
	#[error("invalid endpoint URL for {0}")]
	InvalidEndpoint(&'static str),

	/// No merchant id is configured, so nothing can be fetched for it.
	#[error("merchant ID is required")]
	MissingMerchantId,

	/// A caller payload failed validation.
	#[error("validation failed: {0}")]
	Validation(#[from] ValidationError),

	/// Persisted state could not be read or written.
	#[error(transparent)]
	Storage(#[from] StorageError),

	/// A response was received but could not be turned into usable state.
	#[error("resolution failed: {0}")]
	Resolution(String),

	/// HTTP request failed.
	#[error("HTTP request failed: {0}")]
	RequestFailed(#[from] reqwest::Error),

	/// Server returned an error response.
	#[error("server error ({status}): {message}")]
	ServerError { status: u16, message: String },
}

/// Result type alias for tracker operations.
pub type Result<T> = std::result::Result<T, TrackerError>;

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn validation_errors_convert() {
		let err: TrackerError = ValidationError::EmptyItems.into();
		assert!(matches!(err, TrackerError::Validation(ValidationError::EmptyItems)));
		assert_eq!(err.to_string(), "validation failed: at least one item is required");
	}

	#[test]
	fn server_error_display() {
		let err = TrackerError::ServerError {
			status: 503,
			message: "unavailable".to_string(),
		};
		assert_eq!(err.to_string(), "server error (503): unavailable");
	}
}
