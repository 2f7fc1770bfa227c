// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! HTTP client with the SDK User-Agent header.

use reqwest::ClientBuilder;

/// SDK version for identification.
pub const SDK_VERSION: &str = env!("CARGO_PKG_VERSION");
/// SDK name for identification.
pub const SDK_NAME: &str = "loom-commerce-rust";

/// Creates a reqwest builder carrying the SDK User-Agent.
///
/// # Example
/// ```ignore
/// let client = loom_commerce::http::builder()
///     .timeout(Duration::from_secs(30))
///     .build()?;
/// ```
pub fn builder() -> ClientBuilder {
	reqwest::Client::builder().user_agent(user_agent())
}

/// Returns the SDK User-Agent string.
///
/// Format: `loom-commerce-rust/{version}`
pub fn user_agent() -> String {
	format!("{SDK_NAME}/{SDK_VERSION}")
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn user_agent_has_correct_format() {
		let ua = user_agent();
		let parts: Vec<&str> = ua.split('/').collect();
		assert_eq!(parts.len(), 2);
		assert_eq!(parts[0], SDK_NAME);
		assert_eq!(parts[1], SDK_VERSION);
	}

	#[test]
	fn builder_builds() {
		assert!(builder().build().is_ok());
	}
}
