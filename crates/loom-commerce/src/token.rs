// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Partner access tokens.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::error::{Result, TrackerError};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AccessTokenRequest<'a> {
	mrid: &'a str,
	#[serde(skip_serializing_if = "Option::is_none")]
	client_id: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct AccessTokenResponse {
	#[serde(default)]
	data: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct UserTokenRequest<'a> {
	#[serde(skip_serializing_if = "Option::is_none")]
	merchant_id: Option<&'a str>,
	#[serde(skip_serializing_if = "Option::is_none")]
	client_id: Option<&'a str>,
}

/// Result of a user access token request.
///
/// On success the service response is kept as is alongside `success: true`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserAccessToken {
	pub success: bool,
	#[serde(flatten)]
	pub payload: Map<String, Value>,
}

impl UserAccessToken {
	pub fn failed() -> Self {
		Self {
			success: false,
			payload: Map::new(),
		}
	}
}

/// Requests an access token for `mrid`.
pub async fn fetch_access_token(
	http_client: &Client,
	url: &str,
	mrid: &str,
	client_id: Option<&str>,
) -> Result<String> {
	let response = http_client
		.post(url)
		.json(&AccessTokenRequest { mrid, client_id })
		.send()
		.await?;

	if !response.status().is_success() {
		let status = response.status().as_u16();
		let message = response.text().await.unwrap_or_default();
		return Err(TrackerError::ServerError { status, message });
	}

	let body: AccessTokenResponse = response.json().await?;
	match body.data.filter(|token| !token.is_empty()) {
		Some(token) => {
			debug!("Access token created");
			Ok(token)
		}
		None => Err(TrackerError::Resolution("no token could be created".to_string())),
	}
}

/// Requests a user access token. Never fails: any error yields
/// [`UserAccessToken::failed`].
pub async fn fetch_user_access_token(
	http_client: &Client,
	url: &str,
	merchant_id: Option<&str>,
	client_id: Option<&str>,
) -> UserAccessToken {
	let response = http_client
		.post(url)
		.json(&UserTokenRequest {
			merchant_id,
			client_id,
		})
		.send()
		.await;

	let response = match response {
		Ok(response) if response.status() == reqwest::StatusCode::OK => response,
		Ok(response) => {
			debug!(status = response.status().as_u16(), "User access token refused");
			return UserAccessToken::failed();
		}
		Err(e) => {
			warn!(error = %e, "User access token request failed");
			return UserAccessToken::failed();
		}
	};

	match response.json::<Map<String, Value>>().await {
		Ok(mut payload) => {
			payload.remove("success");
			UserAccessToken {
				success: true,
				payload,
			}
		}
		Err(e) => {
			warn!(error = %e, "User access token response unreadable");
			UserAccessToken::failed()
		}
	}
}
