//! API client for the dragon roster backend.
//!
//! This module provides the `ApiClient` struct for fetching dragon
//! records. The bearer token is read from the session store subscription
//! at request time, so a silently renewed session is picked up without
//! rebuilding the client.

use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::Client;
use serde::de::DeserializeOwned;
use tokio::sync::watch;
use tracing::debug;

use crate::api::interceptor::authenticate_request;
use crate::api::ApiError;
use crate::auth::token::TokenData;
use crate::models::Dragon;

// ============================================================================
// Constants
// ============================================================================

/// HTTP request timeout in seconds.
/// 30s allows for slow API responses while failing fast enough for good UX.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// API client for the dragon roster backend.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    token_rx: watch::Receiver<Option<TokenData>>,
}

impl ApiClient {
    /// Create a client for the given base URL, reading tokens from the
    /// session store subscription.
    pub fn new(base_url: &str, token_rx: watch::Receiver<Option<TokenData>>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token_rx,
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Check if response is successful, returning an error with body if not.
    async fn check_response(response: reqwest::Response) -> Result<reqwest::Response> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::from_status(status, &body).into())
        }
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.endpoint(path);
        let token = self.token_rx.borrow().clone();

        let response = authenticate_request(self.client.get(&url), token.as_ref())
            .send()
            .await
            .map_err(ApiError::NetworkError)
            .with_context(|| format!("Failed to send GET request to {}", url))?;

        let response = Self::check_response(response).await?;

        response
            .json()
            .await
            .with_context(|| format!("Failed to parse JSON response from {}", url))
    }

    // ===== Data Fetching Methods =====

    /// Fetch the dragon roster. Errors surface to the caller untouched -
    /// no retry, the UI layer decides how to display a failure.
    pub async fn get_dragons(&self) -> Result<Vec<Dragon>> {
        debug!("Fetching dragon roster");
        self.get("dragons").await
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn client(base_url: &str) -> ApiClient {
        let (_tx, rx) = watch::channel(None);
        ApiClient::new(base_url, rx).unwrap()
    }

    #[test]
    fn test_endpoint_join_normalizes_slashes() {
        let api = client("http://localhost:3001/api/");
        assert_eq!(api.endpoint("dragons"), "http://localhost:3001/api/dragons");
        assert_eq!(api.endpoint("/dragons"), "http://localhost:3001/api/dragons");

        let api = client("http://localhost:3001/api");
        assert_eq!(api.endpoint("dragons"), "http://localhost:3001/api/dragons");
    }
}
