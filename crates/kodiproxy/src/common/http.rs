//! HTTP Client Utilities
//!
//! Shared HTTP client creation with consistent configuration.

use std::time::Duration;

use super::error::{ProxyError, ProxyResult};

/// Create a reqwest HTTP client with the given timeout.
///
/// Redirects are not followed: the upstream and the receiver are fixed targets and
/// a redirect is relayed as any other non-2xx answer.
pub fn create_http_client(timeout: Duration) -> ProxyResult<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .map_err(|e| ProxyError::Internal(format!("Failed to build HTTP client: {}", e)))
}
