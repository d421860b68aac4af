//! HTTP plumbing shared by the cloud deployers.

use reqwest::{Client, RequestBuilder, header};
use std::time::Duration;

use crate::error::{DeployError, Result};

/// Timeout for requests that trigger work on the provider.
pub const MUTATION_TIMEOUT_SECS: u64 = 60;

/// Timeout for read-only status requests.
pub const STATUS_TIMEOUT_SECS: u64 = 30;

/// Builds an HTTP client with the mutation timeout.
///
/// # Errors
///
/// Returns an error if the HTTP client cannot be created.
pub fn build_client() -> Result<Client> {
    Client::builder()
        .timeout(Duration::from_secs(MUTATION_TIMEOUT_SECS))
        .build()
        .map_err(|e| DeployError::external(format!("Failed to create HTTP client: {e}")).into())
}

/// Adds bearer authentication and the JSON content type.
pub fn authorized(request: RequestBuilder, token: &str) -> RequestBuilder {
    request
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
}

/// Joins a base URL and a path without doubling slashes.
#[must_use]
pub fn endpoint(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}
