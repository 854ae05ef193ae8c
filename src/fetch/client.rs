//! HTTP client initialization.

use std::sync::Arc;
use std::time::Duration;

use reqwest::ClientBuilder;

use crate::error_handling::InitializationError;

/// Initializes the crawl HTTP client.
///
/// Redirects are followed (up to 10 hops) so the frontier sees final page
/// bodies; TLS uses the rustls backend.
pub fn init_client(
    user_agent: &str,
    timeout_seconds: u64,
) -> Result<Arc<reqwest::Client>, InitializationError> {
    let client = ClientBuilder::new()
        .timeout(Duration::from_secs(timeout_seconds))
        .user_agent(user_agent.to_string())
        .build()?;
    Ok(Arc::new(client))
}

/// Initializes the validation HTTP client with redirects disabled.
///
/// The validator must observe 3xx responses directly to label edges as
/// `redirect`, so this client never follows a Location header.
pub fn init_probe_client(
    user_agent: &str,
    timeout_seconds: u64,
) -> Result<Arc<reqwest::Client>, InitializationError> {
    let client = ClientBuilder::new()
        .redirect(reqwest::redirect::Policy::none())
        .timeout(Duration::from_secs(timeout_seconds))
        .user_agent(user_agent.to_string())
        .build()?;
    Ok(Arc::new(client))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_client_builds() {
        assert!(init_client("test-agent/1.0", 10).is_ok());
    }

    #[test]
    fn test_init_probe_client_builds() {
        assert!(init_probe_client("test-agent/1.0", 10).is_ok());
    }
}
