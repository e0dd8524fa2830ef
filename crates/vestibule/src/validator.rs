//! Homeserver validation.
//!
//! A throwaway, unauthenticated client asks the candidate server for its
//! version metadata under a bounded timeout. The verdict is a plain bool:
//! any network error, malformed response, or empty version list is simply
//! "not a usable homeserver", never an error the caller must handle.

use std::sync::Arc;
use std::time::Duration;

use vestibule_client::{ClientConfig, ClientFactory};

/// Validates that a URL serves a compatible protocol endpoint.
///
/// Side-effect-free on persisted state: the probe client is discarded
/// after the query.
pub struct HomeserverValidator<F: ClientFactory + ?Sized> {
    factory: Arc<F>,
    request_timeout: Duration,
}

impl<F: ClientFactory + ?Sized> HomeserverValidator<F> {
    /// Create a validator probing via `factory` with the given timeout.
    pub fn new(factory: Arc<F>, request_timeout: Duration) -> Self {
        Self {
            factory,
            request_timeout,
        }
    }

    /// Whether `url` serves a compatible protocol endpoint.
    pub async fn validate(&self, url: &str) -> bool {
        let client = match self
            .factory
            .create(ClientConfig::unauthenticated(url))
            .await
        {
            Ok(client) => client,
            Err(err) => {
                tracing::debug!(url, error = %err, "validation client construction failed");
                return false;
            }
        };

        let verdict = match tokio::time::timeout(self.request_timeout, client.server_versions())
            .await
        {
            Ok(Ok(versions)) => versions.is_compatible(),
            Ok(Err(err)) => {
                tracing::debug!(url, error = %err, "version query failed");
                false
            }
            Err(_) => {
                tracing::debug!(url, "version query timed out");
                false
            }
        };

        client.stop().await;
        verdict
    }
}
