//! Reachability probe for the provider distribution endpoint

use std::time::Duration;
use tracing::{debug, warn};

use crate::error::{Error, Result};

/// Probe `url` with a bounded retry loop.
///
/// Transport failures back off exponentially (`backoff`, doubled per
/// attempt) and exhaust into a network error. A reachable server
/// answering non-2xx is a server error and is not retried; the host is up
/// and retrying will not change its answer.
pub async fn probe_endpoint(
    client: &reqwest::Client,
    url: &str,
    attempts: u32,
    backoff: Duration,
) -> Result<()> {
    let mut delay = backoff;
    for attempt in 1..=attempts {
        match client.head(url).send().await {
            Ok(response) if response.status().is_success() => {
                debug!("Endpoint {} reachable (attempt {})", url, attempt);
                return Ok(());
            }
            Ok(response) => {
                return Err(Error::Server {
                    status: response.status().as_u16(),
                });
            }
            Err(e) => {
                warn!(
                    "Endpoint probe attempt {}/{} failed: {}",
                    attempt, attempts, e
                );
                if attempt < attempts {
                    tokio::time::sleep(delay).await;
                    delay *= 2;
                }
            }
        }
    }
    Err(Error::Network(format!(
        "endpoint {} unreachable after {} attempts",
        url, attempts
    )))
}
