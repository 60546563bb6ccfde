//! Dial with backoff
//!
//! Attempt `i` (1-based) that fails is followed by a sleep of
//! `initial_delay_secs ^ i` seconds, unless it was the last attempt.

use dbconnector_core::{ConnectorError, Result, RetryPolicy};
use std::future::Future;
use tokio::time::sleep;
use tracing::{info, warn};

/// Run `dial` up to `policy.max_attempts` times until it succeeds.
///
/// `dial` receives the 1-based attempt number. When every attempt fails the
/// last failure is wrapped in [`ConnectorError::NotConnected`].
pub async fn dial_with_backoff<T, F, Fut>(policy: &RetryPolicy, mut dial: F) -> Result<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut last_error = None;

    for attempt in 1..=policy.max_attempts {
        match dial(attempt).await {
            Ok(value) => {
                info!(attempt, "Connection established");
                return Ok(value);
            }
            Err(e) => {
                if attempt < policy.max_attempts {
                    let delay = policy.delay_after(attempt);
                    warn!(
                        "Connection attempt {} of {} failed: {}. Retrying in {:?}",
                        attempt, policy.max_attempts, e, delay
                    );
                    sleep(delay).await;
                } else {
                    warn!(
                        "Connection attempt {} of {} failed: {}",
                        attempt, policy.max_attempts, e
                    );
                }
                last_error = Some(e);
            }
        }
    }

    Err(ConnectorError::NotConnected(match last_error {
        Some(e) => format!("gave up after {} attempts: {}", policy.max_attempts, e),
        None => "no connection attempts allowed".to_string(),
    }))
}
