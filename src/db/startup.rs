//! Startup readiness gate: bounded-retry schema initialization.
//!
//! The gate runs exactly once, before the HTTP listener binds. It is never
//! re-entered for per-request failures; exhausting its attempts is terminal
//! and the process must refuse to serve.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use tracing::{info, warn};

use crate::db::pool::ManageConnection;
use crate::db::PgManager;
use crate::error::{DbError, StartupError};

/// Idempotent schema statement, safe to run on every boot.
const CREATE_ITEMS_TABLE: &str = "CREATE TABLE IF NOT EXISTS items (
    id SERIAL PRIMARY KEY,
    name TEXT NOT NULL,
    created_at TIMESTAMP DEFAULT NOW()
)";

/// Retry schedule for the readiness gate.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Attempts before giving up.
    pub max_attempts: u32,
    /// Initial backoff delay in milliseconds.
    pub base_delay_ms: u64,
    /// Backoff multiplier (e.g., 2.0 for exponential).
    pub multiplier: f64,
    /// Maximum backoff delay in seconds.
    pub max_delay_s: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            base_delay_ms: 2000,
            multiplier: 2.0,
            max_delay_s: 30,
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `attempt` (0-based), clamped to
    /// `max_delay_s`.
    pub fn next_delay(&self, attempt: u32) -> Duration {
        let delay_ms = self.base_delay_ms as f64 * self.multiplier.powi(attempt as i32);
        let max_delay_ms = self.max_delay_s * 1000;
        let clamped_ms = delay_ms.min(max_delay_ms as f64) as u64;
        Duration::from_millis(clamped_ms)
    }
}

/// Run `op` until it succeeds, backing off between attempts.
///
/// Succeeding once makes the gate Ready for the rest of the process
/// lifetime. Exhausting `max_attempts` returns [`StartupError::Fatal`]
/// carrying the last failure.
pub async fn wait_ready<F, Fut, E>(policy: &RetryPolicy, mut op: F) -> Result<(), StartupError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<(), E>>,
    E: fmt::Display,
{
    let mut last_error = String::from("no attempts were made");
    for attempt in 0..policy.max_attempts {
        match op().await {
            Ok(()) => {
                info!(attempt = attempt + 1, "schema ready");
                return Ok(());
            }
            Err(e) => {
                last_error = e.to_string();
                if attempt + 1 < policy.max_attempts {
                    let delay = policy.next_delay(attempt);
                    warn!(
                        attempt = attempt + 1,
                        max_attempts = policy.max_attempts,
                        "schema initialization failed ({last_error}), retrying in {delay:?}"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    Err(StartupError::Fatal {
        attempts: policy.max_attempts,
        last_error,
    })
}

/// Create the `items` table on a fresh connection.
pub async fn ensure_items_table(manager: &PgManager) -> Result<(), DbError> {
    let client = manager.connect().await?;
    client.batch_execute(CREATE_ITEMS_TABLE).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn fast_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            base_delay_ms: 1,
            multiplier: 1.0,
            max_delay_s: 1,
        }
    }

    #[tokio::test]
    async fn succeeds_once_the_operation_comes_up() {
        let attempts = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&attempts);

        let result = wait_ready(&fast_policy(10), move || {
            let counter = Arc::clone(&counter);
            async move {
                if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err("connection refused")
                } else {
                    Ok(())
                }
            }
        })
        .await;

        assert!(result.is_ok());
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn fatal_after_exhausting_attempts() {
        let attempts = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&attempts);

        let result = wait_ready(&fast_policy(3), move || {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>("still down")
            }
        })
        .await;

        let err = result.expect_err("gate must give up");
        let StartupError::Fatal {
            attempts: reported,
            last_error,
        } = err;
        assert_eq!(reported, 3);
        assert!(last_error.contains("still down"));
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn next_delay_grows_and_stays_bounded() {
        let policy = RetryPolicy::default();

        assert_eq!(policy.next_delay(0), Duration::from_millis(2000));
        assert_eq!(policy.next_delay(1), Duration::from_millis(4000));
        assert!(policy.next_delay(1) > policy.next_delay(0));
        assert!(policy.next_delay(30) <= Duration::from_secs(30));
    }
}
