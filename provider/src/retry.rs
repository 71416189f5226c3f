//! Retrying calls that hit transient faults
//!
//! Some SoftLayer calls fail while another change to the same object is still
//! running ("Operation already in progress" on NetScaler VIPs, mass access
//! control modifications on storage volumes, active transactions on guests).
//! Those faults are retried at a fixed interval until the retry timeout runs
//! out, then the last fault is returned.

use crate::error::ProviderError;
use crate::wait::RetryConfig;
use softlayer_client::SoftLayerError;
use std::future::Future;
use tokio::time::{Instant, sleep};
use tracing::{debug, error, warn};

/// Run `op`, retrying while it fails with a known transient fault
pub async fn retry_transient<T, F, Fut>(
    action: &str,
    config: &RetryConfig,
    mut op: F,
) -> Result<T, ProviderError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, SoftLayerError>>,
{
    let deadline = Instant::now() + config.timeout;
    let mut attempt = 1u32;

    loop {
        match op().await {
            Ok(value) => {
                if attempt > 1 {
                    debug!("{} succeeded after {} attempts", action, attempt);
                }
                return Ok(value);
            }
            Err(e) if e.is_transient() && Instant::now() + config.interval <= deadline => {
                warn!(
                    "{} hit a transient fault (attempt {}), retrying in {:?}: {}",
                    action, attempt, config.interval, e
                );
                sleep(config.interval).await;
                attempt += 1;
            }
            Err(e) => {
                if e.is_transient() {
                    error!("{} still failing after {} attempts: {}", action, attempt, e);
                }
                return Err(e.into());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    fn config(timeout_ms: u64) -> RetryConfig {
        RetryConfig {
            timeout: Duration::from_millis(timeout_ms),
            interval: Duration::from_millis(2),
        }
    }

    fn in_progress() -> SoftLayerError {
        SoftLayerError::api(500, "SoftLayer_Exception_Public", "Operation already in progress")
    }

    #[tokio::test]
    async fn test_retries_until_success() {
        let attempts = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&attempts);
        let result = retry_transient("create VIP", &config(1000), || {
            let n = counter.fetch_add(1, Ordering::SeqCst);
            async move { if n < 2 { Err(in_progress()) } else { Ok(n) } }
        })
        .await
        .unwrap();
        assert_eq!(result, 2);
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_surfaces_terminal_error_once_bound_exceeded() {
        let attempts = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&attempts);
        let err = retry_transient::<(), _, _>("create VIP", &config(20), || {
            counter.fetch_add(1, Ordering::SeqCst);
            async { Err(in_progress()) }
        })
        .await
        .unwrap_err();

        assert!(err.is_transient());
        let made = attempts.load(Ordering::SeqCst);
        assert!(made >= 2, "expected retries, got {}", made);
        assert!(made <= 11, "retry bound not respected: {}", made);
    }

    #[tokio::test]
    async fn test_other_errors_are_not_retried() {
        let attempts = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&attempts);
        let err = retry_transient::<(), _, _>("delete VIP", &config(1000), || {
            counter.fetch_add(1, Ordering::SeqCst);
            async { Err(SoftLayerError::NotFound("vip".to_string())) }
        })
        .await
        .unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }
}
