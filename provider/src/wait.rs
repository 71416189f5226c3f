//! # Provisioning waits
//!
//! SoftLayer completes most changes asynchronously: an order or `createObject`
//! call returns immediately and the object shows up, gets its IP addresses or
//! drops its active transactions some minutes later. Every resource waits on
//! that the same way, through [`wait_for`]:
//!
//! 1. sleep for the initial `delay`
//! 2. call the refresh closure, which reports [`Poll::Pending`] with a short
//!    state description or [`Poll::Ready`] with the finished value
//! 3. known transient faults are logged and polled again; any other error
//!    aborts the wait
//! 4. sleep along a Fibonacci schedule between `min_interval` and
//!    `max_interval`, never past the deadline
//! 5. once `timeout` has elapsed, return [`ProviderError::Timeout`] carrying
//!    the last reported state

use crate::error::ProviderError;
use softlayer_client::SoftLayerError;
use std::future::Future;
use std::time::Duration;
use tokio::time::{Instant, sleep};
use tracing::{debug, error, info, warn};

/// Fibonacci backoff calculator
///
/// Produces `min, min, 2*min, 3*min, 5*min, ...` capped at `max`. Grows more
/// slowly than exponential backoff, which suits long provisioning waits where
/// the first few polls should stay close together.
#[derive(Debug, Clone)]
pub struct FibonacciBackoff {
    min: Duration,
    prev: Duration,
    current: Duration,
    max: Duration,
}

impl FibonacciBackoff {
    #[must_use]
    pub fn new(min: Duration, max: Duration) -> Self {
        Self {
            min,
            prev: Duration::ZERO,
            current: min,
            max: max.max(min),
        }
    }

    /// Get the next interval and advance the sequence
    pub fn next_interval(&mut self) -> Duration {
        let result = self.current;
        let next = self.prev + self.current;
        self.prev = self.current;
        self.current = next.min(self.max);
        result
    }

    /// Reset the backoff to the initial state
    pub fn reset(&mut self) {
        self.prev = Duration::ZERO;
        self.current = self.min;
    }
}

/// Timing of one wait
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WaitConfig {
    /// Give up once this much time has passed since the wait started
    pub timeout: Duration,
    /// Pause before the first poll
    pub delay: Duration,
    /// First (and smallest) pause between polls
    pub min_interval: Duration,
    /// Largest pause between polls
    pub max_interval: Duration,
}

impl WaitConfig {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            delay: Duration::from_secs(10),
            min_interval: Duration::from_secs(10),
            max_interval: Duration::from_secs(60),
        }
    }

    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn intervals(mut self, min: Duration, max: Duration) -> Self {
        self.min_interval = min;
        self.max_interval = max;
        self
    }
}

impl Default for WaitConfig {
    fn default() -> Self {
        Self::new(Duration::from_secs(30 * 60))
    }
}

/// Timing for retrying a call that hit a transient fault
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryConfig {
    /// Stop retrying once this much time has passed
    pub timeout: Duration,
    /// Fixed pause between attempts
    pub interval: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(5 * 60),
            interval: Duration::from_secs(10),
        }
    }
}

/// Waits and retries used by a resource handler
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Timing {
    pub create: WaitConfig,
    pub delete: WaitConfig,
    pub retry: RetryConfig,
}

impl Timing {
    /// Same schedule for every wait: no initial delay, fixed `interval`
    pub fn uniform(timeout: Duration, interval: Duration) -> Self {
        let wait = WaitConfig::new(timeout)
            .delay(Duration::ZERO)
            .intervals(interval, interval);
        Self {
            create: wait.clone(),
            delete: wait,
            retry: RetryConfig { timeout, interval },
        }
    }
}

/// Outcome of one refresh
#[derive(Debug, Clone, PartialEq)]
pub enum Poll<T> {
    /// Not there yet; the string describes the current state
    Pending(String),
    Ready(T),
}

/// Poll `refresh` until it reports `Ready`, an error, or the timeout passes
pub async fn wait_for<T, F, Fut>(
    action: &str,
    resource_id: &str,
    config: &WaitConfig,
    mut refresh: F,
) -> Result<T, ProviderError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Poll<T>, ProviderError>>,
{
    let deadline = Instant::now() + config.timeout;
    let mut backoff = FibonacciBackoff::new(config.min_interval, config.max_interval);
    let mut last_state = "not polled yet".to_string();

    debug!("Waiting for {} of {} (timeout {:?})", action, resource_id, config.timeout);
    if !config.delay.is_zero() {
        sleep(config.delay.min(config.timeout)).await;
    }

    loop {
        match refresh().await {
            Ok(Poll::Ready(value)) => {
                info!("{} of {} complete", action, resource_id);
                return Ok(value);
            }
            Ok(Poll::Pending(state)) => {
                debug!("{} of {} pending: {}", action, resource_id, state);
                last_state = state;
            }
            Err(e) if e.is_transient() => {
                warn!("Transient fault while waiting for {} of {}: {}", action, resource_id, e);
                last_state = format!("transient fault: {}", e);
            }
            Err(e) => {
                error!("Error while waiting for {} of {}: {}", action, resource_id, e);
                return Err(e);
            }
        }

        let now = Instant::now();
        if now >= deadline {
            error!(
                "Timed out waiting for {} of {} after {:?}",
                action, resource_id, config.timeout
            );
            return Err(ProviderError::Timeout {
                action: action.to_string(),
                resource_id: resource_id.to_string(),
                timeout: config.timeout,
                last_state,
            });
        }
        sleep(backoff.next_interval().min(deadline - now)).await;
    }
}

/// Wait until an account listing filtered by order id returns exactly one object
///
/// `list` runs the filtered `SoftLayer_Account` call. Zero results means the
/// order has not been fulfilled yet; more than one means the filter matched
/// objects from a multi-item order, which the provider never places, so the
/// wait keeps going until the listing settles.
pub async fn wait_for_order<T, F, Fut>(
    action: &str,
    order_id: u64,
    config: &WaitConfig,
    mut list: F,
) -> Result<T, ProviderError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Vec<T>, SoftLayerError>>,
{
    wait_for(action, &format!("order {}", order_id), config, || {
        let listing = list();
        async move {
            let mut found = match listing.await {
                Ok(found) => found,
                Err(e) => return Err(ProviderError::from(e)),
            };
            match found.len() {
                1 => Ok(Poll::Ready(found.remove(0))),
                0 => Ok(Poll::Pending("order not yet fulfilled".to_string())),
                n => Ok(Poll::Pending(format!("{} objects match the order", n))),
            }
        }
    })
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast(timeout_ms: u64) -> WaitConfig {
        WaitConfig::new(Duration::from_millis(timeout_ms))
            .delay(Duration::ZERO)
            .intervals(Duration::from_millis(1), Duration::from_millis(5))
    }

    #[test]
    fn test_fibonacci_backoff_sequence() {
        let mut backoff = FibonacciBackoff::new(Duration::from_secs(10), Duration::from_secs(60));
        let secs: Vec<u64> = (0..7).map(|_| backoff.next_interval().as_secs()).collect();
        assert_eq!(secs, vec![10, 10, 20, 30, 50, 60, 60]);

        backoff.reset();
        assert_eq!(backoff.next_interval(), Duration::from_secs(10));
    }

    #[test]
    fn test_backoff_max_never_below_min() {
        let mut backoff = FibonacciBackoff::new(Duration::from_secs(5), Duration::from_secs(1));
        assert_eq!(backoff.next_interval(), Duration::from_secs(5));
        assert_eq!(backoff.next_interval(), Duration::from_secs(5));
        assert_eq!(backoff.next_interval(), Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_wait_returns_ready_value() {
        let polls = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&polls);
        let value = wait_for("provisioning", "7", &fast(1000), || {
            let n = counter.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 3 {
                    Ok(Poll::Pending(format!("poll {}", n)))
                } else {
                    Ok(Poll::Ready(n))
                }
            }
        })
        .await
        .unwrap();
        assert_eq!(value, 3);
        assert_eq!(polls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_wait_respects_timeout() {
        let started = std::time::Instant::now();
        let err = wait_for::<(), _, _>("provisioning", "7", &fast(30), || async {
            Ok(Poll::Pending("1 active transaction".to_string()))
        })
        .await
        .unwrap_err();

        assert!(started.elapsed() < Duration::from_secs(2));
        match err {
            ProviderError::Timeout {
                resource_id,
                last_state,
                ..
            } => {
                assert_eq!(resource_id, "7");
                assert_eq!(last_state, "1 active transaction");
            }
            other => panic!("expected timeout, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_wait_retries_transient_faults() {
        let polls = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&polls);
        let value = wait_for("deletion", "9", &fast(1000), || {
            let n = counter.fetch_add(1, Ordering::SeqCst);
            async move {
                if n == 0 {
                    Err(ProviderError::from(SoftLayerError::api(
                        500,
                        "SoftLayer_Exception_Public",
                        "Operation already in progress",
                    )))
                } else {
                    Ok(Poll::Ready("done"))
                }
            }
        })
        .await
        .unwrap();
        assert_eq!(value, "done");
    }

    #[tokio::test]
    async fn test_wait_aborts_on_other_errors() {
        let polls = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&polls);
        let err = wait_for::<(), _, _>("provisioning", "9", &fast(1000), || {
            counter.fetch_add(1, Ordering::SeqCst);
            async {
                Err(ProviderError::from(SoftLayerError::api(
                    500,
                    "SoftLayer_Exception_Public",
                    "Access denied",
                )))
            }
        })
        .await
        .unwrap_err();
        assert!(matches!(err, ProviderError::Api(_)));
        assert_eq!(polls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_wait_for_order_needs_exactly_one() {
        let polls = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&polls);
        let found = wait_for_order("VLAN order", 55, &fast(1000), || {
            let n = counter.fetch_add(1, Ordering::SeqCst);
            async move {
                Ok(match n {
                    0 => vec![],
                    1 => vec![1u64, 2],
                    _ => vec![3u64],
                })
            }
        })
        .await
        .unwrap();
        assert_eq!(found, 3);
        assert_eq!(polls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_uniform_timing() {
        let timing = Timing::uniform(Duration::from_millis(50), Duration::from_millis(2));
        assert_eq!(timing.create.delay, Duration::ZERO);
        assert_eq!(timing.delete.max_interval, Duration::from_millis(2));
        assert_eq!(timing.retry.timeout, Duration::from_millis(50));
    }
}
