//! Retry policy: bounded attempts with exponential backoff and a
//! subscription bus for observing failed attempts.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::sleep;

/// Default maximum number of attempts (the first call plus retries).
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Default delay before the first retry; doubles on every further retry.
pub const DEFAULT_INITIAL_DELAY_MS: u64 = 1000;

type FailureListener = Box<dyn Fn(&anyhow::Error) + Send + Sync>;

/// Bus of failure listeners notified before each retry.
///
/// Subscriptions are scoped: [`RetryEvents::subscribe`] returns a guard that
/// removes the listener when dropped, so an early return or panic in the
/// caller cannot leave a listener behind.
#[derive(Default)]
pub struct RetryEvents {
    listeners: Mutex<HashMap<u64, FailureListener>>,
    next_id: AtomicU64,
}

impl RetryEvents {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Register a failure listener for the lifetime of the returned guard.
    pub fn subscribe(
        self: &Arc<Self>,
        listener: impl Fn(&anyhow::Error) + Send + Sync + 'static,
    ) -> ListenerGuard {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.listeners
            .lock()
            .unwrap()
            .insert(id, Box::new(listener));
        ListenerGuard {
            events: Arc::clone(self),
            id,
        }
    }

    /// Number of live subscriptions.
    pub fn listener_count(&self) -> usize {
        self.listeners.lock().unwrap().len()
    }

    fn emit(&self, error: &anyhow::Error) {
        for listener in self.listeners.lock().unwrap().values() {
            listener(error);
        }
    }
}

/// Removes its subscription from the bus on drop.
pub struct ListenerGuard {
    events: Arc<RetryEvents>,
    id: u64,
}

impl Drop for ListenerGuard {
    fn drop(&mut self) {
        self.events.listeners.lock().unwrap().remove(&self.id);
    }
}

/// Wraps an async operation with bounded retries and exponential backoff.
///
/// Listeners on the policy's [`RetryEvents`] bus observe every failure that
/// will be retried; the final (exhausting) failure is propagated to the
/// caller instead. Observation never alters the retry arithmetic.
#[derive(Clone)]
pub struct RetryPolicy {
    max_attempts: u32,
    initial_delay: Duration,
    events: Arc<RetryEvents>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(
            DEFAULT_MAX_ATTEMPTS,
            Duration::from_millis(DEFAULT_INITIAL_DELAY_MS),
        )
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, initial_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            initial_delay,
            events: RetryEvents::new(),
        }
    }

    /// The failure-notification bus for this policy.
    pub fn events(&self) -> &Arc<RetryEvents> {
        &self.events
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Delay before retry `attempt_index` (0-based): `initial * 2^index`.
    /// There is never a delay before the first attempt.
    pub fn backoff_delay(&self, attempt_index: u32) -> Duration {
        self.initial_delay * 2u32.pow(attempt_index)
    }

    /// Invoke `operation` until it succeeds or `max_attempts` invocations
    /// have failed; the final failure is returned to the caller.
    pub async fn execute<T, F, Fut>(&self, mut operation: F) -> anyhow::Result<T>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = anyhow::Result<T>>,
    {
        let mut attempt: u32 = 0;
        loop {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(error) => {
                    attempt += 1;
                    if attempt >= self.max_attempts {
                        return Err(error);
                    }
                    self.events.emit(&error);
                    let delay = self.backoff_delay(attempt - 1);
                    tracing::debug!(
                        attempt = attempt,
                        max_attempts = self.max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %error,
                        "Attempt failed, backing off before retry"
                    );
                    sleep(delay).await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn fast_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy::new(max_attempts, Duration::from_millis(1))
    }

    #[test]
    fn backoff_doubles_from_initial_delay() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.backoff_delay(0), Duration::from_millis(1000));
        assert_eq!(policy.backoff_delay(1), Duration::from_millis(2000));
        assert_eq!(policy.backoff_delay(2), Duration::from_millis(4000));
    }

    #[tokio::test]
    async fn first_success_short_circuits() {
        let policy = fast_policy(3);
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_in = calls.clone();
        let result = policy
            .execute(move || {
                let calls = calls_in.clone();
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, anyhow::Error>(42)
                }
            })
            .await
            .unwrap();
        assert_eq!(result, 42);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn succeeds_on_second_attempt_with_two_invocations() {
        let policy = fast_policy(3);
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_in = calls.clone();
        let result = policy
            .execute(move || {
                let calls = calls_in.clone();
                async move {
                    if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                        anyhow::bail!("transient")
                    }
                    Ok("sent")
                }
            })
            .await
            .unwrap();
        assert_eq!(result, "sent");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn exhaustion_propagates_final_error_after_max_attempts() {
        let policy = fast_policy(3);
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_in = calls.clone();
        let err = policy
            .execute(move || {
                let calls = calls_in.clone();
                async move {
                    let n = calls.fetch_add(1, Ordering::SeqCst);
                    Err::<(), _>(anyhow::anyhow!("boom {}", n))
                }
            })
            .await
            .unwrap_err();
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(err.to_string(), "boom 2");
    }

    #[tokio::test]
    async fn listener_sees_retried_failures_but_not_the_final_one() {
        let policy = fast_policy(3);
        let seen = Arc::new(AtomicUsize::new(0));
        let seen_in = seen.clone();
        let _guard = policy.events().subscribe(move |_err| {
            seen_in.fetch_add(1, Ordering::SeqCst);
        });
        let _ = policy
            .execute(|| async { Err::<(), _>(anyhow::anyhow!("always")) })
            .await;
        assert_eq!(seen.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn listener_guard_unsubscribes_on_drop() {
        let policy = fast_policy(2);
        let seen = Arc::new(AtomicUsize::new(0));
        {
            let seen_in = seen.clone();
            let _guard = policy.events().subscribe(move |_err| {
                seen_in.fetch_add(1, Ordering::SeqCst);
            });
            assert_eq!(policy.events().listener_count(), 1);
        }
        assert_eq!(policy.events().listener_count(), 0);
        let _ = policy
            .execute(|| async { Err::<(), _>(anyhow::anyhow!("always")) })
            .await;
        assert_eq!(seen.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn repeated_execution_does_not_accumulate_listeners() {
        let policy = fast_policy(2);
        for _ in 0..10 {
            let _guard = policy.events().subscribe(|_err| {});
            let _ = policy
                .execute(|| async { Err::<(), _>(anyhow::anyhow!("always")) })
                .await;
        }
        assert_eq!(policy.events().listener_count(), 0);
    }
}
