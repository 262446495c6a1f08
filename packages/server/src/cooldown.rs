use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::error::AppError;

/// A cooldown key and the windows applied to it once an attempt finishes.
#[derive(Debug, Clone)]
pub struct CooldownRule {
    pub key: String,
    /// Block applied after a successful attempt.
    pub window: Duration,
    /// Block applied after a failed attempt.
    pub failure_window: Duration,
}

impl CooldownRule {
    pub fn new(key: impl Into<String>, window_secs: u64, failure_window_secs: u64) -> Self {
        Self {
            key: key.into(),
            window: Duration::from_secs(window_secs),
            failure_window: Duration::from_secs(failure_window_secs),
        }
    }
}

/// Tracks, per key, the instant until which further attempts are rejected.
#[derive(Debug, Default)]
pub struct CooldownTracker {
    blocked_until: HashMap<String, Instant>,
}

impl CooldownTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Time left before `key` may be used again, or `None` if it is free.
    pub fn remaining(&self, key: &str, now: Instant) -> Option<Duration> {
        self.blocked_until
            .get(key)
            .map(|until| until.saturating_duration_since(now))
            .filter(|left| !left.is_zero())
    }

    /// Block `key` for `window` starting at `now`. A zero window is a no-op.
    pub fn block(&mut self, key: &str, window: Duration, now: Instant) {
        if window.is_zero() {
            return;
        }
        self.blocked_until.insert(key.to_string(), now + window);
    }

    /// Drop entries whose block has elapsed. Returns how many were removed.
    pub fn cleanup_expired(&mut self, now: Instant) -> usize {
        let before = self.blocked_until.len();
        self.blocked_until.retain(|_, until| *until > now);
        before - self.blocked_until.len()
    }

    /// Get the number of keys currently tracked.
    pub fn len(&self) -> usize {
        self.blocked_until.len()
    }

    /// Check if the tracker has no entries.
    pub fn is_empty(&self) -> bool {
        self.blocked_until.is_empty()
    }
}

/// Shared, in-process cooldown state for rate-limited endpoints.
///
/// `check` and `record` are separate steps around the guarded operation, so two
/// requests arriving together can both pass `check`. This is accepted.
#[derive(Clone, Default)]
pub struct Cooldown {
    tracker: Arc<Mutex<CooldownTracker>>,
}

impl Cooldown {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject with `RateLimited` if any of the rule keys is still blocked.
    /// The reported wait is the longest remaining block, rounded up to whole seconds.
    pub async fn check(&self, rules: &[CooldownRule]) -> Result<(), AppError> {
        let now = Instant::now();
        let tracker = self.tracker.lock().await;

        let longest = rules
            .iter()
            .filter_map(|rule| tracker.remaining(&rule.key, now))
            .max();

        match longest {
            Some(wait) => {
                debug!(wait_ms = wait.as_millis() as u64, "Cooldown active");
                let retry_after = (wait.as_secs_f64().ceil() as u64).max(1);
                Err(AppError::RateLimited { retry_after })
            }
            None => Ok(()),
        }
    }

    /// Start the window of every rule, choosing the failure window if the attempt failed.
    pub async fn record(&self, rules: &[CooldownRule], succeeded: bool) {
        let now = Instant::now();
        let mut tracker = self.tracker.lock().await;
        for rule in rules {
            let window = if succeeded {
                rule.window
            } else {
                rule.failure_window
            };
            tracker.block(&rule.key, window, now);
        }
    }

    /// Spawn a background task that periodically purges expired entries.
    pub fn spawn_cleanup_task(&self, cleanup_interval: Duration) -> tokio::task::JoinHandle<()> {
        let tracker = Arc::clone(&self.tracker);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(cleanup_interval.max(Duration::from_secs(1)));

            loop {
                interval.tick().await;
                let removed = tracker.lock().await.cleanup_expired(Instant::now());
                if removed > 0 {
                    info!(removed, "Cleaned up expired cooldown entries");
                }
            }
        })
    }
}
