//! Per-requester admission control over fixed time windows

use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::{task::JoinHandle, time::Instant};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::types::RequesterId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitConfig {
    /// Length of one window
    pub window: Duration,
    /// Requests admitted per requester per window
    pub max_requests: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            window: Duration::from_secs(15 * 60),
            max_requests: 100,
        }
    }
}

/// Remaining allowance after an admitted request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quota {
    pub limit: u32,
    pub remaining: u32,
    pub reset_after: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Admitted(Quota),
    Rejected { limit: u32, retry_after: Duration },
}

/// Admission decision for a requester.
///
/// The in-process [`FixedWindowLimiter`] is enough for a single instance;
/// multi-instance deployments implement this over a shared store.
pub trait RateLimiter: Send + Sync {
    /// Count one attempt and decide whether it may proceed.
    fn admit(&self, requester: &RequesterId) -> Admission;

    /// Drop windows that have elapsed. Returns how many were dropped.
    fn purge_expired(&self) -> usize {
        0
    }
}

#[derive(Debug, Clone, Copy)]
struct RateLimitWindow {
    count: u32,
    reset_at: Instant,
}

#[derive(Debug)]
pub struct FixedWindowLimiter {
    config: RateLimitConfig,
    windows: DashMap<RequesterId, RateLimitWindow>,
}

impl FixedWindowLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            windows: DashMap::new(),
        }
    }

    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    /// Number of requesters currently tracked
    pub fn tracked(&self) -> usize {
        self.windows.len()
    }
}

impl RateLimiter for FixedWindowLimiter {
    fn admit(&self, requester: &RequesterId) -> Admission {
        let now = Instant::now();
        let window = self.config.window;
        let limit = self.config.max_requests;

        // The entry guard holds the shard lock for the whole check-and-increment.
        let mut entry = self
            .windows
            .entry(requester.clone())
            .or_insert_with(|| RateLimitWindow {
                count: 0,
                reset_at: now + window,
            });

        if entry.reset_at <= now {
            *entry = RateLimitWindow {
                count: 0,
                reset_at: now + window,
            };
        }

        entry.count = entry.count.saturating_add(1);
        let reset_after = entry.reset_at.saturating_duration_since(now);

        if entry.count <= limit {
            Admission::Admitted(Quota {
                limit,
                remaining: limit - entry.count,
                reset_after,
            })
        } else {
            Admission::Rejected {
                limit,
                retry_after: reset_after,
            }
        }
    }

    fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.windows.len();
        self.windows.retain(|_, w| w.reset_at > now);
        before.saturating_sub(self.windows.len())
    }
}

/// Periodically purge elapsed windows until `shutdown` fires
pub fn spawn_sweeper(
    limiter: Arc<dyn RateLimiter>,
    every: Duration,
    shutdown: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = interval.tick() => {
                    let purged = limiter.purge_expired();
                    if purged > 0 {
                        debug!(purged, "purged expired rate-limit windows");
                    }
                }
            }
        }
    })
}
