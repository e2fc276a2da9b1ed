//! Per-client token buckets for HTTP admission control.

use std::collections::HashMap;
use std::num::NonZeroU32;
use std::sync::{Mutex, PoisonError};
use std::time::Instant;

use governor::{DefaultDirectRateLimiter, Quota};

use crate::config::RateLimitConfig;

struct ClientBucket {
    limiter: DefaultDirectRateLimiter,
    last_seen: Instant,
}

/// Token bucket per client identity, created on first sight and evicted by
/// [`RateLimiter::sweep`] once idle.
///
/// Identities come from request metadata a client controls, so the registry
/// must be swept regularly to stay bounded.
pub struct RateLimiter {
    config: RateLimitConfig,
    quota: Quota,
    clients: Mutex<HashMap<String, ClientBucket>>,
}

impl RateLimiter {
    /// Create a limiter refilling `per_second` tokens per second with room
    /// for `burst` at once. Zero values are treated as one.
    #[must_use]
    pub fn new(config: RateLimitConfig) -> Self {
        let per_second = NonZeroU32::new(config.per_second).unwrap_or(NonZeroU32::MIN);
        let burst = NonZeroU32::new(config.burst).unwrap_or(NonZeroU32::MIN);

        Self {
            config,
            quota: Quota::per_second(per_second).allow_burst(burst),
            clients: Mutex::new(HashMap::new()),
        }
    }

    #[must_use]
    pub const fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    /// Take one token for `client`. Returns `false` when the client is
    /// throttled.
    pub fn allow(&self, client: &str) -> bool {
        let now = Instant::now();
        let mut clients = self.clients.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some(bucket) = clients.get_mut(client) {
            bucket.last_seen = now;
            return bucket.limiter.check().is_ok();
        }

        let bucket = ClientBucket {
            limiter: DefaultDirectRateLimiter::direct(self.quota),
            last_seen: now,
        };
        let allowed = bucket.limiter.check().is_ok();
        clients.insert(client.to_string(), bucket);
        allowed
    }

    /// Evict clients idle for longer than the configured timeout.
    ///
    /// Returns the number of evicted clients.
    pub fn sweep(&self) -> usize {
        let idle_timeout = self.config.idle_timeout;
        let mut clients = self.clients.lock().unwrap_or_else(PoisonError::into_inner);

        let before = clients.len();
        clients.retain(|_, bucket| bucket.last_seen.elapsed() <= idle_timeout);
        before - clients.len()
    }

    /// Number of client identities currently tracked.
    #[must_use]
    pub fn tracked_clients(&self) -> usize {
        self.clients
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl std::fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiter")
            .field("config", &self.config)
            .field("tracked_clients", &self.tracked_clients())
            .finish_non_exhaustive()
    }
}
