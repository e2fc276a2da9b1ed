//! Background maintenance: idle rate-limit bucket eviction and expired cache
//! entry purging.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::admission::RateLimiter;
use crate::feed::ResponseCache;

/// Run a single maintenance cycle.
fn sweep_once(limiter: &RateLimiter, cache: Option<&ResponseCache>) {
    let evicted = limiter.sweep();
    if evicted > 0 {
        tracing::debug!(
            evicted_clients = evicted,
            tracked_clients = limiter.tracked_clients(),
            "Evicted idle rate limit buckets"
        );
    }

    if let Some(cache) = cache {
        let purged = cache.purge_expired();
        if purged > 0 {
            tracing::debug!(purged_entries = purged, "Purged expired cache entries");
        }
    }
}

/// Run the maintenance worker every `interval` until `shutdown` fires.
pub async fn run_maintenance_worker(
    limiter: Arc<RateLimiter>,
    cache: Option<Arc<ResponseCache>>,
    interval: Duration,
    shutdown: CancellationToken,
) {
    tracing::info!(
        interval_secs = interval.as_secs(),
        idle_timeout_secs = limiter.config().idle_timeout.as_secs(),
        "Starting maintenance worker"
    );

    let mut ticker = tokio::time::interval(interval);
    ticker.tick().await; // first tick is immediate and the registry starts empty

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                sweep_once(&limiter, cache.as_deref());
            }
            () = shutdown.cancelled() => {
                tracing::info!("Maintenance worker shutting down");
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RateLimitConfig;

    #[tokio::test(start_paused = true)]
    async fn test_worker_sweeps_and_stops() {
        let limiter = Arc::new(RateLimiter::new(RateLimitConfig {
            idle_timeout: Duration::from_millis(1),
            ..RateLimitConfig::default()
        }));
        let cache = Arc::new(ResponseCache::new());
        cache.put("stale", &1, Duration::ZERO);

        limiter.allow("10.0.0.1");
        std::thread::sleep(Duration::from_millis(5));

        let shutdown = CancellationToken::new();
        let worker = tokio::spawn(run_maintenance_worker(
            Arc::clone(&limiter),
            Some(Arc::clone(&cache)),
            Duration::from_secs(60),
            shutdown.clone(),
        ));

        tokio::time::sleep(Duration::from_secs(61)).await;
        assert_eq!(limiter.tracked_clients(), 0);
        assert!(cache.is_empty());

        shutdown.cancel();
        worker.await.unwrap();
    }
}
