use std::sync::Arc;

use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use chirp_api::admission::RateLimiter;
use chirp_api::config::Config;
use chirp_api::db::Database;
use chirp_api::feed::ResponseCache;
use chirp_api::maintenance::run_maintenance_worker;
use chirp_api::notify::NotificationBroker;
use chirp_api::service::{CacheTtls, SocialService};
use chirp_api::web::{self, AppState};

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {e:#}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    init_tracing()?;

    info!("Starting chirp-api");

    let config = Config::from_env().context("Failed to load configuration")?;
    config.validate().context("Invalid configuration")?;

    info!(
        database = %config.database_path.display(),
        rate_per_second = config.rate_limit.per_second,
        burst = config.rate_limit.burst,
        cache_enabled = config.cache_enabled,
        "Configuration loaded"
    );

    let db = Database::new(&config.database_path)
        .await
        .context("Failed to initialize database")?;

    info!("Database initialized");

    let broker = Arc::new(NotificationBroker::new(config.mailbox_capacity));
    let cache = config.cache_enabled.then(|| Arc::new(ResponseCache::new()));

    let mut service = SocialService::new(db, Arc::clone(&broker));
    if let Some(cache) = &cache {
        service = service.with_cache(
            Arc::clone(cache),
            CacheTtls {
                global_feed: config.feed_cache_ttl,
                trending: config.trending_cache_ttl,
            },
        );
    }

    let limiter = Arc::new(RateLimiter::new(config.rate_limit));
    let shutdown = CancellationToken::new();

    let maintenance_handle = tokio::spawn(run_maintenance_worker(
        Arc::clone(&limiter),
        cache,
        config.rate_limit.sweep_interval,
        shutdown.clone(),
    ));

    let state = AppState {
        service,
        config: Arc::new(config),
        limiter,
        shutdown: shutdown.clone(),
    };

    let web_handle = tokio::spawn(async move {
        if let Err(e) = web::serve(state).await {
            error!("Web server error: {e:#}");
        }
    });

    shutdown_signal().await;

    info!("Shutting down...");
    shutdown.cancel();

    if let Err(e) = web_handle.await {
        error!("Web server task failed: {e}");
    }
    if let Err(e) = maintenance_handle.await {
        error!("Maintenance task failed: {e}");
    }

    info!("Shutdown complete");

    Ok(())
}

fn init_tracing() -> Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,chirp_api=debug"));

    // Check if JSON logging is requested
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| matches!(v.to_lowercase().as_str(), "json" | "structured"))
        .unwrap_or(false);

    if use_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .try_init()
            .map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {e}"))?;
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .try_init()
            .map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {e}"))?;
    }

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}
