//! RosterRelay API server binary entrypoint.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use roster_channels::gateway::NotificationGateway;
use roster_common::config::AppConfig;
use roster_common::db::create_pool;
use roster_common::redis_pool::create_redis_pool;
use roster_engine::batcher::DispatchBatcher;

use roster_api::routes::create_router;
use roster_api::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new("roster_api=debug,roster_engine=debug,tower_http=debug")
        }))
        .init();

    tracing::info!("Starting RosterRelay API server...");

    // Load configuration
    let config = AppConfig::from_env()?;

    // Create database connection pool
    let pool = create_pool(&config.database_url, config.db_max_connections).await?;
    tracing::info!("Database pool created");

    // Create Redis connection
    let redis = create_redis_pool(&config.redis_url).await?;
    tracing::info!("Redis connection established");

    // Initialize delivery channels; channels with missing credentials log a
    // warning and stay disabled for the process lifetime
    let gateway = Arc::new(NotificationGateway::from_config(&config));

    let batcher = Arc::new(DispatchBatcher::new(
        pool.clone(),
        redis.clone(),
        Arc::clone(&gateway),
        config.dispatch_batch_size,
        Duration::from_secs(config.dispatch_batch_interval_secs),
    ));

    // Build application state
    let state = AppState::new(pool, redis, config, gateway, batcher);

    // Build router
    let app = create_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], 3000));
    tracing::info!("API server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
