//! Shared application state for the Axum API server.

use std::sync::Arc;

use redis::aio::ConnectionManager;
use sqlx::PgPool;

use roster_channels::gateway::NotificationGateway;
use roster_common::config::AppConfig;
use roster_engine::batcher::DispatchBatcher;

/// Application state shared across all route handlers via Axum `State`.
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub redis: ConnectionManager,
    pub config: AppConfig,
    pub gateway: Arc<NotificationGateway>,
    pub batcher: Arc<DispatchBatcher>,
}

impl AppState {
    pub fn new(
        pool: PgPool,
        redis: ConnectionManager,
        config: AppConfig,
        gateway: Arc<NotificationGateway>,
        batcher: Arc<DispatchBatcher>,
    ) -> Self {
        Self {
            pool,
            redis,
            config,
            gateway,
            batcher,
        }
    }
}
