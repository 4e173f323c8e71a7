pub mod availability;
pub mod contacts;
pub mod credits;
pub mod health;
pub mod jobs;
pub mod messages;
pub mod push;
pub mod templates;

use axum::Router;

use crate::state::AppState;

/// Build the complete API router with all routes.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .merge(health::router())
        .merge(messages::router())
        .merge(contacts::router())
        .merge(push::router())
        .merge(availability::router())
        .merge(templates::router())
        .merge(jobs::router())
        .merge(credits::router())
        .with_state(state)
}
