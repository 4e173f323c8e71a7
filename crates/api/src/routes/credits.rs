//! Credit balance route.

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;

use roster_common::error::AppError;
use roster_engine::ledger::CreditLedger;

use crate::middleware::auth::AuthAdmin;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/api/credits", get(get_balance))
}

/// GET /api/credits — Current send credit balance for the organization.
async fn get_balance(
    State(state): State<AppState>,
    auth: AuthAdmin,
) -> Result<Json<serde_json::Value>, AppError> {
    let balance = CreditLedger::balance(&state.pool, auth.org_id).await?;
    Ok(Json(json!({ "balance": balance })))
}
