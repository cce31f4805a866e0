use axum::{extract::State, response::Json};
use serde::Serialize;
use utoipa::ToSchema;

use crate::AppState;

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthStatus {
    pub status: &'static str,
    pub database: &'static str,
    pub version: &'static str,
}

/// Liveness/readiness probe. Reports degraded when the database does not
/// answer a ping.
pub async fn health(State(state): State<AppState>) -> Json<HealthStatus> {
    let database = if crate::db::check_health(&state.db).await {
        "ok"
    } else {
        "unreachable"
    };

    Json(HealthStatus {
        status: if database == "ok" { "ok" } else { "degraded" },
        database,
        version: env!("CARGO_PKG_VERSION"),
    })
}
