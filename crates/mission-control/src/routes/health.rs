//! Health check endpoint.

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::state::AppState;

#[derive(Serialize)]
pub struct Health {
    pub status: String,
    /// Whether an entity store is attached.
    pub store: bool,
    pub updates: &'static str,
    /// Store changes signalled since startup.
    pub changes: u64,
}

/// Health check endpoint.
pub async fn health(State(state): State<AppState>) -> Json<Health> {
    Json(Health {
        status: "ok".to_string(),
        store: state.db.is_some(),
        updates: state.source.mode().as_str(),
        changes: state.notifier.version(),
    })
}
