//! Reconciliation trigger.

use axum::extract::State;
use axum::Json;
use serde::Serialize;
use snapshot::SourcePaths;

use crate::error::Result;
use crate::reconcile::{reconcile, ReconcileReport};
use crate::state::AppState;

#[derive(Serialize)]
pub struct SyncPaths {
    pub message: &'static str,
    pub paths: SourcePaths,
}

#[derive(Serialize)]
pub struct SyncResponse {
    pub success: bool,
    pub synced: ReconcileReport,
}

/// Report where the reconciler reads from.
pub async fn sync_paths(State(state): State<AppState>) -> Json<SyncPaths> {
    Json(SyncPaths {
        message: "POST to this endpoint to trigger sync",
        paths: state.paths.as_ref().clone(),
    })
}

/// Run a full reconciliation.
pub async fn run_sync(State(state): State<AppState>) -> Result<Json<SyncResponse>> {
    let db = state.store()?;
    let report = reconcile(db, state.catalog.clone(), state.paths.clone()).await?;
    state.changed();

    Ok(Json(SyncResponse {
        success: true,
        synced: report,
    }))
}
