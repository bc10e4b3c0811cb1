//! Agent routes: workspace detail, status updates, deletion and seeding.

use axum::extract::{Path, State};
use axum::Json;
use database::time::now_millis;
use database::validation::require_fields;
use database::{agent, project, AgentStatus};
use serde::{Deserialize, Serialize};
use snapshot::workspace::load_agent_detail;
use snapshot::AgentDetail;

use crate::error::{ApiError, Result};
use crate::routes::Ack;
use crate::state::AppState;

/// Read an agent's workspace straight from disk. Works without a store.
pub async fn agent_detail(
    State(state): State<AppState>,
    Path(agent_id): Path<String>,
) -> Result<Json<AgentDetail>> {
    let paths = state.paths.clone();
    let catalog = state.catalog.clone();
    let id = agent_id.clone();

    let detail = tokio::task::spawn_blocking(move || {
        load_agent_detail(&paths, &catalog, &id, now_millis())
    })
    .await
    .map_err(|e| ApiError::Internal(format!("agent detail reader panicked: {e}")))?;

    detail
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Agent {agent_id} not found")))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusUpdate {
    pub agent_id: Option<String>,
    pub status: Option<AgentStatus>,
    /// RFC 3339 or epoch milliseconds.
    #[serde(default, with = "database::time::rfc3339_millis::option")]
    pub last_activity: Option<i64>,
    pub current_task: Option<String>,
}

/// Patch status, activity time and current task. Unknown agents are a
/// no-op reported as `success: false`.
pub async fn update_status(
    State(state): State<AppState>,
    Json(body): Json<StatusUpdate>,
) -> Result<Json<Ack>> {
    let db = state.store()?;
    let status_name = body.status.map(|s| s.as_str());
    require_fields(&[
        ("agentId", body.agent_id.as_deref()),
        ("status", status_name),
    ])?;
    let (Some(agent_id), Some(status)) = (body.agent_id, body.status) else {
        return Err(ApiError::BadRequest("agentId and status are required".to_string()));
    };

    let applied = agent::update_agent_status(
        db.pool(),
        &agent_id,
        status,
        body.last_activity,
        body.current_task,
    )
    .await?;
    if applied {
        state.changed();
    }

    Ok(Json(Ack::from_applied(applied)))
}

/// Hard-delete an agent.
pub async fn delete_agent(
    State(state): State<AppState>,
    Path(agent_id): Path<String>,
) -> Result<Json<Ack>> {
    let db = state.store()?;
    let deleted = agent::delete_agent(db.pool(), &agent_id).await?;
    if deleted {
        tracing::info!(agent_id, "Deleted agent");
        state.changed();
    }

    Ok(Json(Ack::from_applied(deleted)))
}

#[derive(Debug, Serialize)]
pub struct SeedResponse {
    pub success: bool,
    pub agents: usize,
    pub projects: usize,
}

/// Insert the catalog's agents and projects that are not yet stored.
pub async fn seed(State(state): State<AppState>) -> Result<Json<SeedResponse>> {
    let db = state.store()?;
    let agents = agent::seed_agents(db.pool(), &state.catalog.seed_agents()).await?;
    let projects = project::seed_projects(db.pool(), &state.catalog.seed_projects()).await?;
    if agents + projects > 0 {
        state.changed();
    }

    Ok(Json(SeedResponse {
        success: true,
        agents,
        projects,
    }))
}
