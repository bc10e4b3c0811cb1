//! Route handlers for Mission Control.

pub mod agents;
pub mod board;
pub mod dashboard;
pub mod health;
pub mod messages;
pub mod projects;
pub mod sessions;
pub mod stats;
pub mod sync;
pub mod tasks;

use axum::routing::{delete, get, post};
use axum::Router;
use serde::Serialize;

use crate::state::AppState;

/// Body returned by mutations that only report whether they did anything.
#[derive(Debug, Serialize)]
pub struct Ack {
    pub success: bool,
}

impl Ack {
    pub fn from_applied(applied: bool) -> Self {
        Self { success: applied }
    }
}

/// Build the router with all routes.
pub fn router() -> Router<AppState> {
    Router::new()
        // HTML pages
        .route("/", get(board::board_page))
        // Health check
        .route("/health", get(health::health))
        // Dashboard
        .route("/api/dashboard", get(dashboard::dashboard_api))
        .route("/api/dashboard/stream", get(dashboard::dashboard_stream))
        // Reconciliation
        .route("/api/sync", get(sync::sync_paths).post(sync::run_sync))
        .route("/api/seed", post(agents::seed))
        // Agents
        .route("/api/agent/:id", get(agents::agent_detail))
        .route("/api/agents/status", post(agents::update_status))
        .route("/api/agents/:id", delete(agents::delete_agent))
        // Tasks
        .route("/api/tasks/create", post(tasks::create_task))
        .route("/api/tasks/update", post(tasks::update_task))
        .route("/api/tasks/status", post(tasks::update_status))
        .route("/api/tasks/note", post(tasks::add_note))
        .route("/api/tasks/project", post(tasks::assign_project))
        // Projects
        .route(
            "/api/projects",
            get(projects::list_projects).post(projects::create_project),
        )
        .route("/api/projects/update", post(projects::update_project))
        .route("/api/projects/:id", delete(projects::delete_project))
        // Sessions
        .route("/api/sessions/update", post(sessions::update_session))
        // Stats
        .route("/api/agent-stats", get(stats::agent_stats))
        .route("/api/agent-stats/increment", post(stats::increment))
        // Messages
        .route(
            "/api/messages",
            get(messages::list_messages).post(messages::send_message),
        )
}
