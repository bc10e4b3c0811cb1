//! Project CRUD.

use axum::extract::{Path, State};
use axum::Json;
use database::validation::{require_fields, validate_color, validate_new_project};
use database::{project, NewProject, Project, ProjectPatch};
use serde::{Deserialize, Serialize};

use crate::error::{ApiError, Result};
use crate::routes::Ack;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct ProjectResponse {
    pub success: bool,
    pub project: Project,
}

/// List projects in insertion order.
pub async fn list_projects(State(state): State<AppState>) -> Result<Json<Vec<Project>>> {
    let db = state.store()?;
    Ok(Json(project::list_projects(db.pool()).await?))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProject {
    pub project_id: Option<String>,
    pub name: Option<String>,
    pub color: Option<String>,
    pub icon: Option<String>,
    pub description: Option<String>,
}

/// Create a project. A duplicate id is a 409.
pub async fn create_project(
    State(state): State<AppState>,
    Json(body): Json<CreateProject>,
) -> Result<Json<ProjectResponse>> {
    let db = state.store()?;
    require_fields(&[
        ("projectId", body.project_id.as_deref()),
        ("name", body.name.as_deref()),
        ("color", body.color.as_deref()),
    ])?;
    let (Some(project_id), Some(name), Some(color)) = (body.project_id, body.name, body.color) else {
        return Err(ApiError::BadRequest("Missing required fields".to_string()));
    };

    let new = NewProject {
        project_id: project_id.trim().to_string(),
        name,
        color: color.trim().to_string(),
        icon: body.icon,
        description: body.description,
    };
    validate_new_project(&new)?;

    let created = project::create_project(db.pool(), &new).await?;
    state.changed();

    Ok(Json(ProjectResponse {
        success: true,
        project: created,
    }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProject {
    pub project_id: Option<String>,
    #[serde(flatten)]
    pub patch: ProjectPatch,
}

/// Patch a project. A missing id is a 404.
pub async fn update_project(
    State(state): State<AppState>,
    Json(body): Json<UpdateProject>,
) -> Result<Json<ProjectResponse>> {
    let db = state.store()?;
    require_fields(&[("projectId", body.project_id.as_deref())])?;
    let Some(project_id) = body.project_id else {
        return Err(ApiError::BadRequest("Missing projectId".to_string()));
    };
    if let Some(color) = &body.patch.color {
        validate_color(color)?;
    }

    let updated = project::update_project(db.pool(), &project_id, &body.patch).await?;
    state.changed();

    Ok(Json(ProjectResponse {
        success: true,
        project: updated,
    }))
}

/// Delete a project. Tasks that point at it keep the dangling id.
pub async fn delete_project(
    State(state): State<AppState>,
    Path(project_id): Path<String>,
) -> Result<Json<Ack>> {
    let db = state.store()?;
    let deleted = project::delete_project(db.pool(), &project_id).await?;
    if deleted {
        tracing::info!(project_id, "Deleted project");
        state.changed();
    }

    Ok(Json(Ack::from_applied(deleted)))
}

#[cfg(test)]
mod tests {
    use crate::routes::test_util::{app, do_delete, do_get, do_post};
    use crate::state::test_support::test_state;
    use axum::http::StatusCode;
    use database::task;
    use serde_json::json;

    fn katana() -> serde_json::Value {
        json!({"projectId": "katana", "name": "Katana", "color": "#5e6ad2", "icon": "⚔️"})
    }

    #[tokio::test]
    async fn test_create_duplicate_and_list() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(dir.path()).await;

        let (status, body) = do_post(app(state.clone()), "/api/projects", katana()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["project"]["projectId"], "katana");

        let (status, body) = do_post(app(state.clone()), "/api/projects", katana()).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"], "Project katana already exists");

        let (status, body) = do_get(app(state), "/api/projects").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_create_validates_input() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(dir.path()).await;

        let (status, body) =
            do_post(app(state.clone()), "/api/projects", json!({"projectId": "x"})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Missing required fields: name, color");

        let (status, _) = do_post(
            app(state),
            "/api/projects",
            json!({"projectId": "x", "name": "X", "color": "blue"}),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_update_missing_project_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(dir.path()).await;

        let (status, body) = do_post(
            app(state.clone()),
            "/api/projects/update",
            json!({"projectId": "nope", "name": "Nope"}),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Project nope not found");

        do_post(app(state.clone()), "/api/projects", katana()).await;
        let (status, body) = do_post(
            app(state),
            "/api/projects/update",
            json!({"projectId": "katana", "color": "#000"}),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["project"]["color"], "#000");
        assert_eq!(body["project"]["name"], "Katana");
    }

    #[tokio::test]
    async fn test_delete_does_not_cascade() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(dir.path()).await;
        do_post(app(state.clone()), "/api/projects", katana()).await;
        do_post(
            app(state.clone()),
            "/api/tasks/create",
            json!({"title": "In katana", "assignee": "kat", "priority": "medium",
                   "createdBy": "main", "projectId": "katana"}),
        )
        .await;

        let (_, body) = do_delete(app(state.clone()), "/api/projects/katana").await;
        assert_eq!(body["success"], true);

        let stored = task::get_task(state.store().unwrap().pool(), "task-001")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.project_id.as_deref(), Some("katana"));

        let (_, body) = do_delete(app(state), "/api/projects/katana").await;
        assert_eq!(body["success"], false);
    }
}
