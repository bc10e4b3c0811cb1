//! Task mutations.
//!
//! The store is the source for the board, but `tasks.json` is what the next
//! reconciliation reads. Every mutation is therefore mirrored into the file
//! so a later sync does not undo it.

use axum::extract::State;
use axum::Json;
use database::patch::double_option;
use database::time::now_millis;
use database::validation::{require_fields, validate_new_task, validate_note, validate_title};
use database::{task, NewTask, Priority, Task, TaskPatch, TaskStatus};
use serde::{Deserialize, Serialize};
use snapshot::tasks_file::{append_task, remove_task_from_file, update_task_in_file};
use snapshot::{SnapshotError, TaskInput};

use crate::error::{ApiError, Result};
use crate::routes::Ack;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct TaskResponse {
    pub success: bool,
    pub task: Task,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTask {
    pub title: Option<String>,
    pub description: Option<String>,
    pub assignee: Option<String>,
    pub project_id: Option<String>,
    pub status: Option<TaskStatus>,
    pub priority: Option<Priority>,
    pub created_by: Option<String>,
}

/// Create a task: allocate the next `task-NNN` id, append it to the tasks
/// file, then insert it into the store. A failed insert takes the file
/// entry back out.
pub async fn create_task(
    State(state): State<AppState>,
    Json(body): Json<CreateTask>,
) -> Result<Json<TaskResponse>> {
    let db = state.store()?;
    require_fields(&[
        ("title", body.title.as_deref()),
        ("assignee", body.assignee.as_deref()),
        ("priority", body.priority.map(|p| p.as_str())),
        ("createdBy", body.created_by.as_deref()),
    ])?;
    let (Some(title), Some(assignee), Some(priority), Some(created_by)) =
        (body.title, body.assignee, body.priority, body.created_by)
    else {
        return Err(ApiError::BadRequest("Missing required fields".to_string()));
    };

    let mut new = NewTask {
        task_id: String::new(),
        title,
        description: body.description.filter(|d| !d.is_empty()),
        assignee,
        project_id: body.project_id.filter(|p| !p.is_empty()),
        status: body.status.unwrap_or(TaskStatus::Todo),
        priority,
        created_by,
    };
    validate_new_task(&new)?;
    let input = TaskInput {
        title: new.title.clone(),
        description: new.description.clone(),
        assignee: new.assignee.clone(),
        project_id: new.project_id.clone(),
        status: Some(new.status),
        priority: new.priority,
        created_by: new.created_by.clone(),
    };

    let _guard = state.tasks_file_lock.lock().await;
    let known_ids = task::list_task_ids(db.pool()).await?;

    let path = state.paths.tasks_file.clone();
    let record = tokio::task::spawn_blocking(move || {
        append_task(&path, &input, &known_ids, now_millis())
    })
    .await
    .map_err(|e| ApiError::Internal(format!("tasks file writer panicked: {e}")))??;
    new.task_id = record.id;

    let created = match task::create_task(db.pool(), &new).await {
        Ok(created) => created,
        Err(e) => {
            remove_from_file(&state, &new.task_id).await;
            return Err(e.into());
        }
    };
    state.changed();

    Ok(Json(TaskResponse {
        success: true,
        task: created,
    }))
}

/// Fields a client may edit. Lifecycle timestamps follow `status`, and
/// notes only grow through the note route.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTask {
    pub task_id: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub assignee: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub project_id: Option<Option<String>>,
    pub status: Option<TaskStatus>,
    pub priority: Option<Priority>,
}

impl UpdateTask {
    fn into_parts(self) -> (Option<String>, TaskPatch) {
        let patch = TaskPatch {
            title: self.title,
            description: self.description,
            assignee: self.assignee,
            project_id: self.project_id,
            status: self.status,
            priority: self.priority,
            ..Default::default()
        };
        (self.task_id, patch)
    }
}

/// Partial update. Fails with 404 when the task is not stored.
pub async fn update_task(
    State(state): State<AppState>,
    Json(body): Json<UpdateTask>,
) -> Result<Json<TaskResponse>> {
    let db = state.store()?;
    let (task_id, patch) = body.into_parts();
    let task_id = required_task_id(task_id)?;
    if let Some(title) = &patch.title {
        validate_title(title)?;
    }

    let updated = task::update_task(db.pool(), &task_id, &patch).await?;
    mirror_to_file(&state, &task_id, patch).await;
    state.changed();

    Ok(Json(TaskResponse {
        success: true,
        task: updated,
    }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusChange {
    pub task_id: Option<String>,
    pub status: TaskStatus,
}

/// Move a task to another column. Missing tasks are a no-op.
pub async fn update_status(
    State(state): State<AppState>,
    Json(body): Json<StatusChange>,
) -> Result<Json<Ack>> {
    let db = state.store()?;
    let task_id = required_task_id(body.task_id)?;

    let applied = task::update_task_status(db.pool(), &task_id, body.status).await?;
    if applied {
        let patch = TaskPatch {
            status: Some(body.status),
            ..Default::default()
        };
        mirror_to_file(&state, &task_id, patch).await;
        state.changed();
    }

    Ok(Json(Ack::from_applied(applied)))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteBody {
    pub task_id: Option<String>,
    pub note: String,
}

/// Append one note. Missing tasks are a no-op.
pub async fn add_note(
    State(state): State<AppState>,
    Json(body): Json<NoteBody>,
) -> Result<Json<Ack>> {
    let db = state.store()?;
    let task_id = required_task_id(body.task_id)?;
    validate_note(&body.note)?;

    let applied = task::add_note(db.pool(), &task_id, &body.note).await?;
    if applied {
        if let Some(stored) = task::get_task(db.pool(), &task_id).await? {
            let patch = TaskPatch {
                notes: Some(stored.notes),
                ..Default::default()
            };
            mirror_to_file(&state, &task_id, patch).await;
        }
        state.changed();
    }

    Ok(Json(Ack::from_applied(applied)))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectAssignment {
    pub task_id: Option<String>,
    /// `null` or absent unassigns.
    #[serde(default)]
    pub project_id: Option<String>,
}

/// Link a task to a project or unlink it. Missing tasks are a no-op.
pub async fn assign_project(
    State(state): State<AppState>,
    Json(body): Json<ProjectAssignment>,
) -> Result<Json<Ack>> {
    let db = state.store()?;
    let task_id = required_task_id(body.task_id)?;
    let project_id = body.project_id.filter(|p| !p.trim().is_empty());

    let applied = task::assign_project(db.pool(), &task_id, project_id.as_deref()).await?;
    if applied {
        let patch = TaskPatch {
            project_id: Some(project_id),
            ..Default::default()
        };
        mirror_to_file(&state, &task_id, patch).await;
        state.changed();
    }

    Ok(Json(Ack::from_applied(applied)))
}

fn required_task_id(task_id: Option<String>) -> Result<String> {
    require_fields(&[("taskId", task_id.as_deref())])?;
    task_id.ok_or_else(|| ApiError::BadRequest("Missing taskId".to_string()))
}

/// Best effort: the store write already succeeded, so file problems are only
/// logged. Tasks that came from the beads log are not in the file at all.
async fn mirror_to_file(state: &AppState, task_id: &str, patch: TaskPatch) {
    let _guard = state.tasks_file_lock.lock().await;
    let path = state.paths.tasks_file.clone();
    let id = task_id.to_string();
    let result =
        tokio::task::spawn_blocking(move || update_task_in_file(&path, &id, &patch, now_millis()))
            .await;

    match result {
        Ok(Ok(_)) => {}
        Ok(Err(SnapshotError::TaskNotFound(_))) => {
            tracing::debug!(task_id, "Task not in tasks file, store-only update")
        }
        Ok(Err(e)) => tracing::warn!(task_id, error = %e, "Failed to mirror task into tasks file"),
        Err(e) => tracing::warn!(task_id, error = %e, "Tasks file writer panicked"),
    }
}

/// Undo an append whose store insert failed. Runs under the caller's lock.
async fn remove_from_file(state: &AppState, task_id: &str) {
    let path = state.paths.tasks_file.clone();
    let id = task_id.to_string();
    let result = tokio::task::spawn_blocking(move || remove_task_from_file(&path, &id)).await;

    match result {
        Ok(Ok(_)) => tracing::debug!(task_id, "Rolled back tasks file append"),
        Ok(Err(e)) => tracing::warn!(task_id, error = %e, "Failed to roll back tasks file append"),
        Err(e) => tracing::warn!(task_id, error = %e, "Tasks file writer panicked"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::test_util::{app, do_post};
    use crate::state::test_support::{state_with, test_state};
    use axum::http::StatusCode;
    use serde_json::json;
    use snapshot::tasks_file::load_task_records;

    fn create_body(title: &str) -> serde_json::Value {
        json!({
            "title": title,
            "assignee": "builder",
            "priority": "high",
            "createdBy": "main",
        })
    }

    #[tokio::test]
    async fn test_create_task_writes_file_and_store() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(dir.path()).await;

        let (status, body) = do_post(app(state.clone()), "/api/tasks/create", create_body("First")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["task"]["taskId"], "task-001");
        assert_eq!(body["task"]["status"], "todo");

        let (_, body) = do_post(app(state.clone()), "/api/tasks/create", create_body("Second")).await;
        assert_eq!(body["task"]["taskId"], "task-002");

        let records = load_task_records(&state.paths.tasks_file);
        let ids: Vec<_> = records.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["task-001", "task-002"]);

        let stored = task::get_task(state.store().unwrap().pool(), "task-002")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.title, "Second");
        assert_eq!(state.notifier.version(), 2);
    }

    #[tokio::test]
    async fn test_create_task_reports_missing_fields() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(dir.path()).await;

        let (status, body) = do_post(
            app(state.clone()),
            "/api/tasks/create",
            json!({"title": "No owner", "priority": "low"}),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Missing required fields: assignee, createdBy");
        assert!(!state.paths.tasks_file.exists());
    }

    #[tokio::test]
    async fn test_store_not_configured_short_circuits() {
        let dir = tempfile::tempdir().unwrap();
        let state = state_with(None, dir.path());

        let (status, body) = do_post(app(state.clone()), "/api/tasks/create", create_body("x")).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "Entity store not configured");
        assert!(!state.paths.tasks_file.exists());
    }

    #[tokio::test]
    async fn test_update_sets_claimed_at_once() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(dir.path()).await;
        do_post(app(state.clone()), "/api/tasks/create", create_body("Claim me")).await;

        let (status, body) = do_post(
            app(state.clone()),
            "/api/tasks/update",
            json!({"taskId": "task-001", "status": "in-progress", "projectId": "katana"}),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let claimed_at = body["task"]["claimedAt"].as_str().unwrap().to_string();
        assert_eq!(body["task"]["projectId"], "katana");

        do_post(
            app(state.clone()),
            "/api/tasks/status",
            json!({"taskId": "task-001", "status": "todo"}),
        )
        .await;
        let (_, body) = do_post(
            app(state.clone()),
            "/api/tasks/update",
            json!({"taskId": "task-001", "status": "in-progress"}),
        )
        .await;
        assert_eq!(body["task"]["claimedAt"], claimed_at.as_str());

        let record = load_task_records(&state.paths.tasks_file).remove(0);
        assert_eq!(record.status.as_deref(), Some("in-progress"));
        assert_eq!(record.project_id.as_deref(), Some("katana"));
        assert!(record.claimed_at.is_some());
    }

    #[tokio::test]
    async fn test_update_ignores_lifecycle_and_notes_fields() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(dir.path()).await;
        do_post(app(state.clone()), "/api/tasks/create", create_body("Guarded")).await;
        do_post(
            app(state.clone()),
            "/api/tasks/note",
            json!({"taskId": "task-001", "note": "keep me"}),
        )
        .await;
        let (_, body) = do_post(
            app(state.clone()),
            "/api/tasks/status",
            json!({"taskId": "task-001", "status": "in-progress"}),
        )
        .await;
        assert_eq!(body["success"], true);

        let pool = state.store().unwrap().pool().clone();
        let before = task::get_task(&pool, "task-001").await.unwrap().unwrap();

        let (status, body) = do_post(
            app(state.clone()),
            "/api/tasks/update",
            json!({
                "taskId": "task-001",
                "title": "Renamed",
                "claimedAt": 1,
                "completedAt": 2,
                "notes": [],
                "createdBy": "intruder",
                "blockedReason": "because",
            }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["task"]["title"], "Renamed");
        assert!(body["task"]["completedAt"].is_null());

        let after = task::get_task(&pool, "task-001").await.unwrap().unwrap();
        assert_eq!(after.claimed_at, before.claimed_at);
        assert_eq!(after.completed_at, None);
        assert_eq!(after.notes, vec!["keep me"]);
        assert_eq!(after.created_by, "main");
        assert_eq!(after.blocked_reason, None);

        let record = load_task_records(&state.paths.tasks_file).remove(0);
        assert_eq!(record.title.as_deref(), Some("Renamed"));
        assert_eq!(record.notes, Some(vec!["keep me".to_string()]));
        assert_eq!(record.completed_at, None);
        assert_eq!(record.created_by.as_deref(), Some("main"));
    }

    #[tokio::test]
    async fn test_failed_insert_leaves_file_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(dir.path()).await;
        do_post(app(state.clone()), "/api/tasks/create", create_body("Kept")).await;
        let before = std::fs::read_to_string(&state.paths.tasks_file).unwrap();

        let pool = state.store().unwrap().pool().clone();
        sqlx::query(
            "CREATE TRIGGER reject_tasks BEFORE INSERT ON tasks \
             BEGIN SELECT RAISE(ABORT, 'insert rejected'); END",
        )
        .execute(&pool)
        .await
        .unwrap();

        let (status, _) = do_post(app(state.clone()), "/api/tasks/create", create_body("Lost")).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);

        let records = load_task_records(&state.paths.tasks_file);
        let ids: Vec<_> = records.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["task-001"]);
        assert_eq!(std::fs::read_to_string(&state.paths.tasks_file).unwrap(), before);
        assert_eq!(task::list_task_ids(&pool).await.unwrap(), vec!["task-001"]);
        assert_eq!(state.notifier.version(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_creates_get_distinct_ids() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(dir.path()).await;

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let router = app(state.clone());
                tokio::spawn(async move {
                    do_post(router, "/api/tasks/create", create_body(&format!("Task {i}"))).await
                })
            })
            .collect();

        let mut ids = Vec::new();
        for handle in handles {
            let (status, body) = handle.await.unwrap();
            assert_eq!(status, StatusCode::OK);
            ids.push(body["task"]["taskId"].as_str().unwrap().to_string());
        }
        ids.sort();
        let expected: Vec<_> = (1..=8).map(|n| format!("task-{n:03}")).collect();
        assert_eq!(ids, expected);

        let mut file_ids: Vec<_> = load_task_records(&state.paths.tasks_file)
            .into_iter()
            .map(|r| r.id)
            .collect();
        file_ids.sort();
        assert_eq!(file_ids, expected);

        let mut stored = task::list_task_ids(state.store().unwrap().pool()).await.unwrap();
        stored.sort();
        assert_eq!(stored, expected);
    }

    #[tokio::test]
    async fn test_update_missing_task_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(dir.path()).await;

        let (status, body) = do_post(
            app(state),
            "/api/tasks/update",
            json!({"taskId": "task-404", "title": "Nope"}),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Task task-404 not found");
    }

    #[tokio::test]
    async fn test_status_note_and_project_on_missing_task_are_noops() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(dir.path()).await;

        for (uri, body) in [
            ("/api/tasks/status", json!({"taskId": "ghost", "status": "done"})),
            ("/api/tasks/note", json!({"taskId": "ghost", "note": "hello"})),
            ("/api/tasks/project", json!({"taskId": "ghost", "projectId": "katana"})),
        ] {
            let (status, body) = do_post(app(state.clone()), uri, body).await;
            assert_eq!(status, StatusCode::OK, "{uri}");
            assert_eq!(body["success"], false, "{uri}");
        }
        assert_eq!(state.notifier.version(), 0);
    }

    #[tokio::test]
    async fn test_notes_append_and_project_unassign() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(dir.path()).await;
        do_post(app(state.clone()), "/api/tasks/create", create_body("Noted")).await;

        for note in ["first", "first"] {
            let (_, body) = do_post(
                app(state.clone()),
                "/api/tasks/note",
                json!({"taskId": "task-001", "note": note}),
            )
            .await;
            assert_eq!(body["success"], true);
        }

        do_post(
            app(state.clone()),
            "/api/tasks/project",
            json!({"taskId": "task-001", "projectId": "katana"}),
        )
        .await;
        let (_, body) = do_post(
            app(state.clone()),
            "/api/tasks/project",
            json!({"taskId": "task-001", "projectId": null}),
        )
        .await;
        assert_eq!(body["success"], true);

        let stored = task::get_task(state.store().unwrap().pool(), "task-001")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.notes, vec!["first", "first"]);
        assert_eq!(stored.project_id, None);

        let record = load_task_records(&state.paths.tasks_file).remove(0);
        assert_eq!(record.notes, Some(vec!["first".to_string(), "first".to_string()]));
        assert_eq!(record.project_id, None);
    }
}
