//! Task operations.

use sqlx::{FromRow, SqlitePool};

use crate::error::{DatabaseError, Result};
use crate::models::{NewTask, Priority, Task, TaskStatus};
use crate::patch::{apply_task_update, transition_status, TaskPatch};
use crate::time::now_millis;

#[derive(FromRow)]
struct TaskRow {
    task_id: String,
    title: String,
    description: Option<String>,
    assignee: String,
    project_id: Option<String>,
    status: TaskStatus,
    priority: Priority,
    created_by: String,
    created_at: i64,
    claimed_at: Option<i64>,
    completed_at: Option<i64>,
    blocked_reason: Option<String>,
    blocked_at: Option<i64>,
    notes: String,
}

impl TryFrom<TaskRow> for Task {
    type Error = DatabaseError;

    fn try_from(row: TaskRow) -> Result<Self> {
        let notes = serde_json::from_str(&row.notes)?;
        Ok(Task {
            task_id: row.task_id,
            title: row.title,
            description: row.description,
            assignee: row.assignee,
            project_id: row.project_id,
            status: row.status,
            priority: row.priority,
            created_by: row.created_by,
            created_at: row.created_at,
            claimed_at: row.claimed_at,
            completed_at: row.completed_at,
            blocked_reason: row.blocked_reason,
            blocked_at: row.blocked_at,
            notes,
        })
    }
}

const SELECT_TASK: &str = r#"
    SELECT task_id, title, description, assignee, project_id, status, priority, created_by,
           created_at, claimed_at, completed_at, blocked_reason, blocked_at, notes
    FROM tasks
"#;

fn collect(rows: Vec<TaskRow>) -> Result<Vec<Task>> {
    rows.into_iter().map(Task::try_from).collect()
}

/// List all tasks, newest first (reverse insertion order).
pub async fn list_tasks(pool: &SqlitePool) -> Result<Vec<Task>> {
    let rows = sqlx::query_as::<_, TaskRow>(&format!("{SELECT_TASK} ORDER BY id DESC"))
        .fetch_all(pool)
        .await?;

    collect(rows)
}

/// List tasks matching a single-parameter filter, newest first.
pub(crate) async fn list_tasks_where(
    pool: &SqlitePool,
    filter: &'static str,
    value: &str,
) -> Result<Vec<Task>> {
    let rows = sqlx::query_as::<_, TaskRow>(&format!("{SELECT_TASK} WHERE {filter} ORDER BY id DESC"))
        .bind(value)
        .fetch_all(pool)
        .await?;

    collect(rows)
}

pub async fn list_tasks_by_assignee(pool: &SqlitePool, assignee: &str) -> Result<Vec<Task>> {
    list_tasks_where(pool, "assignee = ?", assignee).await
}

pub async fn list_tasks_by_status(pool: &SqlitePool, status: TaskStatus) -> Result<Vec<Task>> {
    list_tasks_where(pool, "status = ?", status.as_str()).await
}

/// Look up a task by its natural key.
pub async fn get_task(pool: &SqlitePool, task_id: &str) -> Result<Option<Task>> {
    let row = sqlx::query_as::<_, TaskRow>(&format!("{SELECT_TASK} WHERE task_id = ?"))
        .bind(task_id)
        .fetch_optional(pool)
        .await?;

    row.map(Task::try_from).transpose()
}

pub(crate) async fn insert_task(pool: &SqlitePool, task: &Task) -> Result<()> {
    let notes = serde_json::to_string(&task.notes)?;
    sqlx::query(
        r#"
        INSERT INTO tasks (task_id, title, description, assignee, project_id, status, priority,
                           created_by, created_at, claimed_at, completed_at, blocked_reason,
                           blocked_at, notes)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&task.task_id)
    .bind(&task.title)
    .bind(&task.description)
    .bind(&task.assignee)
    .bind(&task.project_id)
    .bind(task.status)
    .bind(task.priority)
    .bind(&task.created_by)
    .bind(task.created_at)
    .bind(task.claimed_at)
    .bind(task.completed_at)
    .bind(&task.blocked_reason)
    .bind(task.blocked_at)
    .bind(notes)
    .execute(pool)
    .await
    .map_err(|e| DatabaseError::from_insert(e, "Task", &task.task_id))?;

    Ok(())
}

/// Overwrite every mutable column of an existing task. `created_at` is never
/// written after insert.
pub(crate) async fn write_task(pool: &SqlitePool, task: &Task) -> Result<()> {
    let notes = serde_json::to_string(&task.notes)?;
    sqlx::query(
        r#"
        UPDATE tasks
        SET title = ?, description = ?, assignee = ?, project_id = ?, status = ?, priority = ?,
            created_by = ?, claimed_at = ?, completed_at = ?, blocked_reason = ?, blocked_at = ?,
            notes = ?
        WHERE task_id = ?
        "#,
    )
    .bind(&task.title)
    .bind(&task.description)
    .bind(&task.assignee)
    .bind(&task.project_id)
    .bind(task.status)
    .bind(task.priority)
    .bind(&task.created_by)
    .bind(task.claimed_at)
    .bind(task.completed_at)
    .bind(&task.blocked_reason)
    .bind(task.blocked_at)
    .bind(notes)
    .bind(&task.task_id)
    .execute(pool)
    .await?;

    Ok(())
}

/// Create a task. `created_at` is now; lifecycle timestamps follow the
/// initial status.
pub async fn create_task(pool: &SqlitePool, new: &NewTask) -> Result<Task> {
    let now = now_millis();
    let mut task = Task {
        task_id: new.task_id.clone(),
        title: new.title.clone(),
        description: new.description.clone(),
        assignee: new.assignee.clone(),
        project_id: new.project_id.clone(),
        status: TaskStatus::Backlog,
        priority: new.priority,
        created_by: new.created_by.clone(),
        created_at: now,
        claimed_at: None,
        completed_at: None,
        blocked_reason: None,
        blocked_at: None,
        notes: Vec::new(),
    };
    transition_status(&mut task, new.status, now);
    insert_task(pool, &task).await?;

    tracing::info!(task_id = %task.task_id, assignee = %task.assignee, "Created task");
    Ok(task)
}

/// Apply a partial update to a task.
///
/// A status change stamps `claimed_at` / `completed_at` the first time only.
/// Fails with `NotFound` if the task does not exist.
pub async fn update_task(pool: &SqlitePool, task_id: &str, patch: &TaskPatch) -> Result<Task> {
    let existing = get_task(pool, task_id)
        .await?
        .ok_or_else(|| DatabaseError::NotFound {
            entity: "Task",
            id: task_id.to_string(),
        })?;

    let updated = apply_task_update(&existing, patch, now_millis());
    write_task(pool, &updated).await?;
    Ok(updated)
}

/// Change only the status of a task. A missing task is a silent no-op.
pub async fn update_task_status(
    pool: &SqlitePool,
    task_id: &str,
    status: TaskStatus,
) -> Result<bool> {
    let Some(mut task) = get_task(pool, task_id).await? else {
        return Ok(false);
    };

    transition_status(&mut task, status, now_millis());
    write_task(pool, &task).await?;
    Ok(true)
}

/// Append a note to a task. A missing task is a silent no-op.
pub async fn add_note(pool: &SqlitePool, task_id: &str, note: &str) -> Result<bool> {
    let Some(mut task) = get_task(pool, task_id).await? else {
        return Ok(false);
    };

    task.notes.push(note.to_string());
    write_task(pool, &task).await?;
    Ok(true)
}

/// Link a task to a project, or unlink it with `None`. A missing task is a
/// silent no-op. The project id is not checked against the projects table.
pub async fn assign_project(
    pool: &SqlitePool,
    task_id: &str,
    project_id: Option<&str>,
) -> Result<bool> {
    let result = sqlx::query(
        r#"
        UPDATE tasks
        SET project_id = ?
        WHERE task_id = ?
        "#,
    )
    .bind(project_id)
    .bind(task_id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// All task ids currently stored.
pub async fn list_task_ids(pool: &SqlitePool) -> Result<Vec<String>> {
    let ids = sqlx::query_scalar::<_, String>("SELECT task_id FROM tasks")
        .fetch_all(pool)
        .await?;

    Ok(ids)
}
