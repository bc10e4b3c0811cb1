//! The shared `tasks.json` document.
//!
//! Reads are lenient: a missing or malformed file is logged and treated as
//! having no tasks. Writes go through [`atomic_write`] and keep any fields
//! this crate does not know about.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use database::time::{parse_timestamp, to_rfc3339};
use database::{Priority, SyncTask, TaskPatch, TaskStatus};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Result, SnapshotError};

/// Prefix of allocated task ids.
pub const TASK_ID_PREFIX: &str = "task-";

/// Creator recorded when the file has none.
pub const UNKNOWN_CREATOR: &str = "unknown";

/// One task as stored in the file. Timestamps are ISO 8601 strings and
/// status/priority are kept raw so unknown values survive a rewrite.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskRecord {
    #[serde(default)]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignee: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub claimed_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blocked_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blocked_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<Vec<String>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl TaskRecord {
    /// Convert for the reconciler, filling defaults: status `backlog`,
    /// priority `none`, creator `unknown`. Records without an id are dropped.
    pub fn to_sync_task(&self) -> Option<SyncTask> {
        if self.id.trim().is_empty() {
            return None;
        }

        Some(SyncTask {
            task_id: self.id.clone(),
            title: self.title.clone().unwrap_or_default(),
            description: self.description.clone(),
            assignee: self.assignee.clone().unwrap_or_default(),
            project_id: self.project_id.clone(),
            status: self
                .status
                .as_deref()
                .and_then(TaskStatus::parse)
                .unwrap_or(TaskStatus::Backlog),
            priority: self
                .priority
                .as_deref()
                .and_then(Priority::parse)
                .unwrap_or(Priority::None),
            created_by: self
                .created_by
                .clone()
                .filter(|c| !c.is_empty())
                .unwrap_or_else(|| UNKNOWN_CREATOR.to_string()),
            created_at: self.created_at.as_deref().and_then(parse_timestamp),
            claimed_at: self.claimed_at.as_deref().and_then(parse_timestamp),
            completed_at: self.completed_at.as_deref().and_then(parse_timestamp),
            notes: self.notes.clone(),
        })
    }

    fn set_status(&mut self, status: TaskStatus, now: &str) {
        let was_blocked = self.status.as_deref() == Some(TaskStatus::Blocked.as_str());
        if status == TaskStatus::Blocked && !was_blocked {
            self.blocked_at = Some(now.to_string());
        }
        self.status = Some(status.as_str().to_string());
        match status {
            TaskStatus::InProgress if self.claimed_at.is_none() => {
                self.claimed_at = Some(now.to_string())
            }
            TaskStatus::Done if self.completed_at.is_none() => {
                self.completed_at = Some(now.to_string())
            }
            _ => {}
        }
    }

    /// Apply the same partial-update rules the store uses.
    pub fn apply_patch(&mut self, patch: &TaskPatch, now: i64) {
        if let Some(title) = &patch.title {
            self.title = Some(title.clone());
        }
        if let Some(description) = &patch.description {
            self.description = Some(description.clone());
        }
        if let Some(assignee) = &patch.assignee {
            self.assignee = Some(assignee.clone());
        }
        if let Some(project_id) = &patch.project_id {
            self.project_id = project_id.clone();
        }
        if let Some(priority) = patch.priority {
            self.priority = Some(priority.as_str().to_string());
        }
        if let Some(created_by) = &patch.created_by {
            self.created_by = Some(created_by.clone());
        }
        if let Some(claimed_at) = patch.claimed_at {
            self.claimed_at = to_rfc3339(claimed_at);
        }
        if let Some(completed_at) = patch.completed_at {
            self.completed_at = to_rfc3339(completed_at);
        }
        if let Some(reason) = &patch.blocked_reason {
            self.blocked_reason = reason.clone();
        }
        if let Some(notes) = &patch.notes {
            self.notes = Some(notes.clone());
        }
        if let Some(status) = patch.status {
            let now = to_rfc3339(now).unwrap_or_default();
            self.set_status(status, &now);
        }
    }
}

/// The whole file: `{"tasks": [...]}` plus anything else it carries.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TasksDocument {
    #[serde(default)]
    pub tasks: Vec<TaskRecord>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Fields accepted when creating a task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskInput {
    pub title: String,
    pub description: Option<String>,
    pub assignee: String,
    pub project_id: Option<String>,
    /// Defaults to `todo`.
    pub status: Option<TaskStatus>,
    pub priority: Priority,
    pub created_by: String,
}

/// Read and parse the document. A missing file is an empty document; a
/// malformed one is an error.
pub fn read_tasks_document(path: &Path) -> Result<TasksDocument> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(TasksDocument::default()),
        Err(e) => return Err(SnapshotError::io(path, e)),
    };

    serde_json::from_str(&raw).map_err(|e| SnapshotError::json(path, e))
}

/// Raw records, or nothing when the file is missing or malformed.
pub fn load_task_records(path: &Path) -> Vec<TaskRecord> {
    match read_tasks_document(path) {
        Ok(doc) => doc.tasks,
        Err(e) => {
            tracing::warn!(error = %e, "Ignoring unreadable tasks file");
            Vec::new()
        }
    }
}

/// Tasks from the file, ready for the reconciler.
pub fn read_tasks(path: &Path) -> Vec<SyncTask> {
    let tasks: Vec<SyncTask> = load_task_records(path)
        .iter()
        .filter_map(TaskRecord::to_sync_task)
        .collect();

    tracing::debug!(path = %path.display(), count = tasks.len(), "Read tasks file");
    tasks
}

/// `task-NNN` one past the highest numeric suffix among `ids`, padded to
/// three digits. Ids without the prefix or a numeric suffix are ignored.
pub fn next_task_id<'a>(ids: impl IntoIterator<Item = &'a str>) -> String {
    let max = ids
        .into_iter()
        .filter_map(|id| id.strip_prefix(TASK_ID_PREFIX))
        .filter_map(|n| n.parse::<u64>().ok())
        .max()
        .unwrap_or(0);

    format!("{TASK_ID_PREFIX}{:03}", max + 1)
}

/// Write `content` to `path` via a synced temp file and a rename.
pub fn atomic_write(path: &Path, content: &str) -> Result<()> {
    let temp_path = path.with_extension("json.tmp");

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| SnapshotError::io(parent, e))?;
    }

    {
        let file = File::create(&temp_path).map_err(|e| SnapshotError::io(&temp_path, e))?;
        let mut writer = BufWriter::new(file);
        writer
            .write_all(content.as_bytes())
            .and_then(|_| writer.flush())
            .and_then(|_| writer.get_ref().sync_all())
            .map_err(|e| SnapshotError::io(&temp_path, e))?;
    }

    fs::rename(&temp_path, path).map_err(|e| SnapshotError::io(path, e))
}

pub fn write_tasks_document(path: &Path, doc: &TasksDocument) -> Result<()> {
    let mut content = serde_json::to_string_pretty(doc).map_err(|e| SnapshotError::json(path, e))?;
    content.push('\n');
    atomic_write(path, &content)
}

/// Allocate an id, append a new task and rewrite the file.
///
/// `known_ids` are ids held elsewhere (the store) that the new id must not
/// collide with.
pub fn append_task(
    path: &Path,
    input: &TaskInput,
    known_ids: &[String],
    now: i64,
) -> Result<TaskRecord> {
    let mut doc = read_tasks_document(path)?;
    let id = next_task_id(
        doc.tasks
            .iter()
            .map(|t| t.id.as_str())
            .chain(known_ids.iter().map(String::as_str)),
    );

    let now_iso = to_rfc3339(now).unwrap_or_default();
    let mut record = TaskRecord {
        id,
        title: Some(input.title.clone()),
        description: input.description.clone().filter(|d| !d.is_empty()),
        assignee: Some(input.assignee.clone()),
        project_id: input.project_id.clone().filter(|p| !p.is_empty()),
        status: Some(TaskStatus::Backlog.as_str().to_string()),
        priority: Some(input.priority.as_str().to_string()),
        created_by: Some(input.created_by.clone()),
        created_at: Some(now_iso.clone()),
        ..Default::default()
    };
    record.set_status(input.status.unwrap_or(TaskStatus::Todo), &now_iso);

    doc.tasks.push(record.clone());
    write_tasks_document(path, &doc)?;

    tracing::info!(task_id = %record.id, "Appended task to tasks file");
    Ok(record)
}

/// Patch one task in the file and rewrite it.
pub fn update_task_in_file(
    path: &Path,
    task_id: &str,
    patch: &TaskPatch,
    now: i64,
) -> Result<TaskRecord> {
    let mut doc = read_tasks_document(path)?;
    let record = doc
        .tasks
        .iter_mut()
        .find(|t| t.id == task_id)
        .ok_or_else(|| SnapshotError::TaskNotFound(task_id.to_string()))?;

    record.apply_patch(patch, now);
    let updated = record.clone();
    write_tasks_document(path, &doc)?;

    tracing::info!(task_id, "Updated task in tasks file");
    Ok(updated)
}

/// Drop one task from the file. Returns whether it was there.
pub fn remove_task_from_file(path: &Path, task_id: &str) -> Result<bool> {
    let mut doc = read_tasks_document(path)?;
    let before = doc.tasks.len();
    doc.tasks.retain(|t| t.id != task_id);
    if doc.tasks.len() == before {
        return Ok(false);
    }

    write_tasks_document(path, &doc)?;
    tracing::info!(task_id, "Removed task from tasks file");
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "version": 2,
        "tasks": [
            {"id": "task-001", "title": "Wire sync", "assignee": "builder",
             "status": "in-progress", "priority": "high", "createdBy": "main",
             "createdAt": "2024-01-04T08:00:00Z", "claimedAt": "2024-01-05T09:00:00Z",
             "labels": ["infra"]},
            {"id": "task-007", "title": "Legacy", "assignee": "trader"},
            {"title": "no id"}
        ]
    }"#;

    fn sample_file() -> (tempfile::TempDir, std::path::PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shared/tasks.json");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, SAMPLE).unwrap();
        (dir, path)
    }

    #[test]
    fn test_read_tasks_fills_defaults() {
        let (_dir, path) = sample_file();
        let tasks = read_tasks(&path);

        assert_eq!(tasks.len(), 2);
        assert_eq!(tasks[0].status, TaskStatus::InProgress);
        assert_eq!(tasks[0].claimed_at, parse_timestamp("2024-01-05T09:00:00Z"));

        let legacy = &tasks[1];
        assert_eq!(legacy.status, TaskStatus::Backlog);
        assert_eq!(legacy.priority, Priority::None);
        assert_eq!(legacy.created_by, "unknown");
        assert_eq!(legacy.created_at, None);
    }

    #[test]
    fn test_missing_or_malformed_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tasks.json");
        assert!(read_tasks(&path).is_empty());

        fs::write(&path, "{\"tasks\": [").unwrap();
        assert!(read_tasks(&path).is_empty());
        assert!(read_tasks_document(&path).is_err());
    }

    #[test]
    fn test_remove_task_keeps_the_rest() {
        let (_dir, path) = sample_file();

        assert!(remove_task_from_file(&path, "task-007").unwrap());
        assert!(!remove_task_from_file(&path, "task-007").unwrap());

        let doc = read_tasks_document(&path).unwrap();
        let ids: Vec<_> = doc.tasks.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["task-001", ""]);
        assert_eq!(doc.extra.get("version"), Some(&Value::from(2)));
    }

    #[test]
    fn test_next_task_id() {
        assert_eq!(next_task_id([]), "task-001");
        assert_eq!(next_task_id(["task-001", "task-041", "bd-9", "task-x"]), "task-042");
        assert_eq!(next_task_id(["task-999"]), "task-1000");
    }

    #[test]
    fn test_append_task_allocates_past_known_ids() {
        let (_dir, path) = sample_file();
        let input = TaskInput {
            title: "Write docs".to_string(),
            description: Some(String::new()),
            assignee: "clawink".to_string(),
            project_id: None,
            status: None,
            priority: Priority::Low,
            created_by: "main".to_string(),
        };

        let record = append_task(&path, &input, &["task-010".to_string()], 0).unwrap();
        assert_eq!(record.id, "task-011");
        assert_eq!(record.status.as_deref(), Some("todo"));
        assert_eq!(record.description, None);
        assert_eq!(record.created_at.as_deref(), Some("1970-01-01T00:00:00.000Z"));

        let doc = read_tasks_document(&path).unwrap();
        assert_eq!(doc.tasks.len(), 4);
        assert_eq!(doc.extra.get("version"), Some(&Value::from(2)));
        assert_eq!(doc.tasks[0].extra.get("labels"), Some(&serde_json::json!(["infra"])));
    }

    #[test]
    fn test_update_task_in_file_sets_timestamps_once() {
        let (_dir, path) = sample_file();
        let done = TaskPatch {
            status: Some(TaskStatus::Done),
            project_id: Some(Some("openclaw".to_string())),
            ..Default::default()
        };

        let first = update_task_in_file(&path, "task-001", &done, 1_000).unwrap();
        assert_eq!(first.completed_at.as_deref(), Some("1970-01-01T00:00:01.000Z"));
        assert_eq!(first.claimed_at.as_deref(), Some("2024-01-05T09:00:00Z"));
        assert_eq!(first.project_id.as_deref(), Some("openclaw"));

        let again = update_task_in_file(&path, "task-001", &done, 2_000).unwrap();
        assert_eq!(again.completed_at, first.completed_at);

        assert!(matches!(
            update_task_in_file(&path, "task-404", &done, 0),
            Err(SnapshotError::TaskNotFound(id)) if id == "task-404"
        ));
    }
}
