//! Per-agent detail read straight from the agent's directory and the shared
//! tasks file.

use std::fs;
use std::path::{Component, Path};

use database::time::to_rfc3339;
use database::AgentStatus;
use serde::Serialize;

use crate::agents_dir::{session_activity, status_for};
use crate::catalog::Catalog;
use crate::tasks_file::load_task_records;
use crate::SourcePaths;

/// Memory notes are cut to this many characters.
pub const MEMORY_PREVIEW_CHARS: usize = 2000;

const RECENT_TASKS: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub count: usize,
    pub last_activity: Option<String>,
}

/// Assigned-task counts. `todo` covers both todo and backlog.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskCounts {
    pub total: usize,
    pub in_progress: usize,
    pub done: usize,
    pub todo: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskSummary {
    pub id: String,
    pub title: String,
    pub status: String,
}

/// Markdown files from the agent's `workspace/`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WorkspaceContent {
    pub soul: Option<String>,
    pub identity: Option<String>,
    pub agents: Option<String>,
    pub memory: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentDetail {
    pub id: String,
    pub name: String,
    pub emoji: String,
    pub description: String,
    pub model: Option<String>,
    pub status: AgentStatus,
    pub sessions: SessionSummary,
    pub tasks: TaskCounts,
    pub recent_tasks: Vec<TaskSummary>,
    pub content: WorkspaceContent,
}

fn read_optional(path: &Path) -> Option<String> {
    match fs::read_to_string(path) {
        Ok(content) => Some(content),
        Err(e) => {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(path = %path.display(), error = %e, "Failed to read workspace file");
            }
            None
        }
    }
}

fn truncate_chars(text: String, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text,
    }
}

/// Only a single plain path segment names an agent directory.
fn is_plain_id(agent_id: &str) -> bool {
    let mut components = Path::new(agent_id).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}

/// Build the detail view for one agent, or `None` when its directory does
/// not exist.
pub fn load_agent_detail(
    paths: &SourcePaths,
    catalog: &Catalog,
    agent_id: &str,
    now: i64,
) -> Option<AgentDetail> {
    if !is_plain_id(agent_id) {
        return None;
    }

    let agent_dir = paths.agents_dir.join(agent_id);
    if !agent_dir.is_dir() {
        return None;
    }

    let workspace = agent_dir.join("workspace");
    let content = WorkspaceContent {
        soul: read_optional(&workspace.join("SOUL.md")),
        identity: read_optional(&workspace.join("IDENTITY.md")),
        agents: read_optional(&workspace.join("AGENTS.md")),
        memory: read_optional(&workspace.join("MEMORY.md"))
            .map(|memory| truncate_chars(memory, MEMORY_PREVIEW_CHARS)),
    };

    let activity = session_activity(&agent_dir.join("sessions"));

    let assigned: Vec<TaskSummary> = load_task_records(&paths.tasks_file)
        .into_iter()
        .filter(|t| t.assignee.as_deref() == Some(agent_id))
        .map(|t| TaskSummary {
            id: t.id,
            title: t.title.unwrap_or_default(),
            status: t.status.unwrap_or_default(),
        })
        .collect();

    let count = |statuses: &[&str]| {
        assigned
            .iter()
            .filter(|t| statuses.contains(&t.status.as_str()))
            .count()
    };
    let tasks = TaskCounts {
        total: assigned.len(),
        in_progress: count(&["in-progress"]),
        done: count(&["done"]),
        todo: count(&["todo", "backlog"]),
    };

    Some(AgentDetail {
        id: agent_id.to_string(),
        name: catalog.display_name(agent_id),
        emoji: catalog.emoji_for(agent_id).to_string(),
        description: catalog.description_for(agent_id).to_string(),
        model: catalog.agent(agent_id).and_then(|a| a.model.clone()),
        status: status_for(activity.last_activity, now),
        sessions: SessionSummary {
            count: activity.count,
            last_activity: activity.last_activity.and_then(to_rfc3339),
        },
        tasks,
        recent_tasks: assigned.into_iter().take(RECENT_TASKS).collect(),
        content,
    })
}
