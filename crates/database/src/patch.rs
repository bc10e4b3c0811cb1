//! Partial updates.
//!
//! Every entity that can be patched has an update struct whose fields are all
//! optional. `None` means "leave the stored value alone"; the `merge_*`
//! functions are pure and return the updated record, which the store then
//! writes back in full.
//!
//! Fields that can be cleared (a task's project, a block reason) use a nested
//! `Option`: `Some(None)` clears, `Some(Some(v))` sets.

use serde::{Deserialize, Deserializer, Serialize};

use crate::models::{
    Agent, AgentStatus, Priority, Project, Session, SessionStatus, Task, TaskStatus, TokenUsage,
};

/// Deserialize a present JSON value (including `null`) as `Some(..)`.
///
/// Combined with `#[serde(default)]` this distinguishes an absent field
/// (`None`) from an explicit `null` (`Some(None)`).
pub fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentPatch {
    pub name: Option<String>,
    pub emoji: Option<String>,
    pub description: Option<String>,
    pub status: Option<AgentStatus>,
    #[serde(default, with = "crate::time::rfc3339_millis::option")]
    pub last_activity: Option<i64>,
    pub current_task: Option<String>,
    pub token_usage: Option<TokenUsage>,
}

pub fn merge_agent(existing: &Agent, patch: &AgentPatch) -> Agent {
    let mut agent = existing.clone();
    if let Some(name) = &patch.name {
        agent.name = name.clone();
    }
    if let Some(emoji) = &patch.emoji {
        agent.emoji = emoji.clone();
    }
    if let Some(description) = &patch.description {
        agent.description = description.clone();
    }
    if let Some(status) = patch.status {
        agent.status = status;
    }
    if let Some(last_activity) = patch.last_activity {
        agent.last_activity = Some(last_activity);
    }
    if let Some(current_task) = &patch.current_task {
        agent.current_task = Some(current_task.clone());
    }
    if let Some(usage) = patch.token_usage {
        agent.token_usage = Some(usage);
    }
    agent
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectPatch {
    pub name: Option<String>,
    pub color: Option<String>,
    pub icon: Option<String>,
    pub description: Option<String>,
}

impl ProjectPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.color.is_none() && self.icon.is_none() && self.description.is_none()
    }
}

pub fn merge_project(existing: &Project, patch: &ProjectPatch) -> Project {
    let mut project = existing.clone();
    if let Some(name) = &patch.name {
        project.name = name.clone();
    }
    if let Some(color) = &patch.color {
        project.color = color.clone();
    }
    if let Some(icon) = &patch.icon {
        project.icon = Some(icon.clone());
    }
    if let Some(description) = &patch.description {
        project.description = Some(description.clone());
    }
    project
}

/// Field-level task update.
///
/// `created_at` is intentionally absent: it is assigned on first insert and
/// never changes afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub assignee: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub project_id: Option<Option<String>>,
    pub status: Option<TaskStatus>,
    pub priority: Option<Priority>,
    pub created_by: Option<String>,
    pub claimed_at: Option<i64>,
    pub completed_at: Option<i64>,
    #[serde(default, deserialize_with = "double_option")]
    pub blocked_reason: Option<Option<String>>,
    pub notes: Option<Vec<String>>,
}

/// Copy the fields present in `patch` onto a clone of `existing`.
///
/// Status is copied verbatim; use [`transition_status`] when the change comes
/// from a user action and lifecycle timestamps should follow.
pub fn merge_task(existing: &Task, patch: &TaskPatch) -> Task {
    let mut task = existing.clone();
    if let Some(title) = &patch.title {
        task.title = title.clone();
    }
    if let Some(description) = &patch.description {
        task.description = Some(description.clone());
    }
    if let Some(assignee) = &patch.assignee {
        task.assignee = assignee.clone();
    }
    if let Some(project_id) = &patch.project_id {
        task.project_id = project_id.clone();
    }
    if let Some(status) = patch.status {
        task.status = status;
    }
    if let Some(priority) = patch.priority {
        task.priority = priority;
    }
    if let Some(created_by) = &patch.created_by {
        task.created_by = created_by.clone();
    }
    if let Some(claimed_at) = patch.claimed_at {
        task.claimed_at = Some(claimed_at);
    }
    if let Some(completed_at) = patch.completed_at {
        task.completed_at = Some(completed_at);
    }
    if let Some(reason) = &patch.blocked_reason {
        task.blocked_reason = reason.clone();
    }
    if let Some(notes) = &patch.notes {
        task.notes = notes.clone();
    }
    task
}

/// Move a task to `status`, stamping lifecycle timestamps.
///
/// `claimed_at` is only set when still empty and the new status is
/// in-progress; `completed_at` likewise for done. Entering blocked from any
/// other status stamps `blocked_at`.
pub fn transition_status(task: &mut Task, status: TaskStatus, now: i64) {
    if status == TaskStatus::Blocked && task.status != TaskStatus::Blocked {
        task.blocked_at = Some(now);
    }
    task.status = status;
    match status {
        TaskStatus::InProgress if task.claimed_at.is_none() => task.claimed_at = Some(now),
        TaskStatus::Done if task.completed_at.is_none() => task.completed_at = Some(now),
        _ => {}
    }
}

/// Apply a user-initiated task update: field merge, then status transition.
pub fn apply_task_update(existing: &Task, patch: &TaskPatch, now: i64) -> Task {
    let status = patch.status;
    let without_status = TaskPatch {
        status: None,
        ..patch.clone()
    };
    let mut task = merge_task(existing, &without_status);
    if let Some(status) = status {
        transition_status(&mut task, status, now);
    }
    task
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionPatch {
    pub status: Option<SessionStatus>,
    #[serde(default, with = "crate::time::rfc3339_millis::option")]
    pub last_activity: Option<i64>,
    pub message_count: Option<i64>,
    pub last_message: Option<String>,
}

pub fn merge_session(existing: &Session, patch: &SessionPatch) -> Session {
    let mut session = existing.clone();
    if let Some(status) = patch.status {
        session.status = status;
    }
    if let Some(last_activity) = patch.last_activity {
        session.last_activity = last_activity;
    }
    if let Some(count) = patch.message_count {
        session.message_count = Some(count);
    }
    if let Some(message) = &patch.last_message {
        session.last_message = Some(message.clone());
    }
    session
}
