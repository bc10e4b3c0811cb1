//! Database models.
//!
//! Timestamps are milliseconds since the Unix epoch in memory and in the
//! store, and RFC 3339 strings once serialized. Natural keys
//! (`agent_id`, `project_id`, `task_id`, `session_key`) are what callers use;
//! the storage-internal row id never leaves this crate.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Liveness of an agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "TEXT", rename_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum AgentStatus {
    Active,
    Idle,
    Error,
}

impl AgentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AgentStatus::Active => "active",
            AgentStatus::Idle => "idle",
            AgentStatus::Error => "error",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "active" => Some(AgentStatus::Active),
            "idle" => Some(AgentStatus::Idle),
            "error" => Some(AgentStatus::Error),
            _ => None,
        }
    }
}

/// Kanban column of a task.
///
/// This is the superset of every status vocabulary the task sources have
/// used; older sources simply never produce `Blocked`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "TEXT", rename_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum TaskStatus {
    Backlog,
    Todo,
    InProgress,
    Blocked,
    Done,
    Canceled,
}

impl TaskStatus {
    /// Columns in board order.
    pub const ALL: [TaskStatus; 6] = [
        TaskStatus::Backlog,
        TaskStatus::Todo,
        TaskStatus::InProgress,
        TaskStatus::Blocked,
        TaskStatus::Done,
        TaskStatus::Canceled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Backlog => "backlog",
            TaskStatus::Todo => "todo",
            TaskStatus::InProgress => "in-progress",
            TaskStatus::Blocked => "blocked",
            TaskStatus::Done => "done",
            TaskStatus::Canceled => "canceled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "backlog" => Some(TaskStatus::Backlog),
            "todo" => Some(TaskStatus::Todo),
            "in-progress" => Some(TaskStatus::InProgress),
            "blocked" => Some(TaskStatus::Blocked),
            "done" => Some(TaskStatus::Done),
            "canceled" => Some(TaskStatus::Canceled),
            _ => None,
        }
    }

    /// Human-readable column title.
    pub fn label(&self) -> &'static str {
        match self {
            TaskStatus::Backlog => "Backlog",
            TaskStatus::Todo => "Todo",
            TaskStatus::InProgress => "In Progress",
            TaskStatus::Blocked => "Blocked",
            TaskStatus::Done => "Done",
            TaskStatus::Canceled => "Canceled",
        }
    }
}

/// Task priority, most urgent first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "TEXT", rename_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum Priority {
    Urgent,
    High,
    Medium,
    Low,
    None,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Urgent => "urgent",
            Priority::High => "high",
            Priority::Medium => "medium",
            Priority::Low => "low",
            Priority::None => "none",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "urgent" => Some(Priority::Urgent),
            "high" => Some(Priority::High),
            "medium" => Some(Priority::Medium),
            "low" => Some(Priority::Low),
            "none" => Some(Priority::None),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "TEXT", rename_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum SessionStatus {
    Active,
    Idle,
    Closed,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Active => "active",
            SessionStatus::Idle => "idle",
            SessionStatus::Closed => "closed",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "TEXT", rename_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum MessageType {
    Task,
    Update,
    Request,
    Response,
}

/// Cumulative model token usage for an agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input: i64,
    pub output: i64,
}

/// An agent in the orchestration system.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Agent {
    /// Natural key, e.g. "builder".
    pub agent_id: String,
    pub name: String,
    pub emoji: String,
    pub description: String,
    pub status: AgentStatus,
    #[serde(default, with = "crate::time::rfc3339_millis::option")]
    pub last_activity: Option<i64>,
    /// Free-text label of what the agent is working on.
    pub current_task: Option<String>,
    pub token_usage: Option<TokenUsage>,
}

/// A project tasks can be grouped under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub project_id: String,
    pub name: String,
    /// Hex color, e.g. "#5e6ad2".
    pub color: String,
    pub icon: Option<String>,
    pub description: Option<String>,
    #[serde(with = "crate::time::rfc3339_millis")]
    pub created_at: i64,
}

/// A kanban task (issue).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub task_id: String,
    pub title: String,
    pub description: Option<String>,
    /// Agent id. Not enforced against the agents table; empty when unknown.
    pub assignee: String,
    /// Not enforced against the projects table.
    pub project_id: Option<String>,
    pub status: TaskStatus,
    pub priority: Priority,
    pub created_by: String,
    #[serde(with = "crate::time::rfc3339_millis")]
    pub created_at: i64,
    /// Set once, the first time the task moves to in-progress.
    #[serde(default, with = "crate::time::rfc3339_millis::option")]
    pub claimed_at: Option<i64>,
    /// Set once, the first time the task moves to done.
    #[serde(default, with = "crate::time::rfc3339_millis::option")]
    pub completed_at: Option<i64>,
    pub blocked_reason: Option<String>,
    #[serde(default, with = "crate::time::rfc3339_millis::option")]
    pub blocked_at: Option<i64>,
    pub notes: Vec<String>,
}

/// A conversation session of an agent on some channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub session_key: String,
    pub agent_id: String,
    /// Source label, e.g. "telegram".
    pub channel: String,
    pub status: SessionStatus,
    #[serde(with = "crate::time::rfc3339_millis")]
    pub last_activity: i64,
    pub message_count: Option<i64>,
    /// Preview of the most recent message.
    pub last_message: Option<String>,
}

/// An inter-agent message. Append-only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub message_id: String,
    #[sqlx(rename = "from_agent")]
    pub from: String,
    #[sqlx(rename = "to_agent")]
    pub to: String,
    pub content: String,
    #[serde(with = "crate::time::rfc3339_millis")]
    pub timestamp: i64,
    #[sqlx(rename = "message_type")]
    #[serde(rename = "type")]
    pub message_type: MessageType,
}

/// Per-agent, per-day activity counters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct AgentDailyStat {
    pub agent_id: String,
    /// Calendar day, `YYYY-MM-DD`.
    pub date: String,
    pub tasks_completed: i64,
    pub tasks_started: i64,
    pub messages_count: i64,
    pub active_minutes: i64,
}

impl AgentDailyStat {
    /// A zeroed row for the given key.
    pub fn empty(agent_id: impl Into<String>, date: impl Into<String>) -> Self {
        Self {
            agent_id: agent_id.into(),
            date: date.into(),
            tasks_completed: 0,
            tasks_started: 0,
            messages_count: 0,
            active_minutes: 0,
        }
    }
}

/// Sync ledger row for one entity kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct SyncState {
    pub key: String,
    #[serde(with = "crate::time::rfc3339_millis")]
    pub last_synced: i64,
    pub version: i64,
}

/// Input for explicit task creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTask {
    pub task_id: String,
    pub title: String,
    pub description: Option<String>,
    pub assignee: String,
    pub project_id: Option<String>,
    pub status: TaskStatus,
    pub priority: Priority,
    pub created_by: String,
}

/// Input for explicit project creation and project seeding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProject {
    pub project_id: String,
    pub name: String,
    pub color: String,
    pub icon: Option<String>,
    pub description: Option<String>,
}

/// Input for sending a message; the store assigns the timestamp.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewMessage {
    pub message_id: String,
    pub from: String,
    pub to: String,
    pub content: String,
    #[serde(rename = "type")]
    pub message_type: MessageType,
}
