//! The single read behind the dashboard: every live collection joined into
//! one payload, with trailing seven-day stats merged onto each agent.

use std::collections::HashMap;

use chrono::NaiveDate;
use serde::Serialize;
use sqlx::SqlitePool;

use crate::error::Result;
use crate::models::{
    Agent, AgentDailyStat, AgentStatus, Priority, Project, Session, SessionStatus, SyncState,
    Task, TaskStatus, TokenUsage,
};
use crate::time::{days_before, format_day, now_millis, to_rfc3339, today};

/// Days before today included in the weekly window, so the window spans
/// seven calendar days counting today.
pub const WEEKLY_WINDOW_DAYS: i64 = 6;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeeklyStats {
    pub tasks_completed: i64,
    pub tasks_started: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentView {
    pub id: String,
    pub name: String,
    pub emoji: String,
    pub description: String,
    pub status: AgentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_activity: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_task: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_usage: Option<TokenUsage>,
    pub weekly_stats: WeeklyStats,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskView {
    pub id: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub assignee: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    pub status: TaskStatus,
    pub priority: Priority,
    pub created_by: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub claimed_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blocked_reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blocked_at: Option<String>,
    pub notes: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionView {
    pub key: String,
    pub agent_id: String,
    pub channel: String,
    pub status: SessionStatus,
    pub last_activity: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_count: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectView {
    pub id: String,
    pub name: String,
    pub color: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// The composed dashboard payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardData {
    pub agents: Vec<AgentView>,
    /// Newest first.
    pub tasks: Vec<TaskView>,
    pub sessions: Vec<SessionView>,
    pub projects: Vec<ProjectView>,
    pub last_updated: String,
}

impl DashboardData {
    /// Tasks in one board column, keeping newest-first order.
    pub fn tasks_in(&self, status: TaskStatus) -> impl Iterator<Item = &TaskView> {
        self.tasks.iter().filter(move |t| t.status == status)
    }
}

/// Sum completed/started counters per agent over `[today - 6, today]`.
///
/// Days are compared as `YYYY-MM-DD` strings, so the window is calendar days
/// rather than a rolling 168 hours.
pub fn weekly_totals(stats: &[AgentDailyStat], today: NaiveDate) -> HashMap<String, WeeklyStats> {
    let start = format_day(days_before(today, WEEKLY_WINDOW_DAYS));
    let end = format_day(today);

    let mut totals: HashMap<String, WeeklyStats> = HashMap::new();
    for stat in stats
        .iter()
        .filter(|s| s.date.as_str() >= start.as_str() && s.date.as_str() <= end.as_str())
    {
        let entry = totals.entry(stat.agent_id.clone()).or_default();
        entry.tasks_completed += stat.tasks_completed;
        entry.tasks_started += stat.tasks_started;
    }
    totals
}

/// Raw collections the payload is built from.
#[derive(Debug, Clone, Default)]
pub struct DashboardInputs {
    pub agents: Vec<Agent>,
    pub tasks: Vec<Task>,
    pub sessions: Vec<Session>,
    pub projects: Vec<Project>,
    pub sync_state: Vec<SyncState>,
    pub stats: Vec<AgentDailyStat>,
}

/// Build the payload from already-fetched collections. Pure.
pub fn compose_dashboard(inputs: DashboardInputs, today: NaiveDate, now: i64) -> DashboardData {
    let DashboardInputs {
        agents,
        tasks,
        sessions,
        projects,
        sync_state,
        stats,
    } = inputs;
    let weekly = weekly_totals(&stats, today);

    let agents = agents
        .into_iter()
        .map(|a| AgentView {
            weekly_stats: weekly.get(&a.agent_id).copied().unwrap_or_default(),
            id: a.agent_id,
            name: a.name,
            emoji: a.emoji,
            description: a.description,
            status: a.status,
            last_activity: a.last_activity.and_then(to_rfc3339),
            current_task: a.current_task,
            token_usage: a.token_usage,
        })
        .collect();

    let tasks = tasks
        .into_iter()
        .map(|t| TaskView {
            id: t.task_id,
            title: t.title,
            description: t.description,
            assignee: t.assignee,
            project_id: t.project_id,
            status: t.status,
            priority: t.priority,
            created_by: t.created_by,
            created_at: to_rfc3339(t.created_at),
            claimed_at: t.claimed_at.and_then(to_rfc3339),
            completed_at: t.completed_at.and_then(to_rfc3339),
            blocked_reason: t.blocked_reason,
            blocked_at: t.blocked_at.and_then(to_rfc3339),
            notes: t.notes,
        })
        .collect();

    let sessions = sessions
        .into_iter()
        .map(|s| SessionView {
            key: s.session_key,
            agent_id: s.agent_id,
            channel: s.channel,
            status: s.status,
            last_activity: to_rfc3339(s.last_activity),
            message_count: s.message_count,
            last_message: s.last_message,
        })
        .collect();

    let projects = projects
        .into_iter()
        .map(|p| ProjectView {
            id: p.project_id,
            name: p.name,
            color: p.color,
            icon: p.icon,
            description: p.description,
        })
        .collect();

    let last_synced = sync_state.iter().map(|s| s.last_synced).max().unwrap_or(now);
    let last_updated = to_rfc3339(last_synced)
        .or_else(|| to_rfc3339(now))
        .unwrap_or_default();

    DashboardData {
        agents,
        tasks,
        sessions,
        projects,
        last_updated,
    }
}

/// Fetch every collection and compose the dashboard payload.
pub async fn get_dashboard_data(pool: &SqlitePool) -> Result<DashboardData> {
    let inputs = DashboardInputs {
        agents: crate::agent::list_agents(pool).await?,
        tasks: crate::task::list_tasks(pool).await?,
        sessions: crate::session::list_sessions(pool).await?,
        projects: crate::project::list_projects(pool).await?,
        sync_state: crate::sync_state::get_sync_state(pool).await?,
        stats: crate::agent_stats::list_all_stats(pool).await?,
    };

    Ok(compose_dashboard(inputs, today(), now_millis()))
}
