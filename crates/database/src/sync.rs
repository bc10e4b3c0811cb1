//! Bulk reconciliation of an external snapshot into the store.
//!
//! Each record is an independent lookup-then-write: there is no transaction
//! around a batch, so a failure partway leaves earlier records committed.
//! After a batch, the ledger row for that kind advances by one version even
//! if nothing changed.

use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

use crate::agent::{get_agent, insert_agent, write_agent};
use crate::error::Result;
use crate::models::{Agent, AgentStatus, Priority, Project, Session, Task, TaskStatus};
use crate::patch::{merge_agent, merge_project, merge_task, AgentPatch, ProjectPatch, TaskPatch};
use crate::project::{get_project, insert_project, write_project};
use crate::session::{get_session, insert_session, replace_session};
use crate::sync_state::{mark_synced, SyncKey};
use crate::task::{get_task, insert_task, write_task};
use crate::time::now_millis;

/// An agent as reported by the external source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncAgent {
    pub agent_id: String,
    pub name: String,
    pub emoji: String,
    pub description: String,
    pub status: AgentStatus,
    pub last_activity: Option<i64>,
    pub current_task: Option<String>,
}

impl SyncAgent {
    fn patch(&self) -> AgentPatch {
        AgentPatch {
            name: Some(self.name.clone()),
            emoji: Some(self.emoji.clone()),
            description: Some(self.description.clone()),
            status: Some(self.status),
            last_activity: self.last_activity,
            current_task: self.current_task.clone(),
            token_usage: None,
        }
    }

    fn into_agent(self) -> Agent {
        Agent {
            agent_id: self.agent_id,
            name: self.name,
            emoji: self.emoji,
            description: self.description,
            status: self.status,
            last_activity: self.last_activity,
            current_task: self.current_task,
            token_usage: None,
        }
    }
}

/// A task as reported by the external source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncTask {
    pub task_id: String,
    pub title: String,
    pub description: Option<String>,
    pub assignee: String,
    pub project_id: Option<String>,
    pub status: TaskStatus,
    pub priority: Priority,
    pub created_by: String,
    pub created_at: Option<i64>,
    pub claimed_at: Option<i64>,
    pub completed_at: Option<i64>,
    pub notes: Option<Vec<String>>,
}

impl SyncTask {
    /// The whitelisted fields a re-sync may overwrite. `created_at` is not
    /// among them.
    fn patch(&self) -> TaskPatch {
        TaskPatch {
            title: Some(self.title.clone()),
            description: self.description.clone(),
            assignee: Some(self.assignee.clone()),
            project_id: self.project_id.clone().map(Some),
            status: Some(self.status),
            priority: Some(self.priority),
            created_by: Some(self.created_by.clone()),
            claimed_at: self.claimed_at,
            completed_at: self.completed_at,
            blocked_reason: None,
            notes: self.notes.clone(),
        }
    }

    fn into_task(self, now: i64) -> Task {
        Task {
            task_id: self.task_id,
            title: self.title,
            description: self.description,
            assignee: self.assignee,
            project_id: self.project_id,
            status: self.status,
            priority: self.priority,
            created_by: self.created_by,
            created_at: self.created_at.unwrap_or(now),
            claimed_at: self.claimed_at,
            completed_at: self.completed_at,
            blocked_reason: None,
            blocked_at: None,
            notes: self.notes.unwrap_or_default(),
        }
    }
}

/// A project as reported by the external source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncProject {
    pub project_id: String,
    pub name: String,
    pub color: String,
    pub icon: Option<String>,
    pub description: Option<String>,
}

impl SyncProject {
    fn patch(&self) -> ProjectPatch {
        ProjectPatch {
            name: Some(self.name.clone()),
            color: Some(self.color.clone()),
            icon: self.icon.clone(),
            description: self.description.clone(),
        }
    }
}

/// Result of syncing one entity kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncOutcome {
    /// Records processed, inserted or patched.
    pub synced: usize,
    /// Ledger version after this sync.
    pub version: i64,
}

/// Result of a combined agents + tasks sync.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FullSyncOutcome {
    pub agents: usize,
    pub tasks: usize,
    pub synced_at: i64,
}

async fn upsert_agents(pool: &SqlitePool, agents: &[SyncAgent]) -> Result<()> {
    for incoming in agents {
        match get_agent(pool, &incoming.agent_id).await? {
            Some(existing) => write_agent(pool, &merge_agent(&existing, &incoming.patch())).await?,
            None => insert_agent(pool, &incoming.clone().into_agent()).await?,
        }
    }
    Ok(())
}

async fn upsert_tasks(pool: &SqlitePool, tasks: &[SyncTask], now: i64) -> Result<()> {
    for incoming in tasks {
        match get_task(pool, &incoming.task_id).await? {
            Some(existing) => write_task(pool, &merge_task(&existing, &incoming.patch())).await?,
            None => insert_task(pool, &incoming.clone().into_task(now)).await?,
        }
    }
    Ok(())
}

/// Upsert agents by `agent_id`, then advance the `agents` ledger row.
pub async fn sync_agents(pool: &SqlitePool, agents: &[SyncAgent]) -> Result<SyncOutcome> {
    upsert_agents(pool, agents).await?;
    let state = mark_synced(pool, SyncKey::Agents, now_millis()).await?;

    tracing::info!(synced = agents.len(), version = state.version, "Synced agents");
    Ok(SyncOutcome {
        synced: agents.len(),
        version: state.version,
    })
}

/// Upsert tasks by `task_id`, then advance the `tasks` ledger row.
///
/// Existing tasks only receive the whitelisted fields; `created_at` is set on
/// first insert (now when the source has none) and never touched again.
pub async fn sync_tasks(pool: &SqlitePool, tasks: &[SyncTask]) -> Result<SyncOutcome> {
    let now = now_millis();
    upsert_tasks(pool, tasks, now).await?;
    let state = mark_synced(pool, SyncKey::Tasks, now_millis()).await?;

    tracing::info!(synced = tasks.len(), version = state.version, "Synced tasks");
    Ok(SyncOutcome {
        synced: tasks.len(),
        version: state.version,
    })
}

/// Upsert projects by `project_id`, then advance the `projects` ledger row.
pub async fn sync_projects(pool: &SqlitePool, projects: &[SyncProject]) -> Result<SyncOutcome> {
    let now = now_millis();
    for incoming in projects {
        match get_project(pool, &incoming.project_id).await? {
            Some(existing) => {
                write_project(pool, &merge_project(&existing, &incoming.patch())).await?
            }
            None => {
                let project = Project {
                    project_id: incoming.project_id.clone(),
                    name: incoming.name.clone(),
                    color: incoming.color.clone(),
                    icon: incoming.icon.clone(),
                    description: incoming.description.clone(),
                    created_at: now,
                };
                insert_project(pool, &project).await?
            }
        }
    }
    let state = mark_synced(pool, SyncKey::Projects, now_millis()).await?;

    tracing::info!(synced = projects.len(), version = state.version, "Synced projects");
    Ok(SyncOutcome {
        synced: projects.len(),
        version: state.version,
    })
}

/// Upsert sessions by `session_key`, then advance the `sessions` ledger row.
///
/// Unlike the other kinds, a matching session is replaced wholesale by the
/// incoming record.
pub async fn sync_sessions(pool: &SqlitePool, sessions: &[Session]) -> Result<SyncOutcome> {
    for incoming in sessions {
        match get_session(pool, &incoming.session_key).await? {
            Some(_) => replace_session(pool, incoming).await?,
            None => insert_session(pool, incoming).await?,
        }
    }
    let state = mark_synced(pool, SyncKey::Sessions, now_millis()).await?;

    tracing::info!(synced = sessions.len(), version = state.version, "Synced sessions");
    Ok(SyncOutcome {
        synced: sessions.len(),
        version: state.version,
    })
}

/// Sync agents and tasks in one call. Both ledger rows advance with the same
/// timestamp.
pub async fn full_sync(
    pool: &SqlitePool,
    agents: &[SyncAgent],
    tasks: &[SyncTask],
) -> Result<FullSyncOutcome> {
    let now = now_millis();
    upsert_agents(pool, agents).await?;
    upsert_tasks(pool, tasks, now).await?;

    for key in [SyncKey::Agents, SyncKey::Tasks] {
        mark_synced(pool, key, now).await?;
    }

    tracing::info!(agents = agents.len(), tasks = tasks.len(), "Full sync complete");
    Ok(FullSyncOutcome {
        agents: agents.len(),
        tasks: tasks.len(),
        synced_at: now,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SessionStatus;
    use crate::sync_state::get_sync_key;
    use crate::test_support::test_db;

    fn sync_agent(id: &str) -> SyncAgent {
        SyncAgent {
            agent_id: id.to_string(),
            name: "Builder".to_string(),
            emoji: "🔨".to_string(),
            description: "Code, ship, iterate".to_string(),
            status: AgentStatus::Idle,
            last_activity: None,
            current_task: None,
        }
    }

    fn sync_task(id: &str) -> SyncTask {
        SyncTask {
            task_id: id.to_string(),
            title: "Wire up sync".to_string(),
            description: Some("from tasks.json".to_string()),
            assignee: "builder".to_string(),
            project_id: Some("openclaw".to_string()),
            status: TaskStatus::Todo,
            priority: Priority::High,
            created_by: "main".to_string(),
            created_at: None,
            claimed_at: None,
            completed_at: None,
            notes: None,
        }
    }

    #[tokio::test]
    async fn test_sync_agents_twice_keeps_one_record() {
        let db = test_db().await;
        let batch = vec![sync_agent("builder")];

        sync_agents(db.pool(), &batch).await.unwrap();
        crate::agent::update_agent_status(
            db.pool(),
            "builder",
            AgentStatus::Active,
            Some(99),
            Some("deploy".to_string()),
        )
        .await
        .unwrap();
        sync_agents(db.pool(), &batch).await.unwrap();

        let agents = crate::agent::list_agents(db.pool()).await.unwrap();
        assert_eq!(agents.len(), 1);
        // status was in the payload, the activity fields were not
        assert_eq!(agents[0].status, AgentStatus::Idle);
        assert_eq!(agents[0].last_activity, Some(99));
        assert_eq!(agents[0].current_task.as_deref(), Some("deploy"));
    }

    #[tokio::test]
    async fn test_version_increments_per_call_even_when_empty() {
        let db = test_db().await;

        let first = sync_tasks(db.pool(), &[sync_task("task-001")]).await.unwrap();
        assert_eq!(first.version, 1);
        let second = sync_tasks(db.pool(), &[]).await.unwrap();
        assert_eq!(second.version, 2);
        assert_eq!(second.synced, 0);
        let third = sync_tasks(db.pool(), &[sync_task("task-001"), sync_task("task-002")])
            .await
            .unwrap();
        assert_eq!(third.version, 3);
        assert_eq!(third.synced, 2);
    }

    #[tokio::test]
    async fn test_sync_tasks_preserves_created_at() {
        let db = test_db().await;
        let mut first = sync_task("task-001");
        first.created_at = Some(1_000);
        sync_tasks(db.pool(), &[first]).await.unwrap();

        let mut second = sync_task("task-001");
        second.created_at = Some(5_000);
        second.status = TaskStatus::Done;
        second.completed_at = Some(6_000);
        second.notes = Some(vec!["shipped".to_string()]);
        sync_tasks(db.pool(), &[second]).await.unwrap();

        let task = get_task(db.pool(), "task-001").await.unwrap().unwrap();
        assert_eq!(task.created_at, 1_000);
        assert_eq!(task.status, TaskStatus::Done);
        assert_eq!(task.completed_at, Some(6_000));
        assert_eq!(task.notes, vec!["shipped"]);
    }

    #[tokio::test]
    async fn test_sync_tasks_defaults_created_at_to_now() {
        let db = test_db().await;
        sync_tasks(db.pool(), &[sync_task("task-001")]).await.unwrap();
        let task = get_task(db.pool(), "task-001").await.unwrap().unwrap();
        assert!(task.created_at > 0);
        assert!(task.notes.is_empty());
    }

    #[tokio::test]
    async fn test_sync_tasks_keeps_local_notes_when_source_has_none() {
        let db = test_db().await;
        sync_tasks(db.pool(), &[sync_task("task-001")]).await.unwrap();
        crate::task::add_note(db.pool(), "task-001", "local").await.unwrap();

        sync_tasks(db.pool(), &[sync_task("task-001")]).await.unwrap();
        let task = get_task(db.pool(), "task-001").await.unwrap().unwrap();
        assert_eq!(task.notes, vec!["local"]);
    }

    #[tokio::test]
    async fn test_sync_projects_patches_existing() {
        let db = test_db().await;
        let mut project = SyncProject {
            project_id: "openclaw".to_string(),
            name: "OpenClaw".to_string(),
            color: "#f5a524".to_string(),
            icon: Some("🦞".to_string()),
            description: None,
        };
        sync_projects(db.pool(), &[project.clone()]).await.unwrap();
        let created_at = get_project(db.pool(), "openclaw").await.unwrap().unwrap().created_at;

        project.name = "OpenClaw Core".to_string();
        project.icon = None;
        let outcome = sync_projects(db.pool(), &[project]).await.unwrap();
        assert_eq!(outcome.version, 2);

        let stored = get_project(db.pool(), "openclaw").await.unwrap().unwrap();
        assert_eq!(stored.name, "OpenClaw Core");
        assert_eq!(stored.icon.as_deref(), Some("🦞"));
        assert_eq!(stored.created_at, created_at);
    }

    #[tokio::test]
    async fn test_sync_sessions_replaces_whole_record() {
        let db = test_db().await;
        let original = Session {
            session_key: "agent:main:telegram".to_string(),
            agent_id: "main".to_string(),
            channel: "telegram".to_string(),
            status: SessionStatus::Active,
            last_activity: 10,
            message_count: Some(7),
            last_message: Some("hello".to_string()),
        };
        sync_sessions(db.pool(), &[original.clone()]).await.unwrap();

        let replacement = Session {
            status: SessionStatus::Closed,
            last_activity: 20,
            message_count: None,
            last_message: None,
            ..original
        };
        sync_sessions(db.pool(), &[replacement.clone()]).await.unwrap();

        let stored = get_session(db.pool(), "agent:main:telegram").await.unwrap().unwrap();
        assert_eq!(stored, replacement);
    }

    #[tokio::test]
    async fn test_full_sync_advances_both_keys() {
        let db = test_db().await;
        let outcome = full_sync(db.pool(), &[sync_agent("builder")], &[sync_task("task-001")])
            .await
            .unwrap();
        assert_eq!(outcome.agents, 1);
        assert_eq!(outcome.tasks, 1);

        let agents = get_sync_key(db.pool(), SyncKey::Agents).await.unwrap().unwrap();
        let tasks = get_sync_key(db.pool(), SyncKey::Tasks).await.unwrap().unwrap();
        assert_eq!(agents.version, 1);
        assert_eq!(tasks.version, 1);
        assert_eq!(agents.last_synced, outcome.synced_at);
        assert_eq!(tasks.last_synced, outcome.synced_at);
    }
}
