//! One full reconciliation pass: read the source tree, merge it into the
//! store, rebuild the stats table.

use std::sync::Arc;

use database::time::now_millis;
use database::{agent_stats, sync, Database};
use serde::Serialize;
use snapshot::{Catalog, SourcePaths, Snapshot};

use crate::error::{ApiError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconcileReport {
    pub agents: usize,
    pub tasks: usize,
    pub projects: usize,
    /// Daily stat rows rewritten from the task table.
    pub stat_rows: usize,
    #[serde(with = "database::time::rfc3339_millis")]
    pub synced_at: i64,
}

/// Load the snapshot off the async runtime and merge it into the store.
pub async fn reconcile(
    db: &Database,
    catalog: Arc<Catalog>,
    paths: Arc<SourcePaths>,
) -> Result<ReconcileReport> {
    let snapshot = tokio::task::spawn_blocking(move || Snapshot::load(&paths, &catalog, now_millis()))
        .await
        .map_err(|e| ApiError::Internal(format!("snapshot loader panicked: {e}")))?;

    let pool = db.pool();
    let outcome = sync::full_sync(pool, &snapshot.agents, &snapshot.tasks).await?;
    let projects = sync::sync_projects(pool, &snapshot.projects).await?;
    let stat_rows = agent_stats::resync_stats(pool).await?;

    let report = ReconcileReport {
        agents: outcome.agents,
        tasks: outcome.tasks,
        projects: projects.synced,
        stat_rows,
        synced_at: outcome.synced_at,
    };

    tracing::info!(
        agents = report.agents,
        tasks = report.tasks,
        projects = report.projects,
        stat_rows = report.stat_rows,
        "Reconciliation complete"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::test_support::test_db;
    use database::{agent, dashboard, project, task, TaskStatus};
    use std::fs;

    #[tokio::test]
    async fn test_reconcile_merges_tree_into_store() {
        let dir = tempfile::tempdir().unwrap();
        let paths = SourcePaths::from_base(dir.path());
        fs::create_dir_all(paths.agents_dir.join("builder/sessions")).unwrap();
        fs::create_dir_all(paths.agents_dir.join("trader")).unwrap();
        fs::create_dir_all(paths.tasks_file.parent().unwrap()).unwrap();
        fs::write(
            &paths.tasks_file,
            r#"{"tasks": [
                {"id": "task-001", "title": "Ship", "assignee": "builder", "status": "done",
                 "completedAt": "2024-01-05T10:00:00Z"},
                {"id": "task-002", "title": "Trade", "assignee": "trader", "status": "in-progress",
                 "claimedAt": "2024-01-05T09:00:00Z"}
            ]}"#,
        )
        .unwrap();
        fs::write(
            &paths.projects_file,
            r##"{"projects": [{"id": "katana", "name": "Katana", "color": "#5e6ad2"}]}"##,
        )
        .unwrap();

        let db = test_db().await;
        let report = reconcile(&db, Arc::new(Catalog::builtin()), Arc::new(paths))
            .await
            .unwrap();

        assert_eq!(report.agents, 2);
        assert_eq!(report.tasks, 2);
        assert_eq!(report.projects, 1);
        assert_eq!(report.stat_rows, 2);

        let pool = db.pool();
        assert_eq!(agent::count_agents(pool).await.unwrap(), 2);
        assert!(project::get_project(pool, "katana").await.unwrap().is_some());

        let trader = agent::get_agent(pool, "trader").await.unwrap().unwrap();
        assert_eq!(trader.current_task.as_deref(), Some("Trade"));

        let shipped = task::get_task(pool, "task-001").await.unwrap().unwrap();
        assert_eq!(shipped.status, TaskStatus::Done);

        let data = dashboard::get_dashboard_data(pool).await.unwrap();
        assert_eq!(data.agents.len(), 2);
        assert_eq!(data.tasks.len(), 2);
    }

    #[tokio::test]
    async fn test_reconcile_empty_tree() {
        let dir = tempfile::tempdir().unwrap();
        let db = test_db().await;
        let report = reconcile(
            &db,
            Arc::new(Catalog::builtin()),
            Arc::new(SourcePaths::from_base(dir.path())),
        )
        .await
        .unwrap();

        assert_eq!(report.agents, 0);
        assert_eq!(report.tasks, 0);
        assert_eq!(report.projects, 0);
    }
}
