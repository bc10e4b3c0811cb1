//! Per-agent daily statistics.
//!
//! There are two ways rows get written, with different semantics:
//!
//! - [`increment_daily_stats`] adds to the counters already stored. This is
//!   the path for individual events.
//! - [`sync_stats_from_tasks`] / [`resync_stats`] overwrite counters with a
//!   full recomputation from the task collection. This is for backfill and
//!   periodic resync only; running it replaces whatever increments landed on
//!   the same `(agent_id, date)` keys.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::Serialize;
use sqlx::SqlitePool;

use crate::error::Result;
use crate::models::{AgentDailyStat, Task, TaskStatus};
use crate::time::{date_of, days_before, format_day};

/// Recompute daily stats from the full task collection.
///
/// - a done task with `completed_at` counts one completion on that day;
/// - any task with `claimed_at` counts one start on that day, whatever its
///   current status;
/// - tasks without an assignee are skipped.
///
/// Message counts and active minutes are not derivable from tasks and stay
/// zero. Rows come back ordered by `(agent_id, date)`.
pub fn derive_daily_stats(tasks: &[Task]) -> Vec<AgentDailyStat> {
    let mut rows: BTreeMap<(String, String), AgentDailyStat> = BTreeMap::new();

    for task in tasks {
        let assignee = task.assignee.trim();
        if assignee.is_empty() {
            continue;
        }

        if task.status == TaskStatus::Done {
            if let Some(day) = task.completed_at.and_then(date_of) {
                row_for(&mut rows, assignee, day).tasks_completed += 1;
            }
        }

        if let Some(day) = task.claimed_at.and_then(date_of) {
            row_for(&mut rows, assignee, day).tasks_started += 1;
        }
    }

    rows.into_values().collect()
}

fn row_for<'a>(
    rows: &'a mut BTreeMap<(String, String), AgentDailyStat>,
    agent_id: &str,
    day: String,
) -> &'a mut AgentDailyStat {
    rows.entry((agent_id.to_string(), day.clone()))
        .or_insert_with(|| AgentDailyStat::empty(agent_id, day))
}

/// Insert or overwrite one `(agent_id, date)` row.
pub async fn upsert_daily_stats(pool: &SqlitePool, stat: &AgentDailyStat) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO agent_stats (agent_id, date, tasks_completed, tasks_started,
                                 messages_count, active_minutes)
        VALUES (?, ?, ?, ?, ?, ?)
        ON CONFLICT(agent_id, date) DO UPDATE SET
            tasks_completed = excluded.tasks_completed,
            tasks_started = excluded.tasks_started,
            messages_count = excluded.messages_count,
            active_minutes = excluded.active_minutes
        "#,
    )
    .bind(&stat.agent_id)
    .bind(&stat.date)
    .bind(stat.tasks_completed)
    .bind(stat.tasks_started)
    .bind(stat.messages_count)
    .bind(stat.active_minutes)
    .execute(pool)
    .await?;

    Ok(())
}

/// Add `delta`'s counters to the stored row, creating it when absent.
pub async fn increment_daily_stats(pool: &SqlitePool, delta: &AgentDailyStat) -> Result<AgentDailyStat> {
    sqlx::query(
        r#"
        INSERT INTO agent_stats (agent_id, date, tasks_completed, tasks_started,
                                 messages_count, active_minutes)
        VALUES (?, ?, ?, ?, ?, ?)
        ON CONFLICT(agent_id, date) DO UPDATE SET
            tasks_completed = agent_stats.tasks_completed + excluded.tasks_completed,
            tasks_started = agent_stats.tasks_started + excluded.tasks_started,
            messages_count = agent_stats.messages_count + excluded.messages_count,
            active_minutes = agent_stats.active_minutes + excluded.active_minutes
        "#,
    )
    .bind(&delta.agent_id)
    .bind(&delta.date)
    .bind(delta.tasks_completed)
    .bind(delta.tasks_started)
    .bind(delta.messages_count)
    .bind(delta.active_minutes)
    .execute(pool)
    .await?;

    let row = sqlx::query_as::<_, AgentDailyStat>(
        r#"
        SELECT agent_id, date, tasks_completed, tasks_started, messages_count, active_minutes
        FROM agent_stats
        WHERE agent_id = ? AND date = ?
        "#,
    )
    .bind(&delta.agent_id)
    .bind(&delta.date)
    .fetch_one(pool)
    .await?;

    Ok(row)
}

/// Overwrite each row in `stats`. Returns the number of rows written.
pub async fn sync_stats_from_tasks(pool: &SqlitePool, stats: &[AgentDailyStat]) -> Result<usize> {
    for stat in stats {
        upsert_daily_stats(pool, stat).await?;
    }
    Ok(stats.len())
}

/// Recompute every derivable row from the stored tasks and overwrite.
pub async fn resync_stats(pool: &SqlitePool) -> Result<usize> {
    let tasks = crate::task::list_tasks(pool).await?;
    let stats = derive_daily_stats(&tasks);
    let written = sync_stats_from_tasks(pool, &stats).await?;

    tracing::info!(tasks = tasks.len(), rows = written, "Recomputed agent stats");
    Ok(written)
}

/// All stored rows, ordered by agent then date.
pub async fn list_all_stats(pool: &SqlitePool) -> Result<Vec<AgentDailyStat>> {
    let rows = sqlx::query_as::<_, AgentDailyStat>(
        r#"
        SELECT agent_id, date, tasks_completed, tasks_started, messages_count, active_minutes
        FROM agent_stats
        ORDER BY agent_id, date
        "#,
    )
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// One agent's rows dated on or after `today - days`, oldest first.
pub async fn get_agent_stats(
    pool: &SqlitePool,
    agent_id: &str,
    days: i64,
    today: NaiveDate,
) -> Result<Vec<AgentDailyStat>> {
    let cutoff = format_day(days_before(today, days));
    let rows = sqlx::query_as::<_, AgentDailyStat>(
        r#"
        SELECT agent_id, date, tasks_completed, tasks_started, messages_count, active_minutes
        FROM agent_stats
        WHERE agent_id = ? AND date >= ?
        ORDER BY date
        "#,
    )
    .bind(agent_id)
    .bind(cutoff)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Summed counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatTotals {
    pub tasks_completed: i64,
    pub tasks_started: i64,
    pub messages_count: i64,
    pub active_minutes: i64,
}

impl StatTotals {
    pub fn sum(rows: &[AgentDailyStat]) -> Self {
        rows.iter().fold(Self::default(), |mut acc, row| {
            acc.add(row);
            acc
        })
    }

    fn add(&mut self, row: &AgentDailyStat) {
        self.tasks_completed += row.tasks_completed;
        self.tasks_started += row.tasks_started;
        self.messages_count += row.messages_count;
        self.active_minutes += row.active_minutes;
    }
}

/// An agent's totals over a window plus the rows they came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentStatsSummary {
    #[serde(flatten)]
    pub totals: StatTotals,
    pub daily_stats: Vec<AgentDailyStat>,
}

/// Per-agent totals over rows dated on or after `today - days`.
pub async fn get_all_agent_stats(
    pool: &SqlitePool,
    days: i64,
    today: NaiveDate,
) -> Result<BTreeMap<String, AgentStatsSummary>> {
    let cutoff = format_day(days_before(today, days));
    let rows = sqlx::query_as::<_, AgentDailyStat>(
        r#"
        SELECT agent_id, date, tasks_completed, tasks_started, messages_count, active_minutes
        FROM agent_stats
        WHERE date >= ?
        ORDER BY agent_id, date
        "#,
    )
    .bind(cutoff)
    .fetch_all(pool)
    .await?;

    let mut by_agent: BTreeMap<String, AgentStatsSummary> = BTreeMap::new();
    for row in rows {
        let summary = by_agent
            .entry(row.agent_id.clone())
            .or_insert_with(|| AgentStatsSummary {
                totals: StatTotals::default(),
                daily_stats: Vec::new(),
            });
        summary.totals.add(&row);
        summary.daily_stats.push(row);
    }

    Ok(by_agent)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Priority;
    use crate::test_support::test_db;
    use crate::time::parse_timestamp;

    fn task(assignee: &str, status: TaskStatus, claimed: Option<&str>, completed: Option<&str>) -> Task {
        Task {
            task_id: format!("task-{assignee}-{status:?}"),
            title: "t".to_string(),
            description: None,
            assignee: assignee.to_string(),
            project_id: None,
            status,
            priority: Priority::None,
            created_by: "main".to_string(),
            created_at: 0,
            claimed_at: claimed.and_then(parse_timestamp),
            completed_at: completed.and_then(parse_timestamp),
            blocked_reason: None,
            blocked_at: None,
            notes: Vec::new(),
        }
    }

    #[test]
    fn test_derive_single_day() {
        let tasks = vec![
            task("builder", TaskStatus::Done, None, Some("2024-01-05T10:00:00Z")),
            task("builder", TaskStatus::InProgress, Some("2024-01-05T09:00:00Z"), None),
        ];

        let stats = derive_daily_stats(&tasks);
        assert_eq!(
            stats,
            vec![AgentDailyStat {
                agent_id: "builder".to_string(),
                date: "2024-01-05".to_string(),
                tasks_completed: 1,
                tasks_started: 1,
                messages_count: 0,
                active_minutes: 0,
            }]
        );
    }

    #[test]
    fn test_derive_skips_unassigned_and_unfinished_completions() {
        let tasks = vec![
            task("", TaskStatus::Done, Some("2024-01-04T09:00:00Z"), Some("2024-01-05T10:00:00Z")),
            // completed_at left over from an earlier run, but reopened
            task("trader", TaskStatus::Todo, None, Some("2024-01-05T10:00:00Z")),
            task("trader", TaskStatus::Done, Some("2024-01-03T09:00:00Z"), Some("2024-01-04T10:00:00Z")),
        ];

        let stats = derive_daily_stats(&tasks);
        let keys: Vec<_> = stats.iter().map(|s| (s.agent_id.as_str(), s.date.as_str())).collect();
        assert_eq!(keys, vec![("trader", "2024-01-03"), ("trader", "2024-01-04")]);
        assert_eq!(stats[0].tasks_started, 1);
        assert_eq!(stats[0].tasks_completed, 0);
        assert_eq!(stats[1].tasks_completed, 1);
    }

    #[tokio::test]
    async fn test_resync_overwrites_and_increment_accumulates() {
        let db = test_db().await;
        let row = AgentDailyStat {
            tasks_completed: 1,
            ..AgentDailyStat::empty("builder", "2024-01-05")
        };

        let after = increment_daily_stats(db.pool(), &row).await.unwrap();
        assert_eq!(after.tasks_completed, 1);
        let after = increment_daily_stats(db.pool(), &row).await.unwrap();
        assert_eq!(after.tasks_completed, 2);

        sync_stats_from_tasks(db.pool(), &[row.clone()]).await.unwrap();
        sync_stats_from_tasks(db.pool(), &[row]).await.unwrap();
        let rows = list_all_stats(db.pool()).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].tasks_completed, 1);
    }

    #[tokio::test]
    async fn test_window_queries() {
        let db = test_db().await;
        let today = NaiveDate::from_ymd_opt(2024, 1, 31).unwrap();
        for (agent, date, done) in [
            ("builder", "2024-01-30", 2),
            ("builder", "2024-01-20", 1),
            ("builder", "2023-12-01", 9),
            ("trader", "2024-01-29", 4),
        ] {
            let stat = AgentDailyStat {
                tasks_completed: done,
                ..AgentDailyStat::empty(agent, date)
            };
            upsert_daily_stats(db.pool(), &stat).await.unwrap();
        }

        let builder = get_agent_stats(db.pool(), "builder", 30, today).await.unwrap();
        let dates: Vec<_> = builder.iter().map(|s| s.date.as_str()).collect();
        assert_eq!(dates, vec!["2024-01-20", "2024-01-30"]);
        assert_eq!(StatTotals::sum(&builder).tasks_completed, 3);

        let all = get_all_agent_stats(db.pool(), 7, today).await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all["builder"].totals.tasks_completed, 2);
        assert_eq!(all["trader"].totals.tasks_completed, 4);
        assert_eq!(all["trader"].daily_stats.len(), 1);
    }

    #[tokio::test]
    async fn test_resync_from_stored_tasks() {
        let db = test_db().await;
        let mut t = task("builder", TaskStatus::Done, Some("2024-01-05T09:00:00Z"), Some("2024-01-05T10:00:00Z"));
        t.task_id = "task-001".to_string();
        crate::task::insert_task(db.pool(), &t).await.unwrap();

        assert_eq!(resync_stats(db.pool()).await.unwrap(), 1);
        assert_eq!(resync_stats(db.pool()).await.unwrap(), 1);

        let rows = list_all_stats(db.pool()).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].tasks_completed, 1);
        assert_eq!(rows[0].tasks_started, 1);
    }
}
