//! Sync-state ledger: one row per entity kind, recording when it was last
//! synced and how many syncs have happened.

use sqlx::SqlitePool;

use crate::error::Result;
use crate::models::SyncState;

/// Entity kinds tracked by the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SyncKey {
    Agents,
    Tasks,
    Projects,
    Sessions,
}

impl SyncKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncKey::Agents => "agents",
            SyncKey::Tasks => "tasks",
            SyncKey::Projects => "projects",
            SyncKey::Sessions => "sessions",
        }
    }
}

/// All ledger rows.
pub async fn get_sync_state(pool: &SqlitePool) -> Result<Vec<SyncState>> {
    let rows = sqlx::query_as::<_, SyncState>(
        r#"
        SELECT key, last_synced, version
        FROM sync_state
        ORDER BY key
        "#,
    )
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

pub async fn get_sync_key(pool: &SqlitePool, key: SyncKey) -> Result<Option<SyncState>> {
    let row = sqlx::query_as::<_, SyncState>(
        r#"
        SELECT key, last_synced, version
        FROM sync_state
        WHERE key = ?
        "#,
    )
    .bind(key.as_str())
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Record that a sync of `key` happened at `now`.
///
/// Creates the row at version 1, otherwise bumps the version by exactly one,
/// regardless of how many records the sync touched.
pub async fn mark_synced(pool: &SqlitePool, key: SyncKey, now: i64) -> Result<SyncState> {
    sqlx::query(
        r#"
        INSERT INTO sync_state (key, last_synced, version)
        VALUES (?, ?, 1)
        ON CONFLICT(key) DO UPDATE SET
            last_synced = excluded.last_synced,
            version = sync_state.version + 1
        "#,
    )
    .bind(key.as_str())
    .bind(now)
    .execute(pool)
    .await?;

    let state = sqlx::query_as::<_, SyncState>(
        r#"
        SELECT key, last_synced, version
        FROM sync_state
        WHERE key = ?
        "#,
    )
    .bind(key.as_str())
    .fetch_one(pool)
    .await?;

    tracing::debug!(key = key.as_str(), version = state.version, "Sync state advanced");
    Ok(state)
}
