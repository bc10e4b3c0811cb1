//! Session operations.

use sqlx::SqlitePool;

use crate::error::{DatabaseError, Result};
use crate::models::Session;
use crate::patch::{merge_session, SessionPatch};

const SELECT_SESSION: &str = r#"
    SELECT session_key, agent_id, channel, status, last_activity, message_count, last_message
    FROM sessions
"#;

pub async fn list_sessions(pool: &SqlitePool) -> Result<Vec<Session>> {
    let sessions = sqlx::query_as::<_, Session>(&format!("{SELECT_SESSION} ORDER BY id"))
        .fetch_all(pool)
        .await?;

    Ok(sessions)
}

pub async fn list_sessions_by_agent(pool: &SqlitePool, agent_id: &str) -> Result<Vec<Session>> {
    let sessions =
        sqlx::query_as::<_, Session>(&format!("{SELECT_SESSION} WHERE agent_id = ? ORDER BY id"))
            .bind(agent_id)
            .fetch_all(pool)
            .await?;

    Ok(sessions)
}

pub async fn list_active_sessions(pool: &SqlitePool) -> Result<Vec<Session>> {
    let sessions =
        sqlx::query_as::<_, Session>(&format!("{SELECT_SESSION} WHERE status = 'active' ORDER BY id"))
            .fetch_all(pool)
            .await?;

    Ok(sessions)
}

pub async fn get_session(pool: &SqlitePool, session_key: &str) -> Result<Option<Session>> {
    let session = sqlx::query_as::<_, Session>(&format!("{SELECT_SESSION} WHERE session_key = ?"))
        .bind(session_key)
        .fetch_optional(pool)
        .await?;

    Ok(session)
}

pub(crate) async fn insert_session(pool: &SqlitePool, session: &Session) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO sessions (session_key, agent_id, channel, status, last_activity,
                              message_count, last_message)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&session.session_key)
    .bind(&session.agent_id)
    .bind(&session.channel)
    .bind(session.status)
    .bind(session.last_activity)
    .bind(session.message_count)
    .bind(&session.last_message)
    .execute(pool)
    .await
    .map_err(|e| DatabaseError::from_insert(e, "Session", &session.session_key))?;

    Ok(())
}

/// Overwrite every column of an existing session, clearing optional fields
/// the record does not carry.
pub(crate) async fn replace_session(pool: &SqlitePool, session: &Session) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE sessions
        SET agent_id = ?, channel = ?, status = ?, last_activity = ?, message_count = ?,
            last_message = ?
        WHERE session_key = ?
        "#,
    )
    .bind(&session.agent_id)
    .bind(&session.channel)
    .bind(session.status)
    .bind(session.last_activity)
    .bind(session.message_count)
    .bind(&session.last_message)
    .bind(&session.session_key)
    .execute(pool)
    .await?;

    Ok(())
}

/// Apply a partial update to a session. A missing session is a silent no-op.
pub async fn update_session(
    pool: &SqlitePool,
    session_key: &str,
    patch: &SessionPatch,
) -> Result<bool> {
    let Some(existing) = get_session(pool, session_key).await? else {
        return Ok(false);
    };

    let updated = merge_session(&existing, patch);
    replace_session(pool, &updated).await?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SessionStatus;
    use crate::test_support::test_db;

    fn session(key: &str, agent: &str, status: SessionStatus) -> Session {
        Session {
            session_key: key.to_string(),
            agent_id: agent.to_string(),
            channel: "telegram".to_string(),
            status,
            last_activity: 1_700_000_000_000,
            message_count: Some(4),
            last_message: Some("on it".to_string()),
        }
    }

    #[tokio::test]
    async fn test_session_queries() {
        let db = test_db().await;
        insert_session(db.pool(), &session("s1", "main", SessionStatus::Active)).await.unwrap();
        insert_session(db.pool(), &session("s2", "main", SessionStatus::Closed)).await.unwrap();
        insert_session(db.pool(), &session("s3", "builder", SessionStatus::Active)).await.unwrap();

        assert_eq!(list_sessions(db.pool()).await.unwrap().len(), 3);
        assert_eq!(list_sessions_by_agent(db.pool(), "main").await.unwrap().len(), 2);

        let active: Vec<_> = list_active_sessions(db.pool())
            .await
            .unwrap()
            .into_iter()
            .map(|s| s.session_key)
            .collect();
        assert_eq!(active, vec!["s1", "s3"]);
    }

    #[tokio::test]
    async fn test_update_session_patches_fields() {
        let db = test_db().await;
        insert_session(db.pool(), &session("s1", "main", SessionStatus::Active)).await.unwrap();

        let patch = SessionPatch {
            status: Some(SessionStatus::Idle),
            message_count: Some(5),
            ..Default::default()
        };
        assert!(update_session(db.pool(), "s1", &patch).await.unwrap());

        let stored = get_session(db.pool(), "s1").await.unwrap().unwrap();
        assert_eq!(stored.status, SessionStatus::Idle);
        assert_eq!(stored.message_count, Some(5));
        assert_eq!(stored.last_message.as_deref(), Some("on it"));

        assert!(!update_session(db.pool(), "missing", &patch).await.unwrap());
    }
}
