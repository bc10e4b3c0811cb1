//! Inter-agent messages. Append-only: there is no update or delete.

use sqlx::SqlitePool;

use crate::error::{DatabaseError, Result};
use crate::models::{Message, NewMessage};
use crate::time::now_millis;

/// Record a message, stamping it with the current time.
pub async fn send_message(pool: &SqlitePool, new: &NewMessage) -> Result<Message> {
    let message = Message {
        message_id: new.message_id.clone(),
        from: new.from.clone(),
        to: new.to.clone(),
        content: new.content.clone(),
        timestamp: now_millis(),
        message_type: new.message_type,
    };

    sqlx::query(
        r#"
        INSERT INTO messages (message_id, from_agent, to_agent, content, timestamp, message_type)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&message.message_id)
    .bind(&message.from)
    .bind(&message.to)
    .bind(&message.content)
    .bind(message.timestamp)
    .bind(message.message_type)
    .execute(pool)
    .await
    .map_err(|e| DatabaseError::from_insert(e, "Message", &message.message_id))?;

    Ok(message)
}

/// Messages newest first, optionally capped at `limit`.
pub async fn list_messages(pool: &SqlitePool, limit: Option<i64>) -> Result<Vec<Message>> {
    // SQLite treats a negative LIMIT as "no limit".
    let messages = sqlx::query_as::<_, Message>(
        r#"
        SELECT message_id, from_agent, to_agent, content, timestamp, message_type
        FROM messages
        ORDER BY timestamp DESC, id DESC
        LIMIT ?
        "#,
    )
    .bind(limit.unwrap_or(-1))
    .fetch_all(pool)
    .await?;

    Ok(messages)
}

/// The conversation between two agents, in either direction, oldest first.
pub async fn messages_between(pool: &SqlitePool, a: &str, b: &str) -> Result<Vec<Message>> {
    let messages = sqlx::query_as::<_, Message>(
        r#"
        SELECT message_id, from_agent, to_agent, content, timestamp, message_type
        FROM messages
        WHERE (from_agent = ? AND to_agent = ?) OR (from_agent = ? AND to_agent = ?)
        ORDER BY timestamp, id
        "#,
    )
    .bind(a)
    .bind(b)
    .bind(b)
    .bind(a)
    .fetch_all(pool)
    .await?;

    Ok(messages)
}
