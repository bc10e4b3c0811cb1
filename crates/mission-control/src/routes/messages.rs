//! Inter-agent message log.

use axum::extract::{Query, State};
use axum::Json;
use database::validation::require_fields;
use database::{message, Message, MessageType, NewMessage};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::{ApiError, Result};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct MessagesQuery {
    pub limit: Option<i64>,
    pub from: Option<String>,
    pub to: Option<String>,
}

/// Newest first, or the conversation between `from` and `to` oldest first
/// when both are given.
pub async fn list_messages(
    State(state): State<AppState>,
    Query(query): Query<MessagesQuery>,
) -> Result<Json<Vec<Message>>> {
    let db = state.store()?;

    let messages = match (query.from.as_deref(), query.to.as_deref()) {
        (Some(a), Some(b)) => message::messages_between(db.pool(), a, b).await?,
        _ => {
            if matches!(query.limit, Some(limit) if limit < 0) {
                return Err(ApiError::BadRequest("limit must not be negative".to_string()));
            }
            message::list_messages(db.pool(), query.limit).await?
        }
    };

    Ok(Json(messages))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessage {
    pub message_id: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
    pub content: Option<String>,
    #[serde(rename = "type")]
    pub message_type: MessageType,
}

/// Append a message. The id defaults to a fresh `msg-<uuid>`.
pub async fn send_message(
    State(state): State<AppState>,
    Json(body): Json<SendMessage>,
) -> Result<Json<Message>> {
    let db = state.store()?;
    require_fields(&[
        ("from", body.from.as_deref()),
        ("to", body.to.as_deref()),
        ("content", body.content.as_deref()),
    ])?;
    let (Some(from), Some(to), Some(content)) = (body.from, body.to, body.content) else {
        return Err(ApiError::BadRequest("Missing required fields".to_string()));
    };

    let new = NewMessage {
        message_id: body
            .message_id
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(|| format!("msg-{}", Uuid::new_v4())),
        from,
        to,
        content,
        message_type: body.message_type,
    };
    let sent = message::send_message(db.pool(), &new).await?;
    tracing::debug!(message_id = %sent.message_id, from = %sent.from, to = %sent.to, "Message recorded");

    Ok(Json(sent))
}

#[cfg(test)]
mod tests {
    use crate::routes::test_util::{app, do_get, do_post};
    use crate::state::test_support::test_state;
    use axum::http::StatusCode;
    use serde_json::json;

    #[tokio::test]
    async fn test_send_and_list() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(dir.path()).await;

        for (from, to, content) in [
            ("main", "builder", "ship the board"),
            ("builder", "main", "on it"),
            ("main", "trader", "rebalance"),
        ] {
            let (status, body) = do_post(
                app(state.clone()),
                "/api/messages",
                json!({"from": from, "to": to, "content": content, "type": "task"}),
            )
            .await;
            assert_eq!(status, StatusCode::OK);
            assert!(body["messageId"].as_str().unwrap().starts_with("msg-"));
        }

        let (_, body) = do_get(app(state.clone()), "/api/messages?limit=2").await;
        assert_eq!(body.as_array().unwrap().len(), 2);

        let (_, body) = do_get(app(state.clone()), "/api/messages").await;
        assert_eq!(body.as_array().unwrap().len(), 3);

        let (_, body) = do_get(app(state), "/api/messages?from=builder&to=main").await;
        let contents: Vec<_> = body
            .as_array()
            .unwrap()
            .iter()
            .map(|m| m["content"].as_str().unwrap())
            .collect();
        assert_eq!(contents, vec!["ship the board", "on it"]);
    }

    #[tokio::test]
    async fn test_send_requires_fields() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(dir.path()).await;

        let (status, body) = do_post(
            app(state),
            "/api/messages",
            json!({"from": "main", "type": "update"}),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Missing required fields: to, content");
    }
}
