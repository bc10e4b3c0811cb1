//! Session updates.

use axum::extract::State;
use axum::Json;
use database::validation::require_fields;
use database::{session, SessionPatch};
use serde::Deserialize;

use crate::error::{ApiError, Result};
use crate::routes::Ack;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSession {
    pub session_key: Option<String>,
    #[serde(flatten)]
    pub patch: SessionPatch,
}

/// Patch a session by key. Unknown keys are a no-op.
pub async fn update_session(
    State(state): State<AppState>,
    Json(body): Json<UpdateSession>,
) -> Result<Json<Ack>> {
    let db = state.store()?;
    require_fields(&[("sessionKey", body.session_key.as_deref())])?;
    let Some(session_key) = body.session_key else {
        return Err(ApiError::BadRequest("Missing sessionKey".to_string()));
    };

    let applied = session::update_session(db.pool(), &session_key, &body.patch).await?;
    if applied {
        state.changed();
    }

    Ok(Json(Ack::from_applied(applied)))
}
