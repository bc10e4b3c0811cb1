//! Dashboard payload, as a single read and as a live stream.

use std::convert::Infallible;

use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::Json;
use database::dashboard::get_dashboard_data;
use database::DashboardData;
use futures::stream::{Stream, StreamExt};

use crate::error::Result;
use crate::state::AppState;

/// Get the composed dashboard as JSON.
pub async fn dashboard_api(State(state): State<AppState>) -> Result<Json<DashboardData>> {
    let db = state.store()?;
    let data = get_dashboard_data(db.pool()).await?;
    Ok(Json(data))
}

/// Stream dashboard payloads as Server-Sent Events.
///
/// Each payload is a `dashboard` event. A failed read becomes an `error`
/// event and the stream keeps going.
pub async fn dashboard_stream(
    State(state): State<AppState>,
) -> Result<Sse<impl Stream<Item = std::result::Result<Event, Infallible>>>> {
    let db = state.store()?.clone();
    tracing::debug!(mode = state.source.mode().as_str(), "Dashboard stream opened");

    let events = state.source.updates(db).map(|update| Ok(to_event(update)));
    Ok(Sse::new(events).keep_alive(KeepAlive::default()))
}

fn to_event(update: database::Result<DashboardData>) -> Event {
    let encoded = update.map_err(|e| e.to_string()).and_then(|data| {
        Event::default()
            .event("dashboard")
            .json_data(&data)
            .map_err(|e| e.to_string())
    });

    match encoded {
        Ok(event) => event,
        Err(message) => {
            tracing::warn!(error = %message, "Dashboard update failed");
            Event::default().event("error").data(message)
        }
    }
}
