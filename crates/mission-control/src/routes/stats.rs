//! Per-agent activity statistics.

use std::collections::BTreeMap;

use axum::extract::{Query, State};
use axum::Json;
use database::agent_stats::{self, AgentStatsSummary, StatTotals};
use database::time::{format_day, parse_day, today};
use database::validation::require_fields;
use database::AgentDailyStat;
use serde::{Deserialize, Serialize};

use crate::error::{ApiError, Result};
use crate::state::AppState;

/// Window for a single agent when `days` is not given.
pub const DEFAULT_AGENT_DAYS: i64 = 30;

/// Window for the all-agents view when `days` is not given.
pub const DEFAULT_ALL_DAYS: i64 = 7;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsQuery {
    pub agent_id: Option<String>,
    pub days: Option<i64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentStats {
    pub agent_id: String,
    pub totals: StatTotals,
    pub daily: Vec<AgentDailyStat>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum StatsResponse {
    Agent(AgentStats),
    All(BTreeMap<String, AgentStatsSummary>),
}

/// One agent's daily rows and totals, or every agent's totals.
pub async fn agent_stats(
    State(state): State<AppState>,
    Query(query): Query<StatsQuery>,
) -> Result<Json<StatsResponse>> {
    let db = state.store()?;
    if matches!(query.days, Some(days) if days < 0) {
        return Err(ApiError::BadRequest("days must not be negative".to_string()));
    }
    let today = today();

    match query.agent_id.filter(|id| !id.trim().is_empty()) {
        Some(agent_id) => {
            let days = query.days.unwrap_or(DEFAULT_AGENT_DAYS);
            let daily = agent_stats::get_agent_stats(db.pool(), &agent_id, days, today).await?;
            Ok(Json(StatsResponse::Agent(AgentStats {
                agent_id,
                totals: StatTotals::sum(&daily),
                daily,
            })))
        }
        None => {
            let days = query.days.unwrap_or(DEFAULT_ALL_DAYS);
            let all = agent_stats::get_all_agent_stats(db.pool(), days, today).await?;
            Ok(Json(StatsResponse::All(all)))
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Increment {
    pub agent_id: Option<String>,
    /// `YYYY-MM-DD`, defaults to today.
    pub date: Option<String>,
    #[serde(default)]
    pub tasks_completed: i64,
    #[serde(default)]
    pub tasks_started: i64,
    #[serde(default)]
    pub messages_count: i64,
    #[serde(default)]
    pub active_minutes: i64,
}

/// Add to one agent's counters for one day, creating the row if needed.
pub async fn increment(
    State(state): State<AppState>,
    Json(body): Json<Increment>,
) -> Result<Json<AgentDailyStat>> {
    let db = state.store()?;
    require_fields(&[("agentId", body.agent_id.as_deref())])?;
    let Some(agent_id) = body.agent_id else {
        return Err(ApiError::BadRequest("Missing agentId".to_string()));
    };

    let date = match body.date.as_deref() {
        Some(raw) => parse_day(raw)
            .ok_or_else(|| ApiError::BadRequest(format!("Invalid date '{raw}', expected YYYY-MM-DD")))?,
        None => today(),
    };

    let delta = AgentDailyStat {
        agent_id,
        date: format_day(date),
        tasks_completed: body.tasks_completed,
        tasks_started: body.tasks_started,
        messages_count: body.messages_count,
        active_minutes: body.active_minutes,
    };
    let row = agent_stats::increment_daily_stats(db.pool(), &delta).await?;
    state.changed();

    Ok(Json(row))
}
