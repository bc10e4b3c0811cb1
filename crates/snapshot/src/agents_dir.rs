//! The agents-on-disk tree: one directory per agent id, each with a
//! `sessions/` directory whose modification times track activity.

use std::fs;
use std::path::Path;
use std::time::SystemTime;

use chrono::{DateTime, Utc};
use database::{AgentStatus, SyncAgent};

use crate::catalog::Catalog;

/// An agent counts as active when a session file changed this recently.
pub const ACTIVE_WINDOW_MS: i64 = 5 * 60 * 1000;

/// Session files found for one agent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionActivity {
    pub count: usize,
    /// Newest modification time, in milliseconds.
    pub last_activity: Option<i64>,
}

fn mtime_millis(time: SystemTime) -> i64 {
    DateTime::<Utc>::from(time).timestamp_millis()
}

/// Count the entries of `sessions_dir` and find the newest mtime.
///
/// A missing or unreadable directory yields no activity.
pub fn session_activity(sessions_dir: &Path) -> SessionActivity {
    let entries = match fs::read_dir(sessions_dir) {
        Ok(entries) => entries,
        Err(e) => {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(path = %sessions_dir.display(), error = %e, "Failed to read sessions");
            }
            return SessionActivity::default();
        }
    };

    let mut activity = SessionActivity::default();
    for entry in entries.flatten() {
        activity.count += 1;
        let Ok(modified) = entry.metadata().and_then(|m| m.modified()) else {
            continue;
        };
        let millis = mtime_millis(modified);
        if activity.last_activity.map_or(true, |last| millis > last) {
            activity.last_activity = Some(millis);
        }
    }
    activity
}

pub fn status_for(last_activity: Option<i64>, now: i64) -> AgentStatus {
    match last_activity {
        Some(last) if now - last < ACTIVE_WINDOW_MS => AgentStatus::Active,
        _ => AgentStatus::Idle,
    }
}

/// One record per subdirectory of `agents_dir`, sorted by id.
///
/// Plain files are ignored; a missing directory yields nothing.
pub fn read_agents(agents_dir: &Path, catalog: &Catalog, now: i64) -> Vec<SyncAgent> {
    let entries = match fs::read_dir(agents_dir) {
        Ok(entries) => entries,
        Err(e) => {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(path = %agents_dir.display(), error = %e, "Failed to read agents directory");
            }
            return Vec::new();
        }
    };

    let mut agents: Vec<SyncAgent> = entries
        .flatten()
        .filter(|entry| entry.file_type().map(|t| t.is_dir()).unwrap_or(false))
        .filter_map(|entry| {
            let agent_id = entry.file_name().to_str()?.to_string();
            let activity = session_activity(&entry.path().join("sessions"));

            Some(SyncAgent {
                name: catalog.display_name(&agent_id),
                emoji: catalog.emoji_for(&agent_id).to_string(),
                description: catalog.description_for(&agent_id).to_string(),
                status: status_for(activity.last_activity, now),
                last_activity: activity.last_activity,
                current_task: None,
                agent_id,
            })
        })
        .collect();

    agents.sort_by(|a, b| a.agent_id.cmp(&b.agent_id));
    tracing::debug!(count = agents.len(), "Read agents from disk");
    agents
}
