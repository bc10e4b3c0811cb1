//! Beads issue log: one JSON issue per line, with its own status and
//! priority vocabulary.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use database::time::parse_timestamp;
use database::{Priority, SyncTask, TaskStatus};
use serde::Deserialize;
use serde_json::Value;

use crate::tasks_file::UNKNOWN_CREATOR;

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct BeadsIssue {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub priority: Option<BeadsPriority>,
    #[serde(default)]
    pub issue_type: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub created_by: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default)]
    pub assignee: Option<String>,
}

/// Priority as written by beads: 1 (most urgent) to 5, sometimes as text
/// such as `"P1"` or `"high"`. Anything else reads as no priority.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum BeadsPriority {
    Level(i64),
    Label(String),
    Other(Value),
}

impl BeadsPriority {
    pub fn level(&self) -> Option<i64> {
        match self {
            BeadsPriority::Level(level) => Some(*level),
            BeadsPriority::Label(label) => {
                let label = label.trim().to_ascii_lowercase();
                match label.as_str() {
                    "urgent" | "critical" => Some(1),
                    "high" => Some(2),
                    "medium" => Some(3),
                    "low" => Some(4),
                    _ => label.strip_prefix('p').unwrap_or(label.as_str()).parse().ok(),
                }
            }
            BeadsPriority::Other(_) => None,
        }
    }
}

pub fn map_status(status: &str) -> TaskStatus {
    match status {
        "open" => TaskStatus::Todo,
        "in_progress" => TaskStatus::InProgress,
        "done" | "closed" => TaskStatus::Done,
        _ => TaskStatus::Backlog,
    }
}

pub fn map_priority(priority: Option<i64>) -> Priority {
    match priority {
        Some(1) => Priority::Urgent,
        Some(2) => Priority::High,
        Some(3) => Priority::Medium,
        Some(4) => Priority::Low,
        _ => Priority::None,
    }
}

/// Explicit assignee, else the first label naming a known agent, else empty.
pub fn infer_assignee(issue: &BeadsIssue, known_agent_ids: &[&str]) -> String {
    if let Some(assignee) = issue.assignee.as_deref().filter(|a| !a.trim().is_empty()) {
        return assignee.to_string();
    }

    issue
        .labels
        .iter()
        .find(|label| known_agent_ids.contains(&label.as_str()))
        .cloned()
        .unwrap_or_default()
}

/// Parse the log line by line. Blank lines are skipped; malformed lines are
/// logged with their line number and skipped. A missing file yields nothing.
pub fn read_beads_log(path: &Path) -> Vec<BeadsIssue> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Failed to open beads log");
            return Vec::new();
        }
    };

    let mut issues = Vec::new();
    for (line_num, line) in BufReader::new(file).lines().enumerate() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                tracing::warn!(line = line_num + 1, error = %e, "Stopped reading beads log");
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        match serde_json::from_str::<BeadsIssue>(&line) {
            Ok(issue) => issues.push(issue),
            Err(e) => {
                tracing::warn!(line = line_num + 1, error = %e, "Skipping malformed beads issue")
            }
        }
    }
    issues
}

/// Translate issues into task records for the reconciler.
pub fn beads_to_tasks(issues: &[BeadsIssue], known_agent_ids: &[&str]) -> Vec<SyncTask> {
    issues
        .iter()
        .filter(|issue| !issue.id.trim().is_empty())
        .map(|issue| {
            let status = map_status(issue.status.as_deref().unwrap_or_default());
            let updated_at = issue.updated_at.as_deref().and_then(parse_timestamp);

            SyncTask {
                task_id: issue.id.clone(),
                title: issue.title.clone(),
                description: issue.description.clone(),
                assignee: infer_assignee(issue, known_agent_ids),
                project_id: None,
                status,
                priority: map_priority(issue.priority.as_ref().and_then(BeadsPriority::level)),
                created_by: issue
                    .created_by
                    .clone()
                    .filter(|c| !c.is_empty())
                    .unwrap_or_else(|| UNKNOWN_CREATOR.to_string()),
                created_at: issue.created_at.as_deref().and_then(parse_timestamp),
                claimed_at: None,
                // The log has no completion time; the last update is the closest.
                completed_at: (status == TaskStatus::Done).then_some(updated_at).flatten(),
                notes: None,
            }
        })
        .collect()
}
