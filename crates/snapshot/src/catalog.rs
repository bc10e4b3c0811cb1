//! Agent and project metadata table.
//!
//! Loaded once at startup, either from a JSON file or from the built-in
//! defaults, and handed to everything that needs display metadata or seed
//! records.
//!
//! File format:
//!
//! ```json
//! {
//!   "agents": [
//!     { "id": "builder", "name": "Builder", "emoji": "🔨",
//!       "description": "Code, ship, iterate", "status": "active",
//!       "model": "claude-opus-4" }
//!   ],
//!   "projects": [
//!     { "id": "katana", "name": "Katana", "color": "#5e6ad2",
//!       "icon": "⚔️", "description": "Katana L2 DeFi platform" }
//!   ]
//! }
//! ```

use std::path::Path;

use database::{Agent, AgentStatus, NewProject};
use serde::{Deserialize, Serialize};

use crate::error::{Result, SnapshotError};

pub const FALLBACK_EMOJI: &str = "🤖";
pub const FALLBACK_DESCRIPTION: &str = "Agent";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentMeta {
    pub id: String,
    pub name: String,
    pub emoji: String,
    pub description: String,
    /// Status assigned when the agent is seeded.
    #[serde(default = "default_status")]
    pub status: AgentStatus,
    #[serde(default)]
    pub model: Option<String>,
}

fn default_status() -> AgentStatus {
    AgentStatus::Idle
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectMeta {
    pub id: String,
    pub name: String,
    pub color: String,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Catalog {
    #[serde(default)]
    pub agents: Vec<AgentMeta>,
    #[serde(default)]
    pub projects: Vec<ProjectMeta>,
}

const BUILTIN_AGENTS: &[(&str, &str, &str, &str, AgentStatus, &str)] = &[
    ("main", "Main", "🧠", "Primary assistant, orchestrator", AgentStatus::Active, "claude-sonnet-4"),
    ("builder", "Builder", "🔨", "Code, ship, iterate", AgentStatus::Active, "claude-opus-4"),
    ("trader", "Trader", "📈", "DeFi operations, trading", AgentStatus::Idle, "claude-sonnet-4"),
    ("watcher", "Watcher", "👁️", "Monitoring, alerts", AgentStatus::Idle, "claude-sonnet-4"),
    ("director", "Director", "🎬", "Project management", AgentStatus::Idle, "claude-sonnet-4"),
    ("analyst", "Analyst", "📊", "Research, analysis", AgentStatus::Idle, "claude-sonnet-4"),
    ("job-hunt", "Job Hunt", "💼", "Job search assistant", AgentStatus::Idle, "claude-sonnet-4"),
    ("clawink", "Clawink", "✍️", "Writing, content", AgentStatus::Idle, "claude-sonnet-4"),
    ("kat", "Kat", "🐱", "Katana specialist", AgentStatus::Idle, "claude-sonnet-4"),
];

const BUILTIN_PROJECTS: &[(&str, &str, &str, &str, &str)] = &[
    ("katana", "Katana", "#5e6ad2", "⚔️", "Katana L2 DeFi platform"),
    ("openclaw", "OpenClaw", "#f5a524", "🦞", "Multi-agent orchestration"),
    ("side-projects", "Side Projects", "#4ade80", "🧪", "Experiments and MVPs"),
];

impl Catalog {
    /// The default nine agents and three projects.
    pub fn builtin() -> Self {
        let agents = BUILTIN_AGENTS
            .iter()
            .map(|&(id, name, emoji, description, status, model)| AgentMeta {
                id: id.to_string(),
                name: name.to_string(),
                emoji: emoji.to_string(),
                description: description.to_string(),
                status,
                model: Some(model.to_string()),
            })
            .collect();

        let projects = BUILTIN_PROJECTS
            .iter()
            .map(|&(id, name, color, icon, description)| ProjectMeta {
                id: id.to_string(),
                name: name.to_string(),
                color: color.to_string(),
                icon: Some(icon.to_string()),
                description: Some(description.to_string()),
            })
            .collect();

        Self { agents, projects }
    }

    /// Load a catalog from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| SnapshotError::io(path, e))?;
        let catalog: Catalog =
            serde_json::from_str(&raw).map_err(|e| SnapshotError::json(path, e))?;

        tracing::info!(
            path = %path.display(),
            agents = catalog.agents.len(),
            projects = catalog.projects.len(),
            "Loaded catalog"
        );
        Ok(catalog)
    }

    /// Load from `path` when given, otherwise use the built-in table.
    pub fn load_or_builtin(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::builtin()),
        }
    }

    pub fn agent(&self, id: &str) -> Option<&AgentMeta> {
        self.agents.iter().find(|a| a.id == id)
    }

    pub fn agent_ids(&self) -> impl Iterator<Item = &str> {
        self.agents.iter().map(|a| a.id.as_str())
    }

    pub fn emoji_for(&self, id: &str) -> &str {
        self.agent(id).map_or(FALLBACK_EMOJI, |a| a.emoji.as_str())
    }

    pub fn description_for(&self, id: &str) -> &str {
        self.agent(id)
            .map_or(FALLBACK_DESCRIPTION, |a| a.description.as_str())
    }

    /// Catalog name, or the id with its first letter upper-cased and dashes
    /// turned into spaces.
    pub fn display_name(&self, id: &str) -> String {
        match self.agent(id) {
            Some(meta) => meta.name.clone(),
            None => display_name_from_id(id),
        }
    }

    /// Agents to insert on first run.
    pub fn seed_agents(&self) -> Vec<Agent> {
        self.agents
            .iter()
            .map(|meta| Agent {
                agent_id: meta.id.clone(),
                name: meta.name.clone(),
                emoji: meta.emoji.clone(),
                description: meta.description.clone(),
                status: meta.status,
                last_activity: None,
                current_task: None,
                token_usage: None,
            })
            .collect()
    }

    /// Projects to insert on first run.
    pub fn seed_projects(&self) -> Vec<NewProject> {
        self.projects
            .iter()
            .map(|meta| NewProject {
                project_id: meta.id.clone(),
                name: meta.name.clone(),
                color: meta.color.clone(),
                icon: meta.icon.clone(),
                description: meta.description.clone(),
            })
            .collect()
    }
}

pub fn display_name_from_id(id: &str) -> String {
    let mut chars = id.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect::<String>().replace('-', " "),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_catalog() {
        let catalog = Catalog::builtin();
        assert_eq!(catalog.agents.len(), 9);
        assert_eq!(catalog.projects.len(), 3);
        assert_eq!(catalog.emoji_for("builder"), "🔨");
        assert_eq!(catalog.agent("builder").unwrap().status, AgentStatus::Active);
        assert_eq!(catalog.agent("kat").unwrap().status, AgentStatus::Idle);
        assert_eq!(catalog.display_name("job-hunt"), "Job Hunt");
    }

    #[test]
    fn test_unknown_agent_falls_back() {
        let catalog = Catalog::builtin();
        assert_eq!(catalog.emoji_for("scout"), FALLBACK_EMOJI);
        assert_eq!(catalog.description_for("scout"), FALLBACK_DESCRIPTION);
        assert_eq!(catalog.display_name("night-owl"), "Night owl");
        assert_eq!(display_name_from_id(""), "");
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.json");
        std::fs::write(
            &path,
            r##"{"agents": [{"id": "scout", "name": "Scout", "emoji": "🛰️", "description": "Recon"}],
                "projects": [{"id": "lab", "name": "Lab", "color": "#123456"}]}"##,
        )
        .unwrap();

        let catalog = Catalog::load_or_builtin(Some(&path)).unwrap();
        assert_eq!(catalog.agent_ids().collect::<Vec<_>>(), vec!["scout"]);
        assert_eq!(catalog.agents[0].status, AgentStatus::Idle);
        assert_eq!(catalog.seed_projects()[0].icon, None);

        std::fs::write(&path, "{not json").unwrap();
        assert!(matches!(
            Catalog::load(&path),
            Err(SnapshotError::Json { .. })
        ));
    }
}
