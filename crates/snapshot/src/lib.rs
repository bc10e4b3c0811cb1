//! Readers for the external source of truth Mission Control reconciles
//! from.
//!
//! The layout under the base directory (`$HOME/.openclaw` by default):
//!
//! ```text
//! agents/<agent-id>/sessions/*     session files; mtimes drive activity
//! agents/<agent-id>/workspace/*.md SOUL, IDENTITY, AGENTS, MEMORY
//! shared/tasks.json                {"tasks": [...]}
//! shared/projects.json             {"projects": [...]}
//! ```
//!
//! plus an optional beads issue log (JSONL) anywhere on disk.
//!
//! Everything here is synchronous file IO; async callers should run it on a
//! blocking thread.

pub mod agents_dir;
pub mod beads;
pub mod catalog;
pub mod error;
pub mod projects_file;
pub mod tasks_file;
pub mod workspace;

pub use catalog::Catalog;
pub use error::{Result, SnapshotError};
pub use tasks_file::{TaskInput, TaskRecord};
pub use workspace::AgentDetail;

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use database::{SyncAgent, SyncProject, SyncTask, TaskStatus};
use serde::Serialize;

/// Where each source file lives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SourcePaths {
    pub agents_dir: PathBuf,
    pub tasks_file: PathBuf,
    pub projects_file: PathBuf,
    pub beads_log: Option<PathBuf>,
}

impl SourcePaths {
    pub fn from_base(base: &Path) -> Self {
        Self {
            agents_dir: base.join("agents"),
            tasks_file: base.join("shared").join("tasks.json"),
            projects_file: base.join("shared").join("projects.json"),
            beads_log: None,
        }
    }

    pub fn with_beads_log(mut self, path: Option<PathBuf>) -> Self {
        self.beads_log = path;
        self
    }
}

/// Everything read from disk in one pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    pub agents: Vec<SyncAgent>,
    pub tasks: Vec<SyncTask>,
    pub projects: Vec<SyncProject>,
}

impl Snapshot {
    /// Read every source. Missing or malformed files contribute nothing.
    ///
    /// Beads issues whose id already appears in `tasks.json` are dropped, so
    /// the tasks file wins. Agents with no current task pick up the title of
    /// their first in-progress task.
    pub fn load(paths: &SourcePaths, catalog: &Catalog, now: i64) -> Self {
        let mut agents = agents_dir::read_agents(&paths.agents_dir, catalog, now);
        let mut tasks = tasks_file::read_tasks(&paths.tasks_file);
        let projects = projects_file::read_projects(&paths.projects_file);

        if let Some(log) = &paths.beads_log {
            let known: Vec<&str> = catalog
                .agent_ids()
                .chain(agents.iter().map(|a| a.agent_id.as_str()))
                .collect();
            let seen: HashSet<String> = tasks.iter().map(|t| t.task_id.clone()).collect();

            let beads = beads::beads_to_tasks(&beads::read_beads_log(log), &known);
            tasks.extend(beads.into_iter().filter(|t| !seen.contains(&t.task_id)));
        }

        for agent in agents.iter_mut().filter(|a| a.current_task.is_none()) {
            agent.current_task = tasks
                .iter()
                .find(|t| t.assignee == agent.agent_id && t.status == TaskStatus::InProgress)
                .map(|t| t.title.clone());
        }

        tracing::info!(
            agents = agents.len(),
            tasks = tasks.len(),
            projects = projects.len(),
            "Loaded snapshot"
        );

        Self {
            agents,
            tasks,
            projects,
        }
    }
}
