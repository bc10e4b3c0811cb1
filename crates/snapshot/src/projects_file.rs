//! The shared `projects.json` document: `{"projects": [...]}`.

use std::fs;
use std::path::Path;

use database::SyncProject;
use serde::Deserialize;

/// Color given to projects the file lists without one.
pub const DEFAULT_PROJECT_COLOR: &str = "#6b7280";

#[derive(Debug, Deserialize)]
struct ProjectRecord {
    #[serde(default)]
    id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    color: Option<String>,
    #[serde(default)]
    icon: Option<String>,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ProjectsDocument {
    #[serde(default)]
    projects: Vec<ProjectRecord>,
}

/// Projects from the file. Missing or malformed files yield nothing, and
/// records without an id or name are skipped.
pub fn read_projects(path: &Path) -> Vec<SyncProject> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) => {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(path = %path.display(), error = %e, "Failed to read projects file");
            }
            return Vec::new();
        }
    };

    let doc: ProjectsDocument = match serde_json::from_str(&raw) {
        Ok(doc) => doc,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Ignoring malformed projects file");
            return Vec::new();
        }
    };

    doc.projects
        .into_iter()
        .filter(|p| !p.id.trim().is_empty() && !p.name.trim().is_empty())
        .map(|p| SyncProject {
            project_id: p.id,
            name: p.name,
            color: p
                .color
                .filter(|c| !c.is_empty())
                .unwrap_or_else(|| DEFAULT_PROJECT_COLOR.to_string()),
            icon: p.icon,
            description: p.description,
        })
        .collect()
}
