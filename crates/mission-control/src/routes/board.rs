//! Server-rendered kanban board.

use std::collections::HashMap;

use askama::Template;
use axum::extract::State;
use database::dashboard::{get_dashboard_data, AgentView, ProjectView, TaskView};
use database::{DashboardData, TaskStatus};

use crate::error::Result;
use crate::state::AppState;

/// Board page template.
#[derive(Template)]
#[template(path = "board.html")]
pub struct BoardTemplate {
    pub agents: Vec<AgentCard>,
    pub columns: Vec<Column>,
    pub last_updated: String,
}

pub struct AgentCard {
    pub emoji: String,
    pub name: String,
    pub status: &'static str,
    pub current_task: String,
    pub completed: i64,
    pub started: i64,
}

pub struct Column {
    pub label: &'static str,
    pub status: &'static str,
    pub cards: Vec<TaskCard>,
}

pub struct TaskCard {
    pub id: String,
    pub title: String,
    pub assignee: String,
    pub priority: &'static str,
    pub project: String,
    pub project_color: String,
}

impl AgentCard {
    fn from_view(agent: &AgentView) -> Self {
        Self {
            emoji: agent.emoji.clone(),
            name: agent.name.clone(),
            status: agent.status.as_str(),
            current_task: agent.current_task.clone().unwrap_or_default(),
            completed: agent.weekly_stats.tasks_completed,
            started: agent.weekly_stats.tasks_started,
        }
    }
}

impl TaskCard {
    fn from_view(task: &TaskView, projects: &HashMap<&str, &ProjectView>) -> Self {
        let project = task
            .project_id
            .as_deref()
            .and_then(|id| projects.get(id).copied());

        Self {
            id: task.id.clone(),
            title: task.title.clone(),
            assignee: task.assignee.clone(),
            priority: task.priority.as_str(),
            project: project.map(|p| p.name.clone()).unwrap_or_default(),
            project_color: project.map(|p| p.color.clone()).unwrap_or_default(),
        }
    }
}

impl BoardTemplate {
    pub fn from_data(data: &DashboardData) -> Self {
        let projects: HashMap<&str, &ProjectView> =
            data.projects.iter().map(|p| (p.id.as_str(), p)).collect();

        let columns = TaskStatus::ALL
            .iter()
            .map(|&status| Column {
                label: status.label(),
                status: status.as_str(),
                cards: data
                    .tasks_in(status)
                    .map(|task| TaskCard::from_view(task, &projects))
                    .collect(),
            })
            .collect();

        Self {
            agents: data.agents.iter().map(AgentCard::from_view).collect(),
            columns,
            last_updated: data.last_updated.clone(),
        }
    }
}

/// Render the board page.
pub async fn board_page(State(state): State<AppState>) -> Result<BoardTemplate> {
    let db = state.store()?;
    let data = get_dashboard_data(db.pool()).await?;
    Ok(BoardTemplate::from_data(&data))
}
