//! Agent operations.

use sqlx::{FromRow, SqlitePool};

use crate::error::{DatabaseError, Result};
use crate::models::{Agent, AgentStatus, TokenUsage};
use crate::patch::{merge_agent, AgentPatch};
use crate::time::now_millis;

#[derive(FromRow)]
struct AgentRow {
    agent_id: String,
    name: String,
    emoji: String,
    description: String,
    status: AgentStatus,
    last_activity: Option<i64>,
    current_task: Option<String>,
    token_input: Option<i64>,
    token_output: Option<i64>,
}

impl From<AgentRow> for Agent {
    fn from(row: AgentRow) -> Self {
        let token_usage = match (row.token_input, row.token_output) {
            (None, None) => None,
            (input, output) => Some(TokenUsage {
                input: input.unwrap_or(0),
                output: output.unwrap_or(0),
            }),
        };
        Agent {
            agent_id: row.agent_id,
            name: row.name,
            emoji: row.emoji,
            description: row.description,
            status: row.status,
            last_activity: row.last_activity,
            current_task: row.current_task,
            token_usage,
        }
    }
}

const SELECT_AGENT: &str = r#"
    SELECT agent_id, name, emoji, description, status, last_activity, current_task,
           token_input, token_output
    FROM agents
"#;

/// List all agents in insertion order.
pub async fn list_agents(pool: &SqlitePool) -> Result<Vec<Agent>> {
    let rows = sqlx::query_as::<_, AgentRow>(&format!("{SELECT_AGENT} ORDER BY id"))
        .fetch_all(pool)
        .await?;

    Ok(rows.into_iter().map(Agent::from).collect())
}

/// Look up an agent by its natural key.
pub async fn get_agent(pool: &SqlitePool, agent_id: &str) -> Result<Option<Agent>> {
    let row = sqlx::query_as::<_, AgentRow>(&format!("{SELECT_AGENT} WHERE agent_id = ?"))
        .bind(agent_id)
        .fetch_optional(pool)
        .await?;

    Ok(row.map(Agent::from))
}

/// Insert a new agent.
pub async fn insert_agent(pool: &SqlitePool, agent: &Agent) -> Result<()> {
    let usage = agent.token_usage;
    sqlx::query(
        r#"
        INSERT INTO agents (agent_id, name, emoji, description, status, last_activity,
                            current_task, token_input, token_output)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&agent.agent_id)
    .bind(&agent.name)
    .bind(&agent.emoji)
    .bind(&agent.description)
    .bind(agent.status)
    .bind(agent.last_activity)
    .bind(&agent.current_task)
    .bind(usage.map(|u| u.input))
    .bind(usage.map(|u| u.output))
    .execute(pool)
    .await
    .map_err(|e| DatabaseError::from_insert(e, "Agent", &agent.agent_id))?;

    Ok(())
}

/// Overwrite every mutable column of an existing agent.
pub(crate) async fn write_agent(pool: &SqlitePool, agent: &Agent) -> Result<()> {
    let usage = agent.token_usage;
    sqlx::query(
        r#"
        UPDATE agents
        SET name = ?, emoji = ?, description = ?, status = ?, last_activity = ?,
            current_task = ?, token_input = ?, token_output = ?
        WHERE agent_id = ?
        "#,
    )
    .bind(&agent.name)
    .bind(&agent.emoji)
    .bind(&agent.description)
    .bind(agent.status)
    .bind(agent.last_activity)
    .bind(&agent.current_task)
    .bind(usage.map(|u| u.input))
    .bind(usage.map(|u| u.output))
    .bind(&agent.agent_id)
    .execute(pool)
    .await?;

    Ok(())
}

/// Apply a field-level patch to an agent.
///
/// Returns the updated agent, or `None` when no agent has that id.
pub async fn patch_agent(
    pool: &SqlitePool,
    agent_id: &str,
    patch: &AgentPatch,
) -> Result<Option<Agent>> {
    let Some(existing) = get_agent(pool, agent_id).await? else {
        return Ok(None);
    };

    let updated = merge_agent(&existing, patch);
    write_agent(pool, &updated).await?;
    Ok(Some(updated))
}

/// Update an agent's status, activity time and current task label.
///
/// `last_activity` defaults to now. A missing agent is a silent no-op and
/// yields `false`.
pub async fn update_agent_status(
    pool: &SqlitePool,
    agent_id: &str,
    status: AgentStatus,
    last_activity: Option<i64>,
    current_task: Option<String>,
) -> Result<bool> {
    let patch = AgentPatch {
        status: Some(status),
        last_activity: Some(last_activity.unwrap_or_else(now_millis)),
        current_task,
        ..Default::default()
    };

    let updated = patch_agent(pool, agent_id, &patch).await?;
    if updated.is_none() {
        tracing::debug!(agent_id, "Status update for unknown agent ignored");
    }
    Ok(updated.is_some())
}

/// Hard-delete an agent by its natural key.
///
/// Returns true if an agent was deleted, false if none existed.
pub async fn delete_agent(pool: &SqlitePool, agent_id: &str) -> Result<bool> {
    let result = sqlx::query(
        r#"
        DELETE FROM agents
        WHERE id = (SELECT id FROM agents WHERE agent_id = ? ORDER BY id LIMIT 1)
        "#,
    )
    .bind(agent_id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Insert each agent whose id is not yet present. Existing agents are left
/// untouched, so repeated seeding is harmless.
///
/// Returns the number of agents inserted.
pub async fn seed_agents(pool: &SqlitePool, agents: &[Agent]) -> Result<usize> {
    let mut inserted = 0;
    for agent in agents {
        if get_agent(pool, &agent.agent_id).await?.is_none() {
            insert_agent(pool, agent).await?;
            inserted += 1;
        }
    }

    tracing::info!(inserted, total = agents.len(), "Seeded agents");
    Ok(inserted)
}

/// Count total agents.
pub async fn count_agents(pool: &SqlitePool) -> Result<i64> {
    let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM agents")
        .fetch_one(pool)
        .await?;

    Ok(count)
}
