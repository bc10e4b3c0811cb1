//! Project CRUD operations.
//!
//! Deleting a project does not cascade: tasks keep whatever `project_id`
//! they had.

use sqlx::SqlitePool;

use crate::error::{DatabaseError, Result};
use crate::models::{NewProject, Project, Task};
use crate::patch::{merge_project, ProjectPatch};
use crate::time::now_millis;

/// List all projects in insertion order.
pub async fn list_projects(pool: &SqlitePool) -> Result<Vec<Project>> {
    let projects = sqlx::query_as::<_, Project>(
        r#"
        SELECT project_id, name, color, icon, description, created_at
        FROM projects
        ORDER BY id
        "#,
    )
    .fetch_all(pool)
    .await?;

    Ok(projects)
}

/// Look up a project by its natural key.
pub async fn get_project(pool: &SqlitePool, project_id: &str) -> Result<Option<Project>> {
    let project = sqlx::query_as::<_, Project>(
        r#"
        SELECT project_id, name, color, icon, description, created_at
        FROM projects
        WHERE project_id = ?
        "#,
    )
    .bind(project_id)
    .fetch_optional(pool)
    .await?;

    Ok(project)
}

pub(crate) async fn insert_project(pool: &SqlitePool, project: &Project) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO projects (project_id, name, color, icon, description, created_at)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&project.project_id)
    .bind(&project.name)
    .bind(&project.color)
    .bind(&project.icon)
    .bind(&project.description)
    .bind(project.created_at)
    .execute(pool)
    .await
    .map_err(|e| DatabaseError::from_insert(e, "Project", &project.project_id))?;

    Ok(())
}

pub(crate) async fn write_project(pool: &SqlitePool, project: &Project) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE projects
        SET name = ?, color = ?, icon = ?, description = ?
        WHERE project_id = ?
        "#,
    )
    .bind(&project.name)
    .bind(&project.color)
    .bind(&project.icon)
    .bind(&project.description)
    .bind(&project.project_id)
    .execute(pool)
    .await?;

    Ok(())
}

/// Create a project.
///
/// Fails with `AlreadyExists` if the project id is taken.
pub async fn create_project(pool: &SqlitePool, new: &NewProject) -> Result<Project> {
    if get_project(pool, &new.project_id).await?.is_some() {
        return Err(DatabaseError::AlreadyExists {
            entity: "Project",
            id: new.project_id.clone(),
        });
    }

    let project = Project {
        project_id: new.project_id.clone(),
        name: new.name.clone(),
        color: new.color.clone(),
        icon: new.icon.clone(),
        description: new.description.clone(),
        created_at: now_millis(),
    };
    insert_project(pool, &project).await?;

    tracing::info!(project_id = %project.project_id, "Created project");
    Ok(project)
}

/// Apply a partial update to a project.
///
/// Fails with `NotFound` if the project does not exist.
pub async fn update_project(
    pool: &SqlitePool,
    project_id: &str,
    patch: &ProjectPatch,
) -> Result<Project> {
    let existing = get_project(pool, project_id)
        .await?
        .ok_or_else(|| DatabaseError::NotFound {
            entity: "Project",
            id: project_id.to_string(),
        })?;

    let updated = merge_project(&existing, patch);
    write_project(pool, &updated).await?;
    Ok(updated)
}

/// Delete a project by its natural key.
///
/// Returns true if a project was deleted, false if none existed.
pub async fn delete_project(pool: &SqlitePool, project_id: &str) -> Result<bool> {
    let result = sqlx::query(
        r#"
        DELETE FROM projects
        WHERE project_id = ?
        "#,
    )
    .bind(project_id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Tasks linked to a project, newest first.
pub async fn list_project_tasks(pool: &SqlitePool, project_id: &str) -> Result<Vec<Task>> {
    crate::task::list_tasks_where(pool, "project_id = ?", project_id).await
}

/// Insert each default project whose id is not yet present.
///
/// Returns the number of projects inserted.
pub async fn seed_projects(pool: &SqlitePool, defaults: &[NewProject]) -> Result<usize> {
    let mut inserted = 0;
    for new in defaults {
        if get_project(pool, &new.project_id).await?.is_none() {
            create_project(pool, new).await?;
            inserted += 1;
        }
    }

    tracing::info!(inserted, total = defaults.len(), "Seeded projects");
    Ok(inserted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NewTask, Priority, TaskStatus};
    use crate::test_support::test_db;

    fn katana() -> NewProject {
        NewProject {
            project_id: "katana".to_string(),
            name: "Katana".to_string(),
            color: "#5e6ad2".to_string(),
            icon: Some("⚔️".to_string()),
            description: Some("Katana L2 DeFi platform".to_string()),
        }
    }

    #[tokio::test]
    async fn test_project_crud() {
        let db = test_db().await;

        let created = create_project(db.pool(), &katana()).await.unwrap();
        assert_eq!(created.name, "Katana");

        let dup = create_project(db.pool(), &katana()).await;
        assert!(matches!(dup, Err(DatabaseError::AlreadyExists { ref id, .. }) if id == "katana"));

        let patch = ProjectPatch {
            color: Some("#000000".to_string()),
            ..Default::default()
        };
        let updated = update_project(db.pool(), "katana", &patch).await.unwrap();
        assert_eq!(updated.color, "#000000");
        assert_eq!(updated.icon, created.icon);
        assert_eq!(updated.created_at, created.created_at);

        let missing = update_project(db.pool(), "nope", &patch).await;
        assert!(matches!(missing, Err(DatabaseError::NotFound { .. })));

        assert!(delete_project(db.pool(), "katana").await.unwrap());
        assert!(!delete_project(db.pool(), "katana").await.unwrap());
        assert!(list_projects(db.pool()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_project_leaves_tasks_dangling() {
        let db = test_db().await;
        create_project(db.pool(), &katana()).await.unwrap();
        crate::task::create_task(
            db.pool(),
            &NewTask {
                task_id: "task-001".to_string(),
                title: "Audit bridge".to_string(),
                description: None,
                assignee: "kat".to_string(),
                project_id: Some("katana".to_string()),
                status: TaskStatus::Todo,
                priority: Priority::High,
                created_by: "main".to_string(),
            },
        )
        .await
        .unwrap();
        let before = crate::task::get_task(db.pool(), "task-001").await.unwrap().unwrap();

        delete_project(db.pool(), "katana").await.unwrap();

        let after = crate::task::get_task(db.pool(), "task-001").await.unwrap().unwrap();
        assert_eq!(after, before);
        assert_eq!(after.project_id.as_deref(), Some("katana"));
        assert_eq!(list_project_tasks(db.pool(), "katana").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_seed_projects_idempotent() {
        let db = test_db().await;
        let defaults = vec![katana()];
        assert_eq!(seed_projects(db.pool(), &defaults).await.unwrap(), 1);
        assert_eq!(seed_projects(db.pool(), &defaults).await.unwrap(), 0);
        assert_eq!(list_projects(db.pool()).await.unwrap().len(), 1);
    }
}
