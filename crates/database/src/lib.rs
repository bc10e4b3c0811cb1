//! SQLite persistence layer for Mission Control.
//!
//! This crate holds the entity store (agents, projects, tasks, sessions,
//! messages, per-agent daily stats and the sync-state ledger), the bulk sync
//! reconciler that merges an external snapshot into it, and the single
//! dashboard read that the UI consumes.
//!
//! # Example
//!
//! ```no_run
//! use database::{Database, dashboard, sync};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Connect and run migrations
//!     let db = Database::connect("sqlite:mission-control.db?mode=rwc").await?;
//!     db.migrate().await?;
//!
//!     // Merge an (empty) snapshot, then read the board
//!     sync::full_sync(db.pool(), &[], &[]).await?;
//!     let data = dashboard::get_dashboard_data(db.pool()).await?;
//!     println!("{} agents", data.agents.len());
//!
//!     Ok(())
//! }
//! ```

pub mod agent;
pub mod agent_stats;
pub mod dashboard;
pub mod error;
pub mod message;
pub mod models;
pub mod patch;
pub mod project;
pub mod session;
pub mod sync;
pub mod sync_state;
pub mod task;
pub mod time;
pub mod validation;

pub use dashboard::DashboardData;
pub use error::{DatabaseError, Result};
pub use models::{
    Agent, AgentDailyStat, AgentStatus, Message, MessageType, NewMessage, NewProject, NewTask,
    Priority, Project, Session, SessionStatus, SyncState, Task, TaskStatus, TokenUsage,
};
pub use patch::{AgentPatch, ProjectPatch, SessionPatch, TaskPatch};
pub use sync::{SyncAgent, SyncProject, SyncTask};
pub use validation::ValidationError;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;

/// Database connection wrapper.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Default pool size for database connections.
    const DEFAULT_POOL_SIZE: u32 = 20;

    /// Connect to a SQLite database.
    ///
    /// The URL should be in the format `sqlite:path/to/db.sqlite?mode=rwc`.
    ///
    /// # Example
    ///
    /// ```no_run
    /// # async fn example() -> database::Result<()> {
    /// // File database
    /// let db = database::Database::connect("sqlite:data/mission-control.db?mode=rwc").await?;
    ///
    /// // In-memory database (for testing)
    /// let db = database::Database::connect("sqlite::memory:").await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn connect(url: &str) -> Result<Self> {
        Self::connect_with_pool_size(url, Self::DEFAULT_POOL_SIZE).await
    }

    /// Connect to a SQLite database with a custom pool size.
    pub async fn connect_with_pool_size(url: &str, pool_size: u32) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(pool_size)
            .acquire_timeout(std::time::Duration::from_secs(30))
            .connect_with(options)
            .await?;

        tracing::info!(url, pool_size, "Connected to database");

        Ok(Self { pool })
    }

    /// Run database migrations.
    pub async fn migrate(&self) -> Result<()> {
        tracing::info!("Running database migrations...");

        sqlx::migrate!("./migrations").run(&self.pool).await?;

        tracing::info!("Migrations complete");
        Ok(())
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Close the database connection pool.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}
