//! Mission Control: dashboard server for a multi-agent orchestration system.
//!
//! Reconciles the on-disk agent tree into a SQLite entity store and serves the
//! kanban board, the dashboard payload and the mutation API over it.

mod config;
mod error;
mod reconcile;
mod routes;
mod source;
mod state;

use database::Database;
use snapshot::{Catalog, SourcePaths};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::source::{build_source, ChangeNotifier};
use crate::state::AppState;

const DEFAULT_LOG_FILTER: &str = "mission_control=info,database=info,snapshot=info,tower_http=info";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .init();

    // Load configuration
    let config = Config::from_env()?;
    info!(
        addr = %config.addr,
        base = %config.openclaw_base.display(),
        updates = config.update_mode.as_str(),
        "Starting Mission Control"
    );

    let catalog = Catalog::load_or_builtin(config.catalog_path.as_deref())?;
    let paths = SourcePaths::from_base(&config.openclaw_base).with_beads_log(config.beads_log.clone());

    // Connect to database
    let db = match &config.database_url {
        Some(url) => {
            let db = Database::connect(url).await?;
            db.migrate().await?;
            Some(db)
        }
        None => {
            warn!("DATABASE_URL not set, store-backed endpoints are disabled");
            None
        }
    };

    // Build application state
    let notifier = ChangeNotifier::new();
    let source = build_source(config.update_mode, config.poll_interval, &notifier);
    let state = AppState::new(db, catalog, paths, source, notifier);

    if config.sync_on_start {
        spawn_startup_sync(&state);
    }

    // Build router
    let app = routes::router()
        .nest_service(
            "/static",
            ServeDir::new(concat!(env!("CARGO_MANIFEST_DIR"), "/static")),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    // Start server
    info!(addr = %config.addr, "Mission Control listening");
    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Reconcile once in the background. Failures are logged and not retried.
fn spawn_startup_sync(state: &AppState) {
    let Some(db) = state.db.clone() else {
        return;
    };
    let state = state.clone();

    tokio::spawn(async move {
        match reconcile::reconcile(&db, state.catalog.clone(), state.paths.clone()).await {
            Ok(report) => {
                info!(agents = report.agents, tasks = report.tasks, "Startup sync complete");
                state.changed();
            }
            Err(e) => warn!(error = %e, "Startup sync failed"),
        }
    });
}
