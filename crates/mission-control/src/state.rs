//! Application state shared across handlers.

use std::sync::Arc;

use database::Database;
use snapshot::{Catalog, SourcePaths};
use tokio::sync::Mutex;

use crate::error::ApiError;
use crate::source::{ChangeNotifier, DashboardSource};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Entity store. `None` when no `DATABASE_URL` was configured.
    pub db: Option<Database>,
    /// Agent and project metadata.
    pub catalog: Arc<Catalog>,
    /// On-disk source files.
    pub paths: Arc<SourcePaths>,
    /// Feeds the dashboard stream.
    pub source: Arc<dyn DashboardSource>,
    /// Fired after every successful mutation.
    pub notifier: ChangeNotifier,
    /// Held across every read-modify-write of `tasks.json`, including id
    /// allocation and the matching store insert.
    pub tasks_file_lock: Arc<Mutex<()>>,
}

impl AppState {
    pub fn new(
        db: Option<Database>,
        catalog: Catalog,
        paths: SourcePaths,
        source: Arc<dyn DashboardSource>,
        notifier: ChangeNotifier,
    ) -> Self {
        Self {
            db,
            catalog: Arc::new(catalog),
            paths: Arc::new(paths),
            source,
            notifier,
            tasks_file_lock: Arc::new(Mutex::new(())),
        }
    }

    /// The store, or the fixed misconfiguration error before anything
    /// touches it.
    pub fn store(&self) -> Result<&Database, ApiError> {
        self.db.as_ref().ok_or(ApiError::StoreNotConfigured)
    }

    /// Signal dashboard subscribers that the store changed.
    pub fn changed(&self) {
        self.notifier.notify();
    }
}
