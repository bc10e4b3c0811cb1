//! Where dashboard updates come from.
//!
//! The rest of the server only sees [`DashboardSource`]. Which implementation
//! backs it is decided once at startup by `DASHBOARD_UPDATES`.

use std::sync::Arc;
use std::time::Duration;

use database::dashboard::get_dashboard_data;
use database::{DashboardData, Database};
use futures::stream::{BoxStream, StreamExt};
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tokio_stream::wrappers::{IntervalStream, WatchStream};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateMode {
    /// Re-read the store on a fixed interval.
    Poll,
    /// Re-read the store whenever a mutation signals a change.
    Push,
}

impl UpdateMode {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "poll" => Some(UpdateMode::Poll),
            "push" => Some(UpdateMode::Push),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            UpdateMode::Poll => "poll",
            UpdateMode::Push => "push",
        }
    }
}

/// A stream of dashboard payloads.
///
/// Every implementation emits once as soon as the stream is polled, then
/// again on each of its own triggers.
pub trait DashboardSource: Send + Sync {
    fn mode(&self) -> UpdateMode;

    fn updates(&self, db: Database) -> BoxStream<'static, database::Result<DashboardData>>;
}

/// Signals that the store changed. Cloning shares the same channel.
#[derive(Clone)]
pub struct ChangeNotifier {
    tx: Arc<watch::Sender<u64>>,
}

impl ChangeNotifier {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(0);
        Self { tx: Arc::new(tx) }
    }

    /// Bump the change counter. Never fails, even with no subscribers.
    pub fn notify(&self) {
        self.tx.send_modify(|version| *version = version.wrapping_add(1));
    }

    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.tx.subscribe()
    }

    /// Number of changes signalled so far.
    pub fn version(&self) -> u64 {
        *self.tx.borrow()
    }
}

impl Default for ChangeNotifier {
    fn default() -> Self {
        Self::new()
    }
}

fn read_dashboard(db: Database) -> impl std::future::Future<Output = database::Result<DashboardData>> {
    async move { get_dashboard_data(db.pool()).await }
}

/// Pull the dashboard every `interval`.
pub struct PollingSource {
    interval: Duration,
}

impl PollingSource {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }
}

impl DashboardSource for PollingSource {
    fn mode(&self) -> UpdateMode {
        UpdateMode::Poll
    }

    fn updates(&self, db: Database) -> BoxStream<'static, database::Result<DashboardData>> {
        let mut interval = tokio::time::interval(self.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        IntervalStream::new(interval)
            .then(move |_| read_dashboard(db.clone()))
            .boxed()
    }
}

/// Push the dashboard each time the notifier fires.
///
/// Changes signalled while a read is in flight collapse into one more read.
pub struct PushSource {
    notifier: ChangeNotifier,
}

impl PushSource {
    pub fn new(notifier: ChangeNotifier) -> Self {
        Self { notifier }
    }
}

impl DashboardSource for PushSource {
    fn mode(&self) -> UpdateMode {
        UpdateMode::Push
    }

    fn updates(&self, db: Database) -> BoxStream<'static, database::Result<DashboardData>> {
        WatchStream::new(self.notifier.subscribe())
            .then(move |_| read_dashboard(db.clone()))
            .boxed()
    }
}

/// Pick the implementation for `mode`.
pub fn build_source(
    mode: UpdateMode,
    poll_interval: Duration,
    notifier: &ChangeNotifier,
) -> Arc<dyn DashboardSource> {
    match mode {
        UpdateMode::Poll => Arc::new(PollingSource::new(poll_interval)),
        UpdateMode::Push => Arc::new(PushSource::new(notifier.clone())),
    }
}
