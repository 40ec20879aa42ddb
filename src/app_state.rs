// =============================================================================
// Central Application State — Aurora Indicator Feed
// =============================================================================
//
// Process-scoped state shared by the transport tasks.  Nothing here is a
// global: `main` builds one `AppState` and hands an `Arc` to every task that
// needs to publish or report.
// =============================================================================

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::broadcast::{BroadcastScheduler, SubscriberRegistry};
use crate::runtime_config::RuntimeConfig;

pub struct AppState {
    pub config: RuntimeConfig,
    pub scheduler: Arc<BroadcastScheduler>,
    pub registry: Arc<SubscriberRegistry>,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    pub fn new(config: RuntimeConfig, scheduler: Arc<BroadcastScheduler>) -> Self {
        let registry = scheduler.registry().clone();
        Self {
            config,
            scheduler,
            registry,
            started_at: Utc::now(),
        }
    }

    pub fn uptime_secs(&self) -> i64 {
        (Utc::now() - self.started_at).num_seconds()
    }
}
