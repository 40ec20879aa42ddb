// =============================================================================
// Broadcast Scheduler — periodic and on-connect analysis pushes
// =============================================================================
//
// Two triggers share one action:
//   1. **Periodic** — every `interval`, run an analysis pass and fan the
//      payload out to all subscribers, whether or not anyone is connected.
//   2. **Connect** — when a subscriber joins, run a pass immediately and send
//      the payload to that subscriber alone.
//
// Each trigger spawns its own pass.  A slow upstream fetch therefore never
// delays the next tick: overlapping passes run independently and both results
// are delivered.  No timeout is applied to the fetch.
//
// Failures never stop the loop: a failed or empty pass is published as an
// `{ "error": ... }` payload, and delivery failures only drop the affected
// subscriber.
// =============================================================================

use std::sync::{Arc, Weak};
use std::time::Duration;

use chrono::Utc;
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use super::payload::FeedPayload;
use super::registry::{FanOutReport, SubscriberHandle, SubscriberId, SubscriberRegistry};
use crate::analyzer::{latest_signal, SeriesAnalyzer};
use crate::market_data::MarketDataSource;
use crate::types::{PublishOutcome, Signal};

// =============================================================================
// Events
// =============================================================================

/// Connection lifecycle events reported by the transport layer.
#[derive(Debug)]
pub enum SubscriberEvent {
    Connected(SubscriberHandle),
    Message { id: SubscriberId, text: String },
    Disconnected(SubscriberId),
}

// =============================================================================
// Publish bookkeeping
// =============================================================================

/// Summary of the most recent periodic publish, exposed on the status API.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PublishStatus {
    pub count: u64,
    /// Epoch milliseconds of the last publish.
    pub last_at: Option<i64>,
    pub last_outcome: Option<PublishOutcome>,
    pub last_candles: usize,
    pub last_signal: Option<Signal>,
    pub last_delivered: usize,
}

// =============================================================================
// BroadcastScheduler
// =============================================================================

pub struct BroadcastScheduler {
    source: Arc<dyn MarketDataSource>,
    analyzer: SeriesAnalyzer,
    registry: Arc<SubscriberRegistry>,
    interval: Duration,
    lookback_minutes: u32,
    timer: Mutex<Option<JoinHandle<()>>>,
    status: RwLock<PublishStatus>,
}

impl BroadcastScheduler {
    pub fn new(
        source: Arc<dyn MarketDataSource>,
        registry: Arc<SubscriberRegistry>,
        interval: Duration,
        lookback_minutes: u32,
    ) -> Self {
        Self {
            source,
            analyzer: SeriesAnalyzer::new(),
            registry,
            interval,
            lookback_minutes,
            timer: Mutex::new(None),
            status: RwLock::new(PublishStatus::default()),
        }
    }

    pub fn registry(&self) -> &Arc<SubscriberRegistry> {
        &self.registry
    }

    pub fn status(&self) -> PublishStatus {
        self.status.read().clone()
    }

    // -------------------------------------------------------------------------
    // Lifecycle
    // -------------------------------------------------------------------------

    /// Start the periodic timer.  Calling `start` on a running scheduler is a
    /// no-op.  The first tick fires one full interval after start.
    pub fn start(self: &Arc<Self>) {
        let mut timer = self.timer.lock();
        if timer.as_ref().is_some_and(|t| !t.is_finished()) {
            debug!("broadcast scheduler already running");
            return;
        }

        let weak: Weak<Self> = Arc::downgrade(self);
        let period = self.interval;
        *timer = Some(tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                let Some(scheduler) = weak.upgrade() else {
                    break;
                };
                tokio::spawn(async move {
                    scheduler.publish().await;
                });
            }
        }));

        info!(interval_ms = period.as_millis() as u64, "broadcast scheduler started");
    }

    /// Stop the periodic timer.  Passes already in flight finish normally.
    pub fn stop(&self) {
        if let Some(timer) = self.timer.lock().take() {
            timer.abort();
            info!("broadcast scheduler stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.timer
            .lock()
            .as_ref()
            .is_some_and(|t| !t.is_finished())
    }

    // -------------------------------------------------------------------------
    // Actions
    // -------------------------------------------------------------------------

    /// Run one analysis pass against the upstream source and wrap the outcome
    /// in a payload.
    pub async fn build_payload(&self) -> FeedPayload {
        let outcome = self
            .analyzer
            .run(self.source.as_ref(), self.lookback_minutes)
            .await;
        if let Err(e) = &outcome {
            warn!(source = %self.source.describe(), error = %e, "market data fetch failed");
        }
        FeedPayload::from_outcome(outcome)
    }

    /// Analyse the latest window and fan the payload out to every subscriber.
    pub async fn publish(&self) -> FanOutReport {
        self.registry.prune_closed();
        if self.registry.is_empty() {
            debug!("no subscribers connected — publishing anyway");
        }
        let payload = self.build_payload().await;
        let signal = match &payload {
            FeedPayload::Analysis(result) => latest_signal(result),
            FeedPayload::Error { .. } => None,
        };

        let report = self.registry.fan_out(payload.to_json());

        {
            let mut status = self.status.write();
            status.count += 1;
            status.last_at = Some(Utc::now().timestamp_millis());
            status.last_outcome = Some(payload.outcome());
            status.last_candles = payload.candle_count();
            status.last_signal = signal;
            status.last_delivered = report.delivered;
        }

        info!(
            outcome = %payload.outcome(),
            candles = payload.candle_count(),
            signal = %signal.unwrap_or_default(),
            delivered = report.delivered,
            removed = report.removed,
            "analysis published"
        );
        report
    }

    /// Send a fresh analysis to a single subscriber.
    async fn push_initial(&self, handle: SubscriberHandle) {
        let payload = self.build_payload().await;
        match handle.send(payload.to_json()) {
            Ok(()) => debug!(
                id = %handle.id(),
                outcome = %payload.outcome(),
                "initial analysis sent"
            ),
            Err(e) => {
                warn!(id = %handle.id(), peer = %handle.peer(), error = %e, "initial push failed — dropping subscriber");
                self.registry.unregister(handle.id());
            }
        }
    }

    /// Dispatch a connection event.
    pub fn handle_event(self: &Arc<Self>, event: SubscriberEvent) {
        match event {
            SubscriberEvent::Connected(handle) => {
                if !self.registry.register(handle.clone()) {
                    return;
                }
                let scheduler = Arc::clone(self);
                tokio::spawn(async move {
                    scheduler.push_initial(handle).await;
                });
            }
            SubscriberEvent::Message { id, text } => {
                if !self.registry.contains(id) {
                    debug!(id = %id, "message from unregistered subscriber ignored");
                    return;
                }
                debug!(id = %id, msg = %text, "subscriber message received");
            }
            SubscriberEvent::Disconnected(id) => {
                self.registry.unregister(id);
            }
        }
    }
}

impl Drop for BroadcastScheduler {
    fn drop(&mut self) {
        if let Some(timer) = self.timer.get_mut().take() {
            timer.abort();
        }
    }
}
