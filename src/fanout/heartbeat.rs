//! Heartbeat scheduler
//!
//! Every interval, broadcasts a synthetic heartbeat to each known topic so
//! idle SSE connections keep seeing traffic.

use std::time::Duration;

use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::broadcaster::Broadcaster;
use crate::types::Message;
use crate::utils::current_timestamp;

/// Event type reserved for heartbeats
pub const HEARTBEAT_EVENT_TYPE: &str = "HEART BEAT";

/// Payload carried by every heartbeat
pub const HEARTBEAT_PAYLOAD: &str = "Ping";

/// Default interval between heartbeat ticks
pub const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);

/// Outcome of a single tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HeartbeatReport {
    /// Topics known when the tick started
    pub topics: usize,
    /// Delivery attempts spawned across all topics
    pub attempts: usize,
}

/// Periodic heartbeat producer
pub struct HeartbeatScheduler {
    broadcaster: Broadcaster,
    period: Duration,
}

impl HeartbeatScheduler {
    pub fn new(broadcaster: Broadcaster, period: Duration) -> Self {
        Self {
            broadcaster,
            period,
        }
    }

    /// Build a heartbeat stamped with the current time
    pub fn heartbeat() -> Message {
        Message::new(HEARTBEAT_EVENT_TYPE, HEARTBEAT_PAYLOAD, current_timestamp())
    }

    /// Broadcast one heartbeat to every topic known right now.
    ///
    /// Topics that vanish between the snapshot and the broadcast are skipped.
    pub fn tick(&self) -> HeartbeatReport {
        let topics = self.broadcaster.registry().all_topics();
        let mut report = HeartbeatReport {
            topics: topics.len(),
            attempts: 0,
        };

        for topic in &topics {
            match self.broadcaster.broadcast_to_topic(topic, Self::heartbeat()) {
                Ok(attempts) => report.attempts += attempts,
                Err(e) => debug!(topic = %topic, error = %e, "Heartbeat skipped"),
            }
        }
        report
    }

    /// Tick until `shutdown` is cancelled. The first tick fires one period
    /// after start.
    pub async fn run(self, shutdown: CancellationToken) {
        let mut ticker = interval_at(Instant::now() + self.period, self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(period_secs = self.period.as_secs(), "Heartbeat scheduler started");

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("Heartbeat scheduler stopped");
                    break;
                }
                _ = ticker.tick() => {
                    let report = self.tick();
                    debug!(topics = report.topics, attempts = report.attempts, "Heartbeat tick");
                }
            }
        }
    }
}
