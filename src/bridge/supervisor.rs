//! Keeps a bridge attached to the bus.
//!
//! Subscribe failures and ended subscriptions are retried with exponential
//! backoff and jitter. The backoff resets after every successful
//! subscription.

use std::time::Duration;

use backon::{BackoffBuilder, ExponentialBuilder};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use super::{ExternalBridge, ExternalBus};

/// Backoff bounds for re-attaching the bridge
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub min_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            min_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    fn builder(&self) -> ExponentialBuilder {
        ExponentialBuilder::default()
            .with_min_delay(self.min_delay)
            .with_max_delay(self.max_delay)
            .with_jitter()
    }
}

/// Run `bridge` against `bus` until `shutdown` is cancelled
pub async fn supervise(
    bridge: &ExternalBridge,
    bus: &dyn ExternalBus,
    shutdown: &CancellationToken,
    policy: RetryPolicy,
) {
    let mut backoff = policy.builder().build();

    loop {
        let outcome = bridge.run(bus, shutdown).await;
        if shutdown.is_cancelled() {
            break;
        }

        let delay = match outcome {
            Ok(()) => {
                backoff = policy.builder().build();
                let delay = backoff.next().unwrap_or(policy.max_delay);
                info!(
                    channel = %bridge.channel(),
                    backoff_ms = %delay.as_millis(),
                    "Subscription ended, resubscribing after backoff"
                );
                delay
            }
            Err(e) => {
                let delay = backoff.next().unwrap_or(policy.max_delay);
                error!(
                    channel = %bridge.channel(),
                    error = %e,
                    backoff_ms = %delay.as_millis(),
                    "Failed to subscribe, retrying after backoff"
                );
                delay
            }
        };

        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = tokio::time::sleep(delay) => {}
        }
    }

    info!(channel = %bridge.channel(), "Bridge supervisor stopped");
}
