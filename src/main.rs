//! Notify Hub - Binary Entry Point
//!
//! Wires the registry, heartbeat scheduler, bus bridge and HTTP server
//! together and runs them until SIGINT/SIGTERM.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use notify_hub::api::{create_router, SseState};
use notify_hub::bridge::{supervise, ExternalBridge, ExternalBus, RetryPolicy};
use notify_hub::config::Config;
use notify_hub::fanout::{Broadcaster, HeartbeatScheduler, Registry};
use notify_hub::utils::{init_tracing, wait_for_shutdown_signal};

type MainResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

#[cfg(feature = "redis")]
fn connect_bus(config: &Config) -> MainResult<Arc<dyn ExternalBus>> {
    let bus = notify_hub::bridge::RedisBus::open(&config.redis_url)?;
    info!(url = %config.redis_url, "Using Redis bus");
    Ok(Arc::new(bus))
}

#[cfg(not(feature = "redis"))]
fn connect_bus(_config: &Config) -> MainResult<Arc<dyn ExternalBus>> {
    tracing::warn!("Built without the redis feature, bridge listens on an in-process bus");
    Ok(Arc::new(notify_hub::bridge::InProcessBus::new()))
}

#[tokio::main]
async fn main() -> MainResult<()> {
    init_tracing();
    let config = Config::from_env()?;

    let registry = Arc::new(Registry::new());
    let broadcaster = Broadcaster::new(Arc::clone(&registry));
    let shutdown = CancellationToken::new();

    // Background producers
    let heartbeat = HeartbeatScheduler::new(broadcaster.clone(), config.heartbeat_interval);
    let heartbeat_task = tokio::spawn(heartbeat.run(shutdown.clone()));

    let bus = connect_bus(&config)?;
    let bridge = ExternalBridge::new(broadcaster.clone(), config.channel.clone());
    let bridge_task = tokio::spawn({
        let shutdown = shutdown.clone();
        async move { supervise(&bridge, &*bus, &shutdown, RetryPolicy::default()).await }
    });

    // Stop accepting, then end every open SSE stream so graceful shutdown can
    // finish. Registrations arriving after `close_all` get a closed stream.
    tokio::spawn({
        let shutdown = shutdown.clone();
        let registry = Arc::clone(&registry);
        async move {
            if let Err(e) = wait_for_shutdown_signal().await {
                error!(error = %e, "Failed to listen for shutdown signal");
                return;
            }
            info!("Shutdown requested");
            shutdown.cancel();
            registry.close_all();
        }
    });

    let app = create_router(Arc::new(SseState::new(broadcaster, config.queue_capacity)));
    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    info!(addr = %config.bind_addr, "Server started");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown.clone().cancelled_owned())
        .await?;

    shutdown.cancel();
    let (heartbeat, bridge) = tokio::join!(heartbeat_task, bridge_task);
    for (task, result) in [("heartbeat", heartbeat), ("bridge", bridge)] {
        if let Err(e) = result {
            error!(task, error = %e, "Background task failed");
        }
    }
    info!("Server stopped");
    Ok(())
}
