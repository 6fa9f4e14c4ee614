//! Integration tests for Notify Hub

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use notify_hub::bridge::{supervise, RetryPolicy};
use notify_hub::fanout::HEARTBEAT_EVENT_TYPE;
use notify_hub::{
    BroadcastError, Broadcaster, ExternalBridge, HeartbeatScheduler, InProcessBus, Message,
    Registry, SubscriberStream,
};

const CHANNEL: &str = "auction-updates";

fn setup() -> (Arc<Registry>, Broadcaster) {
    let registry = Arc::new(Registry::new());
    let broadcaster = Broadcaster::new(Arc::clone(&registry));
    (registry, broadcaster)
}

async fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(1);
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    condition()
}

async fn next(stream: &mut SubscriberStream) -> Option<Message> {
    tokio::time::timeout(Duration::from_secs(1), stream.recv())
        .await
        .ok()
        .flatten()
}

// ============================================================================
// Fan-out
// ============================================================================

#[tokio::test]
async fn test_broadcast_reaches_every_subscriber_of_topic() {
    let (registry, broadcaster) = setup();
    let mut alice = registry.register("A1", "alice", 10);
    let mut bob = registry.register("A1", "bob", 10);
    let mut carol = registry.register("A2", "carol", 10);

    let message = Message::new("bid", "$50", 1000);
    assert_eq!(broadcaster.broadcast_to_topic("A1", message.clone()), Ok(2));

    assert_eq!(next(&mut alice).await, Some(message.clone()));
    assert_eq!(next(&mut bob).await, Some(message));

    tokio::task::yield_now().await;
    assert_eq!(carol.try_recv(), None);
}

#[tokio::test]
async fn test_broadcast_to_unknown_topic() {
    let (registry, broadcaster) = setup();
    let _alice = registry.register("A1", "alice", 10);

    let result = broadcaster.broadcast_to_topic("A2", Message::new("bid", "$50", 1));
    assert_eq!(result, Err(BroadcastError::TopicNotFound("A2".to_string())));
    assert_eq!(registry.all_topics(), vec!["A1".to_string()]);
}

#[tokio::test]
async fn test_targeted_delivery_skips_other_subscribers() {
    let (registry, broadcaster) = setup();
    let mut alice = registry.register("A1", "alice", 10);
    let mut bob = registry.register("A1", "bob", 10);

    let message = Message::new("outbid", "$60", 2000);
    assert_eq!(
        broadcaster.broadcast_to_subscriber("A1", "bob", message.clone()),
        Ok(1)
    );
    assert_eq!(next(&mut bob).await, Some(message));

    tokio::task::yield_now().await;
    assert_eq!(alice.try_recv(), None);

    assert!(matches!(
        broadcaster.broadcast_to_subscriber("A1", "dave", Message::new("bid", "$1", 1)),
        Err(BroadcastError::SubscriberNotFound { .. })
    ));
}

// ============================================================================
// Backpressure and lifecycle
// ============================================================================

#[tokio::test]
async fn test_slow_subscriber_is_evicted() {
    let (registry, broadcaster) = setup();
    let mut slow = registry.register("A1", "slow", 1);
    let mut fast = registry.register("A1", "fast", 10);

    for amount in ["$10", "$20", "$30"] {
        broadcaster
            .broadcast_to_topic("A1", Message::new("bid", amount, 1))
            .unwrap();
    }

    assert!(wait_until(|| !registry.contains("A1", "slow")).await);
    assert!(registry.contains("A1", "fast"));

    // The slow stream drains what it buffered, then ends
    assert!(next(&mut slow).await.is_some());
    assert_eq!(next(&mut slow).await, None);

    for _ in 0..3 {
        assert!(next(&mut fast).await.is_some());
    }
}

#[tokio::test]
async fn test_reregistration_replaces_queue() {
    let (registry, broadcaster) = setup();
    let mut first = registry.register("A1", "alice", 10);
    let mut second = registry.register("A1", "alice", 10);

    assert_eq!(registry.subscriber_count("A1"), 1);
    assert_eq!(next(&mut first).await, None);

    drop(first);
    assert!(registry.contains("A1", "alice"));

    broadcaster
        .broadcast_to_topic("A1", Message::new("bid", "$70", 3))
        .unwrap();
    assert_eq!(next(&mut second).await, Some(Message::new("bid", "$70", 3)));
}

#[tokio::test]
async fn test_last_subscriber_leaving_drops_topic() {
    let (registry, _broadcaster) = setup();
    let alice = registry.register("A1", "alice", 10);
    assert!(registry.remove("A1", "alice"));
    assert!(!registry.remove("A1", "alice"));
    assert_eq!(registry.topic_count(), 0);
    drop(alice);
    assert_eq!(registry.topic_count(), 0);
}

// ============================================================================
// Heartbeat
// ============================================================================

#[tokio::test]
async fn test_heartbeat_tick_pings_every_subscriber() {
    let (registry, broadcaster) = setup();
    let mut alice = registry.register("A1", "alice", 10);
    let mut bob = registry.register("A2", "bob", 10);

    let scheduler = HeartbeatScheduler::new(broadcaster, Duration::from_secs(30));
    let report = scheduler.tick();
    assert_eq!(report.topics, 2);
    assert_eq!(report.attempts, 2);

    for stream in [&mut alice, &mut bob] {
        let ping = next(stream).await.unwrap();
        assert_eq!(ping.event_type, HEARTBEAT_EVENT_TYPE);
        assert_eq!(ping.payload, "Ping");
        assert!(ping.timestamp > 0);
    }
}

// ============================================================================
// Bridge
// ============================================================================

#[tokio::test]
async fn test_bridge_relays_bus_envelopes() {
    let (registry, broadcaster) = setup();
    let bridge = ExternalBridge::new(broadcaster, CHANNEL);
    let bus = Arc::new(InProcessBus::new());
    let shutdown = CancellationToken::new();

    let mut alice = registry.register("A1", "alice@example.com", 10);
    let mut bob = registry.register("A1", "bob@example.com", 10);

    let handle = tokio::spawn({
        let bus = Arc::clone(&bus);
        let shutdown = shutdown.clone();
        async move { supervise(&bridge, &*bus, &shutdown, RetryPolicy::default()).await }
    });
    assert!(wait_until(|| bus.receiver_count(CHANNEL) == 1).await);

    bus.publish(
        CHANNEL,
        r#"{"auctionId":"A1","subscriberEmail":"alice@example.com","eventType":"outbid","message":"$60","timestamp":7}"#,
    );

    let expected = Message::new("outbid", "$60", 7);
    assert_eq!(next(&mut alice).await, Some(expected.clone()));
    assert_eq!(next(&mut alice).await, Some(expected.clone()));
    assert_eq!(next(&mut bob).await, Some(expected));

    tokio::task::yield_now().await;
    assert_eq!(bob.try_recv(), None);

    shutdown.cancel();
    tokio::time::timeout(Duration::from_secs(1), handle)
        .await
        .unwrap()
        .unwrap();
}

#[tokio::test]
async fn test_close_all_ends_streams_on_shutdown() {
    let (registry, _broadcaster) = setup();
    let mut alice = registry.register("A1", "alice", 10);
    let mut bob = registry.register("A2", "bob", 10);

    assert_eq!(registry.close_all(), 2);
    assert_eq!(next(&mut alice).await, None);
    assert_eq!(next(&mut bob).await, None);
    assert_eq!(registry.topic_count(), 0);
}
