//! Integration tests for the distribution loop and the snapshot cache

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::Instant;
use vpsmon_core::{
    CachedCollector, MetricsEvent, MonitorError, MonitoringSettings, SessionState,
    SnapshotSource, start_distribution,
};

use super::support::Harness;

fn settings(interval_secs: u8) -> MonitoringSettings {
    MonitoringSettings {
        interval_secs,
        ..MonitoringSettings::default()
    }
}

async fn next_event(events: &mut mpsc::Receiver<MetricsEvent>) -> MetricsEvent {
    events.recv().await.expect("distribution loop alive")
}

#[tokio::test(start_paused = true)]
async fn test_first_snapshot_is_immediate_then_periodic() {
    let harness = Harness::new();
    let source: Arc<dyn SnapshotSource> = harness.collector.clone();
    let started = Instant::now();
    let (handle, mut events) = start_distribution(source, &settings(2));

    let MetricsEvent::Update(first) = next_event(&mut events).await else {
        panic!("expected a snapshot");
    };
    assert!(started.elapsed() < Duration::from_secs(1));
    assert_eq!(first.processes.len(), 10);

    assert!(matches!(next_event(&mut events).await, MetricsEvent::Update(_)));
    assert!(started.elapsed() >= Duration::from_secs(2));

    handle.stop().await;
    loop {
        if matches!(next_event(&mut events).await, MetricsEvent::Stopped) {
            break;
        }
    }
    assert_eq!(harness.script.connects(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_session_drop_recovers_on_next_tick() {
    let harness = Harness::new();
    harness.script.drop_session_on("df -h /");
    let (handle, mut events) = start_distribution(harness.collector.clone(), &settings(1));

    match next_event(&mut events).await {
        MetricsEvent::CycleFailed(err) => {
            assert!(matches!(err, MonitorError::Transport(_)));
        }
        other => panic!("expected a failed cycle, got {other:?}"),
    }
    assert_eq!(harness.manager.state(), SessionState::Disconnected);

    let MetricsEvent::Update(snapshot) = next_event(&mut events).await else {
        panic!("expected recovery on the next tick");
    };
    assert_eq!(snapshot.disk.usage, "45%");
    assert_eq!(harness.script.connects(), 2);

    handle.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_dropped_receiver_ends_loop() {
    let harness = Harness::new();
    let (handle, events) = start_distribution(harness.collector.clone(), &settings(1));
    drop(events);

    tokio::time::sleep(Duration::from_secs(3)).await;
    assert!(handle.is_finished());
    // Exactly one cycle ran before the closed channel was noticed
    assert_eq!(harness.script.execs(), 7);
}

#[tokio::test]
async fn test_cached_collector_coalesces_subscribers() {
    let harness = Harness::new();
    harness.script.set_connect_delay(Duration::from_millis(20));
    let cached = CachedCollector::new(harness.collector.clone(), Duration::from_secs(5));

    let (a, b, c) = tokio::join!(cached.collect(), cached.collect(), cached.collect());
    let (a, b, c) = (a.unwrap(), b.unwrap(), c.unwrap());

    assert!(Arc::ptr_eq(&a, &b));
    assert!(Arc::ptr_eq(&b, &c));
    assert_eq!(harness.script.execs(), 7);
}

#[tokio::test(start_paused = true)]
async fn test_cached_collector_refreshes_after_ttl() {
    let harness = Harness::new();
    let cached = CachedCollector::new(harness.collector.clone(), Duration::from_millis(1500));

    let first = cached.collect().await.unwrap();
    let again = cached.collect().await.unwrap();
    assert!(Arc::ptr_eq(&first, &again));

    tokio::time::advance(Duration::from_secs(2)).await;
    let refreshed = cached.collect().await.unwrap();
    assert!(!Arc::ptr_eq(&first, &refreshed));
    assert_eq!(harness.script.execs(), 14);
}

#[tokio::test]
async fn test_cached_collector_does_not_cache_failures() {
    let harness = Harness::new();
    harness.script.drop_session_on("lscpu");
    let cached = CachedCollector::new(harness.collector.clone(), Duration::from_secs(60));

    assert!(cached.collect().await.is_err());
    assert!(cached.cache().get().is_none());
    assert!(cached.collect().await.is_ok());
    assert_eq!(harness.script.connects(), 2);
}
