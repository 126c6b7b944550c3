//! Integration tests for the collection cycle

use std::time::Duration;

use vpsmon_core::{MetricsSnapshot, MonitorError, SessionState};

use super::support::{Harness, host};

fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 1e-9,
        "expected {expected}, got {actual}"
    );
}

#[tokio::test]
async fn test_collect_end_to_end() {
    let harness = Harness::new();
    let snapshot = harness.collector.collect().await.expect("cycle succeeds");

    assert_eq!(snapshot.system.os, "Debian GNU/Linux 12 (bookworm)");
    assert_eq!(
        snapshot.system.cpu_model,
        "Intel(R) Xeon(R) Gold 6230R CPU @ 2.10GHz"
    );
    assert_eq!(snapshot.system.total_cores, 4);
    assert_eq!(snapshot.system.max_cores, 4);

    // 100 - 87.3
    assert_close(snapshot.cpu.usage, 12.7);
    assert_eq!(snapshot.cpu.speed, "2095.078");
    let cores: Vec<(&str, f64)> = snapshot
        .cpu
        .cores
        .iter()
        .map(|c| (c.core.as_str(), c.usage))
        .collect();
    assert_eq!(
        cores,
        vec![("CPU 0", 18.0), ("CPU 1", 14.0), ("CPU 2", 10.0), ("CPU 3", 10.0)]
    );

    assert_eq!(snapshot.memory.total, 7951);
    assert_eq!(snapshot.memory.used, 3120);
    assert_eq!(snapshot.memory.free, 1024);
    // 3120 / 7951 = 39.24%
    assert_close(snapshot.memory.usage_percent, 39.2);

    assert_eq!(snapshot.disk.total, "80G");
    assert_eq!(snapshot.disk.used, "34G");
    assert_eq!(snapshot.disk.free, "43G");
    assert_eq!(snapshot.disk.usage, "45%");

    assert_eq!(snapshot.processes.len(), 10);
    let first = &snapshot.processes[0];
    assert_eq!(first.user, "mysql");
    assert_eq!(first.pid, 812);
    assert_close(first.cpu, 18.4);
    assert_close(first.memory, 12.1);
    assert_eq!(first.command, "/usr/sbin/mysqld");
    assert_eq!(snapshot.processes[1].command, "php-fpm:");
    assert_eq!(snapshot.processes[9].pid, 40213);

    assert_eq!(harness.script.connects(), 1);
    assert_eq!(harness.script.execs(), 7);
}

#[tokio::test]
async fn test_snapshot_json_round_trip() {
    let harness = Harness::new();
    let snapshot = harness.collector.collect().await.unwrap();

    let json = snapshot.to_json().unwrap();
    assert!(json.contains("\"usagePercent\":39.2"));
    assert!(json.contains("\"cpuModel\""));
    let decoded = MetricsSnapshot::from_json(&json).unwrap();
    assert_eq!(decoded, snapshot);
}

#[tokio::test]
async fn test_session_reused_across_cycles() {
    let harness = Harness::new();
    harness.collector.collect().await.unwrap();
    harness.collector.collect().await.unwrap();

    assert_eq!(harness.script.connects(), 1);
    assert_eq!(harness.script.execs(), 14);
    assert_eq!(harness.manager.state(), SessionState::Connected);
}

#[tokio::test]
async fn test_missing_tool_degrades_its_fields_only() {
    let harness = Harness::new();
    harness.script.remove_output("mpstat -P ALL 1 1");

    let snapshot = harness.collector.collect().await.unwrap();
    assert!(snapshot.cpu.cores.is_empty());
    assert_close(snapshot.cpu.usage, 12.7);
    assert_eq!(snapshot.system.total_cores, 4);
    assert_eq!(snapshot.processes.len(), 10);
    assert_eq!(harness.manager.state(), SessionState::Connected);
}

#[tokio::test]
async fn test_refused_channel_degrades_without_failing_cycle() {
    let harness = Harness::new();
    harness.script.refuse("df -h /");

    let snapshot = harness.collector.collect().await.unwrap();
    assert_eq!(snapshot.disk.total, "Unknown");
    assert_eq!(snapshot.disk.usage, "Unknown");
    assert_eq!(snapshot.memory.total, 7951);
    assert_eq!(harness.manager.state(), SessionState::Connected);
}

#[tokio::test]
async fn test_total_cores_backfilled_from_core_rows() {
    let harness = Harness::new();
    harness
        .script
        .set_output("lscpu", "Model name:  Intel(R) Xeon(R) Gold 6230R CPU @ 2.10GHz\n");

    let snapshot = harness.collector.collect().await.unwrap();
    assert_eq!(snapshot.system.total_cores, 4);
    assert_eq!(snapshot.cpu.speed, "Unknown");
}

#[tokio::test]
async fn test_empty_os_release_reports_unknown() {
    let harness = Harness::new();
    harness.script.set_output("cat /etc/os-release", "");

    let snapshot = harness.collector.collect().await.unwrap();
    assert_eq!(snapshot.system.os, "Unknown");
}

#[tokio::test]
async fn test_session_drop_fails_cycle_then_reconnects() {
    let harness = Harness::new();
    harness.collector.collect().await.unwrap();
    harness.script.drop_session_on("free -m");

    let err = harness.collector.collect().await.unwrap_err();
    assert!(matches!(err, MonitorError::Transport(_)), "got {err:?}");
    assert!(err.is_transport_failure());
    assert_eq!(harness.manager.state(), SessionState::Disconnected);
    assert_eq!(harness.script.closes(), 1);
    // The other six commands of the failed batch still ran
    assert_eq!(harness.script.execs(), 14);

    let snapshot = harness.collector.collect().await.unwrap();
    assert_eq!(snapshot.memory.total, 7951);
    assert_eq!(harness.script.connects(), 2);
    assert_eq!(harness.manager.session().generation, 2);
}

#[tokio::test(start_paused = true)]
async fn test_command_timeout_fails_cycle() {
    let harness = Harness::with_host(host().with_command_timeout_secs(3));
    harness.script.delay("mpstat -P ALL 1 1", Duration::from_secs(30));

    let err = harness.collector.collect().await.unwrap_err();
    assert!(err.is_timeout());
    assert!(err.is_transport_failure());
    match err {
        MonitorError::Timeout { operation, secs } => {
            assert!(operation.contains("mpstat"));
            assert_eq!(secs, 3);
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(harness.manager.state(), SessionState::Disconnected);
}

#[tokio::test]
async fn test_connection_failure_is_reported() {
    let harness = Harness::new();
    harness
        .script
        .refuse_connect
        .store(true, std::sync::atomic::Ordering::SeqCst);

    let err = harness.collector.collect().await.unwrap_err();
    assert!(matches!(err, MonitorError::Connection(_)));
    assert_eq!(harness.manager.state(), SessionState::Failed);
    assert_eq!(harness.script.execs(), 0);
}

#[tokio::test]
async fn test_concurrent_cycles_share_one_session() {
    let harness = Harness::new();
    harness.script.set_connect_delay(Duration::from_millis(50));

    let (a, b, c) = tokio::join!(
        harness.collector.collect(),
        harness.collector.collect(),
        harness.collector.collect()
    );
    assert!(a.is_ok() && b.is_ok() && c.is_ok());
    assert_eq!(harness.script.connects(), 1);
    assert_eq!(harness.script.execs(), 21);
}
