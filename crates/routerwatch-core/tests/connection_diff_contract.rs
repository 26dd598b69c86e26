//! Architectural Contract Test: Connection Diffing
//!
//! This test verifies what one poll cycle reports, end to end through the
//! engine, against a scripted router.
//!
//! Constraints verified:
//! - Devices online at startup never produce a notification
//! - A new connection produces exactly one connected notification
//! - A lost connection produces exactly one disconnected notification
//! - An unchanged revision produces nothing, however often it is polled
//! - Each fetch asks for changes since the last processed revision
//!
//! If this test fails, someone has changed:
//! - Seeding to notify for the initial device list
//! - The revision fast path
//! - The early exit after the first connect

mod common;

use common::*;
use routerwatch_core::traits::Revision;
use routerwatch_core::{ScanPolicy, WatchEngine};

fn engine_with(
    snapshots: Vec<routerwatch_core::Snapshot>,
    log: &DeliveryLog,
    policy: ScanPolicy,
) -> (
    WatchEngine,
    std::sync::Arc<std::sync::Mutex<Vec<FetchRecord>>>,
) {
    let (source, fetches) = ScriptedSource::snapshots(snapshots);
    let mut config = minimal_config();
    config.engine.scan_policy = policy;

    let engine = WatchEngine::new(Box::new(source), recording_dispatcher(log), &config)
        .expect("engine construction succeeds");
    (engine, fetches)
}

#[tokio::test]
async fn devices_online_at_startup_are_not_announced() {
    let log = delivery_log();
    let (mut engine, _fetches) = engine_with(
        vec![
            snapshot(
                5,
                vec![
                    online("a", "laptop", "10.0.0.5", "AA:AA:AA:AA:AA:AA"),
                    online("b", "phone", "10.0.0.6", "BB:BB:BB:BB:BB:BB"),
                ],
            ),
            snapshot(5, Vec::new()),
        ],
        &log,
        ScanPolicy::default(),
    );

    engine.seed().await.unwrap();
    assert_eq!(engine.tracker().connected().len(), 2);

    assert_eq!(engine.poll_once().await.unwrap(), 0);
    assert!(log.lock().unwrap().is_empty());
}

#[tokio::test]
async fn new_connection_is_announced_once() {
    let log = delivery_log();
    let (mut engine, _fetches) = engine_with(
        vec![
            snapshot(1, Vec::new()),
            snapshot(2, vec![online("a", "laptop", "10.0.0.5", "AA:BB:CC:DD:EE:FF")]),
            snapshot(3, vec![online("a", "laptop", "10.0.0.5", "AA:BB:CC:DD:EE:FF")]),
        ],
        &log,
        ScanPolicy::default(),
    );

    engine.seed().await.unwrap();
    assert_eq!(engine.poll_once().await.unwrap(), 1);
    // Still connected at revision 3: nothing new to say
    assert_eq!(engine.poll_once().await.unwrap(), 0);

    let deliveries = log.lock().unwrap().clone();
    assert_eq!(deliveries.len(), 1);
    assert_eq!(deliveries[0].message, "laptop connected.");
    assert!(deliveries[0].event.connected);
    assert_eq!(deliveries[0].event.ip, "10.0.0.5");
    assert_eq!(deliveries[0].event.mac, "AA:BB:CC:DD:EE:FF");
}

#[tokio::test]
async fn lost_connection_is_announced_once() {
    let log = delivery_log();
    let (mut engine, _fetches) = engine_with(
        vec![
            snapshot(1, vec![online("a", "laptop", "10.0.0.5", "AA:BB:CC:DD:EE:FF")]),
            snapshot(2, vec![offline("a", "laptop", "AA:BB:CC:DD:EE:FF")]),
            snapshot(3, vec![offline("a", "laptop", "AA:BB:CC:DD:EE:FF")]),
        ],
        &log,
        ScanPolicy::default(),
    );

    engine.seed().await.unwrap();
    assert_eq!(engine.poll_once().await.unwrap(), 1);
    assert_eq!(engine.poll_once().await.unwrap(), 0);

    let deliveries = log.lock().unwrap().clone();
    assert_eq!(deliveries.len(), 1);
    assert_eq!(deliveries[0].message, "laptop disconnected.");
    assert!(!deliveries[0].event.connected);
    assert_eq!(deliveries[0].event.ip, "");
    assert_eq!(deliveries[0].event.mac, "");
    assert!(engine.tracker().connected().is_empty());
}

#[tokio::test]
async fn device_missing_from_a_delta_is_not_a_disconnect() {
    let log = delivery_log();
    let (mut engine, _fetches) = engine_with(
        vec![
            snapshot(1, vec![online("a", "laptop", "10.0.0.5", "AA:AA:AA:AA:AA:AA")]),
            snapshot(2, vec![online("b", "phone", "10.0.0.6", "BB:BB:BB:BB:BB:BB")]),
        ],
        &log,
        ScanPolicy::default(),
    );

    engine.seed().await.unwrap();
    engine.poll_once().await.unwrap();

    assert_eq!(messages(&log), vec!["phone connected."]);
    assert!(engine.tracker().connected().contains("a"));
    assert!(engine.tracker().connected().contains("b"));
}

#[tokio::test]
async fn unchanged_revision_is_never_diffed() {
    let log = delivery_log();
    // Revision 4 repeats with different content; the repeat must be ignored
    let (mut engine, _fetches) = engine_with(
        vec![
            snapshot(4, Vec::new()),
            snapshot(4, vec![online("a", "laptop", "10.0.0.5", "AA:AA:AA:AA:AA:AA")]),
            snapshot(4, vec![online("a", "laptop", "10.0.0.5", "AA:AA:AA:AA:AA:AA")]),
        ],
        &log,
        ScanPolicy::default(),
    );

    engine.seed().await.unwrap();
    assert_eq!(engine.poll_once().await.unwrap(), 0);
    assert_eq!(engine.poll_once().await.unwrap(), 0);

    assert!(log.lock().unwrap().is_empty());
    assert!(engine.tracker().connected().is_empty());
}

#[tokio::test]
async fn fetch_asks_for_changes_since_last_revision() {
    let log = delivery_log();
    let (mut engine, fetches) = engine_with(
        vec![
            snapshot(10, Vec::new()),
            snapshot(11, vec![online("a", "laptop", "10.0.0.5", "AA:AA:AA:AA:AA:AA")]),
            snapshot(11, Vec::new()),
            snapshot(15, vec![offline("a", "laptop", "AA:AA:AA:AA:AA:AA")]),
        ],
        &log,
        ScanPolicy::default(),
    );

    engine.seed().await.unwrap();
    for _ in 0..3 {
        engine.poll_once().await.unwrap();
    }

    let asked: Vec<Revision> = fetches.lock().unwrap().iter().map(|f| f.since).collect();
    assert_eq!(
        asked,
        vec![Revision(0), Revision(10), Revision(11), Revision(11)]
    );
    assert_eq!(engine.tracker().revision(), Revision(15));
    assert_eq!(messages(&log), vec!["laptop connected.", "laptop disconnected."]);
}

#[tokio::test]
async fn scan_stops_after_first_connect_by_default() {
    let log = delivery_log();
    let (mut engine, _fetches) = engine_with(
        vec![
            snapshot(1, vec![online("b", "phone", "10.0.0.6", "BB:BB:BB:BB:BB:BB")]),
            snapshot(
                2,
                vec![
                    online("a", "laptop", "10.0.0.5", "AA:AA:AA:AA:AA:AA"),
                    offline("b", "phone", "BB:BB:BB:BB:BB:BB"),
                    online("c", "tablet", "10.0.0.7", "CC:CC:CC:CC:CC:CC"),
                ],
            ),
            // The skipped devices are not reconsidered at the same revision
            snapshot(2, Vec::new()),
        ],
        &log,
        ScanPolicy::StopAfterFirstConnect,
    );

    engine.seed().await.unwrap();
    assert_eq!(engine.poll_once().await.unwrap(), 1);
    assert_eq!(engine.poll_once().await.unwrap(), 0);

    assert_eq!(messages(&log), vec!["laptop connected."]);
    // The disconnect after the early exit was never applied
    assert!(engine.tracker().connected().contains("b"));
    assert!(!engine.tracker().connected().contains("c"));
    assert_eq!(engine.tracker().revision(), Revision(2));
}

#[tokio::test]
async fn report_all_announces_every_transition_in_order() {
    let log = delivery_log();
    let (mut engine, _fetches) = engine_with(
        vec![
            snapshot(1, vec![online("b", "phone", "10.0.0.6", "BB:BB:BB:BB:BB:BB")]),
            snapshot(
                2,
                vec![
                    online("a", "laptop", "10.0.0.5", "AA:AA:AA:AA:AA:AA"),
                    offline("b", "phone", "BB:BB:BB:BB:BB:BB"),
                    online("c", "tablet", "10.0.0.7", "CC:CC:CC:CC:CC:CC"),
                ],
            ),
        ],
        &log,
        ScanPolicy::ReportAll,
    );

    engine.seed().await.unwrap();
    assert_eq!(engine.poll_once().await.unwrap(), 3);

    assert_eq!(
        messages(&log),
        vec![
            "laptop connected.",
            "phone disconnected.",
            "tablet connected."
        ]
    );
}
