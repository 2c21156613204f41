//! Lifecycle integration tests.
//!
//! Exercises the alert state machine end-to-end over a real (temporary)
//! store: the happy path, the exact transition matrix, the
//! open-alert uniqueness invariant under concurrent emission, and the
//! resolve/maintenance-log atomicity guarantee.

use chrono::{DateTime, Duration, TimeZone, Utc};
use std::sync::{Arc, Mutex};

use plantwatch::pipeline::RateBucket;
use plantwatch::{
    AlertPipeline, AlertState, AlertStore, AlertType, CoreError, LifecycleManager, MetricsTracker,
    PlantConfig, SensorFrame, Severity,
};

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).single().expect("valid timestamp")
}

struct Harness {
    _dir: tempfile::TempDir,
    pipeline: Arc<AlertPipeline>,
    lifecycle: LifecycleManager,
    store: AlertStore,
}

fn harness() -> Harness {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = AlertStore::open(dir.path().join("store")).expect("open store");
    let config = Arc::new(PlantConfig::default());
    let pipeline = Arc::new(AlertPipeline::new(
        config.clone(),
        store.clone(),
        Arc::new(Mutex::new(MetricsTracker::new())),
    ));
    let lifecycle = LifecycleManager::new(config, store.clone());
    Harness {
        _dir: dir,
        pipeline,
        lifecycle,
        store,
    }
}

/// Emit one critical alert through the real pipeline path.
fn emit_critical_alert(h: &Harness, machine: &str) -> String {
    let degraded = SensorFrame {
        vibration_x: 2.7,
        vibration_y: 2.65,
        temperature: 93.0,
        pressure: 85.0,
        rpm: 1300.0,
    };
    for i in 0..60 {
        let emitted = h.pipeline.process_reading(
            machine,
            t0() + Duration::seconds(i),
            &degraded,
            20.0 - i as f64 * 0.05,
            34.0,
            false,
            0.0,
        );
        if let Some(id) = emitted.first() {
            return id.clone();
        }
    }
    panic!("sustained critical degradation did not emit an alert");
}

/// Emit, acknowledge, resolve; log exists; re-acknowledge fails.
#[test]
fn lifecycle_happy_path() {
    let h = harness();
    let alert_id = emit_critical_alert(&h, "M-E");

    let ack = h.lifecycle.acknowledge(&alert_id, "OP-001").expect("acknowledge");
    assert_eq!(ack.alert_id, alert_id);

    let receipt = h
        .lifecycle
        .resolve(
            &alert_id,
            "OP-001",
            "Bearing wear",
            "Replaced bearing, tested operation.",
            120,
        )
        .expect("resolve");
    assert_eq!(receipt.log_id, format!("LOG-{alert_id}"));

    // The maintenance log exists with matching linkage.
    let log = h
        .store
        .get_maintenance_log(&receipt.log_id)
        .expect("get log")
        .expect("log exists");
    assert_eq!(log.alert_id, alert_id);
    assert_eq!(log.root_cause, "Bearing wear");
    assert_eq!(log.downtime_minutes, 120);
    assert_eq!(log.severity, Severity::Critical);

    // Acknowledging again is an invalid state, and nothing changed.
    let err = h.lifecycle.acknowledge(&alert_id, "OP-002").expect_err("re-ack");
    assert!(matches!(err, CoreError::InvalidState(_)));
    let alert = h.store.get_alert(&alert_id).expect("get").expect("exists");
    assert_eq!(alert.state, AlertState::Resolved);
}

/// Only the five allowed transitions succeed; every rejected
/// attempt leaves the state untouched.
#[test]
fn invalid_transitions_leave_state_unchanged() {
    let h = harness();
    let alert_id = emit_critical_alert(&h, "M-T");

    // ACTIVE: resolve and start_work are invalid.
    assert!(matches!(
        h.lifecycle
            .resolve(&alert_id, "OP-001", "Cause text", "Notes long enough.", 0)
            .expect_err("resolve from ACTIVE"),
        CoreError::InvalidState(_)
    ));
    assert!(matches!(
        h.lifecycle.start_work(&alert_id, "OP-001").expect_err("start from ACTIVE"),
        CoreError::InvalidState(_)
    ));
    assert_eq!(
        h.store.get_alert(&alert_id).expect("get").expect("exists").state,
        AlertState::Active
    );

    // ACKNOWLEDGED → IN_PROGRESS → RESOLVED is the long path.
    h.lifecycle.acknowledge(&alert_id, "OP-001").expect("ack");
    h.lifecycle.start_work(&alert_id, "OP-001").expect("start");
    // IN_PROGRESS: acknowledge and start_work are invalid.
    assert!(matches!(
        h.lifecycle.acknowledge(&alert_id, "OP-001").expect_err("ack in progress"),
        CoreError::InvalidState(_)
    ));
    assert!(matches!(
        h.lifecycle.start_work(&alert_id, "OP-001").expect_err("double start"),
        CoreError::InvalidState(_)
    ));

    h.lifecycle
        .resolve(&alert_id, "OP-001", "Cause text", "Notes long enough.", 15)
        .expect("resolve");

    // RESOLVED is closed to everything but archiving.
    assert!(matches!(
        h.lifecycle
            .resolve(&alert_id, "OP-001", "Cause text", "Notes long enough.", 15)
            .expect_err("double resolve"),
        CoreError::InvalidState(_)
    ));
}

/// At most one open alert per (machine, alert-type), even when
/// eight writers race to emit the same condition.
#[test]
fn concurrent_emission_keeps_one_open_alert() {
    let h = harness();
    let config = Arc::new(PlantConfig::default());
    let degraded = SensorFrame {
        vibration_x: 2.7,
        vibration_y: 2.65,
        temperature: 93.0,
        pressure: 85.0,
        rpm: 1300.0,
    };

    let mut handles = Vec::new();
    for _ in 0..8 {
        let store = h.store.clone();
        let config = config.clone();
        let frame = degraded;
        handles.push(std::thread::spawn(move || {
            // Each writer has its own gate and rate bucket, so only the
            // store-level conditional insert can serialize them.
            let gate = plantwatch::pipeline::AlertGate::new(config, store);
            let mut bucket = RateBucket::default();
            gate.emit(
                &mut bucket,
                "M-RACE",
                AlertType::CriticalRul,
                Severity::Critical,
                "Critical: RUL only 12.0 hours remaining".to_string(),
                serde_json::json!({}),
                &frame,
                Utc::now(),
            )
        }));
    }

    let outcomes: Vec<_> = handles
        .into_iter()
        .map(|jh| jh.join().expect("thread"))
        .collect();
    let emitted = outcomes.iter().filter(|o| o.alert_id().is_some()).count();
    assert_eq!(emitted, 1, "exactly one racer may win the slot");

    let open = h.store.list_open_alerts(Some("M-RACE")).expect("list");
    assert_eq!(open.len(), 1);
}

/// The open slot stays occupied through
/// ACKNOWLEDGED and IN_PROGRESS and reopens only after RESOLVED.
#[test]
fn open_slot_follows_the_lifecycle() {
    let h = harness();
    let alert_id = emit_critical_alert(&h, "M-S");

    let occupied =
        |h: &Harness| h.store.open_alert_exists("M-S", AlertType::CriticalRul).expect("check");

    assert!(occupied(&h));
    h.lifecycle.acknowledge(&alert_id, "OP-001").expect("ack");
    assert!(occupied(&h));
    h.lifecycle.start_work(&alert_id, "OP-001").expect("start");
    assert!(occupied(&h));
    h.lifecycle
        .resolve(&alert_id, "OP-001", "Cause text", "Notes long enough.", 0)
        .expect("resolve");
    assert!(!occupied(&h));
}

/// RESOLVED alerts move to LOGGED once they age past the cutoff,
/// and LOGGED is terminal.
#[test]
fn archive_is_the_only_exit_from_resolved() {
    let h = harness();
    let alert_id = emit_critical_alert(&h, "M-AR");
    h.lifecycle.acknowledge(&alert_id, "OP-001").expect("ack");
    h.lifecycle
        .resolve(&alert_id, "OP-001", "Cause text", "Notes long enough.", 0)
        .expect("resolve");

    let resolved_at = h
        .store
        .get_alert(&alert_id)
        .expect("get")
        .expect("exists")
        .resolved_at
        .expect("resolved_at set");

    let archived = h
        .lifecycle
        .archive_before(resolved_at + Duration::seconds(1))
        .expect("archive");
    assert_eq!(archived, 1);
    assert_eq!(
        h.store.get_alert(&alert_id).expect("get").expect("exists").state,
        AlertState::Logged
    );

    // Terminal: a second archive pass finds nothing.
    assert_eq!(
        h.lifecycle
            .archive_before(resolved_at + Duration::seconds(1))
            .expect("archive"),
        0
    );
}

/// Resolving frees the slot so the same condition can alert again later.
#[test]
fn resolved_condition_can_alert_again() {
    let h = harness();
    let first = emit_critical_alert(&h, "M-RE");
    h.lifecycle.acknowledge(&first, "OP-001").expect("ack");
    h.lifecycle
        .resolve(&first, "OP-001", "Cause text", "Notes long enough.", 0)
        .expect("resolve");

    // Maintenance done: reset in-memory state, then degrade again.
    h.pipeline.reset_machine("M-RE");
    let degraded = SensorFrame {
        vibration_x: 2.7,
        vibration_y: 2.65,
        temperature: 93.0,
        pressure: 85.0,
        rpm: 1300.0,
    };
    let mut second = None;
    for i in 0..60 {
        let emitted = h.pipeline.process_reading(
            "M-RE",
            t0() + Duration::seconds(3600 + i),
            &degraded,
            20.0 - i as f64 * 0.05,
            34.0,
            false,
            0.0,
        );
        if let Some(id) = emitted.first() {
            second = Some(id.clone());
            break;
        }
    }
    let second = second.expect("second alert after resolution");
    assert_ne!(first, second);
}
