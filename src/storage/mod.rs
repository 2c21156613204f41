//! Alert Store — transactional persistence for alerts, maintenance logs and
//! sensor history.
//!
//! Backed by sled with JSON values. Four trees:
//!
//! - `alerts`: alert id → Alert
//! - `open_alerts`: `machine\0alert_type` → alert id. Doubles as the dedup
//!   index and the enforcement of the at-most-one-open-alert invariant:
//!   emission inserts into it in the same transaction as the alert row.
//! - `maintenance_logs`: log id → MaintenanceLog (immutable once written)
//! - `sensor_history`: `machine\0<be-millis><be-seq>` → SensorHistoryRow,
//!   time-ordered per machine for range queries.
//!
//! Every public method is a self-contained transaction; no locks are held
//! between calls.

use chrono::{DateTime, Utc};
use sled::transaction::{ConflictableTransactionError, TransactionError};
use sled::Transactional;
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

use crate::types::{Alert, AlertState, AlertType, MaintenanceLog, SensorHistoryRow};

/// Error type for storage operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sled::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("alert not found: {0}")]
    AlertNotFound(String),

    #[error("invalid state: {0}")]
    InvalidState(String),
}

type TxAbort = ConflictableTransactionError<StoreError>;

fn tx_serialize<T: serde::Serialize>(value: &T) -> Result<Vec<u8>, TxAbort> {
    serde_json::to_vec(value)
        .map_err(|e| ConflictableTransactionError::Abort(StoreError::Serialization(e)))
}

fn tx_deserialize<T: serde::de::DeserializeOwned>(bytes: &[u8]) -> Result<T, TxAbort> {
    serde_json::from_slice(bytes)
        .map_err(|e| ConflictableTransactionError::Abort(StoreError::Serialization(e)))
}

fn unwrap_tx<T>(result: Result<T, TransactionError<StoreError>>) -> Result<T, StoreError> {
    match result {
        Ok(v) => Ok(v),
        Err(TransactionError::Abort(e)) => Err(e),
        Err(TransactionError::Storage(e)) => Err(StoreError::Database(e)),
    }
}

/// Key in `open_alerts` for a (machine, alert-type) slot.
fn open_key(machine_id: &str, alert_type: AlertType) -> Vec<u8> {
    let mut key = Vec::with_capacity(machine_id.len() + 1 + alert_type.as_str().len());
    key.extend_from_slice(machine_id.as_bytes());
    key.push(0);
    key.extend_from_slice(alert_type.as_str().as_bytes());
    key
}

/// Aggregate counts for the statistics endpoint.
#[derive(Debug, Clone, serde::Serialize)]
pub struct StoreStatistics {
    pub alerts_by_state: HashMap<String, u64>,
    pub total_logs: u64,
    pub sensor_history_count: u64,
}

/// Sled-backed store shared by the pipeline, lifecycle manager and sweeper.
#[derive(Clone)]
pub struct AlertStore {
    db: sled::Db,
    alerts: sled::Tree,
    open_alerts: sled::Tree,
    logs: sled::Tree,
    sensor_history: sled::Tree,
}

impl AlertStore {
    /// Open or create the store at the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let db = sled::open(path)?;
        Ok(Self {
            alerts: db.open_tree("alerts")?,
            open_alerts: db.open_tree("open_alerts")?,
            logs: db.open_tree("maintenance_logs")?,
            sensor_history: db.open_tree("sensor_history")?,
            db,
        })
    }

    // ========================================================================
    // Alert Operations
    // ========================================================================

    /// Insert a new ACTIVE alert, enforcing the open-alert uniqueness
    /// invariant.
    ///
    /// Returns `false` without writing anything when an open alert already
    /// holds the (machine, alert-type) slot. The slot check and both writes
    /// happen in one transaction, so concurrent emitters serialize here.
    pub fn insert_alert_new(&self, alert: &Alert) -> Result<bool, StoreError> {
        let key = open_key(&alert.machine_id, alert.alert_type);
        let result = (&self.alerts, &self.open_alerts).transaction(|(alerts, open)| {
            if open.get(key.as_slice())?.is_some() {
                return Ok(false);
            }
            alerts.insert(alert.id.as_bytes(), tx_serialize(alert)?)?;
            open.insert(key.as_slice(), alert.id.as_bytes())?;
            Ok(true)
        });
        unwrap_tx(result)
    }

    /// Fetch an alert by id.
    pub fn get_alert(&self, alert_id: &str) -> Result<Option<Alert>, StoreError> {
        match self.alerts.get(alert_id.as_bytes())? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Whether an open alert exists for the (machine, alert-type) pair.
    pub fn open_alert_exists(
        &self,
        machine_id: &str,
        alert_type: AlertType,
    ) -> Result<bool, StoreError> {
        Ok(self.open_alerts.get(open_key(machine_id, alert_type))?.is_some())
    }

    /// All open alerts, optionally for a single machine, newest first.
    pub fn list_open_alerts(&self, machine_id: Option<&str>) -> Result<Vec<Alert>, StoreError> {
        let mut alerts = Vec::new();
        for item in self.open_alerts.iter() {
            let (key, alert_id) = item?;
            if let Some(machine) = machine_id {
                let mut prefix = machine.as_bytes().to_vec();
                prefix.push(0);
                if !key.starts_with(&prefix) {
                    continue;
                }
            }
            if let Some(bytes) = self.alerts.get(&alert_id)? {
                let alert: Alert = serde_json::from_slice(&bytes)?;
                if alert.state.is_open() {
                    alerts.push(alert);
                }
            }
        }
        alerts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(alerts)
    }

    // ========================================================================
    // Lifecycle Transitions
    // ========================================================================

    /// ACTIVE → ACKNOWLEDGED. Fails with `InvalidState` from any other state.
    pub fn acknowledge_alert(
        &self,
        alert_id: &str,
        operator_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Alert, StoreError> {
        let result = self.alerts.transaction(|alerts| {
            let bytes = alerts.get(alert_id.as_bytes())?.ok_or_else(|| {
                ConflictableTransactionError::Abort(StoreError::AlertNotFound(
                    alert_id.to_string(),
                ))
            })?;
            let mut alert: Alert = tx_deserialize(&bytes)?;
            if alert.state != AlertState::Active {
                return Err(ConflictableTransactionError::Abort(StoreError::InvalidState(
                    format!(
                        "Alert is {}, can only acknowledge ACTIVE alerts",
                        alert.state
                    ),
                )));
            }
            alert.state = AlertState::Acknowledged;
            alert.acknowledged_by = Some(operator_id.to_string());
            alert.acknowledged_at = Some(now);
            alerts.insert(alert_id.as_bytes(), tx_serialize(&alert)?)?;
            Ok(alert)
        });
        unwrap_tx(result)
    }

    /// ACKNOWLEDGED → IN_PROGRESS.
    pub fn start_work(&self, alert_id: &str) -> Result<Alert, StoreError> {
        let result = self.alerts.transaction(|alerts| {
            let bytes = alerts.get(alert_id.as_bytes())?.ok_or_else(|| {
                ConflictableTransactionError::Abort(StoreError::AlertNotFound(
                    alert_id.to_string(),
                ))
            })?;
            let mut alert: Alert = tx_deserialize(&bytes)?;
            if alert.state != AlertState::Acknowledged {
                return Err(ConflictableTransactionError::Abort(StoreError::InvalidState(
                    format!(
                        "Alert is {}, work can only start on ACKNOWLEDGED alerts",
                        alert.state
                    ),
                )));
            }
            alert.state = AlertState::InProgress;
            alerts.insert(alert_id.as_bytes(), tx_serialize(&alert)?)?;
            Ok(alert)
        });
        unwrap_tx(result)
    }

    /// ACKNOWLEDGED/IN_PROGRESS → RESOLVED, releasing the open slot and
    /// writing the maintenance log in the same transaction.
    #[allow(clippy::too_many_arguments)]
    pub fn resolve_alert(
        &self,
        alert_id: &str,
        operator_id: &str,
        root_cause: &str,
        resolution_notes: &str,
        downtime_minutes: i64,
        now: DateTime<Utc>,
    ) -> Result<(Alert, MaintenanceLog), StoreError> {
        let result = (&self.alerts, &self.open_alerts, &self.logs).transaction(
            |(alerts, open, logs)| {
                let bytes = alerts.get(alert_id.as_bytes())?.ok_or_else(|| {
                    ConflictableTransactionError::Abort(StoreError::AlertNotFound(
                        alert_id.to_string(),
                    ))
                })?;
                let mut alert: Alert = tx_deserialize(&bytes)?;
                if !matches!(
                    alert.state,
                    AlertState::Acknowledged | AlertState::InProgress
                ) {
                    return Err(ConflictableTransactionError::Abort(StoreError::InvalidState(
                        format!(
                            "Alert is {}, can only resolve ACKNOWLEDGED or IN_PROGRESS alerts",
                            alert.state
                        ),
                    )));
                }

                alert.state = AlertState::Resolved;
                alert.resolved_by = Some(operator_id.to_string());
                alert.resolved_at = Some(now);
                alert.root_cause = Some(root_cause.to_string());
                alert.resolution_notes = Some(resolution_notes.to_string());
                alert.downtime_minutes = Some(downtime_minutes);
                alerts.insert(alert_id.as_bytes(), tx_serialize(&alert)?)?;

                open.remove(open_key(&alert.machine_id, alert.alert_type))?;

                let log = MaintenanceLog {
                    id: format!("LOG-{alert_id}"),
                    machine_id: alert.machine_id.clone(),
                    alert_id: alert_id.to_string(),
                    created_at: alert.created_at,
                    resolved_at: now,
                    operator: operator_id.to_string(),
                    root_cause: root_cause.to_string(),
                    resolution_notes: resolution_notes.to_string(),
                    downtime_minutes,
                    severity: alert.severity,
                    alert_type: alert.alert_type,
                    metadata: alert.metadata.clone(),
                };
                logs.insert(log.id.as_bytes(), tx_serialize(&log)?)?;

                Ok((alert, log))
            },
        );
        unwrap_tx(result)
    }

    /// Archive RESOLVED alerts whose `resolved_at` is older than `cutoff`.
    /// Returns the number archived. Idempotent.
    pub fn archive_resolved_before(&self, cutoff: DateTime<Utc>) -> Result<usize, StoreError> {
        let mut candidates = Vec::new();
        for item in self.alerts.iter() {
            let (key, value) = item?;
            let alert: Alert = serde_json::from_slice(&value)?;
            if alert.state == AlertState::Resolved
                && alert.resolved_at.is_some_and(|t| t < cutoff)
            {
                candidates.push(key.to_vec());
            }
        }

        let mut archived = 0;
        for key in candidates {
            let result = self.alerts.transaction(|alerts| {
                let Some(bytes) = alerts.get(key.as_slice())? else {
                    return Ok(false);
                };
                let mut alert: Alert = tx_deserialize(&bytes)?;
                // Re-check under the transaction; a concurrent writer may
                // have moved the alert on.
                if alert.state != AlertState::Resolved
                    || !alert.resolved_at.is_some_and(|t| t < cutoff)
                {
                    return Ok(false);
                }
                alert.state = AlertState::Logged;
                alerts.insert(key.as_slice(), tx_serialize(&alert)?)?;
                Ok(true)
            });
            if unwrap_tx(result)? {
                archived += 1;
            }
        }
        Ok(archived)
    }

    // ========================================================================
    // Maintenance Logs
    // ========================================================================

    /// Logs, optionally filtered by machine and a `resolved_at` lower bound,
    /// newest first, bounded by `limit`.
    pub fn get_maintenance_logs(
        &self,
        machine_id: Option<&str>,
        since: Option<DateTime<Utc>>,
        limit: usize,
    ) -> Result<Vec<MaintenanceLog>, StoreError> {
        let mut logs = Vec::new();
        for item in self.logs.iter() {
            let (_, value) = item?;
            let log: MaintenanceLog = serde_json::from_slice(&value)?;
            if machine_id.is_some_and(|m| m != log.machine_id) {
                continue;
            }
            if since.is_some_and(|s| log.resolved_at < s) {
                continue;
            }
            logs.push(log);
        }
        logs.sort_by(|a, b| b.resolved_at.cmp(&a.resolved_at));
        logs.truncate(limit);
        Ok(logs)
    }

    /// Fetch a maintenance log by id.
    pub fn get_maintenance_log(&self, log_id: &str) -> Result<Option<MaintenanceLog>, StoreError> {
        match self.logs.get(log_id.as_bytes())? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Delete logs with `resolved_at` older than `cutoff` (retention).
    pub fn delete_logs_before(&self, cutoff: DateTime<Utc>) -> Result<usize, StoreError> {
        let mut to_delete = Vec::new();
        for item in self.logs.iter() {
            let (key, value) = item?;
            let log: MaintenanceLog = serde_json::from_slice(&value)?;
            if log.resolved_at < cutoff {
                to_delete.push(key.to_vec());
            }
        }
        let deleted = to_delete.len();
        for key in to_delete {
            self.logs.remove(key)?;
        }
        Ok(deleted)
    }

    // ========================================================================
    // Sensor History
    // ========================================================================

    /// Append a sensor history row.
    ///
    /// Key: `machine\0<be timestamp millis><be sequence>` — chronological
    /// per machine, with the sequence breaking ties for equal timestamps.
    pub fn append_sensor_history(&self, row: &SensorHistoryRow) -> Result<(), StoreError> {
        let mut key = Vec::with_capacity(row.machine_id.len() + 17);
        key.extend_from_slice(row.machine_id.as_bytes());
        key.push(0);
        key.extend_from_slice(&row.timestamp.timestamp_millis().to_be_bytes());
        key.extend_from_slice(&self.db.generate_id()?.to_be_bytes());
        self.sensor_history.insert(key, serde_json::to_vec(row)?)?;
        Ok(())
    }

    /// Sensor history for a machine since `since`, oldest first.
    pub fn get_sensor_history(
        &self,
        machine_id: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<SensorHistoryRow>, StoreError> {
        let mut start = Vec::with_capacity(machine_id.len() + 9);
        start.extend_from_slice(machine_id.as_bytes());
        start.push(0);
        start.extend_from_slice(&since.timestamp_millis().to_be_bytes());

        let mut end = machine_id.as_bytes().to_vec();
        end.push(1);

        let mut rows = Vec::new();
        for item in self.sensor_history.range(start..end) {
            let (_, value) = item?;
            rows.push(serde_json::from_slice(&value)?);
        }
        Ok(rows)
    }

    // ========================================================================
    // Statistics & Maintenance
    // ========================================================================

    /// Aggregate counts across the three tables.
    pub fn statistics(&self) -> Result<StoreStatistics, StoreError> {
        let mut alerts_by_state: HashMap<String, u64> = HashMap::new();
        for item in self.alerts.iter() {
            let (_, value) = item?;
            let alert: Alert = serde_json::from_slice(&value)?;
            *alerts_by_state.entry(alert.state.to_string()).or_insert(0) += 1;
        }
        Ok(StoreStatistics {
            alerts_by_state,
            total_logs: self.logs.len() as u64,
            sensor_history_count: self.sensor_history.len() as u64,
        })
    }

    /// Flush pending writes to disk.
    pub fn flush(&self) -> Result<(), StoreError> {
        self.db.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Severity, SensorFrame};
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).single().expect("valid timestamp")
    }

    fn open_store() -> (tempfile::TempDir, AlertStore) {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = AlertStore::open(dir.path().join("store")).expect("open store");
        (dir, store)
    }

    fn test_alert(id: &str, machine: &str, alert_type: AlertType) -> Alert {
        Alert {
            id: id.to_string(),
            machine_id: machine.to_string(),
            alert_type,
            severity: Severity::Critical,
            message: "Critical: RUL only 20.0 hours remaining".to_string(),
            created_at: t0(),
            state: AlertState::Active,
            acknowledged_by: None,
            acknowledged_at: None,
            resolved_by: None,
            resolved_at: None,
            root_cause: None,
            resolution_notes: None,
            downtime_minutes: None,
            metadata: serde_json::json!({}),
        }
    }

    #[test]
    fn insert_and_fetch_round_trip() {
        let (_dir, store) = open_store();
        let alert = test_alert("ALERT-0001", "M-001", AlertType::CriticalRul);
        assert!(store.insert_alert_new(&alert).expect("insert"));

        let fetched = store.get_alert("ALERT-0001").expect("get").expect("exists");
        assert_eq!(fetched.machine_id, "M-001");
        assert_eq!(fetched.state, AlertState::Active);
    }

    #[test]
    fn duplicate_open_slot_is_rejected() {
        let (_dir, store) = open_store();
        let first = test_alert("ALERT-0001", "M-001", AlertType::CriticalRul);
        let second = test_alert("ALERT-0002", "M-001", AlertType::CriticalRul);
        assert!(store.insert_alert_new(&first).expect("insert"));
        assert!(!store.insert_alert_new(&second).expect("insert"));
        // The rejected alert left no row behind.
        assert!(store.get_alert("ALERT-0002").expect("get").is_none());

        // A different alert type on the same machine is a separate slot.
        let other = test_alert("ALERT-0003", "M-001", AlertType::AnomalyDetected);
        assert!(store.insert_alert_new(&other).expect("insert"));
    }

    #[test]
    fn acknowledge_requires_active_state() {
        let (_dir, store) = open_store();
        let alert = test_alert("ALERT-0001", "M-001", AlertType::CriticalRul);
        store.insert_alert_new(&alert).expect("insert");

        let acked = store
            .acknowledge_alert("ALERT-0001", "OP-001", t0() + Duration::minutes(1))
            .expect("ack");
        assert_eq!(acked.state, AlertState::Acknowledged);
        assert_eq!(acked.acknowledged_by.as_deref(), Some("OP-001"));

        // Second acknowledge fails and leaves state unchanged.
        let err = store
            .acknowledge_alert("ALERT-0001", "OP-002", t0() + Duration::minutes(2))
            .expect_err("double ack");
        assert!(matches!(err, StoreError::InvalidState(_)));
        let current = store.get_alert("ALERT-0001").expect("get").expect("exists");
        assert_eq!(current.acknowledged_by.as_deref(), Some("OP-001"));
    }

    #[test]
    fn acknowledge_missing_alert_is_not_found() {
        let (_dir, store) = open_store();
        let err = store
            .acknowledge_alert("ALERT-NOPE", "OP-001", t0())
            .expect_err("missing");
        assert!(matches!(err, StoreError::AlertNotFound(_)));
    }

    #[test]
    fn resolve_writes_log_and_frees_slot() {
        let (_dir, store) = open_store();
        let alert = test_alert("ALERT-0001", "M-001", AlertType::CriticalRul);
        store.insert_alert_new(&alert).expect("insert");
        store
            .acknowledge_alert("ALERT-0001", "OP-001", t0() + Duration::minutes(1))
            .expect("ack");

        let (resolved, log) = store
            .resolve_alert(
                "ALERT-0001",
                "OP-001",
                "Bearing wear",
                "Replaced bearing, tested operation.",
                120,
                t0() + Duration::hours(2),
            )
            .expect("resolve");

        assert_eq!(resolved.state, AlertState::Resolved);
        assert_eq!(log.id, "LOG-ALERT-0001");
        assert_eq!(log.alert_id, "ALERT-0001");
        assert_eq!(log.downtime_minutes, 120);

        // The log is durable and the open slot is free again.
        assert!(store.get_maintenance_log("LOG-ALERT-0001").expect("get").is_some());
        assert!(!store.open_alert_exists("M-001", AlertType::CriticalRul).expect("check"));
        let replacement = test_alert("ALERT-0002", "M-001", AlertType::CriticalRul);
        assert!(store.insert_alert_new(&replacement).expect("insert"));
    }

    #[test]
    fn resolve_from_active_is_invalid() {
        let (_dir, store) = open_store();
        let alert = test_alert("ALERT-0001", "M-001", AlertType::CriticalRul);
        store.insert_alert_new(&alert).expect("insert");

        let err = store
            .resolve_alert("ALERT-0001", "OP-001", "Cause", "Notes long enough.", 5, t0())
            .expect_err("resolve from ACTIVE");
        assert!(matches!(err, StoreError::InvalidState(_)));
        // No partial mutation: no log row, state unchanged.
        assert!(store.get_maintenance_log("LOG-ALERT-0001").expect("get").is_none());
        let current = store.get_alert("ALERT-0001").expect("get").expect("exists");
        assert_eq!(current.state, AlertState::Active);
    }

    #[test]
    fn list_open_alerts_filters_by_machine() {
        let (_dir, store) = open_store();
        store
            .insert_alert_new(&test_alert("ALERT-0001", "M-001", AlertType::CriticalRul))
            .expect("insert");
        store
            .insert_alert_new(&test_alert("ALERT-0002", "M-002", AlertType::WarningRul))
            .expect("insert");

        assert_eq!(store.list_open_alerts(None).expect("list").len(), 2);
        let m1 = store.list_open_alerts(Some("M-001")).expect("list");
        assert_eq!(m1.len(), 1);
        assert_eq!(m1[0].id, "ALERT-0001");
    }

    #[test]
    fn archive_moves_old_resolved_alerts_to_logged() {
        let (_dir, store) = open_store();
        let alert = test_alert("ALERT-0001", "M-001", AlertType::CriticalRul);
        store.insert_alert_new(&alert).expect("insert");
        store.acknowledge_alert("ALERT-0001", "OP-001", t0()).expect("ack");
        store
            .resolve_alert("ALERT-0001", "OP-001", "Cause", "Notes long enough.", 5, t0())
            .expect("resolve");

        // Cutoff before resolution: nothing to archive.
        assert_eq!(
            store.archive_resolved_before(t0() - Duration::days(1)).expect("archive"),
            0
        );
        // Cutoff after resolution: archived exactly once.
        let cutoff = t0() + Duration::days(91);
        assert_eq!(store.archive_resolved_before(cutoff).expect("archive"), 1);
        assert_eq!(store.archive_resolved_before(cutoff).expect("archive"), 0);

        let archived = store.get_alert("ALERT-0001").expect("get").expect("exists");
        assert_eq!(archived.state, AlertState::Logged);
    }

    #[test]
    fn sensor_history_range_query() {
        let (_dir, store) = open_store();
        for i in 0..10 {
            store
                .append_sensor_history(&SensorHistoryRow {
                    machine_id: "M-001".to_string(),
                    timestamp: t0() + Duration::minutes(i),
                    sensors: SensorFrame::default(),
                    health_score: 90.0 - i as f64,
                    rul_hours: 120.0,
                })
                .expect("append");
        }
        // Another machine's rows must not leak into the range.
        store
            .append_sensor_history(&SensorHistoryRow {
                machine_id: "M-002".to_string(),
                timestamp: t0() + Duration::minutes(5),
                sensors: SensorFrame::default(),
                health_score: 50.0,
                rul_hours: 40.0,
            })
            .expect("append");

        let rows = store
            .get_sensor_history("M-001", t0() + Duration::minutes(5))
            .expect("query");
        assert_eq!(rows.len(), 5);
        assert!(rows.iter().all(|r| r.machine_id == "M-001"));
        assert_eq!(rows[0].health_score, 85.0);
    }

    #[test]
    fn statistics_counts_by_state() {
        let (_dir, store) = open_store();
        store
            .insert_alert_new(&test_alert("ALERT-0001", "M-001", AlertType::CriticalRul))
            .expect("insert");
        store
            .insert_alert_new(&test_alert("ALERT-0002", "M-002", AlertType::WarningRul))
            .expect("insert");
        store.acknowledge_alert("ALERT-0002", "OP-001", t0()).expect("ack");

        let stats = store.statistics().expect("stats");
        assert_eq!(stats.alerts_by_state.get("ACTIVE"), Some(&1));
        assert_eq!(stats.alerts_by_state.get("ACKNOWLEDGED"), Some(&1));
        assert_eq!(stats.total_logs, 0);
    }

    #[test]
    fn log_queries_filter_by_machine_and_window() {
        let (_dir, store) = open_store();
        for (i, machine) in ["M-001", "M-002", "M-001"].iter().enumerate() {
            let id = format!("ALERT-{i}");
            let alert = test_alert(&id, machine, AlertType::CriticalRul);
            store.insert_alert_new(&alert).expect("insert");
            store.acknowledge_alert(&id, "OP-001", t0()).expect("ack");
            store
                .resolve_alert(
                    &id,
                    "OP-001",
                    "Cause",
                    "Notes long enough.",
                    5,
                    t0() + Duration::days(i as i64),
                )
                .expect("resolve");
        }

        let all = store.get_maintenance_logs(None, None, 100).expect("logs");
        assert_eq!(all.len(), 3);
        // Newest first
        assert_eq!(all[0].alert_id, "ALERT-2");

        let m1 = store
            .get_maintenance_logs(Some("M-001"), None, 100)
            .expect("logs");
        assert_eq!(m1.len(), 2);

        let recent = store
            .get_maintenance_logs(None, Some(t0() + Duration::hours(12)), 100)
            .expect("logs");
        assert_eq!(recent.len(), 2);
    }
}
