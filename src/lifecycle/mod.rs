//! Alert lifecycle management.
//!
//! Drives the ACTIVE → ACKNOWLEDGED → IN_PROGRESS → RESOLVED → LOGGED state
//! machine. Input validation happens here; the state-transition preconditions
//! and all mutations live in single store transactions, so no partial
//! mutation is ever visible.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::sync::Arc;
use tracing::info;

use crate::config::defaults;
use crate::config::PlantConfig;
use crate::storage::{AlertStore, StoreError};
use crate::types::{Alert, CoreError, MaintenanceLog};

/// Receipt for a successful acknowledge.
#[derive(Debug, Clone, Serialize)]
pub struct AckReceipt {
    pub alert_id: String,
    pub operator_id: String,
    pub acknowledged_at: DateTime<Utc>,
}

/// Receipt for a successful start-work transition.
#[derive(Debug, Clone, Serialize)]
pub struct StartWorkReceipt {
    pub alert_id: String,
    pub operator_id: String,
}

/// Receipt for a successful resolve.
#[derive(Debug, Clone, Serialize)]
pub struct ResolveReceipt {
    pub alert_id: String,
    pub operator_id: String,
    pub resolved_at: DateTime<Utc>,
    pub log_id: String,
}

/// Lifecycle operations over the persisted alerts.
pub struct LifecycleManager {
    config: Arc<PlantConfig>,
    store: AlertStore,
}

impl LifecycleManager {
    pub fn new(config: Arc<PlantConfig>, store: AlertStore) -> Self {
        Self { config, store }
    }

    /// Acknowledge an ACTIVE alert.
    pub fn acknowledge(&self, alert_id: &str, operator_id: &str) -> Result<AckReceipt, CoreError> {
        self.acknowledge_at(alert_id, operator_id, Utc::now())
    }

    /// Acknowledge with an explicit timestamp.
    pub fn acknowledge_at(
        &self,
        alert_id: &str,
        operator_id: &str,
        now: DateTime<Utc>,
    ) -> Result<AckReceipt, CoreError> {
        validate_operator(operator_id)?;
        let alert = self
            .store
            .acknowledge_alert(alert_id, operator_id, now)
            .map_err(store_to_core)?;
        info!(alert_id, operator_id, "Alert acknowledged");
        Ok(AckReceipt {
            alert_id: alert.id,
            operator_id: operator_id.to_string(),
            acknowledged_at: now,
        })
    }

    /// Move an ACKNOWLEDGED alert to IN_PROGRESS.
    pub fn start_work(
        &self,
        alert_id: &str,
        operator_id: &str,
    ) -> Result<StartWorkReceipt, CoreError> {
        let alert = self.store.start_work(alert_id).map_err(store_to_core)?;
        info!(alert_id, operator_id, "Work started on alert");
        Ok(StartWorkReceipt {
            alert_id: alert.id,
            operator_id: operator_id.to_string(),
        })
    }

    /// Resolve an alert and write its maintenance log atomically.
    pub fn resolve(
        &self,
        alert_id: &str,
        operator_id: &str,
        root_cause: &str,
        resolution_notes: &str,
        downtime_minutes: i64,
    ) -> Result<ResolveReceipt, CoreError> {
        self.resolve_at(
            alert_id,
            operator_id,
            root_cause,
            resolution_notes,
            downtime_minutes,
            Utc::now(),
        )
    }

    /// Resolve with an explicit timestamp.
    #[allow(clippy::too_many_arguments)]
    pub fn resolve_at(
        &self,
        alert_id: &str,
        operator_id: &str,
        root_cause: &str,
        resolution_notes: &str,
        downtime_minutes: i64,
        now: DateTime<Utc>,
    ) -> Result<ResolveReceipt, CoreError> {
        validate_operator(operator_id)?;
        if root_cause.chars().count() < defaults::MIN_ROOT_CAUSE_LENGTH {
            return Err(CoreError::InvalidInput(format!(
                "Root cause must be at least {} characters",
                defaults::MIN_ROOT_CAUSE_LENGTH
            )));
        }
        if resolution_notes.chars().count() < defaults::MIN_RESOLUTION_NOTES_LENGTH {
            return Err(CoreError::InvalidInput(format!(
                "Resolution notes must be at least {} characters",
                defaults::MIN_RESOLUTION_NOTES_LENGTH
            )));
        }
        if downtime_minutes < 0 {
            return Err(CoreError::InvalidInput(
                "Downtime cannot be negative".to_string(),
            ));
        }

        let (alert, log) = self
            .store
            .resolve_alert(
                alert_id,
                operator_id,
                root_cause,
                resolution_notes,
                downtime_minutes,
                now,
            )
            .map_err(store_to_core)?;
        info!(
            alert_id,
            operator_id,
            root_cause,
            downtime_minutes,
            log_id = %log.id,
            "Alert resolved"
        );
        Ok(ResolveReceipt {
            alert_id: alert.id,
            operator_id: operator_id.to_string(),
            resolved_at: now,
            log_id: log.id,
        })
    }

    /// Archive RESOLVED alerts older than `cutoff_age` to LOGGED.
    pub fn archive(&self, cutoff_age: Duration) -> Result<usize, CoreError> {
        self.archive_before(Utc::now() - cutoff_age)
    }

    /// Archive with an explicit cutoff instant.
    pub fn archive_before(&self, cutoff: DateTime<Utc>) -> Result<usize, CoreError> {
        self.store
            .archive_resolved_before(cutoff)
            .map_err(store_to_core)
    }

    /// Apply the configured retention policy: archive RESOLVED alerts past
    /// the alert retention period and delete logs past the log retention
    /// period. Returns `(archived, deleted)`.
    pub fn apply_retention(&self, now: DateTime<Utc>) -> Result<(usize, usize), CoreError> {
        let alert_cutoff = now - Duration::days(self.config.retention.alert_retention_days);
        let log_cutoff = now - Duration::days(self.config.retention.log_retention_days);
        let archived = self
            .store
            .archive_resolved_before(alert_cutoff)
            .map_err(store_to_core)?;
        let deleted = self
            .store
            .delete_logs_before(log_cutoff)
            .map_err(store_to_core)?;
        Ok((archived, deleted))
    }

    /// Open alerts, optionally for one machine.
    pub fn active_alerts(&self, machine_id: Option<&str>) -> Result<Vec<Alert>, CoreError> {
        self.store.list_open_alerts(machine_id).map_err(store_to_core)
    }

    /// Maintenance logs for the trailing `days` window.
    pub fn maintenance_logs(
        &self,
        machine_id: Option<&str>,
        days: i64,
        limit: usize,
    ) -> Result<Vec<MaintenanceLog>, CoreError> {
        let since = Utc::now() - Duration::days(days);
        self.store
            .get_maintenance_logs(machine_id, Some(since), limit)
            .map_err(store_to_core)
    }

    /// Alert statistics for monitoring, including the operator-facing
    /// requires-attention rollup.
    pub fn statistics(&self) -> Result<AlertStatistics, CoreError> {
        let stats = self.store.statistics().map_err(store_to_core)?;
        let active = stats.alerts_by_state.get("ACTIVE").copied().unwrap_or(0);
        let acknowledged = stats
            .alerts_by_state
            .get("ACKNOWLEDGED")
            .copied()
            .unwrap_or(0);
        let resolved = stats.alerts_by_state.get("RESOLVED").copied().unwrap_or(0);
        Ok(AlertStatistics {
            active_alerts: active,
            acknowledged_alerts: acknowledged,
            resolved_alerts: resolved,
            total_logs: stats.total_logs,
            requires_attention: active + acknowledged,
            alerts_by_state: stats.alerts_by_state,
        })
    }

    /// Retention configuration in effect (used by the sweeper).
    pub fn config(&self) -> &PlantConfig {
        &self.config
    }
}

/// Aggregated alert counts for the statistics endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct AlertStatistics {
    pub active_alerts: u64,
    pub acknowledged_alerts: u64,
    pub resolved_alerts: u64,
    pub total_logs: u64,
    pub requires_attention: u64,
    pub alerts_by_state: std::collections::HashMap<String, u64>,
}

fn validate_operator(operator_id: &str) -> Result<(), CoreError> {
    if operator_id.chars().count() < defaults::MIN_OPERATOR_ID_LENGTH {
        return Err(CoreError::InvalidInput("Invalid operator ID".to_string()));
    }
    Ok(())
}

fn store_to_core(err: StoreError) -> CoreError {
    match err {
        StoreError::AlertNotFound(_) => CoreError::NotFound("Alert not found".to_string()),
        StoreError::InvalidState(msg) => CoreError::InvalidState(msg),
        StoreError::Database(e) => CoreError::Unavailable(e.to_string()),
        StoreError::Serialization(e) => CoreError::Unavailable(e.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AlertState, AlertType, Severity};
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).single().expect("valid timestamp")
    }

    fn manager_with_alert(id: &str) -> (tempfile::TempDir, LifecycleManager) {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = AlertStore::open(dir.path().join("store")).expect("open store");
        let alert = Alert {
            id: id.to_string(),
            machine_id: "M-001".to_string(),
            alert_type: AlertType::CriticalRul,
            severity: Severity::Critical,
            message: "Critical: RUL only 18.0 hours remaining".to_string(),
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
        };
        store.insert_alert_new(&alert).expect("insert");
        (dir, LifecycleManager::new(Arc::new(PlantConfig::default()), store))
    }

    #[test]
    fn happy_path_acknowledge_then_resolve() {
        let (_dir, manager) = manager_with_alert("ALERT-X");

        let ack = manager
            .acknowledge_at("ALERT-X", "OP-001", t0() + Duration::minutes(5))
            .expect("ack");
        assert_eq!(ack.alert_id, "ALERT-X");

        let receipt = manager
            .resolve_at(
                "ALERT-X",
                "OP-001",
                "Bearing wear",
                "Replaced bearing, tested operation.",
                120,
                t0() + Duration::hours(2),
            )
            .expect("resolve");
        assert_eq!(receipt.log_id, "LOG-ALERT-X");
    }

    #[test]
    fn short_operator_id_is_invalid_input() {
        let (_dir, manager) = manager_with_alert("ALERT-X");
        let err = manager.acknowledge("ALERT-X", "OP").expect_err("short operator");
        assert!(matches!(err, CoreError::InvalidInput(_)));
    }

    #[test]
    fn resolve_validation_rules() {
        let (_dir, manager) = manager_with_alert("ALERT-X");
        manager
            .acknowledge_at("ALERT-X", "OP-001", t0())
            .expect("ack");

        // Root cause too short
        let err = manager
            .resolve("ALERT-X", "OP-001", "Rub", "Notes long enough here.", 10)
            .expect_err("short root cause");
        assert!(matches!(err, CoreError::InvalidInput(_)));

        // Notes too short
        let err = manager
            .resolve("ALERT-X", "OP-001", "Bearing wear", "Short", 10)
            .expect_err("short notes");
        assert!(matches!(err, CoreError::InvalidInput(_)));

        // Negative downtime
        let err = manager
            .resolve("ALERT-X", "OP-001", "Bearing wear", "Notes long enough here.", -5)
            .expect_err("negative downtime");
        assert!(matches!(err, CoreError::InvalidInput(_)));
    }

    #[test]
    fn double_acknowledge_is_invalid_state() {
        let (_dir, manager) = manager_with_alert("ALERT-X");
        manager.acknowledge_at("ALERT-X", "OP-001", t0()).expect("ack");
        let err = manager
            .acknowledge_at("ALERT-X", "OP-002", t0())
            .expect_err("double ack");
        assert!(matches!(err, CoreError::InvalidState(_)));
    }

    #[test]
    fn resolve_is_not_repeatable() {
        let (_dir, manager) = manager_with_alert("ALERT-X");
        manager.acknowledge_at("ALERT-X", "OP-001", t0()).expect("ack");
        manager
            .resolve_at(
                "ALERT-X",
                "OP-001",
                "Bearing wear",
                "Replaced bearing, tested operation.",
                30,
                t0(),
            )
            .expect("resolve");

        let err = manager
            .resolve_at(
                "ALERT-X",
                "OP-001",
                "Bearing wear",
                "Replaced bearing, tested operation.",
                30,
                t0(),
            )
            .expect_err("second resolve");
        assert!(matches!(err, CoreError::InvalidState(_)));
    }

    #[test]
    fn unknown_alert_is_not_found() {
        let (_dir, manager) = manager_with_alert("ALERT-X");
        let err = manager.acknowledge("ALERT-MISSING", "OP-001").expect_err("missing");
        assert!(matches!(err, CoreError::NotFound(_)));
    }

    #[test]
    fn start_work_requires_acknowledged() {
        let (_dir, manager) = manager_with_alert("ALERT-X");
        let err = manager.start_work("ALERT-X", "OP-001").expect_err("from ACTIVE");
        assert!(matches!(err, CoreError::InvalidState(_)));

        manager.acknowledge_at("ALERT-X", "OP-001", t0()).expect("ack");
        manager.start_work("ALERT-X", "OP-001").expect("start");

        // IN_PROGRESS resolves fine.
        manager
            .resolve_at(
                "ALERT-X",
                "OP-001",
                "Bearing wear",
                "Replaced bearing, tested operation.",
                30,
                t0(),
            )
            .expect("resolve");
    }

    #[test]
    fn statistics_rolls_up_requires_attention() {
        let (_dir, manager) = manager_with_alert("ALERT-X");
        let stats = manager.statistics().expect("stats");
        assert_eq!(stats.active_alerts, 1);
        assert_eq!(stats.requires_attention, 1);

        manager.acknowledge_at("ALERT-X", "OP-001", t0()).expect("ack");
        let stats = manager.statistics().expect("stats");
        assert_eq!(stats.acknowledged_alerts, 1);
        assert_eq!(stats.requires_attention, 1);
    }
}
