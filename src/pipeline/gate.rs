//! Final checks before a candidate becomes a persisted alert.
//!
//! Four hard gates, in order: multi-sensor confirmation (critical alerts
//! only), per-machine rate limit, dedup against open alerts, then the
//! transactional insert. Each gate that trips turns the attempt into a
//! `Suppressed` outcome the caller can observe.

use chrono::{DateTime, Duration, Utc};
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::defaults;
use crate::config::PlantConfig;
use crate::storage::AlertStore;
use crate::types::{
    Alert, AlertState, AlertType, EmitOutcome, SensorFrame, Severity, SuppressReason,
};

// ============================================================================
// Rate Bucket
// ============================================================================

/// Rolling record of a machine's alert emission times.
#[derive(Debug, Default)]
pub struct RateBucket {
    stamps: VecDeque<DateTime<Utc>>,
}

impl RateBucket {
    /// Drop stamps older than the rolling window.
    pub fn prune(&mut self, now: DateTime<Utc>) {
        let cutoff = now - Duration::seconds(defaults::RATE_BUCKET_WINDOW_SECS);
        while self.stamps.front().is_some_and(|t| *t <= cutoff) {
            self.stamps.pop_front();
        }
    }

    pub fn count(&self) -> usize {
        self.stamps.len()
    }

    pub fn record(&mut self, now: DateTime<Utc>) {
        self.stamps.push_back(now);
    }
}

// ============================================================================
// Alert Gate
// ============================================================================

/// The emission gate. Stateless apart from its config and store handles;
/// the per-machine rate bucket is passed in under the machine lock.
pub struct AlertGate {
    config: Arc<PlantConfig>,
    store: AlertStore,
}

impl AlertGate {
    pub fn new(config: Arc<PlantConfig>, store: AlertStore) -> Self {
        Self { config, store }
    }

    /// Run all gates and, if they pass, persist a new ACTIVE alert.
    #[allow(clippy::too_many_arguments)]
    pub fn emit(
        &self,
        bucket: &mut RateBucket,
        machine_id: &str,
        alert_type: AlertType,
        severity: Severity,
        message: String,
        metadata: serde_json::Value,
        sensors: &SensorFrame,
        now: DateTime<Utc>,
    ) -> EmitOutcome {
        // Gate 1: multi-sensor confirmation for critical alerts.
        if severity == Severity::Critical && self.config.gate.multi_sensor_required_for_critical {
            let degraded = self.count_degraded_sensors(sensors);
            let required = self.config.gate.min_degraded_sensors_for_critical;
            if degraded < required {
                debug!(
                    machine_id,
                    alert_type = %alert_type,
                    degraded,
                    required,
                    "Critical alert suppressed: multi-sensor confirmation failed"
                );
                return EmitOutcome::Suppressed(SuppressReason::MultiSensorUnconfirmed {
                    degraded,
                    required,
                });
            }
        }

        // Gate 2: per-machine rate limit over the rolling minute.
        bucket.prune(now);
        if bucket.count() >= self.config.gate.max_alerts_per_machine_per_minute as usize {
            debug!(
                machine_id,
                alert_type = %alert_type,
                recent = bucket.count(),
                "Alert suppressed: machine rate limit reached"
            );
            return EmitOutcome::Suppressed(SuppressReason::RateLimited);
        }

        // Gates 3 + 4: dedup and insert, atomically in the store.
        let alert = Alert {
            id: new_alert_id(),
            machine_id: machine_id.to_string(),
            alert_type,
            severity,
            message,
            created_at: now,
            state: AlertState::Active,
            acknowledged_by: None,
            acknowledged_at: None,
            resolved_by: None,
            resolved_at: None,
            root_cause: None,
            resolution_notes: None,
            downtime_minutes: None,
            metadata,
        };

        match self.store.insert_alert_new(&alert) {
            Ok(true) => {
                bucket.record(now);
                info!(
                    alert_id = %alert.id,
                    machine_id,
                    alert_type = %alert_type,
                    severity = %severity,
                    "Alert created (persistence verified)"
                );
                EmitOutcome::Emitted(alert.id)
            }
            Ok(false) => {
                debug!(
                    machine_id,
                    alert_type = %alert_type,
                    "Alert suppressed: open alert already exists"
                );
                EmitOutcome::Suppressed(SuppressReason::DuplicateActive)
            }
            Err(e) => {
                // The alert is dropped, not retried: the evaluation window
                // will re-approve on the next sample if the condition holds.
                warn!(
                    machine_id,
                    alert_type = %alert_type,
                    error = %e,
                    "Alert dropped: storage failure during emission"
                );
                EmitOutcome::Failed(crate::types::CoreError::Unavailable(e.to_string()))
            }
        }
    }

    /// How many sensor channels cross their degradation thresholds.
    ///
    /// Pressure and RPM degrade low; the rest degrade high. Overpressure is
    /// deliberately not counted.
    fn count_degraded_sensors(&self, sensors: &SensorFrame) -> usize {
        let t = &self.config.gate.degradation;
        let mut degraded = 0;
        if sensors.vibration_x > t.vibration_x {
            degraded += 1;
        }
        if sensors.vibration_y > t.vibration_y {
            degraded += 1;
        }
        if sensors.temperature > t.temperature {
            degraded += 1;
        }
        if sensors.pressure < t.pressure_low {
            degraded += 1;
        }
        if sensors.rpm < t.rpm_low {
            degraded += 1;
        }
        degraded
    }
}

/// Fresh globally-unique alert id, `ALERT-` plus 8 hex chars.
fn new_alert_id() -> String {
    let hex = Uuid::new_v4().simple().to_string();
    format!("ALERT-{}", hex[..8].to_uppercase())
}
