//! Per-machine pipeline orchestration.
//!
//! `AlertPipeline` owns all in-memory machine state and wires the stages
//! together for each submitted sample:
//!
//! ```text
//! Sample → (AnomalyDetector, RulModel→Stabilizer) → risk score
//!        → EvaluationWindow feed/evaluate → hysteresis clears
//!        → PendingTracker → AlertGate → Store
//! ```
//!
//! Distinct machines process concurrently; everything belonging to one
//! machine mutates under that machine's lock. The outer map takes its own
//! lock only for insertion of new machines.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use tracing::{debug, warn};

use super::gate::{AlertGate, RateBucket};
use super::pending::PendingTracker;
use super::window::{risk_score, EvaluationWindow, WindowEvaluation};
use crate::config::PlantConfig;
use crate::metrics::MetricsTracker;
use crate::prediction::{
    rul, AnomalyDetector, ForecastReport, Forecaster, PredictionTrend, Stabilizer,
};
use crate::storage::AlertStore;
use crate::types::{AlertType, EmitOutcome, Sample, SensorFrame, SensorHistoryRow, Severity};

/// Default confidence recorded with pipeline-generated predictions.
const PREDICTION_CONFIDENCE: f64 = 0.8;

// ============================================================================
// Machine State
// ============================================================================

/// All in-memory state for one machine, guarded by its per-machine lock.
pub struct MachineState {
    detector: AnomalyDetector,
    stabilizer: Stabilizer,
    forecaster: Forecaster,
    windows: HashMap<AlertType, EvaluationWindow>,
    pending: PendingTracker,
    rate_bucket: RateBucket,
}

impl MachineState {
    fn new(config: &PlantConfig) -> Self {
        let windows = AlertType::ALL
            .into_iter()
            .map(|t| (t, EvaluationWindow::new(config.windows.profile(t))))
            .collect();
        Self {
            detector: AnomalyDetector::default(),
            stabilizer: Stabilizer::new(config.stabilizer.clone()),
            forecaster: Forecaster::new(config.forecast.clone()),
            windows,
            pending: PendingTracker::default(),
            rate_bucket: RateBucket::default(),
        }
    }
}

/// Snapshot of one evaluation window for introspection endpoints.
#[derive(Debug, Serialize)]
pub struct WindowStatus {
    pub alert_type: AlertType,
    #[serde(flatten)]
    pub evaluation: WindowEvaluation,
}

// ============================================================================
// Alert Pipeline
// ============================================================================

/// The root pipeline handle. One instance per process, injected wherever the
/// sample path or machine state is needed.
pub struct AlertPipeline {
    config: Arc<PlantConfig>,
    store: AlertStore,
    gate: AlertGate,
    metrics: Arc<Mutex<MetricsTracker>>,
    machines: RwLock<HashMap<String, Arc<Mutex<MachineState>>>>,
}

impl AlertPipeline {
    pub fn new(
        config: Arc<PlantConfig>,
        store: AlertStore,
        metrics: Arc<Mutex<MetricsTracker>>,
    ) -> Self {
        Self {
            gate: AlertGate::new(config.clone(), store.clone()),
            config,
            store,
            metrics,
            machines: RwLock::new(HashMap::new()),
        }
    }

    /// Submit one sensor sample. Returns the ids of any alerts emitted.
    ///
    /// Never fails: model errors degrade to fallbacks and storage errors on
    /// the ingestion path are logged and dropped.
    pub fn submit(&self, sample: &Sample) -> Vec<String> {
        self.submit_with_options(sample, false)
    }

    /// Submit with stabilizer bypass (scripted replays).
    pub fn submit_with_options(&self, sample: &Sample, bypass_smoothing: bool) -> Vec<String> {
        let machine = self.machine(&sample.machine_id);
        let mut state = lock_machine(&machine);
        let now = sample.timestamp;

        let report = state.detector.detect(&sample.sensors);
        let (rul_hours, health_score) =
            state
                .stabilizer
                .stable_predict(&sample.sensors, now, bypass_smoothing);
        state.forecaster.add_reading(now, health_score);

        if let Err(e) = self.store.append_sensor_history(&SensorHistoryRow {
            machine_id: sample.machine_id.clone(),
            timestamp: now,
            sensors: sample.sensors,
            health_score,
            rul_hours,
        }) {
            warn!(machine_id = %sample.machine_id, error = %e, "Failed to persist sensor history");
        }

        self.evaluate_locked(
            &mut state,
            &sample.machine_id,
            now,
            &sample.sensors,
            rul_hours,
            health_score,
            report.is_anomaly,
            report.score,
        )
    }

    /// Run the alert decision stages on a pre-computed reading.
    ///
    /// This is the entry point behind `submit`; it is public so operator
    /// tooling (and tests) can feed model outputs directly.
    #[allow(clippy::too_many_arguments)]
    pub fn process_reading(
        &self,
        machine_id: &str,
        now: DateTime<Utc>,
        sensors: &SensorFrame,
        rul_hours: f64,
        health_score: f64,
        is_anomaly: bool,
        anomaly_score: f64,
    ) -> Vec<String> {
        let machine = self.machine(machine_id);
        let mut state = lock_machine(&machine);
        self.evaluate_locked(
            &mut state,
            machine_id,
            now,
            sensors,
            rul_hours,
            health_score,
            is_anomaly,
            anomaly_score,
        )
    }

    /// The decision core. Caller holds the machine lock.
    #[allow(clippy::too_many_arguments)]
    fn evaluate_locked(
        &self,
        state: &mut MachineState,
        machine_id: &str,
        now: DateTime<Utc>,
        sensors: &SensorFrame,
        rul_hours: f64,
        health_score: f64,
        is_anomaly: bool,
        anomaly_score: f64,
    ) -> Vec<String> {
        let risk = risk_score(rul_hours, health_score, anomaly_score);

        // Feed every window so they accumulate data even below threshold.
        for alert_type in AlertType::ALL {
            if let Some(window) = state.windows.get_mut(&alert_type) {
                window.add_sample(now, risk, health_score, rul_hours, *sensors);
            }
        }

        let mut created = Vec::new();
        let thresholds = self.config.thresholds.clone();

        // --- RUL ---
        if rul_hours < thresholds.rul_critical_trigger {
            if let Some(id) = self.try_alert(
                state,
                machine_id,
                AlertType::CriticalRul,
                Severity::Critical,
                format!("Critical: RUL only {rul_hours:.1} hours remaining"),
                serde_json::json!({
                    "rul_hours": rul_hours,
                    "failure_risk": rul::failure_risk(rul_hours),
                }),
                sensors,
                now,
            ) {
                created.push(id);
            }
        } else if rul_hours < thresholds.rul_warning_trigger {
            if let Some(id) = self.try_alert(
                state,
                machine_id,
                AlertType::WarningRul,
                Severity::Warning,
                format!("Warning: RUL {rul_hours:.1} hours, maintenance recommended"),
                serde_json::json!({
                    "rul_hours": rul_hours,
                    "failure_risk": rul::failure_risk(rul_hours),
                }),
                sensors,
                now,
            ) {
                created.push(id);
            }
        } else {
            // Hysteresis: strictly above the clear threshold releases the
            // pending entry; at-threshold does not.
            if rul_hours > thresholds.rul_warning_clear {
                state.pending.clear(AlertType::WarningRul);
            }
            if rul_hours > thresholds.rul_critical_clear {
                state.pending.clear(AlertType::CriticalRul);
            }
        }

        // --- Health ---
        if health_score < thresholds.health_critical_trigger {
            if let Some(id) = self.try_alert(
                state,
                machine_id,
                AlertType::LowHealthCritical,
                Severity::Critical,
                format!("Critical: Health score {health_score:.1}%"),
                serde_json::json!({ "health_score": health_score }),
                sensors,
                now,
            ) {
                created.push(id);
            }
        } else if health_score < thresholds.health_warning_trigger {
            if let Some(id) = self.try_alert(
                state,
                machine_id,
                AlertType::LowHealthWarning,
                Severity::Warning,
                format!("Warning: Health score {health_score:.1}%"),
                serde_json::json!({ "health_score": health_score }),
                sensors,
                now,
            ) {
                created.push(id);
            }
        } else {
            if health_score > thresholds.health_warning_clear {
                state.pending.clear(AlertType::LowHealthWarning);
            }
            if health_score > thresholds.health_critical_clear {
                state.pending.clear(AlertType::LowHealthCritical);
            }
        }

        // --- Anomaly ---
        if is_anomaly {
            let severity = if anomaly_score > thresholds.anomaly_critical_score {
                Severity::Critical
            } else {
                Severity::Warning
            };
            if let Some(id) = self.try_alert(
                state,
                machine_id,
                AlertType::AnomalyDetected,
                severity,
                format!("Anomaly detected (score: {anomaly_score:.2})"),
                serde_json::json!({ "anomaly_score": anomaly_score }),
                sensors,
                now,
            ) {
                created.push(id);
            }
        } else {
            state.pending.clear(AlertType::AnomalyDetected);
        }

        if !created.is_empty() {
            let mut metrics = lock_metrics(&self.metrics);
            for _ in &created {
                metrics.record_prediction_at(
                    machine_id,
                    rul_hours,
                    health_score,
                    anomaly_score,
                    PREDICTION_CONFIDENCE,
                    now,
                );
            }
        }

        created
    }

    /// Window evaluation → persistence window → gate, for one alert type.
    #[allow(clippy::too_many_arguments)]
    fn try_alert(
        &self,
        state: &mut MachineState,
        machine_id: &str,
        alert_type: AlertType,
        severity: Severity,
        message: String,
        mut metadata: serde_json::Value,
        sensors: &SensorFrame,
        now: DateTime<Utc>,
    ) -> Option<String> {
        let evaluation = state.windows.get_mut(&alert_type)?.evaluate(now);
        if !evaluation.may_proceed {
            debug!(
                machine_id,
                alert_type = %alert_type,
                reason = %evaluation.reason,
                "Window rejected alert candidate"
            );
            return None;
        }

        if let Some(map) = metadata.as_object_mut() {
            map.insert(
                "window_eval".to_string(),
                serde_json::json!({
                    "mean_risk": evaluation.mean_risk,
                    "trend": evaluation.risk_trend,
                    "pct_above": evaluation.pct_above_threshold,
                }),
            );
        }

        let required_secs = self.config.persistence.secs(alert_type);
        if !state.pending.observe(alert_type, severity, now, required_secs) {
            return None;
        }

        match self.gate.emit(
            &mut state.rate_bucket,
            machine_id,
            alert_type,
            severity,
            message,
            metadata,
            sensors,
            now,
        ) {
            EmitOutcome::Emitted(id) => Some(id),
            EmitOutcome::Suppressed(_) | EmitOutcome::Failed(_) => None,
        }
    }

    // ========================================================================
    // Machine Queries & Maintenance
    // ========================================================================

    /// Health trajectory forecast for a machine.
    pub fn forecast(&self, machine_id: &str, now: DateTime<Utc>, horizon_hours: u32) -> ForecastReport {
        let machine = self.machine(machine_id);
        let state = lock_machine(&machine);
        state.forecaster.forecast(now, horizon_hours)
    }

    /// Stabilized prediction trend for a machine.
    pub fn prediction_trend(&self, machine_id: &str, now: DateTime<Utc>, hours: i64) -> PredictionTrend {
        let machine = self.machine(machine_id);
        let state = lock_machine(&machine);
        state.stabilizer.trend(now, hours)
    }

    /// Evaluation-window snapshots for a machine, in alert-type order.
    pub fn window_status(&self, machine_id: &str, now: DateTime<Utc>) -> Vec<WindowStatus> {
        let machine = self.machine(machine_id);
        let mut state = lock_machine(&machine);
        AlertType::ALL
            .into_iter()
            .filter_map(|alert_type| {
                state.windows.get_mut(&alert_type).map(|w| WindowStatus {
                    alert_type,
                    evaluation: w.evaluate(now),
                })
            })
            .collect()
    }

    /// Post-maintenance reset: clears the stabilizer, forecaster, evaluation
    /// windows and pending entries for the machine.
    pub fn reset_machine(&self, machine_id: &str) {
        let machine = self.machine(machine_id);
        let mut state = lock_machine(&machine);
        state.stabilizer.reset();
        state.forecaster.reset();
        for window in state.windows.values_mut() {
            window.clear();
        }
        for alert_type in AlertType::ALL {
            state.pending.clear(alert_type);
        }
        debug!(machine_id, "Machine state reset after maintenance");
    }

    /// Periodic sweep: drop stale pending entries and trim rate buckets.
    /// Returns the number of pending entries removed. Idempotent.
    pub fn sweep(&self, now: DateTime<Utc>) -> usize {
        let machines: Vec<Arc<Mutex<MachineState>>> = {
            let map = self
                .machines
                .read()
                .unwrap_or_else(PoisonError::into_inner);
            map.values().cloned().collect()
        };

        let mut removed = 0;
        for machine in machines {
            let mut state = lock_machine(&machine);
            removed += state.pending.sweep_stale(now);
            state.rate_bucket.prune(now);
        }
        removed
    }

    /// Shared metrics tracker handle.
    pub fn metrics(&self) -> Arc<Mutex<MetricsTracker>> {
        self.metrics.clone()
    }

    /// Store handle.
    pub fn store(&self) -> &AlertStore {
        &self.store
    }

    /// Get or create the state slot for a machine. The write lock is taken
    /// only for first-time insertion.
    fn machine(&self, machine_id: &str) -> Arc<Mutex<MachineState>> {
        {
            let map = self
                .machines
                .read()
                .unwrap_or_else(PoisonError::into_inner);
            if let Some(machine) = map.get(machine_id) {
                return machine.clone();
            }
        }
        let mut map = self
            .machines
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        map.entry(machine_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(MachineState::new(&self.config))))
            .clone()
    }
}

fn lock_machine(machine: &Arc<Mutex<MachineState>>) -> std::sync::MutexGuard<'_, MachineState> {
    machine.lock().unwrap_or_else(PoisonError::into_inner)
}

fn lock_metrics(metrics: &Arc<Mutex<MetricsTracker>>) -> std::sync::MutexGuard<'_, MetricsTracker> {
    metrics.lock().unwrap_or_else(PoisonError::into_inner)
}
