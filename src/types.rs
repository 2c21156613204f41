//! Shared domain types for the plantwatch alert pipeline.
//!
//! Everything that crosses a module boundary lives here: sensor samples,
//! alert records, lifecycle states, the error taxonomy, and the tri-state
//! emission outcome used by the alert gate.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ============================================================================
// Sensor Samples
// ============================================================================

fn default_vibration() -> f64 {
    0.5
}
fn default_temperature() -> f64 {
    70.0
}
fn default_pressure() -> f64 {
    100.0
}
fn default_rpm() -> f64 {
    1500.0
}

/// One reading of the five monitored sensor channels.
///
/// Missing channels deserialize to the healthy baseline for that channel, so
/// partial payloads from older collectors remain usable. Values outside
/// physical limits are accepted as-is; validation is the caller's concern.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SensorFrame {
    /// Radial vibration, X axis (mm/s RMS)
    #[serde(default = "default_vibration")]
    pub vibration_x: f64,

    /// Radial vibration, Y axis (mm/s RMS)
    #[serde(default = "default_vibration")]
    pub vibration_y: f64,

    /// Surface temperature (°C)
    #[serde(default = "default_temperature")]
    pub temperature: f64,

    /// Process pressure (PSI)
    #[serde(default = "default_pressure")]
    pub pressure: f64,

    /// Shaft speed (RPM)
    #[serde(default = "default_rpm")]
    pub rpm: f64,
}

impl Default for SensorFrame {
    fn default() -> Self {
        Self {
            vibration_x: default_vibration(),
            vibration_y: default_vibration(),
            temperature: default_temperature(),
            pressure: default_pressure(),
            rpm: default_rpm(),
        }
    }
}

impl SensorFrame {
    /// Feature vector in the canonical channel order used by the anomaly
    /// detector: vibration_x, vibration_y, temperature, pressure, rpm.
    pub fn features(&self) -> [f64; 5] {
        [
            self.vibration_x,
            self.vibration_y,
            self.temperature,
            self.pressure,
            self.rpm,
        ]
    }
}

/// A single sensor sample submitted for one machine.
///
/// The timestamp is the sample's acquisition time and drives all pipeline
/// timing (windows, persistence, rate limiting), which keeps submission
/// deterministic for a given input sequence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sample {
    pub machine_id: String,
    pub timestamp: DateTime<Utc>,
    pub sensors: SensorFrame,
}

// ============================================================================
// Alert Classification
// ============================================================================

/// The five alert conditions the pipeline evaluates on every sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertType {
    WarningRul,
    CriticalRul,
    LowHealthWarning,
    LowHealthCritical,
    AnomalyDetected,
}

impl AlertType {
    /// All alert types, in evaluation order.
    pub const ALL: [AlertType; 5] = [
        AlertType::WarningRul,
        AlertType::CriticalRul,
        AlertType::LowHealthWarning,
        AlertType::LowHealthCritical,
        AlertType::AnomalyDetected,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AlertType::WarningRul => "warning_rul",
            AlertType::CriticalRul => "critical_rul",
            AlertType::LowHealthWarning => "low_health_warning",
            AlertType::LowHealthCritical => "low_health_critical",
            AlertType::AnomalyDetected => "anomaly_detected",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|t| t.as_str() == s)
    }
}

impl std::fmt::Display for AlertType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Alert severity. Anomaly alerts pick theirs from the anomaly score; all
/// other alert types have a fixed severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Warning => "warning",
            Severity::Critical => "critical",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Alert Lifecycle
// ============================================================================

/// Lifecycle state of a persisted alert.
///
/// Allowed transitions:
/// ACTIVE → ACKNOWLEDGED → IN_PROGRESS → RESOLVED → LOGGED, with the
/// ACKNOWLEDGED → RESOLVED shortcut. LOGGED is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertState {
    Active,
    Acknowledged,
    InProgress,
    Resolved,
    Logged,
}

impl AlertState {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertState::Active => "ACTIVE",
            AlertState::Acknowledged => "ACKNOWLEDGED",
            AlertState::InProgress => "IN_PROGRESS",
            AlertState::Resolved => "RESOLVED",
            AlertState::Logged => "LOGGED",
        }
    }

    /// Whether the alert still occupies the (machine, alert-type) slot.
    pub fn is_open(&self) -> bool {
        matches!(
            self,
            AlertState::Active | AlertState::Acknowledged | AlertState::InProgress
        )
    }

    /// Exact transition table from the lifecycle design.
    pub fn can_transition_to(&self, next: AlertState) -> bool {
        matches!(
            (self, next),
            (AlertState::Active, AlertState::Acknowledged)
                | (AlertState::Acknowledged, AlertState::InProgress)
                | (AlertState::Acknowledged, AlertState::Resolved)
                | (AlertState::InProgress, AlertState::Resolved)
                | (AlertState::Resolved, AlertState::Logged)
        )
    }
}

impl std::fmt::Display for AlertState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A persisted alert row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    pub id: String,
    pub machine_id: String,
    pub alert_type: AlertType,
    pub severity: Severity,
    pub message: String,
    pub created_at: DateTime<Utc>,
    pub state: AlertState,
    #[serde(default)]
    pub acknowledged_by: Option<String>,
    #[serde(default)]
    pub acknowledged_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub resolved_by: Option<String>,
    #[serde(default)]
    pub resolved_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub root_cause: Option<String>,
    #[serde(default)]
    pub resolution_notes: Option<String>,
    #[serde(default)]
    pub downtime_minutes: Option<i64>,
    #[serde(default)]
    pub metadata: serde_json::Value,
}

/// Immutable audit record written atomically with the RESOLVED transition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaintenanceLog {
    pub id: String,
    pub machine_id: String,
    pub alert_id: String,
    pub created_at: DateTime<Utc>,
    pub resolved_at: DateTime<Utc>,
    pub operator: String,
    pub root_cause: String,
    pub resolution_notes: String,
    pub downtime_minutes: i64,
    pub severity: Severity,
    pub alert_type: AlertType,
    #[serde(default)]
    pub metadata: serde_json::Value,
}

/// Append-only sensor history row with the stabilized prediction attached.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensorHistoryRow {
    pub machine_id: String,
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub sensors: SensorFrame,
    pub health_score: f64,
    pub rul_hours: f64,
}

// ============================================================================
// Emission Outcome
// ============================================================================

/// Why the alert gate suppressed an emission attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "reason")]
pub enum SuppressReason {
    /// Multi-sensor confirmation failed: fewer degraded channels than required.
    MultiSensorUnconfirmed { degraded: usize, required: usize },
    /// The machine hit its per-minute alert budget.
    RateLimited,
    /// An open alert of this type already exists for the machine.
    DuplicateActive,
}

impl std::fmt::Display for SuppressReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SuppressReason::MultiSensorUnconfirmed { degraded, required } => {
                write!(f, "multi-sensor unconfirmed ({degraded}/{required} degraded)")
            }
            SuppressReason::RateLimited => write!(f, "rate limited"),
            SuppressReason::DuplicateActive => write!(f, "duplicate active alert"),
        }
    }
}

/// Tri-state result of an emission attempt, so callers (and tests) can
/// observe suppression instead of collapsing it into `None`.
#[derive(Debug)]
pub enum EmitOutcome {
    Emitted(String),
    Suppressed(SuppressReason),
    Failed(CoreError),
}

impl EmitOutcome {
    pub fn alert_id(&self) -> Option<&str> {
        match self {
            EmitOutcome::Emitted(id) => Some(id),
            _ => None,
        }
    }
}

// ============================================================================
// Error Taxonomy
// ============================================================================

/// Errors surfaced by the core pipeline and lifecycle operations.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("duplicate open alert for {machine_id}/{alert_type}")]
    Duplicate {
        machine_id: String,
        alert_type: AlertType,
    },

    #[error("rate limited: {0}")]
    RateLimited(String),

    #[error("storage conflict: {0}")]
    Conflict(String),

    #[error("unavailable: {0}")]
    Unavailable(String),

    #[error("canceled")]
    Canceled,
}

// ============================================================================
// Numeric Bounds
// ============================================================================

/// Clamp a value to an inclusive range. Centralised so model outputs cross
/// into downstream consumers through one place.
pub fn clamp(value: f64, lo: f64, hi: f64) -> f64 {
    value.max(lo).min(hi)
}

/// Whether a value lies within an inclusive range.
pub fn within_limits(value: f64, lo: f64, hi: f64) -> bool {
    (lo..=hi).contains(&value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alert_type_round_trips_through_strings() {
        for t in AlertType::ALL {
            assert_eq!(AlertType::parse(t.as_str()), Some(t));
        }
        assert_eq!(AlertType::parse("nonsense"), None);
    }

    #[test]
    fn transition_table_is_exact() {
        use AlertState::*;
        let allowed = [
            (Active, Acknowledged),
            (Acknowledged, InProgress),
            (Acknowledged, Resolved),
            (InProgress, Resolved),
            (Resolved, Logged),
        ];
        let states = [Active, Acknowledged, InProgress, Resolved, Logged];
        for from in states {
            for to in states {
                let expected = allowed.contains(&(from, to));
                assert_eq!(from.can_transition_to(to), expected, "{from} -> {to}");
            }
        }
    }

    #[test]
    fn open_states() {
        assert!(AlertState::Active.is_open());
        assert!(AlertState::Acknowledged.is_open());
        assert!(AlertState::InProgress.is_open());
        assert!(!AlertState::Resolved.is_open());
        assert!(!AlertState::Logged.is_open());
    }

    #[test]
    fn sensor_frame_defaults_apply_to_missing_channels() {
        let frame: SensorFrame =
            serde_json::from_str(r#"{"vibration_x": 1.8, "temperature": 91.0}"#)
                .expect("partial frame should deserialize");
        assert_eq!(frame.vibration_x, 1.8);
        assert_eq!(frame.vibration_y, 0.5);
        assert_eq!(frame.temperature, 91.0);
        assert_eq!(frame.pressure, 100.0);
        assert_eq!(frame.rpm, 1500.0);
    }

    #[test]
    fn clamp_bounds() {
        assert_eq!(clamp(150.0, 0.0, 100.0), 100.0);
        assert_eq!(clamp(-3.0, 0.0, 100.0), 0.0);
        assert_eq!(clamp(42.0, 0.0, 100.0), 42.0);
        assert!(within_limits(70.0, -50.0, 200.0));
        assert!(!within_limits(250.0, -50.0, 200.0));
    }
}
