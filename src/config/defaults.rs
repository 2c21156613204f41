//! System-wide default constants.
//!
//! Centralises magic numbers used across the pipeline. Operator-tunable
//! values also appear as `PlantConfig` defaults; the constants here are the
//! single source for both.

// ============================================================================
// Alert Thresholds (with hysteresis)
// ============================================================================

/// RUL below this (hours) triggers a critical alert.
pub const RUL_CRITICAL_TRIGGER: f64 = 24.0;

/// RUL strictly above this (hours) clears a pending critical alert.
pub const RUL_CRITICAL_CLEAR: f64 = 28.0;

/// RUL below this (hours) triggers a warning alert.
pub const RUL_WARNING_TRIGGER: f64 = 48.0;

/// RUL strictly above this (hours) clears a pending warning alert.
pub const RUL_WARNING_CLEAR: f64 = 52.0;

/// Health score below this (%) triggers a critical alert.
pub const HEALTH_CRITICAL_TRIGGER: f64 = 30.0;

/// Health score strictly above this (%) clears a pending critical alert.
pub const HEALTH_CRITICAL_CLEAR: f64 = 35.0;

/// Health score below this (%) triggers a warning alert.
pub const HEALTH_WARNING_TRIGGER: f64 = 50.0;

/// Health score strictly above this (%) clears a pending warning alert.
pub const HEALTH_WARNING_CLEAR: f64 = 55.0;

/// Anomaly score above which an anomaly alert is critical rather than warning.
pub const ANOMALY_CRITICAL_SCORE: f64 = 5.0;

// ============================================================================
// Alert Gate
// ============================================================================

/// Per-machine alert budget in any rolling 60-second window.
pub const MAX_ALERTS_PER_MACHINE_PER_MINUTE: u32 = 3;

/// System-wide per-minute budget. Recognized but not currently enforced.
pub const MAX_TOTAL_ALERTS_PER_MINUTE: u32 = 10;

/// Minimum degraded sensor channels required to confirm a critical alert.
pub const MIN_DEGRADED_SENSORS_FOR_CRITICAL: usize = 2;

/// Rolling window the rate bucket is pruned to (seconds).
pub const RATE_BUCKET_WINDOW_SECS: i64 = 60;

// ============================================================================
// Persistence & Pending Alerts
// ============================================================================

/// Pending entries with no trigger in this long are swept (seconds).
pub const PENDING_STALE_SECS: i64 = 120;

// ============================================================================
// ML Stabilization
// ============================================================================

/// Exponential moving average factor. Lower = smoother.
pub const EMA_ALPHA: f64 = 0.1;

/// Minimum interval between fresh stabilized predictions (seconds).
pub const MIN_PREDICTION_INTERVAL_SECS: i64 = 300;

/// RUL ceiling in hours (6 days).
pub const MAX_RUL_HOURS: f64 = 144.0;

/// RUL floor in hours.
pub const MIN_RUL_HOURS: f64 = 0.0;

/// Stabilized prediction history kept per machine.
pub const PREDICTION_HISTORY_CAP: usize = 50;

// ============================================================================
// Anomaly Detection
// ============================================================================

/// Feature-vector history kept per machine for model refits.
pub const ANOMALY_HISTORY_CAP: usize = 200;

/// Below this many samples the detector reports nothing at all.
pub const MIN_SAMPLES_FOR_STATS: usize = 10;

/// At this many samples the isolation forest takes over from z-scores.
pub const MIN_SAMPLES_FOR_MODEL: usize = 20;

/// Z-score above which the statistical fallback flags an anomaly.
pub const Z_SCORE_THRESHOLD: f64 = 3.5;

/// Expected anomaly fraction used to place the forest decision threshold.
pub const ANOMALY_CONTAMINATION: f64 = 0.05;

// ============================================================================
// Risk Score
// ============================================================================

/// Component weights for the unified risk score (RUL, health, anomaly).
pub const RISK_WEIGHT_RUL: f64 = 0.50;
pub const RISK_WEIGHT_HEALTH: f64 = 0.35;
pub const RISK_WEIGHT_ANOMALY: f64 = 0.15;

/// Anomaly scores at or above this normalize to the worst-case 1.0.
pub const RISK_ANOMALY_SATURATION: f64 = 10.0;

// ============================================================================
// Forecasting
// ============================================================================

/// Health history kept per machine for trajectory forecasting.
pub const HEALTH_HISTORY_CAP: usize = 100;

/// Minimum health readings before a forecast is attempted.
pub const MIN_POINTS_FOR_FORECAST: usize = 10;

/// Health score below which a machine counts as failed.
pub const CRITICAL_HEALTH_THRESHOLD: f64 = 30.0;

/// Default forecast horizon (hours).
pub const DEFAULT_FORECAST_HORIZON_HOURS: u32 = 48;

/// Half-width of the forecast confidence envelope (health points).
pub const FORECAST_ENVELOPE: f64 = 10.0;

// ============================================================================
// Metrics
// ============================================================================

/// Maximum look-ahead window for matching failures to predictions (hours).
pub const PREDICTION_WINDOW_HOURS: f64 = 48.0;

// ============================================================================
// Retention
// ============================================================================

/// RESOLVED alerts older than this are archived to LOGGED (days).
pub const ALERT_RETENTION_DAYS: i64 = 90;

/// Maintenance logs older than this are deleted (days). Two years, compliance.
pub const LOG_RETENTION_DAYS: i64 = 730;

// ============================================================================
// Background Sweeper
// ============================================================================

/// Interval between background sweep cycles (seconds).
pub const SWEEP_INTERVAL_SECS: u64 = 30;

// ============================================================================
// API
// ============================================================================

/// Server-side deadline for any single HTTP request (seconds).
pub const API_REQUEST_TIMEOUT_SECS: u64 = 30;

// ============================================================================
// Lifecycle Validation
// ============================================================================

/// Minimum operator id length.
pub const MIN_OPERATOR_ID_LENGTH: usize = 3;

/// Minimum root-cause text length.
pub const MIN_ROOT_CAUSE_LENGTH: usize = 5;

/// Minimum resolution-notes text length.
pub const MIN_RESOLUTION_NOTES_LENGTH: usize = 10;

// ============================================================================
// Sensor Physical Limits
// ============================================================================

/// Physical plausibility range per channel: (min, max).
pub const VIBRATION_LIMITS: (f64, f64) = (0.0, 10.0);
pub const TEMPERATURE_LIMITS: (f64, f64) = (-50.0, 200.0);
pub const PRESSURE_LIMITS: (f64, f64) = (0.0, 200.0);
pub const RPM_LIMITS: (f64, f64) = (0.0, 3000.0);
