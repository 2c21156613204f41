//! Plant Configuration - alert thresholds and pipeline tuning as TOML values
//!
//! Every operator-tunable value is a field in this module. Each struct
//! implements `Default` with values matching the constants in
//! [`super::defaults`], so behavior is unchanged when no config file exists.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

use super::defaults;
use crate::types::AlertType;

// ============================================================================
// Top-Level Config
// ============================================================================

/// Root configuration for a plant deployment.
///
/// Load with `PlantConfig::load()` which searches:
/// 1. `$PLANTWATCH_CONFIG` env var
/// 2. `./plantwatch.toml`
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlantConfig {
    /// Alert trigger/clear thresholds (hysteresis pairs)
    #[serde(default)]
    pub thresholds: ThresholdConfig,

    /// Evaluation window parameters per alert type
    #[serde(default)]
    pub windows: WindowsConfig,

    /// Persistence windows per alert type (seconds)
    #[serde(default)]
    pub persistence: PersistenceConfig,

    /// Alert gate: rate limiting and multi-sensor confirmation
    #[serde(default)]
    pub gate: GateConfig,

    /// ML stabilization layer tuning
    #[serde(default)]
    pub stabilizer: StabilizerConfig,

    /// Health trajectory forecasting
    #[serde(default)]
    pub forecast: ForecastConfig,

    /// Data retention periods
    #[serde(default)]
    pub retention: RetentionConfig,

    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerConfig,
}

impl Default for PlantConfig {
    fn default() -> Self {
        Self {
            thresholds: ThresholdConfig::default(),
            windows: WindowsConfig::default(),
            persistence: PersistenceConfig::default(),
            gate: GateConfig::default(),
            stabilizer: StabilizerConfig::default(),
            forecast: ForecastConfig::default(),
            retention: RetentionConfig::default(),
            server: ServerConfig::default(),
        }
    }
}

impl PlantConfig {
    /// Load configuration using the standard search order:
    /// 1. `$PLANTWATCH_CONFIG` environment variable
    /// 2. `./plantwatch.toml` in the current working directory
    /// 3. Built-in defaults
    pub fn load() -> Self {
        if let Ok(path) = std::env::var("PLANTWATCH_CONFIG") {
            let p = PathBuf::from(&path);
            if p.exists() {
                match Self::load_from_file(&p) {
                    Ok(config) => {
                        info!(path = %p.display(), "Loaded plant config from PLANTWATCH_CONFIG");
                        return config;
                    }
                    Err(e) => {
                        warn!(path = %p.display(), error = %e, "Failed to load config from PLANTWATCH_CONFIG, falling back");
                    }
                }
            } else {
                warn!(path = %path, "PLANTWATCH_CONFIG points to non-existent file, falling back");
            }
        }

        let local = PathBuf::from("plantwatch.toml");
        if local.exists() {
            match Self::load_from_file(&local) {
                Ok(config) => {
                    info!("Loaded plant config from ./plantwatch.toml");
                    return config;
                }
                Err(e) => {
                    warn!(error = %e, "Failed to load ./plantwatch.toml, using defaults");
                }
            }
        }

        info!("No plantwatch.toml found — using built-in defaults");
        Self::default()
    }

    /// Load from a specific TOML file path.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        let config: Self = toml::from_str(&contents).map_err(ConfigError::Parse)?;
        Ok(config)
    }
}

/// Configuration loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {0}: {1}")]
    Io(PathBuf, std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(toml::de::Error),
}

// ============================================================================
// Thresholds (hysteresis pairs)
// ============================================================================

/// Alert trigger/clear thresholds. Trigger is strict (`value < trigger`);
/// clear requires the value strictly above the clear level.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ThresholdConfig {
    pub rul_critical_trigger: f64,
    pub rul_critical_clear: f64,
    pub rul_warning_trigger: f64,
    pub rul_warning_clear: f64,
    pub health_critical_trigger: f64,
    pub health_critical_clear: f64,
    pub health_warning_trigger: f64,
    pub health_warning_clear: f64,
    /// Anomaly score above which an anomaly alert is critical.
    pub anomaly_critical_score: f64,
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            rul_critical_trigger: defaults::RUL_CRITICAL_TRIGGER,
            rul_critical_clear: defaults::RUL_CRITICAL_CLEAR,
            rul_warning_trigger: defaults::RUL_WARNING_TRIGGER,
            rul_warning_clear: defaults::RUL_WARNING_CLEAR,
            health_critical_trigger: defaults::HEALTH_CRITICAL_TRIGGER,
            health_critical_clear: defaults::HEALTH_CRITICAL_CLEAR,
            health_warning_trigger: defaults::HEALTH_WARNING_TRIGGER,
            health_warning_clear: defaults::HEALTH_WARNING_CLEAR,
            anomaly_critical_score: defaults::ANOMALY_CRITICAL_SCORE,
        }
    }
}

// ============================================================================
// Evaluation Windows
// ============================================================================

/// Sliding-window parameters for one alert type.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowProfile {
    /// Window length in seconds.
    pub duration_seconds: u64,
    /// Floor on the mean risk score.
    pub risk_threshold: f64,
    /// Minimum fraction of samples at or above the risk threshold.
    pub required_pct_above: f64,
    /// Whether the risk trend must be positive (worsening).
    pub require_worsening_trend: bool,
}

impl Default for WindowProfile {
    fn default() -> Self {
        Self {
            duration_seconds: 60,
            risk_threshold: 0.5,
            required_pct_above: 0.6,
            require_worsening_trend: true,
        }
    }
}

fn warning_window() -> WindowProfile {
    WindowProfile {
        duration_seconds: 60,
        risk_threshold: 0.4,
        required_pct_above: 0.55,
        require_worsening_trend: true,
    }
}

fn critical_window() -> WindowProfile {
    // Shorter window for urgency, higher ratio for precision.
    WindowProfile {
        duration_seconds: 45,
        risk_threshold: 0.6,
        required_pct_above: 0.65,
        require_worsening_trend: true,
    }
}

fn anomaly_window() -> WindowProfile {
    // Longer window; anomalies are sporadic and may plateau.
    WindowProfile {
        duration_seconds: 90,
        risk_threshold: 0.3,
        required_pct_above: 0.50,
        require_worsening_trend: false,
    }
}

/// Window profiles for all five alert types.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowsConfig {
    pub warning_rul: WindowProfile,
    pub critical_rul: WindowProfile,
    pub low_health_warning: WindowProfile,
    pub low_health_critical: WindowProfile,
    pub anomaly_detected: WindowProfile,
}

impl Default for WindowsConfig {
    fn default() -> Self {
        Self {
            warning_rul: warning_window(),
            critical_rul: critical_window(),
            low_health_warning: warning_window(),
            low_health_critical: critical_window(),
            anomaly_detected: anomaly_window(),
        }
    }
}

impl WindowsConfig {
    pub fn profile(&self, alert_type: AlertType) -> WindowProfile {
        match alert_type {
            AlertType::WarningRul => self.warning_rul,
            AlertType::CriticalRul => self.critical_rul,
            AlertType::LowHealthWarning => self.low_health_warning,
            AlertType::LowHealthCritical => self.low_health_critical,
            AlertType::AnomalyDetected => self.anomaly_detected,
        }
    }
}

// ============================================================================
// Persistence Windows
// ============================================================================

/// How long a condition must be continuously present before an alert fires.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PersistenceConfig {
    pub warning_rul_secs: i64,
    pub critical_rul_secs: i64,
    pub low_health_warning_secs: i64,
    pub low_health_critical_secs: i64,
    pub anomaly_detected_secs: i64,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            warning_rul_secs: 60,
            critical_rul_secs: 30,
            low_health_warning_secs: 60,
            low_health_critical_secs: 30,
            anomaly_detected_secs: 45,
        }
    }
}

impl PersistenceConfig {
    pub fn secs(&self, alert_type: AlertType) -> i64 {
        match alert_type {
            AlertType::WarningRul => self.warning_rul_secs,
            AlertType::CriticalRul => self.critical_rul_secs,
            AlertType::LowHealthWarning => self.low_health_warning_secs,
            AlertType::LowHealthCritical => self.low_health_critical_secs,
            AlertType::AnomalyDetected => self.anomaly_detected_secs,
        }
    }
}

// ============================================================================
// Alert Gate
// ============================================================================

/// Per-channel degradation thresholds for multi-sensor confirmation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DegradationThresholds {
    /// mm/s — above this the channel is degraded.
    pub vibration_x: f64,
    /// mm/s
    pub vibration_y: f64,
    /// °C — above this the channel is degraded.
    pub temperature: f64,
    /// PSI — below this the channel is degraded.
    pub pressure_low: f64,
    /// RPM — below this the channel is degraded.
    pub rpm_low: f64,
}

impl Default for DegradationThresholds {
    fn default() -> Self {
        Self {
            vibration_x: 1.5,
            vibration_y: 1.5,
            temperature: 85.0,
            pressure_low: 90.0,
            rpm_low: 1350.0,
        }
    }
}

/// Final-gate configuration: rate limiting and multi-sensor confirmation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GateConfig {
    pub max_alerts_per_machine_per_minute: u32,
    /// System-wide budget. Recognized but not enforced yet.
    pub max_total_alerts_per_minute: u32,
    pub multi_sensor_required_for_critical: bool,
    pub min_degraded_sensors_for_critical: usize,
    pub degradation: DegradationThresholds,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            max_alerts_per_machine_per_minute: defaults::MAX_ALERTS_PER_MACHINE_PER_MINUTE,
            max_total_alerts_per_minute: defaults::MAX_TOTAL_ALERTS_PER_MINUTE,
            multi_sensor_required_for_critical: true,
            min_degraded_sensors_for_critical: defaults::MIN_DEGRADED_SENSORS_FOR_CRITICAL,
            degradation: DegradationThresholds::default(),
        }
    }
}

// ============================================================================
// Stabilizer
// ============================================================================

/// ML stabilization layer tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StabilizerConfig {
    /// EMA smoothing factor. Lower = more smoothing.
    pub ema_alpha: f64,
    /// Minimum seconds between fresh predictions; closer calls hit the cache.
    pub min_prediction_interval_secs: i64,
    pub max_rul_hours: f64,
    pub min_rul_hours: f64,
}

impl Default for StabilizerConfig {
    fn default() -> Self {
        Self {
            ema_alpha: defaults::EMA_ALPHA,
            min_prediction_interval_secs: defaults::MIN_PREDICTION_INTERVAL_SECS,
            max_rul_hours: defaults::MAX_RUL_HOURS,
            min_rul_hours: defaults::MIN_RUL_HOURS,
        }
    }
}

// ============================================================================
// Forecast
// ============================================================================

/// Health trajectory forecasting parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ForecastConfig {
    /// Projected health below this marks the time-to-critical crossing.
    pub critical_health_threshold: f64,
    pub default_horizon_hours: u32,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            critical_health_threshold: defaults::CRITICAL_HEALTH_THRESHOLD,
            default_horizon_hours: defaults::DEFAULT_FORECAST_HORIZON_HOURS,
        }
    }
}

// ============================================================================
// Retention
// ============================================================================

/// Data retention periods.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetentionConfig {
    /// RESOLVED alerts older than this are archived to LOGGED.
    pub alert_retention_days: i64,
    /// Maintenance logs older than this are deleted.
    pub log_retention_days: i64,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            alert_retention_days: defaults::ALERT_RETENTION_DAYS,
            log_retention_days: defaults::LOG_RETENTION_DAYS,
        }
    }
}

// ============================================================================
// Server
// ============================================================================

/// HTTP server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: "0.0.0.0:8080".to_string(),
        }
    }
}
