//! Predictive models: anomaly detection, RUL estimation, stabilization,
//! and health trajectory forecasting.
//!
//! Everything here is per-machine state driven by caller-supplied sample
//! timestamps; nothing reads the wall clock, which keeps the ingestion path
//! deterministic and replayable.

pub mod anomaly;
pub mod forecaster;
mod isolation_forest;
pub mod rul;
pub mod stabilizer;

pub use anomaly::{AnomalyDetector, AnomalyReport, DetectionMethod};
pub use forecaster::{ForecastMethod, ForecastReport, ForecastStatus, Forecaster};
pub use stabilizer::{PredictionTrend, Stabilizer};
