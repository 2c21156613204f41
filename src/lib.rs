//! plantwatch: predictive-maintenance alert pipeline
//!
//! Multi-stage filtering between raw sensor samples and operator-facing
//! alerts, plus the lifecycle that governs an alert once it exists.
//!
//! ## Architecture
//!
//! - **Prediction**: anomaly detection (isolation forest with a z-score
//!   fallback), deterministic RUL heuristic, stabilization layer, health
//!   trajectory forecasting
//! - **Pipeline**: unified risk score → sliding evaluation windows →
//!   persistence windows → hysteresis → multi-sensor confirmation, rate
//!   limiting and dedup at the alert gate
//! - **Lifecycle**: ACTIVE → ACKNOWLEDGED → IN_PROGRESS → RESOLVED → LOGGED
//!   over transactional sled storage with an immutable maintenance log
//! - **Metrics**: precision / recall / lead-time tracking of predictions
//!   against ground-truth failures

pub mod api;
pub mod background;
pub mod config;
pub mod lifecycle;
pub mod metrics;
pub mod pipeline;
pub mod prediction;
pub mod storage;
pub mod types;

// Re-export the root configuration
pub use config::PlantConfig;

// Re-export commonly used types
pub use types::{
    Alert, AlertState, AlertType, CoreError, EmitOutcome, MaintenanceLog, Sample, SensorFrame,
    SensorHistoryRow, Severity, SuppressReason,
};

// Re-export the core handles
pub use lifecycle::LifecycleManager;
pub use metrics::MetricsTracker;
pub use pipeline::AlertPipeline;
pub use storage::{AlertStore, StoreError};
