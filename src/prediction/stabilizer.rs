//! ML stabilization layer.
//!
//! Wraps the raw RUL heuristic with the smoothing industrial operators
//! expect from a maintenance display:
//!
//! - exponential moving average over consecutive predictions
//! - monotonic RUL (never increases until a reset)
//! - health allowed to rise at most 5% over the previous value
//! - refresh rate limiting with a cached value inside the interval
//!
//! All timing is driven by the caller-supplied timestamp so replayed sample
//! streams stabilize identically to live ones.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::collections::VecDeque;

use super::rul;
use crate::config::defaults;
use crate::config::StabilizerConfig;
use crate::types::{clamp, SensorFrame};

/// One stabilized prediction kept in the per-machine history.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct PredictionPoint {
    pub timestamp: DateTime<Utc>,
    pub rul_hours: f64,
    pub health_score: f64,
}

/// Trend summary over the recent prediction history.
#[derive(Debug, Clone, Serialize)]
pub struct PredictionTrend {
    pub status: &'static str,
    pub data_points: usize,
    pub rul_change: f64,
    pub health_change: f64,
    pub trend: &'static str,
    pub history: Vec<PredictionPoint>,
}

/// Stabilized RUL predictor state for one machine.
pub struct Stabilizer {
    config: StabilizerConfig,
    history: VecDeque<PredictionPoint>,
    cached: Option<(f64, f64)>,
    last_refresh: Option<DateTime<Utc>>,
}

impl Stabilizer {
    pub fn new(config: StabilizerConfig) -> Self {
        Self {
            config,
            history: VecDeque::with_capacity(defaults::PREDICTION_HISTORY_CAP),
            cached: None,
            last_refresh: None,
        }
    }

    /// Stabilized `(rul_hours, health_score)` for a sensor frame at `now`.
    ///
    /// With `bypass` the raw heuristic output is returned and all stabilizer
    /// state for the machine is cleared — used by scripted replays where
    /// smoothing across scenario boundaries would be misleading.
    pub fn stable_predict(
        &mut self,
        sensors: &SensorFrame,
        now: DateTime<Utc>,
        bypass: bool,
    ) -> (f64, f64) {
        if bypass {
            self.reset();
            return rul::predict(sensors);
        }

        // Inside the refresh interval, serve the cached value.
        if let (Some(last), Some(cached)) = (self.last_refresh, self.cached) {
            if now - last < Duration::seconds(self.config.min_prediction_interval_secs) {
                return cached;
            }
        }

        let (raw_rul, raw_health) = rul::predict(sensors);
        let stabilized = self.stabilize(raw_rul, raw_health, now);

        self.cached = Some(stabilized);
        self.last_refresh = Some(now);
        stabilized
    }

    fn stabilize(&mut self, raw_rul: f64, raw_health: f64, now: DateTime<Utc>) -> (f64, f64) {
        let Some(prev) = self.history.back().copied() else {
            self.push_history(now, raw_rul, raw_health);
            return (raw_rul, raw_health);
        };

        let alpha = self.config.ema_alpha;
        let ema_rul = alpha * raw_rul + (1.0 - alpha) * prev.rul_hours;
        let ema_health = alpha * raw_health + (1.0 - alpha) * prev.health_score;

        // RUL can only decrease or hold.
        let stable_rul = ema_rul.min(prev.rul_hours);

        // Health may recover by at most 5% over the previous value.
        let stable_health = if ema_health > prev.health_score * 1.05 {
            prev.health_score
        } else {
            ema_health
        };

        let stable_rul = clamp(stable_rul, self.config.min_rul_hours, self.config.max_rul_hours);
        let stable_health = clamp(stable_health, 0.0, 100.0);

        self.push_history(now, stable_rul, stable_health);
        (stable_rul, stable_health)
    }

    fn push_history(&mut self, timestamp: DateTime<Utc>, rul_hours: f64, health_score: f64) {
        self.history.push_back(PredictionPoint {
            timestamp,
            rul_hours,
            health_score,
        });
        if self.history.len() > defaults::PREDICTION_HISTORY_CAP {
            self.history.pop_front();
        }
    }

    /// Clear history, cache and refresh timestamp. Called after maintenance.
    pub fn reset(&mut self) {
        self.history.clear();
        self.cached = None;
        self.last_refresh = None;
    }

    /// Trend summary over predictions from the last `hours` hours.
    pub fn trend(&self, now: DateTime<Utc>, hours: i64) -> PredictionTrend {
        if self.history.is_empty() {
            return PredictionTrend {
                status: "no_data",
                data_points: 0,
                rul_change: 0.0,
                health_change: 0.0,
                trend: "stable",
                history: Vec::new(),
            };
        }

        let cutoff = now - Duration::hours(hours);
        let recent: Vec<PredictionPoint> = self
            .history
            .iter()
            .filter(|p| p.timestamp >= cutoff)
            .copied()
            .collect();

        if recent.is_empty() {
            return PredictionTrend {
                status: "no_recent_data",
                data_points: 0,
                rul_change: 0.0,
                health_change: 0.0,
                trend: "stable",
                history: Vec::new(),
            };
        }

        let (rul_change, health_change) = if recent.len() >= 2 {
            let first = recent[0];
            let last = recent[recent.len() - 1];
            (
                last.rul_hours - first.rul_hours,
                last.health_score - first.health_score,
            )
        } else {
            (0.0, 0.0)
        };

        PredictionTrend {
            status: "success",
            data_points: recent.len(),
            rul_change,
            health_change,
            trend: if rul_change < -5.0 { "degrading" } else { "stable" },
            history: recent,
        }
    }
}
