//! Risk scoring and sliding evaluation windows.
//!
//! The evaluation window sits between the predictive models and alert
//! creation. It aggregates the unified risk score over time so that short
//! noise bursts are rejected, slow degradation accumulates, and values
//! hovering just under the threshold do not fire.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::config::defaults;
use crate::config::WindowProfile;
use crate::types::{clamp, SensorFrame};

// ============================================================================
// Risk Score
// ============================================================================

/// Unified risk score in [0, 1] from the three model outputs.
///
/// Each component is normalized so 1 = worst: RUL against its ceiling,
/// health against 100, anomaly score saturating at 10. Weights are
/// 0.50 / 0.35 / 0.15.
pub fn risk_score(rul_hours: f64, health_score: f64, anomaly_score: f64) -> f64 {
    let rul_component = clamp(1.0 - rul_hours / defaults::MAX_RUL_HOURS, 0.0, 1.0);
    let health_component = clamp(1.0 - health_score / 100.0, 0.0, 1.0);
    let anomaly_component = clamp(anomaly_score / defaults::RISK_ANOMALY_SATURATION, 0.0, 1.0);

    clamp(
        defaults::RISK_WEIGHT_RUL * rul_component
            + defaults::RISK_WEIGHT_HEALTH * health_component
            + defaults::RISK_WEIGHT_ANOMALY * anomaly_component,
        0.0,
        1.0,
    )
}

// ============================================================================
// Evaluation Window
// ============================================================================

/// One sample held in a window.
#[derive(Debug, Clone)]
pub struct WindowSample {
    pub timestamp: DateTime<Utc>,
    pub risk_score: f64,
    pub health_score: f64,
    pub rul_hours: f64,
    pub sensors: SensorFrame,
}

/// Result of evaluating a window.
#[derive(Debug, Clone, Serialize)]
pub struct WindowEvaluation {
    /// Whether the alert may proceed to the persistence stage.
    pub may_proceed: bool,
    pub mean_risk: f64,
    /// Least-squares slope of risk over time, per minute. Positive = worsening.
    pub risk_trend: f64,
    pub pct_above_threshold: f64,
    pub sample_count: usize,
    /// Span between oldest and newest retained sample, seconds.
    pub window_duration_actual: f64,
    /// "PROCEED" or the failing predicates.
    pub reason: String,
}

impl WindowEvaluation {
    fn rejected(sample_count: usize, reason: &str) -> Self {
        Self {
            may_proceed: false,
            mean_risk: 0.0,
            risk_trend: 0.0,
            pct_above_threshold: 0.0,
            sample_count,
            window_duration_actual: 0.0,
            reason: reason.to_string(),
        }
    }
}

/// Sliding evaluation window for a single (machine, alert-type) pair.
#[derive(Debug)]
pub struct EvaluationWindow {
    profile: WindowProfile,
    samples: Vec<WindowSample>,
}

impl EvaluationWindow {
    pub fn new(profile: WindowProfile) -> Self {
        Self {
            profile,
            samples: Vec::new(),
        }
    }

    /// Append a sample and prune anything outside the window.
    pub fn add_sample(
        &mut self,
        timestamp: DateTime<Utc>,
        risk_score: f64,
        health_score: f64,
        rul_hours: f64,
        sensors: SensorFrame,
    ) {
        self.samples.push(WindowSample {
            timestamp,
            risk_score,
            health_score,
            rul_hours,
            sensors,
        });
        self.prune(timestamp);
    }

    fn prune(&mut self, now: DateTime<Utc>) {
        let cutoff = now - Duration::seconds(self.profile.duration_seconds as i64);
        self.samples.retain(|s| s.timestamp >= cutoff);
    }

    /// Evaluate the window at `now`.
    ///
    /// Proceeds only when all three hold: mean risk at or above the
    /// threshold, worsening trend (unless disabled), and enough of the
    /// samples above the threshold.
    pub fn evaluate(&mut self, now: DateTime<Utc>) -> WindowEvaluation {
        self.prune(now);

        if self.samples.len() < 3 {
            return WindowEvaluation::rejected(self.samples.len(), "Insufficient samples (<3)");
        }

        let risks: Vec<f64> = self.samples.iter().map(|s| s.risk_score).collect();
        let mean_risk = risks.iter().sum::<f64>() / risks.len() as f64;
        let risk_trend = self.trend();
        let above = risks
            .iter()
            .filter(|r| **r >= self.profile.risk_threshold)
            .count();
        let pct_above = above as f64 / risks.len() as f64;

        let first = self.samples[0].timestamp;
        let last = self.samples[self.samples.len() - 1].timestamp;
        let duration_actual = (last - first).num_milliseconds() as f64 / 1000.0;

        let condition_mean = mean_risk >= self.profile.risk_threshold;
        let condition_trend = !self.profile.require_worsening_trend || risk_trend > 0.0;
        let condition_pct = pct_above >= self.profile.required_pct_above;

        let may_proceed = condition_mean && condition_trend && condition_pct;

        let reason = if may_proceed {
            "PROCEED".to_string()
        } else {
            let mut reasons = Vec::new();
            if !condition_mean {
                reasons.push(format!(
                    "mean_risk {:.2} < {}",
                    mean_risk, self.profile.risk_threshold
                ));
            }
            if !condition_trend {
                reasons.push(format!("trend {risk_trend:.4} not worsening"));
            }
            if !condition_pct {
                reasons.push(format!(
                    "pct_above {:.0}% < {:.0}%",
                    pct_above * 100.0,
                    self.profile.required_pct_above * 100.0
                ));
            }
            reasons.join("; ")
        };

        WindowEvaluation {
            may_proceed,
            mean_risk,
            risk_trend,
            pct_above_threshold: pct_above,
            sample_count: self.samples.len(),
            window_duration_actual: duration_actual,
            reason,
        }
    }

    /// Least-squares slope of risk against time, scaled to per-minute units.
    /// Zero when the retained span is under one second.
    fn trend(&self) -> f64 {
        if self.samples.len() < 2 {
            return 0.0;
        }

        let t0 = self.samples[0].timestamp;
        let x: Vec<f64> = self
            .samples
            .iter()
            .map(|s| (s.timestamp - t0).num_milliseconds() as f64 / 1000.0)
            .collect();
        let y: Vec<f64> = self.samples.iter().map(|s| s.risk_score).collect();

        if x[x.len() - 1] - x[0] < 1.0 {
            return 0.0;
        }

        let n = x.len() as f64;
        let sum_x: f64 = x.iter().sum();
        let sum_y: f64 = y.iter().sum();
        let sum_xy: f64 = x.iter().zip(&y).map(|(a, b)| a * b).sum();
        let sum_x2: f64 = x.iter().map(|a| a * a).sum();

        let slope = (n * sum_xy - sum_x * sum_y) / (n * sum_x2 - sum_x * sum_x + 1e-10);
        slope * 60.0
    }

    /// Drop all samples (after maintenance or reset).
    pub fn clear(&mut self) {
        self.samples.clear();
    }

    pub fn sample_count(&self) -> usize {
        self.samples.len()
    }
}
