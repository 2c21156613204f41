//! Per-machine anomaly detection over the sensor stream.
//!
//! Maintains a bounded history of feature vectors and escalates through
//! three regimes as data accumulates:
//!
//! - under 10 samples: nothing to say, report no anomaly
//! - 10–19 samples: z-score fallback against the running baseline
//! - 20+ samples: isolation forest, refit on every new sample
//!
//! The forest score is centered so that higher = more anomalous and zero is
//! the "typical point" mark, mirroring the usual inverted decision function.

use serde::Serialize;
use statrs::statistics::Statistics;
use std::collections::VecDeque;

use super::isolation_forest::{IsolationForest, FEATURE_DIM};
use crate::config::defaults;
use crate::types::SensorFrame;

/// Seed for the forest refit; keeps detection deterministic.
const FOREST_SEED: u64 = 42;

/// Which detection path produced a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectionMethod {
    InsufficientData,
    ZScore,
    IsolationForest,
}

/// Per-channel z-scores from the statistical fallback.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ChannelZScores {
    pub vibration_x: f64,
    pub vibration_y: f64,
    pub temperature: f64,
    pub pressure: f64,
    pub rpm: f64,
}

/// Result of one detection call.
#[derive(Debug, Clone, Serialize)]
pub struct AnomalyReport {
    pub is_anomaly: bool,
    /// Higher = more anomalous. Z-score magnitude for the fallback path,
    /// centered forest score for the model path.
    pub score: f64,
    pub method: DetectionMethod,
    /// Decision threshold in effect for this report.
    pub threshold: f64,
    /// Per-channel z-scores (fallback path only).
    pub channel_z_scores: Option<ChannelZScores>,
}

impl AnomalyReport {
    fn insufficient() -> Self {
        Self {
            is_anomaly: false,
            score: 0.0,
            method: DetectionMethod::InsufficientData,
            threshold: 0.0,
            channel_z_scores: None,
        }
    }

    /// Health score in [0, 100] derived from the anomaly score: z-scores map
    /// 0–3σ onto 100–0, forest scores scale by a factor of 10.
    pub fn health_score(&self) -> f64 {
        let health = match self.method {
            DetectionMethod::ZScore => 100.0 - (self.score / 3.0) * 100.0,
            _ => 100.0 - self.score.abs() * 10.0,
        };
        crate::types::clamp(health, 0.0, 100.0)
    }
}

/// Per-feature standardization parameters learned from the history.
struct Standardizer {
    means: [f64; FEATURE_DIM],
    stds: [f64; FEATURE_DIM],
}

impl Standardizer {
    fn fit(history: &VecDeque<[f64; FEATURE_DIM]>) -> Self {
        let mut means = [0.0; FEATURE_DIM];
        let mut stds = [0.0; FEATURE_DIM];
        for i in 0..FEATURE_DIM {
            let column: Vec<f64> = history.iter().map(|f| f[i]).collect();
            means[i] = (&column).mean();
            stds[i] = (&column).population_std_dev() + 1e-6;
        }
        Self { means, stds }
    }

    fn transform(&self, features: &[f64; FEATURE_DIM]) -> [f64; FEATURE_DIM] {
        let mut out = [0.0; FEATURE_DIM];
        for i in 0..FEATURE_DIM {
            out[i] = (features[i] - self.means[i]) / self.stds[i];
        }
        out
    }
}

/// Anomaly detector for one machine.
pub struct AnomalyDetector {
    history: VecDeque<[f64; FEATURE_DIM]>,
    forest: Option<IsolationForest>,
    standardizer: Option<Standardizer>,
    contamination: f64,
}

impl Default for AnomalyDetector {
    fn default() -> Self {
        Self::new(defaults::ANOMALY_CONTAMINATION)
    }
}

impl AnomalyDetector {
    pub fn new(contamination: f64) -> Self {
        Self {
            history: VecDeque::with_capacity(defaults::ANOMALY_HISTORY_CAP),
            forest: None,
            standardizer: None,
            contamination,
        }
    }

    /// Number of feature vectors currently held.
    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    /// Record the sample and classify it.
    pub fn detect(&mut self, sensors: &SensorFrame) -> AnomalyReport {
        let features = sensors.features();

        self.history.push_back(features);
        if self.history.len() > defaults::ANOMALY_HISTORY_CAP {
            self.history.pop_front();
        }

        if self.history.len() >= defaults::MIN_SAMPLES_FOR_MODEL {
            self.refit();
        }

        match (&self.forest, &self.standardizer) {
            (Some(forest), Some(standardizer)) => {
                let standardized = standardizer.transform(&features);
                let raw = forest.score(&standardized);
                AnomalyReport {
                    is_anomaly: forest.is_anomalous(&standardized),
                    // Centered so a typical point sits near zero.
                    score: raw - 0.5,
                    method: DetectionMethod::IsolationForest,
                    threshold: forest.threshold() - 0.5,
                    channel_z_scores: None,
                }
            }
            _ => self.detect_statistical(&features),
        }
    }

    fn refit(&mut self) {
        let standardizer = Standardizer::fit(&self.history);
        let standardized: Vec<[f64; FEATURE_DIM]> = self
            .history
            .iter()
            .map(|f| standardizer.transform(f))
            .collect();
        self.forest = Some(IsolationForest::fit(
            &standardized,
            self.contamination,
            FOREST_SEED,
        ));
        self.standardizer = Some(standardizer);
    }

    /// Z-score fallback used while the model history is still short.
    fn detect_statistical(&self, features: &[f64; FEATURE_DIM]) -> AnomalyReport {
        if self.history.len() < defaults::MIN_SAMPLES_FOR_STATS {
            return AnomalyReport::insufficient();
        }

        let standardizer = Standardizer::fit(&self.history);
        let mut z = [0.0; FEATURE_DIM];
        for i in 0..FEATURE_DIM {
            z[i] = ((features[i] - standardizer.means[i]) / standardizer.stds[i]).abs();
        }
        let max_z = z.iter().copied().fold(0.0f64, f64::max);

        AnomalyReport {
            is_anomaly: max_z > defaults::Z_SCORE_THRESHOLD,
            score: max_z,
            method: DetectionMethod::ZScore,
            threshold: defaults::Z_SCORE_THRESHOLD,
            channel_z_scores: Some(ChannelZScores {
                vibration_x: z[0],
                vibration_y: z[1],
                temperature: z[2],
                pressure: z[3],
                rpm: z[4],
            }),
        }
    }
}
