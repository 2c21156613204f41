//! Prediction outcome tracking.
//!
//! Records every failure prediction the pipeline makes and every ground-truth
//! failure reported by operators, then scores the pairing: true positives
//! with their lead time, false positives once the prediction window lapses,
//! and false negatives for unpredicted failures.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::collections::HashMap;

use crate::config::defaults;

/// Outcome classification for one prediction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PredictionOutcome {
    TruePositive,
    FalsePositive,
    FalseNegative,
    Pending,
}

/// Record of a single failure prediction.
#[derive(Debug, Clone, Serialize)]
pub struct PredictionRecord {
    pub prediction_id: String,
    pub machine_id: String,
    pub predicted_at: DateTime<Utc>,
    pub predicted_failure_time: DateTime<Utc>,
    pub predicted_ttf_hours: f64,
    pub health_score_at_prediction: f64,
    pub anomaly_score_at_prediction: f64,
    pub confidence: f64,
    pub outcome: PredictionOutcome,
    pub actual_failure_time: Option<DateTime<Utc>>,
    pub lead_time_hours: Option<f64>,
}

/// Record of an actual failure or maintenance event.
#[derive(Debug, Clone, Serialize)]
pub struct FailureEvent {
    pub event_id: String,
    pub machine_id: String,
    pub occurred_at: DateTime<Utc>,
    pub was_predicted: bool,
    pub prediction_id: Option<String>,
    pub lead_time_hours: Option<f64>,
    pub event_type: String,
}

/// Lead-time statistics over true-positive predictions.
#[derive(Debug, Clone, Serialize)]
pub struct LeadTimeStats {
    pub average_hours: f64,
    pub max_hours: f64,
    pub min_hours: f64,
    pub predictions_with_lead_time: usize,
}

/// Full metrics report.
#[derive(Debug, Clone, Serialize)]
pub struct MetricsReport {
    pub true_positives: usize,
    pub false_positives: usize,
    /// Heuristic: predictions minus TP and FP, floored at zero.
    pub approximate_tn: usize,
    pub false_negatives: usize,
    pub pending: usize,
    /// Fractions in [0, 1]. Degenerate denominators yield 1.0 for
    /// precision/recall and 0.0 for the false-alarm rate.
    pub precision: f64,
    pub recall: f64,
    pub f1_score: f64,
    pub false_alarm_rate: f64,
    pub lead_time: LeadTimeStats,
    pub total_predictions: usize,
    pub total_failures: usize,
}

/// Tracks predictions and failures; all timing comes from the caller.
#[derive(Debug, Default)]
pub struct MetricsTracker {
    predictions: HashMap<String, PredictionRecord>,
    failures: HashMap<String, FailureEvent>,
    prediction_counter: u64,
    failure_counter: u64,
}

impl MetricsTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a failure prediction made at `now`. Returns the prediction id.
    pub fn record_prediction_at(
        &mut self,
        machine_id: &str,
        ttf_hours: f64,
        health_score: f64,
        anomaly_score: f64,
        confidence: f64,
        now: DateTime<Utc>,
    ) -> String {
        self.prediction_counter += 1;
        let prediction_id = format!("PRED-{:04}", self.prediction_counter);

        self.predictions.insert(
            prediction_id.clone(),
            PredictionRecord {
                prediction_id: prediction_id.clone(),
                machine_id: machine_id.to_string(),
                predicted_at: now,
                predicted_failure_time: now
                    + Duration::milliseconds((ttf_hours * 3_600_000.0) as i64),
                predicted_ttf_hours: ttf_hours,
                health_score_at_prediction: health_score,
                anomaly_score_at_prediction: anomaly_score,
                confidence,
                outcome: PredictionOutcome::Pending,
                actual_failure_time: None,
                lead_time_hours: None,
            },
        );
        prediction_id
    }

    /// Convenience wrapper using the wall clock.
    pub fn record_prediction(
        &mut self,
        machine_id: &str,
        ttf_hours: f64,
        health_score: f64,
        anomaly_score: f64,
        confidence: f64,
    ) -> String {
        self.record_prediction_at(
            machine_id,
            ttf_hours,
            health_score,
            anomaly_score,
            confidence,
            Utc::now(),
        )
    }

    /// Record a ground-truth failure at `now` and match it against the
    /// earliest pending prediction for the machine inside the look-ahead
    /// window. Returns the failure event id.
    pub fn record_failure_at(
        &mut self,
        machine_id: &str,
        event_type: &str,
        now: DateTime<Utc>,
    ) -> String {
        self.failure_counter += 1;
        let failure_id = format!("FAIL-{:04}", self.failure_counter);

        // Earliest matching pending prediction = longest lead time.
        let mut matched: Option<(String, f64)> = None;
        for (id, pred) in &self.predictions {
            if pred.machine_id != machine_id || pred.outcome != PredictionOutcome::Pending {
                continue;
            }
            let age_hours = (now - pred.predicted_at).num_milliseconds() as f64 / 3_600_000.0;
            if age_hours <= 0.0 || age_hours > defaults::PREDICTION_WINDOW_HOURS {
                continue;
            }
            if matched.as_ref().is_none_or(|(_, best)| age_hours > *best) {
                matched = Some((id.clone(), age_hours));
            }
        }

        let (prediction_id, lead_time) = match matched {
            Some((id, lead)) => {
                if let Some(pred) = self.predictions.get_mut(&id) {
                    pred.outcome = PredictionOutcome::TruePositive;
                    pred.actual_failure_time = Some(now);
                    pred.lead_time_hours = Some(lead);
                }
                (Some(id), Some(lead))
            }
            None => (None, None),
        };

        self.failures.insert(
            failure_id.clone(),
            FailureEvent {
                event_id: failure_id.clone(),
                machine_id: machine_id.to_string(),
                occurred_at: now,
                was_predicted: prediction_id.is_some(),
                prediction_id,
                lead_time_hours: lead_time,
                event_type: event_type.to_string(),
            },
        );
        failure_id
    }

    /// Convenience wrapper using the wall clock.
    pub fn record_failure(&mut self, machine_id: &str, event_type: &str) -> String {
        self.record_failure_at(machine_id, event_type, Utc::now())
    }

    /// Turn pending predictions older than the look-ahead window into false
    /// positives. Idempotent; returns how many were expired.
    pub fn expire_pending_predictions(&mut self, now: DateTime<Utc>) -> usize {
        let cutoff_ms = (defaults::PREDICTION_WINDOW_HOURS * 3_600_000.0) as i64;
        let mut expired = 0;
        for pred in self.predictions.values_mut() {
            if pred.outcome != PredictionOutcome::Pending {
                continue;
            }
            if (now - pred.predicted_at).num_milliseconds() > cutoff_ms {
                pred.outcome = PredictionOutcome::FalsePositive;
                expired += 1;
            }
        }
        expired
    }

    /// Compute the full metrics report as of `now`.
    pub fn report_at(&mut self, now: DateTime<Utc>) -> MetricsReport {
        self.expire_pending_predictions(now);

        let tp = self.count_outcome(PredictionOutcome::TruePositive);
        let fp = self.count_outcome(PredictionOutcome::FalsePositive);
        let pending = self.count_outcome(PredictionOutcome::Pending);
        let fn_count = self.failures.values().filter(|f| !f.was_predicted).count();
        let tn = self.predictions.len().saturating_sub(tp + fp);

        let precision = ratio_or(tp, tp + fp, 1.0);
        let recall = ratio_or(tp, tp + fn_count, 1.0);
        let f1_score = if precision + recall > 0.0 {
            2.0 * precision * recall / (precision + recall)
        } else {
            0.0
        };
        let false_alarm_rate = ratio_or(fp, fp + tn, 0.0);

        let lead_times: Vec<f64> = self
            .predictions
            .values()
            .filter(|p| p.outcome == PredictionOutcome::TruePositive)
            .filter_map(|p| p.lead_time_hours)
            .collect();

        let lead_time = if lead_times.is_empty() {
            LeadTimeStats {
                average_hours: 0.0,
                max_hours: 0.0,
                min_hours: 0.0,
                predictions_with_lead_time: 0,
            }
        } else {
            LeadTimeStats {
                average_hours: lead_times.iter().sum::<f64>() / lead_times.len() as f64,
                max_hours: lead_times.iter().copied().fold(f64::MIN, f64::max),
                min_hours: lead_times.iter().copied().fold(f64::MAX, f64::min),
                predictions_with_lead_time: lead_times.len(),
            }
        };

        MetricsReport {
            true_positives: tp,
            false_positives: fp,
            approximate_tn: tn,
            false_negatives: fn_count,
            pending,
            precision,
            recall,
            f1_score,
            false_alarm_rate,
            lead_time,
            total_predictions: self.predictions.len(),
            total_failures: self.failures.len(),
        }
    }

    /// Recent predictions, newest first.
    pub fn prediction_history(
        &self,
        machine_id: Option<&str>,
        limit: usize,
    ) -> Vec<PredictionRecord> {
        let mut records: Vec<PredictionRecord> = self
            .predictions
            .values()
            .filter(|p| machine_id.is_none_or(|m| m == p.machine_id))
            .cloned()
            .collect();
        records.sort_by(|a, b| b.predicted_at.cmp(&a.predicted_at));
        records.truncate(limit);
        records
    }

    /// Recent failures, newest first.
    pub fn failure_history(&self, machine_id: Option<&str>, limit: usize) -> Vec<FailureEvent> {
        let mut events: Vec<FailureEvent> = self
            .failures
            .values()
            .filter(|f| machine_id.is_none_or(|m| m == f.machine_id))
            .cloned()
            .collect();
        events.sort_by(|a, b| b.occurred_at.cmp(&a.occurred_at));
        events.truncate(limit);
        events
    }

    fn count_outcome(&self, outcome: PredictionOutcome) -> usize {
        self.predictions
            .values()
            .filter(|p| p.outcome == outcome)
            .count()
    }
}

fn ratio_or(numerator: usize, denominator: usize, fallback: f64) -> f64 {
    if denominator == 0 {
        fallback
    } else {
        numerator as f64 / denominator as f64
    }
}
