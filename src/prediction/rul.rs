//! Remaining-useful-life heuristic.
//!
//! Deterministic, rule-based health and RUL estimation from the raw sensor
//! frame. Vibration carries most of the weight for rotating machinery; the
//! temperature sub-score picks its band from the reading itself because the
//! fleet mixes chillers (cold), motors (hot) and pumps (in between).

use crate::config::defaults;
use crate::types::{clamp, SensorFrame};

/// Predict `(rul_hours, health_score)` for a sensor frame.
///
/// Health is `0.6 * vibration + 0.4 * temperature`, clamped to [0, 100].
/// RUL maps from health in three bands: 72–144 h above 70, 24–72 h between
/// 40 and 70, 0–24 h below 40.
pub fn predict(sensors: &SensorFrame) -> (f64, f64) {
    let vib_score = score_vibration((sensors.vibration_x + sensors.vibration_y) / 2.0);
    let temp_score = score_temperature(sensors.temperature);

    let health = clamp(vib_score * 0.6 + temp_score * 0.4, 0.0, 100.0);

    let rul_hours = if health >= 70.0 {
        72.0 + ((health - 70.0) / 30.0) * 72.0
    } else if health >= 40.0 {
        24.0 + ((health - 40.0) / 30.0) * 48.0
    } else {
        (health / 40.0) * 24.0
    };

    (clamp(rul_hours, defaults::MIN_RUL_HOURS, defaults::MAX_RUL_HOURS), health)
}

/// Vibration sub-score from the averaged radial channels (mm/s).
///
/// Segments: healthy ≤ 0.65 → 100; 0.65–1.2 → 100→80; 1.2–2.5 → 80→30;
/// beyond 2.5 → 30→0.
fn score_vibration(avg_vib: f64) -> f64 {
    if avg_vib <= 0.65 {
        100.0
    } else if avg_vib <= 1.2 {
        100.0 - ((avg_vib - 0.65) / 0.55) * 20.0
    } else if avg_vib <= 2.5 {
        80.0 - ((avg_vib - 1.2) / 1.3) * 50.0
    } else {
        (30.0 - (avg_vib - 2.5) * 30.0).max(0.0)
    }
}

/// Temperature sub-score, band selected from the raw reading.
///
/// Chillers run below 20 °C (baseline 7.5), motors above 60 °C (baseline 72),
/// pumps in between (baseline 52).
fn score_temperature(temp: f64) -> f64 {
    if temp < 20.0 {
        // Chiller range
        if temp <= 7.5 {
            100.0
        } else if temp <= 10.0 {
            100.0 - ((temp - 7.5) / 2.5) * 30.0
        } else if temp <= 15.0 {
            70.0 - ((temp - 10.0) / 5.0) * 50.0
        } else {
            (20.0 - ((temp - 15.0) / 5.0) * 20.0).max(0.0)
        }
    } else if temp > 60.0 {
        // Motor range
        if temp <= 72.0 {
            100.0
        } else if temp <= 85.0 {
            100.0 - ((temp - 72.0) / 13.0) * 25.0
        } else if temp <= 95.0 {
            75.0 - ((temp - 85.0) / 10.0) * 45.0
        } else {
            (30.0 - ((temp - 95.0) / 10.0) * 30.0).max(0.0)
        }
    } else {
        // Pump range
        if temp <= 52.0 {
            100.0
        } else if temp <= 70.0 {
            100.0 - ((temp - 52.0) / 18.0) * 25.0
        } else if temp <= 85.0 {
            75.0 - ((temp - 70.0) / 15.0) * 45.0
        } else {
            (30.0 - ((temp - 85.0) / 15.0) * 30.0).max(0.0)
        }
    }
}

/// Coarse failure-risk label from a RUL estimate.
pub fn failure_risk(rul_hours: f64) -> &'static str {
    if rul_hours > 72.0 {
        "low"
    } else if rul_hours > 24.0 {
        "medium"
    } else {
        "high"
    }
}
