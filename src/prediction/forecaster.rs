//! Health trajectory forecasting.
//!
//! Projects a machine's health score forward to estimate when it will cross
//! the critical threshold. The primary model is Holt double-exponential
//! smoothing (level + trend); if it cannot produce a finite projection the
//! forecaster falls back to a linear fit over the most recent readings. The
//! call itself never fails.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::collections::VecDeque;

use crate::config::defaults;
use crate::config::ForecastConfig;
use crate::types::clamp;

/// Holt smoothing factors for level and trend.
const HOLT_ALPHA: f64 = 0.5;
const HOLT_BETA: f64 = 0.3;

/// Default per-reading degradation assumed when history is too short to fit.
const DEFAULT_DEGRADATION_PER_READING: f64 = -0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ForecastStatus {
    Success,
    InsufficientData,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ForecastMethod {
    Holt,
    Linear,
}

/// One projected point with its confidence envelope.
#[derive(Debug, Clone, Serialize)]
pub struct ForecastPoint {
    pub timestamp: DateTime<Utc>,
    pub health_score: f64,
    pub lower_bound: f64,
    pub upper_bound: f64,
}

/// Forecast result. `ttf_hours` is the first projected hour below the
/// critical threshold, or `None` if the horizon never crosses it.
#[derive(Debug, Clone, Serialize)]
pub struct ForecastReport {
    pub status: ForecastStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<ForecastMethod>,
    pub ttf_hours: Option<f64>,
    pub forecast: Vec<ForecastPoint>,
}

impl ForecastReport {
    fn insufficient() -> Self {
        Self {
            status: ForecastStatus::InsufficientData,
            method: None,
            ttf_hours: None,
            forecast: Vec::new(),
        }
    }
}

/// Health-history forecaster for one machine.
pub struct Forecaster {
    config: ForecastConfig,
    history: VecDeque<(DateTime<Utc>, f64)>,
}

impl Forecaster {
    pub fn new(config: ForecastConfig) -> Self {
        Self {
            config,
            history: VecDeque::with_capacity(defaults::HEALTH_HISTORY_CAP),
        }
    }

    /// Record a health reading.
    pub fn add_reading(&mut self, timestamp: DateTime<Utc>, health_score: f64) {
        self.history.push_back((timestamp, health_score));
        if self.history.len() > defaults::HEALTH_HISTORY_CAP {
            self.history.pop_front();
        }
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    /// Clear all history (after maintenance).
    pub fn reset(&mut self) {
        self.history.clear();
    }

    /// Project health forward `horizon_hours` from `now`.
    pub fn forecast(&self, now: DateTime<Utc>, horizon_hours: u32) -> ForecastReport {
        if self.history.len() < defaults::MIN_POINTS_FOR_FORECAST {
            return ForecastReport::insufficient();
        }

        match self.holt_rate_per_hour() {
            Some(rate) => self.project(now, horizon_hours, rate, ForecastMethod::Holt),
            None => {
                let rate = self.linear_rate_per_hour();
                self.project(now, horizon_hours, rate, ForecastMethod::Linear)
            }
        }
    }

    /// Holt level/trend fit over the full history; returns the per-hour
    /// degradation rate, or `None` when the fit is unusable.
    fn holt_rate_per_hour(&self) -> Option<f64> {
        let values: Vec<f64> = self.history.iter().map(|(_, h)| *h).collect();

        let mut level = values[0];
        let mut trend = values[1] - values[0];
        for value in values.iter().skip(1) {
            let prev_level = level;
            level = HOLT_ALPHA * value + (1.0 - HOLT_ALPHA) * (level + trend);
            trend = HOLT_BETA * (level - prev_level) + (1.0 - HOLT_BETA) * trend;
        }

        let dt_hours = self.mean_spacing_hours()?;
        let rate = trend / dt_hours;
        rate.is_finite().then_some(rate)
    }

    /// Linear fallback: slope over the last 10 readings.
    fn linear_rate_per_hour(&self) -> f64 {
        let recent: Vec<(DateTime<Utc>, f64)> = self
            .history
            .iter()
            .rev()
            .take(10)
            .rev()
            .copied()
            .collect();

        let per_reading = if recent.len() >= 2 {
            (recent[recent.len() - 1].1 - recent[0].1) / recent.len() as f64
        } else {
            DEFAULT_DEGRADATION_PER_READING
        };

        match self.mean_spacing_hours() {
            Some(dt) => per_reading / dt,
            None => per_reading,
        }
    }

    /// Average spacing between consecutive readings, in hours.
    fn mean_spacing_hours(&self) -> Option<f64> {
        let first = self.history.front()?.0;
        let last = self.history.back()?.0;
        let span_hours = (last - first).num_milliseconds() as f64 / 3_600_000.0;
        let intervals = (self.history.len() - 1) as f64;
        let dt = span_hours / intervals;
        (dt.is_finite() && dt > 0.0).then_some(dt)
    }

    fn project(
        &self,
        now: DateTime<Utc>,
        horizon_hours: u32,
        rate_per_hour: f64,
        method: ForecastMethod,
    ) -> ForecastReport {
        let current = self.history.back().map_or(0.0, |(_, h)| *h);

        let mut forecast = Vec::with_capacity(horizon_hours as usize + 1);
        let mut ttf_hours = None;

        for hour in 0..=horizon_hours {
            let projected = clamp(current + rate_per_hour * f64::from(hour), 0.0, 100.0);
            forecast.push(ForecastPoint {
                timestamp: now + Duration::hours(i64::from(hour)),
                health_score: projected,
                lower_bound: clamp(projected - defaults::FORECAST_ENVELOPE, 0.0, 100.0),
                upper_bound: clamp(projected + defaults::FORECAST_ENVELOPE, 0.0, 100.0),
            });

            if ttf_hours.is_none() && projected < self.config.critical_health_threshold {
                ttf_hours = Some(f64::from(hour));
            }
        }

        ForecastReport {
            status: ForecastStatus::Success,
            method: Some(method),
            ttf_hours,
            forecast,
        }
    }
}
