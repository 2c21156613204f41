//! Persistence-window tracking for tentative alerts.
//!
//! A window approval does not create an alert by itself: the condition must
//! stay approved for the alert type's persistence window. Entries that stop
//! being refreshed are swept after a staleness timeout.

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;

use crate::config::defaults;
use crate::types::{AlertType, Severity};

/// A potential alert awaiting its persistence window.
#[derive(Debug, Clone)]
pub struct PendingAlert {
    pub alert_type: AlertType,
    pub severity: Severity,
    pub first_triggered: DateTime<Utc>,
    pub last_triggered: DateTime<Utc>,
    pub trigger_count: u32,
}

impl PendingAlert {
    fn new(alert_type: AlertType, severity: Severity, now: DateTime<Utc>) -> Self {
        Self {
            alert_type,
            severity,
            first_triggered: now,
            last_triggered: now,
            trigger_count: 1,
        }
    }

    fn update(&mut self, now: DateTime<Utc>) {
        self.last_triggered = now;
        self.trigger_count += 1;
    }

    /// Whether the condition has been sustained long enough.
    pub fn is_persistent(&self, required_secs: i64) -> bool {
        self.last_triggered - self.first_triggered >= Duration::seconds(required_secs)
    }
}

/// Per-machine tracker of pending alerts, one slot per alert type.
#[derive(Debug, Default)]
pub struct PendingTracker {
    entries: HashMap<AlertType, PendingAlert>,
}

impl PendingTracker {
    /// Record a window approval for `alert_type` at `now`.
    ///
    /// Returns `true` when the persistence window is met; the entry is
    /// removed and the caller should hand the alert to the gate. Returns
    /// `false` while the condition is still pending.
    pub fn observe(
        &mut self,
        alert_type: AlertType,
        severity: Severity,
        now: DateTime<Utc>,
        required_secs: i64,
    ) -> bool {
        match self.entries.get_mut(&alert_type) {
            Some(pending) => {
                pending.update(now);
                if pending.is_persistent(required_secs) {
                    self.entries.remove(&alert_type);
                    true
                } else {
                    false
                }
            }
            None => {
                self.entries
                    .insert(alert_type, PendingAlert::new(alert_type, severity, now));
                false
            }
        }
    }

    /// Drop the pending entry for an alert type (condition released).
    pub fn clear(&mut self, alert_type: AlertType) {
        self.entries.remove(&alert_type);
    }

    /// Remove entries whose last trigger is older than the staleness timeout.
    /// Returns the number of entries removed. Safe to call repeatedly.
    pub fn sweep_stale(&mut self, now: DateTime<Utc>) -> usize {
        let cutoff = now - Duration::seconds(defaults::PENDING_STALE_SECS);
        let before = self.entries.len();
        self.entries.retain(|_, p| p.last_triggered >= cutoff);
        before - self.entries.len()
    }

    pub fn get(&self, alert_type: AlertType) -> Option<&PendingAlert> {
        self.entries.get(&alert_type)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
