use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{StoreError, TrackerError};
use crate::geo::GeoPoint;

/// Shift length used when a request names neither `to` nor a duration.
pub const DEFAULT_SHIFT_HOURS: f64 = 6.0;

/// A guard's scheduled duty at a fixed location for a time window.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Assignment {
    pub id: Uuid,
    pub guard_id: String,
    pub target_latitude: f64,
    pub target_longitude: f64,
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

impl Assignment {
    pub fn target(&self) -> GeoPoint {
        GeoPoint::new(self.target_latitude, self.target_longitude)
    }

    /// Length of the shift window in milliseconds.
    pub fn window_ms(&self) -> i64 {
        (self.to - self.from).num_milliseconds()
    }

    pub fn is_over(&self, now: DateTime<Utc>) -> bool {
        now >= self.to
    }

    pub fn validate(&self) -> Result<(), TrackerError> {
        if !self.target().is_finite() {
            return Err(TrackerError::InvalidAssignment(format!(
                "target coordinates must be finite, got ({}, {})",
                self.target_latitude, self.target_longitude
            )));
        }
        if self.from >= self.to {
            return Err(TrackerError::InvalidAssignment(format!(
                "shift must start before it ends ({} >= {})",
                self.from, self.to
            )));
        }
        Ok(())
    }
}

/// Request body for creating an assignment.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAssignment {
    pub guard_id: String,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub from: Option<DateTime<Utc>>,
    #[serde(default)]
    pub to: Option<DateTime<Utc>>,
    #[serde(default)]
    pub duration_hours: Option<f64>,
}

impl NewAssignment {
    /// Resolves the shift window and validates the result.
    ///
    /// `from` defaults to `now`. `to` defaults to `from + duration_hours`, and
    /// the duration itself defaults to [`DEFAULT_SHIFT_HOURS`].
    pub fn into_assignment(self, now: DateTime<Utc>) -> Result<Assignment, StoreError> {
        if self.guard_id.trim().is_empty() {
            return Err(StoreError::Invalid("guardId is required".to_string()));
        }

        let from = self.from.unwrap_or(now);
        let to = match self.to {
            Some(to) => to,
            None => {
                let hours = self.duration_hours.unwrap_or(DEFAULT_SHIFT_HOURS);
                if !hours.is_finite() || hours <= 0.0 {
                    return Err(StoreError::Invalid(format!(
                        "duration must be a positive number of hours, got {}",
                        hours
                    )));
                }
                from + Duration::milliseconds((hours * 3_600_000.0).round() as i64)
            }
        };

        let assignment = Assignment {
            id: Uuid::new_v4(),
            guard_id: self.guard_id,
            target_latitude: self.latitude,
            target_longitude: self.longitude,
            from,
            to,
        };

        assignment
            .validate()
            .map_err(|TrackerError::InvalidAssignment(msg)| StoreError::Invalid(msg))?;

        Ok(assignment)
    }
}
