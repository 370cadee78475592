//! Geofenced shift state machine.
//!
//! A [`ShiftTracker`] owns the dwell-time accumulators for one assignment at a
//! time. It is a plain synchronous value: every transition happens inside
//! [`ShiftTracker::load_assignment`], [`ShiftTracker::on_sample`] or
//! [`ShiftTracker::check_completion`], and time only advances through the
//! instants passed to those calls.
//!
//! Phases: `Idle -> Active -> Completed`. `Completed` is terminal until a new
//! assignment is loaded or [`ShiftTracker::reset`] is called.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::error::TrackerError;
use crate::geo::is_within_radius;
use crate::models::{Assignment, LocationSample};

pub const DEFAULT_ZONE_RADIUS_M: f64 = 65.0;
pub const DEFAULT_OUTSIDE_VIOLATION_THRESHOLD_MS: i64 = 120_000;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackerConfig {
    pub zone_radius_m: f64,
    /// Continuous time outside the zone before a violation is raised.
    pub outside_violation_threshold_ms: i64,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            zone_radius_m: DEFAULT_ZONE_RADIUS_M,
            outside_violation_threshold_ms: DEFAULT_OUTSIDE_VIOLATION_THRESHOLD_MS,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum TrackerPhase {
    Idle,
    Active,
    Completed,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackerState {
    pub inside_zone: bool,
    pub total_inside_time_ms: i64,
    pub progress_percent: f64,
    pub completed: bool,
    pub consecutive_outside_started_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TrackerEvent {
    /// The guard has been outside the zone for at least the threshold.
    /// Raised once per continuous outside episode.
    ViolationDetected {
        assignment_id: Uuid,
        guard_id: String,
        outside_since: DateTime<Utc>,
        outside_for_ms: i64,
    },
    ShiftCompleted {
        assignment_id: Uuid,
        guard_id: String,
        total_inside_time_ms: i64,
        attendance_percent: f64,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    Idle,
    Completed,
    BeforeShift,
    /// Timestamp earlier than the last accepted sample.
    OutOfOrder,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SampleOutcome {
    Ignored(IgnoreReason),
    Tracked {
        inside: bool,
        violation: Option<TrackerEvent>,
    },
    ShiftEnded(TrackerEvent),
}

impl SampleOutcome {
    pub fn into_events(self) -> Vec<TrackerEvent> {
        match self {
            SampleOutcome::Ignored(_) => Vec::new(),
            SampleOutcome::Tracked { violation, .. } => violation.into_iter().collect(),
            SampleOutcome::ShiftEnded(event) => vec![event],
        }
    }
}

pub struct ShiftTracker {
    config: TrackerConfig,
    assignment: Option<Assignment>,
    state: TrackerState,
    last_sample: Option<LocationSample>,
    violation_reported: bool,
}

impl ShiftTracker {
    pub fn new(config: TrackerConfig) -> Self {
        Self {
            config,
            assignment: None,
            state: TrackerState::default(),
            last_sample: None,
            violation_reported: false,
        }
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    pub fn phase(&self) -> TrackerPhase {
        match (&self.assignment, self.state.completed) {
            (None, _) => TrackerPhase::Idle,
            (Some(_), true) => TrackerPhase::Completed,
            (Some(_), false) => TrackerPhase::Active,
        }
    }

    pub fn state(&self) -> &TrackerState {
        &self.state
    }

    pub fn assignment(&self) -> Option<&Assignment> {
        self.assignment.as_ref()
    }

    pub fn last_sample(&self) -> Option<&LocationSample> {
        self.last_sample.as_ref()
    }

    /// Share of the shift window spent inside the zone, in percent.
    pub fn attendance_percent(&self) -> f64 {
        match &self.assignment {
            Some(a) if a.window_ms() > 0 => {
                (100.0 * self.state.total_inside_time_ms as f64 / a.window_ms() as f64)
                    .clamp(0.0, 100.0)
            }
            _ => 0.0,
        }
    }

    /// Starts tracking `assignment`, discarding any previous shift.
    ///
    /// A shift that is already over at `now` goes straight to `Completed`
    /// with nothing accumulated.
    pub fn load_assignment(
        &mut self,
        assignment: Assignment,
        now: DateTime<Utc>,
    ) -> Result<TrackerPhase, TrackerError> {
        assignment.validate()?;

        self.reset();
        let over = assignment.is_over(now);
        self.assignment = Some(assignment);

        if over {
            self.state.completed = true;
        } else {
            self.refresh_progress(now);
        }

        Ok(self.phase())
    }

    pub fn reset(&mut self) {
        self.assignment = None;
        self.state = TrackerState::default();
        self.last_sample = None;
        self.violation_reported = false;
    }

    pub fn on_sample(&mut self, sample: &LocationSample) -> SampleOutcome {
        let (from, to, target) = match (&self.assignment, self.state.completed) {
            (None, _) => return SampleOutcome::Ignored(IgnoreReason::Idle),
            (Some(_), true) => return SampleOutcome::Ignored(IgnoreReason::Completed),
            (Some(a), false) => (a.from, a.to, a.target()),
        };

        let now = sample.timestamp;
        if now < from {
            return SampleOutcome::Ignored(IgnoreReason::BeforeShift);
        }
        if matches!(&self.last_sample, Some(last) if now < last.timestamp) {
            return SampleOutcome::Ignored(IgnoreReason::OutOfOrder);
        }
        if now >= to {
            self.last_sample = Some(*sample);
            return SampleOutcome::ShiftEnded(self.complete());
        }

        let inside = is_within_radius(sample.point(), target, self.config.zone_radius_m);
        self.state.inside_zone = inside;

        let mut violation = None;
        if inside {
            let elapsed = self
                .last_sample
                .map(|last| (now - last.timestamp).num_milliseconds())
                .unwrap_or(0);
            self.state.total_inside_time_ms += elapsed.max(0);
            self.state.consecutive_outside_started_at = None;
            self.violation_reported = false;
        } else {
            let started = *self
                .state
                .consecutive_outside_started_at
                .get_or_insert(now);
            let outside_for_ms = (now - started).num_milliseconds();

            if !self.violation_reported && outside_for_ms >= self.config.outside_violation_threshold_ms {
                self.violation_reported = true;
                violation = self.assignment.as_ref().map(|a| TrackerEvent::ViolationDetected {
                    assignment_id: a.id,
                    guard_id: a.guard_id.clone(),
                    outside_since: started,
                    outside_for_ms,
                });
            }
        }

        self.last_sample = Some(*sample);
        self.refresh_progress(now);

        SampleOutcome::Tracked { inside, violation }
    }

    /// Completes the shift if `now` has reached its end, without needing a
    /// sample near the boundary. Also advances progress while active.
    pub fn check_completion(&mut self, now: DateTime<Utc>) -> Option<TrackerEvent> {
        let to = match (&self.assignment, self.state.completed) {
            (Some(a), false) => a.to,
            _ => return None,
        };

        if now >= to {
            return Some(self.complete());
        }
        self.refresh_progress(now);
        None
    }

    fn complete(&mut self) -> TrackerEvent {
        self.state.completed = true;
        self.state.progress_percent = 100.0;

        let attendance_percent = self.attendance_percent();
        let (assignment_id, guard_id) = self
            .assignment
            .as_ref()
            .map(|a| (a.id, a.guard_id.clone()))
            .unwrap_or_default();

        TrackerEvent::ShiftCompleted {
            assignment_id,
            guard_id,
            total_inside_time_ms: self.state.total_inside_time_ms,
            attendance_percent,
        }
    }

    fn refresh_progress(&mut self, now: DateTime<Utc>) {
        if let Some(a) = &self.assignment {
            let elapsed = (now - a.from).num_milliseconds() as f64;
            let pct = (100.0 * elapsed / a.window_ms() as f64).clamp(0.0, 100.0);
            // never move backwards
            if pct > self.state.progress_percent {
                self.state.progress_percent = pct;
            }
        }
    }
}
