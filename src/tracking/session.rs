use parking_lot::Mutex;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::clock::Clock;
use crate::error::{NotifyError, SessionError, TrackerError};
use crate::models::{Assignment, LocationSample};
use crate::services::assignments::AssignmentStore;
use crate::services::complaints::ViolationNotifier;

use super::tracker::{
    SampleOutcome, ShiftTracker, TrackerConfig, TrackerEvent, TrackerPhase, TrackerState,
};

/// What the presentation layer renders: progress, zone flag, completion.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShiftStatus {
    pub phase: TrackerPhase,
    pub assignment_id: Option<Uuid>,
    pub guard_id: Option<String>,
    pub state: TrackerState,
    pub attendance_percent: f64,
    /// Most recent successful fix, tracked or not.
    pub last_fix: Option<LocationSample>,
}

impl ShiftStatus {
    fn idle() -> Self {
        Self {
            phase: TrackerPhase::Idle,
            assignment_id: None,
            guard_id: None,
            state: TrackerState::default(),
            attendance_percent: 0.0,
            last_fix: None,
        }
    }

    /// False until the first fix arrives ("fetching location...").
    pub fn has_fix(&self) -> bool {
        self.last_fix.is_some()
    }
}

struct Inner {
    tracker: ShiftTracker,
    last_fix: Option<LocationSample>,
}

impl Inner {
    fn status(&self) -> ShiftStatus {
        let assignment = self.tracker.assignment();
        ShiftStatus {
            phase: self.tracker.phase(),
            assignment_id: assignment.map(|a| a.id),
            guard_id: assignment.map(|a| a.guard_id.clone()),
            state: self.tracker.state().clone(),
            attendance_percent: self.tracker.attendance_percent(),
            last_fix: self.last_fix,
        }
    }
}

/// One guard device's shift: the tracker behind a single mutex plus the
/// collaborators its events go to.
///
/// Every tracker mutation happens with the lock held and without awaiting,
/// so status reads never observe a half-applied sample. Violation
/// notifications are sent after the lock is released.
pub struct ShiftSession {
    inner: Mutex<Inner>,
    notifier: Arc<dyn ViolationNotifier>,
    clock: Arc<dyn Clock>,
    notify_timeout: Duration,
    status_tx: watch::Sender<ShiftStatus>,
}

impl ShiftSession {
    pub fn new(
        config: TrackerConfig,
        notifier: Arc<dyn ViolationNotifier>,
        clock: Arc<dyn Clock>,
        notify_timeout: Duration,
    ) -> Self {
        let (status_tx, _) = watch::channel(ShiftStatus::idle());
        Self {
            inner: Mutex::new(Inner {
                tracker: ShiftTracker::new(config),
                last_fix: None,
            }),
            notifier,
            clock,
            notify_timeout,
            status_tx,
        }
    }

    pub fn status(&self) -> ShiftStatus {
        self.inner.lock().status()
    }

    pub fn subscribe(&self) -> watch::Receiver<ShiftStatus> {
        self.status_tx.subscribe()
    }

    /// Fetches the assignment and starts tracking it.
    pub async fn load(&self, store: &dyn AssignmentStore, assignment_id: Uuid) -> Result<TrackerPhase, SessionError> {
        let assignment = store.fetch_by_id(assignment_id).await?;
        Ok(self.load_assignment(assignment)?)
    }

    pub fn load_assignment(&self, assignment: Assignment) -> Result<TrackerPhase, TrackerError> {
        let now = self.clock.now();
        let assignment_id = assignment.id;
        let guard_id = assignment.guard_id.clone();

        let mut inner = self.inner.lock();
        let phase = inner.tracker.load_assignment(assignment, now).map_err(|e| {
            warn!(assignment_id = %assignment_id, error = %e, "Rejected assignment");
            e
        })?;
        self.status_tx.send_replace(inner.status());

        info!(assignment_id = %assignment_id, guard_id = %guard_id, phase = ?phase, "Shift loaded");
        Ok(phase)
    }

    pub fn reset(&self) {
        let mut inner = self.inner.lock();
        inner.tracker.reset();
        self.status_tx.send_replace(inner.status());
    }

    /// Applies one sample, then delivers any violation it raised.
    pub async fn handle_sample(&self, sample: LocationSample) -> SampleOutcome {
        let outcome = {
            let mut inner = self.inner.lock();
            inner.last_fix = Some(sample);
            let outcome = inner.tracker.on_sample(&sample);
            self.status_tx.send_replace(inner.status());
            outcome
        };

        if let SampleOutcome::Ignored(reason) = &outcome {
            debug!(reason = ?reason, timestamp = %sample.timestamp, "Sample ignored");
        }

        self.dispatch(outcome.clone().into_events()).await;
        outcome
    }

    /// Periodic completion check that does not depend on samples arriving.
    pub async fn check_completion(&self) -> Option<TrackerEvent> {
        let now = self.clock.now();
        let event = {
            let mut inner = self.inner.lock();
            let event = inner.tracker.check_completion(now);
            self.status_tx.send_replace(inner.status());
            event
        };

        if let Some(event) = &event {
            self.dispatch(vec![event.clone()]).await;
        }
        event
    }

    async fn dispatch(&self, events: Vec<TrackerEvent>) {
        for event in events {
            match event {
                TrackerEvent::ViolationDetected {
                    assignment_id,
                    guard_id,
                    outside_for_ms,
                    ..
                } => {
                    warn!(
                        assignment_id = %assignment_id,
                        guard_id = %guard_id,
                        outside_for_ms,
                        "Guard outside work zone past threshold"
                    );
                    if let Err(e) = self.notify(&guard_id).await {
                        warn!(guard_id = %guard_id, error = %e, "Violation notification failed");
                    }
                }
                TrackerEvent::ShiftCompleted {
                    assignment_id,
                    guard_id,
                    total_inside_time_ms,
                    attendance_percent,
                } => {
                    info!(
                        assignment_id = %assignment_id,
                        guard_id = %guard_id,
                        total_inside_time_ms,
                        attendance_percent,
                        "Shift completed"
                    );
                }
            }
        }
    }

    async fn notify(&self, guard_id: &str) -> Result<(), NotifyError> {
        tokio::time::timeout(self.notify_timeout, self.notifier.report_violation(guard_id))
            .await
            .map_err(|_| NotifyError::Timeout)?
    }
}
