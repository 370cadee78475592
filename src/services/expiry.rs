use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::clock::Clock;
use crate::services::assignments::InMemoryAssignmentStore;

/// Deletes assignments whose shift window is over.
///
/// Runs on a coarse timer, so an assignment can outlive its `to` instant by
/// up to one sweep interval.
pub struct ExpirySweeper {
    store: Arc<InMemoryAssignmentStore>,
    clock: Arc<dyn Clock>,
    interval: Duration,
}

impl ExpirySweeper {
    pub fn new(store: Arc<InMemoryAssignmentStore>, clock: Arc<dyn Clock>, interval: Duration) -> Self {
        Self { store, clock, interval }
    }

    /// Returns how many assignments were removed.
    pub fn sweep(&self) -> usize {
        let removed = self.store.remove_expired(self.clock.now());
        for assignment in &removed {
            tracing::info!(
                assignment_id = %assignment.id,
                guard_id = %assignment.guard_id,
                to = %assignment.to,
                "Shift over, assignment removed"
            );
        }
        removed.len()
    }

    pub fn spawn(self, cancel: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = ticker.tick() => {
                        self.sweep();
                    }
                }
            }

            tracing::debug!("Expiry sweeper stopped");
        })
    }
}
