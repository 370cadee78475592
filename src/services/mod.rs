pub mod assignments;
pub mod complaints;
pub mod expiry;
pub mod live;

use std::sync::Arc;

use crate::clock::{Clock, SystemClock};
use crate::config::Config;

pub struct AppState {
    pub config: Config,
    pub clock: Arc<dyn Clock>,
    pub assignments: Arc<assignments::InMemoryAssignmentStore>,
    pub live: Arc<live::LiveLocationRegistry>,
    pub complaints: Arc<complaints::ComplaintBook>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: Config, clock: Arc<dyn Clock>) -> Self {
        Self {
            config,
            clock,
            assignments: Arc::new(assignments::InMemoryAssignmentStore::new()),
            live: Arc::new(live::LiveLocationRegistry::new()),
            complaints: Arc::new(complaints::ComplaintBook::new()),
        }
    }

    pub fn expiry_sweeper(&self) -> expiry::ExpirySweeper {
        expiry::ExpirySweeper::new(
            self.assignments.clone(),
            self.clock.clone(),
            self.config.expiry_sweep_interval(),
        )
    }

    /// Notifier that files violations into this state's complaint book.
    pub fn violation_notifier(&self) -> Arc<dyn complaints::ViolationNotifier> {
        Arc::new(complaints::ComplaintNotifier::new(self.complaints.clone()))
    }

    /// Position sink that keeps `guard_id`'s live location current.
    pub fn position_sink(&self, guard_id: &str) -> Arc<dyn live::PositionSink> {
        Arc::new(live::LiveLocationSink::new(guard_id, self.live.clone()))
    }
}
