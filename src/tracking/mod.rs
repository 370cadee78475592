pub mod positioning;
pub mod reporter;
pub mod session;
pub mod tracker;

pub use positioning::{Positioning, ScriptedPositioning};
pub use reporter::{LocationReporter, ReporterConfig};
pub use session::{ShiftSession, ShiftStatus};
pub use tracker::{
    IgnoreReason, SampleOutcome, ShiftTracker, TrackerConfig, TrackerEvent, TrackerPhase, TrackerState,
};
