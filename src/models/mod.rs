pub mod assignment;
pub mod complaint;
pub mod live;
pub mod sample;

pub use assignment::{Assignment, NewAssignment};
pub use complaint::{Complaint, NewComplaint};
pub use live::{LiveGuard, LiveUpdate};
pub use sample::{LocationSample, Position, PositionOptions};
