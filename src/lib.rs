//! Guard deployment service with geofenced shift tracking.
//!
//! The HTTP side (`handlers`, `services`) stores assignments, live guard
//! positions and complaints. The device side (`tracking`) samples a guard's
//! position on a timer, decides whether the guard is inside the assigned
//! work zone, accumulates dwell time and raises out-of-zone violations.

pub mod clock;
pub mod config;
pub mod error;
pub mod geo;
pub mod handlers;
pub mod models;
pub mod services;
pub mod tracking;
