use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use std::sync::Arc;

use crate::error::ReportError;
use crate::models::LiveGuard;

/// Remote sink for the device's current position.
#[async_trait]
pub trait PositionSink: Send + Sync {
    async fn report(&self, latitude: f64, longitude: f64) -> Result<(), ReportError>;
}

/// Latest known position per guard.
pub struct LiveLocationRegistry {
    guards: DashMap<String, LiveGuard>,
}

impl LiveLocationRegistry {
    pub fn new() -> Self {
        Self {
            guards: DashMap::new(),
        }
    }

    /// Inserts or replaces the guard's live position.
    pub fn upsert(&self, guard_id: &str, latitude: f64, longitude: f64) -> Result<LiveGuard, ReportError> {
        if !latitude.is_finite() || !longitude.is_finite() {
            return Err(ReportError::Failed(format!(
                "latitude and longitude must be finite, got ({}, {})",
                latitude, longitude
            )));
        }

        let live = LiveGuard {
            guard_id: guard_id.to_string(),
            latitude,
            longitude,
            updated_at: Utc::now(),
        };
        self.guards.insert(guard_id.to_string(), live.clone());
        Ok(live)
    }

    pub fn get(&self, guard_id: &str) -> Option<LiveGuard> {
        self.guards.get(guard_id).map(|g| g.clone())
    }

    pub fn list(&self) -> Vec<LiveGuard> {
        let mut all: Vec<LiveGuard> = self.guards.iter().map(|g| g.clone()).collect();
        all.sort_by(|a, b| a.guard_id.cmp(&b.guard_id));
        all
    }
}

impl Default for LiveLocationRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// [`PositionSink`] bound to one guard, writing into a shared registry.
pub struct LiveLocationSink {
    guard_id: String,
    registry: Arc<LiveLocationRegistry>,
}

impl LiveLocationSink {
    pub fn new(guard_id: &str, registry: Arc<LiveLocationRegistry>) -> Self {
        Self {
            guard_id: guard_id.to_string(),
            registry,
        }
    }
}

#[async_trait]
impl PositionSink for LiveLocationSink {
    async fn report(&self, latitude: f64, longitude: f64) -> Result<(), ReportError> {
        self.registry.upsert(&self.guard_id, latitude, longitude)?;
        Ok(())
    }
}
