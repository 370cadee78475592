use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use uuid::Uuid;

use crate::error::StoreError;
use crate::models::{Assignment, NewAssignment};

/// Holds shift records. The tracker only ever needs `fetch_by_id`.
#[async_trait]
pub trait AssignmentStore: Send + Sync {
    async fn fetch_by_id(&self, id: Uuid) -> Result<Assignment, StoreError>;
}

pub struct InMemoryAssignmentStore {
    assignments: DashMap<Uuid, Assignment>,
}

impl InMemoryAssignmentStore {
    pub fn new() -> Self {
        Self {
            assignments: DashMap::new(),
        }
    }

    pub fn create(&self, request: NewAssignment, now: DateTime<Utc>) -> Result<Assignment, StoreError> {
        let assignment = request.into_assignment(now)?;
        self.insert(assignment.clone());
        tracing::info!(
            assignment_id = %assignment.id,
            guard_id = %assignment.guard_id,
            from = %assignment.from,
            to = %assignment.to,
            "Assignment created"
        );
        Ok(assignment)
    }

    pub fn insert(&self, assignment: Assignment) {
        self.assignments.insert(assignment.id, assignment);
    }

    pub fn get(&self, id: Uuid) -> Option<Assignment> {
        self.assignments.get(&id).map(|a| a.clone())
    }

    pub fn delete(&self, id: Uuid) -> Result<Assignment, StoreError> {
        self.assignments
            .remove(&id)
            .map(|(_, a)| a)
            .ok_or(StoreError::NotFound(id))
    }

    /// All assignments ordered by shift start.
    pub fn list(&self) -> Vec<Assignment> {
        let mut all: Vec<Assignment> = self.assignments.iter().map(|a| a.clone()).collect();
        all.sort_by_key(|a| a.from);
        all
    }

    /// The assignment of `guard_id` that starts last.
    pub fn latest_for_guard(&self, guard_id: &str) -> Option<Assignment> {
        self.assignments
            .iter()
            .filter(|a| a.guard_id == guard_id)
            .max_by_key(|a| a.from)
            .map(|a| a.clone())
    }

    /// Removes and returns every assignment whose shift is over at `now`.
    pub fn remove_expired(&self, now: DateTime<Utc>) -> Vec<Assignment> {
        let expired: Vec<Uuid> = self
            .assignments
            .iter()
            .filter(|a| a.is_over(now))
            .map(|a| a.id)
            .collect();

        expired
            .into_iter()
            .filter_map(|id| self.assignments.remove(&id).map(|(_, a)| a))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.assignments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }
}

impl Default for InMemoryAssignmentStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AssignmentStore for InMemoryAssignmentStore {
    async fn fetch_by_id(&self, id: Uuid) -> Result<Assignment, StoreError> {
        self.get(id).ok_or(StoreError::NotFound(id))
    }
}
