use async_trait::async_trait;
use parking_lot::RwLock;
use std::sync::Arc;

use crate::error::NotifyError;
use crate::models::Complaint;

/// Lodges an alert when a guard stays out of the work zone too long.
#[async_trait]
pub trait ViolationNotifier: Send + Sync {
    async fn report_violation(&self, guard_id: &str) -> Result<(), NotifyError>;
}

pub struct ComplaintBook {
    complaints: RwLock<Vec<Complaint>>,
}

impl ComplaintBook {
    pub fn new() -> Self {
        Self {
            complaints: RwLock::new(Vec::new()),
        }
    }

    pub fn lodge(&self, guard_id: &str, text: impl Into<String>) -> Complaint {
        let complaint = Complaint::new(guard_id, text);
        self.complaints.write().push(complaint.clone());
        complaint
    }

    pub fn for_guard(&self, guard_id: &str) -> Vec<Complaint> {
        self.complaints
            .read()
            .iter()
            .filter(|c| c.guard_id == guard_id)
            .cloned()
            .collect()
    }

    /// Drops every complaint about `guard_id`, returning how many were removed.
    pub fn clear_guard(&self, guard_id: &str) -> usize {
        let mut complaints = self.complaints.write();
        let before = complaints.len();
        complaints.retain(|c| c.guard_id != guard_id);
        before - complaints.len()
    }

    pub fn len(&self) -> usize {
        self.complaints.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.complaints.read().is_empty()
    }
}

impl Default for ComplaintBook {
    fn default() -> Self {
        Self::new()
    }
}

/// [`ViolationNotifier`] that files a complaint in a [`ComplaintBook`].
pub struct ComplaintNotifier {
    book: Arc<ComplaintBook>,
}

impl ComplaintNotifier {
    pub fn new(book: Arc<ComplaintBook>) -> Self {
        Self { book }
    }
}

pub const OUT_OF_ZONE_COMPLAINT: &str = "Guard left the assigned work zone during an active shift";

#[async_trait]
impl ViolationNotifier for ComplaintNotifier {
    async fn report_violation(&self, guard_id: &str) -> Result<(), NotifyError> {
        let complaint = self.book.lodge(guard_id, OUT_OF_ZONE_COMPLAINT);
        tracing::info!(guard_id = %guard_id, complaint_id = %complaint.id, "Out-of-zone complaint lodged");
        Ok(())
    }
}
