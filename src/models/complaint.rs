use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Complaint {
    pub id: Uuid,
    pub guard_id: String,
    #[serde(rename = "complaint")]
    pub text: String,
    pub created_at: DateTime<Utc>,
}

impl Complaint {
    pub fn new(guard_id: &str, text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            guard_id: guard_id.to_string(),
            text: text.into(),
            created_at: Utc::now(),
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewComplaint {
    pub guard_id: String,
    pub complaint: String,
}
