use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Latest reported position of a guard.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveGuard {
    pub guard_id: String,
    pub latitude: f64,
    pub longitude: f64,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveUpdate {
    pub guard_id: String,
    pub latitude: f64,
    pub longitude: f64,
}
