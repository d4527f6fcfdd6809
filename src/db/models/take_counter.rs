use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One persisted row of the client-side take store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TakeCounter {
    pub key: String,
    pub takes: u32,
    pub updated_at: DateTime<Utc>,
}
