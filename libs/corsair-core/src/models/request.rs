use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    Pending,
    Completed,
    // Declared for the review workflow; nothing transitions into it yet.
    Rejected,
}

impl RequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Pending => "pending",
            RequestStatus::Completed => "completed",
            RequestStatus::Rejected => "rejected",
        }
    }
}

/// A user-submitted, administrator-fulfilled ask for manual provisioning.
///
/// `details` is intentionally an open string-keyed map: today it carries
/// free-form user text, and admins read it as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    pub request_id: String,
    pub user_id: i64,
    pub details: Map<String, Value>,
    #[serde(default = "default_status")]
    pub status: RequestStatus,
    pub timestamp: i64,
}

fn default_status() -> RequestStatus {
    RequestStatus::Pending
}
