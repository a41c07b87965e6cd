use serde::{Deserialize, Serialize};

/// A single-use token redeemable for a fixed-duration subscription grant.
///
/// A code deactivates exactly once, through redemption or an explicit
/// admin action, and never becomes active again.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Promocode {
    pub code: String,
    pub duration_days: i64,
    #[serde(default = "default_active")]
    pub active: bool,
}

impl Promocode {
    pub fn new(code: impl Into<String>, duration_days: i64) -> Self {
        Self {
            code: code.into(),
            duration_days,
            active: true,
        }
    }
}

fn default_active() -> bool {
    true
}
