use serde::{Deserialize, Serialize};

/// Local mapping from a Telegram user to the stable identity the panel
/// knows them by. Created on first grant or redemption, never deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub user_id: i64,
    pub vpn_identity: String,
}

impl User {
    pub fn derive(user_id: i64) -> Self {
        Self {
            user_id,
            vpn_identity: derive_identity(user_id),
        }
    }
}

/// The identity assigned to a user is deterministic, so a lost mapping
/// record can always be re-derived.
pub fn derive_identity(user_id: i64) -> String {
    format!("vpn_{}", user_id)
}
