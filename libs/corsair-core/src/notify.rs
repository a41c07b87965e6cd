use anyhow::Result;
use async_trait::async_trait;

/// Outbound message delivery to a user, fire-and-forget beyond the
/// success/failure outcome.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, user_id: i64, text: &str) -> Result<()>;
}
