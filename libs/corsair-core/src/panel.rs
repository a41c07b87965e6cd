use anyhow::Result;
use async_trait::async_trait;

use crate::models::client::ClientState;

/// Contract against the remote VPN panel. A missing client is `Ok(None)`
/// from `find_by_identity`; transport and API failures are errors.
#[async_trait]
pub trait PanelClient: Send + Sync {
    async fn find_by_identity(&self, identity: &str) -> Result<Option<ClientState>>;

    /// Register a brand-new client on the given inbound.
    async fn create(&self, inbound_id: i64, client: &ClientState) -> Result<()>;

    /// Overwrite the client stored under `identity` in a single call.
    async fn update(&self, inbound_id: i64, identity: &str, client: &ClientState) -> Result<()>;
}
