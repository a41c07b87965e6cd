use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use corsair_core::models::client::ClientState;
use corsair_core::PanelClient;

use crate::config::XuiConfig;

/// HTTP adapter for the 3x-ui panel. Authentication is a session cookie
/// obtained by `login`, kept by the reqwest cookie store.
#[derive(Clone)]
pub struct XuiClient {
    client: Client,
    base_url: String,
    username: String,
    password: String,
    inbound_id: i64,
}

impl XuiClient {
    pub fn new(cfg: &XuiConfig) -> Result<Self> {
        let client = Client::builder()
            .cookie_store(true)
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            client,
            base_url: cfg.host.trim_end_matches('/').to_string(),
            username: cfg.username.clone(),
            password: cfg.password.clone(),
            inbound_id: cfg.inbound_id,
        })
    }

    /// Opens the panel session. Called once at startup; the process does
    /// not start without a working panel connection.
    pub async fn login(&self) -> Result<()> {
        let url = format!("{}/login", self.base_url);
        let resp = self
            .client
            .post(&url)
            .form(&[
                ("username", self.username.as_str()),
                ("password", self.password.as_str()),
            ])
            .send()
            .await
            .context("panel login request failed")?;

        if !resp.status().is_success() {
            return Err(anyhow::anyhow!("panel login failed: {}", resp.status()));
        }
        let envelope: ApiEnvelope<serde_json::Value> = resp.json().await?;
        if !envelope.success {
            return Err(anyhow::anyhow!(
                "panel rejected credentials: {}",
                envelope.msg
            ));
        }
        Ok(())
    }

    async fn fetch_settings_client(&self, identity: &str) -> Result<Option<WireClient>> {
        let url = format!(
            "{}/panel/api/inbounds/get/{}",
            self.base_url, self.inbound_id
        );
        let resp = self.client.get(&url).send().await?;
        if !resp.status().is_success() {
            return Err(anyhow::anyhow!("inbound fetch failed: {}", resp.status()));
        }
        let envelope: ApiEnvelope<InboundObj> = resp.json().await?;
        if !envelope.success {
            return Err(anyhow::anyhow!("inbound fetch refused: {}", envelope.msg));
        }
        let Some(inbound) = envelope.obj else {
            return Ok(None);
        };

        // The panel embeds the client list as a JSON string inside the
        // inbound object.
        let settings: InboundSettings =
            serde_json::from_str(&inbound.settings).context("invalid inbound settings")?;
        Ok(settings.clients.into_iter().find(|c| c.email == identity))
    }

    async fn fetch_traffic(&self, identity: &str) -> Result<(i64, i64)> {
        let url = format!(
            "{}/panel/api/inbounds/getClientTraffics/{}",
            self.base_url, identity
        );
        let resp = self.client.get(&url).send().await?;
        if !resp.status().is_success() {
            return Err(anyhow::anyhow!("traffic fetch failed: {}", resp.status()));
        }
        let envelope: ApiEnvelope<WireTraffic> = resp.json().await?;
        Ok(envelope.obj.map(|t| (t.up, t.down)).unwrap_or((0, 0)))
    }

    async fn post_ok<B: Serialize>(&self, path: &str, body: &B) -> Result<()> {
        let url = format!("{}{}", self.base_url, path);
        let resp = self.client.post(&url).json(body).send().await?;
        if !resp.status().is_success() {
            return Err(anyhow::anyhow!("request failed: {}", resp.status()));
        }
        let envelope: ApiEnvelope<serde_json::Value> = resp.json().await?;
        if !envelope.success {
            return Err(anyhow::anyhow!("panel refused {}: {}", path, envelope.msg));
        }
        Ok(())
    }

    fn client_payload(inbound_id: i64, client: &ClientState) -> Result<AddClientRequest> {
        let settings = InboundSettings {
            clients: vec![WireClient::from_state(client)],
        };
        Ok(AddClientRequest {
            id: inbound_id,
            settings: serde_json::to_string(&settings)?,
        })
    }
}

#[async_trait]
impl PanelClient for XuiClient {
    async fn find_by_identity(&self, identity: &str) -> Result<Option<ClientState>> {
        let Some(wire) = self.fetch_settings_client(identity).await? else {
            return Ok(None);
        };
        let (up, down) = self.fetch_traffic(identity).await?;
        Ok(Some(wire.into_state(up, down)))
    }

    async fn create(&self, inbound_id: i64, client: &ClientState) -> Result<()> {
        let payload = Self::client_payload(inbound_id, client)?;
        self.post_ok("/panel/api/inbounds/addClient", &payload).await
    }

    async fn update(&self, inbound_id: i64, identity: &str, client: &ClientState) -> Result<()> {
        let payload = Self::client_payload(inbound_id, client)?;
        let path = format!("/panel/api/inbounds/updateClient/{}", identity);
        self.post_ok(&path, &payload).await
    }
}

#[derive(Deserialize)]
struct ApiEnvelope<T> {
    success: bool,
    #[serde(default)]
    msg: String,
    obj: Option<T>,
}

#[derive(Deserialize)]
struct InboundObj {
    settings: String,
}

#[derive(Serialize, Deserialize)]
struct InboundSettings {
    #[serde(default)]
    clients: Vec<WireClient>,
}

#[derive(Serialize)]
struct AddClientRequest {
    id: i64,
    settings: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireClient {
    id: String,
    email: String,
    enable: bool,
    #[serde(default)]
    expiry_time: i64,
    #[serde(default)]
    flow: String,
    #[serde(default)]
    limit_ip: i64,
    #[serde(default)]
    sub_id: String,
    // Despite the name, the panel counts this field in bytes.
    #[serde(default, rename = "totalGB")]
    total_gb: i64,
}

#[derive(Deserialize, Default)]
#[serde(default, rename_all = "camelCase")]
struct WireTraffic {
    up: i64,
    down: i64,
}

impl WireClient {
    fn from_state(state: &ClientState) -> Self {
        Self {
            id: state.identity.clone(),
            email: state.identity.clone(),
            enable: state.enable,
            expiry_time: state.expiry_time,
            flow: state.flow.clone(),
            limit_ip: state.device_limit,
            sub_id: state.sub_tag.clone(),
            total_gb: state.total_bytes,
        }
    }

    fn into_state(self, up: i64, down: i64) -> ClientState {
        ClientState {
            identity: self.email,
            enable: self.enable,
            expiry_time: self.expiry_time,
            device_limit: self.limit_ip,
            total_bytes: self.total_gb,
            up,
            down,
            flow: self.flow,
            sub_tag: self.sub_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_client_round_trips_state() {
        let state = ClientState {
            identity: "vpn_10".into(),
            enable: true,
            expiry_time: 1_700_000_000_000,
            device_limit: 3,
            total_bytes: 0,
            up: 11,
            down: 22,
            flow: "xtls-rprx-vision".into(),
            sub_tag: "sub_10".into(),
        };
        let wire = WireClient::from_state(&state);
        assert_eq!(wire.email, "vpn_10");
        assert_eq!(wire.id, "vpn_10");
        assert_eq!(wire.into_state(11, 22), state);
    }

    #[test]
    fn wire_client_uses_panel_field_names() {
        let wire = WireClient {
            id: "vpn_10".into(),
            email: "vpn_10".into(),
            enable: true,
            expiry_time: 5,
            flow: String::new(),
            limit_ip: 2,
            sub_id: "sub_10".into(),
            total_gb: 0,
        };
        let json = serde_json::to_value(&wire).unwrap();
        assert_eq!(json["expiryTime"], 5);
        assert_eq!(json["limitIp"], 2);
        assert_eq!(json["subId"], "sub_10");
        assert!(json.get("totalGB").is_some());
    }
}
