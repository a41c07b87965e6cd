use std::sync::Arc;

use chrono::{Duration, Utc};
use tracing::{debug, error, info, warn};

use crate::models::client::{ClientState, ClientSummary};
use crate::models::user::{derive_identity, User};
use crate::panel::PanelClient;
use crate::services::promo_service::PromoService;
use crate::store::JsonStore;

const DEFAULT_FLOW: &str = "xtls-rprx-vision";
const PROMO_DEFAULT_DEVICES: i64 = 1;

/// Translates subscription change intents into panel calls.
///
/// Owns the merge-vs-replace policy: device grants can add to or discard
/// the existing limit, and extensions never shorten a running
/// subscription. The panel's client object is fetched, rewritten in
/// memory and written back in one call, never cached.
#[derive(Clone)]
pub struct SubscriptionService {
    users: JsonStore<User>,
    promos: PromoService,
    panel: Arc<dyn PanelClient>,
    inbound_id: i64,
    sub_prefix: String,
}

impl SubscriptionService {
    pub fn new(
        users: JsonStore<User>,
        promos: PromoService,
        panel: Arc<dyn PanelClient>,
        inbound_id: i64,
        sub_prefix: impl Into<String>,
    ) -> Self {
        Self {
            users,
            promos,
            panel,
            inbound_id,
            sub_prefix: sub_prefix.into(),
        }
    }

    pub async fn get_user(&self, user_id: i64) -> Option<User> {
        let users = match self.users.read_all().await {
            Ok(users) => users,
            Err(e) => {
                error!("failed to read user mappings: {:#}", e);
                return None;
            }
        };
        users.into_iter().find(|u| u.user_id == user_id)
    }

    /// Find-or-create of the local user mapping; the assigned identity is
    /// stable across calls.
    pub async fn ensure_user_record(&self, user_id: i64) -> Option<User> {
        let outcome = self
            .users
            .modify(|users| {
                if let Some(user) = users.iter().find(|u| u.user_id == user_id) {
                    return user.clone();
                }
                let user = User::derive(user_id);
                users.push(user.clone());
                user
            })
            .await;

        match outcome {
            Ok(user) => Some(user),
            Err(e) => {
                error!("failed to persist user mapping for {}: {:#}", user_id, e);
                None
            }
        }
    }

    /// Registers a brand-new client: requested device limit, expiry
    /// `now + duration_days`, unlimited traffic.
    pub async fn create_client(&self, user: &User, devices: i64, duration_days: i64) -> bool {
        info!(
            "creating client {} with {} devices for {} days",
            user.vpn_identity, devices, duration_days
        );
        let client = ClientState {
            identity: user.vpn_identity.clone(),
            enable: true,
            expiry_time: add_days(now_ms(), duration_days),
            device_limit: devices,
            total_bytes: 0,
            up: 0,
            down: 0,
            flow: DEFAULT_FLOW.to_string(),
            sub_tag: self.sub_tag(user),
        };
        match self.panel.create(self.inbound_id, &client).await {
            Ok(()) => true,
            Err(e) => {
                error!("failed to create client {}: {:#}", user.vpn_identity, e);
                false
            }
        }
    }

    /// Rewrites an existing client. With `replace_devices` unset the grant
    /// adds to the current device limit; with `replace_duration` unset the
    /// new expiry counts from `max(current expiry, now)`, so extending a
    /// lapsed subscription starts from now rather than the stale past.
    pub async fn update_client(
        &self,
        user: &User,
        devices: i64,
        duration_days: i64,
        replace_devices: bool,
        replace_duration: bool,
    ) -> bool {
        let current = match self.panel.find_by_identity(&user.vpn_identity).await {
            Ok(Some(client)) => client,
            Ok(None) => {
                debug!("client {} not found for update", user.vpn_identity);
                return false;
            }
            Err(e) => {
                error!("failed to fetch client {}: {:#}", user.vpn_identity, e);
                return false;
            }
        };

        let device_limit = if replace_devices {
            devices
        } else {
            current.device_limit + devices
        };

        let now = now_ms();
        let base = if replace_duration {
            now
        } else {
            current.expiry_time.max(now)
        };

        let updated = ClientState {
            identity: user.vpn_identity.clone(),
            enable: true,
            expiry_time: add_days(base, duration_days),
            device_limit,
            total_bytes: 0,
            up: current.up,
            down: current.down,
            flow: DEFAULT_FLOW.to_string(),
            sub_tag: self.sub_tag(user),
        };

        match self
            .panel
            .update(self.inbound_id, &user.vpn_identity, &updated)
            .await
        {
            Ok(()) => {
                info!(
                    "client {} updated: {} devices, expiry {}",
                    user.vpn_identity, device_limit, updated.expiry_time
                );
                true
            }
            Err(e) => {
                error!("failed to update client {}: {:#}", user.vpn_identity, e);
                false
            }
        }
    }

    /// Manual admin-approved provisioning: creates the client if absent,
    /// otherwise resets both device limit and duration to the requested
    /// values.
    pub async fn provision_or_extend(&self, user_id: i64, devices: i64, duration_days: i64) -> bool {
        let user = match self.ensure_user_record(user_id).await {
            Some(user) => user,
            None => return false,
        };

        match self.panel.find_by_identity(&user.vpn_identity).await {
            Ok(Some(_)) => self.update_client(&user, devices, duration_days, true, true).await,
            Ok(None) => self.create_client(&user, devices, duration_days).await,
            Err(e) => {
                error!("failed to check client {}: {:#}", user.vpn_identity, e);
                false
            }
        }
    }

    /// Extension for an already-known user: device limit is replaced,
    /// duration is added on top of whatever remains.
    pub async fn extend(&self, user_id: i64, devices: i64, duration_days: i64) -> bool {
        let user = match self.get_user(user_id).await {
            Some(user) => user,
            None => {
                warn!("user {} unknown, nothing to extend", user_id);
                return false;
            }
        };
        self.update_client(&user, devices, duration_days, true, false)
            .await
    }

    /// Redeems a promo code for the user. The code is consumed only after
    /// the panel mutation succeeds, so a failed provisioning attempt never
    /// burns the code.
    pub async fn apply_promocode(&self, user_id: i64, code: &str) -> bool {
        let promo = match self.promos.lookup(code).await {
            Some(promo) => promo,
            None => {
                warn!("promo code {} invalid or spent", code);
                return false;
            }
        };

        let user = match self.ensure_user_record(user_id).await {
            Some(user) => user,
            None => return false,
        };

        let existing = match self.panel.find_by_identity(&user.vpn_identity).await {
            Ok(existing) => existing.is_some(),
            Err(e) => {
                error!("failed to check client {}: {:#}", user.vpn_identity, e);
                return false;
            }
        };

        let applied = if existing {
            // Duration stacks on the running subscription; the device
            // count is left untouched.
            self.update_client(&user, 0, promo.duration_days, false, false)
                .await
        } else {
            self.create_client(&user, PROMO_DEFAULT_DEVICES, promo.duration_days)
                .await
        };

        if !applied {
            warn!("promo code {} not applied for user {}", code, user_id);
            return false;
        }

        if !self.promos.redeem(code).await {
            // The grant went through; losing the race on consumption is
            // logged but not unwound.
            warn!("promo code {} consumed concurrently after grant", code);
        }
        info!("promo code {} applied for user {}", code, user_id);
        true
    }

    /// Sentinel-normalized view of the user's panel state, or `None` when
    /// no client exists.
    pub async fn client_summary(&self, user_id: i64) -> Option<ClientSummary> {
        let identity = match self.get_user(user_id).await {
            Some(user) => user.vpn_identity,
            None => derive_identity(user_id),
        };

        match self.panel.find_by_identity(&identity).await {
            Ok(Some(client)) => Some(ClientSummary::from_state(&client)),
            Ok(None) => None,
            Err(e) => {
                error!("failed to fetch client {}: {:#}", identity, e);
                None
            }
        }
    }

    fn sub_tag(&self, user: &User) -> String {
        format!("{}{}", self.sub_prefix, user.user_id)
    }
}

fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

fn add_days(timestamp_ms: i64, days: i64) -> i64 {
    timestamp_ms + Duration::days(days).num_milliseconds()
}
