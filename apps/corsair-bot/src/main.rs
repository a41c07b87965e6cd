use std::sync::Arc;

use dotenvy::dotenv;
use teloxide::prelude::*;

mod bot;
mod config;
mod notifier;
mod state;
mod xui_client;

use corsair_core::services::promo_service::PromoService;
use corsair_core::services::request_service::RequestService;
use corsair_core::services::subscription_service::SubscriptionService;
use corsair_core::services::workflow_service::RequestWorkflow;
use corsair_core::JsonStore;

use crate::config::Config;
use crate::notifier::TelegramNotifier;
use crate::state::AppState;
use crate::xui_client::XuiClient;

#[tokio::main]
async fn main() {
    dotenv().ok();
    env_logger::init();

    log::info!("Starting Corsair Bot...");

    let cfg = Config::from_env();

    let panel = match XuiClient::new(&cfg.xui) {
        Ok(panel) => panel,
        Err(e) => {
            log::error!("CRITICAL: failed to build panel client: {:#}", e);
            return;
        }
    };
    if let Err(e) = panel.login().await {
        log::error!("CRITICAL: failed to login to panel: {:#}", e);
        return;
    }
    log::info!("Panel session established at {}", cfg.xui.host);

    let bot = Bot::new(cfg.bot_token.clone());

    let promos = PromoService::new(JsonStore::new(&cfg.promocodes_file));
    let requests = RequestService::new(JsonStore::new(&cfg.requests_file));
    let subscriptions = SubscriptionService::new(
        JsonStore::new(&cfg.users_file),
        promos.clone(),
        Arc::new(panel),
        cfg.xui.inbound_id,
        cfg.xui.subscription_prefix.clone(),
    );
    let workflow = RequestWorkflow::new(
        requests.clone(),
        Arc::new(TelegramNotifier::new(bot.clone())),
    );

    let state = AppState {
        cfg,
        promos,
        requests,
        subscriptions,
        workflow,
    };

    // Placeholder shutdown channel, wired to a signal handler later.
    let (_tx, rx) = tokio::sync::broadcast::channel(1);

    bot::run_bot(bot, rx, state).await;
}
