use corsair_core::services::promo_service::PromoService;
use corsair_core::services::request_service::RequestService;
use corsair_core::services::subscription_service::SubscriptionService;
use corsair_core::services::workflow_service::RequestWorkflow;

use crate::config::Config;

#[derive(Clone)]
pub struct AppState {
    pub cfg: Config,
    pub promos: PromoService,
    pub requests: RequestService,
    pub subscriptions: SubscriptionService,
    pub workflow: RequestWorkflow,
}
