pub mod promo_service;
pub mod request_service;
pub mod subscription_service;
pub mod workflow_service;
