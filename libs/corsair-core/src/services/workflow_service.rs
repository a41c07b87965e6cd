use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::{error, info, warn};

use crate::models::request::{Request, RequestStatus};
use crate::notify::Notifier;
use crate::services::request_service::RequestService;

/// Drives a request through its lifecycle: created pending by the user,
/// completed once an administrator's reply reaches them.
#[derive(Clone)]
pub struct RequestWorkflow {
    requests: RequestService,
    notifier: Arc<dyn Notifier>,
}

impl RequestWorkflow {
    pub fn new(requests: RequestService, notifier: Arc<dyn Notifier>) -> Self {
        Self { requests, notifier }
    }

    /// Records a pending request and returns its fresh id. Manual
    /// requests wait for a human decision; nothing is provisioned here.
    pub async fn submit_request(&self, user_id: i64, details: Map<String, Value>) -> Option<String> {
        let request = Request {
            request_id: self.requests.generate_id(),
            user_id,
            details,
            status: RequestStatus::Pending,
            timestamp: chrono::Utc::now().timestamp_millis(),
        };
        let id = request.request_id.clone();
        if self.requests.create(request).await {
            Some(id)
        } else {
            None
        }
    }

    /// Delivers the admin's reply, then marks the request completed. If
    /// delivery fails the request stays pending so the failure remains
    /// visible; the send and the status write are not one transaction.
    pub async fn respond(&self, request_id: &str, message: &str) -> bool {
        let request = match self.requests.get(request_id).await {
            Some(request) => request,
            None => {
                warn!("request {} not found", request_id);
                return false;
            }
        };

        if let Err(e) = self.notifier.send(request.user_id, message).await {
            error!(
                "failed to notify user {} for request {}: {:#}",
                request.user_id, request_id, e
            );
            return false;
        }

        let completed = self
            .requests
            .update_status(request_id, RequestStatus::Completed)
            .await;
        if completed {
            info!(
                "request {} answered, user {} notified",
                request_id, request.user_id
            );
        }
        completed
    }
}
