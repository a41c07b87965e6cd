use tracing::{error, info, warn};
use uuid::Uuid;

use crate::models::request::{Request, RequestStatus};
use crate::store::JsonStore;

/// Ledger of subscription requests, kept in insertion order.
#[derive(Clone)]
pub struct RequestService {
    store: JsonStore<Request>,
}

impl RequestService {
    pub fn new(store: JsonStore<Request>) -> Self {
        Self { store }
    }

    /// Request ids come from a randomized space rather than a counter, so
    /// they stay unique across restarts without a sequence authority.
    pub fn generate_id(&self) -> String {
        Uuid::new_v4().to_string()
    }

    pub async fn create(&self, request: Request) -> bool {
        let id = request.request_id.clone();
        let user_id = request.user_id;
        match self.store.modify(|requests| requests.push(request)).await {
            Ok(()) => {
                info!("request {} from user {} created", id, user_id);
                true
            }
            Err(e) => {
                error!("failed to create request {}: {:#}", id, e);
                false
            }
        }
    }

    pub async fn get(&self, request_id: &str) -> Option<Request> {
        let requests = match self.store.read_all().await {
            Ok(requests) => requests,
            Err(e) => {
                error!("failed to read request ledger: {:#}", e);
                return None;
            }
        };
        requests.into_iter().find(|r| r.request_id == request_id)
    }

    pub async fn update_status(&self, request_id: &str, new_status: RequestStatus) -> bool {
        let outcome = self
            .store
            .modify(|requests| {
                if let Some(request) = requests.iter_mut().find(|r| r.request_id == request_id) {
                    request.status = new_status;
                    true
                } else {
                    false
                }
            })
            .await;

        match outcome {
            Ok(true) => {
                info!("request {} moved to {}", request_id, new_status.as_str());
                true
            }
            Ok(false) => {
                warn!("request {} not found for status update", request_id);
                false
            }
            Err(e) => {
                error!("failed to update request {}: {:#}", request_id, e);
                false
            }
        }
    }

    /// Unfiltered when `status_filter` is `None`; always in the order the
    /// requests were created, not timestamp-sorted.
    pub async fn list(&self, status_filter: Option<RequestStatus>) -> Vec<Request> {
        let requests = match self.store.read_all().await {
            Ok(requests) => requests,
            Err(e) => {
                error!("failed to list requests: {:#}", e);
                return Vec::new();
            }
        };
        match status_filter {
            Some(status) => requests.into_iter().filter(|r| r.status == status).collect(),
            None => requests,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Map, Value};

    fn service(dir: &tempfile::TempDir) -> RequestService {
        RequestService::new(JsonStore::new(dir.path().join("requests.json")))
    }

    fn details(text: &str) -> Map<String, Value> {
        let mut map = Map::new();
        map.insert("message".into(), Value::String(text.into()));
        map
    }

    fn request(service: &RequestService, user_id: i64, text: &str, timestamp: i64) -> Request {
        Request {
            request_id: service.generate_id(),
            user_id,
            details: details(text),
            status: RequestStatus::Pending,
            timestamp,
        }
    }

    #[tokio::test]
    async fn created_requests_start_pending() {
        let dir = tempfile::tempdir().unwrap();
        let requests = service(&dir);

        let req = request(&requests, 100, "two devices please", 1);
        let id = req.request_id.clone();
        assert!(requests.create(req).await);

        let fetched = requests.get(&id).await.unwrap();
        assert_eq!(fetched.status, RequestStatus::Pending);
        assert_eq!(fetched.user_id, 100);
        assert_eq!(fetched.details["message"], "two devices please");
    }

    #[tokio::test]
    async fn update_status_requires_existing_id() {
        let dir = tempfile::tempdir().unwrap();
        let requests = service(&dir);

        assert!(!requests.update_status("no-such-id", RequestStatus::Completed).await);

        let req = request(&requests, 7, "hello", 1);
        let id = req.request_id.clone();
        requests.create(req).await;
        assert!(requests.update_status(&id, RequestStatus::Completed).await);
        assert_eq!(
            requests.get(&id).await.unwrap().status,
            RequestStatus::Completed
        );
    }

    #[tokio::test]
    async fn list_filters_by_status_in_creation_order() {
        let dir = tempfile::tempdir().unwrap();
        let requests = service(&dir);

        // Timestamps deliberately out of order to pin down insertion order.
        let first = request(&requests, 1, "first", 300);
        let second = request(&requests, 2, "second", 100);
        let third = request(&requests, 3, "third", 200);
        let second_id = second.request_id.clone();

        requests.create(first).await;
        requests.create(second).await;
        requests.create(third).await;
        requests
            .update_status(&second_id, RequestStatus::Completed)
            .await;

        let pending = requests.list(Some(RequestStatus::Pending)).await;
        let users: Vec<i64> = pending.iter().map(|r| r.user_id).collect();
        assert_eq!(users, vec![1, 3]);

        assert_eq!(requests.list(None).await.len(), 3);
    }

    #[tokio::test]
    async fn generated_ids_are_unique() {
        let dir = tempfile::tempdir().unwrap();
        let requests = service(&dir);

        let a = requests.generate_id();
        let b = requests.generate_id();
        assert_ne!(a, b);
    }
}
