use tracing::{error, info, warn};

use crate::models::promo::Promocode;
use crate::store::JsonStore;

/// Ledger of single-use promo codes.
///
/// Every operation re-reads the full ledger; the store's lock keeps
/// concurrent redemptions of the same code from both succeeding.
#[derive(Clone)]
pub struct PromoService {
    store: JsonStore<Promocode>,
}

impl PromoService {
    pub fn new(store: JsonStore<Promocode>) -> Self {
        Self { store }
    }

    /// Returns the code only if it exists and is still active. Callers
    /// cannot tell a spent code from one that never existed.
    pub async fn lookup(&self, code: &str) -> Option<Promocode> {
        let codes = match self.store.read_all().await {
            Ok(codes) => codes,
            Err(e) => {
                error!("failed to read promo ledger: {:#}", e);
                return None;
            }
        };
        codes.into_iter().find(|p| p.code == code && p.active)
    }

    /// Consumes an active code. Exactly one of any set of concurrent
    /// redemptions of the same code wins.
    pub async fn redeem(&self, code: &str) -> bool {
        let outcome = self
            .store
            .modify(|codes| {
                if let Some(promo) = codes.iter_mut().find(|p| p.code == code && p.active) {
                    promo.active = false;
                    true
                } else {
                    false
                }
            })
            .await;

        match outcome {
            Ok(true) => {
                info!("promo code {} redeemed", code);
                true
            }
            Ok(false) => {
                warn!("promo code {} is inactive or unknown", code);
                false
            }
            Err(e) => {
                error!("failed to redeem promo code {}: {:#}", code, e);
                false
            }
        }
    }

    /// Codes are never reused: adding fails if the code exists in any
    /// state, active or not.
    pub async fn add(&self, code: &str, duration_days: i64) -> bool {
        let outcome = self
            .store
            .modify(|codes| {
                if codes.iter().any(|p| p.code == code) {
                    false
                } else {
                    codes.push(Promocode::new(code, duration_days));
                    true
                }
            })
            .await;

        match outcome {
            Ok(true) => {
                info!("promo code {} added ({} days)", code, duration_days);
                true
            }
            Ok(false) => {
                warn!("promo code {} already exists", code);
                false
            }
            Err(e) => {
                error!("failed to add promo code {}: {:#}", code, e);
                false
            }
        }
    }

    pub async fn remove(&self, code: &str) -> bool {
        let outcome = self
            .store
            .modify(|codes| {
                let before = codes.len();
                codes.retain(|p| p.code != code);
                codes.len() != before
            })
            .await;

        match outcome {
            Ok(true) => {
                info!("promo code {} removed", code);
                true
            }
            Ok(false) => {
                warn!("promo code {} not found for removal", code);
                false
            }
            Err(e) => {
                error!("failed to remove promo code {}: {:#}", code, e);
                false
            }
        }
    }

    /// Disables a code without marking it used.
    pub async fn deactivate(&self, code: &str) -> bool {
        let outcome = self
            .store
            .modify(|codes| {
                if let Some(promo) = codes.iter_mut().find(|p| p.code == code && p.active) {
                    promo.active = false;
                    true
                } else {
                    false
                }
            })
            .await;

        match outcome {
            Ok(true) => {
                info!("promo code {} deactivated", code);
                true
            }
            Ok(false) => {
                warn!("promo code {} already inactive or unknown", code);
                false
            }
            Err(e) => {
                error!("failed to deactivate promo code {}: {:#}", code, e);
                false
            }
        }
    }

    pub async fn list_all(&self) -> Vec<Promocode> {
        match self.store.read_all().await {
            Ok(codes) => codes,
            Err(e) => {
                error!("failed to list promo codes: {:#}", e);
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service(dir: &tempfile::TempDir) -> PromoService {
        PromoService::new(JsonStore::new(dir.path().join("promocodes.json")))
    }

    #[tokio::test]
    async fn add_rejects_duplicates() {
        let dir = tempfile::tempdir().unwrap();
        let promos = service(&dir);

        assert!(promos.add("WINTER30", 30).await);
        assert!(!promos.add("WINTER30", 60).await);
    }

    #[tokio::test]
    async fn lookup_hides_inactive_codes() {
        let dir = tempfile::tempdir().unwrap();
        let promos = service(&dir);

        promos.add("TRIAL7", 7).await;
        assert!(promos.lookup("TRIAL7").await.is_some());

        assert!(promos.deactivate("TRIAL7").await);
        assert!(promos.lookup("TRIAL7").await.is_none());
        assert!(promos.lookup("NOPE").await.is_none());

        // Still listed, just spent.
        let all = promos.list_all().await;
        assert_eq!(all.len(), 1);
        assert!(!all[0].active);
    }

    #[tokio::test]
    async fn redeem_is_single_use() {
        let dir = tempfile::tempdir().unwrap();
        let promos = service(&dir);

        promos.add("ONCE", 14).await;
        assert!(promos.redeem("ONCE").await);
        assert!(!promos.redeem("ONCE").await);
        assert!(promos.lookup("ONCE").await.is_none());
    }

    #[tokio::test]
    async fn concurrent_redemptions_yield_one_winner() {
        let dir = tempfile::tempdir().unwrap();
        let promos = service(&dir);
        promos.add("RACE", 30).await;

        let (a, b) = tokio::join!(promos.redeem("RACE"), promos.redeem("RACE"));
        assert!(a ^ b, "exactly one redemption must win, got ({}, {})", a, b);
        assert!(promos.lookup("RACE").await.is_none());
    }

    #[tokio::test]
    async fn remove_requires_presence() {
        let dir = tempfile::tempdir().unwrap();
        let promos = service(&dir);

        assert!(!promos.remove("GHOST").await);
        promos.add("GONE", 10).await;
        assert!(promos.remove("GONE").await);
        assert!(promos.list_all().await.is_empty());
    }

    #[tokio::test]
    async fn deactivate_happens_once() {
        let dir = tempfile::tempdir().unwrap();
        let promos = service(&dir);

        promos.add("OFF", 5).await;
        assert!(promos.deactivate("OFF").await);
        assert!(!promos.deactivate("OFF").await);
    }
}
