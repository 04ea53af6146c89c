use std::{collections::HashMap, sync::Arc};

use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::db_types::SellerId;

/// Per-seller mutual exclusion for the compliance-critical flows.
///
/// Deposit-gate evaluation and the payout-eligibility writer both read several rows and then
/// write a verdict based on them. Two concurrent evaluations for the *same* seller could
/// interleave those reads and writes, so the backend leases a lock per seller around each such
/// flow. Flows for different sellers never contend.
#[derive(Clone, Default)]
pub struct SellerLocks {
    locks: Arc<Mutex<HashMap<SellerId, Arc<Mutex<()>>>>>,
}

impl SellerLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire the lock for `seller_id`, creating it on first use. The returned guard releases
    /// the lock on drop.
    pub async fn lease(&self, seller_id: SellerId) -> OwnedMutexGuard<()> {
        let lock = {
            let mut map = self.locks.lock().await;
            Arc::clone(map.entry(seller_id).or_insert_with(|| Arc::new(Mutex::new(()))))
        };
        lock.lock_owned().await
    }
}

#[cfg(test)]
mod test {
    use std::sync::{
        atomic::{AtomicBool, AtomicI64, Ordering},
        Arc,
    };

    use super::*;

    #[tokio::test]
    async fn same_seller_is_serialized() {
        let locks = SellerLocks::new();
        let in_flight = Arc::new(AtomicBool::new(false));
        let overlaps = Arc::new(AtomicI64::new(0));
        let mut handles = Vec::new();
        for _ in 0..8 {
            let locks = locks.clone();
            let in_flight = in_flight.clone();
            let overlaps = overlaps.clone();
            handles.push(tokio::spawn(async move {
                let _guard = locks.lease(SellerId(1)).await;
                if in_flight.swap(true, Ordering::SeqCst) {
                    overlaps.fetch_add(1, Ordering::SeqCst);
                }
                tokio::time::sleep(tokio::time::Duration::from_millis(5)).await;
                in_flight.store(false, Ordering::SeqCst);
            }));
        }
        for h in handles {
            h.await.unwrap();
        }
        assert_eq!(overlaps.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn different_sellers_do_not_contend() {
        let locks = SellerLocks::new();
        let _a = locks.lease(SellerId(1)).await;
        // Leasing a different seller while the first lease is held must not deadlock.
        let _b = locks.lease(SellerId(2)).await;
    }
}
