use std::collections::BTreeMap;
use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::tools::registry::ToolCategory;

/// Bounds how many tool runs execute at once, both overall and per
/// category (spec.md §5). Adapted from the teacher's semaphore-gated
/// `ConcurrentProbe`, generalized from "one global limiter" to "a global
/// limiter plus a tighter ceiling for categories that misbehave under
/// concurrency" -- nmap scans against the same host contend for the same
/// raw socket and skew each other's timing, so the port-scan category
/// gets its own semaphore.
pub struct ConcurrencyGate {
    global: Arc<Semaphore>,
    per_category: BTreeMap<ToolCategory, Arc<Semaphore>>,
}

/// Held for the lifetime of one tool run. Dropping it releases the
/// global slot and, if one was taken, the category slot.
pub struct ConcurrencyPermit {
    _global: OwnedSemaphorePermit,
    _category: Option<OwnedSemaphorePermit>,
}

impl ConcurrencyGate {
    pub fn new(global_concurrency: usize, nmap_concurrency: usize) -> Self {
        let mut per_category = BTreeMap::new();
        per_category.insert(
            ToolCategory::PortScan,
            Arc::new(Semaphore::new(nmap_concurrency.max(1))),
        );
        Self {
            global: Arc::new(Semaphore::new(global_concurrency.max(1))),
            per_category,
        }
    }

    /// Acquire a slot for a tool run in `category`. Resolves once both the
    /// global ceiling and (when one applies) the category ceiling have a
    /// free slot.
    pub async fn acquire(&self, category: ToolCategory) -> ConcurrencyPermit {
        let global = self
            .global
            .clone()
            .acquire_owned()
            .await
            .expect("global semaphore is never closed");
        let category_permit = match self.per_category.get(&category) {
            Some(sem) => Some(
                sem.clone()
                    .acquire_owned()
                    .await
                    .expect("category semaphore is never closed"),
            ),
            None => None,
        };
        ConcurrencyPermit { _global: global, _category: category_permit }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn global_ceiling_limits_concurrent_holders() {
        let gate = Arc::new(ConcurrencyGate::new(2, 2));
        let in_flight = Arc::new(AtomicUsize::new(0));
        let max_observed = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..6 {
            let gate = gate.clone();
            let in_flight = in_flight.clone();
            let max_observed = max_observed.clone();
            handles.push(tokio::spawn(async move {
                let _permit = gate.acquire(ToolCategory::Dns).await;
                let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                max_observed.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(20)).await;
                in_flight.fetch_sub(1, Ordering::SeqCst);
            }));
        }
        for h in handles {
            h.await.unwrap();
        }
        assert!(max_observed.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test]
    async fn nmap_category_has_its_own_tighter_ceiling() {
        let gate = Arc::new(ConcurrencyGate::new(8, 1));
        let in_flight = Arc::new(AtomicUsize::new(0));
        let max_observed = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..4 {
            let gate = gate.clone();
            let in_flight = in_flight.clone();
            let max_observed = max_observed.clone();
            handles.push(tokio::spawn(async move {
                let _permit = gate.acquire(ToolCategory::PortScan).await;
                let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                max_observed.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(20)).await;
                in_flight.fetch_sub(1, Ordering::SeqCst);
            }));
        }
        for h in handles {
            h.await.unwrap();
        }
        assert_eq!(max_observed.load(Ordering::SeqCst), 1);
    }
}
