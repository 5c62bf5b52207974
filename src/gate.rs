use crate::cache::CacheSnapshot;

/// Before any payload-class tool runs, the crawler must have completed and
/// produced at least one endpoint (spec.md §4.10). A read-only view over a
/// cache snapshot -- never mutated directly, never consulted for anything
/// but payload-class tools.
pub fn crawler_gate_ready(cache: &CacheSnapshot) -> bool {
    cache.crawler_completed && !cache.endpoints.is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::DiscoveryCache;

    #[test]
    fn closed_until_crawler_completes_with_endpoints() {
        let cache = DiscoveryCache::new();
        assert!(!crawler_gate_ready(&cache.snapshot()));

        cache.mark_crawler_completed();
        assert!(!crawler_gate_ready(&cache.snapshot()), "completed but zero endpoints still blocks");

        cache.add_endpoint("/search");
        assert!(crawler_gate_ready(&cache.snapshot()));
    }

    #[test]
    fn endpoints_without_completion_stay_closed() {
        let cache = DiscoveryCache::new();
        cache.add_endpoint("/search");
        assert!(!crawler_gate_ready(&cache.snapshot()));
    }
}
