use std::collections::{BTreeMap, BTreeSet};

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::capability::{Capability, CapabilitySet};
use crate::profile::TargetProfile;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ParamSource {
    Crawled,
    FormInput,
    JsDetected,
    Url,
}

/// Hints a parser supplies when it observes a parameter, used to grow the
/// per-parameter classification monotonically (a parameter is reflectable
/// once any tool shows reflection, never un-reflectable again).
#[derive(Debug, Clone, Default)]
pub struct ClassificationHints {
    pub is_reflectable: bool,
    pub is_sql_candidate: bool,
    pub is_cmd_candidate: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParamInfo {
    pub sources: BTreeSet<ParamSource>,
    pub endpoints: BTreeSet<String>,
    pub is_reflectable: bool,
    pub is_sql_candidate: bool,
    pub is_cmd_candidate: bool,
}

/// One parser-produced mutation, applied by the Tool Runner under the
/// cache's write-lock (spec.md §4.8). Keeps parsers themselves pure: a
/// parser returns a list of these instead of touching the cache directly,
/// which is what makes `parse()` idempotent and trivially testable.
#[derive(Debug, Clone)]
pub enum CacheOp {
    AddEndpoint(String),
    AddLiveEndpoint(String),
    AddParam { name: String, source: ParamSource, endpoint: String, hints: ClassificationHints },
    AddPort(u16),
    AddReflection(String),
    AddSubdomain(String),
    AddTech(String),
    MarkTlsEvaluated,
    MarkCrawlerCompleted,
    MarkReachable,
    MarkDnsResolved,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct CacheData {
    endpoints: BTreeSet<String>,
    live_endpoints: BTreeSet<String>,
    parameters: BTreeMap<String, ParamInfo>,
    ports: BTreeSet<u16>,
    subdomains: BTreeSet<String>,
    reflections: BTreeSet<String>,
    tech_stack: BTreeSet<String>,
    tls_evaluated: bool,
    crawler_completed: bool,
    reachable: bool,
    dns_resolved: bool,
    wordpress_hint: bool,
}

/// Monotonically-growing signal store (spec.md §3, §4.2). The only shared
/// mutable state visible across concurrent tool runs: a single
/// `parking_lot::RwLock` gives writers exclusive access and lets the
/// Decision Layer take cheap, lock-free snapshots by value.
#[derive(Debug, Default)]
pub struct DiscoveryCache {
    data: RwLock<CacheData>,
}

/// A point-in-time, by-value view of the cache, taken under the read lock
/// and then released before any tool runs (spec.md §4.2, §9).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CacheSnapshot {
    pub endpoints: BTreeSet<String>,
    pub live_endpoints: BTreeSet<String>,
    pub parameters: BTreeMap<String, ParamInfo>,
    pub ports: BTreeSet<u16>,
    pub subdomains: BTreeSet<String>,
    pub tech_stack: BTreeSet<String>,
    pub tls_evaluated: bool,
    pub crawler_completed: bool,
    pub reachable: bool,
    pub dns_resolved: bool,
    pub wordpress_hint: bool,
}

impl DiscoveryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_endpoint(&self, endpoint: &str) {
        self.data.write().endpoints.insert(endpoint.to_string());
    }

    pub fn add_live_endpoint(&self, endpoint: &str) {
        let mut d = self.data.write();
        d.live_endpoints.insert(endpoint.to_string());
        d.endpoints.insert(endpoint.to_string());
    }

    pub fn add_param(
        &self,
        name: &str,
        source: ParamSource,
        endpoint: &str,
        hints: ClassificationHints,
    ) {
        let mut d = self.data.write();
        let entry = d.parameters.entry(name.to_string()).or_default();
        entry.sources.insert(source);
        entry.endpoints.insert(endpoint.to_string());
        entry.is_reflectable |= hints.is_reflectable;
        entry.is_sql_candidate |= hints.is_sql_candidate;
        entry.is_cmd_candidate |= hints.is_cmd_candidate;
        if hints.is_reflectable {
            d.reflections.insert(name.to_string());
        }
    }

    pub fn add_port(&self, port: u16) {
        self.data.write().ports.insert(port);
    }

    pub fn add_reflection(&self, param_name: &str) {
        let mut d = self.data.write();
        d.reflections.insert(param_name.to_string());
        if let Some(p) = d.parameters.get_mut(param_name) {
            p.is_reflectable = true;
        }
    }

    pub fn add_subdomain(&self, subdomain: &str) {
        self.data.write().subdomains.insert(subdomain.to_string());
    }

    pub fn add_tech(&self, tech: &str) {
        let mut d = self.data.write();
        d.tech_stack.insert(tech.to_string());
        if tech.eq_ignore_ascii_case("wordpress") {
            d.wordpress_hint = true;
        }
    }

    pub fn mark_tls_evaluated(&self) {
        self.data.write().tls_evaluated = true;
    }

    pub fn mark_crawler_completed(&self) {
        self.data.write().crawler_completed = true;
    }

    pub fn mark_reachable(&self) {
        self.data.write().reachable = true;
    }

    pub fn mark_dns_resolved(&self) {
        self.data.write().dns_resolved = true;
    }

    /// Apply a batch of parser-produced cache operations under a single
    /// write-lock acquisition (spec.md §4.6 step 5).
    pub fn apply(&self, ops: Vec<CacheOp>) {
        for op in ops {
            self.apply_one(op);
        }
    }

    fn apply_one(&self, op: CacheOp) {
        match op {
            CacheOp::AddEndpoint(e) => self.add_endpoint(&e),
            CacheOp::AddLiveEndpoint(e) => self.add_live_endpoint(&e),
            CacheOp::AddParam { name, source, endpoint, hints } => {
                self.add_param(&name, source, &endpoint, hints)
            }
            CacheOp::AddPort(p) => self.add_port(p),
            CacheOp::AddReflection(name) => self.add_reflection(&name),
            CacheOp::AddSubdomain(s) => self.add_subdomain(&s),
            CacheOp::AddTech(t) => self.add_tech(&t),
            CacheOp::MarkTlsEvaluated => self.mark_tls_evaluated(),
            CacheOp::MarkCrawlerCompleted => self.mark_crawler_completed(),
            CacheOp::MarkReachable => self.mark_reachable(),
            CacheOp::MarkDnsResolved => self.mark_dns_resolved(),
        }
    }

    pub fn snapshot(&self) -> CacheSnapshot {
        let d = self.data.read();
        CacheSnapshot {
            endpoints: d.endpoints.clone(),
            live_endpoints: d.live_endpoints.clone(),
            parameters: d.parameters.clone(),
            ports: d.ports.clone(),
            subdomains: d.subdomains.clone(),
            tech_stack: d.tech_stack.clone(),
            tls_evaluated: d.tls_evaluated,
            crawler_completed: d.crawler_completed,
            reachable: d.reachable,
            dns_resolved: d.dns_resolved,
            wordpress_hint: d.wordpress_hint,
        }
    }
}

impl CacheSnapshot {
    /// Pure function of the snapshot's fields (spec.md §4.2). Combined with
    /// the profile's own static capabilities (`web_target`, `https`) by the
    /// Decision Layer, which is the only caller that needs the full set.
    pub fn capabilities(&self, profile: &TargetProfile) -> CapabilitySet {
        let mut caps = CapabilitySet::new();

        if profile.is_web_target {
            caps.insert(Capability::WebTarget);
        }
        if profile.is_https {
            caps.insert(Capability::Https);
        }
        if self.reachable {
            caps.insert(Capability::Reachable);
        }
        if self.dns_resolved {
            caps.insert(Capability::DnsResolved);
        }
        if !self.endpoints.is_empty() {
            caps.insert(Capability::EndpointsKnown);
        }
        if !self.live_endpoints.is_empty() {
            caps.insert(Capability::LiveEndpoints);
        }
        if !self.parameters.is_empty() {
            caps.insert(Capability::ParamsKnown);
        }
        if self.parameters.values().any(|p| p.is_reflectable) {
            caps.insert(Capability::ReflectableParams);
        }
        if self.parameters.values().any(|p| p.is_sql_candidate) {
            caps.insert(Capability::SqlInjectableParams);
        }
        if self.parameters.values().any(|p| p.is_cmd_candidate) {
            caps.insert(Capability::CmdInjectableParams);
        }
        if !self.ports.is_empty() {
            caps.insert(Capability::PortsKnown);
        }
        if !self.tech_stack.is_empty() {
            caps.insert(Capability::TechStackDetected);
        }
        if self.wordpress_hint {
            caps.insert(Capability::WordpressDetected);
        }
        if self.tls_evaluated {
            caps.insert(Capability::TlsEvaluated);
        }
        if !self.subdomains.is_empty() {
            caps.insert(Capability::SubdomainsKnown);
        }
        if self.crawler_completed {
            caps.insert(Capability::CrawlerCompleted);
        }

        caps
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet as Set;

    fn web_profile() -> TargetProfile {
        TargetProfile::from_input("example.com", None, Set::new()).unwrap()
    }

    #[test]
    fn empty_cache_has_only_profile_capabilities() {
        let cache = DiscoveryCache::new();
        let caps = cache.snapshot().capabilities(&web_profile());
        assert!(caps.contains(&Capability::WebTarget));
        assert!(caps.contains(&Capability::Https));
        assert!(!caps.contains(&Capability::EndpointsKnown));
    }

    #[test]
    fn reflectable_param_sets_capability() {
        let cache = DiscoveryCache::new();
        cache.add_param(
            "q",
            ParamSource::Crawled,
            "/search",
            ClassificationHints { is_reflectable: true, ..Default::default() },
        );
        let caps = cache.snapshot().capabilities(&web_profile());
        assert!(caps.contains(&Capability::ParamsKnown));
        assert!(caps.contains(&Capability::ReflectableParams));
        assert!(!caps.contains(&Capability::SqlInjectableParams));
    }

    #[test]
    fn cache_is_monotonic() {
        let cache = DiscoveryCache::new();
        cache.add_endpoint("/a");
        cache.add_endpoint("/b");
        let snap1 = cache.snapshot();
        assert_eq!(snap1.endpoints.len(), 2);
        cache.add_endpoint("/a");
        let snap2 = cache.snapshot();
        assert_eq!(snap2.endpoints.len(), 2);
    }
}
