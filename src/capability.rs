use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// The closed signal vocabulary (spec.md §3). Every `requires`/`optional`/
/// `produces` set in the ledger is drawn from this enum -- there is no
/// stringly-typed capability name anywhere in the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    WebTarget,
    Https,
    Reachable,
    PortsKnown,
    DnsResolved,
    EndpointsKnown,
    LiveEndpoints,
    ParamsKnown,
    ReflectableParams,
    SqlInjectableParams,
    CmdInjectableParams,
    TechStackDetected,
    WordpressDetected,
    TlsEvaluated,
    SubdomainsKnown,
    CrawlerCompleted,
}

pub type CapabilitySet = BTreeSet<Capability>;

/// Every capability in the closed vocabulary, in declaration order. Used
/// by the Scan Orchestrator to report which capabilities a scan never
/// reached.
pub const ALL_CAPABILITIES: &[Capability] = &[
    Capability::WebTarget,
    Capability::Https,
    Capability::Reachable,
    Capability::PortsKnown,
    Capability::DnsResolved,
    Capability::EndpointsKnown,
    Capability::LiveEndpoints,
    Capability::ParamsKnown,
    Capability::ReflectableParams,
    Capability::SqlInjectableParams,
    Capability::CmdInjectableParams,
    Capability::TechStackDetected,
    Capability::WordpressDetected,
    Capability::TlsEvaluated,
    Capability::SubdomainsKnown,
    Capability::CrawlerCompleted,
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_capabilities_lists_every_variant_exactly_once() {
        let set: CapabilitySet = ALL_CAPABILITIES.iter().copied().collect();
        assert_eq!(set.len(), ALL_CAPABILITIES.len());
        assert_eq!(ALL_CAPABILITIES.len(), 16);
    }
}
