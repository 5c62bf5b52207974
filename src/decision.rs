use serde::{Deserialize, Serialize};

use crate::cache::CacheSnapshot;
use crate::ledger::{Ledger, LedgerOutcome};
use crate::profile::TargetProfile;
use crate::tools::registry::ToolId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunDecision {
    Block,
    Skip,
    Allow,
}

/// Pure function mapping (ledger, cache snapshot, profile, budget, gate
/// readiness) to a run decision (spec.md §4.5). Same inputs always produce
/// the same output (P9) -- there is no clock read, no RNG, no I/O here.
pub fn should_run(
    tool: ToolId,
    ledger: &Ledger,
    cache: &CacheSnapshot,
    profile: &TargetProfile,
    remaining_budget_s: u64,
    crawler_gate_ready: bool,
) -> (RunDecision, String) {
    let entry = ledger.get(tool);

    if entry.outcome == LedgerOutcome::Deny {
        return (RunDecision::Block, entry.reason);
    }

    let have = cache.capabilities(profile);
    let missing: Vec<String> = entry
        .requires
        .iter()
        .filter(|c| !have.contains(c))
        .map(|c| format!("{c:?}"))
        .collect();
    if !missing.is_empty() {
        return (RunDecision::Block, format!("missing: {}", missing.join(", ")));
    }

    if entry.worst_case_timeout_s as u64 > remaining_budget_s {
        return (RunDecision::Skip, "budget_exhausted".to_string());
    }

    if !entry.produces.is_empty() && entry.produces.iter().all(|c| have.contains(c)) {
        return (RunDecision::Skip, "redundant".to_string());
    }

    if tool.is_payload_class() && !crawler_gate_ready {
        return (RunDecision::Block, "no_crawler_evidence".to_string());
    }

    (RunDecision::Allow, "ready".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::DiscoveryCache;
    use crate::ledger::build_ledger;
    use std::collections::BTreeSet;

    fn root_profile() -> TargetProfile {
        TargetProfile::from_input("example.com", None, BTreeSet::new()).unwrap()
    }

    #[test]
    fn denied_tool_blocks() {
        let profile = TargetProfile::from_input("8.8.8.8", None, BTreeSet::new()).unwrap();
        let ledger = build_ledger(&profile).unwrap();
        let cache = DiscoveryCache::new();
        let (decision, _) = should_run(ToolId::DnsRecon, &ledger, &cache.snapshot(), &profile, 1800, true);
        assert_eq!(decision, RunDecision::Block);
    }

    #[test]
    fn missing_requirement_blocks() {
        let profile = root_profile();
        let ledger = build_ledger(&profile).unwrap();
        let cache = DiscoveryCache::new();
        let (decision, reason) = should_run(ToolId::XssProbe, &ledger, &cache.snapshot(), &profile, 1800, true);
        assert_eq!(decision, RunDecision::Block);
        assert!(reason.contains("missing"));
    }

    #[test]
    fn budget_exhausted_skips() {
        let profile = root_profile();
        let ledger = build_ledger(&profile).unwrap();
        let cache = DiscoveryCache::new();
        let (decision, reason) = should_run(ToolId::NmapVulnScripts, &ledger, &cache.snapshot(), &profile, 0, true);
        // nmap_vuln_scripts requires ports_known, which is missing before any
        // port scan has run, so this should BLOCK, not SKIP, on a pristine cache.
        assert_eq!(decision, RunDecision::Block);
        let _ = reason;

        cache.add_port(443);
        let (decision, reason) = should_run(ToolId::NmapVulnScripts, &ledger, &cache.snapshot(), &profile, 0, true);
        assert_eq!(decision, RunDecision::Skip);
        assert_eq!(reason, "budget_exhausted");
    }

    #[test]
    fn payload_tool_blocked_without_crawler_gate() {
        let profile = root_profile();
        let ledger = build_ledger(&profile).unwrap();
        let cache = DiscoveryCache::new();
        cache.add_param(
            "q",
            crate::cache::ParamSource::Crawled,
            "/search",
            crate::cache::ClassificationHints { is_reflectable: true, ..Default::default() },
        );
        let (decision, reason) = should_run(ToolId::XssProbe, &ledger, &cache.snapshot(), &profile, 1800, false);
        assert_eq!(decision, RunDecision::Block);
        assert_eq!(reason, "no_crawler_evidence");
    }

    #[test]
    fn redundant_tool_is_skipped() {
        let profile = root_profile();
        let ledger = build_ledger(&profile).unwrap();
        let cache = DiscoveryCache::new();
        cache.add_tech("nginx");
        let (decision, reason) = should_run(ToolId::TechDetect, &ledger, &cache.snapshot(), &profile, 1800, true);
        assert_eq!(decision, RunDecision::Skip);
        assert_eq!(reason, "redundant");
    }

    #[test]
    fn is_pure_function_of_inputs() {
        let profile = root_profile();
        let ledger = build_ledger(&profile).unwrap();
        let cache = DiscoveryCache::new();
        let snap = cache.snapshot();
        let a = should_run(ToolId::Crawler, &ledger, &snap, &profile, 1800, true);
        let b = should_run(ToolId::Crawler, &ledger, &snap, &profile, 1800, true);
        assert_eq!(a, b);
    }
}
