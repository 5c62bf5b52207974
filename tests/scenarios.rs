use std::collections::BTreeSet;

use vuln_orchestrator::cache::{ClassificationHints, DiscoveryCache, ParamSource};
use vuln_orchestrator::decision::{should_run, RunDecision};
use vuln_orchestrator::gate::crawler_gate_ready;
use vuln_orchestrator::ledger::{build_ledger, LedgerOutcome};
use vuln_orchestrator::plan::build_plan;
use vuln_orchestrator::profile::{Scheme, TargetProfile, TargetType};
use vuln_orchestrator::tools::registry::ToolId;

fn profile(raw: &str, scheme_hint: Option<Scheme>) -> TargetProfile {
    TargetProfile::from_input(raw, scheme_hint, BTreeSet::new()).unwrap()
}

/// S1 -- root domain, no HTTPS hints.
#[test]
fn s1_root_domain_plan_and_crawler_gate() {
    let p = profile("example.com", None);
    assert_eq!(p.target_type, TargetType::RootDomain);
    assert_eq!(p.scheme, Scheme::Https);
    assert_eq!(p.base_domain, None);

    let ledger = build_ledger(&p).unwrap();
    let plan = build_plan(&p, &ledger);

    for tool in [
        ToolId::DnsRecon,
        ToolId::SubdomainEnum,
        ToolId::NmapSynTop1000,
        ToolId::NmapVersionDetect,
        ToolId::NmapVulnScripts,
        ToolId::Crawler,
        ToolId::DirEnum,
        ToolId::TemplateScan,
        ToolId::XssProbe,
        ToolId::SqliProbe,
        ToolId::CmdiProbe,
    ] {
        assert!(plan.iter().any(|i| i.tool == tool), "plan missing {tool:?}");
    }

    // Each payload tool's own signal capability is already on the cache (so
    // the "missing requirement" check passes), but the crawler has not run
    // yet: the gate itself is what blocks them, not a missing capability.
    let cache = DiscoveryCache::new();
    cache.add_param(
        "q",
        ParamSource::Crawled,
        "/search",
        ClassificationHints {
            is_reflectable: true,
            is_sql_candidate: true,
            is_cmd_candidate: true,
            ..Default::default()
        },
    );
    let snapshot = cache.snapshot();
    let gate_ready = crawler_gate_ready(&snapshot);
    assert!(!gate_ready, "crawler never marked complete, gate stays closed");

    for tool in [ToolId::XssProbe, ToolId::SqliProbe, ToolId::CmdiProbe] {
        let (decision, reason) = should_run(tool, &ledger, &snapshot, &p, 1800, gate_ready);
        assert_eq!(decision, RunDecision::Block);
        assert_eq!(reason, "no_crawler_evidence");
    }
}

/// S2 -- subdomain.
#[test]
fn s2_subdomain_uses_lightweight_dns_only() {
    let p = profile("api.example.com", None);
    assert_eq!(p.target_type, TargetType::Subdomain);
    assert_eq!(p.base_domain.as_deref(), Some("example.com"));

    let ledger = build_ledger(&p).unwrap();
    assert_eq!(ledger.get(ToolId::DnsVerify).outcome, LedgerOutcome::Allow);
    assert_eq!(ledger.get(ToolId::DnsRecon).outcome, LedgerOutcome::Deny);
    assert_eq!(ledger.get(ToolId::SubdomainEnum).outcome, LedgerOutcome::Deny);

    let plan = build_plan(&p, &ledger);
    assert!(plan.iter().any(|i| i.tool == ToolId::DnsVerify));
    assert!(!plan.iter().any(|i| i.tool == ToolId::SubdomainEnum));
}

/// S3 -- IPv4 literal.
#[test]
fn s3_ip_literal_skips_dns_and_subdomain_enum_entirely() {
    let p = profile("8.8.8.8", None);
    assert_eq!(p.target_type, TargetType::IpAddress);
    assert_eq!(p.base_domain, None);

    let ledger = build_ledger(&p).unwrap();
    assert_eq!(ledger.get(ToolId::DnsRecon).outcome, LedgerOutcome::Deny);
    assert_eq!(ledger.get(ToolId::DnsVerify).outcome, LedgerOutcome::Deny);
    assert_eq!(ledger.get(ToolId::SubdomainEnum).outcome, LedgerOutcome::Deny);

    let plan = build_plan(&p, &ledger);
    assert!(!plan.iter().any(|i| matches!(
        i.tool,
        ToolId::DnsRecon | ToolId::DnsVerify | ToolId::SubdomainEnum
    )));
    assert!(plan.iter().any(|i| i.tool == ToolId::NmapSynTop1000));
    assert!(plan.iter().any(|i| i.tool == ToolId::TlsProbe));
}

/// S4 -- nuclei decoupling: whatweb stub returns empty, crawler stub
/// returns endpoints. nuclei must not block on missing tech-stack.
#[test]
fn s4_nuclei_runs_without_whatweb_signal() {
    let p = profile("example.com", None);
    let ledger = build_ledger(&p).unwrap();

    let cache = DiscoveryCache::new();
    cache.mark_crawler_completed();
    cache.add_endpoint("/");
    cache.add_endpoint("/about");
    cache.add_endpoint("/contact");
    // whatweb stub returns nothing: tech_stack stays empty.

    let snapshot = cache.snapshot();
    let gate_ready = crawler_gate_ready(&snapshot);
    assert!(gate_ready);

    let entry = ledger.get(ToolId::TemplateScan);
    assert_eq!(entry.requires, vec![vuln_orchestrator::capability::Capability::WebTarget]);

    let (decision, _) = should_run(ToolId::TemplateScan, &ledger, &snapshot, &p, 1800, gate_ready);
    assert_eq!(decision, RunDecision::Allow);
}

/// S5 -- SIGPIPE on nikto.
#[test]
fn s5_sigpipe_with_stdout_is_partial_success() {
    use vuln_orchestrator::tools::classify::{classify, OutcomeClass};

    let (class, reason) = classify(141, b"+ OSVDB-3092: /admin/: interesting\n", b"", 1, false);
    assert_eq!(class, OutcomeClass::PartialSuccess);
    assert!(reason.is_none());
}

/// S6 -- corroborated XSS: two tools agree on the same dedup key.
#[test]
fn s6_corroborated_xss_raises_confidence_and_unions_tools() {
    use vuln_orchestrator::findings::{Finding, FindingsRegistry, Severity, VulnerabilityType};

    let registry = FindingsRegistry::new();
    registry.add(Finding::new(
        VulnerabilityType::Xss,
        "https://example.com/search",
        "dalfox",
        Severity::Medium,
        70,
        "reflected payload".into(),
        true,
    ));
    registry.add(Finding::new(
        VulnerabilityType::Xss,
        "https://example.com/search",
        "nuclei",
        Severity::High,
        65,
        "template match".into(),
        true,
    ));

    let items = registry.finalize();
    assert_eq!(items.len(), 1);
    let f = &items[0];
    assert_eq!(f.confidence, 80);
    assert_eq!(f.severity, Severity::High);
    assert_eq!(f.corroborating_tools.len(), 2);
}

/// P5/P6 -- cross-check the ledger-level target-type exclusions directly
/// against the closed tool catalog rather than just the three tools spelled
/// out in the per-module unit tests.
#[test]
fn p5_p6_dns_and_subdomain_enum_categories_excluded_by_target_type() {
    use vuln_orchestrator::tools::registry::{ToolCategory, ALL};

    let ip = profile("8.8.8.8", None);
    let ip_ledger = build_ledger(&ip).unwrap();
    for tool in ALL {
        if matches!(tool.category(), ToolCategory::Dns | ToolCategory::SubdomainEnum) {
            assert_eq!(ip_ledger.get(*tool).outcome, LedgerOutcome::Deny);
        }
    }

    let sub = profile("api.example.com", None);
    let sub_ledger = build_ledger(&sub).unwrap();
    for tool in ALL {
        if tool.category() == ToolCategory::SubdomainEnum {
            assert_eq!(sub_ledger.get(*tool).outcome, LedgerOutcome::Deny);
        }
    }
}

/// P8 -- the ledger is bit-identical across repeated builds from the same
/// profile, exercised here via the public API rather than the module-
/// internal test in ledger.rs.
#[test]
fn p8_ledger_determinism_via_public_api() {
    let p = profile("example.com", None);
    let a = build_ledger(&p).unwrap();
    let b = build_ledger(&p).unwrap();
    assert_eq!(serde_json::to_string(&a).unwrap(), serde_json::to_string(&b).unwrap());
}

/// Parameter classification hints are monotonic: once reflectable, always
/// reflectable, even if a later call for the same parameter omits the hint.
#[test]
fn reflectable_hint_is_sticky_across_calls() {
    let cache = DiscoveryCache::new();
    cache.add_param(
        "q",
        ParamSource::Crawled,
        "/search",
        ClassificationHints { is_reflectable: true, ..Default::default() },
    );
    cache.add_param("q", ParamSource::FormInput, "/search", ClassificationHints::default());

    let snapshot = cache.snapshot();
    assert!(snapshot.parameters.get("q").unwrap().is_reflectable);
}
