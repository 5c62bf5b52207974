use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::cache::{DiscoveryCache, ParamInfo};
use crate::capability::{Capability, ALL_CAPABILITIES};
use crate::concurrent::ConcurrencyGate;
use crate::config::Config;
use crate::decision::{should_run, RunDecision};
use crate::error::OrchestratorError;
use crate::findings::{Finding, FindingsRegistry, OwaspCategory, SeverityCounts};
use crate::gate::crawler_gate_ready;
use crate::graph::build_graph_from_snapshot;
use crate::ledger::build_ledger;
use crate::output::report::write_json;
use crate::plan::{build_plan, PlanItem};
use crate::profile::TargetProfile;
use crate::tools::runner::{self, ToolOutcome};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileSummary {
    pub original_input: String,
    pub host: String,
    pub scheme: crate::profile::Scheme,
    pub port: u16,
    pub target_type: crate::profile::TargetType,
    pub base_domain: Option<String>,
    pub is_web_target: bool,
    pub is_https: bool,
}

impl From<&TargetProfile> for ProfileSummary {
    fn from(p: &TargetProfile) -> Self {
        Self {
            original_input: p.original_input.clone(),
            host: p.host.clone(),
            scheme: p.scheme,
            port: p.port,
            target_type: p.target_type,
            base_domain: p.base_domain.clone(),
            is_web_target: p.is_web_target,
            is_https: p.is_https,
        }
    }
}

/// `discovery` (spec.md §6): the final cache snapshot, as plain collections
/// rather than the internal `CacheSnapshot` type (which is also keyed by
/// capability-derivation concerns that don't belong in the report).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DiscoverySummary {
    pub endpoints: Vec<String>,
    pub live_endpoints: Vec<String>,
    pub parameters: BTreeMap<String, ParamInfo>,
    pub ports: Vec<u16>,
    pub subdomains: Vec<String>,
    pub tech_stack: Vec<String>,
    pub tls_evaluated: bool,
    pub crawler_completed: bool,
}

/// `findings` (spec.md §6): `count` + a severity/OWASP breakdown alongside
/// the full, finalized item list.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FindingsSection {
    pub count: usize,
    pub by_severity: SeverityCounts,
    pub by_owasp: BTreeMap<OwaspCategory, u32>,
    pub items: Vec<Finding>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoverageGap {
    pub tool: String,
    pub reason: String,
}

/// One entry of `coverage.gaps` (spec.md §6): a capability the scan never
/// reached, paired with the tool that is the closed vocabulary's declared
/// producer of it (spec.md §4.3 `produces`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CapabilityGap {
    pub capability: Capability,
    pub recommended_tool: Option<String>,
}

/// `coverage` (spec.md §6).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Coverage {
    pub tools_total: usize,
    pub tools_executed: usize,
    pub tools_blocked: Vec<CoverageGap>,
    pub tools_skipped: Vec<CoverageGap>,
    pub execution_rate: f64,
    pub gaps: Vec<CapabilityGap>,
}

/// `intelligence` (spec.md §6): the two required keys plus the endpoint-
/// graph query results (spec.md §4.3's "answers queries such as
/// 'reflectable endpoints'") that a complete implementation surfaces in the
/// report rather than discarding after use.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Intelligence {
    pub corroborated_findings: usize,
    pub high_confidence: usize,
    pub endpoint_count: usize,
    pub endpoints_with_forms: Vec<String>,
    pub reflectable_endpoints: Vec<String>,
    pub sql_injectable_endpoints: Vec<String>,
    pub cmd_injectable_endpoints: Vec<String>,
}

/// `execution_report.json` (spec.md §6). The single normative artifact a
/// scan produces; everything in it is derived from the plan, the execution
/// log, the final cache snapshot, and the findings registry. Top-level keys
/// match spec.md §6 exactly: `profile`, `plan`, `execution`, `discovery`,
/// `findings`, `coverage`, `intelligence`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanReport {
    pub profile: ProfileSummary,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub plan: Vec<PlanItem>,
    pub execution: Vec<ToolOutcome>,
    pub discovery: DiscoverySummary,
    pub findings: FindingsSection,
    pub coverage: Coverage,
    pub intelligence: Intelligence,
}

/// Run a full scan against `profile` to completion (spec.md §4, §9): build
/// the ledger and plan once, then walk the plan in ascending-priority bands,
/// running every `Allow` item in a band concurrently (bounded by
/// `ConcurrencyGate`) and barrier-waiting before the next band so later
/// bands see an up-to-date capability snapshot. Independent items within a
/// band may finish in any order -- the findings registry's merge is
/// order-independent (P4), so this doesn't threaten determinism.
pub async fn run_scan(profile: TargetProfile, config: &Config) -> Result<ScanReport, OrchestratorError> {
    tokio::fs::create_dir_all(&config.output_dir).await?;

    let ledger = build_ledger(&profile)?;
    let plan = build_plan(&profile, &ledger);

    let cache = Arc::new(DiscoveryCache::new());
    let registry = Arc::new(FindingsRegistry::new());
    let gate = Arc::new(ConcurrencyGate::new(config.concurrency, config.nmap_concurrency));

    let started_at = Utc::now();
    let clock = Instant::now();
    let mut outcomes: Vec<ToolOutcome> = Vec::with_capacity(plan.len());

    for band in group_by_priority(&plan) {
        let elapsed_s = clock.elapsed().as_secs();
        let remaining_budget_s = config.runtime_budget_s.saturating_sub(elapsed_s);
        let snapshot = cache.snapshot();
        let gate_ready = crawler_gate_ready(&snapshot);

        let mut handles = Vec::with_capacity(band.len());
        for item in band {
            let (decision, reason) =
                should_run(item.tool, &ledger, &snapshot, &profile, remaining_budget_s, gate_ready);

            match decision {
                RunDecision::Block => outcomes.push(ToolOutcome::blocked(item.tool, reason)),
                RunDecision::Skip => outcomes.push(ToolOutcome::skipped(item.tool, reason)),
                RunDecision::Allow => {
                    let cache = cache.clone();
                    let registry = registry.clone();
                    let gate = gate.clone();
                    let profile = profile.clone();
                    let output_dir = config.output_dir.clone();
                    let skip_install = config.skip_install;
                    handles.push(tokio::spawn(async move {
                        let _permit = gate.acquire(item.meta.category).await;
                        runner::run(&item, &profile, &cache, &registry, skip_install, &output_dir).await
                    }));
                }
            }
        }

        for handle in handles {
            match handle.await {
                Ok(outcome) => outcomes.push(outcome),
                Err(e) => tracing::error!(error=%e, "tool run task panicked"),
            }
        }
    }

    let final_snapshot = cache.snapshot();
    let final_caps = final_snapshot.capabilities(&profile);

    let discovery = DiscoverySummary {
        endpoints: final_snapshot.endpoints.iter().cloned().collect(),
        live_endpoints: final_snapshot.live_endpoints.iter().cloned().collect(),
        parameters: final_snapshot.parameters.clone(),
        ports: final_snapshot.ports.iter().copied().collect(),
        subdomains: final_snapshot.subdomains.iter().cloned().collect(),
        tech_stack: final_snapshot.tech_stack.iter().cloned().collect(),
        tls_evaluated: final_snapshot.tls_evaluated,
        crawler_completed: final_snapshot.crawler_completed,
    };

    let findings = FindingsSection {
        count: registry.len(),
        by_severity: registry.severity_counts(),
        by_owasp: registry.owasp_counts(),
        items: registry.finalize(),
    };

    let coverage = compute_coverage(&plan, &outcomes, &final_caps);
    let graph = build_graph_from_snapshot(&final_snapshot);
    let intelligence = Intelligence {
        corroborated_findings: registry.corroborated_count(),
        high_confidence: registry.high_confidence_count(),
        endpoint_count: graph.endpoint_count(),
        endpoints_with_forms: graph.endpoints_with_forms(),
        reflectable_endpoints: graph.reflectable_endpoints(),
        sql_injectable_endpoints: graph.sql_injectable_endpoints(),
        cmd_injectable_endpoints: graph.cmd_injectable_endpoints(),
    };

    let finished_at = Utc::now();
    let report = ScanReport {
        profile: ProfileSummary::from(&profile),
        started_at,
        finished_at,
        duration_ms: (finished_at - started_at).num_milliseconds().max(0) as u64,
        plan: plan.clone(),
        execution: outcomes,
        discovery,
        findings,
        coverage,
        intelligence,
    };

    let report_path = config.output_dir.join("execution_report.json");
    write_json(&report_path, &report).await?;

    Ok(report)
}

/// Plan items arrive already sorted by ascending `meta.priority`
/// (`build_plan`); this only groups runs of equal priority without
/// re-sorting, so the scheduling order stays deterministic.
fn group_by_priority(plan: &[PlanItem]) -> Vec<Vec<PlanItem>> {
    let mut bands: Vec<Vec<PlanItem>> = Vec::new();
    for item in plan {
        match bands.last_mut() {
            Some(band) if band.last().map(|i| i.meta.priority) == Some(item.meta.priority) => {
                band.push(item.clone())
            }
            _ => bands.push(vec![item.clone()]),
        }
    }
    bands
}

/// First tool in declaration order whose `produces()` includes `cap`, used
/// to populate `coverage.gaps[].recommended_tool` (spec.md §6).
fn recommended_tool_for(cap: Capability) -> Option<String> {
    crate::tools::registry::ALL
        .iter()
        .find(|tool| tool.produces().contains(&cap))
        .map(|tool| tool.name().to_string())
}

fn compute_coverage(
    plan: &[PlanItem],
    outcomes: &[ToolOutcome],
    final_caps: &crate::capability::CapabilitySet,
) -> Coverage {
    let mut tools_blocked = Vec::new();
    let mut tools_skipped = Vec::new();
    let mut tools_executed = 0usize;
    for outcome in outcomes {
        match outcome.decision {
            RunDecision::Block => tools_blocked.push(CoverageGap {
                tool: outcome.tool.name().to_string(),
                reason: outcome.reason.clone(),
            }),
            RunDecision::Skip => tools_skipped.push(CoverageGap {
                tool: outcome.tool.name().to_string(),
                reason: outcome.reason.clone(),
            }),
            RunDecision::Allow => tools_executed += 1,
        }
    }

    let tools_total = plan.len();
    let execution_rate = if tools_total == 0 { 0.0 } else { tools_executed as f64 / tools_total as f64 };

    let gaps: Vec<CapabilityGap> = ALL_CAPABILITIES
        .iter()
        .copied()
        .filter(|c| !final_caps.contains(c))
        .map(|c| CapabilityGap { capability: c, recommended_tool: recommended_tool_for(c) })
        .collect();

    Coverage { tools_total, tools_executed, tools_blocked, tools_skipped, execution_rate, gaps }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::registry::ToolId;

    fn item(tool: ToolId, priority: u8) -> PlanItem {
        PlanItem {
            tool,
            command_template: vec![tool.name().to_string()],
            meta: crate::plan::PlanItemMeta {
                timeout_s: 10,
                requires: vec![],
                optional: vec![],
                produces: vec![],
                priority,
                category: tool.category(),
            },
        }
    }

    #[test]
    fn groups_consecutive_equal_priorities_into_one_band() {
        let plan = vec![
            item(ToolId::DnsRecon, 0),
            item(ToolId::DnsVerify, 0),
            item(ToolId::SubdomainEnum, 1),
        ];
        let bands = group_by_priority(&plan);
        assert_eq!(bands.len(), 2);
        assert_eq!(bands[0].len(), 2);
        assert_eq!(bands[1].len(), 1);
    }

    #[test]
    fn empty_plan_has_no_bands() {
        assert!(group_by_priority(&[]).is_empty());
    }

    #[test]
    fn gaps_separate_blocked_from_skipped_and_report_missing_capabilities() {
        let plan = vec![item(ToolId::XssProbe, 9), item(ToolId::NmapVulnScripts, 4)];
        let outcomes = vec![
            ToolOutcome::blocked(ToolId::XssProbe, "no_crawler_evidence"),
            ToolOutcome::skipped(ToolId::NmapVulnScripts, "budget_exhausted"),
        ];
        let caps = crate::capability::CapabilitySet::new();
        let coverage = compute_coverage(&plan, &outcomes, &caps);
        assert_eq!(coverage.tools_blocked.len(), 1);
        assert_eq!(coverage.tools_skipped.len(), 1);
        assert_eq!(coverage.tools_executed, 0);
        assert_eq!(coverage.tools_total, 2);
        assert_eq!(coverage.execution_rate, 0.0);
        assert_eq!(coverage.gaps.len(), ALL_CAPABILITIES.len());
        let xss_gap = coverage
            .gaps
            .iter()
            .find(|g| g.capability == Capability::ReflectableParams)
            .unwrap();
        assert_eq!(xss_gap.recommended_tool, None);
        let endpoints_gap = coverage
            .gaps
            .iter()
            .find(|g| g.capability == Capability::EndpointsKnown)
            .unwrap();
        assert_eq!(endpoints_gap.recommended_tool.as_deref(), Some("crawler"));
    }
}
