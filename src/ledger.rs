use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::capability::Capability;
use crate::error::OrchestratorError;
use crate::profile::{TargetProfile, TargetType};
use crate::tools::registry::ToolId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LedgerOutcome {
    Allow,
    Deny,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub tool: ToolId,
    pub outcome: LedgerOutcome,
    pub reason: String,
    pub worst_case_timeout_s: u32,
    pub priority: u8,
    pub requires: Vec<Capability>,
    pub optional: Vec<Capability>,
    pub produces: Vec<Capability>,
}

/// Immutable policy table: for every registered tool, a finalized
/// `ALLOW`/`DENY` decision derived from the profile alone (spec.md §3,
/// §4.3). A tool not present in `entries` is implicitly `DENY`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ledger {
    entries: BTreeMap<ToolId, LedgerEntry>,
    finalized: bool,
}

impl Ledger {
    fn new() -> Self {
        Self { entries: BTreeMap::new(), finalized: false }
    }

    fn insert(&mut self, entry: LedgerEntry) -> Result<(), OrchestratorError> {
        if self.finalized {
            return Err(OrchestratorError::ArchitectureViolation(format!(
                "attempted to mutate ledger after finalize(): {}",
                entry.tool.name()
            )));
        }
        self.entries.insert(entry.tool, entry);
        Ok(())
    }

    pub fn finalize(mut self) -> Self {
        self.finalized = true;
        self
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    pub fn get(&self, tool: ToolId) -> LedgerEntry {
        self.entries.get(&tool).cloned().unwrap_or_else(|| LedgerEntry {
            tool,
            outcome: LedgerOutcome::Deny,
            reason: "tool not registered in ledger".to_string(),
            worst_case_timeout_s: tool.worst_case_timeout_s(),
            priority: tool.priority(),
            requires: vec![],
            optional: vec![],
            produces: vec![],
        })
    }

    pub fn entries(&self) -> impl Iterator<Item = &LedgerEntry> {
        self.entries.values()
    }
}

fn allow(tool: ToolId, reason: &str, requires: Vec<Capability>, optional: Vec<Capability>) -> LedgerEntry {
    LedgerEntry {
        tool,
        outcome: LedgerOutcome::Allow,
        reason: reason.to_string(),
        worst_case_timeout_s: tool.worst_case_timeout_s(),
        priority: tool.priority(),
        requires,
        optional,
        produces: tool.produces(),
    }
}

fn deny(tool: ToolId, reason: &str) -> LedgerEntry {
    LedgerEntry {
        tool,
        outcome: LedgerOutcome::Deny,
        reason: reason.to_string(),
        worst_case_timeout_s: tool.worst_case_timeout_s(),
        priority: tool.priority(),
        requires: vec![],
        optional: vec![],
        produces: vec![],
    }
}

/// Build the ledger deterministically from the profile alone (spec.md
/// §4.3). Calling this twice with the same profile must produce a
/// bit-identical ledger (P8): there is no hidden clock, randomness, or I/O
/// in this function.
pub fn build_ledger(profile: &TargetProfile) -> Result<Ledger, OrchestratorError> {
    let mut ledger = Ledger::new();
    use ToolId::*;

    // --- DNS tools ---
    if profile.target_type == TargetType::IpAddress {
        ledger.insert(deny(DnsRecon, "IP already resolved"))?;
        ledger.insert(deny(DnsVerify, "IP already resolved"))?;
    } else if profile.target_type == TargetType::RootDomain {
        ledger.insert(allow(DnsRecon, "root domain: full DNS recon", vec![], vec![]))?;
        ledger.insert(deny(DnsVerify, "superseded by full DNS recon on root domains"))?;
    } else {
        ledger.insert(deny(DnsRecon, "full DNS recon applies to root domains only"))?;
        ledger.insert(allow(DnsVerify, "subdomain: lightweight A/AAAA verify", vec![], vec![]))?;
    }

    // --- Subdomain enumeration ---
    if profile.target_type == TargetType::RootDomain {
        ledger.insert(allow(SubdomainEnum, "root domain: enumeration applies", vec![], vec![]))?;
    } else {
        ledger.insert(deny(SubdomainEnum, "enumeration applies to root domain only"))?;
    }

    // --- Network scan: always applies ---
    ledger.insert(allow(NmapSynTop1000, "port discovery applies to every target", vec![], vec![]))?;
    ledger.insert(allow(
        NmapVersionDetect,
        "version detection applies to every target",
        vec![Capability::PortsKnown],
        vec![],
    ))?;
    ledger.insert(allow(
        NmapVulnScripts,
        "vuln-script scan applies to every target",
        vec![Capability::PortsKnown],
        vec![],
    ))?;

    // --- TLS probe: optional, gated on a web port being known for IP targets ---
    let tls_requires = if profile.target_type == TargetType::IpAddress {
        vec![Capability::PortsKnown]
    } else {
        vec![]
    };
    if profile.is_web_target {
        ledger.insert(allow(TlsProbe, "web target: TLS posture is in scope", tls_requires, vec![]))?;
    } else {
        ledger.insert(deny(TlsProbe, "not a web target"))?;
    }

    // --- Web-only tools ---
    let web_tools: &[ToolId] = &[TechDetect, Crawler, DirEnum, Nikto, XssProbe, SqliProbe, CmdiProbe];
    for &tool in web_tools {
        if profile.is_web_target {
            let (requires, optional): (Vec<Capability>, Vec<Capability>) = match tool {
                XssProbe => (vec![Capability::ReflectableParams], vec![]),
                SqliProbe => (vec![Capability::SqlInjectableParams], vec![]),
                CmdiProbe => (vec![Capability::CmdInjectableParams], vec![]),
                _ => (vec![], vec![]),
            };
            ledger.insert(allow(tool, "web target", requires, optional))?;
        } else {
            ledger.insert(deny(tool, "not a web target"))?;
        }
    }

    // --- Template scanner: decoupled from whatweb on purpose (spec.md §4.3, §9) ---
    if profile.is_web_target {
        ledger.insert(allow(
            TemplateScan,
            "web target",
            vec![Capability::WebTarget],
            vec![Capability::TechStackDetected],
        ))?;
    } else {
        ledger.insert(deny(TemplateScan, "not a web target"))?;
    }

    // --- WordPress-specific tool: always ALLOWed in principle for web
    // targets; gated at run time via `requires: {wordpress_detected}`
    // rather than a second ledger (spec.md §4.3). ---
    if profile.is_web_target {
        ledger.insert(allow(
            WordpressScan,
            "web target: eligible in principle, gated by cache evidence at run time",
            vec![Capability::WordpressDetected],
            vec![],
        ))?;
    } else {
        ledger.insert(deny(WordpressScan, "not a web target"))?;
    }

    Ok(ledger.finalize())
}
