use serde::{Deserialize, Serialize};

use crate::capability::Capability;
use crate::ledger::Ledger;
use crate::profile::{TargetProfile, TargetType};
use crate::tools::registry::{ToolCategory, ToolId};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanItemMeta {
    pub timeout_s: u32,
    pub requires: Vec<Capability>,
    pub optional: Vec<Capability>,
    pub produces: Vec<Capability>,
    pub priority: u8,
    pub category: ToolCategory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanItem {
    pub tool: ToolId,
    pub command_template: Vec<String>,
    pub meta: PlanItemMeta,
}

/// Ordered plan of tools for a given target type (spec.md §4.4). Three
/// disjoint implementations, selected once by `profile.target_type` and
/// never revisited.
pub fn build_plan(profile: &TargetProfile, ledger: &Ledger) -> Vec<PlanItem> {
    let tools: Vec<ToolId> = match profile.target_type {
        TargetType::RootDomain => root_domain_tools(),
        TargetType::Subdomain => subdomain_tools(),
        TargetType::IpAddress => ip_tools(),
    };

    let mut items: Vec<PlanItem> = tools
        .into_iter()
        .map(|tool| {
            let entry = ledger.get(tool);
            PlanItem {
                command_template: command_template(tool, profile),
                meta: PlanItemMeta {
                    timeout_s: entry.worst_case_timeout_s,
                    requires: entry.requires,
                    optional: entry.optional,
                    produces: entry.produces,
                    priority: entry.priority,
                    category: tool.category(),
                },
                tool,
            }
        })
        .collect();

    items.sort_by_key(|i| i.meta.priority);
    items
}

fn root_domain_tools() -> Vec<ToolId> {
    use ToolId::*;
    vec![
        DnsRecon,
        SubdomainEnum,
        NmapSynTop1000,
        NmapVersionDetect,
        NmapVulnScripts,
        TlsProbe,
        TechDetect,
        Crawler,
        DirEnum,
        TemplateScan,
        Nikto,
        WordpressScan,
        XssProbe,
        SqliProbe,
        CmdiProbe,
    ]
}

fn subdomain_tools() -> Vec<ToolId> {
    use ToolId::*;
    vec![
        DnsVerify,
        NmapSynTop1000,
        NmapVersionDetect,
        NmapVulnScripts,
        TlsProbe,
        TechDetect,
        Crawler,
        DirEnum,
        TemplateScan,
        Nikto,
        WordpressScan,
        XssProbe,
        SqliProbe,
        CmdiProbe,
    ]
}

fn ip_tools() -> Vec<ToolId> {
    use ToolId::*;
    vec![
        NmapSynTop1000,
        NmapVersionDetect,
        NmapVulnScripts,
        TlsProbe,
        TechDetect,
        Crawler,
        DirEnum,
        TemplateScan,
        Nikto,
        XssProbe,
        SqliProbe,
        CmdiProbe,
    ]
}

fn command_template(tool: ToolId, profile: &TargetProfile) -> Vec<String> {
    let host = profile.host.clone();
    let base_url = profile.base_url();
    match tool {
        ToolId::DnsRecon => vec!["dig".into(), "+nocmd".into(), host, "any".into(), "+multiline".into(), "+noall".into(), "+answer".into()],
        ToolId::DnsVerify => vec!["dig".into(), "+short".into(), host.clone(), "A".into(), "AAAA".into()],
        ToolId::SubdomainEnum => vec!["subfinder".into(), "-d".into(), host, "-silent".into()],
        ToolId::NmapSynTop1000 => vec!["nmap".into(), "-sS".into(), "--top-ports".into(), "1000".into(), host],
        ToolId::NmapVersionDetect => vec!["nmap".into(), "-sV".into(), host],
        ToolId::NmapVulnScripts => vec!["nmap".into(), "--script".into(), "vuln".into(), host],
        ToolId::TlsProbe => vec!["testssl.sh".into(), "--quiet".into(), "--jsonfile-pretty".into(), "-".into(), base_url],
        ToolId::TechDetect => vec!["whatweb".into(), "-a".into(), "3".into(), base_url],
        ToolId::Crawler => vec!["katana".into(), "-u".into(), base_url, "-silent".into(), "-jsonl".into()],
        ToolId::DirEnum => vec!["gobuster".into(), "dir".into(), "-u".into(), base_url, "-w".into(), "/usr/share/wordlists/common.txt".into()],
        ToolId::TemplateScan => vec!["nuclei".into(), "-u".into(), base_url, "-jsonl".into()],
        ToolId::Nikto => vec!["nikto".into(), "-h".into(), base_url],
        ToolId::WordpressScan => vec!["wpscan".into(), "--url".into(), base_url, "--no-banner".into()],
        ToolId::XssProbe => vec!["dalfox".into(), "url".into(), base_url],
        ToolId::SqliProbe => vec!["sqlmap".into(), "-u".into(), base_url, "--batch".into()],
        ToolId::CmdiProbe => vec!["commix".into(), "--url".into(), base_url, "--batch".into()],
    }
}
