use serde::{Deserialize, Serialize};

use crate::capability::Capability;

/// The closed set of tools this engine knows how to plan and run. A tool
/// absent from this enum cannot appear in a plan at all -- there is no
/// string-keyed "unknown tool" path (spec.md §3: "a tool absent from the
/// ledger is implicitly DENY").
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolId {
    DnsRecon,
    DnsVerify,
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
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolCategory {
    Dns,
    SubdomainEnum,
    PortScan,
    Tls,
    TechDetect,
    Crawler,
    DirEnum,
    TemplateScan,
    InfoDisclosure,
    Wordpress,
    Payload,
}

/// Every tool the engine knows about, in declaration order. Used by the
/// Scan Orchestrator to compute coverage gaps and by tests that need to
/// enumerate the full catalog.
pub const ALL: &[ToolId] = &[
    ToolId::DnsRecon,
    ToolId::DnsVerify,
    ToolId::SubdomainEnum,
    ToolId::NmapSynTop1000,
    ToolId::NmapVersionDetect,
    ToolId::NmapVulnScripts,
    ToolId::TlsProbe,
    ToolId::TechDetect,
    ToolId::Crawler,
    ToolId::DirEnum,
    ToolId::TemplateScan,
    ToolId::Nikto,
    ToolId::WordpressScan,
    ToolId::XssProbe,
    ToolId::SqliProbe,
    ToolId::CmdiProbe,
];

impl ToolId {
    pub fn name(&self) -> &'static str {
        match self {
            ToolId::DnsRecon => "dns_recon",
            ToolId::DnsVerify => "dns_verify",
            ToolId::SubdomainEnum => "subdomain_enum",
            ToolId::NmapSynTop1000 => "nmap_syn_top1000",
            ToolId::NmapVersionDetect => "nmap_version_detect",
            ToolId::NmapVulnScripts => "nmap_vuln_scripts",
            ToolId::TlsProbe => "tls_probe",
            ToolId::TechDetect => "whatweb",
            ToolId::Crawler => "crawler",
            ToolId::DirEnum => "gobuster",
            ToolId::TemplateScan => "nuclei",
            ToolId::Nikto => "nikto",
            ToolId::WordpressScan => "wpscan",
            ToolId::XssProbe => "dalfox",
            ToolId::SqliProbe => "sqlmap",
            ToolId::CmdiProbe => "commix",
        }
    }

    pub fn category(&self) -> ToolCategory {
        match self {
            ToolId::DnsRecon | ToolId::DnsVerify => ToolCategory::Dns,
            ToolId::SubdomainEnum => ToolCategory::SubdomainEnum,
            ToolId::NmapSynTop1000 | ToolId::NmapVersionDetect | ToolId::NmapVulnScripts => {
                ToolCategory::PortScan
            }
            ToolId::TlsProbe => ToolCategory::Tls,
            ToolId::TechDetect => ToolCategory::TechDetect,
            ToolId::Crawler => ToolCategory::Crawler,
            ToolId::DirEnum => ToolCategory::DirEnum,
            ToolId::TemplateScan => ToolCategory::TemplateScan,
            ToolId::Nikto => ToolCategory::InfoDisclosure,
            ToolId::WordpressScan => ToolCategory::Wordpress,
            ToolId::XssProbe | ToolId::SqliProbe | ToolId::CmdiProbe => ToolCategory::Payload,
        }
    }

    pub fn is_payload_class(&self) -> bool {
        self.category() == ToolCategory::Payload
    }

    /// Worst-case timeout in seconds, used by the Decision Layer's budget
    /// check (spec.md §4.5 step 3) and by the Tool Runner as the hard kill
    /// deadline (spec.md §4.6).
    pub fn worst_case_timeout_s(&self) -> u32 {
        match self {
            ToolId::DnsRecon => 60,
            ToolId::DnsVerify => 20,
            ToolId::SubdomainEnum => 300,
            ToolId::NmapSynTop1000 => 300,
            ToolId::NmapVersionDetect => 600,
            ToolId::NmapVulnScripts => 900,
            ToolId::TlsProbe => 60,
            ToolId::TechDetect => 60,
            ToolId::Crawler => 600,
            ToolId::DirEnum => 900,
            ToolId::TemplateScan => 1200,
            ToolId::Nikto => 600,
            ToolId::WordpressScan => 600,
            ToolId::XssProbe => 600,
            ToolId::SqliProbe => 900,
            ToolId::CmdiProbe => 600,
        }
    }

    /// Lower number runs earlier when the orchestrator has a choice among
    /// ready tools (spec.md §4.4/§5).
    pub fn priority(&self) -> u8 {
        match self {
            ToolId::DnsRecon | ToolId::DnsVerify => 0,
            ToolId::SubdomainEnum => 1,
            ToolId::NmapSynTop1000 => 2,
            ToolId::NmapVersionDetect => 3,
            ToolId::NmapVulnScripts => 4,
            ToolId::TlsProbe => 5,
            ToolId::TechDetect => 5,
            ToolId::Crawler => 6,
            ToolId::DirEnum => 7,
            ToolId::TemplateScan => 7,
            ToolId::Nikto => 7,
            ToolId::WordpressScan => 8,
            ToolId::XssProbe => 9,
            ToolId::SqliProbe => 9,
            ToolId::CmdiProbe => 9,
        }
    }

    /// Capabilities this tool's parser is expected to add to the cache.
    pub fn produces(&self) -> Vec<Capability> {
        match self {
            ToolId::DnsRecon | ToolId::DnsVerify => vec![Capability::DnsResolved, Capability::Reachable],
            ToolId::SubdomainEnum => vec![Capability::SubdomainsKnown],
            ToolId::NmapSynTop1000 => vec![Capability::PortsKnown, Capability::Reachable],
            // Version-detect and vuln-scripts add no new capability to the closed
            // vocabulary beyond what the SYN scan already produced; their value is
            // findings, not signals. An empty `produces` keeps the redundant-skip
            // rule in the Decision Layer from short-circuiting them once ports are
            // already known (spec.md §4.4: all three nmap invocations must run).
            ToolId::NmapVersionDetect | ToolId::NmapVulnScripts => vec![],
            ToolId::TlsProbe => vec![Capability::TlsEvaluated],
            ToolId::TechDetect => vec![Capability::TechStackDetected],
            ToolId::Crawler => vec![
                Capability::EndpointsKnown,
                Capability::ParamsKnown,
                Capability::CrawlerCompleted,
            ],
            ToolId::DirEnum => vec![Capability::EndpointsKnown, Capability::LiveEndpoints],
            ToolId::TemplateScan => vec![],
            ToolId::Nikto => vec![],
            ToolId::WordpressScan => vec![],
            ToolId::XssProbe => vec![],
            ToolId::SqliProbe => vec![],
            ToolId::CmdiProbe => vec![],
        }
    }
}
