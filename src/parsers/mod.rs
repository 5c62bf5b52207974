mod crawler;
mod direnum;
mod dns;
mod nikto;
mod nmap;
mod nuclei;
mod payload;
mod tls;
mod whatweb;
mod wordpress;

use crate::cache::CacheOp;
use crate::findings::Finding;
use crate::profile::TargetProfile;
use crate::tools::registry::ToolId;

/// Result of handing one tool's stdout to its parser (spec.md §4.8). Every
/// parser is idempotent and never panics on malformed input: `parse_failed`
/// is how a parser reports "I couldn't make sense of this" instead of
/// throwing, and it always comes with zero findings.
#[derive(Debug, Clone, Default)]
pub struct ParseOutcome {
    pub cache_ops: Vec<CacheOp>,
    pub findings: Vec<Finding>,
    pub parse_failed: bool,
}

impl ParseOutcome {
    fn failed() -> Self {
        Self { parse_failed: true, ..Default::default() }
    }
}

/// Dispatch stdout to the parser registered for `tool`, keyed by tool name
/// (spec.md §6: "the parser registry is keyed by tool name").
pub fn parse(tool: ToolId, stdout: &str, profile: &TargetProfile) -> ParseOutcome {
    match tool {
        ToolId::DnsRecon | ToolId::DnsVerify => dns::parse(stdout),
        ToolId::NmapSynTop1000 | ToolId::NmapVersionDetect | ToolId::NmapVulnScripts => {
            nmap::parse(stdout)
        }
        ToolId::SubdomainEnum => dns::parse_subdomains(stdout, profile),
        ToolId::TlsProbe => tls::parse(stdout),
        ToolId::TechDetect => whatweb::parse(stdout),
        ToolId::Crawler => crawler::parse(stdout),
        ToolId::DirEnum => direnum::parse(stdout, profile),
        ToolId::TemplateScan => nuclei::parse(stdout),
        ToolId::Nikto => nikto::parse(stdout),
        ToolId::WordpressScan => wordpress::parse(stdout),
        ToolId::XssProbe => payload::parse_xss(stdout),
        ToolId::SqliProbe => payload::parse_sqli(stdout),
        ToolId::CmdiProbe => payload::parse_cmdi(stdout),
    }
}
