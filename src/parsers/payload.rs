use once_cell::sync::Lazy;
use regex::Regex;

use crate::findings::{score_confidence, Finding, Severity, VulnerabilityType};

use super::ParseOutcome;

static DALFOX_HIT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\[POC\]\[(?:V|G)\]\s+(\S+)\s.*?param=(\S+).*?payload=(.+)$").unwrap());
static SQLMAP_PARAM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)parameter\s+'?([A-Za-z0-9_\-]+)'?\s+is\s+vulnerable").unwrap());
static COMMIX_HIT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)parameter\s+'?([A-Za-z0-9_\-]+)'?.*vulnerable").unwrap());

/// Parser for dalfox's XSS POC lines (spec.md §4.8). Payload-class tools
/// only run once the crawler gate (spec.md §4.10) is open, so every hit
/// here is implicitly crawler-verified.
pub fn parse_xss(stdout: &str) -> ParseOutcome {
    if stdout.trim().is_empty() {
        return ParseOutcome::failed();
    }

    let mut findings = Vec::new();
    for line in stdout.lines() {
        if let Some(caps) = DALFOX_HIT.captures(line.trim()) {
            let endpoint = caps[1].to_string();
            let param = caps[2].to_string();
            let payload = caps[3].trim().to_string();
            let confidence = score_confidence("dalfox", 0.85, 0, Some(true));
            findings.push(
                Finding::new(
                    VulnerabilityType::Xss,
                    &endpoint,
                    "dalfox",
                    Severity::High,
                    confidence,
                    line.trim().to_string(),
                    true,
                )
                .with_parameter(param)
                .with_payload(payload),
            );
        }
    }

    if findings.is_empty() {
        return ParseOutcome::failed();
    }

    ParseOutcome { cache_ops: vec![], findings, parse_failed: false }
}

/// Parser for sqlmap's `Parameter: X is vulnerable` lines.
pub fn parse_sqli(stdout: &str) -> ParseOutcome {
    if stdout.trim().is_empty() {
        return ParseOutcome::failed();
    }

    let mut findings = Vec::new();
    let mut current_endpoint = "unknown://target";
    for line in stdout.lines() {
        let line = line.trim();
        if let Some(rest) = line.strip_prefix("URL:") {
            current_endpoint = rest.trim();
        }
        if let Some(caps) = SQLMAP_PARAM.captures(line) {
            let param = caps[1].to_string();
            let confidence = score_confidence("sqlmap", 0.95, 0, Some(true));
            findings.push(
                Finding::new(
                    VulnerabilityType::SqlInjection,
                    current_endpoint,
                    "sqlmap",
                    Severity::Critical,
                    confidence,
                    line.to_string(),
                    true,
                )
                .with_parameter(param),
            );
        }
    }

    if findings.is_empty() {
        return ParseOutcome::failed();
    }

    ParseOutcome { cache_ops: vec![], findings, parse_failed: false }
}

/// Parser for commix's `Parameter: X ... vulnerable` lines.
pub fn parse_cmdi(stdout: &str) -> ParseOutcome {
    if stdout.trim().is_empty() {
        return ParseOutcome::failed();
    }

    let mut findings = Vec::new();
    let mut current_endpoint = "unknown://target";
    for line in stdout.lines() {
        let line = line.trim();
        if let Some(rest) = line.strip_prefix("Target URL:") {
            current_endpoint = rest.trim();
        }
        if let Some(caps) = COMMIX_HIT.captures(line) {
            let param = caps[1].to_string();
            let confidence = score_confidence("commix", 0.85, 0, Some(true));
            findings.push(
                Finding::new(
                    VulnerabilityType::CmdInjection,
                    current_endpoint,
                    "commix",
                    Severity::Critical,
                    confidence,
                    line.to_string(),
                    true,
                )
                .with_parameter(param),
            );
        }
    }

    if findings.is_empty() {
        return ParseOutcome::failed();
    }

    ParseOutcome { cache_ops: vec![], findings, parse_failed: false }
}
