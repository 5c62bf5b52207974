use once_cell::sync::Lazy;
use regex::Regex;

use crate::cache::CacheOp;
use crate::findings::{score_confidence, Finding, Severity, VulnerabilityType};

use super::ParseOutcome;

static OPEN_PORT: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\d{1,5})/(tcp|udp)\s+open\b").unwrap());

/// Shared parser for all three nmap invocations (SYN/top-1000, version
/// detect, vuln scripts) -- spec.md §4.8. Port lines and `VULNERABLE:`
/// script hits are both meaningful regardless of which nmap phase emitted
/// them, so the classes are just superimposed.
pub fn parse(stdout: &str) -> ParseOutcome {
    if stdout.trim().is_empty() {
        return ParseOutcome::failed();
    }

    let mut ops = Vec::new();
    let mut findings = Vec::new();
    let mut saw_port = false;

    for line in stdout.lines() {
        if let Some(caps) = OPEN_PORT.captures(line.trim()) {
            if let Ok(port) = caps[1].parse::<u16>() {
                ops.push(CacheOp::AddPort(port));
                saw_port = true;
            }
        }

        let cleaned = line.trim_start_matches(|c: char| c == '|' || c.is_whitespace());
        if cleaned.contains("VULNERABLE") {
            let evidence = cleaned.trim().to_string();
            let confidence = score_confidence("nmap", 0.6, 0, None);
            findings.push(Finding::new(
                VulnerabilityType::InfoDisclosure,
                "nmap://script-result",
                "nmap",
                Severity::Medium,
                confidence,
                evidence,
                false,
            ));
        }
    }

    if !ops.is_empty() {
        ops.push(CacheOp::MarkReachable);
    }

    if !saw_port && findings.is_empty() {
        return ParseOutcome::failed();
    }

    ParseOutcome { cache_ops: ops, findings, parse_failed: false }
}
