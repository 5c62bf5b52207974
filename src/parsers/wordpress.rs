use crate::findings::{score_confidence, Finding, Severity, VulnerabilityType};

use super::ParseOutcome;

/// Parser for wpscan-style output (spec.md §4.8). Minimal by design: this
/// tool only runs when `WordpressDetected` is already true, so its job is
/// to surface named vulnerabilities, not to establish the WordPress
/// capability itself.
pub fn parse(stdout: &str) -> ParseOutcome {
    if stdout.trim().is_empty() {
        return ParseOutcome::failed();
    }

    let mut findings = Vec::new();
    for line in stdout.lines() {
        let lower = line.to_lowercase();
        if lower.contains("vulnerability") || lower.contains("vulnerable") {
            let confidence = score_confidence("wpscan", 0.6, 0, None);
            findings.push(Finding::new(
                VulnerabilityType::InfoDisclosure,
                "wordpress://site",
                "wpscan",
                Severity::Medium,
                confidence,
                line.trim().to_string(),
                false,
            ));
        }
    }

    if findings.is_empty() {
        return ParseOutcome::failed();
    }

    ParseOutcome { cache_ops: vec![], findings, parse_failed: false }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vulnerability_mention_emits_finding() {
        let out = parse("[!] Title: WordPress Plugin XYZ - SQLi Vulnerability\n");
        assert_eq!(out.findings.len(), 1);
    }

    #[test]
    fn clean_scan_is_parse_failure() {
        let out = parse("[+] WordPress version 6.4 identified\n");
        assert!(out.parse_failed);
    }
}
