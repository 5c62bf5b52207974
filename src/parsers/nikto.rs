use once_cell::sync::Lazy;
use regex::Regex;

use crate::findings::{score_confidence, Finding, Severity, VulnerabilityType};

use super::ParseOutcome;

static FINDING_LINE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\+\s*(?:OSVDB-\d+:\s*)?(/\S*):?\s*(.*)$").unwrap());

/// Parser for nikto's `+ ...` informational finding lines (spec.md §4.8).
/// Nikto only reports disclosure-class issues in this orchestrator's usage,
/// so every hit is recorded as `InfoDisclosure`.
pub fn parse(stdout: &str) -> ParseOutcome {
    if stdout.trim().is_empty() {
        return ParseOutcome::failed();
    }

    let mut findings = Vec::new();
    for line in stdout.lines() {
        let line = line.trim();
        if let Some(caps) = FINDING_LINE.captures(line) {
            let endpoint = &caps[1];
            let confidence = score_confidence("nikto", 0.5, 0, None);
            findings.push(Finding::new(
                VulnerabilityType::InfoDisclosure,
                endpoint,
                "nikto",
                Severity::Low,
                confidence,
                line.to_string(),
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
    fn osvdb_line_emits_finding() {
        let out = parse("+ OSVDB-3092: /admin/: This might be interesting\n");
        assert_eq!(out.findings.len(), 1);
        assert_eq!(out.findings[0].endpoint.as_str(), "/admin");
    }

    #[test]
    fn banner_only_output_is_parse_failure() {
        let out = parse("- Nikto v2.5.0\n---------------------------------------------------------------------\n");
        assert!(out.parse_failed);
    }
}
