use once_cell::sync::Lazy;
use regex::Regex;

use crate::cache::CacheOp;
use crate::profile::TargetProfile;

use super::ParseOutcome;

static RECORD_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bIN\s+(A|AAAA|MX|NS|TXT|SOA|CNAME)\b").unwrap());

/// Parser for the consolidated DNS recon tool (root-domain path) and the
/// lightweight A/AAAA verify (subdomain path) -- spec.md §4.8. Both emit
/// the same signal class: "a DNS answer was observed", so they share an
/// implementation.
pub fn parse(stdout: &str) -> ParseOutcome {
    if stdout.trim().is_empty() {
        return ParseOutcome::failed();
    }

    let mut saw_record = false;
    for line in stdout.lines() {
        if RECORD_LINE.is_match(line) || looks_like_bare_address(line) {
            saw_record = true;
        }
    }

    if !saw_record {
        return ParseOutcome::failed();
    }

    ParseOutcome {
        cache_ops: vec![CacheOp::MarkDnsResolved, CacheOp::MarkReachable],
        findings: vec![],
        parse_failed: false,
    }
}

fn looks_like_bare_address(line: &str) -> bool {
    // `dig +short` emits bare addresses with no record-type token.
    let line = line.trim();
    !line.is_empty() && line.parse::<std::net::IpAddr>().is_ok()
}

/// Parser for subdomain enumeration (subfinder-style: one subdomain per
/// line). Only accepts subdomains that actually belong to the scanned
/// root domain.
pub fn parse_subdomains(stdout: &str, profile: &TargetProfile) -> ParseOutcome {
    let root = profile.host.to_lowercase();
    let mut ops = Vec::new();
    for line in stdout.lines() {
        let candidate = line.trim().to_lowercase();
        if candidate.is_empty() {
            continue;
        }
        if candidate == root || candidate.ends_with(&format!(".{root}")) {
            ops.push(CacheOp::AddSubdomain(candidate));
        }
    }

    if ops.is_empty() && !stdout.trim().is_empty() {
        return ParseOutcome::failed();
    }

    ParseOutcome { cache_ops: ops, findings: vec![], parse_failed: false }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[test]
    fn parses_dig_multiline_answer() {
        let out = parse("example.com.\t300\tIN\tA\t93.184.216.34\n");
        assert!(!out.parse_failed);
        assert_eq!(out.cache_ops.len(), 2);
    }

    #[test]
    fn parses_bare_short_answer() {
        let out = parse("93.184.216.34\n");
        assert!(!out.parse_failed);
    }

    #[test]
    fn empty_stdout_is_parse_failure() {
        let out = parse("");
        assert!(out.parse_failed);
        assert!(out.findings.is_empty());
    }

    #[test]
    fn subdomains_filtered_to_root() {
        let profile = TargetProfile::from_input("example.com", None, BTreeSet::new()).unwrap();
        let out = parse_subdomains("api.example.com\nunrelated.org\n", &profile);
        assert_eq!(out.cache_ops.len(), 1);
    }
}
