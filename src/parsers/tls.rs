use crate::cache::CacheOp;
use crate::findings::{score_confidence, Finding, Severity, VulnerabilityType};

use super::ParseOutcome;

const WEAK_MARKERS: &[&str] = &["sslv2 offered", "sslv3 offered", "tlsv1.0 offered", "tlsv1.1 offered"];

/// Parser for a testssl.sh-style TLS probe (spec.md §4.8). Always marks the
/// capability as satisfied once the tool ran at all -- "TLS was evaluated"
/// is true whether or not a weakness was found.
pub fn parse(stdout: &str) -> ParseOutcome {
    if stdout.trim().is_empty() {
        return ParseOutcome::failed();
    }

    let mut findings = Vec::new();
    for line in stdout.lines() {
        let lower = line.to_lowercase();
        if WEAK_MARKERS.iter().any(|m| lower.contains(m)) {
            let confidence = score_confidence("testssl.sh", 0.7, 0, None);
            findings.push(Finding::new(
                VulnerabilityType::WeakTls,
                "tls://handshake",
                "testssl.sh",
                Severity::Medium,
                confidence,
                line.trim().to_string(),
                false,
            ));
        }
    }

    ParseOutcome {
        cache_ops: vec![CacheOp::MarkTlsEvaluated],
        findings,
        parse_failed: false,
    }
}
