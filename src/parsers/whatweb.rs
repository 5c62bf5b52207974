use crate::cache::CacheOp;

use super::ParseOutcome;

const KNOWN_TECH: &[&str] = &[
    "nginx", "apache", "php", "wordpress", "drupal", "joomla", "iis", "react", "angular",
];

/// Parser for a whatweb-style tech fingerprinting pass (spec.md §4.8). Only
/// feeds `TechStackDetected`/`WordpressDetected` -- never gates
/// `TemplateScan`, which is the "whatweb-nuclei decoupling" spec.md §9
/// resolves explicitly.
pub fn parse(stdout: &str) -> ParseOutcome {
    if stdout.trim().is_empty() {
        return ParseOutcome::failed();
    }

    let lower = stdout.to_lowercase();
    let ops: Vec<CacheOp> = KNOWN_TECH
        .iter()
        .filter(|tech| lower.contains(*tech))
        .map(|tech| CacheOp::AddTech(tech.to_string()))
        .collect();

    if ops.is_empty() {
        return ParseOutcome::failed();
    }

    ParseOutcome { cache_ops: ops, findings: vec![], parse_failed: false }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_known_tech_tokens() {
        let out = parse("http://example.com [200] Apache[2.4.41], PHP[7.4.3], WordPress");
        assert_eq!(out.cache_ops.len(), 3);
    }

    #[test]
    fn unrecognized_output_is_parse_failure() {
        let out = parse("no tokens here that match anything known");
        assert!(out.parse_failed);
    }

    #[test]
    fn empty_stdout_is_parse_failure() {
        assert!(parse("").parse_failed);
    }
}
