use serde_json::Value;

use crate::findings::{score_confidence, Finding, Severity, VulnerabilityType};

use super::ParseOutcome;

/// Parser for nuclei's JSONL output (spec.md §4.8). Template IDs are
/// heuristically mapped to a canonical `VulnerabilityType`; anything that
/// doesn't match a known family is recorded as generic info disclosure
/// rather than dropped, since nuclei's own severity rating is still signal.
fn map_template(template_id: &str) -> VulnerabilityType {
    let id = template_id.to_lowercase();
    if id.contains("xss") {
        VulnerabilityType::Xss
    } else if id.contains("sqli") || id.contains("sql-injection") {
        VulnerabilityType::SqlInjection
    } else if id.contains("rce") || id.contains("cmd-injection") || id.contains("command-injection") {
        VulnerabilityType::CmdInjection
    } else if id.contains("redirect") {
        VulnerabilityType::OpenRedirect
    } else if id.contains("ssrf") {
        VulnerabilityType::Ssrf
    } else if id.contains("traversal") || id.contains("lfi") {
        VulnerabilityType::PathTraversal
    } else if id.contains("ssl") || id.contains("tls") {
        VulnerabilityType::WeakTls
    } else {
        VulnerabilityType::InfoDisclosure
    }
}

fn map_severity(sev: &str) -> Severity {
    match sev.to_lowercase().as_str() {
        "critical" => Severity::Critical,
        "high" => Severity::High,
        "medium" => Severity::Medium,
        "low" => Severity::Low,
        _ => Severity::Info,
    }
}

pub fn parse(stdout: &str) -> ParseOutcome {
    if stdout.trim().is_empty() {
        return ParseOutcome::failed();
    }

    let mut findings = Vec::new();
    let mut saw_line = false;

    for line in stdout.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let Ok(value) = serde_json::from_str::<Value>(line) else {
            continue;
        };
        saw_line = true;

        let template_id = value.get("template-id").and_then(Value::as_str).unwrap_or("unknown");
        let severity = value
            .get("info")
            .and_then(|i| i.get("severity"))
            .and_then(Value::as_str)
            .unwrap_or("info");
        let matched_at = value.get("matched-at").and_then(Value::as_str).unwrap_or("");

        let confidence = score_confidence("nuclei", 0.8, 0, None);
        findings.push(Finding::new(
            map_template(template_id),
            matched_at,
            "nuclei",
            map_severity(severity),
            confidence,
            format!("template={template_id}"),
            false,
        ));
    }

    if !saw_line {
        return ParseOutcome::failed();
    }

    ParseOutcome { cache_ops: vec![], findings, parse_failed: false }
}
