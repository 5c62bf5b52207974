use serde_json::Value;
use url::Url;

use crate::cache::{CacheOp, ClassificationHints, ParamSource};

use super::ParseOutcome;

const REFLECTABLE_NAMES: &[&str] = &["q", "search", "query", "s", "redirect", "url", "next"];
const SQL_CANDIDATE_NAMES: &[&str] = &["id", "user_id", "pid", "item", "item_id"];
const CMD_CANDIDATE_NAMES: &[&str] = &["cmd", "exec", "file", "path"];

fn classify_param(name: &str) -> ClassificationHints {
    let lower = name.to_lowercase();
    ClassificationHints {
        is_reflectable: REFLECTABLE_NAMES.contains(&lower.as_str()),
        is_sql_candidate: SQL_CANDIDATE_NAMES.contains(&lower.as_str()),
        is_cmd_candidate: CMD_CANDIDATE_NAMES.contains(&lower.as_str()),
    }
}

/// Parser for a katana-style crawler, one JSON object per visited URL
/// (spec.md §4.8). `MarkCrawlerCompleted` is emitted unconditionally
/// whenever the crawler actually produced output -- the crawler gate
/// (spec.md §4.10) additionally requires a non-empty endpoint set, so a
/// crawl that ran but found nothing still leaves payload-class tools
/// blocked.
pub fn parse(stdout: &str) -> ParseOutcome {
    if stdout.trim().is_empty() {
        return ParseOutcome::failed();
    }

    let mut ops = vec![CacheOp::MarkCrawlerCompleted];
    let mut saw_line = false;

    for line in stdout.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let Ok(value) = serde_json::from_str::<Value>(line) else {
            continue;
        };
        let Some(url_str) = value.get("url").and_then(Value::as_str) else {
            continue;
        };
        saw_line = true;
        ops.push(CacheOp::AddEndpoint(url_str.to_string()));

        if let Ok(parsed) = Url::parse(url_str) {
            for (name, _) in parsed.query_pairs() {
                let hints = classify_param(&name);
                ops.push(CacheOp::AddParam {
                    name: name.to_string(),
                    source: ParamSource::Crawled,
                    endpoint: url_str.to_string(),
                    hints,
                });
            }
        }
    }

    if !saw_line {
        return ParseOutcome::failed();
    }

    ParseOutcome { cache_ops: ops, findings: vec![], parse_failed: false }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crawled_url_with_query_param_adds_endpoint_and_param() {
        let out = parse(r#"{"url":"https://example.com/search?q=test","method":"GET"}"#);
        assert!(!out.parse_failed);
        assert!(out.cache_ops.iter().any(|op| matches!(op, CacheOp::AddEndpoint(_))));
        assert!(out.cache_ops.iter().any(|op| matches!(op, CacheOp::AddParam { name, .. } if name == "q")));
    }

    #[test]
    fn crawl_with_no_parseable_lines_still_completes_but_fails_parse() {
        let out = parse("garbage\nmore garbage\n");
        assert!(out.parse_failed);
        assert!(out.cache_ops.is_empty());
    }

    #[test]
    fn empty_stdout_is_parse_failure() {
        assert!(parse("").parse_failed);
    }
}
