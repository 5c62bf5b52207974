use once_cell::sync::Lazy;
use regex::Regex;

use crate::cache::CacheOp;
use crate::profile::TargetProfile;

use super::ParseOutcome;

static HIT: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(/\S*)\s+\(Status:\s*(\d{3})\)").unwrap());

/// Parser for a gobuster-style directory/file enumeration run (spec.md
/// §4.8). Every hit is an endpoint; only 2xx hits are additionally marked
/// live.
pub fn parse(stdout: &str, profile: &TargetProfile) -> ParseOutcome {
    if stdout.trim().is_empty() {
        return ParseOutcome::failed();
    }

    let base = profile.base_url();
    let mut ops = Vec::new();

    for line in stdout.lines() {
        if let Some(caps) = HIT.captures(line.trim()) {
            let path = &caps[1];
            let status: u16 = caps[2].parse().unwrap_or(0);
            let endpoint = format!("{base}{path}");
            ops.push(CacheOp::AddEndpoint(endpoint.clone()));
            if (200..300).contains(&status) {
                ops.push(CacheOp::AddLiveEndpoint(endpoint));
            }
        }
    }

    if ops.is_empty() {
        return ParseOutcome::failed();
    }

    ParseOutcome { cache_ops: ops, findings: vec![], parse_failed: false }
}
