use std::collections::BTreeSet;
use std::net::IpAddr;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::OrchestratorError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scheme {
    Http,
    Https,
}

impl Scheme {
    fn as_str(&self) -> &'static str {
        match self {
            Scheme::Http => "http",
            Scheme::Https => "https",
        }
    }
}

impl std::fmt::Display for Scheme {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TargetType {
    RootDomain,
    Subdomain,
    IpAddress,
}

/// Known ccTLD second-level suffixes. Not exhaustive (a real deployment would
/// vendor the Public Suffix List); covers the common cases so `base_domain`
/// classification is correct for the targets this orchestrator is typically
/// pointed at.
const CCTLD_SECOND_LEVEL: &[&str] = &[
    "co.uk", "org.uk", "gov.uk", "ac.uk", "co.jp", "co.nz", "co.in", "co.za",
    "com.au", "com.br", "com.cn", "com.mx", "com.tr",
];

fn has_cctld_suffix(labels: &[&str]) -> bool {
    if labels.len() < 2 {
        return false;
    }
    let candidate = format!(
        "{}.{}",
        labels[labels.len() - 2],
        labels[labels.len() - 1]
    );
    CCTLD_SECOND_LEVEL.contains(&candidate.as_str())
}

/// Immutable record of what is being scanned (spec.md §3, §4.1). Frozen after
/// `from_input` returns: there is no setter, so "never mutated" is a type-level
/// guarantee rather than a runtime check.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetProfile {
    pub original_input: String,
    pub host: String,
    pub scheme: Scheme,
    pub port: u16,
    pub target_type: TargetType,
    pub base_domain: Option<String>,
    pub is_web_target: bool,
    pub is_https: bool,
    pub resolved_ips: BTreeSet<IpAddr>,
}

const WEB_PORTS: &[u16] = &[80, 443, 8080, 8000, 8443, 3000];

impl TargetProfile {
    /// Build the profile once from user input. `resolved_ips` is supplied by
    /// the caller (an earlier, separate DNS probe) -- this constructor never
    /// performs DNS itself (spec.md §4.1).
    pub fn from_input(
        raw: &str,
        scheme_hint: Option<Scheme>,
        resolved_ips: BTreeSet<IpAddr>,
    ) -> Result<Self, OrchestratorError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(OrchestratorError::InvalidInput("empty target".into()));
        }
        if trimmed.chars().any(|c| c.is_whitespace()) {
            return Err(OrchestratorError::InvalidInput(format!(
                "target contains whitespace: {raw:?}"
            )));
        }

        let scheme_explicit = trimmed.starts_with("http://") || trimmed.starts_with("https://");
        let (scheme, rest) = if let Some(stripped) = trimmed.strip_prefix("https://") {
            (Scheme::Https, stripped)
        } else if let Some(stripped) = trimmed.strip_prefix("http://") {
            (Scheme::Http, stripped)
        } else {
            (scheme_hint.unwrap_or(Scheme::Https), trimmed)
        };

        // Strip a trailing path/query, then split host[:port].
        let authority = rest.split(['/', '?', '#']).next().unwrap_or(rest);
        if authority.is_empty() {
            return Err(OrchestratorError::InvalidInput(format!(
                "target has no host: {raw:?}"
            )));
        }

        let (host, explicit_port) = split_host_port(authority)?;
        if host.is_empty() {
            return Err(OrchestratorError::InvalidInput(format!(
                "target has no host: {raw:?}"
            )));
        }

        let port = explicit_port.unwrap_or(match scheme {
            Scheme::Https => 443,
            Scheme::Http => 80,
        });

        let (target_type, base_domain) = classify_host(&host);

        let is_web_target = if WEB_PORTS.contains(&port) {
            true
        } else {
            // "everything as web by default" unless the port looks non-web
            // *and* the caller never told us a scheme explicitly.
            scheme_explicit || explicit_port.is_none()
        };

        let is_https = matches!(scheme, Scheme::Https);

        let profile = Self {
            original_input: raw.to_string(),
            host,
            scheme,
            port,
            target_type,
            base_domain,
            is_web_target,
            is_https,
            resolved_ips,
        };
        profile.check_invariants()?;
        Ok(profile)
    }

    fn check_invariants(&self) -> Result<(), OrchestratorError> {
        if self.target_type == TargetType::IpAddress && self.base_domain.is_some() {
            return Err(OrchestratorError::ArchitectureViolation(
                "IP_ADDRESS profile must not carry a base_domain".into(),
            ));
        }
        if self.target_type == TargetType::Subdomain && self.base_domain.is_none() {
            return Err(OrchestratorError::ArchitectureViolation(
                "SUBDOMAIN profile must carry a base_domain".into(),
            ));
        }
        if self.is_https && !matches!(self.scheme, Scheme::Https) {
            return Err(OrchestratorError::ArchitectureViolation(
                "is_https set without scheme=https".into(),
            ));
        }
        Ok(())
    }

    pub fn base_url(&self) -> String {
        if (self.is_https && self.port == 443) || (!self.is_https && self.port == 80) {
            format!("{}://{}", self.scheme, self.host)
        } else {
            format!("{}://{}:{}", self.scheme, self.host, self.port)
        }
    }
}

fn split_host_port(authority: &str) -> Result<(String, Option<u16>), OrchestratorError> {
    // IPv6 literal in brackets: [::1]:8080
    if let Some(rest) = authority.strip_prefix('[') {
        if let Some(end) = rest.find(']') {
            let host = &rest[..end];
            let after = &rest[end + 1..];
            let port = if let Some(p) = after.strip_prefix(':') {
                Some(p.parse::<u16>().map_err(|_| {
                    OrchestratorError::InvalidInput(format!("invalid port: {p:?}"))
                })?)
            } else {
                None
            };
            return Ok((host.to_string(), port));
        }
        return Err(OrchestratorError::InvalidInput(
            "unterminated IPv6 literal".into(),
        ));
    }

    match authority.rsplit_once(':') {
        Some((host, port_str)) if port_str.chars().all(|c| c.is_ascii_digit()) && !port_str.is_empty() => {
            let port = port_str
                .parse::<u16>()
                .map_err(|_| OrchestratorError::InvalidInput(format!("invalid port: {port_str:?}")))?;
            Ok((host.to_string(), Some(port)))
        }
        _ => Ok((authority.to_string(), None)),
    }
}

fn classify_host(host: &str) -> (TargetType, Option<String>) {
    if IpAddr::from_str(host).is_ok() {
        return (TargetType::IpAddress, None);
    }

    let labels: Vec<&str> = host.split('.').filter(|l| !l.is_empty()).collect();

    if has_cctld_suffix(&labels) {
        return if labels.len() <= 3 {
            (TargetType::RootDomain, None)
        } else {
            let base = labels[labels.len() - 3..].join(".");
            (TargetType::Subdomain, Some(base))
        };
    }

    match labels.len() {
        0 | 1 | 2 => (TargetType::RootDomain, None),
        _ => {
            let base = labels[labels.len() - 2..].join(".");
            (TargetType::Subdomain, Some(base))
        }
    }
}
