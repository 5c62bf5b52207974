use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::normalize::normalize_endpoint;

/// Bound on `Finding::evidence`, per spec.md §3.
pub const MAX_EVIDENCE_BYTES: usize = 4 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VulnerabilityType {
    Xss,
    SqlInjection,
    CmdInjection,
    WeakTls,
    InfoDisclosure,
    OpenRedirect,
    Ssrf,
    PathTraversal,
}

/// Severity ordered Info < Low < Medium < High < Critical so the derived
/// `Ord` impl can be used directly for the registry's "keep highest
/// severity" merge rule (spec.md §4.9 step 3, P4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    Info,
    Low,
    Medium,
    High,
    Critical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OwaspCategory {
    A01,
    A02,
    A03,
    A04,
    A05,
    A06,
    A07,
    A08,
    A09,
    A10,
    Unmapped,
}

/// Fixed, exact-match table (spec.md §4.9 step 1: "keyword-free exact
/// map"). Unknown vulnerability types are not representable by
/// `VulnerabilityType` at all, so unmapped is unreachable here; the hook
/// exists for parsers that may one day emit a type outside the canonical
/// set via a raw string, per P3.
fn owasp_map(vt: VulnerabilityType) -> OwaspCategory {
    use OwaspCategory::*;
    use VulnerabilityType::*;
    match vt {
        SqlInjection => A03,
        CmdInjection => A03,
        Xss => A03,
        PathTraversal => A01,
        OpenRedirect => A01,
        Ssrf => A10,
        WeakTls => A02,
        InfoDisclosure => A05,
    }
}

/// Per-tool reliability weight used by the confidence score (spec.md §4.9
/// step 2), in the documented 0.65..0.95 range. Unknown tools default to
/// a conservative middle value.
static TOOL_RELIABILITY: Lazy<BTreeMap<&'static str, f32>> = Lazy::new(|| {
    BTreeMap::from([
        ("nuclei", 0.90),
        ("nikto", 0.70),
        ("dalfox", 0.85),
        ("sqlmap", 0.95),
        ("commix", 0.85),
        ("testssl.sh", 0.90),
        ("whatweb", 0.65),
        ("gobuster", 0.70),
        ("katana", 0.75),
        ("wpscan", 0.85),
    ])
});

pub fn tool_reliability_weight(tool: &str) -> f32 {
    *TOOL_RELIABILITY.get(tool).unwrap_or(&0.75)
}

/// Confidence label bands (spec.md §4.9 step 2).
pub fn confidence_label(score: u8) -> &'static str {
    match score {
        80..=100 => "High",
        60..=79 => "Medium",
        40..=59 => "Low",
        _ => "Very-Low",
    }
}

/// Compose the 0..100 confidence score. `evidence_strength` is caller-
/// supplied in 0.0..=1.0 (payload reflected, stack trace present, status
/// corroboration, etc.); `corroborating_tools` excludes the reporting tool
/// itself; `crawler_observed` is `None` when the crawler never visited the
/// endpoint at all (context penalty), `Some(true)` when it did.
pub fn score_confidence(
    tool: &str,
    evidence_strength: f32,
    corroborating_tools: usize,
    crawler_observed: Option<bool>,
) -> u8 {
    let reliability = tool_reliability_weight(tool).clamp(0.0, 1.0);
    let mut score = reliability * 40.0 + evidence_strength.clamp(0.0, 1.0) * 40.0;

    let corroboration_bonus = (corroborating_tools.min(3) as f32) * 10.0;
    score += corroboration_bonus;

    score += match crawler_observed {
        Some(true) => 10.0,
        Some(false) => -10.0,
        None => 0.0,
    };

    score.clamp(0.0, 100.0).round() as u8
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Finding {
    pub id: Uuid,
    pub vulnerability_type: VulnerabilityType,
    pub endpoint: String,
    pub parameter: Option<String>,
    pub method: Option<String>,
    pub payload: Option<String>,
    pub evidence: String,
    pub severity: Severity,
    pub owasp_category: OwaspCategory,
    pub confidence: u8,
    pub tool: String,
    pub corroborating_tools: BTreeSet<String>,
    pub crawler_verified: bool,
    pub created_at: DateTime<Utc>,
}

impl Finding {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        vulnerability_type: VulnerabilityType,
        endpoint: &str,
        tool: &str,
        severity: Severity,
        confidence: u8,
        evidence: String,
        crawler_verified: bool,
    ) -> Self {
        let mut evidence = evidence;
        if evidence.len() > MAX_EVIDENCE_BYTES {
            evidence.truncate(MAX_EVIDENCE_BYTES);
        }
        Self {
            id: Uuid::new_v4(),
            owasp_category: owasp_map(vulnerability_type),
            vulnerability_type,
            endpoint: normalize_endpoint(endpoint),
            parameter: None,
            method: None,
            payload: None,
            evidence,
            severity,
            confidence,
            tool: tool.to_string(),
            corroborating_tools: BTreeSet::new(),
            crawler_verified,
            created_at: Utc::now(),
        }
    }

    pub fn with_parameter(mut self, parameter: impl Into<String>) -> Self {
        self.parameter = Some(parameter.into());
        self
    }

    pub fn with_method(mut self, method: impl Into<String>) -> Self {
        self.method = Some(method.into());
        self
    }

    pub fn with_payload(mut self, payload: impl Into<String>) -> Self {
        self.payload = Some(payload.into());
        self
    }

    fn dedup_key(&self) -> (String, VulnerabilityType) {
        (self.endpoint.clone(), self.vulnerability_type)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SeverityCounts {
    pub critical: u32,
    pub high: u32,
    pub medium: u32,
    pub low: u32,
    pub info: u32,
}

/// The authoritative, deduplicated set of findings (spec.md §3, §4.9).
/// Merge is associative and commutative: the final set does not depend on
/// the order in which concurrent tools finish (spec.md §5).
#[derive(Debug, Default)]
pub struct FindingsRegistry {
    entries: RwLock<BTreeMap<(String, VulnerabilityType), Finding>>,
}

impl FindingsRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a finding, merging with any existing entry under the same
    /// dedup key (spec.md §4.9 step 3, P4). A merge is also where the
    /// corroboration bonus from step 2 is realized: a second tool agreeing
    /// on the same `(endpoint, vulnerability_type)` raises confidence by
    /// +10 per additional distinct tool, capped at +30 overall.
    pub fn add(&self, mut finding: Finding) {
        let key = finding.dedup_key();
        let mut entries = self.entries.write();
        match entries.get_mut(&key) {
            None => {
                finding.corroborating_tools.insert(finding.tool.clone());
                entries.insert(key, finding);
            }
            Some(existing) => {
                existing.corroborating_tools.insert(existing.tool.clone());
                existing.corroborating_tools.insert(finding.tool.clone());
                existing.corroborating_tools.extend(finding.corroborating_tools.drain());

                if finding.severity > existing.severity {
                    existing.severity = finding.severity;
                }
                let merged_base = existing.confidence.max(finding.confidence);
                let bonus = ((existing.corroborating_tools.len().saturating_sub(1)).min(3) * 10) as u8;
                existing.confidence = merged_base.saturating_add(bonus).min(100);
                if finding.evidence.len() > existing.evidence.len() {
                    existing.evidence = finding.evidence.clone();
                }
                existing.crawler_verified = existing.crawler_verified || finding.crawler_verified;
                if existing.parameter.is_none() {
                    existing.parameter = finding.parameter.take();
                }
                if existing.payload.is_none() {
                    existing.payload = finding.payload.take();
                }
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn has_finding_for_tool(&self, tool: &str) -> bool {
        self.entries
            .read()
            .values()
            .any(|f| f.tool == tool || f.corroborating_tools.contains(tool))
    }

    /// Number of distinct tools already recorded under `(endpoint, vulnerability_type)`,
    /// used by callers that want to pre-score a finding's corroboration bonus
    /// before handing it to `add` (0 when the dedup key is not yet present).
    pub fn existing_corroboration_count(&self, endpoint: &str, vulnerability_type: VulnerabilityType) -> usize {
        let key = (normalize_endpoint(endpoint), vulnerability_type);
        self.entries.read().get(&key).map(|f| f.corroborating_tools.len()).unwrap_or(0)
    }

    /// Finalized list, sorted by severity DESC then confidence DESC
    /// (spec.md §4.11 step 6).
    pub fn finalize(&self) -> Vec<Finding> {
        let mut items: Vec<Finding> = self.entries.read().values().cloned().collect();
        items.sort_by(|a, b| {
            b.severity
                .cmp(&a.severity)
                .then(b.confidence.cmp(&a.confidence))
                .then(a.endpoint.cmp(&b.endpoint))
        });
        items
    }

    pub fn severity_counts(&self) -> SeverityCounts {
        let mut counts = SeverityCounts::default();
        for f in self.entries.read().values() {
            match f.severity {
                Severity::Critical => counts.critical += 1,
                Severity::High => counts.high += 1,
                Severity::Medium => counts.medium += 1,
                Severity::Low => counts.low += 1,
                Severity::Info => counts.info += 1,
            }
        }
        counts
    }

    pub fn owasp_counts(&self) -> BTreeMap<OwaspCategory, u32> {
        let mut counts = BTreeMap::new();
        for f in self.entries.read().values() {
            *counts.entry(f.owasp_category).or_insert(0) += 1;
        }
        counts
    }

    pub fn corroborated_count(&self) -> usize {
        self.entries
            .read()
            .values()
            .filter(|f| f.corroborating_tools.len() > 1)
            .count()
    }

    pub fn high_confidence_count(&self) -> usize {
        self.entries.read().values().filter(|f| f.confidence >= 80).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn finding(endpoint: &str, tool: &str, severity: Severity, confidence: u8) -> Finding {
        Finding::new(
            VulnerabilityType::Xss,
            endpoint,
            tool,
            severity,
            confidence,
            "<script>alert(1)</script> reflected".to_string(),
            true,
        )
    }

    #[test]
    fn owasp_map_never_unmapped_for_canonical_types() {
        for vt in [
            VulnerabilityType::Xss,
            VulnerabilityType::SqlInjection,
            VulnerabilityType::CmdInjection,
            VulnerabilityType::WeakTls,
            VulnerabilityType::InfoDisclosure,
            VulnerabilityType::OpenRedirect,
            VulnerabilityType::Ssrf,
            VulnerabilityType::PathTraversal,
        ] {
            assert_ne!(owasp_map(vt), OwaspCategory::Unmapped);
        }
    }

    #[test]
    fn corroborated_xss_merges_confidence_and_severity() {
        let registry = FindingsRegistry::new();
        registry.add(finding("https://example.com/search", "dalfox", Severity::Medium, 70));
        registry.add(finding("https://example.com/search", "nuclei", Severity::High, 65));

        let items = registry.finalize();
        assert_eq!(items.len(), 1);
        let f = &items[0];
        assert_eq!(f.severity, Severity::High);
        assert_eq!(f.confidence, 80); // max(70, 65) + 10 corroboration bonus for the 2nd tool
        assert_eq!(f.corroborating_tools, BTreeSet::from(["dalfox".to_string(), "nuclei".to_string()]));
    }

    #[test]
    fn evidence_is_bounded() {
        let huge = "A".repeat(MAX_EVIDENCE_BYTES * 2);
        let f = Finding::new(VulnerabilityType::SqlInjection, "/x", "sqlmap", Severity::High, 90, huge, false);
        assert_eq!(f.evidence.len(), MAX_EVIDENCE_BYTES);
    }

    #[test]
    fn confidence_score_is_clamped_and_capped_corroboration() {
        let score = score_confidence("sqlmap", 1.0, 10, Some(true));
        assert_eq!(score, 100);
        let score = score_confidence("whatweb", 0.0, 0, Some(false));
        assert!(score <= 100);
    }

    #[test]
    fn registry_is_order_independent() {
        let a = FindingsRegistry::new();
        a.add(finding("https://example.com/search", "dalfox", Severity::Medium, 70));
        a.add(finding("https://example.com/search", "nuclei", Severity::High, 65));

        let b = FindingsRegistry::new();
        b.add(finding("https://example.com/search", "nuclei", Severity::High, 65));
        b.add(finding("https://example.com/search", "dalfox", Severity::Medium, 70));

        assert_eq!(a.finalize()[0].severity, b.finalize()[0].severity);
        assert_eq!(a.finalize()[0].confidence, b.finalize()[0].confidence);
    }
}
