use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::cache::{CacheSnapshot, ParamSource};
use crate::normalize::normalize_endpoint;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ParamEdge {
    pub parameter: String,
    pub provenance: ParamSource,
    pub is_reflectable: bool,
    pub is_sql_candidate: bool,
    pub is_cmd_candidate: bool,
}

/// Normalized view of (endpoint -> method -> parameter -> provenance),
/// derived from crawler output (spec.md §4.3). Queryable for subsets the
/// payload tools need, e.g. "reflectable endpoints".
#[derive(Debug, Default)]
pub struct EndpointGraph {
    nodes: BTreeMap<String, BTreeMap<String, BTreeSet<ParamEdge>>>,
    forms: BTreeSet<String>,
}

impl EndpointGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_edge(&mut self, endpoint: &str, method: &str, edge: ParamEdge) {
        let endpoint = normalize_endpoint(endpoint);
        let method = method.to_uppercase();
        self.nodes
            .entry(endpoint)
            .or_default()
            .entry(method)
            .or_default()
            .insert(edge);
    }

    pub fn add_form(&mut self, endpoint: &str) {
        self.forms.insert(normalize_endpoint(endpoint));
    }

    pub fn endpoint_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn endpoints_with_forms(&self) -> Vec<String> {
        self.forms.iter().cloned().collect()
    }

    pub fn reflectable_endpoints(&self) -> Vec<String> {
        self.endpoints_matching(|e| e.is_reflectable)
    }

    pub fn sql_injectable_endpoints(&self) -> Vec<String> {
        self.endpoints_matching(|e| e.is_sql_candidate)
    }

    pub fn cmd_injectable_endpoints(&self) -> Vec<String> {
        self.endpoints_matching(|e| e.is_cmd_candidate)
    }

    fn endpoints_matching(&self, pred: impl Fn(&ParamEdge) -> bool) -> Vec<String> {
        self.nodes
            .iter()
            .filter(|(_, methods)| {
                methods
                    .values()
                    .any(|edges| edges.iter().any(&pred))
            })
            .map(|(endpoint, _)| endpoint.clone())
            .collect()
    }

    pub fn parameters_for(&self, endpoint: &str) -> Vec<ParamEdge> {
        let endpoint = normalize_endpoint(endpoint);
        self.nodes
            .get(&endpoint)
            .map(|methods| methods.values().flat_map(|e| e.iter().cloned()).collect())
            .unwrap_or_default()
    }
}

/// Rebuild a graph from a cache snapshot's parameter table (spec.md §4.3).
/// The cache tracks params by name with the set of endpoints they appeared
/// on, not by endpoint with its set of params, so this inverts that index;
/// the cache also never records which HTTP method a parameter arrived on
/// (the crawler parser doesn't carry it through), so every edge here is
/// recorded under `GET` as the only method the rest of the engine ever
/// queries the graph by.
pub fn build_graph_from_snapshot(snapshot: &CacheSnapshot) -> EndpointGraph {
    let mut graph = EndpointGraph::new();
    for (name, info) in &snapshot.parameters {
        let provenance = info.sources.iter().next().copied().unwrap_or(ParamSource::Url);
        for endpoint in &info.endpoints {
            graph.add_edge(
                endpoint,
                "GET",
                ParamEdge {
                    parameter: name.clone(),
                    provenance,
                    is_reflectable: info.is_reflectable,
                    is_sql_candidate: info.is_sql_candidate,
                    is_cmd_candidate: info.is_cmd_candidate,
                },
            );
        }
    }
    graph
}
