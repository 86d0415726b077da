use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

/// Request body for the service's edge and node search endpoints.
#[derive(Debug, Clone, Serialize)]
pub struct SearchRequest {
    pub query: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_ids: Option<Vec<String>>,
    pub max_results: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub center_node_uuid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filters: Option<SearchFilters>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reranker: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_score: Option<f64>,
}

impl SearchRequest {
    pub fn new(query: impl Into<String>, max_results: usize) -> Self {
        Self {
            query: query.into(),
            group_ids: None,
            max_results,
            center_node_uuid: None,
            filters: None,
            method: None,
            reranker: None,
            min_score: None,
        }
    }
}

/// Entity, edge, and temporal constraints attached to a search.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SearchFilters {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity_types: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub edge_types: Option<Vec<String>>,
    /// Outer list entries are OR-ed, inner filters are AND-ed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<Vec<Vec<DateFilter>>>,
}

impl SearchFilters {
    pub fn is_empty(&self) -> bool {
        self.entity_types.is_none() && self.edge_types.is_none() && self.created_at.is_none()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DateFilter {
    pub date: DateTime<Utc>,
    pub comparison_operator: ComparisonOperator,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub enum ComparisonOperator {
    #[serde(rename = ">=")]
    GreaterThanEqual,
    #[serde(rename = "<=")]
    LessThanEqual,
}

#[derive(Debug, Clone, Serialize)]
pub struct AddEpisodeRequest {
    pub name: String,
    pub content: String,
    pub source: &'static str,
    pub source_description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_id: Option<String>,
    pub reference_time: DateTime<Utc>,
    /// Custom entity type definitions, passed through verbatim
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity_types: Option<Value>,
}

/// Query-string parameters for episode retrieval.
#[derive(Debug, Clone)]
pub struct EpisodeQuery {
    pub group_id: Option<String>,
    pub last_n: usize,
    pub reference_time: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BuildCommunitiesRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_ids: Option<Vec<String>>,
    pub algorithm: &'static str,
}
