use anyhow::Result;
use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::cli::{Order, Reranker, SearchArgs};
use crate::client::{
    ComparisonOperator, DateFilter, SearchFilters, SearchRequest, ServiceClient,
};
use crate::config::Config;
use crate::output::{self, FormatOptions};
use crate::validate;

/// The search mode is derived from the flags: reranking options win over
/// date filters, date filters win over a plain search.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum SearchMode {
    Basic,
    Temporal,
    Advanced,
}

pub async fn run(config: &Config, args: SearchArgs) -> Result<()> {
    let created_after = args
        .created_after
        .as_deref()
        .map(validate::parse_when)
        .transpose()?;
    let created_before = args
        .created_before
        .as_deref()
        .map(validate::parse_when)
        .transpose()?;
    validate::check_date_range(created_after, created_before, "created")?;

    let entity_types = validate::canonical_entity_types(&args.entity_types)?;
    let edge_types = validate::canonical_edge_types(&args.edge_types)?;
    let group_ids = validate::normalize_group_ids(&args.group_ids);
    let min_score = args
        .quality_threshold
        .map(|threshold| validate::check_threshold(threshold, "quality-threshold"))
        .transpose()?;

    let has_advanced = args.method.is_some() || args.reranker.is_some() || min_score.is_some();
    let has_temporal = created_after.is_some() || created_before.is_some();
    let mode = select_mode(has_advanced, has_temporal);
    tracing::info!(?mode, query = %args.query, "searching knowledge graph");

    let mut request = SearchRequest::new(&args.query, args.max_results);
    request.group_ids = group_ids;
    request.filters = build_filters(entity_types, edge_types, created_after, created_before);
    if mode == SearchMode::Basic {
        request.center_node_uuid = args.center_node.clone();
    }
    if mode == SearchMode::Advanced {
        request.method = args.method.map(|method| method.as_str());
        request.reranker = Some(reranker_config(args.reranker));
        request.min_score = min_score;
    }

    let service = ServiceClient::new(&config.service_url)?;
    let mut results = service.search_edges(&request).await?;

    // An empty edge search falls back to entity nodes, except in advanced
    // mode where the reranker configuration only applies to edges
    if results.is_empty() && mode != SearchMode::Advanced {
        results = service.search_nodes(&request).await?;
    }

    sort_results(&mut results, args.order);

    let opts = FormatOptions {
        full: args.full,
        fields: args.fields.clone(),
        ids_only: args.ids_only,
    };
    println!(
        "{}",
        output::format_output(&Value::Array(results), args.output, &opts)?
    );
    Ok(())
}

fn select_mode(has_advanced: bool, has_temporal: bool) -> SearchMode {
    if has_advanced {
        SearchMode::Advanced
    } else if has_temporal {
        SearchMode::Temporal
    } else {
        SearchMode::Basic
    }
}

/// Unset and explicit-none rerankers both fall back to reciprocal rank
/// fusion, the service's default ordering.
fn reranker_config(reranker: Option<Reranker>) -> &'static str {
    match reranker {
        Some(Reranker::CrossEncoder) => "cross_encoder",
        Some(Reranker::Mmr) => "mmr",
        _ => "rrf",
    }
}

fn build_filters(
    entity_types: Option<Vec<String>>,
    edge_types: Option<Vec<String>>,
    created_after: Option<DateTime<Utc>>,
    created_before: Option<DateTime<Utc>>,
) -> Option<SearchFilters> {
    let mut bounds = Vec::new();
    if let Some(after) = created_after {
        bounds.push(DateFilter {
            date: after,
            comparison_operator: ComparisonOperator::GreaterThanEqual,
        });
    }
    if let Some(before) = created_before {
        bounds.push(DateFilter {
            date: before,
            comparison_operator: ComparisonOperator::LessThanEqual,
        });
    }

    let filters = SearchFilters {
        entity_types,
        edge_types,
        created_at: if bounds.is_empty() {
            None
        } else {
            Some(vec![bounds])
        },
    };

    if filters.is_empty() {
        None
    } else {
        Some(filters)
    }
}

fn sort_results(results: &mut [Value], order: Order) {
    match order {
        Order::Newest => results.sort_by(|a, b| created_at(b).cmp(&created_at(a))),
        Order::Oldest => results.sort_by(|a, b| created_at(a).cmp(&created_at(b))),
        Order::Relevance => {}
    }
}

/// ISO 8601 timestamps sort correctly as strings
fn created_at(result: &Value) -> &str {
    result["created_at"].as_str().unwrap_or("")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn advanced_flags_win_over_temporal() {
        assert_eq!(select_mode(true, true), SearchMode::Advanced);
        assert_eq!(select_mode(true, false), SearchMode::Advanced);
        assert_eq!(select_mode(false, true), SearchMode::Temporal);
        assert_eq!(select_mode(false, false), SearchMode::Basic);
    }

    #[test]
    fn reranker_defaults_to_rank_fusion() {
        assert_eq!(reranker_config(None), "rrf");
        assert_eq!(reranker_config(Some(Reranker::None)), "rrf");
        assert_eq!(reranker_config(Some(Reranker::CrossEncoder)), "cross_encoder");
        assert_eq!(reranker_config(Some(Reranker::Mmr)), "mmr");
    }

    #[test]
    fn filters_are_omitted_when_nothing_is_set() {
        assert!(build_filters(None, None, None, None).is_none());
    }

    #[test]
    fn date_bounds_are_anded_in_one_group() {
        let after = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let before = Utc.with_ymd_and_hms(2025, 2, 1, 0, 0, 0).unwrap();
        let filters = build_filters(None, None, Some(after), Some(before)).unwrap();

        let created_at = filters.created_at.unwrap();
        assert_eq!(created_at.len(), 1);
        assert_eq!(created_at[0].len(), 2);
    }

    #[test]
    fn newest_sorts_descending_by_created_at() {
        let mut results = vec![
            json!({"uuid": "old", "created_at": "2025-01-01T00:00:00Z"}),
            json!({"uuid": "new", "created_at": "2025-06-01T00:00:00Z"}),
            json!({"uuid": "undated"}),
        ];
        sort_results(&mut results, Order::Newest);
        assert_eq!(results[0]["uuid"], "new");
        assert_eq!(results[1]["uuid"], "old");
        assert_eq!(results[2]["uuid"], "undated");
    }

    #[test]
    fn oldest_sorts_ascending_by_created_at() {
        let mut results = vec![
            json!({"uuid": "new", "created_at": "2025-06-01T00:00:00Z"}),
            json!({"uuid": "old", "created_at": "2025-01-01T00:00:00Z"}),
        ];
        sort_results(&mut results, Order::Oldest);
        assert_eq!(results[0]["uuid"], "old");
    }

    #[test]
    fn relevance_keeps_service_order() {
        let mut results = vec![
            json!({"uuid": "b", "created_at": "2025-06-01T00:00:00Z"}),
            json!({"uuid": "a", "created_at": "2025-01-01T00:00:00Z"}),
        ];
        sort_results(&mut results, Order::Relevance);
        assert_eq!(results[0]["uuid"], "b");
    }
}
