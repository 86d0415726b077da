use std::io::Write;

use anyhow::Result;
use chrono::Utc;
use serde_json::{json, Map, Value};

use crate::cli::{CommunityAlgorithm, ExportFormat, MaintenanceCommands};
use crate::client::{BuildCommunitiesRequest, CypherClient, QueryResult, ServiceClient};
use crate::config::Config;
use crate::output::{self, remove_embeddings, FormatOptions, OutputFormat};
use crate::validate;

pub async fn run(config: &Config, command: MaintenanceCommands) -> Result<()> {
    match command {
        MaintenanceCommands::Stats {
            group_ids,
            detailed,
            output,
        } => stats(config, group_ids, detailed, output).await,
        MaintenanceCommands::Export {
            group_ids,
            format,
            include_embeddings,
            output_file,
        } => export(config, group_ids, format, include_embeddings, output_file).await,
        MaintenanceCommands::BuildCommunities {
            group_ids,
            algorithm,
            output,
        } => build_communities(config, group_ids, algorithm, output).await,
        MaintenanceCommands::Clear { group_ids, confirm } => {
            clear(config, group_ids, confirm).await
        }
    }
}

fn cypher_client(config: &Config) -> Result<CypherClient> {
    Ok(CypherClient::new(
        &config.neo4j_uri,
        &config.neo4j_user,
        &config.neo4j_password,
        &config.neo4j_database,
    )?)
}

fn group_params(groups: &Option<Vec<String>>) -> Value {
    json!({ "group_ids": groups })
}

async fn stats(
    config: &Config,
    group_ids: Vec<String>,
    detailed: bool,
    format: OutputFormat,
) -> Result<()> {
    let groups = validate::normalize_group_ids(&group_ids);
    let cypher = cypher_client(config)?;
    let params = group_params(&groups);

    let node_types = cypher
        .execute(
            "MATCH (n) \
             WHERE $group_ids IS NULL OR n.group_id IN $group_ids \
             RETURN labels(n) AS labels, count(n) AS count",
            params.clone(),
        )
        .await?;

    let edge_types = cypher
        .execute(
            "MATCH ()-[r]->() \
             WHERE $group_ids IS NULL \
                OR startNode(r).group_id IN $group_ids \
                OR endNode(r).group_id IN $group_ids \
             RETURN type(r) AS type, count(r) AS count",
            params.clone(),
        )
        .await?;

    let group_counts = cypher
        .execute(
            "MATCH (n) \
             WHERE n.group_id IS NOT NULL \
             RETURN DISTINCT n.group_id AS group_id, count(n) AS node_count \
             ORDER BY node_count DESC",
            Value::Null,
        )
        .await?;

    let node_types = rows_to_map(&node_types);
    let edge_types = rows_to_map(&edge_types);
    let group_counts = rows_to_map(&group_counts);

    let mut stats = Map::new();
    stats.insert(
        "totals".to_string(),
        json!({
            "nodes": sum_counts(&node_types),
            "edges": sum_counts(&edge_types),
            "groups": group_counts.len(),
        }),
    );
    stats.insert("node_types".to_string(), Value::Object(node_types));
    stats.insert("edge_types".to_string(), Value::Object(edge_types));
    stats.insert("groups".to_string(), Value::Object(group_counts));

    if detailed {
        let degrees = cypher
            .execute(
                "MATCH (n) \
                 WHERE $group_ids IS NULL OR n.group_id IN $group_ids \
                 WITH n, COUNT { (n)--() } AS degree \
                 RETURN degree, count(n) AS count \
                 ORDER BY degree DESC LIMIT 20",
                params.clone(),
            )
            .await?;

        let recent = cypher
            .execute(
                "MATCH (n) \
                 WHERE n.created_at IS NOT NULL \
                   AND ($group_ids IS NULL OR n.group_id IN $group_ids) \
                 RETURN date(n.created_at) AS date, count(n) AS count \
                 ORDER BY date DESC LIMIT 7",
                params,
            )
            .await?;

        stats.insert(
            "degree_distribution".to_string(),
            Value::Object(rows_to_map(&degrees)),
        );
        stats.insert(
            "recent_activity".to_string(),
            Value::Object(rows_to_map(&recent)),
        );
    }

    println!(
        "{}",
        output::format_output(&Value::Object(stats), format, &FormatOptions::full())?
    );
    Ok(())
}

/// Collapse two-column rows into a map. First column values may be
/// strings, label lists, or numbers (degree buckets).
fn rows_to_map(result: &QueryResult) -> Map<String, Value> {
    let mut map = Map::new();
    for row in &result.rows {
        let (Some(key), Some(value)) = (row.first(), row.get(1)) else {
            continue;
        };
        if let Some(key) = row_key(key) {
            map.insert(key, value.clone());
        }
    }
    map
}

fn row_key(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Array(items) => items
            .first()
            .and_then(Value::as_str)
            .map(str::to_string),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn sum_counts(map: &Map<String, Value>) -> u64 {
    map.values().filter_map(Value::as_u64).sum()
}

async fn export(
    config: &Config,
    group_ids: Vec<String>,
    format: ExportFormat,
    include_embeddings: bool,
    output_file: Option<String>,
) -> Result<()> {
    let groups = validate::normalize_group_ids(&group_ids);
    let cypher = cypher_client(config)?;
    let params = group_params(&groups);

    let nodes_query = if groups.is_some() {
        "MATCH (n) WHERE n.group_id IN $group_ids RETURN n"
    } else {
        "MATCH (n) RETURN n"
    };
    let edges_query = if groups.is_some() {
        "MATCH (a)-[r]->(b) \
         WHERE a.group_id IN $group_ids OR b.group_id IN $group_ids \
         RETURN a.uuid AS source, b.uuid AS target, r, type(r) AS type"
    } else {
        "MATCH (a)-[r]->(b) RETURN a.uuid AS source, b.uuid AS target, r, type(r) AS type"
    };

    let node_rows = cypher.execute(nodes_query, params.clone()).await?;
    let edge_rows = cypher.execute(edges_query, params).await?;

    let mut nodes = Vec::with_capacity(node_rows.rows.len());
    for row in &node_rows.rows {
        let Some(node) = row.first() else { continue };
        nodes.push(if include_embeddings {
            node.clone()
        } else {
            remove_embeddings(node)
        });
    }

    let mut edges = Vec::with_capacity(edge_rows.rows.len());
    for row in &edge_rows.rows {
        let (Some(source), Some(target), Some(properties)) =
            (row.first(), row.get(1), row.get(2))
        else {
            continue;
        };
        let mut edge = match properties {
            Value::Object(map) => map.clone(),
            _ => Map::new(),
        };
        edge.insert("source".to_string(), source.clone());
        edge.insert("target".to_string(), target.clone());
        if let Some(kind) = row.get(3) {
            edge.insert("type".to_string(), kind.clone());
        }
        let edge = Value::Object(edge);
        edges.push(if include_embeddings {
            edge
        } else {
            remove_embeddings(&edge)
        });
    }

    let rendered = match format {
        ExportFormat::Json => {
            let envelope = json!({
                "export_date": Utc::now().to_rfc3339(),
                "format_version": "1.0",
                "statistics": {
                    "nodes": nodes.len(),
                    "edges": edges.len(),
                    "groups": groups.as_ref().map(|g| json!(g)).unwrap_or_else(|| json!("all")),
                },
                "nodes": nodes,
                "edges": edges,
            });
            serde_json::to_string_pretty(&envelope)?
        }
        ExportFormat::Graphml => render_graphml(&nodes, &edges),
    };

    match output_file {
        Some(path) => {
            std::fs::write(&path, rendered)?;
            eprintln!("Exported to {}", path);
        }
        None => println!("{}", rendered),
    }
    Ok(())
}

/// Render nodes and edges as a GraphML document. Property keys are
/// declared up front; nested values are emitted as JSON strings.
fn render_graphml(nodes: &[Value], edges: &[Value]) -> String {
    let node_keys = collect_keys(nodes, &["uuid"]);
    let edge_keys = collect_keys(edges, &["source", "target"]);

    let mut doc = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    doc.push_str("<graphml xmlns=\"http://graphml.graphdrawing.org/xmlns\">\n");

    for key in &node_keys {
        doc.push_str(&format!(
            "  <key id=\"n_{key}\" for=\"node\" attr.name=\"{key}\" attr.type=\"string\"/>\n",
            key = escape_xml(key)
        ));
    }
    for key in &edge_keys {
        doc.push_str(&format!(
            "  <key id=\"e_{key}\" for=\"edge\" attr.name=\"{key}\" attr.type=\"string\"/>\n",
            key = escape_xml(key)
        ));
    }

    doc.push_str("  <graph id=\"G\" edgedefault=\"directed\">\n");

    for (index, node) in nodes.iter().enumerate() {
        let id = node["uuid"]
            .as_str()
            .map(str::to_string)
            .unwrap_or_else(|| format!("n{}", index));
        doc.push_str(&format!("    <node id=\"{}\">\n", escape_xml(&id)));
        write_data_elements(&mut doc, node, &node_keys, "n_");
        doc.push_str("    </node>\n");
    }

    for edge in edges {
        let source = edge["source"].as_str().unwrap_or("");
        let target = edge["target"].as_str().unwrap_or("");
        doc.push_str(&format!(
            "    <edge source=\"{}\" target=\"{}\">\n",
            escape_xml(source),
            escape_xml(target)
        ));
        write_data_elements(&mut doc, edge, &edge_keys, "e_");
        doc.push_str("    </edge>\n");
    }

    doc.push_str("  </graph>\n</graphml>\n");
    doc
}

fn collect_keys(items: &[Value], skip: &[&str]) -> Vec<String> {
    let mut keys = std::collections::BTreeSet::new();
    for item in items {
        if let Value::Object(map) = item {
            for key in map.keys() {
                if !skip.contains(&key.as_str()) {
                    keys.insert(key.clone());
                }
            }
        }
    }
    keys.into_iter().collect()
}

fn write_data_elements(doc: &mut String, item: &Value, keys: &[String], prefix: &str) {
    let Value::Object(map) = item else { return };
    for key in keys {
        let Some(value) = map.get(key) else { continue };
        let rendered = match value {
            Value::String(s) => s.clone(),
            Value::Array(_) | Value::Object(_) => {
                serde_json::to_string(value).unwrap_or_default()
            }
            other => other.to_string(),
        };
        doc.push_str(&format!(
            "      <data key=\"{}{}\">{}</data>\n",
            prefix,
            escape_xml(key),
            escape_xml(&rendered)
        ));
    }
}

fn escape_xml(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

async fn build_communities(
    config: &Config,
    group_ids: Vec<String>,
    algorithm: CommunityAlgorithm,
    format: OutputFormat,
) -> Result<()> {
    let groups = validate::normalize_group_ids(&group_ids);

    let service = ServiceClient::new(&config.service_url)?;
    service
        .build_communities(&BuildCommunitiesRequest {
            group_ids: groups.clone(),
            algorithm: algorithm.as_str(),
        })
        .await?;

    let cypher = cypher_client(config)?;
    let count = cypher
        .execute(
            "MATCH (c:Community) RETURN count(c) AS community_count",
            Value::Null,
        )
        .await?;
    let communities_created = count.single().and_then(Value::as_u64).unwrap_or(0);

    let summary = json!({
        "status": "success",
        "communities_created": communities_created,
        "group_ids": groups.map(|g| json!(g)).unwrap_or_else(|| json!("all")),
    });
    println!(
        "{}",
        output::format_output(&summary, format, &FormatOptions::full())?
    );
    Ok(())
}

async fn clear(config: &Config, group_ids: Vec<String>, confirm: bool) -> Result<()> {
    let groups = validate::normalize_group_ids(&group_ids);

    if !confirm {
        match &groups {
            Some(groups) => println!(
                "This will DELETE all data in groups: {}",
                groups.join(", ")
            ),
            None => println!("This will DELETE THE ENTIRE GRAPH!"),
        }
        print!("Are you sure you want to continue? [y/N] ");
        std::io::stdout().flush()?;

        let mut answer = String::new();
        std::io::stdin().read_line(&mut answer)?;
        let answer = answer.trim().to_lowercase();
        if answer != "y" && answer != "yes" {
            println!("Aborted");
            return Ok(());
        }
    }

    let cypher = cypher_client(config)?;
    let summary = match groups {
        Some(groups) => {
            cypher
                .execute(
                    "MATCH (n) WHERE n.group_id IN $group_ids DETACH DELETE n",
                    json!({ "group_ids": groups }),
                )
                .await?;
            json!({ "cleared_groups": groups })
        }
        None => {
            cypher.execute("MATCH (n) DETACH DELETE n", Value::Null).await?;
            json!({ "status": "entire graph cleared" })
        }
    };

    println!(
        "{}",
        output::format_output(&summary, OutputFormat::Json, &FormatOptions::full())?
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(columns: &[&str], rows: Vec<Vec<Value>>) -> QueryResult {
        QueryResult {
            columns: columns.iter().map(|c| c.to_string()).collect(),
            rows,
        }
    }

    #[test]
    fn rows_to_map_handles_label_lists_and_numbers() {
        let labels = result(
            &["labels", "count"],
            vec![
                vec![json!(["Component", "Entity"]), json!(5)],
                vec![json!(["Pattern"]), json!(2)],
            ],
        );
        let map = rows_to_map(&labels);
        assert_eq!(map["Component"], 5);
        assert_eq!(map["Pattern"], 2);

        let degrees = result(
            &["degree", "count"],
            vec![vec![json!(12), json!(1)], vec![json!(3), json!(40)]],
        );
        let map = rows_to_map(&degrees);
        assert_eq!(map["12"], 1);
        assert_eq!(map["3"], 40);
    }

    #[test]
    fn sum_counts_totals_map_values() {
        let map = rows_to_map(&result(
            &["type", "count"],
            vec![
                vec![json!("DEPENDS_ON"), json!(7)],
                vec![json!("DOCUMENTS"), json!(3)],
            ],
        ));
        assert_eq!(sum_counts(&map), 10);
    }

    #[test]
    fn graphml_declares_keys_and_escapes_values() {
        let nodes = vec![
            json!({"uuid": "n1", "name": "Auth <core>", "group_id": "g"}),
            json!({"uuid": "n2", "name": "Billing & payments"}),
        ];
        let edges = vec![json!({
            "source": "n1",
            "target": "n2",
            "type": "DEPENDS_ON",
            "fact": "says \"hi\""
        })];

        let doc = render_graphml(&nodes, &edges);
        assert!(doc.starts_with("<?xml version=\"1.0\""));
        assert!(doc.contains("<key id=\"n_name\" for=\"node\""));
        assert!(doc.contains("<key id=\"e_fact\" for=\"edge\""));
        assert!(doc.contains("<node id=\"n1\">"));
        assert!(doc.contains("Auth &lt;core&gt;"));
        assert!(doc.contains("Billing &amp; payments"));
        assert!(doc.contains("<edge source=\"n1\" target=\"n2\">"));
        assert!(doc.contains("says &quot;hi&quot;"));
        assert!(doc.ends_with("</graphml>\n"));
    }

    #[test]
    fn graphml_nodes_without_uuid_get_positional_ids() {
        let nodes = vec![json!({"name": "anonymous"})];
        let doc = render_graphml(&nodes, &[]);
        assert!(doc.contains("<node id=\"n0\">"));
    }
}
