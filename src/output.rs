use anyhow::Result;
use clap::ValueEnum;
use serde_json::{Map, Value};
use std::collections::BTreeSet;

/// Supported output formats
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Indented JSON
    Json,
    /// Compact single-line JSON
    Jsonc,
    /// One JSON object per line
    Jsonl,
    /// Alias for jsonl
    Ndjson,
    /// Human-readable layout
    Pretty,
    /// Flattened rows
    Csv,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            OutputFormat::Json => "json",
            OutputFormat::Jsonc => "jsonc",
            OutputFormat::Jsonl => "jsonl",
            OutputFormat::Ndjson => "ndjson",
            OutputFormat::Pretty => "pretty",
            OutputFormat::Csv => "csv",
        };
        write!(f, "{}", name)
    }
}

/// Result shaping applied before serialization.
#[derive(Clone, Debug, Default)]
pub struct FormatOptions {
    /// Emit payloads as returned by the backend instead of simplified edges
    pub full: bool,
    /// Project each result down to the listed keys
    pub fields: Vec<String>,
    /// Collapse results to a list of UUIDs
    pub ids_only: bool,
}

impl FormatOptions {
    /// Options for payloads that should pass through untouched.
    pub fn full() -> Self {
        Self {
            full: true,
            ..Self::default()
        }
    }
}

/// Keys retained by the simplified edge shape, when present.
const SIMPLIFIED_KEYS: [&str; 5] = ["name", "fact", "group_id", "score", "uuid"];

/// Format backend data for the terminal.
pub fn format_output(data: &Value, format: OutputFormat, opts: &FormatOptions) -> Result<String> {
    let shaped = shape(data, opts);
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(&shaped)?),
        OutputFormat::Jsonc => Ok(serde_json::to_string(&shaped)?),
        OutputFormat::Jsonl | OutputFormat::Ndjson => format_lines(&shaped),
        OutputFormat::Pretty => Ok(format_pretty(&shaped)),
        OutputFormat::Csv => format_csv(&shaped),
    }
}

fn shape(data: &Value, opts: &FormatOptions) -> Value {
    if opts.ids_only {
        if let Value::Array(items) = data {
            return Value::Array(
                items
                    .iter()
                    .filter_map(|item| item.get("uuid").cloned())
                    .collect(),
            );
        }
    }

    let mut shaped = data.clone();
    if !opts.full {
        if let Value::Array(items) = &shaped {
            shaped = Value::Array(items.iter().map(simplify_edge).collect());
        }
    }

    if !opts.fields.is_empty() {
        shaped = project_fields(&shaped, &opts.fields);
    }

    shaped
}

/// Reduce an edge payload to its identifying fields, keeping only the
/// keys that are actually present.
pub fn simplify_edge(item: &Value) -> Value {
    let Value::Object(map) = item else {
        return item.clone();
    };

    let mut simplified = Map::new();
    for key in SIMPLIFIED_KEYS {
        if let Some(value) = map.get(key) {
            simplified.insert(key.to_string(), value.clone());
        }
    }
    Value::Object(simplified)
}

fn project_fields(value: &Value, fields: &[String]) -> Value {
    match value {
        Value::Array(items) => Value::Array(
            items
                .iter()
                .map(|item| project_fields(item, fields))
                .collect(),
        ),
        Value::Object(map) => {
            let mut projected = Map::new();
            for field in fields {
                if let Some(value) = map.get(field) {
                    projected.insert(field.clone(), value.clone());
                }
            }
            Value::Object(projected)
        }
        other => other.clone(),
    }
}

/// Strip embedding vectors anywhere in the payload. They dominate output
/// size and are meaningless in a terminal.
pub fn remove_embeddings(value: &Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.iter()
                .filter(|(key, _)| !is_embedding_key(key))
                .map(|(key, value)| (key.clone(), remove_embeddings(value)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.iter().map(remove_embeddings).collect()),
        other => other.clone(),
    }
}

fn is_embedding_key(key: &str) -> bool {
    key == "embedding" || key.ends_with("_embedding")
}

fn format_lines(data: &Value) -> Result<String> {
    let lines = match data {
        Value::Array(items) => items
            .iter()
            .map(serde_json::to_string)
            .collect::<Result<Vec<_>, _>>()?,
        other => vec![serde_json::to_string(other)?],
    };
    Ok(lines.join("\n"))
}

fn format_pretty(data: &Value) -> String {
    match data {
        Value::Array(items) => {
            if items.is_empty() {
                return "No results found.".to_string();
            }

            let mut output = Vec::new();
            for (i, item) in items.iter().enumerate() {
                output.push(format!("\n{}", "=".repeat(50)));
                output.push(format!("Result {}", i + 1));
                output.push("=".repeat(50));
                output.push(format_item(item));
            }
            output.join("\n")
        }
        other => format_item(other),
    }
}

fn format_item(item: &Value) -> String {
    let Value::Object(map) = item else {
        return display_scalar(item);
    };

    let mut lines = Vec::new();
    for (key, value) in map {
        if is_embedding_key(key) {
            lines.push(format!("{}: <embedding vector>", key));
            continue;
        }
        match value {
            Value::Array(items) if items.len() > 10 => {
                lines.push(format!("{}: [{} items]", key, items.len()));
            }
            Value::Array(_) | Value::Object(_) => {
                let nested =
                    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string());
                lines.push(format!("{}: {}", key, nested));
            }
            scalar => lines.push(format!("{}: {}", key, display_scalar(scalar))),
        }
    }
    lines.join("\n")
}

fn display_scalar(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn format_csv(data: &Value) -> Result<String> {
    let items: Vec<&Value> = match data {
        Value::Array(items) => items.iter().collect(),
        other => vec![other],
    };

    if items.is_empty() {
        return Ok(String::new());
    }

    // Flatten rows: nested values become JSON strings, embeddings are dropped
    let mut rows: Vec<Map<String, Value>> = Vec::with_capacity(items.len());
    for item in items {
        match item {
            Value::Object(map) => {
                let mut row = Map::new();
                for (key, value) in map {
                    if is_embedding_key(key) {
                        continue;
                    }
                    match value {
                        Value::Array(_) | Value::Object(_) => {
                            row.insert(key.clone(), Value::String(serde_json::to_string(value)?));
                        }
                        other => {
                            row.insert(key.clone(), other.clone());
                        }
                    }
                }
                rows.push(row);
            }
            other => {
                let mut row = Map::new();
                row.insert("value".to_string(), Value::String(display_scalar(other)));
                rows.push(row);
            }
        }
    }

    let columns: BTreeSet<&String> = rows.iter().flat_map(|row| row.keys()).collect();
    let columns: Vec<&String> = columns.into_iter().collect();

    let mut output = columns
        .iter()
        .map(|c| escape_csv_value(c))
        .collect::<Vec<_>>()
        .join(",");
    output.push('\n');

    for row in &rows {
        let cells: Vec<String> = columns
            .iter()
            .map(|column| {
                row.get(*column)
                    .map(|value| match value {
                        Value::Null => String::new(),
                        other => escape_csv_value(&display_scalar(other)),
                    })
                    .unwrap_or_default()
            })
            .collect();
        output.push_str(&cells.join(","));
        output.push('\n');
    }

    Ok(output)
}

fn escape_csv_value(value: &str) -> String {
    if value.contains(',') || value.contains('"') || value.contains('\n') {
        let escaped = value.replace('"', "\"\"");
        format!("\"{}\"", escaped)
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn edges() -> Value {
        json!([
            {
                "uuid": "u1",
                "name": "DEPENDS_ON",
                "fact": "A->B",
                "score": 0.9,
                "group_id": "g",
                "fact_embedding": [0.1, 0.2, 0.3],
                "episodes": ["e1"]
            },
            {
                "uuid": "u2",
                "name": "DEPENDS_ON",
                "fact": "B->C",
                "score": 0.7,
                "group_id": "g"
            }
        ])
    }

    #[test]
    fn json_output_round_trips() {
        let out = format_output(&edges(), OutputFormat::Json, &FormatOptions::full()).unwrap();
        let parsed: Value = serde_json::from_str(&out).unwrap();
        assert_eq!(parsed, edges());
    }

    #[test]
    fn jsonc_is_single_line() {
        let out = format_output(&edges(), OutputFormat::Jsonc, &FormatOptions::full()).unwrap();
        assert_eq!(out.lines().count(), 1);
        let parsed: Value = serde_json::from_str(&out).unwrap();
        assert_eq!(parsed, edges());
    }

    #[test]
    fn jsonl_emits_one_object_per_line() {
        let out = format_output(&edges(), OutputFormat::Jsonl, &FormatOptions::full()).unwrap();
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 2);
        let first: Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first["uuid"], "u1");
        let second: Value = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(second["uuid"], "u2");
    }

    #[test]
    fn default_shape_simplifies_edges() {
        let out = format_output(&edges(), OutputFormat::Jsonc, &FormatOptions::default()).unwrap();
        let parsed: Value = serde_json::from_str(&out).unwrap();
        assert_eq!(
            parsed,
            json!([
                {"name": "DEPENDS_ON", "fact": "A->B", "group_id": "g", "score": 0.9, "uuid": "u1"},
                {"name": "DEPENDS_ON", "fact": "B->C", "group_id": "g", "score": 0.7, "uuid": "u2"}
            ])
        );
    }

    #[test]
    fn fields_project_after_simplification() {
        let opts = FormatOptions {
            fields: vec!["uuid".into(), "score".into()],
            ..FormatOptions::default()
        };
        let out = format_output(&edges(), OutputFormat::Jsonc, &opts).unwrap();
        let parsed: Value = serde_json::from_str(&out).unwrap();
        assert_eq!(
            parsed,
            json!([{"uuid": "u1", "score": 0.9}, {"uuid": "u2", "score": 0.7}])
        );
    }

    #[test]
    fn ids_only_collapses_to_uuid_list() {
        let opts = FormatOptions {
            ids_only: true,
            ..FormatOptions::default()
        };
        let out = format_output(&edges(), OutputFormat::Jsonc, &opts).unwrap();
        assert_eq!(out, r#"["u1","u2"]"#);
    }

    #[test]
    fn simplify_edge_keeps_only_present_keys() {
        let edge = json!({"name": "DEPENDS_ON", "fact": "A->B", "uuid": "u1", "extra": 1});
        assert_eq!(
            simplify_edge(&edge),
            json!({"name": "DEPENDS_ON", "fact": "A->B", "uuid": "u1"})
        );
    }

    #[test]
    fn remove_embeddings_strips_nested_vectors() {
        let data = json!({
            "uuid": "n1",
            "name_embedding": [0.5, 0.5],
            "nested": {"embedding": [1.0], "kept": true}
        });
        assert_eq!(
            remove_embeddings(&data),
            json!({"uuid": "n1", "nested": {"kept": true}})
        );
    }

    #[test]
    fn pretty_labels_fields_and_elides_embeddings() {
        let out = format_output(&edges(), OutputFormat::Pretty, &FormatOptions::full()).unwrap();
        assert!(out.contains("Result 1"));
        assert!(out.contains("Result 2"));
        assert!(out.contains("fact: A->B"));
        assert!(out.contains("fact_embedding: <embedding vector>"));
    }

    #[test]
    fn pretty_empty_list_reports_no_results() {
        let out = format_output(&json!([]), OutputFormat::Pretty, &FormatOptions::full()).unwrap();
        assert_eq!(out, "No results found.");
    }

    #[test]
    fn pretty_long_lists_are_elided() {
        let data = json!([{"uuid": "u1", "episodes": [1,2,3,4,5,6,7,8,9,10,11]}]);
        let out = format_output(&data, OutputFormat::Pretty, &FormatOptions::full()).unwrap();
        assert!(out.contains("episodes: [11 items]"));
    }

    #[test]
    fn csv_flattens_and_quotes() {
        let data = json!([
            {"uuid": "u1", "fact": "uses a, b", "score": 0.9, "fact_embedding": [0.1]},
            {"uuid": "u2", "fact": "plain", "score": 0.7}
        ]);
        let out = format_output(&data, OutputFormat::Csv, &FormatOptions::full()).unwrap();
        let mut lines = out.lines();
        assert_eq!(lines.next(), Some("fact,score,uuid"));
        assert_eq!(lines.next(), Some("\"uses a, b\",0.9,u1"));
        assert_eq!(lines.next(), Some("plain,0.7,u2"));
    }

    #[test]
    fn csv_encodes_nested_values_as_json() {
        let data = json!([{"uuid": "u1", "episodes": ["e1", "e2"]}]);
        let out = format_output(&data, OutputFormat::Csv, &FormatOptions::full()).unwrap();
        assert!(out.contains(r#""[""e1"",""e2""]""#));
    }
}
