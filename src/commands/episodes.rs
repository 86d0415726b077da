use anyhow::{anyhow, bail, Context, Result};
use chrono::{DateTime, Utc};
use serde_json::{json, Value};

use crate::cli::{EpisodeCommands, SourceKind};
use crate::client::{AddEpisodeRequest, EpisodeQuery, ServiceClient};
use crate::config::Config;
use crate::output::{self, FormatOptions, OutputFormat};
use crate::validate;

pub async fn run(config: &Config, command: EpisodeCommands) -> Result<()> {
    match command {
        EpisodeCommands::Add {
            name,
            content,
            source,
            group_id,
            entity_types,
            timestamp,
            from_file,
        } => {
            add(
                config,
                name,
                content,
                source,
                group_id,
                entity_types,
                timestamp,
                from_file,
            )
            .await
        }
        EpisodeCommands::Get {
            group_id,
            last_n,
            after,
            before,
            output,
        } => get(config, group_id, last_n, after, before, output).await,
        EpisodeCommands::ProcessBulk {
            file,
            group_id,
            batch_size,
            dry_run,
        } => process_bulk(config, file, group_id, batch_size, dry_run).await,
    }
}

#[allow(clippy::too_many_arguments)]
async fn add(
    config: &Config,
    name: String,
    content: String,
    source: SourceKind,
    group_id: Option<String>,
    entity_types: Option<String>,
    timestamp: Option<String>,
    from_file: bool,
) -> Result<()> {
    let content = resolve_content(&content, from_file)?;
    let entity_types = entity_types.as_deref().map(parse_entity_types).transpose()?;
    let reference_time = timestamp
        .as_deref()
        .map(validate::parse_when)
        .transpose()?
        .unwrap_or_else(Utc::now);

    let request = AddEpisodeRequest {
        name,
        content,
        source: source.as_str(),
        source_description: source.as_str().to_string(),
        group_id,
        reference_time,
        entity_types,
    };

    tracing::info!(episode = %request.name, source = request.source, "adding episode");
    let service = ServiceClient::new(&config.service_url)?;
    let result = service.add_episode(&request).await?;

    let summary = json!({
        "episode": result.get("episode").cloned().unwrap_or(Value::Null),
        "nodes_created": result["nodes"].as_array().map_or(0, Vec::len),
        "edges_created": result["edges"].as_array().map_or(0, Vec::len),
    });
    println!(
        "{}",
        output::format_output(&summary, OutputFormat::Json, &FormatOptions::full())?
    );
    Ok(())
}

/// `@path` and `--from-file` both read episode content from disk.
fn resolve_content(content: &str, from_file: bool) -> Result<String> {
    if let Some(path) = content.strip_prefix('@') {
        std::fs::read_to_string(path).with_context(|| format!("Error reading file: {}", path))
    } else if from_file {
        std::fs::read_to_string(content)
            .with_context(|| format!("Error reading file: {}", content))
    } else {
        Ok(content.to_string())
    }
}

fn parse_entity_types(raw: &str) -> Result<Value> {
    let value: Value =
        serde_json::from_str(raw).context("Error parsing entity types JSON")?;
    if !value.is_object() {
        bail!("Custom entity types must be a JSON object");
    }
    Ok(value)
}

async fn get(
    config: &Config,
    group_id: Option<String>,
    last_n: usize,
    after: Option<String>,
    before: Option<String>,
    format: OutputFormat,
) -> Result<()> {
    let after = after.as_deref().map(validate::parse_when).transpose()?;
    let before = before.as_deref().map(validate::parse_when).transpose()?;
    validate::check_date_range(after, before, "date range")?;

    // Retrieval walks backwards from a reference time
    let reference_time = before.unwrap_or_else(Utc::now);

    let service = ServiceClient::new(&config.service_url)?;
    let episodes = service
        .retrieve_episodes(&EpisodeQuery {
            group_id,
            last_n,
            reference_time,
        })
        .await?;

    let episodes = match after {
        Some(after) => filter_after(episodes, after),
        None => episodes,
    };

    println!(
        "{}",
        output::format_output(&Value::Array(episodes), format, &FormatOptions::full())?
    );
    Ok(())
}

/// The lower bound is applied client-side on each episode's `valid_at`.
fn filter_after(episodes: Vec<Value>, after: DateTime<Utc>) -> Vec<Value> {
    episodes
        .into_iter()
        .filter(|episode| {
            episode["valid_at"]
                .as_str()
                .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
                .map(|valid_at| valid_at.with_timezone(&Utc) > after)
                .unwrap_or(false)
        })
        .collect()
}

async fn process_bulk(
    config: &Config,
    file: String,
    group_id: Option<String>,
    batch_size: usize,
    dry_run: bool,
) -> Result<()> {
    let raw =
        std::fs::read_to_string(&file).with_context(|| format!("Error reading file: {}", file))?;
    let parsed: Value =
        serde_json::from_str(&raw).with_context(|| format!("Error parsing file: {}", file))?;
    let Value::Array(entries) = parsed else {
        bail!("File must contain a JSON array of episodes");
    };

    if dry_run {
        eprintln!("Dry run: would process {} episodes", entries.len());
        for (index, entry) in entries.iter().enumerate() {
            if entry.get("name").and_then(Value::as_str).is_none()
                || entry.get("content").and_then(Value::as_str).is_none()
            {
                eprintln!("Warning: episode {} missing required fields", index);
            }
        }
        let summary = json!({"status": "dry_run", "episodes": entries.len()});
        println!(
            "{}",
            output::format_output(&summary, OutputFormat::Json, &FormatOptions::full())?
        );
        return Ok(());
    }

    let service = ServiceClient::new(&config.service_url)?;
    let batch_size = batch_size.max(1);
    let mut processed = 0usize;
    let mut failed = 0usize;
    let mut errors = Vec::new();

    for (batch_index, batch) in entries.chunks(batch_size).enumerate() {
        eprintln!("Processing batch {}...", batch_index + 1);
        for (offset, entry) in batch.iter().enumerate() {
            let index = batch_index * batch_size + offset;
            match ingest_entry(&service, entry, group_id.as_deref()).await {
                Ok(()) => processed += 1,
                Err(error) => {
                    failed += 1;
                    errors.push(json!({
                        "index": index,
                        "name": entry["name"].as_str().unwrap_or("Unknown"),
                        "error": error.to_string(),
                    }));
                }
            }
        }
    }

    let summary = json!({"processed": processed, "failed": failed, "errors": errors});
    println!(
        "{}",
        output::format_output(&summary, OutputFormat::Json, &FormatOptions::full())?
    );
    Ok(())
}

async fn ingest_entry(
    service: &ServiceClient,
    entry: &Value,
    default_group: Option<&str>,
) -> Result<()> {
    let name = entry["name"]
        .as_str()
        .ok_or_else(|| anyhow!("missing required field: name"))?;
    let content = entry["content"]
        .as_str()
        .ok_or_else(|| anyhow!("missing required field: content"))?;
    let source = match entry["source"].as_str().unwrap_or("text") {
        "json" => "json",
        "message" => "message",
        _ => "text",
    };
    let group_id = default_group
        .map(str::to_string)
        .or_else(|| entry["group_id"].as_str().map(str::to_string));

    let request = AddEpisodeRequest {
        name: name.to_string(),
        content: content.to_string(),
        source,
        source_description: source.to_string(),
        group_id,
        reference_time: Utc::now(),
        entity_types: None,
    };

    service.add_episode(&request).await?;
    Ok(())
}
