use std::collections::HashMap;

use anyhow::{anyhow, bail, Result};
use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, TimeZone, Utc};
use once_cell::sync::Lazy;
use regex::Regex;

/// Entity types known to the graph schema.
pub const ENTITY_TYPES: [&str; 13] = [
    "Requirement",
    "Preference",
    "Procedure",
    "Project",
    "Component",
    "Pattern",
    "Insight",
    "Workflow",
    "Agent",
    "ValidationPoint",
    "LimitationPattern",
    "PromptTemplate",
    "DomainConcept",
];

/// Edge types known to the graph schema.
pub const EDGE_TYPES: [&str; 14] = [
    "BELONGS_TO_PROJECT",
    "DEPENDS_ON",
    "ImplementsPattern",
    "LEADS_TO_INSIGHT",
    "VALIDATES",
    "TRIGGERS_LIMITATION",
    "COORDINATES_WITH",
    "ANALYZES_COMPONENT",
    "EVOLVES_FROM",
    "APPLIES_TO",
    "FOLLOWS_WORKFLOW",
    "PRECEDES_IN_WORKFLOW",
    "DOCUMENTS",
    "REFERENCES",
];

static ENTITY_LOOKUP: Lazy<HashMap<String, &'static str>> = Lazy::new(|| {
    ENTITY_TYPES
        .iter()
        .map(|name| (name.to_lowercase(), *name))
        .collect()
});

static EDGE_LOOKUP: Lazy<HashMap<String, &'static str>> = Lazy::new(|| {
    EDGE_TYPES
        .iter()
        .map(|name| (name.to_lowercase(), *name))
        .collect()
});

static RELATIVE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(\d+)\s+(minute|hour|day|week)s?\s+ago$").unwrap()
});

/// Canonicalize entity type names case-insensitively against the schema.
/// Returns `None` when the input is empty so callers can skip the filter.
pub fn canonical_entity_types(values: &[String]) -> Result<Option<Vec<String>>> {
    canonicalize(values, &ENTITY_LOOKUP, "entity", &ENTITY_TYPES)
}

/// Canonicalize edge type names case-insensitively against the schema.
pub fn canonical_edge_types(values: &[String]) -> Result<Option<Vec<String>>> {
    canonicalize(values, &EDGE_LOOKUP, "edge", &EDGE_TYPES)
}

fn canonicalize(
    values: &[String],
    lookup: &HashMap<String, &'static str>,
    kind: &str,
    valid: &[&str],
) -> Result<Option<Vec<String>>> {
    if values.is_empty() {
        return Ok(None);
    }

    let mut canonical = Vec::with_capacity(values.len());
    let mut invalid = Vec::new();
    for value in values {
        match lookup.get(&value.trim().to_lowercase()) {
            Some(name) => canonical.push(name.to_string()),
            None => invalid.push(value.as_str()),
        }
    }

    if !invalid.is_empty() {
        let mut sorted: Vec<&str> = valid.to_vec();
        sorted.sort_unstable();
        bail!(
            "Invalid {} types: {}. Valid types: {}",
            kind,
            invalid.join(", "),
            sorted.join(", ")
        );
    }

    Ok(Some(canonical))
}

/// Trim group IDs, dropping empty entries. `None` means no filter.
pub fn normalize_group_ids(values: &[String]) -> Option<Vec<String>> {
    let trimmed: Vec<String> = values
        .iter()
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty())
        .collect();

    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed)
    }
}

/// Validate that a score-like value sits in the unit interval.
pub fn check_threshold(value: f64, name: &str) -> Result<f64> {
    if !(0.0..=1.0).contains(&value) {
        bail!("{} must be between 0.0 and 1.0, got {}", name, value);
    }
    Ok(value)
}

/// Validate that a start bound does not come after its end bound.
pub fn check_date_range(
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
    range_name: &str,
) -> Result<()> {
    if let (Some(start), Some(end)) = (start, end) {
        if start > end {
            bail!(
                "Invalid {} date range: start date ({}) must be before end date ({})",
                range_name,
                start.to_rfc3339(),
                end.to_rfc3339()
            );
        }
    }
    Ok(())
}

/// Parse a point in time from RFC 3339, a bare date, or a relative phrase
/// such as "24 hours ago".
pub fn parse_when(input: &str) -> Result<DateTime<Utc>> {
    parse_when_at(input, Utc::now())
}

fn parse_when_at(input: &str, now: DateTime<Utc>) -> Result<DateTime<Utc>> {
    let input = input.trim();

    if let Ok(parsed) = DateTime::parse_from_rfc3339(input) {
        return Ok(parsed.with_timezone(&Utc));
    }

    // RFC 3339 without an offset is treated as UTC
    if let Ok(naive) = NaiveDateTime::parse_from_str(input, "%Y-%m-%dT%H:%M:%S") {
        return Ok(Utc.from_utc_datetime(&naive));
    }

    if let Ok(date) = NaiveDate::parse_from_str(input, "%Y-%m-%d") {
        let midnight = date
            .and_hms_opt(0, 0, 0)
            .ok_or_else(|| anyhow!("Invalid date: {}", input))?;
        return Ok(Utc.from_utc_datetime(&midnight));
    }

    match input.to_lowercase().as_str() {
        "now" => return Ok(now),
        "today" => {
            let midnight = now
                .date_naive()
                .and_hms_opt(0, 0, 0)
                .ok_or_else(|| anyhow!("Invalid date: {}", input))?;
            return Ok(Utc.from_utc_datetime(&midnight));
        }
        "yesterday" => return Ok(now - Duration::days(1)),
        _ => {}
    }

    if let Some(caps) = RELATIVE_RE.captures(input) {
        let amount: i64 = caps[1].parse()?;
        let duration = match caps[2].to_lowercase().as_str() {
            "minute" => Duration::minutes(amount),
            "hour" => Duration::hours(amount),
            "day" => Duration::days(amount),
            "week" => Duration::weeks(amount),
            unit => bail!("Unsupported time unit: {}", unit),
        };
        return Ok(now - duration);
    }

    Err(anyhow!(
        "Could not parse time '{}'. Use RFC 3339 (2025-01-15T12:00:00Z), a date \
         (2025-01-15), or a relative phrase (\"24 hours ago\")",
        input
    ))
}
