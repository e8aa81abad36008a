//! The Stager — raw rows in, a ranked EventStore out.
//!
//! RULES:
//!   - Sentinel values are filled, never dropped. An `Unknown` plan or a
//!     `-1` sales rep is a real domain value that the inconsistency rules
//!     report downstream.
//!   - A missing or unparseable event date is fatal: the whole run aborts
//!     with no partial staged output.
//!   - Ranking is a grouped stable sort plus enumeration, not a query
//!     engine window function.

use crate::{
    error::{PipelineError, PipelineResult},
    event::{EventStore, EventType, RawEvent, StagedEvent},
    types::ClientId,
};
use chrono::NaiveDate;
use std::collections::HashMap;

const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y"];

/// Validate, normalize and rank a batch of raw rows.
///
/// Purely functional over its input: no side effect beyond the returned
/// EventStore.
pub fn stage(raw_rows: Vec<RawEvent>) -> PipelineResult<EventStore> {
    if raw_rows.is_empty() {
        return Err(PipelineError::EmptyInput);
    }

    let mut events = Vec::with_capacity(raw_rows.len());
    for (row, raw) in raw_rows.into_iter().enumerate() {
        events.push(stage_row(row, raw)?);
    }
    assign_ranks(&mut events);

    let store = EventStore::new(events);
    log::info!(
        "staged {} events across {} clients",
        store.len(),
        store.client_ids().len(),
    );
    Ok(store)
}

fn stage_row(row: usize, raw: RawEvent) -> PipelineResult<StagedEvent> {
    let record_id = require_integer(row, "record_id", raw.record_id.as_deref())?;
    let client_id = require_integer(row, "client_id", raw.client_id.as_deref())?;
    let event_date = parse_event_date(row, raw.event_date.as_deref())?;
    let event_type = EventType::parse(trimmed(raw.event_type.as_deref()));

    Ok(StagedEvent {
        record_id,
        client_id,
        event_type,
        event_date,
        plan: fill_plan(raw.plan.as_deref()),
        region: trimmed(raw.region.as_deref()).to_string(),
        marketing_channel: fill_unknown(raw.marketing_channel.as_deref()),
        sales_rep_id: parse_sales_rep(raw.sales_rep_id.as_deref()),
        source_system: fill_unknown(raw.source_system.as_deref()),
        event_rank: 0, // assigned below
    })
}

/// Assign `event_rank` per (client_id, event_type) group: stable ascending
/// sort by event_date, ties broken by original ingestion order, then
/// 1-based enumeration.
fn assign_ranks(events: &mut [StagedEvent]) {
    let mut groups: HashMap<(ClientId, EventType), Vec<usize>> = HashMap::new();
    for (idx, event) in events.iter().enumerate() {
        groups
            .entry((event.client_id, event.event_type.clone()))
            .or_default()
            .push(idx);
    }

    for indices in groups.values_mut() {
        indices.sort_by_key(|&i| (events[i].event_date, i));
        for (rank, &i) in indices.iter().enumerate() {
            events[i].event_rank = rank as u32 + 1;
        }
    }
}

fn trimmed(value: Option<&str>) -> &str {
    value.map(str::trim).unwrap_or("")
}

/// Integer coercion for id columns. Integral floats ("1009.0") are
/// accepted; anything else fails the run.
fn require_integer(row: usize, column: &str, value: Option<&str>) -> PipelineResult<i64> {
    let text = trimmed(value);
    coerce_integer(text).ok_or_else(|| PipelineError::Validation {
        message: format!("row {row}: column '{column}' is not numeric (got '{text}')"),
    })
}

fn coerce_integer(text: &str) -> Option<i64> {
    if text.is_empty() {
        return None;
    }
    if let Ok(n) = text.parse::<i64>() {
        return Some(n);
    }
    match text.parse::<f64>() {
        Ok(f) if f.fract() == 0.0 => Some(f as i64),
        _ => None,
    }
}

fn parse_event_date(row: usize, value: Option<&str>) -> PipelineResult<NaiveDate> {
    let text = trimmed(value);
    if text.is_empty() {
        return Err(PipelineError::Schema {
            message: format!("row {row}: event_date is missing"),
        });
    }
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(text, fmt).ok())
        .ok_or_else(|| PipelineError::Schema {
            message: format!("row {row}: event_date '{text}' cannot be parsed"),
        })
}

/// Missing plans become the `Unknown` sentinel; all plans are title-cased
/// so "premium" and "Premium" collapse to one value.
fn fill_plan(value: Option<&str>) -> String {
    let text = trimmed(value);
    if text.is_empty() {
        "Unknown".to_string()
    } else {
        title_case(text)
    }
}

fn fill_unknown(value: Option<&str>) -> String {
    let text = trimmed(value);
    if text.is_empty() {
        "unknown".to_string()
    } else {
        text.to_string()
    }
}

/// Missing or non-numeric sales reps collapse to the `-1` unassigned
/// sentinel. Not an error: the inconsistency rules surface these.
fn parse_sales_rep(value: Option<&str>) -> i64 {
    coerce_integer(trimmed(value)).unwrap_or(-1)
}

fn title_case(text: &str) -> String {
    text.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => {
                    first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase()
                }
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
