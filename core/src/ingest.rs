//! CSV ingest — a raw record source for the Stager.
//!
//! Header names are normalized to snake_case before matching, so
//! "Client ID" and "client_id" resolve to the same column. The four
//! identity columns must be present; the five descriptive columns may be
//! absent entirely and read as sentinel fills at staging.

use crate::{
    error::{PipelineError, PipelineResult},
    event::RawEvent,
};
use std::path::Path;

const REQUIRED_COLUMNS: [&str; 4] = ["record_id", "client_id", "event_type", "event_date"];

pub fn read_raw_events(path: &Path) -> PipelineResult<Vec<RawEvent>> {
    log::info!("loading raw events from {}", path.display());

    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_path(path)?;

    let headers: Vec<String> = reader.headers()?.iter().map(normalize_header).collect();
    for required in REQUIRED_COLUMNS {
        if !headers.iter().any(|h| h == required) {
            return Err(PipelineError::Schema {
                message: format!("required column '{required}' is missing from the input header"),
            });
        }
    }

    let position = |name: &str| headers.iter().position(|h| h == name);
    let col_record_id = position("record_id");
    let col_client_id = position("client_id");
    let col_event_type = position("event_type");
    let col_event_date = position("event_date");
    let col_plan = position("plan");
    let col_region = position("region");
    let col_channel = position("marketing_channel");
    let col_sales_rep = position("sales_rep_id");
    let col_source = position("source_system");

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result?;
        rows.push(RawEvent {
            record_id: field(&record, col_record_id),
            client_id: field(&record, col_client_id),
            event_type: field(&record, col_event_type),
            event_date: field(&record, col_event_date),
            plan: field(&record, col_plan),
            region: field(&record, col_region),
            marketing_channel: field(&record, col_channel),
            sales_rep_id: field(&record, col_sales_rep),
            source_system: field(&record, col_source),
        });
    }

    if rows.is_empty() {
        return Err(PipelineError::EmptyInput);
    }
    log::info!("loaded {} raw rows", rows.len());
    Ok(rows)
}

fn normalize_header(header: &str) -> String {
    header
        .trim()
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
}

fn field(record: &csv::StringRecord, index: Option<usize>) -> Option<String> {
    let value = record.get(index?)?.trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}
