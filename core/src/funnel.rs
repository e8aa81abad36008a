//! The FunnelBuilder — one record per client with the first date of each
//! lifecycle stage, plus aggregate conversion metrics.
//!
//! Stage order and conversion-rate denominators are fixed by the canonical
//! stage sequence, never inferred from data.

use crate::{
    event::{EventStore, EventType},
    types::ClientId,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// The canonical funnel sequence. `rejected` sits between docs submission
/// and signing as a terminal branch.
pub const STAGE_ORDER: [EventType; 5] = [
    EventType::Applied,
    EventType::DocsSubmitted,
    EventType::Rejected,
    EventType::Signed,
    EventType::Churned,
];

/// Per-client funnel progression. Each stage date is the client's rank-1
/// (earliest) event of that type; later duplicates never alter it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientFunnelRecord {
    pub client_id:           ClientId,
    pub applied_date:        Option<NaiveDate>,
    pub docs_submitted_date: Option<NaiveDate>,
    pub rejected_date:       Option<NaiveDate>,
    pub signed_date:         Option<NaiveDate>,
    pub churned_date:        Option<NaiveDate>,
    /// Signed, not churned, not rejected.
    pub is_active:           bool,
    pub days_to_sign:        Option<i64>,
    pub days_to_churn:       Option<i64>,
}

/// Aggregate funnel metrics across all clients. Every rate is in [0, 1];
/// a zero denominator yields 0.0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunnelMetrics {
    pub total_clients:          usize,
    pub applied_clients:        usize,
    pub docs_submitted_clients: usize,
    pub rejected_clients:       usize,
    pub signed_clients:         usize,
    pub churned_clients:        usize,
    pub application_rate:       f64,
    pub docs_submission_rate:   f64,
    pub rejection_rate:         f64,
    pub conversion_rate:        f64,
    pub churn_rate:             f64,
    pub active_clients:         usize,
}

/// Build the funnel table and its aggregate metrics. Records are ordered
/// by client_id ascending. A client with zero events of a stage simply
/// carries no date for it; this never errors.
pub fn build(events: &EventStore) -> (Vec<ClientFunnelRecord>, FunnelMetrics) {
    let records: Vec<ClientFunnelRecord> = events
        .client_ids()
        .into_iter()
        .map(|client_id| build_record(events, client_id))
        .collect();
    let metrics = compute_metrics(&records);

    log::info!(
        "funnel built: {} clients, {} signed, {} active",
        metrics.total_clients,
        metrics.signed_clients,
        metrics.active_clients,
    );
    (records, metrics)
}

fn build_record(events: &EventStore, client_id: ClientId) -> ClientFunnelRecord {
    let first = |stage: &EventType| first_stage_date(events, client_id, stage);

    let applied_date = first(&EventType::Applied);
    let docs_submitted_date = first(&EventType::DocsSubmitted);
    let rejected_date = first(&EventType::Rejected);
    let signed_date = first(&EventType::Signed);
    let churned_date = first(&EventType::Churned);

    ClientFunnelRecord {
        client_id,
        applied_date,
        docs_submitted_date,
        rejected_date,
        signed_date,
        churned_date,
        is_active: signed_date.is_some() && churned_date.is_none() && rejected_date.is_none(),
        days_to_sign: days_between(applied_date, signed_date),
        days_to_churn: days_between(signed_date, churned_date),
    }
}

/// The rank-1 event of a stage defines its date; there is at most one
/// rank-1 event per (client, type).
fn first_stage_date(events: &EventStore, client_id: ClientId, stage: &EventType) -> Option<NaiveDate> {
    events
        .events_for(client_id)
        .find(|e| e.event_rank == 1 && e.event_type == *stage)
        .map(|e| e.event_date)
}

fn days_between(from: Option<NaiveDate>, to: Option<NaiveDate>) -> Option<i64> {
    Some(to?.signed_duration_since(from?).num_days())
}

fn compute_metrics(records: &[ClientFunnelRecord]) -> FunnelMetrics {
    let total_clients = records.len();
    let applied_clients = records.iter().filter(|r| r.applied_date.is_some()).count();
    let docs_submitted_clients = records.iter().filter(|r| r.docs_submitted_date.is_some()).count();
    let rejected_clients = records.iter().filter(|r| r.rejected_date.is_some()).count();
    let signed_clients = records.iter().filter(|r| r.signed_date.is_some()).count();
    let churned_clients = records.iter().filter(|r| r.churned_date.is_some()).count();
    let active_clients = records.iter().filter(|r| r.is_active).count();

    FunnelMetrics {
        total_clients,
        applied_clients,
        docs_submitted_clients,
        rejected_clients,
        signed_clients,
        churned_clients,
        application_rate: ratio(applied_clients, total_clients),
        docs_submission_rate: ratio(docs_submitted_clients, applied_clients),
        rejection_rate: ratio(rejected_clients, applied_clients),
        conversion_rate: ratio(signed_clients, applied_clients),
        churn_rate: ratio(churned_clients, signed_clients),
        active_clients,
    }
}

fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}
