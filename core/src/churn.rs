//! The ChurnAssessor — per-client inactivity measured against an explicit
//! reference date, classified into fixed-threshold risk tiers.
//!
//! The reference date is a parameter, never the wall clock: running the
//! pipeline twice on the same input yields identical risk tables.

use crate::{
    config::RiskThresholds,
    error::{PipelineError, PipelineResult},
    event::{EventStore, EventType},
    types::ClientId,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Coarse re-engagement urgency bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskTier {
    AlreadyChurned,
    High,
    Medium,
    Low,
    Unknown,
}

impl RiskTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AlreadyChurned => "already_churned",
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
            Self::Unknown => "unknown",
        }
    }
}

/// Per-client risk assessment. Stage dates here are the *latest*
/// occurrence of each stage (the funnel table carries the earliest).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientRiskRecord {
    pub client_id:             ClientId,
    pub last_event_type:       EventType,
    pub last_event_date:       NaiveDate,
    pub applied_date:          Option<NaiveDate>,
    pub signed_date:           Option<NaiveDate>,
    pub churned_date:          Option<NaiveDate>,
    pub is_churned:            bool,
    pub days_since_last_event: i64,
    pub days_since_signed:     Option<i64>,
    pub risk_tier:             RiskTier,
}

/// Assess every client in the store.
///
/// `reference_date = None` defaults to the maximum event date observed in
/// the input, keeping the assessment reproducible. Records are ordered by
/// client_id ascending.
pub fn assess(
    events: &EventStore,
    reference_date: Option<NaiveDate>,
    thresholds: &RiskThresholds,
) -> PipelineResult<Vec<ClientRiskRecord>> {
    let reference = reference_date
        .or_else(|| events.max_event_date())
        .ok_or_else(|| PipelineError::Validation {
            message: "cannot assess churn risk over an empty event store".to_string(),
        })?;
    log::debug!("assessing churn risk as of {reference}");

    let mut records = Vec::new();
    for client_id in events.client_ids() {
        records.push(assess_client(events, client_id, reference, thresholds)?);
    }

    let churned = records.iter().filter(|r| r.is_churned).count();
    log::info!(
        "churn risk assessed: {} clients, {} already churned, as of {reference}",
        records.len(),
        churned,
    );
    Ok(records)
}

fn assess_client(
    events: &EventStore,
    client_id: ClientId,
    reference: NaiveDate,
    thresholds: &RiskThresholds,
) -> PipelineResult<ClientRiskRecord> {
    // Unreachable from a well-formed store; guarded so a contract breach
    // surfaces instead of panicking.
    let last = events
        .events_for(client_id)
        .enumerate()
        .max_by_key(|(idx, e)| (e.event_date, e.event_rank, *idx))
        .map(|(_, e)| e)
        .ok_or_else(|| PipelineError::Validation {
            message: format!("client {client_id} has zero staged events"),
        })?;

    let signed_date = latest_stage_date(events, client_id, &EventType::Signed);
    let churned_date = latest_stage_date(events, client_id, &EventType::Churned);
    let is_churned = churned_date.is_some();
    let days_since_last_event = reference.signed_duration_since(last.event_date).num_days();

    Ok(ClientRiskRecord {
        client_id,
        last_event_type: last.event_type.clone(),
        last_event_date: last.event_date,
        applied_date: latest_stage_date(events, client_id, &EventType::Applied),
        signed_date,
        churned_date,
        is_churned,
        days_since_last_event,
        days_since_signed: signed_date
            .map(|d| reference.signed_duration_since(d).num_days()),
        risk_tier: classify_risk(is_churned, Some(days_since_last_event), thresholds),
    })
}

/// Total, deterministic tier function over (is_churned, inactivity days).
/// Precedence: churned first, unknown inactivity second, then the
/// threshold ladder. Exactly 30 days is low, exactly 60 is medium.
pub fn classify_risk(
    is_churned: bool,
    days_since_last_event: Option<i64>,
    thresholds: &RiskThresholds,
) -> RiskTier {
    if is_churned {
        return RiskTier::AlreadyChurned;
    }
    match days_since_last_event {
        None => RiskTier::Unknown,
        Some(days) if days > thresholds.medium_max_days => RiskTier::High,
        Some(days) if days > thresholds.low_max_days => RiskTier::Medium,
        Some(_) => RiskTier::Low,
    }
}

fn latest_stage_date(
    events: &EventStore,
    client_id: ClientId,
    stage: &EventType,
) -> Option<NaiveDate> {
    events
        .events_for(client_id)
        .filter(|e| e.event_type == *stage)
        .map(|e| e.event_date)
        .max()
}
