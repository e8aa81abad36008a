//! The InconsistencyDetector — data-quality anomalies across independent
//! detection rules.
//!
//! RULE: Every rule is a pure scan over the EventStore. Rules share no
//! mutable state and may run in any order. A client or event may appear
//! under more than one rule.

use crate::{
    event::{EventStore, EventType},
    types::{ClientId, RecordId},
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Canonical temporal precedence between stages. `rejected` has no fixed
/// relation to `signed`/`churned` (mutually exclusive outcomes) and is
/// only checked against `applied`.
const PRECEDENCE_PAIRS: [(EventType, EventType); 7] = [
    (EventType::Applied, EventType::DocsSubmitted),
    (EventType::Applied, EventType::Signed),
    (EventType::Applied, EventType::Churned),
    (EventType::Applied, EventType::Rejected),
    (EventType::DocsSubmitted, EventType::Signed),
    (EventType::DocsSubmitted, EventType::Churned),
    (EventType::Signed, EventType::Churned),
];

/// One event carrying a sentinel or missing descriptive value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnknownValueRecord {
    pub record_id:         RecordId,
    pub client_id:         ClientId,
    pub event_type:        EventType,
    pub event_date:        NaiveDate,
    /// The field names that triggered the record.
    pub triggered_fields:  Vec<String>,
    pub plan:              String,
    pub sales_rep_id:      i64,
    pub region:            String,
    pub marketing_channel: String,
    pub source_system:     String,
}

/// A later canonical stage dated before an earlier one for the same
/// client, compared on rank-1 dates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SequenceViolationRecord {
    pub client_id:          ClientId,
    pub earlier_stage:      EventType,
    pub later_stage:        EventType,
    pub earlier_stage_date: NaiveDate,
    pub later_stage_date:   NaiveDate,
    /// Days by which the later stage precedes the earlier one.
    pub gap_days:           i64,
}

/// Clients who reached `signed` without any `docs_submitted` event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocsSubmittedGap {
    pub client_ids: Vec<ClientId>,
    pub count:      usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MultipleApplicationsRecord {
    pub client_id:         ClientId,
    pub application_count: usize,
    pub first_application: NaiveDate,
    pub last_application:  NaiveDate,
    pub span_days:         i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChurnedWithoutSignedRecord {
    pub client_id:          ClientId,
    pub first_churned_date: NaiveDate,
    pub churned_count:      usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignedWithoutAppliedRecord {
    pub client_id:         ClientId,
    pub first_signed_date: NaiveDate,
}

/// A client whose events carry more than one distinct plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanChangeRecord {
    pub client_id:   ClientId,
    /// Distinct plans in first-seen order.
    pub plans:       Vec<String>,
    pub first_event: NaiveDate,
    pub last_event:  NaiveDate,
}

/// One summary row per event type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventTypeDistributionRecord {
    pub event_type:     EventType,
    pub event_count:    usize,
    pub unique_clients: usize,
    pub earliest_date:  NaiveDate,
    pub latest_date:    NaiveDate,
}

/// The bundled output of all detection rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InconsistencyReport {
    pub unknown_values:          Vec<UnknownValueRecord>,
    pub sequence_violations:     Vec<SequenceViolationRecord>,
    pub docs_submitted_gap:      DocsSubmittedGap,
    pub multiple_applications:   Vec<MultipleApplicationsRecord>,
    pub churned_without_signed:  Vec<ChurnedWithoutSignedRecord>,
    pub signed_without_applied:  Vec<SignedWithoutAppliedRecord>,
    pub plan_changes:            Vec<PlanChangeRecord>,
    pub event_type_distribution: Vec<EventTypeDistributionRecord>,
}

impl InconsistencyReport {
    /// Total findings across the per-client rules. The distribution
    /// summary is informational and not counted.
    pub fn total_findings(&self) -> usize {
        self.unknown_values.len()
            + self.sequence_violations.len()
            + self.docs_submitted_gap.count
            + self.multiple_applications.len()
            + self.churned_without_signed.len()
            + self.signed_without_applied.len()
            + self.plan_changes.len()
    }
}

/// Run every rule over the store.
pub fn detect(events: &EventStore) -> InconsistencyReport {
    let report = InconsistencyReport {
        unknown_values: unknown_values(events),
        sequence_violations: sequence_violations(events),
        docs_submitted_gap: docs_submitted_gap(events),
        multiple_applications: multiple_applications(events),
        churned_without_signed: churned_without_signed(events),
        signed_without_applied: signed_without_applied(events),
        plan_changes: plan_changes(events),
        event_type_distribution: event_type_distribution(events),
    };
    log::info!(
        "inconsistency scan: {} findings ({} unknown values, {} sequence violations)",
        report.total_findings(),
        report.unknown_values.len(),
        report.sequence_violations.len(),
    );
    report
}

/// O(n) filter: sentinel plans, unassigned reps, and missing descriptive
/// fields. Ordered by (client_id, event_date).
pub fn unknown_values(events: &EventStore) -> Vec<UnknownValueRecord> {
    let mut records: Vec<UnknownValueRecord> = events
        .events()
        .iter()
        .filter_map(|e| {
            let mut fields = Vec::new();
            if e.plan == "Unknown" {
                fields.push("plan".to_string());
            }
            if e.sales_rep_id == -1 {
                fields.push("sales_rep_id".to_string());
            }
            if e.region.is_empty() {
                fields.push("region".to_string());
            }
            if e.marketing_channel == "unknown" {
                fields.push("marketing_channel".to_string());
            }
            if e.source_system == "unknown" {
                fields.push("source_system".to_string());
            }
            if fields.is_empty() {
                return None;
            }
            Some(UnknownValueRecord {
                record_id: e.record_id,
                client_id: e.client_id,
                event_type: e.event_type.clone(),
                event_date: e.event_date,
                triggered_fields: fields,
                plan: e.plan.clone(),
                sales_rep_id: e.sales_rep_id,
                region: e.region.clone(),
                marketing_channel: e.marketing_channel.clone(),
                source_system: e.source_system.clone(),
            })
        })
        .collect();
    records.sort_by_key(|r| (r.client_id, r.event_date, r.record_id));
    records
}

/// Compare the rank-1 date of every pair in the canonical precedence
/// table; flag each violating pair separately.
pub fn sequence_violations(events: &EventStore) -> Vec<SequenceViolationRecord> {
    let mut violations = Vec::new();
    for client_id in events.client_ids() {
        let first_dates: HashMap<&EventType, NaiveDate> = events
            .events_for(client_id)
            .filter(|e| e.event_rank == 1)
            .map(|e| (&e.event_type, e.event_date))
            .collect();

        for (earlier, later) in &PRECEDENCE_PAIRS {
            let (Some(&earlier_date), Some(&later_date)) =
                (first_dates.get(earlier), first_dates.get(later))
            else {
                continue;
            };
            if later_date < earlier_date {
                violations.push(SequenceViolationRecord {
                    client_id,
                    earlier_stage: earlier.clone(),
                    later_stage: later.clone(),
                    earlier_stage_date: earlier_date,
                    later_stage_date: later_date,
                    gap_days: earlier_date.signed_duration_since(later_date).num_days(),
                });
            }
        }
    }
    violations
}

/// Set difference: clients with a rank-1 `signed` event minus clients
/// with any `docs_submitted` event.
pub fn docs_submitted_gap(events: &EventStore) -> DocsSubmittedGap {
    let mut signed = BTreeSet::new();
    let mut has_docs = BTreeSet::new();
    for e in events.events() {
        match e.event_type {
            EventType::Signed => {
                signed.insert(e.client_id);
            }
            EventType::DocsSubmitted => {
                has_docs.insert(e.client_id);
            }
            _ => {}
        }
    }
    let client_ids: Vec<ClientId> = signed.difference(&has_docs).copied().collect();
    DocsSubmittedGap {
        count: client_ids.len(),
        client_ids,
    }
}

/// Clients with more than one `applied` event, i.e. a rank above 1
/// exists for that type.
pub fn multiple_applications(events: &EventStore) -> Vec<MultipleApplicationsRecord> {
    let mut per_client: BTreeMap<ClientId, Vec<NaiveDate>> = BTreeMap::new();
    for e in events.events() {
        if e.event_type == EventType::Applied {
            per_client.entry(e.client_id).or_default().push(e.event_date);
        }
    }

    per_client
        .into_iter()
        .filter(|(_, dates)| dates.len() > 1)
        .map(|(client_id, dates)| {
            let first = *dates.iter().min().unwrap_or(&dates[0]);
            let last = *dates.iter().max().unwrap_or(&dates[0]);
            MultipleApplicationsRecord {
                client_id,
                application_count: dates.len(),
                first_application: first,
                last_application: last,
                span_days: last.signed_duration_since(first).num_days(),
            }
        })
        .collect()
}

/// Clients with a `churned` event but no `signed` event.
pub fn churned_without_signed(events: &EventStore) -> Vec<ChurnedWithoutSignedRecord> {
    events
        .client_ids()
        .into_iter()
        .filter_map(|client_id| {
            let churn_dates: Vec<NaiveDate> = events
                .events_for(client_id)
                .filter(|e| e.event_type == EventType::Churned)
                .map(|e| e.event_date)
                .collect();
            let first_churned_date = churn_dates.iter().min().copied()?;
            if events.events_for(client_id).any(|e| e.event_type == EventType::Signed) {
                return None;
            }
            Some(ChurnedWithoutSignedRecord {
                client_id,
                first_churned_date,
                churned_count: churn_dates.len(),
            })
        })
        .collect()
}

/// Clients with a `signed` event but no `applied` event.
pub fn signed_without_applied(events: &EventStore) -> Vec<SignedWithoutAppliedRecord> {
    events
        .client_ids()
        .into_iter()
        .filter_map(|client_id| {
            let first_signed = events
                .events_for(client_id)
                .filter(|e| e.event_type == EventType::Signed)
                .map(|e| e.event_date)
                .min()?;
            if events.events_for(client_id).any(|e| e.event_type == EventType::Applied) {
                return None;
            }
            Some(SignedWithoutAppliedRecord {
                client_id,
                first_signed_date: first_signed,
            })
        })
        .collect()
}

/// Clients whose events carry more than one distinct plan.
pub fn plan_changes(events: &EventStore) -> Vec<PlanChangeRecord> {
    events
        .client_ids()
        .into_iter()
        .filter_map(|client_id| {
            let mut plans: Vec<String> = Vec::new();
            let mut first_event: Option<NaiveDate> = None;
            let mut last_event: Option<NaiveDate> = None;
            for e in events.events_for(client_id) {
                if !plans.contains(&e.plan) {
                    plans.push(e.plan.clone());
                }
                first_event = Some(first_event.map_or(e.event_date, |d| d.min(e.event_date)));
                last_event = Some(last_event.map_or(e.event_date, |d| d.max(e.event_date)));
            }
            if plans.len() <= 1 {
                return None;
            }
            Some(PlanChangeRecord {
                client_id,
                plans,
                first_event: first_event?,
                last_event: last_event?,
            })
        })
        .collect()
}

/// Event counts, client reach and date range per event type, most
/// frequent first.
pub fn event_type_distribution(events: &EventStore) -> Vec<EventTypeDistributionRecord> {
    struct Acc {
        count: usize,
        clients: BTreeSet<ClientId>,
        earliest: NaiveDate,
        latest: NaiveDate,
    }

    let mut by_type: HashMap<EventType, Acc> = HashMap::new();
    for e in events.events() {
        by_type
            .entry(e.event_type.clone())
            .and_modify(|acc| {
                acc.count += 1;
                acc.clients.insert(e.client_id);
                acc.earliest = acc.earliest.min(e.event_date);
                acc.latest = acc.latest.max(e.event_date);
            })
            .or_insert_with(|| Acc {
                count: 1,
                clients: BTreeSet::from([e.client_id]),
                earliest: e.event_date,
                latest: e.event_date,
            });
    }

    let mut records: Vec<EventTypeDistributionRecord> = by_type
        .into_iter()
        .map(|(event_type, acc)| EventTypeDistributionRecord {
            event_type,
            event_count: acc.count,
            unique_clients: acc.clients.len(),
            earliest_date: acc.earliest,
            latest_date: acc.latest,
        })
        .collect();
    records.sort_by(|a, b| {
        b.event_count
            .cmp(&a.event_count)
            .then_with(|| a.event_type.as_str().cmp(b.event_type.as_str()))
    });
    records
}
