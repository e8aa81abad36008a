//! The event data model — raw rows, staged events, and the event store.
//!
//! RULE: A StagedEvent is immutable once the Stager has produced it.
//! Downstream components read the EventStore; they never mutate it.

use crate::types::{ClientId, RecordId};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Canonical lifecycle stages, in funnel order.
///
/// The enumeration is open-ended: an unrecognized value is carried through
/// as `Other`, never rejected at staging.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    Applied,
    DocsSubmitted,
    Signed,
    Rejected,
    Churned,
    #[serde(untagged)]
    Other(String),
}

impl EventType {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "applied" => Self::Applied,
            "docs_submitted" => Self::DocsSubmitted,
            "signed" => Self::Signed,
            "rejected" => Self::Rejected,
            "churned" => Self::Churned,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Applied => "applied",
            Self::DocsSubmitted => "docs_submitted",
            Self::Signed => "signed",
            Self::Rejected => "rejected",
            Self::Churned => "churned",
            Self::Other(s) => s,
        }
    }
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One row exactly as it came off the input file.
///
/// Every field is optional text; the Stager owns all coercion and filling.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawEvent {
    pub record_id:         Option<String>,
    pub client_id:         Option<String>,
    pub event_type:        Option<String>,
    pub event_date:        Option<String>,
    pub plan:              Option<String>,
    pub region:            Option<String>,
    pub marketing_channel: Option<String>,
    pub sales_rep_id:      Option<String>,
    pub source_system:     Option<String>,
}

/// One cleaned customer-lifecycle occurrence.
///
/// `plan = "Unknown"` and `sales_rep_id = -1` are sentinel values standing
/// in for "not provided". They are preserved here and surfaced by the
/// inconsistency rules, never silently cleaned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StagedEvent {
    pub record_id:         RecordId,
    pub client_id:         ClientId,
    pub event_type:        EventType,
    pub event_date:        NaiveDate,
    pub plan:              String,
    pub region:            String,
    pub marketing_channel: String,
    pub sales_rep_id:      i64,
    pub source_system:     String,
    /// 1-based ordinal among events of the same (client_id, event_type)
    /// pair, ordered by event_date ascending, ties broken by ingestion
    /// order. For a fixed pair the ranks form 1..=k with no gaps.
    pub event_rank:        u32,
}

/// The canonical input to every downstream component: all staged events
/// for one run, in ingestion order.
#[derive(Debug, Clone)]
pub struct EventStore {
    events: Vec<StagedEvent>,
}

impl EventStore {
    pub(crate) fn new(events: Vec<StagedEvent>) -> Self {
        Self { events }
    }

    pub fn events(&self) -> &[StagedEvent] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Distinct client ids, ascending.
    pub fn client_ids(&self) -> Vec<ClientId> {
        let mut ids: Vec<ClientId> = self.events.iter().map(|e| e.client_id).collect();
        ids.sort_unstable();
        ids.dedup();
        ids
    }

    /// All events for one client, in ingestion order.
    pub fn events_for(&self, client_id: ClientId) -> impl Iterator<Item = &StagedEvent> {
        self.events.iter().filter(move |e| e.client_id == client_id)
    }

    /// The latest event date in the store. Used as the default reference
    /// date so a run never depends on the wall clock.
    pub fn max_event_date(&self) -> Option<NaiveDate> {
        self.events.iter().map(|e| e.event_date).max()
    }
}
