//! Pipeline orchestration — the heart of the batch run.
//!
//! EXECUTION ORDER (fixed, documented):
//!   1. Stager                  (fatal on error: no partial staged output)
//!   2. FunnelBuilder           ┐
//!   3. ChurnAssessor           ├ independent; each reads only the
//!   4. InconsistencyDetector   ┘ immutable EventStore
//!
//! RULES:
//!   - A staging failure aborts the entire run.
//!   - A feature-component failure is captured in that component's status
//!     and never blocks the other components.

use crate::{
    churn::{self, ClientRiskRecord},
    config::PipelineConfig,
    error::PipelineResult,
    event::{EventStore, RawEvent},
    funnel::{self, ClientFunnelRecord, FunnelMetrics},
    inconsistency::{self, InconsistencyReport},
};
use serde::Serialize;

/// Completion status for one feature component.
#[derive(Debug, Clone, Serialize)]
pub struct ComponentStatus {
    pub component: &'static str,
    pub ok:        bool,
    pub error:     Option<String>,
}

impl ComponentStatus {
    fn succeeded(component: &'static str) -> Self {
        Self { component, ok: true, error: None }
    }

    fn failed(component: &'static str, error: String) -> Self {
        Self { component, ok: false, error: Some(error) }
    }
}

/// Everything one batch run produces. A component that failed carries
/// `None` output and a failed status; the others are unaffected.
#[derive(Debug)]
pub struct PipelineOutput {
    pub events:          EventStore,
    pub funnel_records:  Option<Vec<ClientFunnelRecord>>,
    pub funnel_metrics:  Option<FunnelMetrics>,
    pub risk_records:    Option<Vec<ClientRiskRecord>>,
    pub inconsistencies: Option<InconsistencyReport>,
    pub statuses:        Vec<ComponentStatus>,
}

impl PipelineOutput {
    pub fn all_ok(&self) -> bool {
        self.statuses.iter().all(|s| s.ok)
    }

    pub fn failed_components(&self) -> Vec<&'static str> {
        self.statuses
            .iter()
            .filter(|s| !s.ok)
            .map(|s| s.component)
            .collect()
    }
}

/// Run the full pipeline over a batch of raw rows.
pub fn run(raw_rows: Vec<RawEvent>, config: &PipelineConfig) -> PipelineResult<PipelineOutput> {
    let events = crate::staging::stage(raw_rows)?;

    let mut statuses = Vec::new();

    let (funnel_records, funnel_metrics) = {
        let (records, metrics) = funnel::build(&events);
        statuses.push(ComponentStatus::succeeded("funnel"));
        (Some(records), Some(metrics))
    };

    let risk_records = match churn::assess(&events, config.reference_date, &config.risk) {
        Ok(records) => {
            statuses.push(ComponentStatus::succeeded("churn_risk"));
            Some(records)
        }
        Err(e) => {
            log::error!("churn risk assessment failed: {e}");
            statuses.push(ComponentStatus::failed("churn_risk", e.to_string()));
            None
        }
    };

    let inconsistencies = {
        let report = inconsistency::detect(&events);
        statuses.push(ComponentStatus::succeeded("inconsistencies"));
        Some(report)
    };

    Ok(PipelineOutput {
        events,
        funnel_records,
        funnel_metrics,
        risk_records,
        inconsistencies,
        statuses,
    })
}
