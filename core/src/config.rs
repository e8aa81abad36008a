//! Pipeline configuration. Every field has a documented default; a JSON
//! config file may override any subset.

use crate::error::PipelineResult;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Inactivity thresholds for risk classification, in days.
///
/// `days <= low_max_days` is low risk, `days <= medium_max_days` is
/// medium, anything above is high. The boundary values themselves are
/// inclusive: exactly 30 days is low, exactly 60 is medium.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskThresholds {
    pub low_max_days:    i64,
    pub medium_max_days: i64,
}

impl Default for RiskThresholds {
    fn default() -> Self {
        Self {
            low_max_days: 30,
            medium_max_days: 60,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub risk: RiskThresholds,
    /// Fixed "as of" date for inactivity measurement. `None` defaults to
    /// the maximum event date in the input.
    pub reference_date: Option<NaiveDate>,
}

impl PipelineConfig {
    pub fn load(path: &Path) -> PipelineResult<Self> {
        let text = std::fs::read_to_string(path)?;
        let config = serde_json::from_str(&text)?;
        log::debug!("loaded pipeline config from {}", path.display());
        Ok(config)
    }
}
