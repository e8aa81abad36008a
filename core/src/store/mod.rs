//! SQLite results store.
//!
//! RULE: Only the store module talks to the database.
//! Components produce plain records; the store persists them.

use crate::{
    error::PipelineResult,
    pipeline::PipelineOutput,
    types::RunId,
};
use chrono::NaiveDate;
use rusqlite::{params, Connection};

mod churn;
mod funnel;
mod inconsistency;
mod staging;

pub struct ResultsStore {
    conn: Connection,
}

impl ResultsStore {
    pub fn open(path: &str) -> PipelineResult<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn })
    }

    /// Open an in-memory database (used in tests).
    pub fn in_memory() -> PipelineResult<Self> {
        let conn = Connection::open(":memory:")?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn })
    }

    /// Apply all schema migrations in order.
    pub fn migrate(&self) -> PipelineResult<()> {
        self.conn
            .execute_batch(include_str!("../../../migrations/001_foundation.sql"))?;
        self.conn
            .execute_batch(include_str!("../../../migrations/002_funnel.sql"))?;
        self.conn
            .execute_batch(include_str!("../../../migrations/003_churn_risk.sql"))?;
        self.conn
            .execute_batch(include_str!("../../../migrations/004_inconsistencies.sql"))?;
        Ok(())
    }

    // ── Run ────────────────────────────────────────────────────

    /// Register a new run and return its id.
    pub fn create_run(&self, as_of_date: Option<NaiveDate>, version: &str) -> PipelineResult<RunId> {
        let run_id = format!("run-{}", uuid::Uuid::new_v4());
        self.conn.execute(
            "INSERT INTO run (run_id, as_of_date, version) VALUES (?1, ?2, ?3)",
            params![run_id, as_of_date.map(|d| d.to_string()), version],
        )?;
        Ok(run_id)
    }

    /// Persist every table a pipeline run produced. Components that
    /// failed simply have nothing to persist.
    pub fn persist_output(&self, run_id: &str, output: &PipelineOutput) -> PipelineResult<()> {
        self.insert_staged_events(run_id, output.events.events())?;
        if let Some(records) = &output.funnel_records {
            self.insert_funnel_records(run_id, records)?;
        }
        if let Some(metrics) = &output.funnel_metrics {
            self.insert_funnel_metrics(run_id, metrics)?;
        }
        if let Some(records) = &output.risk_records {
            self.insert_risk_records(run_id, records)?;
        }
        if let Some(report) = &output.inconsistencies {
            self.insert_inconsistency_report(run_id, report)?;
        }
        log::info!("persisted pipeline output for {run_id}");
        Ok(())
    }
}

fn date_text(date: Option<NaiveDate>) -> Option<String> {
    date.map(|d| d.to_string())
}
