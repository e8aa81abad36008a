use super::ResultsStore;
use crate::{error::PipelineResult, event::StagedEvent};
use rusqlite::params;

impl ResultsStore {
    // ── Staged events ──────────────────────────────────────────

    pub fn insert_staged_events(&self, run_id: &str, events: &[StagedEvent]) -> PipelineResult<()> {
        let mut stmt = self.conn.prepare(
            "INSERT INTO staged_event (
                run_id, record_id, client_id, event_type, event_date,
                plan, region, marketing_channel, sales_rep_id,
                source_system, event_rank
            ) VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11)",
        )?;
        for e in events {
            stmt.execute(params![
                run_id,
                e.record_id,
                e.client_id,
                e.event_type.as_str(),
                e.event_date.to_string(),
                e.plan,
                e.region,
                e.marketing_channel,
                e.sales_rep_id,
                e.source_system,
                e.event_rank,
            ])?;
        }
        Ok(())
    }

    pub fn staged_event_count(&self, run_id: &str) -> PipelineResult<i64> {
        let count = self.conn.query_row(
            "SELECT COUNT(*) FROM staged_event WHERE run_id = ?1",
            params![run_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    pub fn client_count(&self, run_id: &str) -> PipelineResult<i64> {
        let count = self.conn.query_row(
            "SELECT COUNT(DISTINCT client_id) FROM staged_event WHERE run_id = ?1",
            params![run_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}
