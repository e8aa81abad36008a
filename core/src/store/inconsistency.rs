use super::ResultsStore;
use crate::{error::PipelineResult, inconsistency::InconsistencyReport};
use rusqlite::params;

impl ResultsStore {
    // ── Inconsistencies ────────────────────────────────────────

    pub fn insert_inconsistency_report(
        &self,
        run_id: &str,
        report: &InconsistencyReport,
    ) -> PipelineResult<()> {
        let mut stmt = self.conn.prepare(
            "INSERT INTO unknown_value (
                run_id, record_id, client_id, event_type, event_date,
                triggered_fields, plan, sales_rep_id, region,
                marketing_channel, source_system
            ) VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11)",
        )?;
        for r in &report.unknown_values {
            stmt.execute(params![
                run_id,
                r.record_id,
                r.client_id,
                r.event_type.as_str(),
                r.event_date.to_string(),
                serde_json::to_string(&r.triggered_fields)?,
                r.plan,
                r.sales_rep_id,
                r.region,
                r.marketing_channel,
                r.source_system,
            ])?;
        }

        let mut stmt = self.conn.prepare(
            "INSERT INTO sequence_violation (
                run_id, client_id, earlier_stage, later_stage,
                earlier_stage_date, later_stage_date, gap_days
            ) VALUES (?1,?2,?3,?4,?5,?6,?7)",
        )?;
        for v in &report.sequence_violations {
            stmt.execute(params![
                run_id,
                v.client_id,
                v.earlier_stage.as_str(),
                v.later_stage.as_str(),
                v.earlier_stage_date.to_string(),
                v.later_stage_date.to_string(),
                v.gap_days,
            ])?;
        }

        self.conn.execute(
            "INSERT INTO docs_submitted_gap (run_id, client_count, client_ids)
             VALUES (?1, ?2, ?3)",
            params![
                run_id,
                report.docs_submitted_gap.count as i64,
                serde_json::to_string(&report.docs_submitted_gap.client_ids)?,
            ],
        )?;

        let mut stmt = self.conn.prepare(
            "INSERT INTO multiple_applications (
                run_id, client_id, application_count,
                first_application, last_application, span_days
            ) VALUES (?1,?2,?3,?4,?5,?6)",
        )?;
        for r in &report.multiple_applications {
            stmt.execute(params![
                run_id,
                r.client_id,
                r.application_count as i64,
                r.first_application.to_string(),
                r.last_application.to_string(),
                r.span_days,
            ])?;
        }

        let mut stmt = self.conn.prepare(
            "INSERT INTO churned_without_signed (
                run_id, client_id, first_churned_date, churned_count
            ) VALUES (?1,?2,?3,?4)",
        )?;
        for r in &report.churned_without_signed {
            stmt.execute(params![
                run_id,
                r.client_id,
                r.first_churned_date.to_string(),
                r.churned_count as i64,
            ])?;
        }

        let mut stmt = self.conn.prepare(
            "INSERT INTO signed_without_applied (
                run_id, client_id, first_signed_date
            ) VALUES (?1,?2,?3)",
        )?;
        for r in &report.signed_without_applied {
            stmt.execute(params![run_id, r.client_id, r.first_signed_date.to_string()])?;
        }

        let mut stmt = self.conn.prepare(
            "INSERT INTO plan_change (
                run_id, client_id, plans, first_event, last_event
            ) VALUES (?1,?2,?3,?4,?5)",
        )?;
        for r in &report.plan_changes {
            stmt.execute(params![
                run_id,
                r.client_id,
                serde_json::to_string(&r.plans)?,
                r.first_event.to_string(),
                r.last_event.to_string(),
            ])?;
        }

        let mut stmt = self.conn.prepare(
            "INSERT INTO event_type_distribution (
                run_id, event_type, event_count, unique_clients,
                earliest_date, latest_date
            ) VALUES (?1,?2,?3,?4,?5,?6)",
        )?;
        for r in &report.event_type_distribution {
            stmt.execute(params![
                run_id,
                r.event_type.as_str(),
                r.event_count as i64,
                r.unique_clients as i64,
                r.earliest_date.to_string(),
                r.latest_date.to_string(),
            ])?;
        }

        Ok(())
    }

    pub fn sequence_violation_count(&self, run_id: &str) -> PipelineResult<i64> {
        let count = self.conn.query_row(
            "SELECT COUNT(*) FROM sequence_violation WHERE run_id = ?1",
            params![run_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    pub fn unknown_value_count(&self, run_id: &str) -> PipelineResult<i64> {
        let count = self.conn.query_row(
            "SELECT COUNT(*) FROM unknown_value WHERE run_id = ?1",
            params![run_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}
