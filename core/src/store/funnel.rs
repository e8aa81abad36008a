use super::{date_text, ResultsStore};
use crate::{
    error::PipelineResult,
    funnel::{ClientFunnelRecord, FunnelMetrics},
};
use rusqlite::params;

impl ResultsStore {
    // ── Funnel ─────────────────────────────────────────────────

    pub fn insert_funnel_records(
        &self,
        run_id: &str,
        records: &[ClientFunnelRecord],
    ) -> PipelineResult<()> {
        let mut stmt = self.conn.prepare(
            "INSERT INTO client_funnel (
                run_id, client_id, applied_date, docs_submitted_date,
                rejected_date, signed_date, churned_date, is_active,
                days_to_sign, days_to_churn
            ) VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10)",
        )?;
        for r in records {
            stmt.execute(params![
                run_id,
                r.client_id,
                date_text(r.applied_date),
                date_text(r.docs_submitted_date),
                date_text(r.rejected_date),
                date_text(r.signed_date),
                date_text(r.churned_date),
                r.is_active,
                r.days_to_sign,
                r.days_to_churn,
            ])?;
        }
        Ok(())
    }

    pub fn insert_funnel_metrics(&self, run_id: &str, m: &FunnelMetrics) -> PipelineResult<()> {
        self.conn.execute(
            "INSERT INTO funnel_metrics (
                run_id, total_clients, applied_clients, docs_submitted_clients,
                rejected_clients, signed_clients, churned_clients,
                application_rate, docs_submission_rate, rejection_rate,
                conversion_rate, churn_rate, active_clients
            ) VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12,?13)",
            params![
                run_id,
                m.total_clients as i64,
                m.applied_clients as i64,
                m.docs_submitted_clients as i64,
                m.rejected_clients as i64,
                m.signed_clients as i64,
                m.churned_clients as i64,
                m.application_rate,
                m.docs_submission_rate,
                m.rejection_rate,
                m.conversion_rate,
                m.churn_rate,
                m.active_clients as i64,
            ],
        )?;
        Ok(())
    }

    pub fn funnel_record_count(&self, run_id: &str) -> PipelineResult<i64> {
        let count = self.conn.query_row(
            "SELECT COUNT(*) FROM client_funnel WHERE run_id = ?1",
            params![run_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}
