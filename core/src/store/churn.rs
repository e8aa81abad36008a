use super::{date_text, ResultsStore};
use crate::{churn::ClientRiskRecord, error::PipelineResult};
use rusqlite::params;
use std::collections::BTreeMap;

impl ResultsStore {
    // ── Churn risk ─────────────────────────────────────────────

    pub fn insert_risk_records(
        &self,
        run_id: &str,
        records: &[ClientRiskRecord],
    ) -> PipelineResult<()> {
        let mut stmt = self.conn.prepare(
            "INSERT INTO client_risk (
                run_id, client_id, last_event_type, last_event_date,
                applied_date, signed_date, churned_date, is_churned,
                days_since_last_event, days_since_signed, risk_tier
            ) VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11)",
        )?;
        for r in records {
            stmt.execute(params![
                run_id,
                r.client_id,
                r.last_event_type.as_str(),
                r.last_event_date.to_string(),
                date_text(r.applied_date),
                date_text(r.signed_date),
                date_text(r.churned_date),
                r.is_churned,
                r.days_since_last_event,
                r.days_since_signed,
                r.risk_tier.as_str(),
            ])?;
        }
        Ok(())
    }

    /// Client counts per risk tier, for the run summary.
    pub fn risk_tier_counts(&self, run_id: &str) -> PipelineResult<BTreeMap<String, i64>> {
        let mut stmt = self.conn.prepare(
            "SELECT risk_tier, COUNT(*) FROM client_risk
             WHERE run_id = ?1 GROUP BY risk_tier",
        )?;
        let rows = stmt.query_map(params![run_id], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
        })?;

        let mut counts = BTreeMap::new();
        for row in rows {
            let (tier, count) = row?;
            counts.insert(tier, count);
        }
        Ok(counts)
    }
}
