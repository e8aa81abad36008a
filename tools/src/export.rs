//! CSV export — one file per output table.
//!
//! Headers are written explicitly so the on-disk column order is part of
//! the tool's contract, not an accident of struct layout.

use anyhow::Result;
use chrono::NaiveDate;
use lifecycle_core::{
    churn::ClientRiskRecord,
    event::EventStore,
    funnel::{ClientFunnelRecord, FunnelMetrics},
    inconsistency::InconsistencyReport,
    pipeline::PipelineOutput,
};
use std::collections::BTreeSet;
use std::path::Path;

pub fn write_tables(out_dir: &Path, output: &PipelineOutput) -> Result<()> {
    write_staged_events(out_dir, &output.events)?;
    if let Some(records) = &output.funnel_records {
        write_funnel(out_dir, records)?;
    }
    if let Some(metrics) = &output.funnel_metrics {
        write_funnel_metrics(out_dir, metrics)?;
    }
    if let Some(records) = &output.risk_records {
        write_risk(out_dir, records)?;
    }
    if let Some(report) = &output.inconsistencies {
        write_inconsistencies(out_dir, &output.events, report)?;
    }
    log::info!("output tables written to {}", out_dir.display());
    Ok(())
}

fn write_staged_events(out_dir: &Path, events: &EventStore) -> Result<()> {
    let mut wtr = csv::Writer::from_path(out_dir.join("staged_events.csv"))?;
    wtr.write_record([
        "record_id",
        "client_id",
        "event_type",
        "event_date",
        "plan",
        "region",
        "marketing_channel",
        "sales_rep_id",
        "source_system",
        "event_rank",
    ])?;
    for e in events.events() {
        wtr.write_record([
            e.record_id.to_string(),
            e.client_id.to_string(),
            e.event_type.to_string(),
            e.event_date.to_string(),
            e.plan.clone(),
            e.region.clone(),
            e.marketing_channel.clone(),
            e.sales_rep_id.to_string(),
            e.source_system.clone(),
            e.event_rank.to_string(),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}

fn write_funnel(out_dir: &Path, records: &[ClientFunnelRecord]) -> Result<()> {
    let mut wtr = csv::Writer::from_path(out_dir.join("client_funnel.csv"))?;
    wtr.write_record([
        "client_id",
        "applied_date",
        "docs_submitted_date",
        "rejected_date",
        "signed_date",
        "churned_date",
        "is_active",
        "days_to_sign",
        "days_to_churn",
    ])?;
    for r in records {
        wtr.write_record([
            r.client_id.to_string(),
            opt_date(r.applied_date),
            opt_date(r.docs_submitted_date),
            opt_date(r.rejected_date),
            opt_date(r.signed_date),
            opt_date(r.churned_date),
            r.is_active.to_string(),
            opt_i64(r.days_to_sign),
            opt_i64(r.days_to_churn),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}

fn write_funnel_metrics(out_dir: &Path, m: &FunnelMetrics) -> Result<()> {
    let mut wtr = csv::Writer::from_path(out_dir.join("funnel_metrics.csv"))?;
    wtr.write_record(["metric", "value"])?;
    let rows: [(&str, String); 12] = [
        ("total_clients", m.total_clients.to_string()),
        ("applied_clients", m.applied_clients.to_string()),
        ("docs_submitted_clients", m.docs_submitted_clients.to_string()),
        ("rejected_clients", m.rejected_clients.to_string()),
        ("signed_clients", m.signed_clients.to_string()),
        ("churned_clients", m.churned_clients.to_string()),
        ("application_rate", format_rate(m.application_rate)),
        ("docs_submission_rate", format_rate(m.docs_submission_rate)),
        ("rejection_rate", format_rate(m.rejection_rate)),
        ("conversion_rate", format_rate(m.conversion_rate)),
        ("churn_rate", format_rate(m.churn_rate)),
        ("active_clients", m.active_clients.to_string()),
    ];
    for (metric, value) in rows {
        wtr.write_record([metric, value.as_str()])?;
    }
    wtr.flush()?;
    Ok(())
}

fn write_risk(out_dir: &Path, records: &[ClientRiskRecord]) -> Result<()> {
    let mut wtr = csv::Writer::from_path(out_dir.join("client_risk.csv"))?;
    wtr.write_record([
        "client_id",
        "last_event_type",
        "last_event_date",
        "applied_date",
        "signed_date",
        "churned_date",
        "is_churned",
        "days_since_last_event",
        "days_since_signed",
        "risk_tier",
    ])?;
    for r in records {
        wtr.write_record([
            r.client_id.to_string(),
            r.last_event_type.to_string(),
            r.last_event_date.to_string(),
            opt_date(r.applied_date),
            opt_date(r.signed_date),
            opt_date(r.churned_date),
            r.is_churned.to_string(),
            r.days_since_last_event.to_string(),
            opt_i64(r.days_since_signed),
            r.risk_tier.as_str().to_string(),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}

fn write_inconsistencies(
    out_dir: &Path,
    events: &EventStore,
    report: &InconsistencyReport,
) -> Result<()> {
    let mut wtr = csv::Writer::from_path(out_dir.join("unknown_values.csv"))?;
    wtr.write_record([
        "record_id",
        "client_id",
        "event_type",
        "event_date",
        "triggered_fields",
        "plan",
        "sales_rep_id",
        "region",
        "marketing_channel",
        "source_system",
    ])?;
    for r in &report.unknown_values {
        wtr.write_record([
            r.record_id.to_string(),
            r.client_id.to_string(),
            r.event_type.to_string(),
            r.event_date.to_string(),
            r.triggered_fields.join(";"),
            r.plan.clone(),
            r.sales_rep_id.to_string(),
            r.region.clone(),
            r.marketing_channel.clone(),
            r.source_system.clone(),
        ])?;
    }
    wtr.flush()?;

    let mut wtr = csv::Writer::from_path(out_dir.join("sequence_violations.csv"))?;
    wtr.write_record([
        "client_id",
        "earlier_stage",
        "later_stage",
        "earlier_stage_date",
        "later_stage_date",
        "gap_days",
    ])?;
    for v in &report.sequence_violations {
        wtr.write_record([
            v.client_id.to_string(),
            v.earlier_stage.to_string(),
            v.later_stage.to_string(),
            v.earlier_stage_date.to_string(),
            v.later_stage_date.to_string(),
            v.gap_days.to_string(),
        ])?;
    }
    wtr.flush()?;

    write_violation_event_detail(out_dir, events, report)?;

    let mut wtr = csv::Writer::from_path(out_dir.join("docs_submitted_gap.csv"))?;
    wtr.write_record(["client_count", "client_ids"])?;
    wtr.write_record([
        report.docs_submitted_gap.count.to_string(),
        report
            .docs_submitted_gap
            .client_ids
            .iter()
            .map(|id| id.to_string())
            .collect::<Vec<_>>()
            .join(";"),
    ])?;
    wtr.flush()?;

    let mut wtr = csv::Writer::from_path(out_dir.join("multiple_applications.csv"))?;
    wtr.write_record([
        "client_id",
        "application_count",
        "first_application",
        "last_application",
        "span_days",
    ])?;
    for r in &report.multiple_applications {
        wtr.write_record([
            r.client_id.to_string(),
            r.application_count.to_string(),
            r.first_application.to_string(),
            r.last_application.to_string(),
            r.span_days.to_string(),
        ])?;
    }
    wtr.flush()?;

    let mut wtr = csv::Writer::from_path(out_dir.join("churned_without_signed.csv"))?;
    wtr.write_record(["client_id", "first_churned_date", "churned_count"])?;
    for r in &report.churned_without_signed {
        wtr.write_record([
            r.client_id.to_string(),
            r.first_churned_date.to_string(),
            r.churned_count.to_string(),
        ])?;
    }
    wtr.flush()?;

    let mut wtr = csv::Writer::from_path(out_dir.join("signed_without_applied.csv"))?;
    wtr.write_record(["client_id", "first_signed_date"])?;
    for r in &report.signed_without_applied {
        wtr.write_record([r.client_id.to_string(), r.first_signed_date.to_string()])?;
    }
    wtr.flush()?;

    let mut wtr = csv::Writer::from_path(out_dir.join("plan_changes.csv"))?;
    wtr.write_record(["client_id", "plans", "first_event", "last_event"])?;
    for r in &report.plan_changes {
        wtr.write_record([
            r.client_id.to_string(),
            r.plans.join(";"),
            r.first_event.to_string(),
            r.last_event.to_string(),
        ])?;
    }
    wtr.flush()?;

    let mut wtr = csv::Writer::from_path(out_dir.join("event_type_distribution.csv"))?;
    wtr.write_record([
        "event_type",
        "event_count",
        "unique_clients",
        "earliest_date",
        "latest_date",
    ])?;
    for r in &report.event_type_distribution {
        wtr.write_record([
            r.event_type.to_string(),
            r.event_count.to_string(),
            r.unique_clients.to_string(),
            r.earliest_date.to_string(),
            r.latest_date.to_string(),
        ])?;
    }
    wtr.flush()?;

    Ok(())
}

/// Full staged-event detail for every client carrying a sequence
/// violation, so a reviewer can see the offending history in one place.
fn write_violation_event_detail(
    out_dir: &Path,
    events: &EventStore,
    report: &InconsistencyReport,
) -> Result<()> {
    let flagged: BTreeSet<i64> = report
        .sequence_violations
        .iter()
        .map(|v| v.client_id)
        .collect();

    let mut wtr = csv::Writer::from_path(out_dir.join("sequence_violation_events.csv"))?;
    wtr.write_record([
        "client_id",
        "record_id",
        "event_type",
        "event_date",
        "event_rank",
    ])?;
    for client_id in flagged {
        let mut client_events: Vec<_> = events.events_for(client_id).collect();
        client_events.sort_by_key(|e| (e.event_date, e.record_id));
        for e in client_events {
            wtr.write_record([
                e.client_id.to_string(),
                e.record_id.to_string(),
                e.event_type.to_string(),
                e.event_date.to_string(),
                e.event_rank.to_string(),
            ])?;
        }
    }
    wtr.flush()?;
    Ok(())
}

fn opt_date(date: Option<NaiveDate>) -> String {
    date.map(|d| d.to_string()).unwrap_or_default()
}

fn opt_i64(value: Option<i64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn format_rate(rate: f64) -> String {
    format!("{rate:.4}")
}
