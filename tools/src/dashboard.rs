//! Static dashboards — plotly figures assembled as JSON traces and
//! embedded in standalone HTML pages.

use anyhow::Result;
use lifecycle_core::{
    churn::{ClientRiskRecord, RiskTier},
    funnel::{FunnelMetrics, STAGE_ORDER},
    inconsistency::InconsistencyReport,
    pipeline::PipelineOutput,
};
use serde_json::{json, Value};
use std::path::Path;

const LOW_COLOR: &str = "#2ECC71";
const MEDIUM_COLOR: &str = "#F39C12";
const HIGH_COLOR: &str = "#E74C3C";
const CHURNED_COLOR: &str = "#8E44AD";
const NEUTRAL_COLOR: &str = "#3498DB";

pub fn render_all(out_dir: &Path, output: &PipelineOutput) -> Result<()> {
    if let Some(metrics) = &output.funnel_metrics {
        render_funnel(out_dir, metrics)?;
    }
    if let Some(records) = &output.risk_records {
        render_churn(out_dir, records)?;
    }
    if let Some(report) = &output.inconsistencies {
        render_inconsistencies(out_dir, report)?;
    }
    log::info!("dashboards written to {}", out_dir.display());
    Ok(())
}

fn render_funnel(out_dir: &Path, metrics: &FunnelMetrics) -> Result<()> {
    let stages: Vec<String> = STAGE_ORDER.iter().map(|s| s.to_string()).collect();
    let stage_counts = json!({
        "data": [{
            "type": "bar",
            "x": stages,
            "y": [
                metrics.applied_clients,
                metrics.docs_submitted_clients,
                metrics.rejected_clients,
                metrics.signed_clients,
                metrics.churned_clients,
            ],
            "marker": {"color": NEUTRAL_COLOR},
        }],
        "layout": {
            "title": "Clients Reaching Each Stage",
            "yaxis": {"title": "clients"},
        },
    });

    let rates = json!({
        "data": [{
            "type": "bar",
            "x": [
                "application",
                "docs_submission",
                "rejection",
                "conversion",
                "churn",
            ],
            "y": [
                metrics.application_rate,
                metrics.docs_submission_rate,
                metrics.rejection_rate,
                metrics.conversion_rate,
                metrics.churn_rate,
            ],
            "marker": {"color": NEUTRAL_COLOR},
        }],
        "layout": {
            "title": "Stage Conversion Rates",
            "yaxis": {"title": "rate", "range": [0.0, 1.0]},
        },
    });

    let outcome = json!({
        "data": [{
            "type": "bar",
            "x": ["active", "churned", "rejected"],
            "y": [
                metrics.active_clients,
                metrics.churned_clients,
                metrics.rejected_clients,
            ],
            "marker": {"color": [LOW_COLOR, CHURNED_COLOR, HIGH_COLOR]},
        }],
        "layout": {
            "title": "Client Outcomes",
            "yaxis": {"title": "clients"},
        },
    });

    write_page(
        &out_dir.join("funnel.html"),
        "Funnel Analysis",
        &[
            ("Stage Progression", stage_counts),
            ("Conversion Rates", rates),
            ("Outcomes", outcome),
        ],
    )
}

fn render_churn(out_dir: &Path, records: &[ClientRiskRecord]) -> Result<()> {
    let tier_count = |tier: RiskTier| records.iter().filter(|r| r.risk_tier == tier).count();
    let churned = tier_count(RiskTier::AlreadyChurned);
    let high = tier_count(RiskTier::High);
    let medium = tier_count(RiskTier::Medium);
    let low = tier_count(RiskTier::Low);

    // Tier distribution over active clients only; churned clients get
    // their own comparison chart below.
    let tier_pie = json!({
        "data": [{
            "type": "pie",
            "labels": ["Low Risk", "Medium Risk", "High Risk"],
            "values": [low, medium, high],
            "marker": {"colors": [LOW_COLOR, MEDIUM_COLOR, HIGH_COLOR]},
            "hole": 0.4,
        }],
        "layout": {"title": "Risk Distribution (Active Clients)"},
    });

    let inactivity_days: Vec<i64> = records
        .iter()
        .filter(|r| r.risk_tier != RiskTier::AlreadyChurned)
        .map(|r| r.days_since_last_event)
        .collect();
    let inactivity = json!({
        "data": [{
            "type": "histogram",
            "x": inactivity_days,
            "nbinsx": 30,
            "marker": {"color": NEUTRAL_COLOR},
        }],
        "layout": {
            "title": "Days Since Last Event (Active Clients)",
            "xaxis": {"title": "days"},
            "yaxis": {"title": "clients"},
        },
    });

    let churned_vs_risk = json!({
        "data": [{
            "type": "bar",
            "x": ["already churned", "at risk (high + medium)"],
            "y": [churned, high + medium],
            "marker": {"color": [CHURNED_COLOR, HIGH_COLOR]},
        }],
        "layout": {
            "title": "Churned vs At-Risk Clients",
            "yaxis": {"title": "clients"},
        },
    });

    write_page(
        &out_dir.join("churn.html"),
        "Churn Risk",
        &[
            ("Risk Tiers", tier_pie),
            ("Inactivity", inactivity),
            ("Churned vs At-Risk", churned_vs_risk),
        ],
    )
}

fn render_inconsistencies(out_dir: &Path, report: &InconsistencyReport) -> Result<()> {
    let findings = json!({
        "data": [{
            "type": "bar",
            "x": [
                "unknown values",
                "sequence violations",
                "docs gap",
                "multiple applications",
                "churned w/o signed",
                "signed w/o applied",
                "plan changes",
            ],
            "y": [
                report.unknown_values.len(),
                report.sequence_violations.len(),
                report.docs_submitted_gap.count,
                report.multiple_applications.len(),
                report.churned_without_signed.len(),
                report.signed_without_applied.len(),
                report.plan_changes.len(),
            ],
            "marker": {"color": HIGH_COLOR},
        }],
        "layout": {
            "title": "Findings per Rule",
            "yaxis": {"title": "findings"},
        },
    });

    let types: Vec<&str> = report
        .event_type_distribution
        .iter()
        .map(|r| r.event_type.as_str())
        .collect();
    let counts: Vec<usize> = report
        .event_type_distribution
        .iter()
        .map(|r| r.event_count)
        .collect();
    let reach: Vec<usize> = report
        .event_type_distribution
        .iter()
        .map(|r| r.unique_clients)
        .collect();
    let distribution = json!({
        "data": [
            {
                "type": "bar",
                "name": "events",
                "x": types,
                "y": counts,
                "marker": {"color": NEUTRAL_COLOR},
            },
            {
                "type": "bar",
                "name": "unique clients",
                "x": types,
                "y": reach,
                "marker": {"color": MEDIUM_COLOR},
            },
        ],
        "layout": {
            "title": "Event Type Distribution",
            "barmode": "group",
            "yaxis": {"title": "count"},
        },
    });

    write_page(
        &out_dir.join("inconsistencies.html"),
        "Data Quality",
        &[
            ("Findings", findings),
            ("Event Distribution", distribution),
        ],
    )
}

fn write_page(path: &Path, title: &str, figures: &[(&str, Value)]) -> Result<()> {
    let mut body = String::new();
    let mut script = String::new();
    for (index, (heading, figure)) in figures.iter().enumerate() {
        let div_id = format!("chart-{index}");
        body.push_str(&format!(
            "    <h2>{heading}</h2>\n    <div id=\"{div_id}\" class=\"chart\"></div>\n"
        ));
        script.push_str(&format!(
            "      Plotly.newPlot('{div_id}', {});\n",
            serde_json::to_string(figure)?
        ));
    }

    let html = format!(
        r#"<!DOCTYPE html>
<html>
  <head>
    <meta charset="utf-8">
    <title>{title}</title>
    <script src="https://cdn.plot.ly/plotly-2.32.0.min.js"></script>
    <style>
      body {{ font-family: sans-serif; margin: 2rem; }}
      .chart {{ max-width: 860px; height: 420px; margin-bottom: 2rem; }}
    </style>
  </head>
  <body>
    <h1>{title}</h1>
{body}    <script>
{script}    </script>
  </body>
</html>
"#
    );
    std::fs::write(path, html)?;
    Ok(())
}
