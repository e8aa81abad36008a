//! pipeline-runner: headless batch runner for the client lifecycle
//! pipeline.
//!
//! Usage:
//!   pipeline-runner --input events.csv --out-dir ./output
//!   pipeline-runner --input events.csv --as-of 2023-03-01 --db results.db

mod dashboard;
mod export;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use lifecycle_core::{config::PipelineConfig, ingest, pipeline, store::ResultsStore};
use std::env;
use std::path::{Path, PathBuf};

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let input = arg_value(&args, "--input").unwrap_or_else(|| "events.csv".to_string());
    let out_dir = PathBuf::from(
        arg_value(&args, "--out-dir").unwrap_or_else(|| "./output".to_string()),
    );
    let as_of = match arg_value(&args, "--as-of") {
        Some(text) => Some(
            NaiveDate::parse_from_str(&text, "%Y-%m-%d")
                .context("--as-of must be a YYYY-MM-DD date")?,
        ),
        None => None,
    };

    let mut config = match arg_value(&args, "--config") {
        Some(path) => PipelineConfig::load(Path::new(&path))?,
        None => PipelineConfig::default(),
    };
    if as_of.is_some() {
        config.reference_date = as_of;
    }

    println!("client lifecycle pipeline - pipeline-runner");
    println!("  input:    {input}");
    println!("  out_dir:  {}", out_dir.display());
    match config.reference_date {
        Some(date) => println!("  as_of:    {date}"),
        None => println!("  as_of:    max event date in input"),
    }
    println!();

    let raw = ingest::read_raw_events(Path::new(&input))?;
    let output = pipeline::run(raw, &config)?;

    std::fs::create_dir_all(&out_dir)?;
    let db_path = arg_value(&args, "--db")
        .unwrap_or_else(|| out_dir.join("results.db").display().to_string());
    let store = ResultsStore::open(&db_path)?;
    store.migrate()?;
    let run_id = store.create_run(config.reference_date, env!("CARGO_PKG_VERSION"))?;
    store.persist_output(&run_id, &output)?;

    export::write_tables(&out_dir, &output)?;
    dashboard::render_all(&out_dir, &output)?;

    print_summary(&store, &run_id, &output)?;

    if !output.all_ok() {
        // Per-component failures already produced every artifact the
        // healthy components could; signal the failure to callers.
        std::process::exit(1);
    }
    Ok(())
}

fn arg_value(args: &[String], flag: &str) -> Option<String> {
    args.windows(2).find(|w| w[0] == flag).map(|w| w[1].clone())
}

fn print_summary(
    store: &ResultsStore,
    run_id: &str,
    output: &lifecycle_core::pipeline::PipelineOutput,
) -> Result<()> {
    println!("run complete: {run_id}");
    println!(
        "  staged events:  {} ({} clients)",
        store.staged_event_count(run_id)?,
        store.client_count(run_id)?,
    );

    if let Some(metrics) = &output.funnel_metrics {
        println!(
            "  funnel:         {} applied, {} signed, {} churned, {} active",
            metrics.applied_clients,
            metrics.signed_clients,
            metrics.churned_clients,
            metrics.active_clients,
        );
        println!(
            "  conversion:     {:.1}% applied to signed",
            metrics.conversion_rate * 100.0,
        );
    }

    if output.risk_records.is_some() {
        let tiers = store.risk_tier_counts(run_id)?;
        let tier = |name: &str| tiers.get(name).copied().unwrap_or(0);
        println!(
            "  risk tiers:     {} high, {} medium, {} low, {} churned",
            tier("high"),
            tier("medium"),
            tier("low"),
            tier("already_churned"),
        );
    }

    if let Some(report) = &output.inconsistencies {
        println!(
            "  inconsistency:  {} findings ({} sequence violations, {} unknown values)",
            report.total_findings(),
            report.sequence_violations.len(),
            report.unknown_values.len(),
        );
    }

    for status in &output.statuses {
        if !status.ok {
            println!(
                "  FAILED:         {} ({})",
                status.component,
                status.error.as_deref().unwrap_or("unknown error"),
            );
        }
    }
    Ok(())
}
