use lifecycle_core::config::PipelineConfig;
use lifecycle_core::error::PipelineError;
use lifecycle_core::event::RawEvent;
use lifecycle_core::pipeline;
use lifecycle_core::store::ResultsStore;

// ── Helpers ──────────────────────────────────────────────────────────────────

fn raw(record_id: i64, client_id: i64, event_type: &str, event_date: &str) -> RawEvent {
    RawEvent {
        record_id: Some(record_id.to_string()),
        client_id: Some(client_id.to_string()),
        event_type: Some(event_type.to_string()),
        event_date: Some(event_date.to_string()),
        ..RawEvent::default()
    }
}

/// A fixture exercising every component: an active client, a churned
/// one, a pending one, a sequence violation, repeat applications and a
/// churn without signature.
fn fixture_rows() -> Vec<RawEvent> {
    vec![
        raw(1, 1, "applied", "2023-01-01"),
        raw(2, 1, "docs_submitted", "2023-01-05"),
        raw(3, 1, "signed", "2023-01-20"),
        raw(4, 2, "applied", "2023-01-02"),
        raw(5, 2, "signed", "2023-01-25"),
        raw(6, 2, "churned", "2023-02-15"),
        raw(7, 3, "applied", "2023-01-03"),
        raw(8, 1009, "applied", "2023-01-30"),
        raw(9, 1009, "signed", "2023-01-28"),
        raw(10, 5, "applied", "2023-01-01"),
        raw(11, 5, "applied", "2023-01-15"),
        raw(12, 5, "rejected", "2023-02-01"),
        raw(13, 6, "churned", "2023-02-20"),
    ]
}

// ── Tests ────────────────────────────────────────────────────────────────────

/// Running the pipeline twice over identical input yields identical
/// outputs: no wall clock, no hidden state.
#[test]
fn identical_input_yields_identical_output() {
    let config = PipelineConfig::default();
    let first = pipeline::run(fixture_rows(), &config).unwrap();
    let second = pipeline::run(fixture_rows(), &config).unwrap();

    assert_eq!(
        serde_json::to_value(first.events.events()).unwrap(),
        serde_json::to_value(second.events.events()).unwrap(),
    );
    assert_eq!(
        serde_json::to_value(&first.funnel_records).unwrap(),
        serde_json::to_value(&second.funnel_records).unwrap(),
    );
    assert_eq!(
        serde_json::to_value(&first.funnel_metrics).unwrap(),
        serde_json::to_value(&second.funnel_metrics).unwrap(),
    );
    assert_eq!(
        serde_json::to_value(&first.risk_records).unwrap(),
        serde_json::to_value(&second.risk_records).unwrap(),
    );
    assert_eq!(
        serde_json::to_value(&first.inconsistencies).unwrap(),
        serde_json::to_value(&second.inconsistencies).unwrap(),
    );
}

#[test]
fn all_components_report_success() {
    let output = pipeline::run(fixture_rows(), &PipelineConfig::default()).unwrap();

    assert!(output.all_ok());
    assert!(output.failed_components().is_empty());
    assert_eq!(output.statuses.len(), 3);
    assert!(output.funnel_records.is_some());
    assert!(output.funnel_metrics.is_some());
    assert!(output.risk_records.is_some());
    assert!(output.inconsistencies.is_some());
}

#[test]
fn empty_input_aborts_the_run() {
    let err = pipeline::run(Vec::new(), &PipelineConfig::default()).unwrap_err();
    assert!(matches!(err, PipelineError::EmptyInput));
}

/// A staging failure is fatal: no partial staged output reaches the
/// feature components.
#[test]
fn staging_failure_aborts_the_run() {
    let mut rows = fixture_rows();
    rows.push(raw(99, 9, "applied", "not-a-date"));

    let err = pipeline::run(rows, &PipelineConfig::default()).unwrap_err();
    assert!(matches!(err, PipelineError::Schema { .. }));
}

/// The whole output round-trips into the results store.
#[test]
fn output_persists_to_store() {
    let output = pipeline::run(fixture_rows(), &PipelineConfig::default()).unwrap();

    let store = ResultsStore::in_memory().unwrap();
    store.migrate().unwrap();
    let run_id = store.create_run(None, "test").unwrap();
    store.persist_output(&run_id, &output).unwrap();

    assert_eq!(
        store.staged_event_count(&run_id).unwrap(),
        output.events.len() as i64,
    );
    assert_eq!(
        store.funnel_record_count(&run_id).unwrap(),
        output.events.client_ids().len() as i64,
    );

    let report = output.inconsistencies.as_ref().unwrap();
    assert_eq!(
        store.sequence_violation_count(&run_id).unwrap(),
        report.sequence_violations.len() as i64,
    );
    assert_eq!(
        store.unknown_value_count(&run_id).unwrap(),
        report.unknown_values.len() as i64,
    );

    let tiers = store.risk_tier_counts(&run_id).unwrap();
    let assessed: i64 = tiers.values().sum();
    assert_eq!(assessed, output.risk_records.as_ref().unwrap().len() as i64);
}

/// File-backed stores survive a close and reopen.
#[test]
fn store_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("results.db");
    let db_path = db_path.to_str().unwrap();

    let output = pipeline::run(fixture_rows(), &PipelineConfig::default()).unwrap();
    let run_id = {
        let store = ResultsStore::open(db_path).unwrap();
        store.migrate().unwrap();
        let run_id = store.create_run(None, "test").unwrap();
        store.persist_output(&run_id, &output).unwrap();
        run_id
    };

    let reopened = ResultsStore::open(db_path).unwrap();
    assert_eq!(
        reopened.staged_event_count(&run_id).unwrap(),
        output.events.len() as i64,
    );
    assert_eq!(reopened.client_count(&run_id).unwrap(), 6);
}
