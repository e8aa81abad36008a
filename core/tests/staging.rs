use lifecycle_core::error::PipelineError;
use lifecycle_core::event::{EventType, RawEvent};
use lifecycle_core::staging;
use std::collections::HashMap;

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

// ── Tests ────────────────────────────────────────────────────────────────────

/// Ranks for a fixed (client_id, event_type) pair form 1..=k with no gaps
/// or repeats, ordered by event_date ascending.
#[test]
fn ranks_form_contiguous_sequence_per_client_and_type() {
    let rows = vec![
        raw(1, 100, "applied", "2023-01-15"),
        raw(2, 100, "applied", "2023-01-01"),
        raw(3, 100, "applied", "2023-01-30"),
        raw(4, 100, "signed", "2023-02-01"),
        raw(5, 200, "applied", "2023-01-05"),
    ];
    let store = staging::stage(rows).unwrap();

    let mut ranks: HashMap<(i64, EventType), Vec<u32>> = HashMap::new();
    for e in store.events() {
        ranks
            .entry((e.client_id, e.event_type.clone()))
            .or_default()
            .push(e.event_rank);
    }
    for ((client_id, event_type), mut group) in ranks {
        group.sort_unstable();
        let expected: Vec<u32> = (1..=group.len() as u32).collect();
        assert_eq!(
            group, expected,
            "ranks for client {client_id} / {event_type} must be contiguous from 1",
        );
    }

    // Earliest date gets rank 1.
    let rank_one = store
        .events()
        .iter()
        .find(|e| e.client_id == 100 && e.event_type == EventType::Applied && e.event_rank == 1)
        .unwrap();
    assert_eq!(rank_one.record_id, 2);
}

/// Same-date duplicates keep their ingestion order: the stable sort never
/// reorders ties.
#[test]
fn rank_ties_break_by_ingestion_order() {
    let rows = vec![
        raw(11, 100, "applied", "2023-01-10"),
        raw(12, 100, "applied", "2023-01-10"),
    ];
    let store = staging::stage(rows).unwrap();

    let first = store.events().iter().find(|e| e.record_id == 11).unwrap();
    let second = store.events().iter().find(|e| e.record_id == 12).unwrap();
    assert_eq!(first.event_rank, 1, "first ingested row must take rank 1");
    assert_eq!(second.event_rank, 2);
}

/// Missing descriptive fields become sentinels, never dropped rows.
/// Plans are title-cased so casing variants collapse.
#[test]
fn sentinel_fills_are_preserved() {
    let mut bare = raw(1, 100, "applied", "2023-01-01");
    bare.sales_rep_id = Some("not-a-number".to_string());

    let mut styled = raw(2, 100, "signed", "2023-02-01");
    styled.plan = Some("premium plus".to_string());
    styled.sales_rep_id = Some("7".to_string());

    let store = staging::stage(vec![bare, styled]).unwrap();
    let events = store.events();

    assert_eq!(events[0].plan, "Unknown");
    assert_eq!(events[0].marketing_channel, "unknown");
    assert_eq!(events[0].source_system, "unknown");
    assert_eq!(events[0].sales_rep_id, -1, "non-numeric rep collapses to -1");

    assert_eq!(events[1].plan, "Premium Plus");
    assert_eq!(events[1].sales_rep_id, 7);
}

/// Numeric coercion accepts integral floats the way spreadsheet exports
/// produce them.
#[test]
fn client_id_accepts_integral_float() {
    let mut row = raw(1, 0, "applied", "2023-01-01");
    row.client_id = Some("1009.0".to_string());

    let store = staging::stage(vec![row]).unwrap();
    assert_eq!(store.events()[0].client_id, 1009);
}

#[test]
fn non_numeric_client_id_fails_validation() {
    let mut row = raw(1, 0, "applied", "2023-01-01");
    row.client_id = Some("client-nine".to_string());

    let err = staging::stage(vec![row]).unwrap_err();
    assert!(
        matches!(err, PipelineError::Validation { .. }),
        "expected a validation error, got: {err}",
    );
}

#[test]
fn missing_event_date_fails_schema() {
    let mut row = raw(1, 100, "applied", "");
    row.event_date = None;

    let err = staging::stage(vec![row]).unwrap_err();
    assert!(matches!(err, PipelineError::Schema { .. }));
}

#[test]
fn unparseable_event_date_fails_schema() {
    let row = raw(1, 100, "applied", "January 1st");
    let err = staging::stage(vec![row]).unwrap_err();
    assert!(matches!(err, PipelineError::Schema { .. }));
}

#[test]
fn empty_input_is_reported() {
    let err = staging::stage(Vec::new()).unwrap_err();
    assert!(matches!(err, PipelineError::EmptyInput));
}

/// The event type enumeration is open-ended: unrecognized values survive
/// staging as-is.
#[test]
fn unknown_event_type_is_preserved() {
    let store = staging::stage(vec![raw(1, 100, "paused", "2023-01-01")]).unwrap();
    assert_eq!(
        store.events()[0].event_type,
        EventType::Other("paused".to_string()),
    );
}

/// Alternate date formats parse to the same calendar date.
#[test]
fn alternate_date_formats_parse() {
    let rows = vec![
        raw(1, 100, "applied", "2023-01-05"),
        raw(2, 101, "applied", "2023/01/05"),
        raw(3, 102, "applied", "01/05/2023"),
    ];
    let store = staging::stage(rows).unwrap();
    let dates: Vec<String> = store.events().iter().map(|e| e.event_date.to_string()).collect();
    assert_eq!(dates, vec!["2023-01-05", "2023-01-05", "2023-01-05"]);
}
