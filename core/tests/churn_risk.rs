use chrono::NaiveDate;
use lifecycle_core::churn::{self, RiskTier};
use lifecycle_core::config::RiskThresholds;
use lifecycle_core::event::{EventStore, EventType, RawEvent};
use lifecycle_core::staging;

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

fn store_from(rows: Vec<RawEvent>) -> EventStore {
    staging::stage(rows).unwrap()
}

fn date(text: &str) -> NaiveDate {
    NaiveDate::parse_from_str(text, "%Y-%m-%d").unwrap()
}

// ── Tests ────────────────────────────────────────────────────────────────────

/// With no explicit reference date, the assessment anchors on the maximum
/// event date in the input, so reruns are reproducible.
#[test]
fn reference_defaults_to_max_event_date() {
    let store = store_from(vec![
        raw(1, 1, "applied", "2023-01-01"),
        raw(2, 2, "applied", "2023-03-01"),
    ]);
    let records = churn::assess(&store, None, &RiskThresholds::default()).unwrap();

    let by_id = |id: i64| records.iter().find(|r| r.client_id == id).unwrap();
    assert_eq!(by_id(2).days_since_last_event, 0);
    assert_eq!(by_id(2).risk_tier, RiskTier::Low);
    assert_eq!(by_id(1).days_since_last_event, 59);
    assert_eq!(by_id(1).risk_tier, RiskTier::Medium);
}

/// Boundary fixtures pin the threshold semantics: exactly 30 days is
/// still low, exactly 60 still medium, one day past each moves a tier.
#[test]
fn tier_boundaries_are_inclusive() {
    let store = store_from(vec![
        raw(1, 30, "applied", "2023-03-01"), // 30 days before reference
        raw(2, 31, "applied", "2023-02-28"), // 31 days
        raw(3, 60, "applied", "2023-01-30"), // 60 days
        raw(4, 61, "applied", "2023-01-29"), // 61 days
        raw(5, 65, "applied", "2023-01-25"), // 65 days
    ]);
    let reference = Some(date("2023-03-31"));
    let records = churn::assess(&store, reference, &RiskThresholds::default()).unwrap();

    let tier = |id: i64| {
        records
            .iter()
            .find(|r| r.client_id == id)
            .map(|r| r.risk_tier)
            .unwrap()
    };
    assert_eq!(tier(30), RiskTier::Low);
    assert_eq!(tier(31), RiskTier::Medium);
    assert_eq!(tier(60), RiskTier::Medium);
    assert_eq!(tier(61), RiskTier::High);
    assert_eq!(tier(65), RiskTier::High);
}

/// A churned client is already_churned no matter how long inactive.
#[test]
fn churned_precedence_overrides_inactivity() {
    let store = store_from(vec![
        raw(1, 5, "applied", "2023-01-01"),
        raw(2, 5, "churned", "2023-01-25"),
    ]);
    let reference = Some(date("2023-03-31"));
    let records = churn::assess(&store, reference, &RiskThresholds::default()).unwrap();

    assert_eq!(records[0].risk_tier, RiskTier::AlreadyChurned);
    assert!(records[0].is_churned);
}

/// When two events share the maximum date, the most recently ingested
/// one wins the last-event slot.
#[test]
fn last_event_tiebreak_uses_ingestion_order() {
    let store = store_from(vec![
        raw(1, 8, "applied", "2023-01-10"),
        raw(2, 8, "signed", "2023-01-10"),
    ]);
    let records = churn::assess(&store, None, &RiskThresholds::default()).unwrap();
    assert_eq!(records[0].last_event_type, EventType::Signed);

    let store = store_from(vec![
        raw(1, 8, "signed", "2023-01-10"),
        raw(2, 8, "applied", "2023-01-10"),
    ]);
    let records = churn::assess(&store, None, &RiskThresholds::default()).unwrap();
    assert_eq!(records[0].last_event_type, EventType::Applied);
}

#[test]
fn days_since_signed_absent_when_never_signed() {
    let store = store_from(vec![raw(1, 3, "applied", "2023-01-01")]);
    let records = churn::assess(&store, None, &RiskThresholds::default()).unwrap();

    assert!(records[0].days_since_signed.is_none());
    assert!(records[0].signed_date.is_none());
}

/// The churn table carries the latest occurrence per stage, unlike the
/// funnel table's first occurrence.
#[test]
fn stage_dates_use_latest_occurrence() {
    let store = store_from(vec![
        raw(1, 12, "applied", "2023-01-01"),
        raw(2, 12, "applied", "2023-01-20"),
        raw(3, 12, "signed", "2023-02-01"),
    ]);
    let records = churn::assess(&store, None, &RiskThresholds::default()).unwrap();
    assert_eq!(records[0].applied_date.unwrap().to_string(), "2023-01-20");
}

/// The tier function is total over (is_churned, inactivity): exactly one
/// tier for every input, unknown when inactivity cannot be measured.
#[test]
fn classify_risk_is_total() {
    let t = RiskThresholds::default();
    assert_eq!(churn::classify_risk(true, Some(5), &t), RiskTier::AlreadyChurned);
    assert_eq!(churn::classify_risk(true, None, &t), RiskTier::AlreadyChurned);
    assert_eq!(churn::classify_risk(false, None, &t), RiskTier::Unknown);
    assert_eq!(churn::classify_risk(false, Some(0), &t), RiskTier::Low);
    assert_eq!(churn::classify_risk(false, Some(45), &t), RiskTier::Medium);
    assert_eq!(churn::classify_risk(false, Some(100), &t), RiskTier::High);
}

/// Thresholds come from configuration, not constants baked into the
/// classifier.
#[test]
fn thresholds_are_configurable() {
    let tight = RiskThresholds {
        low_max_days: 7,
        medium_max_days: 14,
    };
    assert_eq!(churn::classify_risk(false, Some(8), &tight), RiskTier::Medium);
    assert_eq!(churn::classify_risk(false, Some(15), &tight), RiskTier::High);
}

/// Worked example: reference date is the max event date; a client whose
/// last event is 65 days prior and who never churned lands in high.
#[test]
fn long_inactive_unchurned_client_is_high_risk() {
    let store = store_from(vec![
        raw(1, 1, "signed", "2023-03-31"), // anchors the reference date
        raw(2, 2, "applied", "2023-01-25"),
    ]);
    let records = churn::assess(&store, None, &RiskThresholds::default()).unwrap();

    let stale = records.iter().find(|r| r.client_id == 2).unwrap();
    assert_eq!(stale.days_since_last_event, 65);
    assert_eq!(stale.risk_tier, RiskTier::High);
}
