//! End-to-end disclosure session scenarios.

use std::time::Duration;

use skilldisc::DiscError;
use skilldisc::config::MatcherConfig;
use skilldisc::core::bundle::Tier;
use skilldisc::core::record::TaskQuery;
use skilldisc::matcher::TriggerMatcher;
use skilldisc::registry::source::MemorySkill;
use skilldisc::registry::InMemorySource;
use skilldisc::session::{
    CancelHandle, DisclosureSession, SessionOptions, SessionOutcome,
};

use crate::fixture::{
    CancelDuringBody, TimeoutReferences, budget_scenario_catalog, snapshot_of,
};

fn options(capacity: u64) -> SessionOptions {
    SessionOptions {
        capacity,
        fetch_timeout: Duration::from_secs(5),
        ..SessionOptions::default()
    }
}

fn entry_keys(report: &skilldisc::session::SessionReport) -> Vec<(Tier, String)> {
    report
        .bundle
        .entries()
        .iter()
        .map(|e| (e.tier, e.skill_id.clone()))
        .collect()
}

#[test]
fn test_budget_walk_admits_best_fit_continuation() {
    // capacity = 100 (metadata for all three) + 6000 (bodies)
    let snapshot = snapshot_of(budget_scenario_catalog());
    let session = DisclosureSession::new(snapshot, TriggerMatcher::default(), options(6_100));
    let report = session.run(&TaskQuery::new("python async patterns")).unwrap();

    let ranked: Vec<&str> = report.matches.iter().map(|m| m.skill_id.as_str()).collect();
    assert_eq!(ranked, vec!["c", "a", "b"]);

    // metadata for all three in rank order, then body(c), then body(a);
    // b's 3000-unit body no longer fits and is skipped whole
    assert_eq!(
        entry_keys(&report),
        vec![
            (Tier::Metadata, "c".to_string()),
            (Tier::Metadata, "a".to_string()),
            (Tier::Metadata, "b".to_string()),
            (Tier::Body, "c".to_string()),
            (Tier::Body, "a".to_string()),
        ]
    );
    assert_eq!(report.remaining_units, 0);
    assert_eq!(report.outcome, SessionOutcome::Complete);
    assert_eq!(report.skipped.len(), 1);
    assert_eq!(report.skipped[0].tier, Tier::Body);
    assert_eq!(report.skipped[0].skill_id, "b");
}

#[test]
fn test_skipped_large_body_does_not_block_smaller_one() {
    // rank order is [c, a, b]; with 100 + 2500 only c's 2000-unit body
    // fits, a (4000) and b (3000) are skipped but metadata stays
    let snapshot = snapshot_of(budget_scenario_catalog());
    let session = DisclosureSession::new(snapshot, TriggerMatcher::default(), options(2_600));
    let report = session.run(&TaskQuery::new("python async patterns")).unwrap();

    let bodies: Vec<&str> = report
        .bundle
        .entries()
        .iter()
        .filter(|e| e.tier == Tier::Body)
        .map(|e| e.skill_id.as_str())
        .collect();
    assert_eq!(bodies, vec!["c"]);
    assert_eq!(report.bundle.total_units(), 100 + 2_000);
}

#[test]
fn test_increasing_budget_only_adds_content() {
    let queries = TaskQuery::new("python async patterns");
    let small = DisclosureSession::new(
        snapshot_of(budget_scenario_catalog()),
        TriggerMatcher::default(),
        options(2_100),
    )
    .run(&queries)
    .unwrap();
    let large = DisclosureSession::new(
        snapshot_of(budget_scenario_catalog()),
        TriggerMatcher::default(),
        options(6_100),
    )
    .run(&queries)
    .unwrap();

    let large_keys = entry_keys(&large);
    for key in entry_keys(&small) {
        assert!(large_keys.contains(&key), "{key:?} lost when budget grew");
    }
}

#[test]
fn test_zero_match_query_yields_empty_bundle_without_error() {
    let snapshot = snapshot_of(budget_scenario_catalog());
    let matcher = TriggerMatcher::from_config(&MatcherConfig {
        min_relevance: 0.05,
        ..MatcherConfig::default()
    });
    let session = DisclosureSession::new(snapshot, matcher, options(6_100));
    let report = session.run(&TaskQuery::new("kubernetes ingress")).unwrap();

    assert!(report.matches.is_empty());
    assert!(report.bundle.is_empty());
    assert_eq!(report.outcome, SessionOutcome::Complete);
}

#[test]
fn test_empty_registry_yields_empty_bundle() {
    let snapshot = snapshot_of(InMemorySource::new());
    let session = DisclosureSession::new(snapshot, TriggerMatcher::default(), options(6_100));
    let report = session.run(&TaskQuery::new("anything")).unwrap();
    assert!(report.bundle.is_empty());
}

#[test]
fn test_determinism_identical_inputs_identical_bundles() {
    let query = TaskQuery::new("python async patterns");
    let first = DisclosureSession::new(
        snapshot_of(budget_scenario_catalog()),
        TriggerMatcher::default(),
        options(6_100),
    )
    .run(&query)
    .unwrap();
    let second = DisclosureSession::new(
        snapshot_of(budget_scenario_catalog()),
        TriggerMatcher::default(),
        options(6_100),
    )
    .run(&query)
    .unwrap();

    assert_eq!(first, second);
    assert_eq!(first.snapshot_fingerprint, second.snapshot_fingerprint);
}

#[test]
fn test_reference_timeout_keeps_loaded_references() {
    let catalog = InMemorySource::new().with_skill(
        MemorySkill::new("s", "S", "python deployment")
            .with_body(
                "steps: references/one.md then references/two.md then references/three.md",
            )
            .with_sized_reference("one.md", "first reference", 10)
            .with_sized_reference("two.md", "second reference", 10)
            .with_sized_reference("three.md", "third reference", 10),
    );
    let source = TimeoutReferences::new(catalog, &["three.md"]);
    let snapshot = snapshot_of(source);

    let session = DisclosureSession::new(snapshot, TriggerMatcher::default(), options(1_000));
    let report = session.run(&TaskQuery::new("python deployment")).unwrap();

    assert_eq!(report.outcome, SessionOutcome::TimedOut { stage: "reference" });
    let reference_ids: Vec<&str> = report
        .bundle
        .entries()
        .iter()
        .filter(|e| e.tier == Tier::Reference)
        .filter_map(|e| e.reference_id.as_deref())
        .collect();
    assert_eq!(reference_ids, vec!["one.md", "two.md"]);
}

#[test]
fn test_cancel_mid_session_discards_bundle() {
    let handle = CancelHandle::new();
    let source = CancelDuringBody::new(budget_scenario_catalog(), handle.clone());
    let snapshot = snapshot_of(source);

    let session = DisclosureSession::new(snapshot, TriggerMatcher::default(), options(6_100))
        .with_cancel_handle(handle);
    // the cancel fires during the first body fetch; the session observes
    // it at the reference-loading boundary and discards everything
    let result = session.run(&TaskQuery::new("python async patterns"));
    assert!(matches!(result, Err(DiscError::Cancelled)));
}

#[test]
fn test_metadata_dropped_under_pathological_capacity() {
    let snapshot = snapshot_of(budget_scenario_catalog());
    // only the top-ranked skill's metadata fits
    let session = DisclosureSession::new(snapshot, TriggerMatcher::default(), options(40));
    let report = session.run(&TaskQuery::new("python async patterns")).unwrap();

    let metadata_ids: Vec<&str> = report
        .bundle
        .entries()
        .iter()
        .filter(|e| e.tier == Tier::Metadata)
        .map(|e| e.skill_id.as_str())
        .collect();
    assert_eq!(metadata_ids, vec!["c"]);
    // the dropped skills appear in the skipped list, never overcommitted
    assert!(report.bundle.total_units() <= 40);
    assert!(
        report
            .skipped
            .iter()
            .any(|s| s.tier == Tier::Metadata && s.skill_id == "a")
    );
}
