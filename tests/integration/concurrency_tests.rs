//! Concurrent sessions over one shared snapshot.

use std::sync::Arc;
use std::time::Duration;

use skilldisc::core::record::TaskQuery;
use skilldisc::matcher::TriggerMatcher;
use skilldisc::session::{DisclosureSession, SessionOptions, SessionReport};

use crate::fixture::{budget_scenario_catalog, snapshot_of};

fn run_once(snapshot: &Arc<skilldisc::registry::RegistrySnapshot>, query: &str) -> SessionReport {
    DisclosureSession::new(
        Arc::clone(snapshot),
        TriggerMatcher::default(),
        SessionOptions {
            capacity: 6_100,
            fetch_timeout: Duration::from_secs(5),
            ..SessionOptions::default()
        },
    )
    .run(&TaskQuery::new(query))
    .unwrap()
}

#[test]
fn test_concurrent_sessions_share_snapshot_independently() {
    let snapshot = snapshot_of(budget_scenario_catalog());
    let baseline = run_once(&snapshot, "python async patterns");

    let reports: Vec<SessionReport> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let snapshot = Arc::clone(&snapshot);
                scope.spawn(move || run_once(&snapshot, "python async patterns"))
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    // each session owns its budget; sharing a snapshot changes nothing
    for report in &reports {
        assert_eq!(report, &baseline);
    }
}

#[test]
fn test_distinct_queries_do_not_interfere() {
    let snapshot = snapshot_of(budget_scenario_catalog());

    let (python, bash) = std::thread::scope(|scope| {
        let python = {
            let snapshot = Arc::clone(&snapshot);
            scope.spawn(move || run_once(&snapshot, "python async patterns"))
        };
        let bash = {
            let snapshot = Arc::clone(&snapshot);
            scope.spawn(move || run_once(&snapshot, "bash scripting help"))
        };
        (python.join().unwrap(), bash.join().unwrap())
    });

    assert_eq!(python.matches[0].skill_id, "c");
    assert_eq!(bash.matches[0].skill_id, "b");
    // both sessions started from the same full capacity
    assert_eq!(python.bundle.total_units() + python.remaining_units, 6_100);
    assert_eq!(bash.bundle.total_units() + bash.remaining_units, 6_100);
}
