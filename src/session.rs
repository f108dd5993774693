//! Disclosure sessions: one per incoming task.
//!
//! A session walks `Init → Matching → BodyLoading → ReferenceLoading →
//! Done` in strict sequence, admitting content against its own budget
//! ledger. Cancellation is cooperative and checked at tier boundaries;
//! a deadline expiry ends the session early but keeps whatever was
//! already committed.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::budget::BudgetLedger;
use crate::config::Config;
use crate::core::bundle::{BundleEntry, DisclosureBundle, Tier};
use crate::core::record::TaskQuery;
use crate::error::{DiscError, Result};
use crate::matcher::{MatchScore, TriggerMatcher};
use crate::registry::source::Deadline;
use crate::registry::{RegistrySnapshot, SourceError};
use crate::resolver::ReferenceResolver;

/// Session lifecycle. `Cancelled` is reachable from any non-terminal
/// state; `Done` covers both complete and timed-out sessions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Init,
    Matching,
    BodyLoading,
    ReferenceLoading,
    Done,
    Cancelled,
}

/// Shared flag for cooperative cancellation. Clone freely; all clones
/// observe the same cancel.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle(Arc<AtomicBool>);

impl CancelHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// How the session ended. Cancellation is an error, not an outcome: a
/// cancelled session returns no bundle at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionOutcome {
    Complete,
    TimedOut { stage: &'static str },
}

/// A candidate dropped for lack of capacity. Informational: the bundle
/// is still complete and valid for what fit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedEntry {
    pub tier: Tier,
    pub skill_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference_id: Option<String>,
    pub units: u64,
}

/// Terminal artifact of a session run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionReport {
    pub bundle: DisclosureBundle,
    pub outcome: SessionOutcome,
    /// The matcher's full ranked output for the query
    pub matches: Vec<MatchScore>,
    pub skipped: Vec<SkippedEntry>,
    pub remaining_units: u64,
    pub snapshot_fingerprint: String,
}

/// Per-session tunables.
#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// Budget capacity in size units
    pub capacity: u64,
    /// Deadline applied to each individual fetch
    pub fetch_timeout: Duration,
    pub reference_cache_entries: usize,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            capacity: 8_000,
            fetch_timeout: Duration::from_millis(1_000),
            reference_cache_entries: crate::resolver::DEFAULT_CACHE_ENTRIES,
        }
    }
}

/// Orchestrates matching, budget allocation, and lazy loading for one
/// task query against one registry snapshot.
pub struct DisclosureSession {
    snapshot: Arc<RegistrySnapshot>,
    matcher: TriggerMatcher,
    ledger: BudgetLedger,
    resolver: ReferenceResolver,
    cancel: CancelHandle,
    fetch_timeout: Duration,
    state: SessionState,
}

impl DisclosureSession {
    pub fn new(
        snapshot: Arc<RegistrySnapshot>,
        matcher: TriggerMatcher,
        options: SessionOptions,
    ) -> Self {
        Self {
            snapshot,
            matcher,
            ledger: BudgetLedger::new(options.capacity),
            resolver: ReferenceResolver::new(options.reference_cache_entries),
            cancel: CancelHandle::new(),
            fetch_timeout: options.fetch_timeout,
            state: SessionState::Init,
        }
    }

    /// Session wired from loaded configuration.
    pub fn from_config(snapshot: Arc<RegistrySnapshot>, config: &Config) -> Self {
        Self::new(
            snapshot,
            TriggerMatcher::from_config(&config.matcher),
            config.session_options(),
        )
    }

    /// Handle for cancelling this session from another thread.
    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    /// Drive cancellation from a handle the caller already holds.
    pub fn with_cancel_handle(mut self, handle: CancelHandle) -> Self {
        self.cancel = handle;
        self
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Run the session to completion. Consumes the session: a query is
    /// ephemeral and gets a fresh budget, so there is nothing to reuse.
    pub fn run(mut self, query: &TaskQuery) -> Result<SessionReport> {
        self.enter(SessionState::Matching)?;
        let matches = self.matcher.rank(query, &self.snapshot);
        debug!(matched = matches.len(), "matching complete");

        let mut bundle = DisclosureBundle::default();
        let mut skipped: Vec<SkippedEntry> = Vec::new();

        self.enter(SessionState::BodyLoading)?;

        // Metadata first: small, fixed-cost, admitted for every matched
        // skill in rank order. A skill whose metadata does not fit is
        // dropped entirely rather than overcommitting.
        let mut admitted_ids: Vec<String> = Vec::new();
        for score in &matches {
            let Some(record) = self.snapshot.get(&score.skill_id) else {
                continue;
            };
            if self.ledger.admit(record.metadata_units).granted {
                bundle.push(BundleEntry {
                    tier: Tier::Metadata,
                    skill_id: score.skill_id.clone(),
                    reference_id: None,
                    content: record.metadata.render(),
                    units: record.metadata_units,
                });
                admitted_ids.push(score.skill_id.clone());
            } else {
                warn!(skill_id = %score.skill_id, "metadata dropped: over capacity");
                skipped.push(SkippedEntry {
                    tier: Tier::Metadata,
                    skill_id: score.skill_id.clone(),
                    reference_id: None,
                    units: record.metadata_units,
                });
            }
        }

        // Bodies in relevance order, skip-on-overflow: a body that does
        // not fit is skipped whole and evaluation continues, so a later,
        // smaller candidate can still be admitted.
        let mut loaded_bodies: Vec<(String, String)> = Vec::new();
        for skill_id in &admitted_ids {
            let Some(record) = self.snapshot.get(skill_id) else {
                continue;
            };
            if !self.ledger.reserve(record.body_units) {
                debug!(skill_id = %skill_id, units = record.body_units, "body skipped: over remaining budget");
                skipped.push(SkippedEntry {
                    tier: Tier::Body,
                    skill_id: skill_id.clone(),
                    reference_id: None,
                    units: record.body_units,
                });
                continue;
            }
            match self.snapshot.body(skill_id, Deadline::after(self.fetch_timeout)) {
                Ok(body) => {
                    self.ledger.commit_reserved(record.body_units);
                    bundle.push(BundleEntry {
                        tier: Tier::Body,
                        skill_id: skill_id.clone(),
                        reference_id: None,
                        content: body.clone(),
                        units: record.body_units,
                    });
                    loaded_bodies.push((skill_id.clone(), body));
                }
                Err(SourceError::Timeout) => {
                    self.ledger.release_reserved(record.body_units);
                    return Ok(self.finish_timed_out("body", bundle, matches, skipped));
                }
                Err(e) => {
                    self.ledger.release_reserved(record.body_units);
                    return Err(DiscError::Source(e));
                }
            }
        }

        self.enter(SessionState::ReferenceLoading)?;

        // References a loaded body actually points to, in declared order.
        for (skill_id, body) in &loaded_bodies {
            let Some(record) = self.snapshot.get(skill_id) else {
                continue;
            };
            for reference in &record.references {
                if !body_points_to(body, &reference.id) {
                    continue;
                }
                let deadline = Deadline::after(self.fetch_timeout);
                match self.resolver.resolve(
                    &self.snapshot,
                    skill_id,
                    &reference.id,
                    &mut self.ledger,
                    deadline,
                ) {
                    Ok(resolved) => {
                        bundle.push(BundleEntry {
                            tier: Tier::Reference,
                            skill_id: skill_id.clone(),
                            reference_id: Some(reference.id.clone()),
                            content: resolved.content.to_string(),
                            units: resolved.charged_units,
                        });
                    }
                    Err(DiscError::BudgetExceeded { .. }) => {
                        debug!(skill_id = %skill_id, reference_id = %reference.id, "reference skipped: over remaining budget");
                        skipped.push(SkippedEntry {
                            tier: Tier::Reference,
                            skill_id: skill_id.clone(),
                            reference_id: Some(reference.id.clone()),
                            units: reference.units,
                        });
                    }
                    Err(DiscError::LoadTimeout { .. }) => {
                        return Ok(self.finish_timed_out("reference", bundle, matches, skipped));
                    }
                    Err(e) => return Err(e),
                }
            }
        }

        self.state = SessionState::Done;
        info!(
            entries = bundle.len(),
            committed = self.ledger.committed(),
            remaining = self.ledger.remaining(),
            "session complete"
        );
        Ok(SessionReport {
            bundle,
            outcome: SessionOutcome::Complete,
            matches,
            skipped,
            remaining_units: self.ledger.remaining(),
            snapshot_fingerprint: self.snapshot.fingerprint().to_string(),
        })
    }

    /// Tier boundary: the only places cancellation is observed. A fetch
    /// already in flight is never interrupted.
    fn enter(&mut self, next: SessionState) -> Result<()> {
        if self.cancel.is_cancelled() {
            self.ledger.release_all_reserved();
            self.state = SessionState::Cancelled;
            info!("session cancelled");
            return Err(DiscError::Cancelled);
        }
        self.state = next;
        Ok(())
    }

    /// Soft failure: keep the committed partial bundle.
    fn finish_timed_out(
        &mut self,
        stage: &'static str,
        bundle: DisclosureBundle,
        matches: Vec<MatchScore>,
        skipped: Vec<SkippedEntry>,
    ) -> SessionReport {
        warn!(stage, entries = bundle.len(), "session timed out, returning partial bundle");
        self.state = SessionState::Done;
        SessionReport {
            bundle,
            outcome: SessionOutcome::TimedOut { stage },
            matches,
            skipped,
            remaining_units: self.ledger.remaining(),
            snapshot_fingerprint: self.snapshot.fingerprint().to_string(),
        }
    }
}

/// A body names a reference by containing its on-disk pointer form.
fn body_points_to(body: &str, reference_id: &str) -> bool {
    body.contains(&format!("references/{reference_id}"))
}
