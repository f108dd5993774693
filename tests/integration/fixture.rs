//! Shared fixtures for integration scenarios.

use std::sync::Arc;

use skilldisc::registry::source::{
    Deadline, MemorySkill, ScannedSkill, SkillSource, SourceError,
};
use skilldisc::registry::{InMemorySource, RegistrySnapshot, SkillRegistry};
use skilldisc::session::CancelHandle;

/// The worked budget scenario: three skills with declared body sizes
/// 4000/3000/2000 and metadata summing to 100 units.
pub fn budget_scenario_catalog() -> InMemorySource {
    InMemorySource::new()
        .with_skill(
            MemorySkill::new("a", "A", "python testing")
                .with_metadata_units(33)
                .with_body("pytest fixtures and parametrize")
                .with_body_units(4000),
        )
        .with_skill(
            MemorySkill::new("b", "B", "bash scripting")
                .with_metadata_units(33)
                .with_body("set -euo pipefail")
                .with_body_units(3000),
        )
        .with_skill(
            MemorySkill::new("c", "C", "python async")
                .with_metadata_units(34)
                .with_body("prefer structured concurrency")
                .with_body_units(2000),
        )
}

pub fn snapshot_of(source: impl SkillSource + 'static) -> Arc<RegistrySnapshot> {
    let (registry, report) = SkillRegistry::load(Arc::new(source), Deadline::none()).unwrap();
    assert!(report.is_clean(), "fixture loads cleanly: {:?}", report.errors);
    registry.snapshot()
}

/// Source wrapper that times out fetches for the listed reference ids.
pub struct TimeoutReferences {
    inner: InMemorySource,
    timeout_ids: Vec<String>,
}

impl TimeoutReferences {
    pub fn new(inner: InMemorySource, timeout_ids: &[&str]) -> Self {
        Self {
            inner,
            timeout_ids: timeout_ids.iter().map(|s| (*s).to_string()).collect(),
        }
    }
}

impl SkillSource for TimeoutReferences {
    fn scan(&self, deadline: Deadline) -> Result<Vec<ScannedSkill>, SourceError> {
        self.inner.scan(deadline)
    }

    fn fetch_body(&self, skill_id: &str, deadline: Deadline) -> Result<String, SourceError> {
        self.inner.fetch_body(skill_id, deadline)
    }

    fn fetch_reference(
        &self,
        skill_id: &str,
        reference_id: &str,
        deadline: Deadline,
    ) -> Result<String, SourceError> {
        if self.timeout_ids.iter().any(|id| id == reference_id) {
            return Err(SourceError::Timeout);
        }
        self.inner.fetch_reference(skill_id, reference_id, deadline)
    }
}

/// Source wrapper that fires a cancel handle during the first body fetch,
/// simulating a caller aborting while a fetch is in flight. The fetch
/// itself still completes; the session observes the cancel at the next
/// tier boundary.
pub struct CancelDuringBody {
    inner: InMemorySource,
    handle: CancelHandle,
}

impl CancelDuringBody {
    pub fn new(inner: InMemorySource, handle: CancelHandle) -> Self {
        Self { inner, handle }
    }
}

impl SkillSource for CancelDuringBody {
    fn scan(&self, deadline: Deadline) -> Result<Vec<ScannedSkill>, SourceError> {
        self.inner.scan(deadline)
    }

    fn fetch_body(&self, skill_id: &str, deadline: Deadline) -> Result<String, SourceError> {
        self.handle.cancel();
        self.inner.fetch_body(skill_id, deadline)
    }

    fn fetch_reference(
        &self,
        skill_id: &str,
        reference_id: &str,
        deadline: Deadline,
    ) -> Result<String, SourceError> {
        self.inner.fetch_reference(skill_id, reference_id, deadline)
    }
}
