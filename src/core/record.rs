//! Skill records as held by a registry snapshot.
//!
//! A record carries the always-resident metadata tier plus the *sizes* of
//! the body and reference tiers. Content for the deferred tiers is fetched
//! through the source only when a session decides it fits the budget.

use itertools::Itertools;
use serde::{Deserialize, Serialize};

/// Ceiling on metadata size. Metadata is the always-resident tier, so a
/// record whose metadata exceeds this is rejected at load time.
pub const METADATA_UNIT_LIMIT: u64 = 100;

/// Ceiling on body size.
pub const BODY_UNIT_LIMIT: u64 = 5000;

/// Rough size estimate in budget units (~4 chars per unit), used when a
/// source does not declare sizes itself.
pub fn estimate_units(text: &str) -> u64 {
    (text.len() as u64).div_ceil(4)
}

/// Always-resident skill metadata: what the skill is and when to use it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillMetadata {
    /// Unique identifier within a registry snapshot
    pub id: String,
    /// Human-readable name
    pub name: String,
    /// Description of what the skill covers and when it applies
    pub description: String,
    /// Declared trigger keywords
    #[serde(default)]
    pub keywords: Vec<String>,
}

impl SkillMetadata {
    /// Render the metadata tier as it appears in a bundle.
    pub fn render(&self) -> String {
        if self.keywords.is_empty() {
            format!("{}: {}", self.name, self.description)
        } else {
            format!(
                "{}: {} [{}]",
                self.name,
                self.description,
                self.keywords.iter().join(", ")
            )
        }
    }

    /// Estimated metadata size when the source declares none.
    pub fn estimated_units(&self) -> u64 {
        let keyword_len: usize = self.keywords.iter().map(String::len).sum();
        estimate_units(&self.id)
            + estimate_units(&self.name)
            + estimate_units(&self.description)
            + (keyword_len as u64).div_ceil(4)
    }
}

/// Descriptor for a second-tier reference document owned by a skill.
///
/// Content is not held here; it is fetched lazily through the source and
/// cached per session by the resolver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceRecord {
    /// Reference id, unique within the owning skill
    pub id: String,
    /// Owning skill id
    pub skill_id: String,
    /// Size charged against the budget when the content is first fetched
    pub units: u64,
}

/// One skill in a registry snapshot. Created at load time, immutable
/// thereafter; a reload produces an entirely new snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillRecord {
    pub metadata: SkillMetadata,
    /// Metadata tier size
    pub metadata_units: u64,
    /// Body tier size, known up front so the allocator can decide fit
    /// before any content is fetched
    pub body_units: u64,
    /// Ordered reference descriptors
    pub references: Vec<ReferenceRecord>,
}

impl SkillRecord {
    pub fn id(&self) -> &str {
        &self.metadata.id
    }

    /// Look up a reference descriptor by id.
    pub fn reference(&self, reference_id: &str) -> Option<&ReferenceRecord> {
        self.references.iter().find(|r| r.id == reference_id)
    }
}

/// Free-text task description. Ephemeral: one per session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskQuery {
    text: String,
}

impl TaskQuery {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}
