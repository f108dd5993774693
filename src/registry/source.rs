//! The seam between the engine and wherever skills actually live.
//!
//! A source yields skill metadata plus tier sizes on scan, and serves body
//! and reference content on demand. Every operation carries a deadline;
//! sources must not block past it.

use std::sync::Arc;
use std::time::{Duration, Instant};

use thiserror::Error;

use crate::core::record::{ReferenceRecord, SkillMetadata, estimate_units};
use crate::error::RecordError;

/// Cooperative deadline handed to source operations.
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    expires_at: Option<Instant>,
}

impl Deadline {
    /// Deadline expiring after `timeout` from now.
    pub fn after(timeout: Duration) -> Self {
        Self {
            expires_at: Instant::now().checked_add(timeout),
        }
    }

    /// A deadline that never expires.
    pub fn none() -> Self {
        Self { expires_at: None }
    }

    pub fn expired(&self) -> bool {
        self.expires_at.is_some_and(|at| Instant::now() >= at)
    }

    /// Time left, `None` when unbounded.
    pub fn remaining(&self) -> Option<Duration> {
        self.expires_at
            .map(|at| at.saturating_duration_since(Instant::now()))
    }
}

/// Failure of a single source operation.
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("operation exceeded its deadline")]
    Timeout,

    #[error("skill '{0}' not found in source")]
    SkillNotFound(String),

    #[error("reference '{skill_id}/{reference_id}' not found in source")]
    ReferenceNotFound {
        skill_id: String,
        reference_id: String,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// A skill as yielded by a scan, before registry validation. Sizes may be
/// declared by the source; when absent the registry estimates them.
#[derive(Debug, Clone)]
pub struct RawSkill {
    pub metadata: SkillMetadata,
    pub metadata_units: Option<u64>,
    pub body_units: u64,
    pub references: Vec<RawReference>,
}

/// Reference descriptor as yielded by a scan.
#[derive(Debug, Clone)]
pub struct RawReference {
    pub id: String,
    pub units: u64,
}

/// One scan item: either a parsable skill or the per-record error that
/// keeps it out of the snapshot without failing its siblings.
pub type ScannedSkill = std::result::Result<RawSkill, RecordError>;

/// Yields skill records to the registry. Implementations must be safe to
/// share across concurrently running sessions.
pub trait SkillSource: Send + Sync {
    /// Enumerate all skills: metadata and tier sizes only, no content.
    fn scan(&self, deadline: Deadline) -> Result<Vec<ScannedSkill>, SourceError>;

    /// Fetch the body content of one skill.
    fn fetch_body(&self, skill_id: &str, deadline: Deadline) -> Result<String, SourceError>;

    /// Fetch the content of one reference document.
    fn fetch_reference(
        &self,
        skill_id: &str,
        reference_id: &str,
        deadline: Deadline,
    ) -> Result<String, SourceError>;
}

/// In-memory source for hosts and tests. Sizes default to the `len/4`
/// estimate but can be declared explicitly per tier.
#[derive(Debug, Clone, Default)]
pub struct InMemorySource {
    skills: Vec<MemorySkill>,
}

/// One in-memory skill, built with `with_` combinators.
#[derive(Debug, Clone)]
pub struct MemorySkill {
    metadata: SkillMetadata,
    metadata_units: Option<u64>,
    body: String,
    body_units: Option<u64>,
    references: Vec<MemoryReference>,
}

#[derive(Debug, Clone)]
struct MemoryReference {
    id: String,
    content: String,
    units: Option<u64>,
}

impl MemorySkill {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            metadata: SkillMetadata {
                id: id.into(),
                name: name.into(),
                description: description.into(),
                keywords: vec![],
            },
            metadata_units: None,
            body: String::new(),
            body_units: None,
            references: vec![],
        }
    }

    pub fn with_keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.metadata.keywords = keywords.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    /// Declare the metadata tier size instead of estimating it.
    pub fn with_metadata_units(mut self, units: u64) -> Self {
        self.metadata_units = Some(units);
        self
    }

    /// Declare the body tier size instead of estimating it.
    pub fn with_body_units(mut self, units: u64) -> Self {
        self.body_units = Some(units);
        self
    }

    pub fn with_reference(mut self, id: impl Into<String>, content: impl Into<String>) -> Self {
        self.references.push(MemoryReference {
            id: id.into(),
            content: content.into(),
            units: None,
        });
        self
    }

    pub fn with_sized_reference(
        mut self,
        id: impl Into<String>,
        content: impl Into<String>,
        units: u64,
    ) -> Self {
        self.references.push(MemoryReference {
            id: id.into(),
            content: content.into(),
            units: Some(units),
        });
        self
    }
}

impl InMemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_skill(mut self, skill: MemorySkill) -> Self {
        self.skills.push(skill);
        self
    }

    /// Wrap in the `Arc<dyn SkillSource>` shape the registry consumes.
    pub fn into_shared(self) -> Arc<dyn SkillSource> {
        Arc::new(self)
    }

    fn find(&self, skill_id: &str) -> Option<&MemorySkill> {
        self.skills.iter().find(|s| s.metadata.id == skill_id)
    }
}

impl SkillSource for InMemorySource {
    fn scan(&self, deadline: Deadline) -> Result<Vec<ScannedSkill>, SourceError> {
        if deadline.expired() {
            return Err(SourceError::Timeout);
        }
        Ok(self
            .skills
            .iter()
            .map(|skill| {
                Ok(RawSkill {
                    metadata: skill.metadata.clone(),
                    metadata_units: skill.metadata_units,
                    body_units: skill
                        .body_units
                        .unwrap_or_else(|| estimate_units(&skill.body)),
                    references: skill
                        .references
                        .iter()
                        .map(|r| RawReference {
                            id: r.id.clone(),
                            units: r.units.unwrap_or_else(|| estimate_units(&r.content)),
                        })
                        .collect(),
                })
            })
            .collect())
    }

    fn fetch_body(&self, skill_id: &str, deadline: Deadline) -> Result<String, SourceError> {
        if deadline.expired() {
            return Err(SourceError::Timeout);
        }
        self.find(skill_id)
            .map(|s| s.body.clone())
            .ok_or_else(|| SourceError::SkillNotFound(skill_id.to_string()))
    }

    fn fetch_reference(
        &self,
        skill_id: &str,
        reference_id: &str,
        deadline: Deadline,
    ) -> Result<String, SourceError> {
        if deadline.expired() {
            return Err(SourceError::Timeout);
        }
        let skill = self
            .find(skill_id)
            .ok_or_else(|| SourceError::SkillNotFound(skill_id.to_string()))?;
        skill
            .references
            .iter()
            .find(|r| r.id == reference_id)
            .map(|r| r.content.clone())
            .ok_or_else(|| SourceError::ReferenceNotFound {
                skill_id: skill_id.to_string(),
                reference_id: reference_id.to_string(),
            })
    }
}

/// Build a [`ReferenceRecord`] from a raw scan descriptor.
pub(crate) fn reference_record(skill_id: &str, raw: &RawReference) -> ReferenceRecord {
    ReferenceRecord {
        id: raw.id.clone(),
        skill_id: skill_id.to_string(),
        units: raw.units,
    }
}
