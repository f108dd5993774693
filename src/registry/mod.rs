//! Skill registry: immutable snapshots with copy-on-write reload.
//!
//! A load produces a [`RegistrySnapshot`] that never changes afterwards.
//! Reload swaps a new snapshot in atomically; sessions holding the prior
//! `Arc` keep running against it and never observe a half-updated registry.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use parking_lot::RwLock;
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use crate::core::record::{
    BODY_UNIT_LIMIT, METADATA_UNIT_LIMIT, SkillMetadata, SkillRecord,
};
use crate::error::{DiscError, RecordError, Result};

pub mod dir;
pub mod source;

pub use dir::DirectorySource;
pub use source::{Deadline, InMemorySource, MemorySkill, RawSkill, SkillSource, SourceError};

/// Outcome of a registry load: how many records made the snapshot and the
/// per-record errors for those that did not.
#[derive(Debug, Default)]
pub struct LoadReport {
    pub loaded: usize,
    pub errors: Vec<RecordError>,
}

impl LoadReport {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Immutable, point-in-time view of the skill catalog.
pub struct RegistrySnapshot {
    skills: Vec<SkillRecord>,
    index: HashMap<String, usize>,
    fingerprint: String,
    source: Arc<dyn SkillSource>,
}

impl std::fmt::Debug for RegistrySnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistrySnapshot")
            .field("skills", &self.skills.len())
            .field("fingerprint", &self.fingerprint)
            .finish_non_exhaustive()
    }
}

impl RegistrySnapshot {
    /// All records in insertion order. Cheap: metadata and sizes only.
    pub fn skills(&self) -> &[SkillRecord] {
        &self.skills
    }

    /// Metadata for every record, in insertion order.
    pub fn list(&self) -> impl Iterator<Item = &SkillMetadata> {
        self.skills.iter().map(|record| &record.metadata)
    }

    pub fn get(&self, id: &str) -> Option<&SkillRecord> {
        self.index.get(id).map(|&i| &self.skills[i])
    }

    /// Insertion position of a record, the matcher's tie-break key.
    pub fn position(&self, id: &str) -> Option<usize> {
        self.index.get(id).copied()
    }

    pub fn len(&self) -> usize {
        self.skills.len()
    }

    pub fn is_empty(&self) -> bool {
        self.skills.is_empty()
    }

    /// Content fingerprint identifying this snapshot in logs and reports.
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    /// Reference descriptors for one skill, in declared order.
    pub fn references(&self, id: &str) -> Option<&[crate::core::record::ReferenceRecord]> {
        self.get(id).map(|record| record.references.as_slice())
    }

    /// Fetch a skill's body content through the source.
    pub fn body(&self, id: &str, deadline: Deadline) -> std::result::Result<String, SourceError> {
        if self.get(id).is_none() {
            return Err(SourceError::SkillNotFound(id.to_string()));
        }
        self.source.fetch_body(id, deadline)
    }

    /// Fetch one reference document's content through the source.
    pub fn reference(
        &self,
        skill_id: &str,
        reference_id: &str,
        deadline: Deadline,
    ) -> std::result::Result<String, SourceError> {
        let record = self
            .get(skill_id)
            .ok_or_else(|| SourceError::SkillNotFound(skill_id.to_string()))?;
        if record.reference(reference_id).is_none() {
            return Err(SourceError::ReferenceNotFound {
                skill_id: skill_id.to_string(),
                reference_id: reference_id.to_string(),
            });
        }
        self.source.fetch_reference(skill_id, reference_id, deadline)
    }
}

/// Shared registry handle. Read-only after load apart from [`reload`],
/// which replaces the snapshot wholesale.
///
/// [`reload`]: SkillRegistry::reload
pub struct SkillRegistry {
    current: RwLock<Arc<RegistrySnapshot>>,
}

impl SkillRegistry {
    /// Scan the source and build the initial snapshot. A malformed record
    /// is excluded and reported; siblings still load. Fails outright only
    /// when the scan itself cannot complete.
    pub fn load(source: Arc<dyn SkillSource>, deadline: Deadline) -> Result<(Self, LoadReport)> {
        let (snapshot, report) = build_snapshot(source, deadline)?;
        info!(
            loaded = report.loaded,
            rejected = report.errors.len(),
            fingerprint = snapshot.fingerprint(),
            "registry loaded"
        );
        Ok((
            Self {
                current: RwLock::new(Arc::new(snapshot)),
            },
            report,
        ))
    }

    /// Current snapshot. Sessions hold the returned `Arc` for their whole
    /// lifetime, so a concurrent reload never affects them.
    pub fn snapshot(&self) -> Arc<RegistrySnapshot> {
        Arc::clone(&self.current.read())
    }

    /// Copy-on-write reload: build a fresh snapshot from the source and
    /// swap it in atomically. On scan failure the old snapshot stays.
    pub fn reload(&self, source: Arc<dyn SkillSource>, deadline: Deadline) -> Result<LoadReport> {
        let (snapshot, report) = build_snapshot(source, deadline)?;
        info!(
            loaded = report.loaded,
            rejected = report.errors.len(),
            fingerprint = snapshot.fingerprint(),
            "registry reloaded"
        );
        *self.current.write() = Arc::new(snapshot);
        Ok(report)
    }
}

fn build_snapshot(
    source: Arc<dyn SkillSource>,
    deadline: Deadline,
) -> Result<(RegistrySnapshot, LoadReport)> {
    let scanned = source.scan(deadline).map_err(|e| match e {
        SourceError::Timeout => DiscError::LoadTimeout { stage: "scan" },
        other => DiscError::Source(other),
    })?;

    let mut skills: Vec<SkillRecord> = Vec::with_capacity(scanned.len());
    let mut index: HashMap<String, usize> = HashMap::with_capacity(scanned.len());
    let mut errors: Vec<RecordError> = Vec::new();

    for item in scanned {
        let raw = match item {
            Ok(raw) => raw,
            Err(e) => {
                warn!(error = %e, "rejected skill record");
                errors.push(e);
                continue;
            }
        };
        match validate(raw, &index) {
            Ok(record) => {
                debug!(id = record.id(), "loaded skill record");
                index.insert(record.id().to_string(), skills.len());
                skills.push(record);
            }
            Err(e) => {
                warn!(error = %e, "rejected skill record");
                errors.push(e);
            }
        }
    }

    let fingerprint = fingerprint(&skills);
    let report = LoadReport {
        loaded: skills.len(),
        errors,
    };
    Ok((
        RegistrySnapshot {
            skills,
            index,
            fingerprint,
            source,
        },
        report,
    ))
}

fn validate(raw: RawSkill, index: &HashMap<String, usize>) -> std::result::Result<SkillRecord, RecordError> {
    let id = raw.metadata.id.clone();
    if id.is_empty() {
        return Err(RecordError::InvalidId {
            id,
            reason: "empty".to_string(),
        });
    }
    if id.chars().any(char::is_whitespace) {
        return Err(RecordError::InvalidId {
            id,
            reason: "contains whitespace".to_string(),
        });
    }
    if index.contains_key(&id) {
        return Err(RecordError::DuplicateId(id));
    }
    if raw.metadata.description.trim().is_empty() {
        return Err(RecordError::MissingDescription { id });
    }

    let metadata_units = raw
        .metadata_units
        .unwrap_or_else(|| raw.metadata.estimated_units());
    if metadata_units > METADATA_UNIT_LIMIT {
        return Err(RecordError::OversizeMetadata {
            id,
            units: metadata_units,
            limit: METADATA_UNIT_LIMIT,
        });
    }
    if raw.body_units > BODY_UNIT_LIMIT {
        return Err(RecordError::OversizeBody {
            id,
            units: raw.body_units,
            limit: BODY_UNIT_LIMIT,
        });
    }

    let mut seen_refs: HashSet<&str> = HashSet::new();
    for reference in &raw.references {
        if !seen_refs.insert(reference.id.as_str()) {
            return Err(RecordError::Malformed {
                id: id.clone(),
                message: format!("duplicate reference id '{}'", reference.id),
            });
        }
    }

    let references = raw
        .references
        .iter()
        .map(|r| source::reference_record(&id, r))
        .collect();

    Ok(SkillRecord {
        metadata: raw.metadata,
        metadata_units,
        body_units: raw.body_units,
        references,
    })
}

/// Stable content hash over ids, descriptions, and tier sizes in order.
fn fingerprint(skills: &[SkillRecord]) -> String {
    let mut hasher = Sha256::new();
    for record in skills {
        hasher.update(record.id().as_bytes());
        hasher.update([0u8]);
        hasher.update(record.metadata.description.as_bytes());
        hasher.update(record.metadata_units.to_le_bytes());
        hasher.update(record.body_units.to_le_bytes());
        for reference in &record.references {
            hasher.update(reference.id.as_bytes());
            hasher.update(reference.units.to_le_bytes());
        }
    }
    hex::encode(&hasher.finalize()[..8])
}
