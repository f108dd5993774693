//! Filesystem skill source.
//!
//! Reads the conventional on-disk layout: one directory per skill holding
//! a `SKILL.md` with YAML frontmatter, plus an optional `references/`
//! directory whose files are the skill's second-tier documents.
//!
//! ```text
//! skills/
//!   python-testing/
//!     SKILL.md
//!     references/
//!       fixtures.md
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use regex::Regex;
use serde::Deserialize;
use tracing::debug;
use walkdir::WalkDir;

use crate::core::record::{SkillMetadata, estimate_units};
use crate::error::RecordError;
use crate::registry::source::{
    Deadline, RawReference, RawSkill, ScannedSkill, SkillSource, SourceError,
};

const SKILL_FILE: &str = "SKILL.md";
const REFERENCES_DIR: &str = "references";

/// YAML frontmatter of a `SKILL.md`.
#[derive(Debug, Deserialize)]
struct Frontmatter {
    name: String,
    description: String,
    #[serde(default)]
    keywords: Vec<String>,
}

/// Skill source rooted at a directory of skill folders.
pub struct DirectorySource {
    root: PathBuf,
    frontmatter_re: Regex,
}

impl DirectorySource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            // frontmatter block followed by the markdown body
            frontmatter_re: Regex::new(r"(?s)\A---\s*\n(.*?)\n---\s*\n?(.*)\z")
                .expect("frontmatter regex is valid"),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Split a `SKILL.md` into parsed frontmatter and body text.
    fn parse_skill_file(&self, dir_name: &str, content: &str) -> Result<(Frontmatter, String), RecordError> {
        let captures = self.frontmatter_re.captures(content).ok_or_else(|| {
            RecordError::Malformed {
                id: dir_name.to_string(),
                message: "no YAML frontmatter found".to_string(),
            }
        })?;
        let frontmatter: Frontmatter =
            serde_yaml::from_str(captures.get(1).map_or("", |m| m.as_str())).map_err(|e| {
                RecordError::Malformed {
                    id: dir_name.to_string(),
                    message: format!("frontmatter: {e}"),
                }
            })?;
        let body = captures.get(2).map_or("", |m| m.as_str()).to_string();
        Ok((frontmatter, body))
    }

    fn scan_one(&self, dir: &Path) -> ScannedSkill {
        let dir_name = dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let skill_file = dir.join(SKILL_FILE);
        let content = fs::read_to_string(&skill_file).map_err(|e| RecordError::Malformed {
            id: dir_name.clone(),
            message: format!("{}: {e}", skill_file.display()),
        })?;
        let (frontmatter, body) = self.parse_skill_file(&dir_name, &content)?;

        Ok(RawSkill {
            metadata: SkillMetadata {
                id: frontmatter.name.clone(),
                name: frontmatter.name,
                description: frontmatter.description,
                keywords: frontmatter.keywords,
            },
            metadata_units: None,
            body_units: estimate_units(&body),
            references: scan_references(&dir.join(REFERENCES_DIR)),
        })
    }

    fn skill_dir(&self, skill_id: &str) -> Result<PathBuf, SourceError> {
        guard_path_component(skill_id)?;
        let dir = self.root.join(skill_id);
        if dir.is_dir() {
            Ok(dir)
        } else {
            Err(SourceError::SkillNotFound(skill_id.to_string()))
        }
    }
}

impl SkillSource for DirectorySource {
    fn scan(&self, deadline: Deadline) -> Result<Vec<ScannedSkill>, SourceError> {
        if deadline.expired() {
            return Err(SourceError::Timeout);
        }
        // Deterministic insertion order: walkdir sorted by file name.
        let dirs: Vec<PathBuf> = WalkDir::new(&self.root)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
            .into_iter()
            .filter_map(std::result::Result::ok)
            .filter(|e| e.file_type().is_dir())
            .map(walkdir::DirEntry::into_path)
            .collect();

        debug!(root = %self.root.display(), count = dirs.len(), "scanning skill directories");
        let scanned: Vec<ScannedSkill> = dirs.par_iter().map(|dir| self.scan_one(dir)).collect();

        if deadline.expired() {
            return Err(SourceError::Timeout);
        }
        Ok(scanned)
    }

    fn fetch_body(&self, skill_id: &str, deadline: Deadline) -> Result<String, SourceError> {
        if deadline.expired() {
            return Err(SourceError::Timeout);
        }
        let dir = self.skill_dir(skill_id)?;
        let content = fs::read_to_string(dir.join(SKILL_FILE))?;
        // Strip the frontmatter: the metadata tier already carries it.
        let body = self
            .frontmatter_re
            .captures(&content)
            .and_then(|c| c.get(2))
            .map_or(content.as_str(), |m| m.as_str());
        Ok(body.to_string())
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
        guard_path_component(reference_id)?;
        let dir = self.skill_dir(skill_id)?;
        let path = dir.join(REFERENCES_DIR).join(reference_id);
        if !path.is_file() {
            return Err(SourceError::ReferenceNotFound {
                skill_id: skill_id.to_string(),
                reference_id: reference_id.to_string(),
            });
        }
        Ok(fs::read_to_string(path)?)
    }
}

/// Reference descriptors for one skill, sorted by file name so declared
/// order never depends on directory iteration order.
fn scan_references(dir: &Path) -> Vec<RawReference> {
    let Ok(entries) = fs::read_dir(dir) else {
        return vec![];
    };
    let mut references: Vec<RawReference> = entries
        .filter_map(std::result::Result::ok)
        .filter(|e| e.path().is_file())
        .filter_map(|e| {
            let units = e.metadata().ok()?.len().div_ceil(4);
            Some(RawReference {
                id: e.file_name().to_string_lossy().into_owned(),
                units,
            })
        })
        .collect();
    references.sort_by(|a, b| a.id.cmp(&b.id));
    references
}

/// Ids come from frontmatter and host calls; never let one escape the
/// skills root when joined into a path.
fn guard_path_component(id: &str) -> Result<(), SourceError> {
    if id.is_empty() || id.contains(['/', '\\']) || id == "." || id == ".." {
        return Err(SourceError::SkillNotFound(id.to_string()));
    }
    Ok(())
}
