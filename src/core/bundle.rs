//! The ordered content bundle a session produces for its host.

use serde::{Deserialize, Serialize};

/// Disclosure tier of a bundle entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Metadata,
    Body,
    Reference,
}

impl Tier {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Metadata => "metadata",
            Self::Body => "body",
            Self::Reference => "reference",
        }
    }
}

/// One tier-tagged content chunk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BundleEntry {
    pub tier: Tier,
    pub skill_id: String,
    /// Set only for reference entries
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_id: Option<String>,
    pub content: String,
    /// Units this entry was charged against the session budget
    pub units: u64,
}

/// Ordered sequence of admitted content. Immutable once produced; the
/// session's terminal artifact.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisclosureBundle {
    entries: Vec<BundleEntry>,
    total_units: u64,
}

impl DisclosureBundle {
    pub fn entries(&self) -> &[BundleEntry] {
        &self.entries
    }

    pub fn total_units(&self) -> u64 {
        self.total_units
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Skill ids in bundle order, deduplicated, first occurrence wins.
    pub fn skill_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = Vec::new();
        for entry in &self.entries {
            if !ids.contains(&entry.skill_id.as_str()) {
                ids.push(&entry.skill_id);
            }
        }
        ids
    }

    pub(crate) fn push(&mut self, entry: BundleEntry) {
        self.total_units += entry.units;
        self.entries.push(entry);
    }

    /// Render the bundle as plain text for host injection: one section
    /// per entry, tagged with tier and skill id.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for entry in &self.entries {
            if !out.is_empty() {
                out.push_str("\n\n");
            }
            match &entry.reference_id {
                Some(reference_id) => {
                    out.push_str(&format!(
                        "[{} {}/{}]\n",
                        entry.tier.label(),
                        entry.skill_id,
                        reference_id
                    ));
                }
                None => {
                    out.push_str(&format!("[{} {}]\n", entry.tier.label(), entry.skill_id));
                }
            }
            out.push_str(entry.content.trim_end());
        }
        out
    }
}
