//! Core data model: skill records, tiers, and the disclosure bundle.

pub mod bundle;
pub mod record;

pub use bundle::{BundleEntry, DisclosureBundle, Tier};
pub use record::{
    BODY_UNIT_LIMIT, METADATA_UNIT_LIMIT, ReferenceRecord, SkillMetadata, SkillRecord, TaskQuery,
    estimate_units,
};
