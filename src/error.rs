use std::io;

use thiserror::Error;

use crate::registry::source::SourceError;

/// Crate-wide error type.
#[derive(Error, Debug)]
pub enum DiscError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Skill not found: {0}")]
    SkillNotFound(String),

    #[error("Reference not found: {skill_id}/{reference_id}")]
    ReferenceNotFound {
        skill_id: String,
        reference_id: String,
    },

    /// A scan or fetch exceeded its deadline. Session-level and soft:
    /// whatever the session committed before the expiry is still returned.
    #[error("Load timed out during {stage}")]
    LoadTimeout { stage: &'static str },

    /// Informational: a candidate was dropped because it did not fit the
    /// remaining budget. The bundle built from what did fit stays valid.
    #[error("Budget exceeded: {requested} units requested, {remaining} remaining")]
    BudgetExceeded { requested: u64, remaining: u64 },

    #[error("Session cancelled")]
    Cancelled,

    #[error("Source error: {0}")]
    Source(SourceError),
}

/// Per-record load failure. Isolated to the offending record: siblings
/// still load, and the registry aggregates these into a `LoadReport`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RecordError {
    #[error("duplicate skill id '{0}'")]
    DuplicateId(String),

    #[error("invalid skill id '{id}': {reason}")]
    InvalidId { id: String, reason: String },

    #[error("skill '{id}': missing description")]
    MissingDescription { id: String },

    #[error("skill '{id}': metadata is {units} units, limit {limit}")]
    OversizeMetadata { id: String, units: u64, limit: u64 },

    #[error("skill '{id}': body is {units} units, limit {limit}")]
    OversizeBody { id: String, units: u64, limit: u64 },

    #[error("skill '{id}': {message}")]
    Malformed { id: String, message: String },
}

impl RecordError {
    /// Id of the record the error belongs to, where one could be determined.
    pub fn skill_id(&self) -> &str {
        match self {
            Self::DuplicateId(id)
            | Self::InvalidId { id, .. }
            | Self::MissingDescription { id }
            | Self::OversizeMetadata { id, .. }
            | Self::OversizeBody { id, .. }
            | Self::Malformed { id, .. } => id,
        }
    }
}

pub type Result<T> = std::result::Result<T, DiscError>;
