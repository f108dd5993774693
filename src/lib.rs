//! skilldisc - Progressive skill-disclosure engine
//!
//! Given a catalog of skills split into metadata/body/reference tiers,
//! the engine ranks skills against an incoming task description, admits
//! as much content as fits a fixed context budget, and resolves nested
//! reference material on demand. The host injects the resulting bundle
//! into its own model-facing context; this crate never talks to a model.

pub mod budget;
pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod matcher;
pub mod registry;
pub mod resolver;
pub mod session;

pub use error::{DiscError, Result};

/// Package version from Cargo.toml.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
