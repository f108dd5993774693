//! Lazy reference resolution with per-session caching.
//!
//! A reference is charged against the session budget on first fetch only;
//! repeated lookups for the same `(skill_id, reference_id)` within one
//! session hit the cache at zero additional charge. The cache is a
//! non-owning per-session lookup, dropped with the session.

use std::num::NonZeroUsize;
use std::sync::Arc;

use lru::LruCache;
use tracing::debug;

use crate::budget::BudgetLedger;
use crate::error::{DiscError, Result};
use crate::registry::source::Deadline;
use crate::registry::{RegistrySnapshot, SourceError};

/// Default cache capacity; large enough that a session never re-charges
/// a reference in practice.
pub const DEFAULT_CACHE_ENTRIES: usize = 256;

/// A resolved reference, plus whether it came from the cache.
#[derive(Debug, Clone)]
pub struct ResolvedReference {
    pub content: Arc<str>,
    /// Units charged for this resolution: the reference size on first
    /// fetch, zero on a cache hit
    pub charged_units: u64,
    pub cache_hit: bool,
}

/// Per-session reference resolver.
pub struct ReferenceResolver {
    cache: LruCache<(String, String), Arc<str>>,
}

impl Default for ReferenceResolver {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_ENTRIES)
    }
}

impl ReferenceResolver {
    pub fn new(cache_entries: usize) -> Self {
        let capacity =
            NonZeroUsize::new(cache_entries.max(1)).expect("cache capacity is non-zero");
        Self {
            cache: LruCache::new(capacity),
        }
    }

    /// Resolve one reference within the session budget.
    ///
    /// Errors: [`DiscError::BudgetExceeded`] when the reference does not
    /// fit the remaining budget (the caller may continue with other
    /// work), [`DiscError::LoadTimeout`] when the fetch missed its
    /// deadline (nothing was charged), and [`DiscError::ReferenceNotFound`]
    /// for an id the snapshot does not know.
    pub fn resolve(
        &mut self,
        snapshot: &RegistrySnapshot,
        skill_id: &str,
        reference_id: &str,
        ledger: &mut BudgetLedger,
        deadline: Deadline,
    ) -> Result<ResolvedReference> {
        let key = (skill_id.to_string(), reference_id.to_string());
        if let Some(content) = self.cache.get(&key) {
            debug!(skill_id, reference_id, "reference cache hit");
            return Ok(ResolvedReference {
                content: Arc::clone(content),
                charged_units: 0,
                cache_hit: true,
            });
        }

        let record = snapshot
            .get(skill_id)
            .ok_or_else(|| DiscError::SkillNotFound(skill_id.to_string()))?;
        let reference =
            record
                .reference(reference_id)
                .ok_or_else(|| DiscError::ReferenceNotFound {
                    skill_id: skill_id.to_string(),
                    reference_id: reference_id.to_string(),
                })?;

        if !ledger.reserve(reference.units) {
            return Err(DiscError::BudgetExceeded {
                requested: reference.units,
                remaining: ledger.remaining(),
            });
        }

        let content = match snapshot.reference(skill_id, reference_id, deadline) {
            Ok(content) => content,
            Err(e) => {
                ledger.release_reserved(reference.units);
                return Err(match e {
                    SourceError::Timeout => DiscError::LoadTimeout { stage: "reference" },
                    SourceError::ReferenceNotFound {
                        skill_id,
                        reference_id,
                    } => DiscError::ReferenceNotFound {
                        skill_id,
                        reference_id,
                    },
                    other => DiscError::Source(other),
                });
            }
        };

        ledger.commit_reserved(reference.units);
        let content: Arc<str> = Arc::from(content);
        self.cache.put(key, Arc::clone(&content));
        debug!(
            skill_id,
            reference_id,
            units = reference.units,
            "reference resolved"
        );
        Ok(ResolvedReference {
            content,
            charged_units: reference.units,
            cache_hit: false,
        })
    }
}
