//! Trigger matching: score registry entries against an incoming task.
//!
//! Scoring is pluggable behind [`RelevanceScorer`]; the default
//! [`KeywordScorer`] uses weighted token overlap. Whatever the scorer,
//! ranking is deterministic: descending relevance with ties broken by
//! registry insertion order.

use std::collections::HashSet;

use itertools::Itertools;
use serde::Serialize;
use tracing::debug;

use crate::config::MatcherConfig;
use crate::core::record::{SkillRecord, TaskQuery};
use crate::registry::RegistrySnapshot;

pub mod tokenize;

use tokenize::{phrase, stem, stems};

/// Relevance of one skill to one query. Derived per query, never persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchScore {
    pub skill_id: String,
    /// Normalized relevance in `[0, 1]`
    pub relevance: f32,
    /// Stems and keywords that contributed, in stable sorted order
    pub matched_terms: Vec<String>,
}

/// Pluggable scoring function. Implementations must be deterministic for
/// the ranking invariants to hold; keyword overlap, TF-IDF, or embedding
/// similarity all qualify.
pub trait RelevanceScorer: Send + Sync {
    fn score(&self, query: &TaskQuery, record: &SkillRecord) -> MatchScore;
}

/// Weights for the scoring factors, highest for an exact phrase match.
#[derive(Debug, Clone, Copy)]
pub struct ScoringWeights {
    pub phrase: f32,
    pub keyword: f32,
    pub token: f32,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            phrase: 0.5,
            keyword: 0.3,
            token: 0.2,
        }
    }
}

impl ScoringWeights {
    /// Normalize weights to sum to 1.0 so relevance stays in `[0, 1]`.
    pub fn normalized(&self) -> Self {
        let sum = self.phrase + self.keyword + self.token;
        if sum == 0.0 {
            return *self;
        }
        Self {
            phrase: self.phrase / sum,
            keyword: self.keyword / sum,
            token: self.token / sum,
        }
    }
}

/// Default scorer: token-level overlap between the query and the skill's
/// description plus its declared trigger keywords.
#[derive(Debug, Clone)]
pub struct KeywordScorer {
    weights: ScoringWeights,
}

impl Default for KeywordScorer {
    fn default() -> Self {
        Self::new(ScoringWeights::default())
    }
}

impl KeywordScorer {
    pub fn new(weights: ScoringWeights) -> Self {
        Self {
            weights: weights.normalized(),
        }
    }
}

impl RelevanceScorer for KeywordScorer {
    fn score(&self, query: &TaskQuery, record: &SkillRecord) -> MatchScore {
        let query_phrase = phrase(query.text());
        let query_stems: HashSet<String> = stems(query.text()).into_iter().collect();
        if query_stems.is_empty() {
            return MatchScore {
                skill_id: record.id().to_string(),
                relevance: 0.0,
                matched_terms: vec![],
            };
        }

        let description = &record.metadata.description;
        let description_phrase = phrase(description);
        let description_stems: HashSet<String> = stems(description).into_iter().collect();

        // Exact phrase: the whole query appears in the description or the
        // whole description appears in the query.
        let phrase_factor = if !description_phrase.is_empty()
            && (query_phrase.contains(&description_phrase)
                || description_phrase.contains(&query_phrase))
        {
            1.0
        } else {
            0.0
        };

        // Declared keywords: a keyword matches when all of its stems occur
        // in the query.
        let keywords = &record.metadata.keywords;
        let mut matched_keywords: Vec<String> = Vec::new();
        for keyword in keywords {
            let keyword_stems = stems(keyword);
            if !keyword_stems.is_empty()
                && keyword_stems.iter().all(|s| query_stems.contains(s))
            {
                matched_keywords.push(keyword.to_lowercase());
            }
        }
        let keyword_factor = if keywords.is_empty() {
            0.0
        } else {
            matched_keywords.len() as f32 / keywords.len() as f32
        };

        // Loose stem overlap, normalized by query length.
        let matched_stems: Vec<&String> = query_stems
            .iter()
            .filter(|s| description_stems.contains(*s))
            .collect();
        let token_factor = matched_stems.len() as f32 / query_stems.len() as f32;

        let matched_terms: Vec<String> = matched_stems
            .into_iter()
            .cloned()
            .chain(matched_keywords)
            .sorted()
            .dedup()
            .collect();

        MatchScore {
            skill_id: record.id().to_string(),
            relevance: self.weights.phrase * phrase_factor
                + self.weights.keyword * keyword_factor
                + self.weights.token * token_factor,
            matched_terms,
        }
    }
}

/// Ranks registry entries for a query and applies the relevance cutoff.
pub struct TriggerMatcher {
    scorer: Box<dyn RelevanceScorer>,
    min_relevance: f32,
}

impl Default for TriggerMatcher {
    fn default() -> Self {
        Self::new(Box::new(KeywordScorer::default()), 0.0)
    }
}

impl TriggerMatcher {
    pub fn new(scorer: Box<dyn RelevanceScorer>, min_relevance: f32) -> Self {
        Self {
            scorer,
            min_relevance,
        }
    }

    pub fn from_config(config: &MatcherConfig) -> Self {
        Self::new(
            Box::new(KeywordScorer::new(ScoringWeights {
                phrase: config.phrase_weight,
                keyword: config.keyword_weight,
                token: config.token_weight,
            })),
            config.min_relevance,
        )
    }

    /// Score and rank candidate records. Descending relevance; ties keep
    /// the candidates' input (registry insertion) order. Records scoring
    /// below the minimum relevance are excluded entirely, not appended at
    /// the tail. No qualifying record yields an empty list, not an error.
    pub fn rank_records(&self, query: &TaskQuery, candidates: &[SkillRecord]) -> Vec<MatchScore> {
        let mut scored: Vec<(usize, MatchScore)> = candidates
            .iter()
            .enumerate()
            .map(|(position, record)| (position, self.scorer.score(query, record)))
            .filter(|(_, score)| score.relevance >= self.min_relevance)
            .collect();

        scored.sort_by(|a, b| {
            b.1.relevance
                .total_cmp(&a.1.relevance)
                .then_with(|| a.0.cmp(&b.0))
        });

        debug!(
            candidates = candidates.len(),
            qualified = scored.len(),
            "ranked query"
        );
        scored.into_iter().map(|(_, score)| score).collect()
    }

    /// Rank every entry of a registry snapshot.
    pub fn rank(&self, query: &TaskQuery, snapshot: &RegistrySnapshot) -> Vec<MatchScore> {
        self.rank_records(query, snapshot.skills())
    }
}
