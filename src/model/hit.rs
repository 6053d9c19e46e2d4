//! Retrieval result records.
//!
//! Every stage of the pipeline exchanges this one record type — required
//! fields always present, enrichment fields optional — so each stage has a
//! checkable contract instead of ad hoc key presence.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use super::domain::DomainId;
use super::unit::{LawTier, LexicalUnit};

/// Provenance tag: how a hit entered the result set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    VectorSeed,
    RelationshipExpansion,
    ExactMatch,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::VectorSeed => "vector_seed",
            Stage::RelationshipExpansion => "relationship_expansion",
            Stage::ExactMatch => "exact_match",
        }
    }
}

/// One ranked piece of paragraph-level evidence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalHit {
    pub full_id: String,
    pub content: String,
    /// Similarity-derived score. Exact-match hits rank ahead of any score.
    pub score: f32,
    /// Union of stages that produced this hit.
    pub stages: SmallVec<[Stage; 3]>,
    /// Domains whose expansion surfaced this hit.
    pub source_domains: SmallVec<[DomainId; 2]>,
    /// Human-readable article citation; `None` means not available.
    pub article: Option<String>,
    /// Law tier derived from the identifier; `None` means not available.
    pub law_tier: Option<LawTier>,
}

impl RetrievalHit {
    pub fn new(unit: &LexicalUnit, score: f32, stage: Stage) -> Self {
        Self {
            full_id: unit.full_id.clone(),
            content: unit.content.clone(),
            score,
            stages: smallvec::smallvec![stage],
            source_domains: SmallVec::new(),
            article: None,
            law_tier: None,
        }
    }

    pub fn with_source_domain(mut self, domain: DomainId) -> Self {
        self.add_source_domain(domain);
        self
    }

    pub fn has_stage(&self, stage: Stage) -> bool {
        self.stages.contains(&stage)
    }

    pub fn is_exact(&self) -> bool {
        self.has_stage(Stage::ExactMatch)
    }

    pub fn add_stage(&mut self, stage: Stage) {
        if !self.stages.contains(&stage) {
            self.stages.push(stage);
        }
    }

    pub fn add_source_domain(&mut self, domain: DomainId) {
        if !self.source_domains.contains(&domain) {
            self.source_domains.push(domain);
        }
    }

    /// Merge a duplicate sighting of the same unit into this hit: the
    /// higher score wins, provenance is unioned.
    pub fn absorb(&mut self, other: &RetrievalHit) {
        debug_assert_eq!(self.full_id, other.full_id);
        if other.score > self.score {
            self.score = other.score;
        }
        for stage in &other.stages {
            self.add_stage(*stage);
        }
        for domain in &other.source_domains {
            self.add_source_domain(*domain);
        }
        if self.article.is_none() {
            self.article = other.article.clone();
        }
        if self.law_tier.is_none() {
            self.law_tier = other.law_tier;
        }
    }
}

/// Rank a hit list in place: exact matches first, then descending score.
/// Stable, so equal-scored hits keep their arrival order.
pub fn sort_ranked(hits: &mut [RetrievalHit]) {
    hits.sort_by(|a, b| {
        b.is_exact()
            .cmp(&a.is_exact())
            .then_with(|| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal))
    });
}
