//! # Expansion Engine
//!
//! Turns a query embedding into a ranked, deduplicated list of
//! paragraph-level evidence, combining direct semantic similarity with
//! relationship-aware graph traversal:
//!
//! 1. **Seed stage** — top-K cosine matches over the candidate paragraphs
//!    (whole corpus or one domain's members), tagged `vector_seed`.
//! 2. **Relationship expansion (RNE)** — each seed's neighborhood (parent
//!    article, sibling paragraphs, cross-tier counterpart articles) is
//!    traversed; a neighbor is admitted only when its relationship
//!    embedding scores at least the configured threshold against the
//!    query, and inherits a decayed score so expansion never outranks an
//!    equally similar seed. Tagged `relationship_expansion`.
//! 3. **Iterative expansion (INE)** — repeated up to the depth bound, decay
//!    compounding per hop, which keeps long walks from drifting off topic.
//! 4. **Exact-reference override** — paragraphs matching an explicit
//!    citation in the query text are force-included at the top of the
//!    ranking, tagged `exact_match`. Citation lookup never loses to
//!    embedding drift.
//! 5. **Dedup and cap** — hits merge by `full_id` (max score, union of
//!    tags) and the list truncates to the requested limit.

pub mod citation;

use std::sync::Arc;

use hashbrown::{HashMap, HashSet};
use serde::{Deserialize, Serialize};
use tokio::task::JoinSet;
use tracing::{debug, warn};

use crate::config::ExpansionConfig;
use crate::model::{DomainId, Embedding, RetrievalHit, Stage, sort_ranked};
use crate::storage::{GraphStore, Neighbor};
use crate::Result;

/// Score assigned to exact-citation hits. Exact matches additionally rank
/// ahead of every similarity-scored hit regardless of this value.
pub const EXACT_SCORE: f32 = 1.0;

/// Counters describing one expansion run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExpansionStats {
    /// Vector seeds found.
    pub seeds: usize,
    /// Evidence units admitted through relationship expansion.
    pub expanded: usize,
    /// Hops actually executed.
    pub hops: usize,
    /// Paragraphs force-included by citation.
    pub exact_matches: usize,
    /// True when a traversal query failed and results degraded to
    /// seed-only.
    pub seed_only_fallback: bool,
}

/// Result of one expansion run.
#[derive(Debug, Clone)]
pub struct ExpansionOutcome {
    pub hits: Vec<RetrievalHit>,
    pub stats: ExpansionStats,
}

/// Relationship-aware neighborhood expansion over one store.
pub struct ExpansionEngine<S: GraphStore> {
    store: Arc<S>,
    config: ExpansionConfig,
}

impl<S: GraphStore> ExpansionEngine<S> {
    pub fn new(store: Arc<S>, config: ExpansionConfig) -> Self {
        Self { store, config }
    }

    /// Run the full seed → RNE → INE → exact-override pipeline.
    ///
    /// `domain` restricts seed search to one domain's members; traversal
    /// may still reach units outside it (cross-tier counterparts live in
    /// other documents by construction).
    pub async fn expand(
        &self,
        query_text: &str,
        query_embedding: &Embedding,
        domain: Option<DomainId>,
        limit: usize,
    ) -> Result<ExpansionOutcome> {
        let mut stats = ExpansionStats::default();
        let mut merged: HashMap<String, RetrievalHit> = HashMap::new();

        // ====================================================================
        // Seed stage
        // ====================================================================

        let seeds = self
            .store
            .vector_search(query_embedding, self.config.seed_count, domain)
            .await?;
        stats.seeds = seeds.len();
        debug!(seeds = seeds.len(), ?domain, "vector seed stage");

        // Only positively similar seeds expand: decaying a non-positive
        // score would not decrease it.
        let mut frontier: Vec<(String, f32)> = Vec::new();
        let mut visited: HashSet<String> = HashSet::new();
        for scored in seeds {
            let hit = RetrievalHit::new(&scored.unit, scored.similarity, Stage::VectorSeed);
            visited.insert(hit.full_id.clone());
            if scored.similarity > 0.0 {
                frontier.push((hit.full_id.clone(), scored.similarity));
            }
            merge_hit(&mut merged, hit);
        }

        // ====================================================================
        // RNE / INE
        // ====================================================================

        for _hop in 0..self.config.max_depth {
            if frontier.is_empty() {
                break;
            }
            stats.hops += 1;
            let mut next_frontier = Vec::new();

            for (origin_id, origin_score, fetched) in self.fetch_neighborhoods(&frontier).await {
                let neighbors = match fetched {
                    Ok(neighbors) => neighbors,
                    Err(e) => {
                        warn!(origin = %origin_id, error = %e, "neighborhood query failed, degrading to seed-only");
                        stats.seed_only_fallback = true;
                        continue;
                    }
                };

                for neighbor in neighbors {
                    let Neighbor { unit, relationship_embedding, .. } = neighbor;
                    if visited.contains(&unit.full_id) {
                        continue;
                    }
                    // No relationship embedding, no traversal: the edge
                    // cannot be scored against the query.
                    let Some(edge_embedding) = relationship_embedding else {
                        continue;
                    };
                    let gate = query_embedding.cosine(&edge_embedding)?;
                    if gate < self.config.relationship_threshold {
                        continue;
                    }

                    visited.insert(unit.full_id.clone());
                    let score = origin_score * self.config.score_decay;
                    next_frontier.push((unit.full_id.clone(), score));

                    // Structural units carry the walk; only paragraph-level
                    // units become evidence.
                    if unit.is_evidence() {
                        stats.expanded += 1;
                        merge_hit(
                            &mut merged,
                            RetrievalHit::new(&unit, score, Stage::RelationshipExpansion),
                        );
                    }
                }
            }

            frontier = next_frontier;
        }

        // ====================================================================
        // Exact-reference override
        // ====================================================================

        for cite in citation::scan(query_text) {
            match self.store.paragraphs_by_citation(&cite).await {
                Ok(matches) => {
                    // A citation absent from the corpus is silently ignored.
                    for unit in matches {
                        stats.exact_matches += 1;
                        merge_hit(
                            &mut merged,
                            RetrievalHit::new(&unit, EXACT_SCORE, Stage::ExactMatch),
                        );
                    }
                }
                Err(e) => {
                    warn!(citation = %cite, error = %e, "citation lookup failed");
                    stats.seed_only_fallback = true;
                }
            }
        }

        // ====================================================================
        // Dedup and cap
        // ====================================================================

        let mut hits: Vec<RetrievalHit> = merged.into_values().collect();
        sort_ranked(&mut hits);
        hits.truncate(limit);

        debug!(
            hits = hits.len(),
            expanded = stats.expanded,
            exact = stats.exact_matches,
            "expansion complete"
        );
        Ok(ExpansionOutcome { hits, stats })
    }

    /// Fetch neighborhoods for a frontier, bounded by the configured
    /// concurrency cap. Failures are returned per origin so one bad
    /// traversal degrades only its own branch.
    async fn fetch_neighborhoods(
        &self,
        frontier: &[(String, f32)],
    ) -> Vec<(String, f32, Result<Vec<Neighbor>>)> {
        let mut results = Vec::with_capacity(frontier.len());
        for batch in frontier.chunks(self.config.max_concurrent_expansions) {
            let mut tasks: JoinSet<(String, f32, Result<Vec<Neighbor>>)> = JoinSet::new();
            for (full_id, score) in batch {
                let store = Arc::clone(&self.store);
                let full_id = full_id.clone();
                let score = *score;
                tasks.spawn(async move {
                    let fetched = store.neighborhood(&full_id).await;
                    (full_id, score, fetched)
                });
            }
            while let Some(joined) = tasks.join_next().await {
                match joined {
                    Ok(entry) => results.push(entry),
                    Err(e) => warn!(error = %e, "neighborhood task aborted"),
                }
            }
        }
        results
    }
}

/// Merge a hit into the dedup map: max score, union of provenance.
fn merge_hit(merged: &mut HashMap<String, RetrievalHit>, hit: RetrievalHit) {
    match merged.get_mut(&hit.full_id) {
        Some(existing) => existing.absorb(&hit),
        None => {
            merged.insert(hit.full_id.clone(), hit);
        }
    }
}
