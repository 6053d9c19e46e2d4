//! # Routing Layer
//!
//! Decides which domain(s) should answer a query. Stateless: every
//! invocation is a pure function of the query embedding and the domain
//! snapshot it is handed, so concurrent requests share nothing.
//!
//! Scoring is two-phase. Vector similarity against each domain centroid is
//! always computed; the top few domains are then optionally refined by an
//! LLM self-assessment, issued concurrently and individually
//! timeout-guarded. A refinement that fails or times out silently leaves
//! that domain on vector-only scoring — the degraded path is a branch, not
//! an exception.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::task::JoinSet;
use tokio::time::{Duration, timeout};
use tracing::{debug, warn};

use crate::config::RoutingConfig;
use crate::model::{DomainId, DomainSnapshot, Embedding};
use crate::provider::LlmProvider;
use crate::{Error, Result};

/// Per-domain relevance scoring for one query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomainScore {
    pub domain_id: DomainId,
    pub domain_name: String,
    /// Cosine similarity of the query to the domain centroid.
    pub vector_similarity: f32,
    /// LLM confidence in [0, 1], when refinement ran and succeeded.
    pub llm_confidence: Option<f32>,
    pub can_answer: Option<bool>,
    pub reasoning: Option<String>,
    /// Weighted combination; equals `vector_similarity` when no
    /// refinement is available.
    pub combined_score: f32,
}

/// Which domains to consult, and how the decision degraded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutingDecision {
    /// Selected domains, best first. Never empty for a non-empty snapshot.
    pub selected: Vec<DomainScore>,
    /// Every domain considered, sorted by combined score.
    pub scored: Vec<DomainScore>,
    /// True when nothing cleared the admission floor and the single best
    /// domain was selected as a fallback.
    pub floor_fallback: bool,
    /// Refinement calls that failed or timed out.
    pub refinement_failures: usize,
}

/// Scores domains and selects the subset to query.
pub struct Router {
    config: RoutingConfig,
}

impl Router {
    pub fn new(config: RoutingConfig) -> Self {
        Self { config }
    }

    /// Route one query against a domain snapshot.
    ///
    /// `collaborate` raises the selection width from `max_domains` to
    /// `collaborative_max_domains`.
    pub async fn route(
        &self,
        query_text: &str,
        query_embedding: &Embedding,
        snapshot: &DomainSnapshot,
        llm: Option<&Arc<dyn LlmProvider>>,
        collaborate: bool,
    ) -> Result<RoutingDecision> {
        if snapshot.is_empty() {
            return Err(Error::NotFound("domain snapshot has no domains".into()));
        }

        // Phase 1: vector similarity against every centroid.
        let mut scores: Vec<DomainScore> = Vec::with_capacity(snapshot.domains.len());
        for domain in &snapshot.domains {
            let similarity = query_embedding.cosine(&domain.centroid)?;
            scores.push(DomainScore {
                domain_id: domain.id,
                domain_name: domain.name.clone(),
                vector_similarity: similarity,
                llm_confidence: None,
                can_answer: None,
                reasoning: None,
                combined_score: similarity,
            });
        }
        scores.sort_by(|a, b| {
            b.vector_similarity
                .partial_cmp(&a.vector_similarity)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        // Phase 2: concurrent LLM refinement of the leaders.
        let mut refinement_failures = 0;
        if let Some(llm) = llm {
            if self.config.llm_weight > 0.0 {
                refinement_failures = self.refine(query_text, snapshot, &mut scores, llm).await;
            }
        }

        // Phase 3: combine and order.
        for score in &mut scores {
            score.combined_score = match score.llm_confidence {
                Some(confidence) => {
                    self.config.vector_weight * score.vector_similarity
                        + self.config.llm_weight * confidence
                }
                // Vector-only fallback keeps the raw similarity scale.
                None => score.vector_similarity,
            };
        }
        scores.sort_by(|a, b| {
            b.combined_score
                .partial_cmp(&a.combined_score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        // Phase 4: admission floor with never-empty fallback.
        let width = if collaborate {
            self.config.collaborative_max_domains
        } else {
            self.config.max_domains
        };
        let mut selected: Vec<DomainScore> = scores
            .iter()
            .filter(|s| s.combined_score >= self.config.admission_floor)
            .take(width)
            .cloned()
            .collect();
        let floor_fallback = selected.is_empty();
        if floor_fallback {
            // A non-empty query never routes to zero domains.
            selected.push(scores[0].clone());
            debug!(
                best = %scores[0].domain_id,
                score = scores[0].combined_score,
                floor = self.config.admission_floor,
                "no domain cleared the admission floor, selecting best anyway"
            );
        }

        debug!(
            selected = selected.len(),
            considered = scores.len(),
            refinement_failures,
            "routing decision"
        );
        Ok(RoutingDecision { selected, scored: scores, floor_fallback, refinement_failures })
    }

    /// Refine the top domains with concurrent, timeout-guarded `assess`
    /// calls. Returns the number of failed refinements; failures leave the
    /// affected domain on vector-only scoring.
    async fn refine(
        &self,
        query_text: &str,
        snapshot: &DomainSnapshot,
        scores: &mut [DomainScore],
        llm: &Arc<dyn LlmProvider>,
    ) -> usize {
        let budget = Duration::from_millis(self.config.assess_timeout_ms);
        let mut tasks: JoinSet<(DomainId, Option<crate::provider::Assessment>)> = JoinSet::new();

        for score in scores.iter().take(self.config.refine_top_n) {
            let Some(domain) = snapshot.domain(score.domain_id) else {
                continue;
            };
            let llm = Arc::clone(llm);
            let description = domain.description.clone();
            let query = query_text.to_string();
            let domain_id = domain.id;
            tasks.spawn(async move {
                match timeout(budget, llm.assess(&description, &query)).await {
                    Ok(Ok(assessment)) => (domain_id, Some(assessment)),
                    Ok(Err(e)) => {
                        warn!(domain = %domain_id, error = %e, "assess failed, vector-only for this domain");
                        (domain_id, None)
                    }
                    Err(_) => {
                        warn!(domain = %domain_id, "assess timed out, vector-only for this domain");
                        (domain_id, None)
                    }
                }
            });
        }

        let mut failures = 0;
        while let Some(joined) = tasks.join_next().await {
            let Ok((domain_id, assessment)) = joined else {
                failures += 1;
                continue;
            };
            match assessment {
                Some(assessment) => {
                    if let Some(score) = scores.iter_mut().find(|s| s.domain_id == domain_id) {
                        score.llm_confidence = Some(assessment.confidence.clamp(0.0, 1.0));
                        score.can_answer = Some(assessment.can_answer);
                        score.reasoning = Some(assessment.reasoning);
                    }
                }
                None => failures += 1,
            }
        }
        failures
    }
}
