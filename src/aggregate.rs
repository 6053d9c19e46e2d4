//! # Result Aggregation and Synthesis
//!
//! Merges per-domain expansion outputs into one presentable list:
//! dedup by identifier (max score, union of provenance), citation and
//! tier enrichment, a stable tier-diversification pass, and the optional
//! LLM answer synthesis. Synthesis is strictly best-effort: when it fails
//! or times out the caller still gets the full result list, just without
//! the prose answer.

use std::sync::Arc;

use hashbrown::HashMap;
use tokio::time::{Duration, timeout};
use tracing::{debug, warn};

use crate::config::AggregationConfig;
use crate::model::{DomainId, RetrievalHit, identifier, sort_ranked};
use crate::provider::LlmProvider;

/// Merges, enriches, and re-ranks expansion outputs.
pub struct Aggregator {
    config: AggregationConfig,
}

impl Aggregator {
    pub fn new(config: AggregationConfig) -> Self {
        Self { config }
    }

    /// Merge result sets from one or more domains.
    ///
    /// Hits merge by `full_id`: the highest score wins and provenance
    /// (stages, source domains) is unioned, so the operation is
    /// idempotent — merging the merged output changes nothing.
    pub fn merge(
        &self,
        per_domain: Vec<(Option<DomainId>, Vec<RetrievalHit>)>,
    ) -> Vec<RetrievalHit> {
        let mut merged: HashMap<String, RetrievalHit> = HashMap::new();
        for (domain, hits) in per_domain {
            for mut hit in hits {
                if let Some(domain) = domain {
                    hit.add_source_domain(domain);
                }
                match merged.get_mut(&hit.full_id) {
                    Some(existing) => existing.absorb(&hit),
                    None => {
                        merged.insert(hit.full_id.clone(), hit);
                    }
                }
            }
        }
        let mut hits: Vec<RetrievalHit> = merged.into_values().collect();
        sort_ranked(&mut hits);
        hits
    }

    /// Fill the human-readable enrichment fields from the identifier.
    ///
    /// A malformed identifier never drops a hit — the enrichment fields
    /// just stay empty as explicit not-available markers.
    pub fn enrich(&self, hits: &mut [RetrievalHit]) {
        for hit in hits {
            if hit.article.is_none() {
                hit.article = identifier::extract_article_reference(&hit.full_id);
            }
            if hit.law_tier.is_none() {
                let path = identifier::parse(&hit.full_id);
                if !path.law_name.is_empty() {
                    hit.law_tier = Some(path.law_tier());
                }
            }
        }
    }

    /// Stable tier diversification.
    ///
    /// When the protected top of the list is tier-homogeneous, promote a
    /// bounded number of other-tier hits ahead of lower-ranked same-tier
    /// duplicates. Re-ranking only — scores are never touched, and
    /// relative order within each group is preserved.
    pub fn diversify(&self, hits: &mut Vec<RetrievalHit>) {
        let protect = self.config.protect_top;
        if hits.len() <= protect || protect == 0 {
            return;
        }

        let Some(lead_tier) = hits[0].law_tier else {
            return;
        };
        if hits[..protect].iter().any(|h| h.law_tier != Some(lead_tier)) {
            // Already mixed at the top; nothing to do.
            return;
        }

        let mut promoted = Vec::with_capacity(self.config.diversify_quota);
        let mut index = protect;
        while index < hits.len() && promoted.len() < self.config.diversify_quota {
            let other_tier = hits[index]
                .law_tier
                .is_some_and(|tier| tier != lead_tier);
            if other_tier {
                promoted.push(hits.remove(index));
            } else {
                index += 1;
            }
        }
        if promoted.is_empty() {
            return;
        }
        debug!(promoted = promoted.len(), "tier diversification promoted cross-tier hits");
        for (offset, hit) in promoted.into_iter().enumerate() {
            hits.insert(protect + offset, hit);
        }
    }

    /// Produce one cited prose answer from the merged evidence.
    ///
    /// Timeout, provider error, and missing provider all yield `None`; the
    /// request succeeds regardless.
    pub async fn synthesize(
        &self,
        llm: &Arc<dyn LlmProvider>,
        query: &str,
        hits: &[RetrievalHit],
    ) -> Option<String> {
        if hits.is_empty() {
            return None;
        }
        let evidence = &hits[..hits.len().min(self.config.max_evidence)];
        let budget = Duration::from_millis(self.config.synthesis_timeout_ms);
        match timeout(budget, llm.synthesize(query, evidence)).await {
            Ok(Ok(answer)) if !answer.trim().is_empty() => Some(answer),
            Ok(Ok(_)) => None,
            Ok(Err(e)) => {
                warn!(error = %e, "synthesis failed, returning results without an answer");
                None
            }
            Err(_) => {
                warn!("synthesis timed out, returning results without an answer");
                None
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
