//! Engine configuration.
//!
//! Every tunable of the retrieval pipeline lives here with a serde-
//! deserializable struct and a sensible default, so the transport layer can
//! load them from whatever source it likes. Thresholds, decay factors, and
//! routing weights are deliberately configuration rather than constants —
//! they should be tuned against a labeled relevance set, not hard-coded.

use serde::{Deserialize, Serialize};
use crate::{Error, Result};

/// Top-level configuration for [`crate::LexGraph`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub expansion: ExpansionConfig,
    pub routing: RoutingConfig,
    pub partition: PartitionConfig,
    pub aggregation: AggregationConfig,
}

impl EngineConfig {
    /// Reject configurations that would make scoring meaningless.
    pub fn validate(&self) -> Result<()> {
        let e = &self.expansion;
        if e.seed_count == 0 {
            return Err(Error::Config("expansion.seed_count must be at least 1".into()));
        }
        if !(0.0..=1.0).contains(&e.relationship_threshold) {
            return Err(Error::Config(
                "expansion.relationship_threshold must be within [0, 1]".into(),
            ));
        }
        if !(0.0 < e.score_decay && e.score_decay < 1.0) {
            return Err(Error::Config(
                "expansion.score_decay must be within (0, 1) so expansion never outranks its seed"
                    .into(),
            ));
        }
        if e.max_concurrent_expansions == 0 {
            return Err(Error::Config(
                "expansion.max_concurrent_expansions must be at least 1".into(),
            ));
        }
        let r = &self.routing;
        if r.vector_weight <= 0.0 {
            return Err(Error::Config(
                "routing.vector_weight must be positive so routing survives without the LLM"
                    .into(),
            ));
        }
        if r.llm_weight < 0.0 {
            return Err(Error::Config("routing.llm_weight must not be negative".into()));
        }
        if r.max_domains == 0 || r.collaborative_max_domains == 0 {
            return Err(Error::Config("routing must select at least one domain".into()));
        }
        let p = &self.partition;
        if p.min_domain_size >= p.max_domain_size {
            return Err(Error::Config(
                "partition.min_domain_size must be below max_domain_size".into(),
            ));
        }
        Ok(())
    }
}

/// Tunables for the expansion engine (seed search + RNE/INE).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExpansionConfig {
    /// Top-K vector seeds kept per query.
    pub seed_count: usize,
    /// Minimum relationship-embedding similarity for a neighbor to be
    /// admitted during expansion.
    pub relationship_threshold: f32,
    /// Multiplier applied to the origin score per expansion hop.
    pub score_decay: f32,
    /// Maximum expansion depth from a seed.
    pub max_depth: usize,
    /// Bound on concurrent neighborhood queries per request.
    pub max_concurrent_expansions: usize,
}

impl Default for ExpansionConfig {
    fn default() -> Self {
        Self {
            seed_count: 20,
            relationship_threshold: 0.75,
            score_decay: 0.8,
            max_depth: 2,
            max_concurrent_expansions: 8,
        }
    }
}

/// Tunables for domain routing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RoutingConfig {
    /// Weight of centroid cosine similarity in the combined score.
    /// Must stay positive: routing falls back to it when the LLM is
    /// unavailable.
    pub vector_weight: f32,
    /// Weight of the LLM confidence judgment in the combined score.
    pub llm_weight: f32,
    /// How many top domains (by vector similarity) get LLM refinement.
    pub refine_top_n: usize,
    /// Domains selected for a single-domain query.
    pub max_domains: usize,
    /// Domains selected when cross-domain collaboration is requested.
    pub collaborative_max_domains: usize,
    /// Minimum combined score for admission. When nothing clears it the
    /// single best domain is selected anyway.
    pub admission_floor: f32,
    /// Per-call timeout for LLM `assess` refinement.
    pub assess_timeout_ms: u64,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            vector_weight: 0.6,
            llm_weight: 0.4,
            refine_top_n: 3,
            max_domains: 1,
            collaborative_max_domains: 3,
            admission_floor: 0.35,
            assess_timeout_ms: 8_000,
        }
    }
}

/// Tunables for domain partitioning and rebalancing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PartitionConfig {
    /// Requested cluster count. Degraded downward when the corpus has
    /// fewer embedded paragraphs.
    pub target_domains: usize,
    /// Iteration cap for the clustering loop.
    pub max_iterations: usize,
    /// Rebalance: domains below this size are merged into their nearest
    /// neighbor.
    pub min_domain_size: usize,
    /// Rebalance: domains above this size are split in two.
    pub max_domain_size: usize,
    /// Member texts sampled per domain for name/description generation.
    pub sample_texts: usize,
    /// Per-call timeout for LLM domain description generation.
    pub describe_timeout_ms: u64,
}

impl Default for PartitionConfig {
    fn default() -> Self {
        Self {
            target_domains: 5,
            max_iterations: 50,
            min_domain_size: 20,
            max_domain_size: 800,
            sample_texts: 5,
            describe_timeout_ms: 10_000,
        }
    }
}

/// Tunables for result aggregation and synthesis.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregationConfig {
    /// Top ranks never displaced by tier diversification.
    pub protect_top: usize,
    /// Maximum cross-tier hits promoted by diversification.
    pub diversify_quota: usize,
    /// Evidence hits handed to the synthesizer.
    pub max_evidence: usize,
    /// Timeout for the LLM `synthesize` call.
    pub synthesis_timeout_ms: u64,
}

impl Default for AggregationConfig {
    fn default() -> Self {
        Self {
            protect_top: 3,
            diversify_quota: 2,
            max_evidence: 10,
            synthesis_timeout_ms: 15_000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(EngineConfig::default().validate().is_ok());
    }

    #[test]
    fn zero_vector_weight_is_rejected() {
        let mut config = EngineConfig::default();
        config.routing.vector_weight = 0.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn decay_of_one_is_rejected() {
        let mut config = EngineConfig::default();
        config.expansion.score_decay = 1.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn inverted_size_bounds_are_rejected() {
        let mut config = EngineConfig::default();
        config.partition.min_domain_size = 900;
        assert!(config.validate().is_err());
    }
}
