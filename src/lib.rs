//! # lexgraph — Graph-Vector Retrieval for Statutory Corpora
//!
//! A retrieval-and-routing engine for natural-language questions over a
//! graph-structured corpus of statutory text (laws, their implementing
//! decrees, and enforcement rules).
//!
//! ## Design Principles
//!
//! 1. **Trait-first**: `GraphStore`, `EmbeddingProvider`, and `LlmProvider`
//!    are the contracts between the engine and the outside world
//! 2. **Clean DTOs**: `LexicalUnit`, `Domain`, `RetrievalHit` cross all
//!    boundaries
//! 3. **Snapshot reads**: routing and expansion read an immutable domain
//!    snapshot acquired at request start; repartitioning installs a new
//!    version instead of mutating shared state
//! 4. **Degradation is a branch**: every optional refinement (LLM routing
//!    confidence, answer synthesis) has an explicit fallback path
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use lexgraph::{LexGraph, MemoryStore, SearchOptions};
//!
//! # async fn example(graph: LexGraph<MemoryStore>) -> lexgraph::Result<()> {
//! let response = graph
//!     .search("용도지역 지정은 누가 하나요?", SearchOptions::default())
//!     .await?;
//!
//! for hit in &response.results {
//!     println!("{:?} {} {:.3}", hit.article, hit.full_id, hit.score);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Pipeline
//!
//! | Stage | Module | Description |
//! |-------|--------|-------------|
//! | Routing | `routing` | Pick the domain(s) most likely to answer |
//! | Expansion | `expansion` | Vector seeds + relationship-aware traversal |
//! | Aggregation | `aggregate` | Merge, enrich, diversify, synthesize |
//! | Partitioning | `partition` | Cluster the corpus into topic domains |

// ============================================================================
// Modules
// ============================================================================

pub mod model;
pub mod config;
pub mod provider;
pub mod storage;
pub mod expansion;
pub mod partition;
pub mod routing;
pub mod aggregate;

// ============================================================================
// Re-exports: Model (the DTOs)
// ============================================================================

pub use model::{
    LexicalUnit, UnitType, LawTier, UnitPath, CitationRef,
    Embedding, Domain, DomainId, DomainSnapshot, RetrievalHit, Stage,
};

// ============================================================================
// Re-exports: Boundaries
// ============================================================================

pub use storage::{GraphStore, MemoryStore, CorpusBuilder, StoreCapabilities};
pub use provider::{EmbeddingProvider, LlmProvider, Assessment, DomainDescriptor};

// ============================================================================
// Re-exports: Engine pieces
// ============================================================================

pub use config::EngineConfig;
pub use expansion::ExpansionEngine;
pub use partition::{Partitioner, PartitionReport, RebalanceAction, RebalanceReport};
pub use routing::{Router, RoutingDecision, DomainScore};
pub use aggregate::Aggregator;

use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tokio::task::JoinSet;
use tracing::{debug, info};

use expansion::ExpansionOutcome;

// ============================================================================
// Search API surface
// ============================================================================

/// Per-request options for [`LexGraph::search`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchOptions {
    /// Maximum results returned.
    pub limit: usize,
    /// Ask the LLM for one cited prose answer over the merged evidence.
    pub synthesize: bool,
    /// Consult several domains instead of the single best one.
    pub collaborate: bool,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self { limit: 10, synthesize: false, collaborate: false }
    }
}

/// Counters describing how one search ran, including every degraded path
/// it took.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchStats {
    pub seeds: usize,
    pub expanded: usize,
    pub exact_matches: usize,
    pub domains_considered: usize,
    /// Domains whose traversal degraded to seed-only results.
    pub expansion_fallbacks: usize,
    /// True when no domain cleared the admission floor.
    pub routing_fallback: bool,
    /// LLM refinement calls that failed or timed out.
    pub refinement_failures: usize,
}

/// The answer to one query.
///
/// An empty `results` list is a valid outcome — "no matching law" — and is
/// distinct from an `Err`, which means a mandatory stage was unavailable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResponse {
    pub results: Vec<RetrievalHit>,
    /// Names of the domains consulted; empty before the first partition.
    pub domains_queried: Vec<String>,
    /// Present only when synthesis was requested and succeeded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub synthesized_answer: Option<String>,
    pub response_time_ms: u64,
    pub stats: SearchStats,
}

// ============================================================================
// Top-level handle
// ============================================================================

/// The primary entry point. Wraps a graph store and the external
/// providers, and runs the embed → route → expand → aggregate pipeline.
pub struct LexGraph<S: GraphStore> {
    store: Arc<S>,
    embedder: Arc<dyn EmbeddingProvider>,
    llm: Option<Arc<dyn LlmProvider>>,
    config: EngineConfig,
    /// Process-local snapshot cache, invalidated by version comparison.
    snapshot_cache: parking_lot::RwLock<Option<Arc<DomainSnapshot>>>,
}

impl<S: GraphStore> LexGraph<S> {
    /// Connect the store and verify the embedding handshake.
    ///
    /// Refuses to open when the store's vector index dimension disagrees
    /// with the embedding provider — serving similarity scores across
    /// mismatched dimensions would be silently wrong, which is worse than
    /// being down.
    pub async fn open(
        store: S,
        embedder: Arc<dyn EmbeddingProvider>,
        config: EngineConfig,
    ) -> Result<Self> {
        config.validate()?;
        let store = Arc::new(store);
        store.connect().await?;

        if let Some(index_dimension) = store.capabilities().vector_dimension {
            if index_dimension != embedder.dimension() {
                return Err(Error::DimensionMismatch {
                    expected: index_dimension,
                    got: embedder.dimension(),
                    context: "store vector index vs embedding provider".into(),
                });
            }
        }

        let stats = store.stats().await?;
        info!(
            units = stats.units,
            embedded_paragraphs = stats.embedded_paragraphs,
            domains = stats.domain_count,
            "graph store connected"
        );

        Ok(Self {
            store,
            embedder,
            llm: None,
            config,
            snapshot_cache: parking_lot::RwLock::new(None),
        })
    }

    /// Attach an LLM provider for routing refinement and synthesis.
    pub fn with_llm(mut self, llm: Arc<dyn LlmProvider>) -> Self {
        self.llm = Some(llm);
        self
    }

    /// A partitioner sharing this handle's store, LLM, and configuration.
    pub fn partitioner(&self) -> Partitioner<S> {
        let partitioner =
            Partitioner::new(Arc::clone(&self.store), self.config.partition.clone());
        match &self.llm {
            Some(llm) => partitioner.with_llm(Arc::clone(llm)),
            None => partitioner,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Disconnect the underlying store session.
    pub async fn close(&self) -> Result<()> {
        self.store.disconnect().await
    }

    // ========================================================================
    // Search
    // ========================================================================

    /// Answer one query: embed → route → expand per domain → aggregate →
    /// optionally synthesize.
    pub async fn search(&self, query_text: &str, options: SearchOptions) -> Result<SearchResponse> {
        let started = Instant::now();

        // Empty input degrades locally: an empty result, not an error.
        if query_text.trim().is_empty() {
            debug!("empty query text, returning empty response");
            return Ok(SearchResponse {
                results: Vec::new(),
                domains_queried: Vec::new(),
                synthesized_answer: None,
                response_time_ms: started.elapsed().as_millis() as u64,
                stats: SearchStats::default(),
            });
        }

        let query_embedding = self.embedder.embed(query_text).await?;
        if query_embedding.dimension() != self.embedder.dimension() {
            return Err(Error::DimensionMismatch {
                expected: self.embedder.dimension(),
                got: query_embedding.dimension(),
                context: "query embedding vs provider dimension".into(),
            });
        }

        let mut stats = SearchStats::default();
        let mut domains_queried = Vec::new();
        let snapshot = self.current_snapshot().await?;

        // Per-domain expansion, or a corpus-wide run before the first
        // partition.
        let per_domain: Vec<(Option<DomainId>, ExpansionOutcome)> = match snapshot {
            Some(snapshot) if !snapshot.is_empty() => {
                let router = Router::new(self.config.routing.clone());
                let decision = router
                    .route(
                        query_text,
                        &query_embedding,
                        &snapshot,
                        self.llm.as_ref(),
                        options.collaborate,
                    )
                    .await?;
                stats.domains_considered = decision.scored.len();
                stats.routing_fallback = decision.floor_fallback;
                stats.refinement_failures = decision.refinement_failures;

                let mut tasks: JoinSet<(DomainId, Result<ExpansionOutcome>)> = JoinSet::new();
                for selected in &decision.selected {
                    domains_queried.push(selected.domain_name.clone());
                    let engine = ExpansionEngine::new(
                        Arc::clone(&self.store),
                        self.config.expansion.clone(),
                    );
                    let query_text = query_text.to_string();
                    let query_embedding = query_embedding.clone();
                    let domain_id = selected.domain_id;
                    let limit = options.limit;
                    tasks.spawn(async move {
                        let outcome = engine
                            .expand(&query_text, &query_embedding, Some(domain_id), limit)
                            .await;
                        (domain_id, outcome)
                    });
                }

                let mut collected = Vec::new();
                while let Some(joined) = tasks.join_next().await {
                    let (domain_id, outcome) = joined
                        .map_err(|e| Error::Store(format!("expansion task aborted: {e}")))?;
                    collected.push((Some(domain_id), outcome?));
                }
                // Join order is nondeterministic; results are not.
                collected.sort_by_key(|(id, _)| id.map(|d| d.0));
                collected
            }
            _ => {
                let engine = ExpansionEngine::new(
                    Arc::clone(&self.store),
                    self.config.expansion.clone(),
                );
                let outcome = engine
                    .expand(query_text, &query_embedding, None, options.limit)
                    .await?;
                vec![(None, outcome)]
            }
        };

        for (_, outcome) in &per_domain {
            stats.seeds += outcome.stats.seeds;
            stats.expanded += outcome.stats.expanded;
            stats.exact_matches += outcome.stats.exact_matches;
            if outcome.stats.seed_only_fallback {
                stats.expansion_fallbacks += 1;
            }
        }

        // Aggregate across domains.
        let aggregator = Aggregator::new(self.config.aggregation.clone());
        let mut results = aggregator.merge(
            per_domain
                .into_iter()
                .map(|(domain, outcome)| (domain, outcome.hits))
                .collect(),
        );
        aggregator.enrich(&mut results);
        aggregator.diversify(&mut results);
        results.truncate(options.limit);

        // Optional synthesis — failure leaves the answer absent, never
        // fails the request.
        let synthesized_answer = match (&self.llm, options.synthesize) {
            (Some(llm), true) => aggregator.synthesize(llm, query_text, &results).await,
            (None, true) => {
                debug!("synthesis requested but no LLM provider is attached");
                None
            }
            _ => None,
        };

        Ok(SearchResponse {
            results,
            domains_queried,
            synthesized_answer,
            response_time_ms: started.elapsed().as_millis() as u64,
            stats,
        })
    }

    // ========================================================================
    // Snapshot cache
    // ========================================================================

    /// Current domain snapshot, reloaded whenever the store-side version
    /// marker moves (i.e. a repartition happened).
    async fn current_snapshot(&self) -> Result<Option<Arc<DomainSnapshot>>> {
        let version = self.store.snapshot_version().await?;
        {
            let cache = self.snapshot_cache.read();
            match (cache.as_ref(), version) {
                (Some(cached), Some(current)) if cached.version == current => {
                    return Ok(Some(Arc::clone(cached)));
                }
                (None, None) => return Ok(None),
                _ => {}
            }
        }

        match self.store.domain_snapshot().await? {
            Some(snapshot) => {
                // Integrity gate: refuse to route on corrupt centroids.
                snapshot.validate(self.embedder.dimension())?;
                info!(version = snapshot.version, domains = snapshot.domains.len(), "domain snapshot loaded");
                let snapshot = Arc::new(snapshot);
                *self.snapshot_cache.write() = Some(Arc::clone(&snapshot));
                Ok(Some(snapshot))
            }
            None => {
                *self.snapshot_cache.write() = None;
                Ok(None)
            }
        }
    }
}

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The graph store failed or is unreachable.
    #[error("store error: {0}")]
    Store(String),

    /// The embedding provider failed or is unreachable.
    #[error("embedding provider error: {0}")]
    Embedding(String),

    /// The LLM provider failed. Only surfaced from paths where the LLM is
    /// mandatory; refinement paths degrade instead.
    #[error("llm provider error: {0}")]
    Llm(String),

    /// Vectors of different dimensionality met. Fatal: similarity scores
    /// across mismatched dimensions are meaningless.
    #[error("embedding dimension mismatch in {context}: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize, context: String },

    /// A domain centroid has zero magnitude and cannot be scored against.
    #[error("domain {domain} has a zero-magnitude centroid")]
    ZeroCentroid { domain: DomainId },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("not found: {0}")]
    NotFound(String),
}

pub type Result<T> = std::result::Result<T, Error>;
