//! # Graph Store Boundary
//!
//! This is THE contract between the retrieval engine and whatever property
//! graph holds the corpus. The engine never embeds literal untrusted query
//! text — typed operations carry typed arguments, and the raw escape hatch
//! only ever binds parameters.
//!
//! ## Implementations
//!
//! | Store | Module | Description |
//! |-------|--------|-------------|
//! | `MemoryStore` | `memory` | In-memory reference store for testing/embedding |
//!
//! Remote property-graph adapters implement the same trait out of tree.

pub mod memory;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::model::{
    CitationRef, Domain, DomainId, DomainSnapshot, Embedding, LawTier, LexicalUnit,
};
use crate::{Error, Result};

pub use memory::{CorpusBuilder, MemoryStore};

// ============================================================================
// Relationship types
// ============================================================================

/// Typed edges of the statute graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RelationKind {
    /// Parent → child along the hierarchy. Acyclic per law document.
    Contains,
    /// Statute → decree → rule, linking a provision to the regulation
    /// elaborating it.
    Implements,
    /// Paragraph → domain membership.
    BelongsToDomain,
}

impl RelationKind {
    /// Relationship type string as persisted in the graph.
    pub fn as_str(&self) -> &'static str {
        match self {
            RelationKind::Contains => "CONTAINS",
            RelationKind::Implements => "IMPLEMENTS",
            RelationKind::BelongsToDomain => "BELONGS_TO_DOMAIN",
        }
    }
}

// ============================================================================
// Record types
// ============================================================================

/// A unit scored by vector similarity.
#[derive(Debug, Clone)]
pub struct ScoredUnit {
    pub unit: LexicalUnit,
    pub similarity: f32,
}

/// One step of a unit's expansion neighborhood.
///
/// `relationship_embedding` is the semantic vector attached to the
/// traversed edge, when the corpus carries one; expansion refuses to
/// traverse edges without it.
#[derive(Debug, Clone)]
pub struct Neighbor {
    pub unit: LexicalUnit,
    pub relation: RelationKind,
    pub relationship_embedding: Option<Embedding>,
}

/// Corpus-wide counts for introspection and startup logging.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CorpusStats {
    pub units: usize,
    pub relationships: usize,
    pub embedded_paragraphs: usize,
    pub domain_count: usize,
    pub tiers: Vec<LawTier>,
}

/// Parameters bound into a raw query. Values only — never query text.
pub type RawParams = HashMap<String, serde_json::Value>;

/// One record returned by a raw query.
pub type RawRecord = HashMap<String, serde_json::Value>;

// ============================================================================
// Capabilities
// ============================================================================

/// What a store can do — the engine adapts instead of assuming.
///
/// All fields default to the least capable setting. Stores override via
/// `capabilities()`.
#[derive(Debug, Clone, Default)]
pub struct StoreCapabilities {
    /// Store-side vector index over paragraph embeddings. Without it the
    /// engine's default brute-force scan serves seed search.
    pub native_vector_index: bool,
    /// Dimensionality the store's vector index was built for. Checked
    /// against the embedding provider at startup.
    pub vector_dimension: Option<usize>,
    pub supports_raw_queries: bool,
}

// ============================================================================
// GraphStore trait
// ============================================================================

/// The universal store contract.
///
/// All read operations are safe to run concurrently. `replace_domains` is
/// the single write entry point and must apply atomically: a concurrent
/// reader observes the previous snapshot or the new one, never a partial
/// mix of memberships.
#[async_trait]
pub trait GraphStore: Send + Sync + 'static {
    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Establish the session with the underlying graph.
    async fn connect(&self) -> Result<()>;

    /// Tear down the session, flushing nothing — all writes are applied
    /// at call time.
    async fn disconnect(&self) -> Result<()>;

    // ========================================================================
    // Unit reads
    // ========================================================================

    /// Look up a unit by its composite identifier.
    async fn unit_by_id(&self, full_id: &str) -> Result<Option<LexicalUnit>>;

    /// All paragraph-level units that carry an embedding, optionally
    /// restricted to one domain's members.
    async fn embedded_paragraphs(&self, domain: Option<DomainId>) -> Result<Vec<LexicalUnit>>;

    /// Top-k embedded paragraphs by cosine similarity to the query.
    ///
    /// Default: brute-force scan over `embedded_paragraphs`. Stores with a
    /// native vector index should override and push the search down.
    async fn vector_search(
        &self,
        query: &Embedding,
        k: usize,
        domain: Option<DomainId>,
    ) -> Result<Vec<ScoredUnit>> {
        let mut scored = Vec::new();
        for unit in self.embedded_paragraphs(domain).await? {
            let Some(embedding) = unit.embedding.as_ref() else {
                continue;
            };
            let similarity = query.cosine(embedding)?;
            scored.push(ScoredUnit { unit, similarity });
        }
        scored.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        scored.truncate(k);
        Ok(scored)
    }

    /// Expansion neighborhood of a unit.
    ///
    /// For a paragraph: its parent article, sibling paragraphs under the
    /// same article, and cross-tier counterpart articles reachable over
    /// IMPLEMENTS. For an article: its paragraphs and counterparts. For
    /// structural units: their children.
    async fn neighborhood(&self, full_id: &str) -> Result<Vec<Neighbor>>;

    /// Paragraph units addressed by an explicit statutory citation.
    async fn paragraphs_by_citation(&self, citation: &CitationRef) -> Result<Vec<LexicalUnit>>;

    // ========================================================================
    // Domains
    // ========================================================================

    /// The current domain snapshot, if the corpus has been partitioned.
    async fn domain_snapshot(&self) -> Result<Option<DomainSnapshot>>;

    /// Version marker of the current snapshot. Cheap; used by callers to
    /// invalidate process-local snapshot caches.
    async fn snapshot_version(&self) -> Result<Option<u64>>;

    /// Atomically replace all domains and every BELONGS_TO_DOMAIN edge.
    ///
    /// `memberships` maps paragraph `full_id` → domain. Returns the
    /// installed snapshot with its assigned version and timestamp. Partial
    /// application is forbidden: either every prior membership is replaced
    /// or none is.
    async fn replace_domains(
        &self,
        domains: Vec<Domain>,
        memberships: Vec<(String, DomainId)>,
    ) -> Result<DomainSnapshot>;

    // ========================================================================
    // Introspection
    // ========================================================================

    /// Corpus-wide counts.
    async fn stats(&self) -> Result<CorpusStats>;

    // ========================================================================
    // Escape hatch
    // ========================================================================

    /// Pass-through for store-native parametrized queries.
    ///
    /// Variable inputs go in `params`, never interpolated into the
    /// template. Default returns "not supported".
    async fn run_raw(&self, _template: &str, _params: RawParams) -> Result<Vec<RawRecord>> {
        Err(Error::Store("raw query execution not supported".into()))
    }

    // ========================================================================
    // Capability negotiation
    // ========================================================================

    /// Report what this store can do.
    fn capabilities(&self) -> StoreCapabilities {
        StoreCapabilities::default()
    }
}
