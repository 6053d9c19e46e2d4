//! External provider contracts: embeddings and LLM refinement.
//!
//! Both sides of these traits are out of scope for the engine — the
//! embedding model and the LLM are opaque, fallible, latency-bearing
//! collaborators. The engine only ever calls them through these contracts,
//! under timeouts, with an explicit degraded path when they fail.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::Result;
use crate::model::{Embedding, RetrievalHit};

// ============================================================================
// Embedding provider
// ============================================================================

/// Opaque text → vector function.
///
/// The same provider must serve corpus ingestion, query embedding, and
/// centroid computation. `dimension()` is checked against the store's
/// vector index at engine startup; a mismatch refuses service.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync + 'static {
    async fn embed(&self, text: &str) -> Result<Embedding>;

    /// Output dimensionality of this provider's model.
    fn dimension(&self) -> usize;
}

// ============================================================================
// LLM provider
// ============================================================================

/// An LLM self-assessment of whether a domain can answer a query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assessment {
    /// Confidence in [0, 1].
    pub confidence: f32,
    pub can_answer: bool,
    pub reasoning: String,
}

/// Generated name and description for a topic domain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainDescriptor {
    pub name: String,
    pub description: String,
}

/// Opaque prompt → text collaborator.
///
/// Every call is best-effort: the routing layer falls back to vector-only
/// scoring when `assess` fails, aggregation omits the synthesized answer
/// when `synthesize` fails, and partitioning falls back to deterministic
/// naming when `describe_domain` is unsupported or fails.
#[async_trait]
pub trait LlmProvider: Send + Sync + 'static {
    /// Judge whether a domain, given its description, can answer the query.
    async fn assess(&self, domain_description: &str, query: &str) -> Result<Assessment>;

    /// Produce one cited prose answer from the merged evidence list.
    async fn synthesize(&self, query: &str, evidence: &[RetrievalHit]) -> Result<String>;

    /// Summarize representative member texts into a domain name and
    /// description.
    ///
    /// Default is unsupported — the partitioner then names domains
    /// deterministically from member metadata.
    async fn describe_domain(&self, _sample_texts: &[String]) -> Result<DomainDescriptor> {
        Err(crate::Error::Llm("domain description generation not supported".into()))
    }
}
