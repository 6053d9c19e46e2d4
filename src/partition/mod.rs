//! # Domain Partitioner
//!
//! Splits the embedded paragraph corpus into a bounded number of topic
//! domains so routing and expansion can work on a manageable subset, and
//! keeps domain sizes within configured bounds over time.
//!
//! Both operations are single-writer: they serialize against each other
//! through an internal gate, and they persist by replacing the whole
//! domain snapshot atomically — concurrent readers observe the previous
//! partition or the new one, never half of each. Re-partitioning is
//! idempotent and re-runnable; there is nothing to clean up between runs.

pub mod kmeans;

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::time::{Duration, timeout};
use tracing::{info, warn};

use crate::config::PartitionConfig;
use crate::model::{Domain, DomainId, Embedding, LexicalUnit};
use crate::provider::LlmProvider;
use crate::storage::GraphStore;
use crate::{Error, Result};

// ============================================================================
// Reports
// ============================================================================

/// Outcome of a full re-partition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PartitionReport {
    /// Version of the installed snapshot.
    pub version: u64,
    pub domains: usize,
    pub requested_domains: usize,
    pub paragraphs: usize,
    /// True when the corpus had fewer paragraphs than requested clusters.
    pub degraded: bool,
    pub iterations: usize,
    pub converged: bool,
}

/// One structural change made by a rebalancing pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RebalanceAction {
    Split {
        source: DomainId,
        into: [DomainId; 2],
        sizes: [usize; 2],
    },
    Merge {
        source: DomainId,
        into: DomainId,
        moved: usize,
    },
}

/// Outcome of a rebalancing pass, for auditability.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RebalanceReport {
    /// New snapshot version; `None` when no action was needed.
    pub version: Option<u64>,
    pub actions: Vec<RebalanceAction>,
    pub domains_before: usize,
    pub domains_after: usize,
}

impl RebalanceReport {
    pub fn is_noop(&self) -> bool {
        self.actions.is_empty()
    }
}

// ============================================================================
// Partitioner
// ============================================================================

/// Clusters paragraphs into domains and persists the result.
pub struct Partitioner<S: GraphStore> {
    store: Arc<S>,
    llm: Option<Arc<dyn LlmProvider>>,
    config: PartitionConfig,
    /// Serializes partition and rebalance against each other.
    gate: tokio::sync::Mutex<()>,
}

impl<S: GraphStore> Partitioner<S> {
    pub fn new(store: Arc<S>, config: PartitionConfig) -> Self {
        Self { store, llm: None, config, gate: tokio::sync::Mutex::new(()) }
    }

    /// Attach an LLM for domain name/description generation.
    pub fn with_llm(mut self, llm: Arc<dyn LlmProvider>) -> Self {
        self.llm = Some(llm);
        self
    }

    // ========================================================================
    // partition
    // ========================================================================

    /// Re-partition the whole corpus into `target_domains` topic clusters.
    ///
    /// Replaces every prior domain and membership in one atomic pass.
    /// Fewer paragraphs than requested clusters degrades the cluster count
    /// instead of failing.
    pub async fn partition(&self) -> Result<PartitionReport> {
        let _writer = self.gate.lock().await;

        let paragraphs = self.store.embedded_paragraphs(None).await?;
        let embeddings: Vec<Embedding> = paragraphs
            .iter()
            .map(|p| p.embedding.clone().ok_or_else(|| Error::Store(format!("paragraph {} lost its embedding mid-partition", p.full_id))))
            .collect::<Result<_>>()?;

        let requested = self.config.target_domains;
        let outcome = kmeans::cluster(&embeddings, requested, self.config.max_iterations)?;
        let degraded = outcome.centroids.len() < requested;
        if degraded {
            warn!(
                requested,
                actual = outcome.centroids.len(),
                paragraphs = paragraphs.len(),
                "degraded partition: fewer paragraphs than requested domains"
            );
        }

        let mut domains = Vec::with_capacity(outcome.centroids.len());
        let mut memberships = Vec::with_capacity(paragraphs.len());
        for (cluster, _) in outcome.centroids.iter().enumerate() {
            let member_indices = outcome.members(cluster);
            let members: Vec<&LexicalUnit> =
                member_indices.iter().map(|i| &paragraphs[*i]).collect();
            let id = DomainId(cluster as u64 + 1);

            let centroid = Embedding::mean(members.iter().filter_map(|m| m.embedding.as_ref()))?
                .unwrap_or_else(|| outcome.centroids[cluster].clone());
            let descriptor = self.describe(&members, cluster).await;

            for member in &members {
                memberships.push((member.full_id.clone(), id));
            }
            domains.push(Domain {
                id,
                name: descriptor.0,
                description: descriptor.1,
                centroid,
                node_count: members.len(),
            });
        }

        let snapshot = self.store.replace_domains(domains, memberships).await?;
        info!(
            version = snapshot.version,
            domains = snapshot.domains.len(),
            paragraphs = paragraphs.len(),
            "partition installed"
        );

        Ok(PartitionReport {
            version: snapshot.version,
            domains: snapshot.domains.len(),
            requested_domains: requested,
            paragraphs: paragraphs.len(),
            degraded,
            iterations: outcome.iterations,
            converged: outcome.converged,
        })
    }

    /// Generate a domain name and description, falling back to
    /// deterministic naming when no LLM is available or it fails.
    async fn describe(&self, members: &[&LexicalUnit], cluster: usize) -> (String, String) {
        let samples: Vec<String> = members
            .iter()
            .filter(|m| !m.content.is_empty())
            .take(self.config.sample_texts)
            .map(|m| m.content.clone())
            .collect();

        if let Some(llm) = &self.llm {
            let call = llm.describe_domain(&samples);
            match timeout(Duration::from_millis(self.config.describe_timeout_ms), call).await {
                Ok(Ok(descriptor)) => return (descriptor.name, descriptor.description),
                Ok(Err(e)) => warn!(cluster, error = %e, "domain description fell back to deterministic naming"),
                Err(_) => warn!(cluster, "domain description timed out"),
            }
        }

        // Deterministic fallback: dominant law name among members.
        let mut law_counts: hashbrown::HashMap<&str, usize> = hashbrown::HashMap::new();
        for member in members {
            *law_counts.entry(member.law_name.as_str()).or_default() += 1;
        }
        let dominant = law_counts
            .iter()
            .max_by_key(|&(name, count)| (*count, std::cmp::Reverse(*name)))
            .map(|(name, _)| *name)
            .unwrap_or("미분류");
        let name = format!("{dominant} 영역 {}", cluster + 1);
        let description = samples
            .iter()
            .map(|s| s.chars().take(40).collect::<String>())
            .collect::<Vec<_>>()
            .join(" / ");
        (name, description)
    }

    // ========================================================================
    // rebalance
    // ========================================================================

    /// Split oversized domains and merge undersized ones.
    ///
    /// Idempotent: on an already-balanced snapshot this performs zero
    /// actions and leaves the persisted snapshot untouched. When actions
    /// are taken the whole snapshot is replaced atomically, same as a full
    /// re-partition.
    pub async fn rebalance(&self) -> Result<RebalanceReport> {
        let _writer = self.gate.lock().await;

        let Some(snapshot) = self.store.domain_snapshot().await? else {
            return Ok(RebalanceReport {
                version: None,
                actions: Vec::new(),
                domains_before: 0,
                domains_after: 0,
            });
        };
        let domains_before = snapshot.domains.len();

        // Working copies with member units attached.
        let mut working: Vec<WorkingDomain> = Vec::with_capacity(domains_before);
        let mut next_id = snapshot.domains.iter().map(|d| d.id.0).max().unwrap_or(0) + 1;
        for domain in &snapshot.domains {
            let members = self.store.embedded_paragraphs(Some(domain.id)).await?;
            working.push(WorkingDomain {
                id: domain.id,
                name: domain.name.clone(),
                description: domain.description.clone(),
                centroid: domain.centroid.clone(),
                members,
            });
        }

        let mut actions = Vec::new();
        // Merges can overfill a target, and splits can undershoot; a few
        // alternating passes settle both. Sizes strictly shrink on split,
        // so this terminates well before the cap.
        for _round in 0..4 {
            let split = self.split_pass(&mut working, &mut next_id, &mut actions)?;
            let merged = self.merge_pass(&mut working, &mut actions)?;
            if !split && !merged {
                break;
            }
        }

        if actions.is_empty() {
            info!(domains = domains_before, "rebalance: already balanced, no action");
            return Ok(RebalanceReport {
                version: None,
                actions,
                domains_before,
                domains_after: domains_before,
            });
        }

        let mut domains = Vec::with_capacity(working.len());
        let mut memberships = Vec::new();
        for w in &working {
            let centroid = Embedding::mean(w.members.iter().filter_map(|m| m.embedding.as_ref()))?
                .unwrap_or_else(|| w.centroid.clone());
            for member in &w.members {
                memberships.push((member.full_id.clone(), w.id));
            }
            domains.push(Domain {
                id: w.id,
                name: w.name.clone(),
                description: w.description.clone(),
                centroid,
                node_count: w.members.len(),
            });
        }
        let domains_after = domains.len();
        let snapshot = self.store.replace_domains(domains, memberships).await?;
        info!(
            version = snapshot.version,
            actions = actions.len(),
            domains_before,
            domains_after,
            "rebalance applied"
        );

        Ok(RebalanceReport {
            version: Some(snapshot.version),
            actions,
            domains_before,
            domains_after,
        })
    }

    /// Split every domain above the upper size bound into two. Returns
    /// whether anything changed.
    fn split_pass(
        &self,
        working: &mut Vec<WorkingDomain>,
        next_id: &mut u64,
        actions: &mut Vec<RebalanceAction>,
    ) -> Result<bool> {
        let mut changed = false;
        loop {
            let Some(index) = working
                .iter()
                .position(|w| w.members.len() > self.config.max_domain_size)
            else {
                break;
            };
            let source = working.remove(index);
            let embeddings: Vec<Embedding> = source
                .members
                .iter()
                .filter_map(|m| m.embedding.clone())
                .collect();
            let outcome = kmeans::cluster(&embeddings, 2, self.config.max_iterations)?;

            let mut halves: [Vec<LexicalUnit>; 2] = [Vec::new(), Vec::new()];
            for (member, assigned) in source.members.into_iter().zip(&outcome.assignments) {
                halves[(*assigned).min(1)].push(member);
            }

            let ids = [DomainId(*next_id), DomainId(*next_id + 1)];
            *next_id += 2;
            let sizes = [halves[0].len(), halves[1].len()];
            for (half, (id, members)) in ids.iter().zip(halves).enumerate() {
                let centroid = Embedding::mean(members.iter().filter_map(|m| m.embedding.as_ref()))?
                    .unwrap_or_else(|| source.centroid.clone());
                working.push(WorkingDomain {
                    id: *id,
                    name: format!("{} {}", source.name, half + 1),
                    description: source.description.clone(),
                    centroid,
                    members,
                });
            }
            actions.push(RebalanceAction::Split { source: source.id, into: ids, sizes });
            changed = true;
        }
        Ok(changed)
    }

    /// Merge every domain below the lower size bound into its
    /// nearest-centroid neighbor. Returns whether anything changed.
    fn merge_pass(
        &self,
        working: &mut Vec<WorkingDomain>,
        actions: &mut Vec<RebalanceAction>,
    ) -> Result<bool> {
        let mut changed = false;
        loop {
            if working.len() < 2 {
                // Too small a corpus to merge into anything.
                break;
            }
            let Some(index) = working
                .iter()
                .position(|w| w.members.len() < self.config.min_domain_size)
            else {
                break;
            };
            let source = working.remove(index);

            let mut target_index = 0;
            let mut best_distance = f32::MAX;
            for (candidate_index, candidate) in working.iter().enumerate() {
                let distance = source.centroid.cosine_distance(&candidate.centroid)?;
                if distance < best_distance {
                    best_distance = distance;
                    target_index = candidate_index;
                }
            }

            let moved = source.members.len();
            let target = &mut working[target_index];
            target.members.extend(source.members);
            target.centroid =
                Embedding::mean(target.members.iter().filter_map(|m| m.embedding.as_ref()))?
                    .unwrap_or_else(|| target.centroid.clone());
            actions.push(RebalanceAction::Merge { source: source.id, into: target.id, moved });
            changed = true;
        }
        Ok(changed)
    }
}

struct WorkingDomain {
    id: DomainId,
    name: String,
    description: String,
    centroid: Embedding,
    members: Vec<LexicalUnit>,
}
