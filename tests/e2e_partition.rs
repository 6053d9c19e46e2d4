//! End-to-end tests for domain partitioning and rebalancing.

mod common;

use std::collections::HashSet;
use std::sync::Arc;

use pretty_assertions::assert_eq;

use common::axis;
use lexgraph::config::PartitionConfig;
use lexgraph::storage::{CorpusBuilder, GraphStore, MemoryStore};
use lexgraph::{Partitioner, RebalanceAction};

const DIM: usize = 5;

/// Synthetic corpus: `counts[c]` embedded paragraphs per topic cluster,
/// each cluster pointing along its own axis with a little jitter.
fn clustered_store(counts: &[usize]) -> MemoryStore {
    let law_names = [
        "국토의 계획 및 이용에 관한 법률",
        "건축법",
        "도로법",
        "하천법",
        "산지관리법",
    ];
    let mut b = CorpusBuilder::new();
    for (cluster, count) in counts.iter().enumerate() {
        b.law(law_names[cluster]);
        for i in 0..*count {
            if i % 10 == 0 {
                b.article(&format!("제{}조", i / 10 + 1), "조문");
            }
            let mut v = axis(DIM, cluster);
            v[(cluster + 1) % DIM] = 0.001 * (i % 7) as f32;
            b.embedded_paragraph(
                &format!("{}", i % 10 + 1),
                &format!("{} 관련 조항 {}", law_names[cluster], i),
                v,
            );
        }
    }
    let store = MemoryStore::new();
    store.load(b.finish()).unwrap();
    store
}

/// Per-domain member id sets, for exhaustiveness/disjointness checks.
async fn membership_sets(store: &MemoryStore) -> Vec<HashSet<String>> {
    let snapshot = store.domain_snapshot().await.unwrap().unwrap();
    let mut sets = Vec::new();
    for domain in &snapshot.domains {
        let members = store.embedded_paragraphs(Some(domain.id)).await.unwrap();
        sets.push(members.into_iter().map(|m| m.full_id).collect());
    }
    sets
}

// ============================================================================
// 1. Full partition: exhaustive, disjoint, exact cluster count
// ============================================================================

#[tokio::test]
async fn partitions_1477_paragraphs_into_5_disjoint_domains() {
    let store = Arc::new(clustered_store(&[296, 296, 295, 295, 295]));
    let partitioner = Partitioner::new(
        Arc::clone(&store),
        PartitionConfig { target_domains: 5, ..PartitionConfig::default() },
    );

    let report = partitioner.partition().await.unwrap();
    assert_eq!(report.domains, 5);
    assert_eq!(report.paragraphs, 1477);
    assert!(!report.degraded);

    let snapshot = store.domain_snapshot().await.unwrap().unwrap();
    let total: usize = snapshot.domains.iter().map(|d| d.node_count).sum();
    assert_eq!(total, 1477);

    // Memberships cover every paragraph exactly once.
    let sets = membership_sets(&store).await;
    let mut all: HashSet<String> = HashSet::new();
    let mut counted = 0;
    for set in &sets {
        counted += set.len();
        all.extend(set.iter().cloned());
    }
    assert_eq!(counted, 1477);
    assert_eq!(all.len(), 1477);
}

// ============================================================================
// 2. Degraded mode: fewer paragraphs than requested clusters
// ============================================================================

#[tokio::test]
async fn degrades_cluster_count_gracefully() {
    let store = Arc::new(clustered_store(&[3]));
    let partitioner = Partitioner::new(
        Arc::clone(&store),
        PartitionConfig { target_domains: 5, ..PartitionConfig::default() },
    );

    let report = partitioner.partition().await.unwrap();
    assert!(report.degraded);
    assert_eq!(report.domains, 3);
    assert_eq!(report.requested_domains, 5);
}

// ============================================================================
// 3. Repartitioning replaces wholesale and bumps the version
// ============================================================================

#[tokio::test]
async fn repartition_replaces_the_previous_snapshot() {
    let store = Arc::new(clustered_store(&[40, 40]));
    let partitioner = Partitioner::new(
        Arc::clone(&store),
        PartitionConfig { target_domains: 2, ..PartitionConfig::default() },
    );

    let first = partitioner.partition().await.unwrap();
    let second = partitioner.partition().await.unwrap();
    assert!(second.version > first.version);

    let snapshot = store.domain_snapshot().await.unwrap().unwrap();
    assert_eq!(snapshot.version, second.version);
    assert_eq!(snapshot.domains.len(), 2);

    let sets = membership_sets(&store).await;
    let counted: usize = sets.iter().map(HashSet::len).sum();
    assert_eq!(counted, 80);
}

// ============================================================================
// 4. Rebalance: bounds restored, then a no-op
// ============================================================================

#[tokio::test]
async fn rebalance_splits_and_merges_until_bounds_hold() {
    let store = Arc::new(clustered_store(&[30, 1]));
    let config = PartitionConfig {
        target_domains: 2,
        min_domain_size: 2,
        max_domain_size: 12,
        ..PartitionConfig::default()
    };
    let partitioner = Partitioner::new(Arc::clone(&store), config);

    partitioner.partition().await.unwrap();

    let report = partitioner.rebalance().await.unwrap();
    assert!(!report.is_noop());
    assert!(report.version.is_some());
    assert!(report.actions.iter().any(|a| matches!(a, RebalanceAction::Split { .. })));
    assert!(report.actions.iter().any(|a| matches!(a, RebalanceAction::Merge { .. })));

    // Every resulting domain is inside the bounds.
    let snapshot = store.domain_snapshot().await.unwrap().unwrap();
    assert_eq!(snapshot.domains.len(), report.domains_after);
    for domain in &snapshot.domains {
        assert!(domain.node_count >= 2, "{} too small", domain.node_count);
        assert!(domain.node_count <= 12, "{} too large", domain.node_count);
    }

    // Nothing lost, nothing duplicated.
    let sets = membership_sets(&store).await;
    let counted: usize = sets.iter().map(HashSet::len).sum();
    assert_eq!(counted, 31);

    // Idempotent: a second pass has nothing to do and leaves the
    // persisted version alone.
    let version_before = store.snapshot_version().await.unwrap();
    let second = partitioner.rebalance().await.unwrap();
    assert!(second.is_noop());
    assert_eq!(second.version, None);
    assert_eq!(store.snapshot_version().await.unwrap(), version_before);
}

// ============================================================================
// 5. Rebalance without a partition is a no-op
// ============================================================================

#[tokio::test]
async fn rebalance_before_any_partition_does_nothing() {
    let store = Arc::new(clustered_store(&[10]));
    let partitioner = Partitioner::new(Arc::clone(&store), PartitionConfig::default());

    let report = partitioner.rebalance().await.unwrap();
    assert!(report.is_noop());
    assert_eq!(report.domains_before, 0);
}

// ============================================================================
// 6. LLM-generated domain descriptors
// ============================================================================

#[tokio::test]
async fn llm_descriptors_name_the_domains() {
    let store = Arc::new(clustered_store(&[25, 25]));
    let llm: Arc<dyn lexgraph::LlmProvider> = Arc::new(common::ScriptedLlm {
        descriptor: Some(lexgraph::DomainDescriptor {
            name: "용도지역 관리".into(),
            description: "용도지역의 지정과 세분에 관한 조항".into(),
        }),
        ..common::ScriptedLlm::default()
    });
    let partitioner = Partitioner::new(
        Arc::clone(&store),
        PartitionConfig { target_domains: 2, ..PartitionConfig::default() },
    )
    .with_llm(llm);

    partitioner.partition().await.unwrap();

    let snapshot = store.domain_snapshot().await.unwrap().unwrap();
    for domain in &snapshot.domains {
        assert_eq!(domain.name, "용도지역 관리");
        assert!(!domain.description.is_empty());
    }
}
