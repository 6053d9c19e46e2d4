//! End-to-end tests for the routing layer: centroid scoring, LLM
//! refinement with timeout fallback, admission floor, and selection width.

mod common;

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use pretty_assertions::assert_eq;

use common::ScriptedLlm;
use lexgraph::config::RoutingConfig;
use lexgraph::model::{Domain, DomainId, DomainSnapshot, Embedding};
use lexgraph::{LlmProvider, Router};

fn snapshot(centroids: Vec<(&str, Vec<f32>)>) -> DomainSnapshot {
    let domains = centroids
        .into_iter()
        .enumerate()
        .map(|(index, (name, centroid))| Domain {
            id: DomainId(index as u64 + 1),
            name: name.to_string(),
            description: format!("{name}에 관한 조항"),
            centroid: Embedding(centroid),
            node_count: 10,
        })
        .collect();
    DomainSnapshot { version: 1, created_at: Utc::now(), domains }
}

fn two_domains() -> DomainSnapshot {
    snapshot(vec![
        ("용도지역", vec![1.0, 0.0, 0.0]),
        ("건축허가", vec![0.0, 1.0, 0.0]),
    ])
}

// ============================================================================
// 1. Vector-only routing picks the nearest centroid
// ============================================================================

#[tokio::test]
async fn routes_to_the_nearest_centroid_without_an_llm() {
    let router = Router::new(RoutingConfig::default());
    let decision = router
        .route("용도지역 질문", &Embedding(vec![0.9, 0.1, 0.0]), &two_domains(), None, false)
        .await
        .unwrap();

    assert_eq!(decision.selected.len(), 1);
    assert_eq!(decision.selected[0].domain_name, "용도지역");
    assert!(decision.selected[0].llm_confidence.is_none());
    assert!(!decision.floor_fallback);
    assert_eq!(decision.scored.len(), 2);
}

// ============================================================================
// 2. Admission floor never empties the selection
// ============================================================================

#[tokio::test]
async fn selects_the_best_domain_even_below_the_floor() {
    let config = RoutingConfig { admission_floor: 0.99, ..RoutingConfig::default() };
    let router = Router::new(config);
    let decision = router
        .route("질문", &Embedding(vec![0.5, 0.5, 0.0]), &two_domains(), None, false)
        .await
        .unwrap();

    assert_eq!(decision.selected.len(), 1);
    assert!(decision.floor_fallback);
}

// ============================================================================
// 3. LLM refinement shifts the combined score
// ============================================================================

#[tokio::test]
async fn llm_confidence_can_overturn_vector_order() {
    // Vector order: 용도지역 0.7, 건축허가 0.6. The LLM is confident only
    // about 건축허가; with 0.5/0.5 weights it wins the combined score.
    let llm: Arc<dyn LlmProvider> = Arc::new(
        ScriptedLlm::default()
            .assessing("용도지역", 0.0, false)
            .assessing("건축허가", 1.0, true),
    );
    let config = RoutingConfig {
        vector_weight: 0.5,
        llm_weight: 0.5,
        refine_top_n: 2,
        ..RoutingConfig::default()
    };
    let router = Router::new(config);

    let query = Embedding(vec![0.7, 0.6, 0.0]);
    let decision = router
        .route("건축허가 관련", &query, &two_domains(), Some(&llm), false)
        .await
        .unwrap();

    assert_eq!(decision.selected[0].domain_name, "건축허가");
    assert_eq!(decision.selected[0].can_answer, Some(true));
    assert!(decision.selected[0].llm_confidence.unwrap() > 0.9);
    assert_eq!(decision.refinement_failures, 0);
}

// ============================================================================
// 4. Refinement timeout falls back to vector-only scoring
// ============================================================================

#[tokio::test]
async fn assess_timeout_falls_back_to_vector_scores() {
    let llm: Arc<dyn LlmProvider> = Arc::new(
        ScriptedLlm::default()
            .assessing("용도지역", 1.0, true)
            .with_delay(Duration::from_millis(500)),
    );
    let config = RoutingConfig {
        assess_timeout_ms: 30,
        refine_top_n: 2,
        ..RoutingConfig::default()
    };
    let router = Router::new(config);

    let query = Embedding(vec![0.9, 0.1, 0.0]);
    let decision = router
        .route("용도지역", &query, &two_domains(), Some(&llm), false)
        .await
        .unwrap();

    // Timeouts are per-domain: the request survives on vector similarity.
    assert_eq!(decision.refinement_failures, 2);
    let top = &decision.selected[0];
    assert_eq!(top.domain_name, "용도지역");
    assert!(top.llm_confidence.is_none());
    assert_eq!(top.combined_score, top.vector_similarity);
}

// ============================================================================
// 5. Assess failure behaves like a timeout
// ============================================================================

#[tokio::test]
async fn assess_failure_degrades_per_domain() {
    let llm: Arc<dyn LlmProvider> =
        Arc::new(ScriptedLlm { fail_assess: true, ..ScriptedLlm::default() });
    let router = Router::new(RoutingConfig { refine_top_n: 2, ..RoutingConfig::default() });

    let decision = router
        .route("질문", &Embedding(vec![0.9, 0.1, 0.0]), &two_domains(), Some(&llm), false)
        .await
        .unwrap();

    assert_eq!(decision.refinement_failures, 2);
    assert!(!decision.selected.is_empty());
}

// ============================================================================
// 6. Collaboration widens the selection
// ============================================================================

#[tokio::test]
async fn collaboration_selects_multiple_domains() {
    let snapshot = snapshot(vec![
        ("용도지역", vec![1.0, 0.0, 0.0]),
        ("건축허가", vec![0.8, 0.6, 0.0]),
        ("도로점용", vec![0.6, 0.8, 0.0]),
    ]);
    let config = RoutingConfig { admission_floor: 0.1, ..RoutingConfig::default() };
    let router = Router::new(config);
    let query = Embedding(vec![0.9, 0.4, 0.0]);

    let single = router.route("질문", &query, &snapshot, None, false).await.unwrap();
    assert_eq!(single.selected.len(), 1);

    let collaborative = router.route("질문", &query, &snapshot, None, true).await.unwrap();
    assert_eq!(collaborative.selected.len(), 3);
    // Best first.
    assert!(
        collaborative.selected[0].combined_score >= collaborative.selected[1].combined_score
    );
}

// ============================================================================
// 7. Empty snapshot is a caller error
// ============================================================================

#[tokio::test]
async fn empty_snapshot_is_rejected() {
    let router = Router::new(RoutingConfig::default());
    let empty = DomainSnapshot { version: 1, created_at: Utc::now(), domains: Vec::new() };

    let result = router.route("질문", &Embedding(vec![1.0, 0.0, 0.0]), &empty, None, false).await;
    assert!(result.is_err());
}
