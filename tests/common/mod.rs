//! Shared test doubles: a deterministic embedding provider and a scripted
//! LLM provider.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use lexgraph::{Assessment, DomainDescriptor, Embedding, EmbeddingProvider, LlmProvider};
use lexgraph::{Error, Result, RetrievalHit};

// ============================================================================
// StaticEmbedder
// ============================================================================

/// Deterministic embedding provider: returns the vector of the first
/// registered key contained in the input text, or a uniform fallback.
pub struct StaticEmbedder {
    dimension: usize,
    entries: Vec<(String, Vec<f32>)>,
}

impl StaticEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self { dimension, entries: Vec::new() }
    }

    pub fn map(mut self, key: &str, vector: Vec<f32>) -> Self {
        assert_eq!(vector.len(), self.dimension, "stub vector has wrong dimension");
        self.entries.push((key.to_string(), vector));
        self
    }
}

#[async_trait]
impl EmbeddingProvider for StaticEmbedder {
    async fn embed(&self, text: &str) -> Result<Embedding> {
        for (key, vector) in &self.entries {
            if text.contains(key.as_str()) {
                return Ok(Embedding(vector.clone()));
            }
        }
        let value = 1.0 / (self.dimension as f32).sqrt();
        Ok(Embedding(vec![value; self.dimension]))
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

// ============================================================================
// ScriptedLlm
// ============================================================================

/// LLM provider with scripted outputs, optional latency, and failure
/// switches.
#[derive(Default)]
pub struct ScriptedLlm {
    /// (description substring, assessment) pairs tried in order.
    pub assessments: Vec<(String, Assessment)>,
    pub default_assessment: Option<Assessment>,
    pub answer: Option<String>,
    pub descriptor: Option<DomainDescriptor>,
    pub delay: Duration,
    pub fail_assess: bool,
    pub fail_synthesize: bool,
    pub assess_calls: AtomicUsize,
    pub synthesize_calls: AtomicUsize,
}

impl ScriptedLlm {
    pub fn answering(answer: &str) -> Self {
        Self { answer: Some(answer.to_string()), ..Self::default() }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn assessing(mut self, description_contains: &str, confidence: f32, can_answer: bool) -> Self {
        self.assessments.push((
            description_contains.to_string(),
            Assessment {
                confidence,
                can_answer,
                reasoning: format!("scripted for '{description_contains}'"),
            },
        ));
        self
    }
}

#[async_trait]
impl LlmProvider for ScriptedLlm {
    async fn assess(&self, domain_description: &str, _query: &str) -> Result<Assessment> {
        self.assess_calls.fetch_add(1, Ordering::Relaxed);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if self.fail_assess {
            return Err(Error::Llm("scripted assess failure".into()));
        }
        for (needle, assessment) in &self.assessments {
            if domain_description.contains(needle.as_str()) {
                return Ok(assessment.clone());
            }
        }
        self.default_assessment
            .clone()
            .ok_or_else(|| Error::Llm("no scripted assessment matched".into()))
    }

    async fn synthesize(&self, _query: &str, evidence: &[RetrievalHit]) -> Result<String> {
        self.synthesize_calls.fetch_add(1, Ordering::Relaxed);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if self.fail_synthesize {
            return Err(Error::Llm("scripted synthesis failure".into()));
        }
        match &self.answer {
            Some(answer) => Ok(answer.clone()),
            None => Ok(format!("{}건의 근거를 종합한 답변", evidence.len())),
        }
    }

    async fn describe_domain(&self, sample_texts: &[String]) -> Result<DomainDescriptor> {
        match &self.descriptor {
            Some(descriptor) => Ok(descriptor.clone()),
            None => Ok(DomainDescriptor {
                name: format!("영역({})", sample_texts.len()),
                description: sample_texts.join(" "),
            }),
        }
    }
}

// ============================================================================
// Vector helpers
// ============================================================================

/// Unit vector along one axis.
pub fn axis(dimension: usize, index: usize) -> Vec<f32> {
    let mut v = vec![0.0; dimension];
    v[index] = 1.0;
    v
}

/// Unit vector with the given cosine similarity to the first axis (2-d).
pub fn toward_x(cosine: f32) -> Vec<f32> {
    vec![cosine, (1.0 - cosine * cosine).sqrt()]
}
