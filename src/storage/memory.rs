//! In-memory graph store.
//!
//! This is the reference implementation of `GraphStore`. It keeps the
//! statute graph in HashMaps protected by RwLock, with adjacency kept per
//! relationship type.
//!
//! ## Limitations
//!
//! - **No native vector index**: seed search uses the trait's brute-force
//!   scan. Fine for corpora in the tens of thousands of paragraphs.
//! - **No persistence**: the graph lives and dies with the process.
//!
//! Use this store for:
//! - Testing the expansion, partitioning, and routing layers
//! - Embedding the engine in applications that don't need a graph server
//! - Validating corpus ingestion before loading a remote property graph

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use hashbrown::HashMap;
use parking_lot::{Mutex, RwLock};

use crate::model::{
    CitationRef, Domain, DomainId, DomainSnapshot, Embedding, LawTier, LexicalUnit, SEPARATOR,
    UnitType, identifier,
};
use crate::provider::EmbeddingProvider;
use crate::{Error, Result};
use super::{CorpusStats, GraphStore, Neighbor, RelationKind, StoreCapabilities};

// ============================================================================
// MemoryStore
// ============================================================================

/// In-memory statute graph.
pub struct MemoryStore {
    inner: Arc<MemoryInner>,
}

struct MemoryInner {
    /// full_id → unit
    units: RwLock<HashMap<String, LexicalUnit>>,
    /// CONTAINS: parent full_id → ordered child full_ids
    children: RwLock<HashMap<String, Vec<String>>>,
    /// CONTAINS inverse: child full_id → parent full_id
    parent: RwLock<HashMap<String, String>>,
    /// IMPLEMENTS adjacency, both directions
    implements: RwLock<HashMap<String, Vec<String>>>,
    /// (src, dst) → relationship embedding; looked up in either order
    edge_embeddings: RwLock<HashMap<(String, String), Embedding>>,
    domain_state: RwLock<DomainState>,
    /// Serializes snapshot replacement against itself.
    writer: Mutex<()>,
    next_version: AtomicU64,
    vector_dimension: RwLock<Option<usize>>,
}

#[derive(Default)]
struct DomainState {
    snapshot: Option<DomainSnapshot>,
    /// paragraph full_id → domain
    membership: HashMap<String, DomainId>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(MemoryInner {
                units: RwLock::new(HashMap::new()),
                children: RwLock::new(HashMap::new()),
                parent: RwLock::new(HashMap::new()),
                implements: RwLock::new(HashMap::new()),
                edge_embeddings: RwLock::new(HashMap::new()),
                domain_state: RwLock::new(DomainState::default()),
                writer: Mutex::new(()),
                next_version: AtomicU64::new(0),
                vector_dimension: RwLock::new(None),
            }),
        }
    }

    /// Pin the vector index dimension up front instead of inferring it
    /// from the first loaded embedding.
    pub fn with_dimension(dimension: usize) -> Self {
        let store = Self::new();
        *store.inner.vector_dimension.write() = Some(dimension);
        store
    }

    /// Load a built corpus into the store.
    ///
    /// Every embedding must agree with the store's vector dimension; the
    /// first embedding seen pins it when none was configured.
    pub fn load(&self, corpus: Corpus) -> Result<()> {
        for unit in &corpus.units {
            if let Some(embedding) = &unit.embedding {
                self.check_dimension(embedding, &unit.full_id)?;
            }
        }
        for ((src, dst), embedding) in &corpus.edge_embeddings {
            self.check_dimension(embedding, &format!("{src} → {dst}"))?;
        }

        let mut units = self.inner.units.write();
        let mut children = self.inner.children.write();
        let mut parent = self.inner.parent.write();
        let mut implements = self.inner.implements.write();
        let mut edge_embeddings = self.inner.edge_embeddings.write();

        for unit in corpus.units {
            units.insert(unit.full_id.clone(), unit);
        }
        for (p, c) in corpus.contains {
            if !units.contains_key(&p) || !units.contains_key(&c) {
                return Err(Error::Store(format!("CONTAINS edge references missing unit: {p} → {c}")));
            }
            let siblings = children.entry(p.clone()).or_default();
            if !siblings.contains(&c) {
                siblings.push(c.clone());
            }
            parent.insert(c, p);
        }
        for (a, b) in corpus.implements {
            if !units.contains_key(&a) || !units.contains_key(&b) {
                return Err(Error::Store(format!("IMPLEMENTS edge references missing unit: {a} → {b}")));
            }
            let fwd = implements.entry(a.clone()).or_default();
            if !fwd.contains(&b) {
                fwd.push(b.clone());
            }
            let rev = implements.entry(b.clone()).or_default();
            if !rev.contains(&a) {
                rev.push(a);
            }
        }
        for (key, embedding) in corpus.edge_embeddings {
            edge_embeddings.insert(key, embedding);
        }

        Ok(())
    }

    fn check_dimension(&self, embedding: &Embedding, context: &str) -> Result<()> {
        let mut dim = self.inner.vector_dimension.write();
        match *dim {
            Some(expected) if expected != embedding.dimension() => Err(Error::DimensionMismatch {
                expected,
                got: embedding.dimension(),
                context: context.to_string(),
            }),
            Some(_) => Ok(()),
            None => {
                *dim = Some(embedding.dimension());
                Ok(())
            }
        }
    }

    fn edge_embedding(&self, a: &str, b: &str) -> Option<Embedding> {
        let edges = self.inner.edge_embeddings.read();
        edges
            .get(&(a.to_string(), b.to_string()))
            .or_else(|| edges.get(&(b.to_string(), a.to_string())))
            .cloned()
    }

    fn neighbor(&self, unit: LexicalUnit, relation: RelationKind, from: &str) -> Neighbor {
        let relationship_embedding = self.edge_embedding(from, &unit.full_id);
        Neighbor { unit, relation, relationship_embedding }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// GraphStore impl
// ============================================================================

#[async_trait]
impl GraphStore for MemoryStore {
    async fn connect(&self) -> Result<()> {
        Ok(())
    }

    async fn disconnect(&self) -> Result<()> {
        Ok(())
    }

    async fn unit_by_id(&self, full_id: &str) -> Result<Option<LexicalUnit>> {
        Ok(self.inner.units.read().get(full_id).cloned())
    }

    async fn embedded_paragraphs(&self, domain: Option<DomainId>) -> Result<Vec<LexicalUnit>> {
        let units = self.inner.units.read();
        let state = self.inner.domain_state.read();
        let mut result: Vec<LexicalUnit> = units
            .values()
            .filter(|u| u.unit_type == UnitType::Paragraph && u.embedding.is_some())
            .filter(|u| match domain {
                Some(d) => state.membership.get(&u.full_id) == Some(&d),
                None => true,
            })
            .cloned()
            .collect();
        // HashMap iteration order is arbitrary; keep output deterministic.
        result.sort_by(|a, b| a.full_id.cmp(&b.full_id));
        Ok(result)
    }

    async fn neighborhood(&self, full_id: &str) -> Result<Vec<Neighbor>> {
        let unit = self
            .inner
            .units
            .read()
            .get(full_id)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("unit {full_id}")))?;

        let units = self.inner.units.read();
        let children = self.inner.children.read();
        let parent = self.inner.parent.read();
        let implements = self.inner.implements.read();

        let mut neighbors = Vec::new();
        match unit.unit_type {
            UnitType::Paragraph | UnitType::Item => {
                if let Some(parent_id) = parent.get(full_id) {
                    if let Some(parent_unit) = units.get(parent_id) {
                        neighbors.push(self.neighbor(
                            parent_unit.clone(),
                            RelationKind::Contains,
                            full_id,
                        ));
                    }
                    // Siblings under the same article.
                    for sibling_id in children.get(parent_id).into_iter().flatten() {
                        if sibling_id == full_id {
                            continue;
                        }
                        if let Some(sibling) = units.get(sibling_id) {
                            neighbors.push(self.neighbor(
                                sibling.clone(),
                                RelationKind::Contains,
                                parent_id,
                            ));
                        }
                    }
                    // Cross-tier counterpart articles of the parent.
                    for counterpart_id in implements.get(parent_id).into_iter().flatten() {
                        if let Some(counterpart) = units.get(counterpart_id) {
                            neighbors.push(self.neighbor(
                                counterpart.clone(),
                                RelationKind::Implements,
                                parent_id,
                            ));
                        }
                    }
                }
            }
            UnitType::Article => {
                for child_id in children.get(full_id).into_iter().flatten() {
                    if let Some(child) = units.get(child_id) {
                        neighbors.push(self.neighbor(
                            child.clone(),
                            RelationKind::Contains,
                            full_id,
                        ));
                    }
                }
                for counterpart_id in implements.get(full_id).into_iter().flatten() {
                    if let Some(counterpart) = units.get(counterpart_id) {
                        neighbors.push(self.neighbor(
                            counterpart.clone(),
                            RelationKind::Implements,
                            full_id,
                        ));
                    }
                }
            }
            UnitType::Law | UnitType::Chapter | UnitType::Section => {
                for child_id in children.get(full_id).into_iter().flatten() {
                    if let Some(child) = units.get(child_id) {
                        neighbors.push(self.neighbor(
                            child.clone(),
                            RelationKind::Contains,
                            full_id,
                        ));
                    }
                }
            }
        }

        Ok(neighbors)
    }

    async fn paragraphs_by_citation(&self, citation: &CitationRef) -> Result<Vec<LexicalUnit>> {
        let units = self.inner.units.read();
        let mut matches: Vec<LexicalUnit> = units
            .values()
            .filter(|u| u.unit_type == UnitType::Paragraph)
            .filter(|u| citation.matches(&identifier::parse(&u.full_id)))
            .cloned()
            .collect();
        matches.sort_by(|a, b| a.full_id.cmp(&b.full_id));
        Ok(matches)
    }

    async fn domain_snapshot(&self) -> Result<Option<DomainSnapshot>> {
        Ok(self.inner.domain_state.read().snapshot.clone())
    }

    async fn snapshot_version(&self) -> Result<Option<u64>> {
        Ok(self.inner.domain_state.read().snapshot.as_ref().map(|s| s.version))
    }

    async fn replace_domains(
        &self,
        domains: Vec<Domain>,
        memberships: Vec<(String, DomainId)>,
    ) -> Result<DomainSnapshot> {
        for (full_id, domain_id) in &memberships {
            if !domains.iter().any(|d| d.id == *domain_id) {
                return Err(Error::Store(format!(
                    "membership of {full_id} references unknown domain {domain_id}"
                )));
            }
        }

        let _writer = self.inner.writer.lock();
        let version = self.inner.next_version.fetch_add(1, Ordering::Relaxed) + 1;
        let snapshot = DomainSnapshot {
            version,
            created_at: Utc::now(),
            domains,
        };

        // One write-lock scope: readers see the old state or the new one.
        let mut state = self.inner.domain_state.write();
        state.snapshot = Some(snapshot.clone());
        state.membership = memberships.into_iter().collect();

        Ok(snapshot)
    }

    async fn stats(&self) -> Result<CorpusStats> {
        let units = self.inner.units.read();
        let children = self.inner.children.read();
        let implements = self.inner.implements.read();
        let state = self.inner.domain_state.read();

        let contains_edges: usize = children.values().map(Vec::len).sum();
        // IMPLEMENTS adjacency holds both directions.
        let implements_edges: usize = implements.values().map(Vec::len).sum::<usize>() / 2;

        let mut tiers: Vec<LawTier> = units.values().map(|u| u.law_tier).collect();
        tiers.sort_by_key(|t| *t as u8);
        tiers.dedup();

        Ok(CorpusStats {
            units: units.len(),
            relationships: contains_edges + implements_edges + state.membership.len(),
            embedded_paragraphs: units
                .values()
                .filter(|u| u.unit_type == UnitType::Paragraph && u.embedding.is_some())
                .count(),
            domain_count: state.snapshot.as_ref().map_or(0, |s| s.domains.len()),
            tiers,
        })
    }

    fn capabilities(&self) -> StoreCapabilities {
        StoreCapabilities {
            native_vector_index: false,
            vector_dimension: *self.inner.vector_dimension.read(),
            supports_raw_queries: false,
        }
    }
}

// ============================================================================
// CorpusBuilder
// ============================================================================

/// Output of a [`CorpusBuilder`], ready for [`MemoryStore::load`].
#[derive(Debug, Default)]
pub struct Corpus {
    pub units: Vec<LexicalUnit>,
    pub contains: Vec<(String, String)>,
    pub implements: Vec<(String, String)>,
    pub edge_embeddings: Vec<((String, String), Embedding)>,
}

/// Fluent corpus ingestion.
///
/// Composes `full_id`s at write time with the same `::` convention the
/// parser reads back, and wires CONTAINS edges as the hierarchy is
/// declared. A cursor tracks the current law/chapter/section/article so
/// units nest under the most recent ancestor.
///
/// ```
/// use lexgraph::storage::CorpusBuilder;
///
/// let mut corpus = CorpusBuilder::new();
/// corpus
///     .law("국토의 계획 및 이용에 관한 법률(법률)")
///     .chapter("제4장", "용도지역·용도지구")
///     .article("제36조", "용도지역의 지정")
///     .paragraph("1", "국토교통부장관은 용도지역의 지정을 도시·군관리계획으로 결정한다.");
/// let built = corpus.finish();
/// assert_eq!(built.units.len(), 4);
/// ```
#[derive(Debug, Default)]
pub struct CorpusBuilder {
    corpus: Corpus,
    current_law: Option<String>,
    current_chapter: Option<String>,
    current_section: Option<String>,
    current_article: Option<String>,
}

impl CorpusBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new law. Tier is classified from the name, as everywhere.
    pub fn law(&mut self, name: &str) -> &mut Self {
        let unit = LexicalUnit::new(UnitType::Law, name, name);
        self.corpus.units.push(unit);
        self.current_law = Some(name.to_string());
        self.current_chapter = None;
        self.current_section = None;
        self.current_article = None;
        self
    }

    pub fn chapter(&mut self, number: &str, title: &str) -> &mut Self {
        let parent = self.current_law.clone().expect("chapter() before law()");
        let full_id = format!("{parent}{SEPARATOR}{number}");
        self.corpus
            .units
            .push(LexicalUnit::new(UnitType::Chapter, number, &full_id).with_title(title));
        self.corpus.contains.push((parent, full_id.clone()));
        self.current_chapter = Some(full_id);
        self.current_section = None;
        self.current_article = None;
        self
    }

    pub fn section(&mut self, number: &str, title: &str) -> &mut Self {
        let parent = self
            .current_chapter
            .clone()
            .or_else(|| self.current_law.clone())
            .expect("section() before law()");
        let full_id = format!("{parent}{SEPARATOR}{number}");
        self.corpus
            .units
            .push(LexicalUnit::new(UnitType::Section, number, &full_id).with_title(title));
        self.corpus.contains.push((parent, full_id.clone()));
        self.current_section = Some(full_id);
        self.current_article = None;
        self
    }

    pub fn article(&mut self, number: &str, title: &str) -> &mut Self {
        let parent = self
            .current_section
            .clone()
            .or_else(|| self.current_chapter.clone())
            .or_else(|| self.current_law.clone())
            .expect("article() before law()");
        let full_id = format!("{parent}{SEPARATOR}{number}");
        self.corpus
            .units
            .push(LexicalUnit::new(UnitType::Article, number, &full_id).with_title(title));
        self.corpus.contains.push((parent, full_id.clone()));
        self.current_article = Some(full_id);
        self
    }

    pub fn paragraph(&mut self, number: &str, content: &str) -> &mut Self {
        self.push_paragraph(number, content, None)
    }

    /// Paragraph with a precomputed embedding.
    pub fn embedded_paragraph(
        &mut self,
        number: &str,
        content: &str,
        embedding: impl Into<Embedding>,
    ) -> &mut Self {
        self.push_paragraph(number, content, Some(embedding.into()))
    }

    fn push_paragraph(
        &mut self,
        number: &str,
        content: &str,
        embedding: Option<Embedding>,
    ) -> &mut Self {
        let parent = self.current_article.clone().expect("paragraph() before article()");
        let full_id = format!("{parent}{SEPARATOR}{number}");
        let mut unit =
            LexicalUnit::new(UnitType::Paragraph, number, &full_id).with_content(content);
        unit.embedding = embedding;
        self.corpus.units.push(unit);
        self.corpus.contains.push((parent, full_id));
        self
    }

    /// Link a statute article to the decree/rule article elaborating it.
    pub fn link_implements(&mut self, upper: &str, lower: &str) -> &mut Self {
        self.corpus.implements.push((upper.to_string(), lower.to_string()));
        self
    }

    /// Attach a relationship embedding to an edge.
    pub fn relationship_embedding(
        &mut self,
        src: &str,
        dst: &str,
        embedding: impl Into<Embedding>,
    ) -> &mut Self {
        self.corpus
            .edge_embeddings
            .push(((src.to_string(), dst.to_string()), embedding.into()));
        self
    }

    /// Embed every paragraph that does not carry a vector yet.
    pub async fn embed_units(&mut self, provider: &dyn EmbeddingProvider) -> Result<&mut Self> {
        for unit in &mut self.corpus.units {
            if unit.unit_type == UnitType::Paragraph && unit.embedding.is_none() {
                unit.embedding = Some(provider.embed(&unit.content).await?);
            }
        }
        Ok(self)
    }

    /// Compute relationship embeddings for every edge that lacks one.
    ///
    /// The edge vector embeds the combined source/target text (parent
    /// title + child content), which is what expansion scores against the
    /// query.
    pub async fn embed_relationships(
        &mut self,
        provider: &dyn EmbeddingProvider,
    ) -> Result<&mut Self> {
        let mut texts: HashMap<String, String> = HashMap::new();
        for unit in &self.corpus.units {
            let text = match (&unit.title, unit.content.is_empty()) {
                (Some(title), false) => format!("{title} {}", unit.content),
                (Some(title), true) => title.clone(),
                (None, _) => unit.content.clone(),
            };
            texts.insert(unit.full_id.clone(), text);
        }

        let existing: Vec<(String, String)> = self
            .corpus
            .edge_embeddings
            .iter()
            .map(|(k, _)| k.clone())
            .collect();
        let edges: Vec<(String, String)> = self
            .corpus
            .contains
            .iter()
            .chain(self.corpus.implements.iter())
            .filter(|e| !existing.contains(*e))
            .cloned()
            .collect();

        for (src, dst) in edges {
            let combined = format!(
                "{} {}",
                texts.get(&src).map(String::as_str).unwrap_or_default(),
                texts.get(&dst).map(String::as_str).unwrap_or_default(),
            );
            let embedding = provider.embed(combined.trim()).await?;
            self.corpus.edge_embeddings.push(((src, dst), embedding));
        }
        Ok(self)
    }

    pub fn finish(self) -> Corpus {
        self.corpus
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Stage;

    fn small_corpus() -> Corpus {
        let mut b = CorpusBuilder::new();
        b.law("국토의 계획 및 이용에 관한 법률(법률)")
            .chapter("제4장", "용도지역·용도지구")
            .article("제36조", "용도지역의 지정")
            .embedded_paragraph("1", "용도지역의 지정은 도시·군관리계획으로 결정한다.", vec![1.0, 0.0, 0.0])
            .embedded_paragraph("2", "용도지역의 세분은 대통령령으로 정한다.", vec![0.9, 0.1, 0.0]);
        b.law("국토의 계획 및 이용에 관한 법률 시행령")
            .article("제30조", "용도지역의 세분")
            .embedded_paragraph("1", "주거지역은 전용·일반·준주거지역으로 세분한다.", vec![0.8, 0.2, 0.0]);
        b.link_implements(
            "국토의 계획 및 이용에 관한 법률(법률)::제4장::제36조",
            "국토의 계획 및 이용에 관한 법률 시행령::제30조",
        );
        b.finish()
    }

    #[tokio::test]
    async fn load_and_look_up_by_full_id() {
        let store = MemoryStore::new();
        store.load(small_corpus()).unwrap();

        let unit = store
            .unit_by_id("국토의 계획 및 이용에 관한 법률(법률)::제4장::제36조::1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(unit.unit_type, UnitType::Paragraph);
        assert_eq!(unit.law_tier, LawTier::Statute);
    }

    #[tokio::test]
    async fn paragraph_neighborhood_spans_parent_siblings_and_counterparts() {
        let store = MemoryStore::new();
        store.load(small_corpus()).unwrap();

        let neighbors = store
            .neighborhood("국토의 계획 및 이용에 관한 법률(법률)::제4장::제36조::1")
            .await
            .unwrap();

        let parents: Vec<_> = neighbors
            .iter()
            .filter(|n| n.unit.unit_type == UnitType::Article && n.relation == RelationKind::Contains)
            .collect();
        assert_eq!(parents.len(), 1);

        let siblings: Vec<_> = neighbors
            .iter()
            .filter(|n| n.unit.unit_type == UnitType::Paragraph)
            .collect();
        assert_eq!(siblings.len(), 1);
        assert!(siblings[0].unit.full_id.ends_with("제36조::2"));

        let counterparts: Vec<_> = neighbors
            .iter()
            .filter(|n| n.relation == RelationKind::Implements)
            .collect();
        assert_eq!(counterparts.len(), 1);
        assert_eq!(counterparts[0].unit.law_tier, LawTier::Decree);
    }

    #[tokio::test]
    async fn citation_lookup_finds_paragraphs() {
        let store = MemoryStore::new();
        store.load(small_corpus()).unwrap();

        let hits = store
            .paragraphs_by_citation(&CitationRef::article("36"))
            .await
            .unwrap();
        assert_eq!(hits.len(), 2);

        let hits = store
            .paragraphs_by_citation(&CitationRef {
                article: "36".into(),
                paragraph: Some(2),
                item: None,
            })
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert!(hits[0].full_id.ends_with("제36조::2"));

        let hits = store
            .paragraphs_by_citation(&CitationRef::article("99"))
            .await
            .unwrap();
        assert!(hits.is_empty());
    }

    #[tokio::test]
    async fn vector_search_orders_by_similarity() {
        let store = MemoryStore::new();
        store.load(small_corpus()).unwrap();

        let results = store
            .vector_search(&Embedding(vec![1.0, 0.0, 0.0]), 2, None)
            .await
            .unwrap();
        assert_eq!(results.len(), 2);
        assert!(results[0].similarity >= results[1].similarity);
        assert!(results[0].unit.full_id.ends_with("제36조::1"));
    }

    #[tokio::test]
    async fn replace_domains_is_atomic_and_versioned() {
        let store = MemoryStore::new();
        store.load(small_corpus()).unwrap();

        assert_eq!(store.snapshot_version().await.unwrap(), None);

        let domain = Domain {
            id: DomainId(1),
            name: "용도지역".into(),
            description: "용도지역의 지정과 세분".into(),
            centroid: Embedding(vec![0.9, 0.1, 0.0]),
            node_count: 3,
        };
        let memberships = vec![
            ("국토의 계획 및 이용에 관한 법률(법률)::제4장::제36조::1".to_string(), DomainId(1)),
            ("국토의 계획 및 이용에 관한 법률(법률)::제4장::제36조::2".to_string(), DomainId(1)),
            ("국토의 계획 및 이용에 관한 법률 시행령::제30조::1".to_string(), DomainId(1)),
        ];
        let snapshot = store.replace_domains(vec![domain], memberships).await.unwrap();
        assert_eq!(snapshot.version, 1);

        let scoped = store.embedded_paragraphs(Some(DomainId(1))).await.unwrap();
        assert_eq!(scoped.len(), 3);

        // Wholesale replacement: old memberships do not linger.
        let domain2 = Domain {
            id: DomainId(7),
            name: "신규".into(),
            description: String::new(),
            centroid: Embedding(vec![0.5, 0.5, 0.0]),
            node_count: 1,
        };
        let snapshot = store
            .replace_domains(
                vec![domain2],
                vec![(
                    "국토의 계획 및 이용에 관한 법률 시행령::제30조::1".to_string(),
                    DomainId(7),
                )],
            )
            .await
            .unwrap();
        assert_eq!(snapshot.version, 2);
        assert!(store.embedded_paragraphs(Some(DomainId(1))).await.unwrap().is_empty());
        assert_eq!(store.embedded_paragraphs(Some(DomainId(7))).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn membership_must_reference_a_known_domain() {
        let store = MemoryStore::new();
        store.load(small_corpus()).unwrap();

        let result = store
            .replace_domains(vec![], vec![("어떤 문단".to_string(), DomainId(3))])
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn dimension_mismatch_rejected_at_load() {
        let store = MemoryStore::with_dimension(3);
        let mut b = CorpusBuilder::new();
        b.law("건축법")
            .article("제1조", "목적")
            .embedded_paragraph("1", "이 법은 …", vec![1.0, 0.0]);
        assert!(matches!(
            store.load(b.finish()),
            Err(Error::DimensionMismatch { expected: 3, got: 2, .. })
        ));
    }

    #[tokio::test]
    async fn stats_count_the_graph() {
        let store = MemoryStore::new();
        store.load(small_corpus()).unwrap();

        let stats = store.stats().await.unwrap();
        assert_eq!(stats.units, 8);
        assert_eq!(stats.embedded_paragraphs, 3);
        // 6 CONTAINS + 1 IMPLEMENTS
        assert_eq!(stats.relationships, 7);
        assert_eq!(stats.tiers, vec![LawTier::Statute, LawTier::Decree]);
    }

    #[test]
    fn hit_stage_strings_are_stable() {
        // These tags are part of the API surface.
        assert_eq!(Stage::VectorSeed.as_str(), "vector_seed");
        assert_eq!(Stage::RelationshipExpansion.as_str(), "relationship_expansion");
        assert_eq!(Stage::ExactMatch.as_str(), "exact_match");
    }
}
