//! Topic domains and the versioned domain-set snapshot.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};
use super::Embedding;

/// Opaque domain identifier, unique within one snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DomainId(pub u64);

impl std::fmt::Display for DomainId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A topic cluster of paragraph units, served by one routing target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Domain {
    pub id: DomainId,
    pub name: String,
    pub description: String,
    /// Mean embedding of member paragraphs.
    pub centroid: Embedding,
    pub node_count: usize,
}

/// An immutable, versioned set of domains.
///
/// Routing and expansion read one snapshot acquired at request start;
/// repartitioning installs a whole new snapshot under a new version rather
/// than mutating domains in place. Version comparison is how a process-local
/// cache detects that a repartition happened.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainSnapshot {
    pub version: u64,
    pub created_at: DateTime<Utc>,
    pub domains: Vec<Domain>,
}

impl DomainSnapshot {
    /// Integrity check run before a snapshot is allowed to serve routing.
    ///
    /// A zero-magnitude centroid or a centroid whose dimension disagrees
    /// with the active embedding provider would produce silently wrong
    /// rankings, so both refuse service instead.
    pub fn validate(&self, expected_dimension: usize) -> Result<()> {
        for domain in &self.domains {
            if domain.centroid.is_zero() {
                return Err(Error::ZeroCentroid { domain: domain.id });
            }
            if domain.centroid.dimension() != expected_dimension {
                return Err(Error::DimensionMismatch {
                    expected: expected_dimension,
                    got: domain.centroid.dimension(),
                    context: format!("centroid of domain {}", domain.id),
                });
            }
        }
        Ok(())
    }

    pub fn domain(&self, id: DomainId) -> Option<&Domain> {
        self.domains.iter().find(|d| d.id == id)
    }

    pub fn is_empty(&self) -> bool {
        self.domains.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(domains: Vec<Domain>) -> DomainSnapshot {
        DomainSnapshot { version: 1, created_at: Utc::now(), domains }
    }

    #[test]
    fn zero_centroid_fails_validation() {
        let snap = snapshot(vec![Domain {
            id: DomainId(1),
            name: "빈 영역".into(),
            description: String::new(),
            centroid: Embedding(vec![0.0, 0.0]),
            node_count: 0,
        }]);
        assert!(matches!(
            snap.validate(2),
            Err(Error::ZeroCentroid { domain: DomainId(1) })
        ));
    }

    #[test]
    fn dimension_mismatch_fails_validation() {
        let snap = snapshot(vec![Domain {
            id: DomainId(1),
            name: "영역".into(),
            description: String::new(),
            centroid: Embedding(vec![1.0, 0.0, 0.0]),
            node_count: 3,
        }]);
        assert!(snap.validate(2).is_err());
        assert!(snap.validate(3).is_ok());
    }
}
