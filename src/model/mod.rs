//! # Statute Corpus Model
//!
//! Pure DTOs that define the statute hierarchy, identifiers, embeddings,
//! domains, and result records. These types cross every boundary:
//! store ↔ expansion ↔ routing ↔ aggregation ↔ caller.
//!
//! Design rule: this module is pure data — no I/O, no state, no async.

pub mod unit;
pub mod identifier;
pub mod embedding;
pub mod domain;
pub mod hit;

pub use unit::{LexicalUnit, UnitType, LawTier};
pub use identifier::{UnitPath, CitationRef, SEPARATOR};
pub use embedding::Embedding;
pub use domain::{Domain, DomainId, DomainSnapshot};
pub use hit::{RetrievalHit, Stage, sort_ranked};
