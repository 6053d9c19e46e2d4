//! Lexical unit — a node in the statute hierarchy.

use serde::{Deserialize, Serialize};
use super::Embedding;

/// Level of a unit within the statute hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitType {
    Law,
    Chapter,
    Section,
    Article,
    Paragraph,
    Item,
}

impl UnitType {
    /// Graph node label for this unit type.
    pub fn label(&self) -> &'static str {
        match self {
            UnitType::Law => "Law",
            UnitType::Chapter => "Chapter",
            UnitType::Section => "Section",
            UnitType::Article => "Article",
            UnitType::Paragraph => "Paragraph",
            UnitType::Item => "Item",
        }
    }
}

/// Rank of legal authority for the same subject matter.
///
/// Classified lexically from the law-name segment of an identifier:
/// a name containing `시행령` is a Decree, `시행규칙` a Rule, anything
/// else a Statute. The same rule runs at corpus build time and at
/// enrichment time so identifiers stay self-describing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LawTier {
    Statute,
    Decree,
    Rule,
}

impl LawTier {
    /// Classify a law name by its tier-marker substring.
    pub fn from_law_name(name: &str) -> Self {
        if name.contains("시행규칙") {
            LawTier::Rule
        } else if name.contains("시행령") {
            LawTier::Decree
        } else {
            LawTier::Statute
        }
    }
}

impl std::fmt::Display for LawTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            LawTier::Statute => "statute",
            LawTier::Decree => "decree",
            LawTier::Rule => "rule",
        };
        write!(f, "{s}")
    }
}

/// A node in the statute hierarchy (Law → Chapter → Section → Article →
/// Paragraph → Item).
///
/// `full_id` is the only globally unique key: the `::`-joined path from
/// the root Law down to this unit. `number` is the human-facing label
/// (`제36조`, `1`) and is only unique among siblings. Embeddings are
/// carried by Paragraph units; structural units have none.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LexicalUnit {
    pub unit_type: UnitType,
    pub number: String,
    pub full_id: String,
    pub title: Option<String>,
    pub content: String,
    pub embedding: Option<Embedding>,
    pub law_name: String,
    pub law_tier: LawTier,
}

impl LexicalUnit {
    pub fn new(unit_type: UnitType, number: impl Into<String>, full_id: impl Into<String>) -> Self {
        let full_id = full_id.into();
        let law_name = full_id
            .split(super::identifier::SEPARATOR)
            .next()
            .unwrap_or_default()
            .to_string();
        let law_tier = LawTier::from_law_name(&law_name);
        Self {
            unit_type,
            number: number.into(),
            full_id,
            title: None,
            content: String::new(),
            embedding: None,
            law_name,
            law_tier,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = content.into();
        self
    }

    pub fn with_embedding(mut self, embedding: Embedding) -> Self {
        self.embedding = Some(embedding);
        self
    }

    /// True for the finest units that carry retrievable evidence.
    pub fn is_evidence(&self) -> bool {
        matches!(self.unit_type, UnitType::Paragraph | UnitType::Item)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tier_classification_is_lexical() {
        assert_eq!(
            LawTier::from_law_name("국토의 계획 및 이용에 관한 법률"),
            LawTier::Statute
        );
        assert_eq!(
            LawTier::from_law_name("국토의 계획 및 이용에 관한 법률 시행령"),
            LawTier::Decree
        );
        assert_eq!(
            LawTier::from_law_name("국토의 계획 및 이용에 관한 법률 시행규칙"),
            LawTier::Rule
        );
    }

    #[test]
    fn unit_derives_tier_from_full_id() {
        let unit = LexicalUnit::new(
            UnitType::Paragraph,
            "1",
            "건축법 시행령::제3조::1",
        );
        assert_eq!(unit.law_name, "건축법 시행령");
        assert_eq!(unit.law_tier, LawTier::Decree);
    }
}
