//! Composite identifier parsing and composition.
//!
//! A `full_id` is the `::`-joined path from the root Law down to a unit,
//! e.g. `국토의 계획 및 이용에 관한 법률(법률)::제4장::제36조::1`. It is the
//! only globally unique key in the corpus and is reconstructible by walking
//! CONTAINS edges from the root. Parsing is pure and total: malformed input
//! degrades to a best-effort partial path, never an error — downstream
//! ranking tolerates missing fields.

use serde::{Deserialize, Serialize};
use super::unit::{LawTier, UnitType};

/// Path separator between hierarchy segments.
pub const SEPARATOR: &str = "::";

// ============================================================================
// UnitPath
// ============================================================================

/// Structural components of a composite identifier.
///
/// Segment text is kept verbatim so `compose` round-trips what `parse`
/// consumed. Slots below the deepest present segment are `None`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct UnitPath {
    pub law_name: String,
    pub chapter: Option<String>,
    pub section: Option<String>,
    pub article: Option<String>,
    pub paragraph: Option<String>,
    pub item: Option<String>,
}

impl UnitPath {
    /// Law tier, classified from the law-name segment.
    pub fn law_tier(&self) -> LawTier {
        LawTier::from_law_name(&self.law_name)
    }

    /// The deepest level this path addresses.
    pub fn unit_type(&self) -> UnitType {
        if self.item.is_some() {
            UnitType::Item
        } else if self.paragraph.is_some() {
            UnitType::Paragraph
        } else if self.article.is_some() {
            UnitType::Article
        } else if self.section.is_some() {
            UnitType::Section
        } else if self.chapter.is_some() {
            UnitType::Chapter
        } else {
            UnitType::Law
        }
    }

    /// Numeric part of the article segment (`제36조` → `36`, `제36조의2` →
    /// `36의2`), if an article is present.
    pub fn article_number(&self) -> Option<String> {
        self.article.as_deref().and_then(segment_number)
    }

    /// Numeric part of the paragraph segment (`제1항` or bare `1` → `1`).
    pub fn paragraph_number(&self) -> Option<String> {
        self.paragraph.as_deref().and_then(segment_number)
    }
}

// ============================================================================
// parse / compose
// ============================================================================

/// Kinds a non-law path segment can take.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SegmentKind {
    Chapter,
    Section,
    Article,
    Paragraph,
    Item,
    /// Bare numeral — slot decided by position (paragraph, then item).
    Numeral,
    Unknown,
}

/// Classify one path segment by its marker suffix.
fn classify_segment(seg: &str) -> SegmentKind {
    if !seg.is_empty() && seg.chars().all(|c| c.is_ascii_digit()) {
        return SegmentKind::Numeral;
    }
    // Marker form: 제<digits><marker>, articles optionally carry a 의<n>
    // sub-number (제36조의2).
    let Some(rest) = seg.strip_prefix('제') else {
        return SegmentKind::Unknown;
    };
    let digits: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return SegmentKind::Unknown;
    }
    let mut after = rest[digits.len()..].chars();
    match after.next() {
        Some('장') => SegmentKind::Chapter,
        Some('절') => SegmentKind::Section,
        Some('조') => SegmentKind::Article,
        Some('항') => SegmentKind::Paragraph,
        Some('호') => SegmentKind::Item,
        _ => SegmentKind::Unknown,
    }
}

/// Numeric part of a segment, marker stripped (`제36조의2` → `36의2`,
/// bare `1` → `1`).
pub fn segment_number(seg: &str) -> Option<String> {
    if seg.chars().all(|c| c.is_ascii_digit()) && !seg.is_empty() {
        return Some(seg.to_string());
    }
    let rest = seg.strip_prefix('제')?;
    let digits: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return None;
    }
    let after = &rest[digits.len()..];
    // Sub-number: 조의2 → keep "36의2".
    if let Some(sub) = after.strip_prefix(['장', '절', '조', '항', '호']) {
        if let Some(sub_digits) = sub.strip_prefix('의') {
            if !sub_digits.is_empty() && sub_digits.chars().all(|c| c.is_ascii_digit()) {
                return Some(format!("{digits}의{sub_digits}"));
            }
        }
    }
    Some(digits)
}

/// Parse a composite identifier into its structural components.
///
/// Best-effort: unrecognizable segments are skipped, trailing empty
/// segments tolerated, and an id with no separator parses as a bare
/// law name.
pub fn parse(full_id: &str) -> UnitPath {
    let mut segments = full_id.split(SEPARATOR);
    let mut path = UnitPath {
        law_name: segments.next().unwrap_or_default().trim().to_string(),
        ..UnitPath::default()
    };

    for seg in segments {
        let seg = seg.trim();
        if seg.is_empty() {
            continue;
        }
        match classify_segment(seg) {
            SegmentKind::Chapter => path.chapter = Some(seg.to_string()),
            SegmentKind::Section => path.section = Some(seg.to_string()),
            SegmentKind::Article => path.article = Some(seg.to_string()),
            SegmentKind::Paragraph => path.paragraph = Some(seg.to_string()),
            SegmentKind::Item => path.item = Some(seg.to_string()),
            SegmentKind::Numeral => {
                // Bare numerals fill the next free slot below article.
                if path.paragraph.is_none() {
                    path.paragraph = Some(seg.to_string());
                } else if path.item.is_none() {
                    path.item = Some(seg.to_string());
                }
            }
            SegmentKind::Unknown => {}
        }
    }

    path
}

/// Compose a path back into its `full_id` string.
///
/// Inverse of `parse` for well-formed identifiers: present slots are
/// joined in hierarchy order with the separator.
pub fn compose(path: &UnitPath) -> String {
    let mut out = path.law_name.clone();
    for seg in [
        path.chapter.as_deref(),
        path.section.as_deref(),
        path.article.as_deref(),
        path.paragraph.as_deref(),
        path.item.as_deref(),
    ]
    .into_iter()
    .flatten()
    {
        out.push_str(SEPARATOR);
        out.push_str(seg);
    }
    out
}

/// Extract a human-readable article citation from an identifier path.
///
/// Finds the first article token and appends any explicit paragraph/item
/// tokens that immediately follow it. A bare-numeral paragraph segment is
/// a path position, not a citation token, and is not appended:
/// `...::제36조::1` cites as `제36조`.
pub fn extract_article_reference(full_id: &str) -> Option<String> {
    let segments: Vec<&str> = full_id.split(SEPARATOR).map(str::trim).collect();
    let article_idx = segments
        .iter()
        .position(|s| classify_segment(s) == SegmentKind::Article)?;

    let mut citation = segments[article_idx].to_string();
    for seg in &segments[article_idx + 1..] {
        match classify_segment(seg) {
            SegmentKind::Paragraph | SegmentKind::Item => {
                citation.push(' ');
                citation.push_str(seg);
            }
            _ => break,
        }
    }
    Some(citation)
}

// ============================================================================
// Citations
// ============================================================================

/// A statutory citation recognized in query text (`제36조`, `36조 2항`,
/// `제36조의2 제1항`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CitationRef {
    /// Article number, sub-number included (`36`, `36의2`).
    pub article: String,
    pub paragraph: Option<u32>,
    pub item: Option<u32>,
}

impl CitationRef {
    pub fn article(article: impl Into<String>) -> Self {
        Self { article: article.into(), paragraph: None, item: None }
    }

    /// Whether a parsed unit path addresses this citation.
    ///
    /// The article number must match exactly; paragraph/item constrain the
    /// match only when the citation specifies them.
    pub fn matches(&self, path: &UnitPath) -> bool {
        if path.article_number().as_deref() != Some(self.article.as_str()) {
            return false;
        }
        if let Some(p) = self.paragraph {
            let Some(actual) = path.paragraph_number() else {
                return false;
            };
            if actual.parse::<u32>().ok() != Some(p) {
                return false;
            }
        }
        if let Some(i) = self.item {
            let Some(actual) = path.item.as_deref().and_then(segment_number) else {
                return false;
            };
            if actual.parse::<u32>().ok() != Some(i) {
                return false;
            }
        }
        true
    }
}

impl std::fmt::Display for CitationRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.article.split_once('의') {
            Some((n, sub)) => write!(f, "제{n}조의{sub}")?,
            None => write!(f, "제{}조", self.article)?,
        }
        if let Some(p) = self.paragraph {
            write!(f, " 제{p}항")?;
        }
        if let Some(i) = self.item {
            write!(f, " 제{i}호")?;
        }
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
