//! Citation scanner — recognizes explicit statutory references in query text.
//!
//! Queries like `"36조"`, `"제36조의2"`, or `"제36조 제1항"` name a unit
//! directly; the expansion engine force-includes matching paragraphs no
//! matter what the embeddings say. The scanner is a hand-rolled pass over
//! the character stream: a digit run followed by a 조/항/호 marker is a
//! citation token, an optional preceding 제 is decoration.

use crate::model::CitationRef;

/// Scan free text for statutory citations, in order of appearance.
///
/// 항/호 tokens attach to the article cited immediately before them;
/// without a preceding article they are ignored (a bare paragraph number
/// addresses nothing). Duplicates collapse to the first sighting.
pub fn scan(text: &str) -> Vec<CitationRef> {
    let mut citations: Vec<CitationRef> = Vec::new();
    let mut chars = text.char_indices().peekable();

    while let Some(&(_, ch)) = chars.peek() {
        if !ch.is_ascii_digit() {
            chars.next();
            continue;
        }

        // Digit run.
        let mut digits = String::new();
        while let Some(&(_, c)) = chars.peek() {
            if c.is_ascii_digit() {
                digits.push(c);
                chars.next();
            } else {
                break;
            }
        }

        match chars.peek().map(|&(_, c)| c) {
            Some('조') => {
                chars.next();
                let mut article = digits;
                // Sub-numbered article: 제36조의2.
                if let Some(&(_, '의')) = chars.peek() {
                    let mut lookahead = chars.clone();
                    lookahead.next();
                    let mut sub = String::new();
                    while let Some(&(_, c)) = lookahead.peek() {
                        if c.is_ascii_digit() {
                            sub.push(c);
                            lookahead.next();
                        } else {
                            break;
                        }
                    }
                    if !sub.is_empty() {
                        article.push('의');
                        article.push_str(&sub);
                        chars = lookahead;
                    }
                }
                if !citations.iter().any(|c: &CitationRef| c.article == article) {
                    citations.push(CitationRef::article(article));
                }
            }
            Some('항') => {
                chars.next();
                if let (Ok(number), Some(last)) = (digits.parse::<u32>(), citations.last_mut()) {
                    if last.paragraph.is_none() {
                        last.paragraph = Some(number);
                    }
                }
            }
            Some('호') => {
                chars.next();
                if let (Ok(number), Some(last)) = (digits.parse::<u32>(), citations.last_mut()) {
                    if last.item.is_none() {
                        last.item = Some(number);
                    }
                }
            }
            _ => {}
        }
    }

    citations
}
