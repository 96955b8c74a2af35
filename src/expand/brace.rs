//! Brace expansion
//!
//! The first expansion stage: `a{b,c}d` → `abd acd`, numeric and character
//! ranges with optional step and zero-padding, nested braces expanded
//! outermost-first. Operates purely on the word's pieces; quoting survives
//! because quoted pieces pass through untouched.

use crate::ast::types::{BraceItem, Word, WordPiece};

/// Expand every brace piece in a word into the cross product of its
/// alternatives. Words without braces come back as a single entry.
pub fn expand_braces(word: &Word) -> Vec<Word> {
    let mut results: Vec<Vec<WordPiece>> = vec![Vec::new()];

    for piece in &word.pieces {
        match piece {
            WordPiece::Brace(brace) => {
                let mut alternatives: Vec<Vec<WordPiece>> = Vec::new();
                for item in &brace.items {
                    match item {
                        BraceItem::Word(inner) => {
                            // Nested braces: expand the alternative itself.
                            for expanded in expand_braces(inner) {
                                alternatives.push(expanded.pieces);
                            }
                        }
                        BraceItem::NumericRange {
                            start,
                            end,
                            step,
                            width,
                        } => {
                            for n in numeric_range(*start, *end, *step) {
                                let text = if *width > 0 {
                                    format_padded(n, *width)
                                } else {
                                    n.to_string()
                                };
                                alternatives.push(vec![WordPiece::Literal(text)]);
                            }
                        }
                        BraceItem::CharRange { start, end, step } => {
                            for c in char_range(*start, *end, *step) {
                                alternatives.push(vec![WordPiece::Literal(c.to_string())]);
                            }
                        }
                    }
                }

                let mut next = Vec::with_capacity(results.len() * alternatives.len());
                for prefix in &results {
                    for alt in &alternatives {
                        let mut combined = prefix.clone();
                        combined.extend(alt.iter().cloned());
                        next.push(combined);
                    }
                }
                results = next;
            }
            other => {
                for r in &mut results {
                    r.push(other.clone());
                }
            }
        }
    }

    results.into_iter().map(|pieces| Word { pieces }).collect()
}

fn numeric_range(start: i64, end: i64, step: i64) -> Vec<i64> {
    let step = step.abs().max(1);
    let mut out = Vec::new();
    if start <= end {
        let mut n = start;
        while n <= end {
            out.push(n);
            n += step;
        }
    } else {
        let mut n = start;
        while n >= end {
            out.push(n);
            n -= step;
        }
    }
    out
}

fn char_range(start: char, end: char, step: i64) -> Vec<char> {
    let step = step.unsigned_abs().max(1) as u32;
    let (a, b) = (start as u32, end as u32);
    let mut out = Vec::new();
    if a <= b {
        let mut n = a;
        while n <= b {
            if let Some(c) = char::from_u32(n) {
                out.push(c);
            }
            n += step;
        }
    } else {
        let mut n = a;
        loop {
            if let Some(c) = char::from_u32(n) {
                out.push(c);
            }
            if n < b + step {
                break;
            }
            n -= step;
        }
    }
    out
}

fn format_padded(n: i64, width: usize) -> String {
    if n < 0 {
        format!("-{:0>width$}", -n, width = width.saturating_sub(1))
    } else {
        format!("{:0>width$}", n, width = width)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::word::parse_word;

    fn expand_to_strings(text: &str) -> Vec<String> {
        let word = parse_word(text).unwrap();
        expand_braces(&word)
            .iter()
            .map(|w| w.as_literal().unwrap_or_else(|| "<non-literal>".into()))
            .collect()
    }

    #[test]
    fn simple_alternation() {
        assert_eq!(expand_to_strings("a{b,c}d"), vec!["abd", "acd"]);
    }

    #[test]
    fn numeric_ranges() {
        assert_eq!(expand_to_strings("{1..5}"), vec!["1", "2", "3", "4", "5"]);
        assert_eq!(expand_to_strings("{1..10..3}"), vec!["1", "4", "7", "10"]);
        assert_eq!(expand_to_strings("{5..1..2}"), vec!["5", "3", "1"]);
    }

    #[test]
    fn padded_range() {
        assert_eq!(expand_to_strings("{01..03}"), vec!["01", "02", "03"]);
    }

    #[test]
    fn char_ranges() {
        assert_eq!(expand_to_strings("{a..e}"), vec!["a", "b", "c", "d", "e"]);
        assert_eq!(expand_to_strings("{c..a}"), vec!["c", "b", "a"]);
    }

    #[test]
    fn nested_braces() {
        assert_eq!(
            expand_to_strings("{a,b{1,2}}"),
            vec!["a", "b1", "b2"]
        );
    }

    #[test]
    fn multiple_braces_cross_product() {
        assert_eq!(
            expand_to_strings("{a,b}{1,2}"),
            vec!["a1", "a2", "b1", "b2"]
        );
    }

    #[test]
    fn word_without_braces_passes_through() {
        assert_eq!(expand_to_strings("plain"), vec!["plain"]);
    }
}
