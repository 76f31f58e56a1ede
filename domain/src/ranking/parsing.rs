//! Extraction of structured data from free-form model output

use crate::anonymize::Label;
use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;

/// Marker that introduces the machine-readable part of a peer evaluation
pub const FINAL_RANKING_MARKER: &str = "FINAL RANKING";

static RESPONSE_LABEL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(?i:response)\s+([A-Z]{1,2})\b").expect("valid response label regex")
});

static NUMBERED_LABEL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^\s*\d+\s*[.)]\s*\**\s*([A-Z]{1,2})\b").expect("valid numbered label regex")
});

static CONFIDENCE_SUFFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\s*\[?\**confidence(?:\s+score)?:?\**\s*(\d+)\s*/\s*10\]?\s*$")
        .expect("valid confidence regex")
});

/// Parse a reviewer's ranking into an ordered list of labels, best first
///
/// Only the text after the last `FINAL RANKING` marker is considered when the
/// marker is present (falling back to the whole text if that section names no
/// label). `Response X` mentions win; otherwise bare labels are read from
/// ranking-shaped lines such as `A > C > B` or `1. A`.
///
/// The result contains each label from `valid_labels` at most once. When at
/// least one valid label was found, the labels the reviewer left out are
/// appended in label order. An empty result means the evaluation is malformed.
pub fn parse_ranking(raw: &str, valid_labels: &[Label]) -> Vec<Label> {
    let valid: HashSet<&Label> = valid_labels.iter().collect();

    let mut found = match final_ranking_section(raw) {
        Some(section) => {
            let from_section = extract_labels(section, &valid);
            if from_section.is_empty() {
                extract_labels(raw, &valid)
            } else {
                from_section
            }
        }
        None => extract_labels(raw, &valid),
    };

    if found.is_empty() {
        return found;
    }

    let mut remaining: Vec<&Label> = valid_labels.iter().filter(|l| !found.contains(l)).collect();
    remaining.sort();
    remaining.dedup();
    found.extend(remaining.into_iter().cloned());
    found
}

/// Text after the last case-insensitive `FINAL RANKING` marker
fn final_ranking_section(raw: &str) -> Option<&str> {
    // ASCII uppercasing keeps byte offsets intact.
    let upper = raw.to_ascii_uppercase();
    upper
        .rfind(FINAL_RANKING_MARKER)
        .map(|idx| &raw[idx + FINAL_RANKING_MARKER.len()..])
}

fn extract_labels(text: &str, valid: &HashSet<&Label>) -> Vec<Label> {
    let explicit = collect_valid(
        RESPONSE_LABEL
            .captures_iter(text)
            .filter_map(|c| c.get(1).map(|m| m.as_str())),
        valid,
    );
    if !explicit.is_empty() {
        return explicit;
    }
    collect_valid(bare_label_tokens(text), valid)
}

/// Bare labels on lines shaped like `A > B > C` or `1. A`
fn bare_label_tokens(text: &str) -> Vec<&str> {
    let mut tokens = Vec::new();
    for line in text.lines() {
        if line.contains('>') {
            for piece in line.split('>') {
                if let Some(word) = piece.split_whitespace().next() {
                    tokens.push(word.trim_matches(|c: char| !c.is_ascii_alphanumeric()));
                }
            }
        } else if let Some(caps) = NUMBERED_LABEL.captures(line)
            && let Some(m) = caps.get(1)
        {
            tokens.push(m.as_str());
        }
    }
    tokens
}

fn collect_valid<'a>(
    tokens: impl IntoIterator<Item = &'a str>,
    valid: &HashSet<&Label>,
) -> Vec<Label> {
    let mut out: Vec<Label> = Vec::new();
    for token in tokens {
        if let Some(label) = Label::parse(token)
            && valid.contains(&label)
            && !out.contains(&label)
        {
            out.push(label);
        }
    }
    out
}

/// Split a trailing `CONFIDENCE: X/10` line off a response
///
/// Returns the cleaned text and the score clamped to `1..=10`. Text without
/// a recognizable confidence suffix is returned unchanged.
pub fn parse_confidence(text: &str) -> (String, Option<u8>) {
    let Some(caps) = CONFIDENCE_SUFFIX.captures(text) else {
        return (text.to_string(), None);
    };
    let (Some(whole), Some(digits)) = (caps.get(0), caps.get(1)) else {
        return (text.to_string(), None);
    };
    let score = digits
        .as_str()
        .parse::<u64>()
        .map(|v| v.clamp(1, 10) as u8)
        .unwrap_or(10);
    (text[..whole.start()].trim().to_string(), Some(score))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(s: &str) -> Vec<Label> {
        s.chars().map(|c| Label::parse(&c.to_string()).unwrap()).collect()
    }

    #[test]
    fn test_arrow_ranking() {
        assert_eq!(parse_ranking("A > B > C", &labels("ABC")), labels("ABC"));
    }

    #[test]
    fn test_unknown_label_dropped_and_missing_appended() {
        assert_eq!(parse_ranking("A > Z > B", &labels("ABC")), labels("ABC"));
    }

    #[test]
    fn test_numbered_final_ranking() {
        let raw = "Response A is thorough but Response C is wrong.\n\n\
                   FINAL RANKING:\n1. Response C\n2. Response A\n3. Response B";
        assert_eq!(parse_ranking(raw, &labels("ABC")), labels("CAB"));
    }

    #[test]
    fn test_only_last_marker_counts() {
        let raw = "I will end with a FINAL RANKING section.\n\
                   FINAL RANKING:\n1. Response B\n2. Response A";
        assert_eq!(parse_ranking(raw, &labels("AB")), labels("BA"));
    }

    #[test]
    fn test_marker_is_case_insensitive() {
        let raw = "final ranking: Response B, Response A";
        assert_eq!(parse_ranking(raw, &labels("AB")), labels("BA"));
    }

    #[test]
    fn test_duplicates_first_occurrence_wins() {
        let raw = "FINAL RANKING:\n1. Response B\n2. Response B\n3. Response A";
        assert_eq!(parse_ranking(raw, &labels("ABC")), labels("BAC"));
    }

    #[test]
    fn test_bare_numbered_labels() {
        let raw = "FINAL RANKING:\n1. **B**\n2. C\n3. A";
        assert_eq!(parse_ranking(raw, &labels("ABC")), labels("BCA"));
    }

    #[test]
    fn test_without_marker_uses_whole_text() {
        let raw = "Response B is the best, then Response A.";
        assert_eq!(parse_ranking(raw, &labels("AB")), labels("BA"));
    }

    #[test]
    fn test_empty_section_falls_back_to_whole_text() {
        let raw = "Response C is clearly best.\nFINAL RANKING: see above";
        assert_eq!(parse_ranking(raw, &labels("ABC")), labels("CAB"));
    }

    #[test]
    fn test_no_valid_label_is_malformed() {
        assert!(parse_ranking("They are all great answers.", &labels("AB")).is_empty());
        assert!(parse_ranking("FINAL RANKING:\n1. Response Q", &labels("AB")).is_empty());
        assert!(parse_ranking("", &labels("AB")).is_empty());
    }

    #[test]
    fn test_lowercase_words_are_not_labels() {
        // "a" in prose must not be read as label A
        let raw = "This is a > b comparison";
        assert!(parse_ranking(raw, &labels("AB")).is_empty());
    }

    #[test]
    fn test_parse_confidence_suffix() {
        let (text, score) = parse_confidence("The answer is 4.\n\nCONFIDENCE: 8/10");
        assert_eq!(text, "The answer is 4.");
        assert_eq!(score, Some(8));
    }

    #[test]
    fn test_parse_confidence_variants() {
        assert_eq!(parse_confidence("x\n**Confidence:** 7/10").1, Some(7));
        assert_eq!(parse_confidence("x\n[CONFIDENCE: 9/10]").1, Some(9));
        assert_eq!(parse_confidence("x\nConfidence Score: 6 / 10  ").1, Some(6));
    }

    #[test]
    fn test_parse_confidence_clamps() {
        assert_eq!(parse_confidence("x\nCONFIDENCE: 0/10").1, Some(1));
        assert_eq!(parse_confidence("x\nCONFIDENCE: 15/10").1, Some(10));
    }

    #[test]
    fn test_parse_confidence_absent() {
        let (text, score) = parse_confidence("No score here. Confidence is high.");
        assert_eq!(text, "No score here. Confidence is high.");
        assert_eq!(score, None);
    }
}
