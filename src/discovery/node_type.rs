//! Heading classification (§4.3): map a heading's text to a `NodeType`,
//! whole-word so "PARTIES"/"PARTY"/"DEPARTMENT" never match `PART`.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::store::NodeType;

// Checked in priority order (DIVISION > PART > TITLE > CHAPTER > ARTICLE):
// a heading like "PART 1 DIVISION OF PROPERTY" is a PART, not a DIVISION,
// because the legislature's own headings always lead with the node's own
// type word.
const CANDIDATES: &[(NodeType, &str)] = &[
    (NodeType::Division, r"\bDIVISION\b"),
    (NodeType::Part, r"\bPART\b"),
    (NodeType::Title, r"\bTITLE\b"),
    (NodeType::Chapter, r"\bCHAPTER\b"),
    (NodeType::Article, r"\bARTICLE\b"),
];

static PATTERNS: Lazy<Vec<(NodeType, Regex)>> = Lazy::new(|| {
    CANDIDATES
        .iter()
        .map(|(node_type, pattern)| (*node_type, Regex::new(&format!("(?i){pattern}")).unwrap()))
        .collect()
});

/// Classify a heading by its leading node-type word, or `None` if it
/// matches none of them (including plain section-number headings, which
/// the caller checks separately via the section-identifier grammar).
#[must_use]
pub fn classify_heading(text: &str) -> Option<NodeType> {
    let leading_word = text.split_whitespace().next()?;
    PATTERNS
        .iter()
        .find(|(_, re)| re.is_match(leading_word))
        .map(|(node_type, _)| *node_type)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_by_leading_word() {
        assert_eq!(classify_heading("DIVISION 1. GENERAL PROVISIONS"), Some(NodeType::Division));
        assert_eq!(classify_heading("PART 2. CIVIL RIGHTS"), Some(NodeType::Part));
        assert_eq!(classify_heading("TITLE 3. CONTRACTS"), Some(NodeType::Title));
        assert_eq!(classify_heading("CHAPTER 4. REMEDIES"), Some(NodeType::Chapter));
        assert_eq!(classify_heading("ARTICLE 5. DEFINITIONS"), Some(NodeType::Article));
    }

    #[test]
    fn does_not_false_positive_on_substrings() {
        assert_eq!(classify_heading("PARTIES TO THE ACTION"), None);
        assert_eq!(classify_heading("DEPARTMENT OF JUSTICE"), None);
    }

    #[test]
    fn rejects_non_heading_text() {
        assert_eq!(classify_heading("100. Definitions"), None);
        assert_eq!(classify_heading(""), None);
    }
}
