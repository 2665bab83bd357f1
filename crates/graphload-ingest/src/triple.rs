//! Triple lines.
//!
//! Input lines are whitespace-delimited quads
//! `subject predicate object tail`, where the tail is usually the closing `.`
//! and is ignored. Lines whose first non-blank character is `#` are comments.

use serde::Serialize;

/// Token count of a well-formed data line.
pub const TRIPLE_TOKENS: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TripleLine {
    pub subject: String,
    pub predicate: String,
    pub object: String,
    pub tail: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedLine {
    Blank,
    Comment,
    Triple(TripleLine),
    Malformed { reason: String },
}

impl ParsedLine {
    pub fn parse(line: &str) -> Self {
        if line.trim_start().starts_with('#') {
            return ParsedLine::Comment;
        }
        let tokens: Vec<&str> = line.split_whitespace().collect();
        match tokens.as_slice() {
            [] => ParsedLine::Blank,
            [subject, predicate, object, tail] => ParsedLine::Triple(TripleLine {
                subject: subject.to_string(),
                predicate: predicate.to_string(),
                object: object.to_string(),
                tail: tail.to_string(),
            }),
            other => ParsedLine::Malformed {
                reason: format!("expected {TRIPLE_TOKENS} tokens, found {}", other.len()),
            },
        }
    }

    /// Data lines are the ones the importer has to account for.
    pub fn is_data(&self) -> bool {
        matches!(self, ParsedLine::Triple(_) | ParsedLine::Malformed { .. })
    }
}

/// Which end of a triple an identifier came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Source,
    Target,
}

impl Role {
    pub fn label(&self) -> &'static str {
        match self {
            Role::Source => "source",
            Role::Target => "target",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_quad() {
        let parsed = ParsedLine::parse("<http://x/A> <http://x/knows>\t<http://x/B> .");
        assert_eq!(
            parsed,
            ParsedLine::Triple(TripleLine {
                subject: "<http://x/A>".to_string(),
                predicate: "<http://x/knows>".to_string(),
                object: "<http://x/B>".to_string(),
                tail: ".".to_string(),
            })
        );
        assert!(parsed.is_data());
    }

    #[test]
    fn comments_and_blanks_are_not_data() {
        assert_eq!(ParsedLine::parse("# started 2014-07-01"), ParsedLine::Comment);
        assert_eq!(ParsedLine::parse("#"), ParsedLine::Comment);
        assert_eq!(ParsedLine::parse("  # note"), ParsedLine::Comment);
        assert_eq!(ParsedLine::parse("\t# a b c d e"), ParsedLine::Comment);
        assert_eq!(ParsedLine::parse("   "), ParsedLine::Blank);
        assert!(!ParsedLine::Comment.is_data());
        assert!(!ParsedLine::Blank.is_data());
    }

    #[test]
    fn wrong_token_counts_are_malformed() {
        for line in ["A knows", "A knows B", "A knows B \"two words\" ."] {
            match ParsedLine::parse(line) {
                ParsedLine::Malformed { reason } => assert!(reason.contains("expected 4 tokens")),
                other => panic!("{line:?} parsed as {other:?}"),
            }
        }
    }
}
