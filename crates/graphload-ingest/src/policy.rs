//! Run policies.

use std::str::FromStr;

/// How vertex creation treats vertices that may already be in the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VertexPolicy {
    /// Create unconditionally. Fast; assumes an empty target class.
    #[default]
    Always,
    /// Skip when a vertex with identical content (uri and every extra
    /// field) already exists. One lookup per candidate.
    MatchContent,
    /// Skip when a vertex with the same `uri` already exists, whatever its
    /// other fields. One lookup per candidate.
    MatchUri,
}

impl FromStr for VertexPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "always" => Ok(Self::Always),
            "match-content" | "content" => Ok(Self::MatchContent),
            "match-uri" | "uri" => Ok(Self::MatchUri),
            other => Err(format!(
                "unknown vertex policy `{other}` (expected always|match-content|match-uri)"
            )),
        }
    }
}

/// What a per-record failure does to the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Record the failure in the report and carry on.
    #[default]
    Continue,
    /// Stop at the first failure.
    Abort,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vertex_policy_parses_cli_spellings() {
        assert_eq!("always".parse::<VertexPolicy>().unwrap(), VertexPolicy::Always);
        assert_eq!("Match-Content".parse::<VertexPolicy>().unwrap(), VertexPolicy::MatchContent);
        assert_eq!("uri".parse::<VertexPolicy>().unwrap(), VertexPolicy::MatchUri);
        assert!("sometimes".parse::<VertexPolicy>().is_err());
    }
}
