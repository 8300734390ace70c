use regex::RegexBuilder;
use thiserror::Error;

use super::types::{Issue, IssueType};

pub const DEFAULT_SUGGESTION: &str = "See description for details";

/// `type: [line] N - description - fix`, then `type: description (line N) - fix`.
const ISSUE_PATTERNS: [&str; 2] = [
    r"(?P<type>error|warning|issue|critical):\s*(?:line\s*)?(?P<line>[0-9]+)\s*-\s*(?P<description>[^-]+)(?:\s*-\s*(?P<solution>.+))?",
    r"(?P<type>error|warning|issue|critical):\s*(?P<description>[^(]+)\s*\(line\s*(?P<line>[0-9]+)\)(?:\s*-\s*(?P<solution>.+))?",
];

#[derive(Debug, Error)]
pub enum FormatError {
    #[error("Invalid pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("Line number out of range: {0}")]
    InvalidLine(String),
}

/// Best-effort extraction of issues from free-text model output. An empty
/// vector means nothing recognisable was found.
pub trait IssueParser: Send + Sync {
    fn parse(&self, text: &str) -> Result<Vec<Issue>, FormatError>;
}

/// Regex-based parser for the `Type: (line) - description - fix` family of
/// formats. Every match of every pattern is kept, so a line matched by both
/// patterns yields two issues.
#[derive(Debug, Default, Clone, Copy)]
pub struct PatternIssueParser;

impl IssueParser for PatternIssueParser {
    fn parse(&self, text: &str) -> Result<Vec<Issue>, FormatError> {
        let mut issues = Vec::new();

        for pattern in ISSUE_PATTERNS {
            let regex = RegexBuilder::new(pattern).case_insensitive(true).build()?;
            for caps in regex.captures_iter(text) {
                // The alternation only admits the four keywords.
                let kind = IssueType::from_keyword(&caps["type"]).unwrap_or(IssueType::Issue);
                let line = caps["line"]
                    .parse::<u64>()
                    .map_err(|_| FormatError::InvalidLine(caps["line"].to_string()))?;
                let suggestion = caps
                    .name("solution")
                    .map_or(DEFAULT_SUGGESTION, |m| m.as_str())
                    .trim()
                    .to_string();

                issues.push(Issue {
                    kind,
                    line,
                    description: caps["description"].trim().to_string(),
                    suggestion,
                });
            }
        }

        Ok(issues)
    }
}
