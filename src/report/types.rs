use serde::{Deserialize, Serialize};

/// Kind of a review issue, as written by the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IssueType {
    Error,
    Warning,
    Critical,
    Issue,
    Info,
    Analysis,
}

impl IssueType {
    /// Case-insensitive lookup of a type keyword.
    pub fn from_keyword(keyword: &str) -> Option<IssueType> {
        // `(?i)` lets a long s stand in for `s`, so fold it the same way.
        match keyword.to_lowercase().replace('\u{17f}', "s").as_str() {
            "error" => Some(IssueType::Error),
            "warning" => Some(IssueType::Warning),
            "critical" => Some(IssueType::Critical),
            "issue" => Some(IssueType::Issue),
            "info" => Some(IssueType::Info),
            "analysis" => Some(IssueType::Analysis),
            _ => None,
        }
    }

    /// Counted in `total_issues`.
    pub fn is_actionable(self) -> bool {
        !matches!(self, IssueType::Info | IssueType::Analysis)
    }

    /// Counted in `critical_issues`.
    pub fn is_critical(self) -> bool {
        matches!(self, IssueType::Error | IssueType::Critical)
    }
}

impl std::fmt::Display for IssueType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            IssueType::Error => "Error",
            IssueType::Warning => "Warning",
            IssueType::Critical => "Critical",
            IssueType::Issue => "Issue",
            IssueType::Info => "Info",
            IssueType::Analysis => "Analysis",
        };
        f.write_str(label)
    }
}

/// A single issue reported by the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    #[serde(rename = "type")]
    pub kind: IssueType,
    /// 1-based line in the patch; 0 when the issue is not tied to a line
    pub line: u64,
    pub description: String,
    pub suggestion: String,
}

/// Issues attributed to one changed file. Never empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileReport {
    pub name: String,
    pub issues: Vec<Issue>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    pub total_files: usize,
    pub total_issues: usize,
    pub critical_issues: usize,
}

/// Structured outcome of one PR review.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub files: Vec<FileReport>,
    pub summary: Summary,
    /// Set only when the model output could not be formatted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AnalysisResult {
    /// Empty result carrying the reason formatting failed.
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            ..Self::default()
        }
    }
}
