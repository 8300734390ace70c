use serde::{Deserialize, Serialize};

/// A pull request reduced to what the reviewer needs: its text and its
/// changed files, in the order GitHub lists them.
#[derive(Debug, Clone, Serialize)]
pub struct PrContents {
    /// PR title
    pub title: String,
    /// PR body, empty when GitHub returns null
    pub description: String,
    /// Changed files with their patches
    pub files: Vec<FileChange>,
}

/// A single changed file within the PR.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileChange {
    /// File path (e.g., "src/auth/config.rs")
    pub name: String,
    /// Unified diff for this file; empty for binary or oversized files
    pub patch: String,
    pub status: FileStatus,
}

/// Change status as reported by GitHub's files endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileStatus {
    Added,
    Modified,
    Removed,
    Renamed,
    #[default]
    #[serde(other)]
    Unknown,
}

/// Owner and repository name parsed from a repository URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoRef {
    pub owner: String,
    pub repo: String,
}

/// Outcome of the unauthenticated visibility probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Public,
    Private,
}

impl Visibility {
    pub fn is_private(self) -> bool {
        self == Visibility::Private
    }
}
