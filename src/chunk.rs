use serde::Serialize;
use tracing::{debug, instrument};

use crate::pr::{FileChange, PrContents};
use crate::tokens::TokenEstimator;

pub const DEFAULT_MAX_TOKENS: usize = 6000;

/// A group of files small enough to review in one model call.
#[derive(Debug, Clone, Serialize)]
pub struct Chunk {
    pub title: String,
    /// Only the first chunk carries the PR description.
    pub description: String,
    pub files: Vec<FileChange>,
    /// Running estimate used when the chunk was built
    pub estimated_tokens: usize,
}

impl Chunk {
    fn empty(title: &str, description: &str, estimated_tokens: usize) -> Self {
        Self {
            title: title.to_string(),
            description: description.to_string(),
            files: Vec::new(),
            estimated_tokens,
        }
    }
}

/// Text a file contributes to a review prompt.
pub fn file_section(file: &FileChange) -> String {
    format!("File: {}\nChanges:\n{}", file.name, file.patch)
}

/// Split a PR into token-bounded chunks, keeping file order.
///
/// A file that would push a non-empty chunk past `max_tokens` starts a new
/// chunk; a single file larger than the budget still gets a chunk of its own.
/// Always returns at least one chunk.
#[instrument(skip_all, fields(files = contents.files.len(), max_tokens = max_tokens))]
pub fn chunk_pr_contents(
    contents: &PrContents,
    estimator: &TokenEstimator,
    max_tokens: usize,
) -> Vec<Chunk> {
    let mut chunks = Vec::new();
    let header = format!("{}{}", contents.title, contents.description);
    let mut current = Chunk::empty(
        &contents.title,
        &contents.description,
        estimator.estimate(&header),
    );

    for file in &contents.files {
        let file_tokens = estimator.estimate(&file_section(file));

        if current.estimated_tokens + file_tokens > max_tokens && !current.files.is_empty() {
            let title_tokens = estimator.estimate(&contents.title);
            let full = std::mem::replace(
                &mut current,
                Chunk::empty(&contents.title, "", title_tokens),
            );
            chunks.push(full);
        }

        current.files.push(file.clone());
        current.estimated_tokens += file_tokens;
    }

    if !current.files.is_empty() || chunks.is_empty() {
        chunks.push(current);
    }

    debug!(chunks = chunks.len(), "chunked PR contents");
    chunks
}
