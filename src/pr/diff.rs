use thiserror::Error;

use super::types::{FileChange, FileStatus};

#[derive(Debug, Error)]
pub enum DiffError {
    #[error("Malformed diff header: {0}")]
    MalformedHeader(String),
}

/// Split a unified diff (as produced by `git diff` or GitHub's diff
/// endpoint) into one `FileChange` per file.
///
/// Each file section starts with:
///   diff --git a/{path} b/{path}
///
/// New files have `--- /dev/null`, deleted files have `+++ /dev/null`,
/// renames carry `rename from`/`rename to` headers.
///
/// The patch kept for each file starts at its first `@@` hunk header, which
/// matches the `patch` field GitHub returns from the PR files endpoint.
pub fn parse_diff(raw_diff: &str) -> Result<Vec<FileChange>, DiffError> {
    if raw_diff.trim().is_empty() {
        return Ok(Vec::new());
    }

    let mut files = Vec::new();
    let mut current: Option<PendingFile> = None;

    for line in raw_diff.lines() {
        if let Some(rest) = line.strip_prefix("diff --git ") {
            if let Some(done) = current.take() {
                files.push(done.finish());
            }
            let mut parts = rest.split_whitespace();
            let a_path = parts
                .next()
                .ok_or_else(|| DiffError::MalformedHeader(format!("missing a/ path in `{line}`")))?;
            let b_path = parts
                .next()
                .ok_or_else(|| DiffError::MalformedHeader(format!("missing b/ path in `{line}`")))?;
            let old_name = a_path.strip_prefix("a/").unwrap_or(a_path).to_string();
            let new_name = b_path.strip_prefix("b/").unwrap_or(b_path).to_string();
            current = Some(PendingFile {
                status: if old_name == new_name {
                    FileStatus::Modified
                } else {
                    FileStatus::Renamed
                },
                old_name,
                new_name,
                patch: Vec::new(),
            });
            continue;
        }

        let Some(file) = current.as_mut() else {
            continue;
        };

        if file.patch.is_empty() {
            // Still inside the file header.
            if line.starts_with("@@") {
                file.patch.push(line);
            } else if line.starts_with("new file mode") || line == "--- /dev/null" {
                file.status = FileStatus::Added;
            } else if line.starts_with("deleted file mode") || line == "+++ /dev/null" {
                file.status = FileStatus::Removed;
            } else if line.starts_with("rename from ") || line.starts_with("rename to ") {
                file.status = FileStatus::Renamed;
            }
            continue;
        }

        file.patch.push(line);
    }

    if let Some(done) = current.take() {
        files.push(done.finish());
    }
    Ok(files)
}

struct PendingFile<'a> {
    old_name: String,
    new_name: String,
    status: FileStatus,
    patch: Vec<&'a str>,
}

impl PendingFile<'_> {
    fn finish(self) -> FileChange {
        let name = match self.status {
            FileStatus::Removed => self.old_name,
            _ => self.new_name,
        };
        FileChange {
            name,
            patch: self.patch.join("\n"),
            status: self.status,
        }
    }
}
