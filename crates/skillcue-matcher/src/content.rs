//! Candidate files and bounded, lazy content reads.

use std::cell::OnceCell;
use std::path::{Path, PathBuf};

/// Files at or above this size are never scanned for content patterns.
pub const MAX_CONTENT_BYTES: u64 = 1024 * 1024;

/// A file offered to file triggers or validation rules.
#[derive(Debug)]
pub struct Candidate {
    /// Project-relative path with `/` separators; what globs and path
    /// regexes see.
    pub rel_path: String,
    pub abs_path: PathBuf,
    content: OnceCell<Option<String>>,
}

impl Candidate {
    pub fn new(project_root: &Path, path: &str) -> Self {
        let rel_path = relativize(project_root, path);
        let abs_path = project_root.join(&rel_path);
        Self {
            rel_path,
            abs_path,
            content: OnceCell::new(),
        }
    }

    /// File content, read at most once. `None` when the file is missing,
    /// unreadable, not a regular file, or too large.
    pub fn content(&self) -> Option<&str> {
        self.content
            .get_or_init(|| read_bounded(&self.abs_path))
            .as_deref()
    }
}

/// Build candidates for a batch of paths, dropping empty entries.
pub fn candidates(project_root: &Path, paths: &[String]) -> Vec<Candidate> {
    paths
        .iter()
        .filter(|p| !p.trim().is_empty())
        .map(|p| Candidate::new(project_root, p))
        .collect()
}

/// Make `path` project-relative with forward slashes. Paths outside the
/// project are kept as given.
pub fn relativize(project_root: &Path, path: &str) -> String {
    let normalized = path.replace('\\', "/");
    let as_path = Path::new(&normalized);
    let rel = if as_path.is_absolute() {
        as_path.strip_prefix(project_root).unwrap_or(as_path)
    } else {
        as_path
    };
    let rel = rel.to_string_lossy().replace('\\', "/");
    rel.strip_prefix("./").map(str::to_string).unwrap_or(rel)
}

fn read_bounded(path: &Path) -> Option<String> {
    let metadata = match std::fs::metadata(path) {
        Ok(m) => m,
        Err(e) => {
            tracing::debug!("Skipping content of {}: {}", path.display(), e);
            return None;
        }
    };
    if !metadata.is_file() {
        return None;
    }
    if metadata.len() >= MAX_CONTENT_BYTES {
        tracing::debug!(
            "Skipping content of {} ({} bytes, limit {})",
            path.display(),
            metadata.len(),
            MAX_CONTENT_BYTES
        );
        return None;
    }
    match std::fs::read(path) {
        Ok(bytes) => Some(String::from_utf8_lossy(&bytes).into_owned()),
        Err(e) => {
            tracing::debug!("Skipping content of {}: {}", path.display(), e);
            None
        }
    }
}
