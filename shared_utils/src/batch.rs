//! Batch Processing Module
//!
//! Candidate discovery for directory batches: walks a root, keeps files whose
//! extension is in the caller's set, and records their size for reporting.

use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// A file selected for processing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateFile {
    pub path: PathBuf,
    pub size: u64,
}

fn walker(dir: &Path, recursive: bool) -> WalkDir {
    if recursive {
        WalkDir::new(dir).follow_links(true)
    } else {
        WalkDir::new(dir).max_depth(1)
    }
}

/// Regular files under `dir` with one of `extensions` (no dots,
/// case-insensitive) and their byte sizes, sorted by path so repeated runs
/// visit files in the same order.
///
/// Entries whose metadata cannot be read are dropped with a warning.
pub fn collect_candidates<S: AsRef<str>>(
    dir: &Path,
    extensions: &[S],
    recursive: bool,
) -> Vec<CandidateFile> {
    let mut candidates: Vec<CandidateFile> = walker(dir, recursive)
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(e) => Some(e),
            Err(e) => {
                tracing::warn!(error = %e, "Skipping unreadable directory entry");
                None
            }
        })
        .filter(|e| e.file_type().is_file())
        .filter(|e| crate::common_utils::has_extension(e.path(), extensions))
        .filter_map(|e| match e.metadata() {
            Ok(meta) => Some(CandidateFile {
                size: meta.len(),
                path: e.into_path(),
            }),
            Err(err) => {
                tracing::warn!(path = ?e.path(), error = %err, "Cannot stat file, skipping");
                None
            }
        })
        .collect();

    candidates.sort_by(|a, b| a.path.cmp(&b.path));
    candidates
}

/// Sum of candidate sizes in bytes.
pub fn total_size(candidates: &[CandidateFile]) -> u64 {
    candidates.iter().map(|c| c.size).sum()
}
