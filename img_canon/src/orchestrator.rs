//! Batch orchestrator
//!
//! Enumerates candidates under a root, converts them on the worker pool and
//! folds every per-file outcome into a single [`BatchState`] owned by the
//! calling thread. Superseded sources are deleted only after the pool has
//! drained, and only once their replacement checks out on disk.

use crate::config::CanonConfig;
use crate::decision::resave_img;
use crate::image_handle::ImageHandle;
use crate::persist::SaveOutcome;
use rayon::prelude::*;
use rayon::ThreadPool;
use serde::Serialize;
use shared_utils::batch::{collect_candidates, total_size, CandidateFile};
use shared_utils::common_utils::{compute_relative_path, same_logical_path};
use shared_utils::img_errors::CanonError;
use shared_utils::progress::create_progress_bar;
use shared_utils::report::{print_canon_summary, print_issue_list, CanonSummary};
use shared_utils::safe_delete::safe_delete_original;
use shared_utils::thread_manager::{run_parallel, TaskResult};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;
use std::time::{Duration, Instant};

/// Terminal state of one input file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConversionOutcome {
    /// Already canonical.
    Skipped,
    /// A canonical copy was written at the given path.
    Converted(PathBuf),
    /// An unrelated file occupies the canonical path.
    Collided(PathBuf),
    /// Not an image the codec understands.
    Unreadable(String),
    /// Reading the source or writing the output failed.
    WriteFailed(String),
}

/// Reads, classifies and resaves one file.
pub fn process_file(path: &Path, config: &CanonConfig) -> ConversionOutcome {
    let result = ImageHandle::open(path).and_then(|handle| resave_img(handle, config));
    match result {
        Ok(SaveOutcome::NoOp) => ConversionOutcome::Skipped,
        Ok(SaveOutcome::Written(new_path)) => ConversionOutcome::Converted(new_path),
        Ok(SaveOutcome::Failed { reason, .. }) => ConversionOutcome::WriteFailed(reason),
        Err(CanonError::AlreadyExists(existing)) => ConversionOutcome::Collided(existing),
        Err(e) if e.is_unreadable() => ConversionOutcome::Unreadable(e.to_string()),
        Err(e) => ConversionOutcome::WriteFailed(e.to_string()),
    }
}

/// Aggregated batch buckets. Written only by the aggregating thread.
#[derive(Debug, Default)]
pub struct BatchState {
    pub converted: usize,
    pub skipped: usize,
    pub cancelled: usize,
    pub unreadable: BTreeSet<PathBuf>,
    /// source → existing file at its canonical path
    pub collided: BTreeMap<PathBuf, PathBuf>,
    /// source → reason
    pub write_failed: BTreeMap<PathBuf, String>,
    /// superseded source → replacement
    pub pending_deletion: BTreeMap<PathBuf, PathBuf>,
    /// every path written during this batch
    produced: BTreeSet<PathBuf>,
}

impl BatchState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Folds one outcome into the buckets.
    ///
    /// A converted source is scheduled for deletion only when the output
    /// landed at a different path, and never when the source itself is the
    /// output of another conversion in this batch. A new path drops out of
    /// the pending and unreadable sets, since a valid conversion now lives
    /// there, and stays out of the unreadable set whatever order outcomes
    /// arrive in.
    pub fn record(&mut self, source: &Path, outcome: ConversionOutcome) {
        match outcome {
            ConversionOutcome::Skipped => self.skipped += 1,
            ConversionOutcome::Converted(new_path) => {
                self.converted += 1;

                // a second write to one path (overwrite policy) destroys the
                // first conversion, so its source must survive
                if self.produced.iter().any(|p| same_logical_path(p, &new_path)) {
                    self.pending_deletion
                        .retain(|_, replacement| !same_logical_path(replacement, &new_path));
                    tracing::warn!(
                        source = %source.display(),
                        target = %new_path.display(),
                        "Output written twice in one batch; keeping the earlier source"
                    );
                }

                let source_is_output = self.produced.iter().any(|p| same_logical_path(p, source));
                if !same_logical_path(source, &new_path) && !source_is_output {
                    self.pending_deletion
                        .entry(source.to_path_buf())
                        .or_insert_with(|| new_path.clone());
                }
                self.pending_deletion
                    .retain(|pending, _| !same_logical_path(pending, &new_path));
                self.unreadable.retain(|p| !same_logical_path(p, &new_path));
                self.produced.insert(new_path);
            }
            ConversionOutcome::Collided(existing) => {
                self.collided.insert(source.to_path_buf(), existing);
            }
            ConversionOutcome::Unreadable(reason) => {
                if self.produced.iter().any(|p| same_logical_path(p, source)) {
                    // read before a conversion replaced it
                    tracing::debug!(path = %source.display(), "Unreadable file already replaced");
                    return;
                }
                tracing::debug!(path = %source.display(), %reason, "Not an image");
                self.unreadable.insert(source.to_path_buf());
            }
            ConversionOutcome::WriteFailed(reason) => {
                self.write_failed.insert(source.to_path_buf(), reason);
            }
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CollisionEntry {
    pub source: PathBuf,
    pub existing: PathBuf,
}

#[derive(Debug, Clone, Serialize)]
pub struct FailureEntry {
    pub path: PathBuf,
    pub reason: String,
}

/// Final, serializable account of a conversion batch.
#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    /// Inputs the batch was started from (directories or single files).
    pub roots: Vec<PathBuf>,
    pub total: usize,
    pub input_bytes: u64,
    pub converted: usize,
    pub skipped: usize,
    pub cancelled: usize,
    pub unreadable: Vec<PathBuf>,
    pub collided: Vec<CollisionEntry>,
    pub write_failed: Vec<FailureEntry>,
    pub deleted: Vec<PathBuf>,
    pub delete_failed: Vec<FailureEntry>,
    pub elapsed_secs: f64,
}

impl BatchReport {
    pub fn summary(&self) -> CanonSummary {
        CanonSummary {
            total: self.total,
            converted: self.converted,
            skipped: self.skipped,
            unreadable: self.unreadable.len(),
            collided: self.collided.len(),
            write_failed: self.write_failed.len(),
            cancelled: self.cancelled,
            deleted: self.deleted.len(),
            delete_failed: self.delete_failed.len(),
            input_bytes: self.input_bytes,
            duration: Duration::from_secs_f64(self.elapsed_secs),
        }
    }

    /// Box summary followed by the per-file problem lists.
    pub fn print(&self) {
        print_canon_summary(&self.summary(), "Convert");

        let rel = |p: &Path| {
            self.roots
                .iter()
                .filter(|root| root.is_dir())
                .find(|root| p.starts_with(root))
                .map(|root| compute_relative_path(p, root))
                .unwrap_or_else(|| p.to_path_buf())
        };
        let unreadable: Vec<_> = self.unreadable.iter().map(|p| (rel(p), String::new())).collect();
        let collided: Vec<_> = self
            .collided
            .iter()
            .map(|c| (rel(&c.source), format!("{} already exists", rel(&c.existing).display())))
            .collect();
        let failed: Vec<_> = self
            .write_failed
            .iter()
            .chain(&self.delete_failed)
            .map(|f| (rel(&f.path), f.reason.clone()))
            .collect();

        print_issue_list("❓ Not readable as images:", &unreadable);
        print_issue_list("⚠️  Target already exists:", &collided);
        print_issue_list("❌ Failed:", &failed);
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// Deletes every pending source in parallel after verifying its replacement.
/// Returns `(deleted, failed)`; a failure never stops the other deletions.
pub fn delete_pending(
    pool: &ThreadPool,
    pending: &BTreeMap<PathBuf, PathBuf>,
) -> (Vec<PathBuf>, Vec<FailureEntry>) {
    let entries: Vec<(&PathBuf, &PathBuf)> = pending.iter().collect();
    let results: Vec<(PathBuf, std::io::Result<()>)> = pool.install(|| {
        entries
            .par_iter()
            .map(|(source, replacement)| {
                (
                    (*source).clone(),
                    safe_delete_original(source, replacement, 1),
                )
            })
            .collect()
    });

    let mut deleted = Vec::new();
    let mut failed = Vec::new();
    for (source, result) in results {
        match result {
            Ok(()) => {
                tracing::debug!(path = %source.display(), "Deleted superseded source");
                deleted.push(source);
            }
            Err(e) => {
                tracing::warn!(path = %source.display(), error = %e, "Could not delete source");
                failed.push(FailureEntry {
                    path: source,
                    reason: e.to_string(),
                });
            }
        }
    }
    (deleted, failed)
}

/// Expands `inputs` into a deduplicated, path-ordered candidate list.
///
/// Directories contribute every file with a supported extension; files named
/// explicitly are taken as-is. Inputs that do not exist are logged and
/// skipped.
pub fn collect_inputs(inputs: &[PathBuf], config: &CanonConfig) -> Vec<CandidateFile> {
    let mut candidates = Vec::new();
    for input in inputs {
        if input.is_dir() {
            candidates.extend(collect_candidates(
                input,
                &config.supported_extensions,
                config.recursive,
            ));
        } else if input.is_file() {
            match std::fs::metadata(input) {
                Ok(meta) => candidates.push(CandidateFile {
                    path: input.clone(),
                    size: meta.len(),
                }),
                Err(e) => tracing::warn!(path = %input.display(), error = %e, "Cannot stat input"),
            }
        } else {
            tracing::warn!(path = %input.display(), "Input is neither a file nor a directory");
        }
    }
    candidates.sort_by(|a, b| a.path.cmp(&b.path));
    candidates.dedup_by(|a, b| a.path == b.path);
    candidates
}

/// Converts every supported image reachable from `inputs`.
///
/// Never fails as a whole: per-file problems end up in the report's buckets.
/// Files not yet started when `cancel` is raised are counted as cancelled;
/// sources of conversions that did complete are still deleted.
pub fn convert_inputs(
    inputs: &[PathBuf],
    config: &CanonConfig,
    pool: &ThreadPool,
    cancel: &AtomicBool,
) -> BatchReport {
    let start = Instant::now();
    let candidates = collect_inputs(inputs, config);
    let input_bytes = total_size(&candidates);

    tracing::info!(
        inputs = inputs.len(),
        files = candidates.len(),
        threads = pool.current_num_threads(),
        "Starting conversion batch"
    );

    let pb = create_progress_bar(candidates.len() as u64, "Converting", !config.show_progress);
    let mut state = BatchState::new();

    run_parallel(
        pool,
        &candidates,
        cancel,
        |candidate| process_file(&candidate.path, config),
        |index, result| {
            let source = &candidates[index].path;
            match result {
                TaskResult::Done(outcome) => state.record(source, outcome),
                TaskResult::Panicked(msg) => {
                    tracing::error!(path = %source.display(), panic = %msg, "Worker panicked");
                    state.record(
                        source,
                        ConversionOutcome::WriteFailed(format!("worker panicked: {}", msg)),
                    );
                }
                TaskResult::Cancelled => state.cancelled += 1,
            }
            pb.set_message(
                source
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default(),
            );
            pb.inc(1);
        },
    );
    pb.finish_and_clear();

    tracing::info!(
        converted = state.converted,
        skipped = state.skipped,
        unreadable = state.unreadable.len(),
        collided = state.collided.len(),
        write_failed = state.write_failed.len(),
        cancelled = state.cancelled,
        pending_deletion = state.pending_deletion.len(),
        "Conversion finished"
    );

    let (deleted, delete_failed) = delete_pending(pool, &state.pending_deletion);

    BatchReport {
        roots: inputs.to_vec(),
        total: candidates.len(),
        input_bytes,
        converted: state.converted,
        skipped: state.skipped,
        cancelled: state.cancelled,
        unreadable: state.unreadable.into_iter().collect(),
        collided: state
            .collided
            .into_iter()
            .map(|(source, existing)| CollisionEntry { source, existing })
            .collect(),
        write_failed: state
            .write_failed
            .into_iter()
            .map(|(path, reason)| FailureEntry { path, reason })
            .collect(),
        deleted,
        delete_failed,
        elapsed_secs: start.elapsed().as_secs_f64(),
    }
}

/// [`convert_inputs`] for a single root directory.
pub fn convert_directory(
    root: &Path,
    config: &CanonConfig,
    pool: &ThreadPool,
    cancel: &AtomicBool,
) -> BatchReport {
    convert_inputs(&[root.to_path_buf()], config, pool, cancel)
}
