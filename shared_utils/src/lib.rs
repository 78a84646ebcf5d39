//! Shared Utilities for the img-canon tools
//!
//! Ambient pieces used by the converter and its recipes:
//! - Logging setup (stderr + rolling file)
//! - Error type shared by every image operation
//! - Progress bar and box-style summary reports
//! - Candidate file collection
//! - Bounded thread pool and the channel-based parallel runner
//! - Safety checks (dangerous directory detection, verified deletion)

pub mod batch;
pub mod common_utils;
pub mod img_errors;
pub mod logging;
pub mod progress;
pub mod report;
pub mod safe_delete;
pub mod safety;
pub mod thread_manager;

pub use batch::{collect_candidates, total_size, CandidateFile};
pub use common_utils::{
    append_to_stem, compute_relative_path, get_dotted_extension_lowercase,
    get_extension_lowercase, has_extension, path_stem, same_logical_path,
};
pub use img_errors::{CanonError, Result};
pub use logging::{init_logging, LogConfig};
pub use progress::{create_progress_bar, format_bytes, format_duration};
pub use report::{print_canon_summary, print_issue_list, print_simple_summary, CanonSummary};
pub use safe_delete::{safe_delete_original, verify_output_integrity};
pub use safety::{check_dangerous_directory, check_safe_for_destructive};
pub use thread_manager::{build_thread_pool, get_optimal_threads, run_parallel, TaskResult};
