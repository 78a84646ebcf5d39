//! Thread Manager
//!
//! Pool sizing and the generic fan-out/fan-in runner used by every batch:
//! workers run on a bounded rayon pool and send `(index, result)` over an mpsc
//! channel; the calling thread is the only consumer, so it can own all
//! aggregation state without locks.

use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuildError, ThreadPoolBuilder};
use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, OnceLock};

static OPTIMAL_THREADS: OnceLock<usize> = OnceLock::new();

/// Worker count for CPU-bound image batches: one per logical CPU (cached).
pub fn get_optimal_threads() -> usize {
    *OPTIMAL_THREADS.get_or_init(|| num_cpus::get().max(1))
}

/// Builds a pool with `threads` workers (`0` means [`get_optimal_threads`]),
/// falling back to two workers if the requested size cannot be spawned.
pub fn build_thread_pool(threads: usize) -> Result<ThreadPool, ThreadPoolBuildError> {
    let threads = if threads == 0 { get_optimal_threads() } else { threads };
    ThreadPoolBuilder::new()
        .num_threads(threads)
        .thread_name(|i| format!("canon-worker-{}", i))
        .build()
        .or_else(|e| {
            tracing::warn!(threads, error = %e, "Thread pool creation failed, retrying with 2 threads");
            ThreadPoolBuilder::new().num_threads(2).build()
        })
}

/// Terminal state of one task in [`run_parallel`].
#[derive(Debug)]
pub enum TaskResult<R> {
    Done(R),
    /// The task panicked; carries the panic message.
    Panicked(String),
    /// The cancel flag was set before the task started.
    Cancelled,
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Runs `work` over `items` on `pool` and feeds each result to `on_result`
/// on the calling thread, in completion order.
///
/// `on_result` is called exactly once per item. Items not yet started when
/// `cancel` becomes true are reported as [`TaskResult::Cancelled`]. A
/// panicking task is reported as [`TaskResult::Panicked`] and does not
/// affect the others. Returns after every task has finished.
pub fn run_parallel<T, R, F, A>(
    pool: &ThreadPool,
    items: &[T],
    cancel: &AtomicBool,
    work: F,
    mut on_result: A,
) where
    T: Sync,
    R: Send,
    F: Fn(&T) -> R + Sync,
    A: FnMut(usize, TaskResult<R>),
{
    let (tx, rx) = mpsc::channel::<(usize, TaskResult<R>)>();
    let work = &work;

    std::thread::scope(|scope| {
        scope.spawn(move || {
            pool.install(|| {
                items
                    .par_iter()
                    .enumerate()
                    .for_each_with(tx, |tx, (index, item)| {
                        let result = if cancel.load(Ordering::Relaxed) {
                            TaskResult::Cancelled
                        } else {
                            match catch_unwind(AssertUnwindSafe(|| work(item))) {
                                Ok(r) => TaskResult::Done(r),
                                Err(payload) => TaskResult::Panicked(panic_message(payload)),
                            }
                        };
                        // the receiver outlives every sender
                        let _ = tx.send((index, result));
                    });
            });
        });

        for (index, result) in rx {
            on_result(index, result);
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_optimal_threads_positive() {
        assert!(get_optimal_threads() >= 1);
    }

    #[test]
    fn test_build_thread_pool_sizes() {
        assert_eq!(build_thread_pool(3).unwrap().current_num_threads(), 3);
        assert_eq!(
            build_thread_pool(0).unwrap().current_num_threads(),
            get_optimal_threads()
        );
    }

    #[test]
    fn test_run_parallel_reports_every_item_once() {
        let pool = build_thread_pool(4).unwrap();
        let items: Vec<u32> = (0..100).collect();
        let cancel = AtomicBool::new(false);
        let mut seen = vec![0u32; items.len()];
        let mut sum = 0u32;

        run_parallel(&pool, &items, &cancel, |n| n * 2, |i, r| {
            seen[i] += 1;
            match r {
                TaskResult::Done(v) => sum += v,
                other => panic!("unexpected result {:?}", other),
            }
        });

        assert!(seen.iter().all(|&c| c == 1));
        assert_eq!(sum, (0..100).map(|n| n * 2).sum::<u32>());
    }

    #[test]
    fn test_run_parallel_isolates_panics() {
        let pool = build_thread_pool(2).unwrap();
        let items = vec![1, 2, 3];
        let cancel = AtomicBool::new(false);
        let mut panicked = Vec::new();
        let mut done = 0;

        run_parallel(
            &pool,
            &items,
            &cancel,
            |&n| {
                if n == 2 {
                    panic!("bad item {}", n);
                }
                n
            },
            |i, r| match r {
                TaskResult::Done(_) => done += 1,
                TaskResult::Panicked(msg) => panicked.push((i, msg)),
                TaskResult::Cancelled => {}
            },
        );

        assert_eq!(done, 2);
        assert_eq!(panicked.len(), 1);
        assert_eq!(panicked[0].0, 1);
        assert!(panicked[0].1.contains("bad item 2"));
    }

    #[test]
    fn test_run_parallel_cancelled_before_start() {
        let pool = build_thread_pool(2).unwrap();
        let items = vec![(); 10];
        let cancel = AtomicBool::new(true);
        let mut cancelled = 0;

        run_parallel(&pool, &items, &cancel, |_| (), |_, r| {
            if matches!(r, TaskResult::Cancelled) {
                cancelled += 1;
            }
        });

        assert_eq!(cancelled, 10);
    }
}
