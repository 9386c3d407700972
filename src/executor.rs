//! Task executors for per-page render work.
//!
//! Backends never spawn threads themselves. They hand closures to a
//! [`TaskExecutor`] supplied by the caller and collect the results in
//! submission order with [`run_ordered`].

use std::sync::mpsc;
use std::sync::Arc;

use crate::error::WatermarkError;

/// A unit of work handed to an executor.
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// Runs submitted tasks, possibly on other threads.
pub trait TaskExecutor: Send + Sync {
    fn submit(&self, task: Task);
}

/// Runs every task immediately on the calling thread.
#[derive(Debug, Clone, Copy, Default)]
pub struct InlineExecutor;

impl TaskExecutor for InlineExecutor {
    fn submit(&self, task: Task) {
        task();
    }
}

impl TaskExecutor for rayon::ThreadPool {
    fn submit(&self, task: Task) {
        // A worker of this pool would otherwise wait on its own queue
        if self.current_thread_index().is_some() {
            task();
        } else {
            self.spawn(task);
        }
    }
}

impl<E: TaskExecutor + ?Sized> TaskExecutor for Arc<E> {
    fn submit(&self, task: Task) {
        (**self).submit(task);
    }
}

/// Build a rayon pool for page rendering.
pub fn build_thread_pool(threads: usize) -> Result<rayon::ThreadPool, WatermarkError> {
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .thread_name(|index| format!("markit-render-{}", index))
        .panic_handler(|_| tracing::error!("Render task panicked"))
        .build()
        .map_err(|e| WatermarkError::render_with("failed to build render thread pool", e))
}

/// Run `jobs` on `executor` and return their results in input order.
///
/// Blocks until every job has reported. A job that panics or is dropped by
/// the executor without running surfaces as a `Render` error.
///
/// The calling thread waits on a channel while the executor works, so a
/// custom executor must not queue jobs behind the caller. Calling this from
/// inside a pool that is also the executor is safe only because the rayon
/// impl runs such jobs inline; an executor backed by a bounded pool the
/// caller already occupies can deadlock.
pub fn run_ordered<T, F>(executor: &dyn TaskExecutor, jobs: Vec<F>) -> Result<Vec<T>, WatermarkError>
where
    T: Send + 'static,
    F: FnOnce() -> T + Send + 'static,
{
    let total = jobs.len();
    let (tx, rx) = mpsc::channel::<(usize, T)>();

    for (index, job) in jobs.into_iter().enumerate() {
        let tx = tx.clone();
        executor.submit(Box::new(move || {
            let result = job();
            // Receiver only disappears if the caller already gave up
            let _ = tx.send((index, result));
        }));
    }
    drop(tx);

    let mut slots: Vec<Option<T>> = std::iter::repeat_with(|| None).take(total).collect();
    for _ in 0..total {
        let (index, result) = rx
            .recv()
            .map_err(|_| WatermarkError::render("a render task ended without reporting a result"))?;
        slots[index] = Some(result);
    }

    slots
        .into_iter()
        .map(|slot| slot.ok_or_else(|| WatermarkError::render("missing render task result")))
        .collect()
}
