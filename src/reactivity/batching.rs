// ============================================================================
// spark-reactive - Batching
// Coalesce several updates into one re-evaluation per computed
// ============================================================================
//
// Outside a batch every change propagates eagerly and depth-first, and a
// computed with two changed dependencies re-evaluates twice. Inside a batch a
// dependency change only marks the computed stale and queues it once; the
// queue is drained when the outermost batch finishes.
//
// Observable listeners are not deferred: they still fire inside the batch.
// ============================================================================

use tracing::{trace, warn};

use crate::core::context::{with_context, Frame};
use crate::reactivity::tracking::FrameGuard;

// =============================================================================
// BATCH
// =============================================================================

/// Exits the batch on success or on unwind.
///
/// An unwinding outermost batch drops its queue: those computeds stay
/// `Stale` until a dependency changes again.
struct BatchGuard;

impl BatchGuard {
    fn enter() -> (Self, bool) {
        let depth = with_context(|ctx| ctx.enter_batch());
        (Self, depth == 1)
    }
}

impl Drop for BatchGuard {
    fn drop(&mut self) {
        let depth = with_context(|ctx| ctx.exit_batch());
        if depth == 0 && std::thread::panicking() {
            let dropped = with_context(|ctx| {
                let count = ctx.pending_count();
                ctx.clear_pending();
                count
            });
            if dropped > 0 {
                warn!(dropped, "batch unwound; queued computeds left stale");
            }
        }
    }
}

/// Drain the queue, including anything queued while draining.
///
/// Runs with the batch still open, so cascades are coalesced too.
fn flush_pending() {
    let mut flushed = 0usize;
    while let Some(pending) = with_context(|ctx| ctx.pop_pending()) {
        if let Some(computation) = pending.upgrade() {
            computation.run_pending();
            flushed += 1;
        }
    }
    if flushed > 0 {
        trace!(flushed, "batch flushed");
    }
}

/// Run `f` with computed re-evaluation deferred until it returns.
///
/// Each computed whose dependencies changed inside the batch re-evaluates
/// once, in the order it was first queued. Batches nest; only the outermost
/// one flushes. A computed read inside the batch returns its last value.
///
/// # Example
///
/// ```
/// use spark_reactive::{batch, computed, observable};
///
/// let a = observable(1);
/// let b = observable(2);
/// let sum = computed({
///     let (a, b) = (a.clone(), b.clone());
///     move || a.get() + b.get()
/// });
///
/// batch(|| {
///     a.set(10);
///     b.set(20);
/// });
///
/// assert_eq!(sum.get(), 30);
/// assert_eq!(sum.evaluation_count(), 2); // initial run + one for the batch
/// ```
pub fn batch<T>(f: impl FnOnce() -> T) -> T {
    let (guard, outermost) = BatchGuard::enter();
    let value = f();
    if outermost {
        flush_pending();
    }
    drop(guard);
    value
}

/// Check if currently inside a batch.
///
/// # Example
///
/// ```
/// use spark_reactive::{batch, is_batching};
///
/// assert!(!is_batching());
/// batch(|| assert!(is_batching()));
/// assert!(!is_batching());
/// ```
pub fn is_batching() -> bool {
    with_context(|ctx| ctx.is_batching())
}

// =============================================================================
// UNTRACK
// =============================================================================

/// Read reactive values without creating dependencies.
///
/// # Example
///
/// ```
/// use spark_reactive::{computed, observable, untrack};
///
/// let a = observable(1);
/// let b = observable(10);
///
/// let sum = computed({
///     let (a, b) = (a.clone(), b.clone());
///     move || a.get() + untrack(|| b.get())
/// });
/// assert_eq!(sum.dependency_count(), 1);
///
/// b.set(20); // not a dependency
/// assert_eq!(sum.get(), 11);
/// a.set(2);
/// assert_eq!(sum.get(), 22);
/// ```
pub fn untrack<T>(f: impl FnOnce() -> T) -> T {
    let _guard = FrameGuard::push(Frame::Untracked);
    f()
}

/// Alias for `untrack()`.
pub fn peek<T>(f: impl FnOnce() -> T) -> T {
    untrack(f)
}

// =============================================================================
// TESTS
// =============================================================================
