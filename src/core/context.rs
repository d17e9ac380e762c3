// ============================================================================
// spark-reactive - Reactive Context
// Thread-local state for dependency tracking and batching
// ============================================================================

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use indexmap::IndexMap;

use super::types::{AnyComputation, AnyDependency, DependencyKey};

// =============================================================================
// TRACKING FRAMES
// =============================================================================

/// Dependencies read during one evaluation, in first-read order.
pub type DependencySet = IndexMap<DependencyKey, Rc<dyn AnyDependency>>;

/// One level of the tracking stack.
pub enum Frame {
    /// A computed is evaluating; reads are collected.
    Tracking(DependencySet),
    /// Reads are not collected (inside `untrack`).
    Untracked,
}

// =============================================================================
// REACTIVE CONTEXT
// =============================================================================

/// Thread-local reactive context.
///
/// The frame stack is the "active evaluator" pointer: the top frame belongs
/// to the innermost running evaluation. Nested evaluations push and pop
/// frames as a call stack would.
pub struct ReactiveContext {
    /// Tracking stack, innermost last
    pub frames: RefCell<Vec<Frame>>,

    /// Current batch depth (for nested batches)
    pub batch_depth: Cell<u32>,

    /// Computeds waiting for the outermost batch to finish, deduplicated
    pub pending: RefCell<IndexMap<DependencyKey, Weak<dyn AnyComputation>>>,
}

impl ReactiveContext {
    pub fn new() -> Self {
        Self {
            frames: RefCell::new(Vec::new()),
            batch_depth: Cell::new(0),
            pending: RefCell::new(IndexMap::new()),
        }
    }

    // =========================================================================
    // TRACKING
    // =========================================================================

    pub fn push_frame(&self, frame: Frame) {
        self.frames.borrow_mut().push(frame);
    }

    pub fn pop_frame(&self) -> Option<Frame> {
        self.frames.borrow_mut().pop()
    }

    /// Number of frames on the stack
    pub fn depth(&self) -> usize {
        self.frames.borrow().len()
    }

    /// Whether a read right now would be recorded
    pub fn is_tracking(&self) -> bool {
        matches!(self.frames.borrow().last(), Some(Frame::Tracking(_)))
    }

    /// Record a read into the innermost frame, if it is tracking.
    /// Repeated reads of the same dependency are collapsed.
    pub fn record(&self, key: DependencyKey, dependency: impl FnOnce() -> Rc<dyn AnyDependency>) {
        if let Some(Frame::Tracking(deps)) = self.frames.borrow_mut().last_mut() {
            deps.entry(key).or_insert_with(dependency);
        }
    }

    // =========================================================================
    // BATCHING
    // =========================================================================

    /// Increment batch depth, returns new depth
    pub fn enter_batch(&self) -> u32 {
        let depth = self.batch_depth.get() + 1;
        self.batch_depth.set(depth);
        depth
    }

    /// Decrement batch depth, returns new depth
    pub fn exit_batch(&self) -> u32 {
        let depth = self.batch_depth.get().saturating_sub(1);
        self.batch_depth.set(depth);
        depth
    }

    pub fn is_batching(&self) -> bool {
        self.batch_depth.get() > 0
    }

    /// Queue a computation; a second queue of the same key keeps the first slot.
    pub fn queue_pending(&self, key: DependencyKey, computation: Weak<dyn AnyComputation>) {
        self.pending.borrow_mut().entry(key).or_insert(computation);
    }

    /// Take the oldest queued computation
    pub fn pop_pending(&self) -> Option<Weak<dyn AnyComputation>> {
        self.pending.borrow_mut().shift_remove_index(0).map(|(_, c)| c)
    }

    pub fn pending_count(&self) -> usize {
        self.pending.borrow().len()
    }

    pub fn clear_pending(&self) {
        self.pending.borrow_mut().clear();
    }
}

impl Default for ReactiveContext {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// THREAD-LOCAL ACCESS
// =============================================================================

thread_local! {
    static CONTEXT: ReactiveContext = ReactiveContext::new();
}

/// Access the thread-local reactive context.
pub fn with_context<R>(f: impl FnOnce(&ReactiveContext) -> R) -> R {
    CONTEXT.with(f)
}

/// Check if a read right now would register a dependency
pub fn is_tracking() -> bool {
    with_context(|ctx| ctx.is_tracking())
}

/// Check if currently in a batch
pub fn is_batching() -> bool {
    with_context(|ctx| ctx.is_batching())
}

/// Depth of the tracking stack (nested evaluations plus untrack scopes)
pub fn tracking_depth() -> usize {
    with_context(|ctx| ctx.depth())
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitives::emitter::Listener;

    struct Dummy;

    impl AnyDependency for Dummy {
        fn add_dependent(&self, _callback: Rc<dyn Fn()>) -> Listener {
            Listener::detached()
        }

        fn kind(&self) -> &'static str {
            "dummy"
        }
    }

    #[test]
    fn fresh_context_is_idle() {
        let ctx = ReactiveContext::new();
        assert_eq!(ctx.depth(), 0);
        assert!(!ctx.is_tracking());
        assert!(!ctx.is_batching());
        assert_eq!(ctx.pending_count(), 0);
    }

    #[test]
    fn record_only_into_tracking_frame() {
        let ctx = ReactiveContext::new();
        let dep: Rc<dyn AnyDependency> = Rc::new(Dummy);
        let key = DependencyKey::of(&dep);

        // No frame: ignored
        ctx.record(key, || dep.clone());

        ctx.push_frame(Frame::Tracking(IndexMap::new()));
        ctx.push_frame(Frame::Untracked);
        assert!(!ctx.is_tracking());
        ctx.record(key, || dep.clone());
        assert!(matches!(ctx.pop_frame(), Some(Frame::Untracked)));

        assert!(ctx.is_tracking());
        ctx.record(key, || dep.clone());
        ctx.record(key, || dep.clone());
        match ctx.pop_frame() {
            Some(Frame::Tracking(deps)) => assert_eq!(deps.len(), 1),
            _ => panic!("expected a tracking frame"),
        }
    }

    #[test]
    fn batch_depth_nests() {
        let ctx = ReactiveContext::new();
        assert_eq!(ctx.enter_batch(), 1);
        assert_eq!(ctx.enter_batch(), 2);
        assert!(ctx.is_batching());
        assert_eq!(ctx.exit_batch(), 1);
        assert_eq!(ctx.exit_batch(), 0);
        assert!(!ctx.is_batching());
        assert_eq!(ctx.exit_batch(), 0);
    }

    #[test]
    fn convenience_functions() {
        assert!(!is_tracking());
        assert!(!is_batching());
        assert_eq!(tracking_depth(), 0);
    }
}
