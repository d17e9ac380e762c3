// ============================================================================
// spark-reactive - Dependency Tracking
// Collect what a compute function reads
// ============================================================================
//
// `track` pushes a fresh tracking frame, runs the function, and pops the
// frame, returning the set of dependencies read in between. Reads made by a
// nested evaluation land in the nested frame, not in ours. `untrack` (in
// batching.rs) pushes an `Untracked` frame through the same guard.
//
// Frames are popped by a drop guard, so a panicking compute function leaves
// the stack exactly as it found it.
// ============================================================================

use std::rc::Rc;

use indexmap::IndexMap;

use crate::core::context::{with_context, DependencySet, Frame};
use crate::core::types::{AnyDependency, DependencyKey};

/// Register a read of `dependency` with the innermost evaluation, if any.
///
/// Called by `Observable::get` and `Computed::get`.
pub fn track_read<D: AnyDependency>(dependency: &Rc<D>) {
    with_context(|ctx| {
        ctx.record(DependencyKey::of(dependency), || {
            dependency.clone() as Rc<dyn AnyDependency>
        });
    });
}

/// Pops the frame it guards, on success or on unwind.
pub(crate) struct FrameGuard {
    armed: bool,
}

impl FrameGuard {
    pub(crate) fn push(frame: Frame) -> Self {
        with_context(|ctx| ctx.push_frame(frame));
        Self { armed: true }
    }

    fn finish(mut self) -> Option<Frame> {
        self.armed = false;
        with_context(|ctx| ctx.pop_frame())
    }
}

impl Drop for FrameGuard {
    fn drop(&mut self) {
        if self.armed {
            with_context(|ctx| ctx.pop_frame());
        }
    }
}

/// Run `f`, collecting every dependency it reads.
pub fn track<R>(f: impl FnOnce() -> R) -> (R, DependencySet) {
    let guard = FrameGuard::push(Frame::Tracking(IndexMap::new()));
    let value = f();
    let deps = match guard.finish() {
        Some(Frame::Tracking(deps)) => deps,
        _ => IndexMap::new(),
    };
    (value, deps)
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::context::{is_tracking, tracking_depth};
    use crate::primitives::emitter::Listener;

    struct Probe;

    impl AnyDependency for Probe {
        fn add_dependent(&self, _callback: Rc<dyn Fn()>) -> Listener {
            Listener::detached()
        }

        fn kind(&self) -> &'static str {
            "probe"
        }
    }

    #[test]
    fn read_outside_tracking_is_ignored() {
        let probe = Rc::new(Probe);
        track_read(&probe);
        assert!(!is_tracking());
    }

    #[test]
    fn track_collects_unique_reads_in_order() {
        let a = Rc::new(Probe);
        let b = Rc::new(Probe);

        let ((), deps) = track(|| {
            track_read(&b);
            track_read(&a);
            track_read(&b);
        });

        let keys: Vec<_> = deps.keys().copied().collect();
        assert_eq!(keys, vec![DependencyKey::of(&b), DependencyKey::of(&a)]);
        assert_eq!(tracking_depth(), 0);
    }

    #[test]
    fn nested_track_keeps_frames_apart() {
        let outer = Rc::new(Probe);
        let inner = Rc::new(Probe);

        let (inner_deps, outer_deps) = track(|| {
            track_read(&outer);
            let ((), deps) = track(|| track_read(&inner));
            deps
        });

        assert_eq!(outer_deps.len(), 1);
        assert!(outer_deps.contains_key(&DependencyKey::of(&outer)));
        assert_eq!(inner_deps.len(), 1);
        assert!(inner_deps.contains_key(&DependencyKey::of(&inner)));
    }

    #[test]
    fn panic_restores_the_stack() {
        let result = std::panic::catch_unwind(|| {
            track(|| -> () { panic!("compute failed") });
        });
        assert!(result.is_err());
        assert_eq!(tracking_depth(), 0);
    }
}
