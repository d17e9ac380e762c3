// ============================================================================
// spark-reactive - Type Definitions
// Type-erased traits and identity keys for the dependency graph
// ============================================================================

use std::rc::Rc;

use crate::primitives::emitter::Listener;

// =============================================================================
// EQUALITY
// =============================================================================

/// Equality function type for comparing observable and computed values
pub type EqualsFn<T> = fn(&T, &T) -> bool;

// =============================================================================
// DEPENDENCY IDENTITY
// =============================================================================

/// Identity of a dependency: the address of its shared allocation.
///
/// Only meaningful while the allocation is alive. The tracking frame and the
/// computed's subscription map both hold the dependency strongly, so an
/// address cannot be reused while a key for it is stored.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DependencyKey(usize);

impl DependencyKey {
    pub fn of<T: ?Sized>(rc: &Rc<T>) -> Self {
        Self(Rc::as_ptr(rc) as *const () as usize)
    }
}

// =============================================================================
// TYPE-ERASED TRAITS
// =============================================================================
//
// A computed's compute function may read observables and computeds of any
// value type. The tracking frame only needs to know how to subscribe to each
// of them, so they are stored as Rc<dyn AnyDependency>.
// =============================================================================

/// Something a computed can depend on.
///
/// Implemented by `ObservableInner<T>` and `ComputedInner<T>`.
pub trait AnyDependency: 'static {
    /// Register a callback fired after every change of this dependency.
    fn add_dependent(&self, callback: Rc<dyn Fn()>) -> Listener;

    /// Short name used in log events
    fn kind(&self) -> &'static str;
}

/// Something that can be re-evaluated later, when a batch completes.
///
/// Implemented by `ComputedInner<T>`.
pub trait AnyComputation: 'static {
    fn run_pending(&self);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_follow_allocation_identity() {
        let a = Rc::new(1);
        let b = Rc::new(1);
        let a2 = a.clone();

        assert_eq!(DependencyKey::of(&a), DependencyKey::of(&a2));
        assert_ne!(DependencyKey::of(&a), DependencyKey::of(&b));
    }

    #[test]
    fn keys_survive_unsizing() {
        let concrete: Rc<String> = Rc::new(String::from("x"));
        let erased: Rc<dyn std::any::Any> = concrete.clone();
        assert_eq!(DependencyKey::of(&concrete), DependencyKey::of(&erased));
    }
}
