// ============================================================================
// spark-reactive - Lifecycle
// The ownership/disposal graph
// ============================================================================
//
// An owner keeps an ordered list of what it owns. Disposing the owner:
// 1. returns immediately if it is already disposed
// 2. marks itself disposed (any re-entrant dispose is now a no-op, which is
//    what makes cycles in the owns-graph terminate)
// 3. disposes owned items last-registered-first
// 4. runs its own teardown
//
// Owned handles are held strongly until disposal drains the list, so an
// A-owns-B-owns-A cycle is an Rc cycle until one side is disposed.
// ============================================================================

use std::cell::{Cell, RefCell};

use tracing::debug;

// =============================================================================
// TRAITS
// =============================================================================

/// Anything with an idempotent `dispose`.
pub trait Disposable: 'static {
    /// Dispose this entity. Calling it again is a no-op.
    fn dispose(&self);

    fn is_disposed(&self) -> bool;
}

/// A disposable that can own other disposables.
pub trait Owner: Disposable {
    fn lifecycle(&self) -> &Lifecycle;

    /// Take ownership of `child`: disposing `self` will dispose it.
    ///
    /// If `self` is already disposed, `child` is disposed right away.
    fn own<C: Disposable>(&self, child: C)
    where
        Self: Sized,
    {
        self.lifecycle().own(Box::new(child));
    }

    /// Register a callback to run when `self` is disposed, in the same
    /// last-first order as owned children.
    fn on_dispose(&self, callback: impl FnOnce() + 'static)
    where
        Self: Sized,
    {
        self.lifecycle().on_dispose(Box::new(callback));
    }
}

// =============================================================================
// LIFECYCLE
// =============================================================================

enum Owned {
    Entity(Box<dyn Disposable>),
    Callback(Box<dyn FnOnce()>),
}

/// Disposed flag plus the ordered list of owned items.
///
/// Embedded in every reactive entity that can own things.
#[derive(Default)]
pub struct Lifecycle {
    disposed: Cell<bool>,
    owned: RefCell<Vec<Owned>>,
}

impl Lifecycle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.get()
    }

    /// Number of owned children and callbacks not yet disposed
    pub fn owned_count(&self) -> usize {
        self.owned.borrow().len()
    }

    pub fn own(&self, child: Box<dyn Disposable>) {
        if self.disposed.get() {
            child.dispose();
            return;
        }
        self.owned.borrow_mut().push(Owned::Entity(child));
    }

    pub fn on_dispose(&self, callback: Box<dyn FnOnce()>) {
        if self.disposed.get() {
            callback();
            return;
        }
        self.owned.borrow_mut().push(Owned::Callback(callback));
    }

    /// Run the disposal protocol with `teardown` as the entity's own cleanup.
    ///
    /// Returns false if the entity was already disposed.
    pub fn dispose_with(&self, teardown: impl FnOnce()) -> bool {
        if self.disposed.replace(true) {
            return false;
        }

        let owned = std::mem::take(&mut *self.owned.borrow_mut());
        if !owned.is_empty() {
            debug!(owned = owned.len(), "disposing owned items");
        }
        for item in owned.into_iter().rev() {
            match item {
                Owned::Entity(child) => child.dispose(),
                Owned::Callback(callback) => callback(),
            }
        }

        teardown();
        true
    }
}

// =============================================================================
// FREE FUNCTIONS
// =============================================================================

/// Make `parent` own `child`.
pub fn own<P: Owner, C: Disposable>(parent: &P, child: C) {
    parent.own(child);
}

/// Dispose an entity and, transitively, everything it owns.
pub fn dispose<D: Disposable + ?Sized>(entity: &D) {
    entity.dispose();
}

pub fn is_disposed<D: Disposable + ?Sized>(entity: &D) -> bool {
    entity.is_disposed()
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;

    /// Minimal owner that records its teardown into a shared log.
    #[derive(Clone)]
    struct Node {
        name: &'static str,
        lifecycle: Rc<Lifecycle>,
        log: Rc<RefCell<Vec<&'static str>>>,
    }

    impl Node {
        fn new(name: &'static str, log: &Rc<RefCell<Vec<&'static str>>>) -> Self {
            Self {
                name,
                lifecycle: Rc::new(Lifecycle::new()),
                log: log.clone(),
            }
        }
    }

    impl Disposable for Node {
        fn dispose(&self) {
            self.lifecycle
                .dispose_with(|| self.log.borrow_mut().push(self.name));
        }

        fn is_disposed(&self) -> bool {
            self.lifecycle.is_disposed()
        }
    }

    impl Owner for Node {
        fn lifecycle(&self) -> &Lifecycle {
            &self.lifecycle
        }
    }

    #[test]
    fn children_disposed_in_reverse_order_before_parent() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let parent = Node::new("parent", &log);
        parent.own(Node::new("a", &log));
        parent.own(Node::new("b", &log));
        parent.own(Node::new("c", &log));

        parent.dispose();
        assert_eq!(*log.borrow(), vec!["c", "b", "a", "parent"]);
    }

    #[test]
    fn dispose_is_idempotent() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let node = Node::new("n", &log);
        node.dispose();
        node.dispose();
        assert_eq!(*log.borrow(), vec!["n"]);
        assert!(is_disposed(&node));
    }

    #[test]
    fn cycle_terminates_and_disposes_both_once() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let a = Node::new("a", &log);
        let b = Node::new("b", &log);
        own(&a, b.clone());
        own(&b, a.clone());

        dispose(&a);
        assert!(a.is_disposed());
        assert!(b.is_disposed());
        assert_eq!(*log.borrow(), vec!["b", "a"]);
    }

    #[test]
    fn callbacks_interleave_with_children() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let parent = Node::new("parent", &log);
        parent.own(Node::new("first", &log));
        let l = log.clone();
        parent.on_dispose(move || l.borrow_mut().push("callback"));
        parent.own(Node::new("last", &log));

        parent.dispose();
        assert_eq!(*log.borrow(), vec!["last", "callback", "first", "parent"]);
    }

    #[test]
    fn owning_after_dispose_disposes_immediately() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let parent = Node::new("parent", &log);
        parent.dispose();

        let late = Node::new("late", &log);
        parent.own(late.clone());
        assert!(late.is_disposed());
        assert_eq!(parent.lifecycle().owned_count(), 0);
    }

    #[test]
    fn transitive_disposal_is_depth_first() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let root = Node::new("root", &log);
        let mid = Node::new("mid", &log);
        mid.own(Node::new("leaf", &log));
        root.own(mid);
        root.own(Node::new("sibling", &log));

        root.dispose();
        assert_eq!(*log.borrow(), vec!["sibling", "leaf", "mid", "root"]);
    }
}
