// ============================================================================
// spark-reactive - Scope & Holder
// Owners with no value of their own
// ============================================================================

use std::cell::RefCell;
use std::rc::Rc;

use tracing::debug;

use crate::core::error::{ReactiveError, Result};
use crate::core::lifecycle::{Disposable, Lifecycle, Owner};

// =============================================================================
// SCOPE
// =============================================================================

/// A bare owner, for tying listener lifetimes to something outside the
/// reactive graph (a widget, a connection, a test).
///
/// # Example
///
/// ```
/// use spark_reactive::{observable, subscribe_owned, Disposable, Scope};
///
/// let count = observable(0);
/// let scope = Scope::new();
/// let _listener = subscribe_owned(&scope, &count, || println!("changed"));
/// assert!(count.has_listeners());
///
/// scope.dispose();
/// assert!(!count.has_listeners());
/// ```
#[derive(Clone, Default)]
pub struct Scope {
    lifecycle: Rc<Lifecycle>,
}

impl Scope {
    pub fn new() -> Self {
        Self::default()
    }

    /// Owned children and callbacks not yet disposed
    pub fn owned_count(&self) -> usize {
        self.lifecycle.owned_count()
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.lifecycle, &other.lifecycle)
    }
}

impl Disposable for Scope {
    fn dispose(&self) {
        let owned = self.lifecycle.owned_count();
        if self.lifecycle.dispose_with(|| {}) {
            debug!(owned, "scope disposed");
        }
    }

    fn is_disposed(&self) -> bool {
        self.lifecycle.is_disposed()
    }
}

impl Owner for Scope {
    fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }
}

impl std::fmt::Debug for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scope")
            .field("owned", &self.lifecycle.owned_count())
            .field("disposed", &self.lifecycle.is_disposed())
            .finish()
    }
}

// =============================================================================
// HOLDER
// =============================================================================

struct HolderInner<D> {
    lifecycle: Lifecycle,
    value: RefCell<Option<D>>,
}

/// Holds at most one disposable.
///
/// Replacing or clearing the held value disposes the previous one, and
/// disposing the holder disposes whatever it holds.
///
/// # Example
///
/// ```
/// use spark_reactive::{observable, Disposable, Holder};
///
/// let a = observable(1);
/// let b = observable(2);
/// let current = Holder::new();
///
/// current.set(a.subscribe(|_, _| {})).unwrap();
/// current.set(b.subscribe(|_, _| {})).unwrap(); // disposes the first
/// assert!(!a.has_listeners());
/// assert!(b.has_listeners());
///
/// current.dispose();
/// assert!(!b.has_listeners());
/// ```
pub struct Holder<D> {
    inner: Rc<HolderInner<D>>,
}

impl<D> Clone for Holder<D> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<D: Disposable> Holder<D> {
    pub fn new() -> Self {
        Self {
            inner: Rc::new(HolderInner {
                lifecycle: Lifecycle::new(),
                value: RefCell::new(None),
            }),
        }
    }

    pub fn with_value(value: D) -> Self {
        let holder = Self::new();
        *holder.inner.value.borrow_mut() = Some(value);
        holder
    }

    /// Hold `value`, disposing the previous one.
    ///
    /// On a disposed holder `value` is disposed at once and an error is
    /// returned.
    pub fn set(&self, value: D) -> Result<()> {
        if self.is_disposed() {
            value.dispose();
            return Err(ReactiveError::disposed("holder"));
        }
        let previous = self.inner.value.borrow_mut().replace(value);
        if let Some(previous) = previous {
            previous.dispose();
        }
        Ok(())
    }

    /// Dispose and forget the held value.
    pub fn clear(&self) {
        let previous = self.inner.value.borrow_mut().take();
        if let Some(previous) = previous {
            previous.dispose();
        }
    }

    /// Give up the held value without disposing it.
    pub fn take(&self) -> Option<D> {
        self.inner.value.borrow_mut().take()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.value.borrow().is_none()
    }

    pub fn with<R>(&self, f: impl FnOnce(Option<&D>) -> R) -> R {
        f(self.inner.value.borrow().as_ref())
    }

    pub fn get(&self) -> Option<D>
    where
        D: Clone,
    {
        self.inner.value.borrow().clone()
    }
}

impl<D: Disposable> Default for Holder<D> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D: Disposable> Disposable for Holder<D> {
    fn dispose(&self) {
        let inner = &self.inner;
        inner.lifecycle.dispose_with(|| {
            let held = inner.value.borrow_mut().take();
            if let Some(held) = held {
                held.dispose();
            }
        });
    }

    fn is_disposed(&self) -> bool {
        self.inner.lifecycle.is_disposed()
    }
}

impl<D: Disposable> Owner for Holder<D> {
    fn lifecycle(&self) -> &Lifecycle {
        &self.inner.lifecycle
    }
}

impl<D> std::fmt::Debug for Holder<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Holder")
            .field("holding", &self.inner.value.borrow().is_some())
            .field("disposed", &self.inner.lifecycle.is_disposed())
            .finish()
    }
}

// =============================================================================
// TESTS
// =============================================================================
