// ============================================================================
// spark-reactive - Emitter
// Synchronous listener registry with O(1) subscribe/unsubscribe
// ============================================================================
//
// Emission policy:
// - listeners run in registration order
// - a listener added during an emission is not called in that pass
// - a listener removed during an emission, before the walk reaches it, is
//   skipped
// - a panicking listener is not caught; later listeners of that pass don't run
//
// No borrow of the list is held while a callback runs, so callbacks may add
// or remove listeners, dispose the emitter, or emit again.
// ============================================================================

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use tracing::{trace, warn};

use crate::core::lifecycle::{Disposable, Lifecycle, Owner};
use crate::core::listener_list::{ListenerList, NodeKey};

/// Callback invoked with the new "has listeners" state
pub type ChangeCallback = dyn Fn(bool);

// =============================================================================
// EMITTER INNER
// =============================================================================

pub struct EmitterInner<F: ?Sized> {
    lifecycle: Lifecycle,
    list: RefCell<ListenerList<F>>,
    change_callback: RefCell<Option<Rc<ChangeCallback>>>,
}

impl<F: ?Sized> EmitterInner<F> {
    fn notify_change(&self) {
        let has_listeners = !self.list.borrow().is_empty();
        let callback = self.change_callback.borrow().clone();
        if let Some(callback) = callback {
            callback(has_listeners);
        }
    }
}

/// Type-erased view of an emitter, held weakly by each [`Listener`].
trait ListenerHost {
    fn unlink(&self, key: NodeKey);
    fn is_linked(&self, key: NodeKey) -> bool;
}

impl<F: ?Sized + 'static> ListenerHost for EmitterInner<F> {
    fn unlink(&self, key: NodeKey) {
        // Dropping a callback can drop a computed, which unlinks from here too
        let removed = self.list.borrow_mut().remove(key);
        if removed.is_some() {
            self.notify_change();
        }
        drop(removed);
    }

    fn is_linked(&self, key: NodeKey) -> bool {
        self.list.borrow().contains(key)
    }
}

// =============================================================================
// EMITTER
// =============================================================================

/// An ordered set of callbacks that can all be invoked at once.
///
/// `F` is the callback shape. `Emitter` (no-argument callbacks) and
/// `Emitter<dyn Fn(&A)>` get an `emit` method; any other shape is driven
/// through [`Emitter::emit_with`].
///
/// # Example
///
/// ```
/// use spark_reactive::{Disposable, Emitter};
/// use std::cell::Cell;
/// use std::rc::Rc;
///
/// let emitter: Emitter = Emitter::new();
/// let hits = Rc::new(Cell::new(0));
///
/// let h = hits.clone();
/// let listener = emitter.listen(move || h.set(h.get() + 1));
///
/// emitter.emit();
/// listener.dispose();
/// emitter.emit();
/// assert_eq!(hits.get(), 1);
/// ```
pub struct Emitter<F: ?Sized = dyn Fn()> {
    inner: Rc<EmitterInner<F>>,
}

impl<F: ?Sized> Clone for Emitter<F> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<F: ?Sized + 'static> Emitter<F> {
    pub fn new() -> Self {
        Self {
            inner: Rc::new(EmitterInner {
                lifecycle: Lifecycle::new(),
                list: RefCell::new(ListenerList::new()),
                change_callback: RefCell::new(None),
            }),
        }
    }

    /// Register a callback. O(1).
    ///
    /// On a disposed emitter nothing is registered and the returned listener
    /// is already disposed.
    pub fn add_listener(&self, callback: Rc<F>) -> Listener {
        if self.is_disposed() {
            warn!("add_listener on a disposed emitter");
            return Listener::detached();
        }

        let key = self.inner.list.borrow_mut().push_back(callback);
        self.inner.notify_change();

        let weak = Rc::downgrade(&self.inner);
        let host: Weak<dyn ListenerHost> = weak;
        Listener { host, key }
    }

    /// Invoke every listener linked when the call began.
    ///
    /// `invoke` receives each callback in turn and decides how to call it.
    pub fn emit_with(&self, mut invoke: impl FnMut(&F)) {
        let keys = self.inner.list.borrow().keys();
        trace!(listeners = keys.len(), "emit");

        for key in keys {
            let callback = self.inner.list.borrow().callback(key);
            if let Some(callback) = callback {
                invoke(&callback);
            }
        }
    }

    /// True iff at least one listener is linked
    pub fn has_listeners(&self) -> bool {
        !self.inner.list.borrow().is_empty()
    }

    pub fn listener_count(&self) -> usize {
        self.inner.list.borrow().len()
    }

    /// Set the single "listener set changed" callback. Last writer wins.
    ///
    /// It is called after every add and every removal with the new
    /// `has_listeners()` value.
    pub fn set_change_callback(&self, callback: impl Fn(bool) + 'static) {
        let previous = self.inner.change_callback.replace(Some(Rc::new(callback)));
        drop(previous);
    }

    pub fn clear_change_callback(&self) {
        let previous = self.inner.change_callback.replace(None);
        drop(previous);
    }

    /// Whether two handles refer to the same emitter
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Emitter<dyn Fn()> {
    /// Register a plain closure.
    pub fn listen(&self, callback: impl Fn() + 'static) -> Listener {
        self.add_listener(Rc::new(callback))
    }

    pub fn emit(&self) {
        self.emit_with(|callback| callback());
    }
}

impl<A: ?Sized + 'static> Emitter<dyn Fn(&A)> {
    /// Register a plain closure.
    pub fn listen(&self, callback: impl Fn(&A) + 'static) -> Listener {
        self.add_listener(Rc::new(callback))
    }

    pub fn emit(&self, arg: &A) {
        self.emit_with(|callback| callback(arg));
    }
}

impl<F: ?Sized + 'static> Default for Emitter<F> {
    fn default() -> Self {
        Self::new()
    }
}

impl<F: ?Sized + 'static> Disposable for Emitter<F> {
    /// Sever every listener's links and drop the change callback.
    ///
    /// Listener handles stay valid and report themselves disposed.
    fn dispose(&self) {
        let inner = &self.inner;
        inner.lifecycle.dispose_with(|| {
            let drained = inner.list.borrow_mut().clear();
            let change_callback = inner.change_callback.replace(None);
            drop(drained);
            drop(change_callback);
        });
    }

    fn is_disposed(&self) -> bool {
        self.inner.lifecycle.is_disposed()
    }
}

impl<F: ?Sized + 'static> Owner for Emitter<F> {
    fn lifecycle(&self) -> &Lifecycle {
        &self.inner.lifecycle
    }
}

impl<F: ?Sized> std::fmt::Debug for Emitter<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Emitter")
            .field("listeners", &self.inner.list.borrow().len())
            .field("disposed", &self.inner.lifecycle.is_disposed())
            .finish()
    }
}

// =============================================================================
// LISTENER
// =============================================================================

/// Handle to one registered callback. Disposing it unregisters the callback.
///
/// Holds its emitter weakly: a listener never keeps an emitter alive.
#[derive(Clone)]
pub struct Listener {
    host: Weak<dyn ListenerHost>,
    key: NodeKey,
}

impl Listener {
    /// A listener attached to nothing; it reports itself disposed.
    pub fn detached() -> Self {
        let host: Weak<dyn ListenerHost> = Weak::<EmitterInner<dyn Fn()>>::new();
        Self {
            host,
            key: NodeKey::default(),
        }
    }
}

impl Disposable for Listener {
    fn dispose(&self) {
        if let Some(host) = self.host.upgrade() {
            host.unlink(self.key);
        }
    }

    fn is_disposed(&self) -> bool {
        self.host
            .upgrade()
            .is_none_or(|host| !host.is_linked(self.key))
    }
}

impl std::fmt::Debug for Listener {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Listener")
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

// =============================================================================
// TESTS
// =============================================================================
