// ============================================================================
// spark-reactive - Subscribe
// One calling convention for every source of change notifications
// ============================================================================

use std::rc::Rc;

use crate::core::lifecycle::Owner;
use crate::primitives::computed::Computed;
use crate::primitives::emitter::{Emitter, Listener};
use crate::primitives::observable::Observable;

/// Anything that can tell a no-argument callback that it changed or fired.
///
/// Implemented by plain emitters, one-argument emitters, observables and
/// computeds. Their own listener shapes differ; subscribers through this
/// trait don't see the payload.
pub trait Subscribable {
    fn add_subscriber(&self, callback: Rc<dyn Fn()>) -> Listener;
}

impl Subscribable for Emitter<dyn Fn()> {
    fn add_subscriber(&self, callback: Rc<dyn Fn()>) -> Listener {
        self.add_listener(callback)
    }
}

impl<A: ?Sized + 'static> Subscribable for Emitter<dyn Fn(&A)> {
    fn add_subscriber(&self, callback: Rc<dyn Fn()>) -> Listener {
        self.listen(move |_: &A| callback())
    }
}

impl<T: 'static> Subscribable for Observable<T> {
    fn add_subscriber(&self, callback: Rc<dyn Fn()>) -> Listener {
        self.subscribe(move |_, _| callback())
    }
}

impl<T: 'static> Subscribable for Computed<T> {
    fn add_subscriber(&self, callback: Rc<dyn Fn()>) -> Listener {
        self.subscribe(move |_, _| callback())
    }
}

/// Call `callback` whenever `source` changes or fires.
///
/// # Example
///
/// ```
/// use spark_reactive::{observable, subscribe, Disposable, Emitter};
/// use std::cell::Cell;
/// use std::rc::Rc;
///
/// let hits = Rc::new(Cell::new(0));
/// let count = observable(0);
/// let clicks: Emitter = Emitter::new();
///
/// let h = hits.clone();
/// let on_count = subscribe(&count, move || h.set(h.get() + 1));
/// let h = hits.clone();
/// let _on_click = subscribe(&clicks, move || h.set(h.get() + 1));
///
/// count.set(1);
/// clicks.emit();
/// assert_eq!(hits.get(), 2);
///
/// on_count.dispose();
/// count.set(2);
/// assert_eq!(hits.get(), 2);
/// ```
pub fn subscribe<S>(source: &S, callback: impl Fn() + 'static) -> Listener
where
    S: Subscribable + ?Sized,
{
    source.add_subscriber(Rc::new(callback))
}

/// Like [`subscribe`], with the listener owned by `owner`: disposing the
/// owner disposes the listener.
///
/// If `owner` is already disposed the returned listener is disposed too.
pub fn subscribe_owned<O, S>(owner: &O, source: &S, callback: impl Fn() + 'static) -> Listener
where
    O: Owner,
    S: Subscribable + ?Sized,
{
    let listener = subscribe(source, callback);
    owner.own(listener.clone());
    listener
}

// =============================================================================
// TESTS
// =============================================================================
