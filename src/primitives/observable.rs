// ============================================================================
// spark-reactive - Observable
// A mutable value cell that notifies on change
// ============================================================================

use std::cell::RefCell;
use std::rc::Rc;

use tracing::warn;

use crate::core::error::{ReactiveError, Result};
use crate::core::lifecycle::{Disposable, Lifecycle, Owner};
use crate::core::types::{AnyDependency, EqualsFn};
use crate::primitives::emitter::{Emitter, Listener};
use crate::reactivity::tracking::track_read;

/// Listener shape for value changes: `(new, old)`
pub type ChangeFn<T> = dyn Fn(&T, &T);

// =============================================================================
// OPTIONS
// =============================================================================

/// Options for creating an observable.
pub struct ObservableOptions<T> {
    pub equals: Option<EqualsFn<T>>,
}

impl<T> Default for ObservableOptions<T> {
    fn default() -> Self {
        Self { equals: None }
    }
}

// =============================================================================
// OBSERVABLE INNER
// =============================================================================

/// Shared state behind an [`Observable`].
///
/// The value sits behind an `Rc` so an emission can hand out `(&new, &old)`
/// without holding a borrow while listeners run.
pub struct ObservableInner<T> {
    lifecycle: Lifecycle,
    value: RefCell<Rc<T>>,
    emitter: Emitter<ChangeFn<T>>,
    equals: EqualsFn<T>,
}

impl<T: 'static> ObservableInner<T> {
    fn new(value: T, equals: EqualsFn<T>) -> Self {
        Self {
            lifecycle: Lifecycle::new(),
            value: RefCell::new(Rc::new(value)),
            emitter: Emitter::new(),
            equals,
        }
    }

    fn current(&self) -> Rc<T> {
        Rc::clone(&self.value.borrow())
    }

    fn is_equal(&self, value: &T) -> bool {
        let current = self.value.borrow();
        (self.equals)(&**current, value)
    }

    /// Store `value` and emit `(new, old)`. No borrow is held while
    /// listeners run.
    fn store_and_emit(&self, value: T) {
        let new = Rc::new(value);
        let old = self.value.replace(Rc::clone(&new));
        self.emitter.emit_with(|callback| callback(&*new, &*old));
    }
}

impl<T: 'static> AnyDependency for ObservableInner<T> {
    fn add_dependent(&self, callback: Rc<dyn Fn()>) -> Listener {
        let listener: Rc<ChangeFn<T>> = Rc::new(move |_: &T, _: &T| callback());
        self.emitter.add_listener(listener)
    }

    fn kind(&self) -> &'static str {
        "observable"
    }
}

// =============================================================================
// OBSERVABLE
// =============================================================================

/// A reactive value cell.
///
/// `set` compares the new value with the current one under the configured
/// equality policy; only an actual change is stored and emitted.
///
/// # Example
///
/// ```
/// use spark_reactive::observable;
/// use std::cell::RefCell;
/// use std::rc::Rc;
///
/// let count = observable(1);
/// let seen = Rc::new(RefCell::new(Vec::new()));
///
/// let s = seen.clone();
/// let _listener = count.subscribe(move |new, old| s.borrow_mut().push((*new, *old)));
///
/// count.set(2);
/// count.set(2); // equal: no emission
/// count.set(5);
/// assert_eq!(*seen.borrow(), vec![(2, 1), (5, 2)]);
/// ```
pub struct Observable<T> {
    inner: Rc<ObservableInner<T>>,
}

impl<T> Clone for Observable<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: 'static> Observable<T> {
    /// Create an observable compared with `PartialEq`.
    pub fn new(value: T) -> Self
    where
        T: PartialEq,
    {
        Self::with_equals(value, crate::reactivity::equality::equals)
    }

    /// Create an observable with a custom equality function.
    pub fn with_equals(value: T, equals: EqualsFn<T>) -> Self {
        Self {
            inner: Rc::new(ObservableInner::new(value, equals)),
        }
    }

    pub fn with_options(value: T, options: ObservableOptions<T>) -> Self
    where
        T: PartialEq,
    {
        match options.equals {
            Some(equals) => Self::with_equals(value, equals),
            None => Self::new(value),
        }
    }

    /// Get the current value (cloning).
    ///
    /// Inside a computed's evaluation this registers the observable as a
    /// dependency.
    pub fn get(&self) -> T
    where
        T: Clone,
    {
        track_read(&self.inner);
        (*self.inner.current()).clone()
    }

    /// Access the current value with a closure (avoids cloning).
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        track_read(&self.inner);
        f(&*self.inner.current())
    }

    /// Get the current value without registering a dependency.
    pub fn peek(&self) -> T
    where
        T: Clone,
    {
        (*self.inner.current()).clone()
    }

    /// Set the value.
    ///
    /// Returns true if the value changed. Listeners have all run by the
    /// time this returns.
    ///
    /// Setting a disposed observable is a programming error: it fails a
    /// debug assertion, and in release builds stores the value without
    /// emitting.
    pub fn set(&self, value: T) -> bool {
        if self.is_disposed() {
            debug_assert!(false, "set on a disposed observable");
            warn!("set on a disposed observable");
            let _previous = self.inner.value.replace(Rc::new(value));
            return false;
        }

        if self.inner.is_equal(&value) {
            return false;
        }
        self.inner.store_and_emit(value);
        true
    }

    /// Set the value, failing if the observable has been disposed.
    pub fn try_set(&self, value: T) -> Result<bool> {
        if self.is_disposed() {
            return Err(ReactiveError::disposed("observable"));
        }
        Ok(self.set(value))
    }

    /// Store the value and emit even if it equals the current one.
    pub fn set_and_trigger(&self, value: T) {
        if self.is_disposed() {
            debug_assert!(false, "set_and_trigger on a disposed observable");
            warn!("set_and_trigger on a disposed observable");
            let _previous = self.inner.value.replace(Rc::new(value));
            return;
        }
        self.inner.store_and_emit(value);
    }

    /// Update the value in place using a closure.
    ///
    /// The closure works on a copy; the result goes through `set`.
    ///
    /// # Example
    ///
    /// ```
    /// use spark_reactive::observable;
    ///
    /// let items = observable(vec![1, 2]);
    /// items.update(|v| v.push(3));
    /// assert_eq!(items.get(), vec![1, 2, 3]);
    /// ```
    pub fn update(&self, f: impl FnOnce(&mut T)) -> bool
    where
        T: Clone,
    {
        let mut next = (*self.inner.current()).clone();
        f(&mut next);
        self.set(next)
    }

    /// Register a `(new, old)` listener.
    pub fn subscribe(&self, callback: impl Fn(&T, &T) + 'static) -> Listener {
        self.inner.emitter.add_listener(Rc::new(callback))
    }

    pub fn has_listeners(&self) -> bool {
        self.inner.emitter.has_listeners()
    }

    pub fn listener_count(&self) -> usize {
        self.inner.emitter.listener_count()
    }

    /// Be told whenever the listener set goes empty or non-empty.
    pub fn set_listener_change_callback(&self, callback: impl Fn(bool) + 'static) {
        self.inner.emitter.set_change_callback(callback);
    }

    /// Whether two handles refer to the same observable
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// Get the inner state as a type-erased dependency.
    pub fn as_dependency(&self) -> Rc<dyn AnyDependency> {
        self.inner.clone()
    }
}

impl<T: 'static> Disposable for Observable<T> {
    /// Dispose owned items, then drop every listener. The value stays
    /// readable.
    fn dispose(&self) {
        let inner = &self.inner;
        inner.lifecycle.dispose_with(|| inner.emitter.dispose());
    }

    fn is_disposed(&self) -> bool {
        self.inner.lifecycle.is_disposed()
    }
}

impl<T: 'static> Owner for Observable<T> {
    fn lifecycle(&self) -> &Lifecycle {
        &self.inner.lifecycle
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for Observable<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Observable")
            .field("value", &**self.inner.value.borrow())
            .field("disposed", &self.inner.lifecycle.is_disposed())
            .finish()
    }
}

// =============================================================================
// CREATION FUNCTIONS
// =============================================================================

/// Create a new observable.
///
/// # Example
///
/// ```
/// use spark_reactive::observable;
///
/// let name = observable(String::from("ada"));
/// assert!(name.set(String::from("grace")));
/// assert_eq!(name.get(), "grace");
/// ```
pub fn observable<T>(value: T) -> Observable<T>
where
    T: PartialEq + 'static,
{
    Observable::new(value)
}

/// Create an observable that emits on every `set`.
///
/// For values mutated in place or without a meaningful `PartialEq`.
pub fn mutable_observable<T: 'static>(value: T) -> Observable<T> {
    Observable::with_equals(value, crate::reactivity::equality::never_equals)
}

/// Create an f64 observable where NaN equals NaN.
pub fn observable_f64(value: f64) -> Observable<f64> {
    Observable::with_equals(value, crate::reactivity::equality::safe_equals_f64)
}

// =============================================================================
// TESTS
// =============================================================================
