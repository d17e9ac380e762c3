// ============================================================================
// spark-reactive - Computed
// A derived value that tracks what it reads and re-evaluates eagerly
// ============================================================================
//
// Lifecycle of one evaluation:
// 1. push a tracking frame and run the compute function
// 2. diff the dependencies read this pass against the current subscriptions:
//    unsubscribe from dropped ones, subscribe to new ones, keep the rest
// 3. compare the result with the memoized value; store and emit on change
//
// A change of any subscribed dependency runs this immediately (or, inside a
// batch, queues it until the outermost batch ends). `get` never evaluates.
//
// Subscriptions hold their dependency strongly. The listener wired into a
// dependency's emitter only holds a Weak to the computed, so there is no Rc
// cycle between a computed and what it reads.
// ============================================================================

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use indexmap::IndexMap;
use tracing::{debug, trace};

use crate::core::context::{with_context, DependencySet};
use crate::core::error::{ReactiveError, Result};
use crate::core::lifecycle::{Disposable, Lifecycle, Owner};
use crate::core::types::{AnyComputation, AnyDependency, DependencyKey, EqualsFn};
use crate::primitives::emitter::{Emitter, Listener};
use crate::primitives::observable::ChangeFn;
use crate::reactivity::batching::untrack;
use crate::reactivity::tracking::{track, track_read};

// =============================================================================
// STATE & OPTIONS
// =============================================================================

/// Whether the memoized value reflects the current dependency values.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ComputedState {
    Clean,
    /// A dependency changed and re-evaluation is pending (inside a batch) or
    /// the last evaluation panicked.
    Stale,
}

/// Options for creating a computed.
pub struct ComputedOptions<T> {
    pub equals: Option<EqualsFn<T>>,
}

impl<T> Default for ComputedOptions<T> {
    fn default() -> Self {
        Self { equals: None }
    }
}

/// One live edge to a dependency.
struct Subscription {
    dependency: Rc<dyn AnyDependency>,
    listener: Listener,
}

/// Clears the evaluating flag on success or on unwind.
struct EvaluationGuard<'a>(&'a Cell<bool>);

impl Drop for EvaluationGuard<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

// =============================================================================
// COMPUTED INNER
// =============================================================================

pub struct ComputedInner<T> {
    lifecycle: Lifecycle,
    value: RefCell<Rc<T>>,
    compute: Box<dyn Fn() -> T>,
    write: Option<Box<dyn Fn(T)>>,
    emitter: Emitter<ChangeFn<T>>,
    equals: EqualsFn<T>,
    subscriptions: RefCell<IndexMap<DependencyKey, Subscription>>,
    state: Cell<ComputedState>,
    evaluating: Cell<bool>,
    evaluations: Cell<u64>,
    self_weak: Weak<ComputedInner<T>>,
}

impl<T: 'static> ComputedInner<T> {
    fn build(
        compute: Box<dyn Fn() -> T>,
        write: Option<Box<dyn Fn(T)>>,
        equals: EqualsFn<T>,
    ) -> Rc<Self> {
        let (value, fresh) = track(|| compute());

        let inner = Rc::new_cyclic(|weak| Self {
            lifecycle: Lifecycle::new(),
            value: RefCell::new(Rc::new(value)),
            compute,
            write,
            emitter: Emitter::new(),
            equals,
            subscriptions: RefCell::new(IndexMap::new()),
            state: Cell::new(ComputedState::Clean),
            evaluating: Cell::new(false),
            evaluations: Cell::new(1),
            self_weak: weak.clone(),
        });
        inner.rewire(fresh);
        trace!(dependencies = inner.subscriptions.borrow().len(), "computed created");
        inner
    }

    fn current(&self) -> Rc<T> {
        Rc::clone(&self.value.borrow())
    }

    /// Listener wired into each dependency's emitter.
    fn dependent_callback(&self) -> Rc<dyn Fn()> {
        let weak = self.self_weak.clone();
        Rc::new(move || {
            if let Some(inner) = weak.upgrade() {
                inner.on_dependency_changed();
            }
        })
    }

    fn on_dependency_changed(self: &Rc<Self>) {
        if self.lifecycle.is_disposed() {
            return;
        }
        if self.evaluating.get() {
            std::panic::panic_any(ReactiveError::CyclicEvaluation);
        }

        if with_context(|ctx| ctx.is_batching()) {
            self.state.set(ComputedState::Stale);
            let weak = Rc::downgrade(self);
            let computation: Weak<dyn AnyComputation> = weak;
            with_context(|ctx| ctx.queue_pending(DependencyKey::of(self), computation));
            return;
        }

        self.evaluate();
    }

    /// Run one evaluation. A panicking compute function leaves the value and
    /// the subscriptions as they were, with the state `Stale`.
    fn evaluate(&self) {
        if self.lifecycle.is_disposed() {
            return;
        }
        if self.evaluating.replace(true) {
            std::panic::panic_any(ReactiveError::CyclicEvaluation);
        }
        let guard = EvaluationGuard(&self.evaluating);

        self.state.set(ComputedState::Stale);
        let (value, fresh) = track(|| (self.compute)());
        self.rewire(fresh);
        drop(guard);

        let evaluations = self.evaluations.get() + 1;
        self.evaluations.set(evaluations);
        self.state.set(ComputedState::Clean);

        let unchanged = {
            let current = self.value.borrow();
            (self.equals)(&**current, &value)
        };
        trace!(evaluations, changed = !unchanged, "computed evaluated");
        if unchanged {
            return;
        }

        let new = Rc::new(value);
        let old = self.value.replace(Rc::clone(&new));
        self.emitter.emit_with(|callback| callback(&*new, &*old));
    }

    /// Make the subscriptions match `fresh`, keeping the ones still read.
    fn rewire(&self, fresh: DependencySet) {
        let mut previous = std::mem::take(&mut *self.subscriptions.borrow_mut());
        let mut next = IndexMap::with_capacity(fresh.len());
        let mut added = 0usize;

        for (key, dependency) in fresh {
            let subscription = match previous.swap_remove(&key) {
                Some(existing) => existing,
                None => {
                    added += 1;
                    let listener = dependency.add_dependent(self.dependent_callback());
                    Subscription {
                        dependency,
                        listener,
                    }
                }
            };
            next.insert(key, subscription);
        }

        let total = next.len();
        *self.subscriptions.borrow_mut() = next;

        for subscription in previous.values() {
            subscription.listener.dispose();
        }
        if added > 0 || !previous.is_empty() {
            debug!(added, removed = previous.len(), total, "computed dependencies changed");
        }
    }

    fn release_subscriptions(&self) {
        let subscriptions = std::mem::take(&mut *self.subscriptions.borrow_mut());
        for subscription in subscriptions.values() {
            subscription.listener.dispose();
        }
    }

    fn dependency_kinds(&self) -> Vec<&'static str> {
        self.subscriptions
            .borrow()
            .values()
            .map(|subscription| subscription.dependency.kind())
            .collect()
    }
}

impl<T: 'static> AnyDependency for ComputedInner<T> {
    fn add_dependent(&self, callback: Rc<dyn Fn()>) -> Listener {
        let listener: Rc<ChangeFn<T>> = Rc::new(move |_: &T, _: &T| callback());
        self.emitter.add_listener(listener)
    }

    fn kind(&self) -> &'static str {
        "computed"
    }
}

impl<T: 'static> AnyComputation for ComputedInner<T> {
    fn run_pending(&self) {
        if self.state.get() == ComputedState::Stale {
            self.evaluate();
        }
    }
}

impl<T> Drop for ComputedInner<T> {
    fn drop(&mut self) {
        for subscription in self.subscriptions.get_mut().values() {
            subscription.listener.dispose();
        }
    }
}

// =============================================================================
// COMPUTED
// =============================================================================

/// A value derived from other observables and computeds.
///
/// The compute function runs once on construction and again whenever
/// something it read last time changes. What it reads is rediscovered on
/// every run, so conditional reads subscribe and unsubscribe as needed.
///
/// # Example
///
/// ```
/// use spark_reactive::{computed, observable};
///
/// let x = observable(1);
/// let y = computed({
///     let x = x.clone();
///     move || x.get() * 2
/// });
/// assert_eq!(y.get(), 2);
///
/// x.set(3);
/// assert_eq!(y.get(), 6);
/// ```
pub struct Computed<T> {
    inner: Rc<ComputedInner<T>>,
}

impl<T> Clone for Computed<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: 'static> Computed<T> {
    /// Create a computed compared with `PartialEq`.
    pub fn new(compute: impl Fn() -> T + 'static) -> Self
    where
        T: PartialEq,
    {
        Self::with_equals(compute, crate::reactivity::equality::equals)
    }

    /// Create a computed with a custom equality function.
    pub fn with_equals(compute: impl Fn() -> T + 'static, equals: EqualsFn<T>) -> Self {
        Self {
            inner: ComputedInner::build(Box::new(compute), None, equals),
        }
    }

    pub fn with_options(compute: impl Fn() -> T + 'static, options: ComputedOptions<T>) -> Self
    where
        T: PartialEq,
    {
        match options.equals {
            Some(equals) => Self::with_equals(compute, equals),
            None => Self::new(compute),
        }
    }

    /// Create a two-way computed. `set` hands the value to `write`, which is
    /// expected to update the sources `compute` reads.
    ///
    /// # Example
    ///
    /// ```
    /// use spark_reactive::{observable, Computed};
    ///
    /// let celsius = observable(0.0_f64);
    /// let fahrenheit = Computed::writable(
    ///     { let c = celsius.clone(); move || c.get() * 9.0 / 5.0 + 32.0 },
    ///     { let c = celsius.clone(); move |f: f64| { c.set((f - 32.0) * 5.0 / 9.0); } },
    /// );
    ///
    /// fahrenheit.set(212.0).unwrap();
    /// assert_eq!(celsius.get(), 100.0);
    /// assert_eq!(fahrenheit.get(), 212.0);
    /// ```
    pub fn writable(compute: impl Fn() -> T + 'static, write: impl Fn(T) + 'static) -> Self
    where
        T: PartialEq,
    {
        Self {
            inner: ComputedInner::build(
                Box::new(compute),
                Some(Box::new(write)),
                crate::reactivity::equality::equals,
            ),
        }
    }

    /// Get the memoized value (cloning). Never evaluates.
    ///
    /// Inside another computed's evaluation this registers a dependency.
    pub fn get(&self) -> T
    where
        T: Clone,
    {
        track_read(&self.inner);
        (*self.inner.current()).clone()
    }

    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        track_read(&self.inner);
        f(&*self.inner.current())
    }

    /// Get the memoized value without registering a dependency.
    pub fn peek(&self) -> T
    where
        T: Clone,
    {
        (*self.inner.current()).clone()
    }

    /// Route `value` through the write-back function.
    pub fn set(&self, value: T) -> Result<()> {
        if self.is_disposed() {
            return Err(ReactiveError::disposed("computed"));
        }
        let Some(write) = self.inner.write.as_ref() else {
            return Err(ReactiveError::ReadOnly);
        };
        untrack(|| write(value));
        Ok(())
    }

    pub fn is_writable(&self) -> bool {
        self.inner.write.is_some()
    }

    /// Register a `(new, old)` listener.
    pub fn subscribe(&self, callback: impl Fn(&T, &T) + 'static) -> Listener {
        self.inner.emitter.add_listener(Rc::new(callback))
    }

    pub fn state(&self) -> ComputedState {
        self.inner.state.get()
    }

    /// Number of dependencies read by the last successful evaluation
    pub fn dependency_count(&self) -> usize {
        self.inner.subscriptions.borrow().len()
    }

    /// How many times the compute function has completed, including the
    /// initial run
    pub fn evaluation_count(&self) -> u64 {
        self.inner.evaluations.get()
    }

    pub fn has_listeners(&self) -> bool {
        self.inner.emitter.has_listeners()
    }

    pub fn listener_count(&self) -> usize {
        self.inner.emitter.listener_count()
    }

    pub fn set_listener_change_callback(&self, callback: impl Fn(bool) + 'static) {
        self.inner.emitter.set_change_callback(callback);
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    pub fn as_dependency(&self) -> Rc<dyn AnyDependency> {
        self.inner.clone()
    }
}

impl<T: 'static> Disposable for Computed<T> {
    /// Dispose owned items, release every dependency subscription and drop
    /// every listener. The last value stays readable.
    fn dispose(&self) {
        let inner = &self.inner;
        inner.lifecycle.dispose_with(|| {
            inner.release_subscriptions();
            inner.emitter.dispose();
        });
    }

    fn is_disposed(&self) -> bool {
        self.inner.lifecycle.is_disposed()
    }
}

impl<T: 'static> Owner for Computed<T> {
    fn lifecycle(&self) -> &Lifecycle {
        &self.inner.lifecycle
    }
}

impl<T: std::fmt::Debug + 'static> std::fmt::Debug for Computed<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Computed")
            .field("value", &**self.inner.value.borrow())
            .field("state", &self.inner.state.get())
            .field("dependencies", &self.inner.dependency_kinds())
            .finish()
    }
}

// =============================================================================
// CREATION FUNCTIONS
// =============================================================================

/// Create a computed value.
pub fn computed<T>(compute: impl Fn() -> T + 'static) -> Computed<T>
where
    T: PartialEq + 'static,
{
    Computed::new(compute)
}

/// Create a two-way computed value.
pub fn writable_computed<T>(
    compute: impl Fn() -> T + 'static,
    write: impl Fn(T) + 'static,
) -> Computed<T>
where
    T: PartialEq + 'static,
{
    Computed::writable(compute, write)
}

// =============================================================================
// TESTS
// =============================================================================
