// ============================================================================
// spark-reactive - Observables, Computeds and Deterministic Disposal
// ============================================================================
//
// Layers, bottom up:
// - core:        listener arena, lifecycle/ownership graph, tracking context
// - primitives:  Emitter, Observable, Computed, Scope, Holder
// - reactivity:  dependency tracking, batching, equality, subscribe helper
//
// Everything is single-threaded: handles are Rc-based and the tracking
// context is thread-local.
// ============================================================================

#[macro_use]
mod macros;

pub mod core;
pub mod primitives;
pub mod reactivity;

// Re-export core items at crate root for ergonomic access
pub use crate::core::context::{is_batching, is_tracking, tracking_depth, with_context, ReactiveContext};
pub use crate::core::error::{ReactiveError, Result};
pub use crate::core::lifecycle::{dispose, is_disposed, own, Disposable, Lifecycle, Owner};
pub use crate::core::types::{AnyComputation, AnyDependency, DependencyKey, EqualsFn};

// Re-export primitives at crate root
pub use primitives::computed::{
    computed, writable_computed, Computed, ComputedOptions, ComputedState,
};
pub use primitives::emitter::{Emitter, Listener};
pub use primitives::holder::{Holder, Scope};
pub use primitives::observable::{
    mutable_observable, observable, observable_f64, Observable, ObservableOptions,
};

// Re-export reactivity functions
pub use reactivity::batching::{batch, peek, untrack};
pub use reactivity::equality::{
    always_equals, by_field, equals, never_equals, safe_equals_f32, safe_equals_f64,
    safe_equals_option_f64, shallow_equals_slice,
};
pub use reactivity::subscribe::{subscribe, subscribe_owned, Subscribable};
pub use reactivity::tracking::{track, track_read};

// =============================================================================
// TESTS
// =============================================================================
