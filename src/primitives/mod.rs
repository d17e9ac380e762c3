// ============================================================================
// spark-reactive - Primitives Module
// Emitter, observable, computed and the value-less owners
// ============================================================================

pub mod computed;
pub mod emitter;
pub mod holder;
pub mod observable;

// Re-export for convenience
pub use computed::{
    computed, writable_computed, Computed, ComputedInner, ComputedOptions, ComputedState,
};
pub use emitter::{ChangeCallback, Emitter, EmitterInner, Listener};
pub use holder::{Holder, Scope};
pub use observable::{
    mutable_observable, observable, observable_f64, ChangeFn, Observable, ObservableInner,
    ObservableOptions,
};
