// ============================================================================
// spark-reactive - Core Module
// Fundamental types, the listener arena, lifecycles and the tracking context
// ============================================================================

pub mod context;
pub mod error;
pub mod lifecycle;
pub mod listener_list;
pub mod types;

// Re-export commonly used items
pub use context::{is_batching, is_tracking, tracking_depth, with_context, ReactiveContext};
pub use error::{ReactiveError, Result};
pub use lifecycle::{dispose, is_disposed, own, Disposable, Lifecycle, Owner};
pub use listener_list::{ListenerList, NodeKey};
pub use types::{AnyComputation, AnyDependency, DependencyKey, EqualsFn};
