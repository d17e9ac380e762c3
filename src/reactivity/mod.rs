// ============================================================================
// spark-reactive - Reactivity Module
// Dependency tracking, batching, equality policies and the subscribe helper
// ============================================================================

pub mod batching;
pub mod equality;
pub mod subscribe;
pub mod tracking;

// Re-export main tracking functions
pub use tracking::{track, track_read};

// Re-export batching functions
pub use batching::{batch, peek, untrack};

pub use subscribe::{subscribe, subscribe_owned, Subscribable};
