// ============================================================================
// spark-reactive - Ergonomic Macros
// ============================================================================

/// Helper macro to clone variables into a move closure.
///
/// Observables and computeds are cheap `Rc` handles; this saves the
/// `let x = x.clone();` lines before every `move` closure.
///
/// # Usage
///
/// ```rust
/// use spark_reactive::{cloned, computed, observable};
///
/// let a = observable(1);
/// let b = observable(2);
///
/// let sum = computed(cloned!(a, b => move || a.get() + b.get()));
/// assert_eq!(sum.get(), 3);
/// ```
#[macro_export]
macro_rules! cloned {
    ($($n:ident),+ => $e:expr) => {
        {
            $( let $n = $n.clone(); )+
            $e
        }
    };
}

/// Create a computed with automatic variable capturing.
///
/// Wraps `computed(cloned!(... => move || ...))`.
///
/// # Usage
///
/// ```rust
/// use spark_reactive::{computed, observable};
///
/// let a = observable(1);
/// let b = observable(2);
///
/// let sum = computed!(a, b => a.get() + b.get());
/// a.set(10);
/// assert_eq!(sum.get(), 12);
/// ```
#[macro_export]
macro_rules! computed {
    ($($deps:ident),+ => $body:expr) => {
        $crate::computed($crate::cloned!($($deps),+ => move || $body))
    };
    ($body:expr) => {
        $crate::computed(move || $body)
    };
}
