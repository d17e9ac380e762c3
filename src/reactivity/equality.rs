// ============================================================================
// spark-reactive - Equality Policies
// Decide whether a new value counts as a change
// ============================================================================
//
// Observables and computeds compare the incoming value with the current one
// through an `EqualsFn<T>`. "Equal" means no emission.
// ============================================================================

use crate::core::types::EqualsFn;

// =============================================================================
// STRICT EQUALITY (Default)
// =============================================================================

/// Default strict equality using PartialEq.
///
/// # Example
/// ```
/// use spark_reactive::reactivity::equality::equals;
///
/// assert!(equals(&42, &42));
/// assert!(!equals(&42, &43));
/// ```
pub fn equals<T: PartialEq>(a: &T, b: &T) -> bool {
    a == b
}

// =============================================================================
// FLOATS
// =============================================================================

/// Equality for f64 that treats NaN as equal to NaN.
///
/// Under plain `PartialEq` an observable holding NaN would emit on every
/// `set(NaN)`.
///
/// # Example
/// ```
/// use spark_reactive::reactivity::equality::safe_equals_f64;
///
/// assert!(safe_equals_f64(&1.0, &1.0));
/// assert!(!safe_equals_f64(&1.0, &2.0));
/// assert!(safe_equals_f64(&f64::NAN, &f64::NAN));
/// ```
pub fn safe_equals_f64(a: &f64, b: &f64) -> bool {
    if a.is_nan() {
        return b.is_nan();
    }
    a == b
}

/// Equality for f32 that treats NaN as equal to NaN.
pub fn safe_equals_f32(a: &f32, b: &f32) -> bool {
    if a.is_nan() {
        return b.is_nan();
    }
    a == b
}

pub fn safe_equals_option_f64(a: &Option<f64>, b: &Option<f64>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) => safe_equals_f64(a, b),
        _ => false,
    }
}

// =============================================================================
// FIXED POLICIES
// =============================================================================

/// Never equal: every `set` emits, even with an identical value.
///
/// Useful for types without a meaningful `PartialEq`.
pub fn never_equals<T>(_a: &T, _b: &T) -> bool {
    false
}

/// Always equal: `set` stores nothing and never emits.
pub fn always_equals<T>(_a: &T, _b: &T) -> bool {
    true
}

/// Shallow equality for slices.
pub fn shallow_equals_slice<T: PartialEq>(a: &[T], b: &[T]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x == y)
}

/// Compare two values by a projected field.
///
/// Closures can't be turned into `EqualsFn` pointers, so this is for
/// comparisons done by hand; for an observable, write a `fn` with the same
/// body and pass that.
///
/// # Example
/// ```
/// use spark_reactive::reactivity::equality::by_field;
///
/// struct User { id: u32, name: &'static str }
///
/// let same_user = by_field(|u: &User| u.id);
/// assert!(same_user(&User { id: 1, name: "a" }, &User { id: 1, name: "b" }));
/// ```
pub fn by_field<T, F, R>(field_fn: F) -> impl Fn(&T, &T) -> bool
where
    F: Fn(&T) -> R,
    R: PartialEq,
{
    move |a, b| field_fn(a) == field_fn(b)
}

/// The default policy as an `EqualsFn` pointer
pub fn default_equals_fn<T: PartialEq + 'static>() -> EqualsFn<T> {
    equals
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strict_equals() {
        assert!(equals(&"hello", &"hello"));
        assert!(!equals(&"hello", &"world"));
    }

    #[test]
    fn float_nan_handling() {
        assert!(safe_equals_f64(&f64::NAN, &f64::NAN));
        assert!(!safe_equals_f64(&f64::NAN, &1.0));
        assert!(!safe_equals_f64(&1.0, &f64::NAN));
        assert!(safe_equals_f64(&-0.0, &0.0));
        assert!(safe_equals_f32(&f32::NAN, &f32::NAN));
        assert!(!safe_equals_f32(&f32::NAN, &1.0));
    }

    #[test]
    fn option_float() {
        assert!(safe_equals_option_f64(&Some(f64::NAN), &Some(f64::NAN)));
        assert!(safe_equals_option_f64(&None, &None));
        assert!(!safe_equals_option_f64(&Some(1.0), &None));
    }

    #[test]
    fn fixed_policies() {
        assert!(!never_equals(&1, &1));
        assert!(always_equals(&1, &2));
    }

    #[test]
    fn slices() {
        assert!(shallow_equals_slice(&[1, 2, 3], &[1, 2, 3]));
        assert!(!shallow_equals_slice(&[1, 2], &[1, 2, 3]));
    }

    #[test]
    fn default_pointer() {
        let eq: EqualsFn<i32> = default_equals_fn();
        assert!(eq(&4, &4));
        assert!(!eq(&4, &5));
    }
}
