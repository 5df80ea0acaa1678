//! Combinators for [`Option`].

/// Extension methods for [`Option`] used throughout the runtime.
///
/// # Examples
///
/// ```rust
/// use teaflow::data::OptionalExt;
///
/// let present = Some(20).chain(|n| Some(n + 1));
/// assert_eq!(present, Some(21));
///
/// let label = None::<i32>.fold(|| "absent".to_string(), |n| n.to_string());
/// assert_eq!(label, "absent");
/// ```
pub trait OptionalExt<T>: Sized {
    /// Flat-maps the present value; an absent value short-circuits.
    fn chain<U, F>(self, function: F) -> Option<U>
    where
        F: FnOnce(T) -> Option<U>;

    /// Exhaustive case analysis.
    ///
    /// Exactly one of the two functions is called.
    fn fold<U, A, P>(self, on_absent: A, on_present: P) -> U
    where
        A: FnOnce() -> U,
        P: FnOnce(T) -> U;

    /// Returns the present value or `default`.
    fn get_or_else(self, default: T) -> T;

    /// Converts into a `Result`, using `error` for the absent case.
    fn to_result<E>(self, error: E) -> Result<T, E>;

    /// Compares two optionals by variant, then by `equal` for present values.
    ///
    /// This is the escape hatch for values compared by identity or by a
    /// projection rather than through `PartialEq`.
    fn is_equal_by<F>(&self, other: &Self, equal: F) -> bool
    where
        F: FnOnce(&T, &T) -> bool;
}

impl<T> OptionalExt<T> for Option<T> {
    #[inline]
    fn chain<U, F>(self, function: F) -> Option<U>
    where
        F: FnOnce(T) -> Option<U>,
    {
        self.and_then(function)
    }

    #[inline]
    fn fold<U, A, P>(self, on_absent: A, on_present: P) -> U
    where
        A: FnOnce() -> U,
        P: FnOnce(T) -> U,
    {
        match self {
            Some(value) => on_present(value),
            None => on_absent(),
        }
    }

    #[inline]
    fn get_or_else(self, default: T) -> T {
        self.unwrap_or(default)
    }

    #[inline]
    fn to_result<E>(self, error: E) -> Result<T, E> {
        self.ok_or(error)
    }

    fn is_equal_by<F>(&self, other: &Self, equal: F) -> bool
    where
        F: FnOnce(&T, &T) -> bool,
    {
        match (self, other) {
            (None, None) => true,
            (Some(left), Some(right)) => equal(left, right),
            _ => false,
        }
    }
}
