//! Combinators for [`Result`].

/// Extension methods for [`Result`] used throughout the runtime.
///
/// `map` and `map_err` are the standard ones; together they make `Result` a
/// bifunctor.
///
/// # Examples
///
/// ```rust
/// use teaflow::data::ResultExt;
///
/// let recovered: Result<i32, ()> = Err::<i32, &str>("boom").recover(|e| Ok(e.len() as i32));
/// assert_eq!(recovered, Ok(4));
/// ```
pub trait ResultExt<T, E>: Sized {
    /// Flat-maps the success value; an error short-circuits.
    fn chain<U, F>(self, function: F) -> Result<U, E>
    where
        F: FnOnce(T) -> Result<U, E>;

    /// Flat-maps the error value; a success short-circuits.
    ///
    /// Unlike [`Result::or_else`] the name mirrors
    /// [`Task::on_error`](crate::task::Task::on_error).
    fn recover<E2, F>(self, function: F) -> Result<T, E2>
    where
        F: FnOnce(E) -> Result<T, E2>;

    /// Exhaustive case analysis.
    fn fold<U, FE, FT>(self, on_err: FE, on_ok: FT) -> U
    where
        FE: FnOnce(E) -> U,
        FT: FnOnce(T) -> U;

    /// Discards the error.
    fn to_optional(self) -> Option<T>;

    /// Compares two results by variant, then with the matching comparator.
    fn is_equal_by<FE, FT>(&self, other: &Self, equal_err: FE, equal_ok: FT) -> bool
    where
        FE: FnOnce(&E, &E) -> bool,
        FT: FnOnce(&T, &T) -> bool;
}

impl<T, E> ResultExt<T, E> for Result<T, E> {
    #[inline]
    fn chain<U, F>(self, function: F) -> Result<U, E>
    where
        F: FnOnce(T) -> Result<U, E>,
    {
        self.and_then(function)
    }

    #[inline]
    fn recover<E2, F>(self, function: F) -> Result<T, E2>
    where
        F: FnOnce(E) -> Result<T, E2>,
    {
        self.or_else(function)
    }

    #[inline]
    fn fold<U, FE, FT>(self, on_err: FE, on_ok: FT) -> U
    where
        FE: FnOnce(E) -> U,
        FT: FnOnce(T) -> U,
    {
        match self {
            Ok(value) => on_ok(value),
            Err(error) => on_err(error),
        }
    }

    #[inline]
    fn to_optional(self) -> Option<T> {
        self.ok()
    }

    fn is_equal_by<FE, FT>(&self, other: &Self, equal_err: FE, equal_ok: FT) -> bool
    where
        FE: FnOnce(&E, &E) -> bool,
        FT: FnOnce(&T, &T) -> bool,
    {
        match (self, other) {
            (Ok(left), Ok(right)) => equal_ok(left, right),
            (Err(left), Err(right)) => equal_err(left, right),
            _ => false,
        }
    }
}
