//! Absence and failure vocabulary.
//!
//! The runtime speaks in terms of the standard [`Option`] and [`Result`]
//! types. Both are closed sum types with compiler-checked exhaustive
//! matching, so no bespoke container is needed; this module only adds the
//! combinators that the rest of the crate (and application code written
//! against it) uses on top of the std ones.
//!
//! | Operation       | `Option<T>`                  | `Result<T, E>`                  |
//! |-----------------|------------------------------|---------------------------------|
//! | map             | [`Option::map`]              | [`Result::map`]                 |
//! | map error       | -                            | [`Result::map_err`]             |
//! | flat-map        | [`OptionalExt::chain`]       | [`ResultExt::chain`]            |
//! | recover         | -                            | [`ResultExt::recover`]          |
//! | case analysis   | [`OptionalExt::fold`]        | [`ResultExt::fold`]             |
//! | default         | [`OptionalExt::get_or_else`] | -                               |
//! | conversion      | [`OptionalExt::to_result`]   | [`ResultExt::to_optional`]      |
//! | custom equality | [`OptionalExt::is_equal_by`] | [`ResultExt::is_equal_by`]      |
//!
//! # Examples
//!
//! ```rust
//! use teaflow::data::{OptionalExt, ResultExt};
//!
//! let parsed: Result<i32, String> = "21".parse::<i32>().map_err(|e| e.to_string());
//! let doubled = parsed.chain(|n| if n > 0 { Ok(n * 2) } else { Err("negative".into()) });
//! assert_eq!(doubled.to_optional().get_or_else(0), 42);
//! ```

mod optional;
mod result;

pub use optional::OptionalExt;
pub use result::ResultExt;
