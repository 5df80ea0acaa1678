//! Error types raised by the runtime itself.
//!
//! Application-level failures never show up here: they travel in the `E`
//! parameter of [`Task`](crate::task::Task) and are folded into messages by
//! [`Task::attempt`](crate::task::Task::attempt) before they reach the
//! runtime. The errors below only describe misuse of the runtime surface.

use thiserror::Error;

/// Errors returned by a running [`Handle`](crate::runtime::Handle).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuntimeError {
    /// The driver task of the program has stopped, so the message could not
    /// be queued.
    ///
    /// The driver only stops when the tokio runtime hosting it shuts down or
    /// when an update function or router panicked.
    #[error("program `{name}` is no longer running")]
    Stopped {
        /// The configured name of the program.
        name: String,
    },
}

/// Errors produced while encoding or decoding a [`SubKey`](crate::sub::SubKey).
#[derive(Debug, Error)]
pub enum KeyError {
    /// The subscription configuration could not be serialized.
    #[error("failed to encode subscription key: {0}")]
    Encode(#[source] serde_json::Error),

    /// The key does not hold the configuration the router expected.
    #[error("failed to decode subscription key `{key}`: {source}")]
    Decode {
        /// The raw key that failed to decode.
        key: String,
        /// The underlying serde error.
        #[source]
        source: serde_json::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn runtime_error_display_names_the_program() {
        let error = RuntimeError::Stopped {
            name: "counter".to_string(),
        };
        assert_eq!(format!("{error}"), "program `counter` is no longer running");
    }

    #[rstest]
    fn key_error_decode_display_includes_key() {
        let source = serde_json::from_str::<u64>("not a number").unwrap_err();
        let error = KeyError::Decode {
            key: "not a number".to_string(),
            source,
        };
        assert!(
            format!("{error}").starts_with("failed to decode subscription key `not a number`")
        );
    }
}
