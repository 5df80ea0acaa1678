/// Static configuration of a [`Program`](super::Program).
///
/// # Examples
///
/// ```rust
/// use teaflow::runtime::ProgramConfig;
///
/// let config = ProgramConfig::new("inventory").with_yield_every(16);
/// assert_eq!(config.name, "inventory");
/// assert_eq!(config.yield_every, 16);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgramConfig {
    /// Name recorded on the program's tracing span and in
    /// [`RuntimeError`](crate::RuntimeError)s.
    pub name: String,
    /// The driver yields to the tokio scheduler after handling this many
    /// envelopes in a row. `0` disables yielding.
    pub yield_every: usize,
}

impl ProgramConfig {
    /// Default number of envelopes handled between yields.
    pub const DEFAULT_YIELD_EVERY: usize = 64;

    /// Creates a configuration with the given name and default settings.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            yield_every: Self::DEFAULT_YIELD_EVERY,
        }
    }

    /// Sets [`ProgramConfig::yield_every`].
    #[must_use]
    pub const fn with_yield_every(mut self, yield_every: usize) -> Self {
        self.yield_every = yield_every;
        self
    }
}

impl Default for ProgramConfig {
    fn default() -> Self {
        Self::new("program")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn default_config() {
        let config = ProgramConfig::default();
        assert_eq!(config.name, "program");
        assert_eq!(config.yield_every, ProgramConfig::DEFAULT_YIELD_EVERY);
    }
}
