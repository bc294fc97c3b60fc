use std::time::Duration;

/// Quiet period before pasted import text is validated.
pub const DEFAULT_IMPORT_DEBOUNCE: Duration = Duration::from_millis(250);

/// Import validator configuration loaded from environment variables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImportValidatorConfig {
    /// Input must be unchanged for this long before it is parsed.
    pub debounce: Duration,
}

impl ImportValidatorConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                          | Default |
    /// |----------------------------------|---------|
    /// | `PROMPTLINE_IMPORT_DEBOUNCE_MS`  | `250`   |
    ///
    /// A malformed value is logged and replaced by the default.
    pub fn from_env() -> Self {
        Self::from_debounce_var(std::env::var("PROMPTLINE_IMPORT_DEBOUNCE_MS").ok().as_deref())
    }

    fn from_debounce_var(raw: Option<&str>) -> Self {
        let debounce = match raw.map(|s| s.trim().parse::<u64>()) {
            None => DEFAULT_IMPORT_DEBOUNCE,
            Some(Ok(ms)) => Duration::from_millis(ms),
            Some(Err(e)) => {
                tracing::warn!(
                    value = raw.unwrap_or_default(),
                    error = %e,
                    "PROMPTLINE_IMPORT_DEBOUNCE_MS is not a valid u64, using default"
                );
                DEFAULT_IMPORT_DEBOUNCE
            }
        };
        Self { debounce }
    }

    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }
}

impl Default for ImportValidatorConfig {
    fn default() -> Self {
        Self {
            debounce: DEFAULT_IMPORT_DEBOUNCE,
        }
    }
}
