use std::fmt;

/// Unrecoverable configuration problem: missing files, bad provider names,
/// absent credentials. These abort before any benchmark item is processed;
/// per-item failures never use this type.
#[derive(Debug)]
pub struct ConfigError(pub String);

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "config error: {}", self.0)
    }
}

impl std::error::Error for ConfigError {}
