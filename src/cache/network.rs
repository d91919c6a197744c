//! Network Error Mode
//!
//! Policy for transient connectivity failures on read paths.

use std::fmt;
use std::str::FromStr;

use crate::error::CacheError;

/// How a network failure reaching the store is handled while reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NetworkErrorMode {
    /// Treat the read as a miss silently
    Ignore,
    /// Log a warning and treat the read as a miss
    #[default]
    Warning,
    /// Propagate the error to the caller
    Throw,
}

impl FromStr for NetworkErrorMode {
    type Err = CacheError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ignore" => Ok(NetworkErrorMode::Ignore),
            "warning" | "warn" => Ok(NetworkErrorMode::Warning),
            "throw" => Ok(NetworkErrorMode::Throw),
            other => Err(CacheError::InvalidArgument(format!(
                "Unsupported network error mode: {other}"
            ))),
        }
    }
}

impl fmt::Display for NetworkErrorMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NetworkErrorMode::Ignore => "ignore",
            NetworkErrorMode::Warning => "warning",
            NetworkErrorMode::Throw => "throw",
        };
        f.write_str(name)
    }
}
