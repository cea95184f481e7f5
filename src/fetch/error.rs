// src/fetch/error.rs
//! Error vocabulary for fetch operations.
//!
//! Caller-supplied fetch functions report failures as a [`FetchError`]. Every
//! variant belongs to one of two classes: transient failures are worth
//! another attempt, permanent ones are not.

use std::fmt;

/// Whether a failure is worth retrying.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FetchErrorClass {
    Transient,
    Permanent,
}

impl fmt::Display for FetchErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transient => write!(f, "transient"),
            Self::Permanent => write!(f, "permanent"),
        }
    }
}

/// Error returned by a single fetch attempt, or recorded as a task's
/// terminal failure.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchError {
    /// Network or server hiccup; another attempt may succeed.
    Transient { message: String },

    /// The remote side asked us to slow down.
    RateLimited { retry_after_seconds: Option<u64> },

    /// An attempt ran past the caller's per-attempt timeout.
    Timeout { operation: String },

    /// The resource is confirmed absent.
    NotFound { resource: String },

    /// Any other failure that retrying cannot fix (bad input, parse failure).
    Permanent { message: String },

    /// All attempts were spent on transient failures; wraps the last one.
    RetriesExhausted {
        attempts: u32,
        last: Box<FetchError>,
    },
}

impl FetchError {
    pub fn transient(message: impl Into<String>) -> Self {
        Self::Transient {
            message: message.into(),
        }
    }

    pub fn permanent(message: impl Into<String>) -> Self {
        Self::Permanent {
            message: message.into(),
        }
    }

    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
        }
    }

    /// Classifies this error. `RetriesExhausted` is terminal and therefore
    /// permanent, whatever it wraps.
    pub fn class(&self) -> FetchErrorClass {
        match self {
            Self::Transient { .. } | Self::RateLimited { .. } | Self::Timeout { .. } => {
                FetchErrorClass::Transient
            }
            Self::NotFound { .. } | Self::Permanent { .. } | Self::RetriesExhausted { .. } => {
                FetchErrorClass::Permanent
            }
        }
    }

    /// Returns `true` if this error is transient and worth retrying.
    pub fn is_retryable(&self) -> bool {
        self.class() == FetchErrorClass::Transient
    }

    /// Returns `true` if this error means the resource doesn't exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// The innermost error, looking through `RetriesExhausted`.
    pub fn root_cause(&self) -> &FetchError {
        match self {
            Self::RetriesExhausted { last, .. } => last.root_cause(),
            other => other,
        }
    }
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transient { message } => write!(f, "Transient failure: {}", message),
            Self::RateLimited {
                retry_after_seconds,
            } => {
                write!(f, "Rate limited")?;
                if let Some(seconds) = retry_after_seconds {
                    write!(f, " (retry after {}s)", seconds)?;
                }
                Ok(())
            }
            Self::Timeout { operation } => write!(f, "Timeout during: {}", operation),
            Self::NotFound { resource } => write!(f, "Not found: {}", resource),
            Self::Permanent { message } => write!(f, "Permanent failure: {}", message),
            Self::RetriesExhausted { attempts, last } => {
                write!(f, "Gave up after {} attempts: {}", attempts, last)
            }
        }
    }
}

impl std::error::Error for FetchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::RetriesExhausted { last, .. } => Some(last.as_ref()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_error_is_retryable() {
        assert!(FetchError::RateLimited {
            retry_after_seconds: None
        }
        .is_retryable());
        assert!(FetchError::Timeout {
            operation: "fetch".to_string()
        }
        .is_retryable());
        assert!(FetchError::transient("connection reset").is_retryable());
        assert!(!FetchError::not_found("post 4").is_retryable());
        assert!(!FetchError::permanent("missing title").is_retryable());
    }

    #[test]
    fn test_exhausted_is_terminal() {
        let err = FetchError::RetriesExhausted {
            attempts: 3,
            last: Box::new(FetchError::transient("503")),
        };
        assert_eq!(err.class(), FetchErrorClass::Permanent);
        assert_eq!(err.root_cause(), &FetchError::transient("503"));
    }

    #[test]
    fn test_fetch_error_display() {
        let err = FetchError::not_found("abc123");
        assert_eq!(err.to_string(), "Not found: abc123");

        let err = FetchError::RateLimited {
            retry_after_seconds: Some(60),
        };
        assert_eq!(err.to_string(), "Rate limited (retry after 60s)");

        let err = FetchError::RetriesExhausted {
            attempts: 2,
            last: Box::new(FetchError::transient("reset")),
        };
        assert_eq!(
            err.to_string(),
            "Gave up after 2 attempts: Transient failure: reset"
        );
    }
}
