//! Gradebook error types.
//!
//! Model queries never fail: unknown assignments and missing grades map to
//! sentinels. These errors cover the operations that genuinely can.

use thiserror::Error;

/// Errors raised by roster operations and configuration validation.
#[derive(Debug, Error)]
pub enum GradebookError {
    /// A parallel release task panicked or was cancelled before finishing.
    #[error("release of '{assignment}' failed: {reason}")]
    ReleaseFailed { assignment: String, reason: String },

    /// The loaded configuration is structurally valid TOML but unusable.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn release_failed_message() {
        let err = GradebookError::ReleaseFailed {
            assignment: "A1".into(),
            reason: "task panicked".into(),
        };
        assert_eq!(err.to_string(), "release of 'A1' failed: task panicked");
    }
}
