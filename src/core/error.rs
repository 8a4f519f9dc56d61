//! Error types for the remediate library.
//!
//! Every failure scenario is a typed value. Failures local to one subject or
//! one remediation are reported and recorded, never propagated far enough to
//! abort an assessment pass.

use std::time::Duration;
use thiserror::Error;

/// The main error type recorded while assessing remediations.
#[derive(Debug, Error)]
pub enum RemediationError {
    /// A remediation declaration is malformed or incomplete.
    #[error("configuration error: {message}")]
    Configuration {
        /// Description of the configuration problem.
        message: String,
    },

    /// Pattern or rule text failed to compile.
    #[error("failed to compile pattern '{pattern}': {reason}")]
    Compile {
        /// The pattern or rule text that failed.
        pattern: String,
        /// Compiler diagnostic.
        reason: String,
    },

    /// A metadata or signature lookup failed for a subject.
    #[error("lookup failed for '{subject}': {reason}")]
    Lookup {
        /// Identity of the subject.
        subject: String,
        /// Reason for the failure.
        reason: String,
    },

    /// A destructive remediation action failed.
    #[error("action on '{subject}' failed (tag {tag:?}): {source}")]
    Action {
        /// Identity of the subject.
        subject: String,
        /// Tag of the remediation that requested the action.
        tag: Option<String>,
        /// The underlying action failure.
        #[source]
        source: ActionError,
    },

    /// The assessment deadline passed during subject resolution.
    #[error("assessment deadline exceeded after {elapsed:?}")]
    DeadlineExceeded {
        /// Time spent before the deadline fired.
        elapsed: Duration,
    },

    /// An internal error occurred.
    #[error("internal error: {message}")]
    Internal {
        /// Description of the internal error.
        message: String,
    },
}

impl RemediationError {
    /// Returns `true` if the error means a remediation yielded no subjects.
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration { .. })
    }

    /// Returns `true` if the error was raised by a destructive action.
    pub fn is_action_failure(&self) -> bool {
        matches!(self, Self::Action { .. })
    }

    /// Returns the subject identity if this error is tied to one.
    pub fn subject(&self) -> Option<&str> {
        match self {
            Self::Lookup { subject, .. } | Self::Action { subject, .. } => Some(subject),
            _ => None,
        }
    }

    /// Short machine-readable name for event logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Configuration { .. } => "configuration_error",
            Self::Compile { .. } => "compile_error",
            Self::Lookup { .. } => "lookup_failure",
            Self::Action { .. } => "action_failure",
            Self::DeadlineExceeded { .. } => "deadline_exceeded",
            Self::Internal { .. } => "internal_error",
        }
    }

    /// Creates a `Configuration` error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Creates a `Compile` error.
    pub fn compile(pattern: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Compile {
            pattern: pattern.into(),
            reason: reason.into(),
        }
    }

    /// Creates a `Lookup` error.
    pub fn lookup(subject: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Lookup {
            subject: subject.into(),
            reason: reason.into(),
        }
    }

    /// Creates an `Action` error.
    pub fn action(subject: impl Into<String>, tag: Option<String>, source: ActionError) -> Self {
        Self::Action {
            subject: subject.into(),
            tag,
            source,
        }
    }

    /// Creates an `Internal` error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}

/// Error type for pattern matcher operations.
#[derive(Debug, Error)]
pub enum MatcherError {
    /// The rule text could not be compiled.
    #[error("rule compilation failed: {reason}")]
    Compile {
        /// Compiler diagnostic.
        reason: String,
    },

    /// The engine failed while scanning.
    #[error("scan failed: {reason}")]
    Scan {
        /// Reason for the failure.
        reason: String,
    },

    /// An I/O error occurred while reading the scan target.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl MatcherError {
    /// Creates a `Compile` error.
    pub fn compile(reason: impl Into<String>) -> Self {
        Self::Compile {
            reason: reason.into(),
        }
    }

    /// Creates a `Scan` error.
    pub fn scan(reason: impl Into<String>) -> Self {
        Self::Scan {
            reason: reason.into(),
        }
    }
}

/// Error type for metadata, signature and enumeration lookups.
#[derive(Debug, Error)]
pub enum LookupError {
    /// The subject does not exist (e.g. the file vanished mid-scan).
    #[error("not found: {path}")]
    NotFound {
        /// Path that was not found.
        path: String,
    },

    /// The requested attribute cannot be determined for this subject.
    #[error("{attribute} unavailable: {reason}")]
    Unavailable {
        /// The attribute that was requested.
        attribute: String,
        /// Why it is unavailable.
        reason: String,
    },

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl LookupError {
    /// Creates a `NotFound` error.
    pub fn not_found(path: impl Into<String>) -> Self {
        Self::NotFound { path: path.into() }
    }

    /// Creates an `Unavailable` error.
    pub fn unavailable(attribute: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Unavailable {
            attribute: attribute.into(),
            reason: reason.into(),
        }
    }

    /// Maps an I/O error on `path`, turning `NotFound` into the typed variant.
    pub fn from_io(path: &std::path::Path, err: std::io::Error) -> Self {
        if err.kind() == std::io::ErrorKind::NotFound {
            Self::not_found(path.display().to_string())
        } else {
            Self::Io(err)
        }
    }
}

/// Error type for destructive remediation actions.
#[derive(Debug, Error)]
pub enum ActionError {
    /// The action was attempted and failed.
    #[error("action failed: {reason}")]
    Failed {
        /// Reason for the failure.
        reason: String,
    },

    /// The executor does not support this kind of action.
    #[error("unsupported action: {action}")]
    Unsupported {
        /// Name of the unsupported action.
        action: String,
    },

    /// No action executor was configured for a destructive remediation.
    #[error("no action executor configured")]
    NotConfigured,

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ActionError {
    /// Creates a `Failed` error.
    pub fn failed(reason: impl Into<String>) -> Self {
        Self::Failed {
            reason: reason.into(),
        }
    }

    /// Creates an `Unsupported` error.
    pub fn unsupported(action: impl Into<String>) -> Self {
        Self::Unsupported {
            action: action.into(),
        }
    }
}

/// A specialized `Result` type for remediation operations.
pub type RemediationResult<T> = Result<T, RemediationError>;

/// A specialized `Result` type for matcher operations.
pub type MatcherResult<T> = Result<T, MatcherError>;

/// A specialized `Result` type for lookups.
pub type LookupResult<T> = Result<T, LookupError>;

/// A specialized `Result` type for actions.
pub type ActionResult<T> = Result<T, ActionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remediation_error_subject() {
        let err = RemediationError::lookup("/tmp/a", "vanished");
        assert_eq!(err.subject(), Some("/tmp/a"));

        let err = RemediationError::configuration("missing search dir");
        assert_eq!(err.subject(), None);
        assert!(err.is_configuration());
    }

    #[test]
    fn test_action_error_wrapping() {
        let err = RemediationError::action(
            "/tmp/eicar",
            Some("eicar".into()),
            ActionError::failed("permission denied"),
        );
        assert!(err.is_action_failure());
        assert_eq!(err.kind(), "action_failure");
        assert!(err.to_string().contains("permission denied"));
        assert!(err.to_string().contains("eicar"));
    }

    #[test]
    fn test_error_kinds_are_distinct() {
        let kinds = [
            RemediationError::configuration("x").kind(),
            RemediationError::compile("(", "unclosed group").kind(),
            RemediationError::lookup("/tmp/a", "gone").kind(),
            RemediationError::action("/tmp/a", None, ActionError::NotConfigured).kind(),
            RemediationError::DeadlineExceeded {
                elapsed: Duration::from_millis(5),
            }
            .kind(),
            RemediationError::internal("join failed").kind(),
        ];
        let unique: std::collections::BTreeSet<_> = kinds.iter().collect();
        assert_eq!(unique.len(), kinds.len());
        assert!(!kinds.iter().any(|k| k.contains("scan")));
    }

    #[test]
    fn test_lookup_error_from_io() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err = LookupError::from_io(std::path::Path::new("/nope"), io);
        assert!(matches!(err, LookupError::NotFound { .. }));

        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err = LookupError::from_io(std::path::Path::new("/nope"), io);
        assert!(matches!(err, LookupError::Io(_)));
    }
}
