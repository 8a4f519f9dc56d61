//! Conditions over a loaded background service.

use crate::condition::file::evaluate_nested;
use crate::condition::{scan_path, signature_flag, Condition, FileCondition, IntoConditions};
use crate::core::{Collaborators, MatcherHandle, ServiceInfo, Value};

use std::collections::BTreeMap;
use std::sync::Arc;

/// A condition over a loaded background service.
#[derive(Debug, Clone)]
pub enum ServiceCondition {
    /// The number of program arguments equals the count.
    ArgumentCount(usize),
    /// Every indexed argument exists and matches.
    Arguments(BTreeMap<usize, Value>),
    /// Every named definition property exists and matches.
    KeyValue(BTreeMap<String, Value>),
    /// The executable path matches.
    ExecutablePath(Value),
    /// The compiled rules match the executable's contents.
    ExecutablePattern(Arc<MatcherHandle>),
    /// Whether the executable is unsigned or fails validation.
    ExecutableIsUntrusted(bool),
    /// Whether the executable's signing certificate is revoked.
    ExecutableRevoked(bool),
    /// The executable satisfies every nested file condition.
    Executable(Vec<FileCondition>),
}

impl ServiceCondition {
    /// Creates an `ArgumentCount` condition.
    pub fn argument_count(count: usize) -> Self {
        Self::ArgumentCount(count)
    }

    /// Creates an `Arguments` condition from `(index, value)` pairs.
    pub fn arguments<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (usize, Value)>,
    {
        Self::Arguments(pairs.into_iter().collect())
    }

    /// Creates a `KeyValue` condition from `(key, value)` pairs.
    pub fn key_values<I, K>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        Self::KeyValue(pairs.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// Creates an `ExecutablePath` condition.
    pub fn executable_path(value: Value) -> Self {
        Self::ExecutablePath(value)
    }

    /// Creates an `ExecutablePattern` condition that owns the handle.
    pub fn executable_pattern(handle: MatcherHandle) -> Self {
        Self::ExecutablePattern(Arc::new(handle))
    }

    /// Creates an `ExecutableIsUntrusted` condition.
    pub fn executable_is_untrusted(untrusted: bool) -> Self {
        Self::ExecutableIsUntrusted(untrusted)
    }

    /// Creates an `ExecutableRevoked` condition.
    pub fn executable_revoked(revoked: bool) -> Self {
        Self::ExecutableRevoked(revoked)
    }

    /// Creates an `Executable` condition from any file-condition declaration.
    pub fn executable(conditions: impl IntoConditions<FileCondition>) -> Self {
        let mut nested = Vec::new();
        conditions.into_conditions(&mut nested);
        Self::Executable(nested)
    }
}

impl Condition for ServiceCondition {
    type Subject = ServiceInfo;

    fn evaluate(&self, service: &ServiceInfo, collaborators: &Collaborators) -> bool {
        let executable = service.executable.as_deref();
        let result = match self {
            Self::ArgumentCount(count) => service.program_arguments.len() == *count,
            Self::Arguments(expected) => expected.iter().all(|(index, value)| {
                service
                    .program_arguments
                    .get(*index)
                    .map(|arg| value.matches(arg))
                    .unwrap_or(false)
            }),
            Self::KeyValue(expected) => expected.iter().all(|(key, value)| {
                service
                    .properties
                    .get(key)
                    .map(|property| value.matches(property))
                    .unwrap_or(false)
            }),
            Self::ExecutablePath(value) => executable
                .map(|path| value.matches(&*path.to_string_lossy()))
                .unwrap_or(false),
            Self::ExecutablePattern(handle) => executable
                .map(|path| scan_path(handle, path, collaborators))
                .unwrap_or(false),
            Self::ExecutableIsUntrusted(expected) => executable
                .map(|path| {
                    signature_flag(collaborators, path, "untrusted", *expected, |s, p| {
                        s.is_untrusted(p)
                    })
                })
                .unwrap_or(false),
            Self::ExecutableRevoked(expected) => executable
                .map(|path| {
                    signature_flag(collaborators, path, "revoked", *expected, |s, p| {
                        s.is_revoked(p)
                    })
                })
                .unwrap_or(false),
            Self::Executable(nested) => evaluate_nested(nested, executable, collaborators),
        };

        tracing::trace!(service = %service.label, condition = ?self, result, "Service condition evaluated");
        result
    }
}
