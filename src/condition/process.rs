//! Conditions over a running process.

use crate::condition::file::evaluate_nested;
use crate::condition::{lookup_or_false, signature_flag, Condition, FileCondition};
use crate::core::{Collaborators, ProcessInfo, Value};

/// A condition over a running process.
///
/// Signature conditions are evaluated against the process's main
/// executable; a process without a known executable never satisfies them.
#[derive(Debug, Clone)]
pub enum ProcessCondition {
    /// The process name matches.
    Name(Value),
    /// The executable's code directory hash equals the hex digest.
    CdHash(String),
    /// Whether the executable is notarized.
    Notarized(bool),
    /// Whether the executable is signed by the platform vendor.
    AppleSigned(bool),
    /// The executable satisfies every nested file condition.
    MainExecutable(Vec<FileCondition>),
    /// Whether the executable still exists on disk.
    HasBackingFile(bool),
    /// Any loaded library path matches.
    HasLoadedLibrary(Value),
}

impl ProcessCondition {
    /// Creates a `Name` condition.
    pub fn name(value: Value) -> Self {
        Self::Name(value)
    }

    /// Creates a `CdHash` condition.
    pub fn cdhash(hex: impl Into<String>) -> Self {
        Self::CdHash(hex.into())
    }

    /// Creates a `Notarized` condition.
    pub fn notarized(is_notarized: bool) -> Self {
        Self::Notarized(is_notarized)
    }

    /// Creates an `AppleSigned` condition.
    pub fn apple_signed(is_signed: bool) -> Self {
        Self::AppleSigned(is_signed)
    }

    /// Creates a `MainExecutable` condition from any file-condition declaration.
    pub fn main_executable(conditions: impl crate::condition::IntoConditions<FileCondition>) -> Self {
        let mut nested = Vec::new();
        conditions.into_conditions(&mut nested);
        Self::MainExecutable(nested)
    }

    /// Creates a `HasBackingFile` condition.
    pub fn has_backing_file(exists: bool) -> Self {
        Self::HasBackingFile(exists)
    }

    /// Creates a `HasLoadedLibrary` condition.
    pub fn has_loaded_library(value: Value) -> Self {
        Self::HasLoadedLibrary(value)
    }
}

impl Condition for ProcessCondition {
    type Subject = ProcessInfo;

    fn evaluate(&self, process: &ProcessInfo, collaborators: &Collaborators) -> bool {
        let executable = process.executable.as_deref();
        let result = match self {
            Self::Name(value) => value.matches(&process.name),
            Self::CdHash(expected) => match (executable, collaborators.signature_inspector()) {
                (Some(path), Some(inspector)) => {
                    lookup_or_false(inspector.code_directory_hash(path), path, "cdhash")
                        .map(|hash| hash.eq_ignore_ascii_case(expected))
                        .unwrap_or(false)
                }
                _ => false,
            },
            Self::Notarized(expected) => executable
                .map(|path| {
                    signature_flag(collaborators, path, "notarized", *expected, |s, p| {
                        s.is_notarized(p)
                    })
                })
                .unwrap_or(false),
            Self::AppleSigned(expected) => executable
                .map(|path| {
                    signature_flag(collaborators, path, "apple_signed", *expected, |s, p| {
                        s.is_apple_signed(p)
                    })
                })
                .unwrap_or(false),
            Self::MainExecutable(nested) => evaluate_nested(nested, executable, collaborators),
            Self::HasBackingFile(expected) => {
                let exists = executable
                    .map(|path| collaborators.metadata().exists(path))
                    .unwrap_or(false);
                exists == *expected
            }
            Self::HasLoadedLibrary(value) => process
                .loaded_libraries
                .iter()
                .any(|library| value.matches(library)),
        };

        tracing::trace!(process = %process.identity(), condition = ?self, result, "Process condition evaluated");
        result
    }
}
