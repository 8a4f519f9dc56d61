//! Core types and traits for the remediate library.
//!
//! This module provides the fundamental building blocks used throughout
//! the library:
//!
//! - [`value`] - The `Value` matching literal
//! - [`subject`] - Process, service and extension snapshots
//! - [`traits`] - Collaborator traits and the `MatcherHandle` resource type
//! - [`collaborators`] - The dependency-injection context
//! - [`error`] - Structured error types
//! - [`hasher`] - BLAKE3 and SHA-256 file hashing

pub mod collaborators;
pub mod error;
pub mod hasher;
pub mod subject;
pub mod traits;
pub mod value;

// Re-export commonly used types at the core level
pub use collaborators::Collaborators;
pub use error::{
    ActionError, ActionResult, LookupError, LookupResult, MatcherError, MatcherResult,
    RemediationError, RemediationResult,
};
pub use hasher::{FileDigest, FileHasher};
pub use subject::{file_identity, ExtensionInfo, ProcessInfo, ServiceInfo, SubjectKind};
pub use traits::{
    ActionExecutor, ArcExecutor, ArcMatcher, ArcReporter, CompiledRules, ExtensionInspector,
    FileMetadataProvider, FileSystemWalker, MatcherHandle, PatternMatcher, ProcessInspector,
    Reporter, ServiceInspector, SignatureInspector,
};
pub use value::{Candidate, RegexPattern, Value};
