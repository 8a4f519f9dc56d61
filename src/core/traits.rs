//! Collaborator traits consumed by the engine.
//!
//! The engine never inspects artifacts itself. Pattern scanning, signature
//! checks, metadata lookups, enumeration and destructive actions are all
//! delegated to implementations of the traits in this module.

use crate::audit::RemediationEvent;
use crate::core::error::{ActionResult, LookupError, LookupResult, MatcherResult};
use crate::core::hasher::FileDigest;
use crate::core::subject::{ExtensionInfo, ProcessInfo, ServiceInfo};
use crate::remediation::{ProcessFlags, ServiceFlags};

use std::fmt::Debug;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Compiled rule state owned by a [`MatcherHandle`].
///
/// Implementations hold whatever the pattern engine produced at compile
/// time. `release` is called exactly once, when the owning handle drops.
pub trait CompiledRules: Send + Sync + Debug {
    /// Scans a byte buffer, returning `true` when any rule matches.
    fn scan_bytes(&self, data: &[u8]) -> MatcherResult<bool>;

    /// Scans a file on disk.
    fn scan_path(&self, path: &Path) -> MatcherResult<bool> {
        let data = std::fs::read(path)?;
        self.scan_bytes(&data)
    }

    /// Releases engine resources. Called by the owning handle on drop.
    fn release(&mut self) {}
}

/// Scoped ownership of compiled pattern rules.
///
/// The compiled state is released when the handle is dropped, on every
/// exit path. Conditions share a handle through `Arc<MatcherHandle>`, so
/// release happens when the last condition referencing it goes away.
#[derive(Debug)]
pub struct MatcherHandle {
    description: String,
    rules: Box<dyn CompiledRules>,
}

impl MatcherHandle {
    /// Wraps compiled rules in a handle.
    pub fn new(description: impl Into<String>, rules: impl CompiledRules + 'static) -> Self {
        Self {
            description: description.into(),
            rules: Box::new(rules),
        }
    }

    /// Human-readable description of the compiled rules.
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Scans a file on disk.
    pub fn scan_path(&self, path: &Path) -> MatcherResult<bool> {
        self.rules.scan_path(path)
    }

    /// Scans a byte buffer.
    pub fn scan_bytes(&self, data: &[u8]) -> MatcherResult<bool> {
        self.rules.scan_bytes(data)
    }
}

impl Drop for MatcherHandle {
    fn drop(&mut self) {
        self.rules.release();
        tracing::trace!(matcher = %self.description, "Released compiled rules");
    }
}

/// A pattern-matching engine that compiles rule text into a handle.
///
/// Implementations must not leak compiled state when compilation fails:
/// anything allocated before the failure is dropped before returning.
pub trait PatternMatcher: Send + Sync + Debug {
    /// Returns the name of this engine.
    fn name(&self) -> &str;

    /// Compiles rule text into a scoped handle.
    fn compile(&self, rule_text: &str) -> MatcherResult<MatcherHandle>;
}

/// Code-signature and notarization checks.
pub trait SignatureInspector: Send + Sync + Debug {
    /// Whether the code at `path` is signed by the platform vendor.
    fn is_apple_signed(&self, path: &Path) -> LookupResult<bool>;

    /// Whether the code at `path` carries a valid notarization ticket.
    fn is_notarized(&self, path: &Path) -> LookupResult<bool>;

    /// Whether the signing certificate for `path` has been revoked.
    fn is_revoked(&self, path: &Path) -> LookupResult<bool>;

    /// Whether the code at `path` is unsigned or fails validation.
    fn is_untrusted(&self, path: &Path) -> LookupResult<bool>;

    /// The code directory hash of the code at `path`, lowercase hex.
    fn code_directory_hash(&self, path: &Path) -> LookupResult<String>;
}

/// File metadata lookups.
pub trait FileMetadataProvider: Send + Sync + Debug {
    /// File size in bytes.
    fn size(&self, path: &Path) -> LookupResult<u64>;

    /// MIME type of the file.
    fn mime_type(&self, path: &Path) -> LookupResult<String>;

    /// Lowercase hex of the file's leading magic bytes.
    fn magic(&self, path: &Path) -> LookupResult<String>;

    /// Lowercase hex SHA-256 of the file contents.
    fn sha256(&self, path: &Path) -> LookupResult<String>;

    /// Content digest recorded when the file matches a remediation.
    fn digest(&self, path: &Path) -> LookupResult<FileDigest> {
        Err(LookupError::unavailable(
            "digest",
            format!("no digest support for {}", path.display()),
        ))
    }

    /// Whether the path exists.
    fn exists(&self, path: &Path) -> bool {
        self.size(path).is_ok()
    }
}

/// Directory enumeration.
pub trait FileSystemWalker: Send + Sync + Debug {
    /// Enumerates every entry below `dir`, yielding paths relative to `dir`.
    ///
    /// The sequence is finite, and calling `enumerate` again restarts it.
    fn enumerate<'a>(&'a self, dir: &Path) -> LookupResult<Box<dyn Iterator<Item = PathBuf> + 'a>>;
}

/// Enumerates running processes.
pub trait ProcessInspector: Send + Sync + Debug {
    /// Snapshots every running process.
    fn running_processes(&self) -> LookupResult<Vec<ProcessInfo>>;
}

/// Enumerates loaded background services.
pub trait ServiceInspector: Send + Sync + Debug {
    /// Snapshots every loaded service.
    fn loaded_services(&self) -> LookupResult<Vec<ServiceInfo>>;
}

/// Enumerates registered browser extensions.
pub trait ExtensionInspector: Send + Sync + Debug {
    /// Snapshots every registered extension.
    fn registered_extensions(&self) -> LookupResult<Vec<ExtensionInfo>>;
}

/// Destructive remediation actions.
///
/// Flags are passed exactly as declared on the remediation.
pub trait ActionExecutor: Send + Sync + Debug {
    /// Deletes a file.
    fn delete_file(&self, path: &Path) -> ActionResult<()>;

    /// Terminates a process and optionally removes its executable.
    fn remediate_process(&self, process: &ProcessInfo, flags: &ProcessFlags) -> ActionResult<()>;

    /// Unloads a service and optionally deletes its files.
    fn remediate_service(&self, service: &ServiceInfo, flags: &ServiceFlags) -> ActionResult<()>;

    /// Disables a browser extension.
    fn disable_extension(&self, extension: &ExtensionInfo) -> ActionResult<()>;
}

/// Structured sink for remediation events.
pub trait Reporter: Send + Sync + Debug {
    /// Records one event.
    fn record(&self, event: &RemediationEvent);
}

/// An arc-wrapped pattern matcher for shared ownership.
pub type ArcMatcher = Arc<dyn PatternMatcher>;

/// An arc-wrapped action executor for shared ownership.
pub type ArcExecutor = Arc<dyn ActionExecutor>;

/// An arc-wrapped reporter for shared ownership.
pub type ArcReporter = Arc<dyn Reporter>;
