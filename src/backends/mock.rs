//! Mock collaborators for testing.
//!
//! Every mock is cheap to clone and clones share state, so a test can keep
//! a handle for assertions after moving a clone into [`Collaborators`].
//!
//! [`Collaborators`]: crate::core::Collaborators

use crate::audit::RemediationEvent;
use crate::core::{
    ActionError, ActionExecutor, ActionResult, CompiledRules, ExtensionInfo, ExtensionInspector,
    LookupError, LookupResult, MatcherError, MatcherHandle, MatcherResult, PatternMatcher,
    ProcessInfo, ProcessInspector, Reporter, ServiceInfo, ServiceInspector, SignatureInspector,
};
use crate::remediation::{ProcessFlags, ServiceFlags};

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Debug, Default)]
struct MatcherCounters {
    compiles: AtomicU64,
    scans: AtomicU64,
    releases: AtomicU64,
}

/// A mock pattern matcher that counts compiles, scans and releases.
///
/// # Examples
///
/// ```rust
/// use remediate::backends::MockMatcher;
/// use remediate::core::PatternMatcher;
///
/// let matcher = MockMatcher::new().with_match_on(b"EICAR".to_vec());
/// let handle = matcher.compile("eicar").unwrap();
/// assert!(handle.scan_bytes(b"...EICAR...").unwrap());
/// drop(handle);
///
/// assert_eq!(matcher.scan_count(), 1);
/// assert_eq!(matcher.release_count(), 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct MockMatcher {
    needles: Vec<Vec<u8>>,
    default_result: bool,
    compile_failure: Option<String>,
    scan_failure: Option<String>,
    counters: Arc<MatcherCounters>,
}

impl MockMatcher {
    /// Creates a matcher that never matches.
    pub fn new() -> Self {
        Self::default()
    }

    /// Matches contents containing the needle.
    pub fn with_match_on(mut self, needle: Vec<u8>) -> Self {
        self.needles.push(needle);
        self
    }

    /// Sets the result used when no needles are configured.
    pub fn with_default_result(mut self, matched: bool) -> Self {
        self.default_result = matched;
        self
    }

    /// Makes every compile fail with the reason.
    pub fn with_compile_failure(mut self, reason: impl Into<String>) -> Self {
        self.compile_failure = Some(reason.into());
        self
    }

    /// Makes every scan fail with the reason.
    pub fn with_scan_failure(mut self, reason: impl Into<String>) -> Self {
        self.scan_failure = Some(reason.into());
        self
    }

    /// Returns the number of compile attempts.
    pub fn compile_count(&self) -> u64 {
        self.counters.compiles.load(Ordering::SeqCst)
    }

    /// Returns the number of scans performed.
    pub fn scan_count(&self) -> u64 {
        self.counters.scans.load(Ordering::SeqCst)
    }

    /// Returns the number of handles released.
    pub fn release_count(&self) -> u64 {
        self.counters.releases.load(Ordering::SeqCst)
    }
}

impl PatternMatcher for MockMatcher {
    fn name(&self) -> &str {
        "mock"
    }

    fn compile(&self, rule_text: &str) -> MatcherResult<MatcherHandle> {
        self.counters.compiles.fetch_add(1, Ordering::SeqCst);
        if let Some(reason) = &self.compile_failure {
            return Err(MatcherError::compile(reason.clone()));
        }
        Ok(MatcherHandle::new(
            format!("mock({rule_text})"),
            MockRules {
                needles: self.needles.clone(),
                default_result: self.default_result,
                scan_failure: self.scan_failure.clone(),
                counters: Arc::clone(&self.counters),
            },
        ))
    }
}

#[derive(Debug)]
struct MockRules {
    needles: Vec<Vec<u8>>,
    default_result: bool,
    scan_failure: Option<String>,
    counters: Arc<MatcherCounters>,
}

impl CompiledRules for MockRules {
    fn scan_bytes(&self, data: &[u8]) -> MatcherResult<bool> {
        self.counters.scans.fetch_add(1, Ordering::SeqCst);
        if let Some(reason) = &self.scan_failure {
            return Err(MatcherError::scan(reason.clone()));
        }
        if self.needles.is_empty() {
            return Ok(self.default_result);
        }
        Ok(self.needles.iter().any(|needle| {
            !needle.is_empty() && data.windows(needle.len()).any(|window| window == needle.as_slice())
        }))
    }

    fn release(&mut self) {
        self.counters.releases.fetch_add(1, Ordering::SeqCst);
    }
}

/// A scripted signature inspector.
///
/// Unset answers are reported as unavailable.
#[derive(Debug, Clone, Default)]
pub struct MockSignatureInspector {
    apple_signed: Option<bool>,
    notarized: Option<bool>,
    revoked: Option<bool>,
    untrusted: Option<bool>,
    cdhash: Option<String>,
    lookups: Arc<AtomicU64>,
}

impl MockSignatureInspector {
    /// Creates an inspector with no answers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the platform-signed answer.
    pub fn with_apple_signed(mut self, value: bool) -> Self {
        self.apple_signed = Some(value);
        self
    }

    /// Sets the notarization answer.
    pub fn with_notarized(mut self, value: bool) -> Self {
        self.notarized = Some(value);
        self
    }

    /// Sets the revocation answer.
    pub fn with_revoked(mut self, value: bool) -> Self {
        self.revoked = Some(value);
        self
    }

    /// Sets the untrusted answer.
    pub fn with_untrusted(mut self, value: bool) -> Self {
        self.untrusted = Some(value);
        self
    }

    /// Sets the code directory hash.
    pub fn with_cdhash(mut self, hash: impl Into<String>) -> Self {
        self.cdhash = Some(hash.into());
        self
    }

    /// Returns the number of lookups performed.
    pub fn lookup_count(&self) -> u64 {
        self.lookups.load(Ordering::SeqCst)
    }

    fn answer<T: Clone>(&self, value: &Option<T>, attribute: &str) -> LookupResult<T> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        value
            .clone()
            .ok_or_else(|| LookupError::unavailable(attribute, "not scripted"))
    }
}

impl SignatureInspector for MockSignatureInspector {
    fn is_apple_signed(&self, _path: &Path) -> LookupResult<bool> {
        self.answer(&self.apple_signed, "apple_signed")
    }

    fn is_notarized(&self, _path: &Path) -> LookupResult<bool> {
        self.answer(&self.notarized, "notarized")
    }

    fn is_revoked(&self, _path: &Path) -> LookupResult<bool> {
        self.answer(&self.revoked, "revoked")
    }

    fn is_untrusted(&self, _path: &Path) -> LookupResult<bool> {
        self.answer(&self.untrusted, "untrusted")
    }

    fn code_directory_hash(&self, _path: &Path) -> LookupResult<String> {
        self.answer(&self.cdhash, "cdhash")
    }
}

/// A process inspector returning a fixed snapshot.
#[derive(Debug, Clone, Default)]
pub struct MockProcessInspector {
    processes: Vec<ProcessInfo>,
    unavailable: bool,
}

impl MockProcessInspector {
    /// Creates an inspector reporting the given processes.
    pub fn new(processes: Vec<ProcessInfo>) -> Self {
        Self {
            processes,
            unavailable: false,
        }
    }

    /// Creates an inspector whose enumeration always fails.
    pub fn unavailable() -> Self {
        Self {
            processes: Vec::new(),
            unavailable: true,
        }
    }
}

impl ProcessInspector for MockProcessInspector {
    fn running_processes(&self) -> LookupResult<Vec<ProcessInfo>> {
        if self.unavailable {
            return Err(LookupError::unavailable("process table", "mock is unavailable"));
        }
        Ok(self.processes.clone())
    }
}

/// A service inspector returning a fixed snapshot.
#[derive(Debug, Clone, Default)]
pub struct MockServiceInspector {
    services: Vec<ServiceInfo>,
}

impl MockServiceInspector {
    /// Creates an inspector reporting the given services.
    pub fn new(services: Vec<ServiceInfo>) -> Self {
        Self { services }
    }
}

impl ServiceInspector for MockServiceInspector {
    fn loaded_services(&self) -> LookupResult<Vec<ServiceInfo>> {
        Ok(self.services.clone())
    }
}

/// An extension inspector returning a fixed snapshot.
#[derive(Debug, Clone, Default)]
pub struct MockExtensionInspector {
    extensions: Vec<ExtensionInfo>,
}

impl MockExtensionInspector {
    /// Creates an inspector reporting the given extensions.
    pub fn new(extensions: Vec<ExtensionInfo>) -> Self {
        Self { extensions }
    }
}

impl ExtensionInspector for MockExtensionInspector {
    fn registered_extensions(&self) -> LookupResult<Vec<ExtensionInfo>> {
        Ok(self.extensions.clone())
    }
}

/// An action recorded by [`RecordingExecutor`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordedAction {
    /// `delete_file` was called.
    DeleteFile(PathBuf),
    /// `remediate_process` was called.
    Process {
        /// Process identifier.
        pid: u32,
        /// Flags as received.
        flags: ProcessFlags,
    },
    /// `remediate_service` was called.
    Service {
        /// Service label.
        label: String,
        /// Flags as received.
        flags: ServiceFlags,
    },
    /// `disable_extension` was called.
    Extension(String),
}

/// An action executor that records calls instead of acting.
#[derive(Debug, Clone, Default)]
pub struct RecordingExecutor {
    actions: Arc<Mutex<Vec<RecordedAction>>>,
    failure: Option<String>,
}

impl RecordingExecutor {
    /// Creates an executor whose actions succeed.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every action fail with the reason after recording it.
    pub fn failing(reason: impl Into<String>) -> Self {
        Self {
            failure: Some(reason.into()),
            ..Self::default()
        }
    }

    /// Returns the recorded actions in call order.
    pub fn actions(&self) -> Vec<RecordedAction> {
        lock(&self.actions).clone()
    }

    /// Returns the number of calls.
    pub fn call_count(&self) -> usize {
        lock(&self.actions).len()
    }

    fn record(&self, action: RecordedAction) -> ActionResult<()> {
        lock(&self.actions).push(action);
        match &self.failure {
            Some(reason) => Err(ActionError::failed(reason.clone())),
            None => Ok(()),
        }
    }
}

impl ActionExecutor for RecordingExecutor {
    fn delete_file(&self, path: &Path) -> ActionResult<()> {
        self.record(RecordedAction::DeleteFile(path.to_path_buf()))
    }

    fn remediate_process(&self, process: &ProcessInfo, flags: &ProcessFlags) -> ActionResult<()> {
        self.record(RecordedAction::Process {
            pid: process.pid,
            flags: *flags,
        })
    }

    fn remediate_service(&self, service: &ServiceInfo, flags: &ServiceFlags) -> ActionResult<()> {
        self.record(RecordedAction::Service {
            label: service.label.clone(),
            flags: *flags,
        })
    }

    fn disable_extension(&self, extension: &ExtensionInfo) -> ActionResult<()> {
        self.record(RecordedAction::Extension(extension.identifier.clone()))
    }
}

/// A reporter that keeps every event in memory.
#[derive(Debug, Clone, Default)]
pub struct RecordingReporter {
    events: Arc<Mutex<Vec<RemediationEvent>>>,
}

impl RecordingReporter {
    /// Creates an empty reporter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns every recorded event in order.
    pub fn events(&self) -> Vec<RemediationEvent> {
        lock(&self.events).clone()
    }

    /// Returns the number of events with the given type name.
    pub fn count_of(&self, event_type: &str) -> usize {
        lock(&self.events)
            .iter()
            .filter(|e| e.event_type() == event_type)
            .count()
    }
}

impl Reporter for RecordingReporter {
    fn record(&self, event: &RemediationEvent) {
        lock(&self.events).push(event.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_matcher_counts() {
        let matcher = MockMatcher::new().with_match_on(b"bad".to_vec());
        let handle = matcher.compile("bad").unwrap();

        assert!(handle.scan_bytes(b"so bad").unwrap());
        assert!(!handle.scan_bytes(b"fine").unwrap());
        assert_eq!(matcher.compile_count(), 1);
        assert_eq!(matcher.scan_count(), 2);
        assert_eq!(matcher.release_count(), 0);

        drop(handle);
        assert_eq!(matcher.release_count(), 1);
    }

    #[test]
    fn test_mock_matcher_compile_failure_leaks_nothing() {
        let matcher = MockMatcher::new().with_compile_failure("syntax error");
        assert!(matches!(matcher.compile("x"), Err(MatcherError::Compile { .. })));
        assert_eq!(matcher.compile_count(), 1);
        assert_eq!(matcher.release_count(), 0);
    }

    #[test]
    fn test_mock_matcher_scan_failure() {
        let matcher = MockMatcher::new().with_scan_failure("engine crashed");
        let handle = matcher.compile("x").unwrap();
        assert!(matches!(handle.scan_bytes(b"x"), Err(MatcherError::Scan { .. })));
    }

    #[test]
    fn test_signature_inspector_unscripted() {
        let inspector = MockSignatureInspector::new().with_revoked(true);
        assert!(inspector.is_revoked(Path::new("/x")).unwrap());
        assert!(inspector.is_notarized(Path::new("/x")).is_err());
        assert_eq!(inspector.lookup_count(), 2);
    }

    #[test]
    fn test_recording_executor_shares_state() {
        let executor = RecordingExecutor::new();
        let clone = executor.clone();
        clone.delete_file(Path::new("/tmp/x")).unwrap();

        assert_eq!(executor.actions(), vec![RecordedAction::DeleteFile("/tmp/x".into())]);
    }

    #[test]
    fn test_failing_executor_still_records() {
        let executor = RecordingExecutor::failing("permission denied");
        let result = executor.disable_extension(&ExtensionInfo::new("com.x"));
        assert!(result.is_err());
        assert_eq!(executor.call_count(), 1);
    }

    #[test]
    fn test_recording_reporter() {
        let reporter = RecordingReporter::new();
        reporter.record(&RemediationEvent::scan_failure("/x", "m", "r"));
        assert_eq!(reporter.count_of("scan_failure"), 1);
        assert_eq!(reporter.events().len(), 1);
    }
}
