//! The dependency-injection context handed to the remediator.

use crate::audit::{RemediationEvent, TracingReporter};
use crate::backends::{FsMetadataProvider, WalkDirWalker};
use crate::core::traits::{
    ActionExecutor, ExtensionInspector, FileMetadataProvider, FileSystemWalker, ProcessInspector,
    Reporter, ServiceInspector, SignatureInspector,
};

use std::sync::Arc;

/// Every collaborator the engine may call during an assessment pass.
///
/// Only the metadata provider, the walker and the reporter have defaults.
/// Inspectors and the action executor are opt-in; a rule set that needs a
/// missing collaborator gets a configuration error for that remediation
/// (or a `false` condition) rather than a panic.
///
/// # Examples
///
/// ```rust
/// use remediate::core::Collaborators;
/// use remediate::backends::FsActionExecutor;
///
/// let collaborators = Collaborators::new().with_action_executor(FsActionExecutor::new());
/// assert!(collaborators.action_executor().is_some());
/// ```
#[derive(Debug, Clone)]
pub struct Collaborators {
    metadata: Arc<dyn FileMetadataProvider>,
    walker: Arc<dyn FileSystemWalker>,
    reporter: Arc<dyn Reporter>,
    signatures: Option<Arc<dyn SignatureInspector>>,
    processes: Option<Arc<dyn ProcessInspector>>,
    services: Option<Arc<dyn ServiceInspector>>,
    extensions: Option<Arc<dyn ExtensionInspector>>,
    executor: Option<Arc<dyn ActionExecutor>>,
}

impl Default for Collaborators {
    fn default() -> Self {
        Self {
            metadata: Arc::new(FsMetadataProvider::new()),
            walker: Arc::new(WalkDirWalker::new()),
            reporter: Arc::new(TracingReporter::new()),
            signatures: None,
            processes: None,
            services: None,
            extensions: None,
            executor: None,
        }
    }
}

impl Collaborators {
    /// Creates collaborators with filesystem defaults and tracing output.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the file metadata provider.
    pub fn with_metadata_provider<M: FileMetadataProvider + 'static>(mut self, provider: M) -> Self {
        self.metadata = Arc::new(provider);
        self
    }

    /// Sets the directory walker.
    pub fn with_walker<W: FileSystemWalker + 'static>(mut self, walker: W) -> Self {
        self.walker = Arc::new(walker);
        self
    }

    /// Sets the event reporter.
    pub fn with_reporter<R: Reporter + 'static>(mut self, reporter: R) -> Self {
        self.reporter = Arc::new(reporter);
        self
    }

    /// Sets the event reporter from a shared handle.
    pub fn with_arc_reporter(mut self, reporter: Arc<dyn Reporter>) -> Self {
        self.reporter = reporter;
        self
    }

    /// Sets the signature inspector.
    pub fn with_signature_inspector<S: SignatureInspector + 'static>(mut self, inspector: S) -> Self {
        self.signatures = Some(Arc::new(inspector));
        self
    }

    /// Sets the process inspector.
    pub fn with_process_inspector<P: ProcessInspector + 'static>(mut self, inspector: P) -> Self {
        self.processes = Some(Arc::new(inspector));
        self
    }

    /// Sets the service inspector.
    pub fn with_service_inspector<S: ServiceInspector + 'static>(mut self, inspector: S) -> Self {
        self.services = Some(Arc::new(inspector));
        self
    }

    /// Sets the extension inspector.
    pub fn with_extension_inspector<E: ExtensionInspector + 'static>(mut self, inspector: E) -> Self {
        self.extensions = Some(Arc::new(inspector));
        self
    }

    /// Sets the action executor.
    pub fn with_action_executor<A: ActionExecutor + 'static>(mut self, executor: A) -> Self {
        self.executor = Some(Arc::new(executor));
        self
    }

    /// Sets the action executor from a shared handle.
    pub fn with_arc_action_executor(mut self, executor: Arc<dyn ActionExecutor>) -> Self {
        self.executor = Some(executor);
        self
    }

    /// Returns the file metadata provider.
    pub fn metadata(&self) -> &dyn FileMetadataProvider {
        self.metadata.as_ref()
    }

    /// Returns the directory walker.
    pub fn walker(&self) -> &dyn FileSystemWalker {
        self.walker.as_ref()
    }

    /// Returns the signature inspector, if configured.
    pub fn signature_inspector(&self) -> Option<&dyn SignatureInspector> {
        self.signatures.as_deref()
    }

    /// Returns the process inspector, if configured.
    pub fn process_inspector(&self) -> Option<&dyn ProcessInspector> {
        self.processes.as_deref()
    }

    /// Returns the service inspector, if configured.
    pub fn service_inspector(&self) -> Option<&dyn ServiceInspector> {
        self.services.as_deref()
    }

    /// Returns the extension inspector, if configured.
    pub fn extension_inspector(&self) -> Option<&dyn ExtensionInspector> {
        self.extensions.as_deref()
    }

    /// Returns the action executor, if configured.
    pub fn action_executor(&self) -> Option<&dyn ActionExecutor> {
        self.executor.as_deref()
    }

    /// Sends an event to the reporter.
    pub fn report(&self, event: RemediationEvent) {
        self.reporter.record(&event);
    }
}
