//! The assessment engine.
//!
//! A [`Remediator`] walks a [`RemediationSet`] in order. For each
//! remediation it resolves subjects, evaluates the condition list with a
//! short-circuit AND, acts or reports on every match, then assesses
//! follow-ups according to the [`FollowUpPolicy`].
//!
//! - [`report`] - the `AssessmentReport` returned by a pass

mod resolve;
pub mod report;

pub use report::{
    ActionTaken, AssessmentReport, AssessmentTotals, ErrorRecord, RemediationOutcome,
    SubjectMatch,
};

use crate::audit::RemediationEvent;
use crate::condition::{evaluate_all, Condition};
use crate::core::{
    file_identity, ActionError, ActionExecutor, ActionResult, Collaborators, ExtensionInfo,
    FileDigest, ProcessInfo, RemediationError, RemediationResult, ServiceInfo,
};
use crate::remediation::{
    ExtensionRemediation, FileRemediation, ProcessRemediation, Remediation, RemediationSet,
    ServiceRemediation,
};
use resolve::{Resolution, SearchLimits};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::collections::BTreeMap;
use std::path::Path;
use std::time::{Duration, Instant};
use uuid::Uuid;

type ActionFlags = BTreeMap<&'static str, bool>;

/// When follow-up remediations are assessed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FollowUpPolicy {
    /// Assess follow-ups whether or not the parent matched.
    #[default]
    Always,
    /// Assess follow-ups only when at least one parent subject matched.
    OnMatch,
}

/// Configuration for the remediator.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RemediatorConfig {
    /// When follow-ups are assessed.
    pub follow_up_policy: FollowUpPolicy,

    /// Search depth for directory searches that do not declare one.
    pub default_search_depth: usize,

    /// Time budget for one pass, checked during directory enumeration.
    pub deadline: Option<Duration>,

    /// Maximum number of remediations assessed at once by
    /// [`Remediator::assess_concurrent`].
    pub max_parallel_remediations: usize,
}

impl Default for RemediatorConfig {
    fn default() -> Self {
        Self {
            follow_up_policy: FollowUpPolicy::Always,
            default_search_depth: 1,
            deadline: None,
            max_parallel_remediations: 4,
        }
    }
}

impl RemediatorConfig {
    /// Creates a new configuration with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the follow-up policy.
    pub fn with_follow_up_policy(mut self, policy: FollowUpPolicy) -> Self {
        self.follow_up_policy = policy;
        self
    }

    /// Sets the default search depth.
    pub fn with_default_search_depth(mut self, depth: usize) -> Self {
        self.default_search_depth = depth;
        self
    }

    /// Sets the pass deadline.
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Sets the concurrency bound.
    pub fn with_max_parallel_remediations(mut self, max: usize) -> Self {
        self.max_parallel_remediations = max;
        self
    }

    /// Checks the configuration for values the engine cannot use.
    pub fn validate(&self) -> RemediationResult<()> {
        if self.default_search_depth == 0 {
            return Err(RemediationError::configuration(
                "default_search_depth must be at least 1",
            ));
        }
        if self.max_parallel_remediations == 0 {
            return Err(RemediationError::configuration(
                "max_parallel_remediations must be at least 1",
            ));
        }
        Ok(())
    }
}

/// Builder for creating a `Remediator`.
#[derive(Debug, Default)]
pub struct RemediatorBuilder {
    collaborators: Option<Collaborators>,
    config: RemediatorConfig,
}

impl RemediatorBuilder {
    /// Creates a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the collaborators.
    pub fn with_collaborators(mut self, collaborators: Collaborators) -> Self {
        self.collaborators = Some(collaborators);
        self
    }

    /// Sets the configuration.
    pub fn with_config(mut self, config: RemediatorConfig) -> Self {
        self.config = config;
        self
    }

    /// Builds the remediator, validating the configuration.
    pub fn build(self) -> RemediationResult<Remediator> {
        self.config.validate()?;
        Ok(Remediator {
            collaborators: self.collaborators.unwrap_or_default(),
            config: self.config,
        })
    }
}

/// Per-pass timing shared by every remediation in the pass.
#[derive(Debug, Clone, Copy)]
struct Pass {
    started: Instant,
    deadline: Option<Instant>,
}

impl Pass {
    fn begin(config: &RemediatorConfig) -> Self {
        let started = Instant::now();
        Self {
            started,
            deadline: config.deadline.map(|d| started + d),
        }
    }
}

/// The engine that assesses a [`RemediationSet`].
///
/// # Examples
///
/// ```rust
/// use remediate::condition::FileCondition;
/// use remediate::remediation::{FileRemediation, RemediationSet};
/// use remediate::remediator::Remediator;
///
/// let set = RemediationSet::builder()
///     .add(
///         FileRemediation::single("/definitely/not/here")
///             .with_tag("missing")
///             .with_conditions(FileCondition::min_size(0))
///             .with_report_only(true),
///     )
///     .build();
///
/// let report = Remediator::new().assess(&set);
/// assert_eq!(report.totals.subjects_assessed, 1);
/// assert!(!report.has_matches());
/// ```
#[derive(Debug, Clone, Default)]
pub struct Remediator {
    collaborators: Collaborators,
    config: RemediatorConfig,
}

impl Remediator {
    /// Creates a remediator with default collaborators and configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new builder.
    pub fn builder() -> RemediatorBuilder {
        RemediatorBuilder::new()
    }

    /// Creates a remediator with the given collaborators.
    pub fn with_collaborators(collaborators: Collaborators) -> Self {
        Self {
            collaborators,
            config: RemediatorConfig::default(),
        }
    }

    /// Returns the collaborators.
    pub fn collaborators(&self) -> &Collaborators {
        &self.collaborators
    }

    /// Returns the configuration.
    pub fn config(&self) -> &RemediatorConfig {
        &self.config
    }

    /// Assesses every remediation in order and returns the report.
    ///
    /// Never fails: every problem is recorded in the report and sent to the
    /// reporter.
    pub fn assess(&self, set: &RemediationSet) -> AssessmentReport {
        let id = Uuid::new_v4();
        let started_at = Utc::now();
        let pass = Pass::begin(&self.config);
        self.start(id, set);

        let outcomes = set
            .iter()
            .map(|remediation| self.assess_remediation(remediation, &pass))
            .collect();

        self.finish(AssessmentReport::new(id, started_at, outcomes))
    }

    /// Assesses distinct top-level remediations concurrently on the
    /// blocking pool.
    ///
    /// At most `max_parallel_remediations` run at once. Outcomes keep
    /// declaration order. Conditions within one remediation are still
    /// evaluated sequentially.
    #[cfg(feature = "tokio-runtime")]
    pub async fn assess_concurrent(&self, set: &RemediationSet) -> AssessmentReport {
        use futures::future::join_all;
        use std::sync::Arc;
        use tokio::sync::Semaphore;

        let id = Uuid::new_v4();
        let started_at = Utc::now();
        let pass = Pass::begin(&self.config);
        self.start(id, set);

        let permits = Arc::new(Semaphore::new(self.config.max_parallel_remediations.max(1)));
        let tasks: Vec<_> = set
            .iter()
            .map(|remediation| {
                let remediator = self.clone();
                let remediation = remediation.clone();
                let permits = Arc::clone(&permits);
                async move {
                    let fallback = RemediationOutcome::for_remediation(&remediation);
                    let Ok(permit) = permits.acquire_owned().await else {
                        return remediator.internal_failure(fallback, "remediation permits closed");
                    };
                    let worker = remediator.clone();
                    let joined = tokio::task::spawn_blocking(move || {
                        let _permit = permit;
                        worker.assess_remediation(&remediation, &pass)
                    })
                    .await;

                    match joined {
                        Ok(outcome) => outcome,
                        Err(e) => remediator
                            .internal_failure(fallback, format!("remediation task failed: {e}")),
                    }
                }
            })
            .collect();

        let outcomes = join_all(tasks).await;
        self.finish(AssessmentReport::new(id, started_at, outcomes))
    }

    /// Records an engine failure against an otherwise empty outcome.
    #[cfg(feature = "tokio-runtime")]
    fn internal_failure(
        &self,
        mut outcome: RemediationOutcome,
        message: impl Into<String>,
    ) -> RemediationOutcome {
        let err = RemediationError::internal(message);
        let tag = outcome.tag.clone();
        self.record_error(tag.as_deref(), &err, &mut outcome);
        outcome
    }

    fn start(&self, id: Uuid, set: &RemediationSet) {
        tracing::info!(
            report_id = %id,
            remediation_count = set.len(),
            total_count = set.total_count(),
            "Starting assessment"
        );
        self.collaborators.report(RemediationEvent::AssessmentStarted {
            report_id: id.to_string(),
            remediation_count: set.len(),
        });
    }

    fn finish(&self, report: AssessmentReport) -> AssessmentReport {
        tracing::info!(
            report_id = %report.id,
            matches = report.totals.matches,
            actions_completed = report.totals.actions_completed,
            actions_failed = report.totals.actions_failed,
            errors = report.totals.errors,
            duration_ms = report.duration().as_millis() as u64,
            "Assessment completed"
        );
        self.collaborators.report(RemediationEvent::completed(&report));
        report
    }

    fn assess_remediation(&self, remediation: &Remediation, pass: &Pass) -> RemediationOutcome {
        let mut outcome = RemediationOutcome::for_remediation(remediation);
        tracing::debug!(
            remediation = %remediation.display_name(),
            kind = %remediation.kind(),
            conditions = remediation.condition_count(),
            "Assessing remediation"
        );

        let flags = remediation.kind_flags();
        match remediation {
            Remediation::File(r) => self.assess_files(r, pass, &flags, &mut outcome),
            Remediation::Process(r) => self.assess_processes(r, &flags, &mut outcome),
            Remediation::Service(r) => self.assess_services(r, &flags, &mut outcome),
            Remediation::Extension(r) => self.assess_extensions(r, &flags, &mut outcome),
        }

        let follow_ups = remediation.follow_ups();
        if follow_ups.is_empty() {
            return outcome;
        }

        let run = match self.config.follow_up_policy {
            FollowUpPolicy::Always => true,
            FollowUpPolicy::OnMatch => outcome.matched(),
        };
        if run {
            outcome.follow_ups = follow_ups
                .iter()
                .map(|follow_up| self.assess_remediation(follow_up, pass))
                .collect();
        } else {
            tracing::debug!(
                remediation = %remediation.display_name(),
                skipped = follow_ups.len(),
                "Parent did not match, skipping follow-ups"
            );
            outcome.follow_ups_skipped = true;
        }
        outcome
    }

    fn assess_files(
        &self,
        r: &FileRemediation,
        pass: &Pass,
        flags: &ActionFlags,
        outcome: &mut RemediationOutcome,
    ) {
        let limits = SearchLimits {
            default_depth: self.config.default_search_depth,
            started: pass.started,
            deadline: pass.deadline,
        };
        let resolution = resolve::resolve_files(r.target(), &self.collaborators, &limits);
        self.assess_subjects(
            r.tag(),
            r.conditions(),
            resolution,
            flags,
            file_identity,
            |path| self.file_digest(path),
            |executor, path| executor.delete_file(path),
            outcome,
        );
    }

    fn assess_processes(
        &self,
        r: &ProcessRemediation,
        flags: &ActionFlags,
        outcome: &mut RemediationOutcome,
    ) {
        let resolution = resolve::resolve_processes(&self.collaborators);
        let process_flags = r.flags();
        self.assess_subjects(
            r.tag(),
            r.conditions(),
            resolution,
            flags,
            ProcessInfo::identity,
            |_| None,
            |executor, process| executor.remediate_process(process, process_flags),
            outcome,
        );
    }

    fn assess_services(
        &self,
        r: &ServiceRemediation,
        flags: &ActionFlags,
        outcome: &mut RemediationOutcome,
    ) {
        let resolution = resolve::resolve_services(&self.collaborators);
        let service_flags = r.flags();
        self.assess_subjects(
            r.tag(),
            r.conditions(),
            resolution,
            flags,
            ServiceInfo::identity,
            |_| None,
            |executor, service| executor.remediate_service(service, service_flags),
            outcome,
        );
    }

    fn assess_extensions(
        &self,
        r: &ExtensionRemediation,
        flags: &ActionFlags,
        outcome: &mut RemediationOutcome,
    ) {
        let resolution = resolve::resolve_extensions(&self.collaborators);
        self.assess_subjects(
            r.tag(),
            r.conditions(),
            resolution,
            flags,
            ExtensionInfo::identity,
            |_| None,
            |executor, extension| executor.disable_extension(extension),
            outcome,
        );
    }

    /// Evaluates resolved subjects and acts on or reports every match.
    #[allow(clippy::too_many_arguments)]
    fn assess_subjects<C, S, I, D, A>(
        &self,
        tag: Option<&str>,
        conditions: &[C],
        resolution: Resolution<S>,
        flags: &ActionFlags,
        identify: I,
        digest_of: D,
        act: A,
        outcome: &mut RemediationOutcome,
    ) where
        C: Condition,
        S: Borrow<C::Subject>,
        I: Fn(&C::Subject) -> String,
        D: Fn(&C::Subject) -> Option<FileDigest>,
        A: Fn(&dyn ActionExecutor, &C::Subject) -> ActionResult<()>,
    {
        for err in &resolution.errors {
            self.record_error(tag, err, outcome);
        }
        outcome.deadline_exceeded |= resolution.deadline_exceeded;

        for subject in &resolution.subjects {
            let subject: &C::Subject = Borrow::<C::Subject>::borrow(subject);
            outcome.subjects_assessed += 1;

            if !evaluate_all(conditions, subject, &self.collaborators) {
                continue;
            }

            let identity = identify(subject);
            let digest = digest_of(subject);
            let blake3 = digest.as_ref().map(|d| d.blake3.clone());
            tracing::info!(
                tag = ?tag,
                kind = %outcome.kind,
                subject = %identity,
                report_only = outcome.report_only,
                "Subject matched"
            );

            let action = if outcome.report_only {
                self.collaborators.report(RemediationEvent::ReportOnlyMatch {
                    tag: tag.map(str::to_string),
                    kind: outcome.kind,
                    subject: identity.clone(),
                    file_hash_blake3: blake3,
                });
                ActionTaken::Reported
            } else {
                let result = match self.collaborators.action_executor() {
                    Some(executor) => act(executor, subject),
                    None => Err(ActionError::NotConfigured),
                };
                self.record_action(tag, &identity, flags, blake3, result, outcome)
            };

            outcome.matches.push(SubjectMatch {
                subject: identity,
                action,
                digest,
            });
        }
    }

    /// Digests a matched file before it is acted on.
    fn file_digest(&self, path: &Path) -> Option<FileDigest> {
        match self.collaborators.metadata().digest(path) {
            Ok(digest) => Some(digest),
            Err(e) => {
                tracing::debug!(path = %path.display(), error = %e, "No digest for matched file");
                None
            }
        }
    }

    fn record_action(
        &self,
        tag: Option<&str>,
        identity: &str,
        flags: &ActionFlags,
        file_hash_blake3: Option<String>,
        result: ActionResult<()>,
        outcome: &mut RemediationOutcome,
    ) -> ActionTaken {
        match result {
            Ok(()) => {
                self.collaborators.report(RemediationEvent::ActionCompleted {
                    tag: tag.map(str::to_string),
                    kind: outcome.kind,
                    subject: identity.to_string(),
                    flags: flags.clone(),
                    file_hash_blake3,
                });
                ActionTaken::Completed
            }
            Err(source) => {
                let reason = source.to_string();
                let err = RemediationError::action(identity, tag.map(str::to_string), source);
                self.record_error(tag, &err, outcome);
                ActionTaken::Failed { reason }
            }
        }
    }

    fn record_error(&self, tag: Option<&str>, err: &RemediationError, outcome: &mut RemediationOutcome) {
        tracing::warn!(tag = ?tag, kind = err.kind(), error = %err, "Remediation error");
        let event = match err {
            RemediationError::Compile { pattern, reason } => RemediationEvent::CompileError {
                tag: tag.map(str::to_string),
                pattern: pattern.clone(),
                reason: reason.clone(),
            },
            RemediationError::DeadlineExceeded { elapsed } => RemediationEvent::DeadlineExceeded {
                tag: tag.map(str::to_string),
                elapsed_ms: elapsed.as_millis() as u64,
            },
            RemediationError::Lookup { subject, reason } => RemediationEvent::LookupFailure {
                tag: tag.map(str::to_string),
                subject: subject.clone(),
                reason: reason.clone(),
            },
            RemediationError::Internal { message } => RemediationEvent::InternalError {
                tag: tag.map(str::to_string),
                message: message.clone(),
            },
            RemediationError::Action { subject, source, .. } => RemediationEvent::ActionFailed {
                tag: tag.map(str::to_string),
                kind: outcome.kind,
                subject: subject.clone(),
                reason: source.to_string(),
            },
            RemediationError::Configuration { .. } => RemediationEvent::ConfigurationError {
                tag: tag.map(str::to_string),
                message: err.to_string(),
            },
        };
        self.collaborators.report(event);
        outcome.push_error(err);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::{
        FsActionExecutor, MockExtensionInspector, MockMatcher, MockProcessInspector,
        MockServiceInspector, MockSignatureInspector, RecordedAction, RecordingExecutor,
        RecordingReporter,
    };
    use crate::condition::{ExtensionCondition, FileCondition, ProcessCondition, ServiceCondition};
    use crate::core::{FileHasher, PatternMatcher, Value};
    use crate::remediation::{ProcessFlags, ServiceFlags};
    use std::path::{Path, PathBuf};

    const EICAR: &[u8] =
        br"X5O!P%@AP[4\PZX54(P^)7CC)7}$EICAR-STANDARD-ANTIVIRUS-TEST-FILE!$H+H*";

    fn remediator(collaborators: Collaborators) -> Remediator {
        Remediator::with_collaborators(collaborators)
    }

    fn write(dir: &Path, name: &str, contents: &[u8]) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_config_validation() {
        assert!(RemediatorConfig::new().validate().is_ok());
        assert!(RemediatorConfig::new()
            .with_default_search_depth(0)
            .validate()
            .unwrap_err()
            .is_configuration());

        let err = Remediator::builder()
            .with_config(RemediatorConfig::new().with_max_parallel_remediations(0))
            .build()
            .unwrap_err();
        assert!(err.is_configuration());

        let built = Remediator::builder()
            .with_config(RemediatorConfig::new().with_follow_up_policy(FollowUpPolicy::OnMatch))
            .build()
            .unwrap();
        assert_eq!(built.config().follow_up_policy, FollowUpPolicy::OnMatch);
    }

    #[test]
    fn test_empty_conditions_match_every_subject() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "any.txt", b"x");
        let executor = RecordingExecutor::new();

        let set = RemediationSet::builder()
            .add(FileRemediation::single(&path).with_tag("vacuous"))
            .build();
        let report = remediator(Collaborators::new().with_action_executor(executor.clone()))
            .assess(&set);

        assert_eq!(report.totals.matches, 1);
        assert_eq!(executor.actions(), vec![RecordedAction::DeleteFile(path)]);
    }

    #[test]
    fn test_scenario_eicar_report_only() {
        let dir = tempfile::tempdir().unwrap();
        let mut contents = EICAR.to_vec();
        contents.push(b'\n');
        assert_eq!(contents.len(), 69);
        let path = write(dir.path(), "eicar.com", &contents);

        let matcher = MockMatcher::new().with_match_on(b"EICAR-STANDARD".to_vec());
        let executor = RecordingExecutor::new();
        let reporter = RecordingReporter::new();
        let collaborators = Collaborators::new()
            .with_action_executor(executor.clone())
            .with_reporter(reporter.clone());

        let set = RemediationSet::builder()
            .add(
                FileRemediation::single(&path)
                    .with_tag("EICAR")
                    .with_report_only(true)
                    .with_conditions([
                        FileCondition::min_size(68),
                        FileCondition::pattern(matcher.compile("eicar").unwrap()),
                    ]),
            )
            .build();
        let report = remediator(collaborators).assess(&set);

        assert_eq!(report.totals.reported, 1);
        assert_eq!(report.outcomes[0].matches[0].action, ActionTaken::Reported);
        assert_eq!(executor.call_count(), 0);
        assert!(path.exists());
        assert_eq!(matcher.scan_count(), 1);
        assert_eq!(reporter.count_of("report_only_match"), 1);
        assert_eq!(reporter.count_of("assessment_started"), 1);
        assert_eq!(reporter.count_of("assessment_completed"), 1);
    }

    #[test]
    fn test_scenario_small_file_short_circuits() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "small.bin", &[b'a'; 50]);
        let matcher = MockMatcher::new().with_default_result(true);

        let set = RemediationSet::builder()
            .add(
                FileRemediation::single(&path)
                    .with_report_only(true)
                    .with_conditions([
                        FileCondition::min_size(68),
                        FileCondition::pattern(matcher.compile("eicar").unwrap()),
                    ]),
            )
            .build();
        let report = Remediator::new().assess(&set);

        assert!(!report.has_matches());
        assert_eq!(report.totals.subjects_assessed, 1);
        assert_eq!(matcher.scan_count(), 0);
    }

    #[test]
    fn test_scenario_directory_search() {
        let dir = tempfile::tempdir().unwrap();
        let hit = write(dir.path(), "12345678", &[0u8; 30]);
        write(dir.path(), "abcdefgh", &[0u8; 30]);
        write(dir.path(), "99999", &[0u8; 10]);
        std::fs::create_dir(dir.path().join("nested")).unwrap();
        write(&dir.path().join("nested"), "7654321", &[0u8; 30]);

        let executor = RecordingExecutor::new();
        let set = RemediationSet::builder()
            .add(
                // Anchored to the last component: digits in the temp root never match.
                FileRemediation::search(dir.path(), [r"[0-9]{5,10}[^/]*$"])
                    .with_max_depth(1)
                    .with_tag("digits")
                    .with_conditions(FileCondition::min_size(24)),
            )
            .build();
        let report =
            remediator(Collaborators::new().with_action_executor(executor.clone())).assess(&set);

        assert_eq!(report.outcomes[0].subjects_assessed, 2);
        assert_eq!(executor.actions(), vec![RecordedAction::DeleteFile(hit)]);
        assert_eq!(report.totals.actions_completed, 1);
    }

    #[test]
    fn test_search_root_digits_do_not_match() {
        let parent = tempfile::tempdir().unwrap();
        let root = parent.path().join("run-20261016");
        std::fs::create_dir(&root).unwrap();
        write(&root, "readme.txt", &[0u8; 30]);

        let set = RemediationSet::builder()
            .add(
                FileRemediation::search(&root, [r"[0-9]{5,10}[^/]*$"])
                    .with_max_depth(1)
                    .with_report_only(true)
                    .with_conditions(FileCondition::min_size(24)),
            )
            .build();
        let report = Remediator::new().assess(&set);

        assert_eq!(report.totals.subjects_assessed, 0);
        assert!(!report.has_matches());
    }

    #[test]
    fn test_directory_search_never_deletes_directories() {
        let dir = tempfile::tempdir().unwrap();
        let cache = dir.path().join("cache-1234567");
        std::fs::create_dir(&cache).unwrap();
        let important = write(&cache, "important.db", &[0u8; 10]);

        let reporter = RecordingReporter::new();
        let collaborators = Collaborators::new()
            .with_action_executor(FsActionExecutor::new())
            .with_reporter(reporter.clone());
        let set = RemediationSet::builder()
            .add(
                FileRemediation::search(dir.path(), [r"[0-9]{5,10}[^/]*$"])
                    .with_max_depth(1)
                    .with_tag("digits")
                    .with_conditions(FileCondition::min_size(0)),
            )
            .build();
        let report = remediator(collaborators).assess(&set);

        let outcome = &report.outcomes[0];
        assert_eq!(outcome.subjects_assessed, 1);
        match &outcome.matches[0].action {
            ActionTaken::Failed { reason } => assert!(reason.contains("not a regular file")),
            other => panic!("unexpected action {other:?}"),
        }
        assert_eq!(outcome.matches[0].digest, None);
        assert_eq!(outcome.errors[0].kind, "action_failure");
        assert_eq!(reporter.count_of("action_failed"), 1);
        assert_eq!(reporter.count_of("action_completed"), 0);
        assert!(cache.is_dir());
        assert_eq!(std::fs::read(&important).unwrap().len(), 10);
    }

    #[test]
    fn test_scan_failure_reports_event_without_match() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "sample.bin", &[0u8; 128]);
        let matcher = MockMatcher::new().with_scan_failure("engine crashed");
        let executor = RecordingExecutor::new();
        let reporter = RecordingReporter::new();
        let collaborators = Collaborators::new()
            .with_action_executor(executor.clone())
            .with_reporter(reporter.clone());

        let set = RemediationSet::builder()
            .add(
                FileRemediation::single(&path)
                    .with_tag("scan")
                    .with_conditions(FileCondition::pattern(matcher.compile("x").unwrap())),
            )
            .build();
        let report = remediator(collaborators).assess(&set);

        assert_eq!(matcher.scan_count(), 1);
        assert_eq!(reporter.count_of("scan_failure"), 1);
        assert!(!report.has_matches());
        assert_eq!(executor.call_count(), 0);
        assert!(path.exists());
    }

    #[test]
    fn test_matched_files_carry_digest() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "dropper.bin", &[7u8; 256]);
        let expected = FileHasher::new().hash_bytes(&[7u8; 256]).blake3;
        let reporter = RecordingReporter::new();
        let collaborators = Collaborators::new()
            .with_process_inspector(MockProcessInspector::new(vec![ProcessInfo::new(5, "dropper")]))
            .with_reporter(reporter.clone());

        let set = RemediationSet::builder()
            .add(FileRemediation::single(&path).with_report_only(true))
            .add(ProcessRemediation::new().with_report_only(true))
            .build();
        let report = remediator(collaborators).assess(&set);

        let file_match = &report.outcomes[0].matches[0];
        assert_eq!(file_match.digest.as_ref().map(|d| d.blake3.as_str()), Some(expected.as_str()));
        assert_eq!(report.outcomes[1].matches[0].digest, None);

        let hashes: Vec<Option<String>> = reporter
            .events()
            .into_iter()
            .filter_map(|e| match e {
                RemediationEvent::ReportOnlyMatch { file_hash_blake3, .. } => Some(file_hash_blake3),
                _ => None,
            })
            .collect();
        assert_eq!(hashes, vec![Some(expected), None]);
    }

    #[test]
    fn test_lookup_failure_has_own_event() {
        let reporter = RecordingReporter::new();
        let collaborators = Collaborators::new()
            .with_process_inspector(MockProcessInspector::unavailable())
            .with_reporter(reporter.clone());

        let set = RemediationSet::builder()
            .add(ProcessRemediation::new().with_tag("procs"))
            .build();
        let report = remediator(collaborators).assess(&set);

        assert_eq!(report.outcomes[0].errors[0].kind, "lookup_failure");
        assert_eq!(reporter.count_of("lookup_failure"), 1);
        assert_eq!(reporter.count_of("configuration_error"), 0);
    }

    #[test]
    fn test_missing_search_dir_reports_configuration_error() {
        let reporter = RecordingReporter::new();
        let set = RemediationSet::builder()
            .add(FileRemediation::search_without_dir([".*"]).with_tag("nowhere"))
            .build();
        let report = remediator(Collaborators::new().with_reporter(reporter.clone())).assess(&set);

        let outcome = &report.outcomes[0];
        assert_eq!(outcome.subjects_assessed, 0);
        assert_eq!(outcome.errors.len(), 1);
        assert_eq!(outcome.errors[0].kind, "configuration_error");
        assert_eq!(reporter.count_of("configuration_error"), 1);
    }

    #[test]
    fn test_process_flags_pass_through() {
        let processes = vec![
            ProcessInfo::new(10, "evil").with_executable("/tmp/evil"),
            ProcessInfo::new(11, "fine").with_executable("/bin/fine"),
        ];
        let executor = RecordingExecutor::new();
        let reporter = RecordingReporter::new();
        let collaborators = Collaborators::new()
            .with_process_inspector(MockProcessInspector::new(processes))
            .with_action_executor(executor.clone())
            .with_reporter(reporter.clone());

        let set = RemediationSet::builder()
            .add(
                ProcessRemediation::new()
                    .with_tag("evil-proc")
                    .with_delete_executable(true)
                    .with_conditions(ProcessCondition::name(Value::exact("evil"))),
            )
            .build();
        let report = remediator(collaborators).assess(&set);

        assert_eq!(report.outcomes[0].subjects_assessed, 2);
        assert_eq!(
            executor.actions(),
            vec![RecordedAction::Process {
                pid: 10,
                flags: ProcessFlags {
                    delete_executable: true,
                    include_platform: false,
                },
            }]
        );
        let completed = reporter
            .events()
            .into_iter()
            .find(|e| e.event_type() == "action_completed")
            .unwrap();
        match completed {
            RemediationEvent::ActionCompleted { subject, flags, .. } => {
                assert_eq!(subject, "evil[10]");
                assert_eq!(flags.get("delete_executable"), Some(&true));
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[test]
    fn test_service_and_extension_actions() {
        let services = vec![ServiceInfo::new("com.bad.agent").with_program_arguments(["/tmp/a", "-d"])];
        let extensions = vec![ExtensionInfo::new("bad.ext"), ExtensionInfo::new("good.ext")];
        let executor = RecordingExecutor::new();
        let collaborators = Collaborators::new()
            .with_service_inspector(MockServiceInspector::new(services))
            .with_extension_inspector(MockExtensionInspector::new(extensions))
            .with_action_executor(executor.clone());

        let set = RemediationSet::builder()
            .add(
                ServiceRemediation::new()
                    .with_unload_only(true)
                    .with_conditions(ServiceCondition::argument_count(2)),
            )
            .add(
                ExtensionRemediation::new()
                    .with_conditions(ExtensionCondition::identifier(Value::prefix("bad."))),
            )
            .build();
        remediator(collaborators).assess(&set);

        assert_eq!(
            executor.actions(),
            vec![
                RecordedAction::Service {
                    label: "com.bad.agent".into(),
                    flags: ServiceFlags {
                        unload_only: true,
                        delete_bundle_too: false,
                    },
                },
                RecordedAction::Extension("bad.ext".into()),
            ]
        );
    }

    #[test]
    fn test_action_failure_is_recorded() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "locked", b"x");
        let reporter = RecordingReporter::new();
        let collaborators = Collaborators::new()
            .with_action_executor(RecordingExecutor::failing("permission denied"))
            .with_reporter(reporter.clone());

        let set = RemediationSet::builder()
            .add(FileRemediation::single(&path).with_tag("locked"))
            .build();
        let report = remediator(collaborators).assess(&set);

        assert_eq!(report.totals.actions_failed, 1);
        assert!(report.has_failures());
        assert_eq!(report.outcomes[0].errors[0].kind, "action_failure");
        assert_eq!(reporter.count_of("action_failed"), 1);
    }

    #[test]
    fn test_missing_executor_fails_action() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "target", b"x");
        let set = RemediationSet::builder()
            .add(FileRemediation::single(&path))
            .build();
        let report = Remediator::new().assess(&set);

        assert!(matches!(
            report.outcomes[0].matches[0].action,
            ActionTaken::Failed { .. }
        ));
        assert!(path.exists());
    }

    #[test]
    fn test_follow_up_policies() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "tiny", b"x");
        let child_path = write(dir.path(), "child", b"x");

        let build = || {
            RemediationSet::builder()
                .add(
                    FileRemediation::single(&path)
                        .with_tag("parent")
                        .with_report_only(true)
                        .with_conditions(FileCondition::min_size(1000))
                        .with_follow_ups(
                            FileRemediation::single(&child_path)
                                .with_tag("child")
                                .with_report_only(true),
                        ),
                )
                .build()
        };

        let always = Remediator::new().assess(&build());
        assert_eq!(always.outcomes[0].follow_ups.len(), 1);
        assert!(always.outcomes[0].follow_ups[0].matched());

        let on_match = Remediator::builder()
            .with_config(RemediatorConfig::new().with_follow_up_policy(FollowUpPolicy::OnMatch))
            .build()
            .unwrap()
            .assess(&build());
        assert!(on_match.outcomes[0].follow_ups.is_empty());
        assert!(on_match.outcomes[0].follow_ups_skipped);
    }

    #[test]
    fn test_nested_executable_conditions_use_signatures() {
        let dir = tempfile::tempdir().unwrap();
        let exe = write(dir.path(), "payload", &[0u8; 100]);
        let processes = vec![ProcessInfo::new(42, "payload").with_executable(&exe)];
        let executor = RecordingExecutor::new();
        let collaborators = Collaborators::new()
            .with_process_inspector(MockProcessInspector::new(processes))
            .with_signature_inspector(MockSignatureInspector::new().with_notarized(false))
            .with_action_executor(executor.clone());

        let set = RemediationSet::builder()
            .add(ProcessRemediation::new().with_conditions(ProcessCondition::main_executable([
                FileCondition::min_size(50),
                FileCondition::notarized(false),
            ])))
            .build();
        let report = remediator(collaborators).assess(&set);

        assert_eq!(report.totals.actions_completed, 1);
        assert_eq!(executor.call_count(), 1);
    }

    #[test]
    fn test_deadline_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "a", b"x");
        let reporter = RecordingReporter::new();
        let remediator = Remediator::builder()
            .with_collaborators(Collaborators::new().with_reporter(reporter.clone()))
            .with_config(RemediatorConfig::new().with_deadline(Duration::ZERO))
            .build()
            .unwrap();

        let set = RemediationSet::builder()
            .add(FileRemediation::search(dir.path(), [".*"]).with_report_only(true))
            .build();
        let report = remediator.assess(&set);

        assert!(report.deadline_exceeded);
        assert_eq!(reporter.count_of("deadline_exceeded"), 1);
    }

    #[cfg(feature = "tokio-runtime")]
    #[test]
    fn test_internal_failure_has_own_event() {
        let reporter = RecordingReporter::new();
        let remediator = remediator(Collaborators::new().with_reporter(reporter.clone()));
        let remediation = Remediation::from(FileRemediation::single("/x").with_tag("t"));

        let outcome = remediator.internal_failure(
            RemediationOutcome::for_remediation(&remediation),
            "remediation permits closed",
        );

        assert_eq!(outcome.errors.len(), 1);
        assert_eq!(outcome.errors[0].kind, "internal_error");
        assert_eq!(reporter.count_of("internal_error"), 1);
        assert_eq!(reporter.count_of("configuration_error"), 0);
    }

    #[cfg(feature = "tokio-runtime")]
    #[tokio::test]
    async fn test_assess_concurrent_keeps_order() {
        let dir = tempfile::tempdir().unwrap();
        let paths: Vec<PathBuf> = (0..6)
            .map(|i| write(dir.path(), &format!("f{i}"), b"x"))
            .collect();
        let executor = RecordingExecutor::new();

        let set = RemediationSet::builder()
            .add_all(paths.iter().enumerate().map(|(i, p)| {
                FileRemediation::single(p)
                    .with_tag(format!("r{i}"))
                    .with_report_only(i % 2 == 0)
            }))
            .build();
        let remediator = Remediator::builder()
            .with_collaborators(Collaborators::new().with_action_executor(executor.clone()))
            .with_config(RemediatorConfig::new().with_max_parallel_remediations(2))
            .build()
            .unwrap();
        let report = remediator.assess_concurrent(&set).await;

        let tags: Vec<_> = report.outcomes.iter().map(|o| o.tag.clone().unwrap()).collect();
        assert_eq!(tags, vec!["r0", "r1", "r2", "r3", "r4", "r5"]);
        assert_eq!(report.totals.reported, 3);
        assert_eq!(report.totals.actions_completed, 3);
        assert_eq!(executor.call_count(), 3);
    }
}
