//! Remediation events and emission functions.

use crate::core::{Reporter, SubjectKind};
use crate::remediator::AssessmentReport;

use serde::Serialize;
use std::collections::BTreeMap;

/// A structured event raised during an assessment pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum RemediationEvent {
    /// A pass began.
    AssessmentStarted {
        /// Report identifier.
        report_id: String,
        /// Number of top-level remediations.
        remediation_count: usize,
    },

    /// A subject matched a report-only remediation.
    ReportOnlyMatch {
        /// Remediation tag.
        tag: Option<String>,
        /// Subject kind.
        kind: SubjectKind,
        /// Subject identity.
        subject: String,
        /// BLAKE3 digest of the file taken when it matched.
        #[serde(skip_serializing_if = "Option::is_none")]
        file_hash_blake3: Option<String>,
    },

    /// A destructive action completed.
    ActionCompleted {
        /// Remediation tag.
        tag: Option<String>,
        /// Subject kind.
        kind: SubjectKind,
        /// Subject identity.
        subject: String,
        /// Flags passed to the executor.
        flags: BTreeMap<&'static str, bool>,
        /// BLAKE3 digest of the file taken before the action ran.
        #[serde(skip_serializing_if = "Option::is_none")]
        file_hash_blake3: Option<String>,
    },

    /// A destructive action failed.
    ActionFailed {
        /// Remediation tag.
        tag: Option<String>,
        /// Subject kind.
        kind: SubjectKind,
        /// Subject identity.
        subject: String,
        /// Failure reason.
        reason: String,
    },

    /// A remediation could not resolve its subjects as declared.
    ConfigurationError {
        /// Remediation tag.
        tag: Option<String>,
        /// Description of the problem.
        message: String,
    },

    /// A search pattern failed to compile and was skipped.
    CompileError {
        /// Remediation tag.
        tag: Option<String>,
        /// The offending pattern.
        pattern: String,
        /// Compiler diagnostic.
        reason: String,
    },

    /// An inspector could not enumerate the subjects of a remediation.
    LookupFailure {
        /// Remediation tag.
        tag: Option<String>,
        /// What was being looked up.
        subject: String,
        /// Failure reason.
        reason: String,
    },

    /// An unexpected engine failure, e.g. a panicked worker task.
    InternalError {
        /// Remediation tag.
        tag: Option<String>,
        /// Description of the failure.
        message: String,
    },

    /// The pattern engine failed while scanning a subject.
    ScanFailure {
        /// Subject identity.
        subject: String,
        /// Description of the compiled rules.
        matcher: String,
        /// Failure reason.
        reason: String,
    },

    /// The deadline passed while resolving subjects.
    DeadlineExceeded {
        /// Remediation tag.
        tag: Option<String>,
        /// Milliseconds since the pass started.
        elapsed_ms: u64,
    },

    /// A pass finished.
    AssessmentCompleted {
        /// Report identifier.
        report_id: String,
        /// Matching subjects.
        matches: usize,
        /// Report-only matches.
        reported: usize,
        /// Completed destructive actions.
        actions_completed: usize,
        /// Failed destructive actions.
        actions_failed: usize,
        /// Errors recorded.
        errors: usize,
        /// Whether the deadline fired.
        deadline_exceeded: bool,
        /// Wall-clock duration.
        duration_ms: u64,
    },
}

impl RemediationEvent {
    /// Returns the event type name.
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::AssessmentStarted { .. } => "assessment_started",
            Self::ReportOnlyMatch { .. } => "report_only_match",
            Self::ActionCompleted { .. } => "action_completed",
            Self::ActionFailed { .. } => "action_failed",
            Self::ConfigurationError { .. } => "configuration_error",
            Self::CompileError { .. } => "compile_error",
            Self::LookupFailure { .. } => "lookup_failure",
            Self::InternalError { .. } => "internal_error",
            Self::ScanFailure { .. } => "scan_failure",
            Self::DeadlineExceeded { .. } => "deadline_exceeded",
            Self::AssessmentCompleted { .. } => "assessment_completed",
        }
    }

    /// Returns `true` for events that signal a problem.
    pub fn is_error(&self) -> bool {
        matches!(
            self,
            Self::ActionFailed { .. }
                | Self::ConfigurationError { .. }
                | Self::CompileError { .. }
                | Self::LookupFailure { .. }
                | Self::InternalError { .. }
                | Self::ScanFailure { .. }
                | Self::DeadlineExceeded { .. }
        )
    }

    /// Creates a `ScanFailure` event.
    pub fn scan_failure(
        subject: impl Into<String>,
        matcher: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::ScanFailure {
            subject: subject.into(),
            matcher: matcher.into(),
            reason: reason.into(),
        }
    }

    /// Builds the completion event for a report.
    pub fn completed(report: &AssessmentReport) -> Self {
        let totals = &report.totals;
        Self::AssessmentCompleted {
            report_id: report.id.to_string(),
            matches: totals.matches,
            reported: totals.reported,
            actions_completed: totals.actions_completed,
            actions_failed: totals.actions_failed,
            errors: totals.errors,
            deadline_exceeded: report.deadline_exceeded,
            duration_ms: report.duration().as_millis() as u64,
        }
    }
}

/// Emits an event through `tracing` on the `remediate::audit` target.
pub fn emit_event(event: &RemediationEvent) {
    match event {
        RemediationEvent::AssessmentStarted {
            report_id,
            remediation_count,
        } => emit_assessment_started(report_id, *remediation_count),
        RemediationEvent::ReportOnlyMatch {
            tag,
            kind,
            subject,
            file_hash_blake3,
        } => emit_report_only_match(tag.as_deref(), *kind, subject, file_hash_blake3.as_deref()),
        RemediationEvent::ActionCompleted {
            tag,
            kind,
            subject,
            flags,
            file_hash_blake3,
        } => emit_action_completed(
            tag.as_deref(),
            *kind,
            subject,
            flags,
            file_hash_blake3.as_deref(),
        ),
        RemediationEvent::ActionFailed {
            tag,
            kind,
            subject,
            reason,
        } => emit_action_failed(tag.as_deref(), *kind, subject, reason),
        RemediationEvent::AssessmentCompleted { .. } => emit_assessment_completed(event),
        other => emit_error(other),
    }
}

/// Emits an audit event for a pass starting.
pub fn emit_assessment_started(report_id: &str, remediation_count: usize) {
    tracing::info!(
        target: "remediate::audit",
        event_type = "assessment_started",
        report_id = %report_id,
        remediation_count,
        "Assessment started"
    );
}

/// Emits an audit event for a report-only match.
pub fn emit_report_only_match(
    tag: Option<&str>,
    kind: SubjectKind,
    subject: &str,
    file_hash_blake3: Option<&str>,
) {
    tracing::info!(
        target: "remediate::audit",
        event_type = "report_only_match",
        tag = ?tag,
        kind = %kind,
        subject = %subject,
        file_hash_blake3 = ?file_hash_blake3,
        "Subject matched (report only)"
    );
}

/// Emits an audit event for a completed action.
pub fn emit_action_completed(
    tag: Option<&str>,
    kind: SubjectKind,
    subject: &str,
    flags: &BTreeMap<&'static str, bool>,
    file_hash_blake3: Option<&str>,
) {
    tracing::info!(
        target: "remediate::audit",
        event_type = "action_completed",
        tag = ?tag,
        kind = %kind,
        subject = %subject,
        flags = ?flags,
        file_hash_blake3 = ?file_hash_blake3,
        "Remediation action completed"
    );
}

/// Emits an audit event for a failed action.
pub fn emit_action_failed(tag: Option<&str>, kind: SubjectKind, subject: &str, reason: &str) {
    tracing::warn!(
        target: "remediate::audit",
        event_type = "action_failed",
        tag = ?tag,
        kind = %kind,
        subject = %subject,
        reason = %reason,
        "Remediation action failed"
    );
}

fn emit_error(event: &RemediationEvent) {
    let detail = serde_json::to_string(event).unwrap_or_default();
    tracing::warn!(
        target: "remediate::audit",
        event_type = event.event_type(),
        detail = %detail,
        "Remediation error"
    );
}

fn emit_assessment_completed(event: &RemediationEvent) {
    if let RemediationEvent::AssessmentCompleted {
        report_id,
        matches,
        reported,
        actions_completed,
        actions_failed,
        errors,
        deadline_exceeded,
        duration_ms,
    } = event
    {
        tracing::info!(
            target: "remediate::audit",
            event_type = "assessment_completed",
            report_id = %report_id,
            matches,
            reported,
            actions_completed,
            actions_failed,
            errors,
            deadline_exceeded,
            duration_ms,
            "Assessment completed"
        );
    }
}

/// A [`Reporter`] that forwards every event to `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingReporter;

impl TracingReporter {
    /// Creates a new tracing reporter.
    pub fn new() -> Self {
        Self
    }
}

impl Reporter for TracingReporter {
    fn record(&self, event: &RemediationEvent) {
        emit_event(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serde_shape() {
        let event = RemediationEvent::ReportOnlyMatch {
            tag: Some("eicar".into()),
            kind: SubjectKind::File,
            subject: "/tmp/eicar.com".into(),
            file_hash_blake3: Some("abc123".into()),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event_type"], "report_only_match");
        assert_eq!(json["kind"], "file");
        assert_eq!(json["tag"], "eicar");
        assert_eq!(json["file_hash_blake3"], "abc123");

        let event = RemediationEvent::ReportOnlyMatch {
            tag: None,
            kind: SubjectKind::Process,
            subject: "evil[10]".into(),
            file_hash_blake3: None,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert!(json.get("file_hash_blake3").is_none());
    }

    #[test]
    fn test_error_classification() {
        let failure = RemediationEvent::scan_failure("/tmp/x", "rule", "engine crashed");
        assert!(failure.is_error());
        assert_eq!(failure.event_type(), "scan_failure");

        let started = RemediationEvent::AssessmentStarted {
            report_id: "r".into(),
            remediation_count: 0,
        };
        assert!(!started.is_error());

        let lookup = RemediationEvent::LookupFailure {
            tag: None,
            subject: "process table".into(),
            reason: "denied".into(),
        };
        assert!(lookup.is_error());
        assert_eq!(lookup.event_type(), "lookup_failure");
    }

    #[test]
    fn test_tracing_reporter_does_not_panic() {
        let reporter = TracingReporter::new();
        reporter.record(&RemediationEvent::ConfigurationError {
            tag: None,
            message: "missing search directory".into(),
        });
    }
}
