//! Assessment results.

use crate::core::{FileDigest, RemediationError, SubjectKind};
use crate::remediation::Remediation;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

/// What happened to a matching subject.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ActionTaken {
    /// Report-only remediation; nothing was changed.
    Reported,
    /// The executor completed the action.
    Completed,
    /// The executor failed or was not configured.
    Failed {
        /// Failure reason.
        reason: String,
    },
}

/// A subject that satisfied every condition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubjectMatch {
    /// Subject identity (path, `name[pid]`, label or bundle id).
    pub subject: String,
    /// What was done about it.
    pub action: ActionTaken,
    /// Content digest taken before acting, for file subjects.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub digest: Option<FileDigest>,
}

/// A recorded error, flattened for serialization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorRecord {
    /// Machine-readable error kind.
    pub kind: String,
    /// Subject identity, when the error concerns one subject.
    pub subject: Option<String>,
    /// Human-readable message.
    pub message: String,
}

impl From<&RemediationError> for ErrorRecord {
    fn from(err: &RemediationError) -> Self {
        Self {
            kind: err.kind().to_string(),
            subject: err.subject().map(str::to_string),
            message: err.to_string(),
        }
    }
}

/// The result of assessing one remediation, including its follow-ups.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemediationOutcome {
    /// Remediation tag.
    pub tag: Option<String>,
    /// Subject kind.
    pub kind: SubjectKind,
    /// Whether the remediation was report-only.
    pub report_only: bool,
    /// Number of subjects resolved and evaluated.
    pub subjects_assessed: usize,
    /// Subjects that matched, in evaluation order.
    pub matches: Vec<SubjectMatch>,
    /// Errors recorded while assessing this remediation.
    pub errors: Vec<ErrorRecord>,
    /// Whether subject resolution stopped at the deadline.
    pub deadline_exceeded: bool,
    /// Whether follow-ups were skipped by the follow-up policy.
    pub follow_ups_skipped: bool,
    /// Outcomes of follow-up remediations, in declared order.
    pub follow_ups: Vec<RemediationOutcome>,
}

impl RemediationOutcome {
    /// Creates an empty outcome for a remediation.
    pub fn for_remediation(remediation: &Remediation) -> Self {
        Self {
            tag: remediation.tag().map(str::to_string),
            kind: remediation.kind(),
            report_only: remediation.is_report_only(),
            subjects_assessed: 0,
            matches: Vec::new(),
            errors: Vec::new(),
            deadline_exceeded: false,
            follow_ups_skipped: false,
            follow_ups: Vec::new(),
        }
    }

    /// Returns `true` if at least one subject matched.
    pub fn matched(&self) -> bool {
        !self.matches.is_empty()
    }

    /// Records an error.
    pub fn push_error(&mut self, err: &RemediationError) {
        self.errors.push(ErrorRecord::from(err));
    }

    /// Returns `true` if this outcome or any follow-up hit the deadline.
    pub fn any_deadline_exceeded(&self) -> bool {
        self.deadline_exceeded || self.follow_ups.iter().any(Self::any_deadline_exceeded)
    }

    fn accumulate(&self, totals: &mut AssessmentTotals) {
        totals.remediations += 1;
        totals.subjects_assessed += self.subjects_assessed;
        totals.matches += self.matches.len();
        totals.errors += self.errors.len();
        for m in &self.matches {
            match m.action {
                ActionTaken::Reported => totals.reported += 1,
                ActionTaken::Completed => totals.actions_completed += 1,
                ActionTaken::Failed { .. } => totals.actions_failed += 1,
            }
        }
        for follow_up in &self.follow_ups {
            follow_up.accumulate(totals);
        }
    }
}

/// Totals across every outcome, follow-ups included.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssessmentTotals {
    /// Remediations assessed.
    pub remediations: usize,
    /// Subjects evaluated.
    pub subjects_assessed: usize,
    /// Matching subjects.
    pub matches: usize,
    /// Report-only matches.
    pub reported: usize,
    /// Completed destructive actions.
    pub actions_completed: usize,
    /// Failed destructive actions.
    pub actions_failed: usize,
    /// Errors recorded.
    pub errors: usize,
}

impl AssessmentTotals {
    /// Computes totals over outcomes.
    pub fn from_outcomes(outcomes: &[RemediationOutcome]) -> Self {
        let mut totals = Self::default();
        for outcome in outcomes {
            outcome.accumulate(&mut totals);
        }
        totals
    }
}

/// The result of one assessment pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssessmentReport {
    /// Unique pass identifier.
    pub id: Uuid,
    /// When the pass started.
    pub started_at: DateTime<Utc>,
    /// When the pass finished.
    pub finished_at: DateTime<Utc>,
    /// One outcome per top-level remediation, in declaration order.
    pub outcomes: Vec<RemediationOutcome>,
    /// Totals across all outcomes.
    pub totals: AssessmentTotals,
    /// Whether any subject resolution stopped at the deadline.
    pub deadline_exceeded: bool,
}

impl AssessmentReport {
    /// Builds a report from completed outcomes.
    pub fn new(id: Uuid, started_at: DateTime<Utc>, outcomes: Vec<RemediationOutcome>) -> Self {
        let totals = AssessmentTotals::from_outcomes(&outcomes);
        let deadline_exceeded = outcomes.iter().any(RemediationOutcome::any_deadline_exceeded);
        Self {
            id,
            started_at,
            finished_at: Utc::now(),
            outcomes,
            totals,
            deadline_exceeded,
        }
    }

    /// Returns `true` if any subject matched.
    pub fn has_matches(&self) -> bool {
        self.totals.matches > 0
    }

    /// Returns `true` if any action failed or any error was recorded.
    pub fn has_failures(&self) -> bool {
        self.totals.actions_failed > 0 || self.totals.errors > 0
    }

    /// Wall-clock duration of the pass.
    pub fn duration(&self) -> Duration {
        (self.finished_at - self.started_at)
            .to_std()
            .unwrap_or_default()
    }

    /// Iterates over every outcome depth-first, follow-ups after parents.
    pub fn all_outcomes(&self) -> Vec<&RemediationOutcome> {
        fn walk<'a>(outcome: &'a RemediationOutcome, out: &mut Vec<&'a RemediationOutcome>) {
            out.push(outcome);
            for follow_up in &outcome.follow_ups {
                walk(follow_up, out);
            }
        }
        let mut out = Vec::new();
        for outcome in &self.outcomes {
            walk(outcome, &mut out);
        }
        out
    }

    /// Renders the report as pretty-printed JSON.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remediation::FileRemediation;

    fn outcome_with(actions: Vec<ActionTaken>) -> RemediationOutcome {
        let remediation = Remediation::from(FileRemediation::single("/x").with_tag("t"));
        let mut outcome = RemediationOutcome::for_remediation(&remediation);
        outcome.subjects_assessed = actions.len();
        outcome.matches = actions
            .into_iter()
            .map(|action| SubjectMatch {
                subject: "/x".into(),
                action,
                digest: None,
            })
            .collect();
        outcome
    }

    #[test]
    fn test_totals_include_follow_ups() {
        let mut parent = outcome_with(vec![ActionTaken::Completed]);
        let mut child = outcome_with(vec![
            ActionTaken::Reported,
            ActionTaken::Failed {
                reason: "denied".into(),
            },
        ]);
        child.push_error(&RemediationError::configuration("missing dir"));
        parent.follow_ups.push(child);

        let totals = AssessmentTotals::from_outcomes(&[parent]);
        assert_eq!(totals.remediations, 2);
        assert_eq!(totals.matches, 3);
        assert_eq!(totals.reported, 1);
        assert_eq!(totals.actions_completed, 1);
        assert_eq!(totals.actions_failed, 1);
        assert_eq!(totals.errors, 1);
    }

    #[test]
    fn test_report_flags_and_json() {
        let mut outcome = outcome_with(vec![]);
        outcome.follow_ups.push({
            let mut child = outcome_with(vec![]);
            child.deadline_exceeded = true;
            child
        });

        let report = AssessmentReport::new(Uuid::new_v4(), Utc::now(), vec![outcome]);
        assert!(report.deadline_exceeded);
        assert!(!report.has_matches());
        assert_eq!(report.all_outcomes().len(), 2);

        let json = report.to_json().unwrap();
        let back: AssessmentReport = serde_json::from_str(&json).unwrap();
        assert_eq!(back.id, report.id);
        assert_eq!(back.totals, report.totals);
    }

    #[test]
    fn test_error_record_from_error() {
        let record = ErrorRecord::from(&RemediationError::lookup("/tmp/x", "vanished"));
        assert_eq!(record.kind, "lookup_failure");
        assert_eq!(record.subject.as_deref(), Some("/tmp/x"));
    }
}
