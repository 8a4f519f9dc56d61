//! Typed conditions over one subject kind.
//!
//! Each subject kind has its own closed enum of conditions. A remediation
//! holds a `Vec` of exactly one of these enums, so a condition list that
//! mixes subject kinds does not type-check.
//!
//! - [`file`] - conditions over a file path
//! - [`process`] - conditions over a running process
//! - [`service`] - conditions over a loaded background service
//! - [`extension`] - conditions over a browser extension
//! - [`composer`] - flattening of condition declarations

pub mod composer;
pub mod extension;
pub mod file;
pub mod process;
pub mod service;

pub use composer::{ConditionSet, IntoConditions};
pub use extension::ExtensionCondition;
pub use file::FileCondition;
pub use process::ProcessCondition;
pub use service::ServiceCondition;

use crate::audit::RemediationEvent;
use crate::core::{Collaborators, LookupResult, MatcherHandle, SignatureInspector};

use std::fmt::Debug;
use std::path::Path;

/// A typed predicate over one subject kind.
///
/// The evaluation rule is fixed by the variant at construction time.
/// Evaluation never fails: lookup errors, scan errors and missing
/// collaborators all evaluate to `false`.
pub trait Condition: Clone + Debug + Send + Sync {
    /// The subject this condition is evaluated against.
    type Subject: ?Sized;

    /// Evaluates the condition against one subject.
    fn evaluate(&self, subject: &Self::Subject, collaborators: &Collaborators) -> bool;
}

/// Evaluates a condition list as a left-to-right short-circuit AND.
///
/// An empty list matches every subject.
pub fn evaluate_all<C: Condition>(
    conditions: &[C],
    subject: &C::Subject,
    collaborators: &Collaborators,
) -> bool {
    conditions
        .iter()
        .all(|condition| condition.evaluate(subject, collaborators))
}

/// Scans a path with a compiled handle. Engine failures are reported and
/// treated as no match.
pub(crate) fn scan_path(handle: &MatcherHandle, path: &Path, collaborators: &Collaborators) -> bool {
    match handle.scan_path(path) {
        Ok(matched) => matched,
        Err(e) => {
            tracing::warn!(
                matcher = %handle.description(),
                path = %path.display(),
                error = %e,
                "Pattern scan failed, treating as no match"
            );
            collaborators.report(RemediationEvent::scan_failure(
                path.display().to_string(),
                handle.description(),
                e.to_string(),
            ));
            false
        }
    }
}

/// Compares a signature-inspector answer with the declared constraint.
pub(crate) fn signature_flag<F>(
    collaborators: &Collaborators,
    path: &Path,
    attribute: &'static str,
    expected: bool,
    lookup: F,
) -> bool
where
    F: FnOnce(&dyn SignatureInspector, &Path) -> LookupResult<bool>,
{
    let Some(inspector) = collaborators.signature_inspector() else {
        tracing::debug!(attribute, "No signature inspector configured");
        return false;
    };
    lookup_or_false(lookup(inspector, path), path, attribute)
        .map(|actual| actual == expected)
        .unwrap_or(false)
}

/// Turns a lookup failure into `None`, logging it at debug level.
pub(crate) fn lookup_or_false<T>(
    result: LookupResult<T>,
    path: &Path,
    attribute: &'static str,
) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::debug!(
                path = %path.display(),
                attribute,
                error = %e,
                "Lookup failed, condition evaluates false"
            );
            None
        }
    }
}
