//! # Remediate
//!
//! A declarative rule engine for detecting and remediating unwanted
//! software on a host.
//!
//! ## Overview
//!
//! Remediations are plain data: a subject kind (file, process, service or
//! browser extension), a list of typed conditions, a report-only switch and
//! optional follow-ups. The [`Remediator`] resolves subjects, evaluates the
//! conditions as a short-circuit AND and then either reports each match or
//! hands it to an [`ActionExecutor`](crate::core::ActionExecutor).
//!
//! Everything that touches the host sits behind a collaborator trait, so
//! the engine runs the same against the real filesystem or against the
//! mocks in [`backends::mock`].
//!
//! ## Quick Start
//!
//! ```rust
//! use remediate::prelude::*;
//!
//! let dir = tempfile::tempdir().unwrap();
//! let target = dir.path().join("eicar.com");
//! std::fs::write(&target, b"X5O!P%@AP[4\\PZX54(P^)7CC)7}$EICAR-STANDARD-ANTIVIRUS-TEST-FILE!$H+H*\n").unwrap();
//!
//! let rules = RegexRuleMatcher::new().compile("EICAR-STANDARD").unwrap();
//! let set = RemediationSet::builder()
//!     .add(
//!         FileRemediation::single(&target)
//!             .with_tag("EICAR")
//!             .with_report_only(true)
//!             .with_conditions([FileCondition::min_size(68), FileCondition::pattern(rules)]),
//!     )
//!     .build();
//!
//! let report = Remediator::new().assess(&set);
//! assert_eq!(report.totals.reported, 1);
//! assert!(target.exists());
//! ```
//!
//! ## Features
//!
//! - `default` - Includes tokio runtime support
//! - `tokio-runtime` - [`Remediator::assess_concurrent`] on the tokio blocking pool
//!
//! ## Architecture
//!
//! - **Core**: values, subjects, collaborator traits and errors
//! - **Condition**: typed predicates per subject kind
//! - **Remediation**: declarations and their composition
//! - **Remediator**: subject resolution, evaluation and reporting
//! - **Backends**: filesystem, regex and mock collaborators
//! - **Audit**: structured events through `tracing`

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod audit;
pub mod backends;
pub mod condition;
pub mod core;
pub mod remediation;
pub mod remediator;

// Re-export commonly used types at the crate root
pub use crate::core::{Collaborators, RemediationError, RemediationResult, Value};

pub use crate::condition::{
    ExtensionCondition, FileCondition, ProcessCondition, ServiceCondition,
};
pub use crate::remediation::{
    ExtensionRemediation, FileGroup, FileRemediation, ProcessRemediation, Remediation,
    RemediationSet, ServiceRemediation,
};
pub use crate::remediator::{
    AssessmentReport, FollowUpPolicy, Remediator, RemediatorBuilder, RemediatorConfig,
};

/// Prelude module for convenient imports.
///
/// ```rust
/// use remediate::prelude::*;
/// ```
pub mod prelude {
    pub use crate::backends::{FsActionExecutor, RegexRuleMatcher};
    pub use crate::condition::{
        ConditionSet, ExtensionCondition, FileCondition, ProcessCondition, ServiceCondition,
    };
    pub use crate::core::{
        ActionExecutor, Collaborators, ExtensionInfo, PatternMatcher, ProcessInfo,
        RemediationError, RemediationResult, ServiceInfo, Value,
    };
    pub use crate::remediation::{
        ExtensionRemediation, FileGroup, FileRemediation, ProcessRemediation, Remediation,
        RemediationSet, ServiceRemediation,
    };
    pub use crate::remediator::{
        ActionTaken, AssessmentReport, FollowUpPolicy, Remediator, RemediatorConfig,
    };
}
