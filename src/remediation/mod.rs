//! Remediation declarations and their composition.
//!
//! - [`model`] - the per-kind remediation types and the [`Remediation`] sum type
//! - [`composer`] - [`RemediationSet`] and the [`IntoRemediations`] flattening

pub mod composer;
pub mod model;

pub use composer::{FileGroup, IntoRemediations, RemediationSet, RemediationSetBuilder};
pub use model::{
    ExtensionRemediation, FileRemediation, FileTarget, ProcessFlags, ProcessRemediation,
    Remediation, ServiceFlags, ServiceRemediation,
};
