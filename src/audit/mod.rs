//! Structured audit logging of remediation activity.
//!
//! Events are plain serializable values. The default [`TracingReporter`]
//! emits them through `tracing` on the `remediate::audit` target, so any
//! subscriber (JSON file, OpenTelemetry, etc.) can capture them.

mod events;

pub use events::{
    emit_action_completed, emit_action_failed, emit_assessment_started, emit_event,
    emit_report_only_match, RemediationEvent, TracingReporter,
};
