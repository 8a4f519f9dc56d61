//! Process remediation chain example.
//!
//! This example shows how to:
//! - Plug in scripted process, service and signature inspectors
//! - Chain service and file follow-ups behind a process remediation
//! - Run an assessment concurrently and inspect the recorded actions
//!
//! Run with: cargo run --example process_chain

use remediate::backends::{
    MockProcessInspector, MockServiceInspector, MockSignatureInspector, RecordingExecutor,
    RecordingReporter,
};
use remediate::prelude::*;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,remediate::audit=debug".into()),
        )
        .init();

    println!("=== Remediate Process Chain Example ===\n");

    let workdir = tempfile::tempdir()?;
    let payload = workdir.path().join("updater");
    std::fs::write(&payload, vec![0u8; 4096])?;

    let processes = vec![
        ProcessInfo::new(4242, "updater")
            .with_executable(&payload)
            .with_arguments(["--daemon"]),
        ProcessInfo::new(1, "launchd")
            .with_executable("/sbin/launchd")
            .with_platform(true),
    ];
    let services = vec![ServiceInfo::new("com.example.updater.agent")
        .with_executable(&payload)
        .with_program_arguments([payload.display().to_string(), "--daemon".to_string()])];

    let executor = RecordingExecutor::new();
    let reporter = RecordingReporter::new();
    let collaborators = Collaborators::new()
        .with_process_inspector(MockProcessInspector::new(processes))
        .with_service_inspector(MockServiceInspector::new(services))
        .with_signature_inspector(
            MockSignatureInspector::new()
                .with_notarized(false)
                .with_apple_signed(false),
        )
        .with_action_executor(executor.clone())
        .with_reporter(reporter.clone());

    let set = RemediationSet::builder()
        .add(
            ProcessRemediation::new()
                .with_tag("Updater.Process")
                .with_delete_executable(true)
                .with_conditions([
                    ProcessCondition::name(Value::exact("updater")),
                    ProcessCondition::apple_signed(false),
                    ProcessCondition::main_executable([
                        FileCondition::min_size(1024),
                        FileCondition::notarized(false),
                    ]),
                ])
                .with_follow_ups([
                    Remediation::from(
                        ServiceRemediation::new()
                            .with_tag("Updater.Agent")
                            .with_delete_bundle_too(true)
                            .with_conditions(ServiceCondition::executable_path(Value::suffix(
                                "/updater",
                            ))),
                    ),
                    Remediation::from(
                        FileRemediation::single(&payload)
                            .with_tag("Updater.Binary")
                            .with_report_only(true),
                    ),
                ]),
        )
        .build();

    let remediator = Remediator::builder()
        .with_collaborators(collaborators)
        .with_config(
            RemediatorConfig::new()
                .with_follow_up_policy(FollowUpPolicy::OnMatch)
                .with_max_parallel_remediations(2),
        )
        .build()?;

    let report = remediator.assess_concurrent(&set).await;

    println!("\n=== Actions Recorded ===");
    for action in executor.actions() {
        println!("  {:?}", action);
    }

    println!("\n=== Outcomes ===");
    for outcome in report.all_outcomes() {
        println!(
            "  [{}] kind={} matches={} skipped_follow_ups={}",
            outcome.tag.as_deref().unwrap_or("untagged"),
            outcome.kind,
            outcome.matches.len(),
            outcome.follow_ups_skipped
        );
    }

    println!(
        "\nTotals: {} matched, {} completed, {} reported, {} events",
        report.totals.matches,
        report.totals.actions_completed,
        report.totals.reported,
        reporter.events().len()
    );
    Ok(())
}
