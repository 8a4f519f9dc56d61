//! EICAR detection example.
//!
//! This example shows how to:
//! - Compile a byte pattern into a rule handle
//! - Declare a report-only single-path remediation
//! - Search a directory for files by name pattern
//! - Read the assessment report
//!
//! Run with: cargo run --example eicar

use remediate::prelude::*;

const EICAR: &[u8] = br"X5O!P%@AP[4\PZX54(P^)7CC)7}$EICAR-STANDARD-ANTIVIRUS-TEST-FILE!$H+H*";

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    println!("=== Remediate EICAR Example ===\n");

    let workdir = tempfile::tempdir()?;
    let sample = workdir.path().join("eicar.com");
    let mut contents = EICAR.to_vec();
    contents.push(b'\n');
    std::fs::write(&sample, &contents)?;
    std::fs::write(workdir.path().join("10293847.tmp"), vec![b'z'; 64])?;
    std::fs::write(workdir.path().join("notes.txt"), b"nothing to see")?;

    let matcher = RegexRuleMatcher::new();
    let rule = regex::escape("EICAR-STANDARD-ANTIVIRUS-TEST-FILE");
    let eicar_rules = matcher.compile(&rule)?;

    let set = RemediationSet::builder()
        .add(
            FileRemediation::single(&sample)
                .with_tag("EICAR")
                .with_report_only(true)
                .with_conditions([
                    FileCondition::min_size(68),
                    FileCondition::pattern(eicar_rules),
                ]),
        )
        .add(
            FileRemediation::search(workdir.path(), [r"/[0-9]{5,10}\.tmp$"])
                .with_tag("NumberedTemp")
                .with_report_only(true)
                .with_max_depth(1)
                .with_conditions(FileCondition::min_size(24)),
        )
        .build();

    println!("Assessing {} remediations", set.len());
    let report = Remediator::new().assess(&set);

    println!("\n=== Assessment Results ===");
    println!("Report ID: {}", report.id);
    println!("Duration: {:?}", report.duration());
    for outcome in &report.outcomes {
        println!(
            "\n[{}] {} subjects assessed, {} matched",
            outcome.tag.as_deref().unwrap_or("untagged"),
            outcome.subjects_assessed,
            outcome.matches.len()
        );
        for m in &outcome.matches {
            match &m.digest {
                Some(digest) => println!("  - {} ({:?}) {}", m.subject, m.action, digest),
                None => println!("  - {} ({:?})", m.subject, m.action),
            }
        }
        for err in &outcome.errors {
            println!("  ! {}: {}", err.kind, err.message);
        }
    }

    println!("\nSample still present: {}", sample.exists());
    println!("\n{}", report.to_json()?);
    Ok(())
}
