//! CLI entrypoint for the portio conformance harness.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use portio_harness::structured_log::{LogEmitter, validate_log_file};
use portio_harness::{FixtureSet, HarnessError, TestRunner, VerificationSummary};

/// Conformance tooling for portio.
#[derive(Debug, Parser)]
#[command(name = "portio-harness")]
#[command(about = "Fixture-driven conformance harness for portio")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Replay fixture scripts against real ports.
    Verify {
        /// Directory containing fixture JSON files.
        #[arg(long)]
        fixture: PathBuf,
        /// Structured JSONL log path.
        #[arg(long)]
        log: Option<PathBuf>,
        /// Write the verification summary as JSON.
        #[arg(long)]
        report: Option<PathBuf>,
        /// Campaign name recorded in the log.
        #[arg(long, default_value = "fixture-verify")]
        campaign: String,
    },
    /// Validate a structured JSONL log.
    ValidateLog {
        #[arg(long)]
        path: PathBuf,
    },
}

fn main() -> Result<(), HarnessError> {
    let cli = Cli::parse();

    match cli.command {
        Command::Verify {
            fixture,
            log,
            report,
            campaign,
        } => {
            eprintln!("Verifying against fixtures in {}", fixture.display());
            let sets = FixtureSet::load_dir(&fixture)?;
            let runner = TestRunner::new(campaign.as_str());

            let mut results = Vec::new();
            match log {
                Some(log_path) => {
                    let mut emitter = LogEmitter::to_file(&log_path, "portio", &campaign)?;
                    for set in &sets {
                        results.extend(runner.run_logged(set, &mut emitter)?);
                    }
                    emitter.flush()?;
                    eprintln!("Wrote {} log entries to {}", emitter.emitted(), log_path.display());
                }
                None => {
                    for set in &sets {
                        results.extend(runner.run(set));
                    }
                }
            }

            for result in results.iter().filter(|r| !r.passed) {
                eprintln!("FAIL {}/{}", result.family, result.case_name);
                if let Some(diff) = &result.diff {
                    eprintln!("{diff}");
                }
            }

            let summary = VerificationSummary::from_results(results);
            eprintln!(
                "Verification complete: total={}, passed={}, failed={}",
                summary.total, summary.passed, summary.failed
            );

            if let Some(report_path) = report {
                std::fs::write(&report_path, serde_json::to_string_pretty(&summary)?)?;
                eprintln!("Wrote report to {}", report_path.display());
            }

            if !summary.all_passed() {
                return Err(HarnessError::Failures {
                    failed: summary.failed,
                    total: summary.total,
                });
            }
        }
        Command::ValidateLog { path } => {
            let (lines, errors) = validate_log_file(&path)?;
            for error in &errors {
                eprintln!("{error}");
            }
            eprintln!("Validated {lines} line(s), {} error(s)", errors.len());
            if !errors.is_empty() {
                return Err(HarnessError::InvalidLog(errors.len()));
            }
        }
    }

    Ok(())
}
