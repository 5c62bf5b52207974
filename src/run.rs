use std::collections::BTreeSet;

use vuln_orchestrator::config::Config;
use vuln_orchestrator::orchestrator::run_scan;
use vuln_orchestrator::profile::TargetProfile;

use crate::cli::{Cli, Commands};

pub const EXIT_OK: i32 = 0;
pub const EXIT_MEDIUM: i32 = 1;
pub const EXIT_HIGH: i32 = 2;
pub const EXIT_CRITICAL: i32 = 3;
pub const EXIT_ENGINE_ERROR: i32 = 4;
pub const EXIT_CONFIG_ERROR: i32 = 5;

/// Configure logging, translate CLI flags into a `Config`/`TargetProfile`,
/// run the scan, and map the finalized findings to an exit code
/// (spec.md §6). Returns the process exit code rather than calling
/// `std::process::exit` itself so `main` stays the only place that touches
/// the process boundary.
pub async fn run_from_cli(cli: Cli) -> anyhow::Result<i32> {
    use tracing_subscriber::EnvFilter;
    let crate_level = if cli.debug { "debug" } else if cli.verbose { "info" } else { "warn" };
    let filter_str = format!(
        "vuln_orchestrator={crate},vorch={crate},reqwest=info,hyper=info",
        crate = crate_level
    );
    let env_filter = EnvFilter::try_new(&filter_str).unwrap_or_else(|_| EnvFilter::new(crate_level));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_ansi(true)
        .with_target(false)
        .init();

    match cli.command {
        Commands::Scan {
            target,
            scheme,
            output_dir,
            runtime_budget,
            skip_install,
            concurrency,
            nmap_concurrency,
        } => {
            tracing::info!(target = %target, output_dir = %output_dir.display(), "starting scan");

            let profile = match TargetProfile::from_input(&target, scheme.map(Into::into), BTreeSet::new()) {
                Ok(p) => p,
                Err(e) => {
                    eprintln!("invalid target: {e}");
                    return Ok(EXIT_CONFIG_ERROR);
                }
            };

            let config = Config {
                concurrency,
                nmap_concurrency,
                runtime_budget_s: runtime_budget,
                output_dir,
                skip_install,
            };

            let report = match run_scan(profile, &config).await {
                Ok(report) => report,
                Err(e) => {
                    tracing::error!(error = %e, "scan failed");
                    return Ok(EXIT_ENGINE_ERROR);
                }
            };

            tracing::info!(
                findings = report.findings.count,
                critical = report.findings.by_severity.critical,
                high = report.findings.by_severity.high,
                "scan complete"
            );

            let counts = &report.findings.by_severity;
            let exit_code = if counts.critical > 0 {
                EXIT_CRITICAL
            } else if counts.high > 0 {
                EXIT_HIGH
            } else if counts.medium > 0 {
                EXIT_MEDIUM
            } else {
                EXIT_OK
            };
            Ok(exit_code)
        }
    }
}
