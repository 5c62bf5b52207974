use std::path::PathBuf;

use clap::Parser;

use vuln_orchestrator::profile::Scheme;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Signal-driven vulnerability-assessment orchestrator",
    long_about = None,
    after_help = "EXAMPLES:
  Scan a root domain:
    vorch scan example.com

  Scan a bare IP with a tighter concurrency ceiling:
    vorch scan 10.0.0.5 --concurrency 2

  Scan without checking tool installation (e.g. in a prebuilt container):
    vorch scan api.example.com --skip-install --output-dir ./out"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable detailed debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    /// Enable verbose (info-level) logging
    #[arg(long, global = true)]
    pub verbose: bool,
}

#[derive(clap::Subcommand, Debug)]
pub enum Commands {
    /// Run a scan against a single target (root domain, subdomain, or IP)
    Scan {
        /// Target host, e.g. example.com, api.example.com, or 10.0.0.5
        target: String,

        /// Force http or https instead of inferring from the target
        #[arg(long, value_enum)]
        scheme: Option<CliScheme>,

        /// Directory for execution_report.json and per-tool raw output
        #[arg(short = 'o', long, default_value = "./results")]
        output_dir: PathBuf,

        /// Wall-clock budget for the whole scan, in seconds
        #[arg(long, default_value_t = 1800)]
        runtime_budget: u64,

        /// Skip the `which` installation check before running each tool
        #[arg(long)]
        skip_install: bool,

        /// Maximum number of tools running at once
        #[arg(short = 'c', long, default_value_t = 4)]
        concurrency: usize,

        /// Maximum number of concurrent nmap invocations
        #[arg(long, default_value_t = 1)]
        nmap_concurrency: usize,
    },
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
pub enum CliScheme {
    Http,
    Https,
}

impl From<CliScheme> for Scheme {
    fn from(value: CliScheme) -> Self {
        match value {
            CliScheme::Http => Scheme::Http,
            CliScheme::Https => Scheme::Https,
        }
    }
}

pub fn parse_cli() -> Cli {
    Cli::parse()
}
