/// Runtime configuration for a single scan invocation (spec.md §6).
///
/// Mirrors the shape of the teacher's `config::Config`: a small struct with a
/// `Default` impl carrying the spec's stated defaults, constructed once from
/// CLI flags and then read-only for the rest of the run.
#[derive(Debug, Clone)]
pub struct Config {
    pub concurrency: usize,
    pub nmap_concurrency: usize,
    pub runtime_budget_s: u64,
    pub output_dir: std::path::PathBuf,
    pub skip_install: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            concurrency: 4,
            nmap_concurrency: 1,
            runtime_budget_s: 1800,
            output_dir: std::path::PathBuf::from("./results"),
            skip_install: false,
        }
    }
}
