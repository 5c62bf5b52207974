mod cli;
mod run;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = cli::parse_cli();
    let exit_code = run::run_from_cli(cli).await?;
    std::process::exit(exit_code);
}
