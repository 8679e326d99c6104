use clap::Parser;
use signal_guardian::cli::{self, Cli};
use signal_guardian::config::Config;
use signal_guardian::telemetry;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logging comes up before anything else so config errors are visible
    let telemetry_config = Config::load(&cli.config)
        .map(|c| c.telemetry)
        .unwrap_or_default();
    telemetry::init_logging(&telemetry_config);

    cli::execute(cli).await
}
