use anyhow::Result;
use clap::Parser;
use teams_watcher::{
    app,
    cli::{handle_subscriptions_command, Cli, CliCommand},
    config::Config,
};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let log_level = if cli.verbose { "debug" } else { "info" };
    let env_filter = EnvFilter::try_new(log_level).unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    match cli.command {
        Some(CliCommand::Version) => {
            println!("teams-watcher {}", env!("CARGO_PKG_VERSION"));
            return Ok(());
        }
        Some(CliCommand::Subscriptions(args)) => {
            handle_subscriptions_command(args).await?;
            return Ok(());
        }
        None => {}
    }

    let config = Config::from_env()?;
    app::run_service(config).await
}
