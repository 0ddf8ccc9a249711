use anyhow::Context;
use clap::Parser;
use marquee_cli::{execute, AppState, Cli, CliError};
use marquee_store::Config;
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "marquee=info,marquee_order=info,marquee_store=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match run(cli).await {
        Ok(output) => {
            print!("{}", output);
            ExitCode::SUCCESS
        }
        Err(err) => {
            let (code, message) = match err.downcast_ref::<CliError>() {
                Some(cli_err) => (cli_err.exit_code(), cli_err.user_message()),
                None => (1, format!("{:#}", err)),
            };
            eprintln!("error: {}", message);
            ExitCode::from(code)
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<String> {
    let config_dir = cli.config_dir.to_string_lossy().into_owned();
    let config = Config::load_from(&config_dir)
        .with_context(|| format!("Failed to load configuration from {}", config_dir))?;
    tracing::debug!("Loaded configuration: {:?}", config);

    let state = AppState::build(&config)
        .await
        .context("Failed to set up the reservation client")?;

    Ok(execute(cli.command, &state).await?)
}
