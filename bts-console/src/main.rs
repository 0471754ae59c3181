//! GSM base-station scan console
//!
//! A command-line front end for detecting a HackRF, running base-station
//! scans and replaying captured scanner logs.

mod cli;
mod settings;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cli::Cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Include all our crates in the default filter
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "btsscan=info,bts_protocol=info,bts_detect=info,bts_scan=info,bts_sim=info,audit=info".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = settings::load(cli.config.as_deref())?;

    tracing::debug!(
        "Settings file: {}",
        settings::settings_path()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "<none>".to_string())
    );

    cli::execute(cli, config).await
}
