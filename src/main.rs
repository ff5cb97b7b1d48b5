use anyhow::Context;
use net_meter::{setup_wizard, NetMeterCoordinator, ServiceConfig, SetupForm, SetupWizard};
use std::io;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = ServiceConfig::from_env()?;

    match std::env::args().nth(1).as_deref() {
        Some("setup") => setup(&config).await,
        None | Some("run") => run(&config).await,
        Some(other) => anyhow::bail!("Unknown command `{other}`, expected `setup` or `run`"),
    }
}

/// Interactive setup: asks for the entities and saves the entry
async fn setup(config: &ServiceConfig) -> anyhow::Result<()> {
    let defaults = SetupForm::from_env();
    let form = SetupForm::prompt(&defaults, &mut io::stdin().lock(), &mut io::stdout())?;

    let entry = SetupWizard::new(config.ha_api()).submit(form).await?;
    entry
        .save(&config.entry_path)
        .with_context(|| format!("Saving entry to {}", config.entry_path.display()))?;
    info!("Saved '{}' to {}", entry.name, config.entry_path.display());
    Ok(())
}

async fn run(config: &ServiceConfig) -> anyhow::Result<()> {
    info!("Starting net meter");

    let entry = setup_wizard::load_or_import(config.ha_api(), &config.entry_path)
        .await
        .with_context(|| format!("Loading entry from {}", config.entry_path.display()))?;

    let mut api = config.ha_api();
    let baseline = setup_wizard::authenticate(&mut api, &entry.sources).await?;

    let mut coordinator =
        NetMeterCoordinator::start(api, &entry, config.update_interval, Some(baseline));

    tokio::signal::ctrl_c().await?;
    info!("Shutting down");
    coordinator.shutdown().await;
    Ok(())
}
