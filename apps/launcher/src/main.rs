mod config;

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use config::{load_settings, Args};
use launcher_core::{DeviceController, EventSource, TriggerApi, TriggerLauncher};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
    let args = Args::parse();

    let mut settings = load_settings(&args.config)?;
    settings.apply_args(&args);
    let plan = settings.into_plan()?;
    info!(
        server_url = %plan.server_url,
        document_id = %plan.source.document_id,
        "starting trigger launcher"
    );

    let api = TriggerApi::new(&plan.server_url)?;
    let launcher = TriggerLauncher::new(
        Arc::new(api.clone()),
        open_device(),
        api.http().clone(),
        plan.launcher,
    );
    let source = EventSource::new(api, plan.source);

    launcher.run(source, shutdown_signal()).await;
    info!("trigger launcher stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "cannot listen for ctrl-c; stop the process to exit");
        std::future::pending::<()>().await;
    }
}

#[cfg(feature = "hid")]
fn open_device() -> DeviceController {
    match deck_integration::hid::open_first() {
        Ok(deck) => DeviceController::new(Box::new(deck)),
        Err(err) => {
            warn!(error = %err, "deck: no device available, continuing without one");
            DeviceController::absent()
        }
    }
}

#[cfg(not(feature = "hid"))]
fn open_device() -> DeviceController {
    info!("deck: built without hid support, continuing without device");
    DeviceController::absent()
}
