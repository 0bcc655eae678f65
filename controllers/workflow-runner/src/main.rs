//! Workflow Runner
//!
//! Runs one reconciliation workflow (access points, SDA host onboarding or
//! tags) described by a YAML playbook against a wireless network Controller,
//! prints the outcome report as JSON and exits non-zero when the run failed.
//!
//! Configuration comes from the environment:
//! - `CONTROLLER_URL`, `CONTROLLER_USERNAME`, `CONTROLLER_PASSWORD`
//! - `CONTROLLER_VERIFY_TLS` (optional, default `true`)
//! - playbook path as first argument or `PLAYBOOK`
//! - `RUST_LOG` for log filtering (default `info`)

mod error;
mod playbook;
mod settings;

use anyhow::Context as _;
use controller_client::ControllerClient;
use playbook::Playbook;
use settings::Settings;
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    // Logs go to stderr; stdout carries the report
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    info!("Starting Workflow Runner");

    let args: Vec<String> = std::env::args().skip(1).collect();
    let settings = Settings::from_env(&args)?;
    info!("Configuration:");
    info!("  Controller URL: {}", settings.controller_url);
    info!("  Playbook: {}", settings.playbook.display());
    info!("  Verify TLS: {}", settings.verify_tls);

    let playbook = Playbook::load(&settings.playbook)?;
    let client = ControllerClient::login(
        settings.controller_url.clone(),
        &settings.username,
        &settings.password,
        settings.verify_tls,
    )
    .await
    .with_context(|| format!("login to {} failed", settings.controller_url))?;

    let report = playbook.run(&client).await?;
    println!("{}", serde_json::to_string_pretty(&report)?);

    if report.failed {
        error!("Workflow failed: {}", report.errors.join("; "));
        return Ok(ExitCode::FAILURE);
    }
    info!("Workflow finished, changed={}", report.changed);
    Ok(ExitCode::SUCCESS)
}
