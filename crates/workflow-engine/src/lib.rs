//! Declarative reconciliation engine for a wireless network Controller
//!
//! Each workflow takes a list of config entries and a target state
//! (`merged` or `deleted`), reads the current Controller state, computes the
//! difference and writes only what is needed. Every input item ends up in
//! exactly one bucket of the returned [`OutcomeReport`].
//!
//! # Workflows
//!
//! - **Access points**: configuration, radios, site provisioning, bulk rename,
//!   reboot and factory reset ([`run_access_point_workflow`])
//! - **SDA host onboarding**: port assignments, port channels and
//!   VLAN-to-SSID mappings of fabric edge devices ([`run_sda_host_port_workflow`])
//! - **Tags**: tag definitions with dynamic rules and explicit membership
//!   ([`run_tags_workflow`])
//!
//! # Example
//!
//! ```no_run
//! use controller_client::ControllerClient;
//! use workflow_engine::{run_tags_workflow, RunOptions, State, TagsEntry};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = ControllerClient::login("https://controller.example.com".to_string(), "admin", "secret", true).await?;
//! let entries: Vec<TagsEntry> = serde_yaml::from_str("- tag:\n    name: Campus-Edge\n")?;
//! let report = run_tags_workflow(&client, &entries, State::Merged, &RunOptions::default()).await;
//! println!("changed={} failed={}\n{}", report.changed, report.failed, report.msg);
//! # Ok(())
//! # }
//! ```

pub mod access_point;
pub mod config;
pub mod driver;
pub mod error;
pub mod executor;
pub mod outcome;
pub mod paginator;
pub mod plan;
pub mod resolver;
pub mod sda;
pub mod tags;
pub mod task_waiter;
pub mod validate;
pub mod version;

#[cfg(test)]
mod test_utils;

pub use access_point::{AccessPointEntry, AccessPointWorkflow};
pub use config::{BatchSize, RunOptions, State};
pub use error::WorkflowError;
pub use outcome::{Bucket, Family, OutcomeRecord, OutcomeReport};
pub use sda::{SdaHostPortEntry, SdaHostPortWorkflow};
pub use tags::{TagsEntry, TagsWorkflow};

use controller_client::ControllerClientTrait;

/// Reconcile access point configuration and operations
pub async fn run_access_point_workflow(
    client: &dyn ControllerClientTrait,
    entries: &[AccessPointEntry],
    state: State,
    options: &RunOptions,
) -> OutcomeReport {
    driver::run(&AccessPointWorkflow, client, entries, state, options).await
}

/// Reconcile SDA port assignments, port channels and VLAN-to-SSID mappings
pub async fn run_sda_host_port_workflow(
    client: &dyn ControllerClientTrait,
    entries: &[SdaHostPortEntry],
    state: State,
    options: &RunOptions,
) -> OutcomeReport {
    driver::run(&SdaHostPortWorkflow, client, entries, state, options).await
}

/// Reconcile tag definitions and tag membership
pub async fn run_tags_workflow(
    client: &dyn ControllerClientTrait,
    entries: &[TagsEntry],
    state: State,
    options: &RunOptions,
) -> OutcomeReport {
    driver::run(&TagsWorkflow, client, entries, state, options).await
}
