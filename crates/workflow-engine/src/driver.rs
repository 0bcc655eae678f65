//! Workflow Driver
//!
//! Runs one workflow over its config entries:
//!
//! 1. Check the Controller release against the workflow's floor
//! 2. `validate_input` + `get_want` for every entry (nothing is written if any entry is invalid)
//! 3. Per entry: `get_have` → `apply`
//! 4. With `config_verify`: wait `settle_interval`, `get_have` again and `verify`
//!
//! Each entry gets a fresh [`Context`], so resolver caches never cross entries.

use crate::config::{RunOptions, State};
use crate::error::WorkflowError;
use crate::executor::Executor;
use crate::outcome::OutcomeReport;
use crate::resolver::Resolver;
use crate::task_waiter::TaskWaiter;
use crate::version::{self, ControllerVersion};
use controller_client::ControllerClientTrait;
use tracing::{error, info, warn};

/// Per-entry execution context
pub struct Context<'a> {
    pub client: &'a dyn ControllerClientTrait,
    pub options: &'a RunOptions,
    pub version: ControllerVersion,
    pub resolver: Resolver<'a>,
    waiter: TaskWaiter,
}

impl std::fmt::Debug for Context<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("base_url", &self.client.base_url())
            .field("version", &self.version)
            .field("resolver", &self.resolver)
            .finish()
    }
}

impl<'a> Context<'a> {
    pub fn new(client: &'a dyn ControllerClientTrait, options: &'a RunOptions, version: ControllerVersion) -> Self {
        Self {
            client,
            options,
            version,
            resolver: Resolver::new(client),
            waiter: TaskWaiter::new(options.poll_interval(), options.task_timeout()),
        }
    }

    /// Executor sharing this context's client and waiter
    pub fn executor(&self) -> Executor<'a> {
        Executor::new(self.client, self.waiter)
    }

    /// Task waiter configured from the run options
    pub fn waiter(&self) -> TaskWaiter {
        self.waiter
    }
}

/// Result of a verify pass
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Verification {
    /// Differences that fail the run
    pub mismatches: Vec<String>,
    /// Differences on best-effort fields, reported only
    pub best_effort: Vec<String>,
}

impl Verification {
    pub fn is_ok(&self) -> bool {
        self.mismatches.is_empty()
    }
}

/// One declarative workflow domain
#[async_trait::async_trait]
pub trait Workflow: Send + Sync {
    /// Config entry as written in the playbook
    type Entry: Send + Sync;
    /// Canonical desired state of one entry
    type Want: Send + Sync;
    /// Current Controller state relevant to one entry
    type Have: Send + Sync;

    /// Workflow name used in logs and errors
    fn name(&self) -> &'static str;

    /// Oldest Controller release the workflow supports
    fn minimum_version(&self) -> &'static str;

    /// Checks that span the whole run (supported states, non-empty config)
    fn validate_input(&self, entries: &[Self::Entry], state: State) -> Result<(), WorkflowError>;

    /// Validate and canonicalize one entry
    fn get_want(&self, entry: &Self::Entry, state: State) -> Result<Self::Want, WorkflowError>;

    /// Read the current state the entry refers to
    async fn get_have(&self, ctx: &mut Context<'_>, want: &Self::Want, state: State) -> Result<Self::Have, WorkflowError>;

    /// Diff and write, recording every item in `report`
    async fn apply(
        &self,
        ctx: &mut Context<'_>,
        want: &Self::Want,
        have: &Self::Have,
        state: State,
        report: &mut OutcomeReport,
    ) -> Result<(), WorkflowError>;

    /// Compare freshly read state with the want
    fn verify(&self, want: &Self::Want, have: &Self::Have, state: State) -> Verification;
}

/// Run a workflow over all entries and produce the final report
pub async fn run<W: Workflow>(
    workflow: &W,
    client: &dyn ControllerClientTrait,
    entries: &[W::Entry],
    state: State,
    options: &RunOptions,
) -> OutcomeReport {
    let mut report = OutcomeReport::new();
    if let Err(e) = run_entries(workflow, client, entries, state, options, &mut report).await {
        error!("{} workflow failed: {}", workflow.name(), e);
        report.fail(&e);
    }
    report.finish();
    info!(
        "{} workflow finished: changed={}, failed={}",
        workflow.name(),
        report.changed,
        report.failed
    );
    report
}

async fn run_entries<W: Workflow>(
    workflow: &W,
    client: &dyn ControllerClientTrait,
    entries: &[W::Entry],
    state: State,
    options: &RunOptions,
    report: &mut OutcomeReport,
) -> Result<(), WorkflowError> {
    let release = client.get_release_version().await?;
    let version = version::ensure_minimum(workflow.name(), workflow.minimum_version(), &release.display_version)?;
    info!(
        "Running {} workflow ({} state, {} entries) against Controller {}",
        workflow.name(),
        state,
        entries.len(),
        version
    );

    workflow.validate_input(entries, state)?;
    let wants = entries
        .iter()
        .map(|entry| workflow.get_want(entry, state))
        .collect::<Result<Vec<_>, _>>()?;

    for (index, want) in wants.iter().enumerate() {
        info!("Processing {} config entry {}/{}", workflow.name(), index + 1, wants.len());
        let mut ctx = Context::new(client, options, version.clone());
        let have = workflow.get_have(&mut ctx, want, state).await?;
        workflow.apply(&mut ctx, want, &have, state, report).await?;

        if options.config_verify {
            tokio::time::sleep(options.settle_interval()).await;
            let mut verify_ctx = Context::new(client, options, version.clone());
            let fresh = workflow.get_have(&mut verify_ctx, want, state).await?;
            let verification = workflow.verify(want, &fresh, state);
            for note in &verification.best_effort {
                warn!("Best-effort field not in requested state: {}", note);
                report.warn(note.clone());
            }
            if verification.is_ok() {
                info!("Verified {} config entry {}", workflow.name(), index + 1);
            } else {
                for mismatch in verification.mismatches {
                    error!("Verification of {} entry {} failed: {}", workflow.name(), index + 1, mismatch);
                    report.verification_failed(mismatch);
                }
            }
        }
    }
    Ok(())
}
