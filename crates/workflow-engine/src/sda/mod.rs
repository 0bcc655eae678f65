//! SDA Host Onboarding Workflow
//!
//! Reconciles the port assignments and port channels of one fabric edge
//! device and the VLAN-to-SSID mappings of its fabric site.
//!
//! A fabric site that does not resolve fails the run. A device that does not
//! resolve (or is unreachable, or is not assigned to the fabric site) only
//! fails its port items; the VLAN mappings of the entry are still applied.

pub mod model;
pub mod port_assignment;
pub mod port_channel;
pub mod vlan_ssid;


use crate::config::{BatchSize, State};
use crate::driver::{Context, Verification, Workflow};
use crate::error::WorkflowError;
use crate::outcome::{Bucket, Family, OutcomeReport};
use crate::paginator;
use crate::resolver::{DeviceFilter, DeviceHandle};
use controller_client::{PortAssignment, PortChannel, VlanSsidMapping};
pub use model::{SdaHostPortEntry, SdaWant};
use std::collections::BTreeSet;
use tracing::{debug, info, warn};

/// Oldest Controller release with the SDA host onboarding APIs
pub const SDA_MIN_VERSION: &str = "2.3.7.6";

/// Items per port assignment or port channel write
pub(crate) const SDA_WRITE_BATCH: usize = BatchSize::MAX as usize;

/// Port state of a resolved fabric edge device
#[derive(Debug, Clone, Default)]
pub struct EdgeDevice {
    pub id: String,
    pub port_assignments: Vec<PortAssignment>,
    pub port_channels: Vec<PortChannel>,
    /// Requested interfaces the device doesn't have
    pub missing_interfaces: BTreeSet<String>,
}

/// Current state for one SDA entry
#[derive(Debug, Clone, Default)]
pub struct SdaHave {
    pub fabric_id: String,
    /// `None` when the entry names no device; `Err` carries the lookup miss
    pub device: Option<Result<EdgeDevice, String>>,
    pub vlan_ssids: Vec<VlanSsidMapping>,
}

/// SDA host onboarding workflow
#[derive(Debug, Clone, Copy, Default)]
pub struct SdaHostPortWorkflow;

async fn read_edge_device(
    ctx: &mut Context<'_>,
    want: &SdaWant,
    handle: &DeviceHandle,
    fabric_id: &str,
    state: State,
) -> Result<Result<EdgeDevice, String>, WorkflowError> {
    let device = match ctx.resolver.eligible_device(handle, DeviceFilter::FabricDevice).await {
        Ok(device) => device,
        Err(e) if !e.is_fatal() => {
            warn!("Skipping port configuration of {}: {}", handle, e.reason());
            return Ok(Err(e.reason()));
        }
        Err(e) => return Err(e),
    };
    if !ctx.resolver.is_assigned_to_site(&device.id, &want.fabric_site).await? {
        warn!("{} is not assigned to fabric site {}", handle, want.fabric_site);
        return Ok(Err(format!("Device is not assigned to fabric site {}", want.fabric_site)));
    }

    let client = ctx.client;
    let device_id = device.id.as_str();
    let port_assignments =
        paginator::fetch_all(|offset, limit| client.query_port_assignments(fabric_id, device_id, offset, limit)).await?;
    let port_channels =
        paginator::fetch_all(|offset, limit| client.query_port_channels(fabric_id, device_id, offset, limit)).await?;
    debug!(
        "{} has {} port assignments and {} port channels",
        handle,
        port_assignments.len(),
        port_channels.len()
    );

    let mut missing_interfaces = BTreeSet::new();
    if state == State::Merged {
        let names: Vec<String> = want
            .port_assignments
            .iter()
            .map(|p| p.interface_name.clone())
            .chain(want.port_channels.iter().flat_map(|c| c.interface_names.iter().cloned()))
            .collect();
        for (name, resolved) in ctx.resolver.interfaces(device_id, &names).await? {
            if resolved.is_err() {
                missing_interfaces.insert(name);
            }
        }
    }

    Ok(Ok(EdgeDevice {
        id: device.id.clone(),
        port_assignments,
        port_channels,
        missing_interfaces,
    }))
}

#[async_trait::async_trait]
impl Workflow for SdaHostPortWorkflow {
    type Entry = SdaHostPortEntry;
    type Want = SdaWant;
    type Have = SdaHave;

    fn name(&self) -> &'static str {
        "sda_host_port_onboarding"
    }

    fn minimum_version(&self) -> &'static str {
        SDA_MIN_VERSION
    }

    fn validate_input(&self, entries: &[SdaHostPortEntry], _state: State) -> Result<(), WorkflowError> {
        if entries.is_empty() {
            return Err(WorkflowError::InvalidInput("config must contain at least one entry".to_string()));
        }
        Ok(())
    }

    fn get_want(&self, entry: &SdaHostPortEntry, state: State) -> Result<SdaWant, WorkflowError> {
        SdaWant::from_entry(entry, state)
    }

    async fn get_have(&self, ctx: &mut Context<'_>, want: &SdaWant, state: State) -> Result<SdaHave, WorkflowError> {
        let fabric_id = ctx.resolver.fabric_id(&want.fabric_site).await?;
        let device = match &want.device {
            Some(handle) => Some(read_edge_device(ctx, want, handle, &fabric_id, state).await?),
            None => None,
        };
        let vlan_ssids = if want.vlan_ssids.is_empty() {
            Vec::new()
        } else {
            let client = ctx.client;
            let fabric = fabric_id.as_str();
            paginator::fetch_all(|offset, limit| client.query_vlan_ssid_mappings(fabric, offset, limit)).await?
        };
        Ok(SdaHave {
            fabric_id,
            device,
            vlan_ssids,
        })
    }

    async fn apply(
        &self,
        ctx: &mut Context<'_>,
        want: &SdaWant,
        have: &SdaHave,
        state: State,
        report: &mut OutcomeReport,
    ) -> Result<(), WorkflowError> {
        if let (Some(handle), Some(device)) = (&want.device, &have.device) {
            match device {
                Ok(device) => {
                    info!("Reconciling ports of {} in fabric site {}", handle, want.fabric_site);
                    port_assignment::apply(ctx, handle, want, device, &have.fabric_id, state, report).await;
                    port_channel::apply(ctx, handle, want, device, &have.fabric_id, state, report).await?;
                }
                Err(reason) => record_device_miss(handle, want, reason, state, report),
            }
        }
        if !want.vlan_ssids.is_empty() {
            vlan_ssid::apply(
                ctx,
                &want.fabric_site,
                &have.fabric_id,
                &want.vlan_ssids,
                &have.vlan_ssids,
                state,
                report,
            )
            .await;
        }
        Ok(())
    }

    fn verify(&self, want: &SdaWant, have: &SdaHave, state: State) -> Verification {
        let mut verification = Verification::default();
        match &have.device {
            Some(Ok(device)) => {
                verification
                    .mismatches
                    .extend(port_assignment::verify(want, device, &have.fabric_id, state));
                verification
                    .mismatches
                    .extend(port_channel::verify(want, device, &have.fabric_id, state));
            }
            Some(Err(reason)) if state == State::Merged => verification.mismatches.push(reason.clone()),
            _ => {}
        }
        verification
            .mismatches
            .extend(vlan_ssid::verify(&want.vlan_ssids, &have.vlan_ssids, state));
        verification
    }
}

/// Every port item of an unresolved device lands in the not-done bucket
fn record_device_miss(handle: &DeviceHandle, want: &SdaWant, reason: &str, state: State, report: &mut OutcomeReport) {
    let not_done = match state {
        State::Merged => Bucket::NotUpdated,
        State::Deleted => Bucket::NotDeleted,
    };
    if want.delete_all {
        report.record(Family::PortAssignments, not_done, handle.record().with_reason(reason));
        return;
    }
    for assignment in &want.port_assignments {
        report.record(
            Family::PortAssignments,
            not_done,
            handle.record().with_interface(&assignment.interface_name).with_reason(reason),
        );
    }
    for channel in &want.port_channels {
        report.record(
            Family::PortChannels,
            not_done,
            handle.record().with_interface(channel.label()).with_reason(reason),
        );
    }
}
