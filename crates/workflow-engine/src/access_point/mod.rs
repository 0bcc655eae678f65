//! Access Point Workflow
//!
//! Configures existing access points (AP settings, radios, rename), provisions
//! them to a site, applies common settings to lists of APs and runs reboots
//! and factory resets. Access points are never created or deleted, so only
//! the `merged` state is accepted.
//!
//! Each entry runs in this order: provision, configure, bulk update, reboot,
//! factory reset. A handle that does not resolve to a reachable, managed AP
//! only fails its own items.

pub mod configure;
pub mod model;
pub mod operations;
pub mod provision;


use crate::config::State;
use crate::driver::{Context, Verification, Workflow};
use crate::error::WorkflowError;
use crate::outcome::{Bucket, Family, OutcomeReport};
use crate::resolver::{DeviceFilter, DeviceHandle};
use controller_client::{ApConfiguration, ApiError};
pub use model::{AccessPointEntry, AccessPointWant};
use operations::ApOperation;
use provision::ProvisionHave;
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

/// Oldest Controller release with the access point APIs
pub const AP_MIN_VERSION: &str = "2.3.5.3";

/// A resolved access point and its current configuration
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ApState {
    pub device_id: String,
    /// Inventory hostname, falling back to the AP name
    pub hostname: String,
    /// Radio MAC; configure, reboot and factory reset address APs by it
    pub radio_mac: String,
    pub config: ApConfiguration,
}

/// Configure target of an entry with its site assignment
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigureHave {
    pub ap: ApState,
    /// `None` when the entry does not provision
    pub provision: Option<Result<ProvisionHave, String>>,
}

/// Current state for one access point entry
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AccessPointHave {
    /// `Err` carries the lookup miss of the configure target
    pub configure: Option<Result<ConfigureHave, String>>,
    /// Aligned with the bulk update targets
    pub bulk: Vec<Result<ApState, String>>,
    /// Device ids of the reboot targets
    pub reboot: Vec<Result<String, String>>,
    /// Device ids of the factory reset targets
    pub factory_reset: Vec<Result<String, String>>,
}

/// Access point workflow
#[derive(Debug, Clone, Copy, Default)]
pub struct AccessPointWorkflow;

/// Resolve an AP handle and read its configuration
///
/// A handle that does not resolve, or resolves to something other than a
/// reachable AP, comes back as `Ok(Err(reason))`.
async fn read_ap(ctx: &mut Context<'_>, handle: &DeviceHandle) -> Result<Result<ApState, String>, WorkflowError> {
    let device = match ctx.resolver.eligible_device(handle, DeviceFilter::AccessPoint).await {
        Ok(device) => device,
        Err(e) if !e.is_fatal() => {
            warn!("Skipping {}: {}", handle, e.reason());
            return Ok(Err(e.reason()));
        }
        Err(e) => return Err(e),
    };
    let Some(eth_mac) = device.ap_ethernet_mac_address.as_deref() else {
        return Ok(Err(format!("Access point {} has no ethernet MAC address", handle.value())));
    };
    let config = match ctx.client.get_ap_configuration(eth_mac).await {
        Ok(config) => config,
        Err(ApiError::NotFound(message)) => {
            warn!("No AP configuration for {}: {}", handle, message);
            return Ok(Err(format!("AP configuration of {} not found", handle.value())));
        }
        Err(e) => return Err(e.into()),
    };
    let Some(radio_mac) = config.mac_address.clone().or_else(|| device.mac_address.clone()) else {
        return Ok(Err(format!("Access point {} has no radio MAC address", handle.value())));
    };
    debug!("{} is AP {} (device {})", handle, config.ap_name, device.id);
    Ok(Ok(ApState {
        device_id: device.id.clone(),
        hostname: device.hostname.clone().unwrap_or_else(|| config.ap_name.clone()),
        radio_mac: radio_mac.to_ascii_lowercase().replace('-', ":"),
        config,
    }))
}

async fn read_site_assignment(
    ctx: &mut Context<'_>,
    device_id: &str,
    site_name: &str,
) -> Result<Result<ProvisionHave, String>, WorkflowError> {
    let site_id = match ctx.resolver.site_id(site_name).await {
        Ok(id) => id,
        Err(e) if !e.is_fatal() => return Ok(Err(e.reason())),
        Err(e) => return Err(e),
    };
    let assigned = ctx.resolver.is_assigned_to_site(device_id, site_name).await?;
    Ok(Ok(ProvisionHave { site_id, assigned }))
}

async fn resolve_targets(
    ctx: &mut Context<'_>,
    handles: &[DeviceHandle],
) -> Result<Vec<Result<String, String>>, WorkflowError> {
    let mut resolved = Vec::with_capacity(handles.len());
    for handle in handles {
        resolved.push(match ctx.resolver.eligible_device(handle, DeviceFilter::AccessPoint).await {
            Ok(device) => Ok(device.id),
            Err(e) if !e.is_fatal() => Err(e.reason()),
            Err(e) => return Err(e),
        });
    }
    Ok(resolved)
}

#[async_trait::async_trait]
impl Workflow for AccessPointWorkflow {
    type Entry = AccessPointEntry;
    type Want = AccessPointWant;
    type Have = AccessPointHave;

    fn name(&self) -> &'static str {
        "access_point"
    }

    fn minimum_version(&self) -> &'static str {
        AP_MIN_VERSION
    }

    fn validate_input(&self, entries: &[AccessPointEntry], state: State) -> Result<(), WorkflowError> {
        if state != State::Merged {
            return Err(WorkflowError::InvalidInput(format!(
                "The access point workflow supports only the merged state, got {}",
                state
            )));
        }
        if entries.is_empty() {
            return Err(WorkflowError::InvalidInput("config must contain at least one entry".to_string()));
        }
        Ok(())
    }

    fn get_want(&self, entry: &AccessPointEntry, _state: State) -> Result<AccessPointWant, WorkflowError> {
        AccessPointWant::from_entry(entry)
    }

    async fn get_have(
        &self,
        ctx: &mut Context<'_>,
        want: &AccessPointWant,
        _state: State,
    ) -> Result<AccessPointHave, WorkflowError> {
        let configure = match &want.configure {
            Some(target) => Some(match read_ap(ctx, &target.handle).await? {
                Ok(ap) => {
                    let provision = match &target.provision {
                        Some(provision) => Some(read_site_assignment(ctx, &ap.device_id, &provision.site_name).await?),
                        None => None,
                    };
                    Ok(ConfigureHave { ap, provision })
                }
                Err(reason) => Err(reason),
            }),
            None => None,
        };

        let mut bulk = Vec::new();
        if let Some(update) = &want.bulk_update {
            for target in &update.targets {
                bulk.push(read_ap(ctx, &target.handle).await?);
            }
        }

        Ok(AccessPointHave {
            configure,
            bulk,
            reboot: resolve_targets(ctx, &want.reboot).await?,
            factory_reset: resolve_targets(ctx, &want.factory_reset).await?,
        })
    }

    async fn apply(
        &self,
        ctx: &mut Context<'_>,
        want: &AccessPointWant,
        have: &AccessPointHave,
        _state: State,
        report: &mut OutcomeReport,
    ) -> Result<(), WorkflowError> {
        if let (Some(target), Some(current)) = (&want.configure, &have.configure) {
            match current {
                Ok(current) => {
                    info!("Reconciling access point {}", current.ap.config.ap_name);
                    if let (Some(provision), Some(site)) = (&target.provision, &current.provision) {
                        provision::apply(ctx, &target.handle, &current.ap, provision, site, report).await;
                    }
                    configure::apply(ctx, &target.handle, target, &current.ap, report).await;
                }
                Err(reason) => {
                    report.record(
                        Family::AccessPoints,
                        Bucket::NotUpdated,
                        target.handle.record().with_reason(reason.clone()),
                    );
                    if let Some(provision) = &target.provision {
                        report.record(
                            Family::ApProvision,
                            Bucket::NotUpdated,
                            target
                                .handle
                                .record()
                                .with_site(&provision.site_name)
                                .with_reason(reason.clone()),
                        );
                    }
                }
            }
        }

        if let Some(update) = &want.bulk_update {
            operations::apply_bulk(ctx, update, &have.bulk, report).await;
        }
        if !want.reboot.is_empty() {
            operations::apply_operation(ctx, ApOperation::Reboot, &want.reboot, &have.reboot, report).await;
        }
        if !want.factory_reset.is_empty() {
            let operation = ApOperation::FactoryReset {
                keep_static_ip_config: want.keep_static_ip_config,
            };
            operations::apply_operation(ctx, operation, &want.factory_reset, &have.factory_reset, report).await;
        }
        Ok(())
    }

    fn verify(&self, want: &AccessPointWant, have: &AccessPointHave, _state: State) -> Verification {
        let mut verification = Verification::default();

        if let (Some(target), Some(current)) = (&want.configure, &have.configure) {
            match current {
                Ok(current) => {
                    let label = current.ap.config.ap_name.as_str();
                    match configure::delta(target.ap_name.as_deref(), &target.settings, &target.radios, &current.ap) {
                        Ok(delta) => configure::verify(
                            label,
                            &delta,
                            &mut verification.mismatches,
                            &mut verification.best_effort,
                        ),
                        Err(reason) => verification.mismatches.push(reason),
                    }
                    if let (Some(provision), Some(Ok(site))) = (&target.provision, &current.provision) {
                        if !site.assigned {
                            verification
                                .mismatches
                                .push(format!("{} is not provisioned to {}", label, provision.site_name));
                        }
                    }
                }
                Err(reason) => verification.mismatches.push(reason.clone()),
            }
        }

        if let Some(update) = &want.bulk_update {
            for (target, current) in update.targets.iter().zip(&have.bulk) {
                let Ok(ap) = current else { continue };
                if let Ok(delta) = configure::delta(target.new_name.as_deref(), &update.settings, &BTreeMap::new(), ap) {
                    configure::verify(
                        &ap.config.ap_name,
                        &delta,
                        &mut verification.mismatches,
                        &mut verification.best_effort,
                    );
                }
            }
        }
        verification
    }
}
