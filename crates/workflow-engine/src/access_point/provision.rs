//! Site provisioning of an access point.
//!
//! Older Controller releases accept provisioning through the business API
//! and answer with an execution id; newer ones take a task-id request keyed
//! by device and site ids. Both come back as an [`AsyncHandle`] so the write
//! goes through the regular executor.

use super::model::ProvisionWant;
use super::ApState;
use crate::driver::Context;
use crate::outcome::{Bucket, Family, OutcomeReport};
use crate::resolver::DeviceHandle;
use crate::task_waiter::AsyncHandle;
use crate::version::ControllerVersion;
use controller_client::{
    ApProvisionRequest, ApiError, ControllerClientTrait, LegacyApProvisionRequest, ProvisionDevice,
};
use tracing::{debug, info};

/// Last release that only serves the execution-id provisioning API
pub const LEGACY_PROVISION_VERSION: &str = "2.3.5.3";

const LEGACY_DEVICE_TYPE: &str = "Unified AP";

/// Provisioning API flavor of a Controller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProvisionApi {
    /// `POST /wirelessAccessPoints/provision`, polled as a task
    TaskId,
    /// Business API provisioning, polled as an execution
    ExecutionId,
}

impl ProvisionApi {
    pub fn for_version(version: &ControllerVersion) -> Self {
        match ControllerVersion::parse(LEGACY_PROVISION_VERSION) {
            Some(legacy) if *version > legacy => ProvisionApi::TaskId,
            _ => ProvisionApi::ExecutionId,
        }
    }

    /// Issue the provisioning call for one AP
    pub async fn provision(
        self,
        client: &dyn ControllerClientTrait,
        ap: &ApState,
        want: &ProvisionWant,
        site_id: &str,
    ) -> Result<AsyncHandle, ApiError> {
        match self {
            ProvisionApi::TaskId => {
                let request = ApProvisionRequest {
                    network_devices: vec![ProvisionDevice {
                        device_id: ap.device_id.clone(),
                        mesh_role: None,
                    }],
                    rf_profile_name: want.rf_profile.clone(),
                    site_id: site_id.to_string(),
                };
                client.provision_access_points(&request).await.map(AsyncHandle::from)
            }
            ProvisionApi::ExecutionId => {
                let request = LegacyApProvisionRequest {
                    rf_profile: want.rf_profile.clone(),
                    device_name: ap.hostname.clone(),
                    site_name_hierarchy: want.site_name.clone(),
                    kind: LEGACY_DEVICE_TYPE.to_string(),
                    custom_flex_group_name: Vec::new(),
                };
                client
                    .provision_access_points_legacy(std::slice::from_ref(&request))
                    .await
                    .map(AsyncHandle::from)
            }
        }
    }
}

/// Site assignment of the addressed AP as read before the write
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisionHave {
    pub site_id: String,
    pub assigned: bool,
}

/// Provision the AP unless it is already assigned to the site
pub async fn apply(
    ctx: &Context<'_>,
    handle: &DeviceHandle,
    ap: &ApState,
    want: &ProvisionWant,
    have: &Result<ProvisionHave, String>,
    report: &mut OutcomeReport,
) {
    let record = handle
        .record()
        .with_id(&ap.device_id)
        .with_name(&ap.config.ap_name)
        .with_site(&want.site_name);
    let site = match have {
        Ok(site) => site,
        Err(reason) => {
            report.record(Family::ApProvision, Bucket::NotUpdated, record.with_reason(reason.clone()));
            return;
        }
    };
    if site.assigned {
        debug!("{} already provisioned to {}", handle, want.site_name);
        report.record(
            Family::ApProvision,
            Bucket::NotUpdated,
            record.with_reason(format!("AP is already provisioned to site {}", want.site_name)),
        );
        return;
    }

    let api = ProvisionApi::for_version(&ctx.version);
    info!(
        "Provisioning {} to {} with RF profile {} ({:?} API)",
        handle, want.site_name, want.rf_profile, api
    );
    let result = ctx
        .executor()
        .execute(
            report,
            &format!("provision {} to {}", ap.config.ap_name, want.site_name),
            api.provision(ctx.client, ap, want, &site.site_id),
        )
        .await;
    match result {
        Ok(()) => report.record(Family::ApProvision, Bucket::Updated, record),
        Err(reason) => report.record(Family::ApProvision, Bucket::NotUpdated, record.with_reason(reason)),
    }
}
