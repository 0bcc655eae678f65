//! Multi-AP operations: bulk update, reboot and factory reset.

use super::configure;
use super::model::{BulkUpdateWant, MAX_AP_LIST};
use super::ApState;
use crate::driver::Context;
use crate::outcome::{Bucket, Family, OutcomeRecord, OutcomeReport};
use crate::resolver::DeviceHandle;
use crate::task_waiter::AsyncHandle;
use controller_client::{
    ApConfigRequest, ApConfiguration, ApListEntry, ApOperationStatus, ApiError, ControllerClientTrait, TaskCreated,
};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

/// Apply common settings and renames to a list of APs
///
/// `have` is aligned with `want.targets`.
pub async fn apply_bulk(ctx: &Context<'_>, want: &BulkUpdateWant, have: &[Result<ApState, String>], report: &mut OutcomeReport) {
    let mut entries: Vec<ApListEntry> = Vec::new();
    let mut records: Vec<OutcomeRecord> = Vec::new();

    for (target, current) in want.targets.iter().zip(have) {
        let record = target.handle.record();
        let ap = match current {
            Ok(ap) => ap,
            Err(reason) => {
                report.record(Family::AccessPoints, Bucket::NotUpdated, record.with_reason(reason.clone()));
                continue;
            }
        };
        let record = record.with_id(&ap.device_id).with_name(&ap.config.ap_name);
        match configure::delta(target.new_name.as_deref(), &want.settings, &BTreeMap::new(), ap) {
            Ok(delta) if delta.is_empty() => report.record(
                Family::AccessPoints,
                Bucket::NotUpdated,
                record.with_reason("AP configuration already in the requested state"),
            ),
            Ok(mut delta) => {
                entries.append(&mut delta.request.ap_list);
                records.push(record);
            }
            Err(reason) => report.record(Family::AccessPoints, Bucket::NotUpdated, record.with_reason(reason)),
        }
    }
    if entries.is_empty() {
        debug!("Bulk update has nothing to change");
        return;
    }

    // Every listed AP gets the full set of requested settings
    let mut template = ApConfigRequest::default();
    configure::settings_delta(&want.settings, &ApConfiguration::default(), &mut template, &mut Vec::new());
    let client = ctx.client;
    info!("Bulk updating {} access points", entries.len());
    let results = ctx
        .executor()
        .execute_chunked(report, "bulk update access points", &entries, MAX_AP_LIST, |chunk| {
            let request = ApConfigRequest {
                ap_list: chunk.to_vec(),
                ..template.clone()
            };
            async move { client.configure_access_points(&request).await }
        })
        .await;

    let mut records = records.into_iter();
    for chunk in results {
        for record in records.by_ref().take(chunk.items.len()) {
            match &chunk.result {
                Ok(()) => report.record(Family::AccessPoints, Bucket::Updated, record),
                Err(reason) => report.record(Family::AccessPoints, Bucket::NotUpdated, record.with_reason(reason.clone())),
            }
        }
    }
}

/// Reboot or factory reset
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApOperation {
    Reboot,
    FactoryReset { keep_static_ip_config: bool },
}

impl ApOperation {
    pub fn family(self) -> Family {
        match self {
            ApOperation::Reboot => Family::ApReboot,
            ApOperation::FactoryReset { .. } => Family::ApFactoryReset,
        }
    }

    fn label(self) -> &'static str {
        match self {
            ApOperation::Reboot => "reboot",
            ApOperation::FactoryReset { .. } => "factory reset",
        }
    }

    async fn start(self, client: &dyn ControllerClientTrait, macs: &[String]) -> Result<TaskCreated, ApiError> {
        match self {
            ApOperation::Reboot => client.reboot_access_points(macs).await,
            ApOperation::FactoryReset { keep_static_ip_config } => {
                client.factory_reset_access_points(macs, keep_static_ip_config).await
            }
        }
    }

    async fn status(self, client: &dyn ControllerClientTrait, task_id: &str) -> Result<Vec<ApOperationStatus>, ApiError> {
        match self {
            ApOperation::Reboot => client.get_ap_reboot_status(task_id).await,
            ApOperation::FactoryReset { .. } => client.get_ap_factory_reset_status(task_id).await,
        }
    }
}

/// Per-AP status reported for a finished operation, keyed by MAC
fn statuses(groups: Vec<ApOperationStatus>) -> BTreeMap<String, Result<(), String>> {
    groups
        .into_iter()
        .flat_map(|group| group.ap_list)
        .filter_map(|ap| {
            let mac = ap.mac_address?.to_ascii_lowercase().replace('-', ":");
            let result = if ap.status.eq_ignore_ascii_case("success") {
                Ok(())
            } else {
                Err(ap.failure_reason.unwrap_or(ap.status))
            };
            Some((mac, result))
        })
        .collect()
}

/// Run one operation over `targets` and record each AP's own status
///
/// `have` is aligned with `targets`; `Err` carries the lookup miss.
pub async fn apply_operation(
    ctx: &Context<'_>,
    operation: ApOperation,
    targets: &[DeviceHandle],
    have: &[Result<String, String>],
    report: &mut OutcomeReport,
) {
    let family = operation.family();
    let mut ready: Vec<(&DeviceHandle, &String)> = Vec::new();
    for (handle, device) in targets.iter().zip(have) {
        match device {
            Ok(device_id) => ready.push((handle, device_id)),
            Err(reason) => report.record(family, Bucket::NotUpdated, handle.record().with_reason(reason.clone())),
        }
    }
    if ready.is_empty() {
        return;
    }

    let macs: Vec<String> = ready.iter().map(|(handle, _)| handle.value().to_string()).collect();
    info!("Requesting {} of {} access points", operation.label(), macs.len());
    let task = match operation.start(ctx.client, &macs).await {
        Ok(task) => task,
        Err(e) => {
            warn!("{} request failed: {}", operation.label(), e);
            report.count_write(false);
            for (handle, device_id) in ready {
                report.record(family, Bucket::NotUpdated, handle.record().with_id(device_id).with_reason(e.to_string()));
            }
            return;
        }
    };
    let task_id = task.task_id.clone();
    let overall = ctx.waiter().wait(ctx.client, &AsyncHandle::from(task)).await.into_result();
    report.count_write(overall.is_ok());

    let per_ap = match operation.status(ctx.client, &task_id).await {
        Ok(groups) => statuses(groups),
        Err(e) => {
            warn!("No per-AP {} status for task {}: {}", operation.label(), task_id, e);
            BTreeMap::new()
        }
    };
    for (handle, device_id) in ready {
        let record = handle.record().with_id(device_id);
        let result = per_ap.get(handle.value()).cloned().unwrap_or_else(|| overall.clone());
        match result {
            Ok(()) => report.record(family, Bucket::Updated, record),
            Err(reason) => {
                warn!("{} of {} failed: {}", operation.label(), handle, reason);
                report.record(family, Bucket::NotUpdated, record.with_reason(reason));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use controller_client::ApOperationResult;

    #[test]
    fn test_statuses_keyed_by_normalized_mac() {
        let groups = vec![ApOperationStatus {
            wlc_ip: Some("10.0.0.1".to_string()),
            ap_list: vec![
                ApOperationResult {
                    ap_name: Some("AP-1".to_string()),
                    mac_address: Some("AA-BB-CC-00-10-01".to_string()),
                    status: "Success".to_string(),
                    failure_reason: None,
                },
                ApOperationResult {
                    ap_name: Some("AP-2".to_string()),
                    mac_address: Some("aa:bb:cc:00:10:02".to_string()),
                    status: "FAILURE".to_string(),
                    failure_reason: Some("AP not joined".to_string()),
                },
                ApOperationResult {
                    status: "FAILURE".to_string(),
                    ..Default::default()
                },
            ],
        }];
        let statuses = statuses(groups);
        assert_eq!(statuses.len(), 2);
        assert_eq!(statuses["aa:bb:cc:00:10:01"], Ok(()));
        assert_eq!(statuses["aa:bb:cc:00:10:02"], Err("AP not joined".to_string()));
    }
}
