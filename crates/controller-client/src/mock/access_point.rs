//! Access point operations for the mock client

use super::{lock, MockControllerClient};
use crate::error::ApiError;
use crate::models::{
    ApConfigRequest, ApConfiguration, ApOperationResult, ApOperationStatus, ApProvisionRequest, ExecutionCreated,
    ExecutionStatus, LegacyApProvisionRequest, TaskCreated,
};

fn mac_key(mac: &str) -> String {
    mac.to_ascii_lowercase().replace('-', ":")
}

impl MockControllerClient {
    /// Seed the configuration of an access point, keyed by its ethernet MAC
    pub fn add_ap_configuration(&self, eth_mac: &str, mut config: ApConfiguration) {
        config.eth_mac = Some(eth_mac.to_string());
        lock(&self.ap_configs).insert(mac_key(eth_mac), config);
    }

    /// Current configuration of an access point
    pub fn ap_configuration(&self, eth_mac: &str) -> Option<ApConfiguration> {
        lock(&self.ap_configs).get(&mac_key(eth_mac)).cloned()
    }

    fn find_ap_by_radio_mac(&self, mac: &str) -> Option<ApConfiguration> {
        let key = mac_key(mac);
        lock(&self.ap_configs)
            .values()
            .find(|c| c.mac_address.as_deref().map(mac_key).as_deref() == Some(key.as_str()))
            .cloned()
    }

    fn record_ap_operation(&self, task_id: &str, macs: &[String], status: &str, reason: Option<String>) {
        let results = macs
            .iter()
            .map(|mac| ApOperationResult {
                ap_name: self.find_ap_by_radio_mac(mac).map(|c| c.ap_name),
                mac_address: Some(mac.clone()),
                status: status.to_string(),
                failure_reason: reason.clone(),
            })
            .collect();
        lock(&self.ap_operations).insert(
            task_id.to_string(),
            vec![ApOperationStatus {
                wlc_ip: Some("10.0.0.1".to_string()),
                ap_list: results,
            }],
        );
    }
}

fn apply_config(config: &mut ApConfiguration, request: &ApConfigRequest) {
    fn set<T: Clone>(target: &mut Option<T>, value: &Option<T>) {
        if value.is_some() {
            target.clone_from(value);
        }
    }
    set(&mut config.admin_status, &request.admin_status);
    set(&mut config.led_status, &request.led_status);
    set(&mut config.led_brightness_level, &request.led_brightness_level);
    set(&mut config.ap_mode, &request.ap_mode);
    set(&mut config.location, &request.location);
    set(&mut config.is_assigned_site_as_location, &request.is_assigned_site_as_location);
    set(&mut config.failover_priority, &request.failover_priority);
    set(&mut config.primary_controller_name, &request.primary_controller_name);
    set(&mut config.primary_ip_address, &request.primary_ip_address);
    set(&mut config.secondary_controller_name, &request.secondary_controller_name);
    set(&mut config.secondary_ip_address, &request.secondary_ip_address);
    set(&mut config.tertiary_controller_name, &request.tertiary_controller_name);
    set(&mut config.tertiary_ip_address, &request.tertiary_ip_address);

    for radio in &request.radio_configurations {
        match config.radio_dtos.iter_mut().find(|r| r.radio_type == radio.radio_type) {
            Some(existing) => {
                set(&mut existing.admin_status, &radio.admin_status);
                set(&mut existing.antenna_pattern_name, &radio.antenna_pattern_name);
                set(&mut existing.antenna_gain, &radio.antenna_gain);
                set(&mut existing.cable_loss, &radio.cable_loss);
                set(&mut existing.channel_assignment_mode, &radio.channel_assignment_mode);
                set(&mut existing.channel_number, &radio.channel_number);
                set(&mut existing.channel_width, &radio.channel_width);
                set(&mut existing.power_assignment_mode, &radio.power_assignment_mode);
                set(&mut existing.powerlevel, &radio.powerlevel);
                set(&mut existing.radio_role_assignment, &radio.radio_role_assignment);
            }
            None => config.radio_dtos.push(radio.clone()),
        }
    }
}

pub(crate) fn get_ap_configuration(client: &MockControllerClient, eth_mac: &str) -> Result<ApConfiguration, ApiError> {
    client
        .ap_configuration(eth_mac)
        .ok_or_else(|| ApiError::NotFound(format!("AP configuration for {} not found", eth_mac)))
}

pub(crate) fn configure_access_points(
    client: &MockControllerClient,
    request: &ApConfigRequest,
) -> Result<TaskCreated, ApiError> {
    let injected = client.begin_write("configure_access_points", serde_json::to_value(request)?)?;
    let outcome = match injected {
        Some(reason) => Err(reason),
        None => {
            let mut configs = lock(&client.ap_configs);
            let mut result = Ok(());
            for entry in &request.ap_list {
                let key = mac_key(&entry.mac_address);
                match configs
                    .values_mut()
                    .find(|c| c.mac_address.as_deref().map(mac_key).as_deref() == Some(key.as_str()))
                {
                    Some(config) => {
                        apply_config(config, request);
                        if let Some(new_name) = &entry.ap_name_new {
                            config.ap_name.clone_from(new_name);
                        }
                    }
                    None => {
                        result = Err(format!("AP {} not found", entry.mac_address));
                        break;
                    }
                }
            }
            result
        }
    };
    Ok(client.finish_write(outcome))
}

pub(crate) fn provision_access_points(
    client: &MockControllerClient,
    request: &ApProvisionRequest,
) -> Result<TaskCreated, ApiError> {
    let injected = client.begin_write("provision_access_points", serde_json::to_value(request)?)?;
    let outcome = match injected {
        Some(reason) => Err(reason),
        None => {
            for device in &request.network_devices {
                client.assign_device_to_site(&device.device_id, &request.site_id);
            }
            Ok(())
        }
    };
    Ok(client.finish_write(outcome))
}

pub(crate) fn provision_access_points_legacy(
    client: &MockControllerClient,
    requests: &[LegacyApProvisionRequest],
) -> Result<ExecutionCreated, ApiError> {
    let injected = client.begin_write("provision_access_points_legacy", serde_json::to_value(requests)?)?;
    let outcome = match injected {
        Some(reason) => Err(reason),
        None => {
            let mut result = Ok(());
            for request in requests {
                let device_id = lock(&client.devices)
                    .iter()
                    .find(|d| d.hostname.as_deref() == Some(request.device_name.as_str()))
                    .map(|d| d.id.clone());
                let site_id = lock(&client.sites)
                    .iter()
                    .find(|s| s.name_hierarchy == request.site_name_hierarchy)
                    .map(|s| s.id.clone());
                match (device_id, site_id) {
                    (Some(device_id), Some(site_id)) => client.assign_device_to_site(&device_id, &site_id),
                    _ => {
                        result = Err(format!("Cannot provision {}", request.device_name));
                        break;
                    }
                }
            }
            result
        }
    };

    let execution_id = client.next_id("exec");
    let now = chrono::Utc::now().timestamp_millis();
    let (status, bapi_error) = match outcome {
        Ok(()) => ("SUCCESS", None),
        Err(reason) => ("FAILURE", Some(reason)),
    };
    lock(&client.executions).insert(
        execution_id.clone(),
        ExecutionStatus {
            status: status.to_string(),
            bapi_error,
            start_time: Some(now),
            end_time: Some(now),
        },
    );
    Ok(ExecutionCreated {
        execution_status_url: Some(format!("/dna/platform/management/business-api/v1/execution-status/{}", execution_id)),
        message: Some("The request has been accepted for execution".to_string()),
        execution_id,
    })
}

pub(crate) fn get_execution_status(client: &MockControllerClient, execution_id: &str) -> Result<ExecutionStatus, ApiError> {
    lock(&client.executions)
        .get(execution_id)
        .cloned()
        .ok_or_else(|| ApiError::NotFound(format!("Execution {} not found", execution_id)))
}

pub(crate) fn reboot_access_points(client: &MockControllerClient, ap_mac_addresses: &[String]) -> Result<TaskCreated, ApiError> {
    let payload = serde_json::json!({ "apMacAddresses": ap_mac_addresses });
    let injected = client.begin_write("reboot_access_points", payload)?;
    let (status, reason) = match &injected {
        Some(reason) => ("FAILURE", Some(reason.clone())),
        None => ("SUCCESS", None),
    };
    let created = client.finish_write(injected.map_or(Ok(()), Err));
    client.record_ap_operation(&created.task_id, ap_mac_addresses, status, reason);
    Ok(created)
}

pub(crate) fn factory_reset_access_points(
    client: &MockControllerClient,
    ap_mac_addresses: &[String],
    keep_static_ip_config: bool,
) -> Result<TaskCreated, ApiError> {
    let payload = serde_json::json!({
        "apMacAddresses": ap_mac_addresses,
        "keepStaticIPConfig": keep_static_ip_config,
    });
    let injected = client.begin_write("factory_reset_access_points", payload)?;
    let (status, reason) = match &injected {
        Some(reason) => ("FAILURE", Some(reason.clone())),
        None => ("SUCCESS", None),
    };
    let created = client.finish_write(injected.map_or(Ok(()), Err));
    client.record_ap_operation(&created.task_id, ap_mac_addresses, status, reason);
    Ok(created)
}

pub(crate) fn get_ap_operation_status(client: &MockControllerClient, task_id: &str) -> Result<Vec<ApOperationStatus>, ApiError> {
    lock(&client.ap_operations)
        .get(task_id)
        .cloned()
        .ok_or_else(|| ApiError::NotFound(format!("No AP operation for task {}", task_id)))
}
