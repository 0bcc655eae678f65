//! SDA host onboarding operations for the mock client

use super::{lock, page, MockControllerClient};
use crate::error::ApiError;
use crate::models::{PortAssignment, PortChannel, TaskCreated, VlanSsidMapping};

impl MockControllerClient {
    /// Seed an existing port assignment; an id is generated when absent
    pub fn add_port_assignment(&self, mut assignment: PortAssignment) -> String {
        let id = assignment.id.clone().unwrap_or_else(|| self.next_id("pa"));
        assignment.id = Some(id.clone());
        lock(&self.port_assignments).push(assignment);
        id
    }

    /// Seed an existing port channel; id and name are generated when absent
    pub fn add_port_channel(&self, mut channel: PortChannel) -> String {
        let id = channel.id.clone().unwrap_or_else(|| self.next_id("pc"));
        channel.id = Some(id.clone());
        if channel.port_channel_name.is_none() {
            channel.port_channel_name = Some(self.next_port_channel_name(&channel.network_device_id));
        }
        lock(&self.port_channels).push(channel);
        id
    }

    /// Seed the VLAN to SSID mappings of a fabric site
    pub fn set_vlan_ssid_mappings(&self, fabric_id: &str, mappings: Vec<VlanSsidMapping>) {
        lock(&self.vlan_ssids).insert(fabric_id.to_string(), mappings);
    }

    /// Current port assignments
    pub fn port_assignments(&self) -> Vec<PortAssignment> {
        lock(&self.port_assignments).clone()
    }

    /// Current port channels
    pub fn port_channels(&self) -> Vec<PortChannel> {
        lock(&self.port_channels).clone()
    }

    /// Current VLAN to SSID mappings of a fabric site
    pub fn vlan_ssid_mappings(&self, fabric_id: &str) -> Vec<VlanSsidMapping> {
        lock(&self.vlan_ssids).get(fabric_id).cloned().unwrap_or_default()
    }

    fn next_port_channel_name(&self, device_id: &str) -> String {
        let used = lock(&self.port_channels)
            .iter()
            .filter(|c| c.network_device_id == device_id)
            .count();
        format!("Port-channel{}", used + 1)
    }
}

pub(crate) fn query_port_assignments(
    client: &MockControllerClient,
    fabric_id: &str,
    network_device_id: &str,
    offset: u32,
    limit: u32,
) -> Result<Vec<PortAssignment>, ApiError> {
    let matching: Vec<PortAssignment> = lock(&client.port_assignments)
        .iter()
        .filter(|a| a.fabric_id == fabric_id && a.network_device_id == network_device_id)
        .cloned()
        .collect();
    Ok(page(&matching, offset, limit))
}

pub(crate) fn add_port_assignments(
    client: &MockControllerClient,
    assignments: &[PortAssignment],
) -> Result<TaskCreated, ApiError> {
    let injected = client.begin_write("add_port_assignments", serde_json::to_value(assignments)?)?;
    let outcome = match injected {
        Some(reason) => Err(reason),
        None => {
            let duplicate = {
                let existing = lock(&client.port_assignments);
                assignments.iter().find(|new| {
                    existing.iter().any(|a| {
                        a.fabric_id == new.fabric_id
                            && a.network_device_id == new.network_device_id
                            && a.interface_name == new.interface_name
                    })
                })
                .map(|a| a.interface_name.clone())
            };
            match duplicate {
                Some(name) => Err(format!("Port assignment already exists for interface {}", name)),
                None => {
                    for assignment in assignments {
                        let mut stored = assignment.clone();
                        stored.id = Some(client.next_id("pa"));
                        lock(&client.port_assignments).push(stored);
                    }
                    Ok(())
                }
            }
        }
    };
    Ok(client.finish_write(outcome))
}

pub(crate) fn update_port_assignments(
    client: &MockControllerClient,
    assignments: &[PortAssignment],
) -> Result<TaskCreated, ApiError> {
    let injected = client.begin_write("update_port_assignments", serde_json::to_value(assignments)?)?;
    let outcome = match injected {
        Some(reason) => Err(reason),
        None => {
            let mut stored = lock(&client.port_assignments);
            let mut result = Ok(());
            for update in assignments {
                match stored.iter_mut().find(|a| a.id.is_some() && a.id == update.id) {
                    Some(existing) => *existing = update.clone(),
                    None => {
                        result = Err(format!("Port assignment {:?} not found", update.id));
                        break;
                    }
                }
            }
            result
        }
    };
    Ok(client.finish_write(outcome))
}

pub(crate) fn delete_port_assignments(
    client: &MockControllerClient,
    fabric_id: &str,
    network_device_id: &str,
    interface_name: Option<&str>,
) -> Result<TaskCreated, ApiError> {
    let payload = serde_json::json!({
        "fabricId": fabric_id,
        "networkDeviceId": network_device_id,
        "interfaceName": interface_name,
    });
    let injected = client.begin_write("delete_port_assignments", payload)?;
    let outcome = match injected {
        Some(reason) => Err(reason),
        None => {
            lock(&client.port_assignments).retain(|a| {
                !(a.fabric_id == fabric_id
                    && a.network_device_id == network_device_id
                    && interface_name.is_none_or(|name| a.interface_name == name))
            });
            Ok(())
        }
    };
    Ok(client.finish_write(outcome))
}

pub(crate) fn query_port_channels(
    client: &MockControllerClient,
    fabric_id: &str,
    network_device_id: &str,
    offset: u32,
    limit: u32,
) -> Result<Vec<PortChannel>, ApiError> {
    let matching: Vec<PortChannel> = lock(&client.port_channels)
        .iter()
        .filter(|c| c.fabric_id == fabric_id && c.network_device_id == network_device_id)
        .cloned()
        .collect();
    Ok(page(&matching, offset, limit))
}

pub(crate) fn add_port_channels(client: &MockControllerClient, channels: &[PortChannel]) -> Result<TaskCreated, ApiError> {
    let injected = client.begin_write("add_port_channels", serde_json::to_value(channels)?)?;
    let outcome = match injected {
        Some(reason) => Err(reason),
        None => {
            for channel in channels {
                client.add_port_channel(PortChannel {
                    id: None,
                    port_channel_name: None,
                    ..channel.clone()
                });
            }
            Ok(())
        }
    };
    Ok(client.finish_write(outcome))
}

pub(crate) fn update_port_channels(client: &MockControllerClient, channels: &[PortChannel]) -> Result<TaskCreated, ApiError> {
    let injected = client.begin_write("update_port_channels", serde_json::to_value(channels)?)?;
    let outcome = match injected {
        Some(reason) => Err(reason),
        None => {
            let mut stored = lock(&client.port_channels);
            let mut result = Ok(());
            for update in channels {
                match stored.iter_mut().find(|c| c.id.is_some() && c.id == update.id) {
                    Some(existing) if existing.protocol != update.protocol => {
                        result = Err(format!(
                            "Protocol of {} cannot be changed",
                            existing.port_channel_name.clone().unwrap_or_default()
                        ));
                        break;
                    }
                    Some(existing) => {
                        let name = existing.port_channel_name.clone();
                        *existing = update.clone();
                        existing.port_channel_name = name;
                    }
                    None => {
                        result = Err(format!("Port channel {:?} not found", update.id));
                        break;
                    }
                }
            }
            result
        }
    };
    Ok(client.finish_write(outcome))
}

pub(crate) fn delete_port_channel(client: &MockControllerClient, id: &str) -> Result<TaskCreated, ApiError> {
    let injected = client.begin_write("delete_port_channel", serde_json::json!({ "id": id }))?;
    let outcome = match injected {
        Some(reason) => Err(reason),
        None => {
            let mut stored = lock(&client.port_channels);
            let before = stored.len();
            stored.retain(|c| c.id.as_deref() != Some(id));
            if stored.len() == before {
                Err(format!("Port channel {} not found", id))
            } else {
                Ok(())
            }
        }
    };
    Ok(client.finish_write(outcome))
}

pub(crate) fn query_vlan_ssid_mappings(
    client: &MockControllerClient,
    fabric_id: &str,
    offset: u32,
    limit: u32,
) -> Result<Vec<VlanSsidMapping>, ApiError> {
    let mappings = client.vlan_ssid_mappings(fabric_id);
    Ok(page(&mappings, offset, limit))
}

pub(crate) fn update_vlan_ssid_mappings(
    client: &MockControllerClient,
    fabric_id: &str,
    mappings: &[VlanSsidMapping],
) -> Result<TaskCreated, ApiError> {
    let injected = client.begin_write("update_vlan_ssid_mappings", serde_json::to_value(mappings)?)?;
    let outcome = match injected {
        Some(reason) => Err(reason),
        None => {
            // A VLAN sent without SSIDs is unmapped
            let kept = mappings.iter().filter(|m| !m.ssid_details.is_empty()).cloned().collect();
            client.set_vlan_ssid_mappings(fabric_id, kept);
            Ok(())
        }
    };
    Ok(client.finish_write(outcome))
}

#[cfg(test)]
mod tests {
    use crate::controller_trait::ControllerClientTrait;
    use crate::mock::MockControllerClient;
    use crate::models::{PortChannel, SsidDetail, VlanSsidMapping};

    fn channel(protocol: &str) -> PortChannel {
        PortChannel {
            fabric_id: "f1".to_string(),
            network_device_id: "d1".to_string(),
            interface_names: vec!["Gi1/0/1".to_string(), "Gi1/0/2".to_string()],
            connected_device_type: "TRUNK".to_string(),
            protocol: Some(protocol.to_string()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_added_port_channel_gets_name() {
        let mock = MockControllerClient::new("https://mock");
        mock.add_port_channels(&[channel("ON")]).await.unwrap();

        let stored = mock.query_port_channels("f1", "d1", 1, 500).await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].port_channel_name.as_deref(), Some("Port-channel1"));
        assert!(stored[0].id.is_some());
    }

    #[tokio::test]
    async fn test_port_channel_protocol_change_fails_task() {
        let mock = MockControllerClient::new("https://mock");
        let id = mock.add_port_channel(channel("LACP"));
        let mut update = channel("ON");
        update.id = Some(id);

        let created = mock.update_port_channels(&[update]).await.unwrap();
        let task = mock.get_task_by_id(&created.task_id).await.unwrap();
        assert!(!task.is_success());
        assert_eq!(mock.port_channels()[0].protocol.as_deref(), Some("LACP"));
    }

    #[tokio::test]
    async fn test_vlan_without_ssids_is_unmapped() {
        let mock = MockControllerClient::new("https://mock");
        let ssid = |name: &str| SsidDetail { name: name.to_string(), security_group_tag: None };
        mock.update_vlan_ssid_mappings(
            "f1",
            &[
                VlanSsidMapping { vlan_name: "V1".to_string(), ssid_details: vec![ssid("A")] },
                VlanSsidMapping { vlan_name: "V2".to_string(), ssid_details: vec![] },
            ],
        )
        .await
        .unwrap();

        let stored = mock.vlan_ssid_mappings("f1");
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].vlan_name, "V1");
    }
}
