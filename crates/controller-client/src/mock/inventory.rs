//! Inventory and site operations for the mock client

use super::{lock, page, MockControllerClient};
use crate::error::ApiError;
use crate::models::{DeviceInterface, FabricSite, NetworkDevice, Site, SiteMembership};

impl MockControllerClient {
    /// Add a device to the inventory
    pub fn add_device(&self, device: NetworkDevice) {
        lock(&self.devices).push(device);
    }

    /// Add an interface; `device_id` must be set for lookups by device
    pub fn add_interface(&self, interface: DeviceInterface) {
        lock(&self.interfaces).push(interface);
    }

    /// Add a site
    pub fn add_site(&self, site: Site) {
        lock(&self.sites).push(site);
    }

    /// Mark a site as a fabric site
    pub fn add_fabric_site(&self, fabric: FabricSite) {
        lock(&self.fabric_sites).push(fabric);
    }

    /// Assign a device to a site
    pub fn assign_device_to_site(&self, device_id: &str, site_id: &str) {
        let hierarchy = lock(&self.sites)
            .iter()
            .find(|s| s.id == site_id)
            .map(|s| s.name_hierarchy.clone());
        let mut members = lock(&self.site_devices);
        members.retain(|m| m.device_id != device_id);
        members.push(SiteMembership {
            device_id: device_id.to_string(),
            site_id: site_id.to_string(),
            site_name_hierarchy: hierarchy,
        });
    }

    /// Site a device is currently assigned to
    pub fn site_of_device(&self, device_id: &str) -> Option<String> {
        lock(&self.site_devices)
            .iter()
            .find(|m| m.device_id == device_id)
            .map(|m| m.site_id.clone())
    }
}

fn device_field<'a>(device: &'a NetworkDevice, key: &str) -> Option<&'a str> {
    match key {
        "id" => Some(device.id.as_str()),
        "hostname" => device.hostname.as_deref(),
        "managementIpAddress" => device.management_ip_address.as_deref(),
        "macAddress" => device.mac_address.as_deref(),
        "serialNumber" => device.serial_number.as_deref(),
        "family" => device.family.as_deref(),
        _ => None,
    }
}

pub(crate) fn query_network_devices(
    client: &MockControllerClient,
    filters: &[(&str, &str)],
    offset: u32,
    limit: u32,
) -> Result<Vec<NetworkDevice>, ApiError> {
    let devices = lock(&client.devices);
    let matching: Vec<NetworkDevice> = devices
        .iter()
        .filter(|d| {
            filters.iter().all(|(key, value)| {
                device_field(d, key).is_some_and(|field| field.eq_ignore_ascii_case(value))
            })
        })
        .cloned()
        .collect();
    Ok(page(&matching, offset, limit))
}

pub(crate) fn get_interface_by_name(
    client: &MockControllerClient,
    device_id: &str,
    interface_name: &str,
) -> Result<DeviceInterface, ApiError> {
    lock(&client.interfaces)
        .iter()
        .find(|i| i.device_id.as_deref() == Some(device_id) && i.port_name == interface_name)
        .cloned()
        .ok_or_else(|| {
            ApiError::NotFound(format!(
                "GET interface-name - No resource found with deviceId: {} and name: {}",
                device_id, interface_name
            ))
        })
}

pub(crate) fn query_sites(client: &MockControllerClient, name_hierarchy: &str) -> Result<Vec<Site>, ApiError> {
    Ok(lock(&client.sites)
        .iter()
        .filter(|s| s.name_hierarchy == name_hierarchy)
        .cloned()
        .collect())
}

pub(crate) fn query_fabric_sites(client: &MockControllerClient, site_id: &str) -> Result<Vec<FabricSite>, ApiError> {
    Ok(lock(&client.fabric_sites)
        .iter()
        .filter(|f| f.site_id == site_id)
        .cloned()
        .collect())
}

pub(crate) fn query_site_assigned_devices(
    client: &MockControllerClient,
    site_id: &str,
    offset: u32,
    limit: u32,
) -> Result<Vec<SiteMembership>, ApiError> {
    let members: Vec<SiteMembership> = lock(&client.site_devices)
        .iter()
        .filter(|m| m.site_id == site_id)
        .cloned()
        .collect();
    Ok(page(&members, offset, limit))
}

#[cfg(test)]
mod tests {
    use crate::controller_trait::ControllerClientTrait;
    use crate::mock::MockControllerClient;
    use crate::models::{DeviceInterface, NetworkDevice};

    fn device(id: &str, ip: &str) -> NetworkDevice {
        NetworkDevice {
            id: id.to_string(),
            hostname: Some(format!("{}.example.com", id)),
            management_ip_address: Some(ip.to_string()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_query_devices_pages_from_offset_one() {
        let mock = MockControllerClient::new("https://mock");
        for i in 0..5 {
            mock.add_device(device(&format!("d{}", i), &format!("10.0.0.{}", i)));
        }

        let first = mock.query_network_devices(&[], 1, 2).await.unwrap();
        let last = mock.query_network_devices(&[], 5, 2).await.unwrap();
        assert_eq!(first.len(), 2);
        assert_eq!(first[0].id, "d0");
        assert_eq!(last.len(), 1);
        assert_eq!(last[0].id, "d4");

        let by_ip = mock
            .query_network_devices(&[("managementIpAddress", "10.0.0.3")], 1, 500)
            .await
            .unwrap();
        assert_eq!(by_ip.len(), 1);
        assert_eq!(by_ip[0].id, "d3");
    }

    #[tokio::test]
    async fn test_missing_interface_is_soft_miss() {
        let mock = MockControllerClient::new("https://mock");
        mock.add_interface(DeviceInterface {
            id: "if-1".to_string(),
            device_id: Some("d1".to_string()),
            port_name: "GigabitEthernet1/0/1".to_string(),
            ..Default::default()
        });

        assert!(mock.get_interface_by_name("d1", "GigabitEthernet1/0/1").await.is_ok());
        let err = mock.get_interface_by_name("d1", "GigabitEthernet1/0/2").await.unwrap_err();
        assert!(err.is_missing_device_resource());
    }
}
