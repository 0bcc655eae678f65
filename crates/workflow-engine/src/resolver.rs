//! Resolver
//!
//! Turns user-supplied handles into Controller ids. A miss is reported as
//! [`WorkflowError::HandleNotFound`], which callers record against the item
//! and move on; transport errors propagate as fatal.
//!
//! Results are cached for the lifetime of the resolver, which the driver
//! creates fresh for every config entry.

use crate::error::WorkflowError;
use crate::outcome::OutcomeRecord;
use crate::paginator;
use crate::validate;
use controller_client::{ApiError, ControllerClientTrait, DeviceInterface, NetworkDevice};
use std::collections::HashMap;
use tracing::{debug, warn};

/// Reason recorded when a device handle does not resolve
pub const DEVICE_NOT_FOUND: &str = "Device doesn't exist in Controller";
/// Reason recorded when an interface does not exist on its device
pub const INTERFACE_NOT_FOUND: &str = "Interface doesn't exist in Controller";

/// User-supplied device identity
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DeviceHandle {
    Ip(String),
    Hostname(String),
    Mac(String),
    Serial(String),
}

impl DeviceHandle {
    /// Validate `value` for the given identifier kind
    pub fn parse(identifier: &str, value: &str) -> Result<Self, WorkflowError> {
        let value = value.trim();
        let invalid = || WorkflowError::InvalidInput(format!("'{}' is not a valid {}", value, identifier));
        match identifier {
            "ip_address" | "management_ip_address" => {
                validate::is_valid_ip(value).then(|| DeviceHandle::Ip(value.to_string())).ok_or_else(invalid)
            }
            "hostname" => validate::is_valid_hostname(value)
                .then(|| DeviceHandle::Hostname(value.to_string()))
                .ok_or_else(invalid),
            "mac_address" => validate::is_valid_mac(value)
                .then(|| DeviceHandle::Mac(validate::normalize_mac(value)))
                .ok_or_else(invalid),
            "serial_number" => validate::is_valid_serial(value)
                .then(|| DeviceHandle::Serial(value.to_string()))
                .ok_or_else(invalid),
            other => Err(WorkflowError::InvalidInput(format!("Unknown device identifier '{}'", other))),
        }
    }

    /// Inventory query field for this handle
    pub fn query_field(&self) -> &'static str {
        match self {
            DeviceHandle::Ip(_) => "managementIpAddress",
            DeviceHandle::Hostname(_) => "hostname",
            DeviceHandle::Mac(_) => "macAddress",
            DeviceHandle::Serial(_) => "serialNumber",
        }
    }

    /// Identifier name as written in the config
    pub fn identifier(&self) -> &'static str {
        match self {
            DeviceHandle::Ip(_) => "ip_address",
            DeviceHandle::Hostname(_) => "hostname",
            DeviceHandle::Mac(_) => "mac_address",
            DeviceHandle::Serial(_) => "serial_number",
        }
    }

    pub fn value(&self) -> &str {
        match self {
            DeviceHandle::Ip(v) | DeviceHandle::Hostname(v) | DeviceHandle::Mac(v) | DeviceHandle::Serial(v) => v,
        }
    }

    /// Outcome record addressing this device
    pub fn record(&self) -> OutcomeRecord {
        OutcomeRecord::device(self.identifier(), self.value())
    }
}

impl std::fmt::Display for DeviceHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.identifier(), self.value())
    }
}

/// Eligibility rule applied after a device resolves
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceFilter {
    /// Any inventory entry
    Any,
    /// Reachable, managed, and not an access point
    FabricDevice,
    /// Reachable, managed, and an access point
    AccessPoint,
}

const AP_FAMILY: &str = "Unified AP";

impl DeviceFilter {
    /// `Err(reason)` when `device` does not qualify
    pub fn check(self, device: &NetworkDevice) -> Result<(), String> {
        if self == DeviceFilter::Any {
            return Ok(());
        }
        let name = device.hostname.as_deref().unwrap_or(&device.id);
        if device.reachability_status.as_deref() != Some("Reachable") {
            return Err(format!("Device {} is not reachable", name));
        }
        if !matches!(device.collection_status.as_deref(), Some("Managed" | "In Progress")) {
            return Err(format!("Device {} is not in a managed state", name));
        }
        let is_ap = device.family.as_deref() == Some(AP_FAMILY);
        match (self, is_ap) {
            (DeviceFilter::FabricDevice, true) => Err(format!("Device {} is an access point", name)),
            (DeviceFilter::AccessPoint, false) => Err(format!("Device {} is not an access point", name)),
            _ => Ok(()),
        }
    }
}

/// Per-entry handle resolver with lookup cache
pub struct Resolver<'a> {
    client: &'a dyn ControllerClientTrait,
    devices: HashMap<DeviceHandle, Option<NetworkDevice>>,
    devices_by_id: HashMap<String, Option<NetworkDevice>>,
    sites: HashMap<String, Option<String>>,
    fabric_sites: HashMap<String, Option<String>>,
    interfaces: HashMap<(String, String), Option<DeviceInterface>>,
    site_devices: HashMap<String, Vec<String>>,
}

impl std::fmt::Debug for Resolver<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resolver")
            .field("devices", &self.devices.len())
            .field("sites", &self.sites.len())
            .field("interfaces", &self.interfaces.len())
            .finish()
    }
}

impl<'a> Resolver<'a> {
    pub fn new(client: &'a dyn ControllerClientTrait) -> Self {
        Self {
            client,
            devices: HashMap::new(),
            devices_by_id: HashMap::new(),
            sites: HashMap::new(),
            fabric_sites: HashMap::new(),
            interfaces: HashMap::new(),
            site_devices: HashMap::new(),
        }
    }

    /// Resolve a device handle
    pub async fn device(&mut self, handle: &DeviceHandle) -> Result<NetworkDevice, WorkflowError> {
        if let Some(cached) = self.devices.get(handle) {
            return cached
                .clone()
                .ok_or_else(|| WorkflowError::HandleNotFound(DEVICE_NOT_FOUND.to_string()));
        }

        let found = self
            .client
            .query_network_devices(&[(handle.query_field(), handle.value())], 1, paginator::PAGE_LIMIT)
            .await?
            .into_iter()
            .next();
        match &found {
            Some(device) => {
                debug!("Resolved {} to device {}", handle, device.id);
                self.devices_by_id.insert(device.id.clone(), found.clone());
            }
            None => warn!("{} not found in Controller inventory", handle),
        }
        self.devices.insert(handle.clone(), found.clone());
        found.ok_or_else(|| WorkflowError::HandleNotFound(DEVICE_NOT_FOUND.to_string()))
    }

    /// Resolve a device handle and apply an eligibility filter
    pub async fn eligible_device(
        &mut self,
        handle: &DeviceHandle,
        filter: DeviceFilter,
    ) -> Result<NetworkDevice, WorkflowError> {
        let device = self.device(handle).await?;
        filter.check(&device).map_err(WorkflowError::HandleNotFound)?;
        Ok(device)
    }

    /// Look up a device by Controller id
    pub async fn device_by_id(&mut self, id: &str) -> Result<NetworkDevice, WorkflowError> {
        if let Some(cached) = self.devices_by_id.get(id) {
            return cached
                .clone()
                .ok_or_else(|| WorkflowError::HandleNotFound(DEVICE_NOT_FOUND.to_string()));
        }
        let found = self
            .client
            .query_network_devices(&[("id", id)], 1, paginator::PAGE_LIMIT)
            .await?
            .into_iter()
            .next();
        self.devices_by_id.insert(id.to_string(), found.clone());
        found.ok_or_else(|| WorkflowError::HandleNotFound(DEVICE_NOT_FOUND.to_string()))
    }

    /// Resolve a site path (`Global/Area/Building/Floor`) to its id
    pub async fn site_id(&mut self, path: &str) -> Result<String, WorkflowError> {
        if !self.sites.contains_key(path) {
            let site = self
                .client
                .query_sites(path)
                .await?
                .into_iter()
                .find(|s| s.name_hierarchy == path)
                .map(|s| s.id);
            debug!("Resolved site {} to {:?}", path, site);
            self.sites.insert(path.to_string(), site);
        }
        self.sites
            .get(path)
            .cloned()
            .flatten()
            .ok_or_else(|| WorkflowError::HandleNotFound(format!("Site '{}' doesn't exist in Controller", path)))
    }

    /// Resolve a site path to the fabric id of that site
    pub async fn fabric_id(&mut self, path: &str) -> Result<String, WorkflowError> {
        let site_id = self.site_id(path).await?;
        if !self.fabric_sites.contains_key(&site_id) {
            let fabric = self.client.query_fabric_sites(&site_id).await?.into_iter().next().map(|f| f.id);
            self.fabric_sites.insert(site_id.clone(), fabric);
        }
        self.fabric_sites
            .get(&site_id)
            .cloned()
            .flatten()
            .ok_or_else(|| WorkflowError::HandleNotFound(format!("Site '{}' is not a fabric site", path)))
    }

    /// Ids of every device assigned to a site
    pub async fn site_device_ids(&mut self, path: &str) -> Result<Vec<String>, WorkflowError> {
        if let Some(cached) = self.site_devices.get(path) {
            return Ok(cached.clone());
        }
        let site_id = self.site_id(path).await?;
        let client = self.client;
        let members = paginator::fetch_all(|offset, limit| client.query_site_assigned_devices(&site_id, offset, limit))
            .await?;
        let ids: Vec<String> = members.into_iter().map(|m| m.device_id).collect();
        debug!("Site {} has {} assigned devices", path, ids.len());
        self.site_devices.insert(path.to_string(), ids.clone());
        Ok(ids)
    }

    /// Whether a device is assigned to a site
    pub async fn is_assigned_to_site(&mut self, device_id: &str, path: &str) -> Result<bool, WorkflowError> {
        Ok(self.site_device_ids(path).await?.iter().any(|id| id == device_id))
    }

    /// Resolve an interface on a device
    ///
    /// A 404 mentioning "No resource found with deviceId" is a soft miss.
    pub async fn interface(&mut self, device_id: &str, name: &str) -> Result<DeviceInterface, WorkflowError> {
        let key = (device_id.to_string(), name.to_string());
        if !self.interfaces.contains_key(&key) {
            let found = match self.client.get_interface_by_name(device_id, name).await {
                Ok(interface) => Some(interface),
                Err(e) if e.is_missing_device_resource() => {
                    warn!("Interface {} not found on device {}", name, device_id);
                    None
                }
                Err(e) => return Err(e.into()),
            };
            self.interfaces.insert(key.clone(), found);
        }
        self.interfaces
            .get(&key)
            .cloned()
            .flatten()
            .ok_or_else(|| WorkflowError::HandleNotFound(INTERFACE_NOT_FOUND.to_string()))
    }

    /// Resolve several interfaces of one device concurrently
    pub async fn interfaces(
        &mut self,
        device_id: &str,
        names: &[String],
    ) -> Result<Vec<(String, Result<DeviceInterface, WorkflowError>)>, WorkflowError> {
        let client = self.client;
        let missing: Vec<&String> = names
            .iter()
            .filter(|n| !self.interfaces.contains_key(&(device_id.to_string(), (*n).clone())))
            .collect();
        let fetched: Vec<(&String, Result<DeviceInterface, ApiError>)> =
            futures::future::join_all(missing.into_iter().map(|name| async move {
                (name, client.get_interface_by_name(device_id, name).await)
            }))
            .await;
        for (name, result) in fetched {
            let found = match result {
                Ok(interface) => Some(interface),
                Err(e) if e.is_missing_device_resource() => None,
                Err(e) => return Err(e.into()),
            };
            self.interfaces.insert((device_id.to_string(), name.clone()), found);
        }

        let mut resolved = Vec::with_capacity(names.len());
        for name in names {
            resolved.push((name.clone(), self.interface(device_id, name).await));
        }
        Ok(resolved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use controller_client::{FabricSite, MockControllerClient, Site};

    fn switch(id: &str, ip: &str) -> NetworkDevice {
        NetworkDevice {
            id: id.to_string(),
            hostname: Some(format!("{}.campus", id)),
            management_ip_address: Some(ip.to_string()),
            family: Some("Switches and Hubs".to_string()),
            reachability_status: Some("Reachable".to_string()),
            collection_status: Some("Managed".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_handle_parse_validates() {
        assert_eq!(
            DeviceHandle::parse("mac_address", "AA-BB-CC-DD-EE-FF").unwrap(),
            DeviceHandle::Mac("aa:bb:cc:dd:ee:ff".to_string())
        );
        assert!(DeviceHandle::parse("ip_address", "10.0.0").is_err());
        assert!(DeviceHandle::parse("serial_number", "ABC").is_err());
        assert_eq!(DeviceHandle::parse("hostname", "edge-1").unwrap().query_field(), "hostname");
    }

    #[test]
    fn test_filters() {
        let mut device = switch("d1", "10.0.0.1");
        assert!(DeviceFilter::FabricDevice.check(&device).is_ok());
        assert!(DeviceFilter::AccessPoint.check(&device).is_err());

        device.collection_status = Some("In Progress".to_string());
        assert!(DeviceFilter::FabricDevice.check(&device).is_ok());

        device.reachability_status = Some("Unreachable".to_string());
        assert!(DeviceFilter::FabricDevice.check(&device).is_err());
        assert!(DeviceFilter::Any.check(&device).is_ok());

        let mut ap = switch("ap1", "10.0.0.2");
        ap.family = Some("Unified AP".to_string());
        assert!(DeviceFilter::AccessPoint.check(&ap).is_ok());
        assert!(DeviceFilter::FabricDevice.check(&ap).is_err());
    }

    #[tokio::test]
    async fn test_device_miss_is_soft_and_cached() {
        let mock = MockControllerClient::new("https://mock");
        mock.add_device(switch("d1", "10.0.0.1"));
        let mut resolver = Resolver::new(&mock);

        let found = resolver.device(&DeviceHandle::Ip("10.0.0.1".into())).await.unwrap();
        assert_eq!(found.id, "d1");

        let miss = resolver.device(&DeviceHandle::Ip("10.0.0.9".into())).await.unwrap_err();
        assert!(!miss.is_fatal());
        assert_eq!(miss.reason(), DEVICE_NOT_FOUND);

        // Cached: a device added later is not seen by this resolver
        mock.add_device(switch("d9", "10.0.0.9"));
        assert!(resolver.device(&DeviceHandle::Ip("10.0.0.9".into())).await.is_err());
    }

    #[tokio::test]
    async fn test_fabric_resolution() {
        let mock = MockControllerClient::new("https://mock");
        mock.add_site(Site {
            id: "s1".into(),
            name_hierarchy: "Global/USA/SJ".into(),
            site_type: Some("building".into()),
        });
        mock.add_site(Site {
            id: "s2".into(),
            name_hierarchy: "Global/USA/NY".into(),
            site_type: Some("building".into()),
        });
        mock.add_fabric_site(FabricSite {
            id: "f1".into(),
            site_id: "s1".into(),
            ..Default::default()
        });
        let mut resolver = Resolver::new(&mock);

        assert_eq!(resolver.fabric_id("Global/USA/SJ").await.unwrap(), "f1");
        let not_fabric = resolver.fabric_id("Global/USA/NY").await.unwrap_err();
        assert!(not_fabric.reason().contains("not a fabric site"));
        assert!(resolver.site_id("Global/USA/LA").await.is_err());
    }

    #[tokio::test]
    async fn test_interface_soft_miss() {
        let mock = MockControllerClient::new("https://mock");
        mock.add_interface(DeviceInterface {
            id: "if1".into(),
            device_id: Some("d1".into()),
            port_name: "GigabitEthernet1/0/1".into(),
            ..Default::default()
        });
        let mut resolver = Resolver::new(&mock);

        let resolved = resolver
            .interfaces("d1", &["GigabitEthernet1/0/1".to_string(), "GigabitEthernet1/0/2".to_string()])
            .await
            .unwrap();
        assert_eq!(resolved[0].1.as_ref().unwrap().id, "if1");
        assert_eq!(resolved[1].1.as_ref().unwrap_err().reason(), INTERFACE_NOT_FOUND);
    }
}
