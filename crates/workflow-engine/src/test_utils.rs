//! Test utilities shared by the workflow tests
//!
//! Builders for inventory records and a mock Controller seeded with a small
//! campus: one fabric site with a reachable edge switch.

use crate::config::RunOptions;
use controller_client::{DeviceInterface, FabricSite, MockControllerClient, NetworkDevice, Site};
use serde::de::DeserializeOwned;

pub const FABRIC_SITE: &str = "Global/USA/SJC/BLD23";
pub const FABRIC_SITE_ID: &str = "site-bld23";
pub const FABRIC_ID: &str = "fabric-bld23";
pub const EDGE_ID: &str = "dev-edge1";
pub const EDGE_IP: &str = "10.10.0.1";

/// Parse a YAML fixture
pub fn yaml<T: DeserializeOwned>(source: &str) -> T {
    serde_yaml::from_str(source).unwrap()
}

/// Run options without settle delay
pub fn options() -> RunOptions {
    RunOptions {
        settle_interval: 0,
        poll_interval: 1,
        ..Default::default()
    }
}

/// Reachable, managed switch
pub fn switch(id: &str, hostname: &str, ip: &str) -> NetworkDevice {
    NetworkDevice {
        id: id.to_string(),
        hostname: Some(hostname.to_string()),
        management_ip_address: Some(ip.to_string()),
        family: Some("Switches and Hubs".to_string()),
        series: Some("Cisco Catalyst 9300 Series Switches".to_string()),
        reachability_status: Some("Reachable".to_string()),
        collection_status: Some("Managed".to_string()),
        role: Some("ACCESS".to_string()),
        ..Default::default()
    }
}

/// Reachable, managed access point
pub fn access_point(id: &str, hostname: &str, radio_mac: &str, eth_mac: &str) -> NetworkDevice {
    NetworkDevice {
        id: id.to_string(),
        hostname: Some(hostname.to_string()),
        management_ip_address: Some(format!("10.20.0.{}", id.len())),
        mac_address: Some(radio_mac.to_string()),
        ap_ethernet_mac_address: Some(eth_mac.to_string()),
        family: Some("Unified AP".to_string()),
        series: Some("Cisco Catalyst 9130AXI Series Access Points".to_string()),
        reachability_status: Some("Reachable".to_string()),
        collection_status: Some("Managed".to_string()),
        associated_wlc_ip: Some("10.0.0.1".to_string()),
        ..Default::default()
    }
}

pub fn interface(id: &str, device_id: &str, port_name: &str) -> DeviceInterface {
    DeviceInterface {
        id: id.to_string(),
        device_id: Some(device_id.to_string()),
        port_name: port_name.to_string(),
        status: Some("up".to_string()),
        admin_status: Some("UP".to_string()),
        ..Default::default()
    }
}

pub fn site(id: &str, path: &str) -> Site {
    Site {
        id: id.to_string(),
        name_hierarchy: path.to_string(),
        site_type: Some("building".to_string()),
    }
}

/// Mock Controller with one fabric site and an edge switch assigned to it
pub fn campus() -> MockControllerClient {
    let mock = MockControllerClient::new("https://controller.test");
    mock.add_site(site(FABRIC_SITE_ID, FABRIC_SITE));
    mock.add_fabric_site(FabricSite {
        id: FABRIC_ID.to_string(),
        site_id: FABRIC_SITE_ID.to_string(),
        ..Default::default()
    });
    mock.add_device(switch(EDGE_ID, "edge1.campus", EDGE_IP));
    mock.assign_device_to_site(EDGE_ID, FABRIC_SITE_ID);
    for (n, port) in ["GigabitEthernet1/0/1", "GigabitEthernet1/0/2", "GigabitEthernet1/0/3", "GigabitEthernet1/0/4"]
        .iter()
        .enumerate()
    {
        mock.add_interface(interface(&format!("if-edge1-{}", n + 1), EDGE_ID, port));
    }
    mock
}
