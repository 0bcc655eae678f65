//! SDA host onboarding config entries and their canonical form.

use crate::config::State;
use crate::error::WorkflowError;
use crate::resolver::DeviceHandle;
use crate::validate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

pub const NO_AUTHENTICATION: &str = "No Authentication";
pub const CLOSED_AUTHENTICATION: &str = "Closed Authentication";

const AUTHENTICATION_TEMPLATES: [&str; 4] =
    [NO_AUTHENTICATION, "Open Authentication", CLOSED_AUTHENTICATION, "Low Impact"];

/// Interfaces allowed in an `ON`/`PAGP` channel
pub const MAX_STATIC_CHANNEL_MEMBERS: usize = 8;
/// Interfaces allowed in an `LACP` channel
pub const MAX_LACP_CHANNEL_MEMBERS: usize = 16;

/// One `config` entry of the SDA host onboarding workflow
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SdaHostPortEntry {
    #[serde(default)]
    pub ip_address: Option<String>,
    #[serde(default)]
    pub hostname: Option<String>,
    #[serde(default)]
    pub fabric_site_name_hierarchy: Option<String>,
    #[serde(default)]
    pub port_assignments: Vec<PortAssignmentSpec>,
    #[serde(default)]
    pub port_channels: Vec<PortChannelSpec>,
    #[serde(default)]
    pub vlans_and_ssids_mapped_to_vlans: Vec<VlanSsidSpec>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PortAssignmentSpec {
    pub interface_name: String,
    #[serde(default)]
    pub connected_device_type: Option<String>,
    #[serde(default)]
    pub data_vlan_name: Option<String>,
    #[serde(default)]
    pub voice_vlan_name: Option<String>,
    #[serde(default)]
    pub authentication_template_name: Option<String>,
    #[serde(default)]
    pub security_group_name: Option<String>,
    #[serde(default)]
    pub interface_description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PortChannelSpec {
    #[serde(default)]
    pub interface_names: Vec<String>,
    #[serde(default)]
    pub connected_device_type: Option<String>,
    #[serde(default)]
    pub protocol: Option<String>,
    #[serde(default)]
    pub port_channel_description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VlanSsidSpec {
    pub vlan_name: String,
    #[serde(default)]
    pub ssid_details: Option<Vec<SsidSpec>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SsidSpec {
    pub ssid_name: String,
    #[serde(default)]
    pub security_group_name: Option<String>,
}

// ============================================================================
// Canonical form
// ============================================================================

/// Role of the device behind a port assignment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectedDeviceType {
    UserDevice,
    AccessPoint,
    TrunkingDevice,
}

impl ConnectedDeviceType {
    pub fn as_str(self) -> &'static str {
        match self {
            ConnectedDeviceType::UserDevice => "USER_DEVICE",
            ConnectedDeviceType::AccessPoint => "ACCESS_POINT",
            ConnectedDeviceType::TrunkingDevice => "TRUNKING_DEVICE",
        }
    }

    fn parse(value: &str) -> Result<Self, WorkflowError> {
        match validate::one_of(
            "connected_device_type",
            value,
            &["USER_DEVICE", "ACCESS_POINT", "TRUNKING_DEVICE"],
        )?
        .as_str()
        {
            "USER_DEVICE" => Ok(ConnectedDeviceType::UserDevice),
            "ACCESS_POINT" => Ok(ConnectedDeviceType::AccessPoint),
            _ => Ok(ConnectedDeviceType::TrunkingDevice),
        }
    }
}

/// Canonical port assignment request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortAssignmentWant {
    pub interface_name: String,
    /// `None` only on `deleted`
    pub connected_device_type: Option<ConnectedDeviceType>,
    pub data_vlan_name: Option<String>,
    pub voice_vlan_name: Option<String>,
    pub authentication_template_name: Option<String>,
    pub security_group_name: Option<String>,
    pub interface_description: Option<String>,
}

/// Role of the device behind a port channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelDeviceType {
    Trunk,
    ExtendedNode,
}

impl ChannelDeviceType {
    pub fn as_str(self) -> &'static str {
        match self {
            ChannelDeviceType::Trunk => "TRUNK",
            ChannelDeviceType::ExtendedNode => "EXTENDED_NODE",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "TRUNK" => Some(ChannelDeviceType::Trunk),
            "EXTENDED_NODE" => Some(ChannelDeviceType::ExtendedNode),
            _ => None,
        }
    }

    /// Protocol used when a new channel does not name one
    pub fn default_protocol(self) -> ChannelProtocol {
        match self {
            ChannelDeviceType::Trunk => ChannelProtocol::On,
            ChannelDeviceType::ExtendedNode => ChannelProtocol::Pagp,
        }
    }
}

/// Port channel negotiation protocol; immutable once created
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelProtocol {
    On,
    Lacp,
    Pagp,
}

impl ChannelProtocol {
    pub fn as_str(self) -> &'static str {
        match self {
            ChannelProtocol::On => "ON",
            ChannelProtocol::Lacp => "LACP",
            ChannelProtocol::Pagp => "PAGP",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "ON" => Some(ChannelProtocol::On),
            "LACP" => Some(ChannelProtocol::Lacp),
            "PAGP" => Some(ChannelProtocol::Pagp),
            _ => None,
        }
    }

    pub fn max_members(self) -> usize {
        match self {
            ChannelProtocol::Lacp => MAX_LACP_CHANNEL_MEMBERS,
            ChannelProtocol::On | ChannelProtocol::Pagp => MAX_STATIC_CHANNEL_MEMBERS,
        }
    }
}

/// Canonical port channel request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortChannelWant {
    /// Member interfaces in config order, without duplicates
    pub interface_names: Vec<String>,
    /// `None` keeps the type of an existing channel; new channels default to TRUNK
    pub connected_device_type: Option<ChannelDeviceType>,
    pub protocol: Option<ChannelProtocol>,
    pub description: Option<String>,
}

impl PortChannelWant {
    pub fn interface_set(&self) -> BTreeSet<&str> {
        self.interface_names.iter().map(String::as_str).collect()
    }

    /// Label used in outcomes
    pub fn label(&self) -> String {
        self.interface_names.join(",")
    }
}

/// Canonical SSID entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SsidWant {
    pub name: String,
    pub security_group_tag: Option<String>,
}

/// Canonical VLAN entry; `ssids == None` on `deleted` removes the whole VLAN
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VlanSsidWant {
    pub vlan_name: String,
    pub ssids: Option<Vec<SsidWant>>,
}

/// Canonical SDA entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SdaWant {
    pub fabric_site: String,
    pub device: Option<DeviceHandle>,
    pub port_assignments: Vec<PortAssignmentWant>,
    pub port_channels: Vec<PortChannelWant>,
    pub vlan_ssids: Vec<VlanSsidWant>,
    /// `deleted` with a device and no lists: remove everything on the device
    pub delete_all: bool,
}

impl SdaWant {
    /// Validate and canonicalize one entry
    pub fn from_entry(entry: &SdaHostPortEntry, state: State) -> Result<Self, WorkflowError> {
        let fabric_site =
            validate::required("fabric_site_name_hierarchy", entry.fabric_site_name_hierarchy.as_deref())?.to_string();

        let device = match (
            validate::non_empty(entry.ip_address.as_deref()),
            validate::non_empty(entry.hostname.as_deref()),
        ) {
            (Some(ip), _) => Some(DeviceHandle::parse("ip_address", &ip)?),
            (None, Some(hostname)) => Some(DeviceHandle::parse("hostname", &hostname)?),
            (None, None) => None,
        };

        let needs_device = !entry.port_assignments.is_empty() || !entry.port_channels.is_empty();
        if needs_device && device.is_none() {
            return Err(WorkflowError::InvalidInput(
                "ip_address or hostname is required for port_assignments and port_channels".to_string(),
            ));
        }
        let delete_all = state == State::Deleted
            && device.is_some()
            && !needs_device
            && entry.vlans_and_ssids_mapped_to_vlans.is_empty();
        if device.is_none() && entry.vlans_and_ssids_mapped_to_vlans.is_empty() {
            return Err(WorkflowError::InvalidInput(
                "entry has nothing to do; give a device or vlans_and_ssids_mapped_to_vlans".to_string(),
            ));
        }

        let mut seen = BTreeSet::new();
        let mut port_assignments = Vec::new();
        for spec in &entry.port_assignments {
            let want = canonical_port_assignment(spec, state)?;
            if !seen.insert(want.interface_name.clone()) {
                return Err(WorkflowError::InvalidInput(format!(
                    "interface {} is listed more than once",
                    want.interface_name
                )));
            }
            port_assignments.push(want);
        }

        let mut port_channels = Vec::new();
        for spec in &entry.port_channels {
            let want = canonical_port_channel(spec, state)?;
            for name in &want.interface_names {
                if !seen.insert(name.clone()) {
                    return Err(WorkflowError::InvalidInput(format!("interface {} is listed more than once", name)));
                }
            }
            port_channels.push(want);
        }

        let vlan_ssids = entry
            .vlans_and_ssids_mapped_to_vlans
            .iter()
            .map(|spec| canonical_vlan(spec, state))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            fabric_site,
            device,
            port_assignments,
            port_channels,
            vlan_ssids,
            delete_all,
        })
    }
}

fn canonical_port_assignment(spec: &PortAssignmentSpec, state: State) -> Result<PortAssignmentWant, WorkflowError> {
    let interface_name = validate::required("interface_name", Some(spec.interface_name.as_str()))?.to_string();
    let connected_device_type = spec
        .connected_device_type
        .as_deref()
        .map(ConnectedDeviceType::parse)
        .transpose()?;
    let mut template = validate::optional_one_of(
        "authentication_template_name",
        spec.authentication_template_name.as_deref(),
        &AUTHENTICATION_TEMPLATES,
    )?;
    let data_vlan_name = validate::non_empty(spec.data_vlan_name.as_deref());
    let voice_vlan_name = validate::non_empty(spec.voice_vlan_name.as_deref());
    let security_group_name = validate::non_empty(spec.security_group_name.as_deref());

    if state == State::Merged {
        let kind = connected_device_type.ok_or_else(|| {
            WorkflowError::InvalidInput(format!("connected_device_type is required for {}", interface_name))
        })?;
        match kind {
            ConnectedDeviceType::TrunkingDevice => {
                if template.as_deref().is_some_and(|t| t != NO_AUTHENTICATION) {
                    return Err(WorkflowError::InvalidInput(format!(
                        "TRUNKING_DEVICE on {} requires authentication_template_name '{}'",
                        interface_name, NO_AUTHENTICATION
                    )));
                }
                template = Some(NO_AUTHENTICATION.to_string());
            }
            ConnectedDeviceType::UserDevice => {
                if security_group_name.is_some() {
                    if template.as_deref().is_some_and(|t| t != NO_AUTHENTICATION) {
                        return Err(WorkflowError::InvalidInput(format!(
                            "security_group_name on {} requires authentication_template_name '{}'",
                            interface_name, NO_AUTHENTICATION
                        )));
                    }
                    template = Some(NO_AUTHENTICATION.to_string());
                }
                let closed = template.as_deref() == Some(CLOSED_AUTHENTICATION);
                if data_vlan_name.is_none() && voice_vlan_name.is_none() && !closed {
                    return Err(WorkflowError::InvalidInput(format!(
                        "USER_DEVICE on {} needs data_vlan_name or voice_vlan_name",
                        interface_name
                    )));
                }
            }
            ConnectedDeviceType::AccessPoint => {
                if data_vlan_name.is_none() {
                    return Err(WorkflowError::InvalidInput(format!(
                        "ACCESS_POINT on {} needs data_vlan_name",
                        interface_name
                    )));
                }
            }
        }
    }

    Ok(PortAssignmentWant {
        interface_name,
        connected_device_type,
        data_vlan_name,
        voice_vlan_name,
        authentication_template_name: template,
        security_group_name,
        interface_description: validate::non_empty(spec.interface_description.as_deref()),
    })
}

fn canonical_port_channel(spec: &PortChannelSpec, state: State) -> Result<PortChannelWant, WorkflowError> {
    let mut interface_names: Vec<String> = Vec::new();
    for name in spec.interface_names.iter().filter_map(|n| validate::non_empty(Some(n.as_str()))) {
        if !interface_names.contains(&name) {
            interface_names.push(name);
        }
    }
    if interface_names.is_empty() {
        return Err(WorkflowError::InvalidInput("port_channels.interface_names must not be empty".to_string()));
    }

    let connected_device_type = spec
        .connected_device_type
        .as_deref()
        .map(|value| {
            ChannelDeviceType::parse(value).ok_or_else(|| {
                WorkflowError::InvalidInput(format!(
                    "'{}' is not a valid connected_device_type; expected one of: TRUNK, EXTENDED_NODE",
                    value
                ))
            })
        })
        .transpose()?;
    let protocol = spec
        .protocol
        .as_deref()
        .map(|value| {
            ChannelProtocol::parse(value).ok_or_else(|| {
                WorkflowError::InvalidInput(format!(
                    "'{}' is not a valid protocol; expected one of: ON, LACP, PAGP",
                    value
                ))
            })
        })
        .transpose()?;

    if state == State::Merged {
        let limit = protocol.map_or(MAX_LACP_CHANNEL_MEMBERS, ChannelProtocol::max_members);
        if interface_names.len() > limit {
            return Err(WorkflowError::InvalidInput(format!(
                "port channel {} has {} interfaces, at most {} allowed",
                interface_names.join(","),
                interface_names.len(),
                limit
            )));
        }
    }

    Ok(PortChannelWant {
        interface_names,
        connected_device_type,
        protocol,
        description: validate::non_empty(spec.port_channel_description.as_deref()),
    })
}

fn canonical_vlan(spec: &VlanSsidSpec, state: State) -> Result<VlanSsidWant, WorkflowError> {
    let vlan_name = validate::required("vlan_name", Some(spec.vlan_name.as_str()))?.to_string();
    let ssids = spec
        .ssid_details
        .as_ref()
        .map(|details| {
            details
                .iter()
                .map(|d| -> Result<SsidWant, WorkflowError> {
                    Ok(SsidWant {
                        name: validate::required("ssid_name", Some(d.ssid_name.as_str()))?.to_string(),
                        security_group_tag: validate::non_empty(d.security_group_name.as_deref()),
                    })
                })
                .collect::<Result<Vec<_>, _>>()
        })
        .transpose()?;
    if state == State::Merged && ssids.as_ref().is_none_or(Vec::is_empty) {
        return Err(WorkflowError::InvalidInput(format!("ssid_details is required for VLAN {}", vlan_name)));
    }
    Ok(VlanSsidWant { vlan_name, ssids })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(yaml: &str) -> SdaHostPortEntry {
        serde_yaml::from_str(yaml).unwrap()
    }

    const BASE: &str = "ip_address: 10.10.0.1\nfabric_site_name_hierarchy: Global/USA/SJC/BLD23\n";

    #[test]
    fn test_trunking_device_defaults_template() {
        let e = entry(&format!(
            "{}port_assignments:\n  - interface_name: Gi1/0/1\n    connected_device_type: trunking_device\n",
            BASE
        ));
        let want = SdaWant::from_entry(&e, State::Merged).unwrap();
        let pa = &want.port_assignments[0];
        assert_eq!(pa.connected_device_type, Some(ConnectedDeviceType::TrunkingDevice));
        assert_eq!(pa.authentication_template_name.as_deref(), Some(NO_AUTHENTICATION));

        let bad = entry(&format!(
            "{}port_assignments:\n  - interface_name: Gi1/0/1\n    connected_device_type: TRUNKING_DEVICE\n    authentication_template_name: Open Authentication\n",
            BASE
        ));
        assert!(SdaWant::from_entry(&bad, State::Merged).is_err());
    }

    #[test]
    fn test_user_device_constraints() {
        let no_vlan = entry(&format!(
            "{}port_assignments:\n  - interface_name: Gi1/0/1\n    connected_device_type: USER_DEVICE\n",
            BASE
        ));
        assert!(SdaWant::from_entry(&no_vlan, State::Merged).is_err());

        let closed = entry(&format!(
            "{}port_assignments:\n  - interface_name: Gi1/0/1\n    connected_device_type: USER_DEVICE\n    authentication_template_name: closed authentication\n",
            BASE
        ));
        let want = SdaWant::from_entry(&closed, State::Merged).unwrap();
        assert_eq!(
            want.port_assignments[0].authentication_template_name.as_deref(),
            Some(CLOSED_AUTHENTICATION)
        );

        let sgt = entry(&format!(
            "{}port_assignments:\n  - interface_name: Gi1/0/1\n    connected_device_type: USER_DEVICE\n    data_vlan_name: DATA\n    security_group_name: Employees\n",
            BASE
        ));
        let want = SdaWant::from_entry(&sgt, State::Merged).unwrap();
        assert_eq!(
            want.port_assignments[0].authentication_template_name.as_deref(),
            Some(NO_AUTHENTICATION)
        );
    }

    #[test]
    fn test_device_required_for_ports() {
        let e = entry(
            "fabric_site_name_hierarchy: Global/USA/SJC/BLD23\nport_assignments:\n  - interface_name: Gi1/0/1\n    connected_device_type: USER_DEVICE\n    data_vlan_name: DATA\n",
        );
        assert!(SdaWant::from_entry(&e, State::Merged).is_err());

        let vlans_only = entry(
            "fabric_site_name_hierarchy: Global/USA/SJC/BLD23\nvlans_and_ssids_mapped_to_vlans:\n  - vlan_name: V1\n    ssid_details:\n      - ssid_name: A\n",
        );
        assert!(SdaWant::from_entry(&vlans_only, State::Merged).unwrap().device.is_none());
    }

    #[test]
    fn test_port_channel_limits_and_duplicates() {
        let ports: Vec<String> = (1..=9).map(|n| format!("Gi1/0/{}", n)).collect();
        let e = entry(&format!(
            "{}port_channels:\n  - interface_names: [{}]\n    protocol: ON\n",
            BASE,
            ports.join(", ")
        ));
        assert!(SdaWant::from_entry(&e, State::Merged).is_err());

        let lacp = entry(&format!(
            "{}port_channels:\n  - interface_names: [{}]\n    protocol: LACP\n",
            BASE,
            ports.join(", ")
        ));
        assert!(SdaWant::from_entry(&lacp, State::Merged).is_ok());

        let empty = entry(&format!("{}port_channels:\n  - interface_names: []\n", BASE));
        assert!(SdaWant::from_entry(&empty, State::Merged).is_err());

        let duplicate = entry(&format!(
            "{}port_assignments:\n  - interface_name: Gi1/0/1\n    connected_device_type: TRUNKING_DEVICE\nport_channels:\n  - interface_names: [Gi1/0/1, Gi1/0/2]\n",
            BASE
        ));
        assert!(SdaWant::from_entry(&duplicate, State::Merged).is_err());
    }

    #[test]
    fn test_delete_all_when_only_device_given() {
        let e = entry(BASE);
        assert!(SdaWant::from_entry(&e, State::Deleted).unwrap().delete_all);
        assert!(!SdaWant::from_entry(&e, State::Merged).unwrap().delete_all);
    }

    #[test]
    fn test_vlan_needs_ssids_on_merged() {
        let e = entry(&format!("{}vlans_and_ssids_mapped_to_vlans:\n  - vlan_name: V1\n", BASE));
        assert!(SdaWant::from_entry(&e, State::Merged).is_err());
        let want = SdaWant::from_entry(&e, State::Deleted).unwrap();
        assert_eq!(want.vlan_ssids[0].ssids, None);
    }
}
