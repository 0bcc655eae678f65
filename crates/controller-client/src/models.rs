//! Controller API models
//!
//! These models match the JSON bodies of the Controller intent API.
//! Field names are camelCase on the wire; every optional attribute defaults so
//! partially populated records from older releases still deserialize.

use serde::{Deserialize, Serialize};

/// Response envelope wrapping every intent API payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub response: T,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

/// Handle returned by asynchronous writes on the task-id model
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskCreated {
    pub task_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// Handle returned by asynchronous writes on the legacy execution-id model
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionCreated {
    pub execution_id: String,
    #[serde(default)]
    pub execution_status_url: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Task record from `GET /dna/intent/api/v1/tasks/{id}`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub start_time: Option<i64>, // epoch millis
    #[serde(default)]
    pub end_time: Option<i64>, // epoch millis, set once the task is terminal
    #[serde(default)]
    pub result_location: Option<String>,
    #[serde(default)]
    pub error_code: Option<String>,
}

impl Task {
    /// A task is terminal once the Controller stamps an end time
    pub fn is_terminal(&self) -> bool {
        self.end_time.is_some()
    }

    /// Whether the task finished with `SUCCESS`
    pub fn is_success(&self) -> bool {
        self.status.as_deref() == Some("SUCCESS")
    }
}

/// Task detail record, used to surface failure reasons
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskDetail {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub failure_reason: Option<String>,
    #[serde(default)]
    pub progress: Option<String>,
    #[serde(default)]
    pub data: Option<String>,
    #[serde(default)]
    pub is_error: Option<bool>,
}

/// Status of a legacy execution-id operation
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionStatus {
    pub status: String, // IN_PROGRESS, SUCCESS, FAILURE
    #[serde(default)]
    pub bapi_error: Option<String>,
    #[serde(default)]
    pub start_time: Option<i64>,
    #[serde(default)]
    pub end_time: Option<i64>,
}

/// Controller release information
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseInfo {
    pub display_version: String,
}

// ============================================================================
// Inventory
// ============================================================================

/// Network device from the inventory API
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkDevice {
    pub id: String,
    #[serde(default)]
    pub hostname: Option<String>,
    #[serde(default)]
    pub management_ip_address: Option<String>,
    #[serde(default)]
    pub mac_address: Option<String>,
    #[serde(default)]
    pub serial_number: Option<String>,
    #[serde(default)]
    pub family: Option<String>,
    #[serde(default)]
    pub series: Option<String>,
    #[serde(default)]
    pub software_version: Option<String>,
    #[serde(default)]
    pub reachability_status: Option<String>,
    #[serde(default)]
    pub collection_status: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub ap_ethernet_mac_address: Option<String>,
    #[serde(default)]
    pub associated_wlc_ip: Option<String>,
    #[serde(default)]
    pub location_name: Option<String>,
}

/// Interface on a network device
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceInterface {
    pub id: String,
    #[serde(default)]
    pub device_id: Option<String>,
    pub port_name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub admin_status: Option<String>,
    #[serde(default)]
    pub speed: Option<String>,
}

// ============================================================================
// Sites
// ============================================================================

/// Site in the hierarchy (`Global/Area/Building/Floor`)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Site {
    pub id: String,
    pub name_hierarchy: String,
    #[serde(default, rename = "type")]
    pub site_type: Option<String>,
}

/// Fabric annotation of a site
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FabricSite {
    pub id: String,
    pub site_id: String,
    #[serde(default)]
    pub authentication_profile_name: Option<String>,
    #[serde(default)]
    pub is_pub_sub_enabled: Option<bool>,
}

/// Device-to-site assignment record
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteMembership {
    pub device_id: String,
    pub site_id: String,
    #[serde(default)]
    pub site_name_hierarchy: Option<String>,
}

// ============================================================================
// SDA host onboarding
// ============================================================================

/// Port assignment on a fabric edge device
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortAssignment {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub fabric_id: String,
    pub network_device_id: String,
    pub interface_name: String,
    pub connected_device_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_vlan_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voice_vlan_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authenticate_template_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub security_group_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interface_description: Option<String>,
}

/// Port channel on a fabric edge device
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortChannel {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub fabric_id: String,
    pub network_device_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port_channel_name: Option<String>,
    pub interface_names: Vec<String>,
    pub connected_device_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protocol: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port_channel_description: Option<String>,
}

/// VLAN to SSID mapping on a fabric site
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VlanSsidMapping {
    pub vlan_name: String,
    #[serde(default)]
    pub ssid_details: Vec<SsidDetail>,
}

/// SSID entry of a VLAN mapping
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SsidDetail {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub security_group_tag: Option<String>,
}

// ============================================================================
// Tags
// ============================================================================

/// Kind of entity a tag can be attached to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum MemberType {
    #[serde(rename = "networkdevice")]
    NetworkDevice,
    #[serde(rename = "interface")]
    Interface,
}

impl MemberType {
    /// Wire name used in query strings and payloads
    pub fn as_str(self) -> &'static str {
        match self {
            MemberType::NetworkDevice => "networkdevice",
            MemberType::Interface => "interface",
        }
    }
}

impl std::fmt::Display for MemberType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Dynamic rule tree node as stored by the Controller
///
/// Branches carry `AND`/`OR` with child `items`; leaves carry a field `name`,
/// a match `operation` (`ILIKE`/`LIKE`) and a wildcarded `value`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RuleNode {
    Branch { operation: String, items: Vec<RuleNode> },
    Leaf { operation: String, name: String, value: String },
}

/// Scope restriction of a port rule
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScopeRule {
    pub scope_category: String, // TAG or SITE
    #[serde(default)]
    pub inherit: bool,
    #[serde(default)]
    pub values: Vec<String>,
}

/// Dynamic membership rule set of a tag
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DynamicRule {
    pub member_type: MemberType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rules: Option<RuleNode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope_rule: Option<ScopeRule>,
}

/// Tag record
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tag {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub dynamic_rules: Vec<DynamicRule>,
    #[serde(default)]
    pub system_tag: bool,
}

/// Member explicitly or dynamically attached to a tag
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TagMember {
    pub id: String,
    #[serde(default)]
    pub hostname: Option<String>,
    #[serde(default)]
    pub management_ip_address: Option<String>,
    #[serde(default)]
    pub port_name: Option<String>,
    #[serde(default)]
    pub device_id: Option<String>,
}

/// Reference to a tag inside a member's tag set
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TagRef {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Full tag set of a device or interface
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberTags {
    pub id: String,
    #[serde(default)]
    pub tags: Vec<TagRef>,
}

// ============================================================================
// Access points
// ============================================================================

/// Current configuration of an access point
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApConfiguration {
    #[serde(default)]
    pub eth_mac: Option<String>,
    #[serde(default)]
    pub mac_address: Option<String>,
    pub ap_name: String,
    #[serde(default)]
    pub admin_status: Option<String>,
    #[serde(default)]
    pub led_status: Option<String>,
    #[serde(default)]
    pub led_brightness_level: Option<u8>,
    #[serde(default)]
    pub ap_mode: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub is_assigned_site_as_location: Option<String>,
    #[serde(default)]
    pub failover_priority: Option<String>,
    #[serde(default)]
    pub primary_controller_name: Option<String>,
    #[serde(default)]
    pub primary_ip_address: Option<String>,
    #[serde(default)]
    pub secondary_controller_name: Option<String>,
    #[serde(default)]
    pub secondary_ip_address: Option<String>,
    #[serde(default)]
    pub tertiary_controller_name: Option<String>,
    #[serde(default)]
    pub tertiary_ip_address: Option<String>,
    #[serde(default)]
    pub radio_dtos: Vec<RadioConfiguration>,
}

/// Per-radio configuration; `radio_type` 1 = 2.4 GHz, 2 = 5 GHz, 3 = XOR, 6 = 6 GHz, 7 = TRI
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RadioConfiguration {
    pub radio_type: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slot_id: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admin_status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub antenna_pattern_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub antenna_gain: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cable_loss: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel_assignment_mode: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel_number: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel_width: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub power_assignment_mode: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub powerlevel: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub radio_role_assignment: Option<String>,
}

/// Access point addressed by a configuration request
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApListEntry {
    pub ap_name: String,
    pub mac_address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ap_name_new: Option<String>,
}

/// Configure-v2 request; only populated fields are changed on the Controller
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApConfigRequest {
    pub ap_list: Vec<ApListEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admin_status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub led_status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub led_brightness_level: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ap_mode: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_assigned_site_as_location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failover_priority: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_controller_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_ip_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secondary_controller_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secondary_ip_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tertiary_controller_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tertiary_ip_address: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub radio_configurations: Vec<RadioConfiguration>,
}

/// Device entry of a task-id provision request
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProvisionDevice {
    pub device_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mesh_role: Option<String>,
}

/// Provision request for releases using the task-id model
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApProvisionRequest {
    pub network_devices: Vec<ProvisionDevice>,
    pub rf_profile_name: String,
    pub site_id: String,
}

/// Provision request for releases using the execution-id model
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyApProvisionRequest {
    pub rf_profile: String,
    pub device_name: String,
    pub site_name_hierarchy: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub custom_flex_group_name: Vec<String>,
}

/// Result of a reboot or factory-reset for one access point
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApOperationResult {
    #[serde(default)]
    pub ap_name: Option<String>,
    #[serde(default)]
    pub mac_address: Option<String>,
    #[serde(alias = "rebootStatus", alias = "apFactoryResetStatus")]
    pub status: String,
    #[serde(default)]
    pub failure_reason: Option<String>,
}

/// Reboot or factory-reset status, grouped by wireless controller
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApOperationStatus {
    #[serde(default)]
    pub wlc_ip: Option<String>,
    #[serde(default, alias = "apResponseInfoList")]
    pub ap_list: Vec<ApOperationResult>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rule_node_parses_nested_tree() {
        let json = serde_json::json!({
            "operation": "AND",
            "items": [
                {"operation": "ILIKE", "name": "hostname", "value": "%edge%"},
                {"operation": "OR", "items": [
                    {"operation": "ILIKE", "name": "family", "value": "Switches%"},
                    {"operation": "ILIKE", "name": "family", "value": "Routers%"}
                ]}
            ]
        });
        let node: RuleNode = serde_json::from_value(json).unwrap();
        match node {
            RuleNode::Branch { operation, items } => {
                assert_eq!(operation, "AND");
                assert_eq!(items.len(), 2);
                assert!(matches!(items[1], RuleNode::Branch { .. }));
            }
            RuleNode::Leaf { .. } => panic!("expected branch"),
        }
    }

    #[test]
    fn test_task_terminal_and_success() {
        let task: Task = serde_json::from_value(serde_json::json!({
            "id": "t-1", "status": "SUCCESS", "startTime": 1, "endTime": 2
        }))
        .unwrap();
        assert!(task.is_terminal());
        assert!(task.is_success());

        let pending: Task = serde_json::from_value(serde_json::json!({"id": "t-2", "status": "PENDING"})).unwrap();
        assert!(!pending.is_terminal());
    }

    #[test]
    fn test_ap_operation_result_accepts_both_status_names() {
        let reboot: ApOperationResult =
            serde_json::from_value(serde_json::json!({"apName": "AP1", "rebootStatus": "SUCCESS"})).unwrap();
        let reset: ApOperationResult =
            serde_json::from_value(serde_json::json!({"apName": "AP1", "apFactoryResetStatus": "FAILURE"})).unwrap();
        assert_eq!(reboot.status, "SUCCESS");
        assert_eq!(reset.status, "FAILURE");
    }

    #[test]
    fn test_tag_create_body_omits_empty_id() {
        let tag = Tag { name: "edge".to_string(), ..Default::default() };
        let body = serde_json::to_value(&tag).unwrap();
        assert!(body.get("id").is_none());
        assert_eq!(body["name"], "edge");
    }
}
