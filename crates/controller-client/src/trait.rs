//! ControllerClient trait for mocking
//!
//! This trait abstracts the Controller API so the workflow engine can be driven
//! by the concrete [`ControllerClient`](crate::ControllerClient) in production
//! and by an in-memory mock in tests.
//!
//! List operations take an explicit `offset`/`limit` page; the engine's
//! paginator is responsible for walking pages.

use crate::error::ApiError;
use crate::models::*;

/// Trait for Controller API client operations
///
/// All async methods must be `Send` to work with Tokio's work-stealing runtime.
#[async_trait::async_trait]
pub trait ControllerClientTrait: Send + Sync {
    /// Get the base URL
    fn base_url(&self) -> &str;

    /// Controller release (e.g. "2.3.7.9")
    async fn get_release_version(&self) -> Result<ReleaseInfo, ApiError>;

    // Inventory Operations
    async fn query_network_devices(&self, filters: &[(&str, &str)], offset: u32, limit: u32) -> Result<Vec<NetworkDevice>, ApiError>;
    async fn get_interface_by_name(&self, device_id: &str, interface_name: &str) -> Result<DeviceInterface, ApiError>;

    // Site Operations
    async fn query_sites(&self, name_hierarchy: &str) -> Result<Vec<Site>, ApiError>;
    async fn query_fabric_sites(&self, site_id: &str) -> Result<Vec<FabricSite>, ApiError>;
    async fn query_site_assigned_devices(&self, site_id: &str, offset: u32, limit: u32) -> Result<Vec<SiteMembership>, ApiError>;

    // SDA Operations
    async fn query_port_assignments(&self, fabric_id: &str, network_device_id: &str, offset: u32, limit: u32) -> Result<Vec<PortAssignment>, ApiError>;
    async fn add_port_assignments(&self, assignments: &[PortAssignment]) -> Result<TaskCreated, ApiError>;
    async fn update_port_assignments(&self, assignments: &[PortAssignment]) -> Result<TaskCreated, ApiError>;
    async fn delete_port_assignments(&self, fabric_id: &str, network_device_id: &str, interface_name: Option<&str>) -> Result<TaskCreated, ApiError>;
    async fn query_port_channels(&self, fabric_id: &str, network_device_id: &str, offset: u32, limit: u32) -> Result<Vec<PortChannel>, ApiError>;
    async fn add_port_channels(&self, channels: &[PortChannel]) -> Result<TaskCreated, ApiError>;
    async fn update_port_channels(&self, channels: &[PortChannel]) -> Result<TaskCreated, ApiError>;
    async fn delete_port_channel(&self, id: &str) -> Result<TaskCreated, ApiError>;
    async fn query_vlan_ssid_mappings(&self, fabric_id: &str, offset: u32, limit: u32) -> Result<Vec<VlanSsidMapping>, ApiError>;
    async fn update_vlan_ssid_mappings(&self, fabric_id: &str, mappings: &[VlanSsidMapping]) -> Result<TaskCreated, ApiError>;

    // Access Point Operations
    async fn get_ap_configuration(&self, eth_mac: &str) -> Result<ApConfiguration, ApiError>;
    async fn configure_access_points(&self, request: &ApConfigRequest) -> Result<TaskCreated, ApiError>;
    async fn provision_access_points(&self, request: &ApProvisionRequest) -> Result<TaskCreated, ApiError>;
    async fn provision_access_points_legacy(&self, requests: &[LegacyApProvisionRequest]) -> Result<ExecutionCreated, ApiError>;
    async fn get_execution_status(&self, execution_id: &str) -> Result<ExecutionStatus, ApiError>;
    async fn reboot_access_points(&self, ap_mac_addresses: &[String]) -> Result<TaskCreated, ApiError>;
    async fn get_ap_reboot_status(&self, task_id: &str) -> Result<Vec<ApOperationStatus>, ApiError>;
    async fn factory_reset_access_points(&self, ap_mac_addresses: &[String], keep_static_ip_config: bool) -> Result<TaskCreated, ApiError>;
    async fn get_ap_factory_reset_status(&self, task_id: &str) -> Result<Vec<ApOperationStatus>, ApiError>;

    // Tag Operations
    async fn query_tags(&self, name: &str) -> Result<Vec<Tag>, ApiError>;
    async fn create_tag(&self, tag: &Tag) -> Result<TaskCreated, ApiError>;
    async fn update_tag(&self, tag: &Tag) -> Result<TaskCreated, ApiError>;
    async fn delete_tag(&self, id: &str) -> Result<TaskCreated, ApiError>;
    async fn query_tag_members(&self, tag_id: &str, member_type: MemberType, offset: u32, limit: u32) -> Result<Vec<TagMember>, ApiError>;
    async fn query_member_tags(&self, member_type: MemberType, ids: &[String]) -> Result<Vec<MemberTags>, ApiError>;
    async fn update_member_tags(&self, member_type: MemberType, updates: &[MemberTags]) -> Result<TaskCreated, ApiError>;

    // Task Operations
    async fn get_task_by_id(&self, task_id: &str) -> Result<Task, ApiError>;
    async fn get_task_detail(&self, task_id: &str) -> Result<TaskDetail, ApiError>;
}
