//! Mock ControllerClient for unit testing
//!
//! This module provides an in-memory implementation of `ControllerClientTrait`
//! that can be used in unit tests without a running Controller.
//!
//! The mock is organized into domain-specific modules:
//! - `inventory.rs` - devices, interfaces, sites, fabric sites
//! - `sda.rs` - port assignments, port channels, VLAN to SSID mappings
//! - `access_point.rs` - AP configuration, provisioning, reboot, factory reset
//! - `tags.rs` - tags and tag membership
//! - `tasks.rs` - task bookkeeping shared by every write
//!
//! Every write is recorded as a [`WriteCall`] so tests can assert exactly which
//! mutations reached the Controller.

mod access_point;
mod inventory;
mod sda;
mod tags;
mod tasks;

use crate::error::ApiError;
use crate::models::*;
use crate::controller_trait::ControllerClientTrait;
use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

pub(crate) use tasks::MockTask;

/// A write issued against the mock Controller
#[derive(Debug, Clone, PartialEq)]
pub struct WriteCall {
    /// Trait method name, e.g. `update_member_tags`
    pub operation: &'static str,
    /// Request payload as sent
    pub payload: serde_json::Value,
}

/// Lock a mock store, recovering the data if a previous test thread panicked
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Mock ControllerClient for testing
///
/// This mock stores resources in memory and can be configured to fail
/// specific operations for testing partial-failure scenarios.
#[derive(Clone, Debug)]
pub struct MockControllerClient {
    pub(crate) base_url: String,
    pub(crate) release: Arc<Mutex<String>>,
    // In-memory storage for resources
    pub(crate) devices: Arc<Mutex<Vec<NetworkDevice>>>,
    pub(crate) interfaces: Arc<Mutex<Vec<DeviceInterface>>>,
    pub(crate) sites: Arc<Mutex<Vec<Site>>>,
    pub(crate) fabric_sites: Arc<Mutex<Vec<FabricSite>>>,
    pub(crate) site_devices: Arc<Mutex<Vec<SiteMembership>>>,
    pub(crate) port_assignments: Arc<Mutex<Vec<PortAssignment>>>,
    pub(crate) port_channels: Arc<Mutex<Vec<PortChannel>>>,
    pub(crate) vlan_ssids: Arc<Mutex<HashMap<String, Vec<VlanSsidMapping>>>>,
    pub(crate) ap_configs: Arc<Mutex<HashMap<String, ApConfiguration>>>,
    pub(crate) tags: Arc<Mutex<HashMap<String, Tag>>>,
    pub(crate) member_tags: Arc<Mutex<HashMap<(MemberType, String), BTreeSet<String>>>>,
    pub(crate) tasks: Arc<Mutex<HashMap<String, MockTask>>>,
    pub(crate) executions: Arc<Mutex<HashMap<String, ExecutionStatus>>>,
    pub(crate) ap_operations: Arc<Mutex<HashMap<String, Vec<ApOperationStatus>>>>,
    // Recorded writes and injected faults
    pub(crate) writes: Arc<Mutex<Vec<WriteCall>>>,
    pub(crate) task_failures: Arc<Mutex<HashMap<&'static str, String>>>,
    pub(crate) transport_failures: Arc<Mutex<HashMap<&'static str, String>>>,
    pub(crate) task_polls: Arc<Mutex<u32>>,
    // Counter for generating IDs
    pub(crate) next_id: Arc<Mutex<u64>>,
}

impl MockControllerClient {
    /// Create a new mock client reporting release 2.3.7.9
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            release: Arc::new(Mutex::new("2.3.7.9".to_string())),
            devices: Arc::new(Mutex::new(Vec::new())),
            interfaces: Arc::new(Mutex::new(Vec::new())),
            sites: Arc::new(Mutex::new(Vec::new())),
            fabric_sites: Arc::new(Mutex::new(Vec::new())),
            site_devices: Arc::new(Mutex::new(Vec::new())),
            port_assignments: Arc::new(Mutex::new(Vec::new())),
            port_channels: Arc::new(Mutex::new(Vec::new())),
            vlan_ssids: Arc::new(Mutex::new(HashMap::new())),
            ap_configs: Arc::new(Mutex::new(HashMap::new())),
            tags: Arc::new(Mutex::new(HashMap::new())),
            member_tags: Arc::new(Mutex::new(HashMap::new())),
            tasks: Arc::new(Mutex::new(HashMap::new())),
            executions: Arc::new(Mutex::new(HashMap::new())),
            ap_operations: Arc::new(Mutex::new(HashMap::new())),
            writes: Arc::new(Mutex::new(Vec::new())),
            task_failures: Arc::new(Mutex::new(HashMap::new())),
            transport_failures: Arc::new(Mutex::new(HashMap::new())),
            task_polls: Arc::new(Mutex::new(0)),
            next_id: Arc::new(Mutex::new(1)),
        }
    }

    /// Generate next ID
    pub(crate) fn next_id(&self, prefix: &str) -> String {
        let mut id = lock(&self.next_id);
        let current = *id;
        *id += 1;
        format!("{}-{}", prefix, current)
    }

    /// Set the release reported by `get_release_version`
    pub fn set_release_version(&self, version: impl Into<String>) {
        *lock(&self.release) = version.into();
    }

    /// Make every future task of `operation` finish with `FAILURE` and `reason`
    pub fn fail_task(&self, operation: &'static str, reason: impl Into<String>) {
        lock(&self.task_failures).insert(operation, reason.into());
    }

    /// Make every future call of `operation` fail before a task is created
    pub fn fail_transport(&self, operation: &'static str, reason: impl Into<String>) {
        lock(&self.transport_failures).insert(operation, reason.into());
    }

    /// Clear all injected faults
    pub fn clear_failures(&self) {
        lock(&self.task_failures).clear();
        lock(&self.transport_failures).clear();
    }

    /// Number of non-terminal polls each new task reports before finishing
    ///
    /// `u32::MAX` keeps tasks pending forever.
    pub fn set_task_polls(&self, polls: u32) {
        *lock(&self.task_polls) = polls;
    }

    /// All writes recorded so far
    pub fn writes(&self) -> Vec<WriteCall> {
        lock(&self.writes).clone()
    }

    /// Writes recorded for one operation
    pub fn writes_for(&self, operation: &str) -> Vec<WriteCall> {
        lock(&self.writes)
            .iter()
            .filter(|w| w.operation == operation)
            .cloned()
            .collect()
    }

    /// Forget recorded writes (between two runs of the same test)
    pub fn reset_writes(&self) {
        lock(&self.writes).clear();
    }

    fn check_transport(&self, operation: &'static str) -> Result<(), ApiError> {
        match lock(&self.transport_failures).get(operation) {
            Some(reason) => Err(ApiError::Api(format!("{} failed: 500 - {}", operation, reason))),
            None => Ok(()),
        }
    }
}

/// Paginate an in-memory list with the Controller's 1-based offset
pub(crate) fn page<T: Clone>(items: &[T], offset: u32, limit: u32) -> Vec<T> {
    let start = usize::try_from(offset.saturating_sub(1)).unwrap_or(usize::MAX);
    let limit = usize::try_from(limit).unwrap_or(usize::MAX);
    items.iter().skip(start).take(limit).cloned().collect()
}

#[async_trait::async_trait]
impl ControllerClientTrait for MockControllerClient {
    fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn get_release_version(&self) -> Result<ReleaseInfo, ApiError> {
        Ok(ReleaseInfo {
            display_version: lock(&self.release).clone(),
        })
    }

    // Inventory Operations - delegated to inventory module
    async fn query_network_devices(&self, filters: &[(&str, &str)], offset: u32, limit: u32) -> Result<Vec<NetworkDevice>, ApiError> {
        inventory::query_network_devices(self, filters, offset, limit)
    }

    async fn get_interface_by_name(&self, device_id: &str, interface_name: &str) -> Result<DeviceInterface, ApiError> {
        inventory::get_interface_by_name(self, device_id, interface_name)
    }

    async fn query_sites(&self, name_hierarchy: &str) -> Result<Vec<Site>, ApiError> {
        inventory::query_sites(self, name_hierarchy)
    }

    async fn query_fabric_sites(&self, site_id: &str) -> Result<Vec<FabricSite>, ApiError> {
        inventory::query_fabric_sites(self, site_id)
    }

    async fn query_site_assigned_devices(&self, site_id: &str, offset: u32, limit: u32) -> Result<Vec<SiteMembership>, ApiError> {
        inventory::query_site_assigned_devices(self, site_id, offset, limit)
    }

    // SDA Operations - delegated to sda module
    async fn query_port_assignments(&self, fabric_id: &str, network_device_id: &str, offset: u32, limit: u32) -> Result<Vec<PortAssignment>, ApiError> {
        sda::query_port_assignments(self, fabric_id, network_device_id, offset, limit)
    }

    async fn add_port_assignments(&self, assignments: &[PortAssignment]) -> Result<TaskCreated, ApiError> {
        sda::add_port_assignments(self, assignments)
    }

    async fn update_port_assignments(&self, assignments: &[PortAssignment]) -> Result<TaskCreated, ApiError> {
        sda::update_port_assignments(self, assignments)
    }

    async fn delete_port_assignments(&self, fabric_id: &str, network_device_id: &str, interface_name: Option<&str>) -> Result<TaskCreated, ApiError> {
        sda::delete_port_assignments(self, fabric_id, network_device_id, interface_name)
    }

    async fn query_port_channels(&self, fabric_id: &str, network_device_id: &str, offset: u32, limit: u32) -> Result<Vec<PortChannel>, ApiError> {
        sda::query_port_channels(self, fabric_id, network_device_id, offset, limit)
    }

    async fn add_port_channels(&self, channels: &[PortChannel]) -> Result<TaskCreated, ApiError> {
        sda::add_port_channels(self, channels)
    }

    async fn update_port_channels(&self, channels: &[PortChannel]) -> Result<TaskCreated, ApiError> {
        sda::update_port_channels(self, channels)
    }

    async fn delete_port_channel(&self, id: &str) -> Result<TaskCreated, ApiError> {
        sda::delete_port_channel(self, id)
    }

    async fn query_vlan_ssid_mappings(&self, fabric_id: &str, offset: u32, limit: u32) -> Result<Vec<VlanSsidMapping>, ApiError> {
        sda::query_vlan_ssid_mappings(self, fabric_id, offset, limit)
    }

    async fn update_vlan_ssid_mappings(&self, fabric_id: &str, mappings: &[VlanSsidMapping]) -> Result<TaskCreated, ApiError> {
        sda::update_vlan_ssid_mappings(self, fabric_id, mappings)
    }

    // Access Point Operations - delegated to access_point module
    async fn get_ap_configuration(&self, eth_mac: &str) -> Result<ApConfiguration, ApiError> {
        access_point::get_ap_configuration(self, eth_mac)
    }

    async fn configure_access_points(&self, request: &ApConfigRequest) -> Result<TaskCreated, ApiError> {
        access_point::configure_access_points(self, request)
    }

    async fn provision_access_points(&self, request: &ApProvisionRequest) -> Result<TaskCreated, ApiError> {
        access_point::provision_access_points(self, request)
    }

    async fn provision_access_points_legacy(&self, requests: &[LegacyApProvisionRequest]) -> Result<ExecutionCreated, ApiError> {
        access_point::provision_access_points_legacy(self, requests)
    }

    async fn get_execution_status(&self, execution_id: &str) -> Result<ExecutionStatus, ApiError> {
        access_point::get_execution_status(self, execution_id)
    }

    async fn reboot_access_points(&self, ap_mac_addresses: &[String]) -> Result<TaskCreated, ApiError> {
        access_point::reboot_access_points(self, ap_mac_addresses)
    }

    async fn get_ap_reboot_status(&self, task_id: &str) -> Result<Vec<ApOperationStatus>, ApiError> {
        access_point::get_ap_operation_status(self, task_id)
    }

    async fn factory_reset_access_points(&self, ap_mac_addresses: &[String], keep_static_ip_config: bool) -> Result<TaskCreated, ApiError> {
        access_point::factory_reset_access_points(self, ap_mac_addresses, keep_static_ip_config)
    }

    async fn get_ap_factory_reset_status(&self, task_id: &str) -> Result<Vec<ApOperationStatus>, ApiError> {
        access_point::get_ap_operation_status(self, task_id)
    }

    // Tag Operations - delegated to tags module
    async fn query_tags(&self, name: &str) -> Result<Vec<Tag>, ApiError> {
        tags::query_tags(self, name)
    }

    async fn create_tag(&self, tag: &Tag) -> Result<TaskCreated, ApiError> {
        tags::create_tag(self, tag)
    }

    async fn update_tag(&self, tag: &Tag) -> Result<TaskCreated, ApiError> {
        tags::update_tag(self, tag)
    }

    async fn delete_tag(&self, id: &str) -> Result<TaskCreated, ApiError> {
        tags::delete_tag(self, id)
    }

    async fn query_tag_members(&self, tag_id: &str, member_type: MemberType, offset: u32, limit: u32) -> Result<Vec<TagMember>, ApiError> {
        tags::query_tag_members(self, tag_id, member_type, offset, limit)
    }

    async fn query_member_tags(&self, member_type: MemberType, ids: &[String]) -> Result<Vec<MemberTags>, ApiError> {
        tags::query_member_tags(self, member_type, ids)
    }

    async fn update_member_tags(&self, member_type: MemberType, updates: &[MemberTags]) -> Result<TaskCreated, ApiError> {
        tags::update_member_tags(self, member_type, updates)
    }

    // Task Operations - delegated to tasks module
    async fn get_task_by_id(&self, task_id: &str) -> Result<Task, ApiError> {
        tasks::get_task_by_id(self, task_id)
    }

    async fn get_task_detail(&self, task_id: &str) -> Result<TaskDetail, ApiError> {
        tasks::get_task_detail(self, task_id)
    }
}
