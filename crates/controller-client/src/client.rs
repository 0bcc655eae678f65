//! Controller API client
//!
//! Implements the Controller intent API on top of [`HttpClient`]. Every write
//! on the Controller is asynchronous and answers with a task handle; the
//! workflow engine polls those handles through the task endpoints.

use crate::common::HttpClient;
use crate::error::ApiError;
use crate::models::*;
use crate::controller_trait::ControllerClientTrait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info};

const AUTH_PATH: &str = "/dna/system/api/v1/auth/token";
const INTENT_V1: &str = "/dna/intent/api/v1";
const INTENT_V2: &str = "/dna/intent/api/v2";

#[derive(Debug, Deserialize)]
struct AuthToken {
    #[serde(rename = "Token")]
    token: String,
}

/// Controller API client
#[derive(Debug, Clone)]
pub struct ControllerClient {
    http: HttpClient,
}

impl ControllerClient {
    fn build_http(verify_tls: bool) -> Result<Client, ApiError> {
        Client::builder()
            .timeout(Duration::from_secs(30))
            .danger_accept_invalid_certs(!verify_tls)
            .build()
            .map_err(ApiError::Http)
    }

    /// Create a client from an already issued token
    ///
    /// # Arguments
    /// * `base_url` - Controller base URL (e.g., "https://controller.example.com")
    /// * `token` - value for the `X-Auth-Token` header
    pub fn new(base_url: String, token: String) -> Result<Self, ApiError> {
        let client = Self::build_http(true)?;
        Ok(Self {
            http: HttpClient::new(client, base_url, token),
        })
    }

    /// Authenticate with username/password and create a client
    ///
    /// Exchanges basic credentials for a session token at the system auth endpoint.
    pub async fn login(
        base_url: String,
        username: &str,
        password: &str,
        verify_tls: bool,
    ) -> Result<Self, ApiError> {
        let client = Self::build_http(verify_tls)?;
        let base = base_url.trim_end_matches('/').to_string();
        debug!("Requesting Controller token for user {}", username);

        let response = client
            .post(format!("{}{}", base, AUTH_PATH))
            .basic_auth(username, Some(password))
            .header("Content-Type", "application/json")
            .send()
            .await
            .map_err(ApiError::Http)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::Authentication(format!(
                "token request failed: {} - {}",
                status.as_u16(),
                body
            )));
        }

        let token: AuthToken = response.json().await.map_err(ApiError::Http)?;
        info!("Authenticated against Controller at {}", base);
        Ok(Self {
            http: HttpClient::new(client, base, token.token),
        })
    }

    /// Override the retry budget for transient failures
    #[must_use]
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.http = self.http.with_max_retries(max_retries);
        self
    }

    /// Get the base URL
    pub fn base_url(&self) -> &str {
        self.http.base_url()
    }

    fn page(offset: u32, limit: u32) -> (String, String) {
        (offset.to_string(), limit.to_string())
    }
}

#[async_trait::async_trait]
impl ControllerClientTrait for ControllerClient {
    fn base_url(&self) -> &str {
        self.http.base_url()
    }

    async fn get_release_version(&self) -> Result<ReleaseInfo, ApiError> {
        self.http.get(&format!("{}/dnac-release", INTENT_V1)).await
    }

    // ====================
    // Inventory
    // ====================

    async fn query_network_devices(&self, filters: &[(&str, &str)], offset: u32, limit: u32) -> Result<Vec<NetworkDevice>, ApiError> {
        let (offset, limit) = Self::page(offset, limit);
        let mut query: Vec<(&str, &str)> = filters.to_vec();
        query.push(("offset", &offset));
        query.push(("limit", &limit));
        debug!("Querying network devices with filters: {:?}", filters);
        self.http
            .get(&HttpClient::with_query(&format!("{}/network-device", INTENT_V1), &query))
            .await
    }

    async fn get_interface_by_name(&self, device_id: &str, interface_name: &str) -> Result<DeviceInterface, ApiError> {
        let path = HttpClient::with_query(
            &format!("{}/interface/network-device/{}/interface-name", INTENT_V1, device_id),
            &[("name", interface_name)],
        );
        self.http.get(&path).await
    }

    // ====================
    // Sites
    // ====================

    async fn query_sites(&self, name_hierarchy: &str) -> Result<Vec<Site>, ApiError> {
        let path = HttpClient::with_query(&format!("{}/sites", INTENT_V1), &[("nameHierarchy", name_hierarchy)]);
        self.http.get(&path).await
    }

    async fn query_fabric_sites(&self, site_id: &str) -> Result<Vec<FabricSite>, ApiError> {
        let path = HttpClient::with_query(&format!("{}/sda/fabricSites", INTENT_V1), &[("siteId", site_id)]);
        self.http.get(&path).await
    }

    async fn query_site_assigned_devices(&self, site_id: &str, offset: u32, limit: u32) -> Result<Vec<SiteMembership>, ApiError> {
        let (offset, limit) = Self::page(offset, limit);
        let path = HttpClient::with_query(
            &format!("{}/networkDevices/assignedToSite", INTENT_V1),
            &[("siteId", site_id), ("offset", &offset), ("limit", &limit)],
        );
        self.http.get(&path).await
    }

    // ====================
    // SDA host onboarding
    // ====================

    async fn query_port_assignments(&self, fabric_id: &str, network_device_id: &str, offset: u32, limit: u32) -> Result<Vec<PortAssignment>, ApiError> {
        let (offset, limit) = Self::page(offset, limit);
        let path = HttpClient::with_query(
            &format!("{}/sda/portAssignments", INTENT_V1),
            &[
                ("fabricId", fabric_id),
                ("networkDeviceId", network_device_id),
                ("offset", &offset),
                ("limit", &limit),
            ],
        );
        self.http.get(&path).await
    }

    async fn add_port_assignments(&self, assignments: &[PortAssignment]) -> Result<TaskCreated, ApiError> {
        let body = serde_json::to_value(assignments)?;
        self.http.post(&format!("{}/sda/portAssignments", INTENT_V1), &body).await
    }

    async fn update_port_assignments(&self, assignments: &[PortAssignment]) -> Result<TaskCreated, ApiError> {
        let body = serde_json::to_value(assignments)?;
        self.http.put(&format!("{}/sda/portAssignments", INTENT_V1), &body).await
    }

    async fn delete_port_assignments(&self, fabric_id: &str, network_device_id: &str, interface_name: Option<&str>) -> Result<TaskCreated, ApiError> {
        let mut query = vec![("fabricId", fabric_id), ("networkDeviceId", network_device_id)];
        if let Some(name) = interface_name {
            query.push(("interfaceName", name));
        }
        self.http
            .delete(&HttpClient::with_query(&format!("{}/sda/portAssignments", INTENT_V1), &query))
            .await
    }

    async fn query_port_channels(&self, fabric_id: &str, network_device_id: &str, offset: u32, limit: u32) -> Result<Vec<PortChannel>, ApiError> {
        let (offset, limit) = Self::page(offset, limit);
        let path = HttpClient::with_query(
            &format!("{}/sda/portChannels", INTENT_V1),
            &[
                ("fabricId", fabric_id),
                ("networkDeviceId", network_device_id),
                ("offset", &offset),
                ("limit", &limit),
            ],
        );
        self.http.get(&path).await
    }

    async fn add_port_channels(&self, channels: &[PortChannel]) -> Result<TaskCreated, ApiError> {
        let body = serde_json::to_value(channels)?;
        self.http.post(&format!("{}/sda/portChannels", INTENT_V1), &body).await
    }

    async fn update_port_channels(&self, channels: &[PortChannel]) -> Result<TaskCreated, ApiError> {
        let body = serde_json::to_value(channels)?;
        self.http.put(&format!("{}/sda/portChannels", INTENT_V1), &body).await
    }

    async fn delete_port_channel(&self, id: &str) -> Result<TaskCreated, ApiError> {
        self.http.delete(&format!("{}/sda/portChannels/{}", INTENT_V1, id)).await
    }

    async fn query_vlan_ssid_mappings(&self, fabric_id: &str, offset: u32, limit: u32) -> Result<Vec<VlanSsidMapping>, ApiError> {
        let (offset, limit) = Self::page(offset, limit);
        let path = HttpClient::with_query(
            &format!("{}/sda/fabrics/{}/vlanToSsids", INTENT_V1, fabric_id),
            &[("offset", &offset), ("limit", &limit)],
        );
        self.http.get(&path).await
    }

    async fn update_vlan_ssid_mappings(&self, fabric_id: &str, mappings: &[VlanSsidMapping]) -> Result<TaskCreated, ApiError> {
        let body = serde_json::to_value(mappings)?;
        self.http
            .put(&format!("{}/sda/fabrics/{}/vlanToSsids", INTENT_V1, fabric_id), &body)
            .await
    }

    // ====================
    // Access points
    // ====================

    async fn get_ap_configuration(&self, eth_mac: &str) -> Result<ApConfiguration, ApiError> {
        self.http
            .get(&format!("{}/wireless/accesspoint-configuration/details/{}", INTENT_V1, eth_mac))
            .await
    }

    async fn configure_access_points(&self, request: &ApConfigRequest) -> Result<TaskCreated, ApiError> {
        let body = serde_json::to_value(request)?;
        self.http
            .post(&format!("{}/wireless/accesspoint-configuration", INTENT_V2), &body)
            .await
    }

    async fn provision_access_points(&self, request: &ApProvisionRequest) -> Result<TaskCreated, ApiError> {
        let body = serde_json::to_value(request)?;
        self.http
            .post(&format!("{}/wirelessAccessPoints/provision", INTENT_V1), &body)
            .await
    }

    async fn provision_access_points_legacy(&self, requests: &[LegacyApProvisionRequest]) -> Result<ExecutionCreated, ApiError> {
        let body = serde_json::to_value(requests)?;
        // The legacy endpoint answers without the response envelope
        self.http
            .post_raw(&format!("{}/wireless/ap-provision", INTENT_V1), &body)
            .await
    }

    async fn get_execution_status(&self, execution_id: &str) -> Result<ExecutionStatus, ApiError> {
        self.http
            .get(&format!("{}/dnacaap/management/execution-status/{}", INTENT_V1, execution_id))
            .await
    }

    async fn reboot_access_points(&self, ap_mac_addresses: &[String]) -> Result<TaskCreated, ApiError> {
        let body = serde_json::json!({ "apMacAddresses": ap_mac_addresses });
        self.http
            .post(&format!("{}/device-reboot/apreboot", INTENT_V1), &body)
            .await
    }

    async fn get_ap_reboot_status(&self, task_id: &str) -> Result<Vec<ApOperationStatus>, ApiError> {
        let path = HttpClient::with_query(
            &format!("{}/device-reboot/apreboot/status", INTENT_V1),
            &[("parentTaskId", task_id)],
        );
        self.http.get(&path).await
    }

    async fn factory_reset_access_points(&self, ap_mac_addresses: &[String], keep_static_ip_config: bool) -> Result<TaskCreated, ApiError> {
        let body = serde_json::json!({
            "apMacAddresses": ap_mac_addresses,
            "keepStaticIPConfig": keep_static_ip_config,
        });
        self.http
            .post(&format!("{}/wirelessAccessPoints/factoryResetRequest/provision", INTENT_V1), &body)
            .await
    }

    async fn get_ap_factory_reset_status(&self, task_id: &str) -> Result<Vec<ApOperationStatus>, ApiError> {
        let path = HttpClient::with_query(
            &format!("{}/wirelessAccessPoints/factoryResetRequestStatus", INTENT_V1),
            &[("taskId", task_id)],
        );
        self.http.get(&path).await
    }

    // ====================
    // Tags
    // ====================

    async fn query_tags(&self, name: &str) -> Result<Vec<Tag>, ApiError> {
        debug!("Querying tags with name {}", name);
        self.http
            .get(&HttpClient::with_query(&format!("{}/tags", INTENT_V1), &[("name", name)]))
            .await
    }

    async fn create_tag(&self, tag: &Tag) -> Result<TaskCreated, ApiError> {
        let body = serde_json::to_value(tag)?;
        self.http.post(&format!("{}/tags", INTENT_V1), &body).await
    }

    async fn update_tag(&self, tag: &Tag) -> Result<TaskCreated, ApiError> {
        let body = serde_json::to_value(tag)?;
        self.http.put(&format!("{}/tags", INTENT_V1), &body).await
    }

    async fn delete_tag(&self, id: &str) -> Result<TaskCreated, ApiError> {
        self.http.delete(&format!("{}/tags/{}", INTENT_V1, id)).await
    }

    async fn query_tag_members(&self, tag_id: &str, member_type: MemberType, offset: u32, limit: u32) -> Result<Vec<TagMember>, ApiError> {
        let (offset, limit) = Self::page(offset, limit);
        let path = HttpClient::with_query(
            &format!("{}/tags/{}/members", INTENT_V1, tag_id),
            &[("memberType", member_type.as_str()), ("offset", &offset), ("limit", &limit)],
        );
        self.http.get(&path).await
    }

    async fn query_member_tags(&self, member_type: MemberType, ids: &[String]) -> Result<Vec<MemberTags>, ApiError> {
        let body = serde_json::json!({ "ids": ids });
        let path = match member_type {
            MemberType::NetworkDevice => format!("{}/networkDevices/tags/query", INTENT_V1),
            MemberType::Interface => format!("{}/interfaces/tags/query", INTENT_V1),
        };
        self.http.post(&path, &body).await
    }

    async fn update_member_tags(&self, member_type: MemberType, updates: &[MemberTags]) -> Result<TaskCreated, ApiError> {
        let body = serde_json::to_value(updates)?;
        let path = match member_type {
            MemberType::NetworkDevice => format!("{}/networkDevices/tags", INTENT_V1),
            MemberType::Interface => format!("{}/interfaces/tags", INTENT_V1),
        };
        self.http.post(&path, &body).await
    }

    // ====================
    // Tasks
    // ====================

    async fn get_task_by_id(&self, task_id: &str) -> Result<Task, ApiError> {
        self.http.get(&format!("{}/tasks/{}", INTENT_V1, task_id)).await
    }

    async fn get_task_detail(&self, task_id: &str) -> Result<TaskDetail, ApiError> {
        self.http.get(&format!("{}/tasks/{}/detail", INTENT_V1, task_id)).await
    }
}
