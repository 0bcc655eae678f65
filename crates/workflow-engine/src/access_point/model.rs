//! Access point config entries and their canonical form.

use crate::error::WorkflowError;
use crate::resolver::DeviceHandle;
use crate::validate::{self, RadioBand};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Access points per bulk, reboot or factory-reset request
pub const MAX_AP_LIST: usize = 100;

const ENABLED_DISABLED: [&str; 2] = ["Enabled", "Disabled"];
const AP_MODES: [&str; 4] = ["Local", "Monitor", "Sniffer", "Bridge"];
const FAILOVER_PRIORITIES: [&str; 4] = ["Low", "Medium", "High", "Critical"];
const ASSIGNMENT_MODES: [&str; 2] = ["Global", "Custom"];
const CHANNEL_WIDTHS: [&str; 4] = ["20 MHz", "40 MHz", "80 MHz", "160 MHz"];
const RADIO_ROLES: [&str; 3] = ["Auto", "Client-serving", "Monitor"];
const RF_PROFILES: [&str; 3] = ["HIGH", "LOW", "TYPICAL"];
const MAX_AP_NAME: usize = 32;

/// One `config` entry of the access point workflow
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AccessPointEntry {
    #[serde(default)]
    pub mac_address: Option<String>,
    #[serde(default)]
    pub hostname: Option<String>,
    #[serde(default)]
    pub management_ip_address: Option<String>,
    #[serde(default)]
    pub ap_name: Option<String>,
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
    pub rf_profile: Option<String>,
    #[serde(default)]
    pub site_name: Option<String>,
    #[serde(default, rename = "2.4ghz_radio")]
    pub radio_24ghz: Option<RadioSpec>,
    #[serde(default, rename = "5ghz_radio")]
    pub radio_5ghz: Option<RadioSpec>,
    #[serde(default, rename = "6ghz_radio")]
    pub radio_6ghz: Option<RadioSpec>,
    #[serde(default)]
    pub xor_radio: Option<RadioSpec>,
    #[serde(default)]
    pub tri_radio: Option<RadioSpec>,
    #[serde(default)]
    pub bulk_update_aps: Option<BulkUpdateSpec>,
    #[serde(default)]
    pub reboot_aps: Option<ApMacList>,
    #[serde(default)]
    pub factory_reset_aps: Option<FactoryResetSpec>,
}

impl AccessPointEntry {
    /// The AP settings of a single-AP entry
    pub fn settings(&self) -> ApSettingsSpec {
        ApSettingsSpec {
            admin_status: self.admin_status.clone(),
            led_status: self.led_status.clone(),
            led_brightness_level: self.led_brightness_level,
            ap_mode: self.ap_mode.clone(),
            location: self.location.clone(),
            is_assigned_site_as_location: self.is_assigned_site_as_location.clone(),
            failover_priority: self.failover_priority.clone(),
            primary_controller_name: self.primary_controller_name.clone(),
            primary_ip_address: self.primary_ip_address.clone(),
            secondary_controller_name: self.secondary_controller_name.clone(),
            secondary_ip_address: self.secondary_ip_address.clone(),
            tertiary_controller_name: self.tertiary_controller_name.clone(),
            tertiary_ip_address: self.tertiary_ip_address.clone(),
        }
    }
}

/// Settings shared by single-AP entries and bulk updates
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ApSettingsSpec {
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
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RadioSpec {
    #[serde(default)]
    pub admin_status: Option<String>,
    #[serde(default)]
    pub antenna_name: Option<String>,
    #[serde(default)]
    pub antenna_gain: Option<i32>,
    #[serde(default)]
    pub cable_loss: Option<f64>,
    #[serde(default)]
    pub channel_assignment_mode: Option<String>,
    #[serde(default)]
    pub channel_number: Option<u32>,
    #[serde(default)]
    pub channel_width: Option<String>,
    #[serde(default)]
    pub power_assignment_mode: Option<String>,
    #[serde(default)]
    pub power_level: Option<u8>,
    #[serde(default)]
    pub radio_role_assignment: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BulkUpdateSpec {
    #[serde(default)]
    pub ap_identifier: Vec<ApIdentifierSpec>,
    #[serde(default)]
    pub common_fields_to_change: Option<ApSettingsSpec>,
}

/// AP addressed by its radio MAC, optionally with a new name
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ApIdentifierSpec {
    pub mac_address: String,
    #[serde(default)]
    pub ap_name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ApMacList {
    #[serde(default)]
    pub ap_mac_addresses: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FactoryResetSpec {
    #[serde(default)]
    pub ap_mac_addresses: Vec<String>,
    #[serde(default)]
    pub keep_static_ip_config: bool,
}

// ============================================================================
// Canonical form
// ============================================================================

/// Canonical AP settings; `None` leaves a field as it is
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ApSettings {
    pub admin_status: Option<String>,
    pub led_status: Option<String>,
    pub led_brightness_level: Option<u8>,
    pub ap_mode: Option<String>,
    pub location: Option<String>,
    /// Best effort: the Controller may flip it on a repeated write
    pub is_assigned_site_as_location: Option<String>,
    pub failover_priority: Option<String>,
    pub primary_controller_name: Option<String>,
    pub primary_ip_address: Option<String>,
    pub secondary_controller_name: Option<String>,
    pub secondary_ip_address: Option<String>,
    pub tertiary_controller_name: Option<String>,
    pub tertiary_ip_address: Option<String>,
}

impl ApSettings {
    pub fn is_empty(&self) -> bool {
        *self == ApSettings::default()
    }
}

/// Canonical radio settings
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RadioWant {
    pub admin_status: Option<String>,
    pub antenna_name: Option<String>,
    pub antenna_gain: Option<i32>,
    pub cable_loss: Option<f64>,
    pub channel_assignment_mode: Option<String>,
    pub channel_number: Option<u32>,
    pub channel_width: Option<String>,
    pub power_assignment_mode: Option<String>,
    pub power_level: Option<u8>,
    pub radio_role_assignment: Option<String>,
}

/// Site assignment of an AP
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisionWant {
    pub site_name: String,
    pub rf_profile: String,
}

/// Configuration of one addressed AP
#[derive(Debug, Clone, PartialEq)]
pub struct ApConfigWant {
    pub handle: DeviceHandle,
    pub ap_name: Option<String>,
    pub settings: ApSettings,
    pub radios: BTreeMap<RadioBand, RadioWant>,
    pub provision: Option<ProvisionWant>,
}

/// One AP of a bulk update
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkTarget {
    pub handle: DeviceHandle,
    pub new_name: Option<String>,
}

/// Settings applied to a list of APs
#[derive(Debug, Clone, PartialEq)]
pub struct BulkUpdateWant {
    pub targets: Vec<BulkTarget>,
    pub settings: ApSettings,
}

/// Canonical access point entry
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AccessPointWant {
    pub configure: Option<ApConfigWant>,
    pub bulk_update: Option<BulkUpdateWant>,
    /// Radio MACs to reboot
    pub reboot: Vec<DeviceHandle>,
    /// Radio MACs to factory reset
    pub factory_reset: Vec<DeviceHandle>,
    pub keep_static_ip_config: bool,
}

impl AccessPointWant {
    /// Validate and canonicalize one entry
    pub fn from_entry(entry: &AccessPointEntry) -> Result<Self, WorkflowError> {
        let bulk_update = entry.bulk_update_aps.as_ref().map(canonical_bulk).transpose()?;
        let reboot = match &entry.reboot_aps {
            Some(list) => mac_list("reboot_aps", &list.ap_mac_addresses)?,
            None => Vec::new(),
        };
        let (factory_reset, keep_static_ip_config) = match &entry.factory_reset_aps {
            Some(spec) => (
                mac_list("factory_reset_aps", &spec.ap_mac_addresses)?,
                spec.keep_static_ip_config,
            ),
            None => (Vec::new(), false),
        };

        let configure = canonical_configure(entry)?;
        if configure.is_none() && bulk_update.is_none() && reboot.is_empty() && factory_reset.is_empty() {
            return Err(WorkflowError::InvalidInput(
                "entry needs mac_address, hostname or management_ip_address, or one of bulk_update_aps, reboot_aps, factory_reset_aps"
                    .to_string(),
            ));
        }
        Ok(Self {
            configure,
            bulk_update,
            reboot,
            factory_reset,
            keep_static_ip_config,
        })
    }
}

fn handle_of(entry: &AccessPointEntry) -> Result<Option<DeviceHandle>, WorkflowError> {
    if let Some(mac) = validate::non_empty(entry.mac_address.as_deref()) {
        return DeviceHandle::parse("mac_address", &mac).map(Some);
    }
    if let Some(hostname) = validate::non_empty(entry.hostname.as_deref()) {
        return DeviceHandle::parse("hostname", &hostname).map(Some);
    }
    if let Some(ip) = validate::non_empty(entry.management_ip_address.as_deref()) {
        return DeviceHandle::parse("management_ip_address", &ip).map(Some);
    }
    Ok(None)
}

fn canonical_configure(entry: &AccessPointEntry) -> Result<Option<ApConfigWant>, WorkflowError> {
    let radios = canonical_radios(entry)?;
    let settings = canonical_settings(&entry.settings())?;
    let ap_name = entry.ap_name.as_deref().map(check_ap_name).transpose()?;
    let provision = canonical_provision(entry)?;

    let Some(handle) = handle_of(entry)? else {
        let configured = ap_name.is_some() || !settings.is_empty() || !radios.is_empty() || provision.is_some();
        if configured {
            return Err(WorkflowError::InvalidInput(
                "mac_address, hostname or management_ip_address is required to configure an access point".to_string(),
            ));
        }
        return Ok(None);
    };
    Ok(Some(ApConfigWant {
        handle,
        ap_name,
        settings,
        radios,
        provision,
    }))
}

fn check_ap_name(name: &str) -> Result<String, WorkflowError> {
    let name = validate::required("ap_name", Some(name))?;
    if name.len() > MAX_AP_NAME || name.contains(char::is_whitespace) {
        return Err(WorkflowError::InvalidInput(format!(
            "ap_name '{}' must be at most {} characters without spaces",
            name, MAX_AP_NAME
        )));
    }
    Ok(name.to_string())
}

fn controller_ip(field: &str, value: Option<&str>) -> Result<Option<String>, WorkflowError> {
    match validate::non_empty(value) {
        Some(ip) if !validate::is_valid_ip(&ip) => {
            Err(WorkflowError::InvalidInput(format!("'{}' is not a valid {}", ip, field)))
        }
        other => Ok(other),
    }
}

fn canonical_settings(spec: &ApSettingsSpec) -> Result<ApSettings, WorkflowError> {
    let led_brightness_level = spec
        .led_brightness_level
        .map(|level| validate::in_range("led_brightness_level", level, 1, 8))
        .transpose()?;
    Ok(ApSettings {
        admin_status: validate::optional_one_of("admin_status", spec.admin_status.as_deref(), &ENABLED_DISABLED)?,
        led_status: validate::optional_one_of("led_status", spec.led_status.as_deref(), &ENABLED_DISABLED)?,
        led_brightness_level,
        ap_mode: validate::optional_one_of("ap_mode", spec.ap_mode.as_deref(), &AP_MODES)?,
        location: validate::non_empty(spec.location.as_deref()),
        is_assigned_site_as_location: validate::optional_one_of(
            "is_assigned_site_as_location",
            spec.is_assigned_site_as_location.as_deref(),
            &ENABLED_DISABLED,
        )?,
        failover_priority: validate::optional_one_of(
            "failover_priority",
            spec.failover_priority.as_deref(),
            &FAILOVER_PRIORITIES,
        )?,
        primary_controller_name: validate::non_empty(spec.primary_controller_name.as_deref()),
        primary_ip_address: controller_ip("primary_ip_address", spec.primary_ip_address.as_deref())?,
        secondary_controller_name: validate::non_empty(spec.secondary_controller_name.as_deref()),
        secondary_ip_address: controller_ip("secondary_ip_address", spec.secondary_ip_address.as_deref())?,
        tertiary_controller_name: validate::non_empty(spec.tertiary_controller_name.as_deref()),
        tertiary_ip_address: controller_ip("tertiary_ip_address", spec.tertiary_ip_address.as_deref())?,
    })
}

fn canonical_radios(entry: &AccessPointEntry) -> Result<BTreeMap<RadioBand, RadioWant>, WorkflowError> {
    let specs = [
        (RadioBand::Ghz24, &entry.radio_24ghz),
        (RadioBand::Ghz5, &entry.radio_5ghz),
        (RadioBand::Ghz6, &entry.radio_6ghz),
        (RadioBand::Xor, &entry.xor_radio),
        (RadioBand::Tri, &entry.tri_radio),
    ];
    let mut radios = BTreeMap::new();
    for (band, spec) in specs {
        if let Some(spec) = spec {
            radios.insert(band, canonical_radio(band, spec)?);
        }
    }
    Ok(radios)
}

fn canonical_radio(band: RadioBand, spec: &RadioSpec) -> Result<RadioWant, WorkflowError> {
    let field = |name: &str| format!("{} radio {}", band.label(), name);

    let antenna_gain = spec
        .antenna_gain
        .map(|gain| validate::in_range(&field("antenna_gain"), gain, 0, 40))
        .transpose()?;
    if let Some(loss) = spec.cable_loss {
        let gain = antenna_gain.ok_or_else(|| {
            WorkflowError::InvalidInput(format!("{} requires antenna_gain", field("cable_loss")))
        })?;
        if loss < 0.0 || loss >= f64::from(gain) {
            return Err(WorkflowError::InvalidInput(format!(
                "{} must be at least 0 and less than antenna_gain {}, got {}",
                field("cable_loss"),
                gain,
                loss
            )));
        }
    }

    let channel_assignment_mode = validate::optional_one_of(
        &field("channel_assignment_mode"),
        spec.channel_assignment_mode.as_deref(),
        &ASSIGNMENT_MODES,
    )?;
    let channel_number = spec
        .channel_number
        .map(|channel| validate::check_channel(&field("channel_number"), band, channel))
        .transpose()?;
    if channel_assignment_mode.as_deref() == Some("Custom") && channel_number.is_none() {
        return Err(WorkflowError::InvalidInput(format!(
            "{} Custom requires channel_number",
            field("channel_assignment_mode")
        )));
    }

    let power_assignment_mode = validate::optional_one_of(
        &field("power_assignment_mode"),
        spec.power_assignment_mode.as_deref(),
        &ASSIGNMENT_MODES,
    )?;
    let power_level = spec
        .power_level
        .map(|level| validate::in_range(&field("power_level"), level, 1, 8))
        .transpose()?;
    if power_assignment_mode.as_deref() == Some("Custom") && power_level.is_none() {
        return Err(WorkflowError::InvalidInput(format!(
            "{} Custom requires power_level",
            field("power_assignment_mode")
        )));
    }

    Ok(RadioWant {
        admin_status: validate::optional_one_of(&field("admin_status"), spec.admin_status.as_deref(), &ENABLED_DISABLED)?,
        antenna_name: validate::non_empty(spec.antenna_name.as_deref()),
        antenna_gain,
        cable_loss: spec.cable_loss,
        channel_assignment_mode,
        channel_number,
        channel_width: validate::optional_one_of(&field("channel_width"), spec.channel_width.as_deref(), &CHANNEL_WIDTHS)?,
        power_assignment_mode,
        power_level,
        radio_role_assignment: validate::optional_one_of(
            &field("radio_role_assignment"),
            spec.radio_role_assignment.as_deref(),
            &RADIO_ROLES,
        )?,
    })
}

fn canonical_provision(entry: &AccessPointEntry) -> Result<Option<ProvisionWant>, WorkflowError> {
    let site_name = validate::non_empty(entry.site_name.as_deref());
    let rf_profile = validate::non_empty(entry.rf_profile.as_deref());
    match (site_name, rf_profile) {
        (None, None) => Ok(None),
        (None, Some(_)) => Err(WorkflowError::InvalidInput("rf_profile requires site_name".to_string())),
        (Some(site_name), rf_profile) => {
            let rf_profile = match rf_profile {
                // Built-in profiles are upper case; custom names are kept as written
                Some(name) => validate::one_of("rf_profile", &name, &RF_PROFILES).unwrap_or(name),
                None => "TYPICAL".to_string(),
            };
            Ok(Some(ProvisionWant { site_name, rf_profile }))
        }
    }
}

fn check_list_size(field: &str, count: usize) -> Result<(), WorkflowError> {
    if count > MAX_AP_LIST {
        return Err(WorkflowError::InvalidInput(format!(
            "{}: Maximum allowed AP list {} but passed {}",
            field, MAX_AP_LIST, count
        )));
    }
    Ok(())
}

fn mac_list(field: &str, macs: &[String]) -> Result<Vec<DeviceHandle>, WorkflowError> {
    if macs.is_empty() {
        return Err(WorkflowError::InvalidInput(format!("{}.ap_mac_addresses must not be empty", field)));
    }
    check_list_size(field, macs.len())?;
    let mut handles: Vec<DeviceHandle> = Vec::with_capacity(macs.len());
    for mac in macs {
        let handle = DeviceHandle::parse("mac_address", mac)?;
        if !handles.contains(&handle) {
            handles.push(handle);
        }
    }
    Ok(handles)
}

fn canonical_bulk(spec: &BulkUpdateSpec) -> Result<BulkUpdateWant, WorkflowError> {
    if spec.ap_identifier.is_empty() {
        return Err(WorkflowError::InvalidInput("bulk_update_aps.ap_identifier must not be empty".to_string()));
    }
    check_list_size("bulk_update_aps.ap_identifier", spec.ap_identifier.len())?;

    let mut targets: Vec<BulkTarget> = Vec::with_capacity(spec.ap_identifier.len());
    for identifier in &spec.ap_identifier {
        let handle = DeviceHandle::parse("mac_address", &identifier.mac_address)?;
        if targets.iter().any(|t| t.handle == handle) {
            return Err(WorkflowError::InvalidInput(format!(
                "{} is listed more than once in bulk_update_aps",
                handle.value()
            )));
        }
        targets.push(BulkTarget {
            handle,
            new_name: identifier.ap_name.as_deref().map(check_ap_name).transpose()?,
        });
    }
    let settings = match &spec.common_fields_to_change {
        Some(common) => canonical_settings(common)?,
        None => ApSettings::default(),
    };
    Ok(BulkUpdateWant { targets, settings })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(yaml: &str) -> AccessPointEntry {
        serde_yaml::from_str(yaml).unwrap()
    }

    #[test]
    fn test_bulk_list_cap() {
        let e = AccessPointEntry {
            bulk_update_aps: Some(BulkUpdateSpec {
                ap_identifier: (0..101)
                    .map(|i| ApIdentifierSpec {
                        mac_address: format!("aa:bb:cc:00:{:02x}:{:02x}", i / 256, i % 256),
                        ap_name: None,
                    })
                    .collect(),
                common_fields_to_change: None,
            }),
            ..Default::default()
        };
        let err = AccessPointWant::from_entry(&e).unwrap_err();
        assert!(err.to_string().contains("Maximum allowed AP list 100 but passed 101"));
    }

    #[test]
    fn test_settings_are_canonicalized() {
        let e = entry(
            "mac_address: AA-BB-CC-00-10-01\nadmin_status: enabled\nap_mode: local\nled_brightness_level: 3\n2.4ghz_radio:\n  channel_assignment_mode: custom\n  channel_number: 6\n",
        );
        let want = AccessPointWant::from_entry(&e).unwrap();
        let configure = want.configure.unwrap();
        assert_eq!(configure.handle, DeviceHandle::Mac("aa:bb:cc:00:10:01".to_string()));
        assert_eq!(configure.settings.admin_status.as_deref(), Some("Enabled"));
        assert_eq!(configure.settings.ap_mode.as_deref(), Some("Local"));
        assert_eq!(
            configure.radios[&RadioBand::Ghz24].channel_assignment_mode.as_deref(),
            Some("Custom")
        );
    }

    #[test]
    fn test_ranges_and_channels() {
        let bad = [
            "mac_address: aa:bb:cc:00:10:01\nled_brightness_level: 9\n",
            "mac_address: aa:bb:cc:00:10:01\n5ghz_radio:\n  channel_number: 14\n",
            "mac_address: aa:bb:cc:00:10:01\n6ghz_radio:\n  channel_number: 3\n",
            "mac_address: aa:bb:cc:00:10:01\n2.4ghz_radio:\n  antenna_gain: 5\n  cable_loss: 5\n",
            "mac_address: aa:bb:cc:00:10:01\n2.4ghz_radio:\n  antenna_gain: 41\n",
            "mac_address: aa:bb:cc:00:10:01\n2.4ghz_radio:\n  power_level: 0\n",
            "mac_address: aa:bb:cc:00:10:01\n2.4ghz_radio:\n  channel_assignment_mode: Custom\n",
            "mac_address: aa:bb:cc:00:10:01\nap_name: lobby ap\n",
            "mac_address: aa:bb:cc:00:10:01\nprimary_ip_address: 10.0.0\n",
        ];
        for yaml in bad {
            assert!(AccessPointWant::from_entry(&entry(yaml)).is_err(), "accepted: {}", yaml);
        }
        let good = entry("mac_address: aa:bb:cc:00:10:01\n6ghz_radio:\n  channel_number: 37\n  antenna_gain: 6\n  cable_loss: 2.5\n");
        assert!(AccessPointWant::from_entry(&good).is_ok());
    }

    #[test]
    fn test_provision_defaults() {
        let e = entry("hostname: ap-lobby\nsite_name: Global/USA/SJC/BLD23/FLOOR1\nrf_profile: high\n");
        let provision = AccessPointWant::from_entry(&e).unwrap().configure.unwrap().provision.unwrap();
        assert_eq!(provision.rf_profile, "HIGH");

        let custom = entry("hostname: ap-lobby\nsite_name: Global/USA/SJC/BLD23/FLOOR1\nrf_profile: Lobby-RF\n");
        let provision = AccessPointWant::from_entry(&custom).unwrap().configure.unwrap().provision.unwrap();
        assert_eq!(provision.rf_profile, "Lobby-RF");

        assert!(AccessPointWant::from_entry(&entry("hostname: ap-lobby\nrf_profile: HIGH\n")).is_err());
    }

    #[test]
    fn test_reboot_needs_macs() {
        assert!(AccessPointWant::from_entry(&entry("reboot_aps:\n  ap_mac_addresses: [ap-lobby]\n")).is_err());
        let want =
            AccessPointWant::from_entry(&entry("reboot_aps:\n  ap_mac_addresses: [\"aa:bb:cc:00:10:01\", \"AA:BB:CC:00:10:01\"]\n"))
                .unwrap();
        assert_eq!(want.reboot.len(), 1);
        assert!(want.configure.is_none());
    }

    #[test]
    fn test_settings_without_handle_rejected() {
        assert!(AccessPointWant::from_entry(&entry("led_status: Enabled\n")).is_err());
        assert!(AccessPointWant::from_entry(&entry("{}")).is_err());
    }
}
