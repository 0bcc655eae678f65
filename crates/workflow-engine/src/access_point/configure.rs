//! Access point configuration diff.
//!
//! The configure call only touches populated fields, so the request carries
//! exactly the settings that differ from the current configuration. Radios
//! are matched by radio type.

use super::model::{ApConfigWant, ApSettings, RadioWant};
use super::ApState;
use crate::driver::Context;
use crate::outcome::{Bucket, Family, OutcomeReport};
use crate::resolver::DeviceHandle;
use crate::validate::RadioBand;
use controller_client::{ApConfigRequest, ApConfiguration, ApListEntry, RadioConfiguration};
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Field whose value the Controller may flip on a repeated write
pub const BEST_EFFORT_FIELD: &str = "is_assigned_site_as_location";

/// Fields to change on one AP
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigDelta {
    pub request: ApConfigRequest,
    /// Names of the differing fields
    pub fields: Vec<String>,
}

impl ConfigDelta {
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

fn changed<T: PartialEq + Clone>(field: &str, want: &Option<T>, have: &Option<T>, fields: &mut Vec<String>) -> Option<T> {
    match want {
        Some(value) if have.as_ref() != Some(value) => {
            fields.push(field.to_string());
            Some(value.clone())
        }
        _ => None,
    }
}

/// Copy the differing AP-level settings into `request`
pub fn settings_delta(want: &ApSettings, have: &ApConfiguration, request: &mut ApConfigRequest, fields: &mut Vec<String>) {
    request.admin_status = changed("admin_status", &want.admin_status, &have.admin_status, fields);
    request.led_status = changed("led_status", &want.led_status, &have.led_status, fields);
    request.led_brightness_level = changed(
        "led_brightness_level",
        &want.led_brightness_level,
        &have.led_brightness_level,
        fields,
    );
    request.ap_mode = changed("ap_mode", &want.ap_mode, &have.ap_mode, fields);
    request.location = changed("location", &want.location, &have.location, fields);
    request.is_assigned_site_as_location = changed(
        BEST_EFFORT_FIELD,
        &want.is_assigned_site_as_location,
        &have.is_assigned_site_as_location,
        fields,
    );
    request.failover_priority = changed("failover_priority", &want.failover_priority, &have.failover_priority, fields);
    request.primary_controller_name = changed(
        "primary_controller_name",
        &want.primary_controller_name,
        &have.primary_controller_name,
        fields,
    );
    request.primary_ip_address = changed("primary_ip_address", &want.primary_ip_address, &have.primary_ip_address, fields);
    request.secondary_controller_name = changed(
        "secondary_controller_name",
        &want.secondary_controller_name,
        &have.secondary_controller_name,
        fields,
    );
    request.secondary_ip_address = changed(
        "secondary_ip_address",
        &want.secondary_ip_address,
        &have.secondary_ip_address,
        fields,
    );
    request.tertiary_controller_name = changed(
        "tertiary_controller_name",
        &want.tertiary_controller_name,
        &have.tertiary_controller_name,
        fields,
    );
    request.tertiary_ip_address = changed(
        "tertiary_ip_address",
        &want.tertiary_ip_address,
        &have.tertiary_ip_address,
        fields,
    );
}

fn radio_delta(band: RadioBand, want: &RadioWant, have: &RadioConfiguration, fields: &mut Vec<String>) -> Option<RadioConfiguration> {
    let before = fields.len();
    let prefix = band.label();
    let field = |name: &str| format!("{} {}", prefix, name);
    let radio = RadioConfiguration {
        radio_type: band.radio_type(),
        slot_id: have.slot_id,
        admin_status: changed(&field("admin_status"), &want.admin_status, &have.admin_status, fields),
        antenna_pattern_name: changed(&field("antenna_name"), &want.antenna_name, &have.antenna_pattern_name, fields),
        antenna_gain: changed(&field("antenna_gain"), &want.antenna_gain, &have.antenna_gain, fields),
        cable_loss: changed(&field("cable_loss"), &want.cable_loss, &have.cable_loss, fields),
        channel_assignment_mode: changed(
            &field("channel_assignment_mode"),
            &want.channel_assignment_mode,
            &have.channel_assignment_mode,
            fields,
        ),
        channel_number: changed(&field("channel_number"), &want.channel_number, &have.channel_number, fields),
        channel_width: changed(&field("channel_width"), &want.channel_width, &have.channel_width, fields),
        power_assignment_mode: changed(
            &field("power_assignment_mode"),
            &want.power_assignment_mode,
            &have.power_assignment_mode,
            fields,
        ),
        powerlevel: changed(&field("power_level"), &want.power_level, &have.powerlevel, fields),
        radio_role_assignment: changed(
            &field("radio_role_assignment"),
            &want.radio_role_assignment,
            &have.radio_role_assignment,
            fields,
        ),
    };
    (fields.len() > before).then_some(radio)
}

/// Differences between the requested and the current configuration
///
/// `Err` names a requested radio band the AP does not have.
pub fn delta(
    ap_name: Option<&str>,
    settings: &ApSettings,
    radios: &BTreeMap<RadioBand, RadioWant>,
    ap: &ApState,
) -> Result<ConfigDelta, String> {
    let mut fields = Vec::new();
    let mut request = ApConfigRequest::default();
    settings_delta(settings, &ap.config, &mut request, &mut fields);

    for (band, want) in radios {
        let current = ap
            .config
            .radio_dtos
            .iter()
            .find(|r| r.radio_type == band.radio_type())
            .ok_or_else(|| format!("Access point {} has no {} radio", ap.config.ap_name, band.label()))?;
        if let Some(radio) = radio_delta(*band, want, current, &mut fields) {
            request.radio_configurations.push(radio);
        }
    }

    let ap_name_new = match ap_name {
        Some(name) if name != ap.config.ap_name => {
            fields.push("ap_name".to_string());
            Some(name.to_string())
        }
        _ => None,
    };
    request.ap_list = vec![ApListEntry {
        ap_name: ap.config.ap_name.clone(),
        mac_address: ap.radio_mac.clone(),
        ap_name_new,
    }];
    Ok(ConfigDelta { request, fields })
}

/// Configure one AP if anything differs
pub async fn apply(ctx: &Context<'_>, handle: &DeviceHandle, want: &ApConfigWant, ap: &ApState, report: &mut OutcomeReport) {
    let record = handle.record().with_id(&ap.device_id).with_name(&ap.config.ap_name);
    let delta = match delta(want.ap_name.as_deref(), &want.settings, &want.radios, ap) {
        Ok(delta) => delta,
        Err(reason) => {
            report.record(Family::AccessPoints, Bucket::NotUpdated, record.with_reason(reason));
            return;
        }
    };
    if delta.is_empty() {
        debug!("{} already in the requested configuration", handle);
        report.record(
            Family::AccessPoints,
            Bucket::NotUpdated,
            record.with_reason("AP configuration already in the requested state"),
        );
        return;
    }

    info!("Updating {} on {}: {}", delta.fields.join(", "), ap.config.ap_name, handle);
    let result = ctx
        .executor()
        .execute(
            report,
            &format!("configure access point {}", ap.config.ap_name),
            ctx.client.configure_access_points(&delta.request),
        )
        .await;
    match result {
        Ok(()) => report.record(Family::AccessPoints, Bucket::Updated, record),
        Err(reason) => report.record(Family::AccessPoints, Bucket::NotUpdated, record.with_reason(reason)),
    }
}

/// Split the remaining differences into hard and best-effort mismatches
pub fn verify(label: &str, delta: &ConfigDelta, mismatches: &mut Vec<String>, best_effort: &mut Vec<String>) {
    for field in &delta.fields {
        let note = format!("{} of {} is not in the requested state", field, label);
        if field == BEST_EFFORT_FIELD {
            best_effort.push(note);
        } else {
            mismatches.push(note);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> ApState {
        ApState {
            device_id: "ap-1".to_string(),
            hostname: "AP-LOBBY".to_string(),
            radio_mac: "aa:bb:cc:00:10:01".to_string(),
            config: ApConfiguration {
                ap_name: "AP-LOBBY".to_string(),
                admin_status: Some("Enabled".to_string()),
                led_status: Some("Enabled".to_string()),
                radio_dtos: vec![RadioConfiguration {
                    radio_type: 1,
                    slot_id: Some(0),
                    channel_number: Some(1),
                    powerlevel: Some(3),
                    ..Default::default()
                }],
                ..Default::default()
            },
        }
    }

    #[test]
    fn test_only_differing_fields_are_sent() {
        let settings = ApSettings {
            admin_status: Some("Enabled".to_string()),
            led_status: Some("Disabled".to_string()),
            ..Default::default()
        };
        let radios = BTreeMap::from([(
            RadioBand::Ghz24,
            RadioWant {
                channel_number: Some(6),
                power_level: Some(3),
                ..Default::default()
            },
        )]);
        let delta = delta(None, &settings, &radios, &state()).unwrap();

        assert_eq!(delta.fields, vec!["led_status", "2.4 GHz channel_number"]);
        assert_eq!(delta.request.admin_status, None);
        assert_eq!(delta.request.led_status.as_deref(), Some("Disabled"));
        let radio = &delta.request.radio_configurations[0];
        assert_eq!((radio.radio_type, radio.slot_id, radio.channel_number, radio.powerlevel), (1, Some(0), Some(6), None));
        assert_eq!(delta.request.ap_list[0].mac_address, "aa:bb:cc:00:10:01");
    }

    #[test]
    fn test_rename_and_missing_radio() {
        let delta = delta(Some("AP-ATRIUM"), &ApSettings::default(), &BTreeMap::new(), &state()).unwrap();
        assert_eq!(delta.request.ap_list[0].ap_name_new.as_deref(), Some("AP-ATRIUM"));

        let same = super::delta(Some("AP-LOBBY"), &ApSettings::default(), &BTreeMap::new(), &state()).unwrap();
        assert!(same.is_empty());

        let six = BTreeMap::from([(RadioBand::Ghz6, RadioWant::default())]);
        let err = super::delta(None, &ApSettings::default(), &six, &state()).unwrap_err();
        assert!(err.contains("no 6 GHz radio"));
    }

    #[test]
    fn test_location_flag_is_best_effort() {
        let settings = ApSettings {
            is_assigned_site_as_location: Some("Enabled".to_string()),
            led_status: Some("Disabled".to_string()),
            ..Default::default()
        };
        let delta = delta(None, &settings, &BTreeMap::new(), &state()).unwrap();
        let (mut hard, mut soft) = (Vec::new(), Vec::new());
        verify("AP-LOBBY", &delta, &mut hard, &mut soft);
        assert_eq!(hard.len(), 1);
        assert_eq!(soft.len(), 1);
        assert!(soft[0].starts_with(BEST_EFFORT_FIELD));
    }
}
