//! Port assignment diff and writes.

use super::model::{PortAssignmentWant, SdaWant, NO_AUTHENTICATION};
use super::{EdgeDevice, SDA_WRITE_BATCH};
use crate::config::State;
use crate::driver::Context;
use crate::outcome::{Bucket, Family, OutcomeRecord, OutcomeReport};
use crate::plan::{Plan, PlanItem};
use crate::resolver::{DeviceHandle, INTERFACE_NOT_FOUND};
use controller_client::PortAssignment;
use tracing::{debug, info};

const ALREADY_ASSIGNED: &str = "Port assignment already in the requested state";
const NOT_ASSIGNED: &str = "Port assignment doesn't exist";

/// Template name with "absent" read as "No Authentication"
fn template(assignment: &PortAssignment) -> &str {
    assignment
        .authenticate_template_name
        .as_deref()
        .filter(|t| !t.is_empty())
        .unwrap_or(NO_AUTHENTICATION)
}

fn description(assignment: &PortAssignment) -> Option<&str> {
    assignment.interface_description.as_deref().filter(|d| !d.trim().is_empty())
}

/// Field-wise equality over the compared attributes
pub fn same_assignment(have: &PortAssignment, want: &PortAssignment) -> bool {
    have.interface_name == want.interface_name
        && have.connected_device_type.eq_ignore_ascii_case(&want.connected_device_type)
        && have.data_vlan_name == want.data_vlan_name
        && have.voice_vlan_name == want.voice_vlan_name
        && template(have) == template(want)
        && description(have) == description(want)
        && have.security_group_name == want.security_group_name
}

/// Full desired record; fields the request omits keep their current value
fn desired(
    want: &PortAssignmentWant,
    existing: Option<&PortAssignment>,
    fabric_id: &str,
    device_id: &str,
) -> PortAssignment {
    let keep = |requested: &Option<String>, current: fn(&PortAssignment) -> &Option<String>| {
        requested.clone().or_else(|| existing.and_then(|e| current(e).clone()))
    };
    PortAssignment {
        id: existing.and_then(|e| e.id.clone()),
        fabric_id: fabric_id.to_string(),
        network_device_id: device_id.to_string(),
        interface_name: want.interface_name.clone(),
        connected_device_type: match want.connected_device_type {
            Some(kind) => kind.as_str().to_string(),
            None => existing.map(|e| e.connected_device_type.clone()).unwrap_or_default(),
        },
        data_vlan_name: keep(&want.data_vlan_name, |e| &e.data_vlan_name),
        voice_vlan_name: keep(&want.voice_vlan_name, |e| &e.voice_vlan_name),
        authenticate_template_name: keep(&want.authentication_template_name, |e| &e.authenticate_template_name),
        security_group_name: keep(&want.security_group_name, |e| &e.security_group_name),
        interface_description: keep(&want.interface_description, |e| &e.interface_description),
    }
}

/// Plan keyed by interface name
///
/// Interfaces missing on the device are left out on `merged`; the caller
/// reports them separately.
pub fn plan(want: &SdaWant, device: &EdgeDevice, fabric_id: &str, state: State) -> Plan<String, PortAssignment> {
    let mut plan = Plan::new();
    let find = |name: &str| device.port_assignments.iter().find(|a| a.interface_name == name);

    match state {
        State::Merged => {
            for requested in &want.port_assignments {
                if device.missing_interfaces.contains(&requested.interface_name) {
                    continue;
                }
                let existing = find(&requested.interface_name);
                let target = desired(requested, existing, fabric_id, &device.id);
                let item = match existing {
                    None => PlanItem::Create(target),
                    Some(current) if same_assignment(current, &target) => PlanItem::NoOp(ALREADY_ASSIGNED.to_string()),
                    Some(current) => PlanItem::Update {
                        id: current.id.clone().unwrap_or_default(),
                        patch: target,
                    },
                };
                plan.push(requested.interface_name.clone(), item);
            }
        }
        State::Deleted if want.delete_all => {
            for current in &device.port_assignments {
                plan.push(
                    current.interface_name.clone(),
                    PlanItem::Delete(current.id.clone().unwrap_or_default()),
                );
            }
        }
        State::Deleted => {
            for requested in &want.port_assignments {
                let item = match find(&requested.interface_name) {
                    Some(current) => PlanItem::Delete(current.id.clone().unwrap_or_default()),
                    None => PlanItem::NoOp(NOT_ASSIGNED.to_string()),
                };
                plan.push(requested.interface_name.clone(), item);
            }
        }
    }
    plan
}

/// Write the port assignments of one device
pub async fn apply(
    ctx: &Context<'_>,
    handle: &DeviceHandle,
    want: &SdaWant,
    device: &EdgeDevice,
    fabric_id: &str,
    state: State,
    report: &mut OutcomeReport,
) {
    let record = |interface: &str| handle.record().with_interface(interface);

    if state == State::Merged {
        for requested in want
            .port_assignments
            .iter()
            .filter(|p| device.missing_interfaces.contains(&p.interface_name))
        {
            report.record(
                Family::PortAssignments,
                Bucket::NotUpdated,
                record(&requested.interface_name).with_reason(INTERFACE_NOT_FOUND),
            );
        }
    }

    let plan = plan(want, device, fabric_id, state);
    for (interface, reason) in plan.noops() {
        debug!("Port assignment {}: {}", interface, reason);
        match state {
            State::Merged => {
                report.record(Family::PortAssignments, Bucket::NotUpdated, record(interface).with_reason(reason))
            }
            State::Deleted => report.record(Family::PortAssignments, Bucket::Absent, record(interface)),
        }
    }
    if want.delete_all && plan.is_empty() {
        debug!("No port assignments on {}", handle);
        report.record(Family::PortAssignments, Bucket::Absent, handle.record());
        return;
    }

    let executor = ctx.executor();
    let client = ctx.client;

    let creates: Vec<PortAssignment> = plan.creates().map(|(_, a)| a.clone()).collect();
    if !creates.is_empty() {
        info!("Adding {} port assignments on {}", creates.len(), handle);
        let results = executor
            .execute_chunked(report, "add port assignments", &creates, SDA_WRITE_BATCH, |chunk| {
                client.add_port_assignments(chunk)
            })
            .await;
        for chunk in results {
            for assignment in chunk.items {
                let record = record(&assignment.interface_name);
                match &chunk.result {
                    Ok(()) => report.record(Family::PortAssignments, Bucket::Created, record),
                    Err(reason) => {
                        report.record(Family::PortAssignments, Bucket::NotUpdated, record.with_reason(reason.clone()))
                    }
                }
            }
        }
    }

    let updates: Vec<PortAssignment> = plan.updates().map(|(_, _, a)| a.clone()).collect();
    if !updates.is_empty() {
        info!("Updating {} port assignments on {}", updates.len(), handle);
        let results = executor
            .execute_chunked(report, "update port assignments", &updates, SDA_WRITE_BATCH, |chunk| {
                client.update_port_assignments(chunk)
            })
            .await;
        for chunk in results {
            for assignment in chunk.items {
                let mut record = record(&assignment.interface_name);
                if let Some(id) = &assignment.id {
                    record = record.with_id(id);
                }
                match &chunk.result {
                    Ok(()) => report.record(Family::PortAssignments, Bucket::Updated, record),
                    Err(reason) => {
                        report.record(Family::PortAssignments, Bucket::NotUpdated, record.with_reason(reason.clone()))
                    }
                }
            }
        }
    }

    let deletes: Vec<(&String, &str)> = plan.deletes().collect();
    if deletes.is_empty() {
        return;
    }
    if want.delete_all {
        info!("Deleting all {} port assignments on {}", deletes.len(), handle);
        let result = executor
            .execute(
                report,
                &format!("delete port assignments of {}", handle),
                client.delete_port_assignments(fabric_id, &device.id, None),
            )
            .await;
        for (interface, id) in deletes {
            record_delete(report, record(interface).with_id(id), &result);
        }
    } else {
        for (interface, id) in deletes {
            info!("Deleting port assignment {} on {}", interface, handle);
            let result = executor
                .execute(
                    report,
                    &format!("delete port assignment {}", interface),
                    client.delete_port_assignments(fabric_id, &device.id, Some(interface)),
                )
                .await;
            record_delete(report, record(interface).with_id(id), &result);
        }
    }
}

fn record_delete(report: &mut OutcomeReport, record: OutcomeRecord, result: &Result<(), String>) {
    match result {
        Ok(()) => report.record(Family::PortAssignments, Bucket::Deleted, record),
        Err(reason) => report.record(Family::PortAssignments, Bucket::NotDeleted, record.with_reason(reason.clone())),
    }
}

/// Mismatches between the request and freshly read assignments
pub fn verify(want: &SdaWant, device: &EdgeDevice, fabric_id: &str, state: State) -> Vec<String> {
    let mut mismatches = Vec::new();
    if state == State::Merged {
        for requested in want
            .port_assignments
            .iter()
            .filter(|p| device.missing_interfaces.contains(&p.interface_name))
        {
            mismatches.push(format!("Interface {} doesn't exist on the device", requested.interface_name));
        }
    }
    let plan = plan(want, device, fabric_id, state);
    for interface in plan.pending_keys() {
        match state {
            State::Merged => mismatches.push(format!("Port assignment on {} is not in the requested state", interface)),
            State::Deleted => mismatches.push(format!("Port assignment on {} still exists", interface)),
        }
    }
    mismatches
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sda::model::ConnectedDeviceType;
    use std::collections::BTreeSet;

    fn assignment(interface: &str) -> PortAssignment {
        PortAssignment {
            id: Some(format!("pa-{}", interface)),
            fabric_id: "f1".to_string(),
            network_device_id: "d1".to_string(),
            interface_name: interface.to_string(),
            connected_device_type: "USER_DEVICE".to_string(),
            data_vlan_name: Some("DATA".to_string()),
            ..Default::default()
        }
    }

    fn request(interface: &str) -> PortAssignmentWant {
        PortAssignmentWant {
            interface_name: interface.to_string(),
            connected_device_type: Some(ConnectedDeviceType::UserDevice),
            data_vlan_name: Some("DATA".to_string()),
            voice_vlan_name: None,
            authentication_template_name: None,
            security_group_name: None,
            interface_description: None,
        }
    }

    fn sda_want(port_assignments: Vec<PortAssignmentWant>) -> SdaWant {
        SdaWant {
            fabric_site: "Global/Site".to_string(),
            device: Some(DeviceHandle::Ip("10.0.0.1".to_string())),
            port_assignments,
            port_channels: vec![],
            vlan_ssids: vec![],
            delete_all: false,
        }
    }

    fn edge(port_assignments: Vec<PortAssignment>) -> EdgeDevice {
        EdgeDevice {
            id: "d1".to_string(),
            port_assignments,
            port_channels: vec![],
            missing_interfaces: BTreeSet::new(),
        }
    }

    #[test]
    fn test_absent_template_matches_no_authentication() {
        let mut have = assignment("Gi1/0/1");
        have.authenticate_template_name = None;
        let mut want = assignment("Gi1/0/1");
        want.authenticate_template_name = Some(NO_AUTHENTICATION.to_string());
        assert!(same_assignment(&have, &want));

        want.authenticate_template_name = Some("Closed Authentication".to_string());
        assert!(!same_assignment(&have, &want));
    }

    #[test]
    fn test_empty_description_matches_absent() {
        let mut have = assignment("Gi1/0/1");
        have.interface_description = Some(String::new());
        let want = assignment("Gi1/0/1");
        assert!(same_assignment(&have, &want));
    }

    #[test]
    fn test_omitted_fields_keep_current_values() {
        let mut current = assignment("Gi1/0/1");
        current.voice_vlan_name = Some("VOICE".to_string());
        let plan = plan(&sda_want(vec![request("Gi1/0/1")]), &edge(vec![current]), "f1", State::Merged);
        assert!(plan.is_empty());
        assert_eq!(plan.noops().next().map(|(_, r)| r), Some(ALREADY_ASSIGNED));
    }

    #[test]
    fn test_plan_create_update_delete() {
        let mut changed = request("Gi1/0/2");
        changed.data_vlan_name = Some("GUEST".to_string());
        let want = sda_want(vec![request("Gi1/0/1"), changed]);
        let device = edge(vec![assignment("Gi1/0/2")]);

        let merged = plan(&want, &device, "f1", State::Merged);
        assert_eq!(merged.creates().count(), 1);
        let (_, id, patch) = merged.updates().next().unwrap();
        assert_eq!(id, "pa-Gi1/0/2");
        assert_eq!(patch.data_vlan_name.as_deref(), Some("GUEST"));

        let deleted = plan(&want, &device, "f1", State::Deleted);
        assert_eq!(deleted.deletes().map(|(k, _)| k.as_str()).collect::<Vec<_>>(), vec!["Gi1/0/2"]);
        assert_eq!(deleted.noops().count(), 1);
    }

    #[test]
    fn test_missing_interface_is_not_planned() {
        let mut device = edge(vec![]);
        device.missing_interfaces.insert("Gi1/0/9".to_string());
        let want = sda_want(vec![request("Gi1/0/9")]);
        assert_eq!(plan(&want, &device, "f1", State::Merged).len(), 0);
        assert_eq!(verify(&want, &device, "f1", State::Merged).len(), 1);
    }
}
