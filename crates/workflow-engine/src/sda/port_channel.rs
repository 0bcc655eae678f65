//! Port channel diff and writes.
//!
//! A requested channel matches an existing one when their interface sets
//! intersect. The protocol of an existing channel never changes.

use super::model::{ChannelDeviceType, ChannelProtocol, PortChannelWant, SdaWant};
use super::{EdgeDevice, SDA_WRITE_BATCH};
use crate::config::State;
use crate::driver::Context;
use crate::error::WorkflowError;
use crate::outcome::{Bucket, Family, OutcomeRecord, OutcomeReport};
use crate::paginator;
use crate::plan::PlanItem;
use crate::resolver::{DeviceHandle, INTERFACE_NOT_FOUND};
use controller_client::PortChannel;
use std::collections::BTreeSet;
use tracing::{debug, info, warn};

const ALREADY_CONFIGURED: &str = "Port channel already in the requested state";

fn interface_set(channel: &PortChannel) -> BTreeSet<&str> {
    channel.interface_names.iter().map(String::as_str).collect()
}

fn description(channel: &PortChannel) -> Option<&str> {
    channel.port_channel_description.as_deref().filter(|d| !d.trim().is_empty())
}

fn channel_name(channel: &PortChannel) -> &str {
    channel.port_channel_name.as_deref().unwrap_or("port channel")
}

/// Existing channel sharing an interface with the request
///
/// A request spanning two existing channels cannot be expressed as one update.
pub fn find_match<'a>(
    want: &PortChannelWant,
    existing: &'a [PortChannel],
) -> Result<Option<&'a PortChannel>, WorkflowError> {
    let requested = want.interface_set();
    let matches: Vec<&PortChannel> = existing
        .iter()
        .filter(|c| !interface_set(c).is_disjoint(&requested))
        .collect();
    match matches.as_slice() {
        [] => Ok(None),
        [single] => Ok(Some(single)),
        several => {
            let names: Vec<&str> = several.iter().map(|c| channel_name(c)).collect();
            Err(WorkflowError::PreconditionViolation(format!(
                "Interfaces {} belong to several port channels: {}",
                want.label(),
                names.join(", ")
            )))
        }
    }
}

fn check_member_count(want: &PortChannelWant, protocol: ChannelProtocol) -> Result<(), WorkflowError> {
    let limit = protocol.max_members();
    if want.interface_names.len() > limit {
        return Err(WorkflowError::PreconditionViolation(format!(
            "A {} port channel takes at most {} interfaces, {} requested",
            protocol.as_str(),
            limit,
            want.interface_names.len()
        )));
    }
    Ok(())
}

/// Plan one requested channel against the device's channels
pub fn plan_channel(
    want: &PortChannelWant,
    existing: &[PortChannel],
    fabric_id: &str,
    device_id: &str,
    state: State,
) -> Result<PlanItem<PortChannel>, WorkflowError> {
    let current = find_match(want, existing)?;

    if state == State::Deleted {
        return Ok(match current {
            Some(channel) => PlanItem::Delete(channel.id.clone().unwrap_or_default()),
            None => PlanItem::NoOp("Port channel doesn't exist".to_string()),
        });
    }

    let Some(current) = current else {
        let kind = want.connected_device_type.unwrap_or(ChannelDeviceType::Trunk);
        let protocol = want.protocol.unwrap_or_else(|| kind.default_protocol());
        check_member_count(want, protocol)?;
        return Ok(PlanItem::Create(PortChannel {
            id: None,
            fabric_id: fabric_id.to_string(),
            network_device_id: device_id.to_string(),
            port_channel_name: None,
            interface_names: want.interface_names.clone(),
            connected_device_type: kind.as_str().to_string(),
            protocol: Some(protocol.as_str().to_string()),
            port_channel_description: want.description.clone(),
        }));
    };

    let existing_protocol = current.protocol.as_deref().and_then(ChannelProtocol::parse);
    if let (Some(requested), Some(actual)) = (want.protocol, existing_protocol) {
        if requested != actual {
            return Err(WorkflowError::PreconditionViolation(format!(
                "Protocol of {} is {} and cannot be changed to {}",
                channel_name(current),
                actual.as_str(),
                requested.as_str()
            )));
        }
    }
    let existing_type = ChannelDeviceType::parse(&current.connected_device_type);
    match (existing_type, want.connected_device_type) {
        (Some(ChannelDeviceType::Trunk), Some(ChannelDeviceType::ExtendedNode))
            if existing_protocol != Some(ChannelProtocol::Pagp) =>
        {
            return Err(WorkflowError::PreconditionViolation(format!(
                "{} can move from TRUNK to EXTENDED_NODE only with protocol PAGP",
                channel_name(current)
            )));
        }
        (Some(ChannelDeviceType::ExtendedNode), Some(ChannelDeviceType::Trunk)) => {
            return Err(WorkflowError::PreconditionViolation(format!(
                "{} cannot move from EXTENDED_NODE back to TRUNK",
                channel_name(current)
            )));
        }
        _ => {}
    }
    if let Some(protocol) = existing_protocol.or(want.protocol) {
        check_member_count(want, protocol)?;
    }

    let target = PortChannel {
        id: current.id.clone(),
        fabric_id: fabric_id.to_string(),
        network_device_id: device_id.to_string(),
        port_channel_name: current.port_channel_name.clone(),
        interface_names: want.interface_names.clone(),
        connected_device_type: want
            .connected_device_type
            .map_or_else(|| current.connected_device_type.clone(), |kind| kind.as_str().to_string()),
        protocol: current.protocol.clone(),
        port_channel_description: want
            .description
            .clone()
            .or_else(|| current.port_channel_description.clone()),
    };
    let unchanged = interface_set(current) == want.interface_set()
        && want.connected_device_type.is_none_or(|kind| existing_type == Some(kind))
        && description(current) == description(&target);
    Ok(if unchanged {
        PlanItem::NoOp(ALREADY_CONFIGURED.to_string())
    } else {
        PlanItem::Update {
            id: current.id.clone().unwrap_or_default(),
            patch: target,
        }
    })
}

fn record_for(handle: &DeviceHandle, want: &PortChannelWant, channel: Option<&PortChannel>) -> OutcomeRecord {
    let record = handle.record().with_interface(want.label());
    match channel {
        Some(channel) => {
            let record = match &channel.id {
                Some(id) => record.with_id(id),
                None => record,
            };
            match &channel.port_channel_name {
                Some(name) => record.with_name(name),
                None => record,
            }
        }
        None => record,
    }
}

/// Write the port channels of one device
pub async fn apply(
    ctx: &Context<'_>,
    handle: &DeviceHandle,
    want: &SdaWant,
    device: &EdgeDevice,
    fabric_id: &str,
    state: State,
    report: &mut OutcomeReport,
) -> Result<(), WorkflowError> {
    if want.delete_all {
        delete_all(ctx, handle, device, report).await;
        return Ok(());
    }

    let not_done = match state {
        State::Merged => Bucket::NotUpdated,
        State::Deleted => Bucket::NotDeleted,
    };
    let mut creates: Vec<(PortChannel, &PortChannelWant)> = Vec::new();
    let mut updates: Vec<(PortChannel, &PortChannelWant)> = Vec::new();
    let mut deletes: Vec<(String, &PortChannelWant)> = Vec::new();

    for requested in &want.port_channels {
        let current = find_match(requested, &device.port_channels).ok().flatten();
        let record = record_for(handle, requested, current);

        if state == State::Merged {
            let missing: Vec<&str> = requested
                .interface_names
                .iter()
                .filter(|n| device.missing_interfaces.contains(*n))
                .map(String::as_str)
                .collect();
            if !missing.is_empty() {
                report.record(
                    Family::PortChannels,
                    Bucket::NotUpdated,
                    record.with_reason(format!("{}: {}", INTERFACE_NOT_FOUND, missing.join(", "))),
                );
                continue;
            }
        }

        match plan_channel(requested, &device.port_channels, fabric_id, &device.id, state) {
            Ok(PlanItem::Create(channel)) => creates.push((channel, requested)),
            Ok(PlanItem::Update { patch, .. }) => updates.push((patch, requested)),
            Ok(PlanItem::Delete(id)) => deletes.push((id, requested)),
            Ok(PlanItem::NoOp(reason)) => {
                debug!("Port channel {}: {}", requested.label(), reason);
                match state {
                    State::Merged => report.record(Family::PortChannels, Bucket::NotUpdated, record.with_reason(reason)),
                    State::Deleted => report.record(Family::PortChannels, Bucket::Absent, record),
                }
            }
            Err(e) if e.is_fatal() => {
                warn!("Port channel {} left untouched: {}", requested.label(), e);
                report.record(Family::PortChannels, not_done, record.with_reason(e.to_string()));
                report.fail(&e);
            }
            Err(e) => return Err(e),
        }
    }

    let executor = ctx.executor();
    let client = ctx.client;

    if !creates.is_empty() {
        info!("Adding {} port channels on {}", creates.len(), handle);
        let channels: Vec<PortChannel> = creates.iter().map(|(c, _)| c.clone()).collect();
        let results = executor
            .execute_chunked(report, "add port channels", &channels, SDA_WRITE_BATCH, |chunk| {
                client.add_port_channels(chunk)
            })
            .await;
        let failures: Vec<(BTreeSet<String>, String)> = results
            .iter()
            .filter_map(|chunk| chunk.result.as_ref().err().map(|reason| (chunk.items, reason)))
            .flat_map(|(items, reason)| {
                items
                    .iter()
                    .map(move |c| (c.interface_names.iter().cloned().collect(), reason.clone()))
            })
            .collect();

        // Names and ids are assigned by the Controller
        let stored = if failures.len() < creates.len() {
            paginator::fetch_all(|offset, limit| client.query_port_channels(fabric_id, &device.id, offset, limit))
                .await?
        } else {
            Vec::new()
        };
        for (channel, requested) in &creates {
            let set: BTreeSet<String> = channel.interface_names.iter().cloned().collect();
            match failures.iter().find(|(failed, _)| *failed == set) {
                Some((_, reason)) => report.record(
                    Family::PortChannels,
                    Bucket::NotUpdated,
                    record_for(handle, requested, None).with_reason(reason.clone()),
                ),
                None => {
                    let created = stored.iter().find(|c| c.interface_names.iter().cloned().collect::<BTreeSet<_>>() == set);
                    report.record(Family::PortChannels, Bucket::Created, record_for(handle, requested, created));
                }
            }
        }
    }

    if !updates.is_empty() {
        info!("Updating {} port channels on {}", updates.len(), handle);
        let channels: Vec<PortChannel> = updates.iter().map(|(c, _)| c.clone()).collect();
        let results = executor
            .execute_chunked(report, "update port channels", &channels, SDA_WRITE_BATCH, |chunk| {
                client.update_port_channels(chunk)
            })
            .await;
        for chunk in results {
            for channel in chunk.items {
                let Some((_, requested)) = updates.iter().find(|(c, _)| c.id == channel.id) else {
                    continue;
                };
                let record = record_for(handle, requested, Some(channel));
                match &chunk.result {
                    Ok(()) => report.record(Family::PortChannels, Bucket::Updated, record),
                    Err(reason) => {
                        report.record(Family::PortChannels, Bucket::NotUpdated, record.with_reason(reason.clone()))
                    }
                }
            }
        }
    }

    for (id, requested) in deletes {
        let current = device.port_channels.iter().find(|c| c.id.as_deref() == Some(id.as_str()));
        let record = record_for(handle, requested, current);
        info!("Deleting port channel {} on {}", id, handle);
        match executor
            .execute(report, &format!("delete port channel {}", id), client.delete_port_channel(&id))
            .await
        {
            Ok(()) => report.record(Family::PortChannels, Bucket::Deleted, record),
            Err(reason) => report.record(Family::PortChannels, Bucket::NotDeleted, record.with_reason(reason)),
        }
    }
    Ok(())
}

async fn delete_all(ctx: &Context<'_>, handle: &DeviceHandle, device: &EdgeDevice, report: &mut OutcomeReport) {
    if device.port_channels.is_empty() {
        debug!("No port channels on {}", handle);
        report.record(Family::PortChannels, Bucket::Absent, handle.record());
        return;
    }
    let executor = ctx.executor();
    for channel in &device.port_channels {
        let Some(id) = channel.id.as_deref() else { continue };
        let record = handle
            .record()
            .with_interface(channel.interface_names.join(","))
            .with_id(id)
            .with_name(channel_name(channel));
        match executor
            .execute(
                report,
                &format!("delete port channel {}", channel_name(channel)),
                ctx.client.delete_port_channel(id),
            )
            .await
        {
            Ok(()) => report.record(Family::PortChannels, Bucket::Deleted, record),
            Err(reason) => report.record(Family::PortChannels, Bucket::NotDeleted, record.with_reason(reason)),
        }
    }
}

/// Mismatches between the request and freshly read channels
pub fn verify(want: &SdaWant, device: &EdgeDevice, fabric_id: &str, state: State) -> Vec<String> {
    if want.delete_all {
        return device
            .port_channels
            .iter()
            .map(|c| format!("{} still exists", channel_name(c)))
            .collect();
    }
    let mut mismatches = Vec::new();
    for requested in &want.port_channels {
        match plan_channel(requested, &device.port_channels, fabric_id, &device.id, state) {
            Ok(PlanItem::NoOp(_)) => {}
            Ok(_) => match state {
                State::Merged => mismatches.push(format!("Port channel {} is not in the requested state", requested.label())),
                State::Deleted => mismatches.push(format!("Port channel {} still exists", requested.label())),
            },
            Err(e) => mismatches.push(format!("Port channel {}: {}", requested.label(), e)),
        }
    }
    mismatches
}

#[cfg(test)]
mod tests {
    use super::*;

    fn existing(interfaces: &[&str], protocol: &str, kind: &str) -> PortChannel {
        PortChannel {
            id: Some("pc-1".to_string()),
            fabric_id: "f1".to_string(),
            network_device_id: "d1".to_string(),
            port_channel_name: Some("Port-channel1".to_string()),
            interface_names: interfaces.iter().map(|s| s.to_string()).collect(),
            connected_device_type: kind.to_string(),
            protocol: Some(protocol.to_string()),
            port_channel_description: None,
        }
    }

    fn request(interfaces: &[&str], protocol: Option<ChannelProtocol>, kind: ChannelDeviceType) -> PortChannelWant {
        PortChannelWant {
            interface_names: interfaces.iter().map(|s| s.to_string()).collect(),
            connected_device_type: Some(kind),
            protocol,
            description: None,
        }
    }

    #[test]
    fn test_protocol_change_is_precondition_violation() {
        let have = [existing(&["X", "Y"], "LACP", "TRUNK")];
        let want = request(&["X", "Y"], Some(ChannelProtocol::On), ChannelDeviceType::Trunk);
        let err = plan_channel(&want, &have, "f1", "d1", State::Merged).unwrap_err();
        assert!(matches!(err, WorkflowError::PreconditionViolation(_)));
    }

    #[test]
    fn test_trunk_to_extended_node_needs_pagp() {
        let want = request(&["X", "Y"], None, ChannelDeviceType::ExtendedNode);
        let on = [existing(&["X", "Y"], "ON", "TRUNK")];
        assert!(plan_channel(&want, &on, "f1", "d1", State::Merged).is_err());

        let pagp = [existing(&["X", "Y"], "PAGP", "TRUNK")];
        let item = plan_channel(&want, &pagp, "f1", "d1", State::Merged).unwrap();
        let PlanItem::Update { patch, .. } = item else {
            panic!("expected update");
        };
        assert_eq!(patch.connected_device_type, "EXTENDED_NODE");
        assert_eq!(patch.protocol.as_deref(), Some("PAGP"));
    }

    #[test]
    fn test_omitted_type_keeps_extended_node() {
        let mut current = existing(&["Gi1/0/10", "Gi1/0/11"], "PAGP", "EXTENDED_NODE");
        current.port_channel_description = Some("uplink".to_string());
        let have = [current];
        let mut want = request(&["Gi1/0/10", "Gi1/0/11"], None, ChannelDeviceType::Trunk);
        want.connected_device_type = None;
        want.description = Some("uplink".to_string());
        assert!(matches!(
            plan_channel(&want, &have, "f1", "d1", State::Merged).unwrap(),
            PlanItem::NoOp(_)
        ));

        want.interface_names.truncate(1);
        let PlanItem::Update { patch, .. } = plan_channel(&want, &have, "f1", "d1", State::Merged).unwrap() else {
            panic!("expected update");
        };
        assert_eq!(patch.connected_device_type, "EXTENDED_NODE");

        want.connected_device_type = Some(ChannelDeviceType::Trunk);
        let err = plan_channel(&want, &have, "f1", "d1", State::Merged).unwrap_err();
        assert!(matches!(err, WorkflowError::PreconditionViolation(_)));
    }

    #[test]
    fn test_matching_is_commutative() {
        let a = existing(&["X", "Y"], "ON", "TRUNK");
        let b = existing(&["Y", "Z"], "ON", "TRUNK");
        let want_a = request(&["X", "Y"], None, ChannelDeviceType::Trunk);
        let want_b = request(&["Y", "Z"], None, ChannelDeviceType::Trunk);
        assert!(find_match(&want_a, std::slice::from_ref(&b)).unwrap().is_some());
        assert!(find_match(&want_b, std::slice::from_ref(&a)).unwrap().is_some());
    }

    #[test]
    fn test_subset_trims_channel() {
        let have = [existing(&["X", "Y", "Z"], "LACP", "TRUNK")];
        let want = request(&["X", "Y"], None, ChannelDeviceType::Trunk);
        let PlanItem::Update { patch, .. } = plan_channel(&want, &have, "f1", "d1", State::Merged).unwrap() else {
            panic!("expected update");
        };
        assert_eq!(patch.interface_names, vec!["X".to_string(), "Y".to_string()]);
        assert_eq!(patch.port_channel_name.as_deref(), Some("Port-channel1"));
    }

    #[test]
    fn test_same_set_is_noop_and_new_set_is_create() {
        let have = [existing(&["X", "Y"], "ON", "TRUNK")];
        let same = request(&["Y", "X"], None, ChannelDeviceType::Trunk);
        assert!(matches!(
            plan_channel(&same, &have, "f1", "d1", State::Merged).unwrap(),
            PlanItem::NoOp(_)
        ));

        let fresh = request(&["A", "B"], None, ChannelDeviceType::ExtendedNode);
        let PlanItem::Create(channel) = plan_channel(&fresh, &have, "f1", "d1", State::Merged).unwrap() else {
            panic!("expected create");
        };
        assert_eq!(channel.protocol.as_deref(), Some("PAGP"));
    }

    #[test]
    fn test_member_count_uses_existing_protocol() {
        let names: Vec<String> = (1..=9).map(|n| format!("Gi1/0/{}", n)).collect();
        let refs: Vec<&str> = names.iter().map(String::as_str).collect();
        let have = [existing(&refs[..2], "ON", "TRUNK")];
        let want = request(&refs, None, ChannelDeviceType::Trunk);
        assert!(plan_channel(&want, &have, "f1", "d1", State::Merged).is_err());
    }

    #[test]
    fn test_request_spanning_two_channels() {
        let mut second = existing(&["Z"], "ON", "TRUNK");
        second.id = Some("pc-2".to_string());
        let have = [existing(&["X", "Y"], "ON", "TRUNK"), second];
        let want = request(&["Y", "Z"], None, ChannelDeviceType::Trunk);
        assert!(find_match(&want, &have).is_err());
    }
}
