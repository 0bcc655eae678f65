//! Explicit tag membership.
//!
//! Targets are resolved to `(member type, id)` keys, their full tag sets are
//! read in batches, and each set is rewritten as `existing ∪ requested`
//! (`merged`) or `existing \ requested` (`deleted`) through the batched
//! device/interface update endpoints.

use super::model::{MemberTarget, MembershipWant};
use crate::config::{RunOptions, State};
use crate::driver::Context;
use crate::error::WorkflowError;
use crate::executor::Executor;
use crate::outcome::{Bucket, Family, OutcomeRecord, OutcomeReport, TagListEntry};
use crate::resolver::{DeviceHandle, INTERFACE_NOT_FOUND};
use controller_client::{ControllerClientTrait, MemberTags, MemberType, TagRef};
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::{debug, info, warn};

/// Tags a single device or interface may carry
pub const MAX_TAGS_PER_MEMBER: usize = 500;

/// Identity of a taggable entity
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MemberKey {
    pub member_type: MemberType,
    pub id: String,
}

/// One membership item; `key` is `Err(reason)` when it did not resolve
#[derive(Debug, Clone)]
pub struct Member {
    pub record: OutcomeRecord,
    pub key: Result<MemberKey, String>,
}

/// Current state for a membership request
#[derive(Debug, Clone, Default)]
pub struct MembershipHave {
    pub members: Vec<Member>,
    /// Requested tag names that exist, with their ids
    pub tag_ids: BTreeMap<String, String>,
    /// Full tag set of every resolved member
    pub current: HashMap<MemberKey, Vec<TagRef>>,
}

impl MembershipHave {
    pub async fn read(ctx: &mut Context<'_>, want: &MembershipWant) -> Result<Self, WorkflowError> {
        let members = resolve_members(ctx, want).await?;
        let tag_ids = resolve_tag_ids(ctx.client, &want.tags).await?;
        let keys: Vec<MemberKey> = members.iter().filter_map(|m| m.key.clone().ok()).collect();
        let current = read_member_tags(ctx.client, ctx.options, &keys).await?;
        Ok(Self {
            members,
            tag_ids,
            current,
        })
    }
}

/// Resolve every target, de-duplicating members
pub async fn resolve_members(ctx: &mut Context<'_>, want: &MembershipWant) -> Result<Vec<Member>, WorkflowError> {
    let mut members = Vec::new();
    let mut seen: HashSet<MemberKey> = HashSet::new();

    for target in &want.targets {
        let resolved = match target {
            MemberTarget::Device { handle, port_names } => resolve_device(ctx, handle, port_names).await?,
            MemberTarget::Site { site_name, port_names } => resolve_site(ctx, site_name, port_names).await?,
        };
        for member in resolved {
            if let Ok(key) = &member.key {
                if !seen.insert(key.clone()) {
                    debug!("Skipping duplicate member {} {}", key.member_type, key.id);
                    continue;
                }
            }
            members.push(member);
        }
    }
    Ok(members)
}

async fn resolve_device(
    ctx: &mut Context<'_>,
    handle: &DeviceHandle,
    port_names: &[String],
) -> Result<Vec<Member>, WorkflowError> {
    let record = handle.record();
    let device = match ctx.resolver.device(handle).await {
        Ok(device) => device,
        Err(e) if !e.is_fatal() => {
            let records = if port_names.is_empty() {
                vec![record]
            } else {
                port_names.iter().map(|p| record.clone().with_interface(p)).collect()
            };
            return Ok(records
                .into_iter()
                .map(|record| Member {
                    record,
                    key: Err(e.reason()),
                })
                .collect());
        }
        Err(e) => return Err(e),
    };
    interface_members(ctx, record, &device.id, port_names).await
}

async fn resolve_site(
    ctx: &mut Context<'_>,
    site_name: &str,
    port_names: &[String],
) -> Result<Vec<Member>, WorkflowError> {
    let device_ids = match ctx.resolver.site_device_ids(site_name).await {
        Ok(ids) => ids,
        Err(e) if !e.is_fatal() => {
            let record = OutcomeRecord {
                site_name: Some(site_name.to_string()),
                ..Default::default()
            };
            return Ok(vec![Member {
                record,
                key: Err(e.reason()),
            }]);
        }
        Err(e) => return Err(e),
    };

    let mut members = Vec::new();
    for device_id in device_ids {
        let record = match ctx.resolver.device_by_id(&device_id).await {
            Ok(device) => match &device.hostname {
                Some(hostname) => OutcomeRecord::device("hostname", hostname.clone()),
                None => OutcomeRecord::device("id", device_id.clone()),
            },
            Err(e) if !e.is_fatal() => OutcomeRecord::device("id", device_id.clone()),
            Err(e) => return Err(e),
        }
        .with_site(site_name);
        members.extend(interface_members(ctx, record, &device_id, port_names).await?);
    }
    Ok(members)
}

async fn interface_members(
    ctx: &mut Context<'_>,
    record: OutcomeRecord,
    device_id: &str,
    port_names: &[String],
) -> Result<Vec<Member>, WorkflowError> {
    if port_names.is_empty() {
        return Ok(vec![Member {
            record,
            key: Ok(MemberKey {
                member_type: MemberType::NetworkDevice,
                id: device_id.to_string(),
            }),
        }]);
    }
    let resolved = ctx.resolver.interfaces(device_id, port_names).await?;
    Ok(resolved
        .into_iter()
        .map(|(name, result)| Member {
            record: record.clone().with_interface(&name),
            key: match result {
                Ok(interface) => Ok(MemberKey {
                    member_type: MemberType::Interface,
                    id: interface.id,
                }),
                Err(_) => Err(INTERFACE_NOT_FOUND.to_string()),
            },
        })
        .collect())
}

/// Ids of the named tags that exist
pub async fn resolve_tag_ids(
    client: &dyn ControllerClientTrait,
    names: &[String],
) -> Result<BTreeMap<String, String>, WorkflowError> {
    let mut ids = BTreeMap::new();
    for name in names {
        if let Some(tag) = client.query_tags(name).await?.into_iter().find(|t| &t.name == name) {
            ids.insert(name.clone(), tag.id);
        }
    }
    Ok(ids)
}

/// Read the full tag set of every member, batched per member type
pub async fn read_member_tags(
    client: &dyn ControllerClientTrait,
    options: &RunOptions,
    keys: &[MemberKey],
) -> Result<HashMap<MemberKey, Vec<TagRef>>, WorkflowError> {
    let mut current = HashMap::new();
    for member_type in [MemberType::NetworkDevice, MemberType::Interface] {
        let ids: Vec<String> = keys
            .iter()
            .filter(|k| k.member_type == member_type)
            .map(|k| k.id.clone())
            .collect();
        let batch = match member_type {
            MemberType::NetworkDevice => options.device_tag_read_batch.get(),
            MemberType::Interface => options.interface_tag_read_batch.get(),
        };
        for chunk in ids.chunks(batch) {
            debug!("Reading tags of {} {} members", chunk.len(), member_type);
            let sets = client.query_member_tags(member_type, chunk).await?;
            for set in sets {
                current.insert(
                    MemberKey {
                        member_type,
                        id: set.id,
                    },
                    set.tags,
                );
            }
        }
        for id in ids {
            current.entry(MemberKey { member_type, id }).or_default();
        }
    }
    Ok(current)
}

/// New tag set of a member and whether it differs from `current`
pub fn next_tag_set(state: State, current: &[TagRef], requested: &[TagRef]) -> (Vec<TagRef>, bool) {
    let has = |set: &[TagRef], id: &str| set.iter().any(|t| t.id == id);
    let next: Vec<TagRef> = match state {
        State::Merged => {
            let mut next = current.to_vec();
            next.extend(requested.iter().filter(|t| !has(current, &t.id)).cloned());
            next
        }
        State::Deleted => current.iter().filter(|t| !has(requested, &t.id)).cloned().collect(),
    };
    let changed = next.len() != current.len();
    (next, changed)
}

/// Rewrite tag sets in batches; returns the failure reason per member id
pub async fn write_member_tags(
    executor: Executor<'_>,
    client: &dyn ControllerClientTrait,
    options: &RunOptions,
    report: &mut OutcomeReport,
    member_type: MemberType,
    updates: &[MemberTags],
) -> HashMap<String, String> {
    let batch = match member_type {
        MemberType::NetworkDevice => options.device_tag_update_batch.get(),
        MemberType::Interface => options.interface_tag_update_batch.get(),
    };
    let description = format!("update {} tags", member_type);
    let results = executor
        .execute_chunked(report, &description, updates, batch, |chunk| {
            client.update_member_tags(member_type, chunk)
        })
        .await;

    let mut failures = HashMap::new();
    for chunk in results {
        if let Err(reason) = chunk.result {
            for item in chunk.items {
                failures.insert(item.id.clone(), reason.clone());
            }
        }
    }
    failures
}

/// Write the membership request
pub async fn apply_membership(
    ctx: &mut Context<'_>,
    want: &MembershipWant,
    have: &MembershipHave,
    state: State,
    report: &mut OutcomeReport,
) -> Result<(), WorkflowError> {
    let (done, not_done) = match state {
        State::Merged => (Bucket::Updated, Bucket::NotUpdated),
        State::Deleted => (Bucket::Deleted, Bucket::NotDeleted),
    };

    // Tags created earlier in this entry are not in `have` yet
    let tag_ids = if have.tag_ids.len() < want.tags.len() {
        resolve_tag_ids(ctx.client, &want.tags).await?
    } else {
        have.tag_ids.clone()
    };
    let missing: Vec<&String> = want.tags.iter().filter(|t| !tag_ids.contains_key(*t)).collect();
    if state == State::Merged && !missing.is_empty() {
        let names: Vec<&str> = missing.iter().map(|s| s.as_str()).collect();
        return Err(WorkflowError::InvalidInput(format!(
            "Tag(s) {} don't exist in Controller",
            names.join(", ")
        )));
    }

    let requested: Vec<TagRef> = want
        .tags
        .iter()
        .filter_map(|name| {
            tag_ids.get(name).map(|id| TagRef {
                id: id.clone(),
                name: Some(name.clone()),
            })
        })
        .collect();
    let tags_list: Vec<TagListEntry> = requested
        .iter()
        .map(|t| TagListEntry {
            tag_name: t.name.clone().unwrap_or_default(),
            tag_id: t.id.clone(),
        })
        .collect();

    // Plan every member before writing anything
    let mut pending: Vec<(MemberKey, Vec<TagRef>, OutcomeRecord)> = Vec::new();
    let mut over_limit = Vec::new();
    for member in &have.members {
        let record = member.record.clone().with_tags(tags_list.clone());
        let key = match &member.key {
            Ok(key) => key,
            Err(reason) => {
                report.record(Family::TagMembership, not_done, record.with_reason(reason.clone()));
                continue;
            }
        };
        let current = have.current.get(key).map(Vec::as_slice).unwrap_or_default();
        let (next, changed) = next_tag_set(state, current, &requested);
        if !changed {
            let reason = match state {
                State::Merged => "Member already carries the requested tags",
                State::Deleted => "Member doesn't carry the requested tags",
            };
            report.record(Family::TagMembership, not_done, record.with_reason(reason));
            continue;
        }
        if next.len() > MAX_TAGS_PER_MEMBER {
            over_limit.push(over_limit_label(&record, next.len()));
        }
        pending.push((key.clone(), next, record));
    }

    if !over_limit.is_empty() {
        let error = WorkflowError::PreconditionViolation(format!(
            "More than {} tags per member: {}",
            MAX_TAGS_PER_MEMBER,
            over_limit.join(", ")
        ));
        warn!("{}", error);
        for (_, _, record) in pending {
            report.record(Family::TagMembership, not_done, record.with_reason(error.to_string()));
        }
        report.fail(&error);
        return Ok(());
    }

    let executor = ctx.executor();
    for member_type in [MemberType::NetworkDevice, MemberType::Interface] {
        let updates: Vec<MemberTags> = pending
            .iter()
            .filter(|(key, _, _)| key.member_type == member_type)
            .map(|(key, next, _)| MemberTags {
                id: key.id.clone(),
                tags: next.clone(),
            })
            .collect();
        if updates.is_empty() {
            continue;
        }
        info!("Rewriting tag sets of {} {} members", updates.len(), member_type);
        let failures = write_member_tags(executor, ctx.client, ctx.options, report, member_type, &updates).await;
        for (key, _, record) in pending.iter().filter(|(key, _, _)| key.member_type == member_type) {
            match failures.get(&key.id) {
                Some(reason) => report.record(Family::TagMembership, not_done, record.clone().with_reason(reason.clone())),
                None => report.record(Family::TagMembership, done, record.clone()),
            }
        }
    }
    Ok(())
}

/// Mismatches between the request and freshly read membership
pub fn verify_membership(want: &MembershipWant, have: &MembershipHave, state: State) -> Vec<String> {
    let mut mismatches = Vec::new();
    if state == State::Merged {
        for name in want.tags.iter().filter(|t| !have.tag_ids.contains_key(*t)) {
            mismatches.push(format!("Tag '{}' doesn't exist in Controller", name));
        }
    }
    for member in &have.members {
        let Ok(key) = &member.key else { continue };
        let current = have.current.get(key).map(Vec::as_slice).unwrap_or_default();
        for (name, id) in &have.tag_ids {
            let attached = current.iter().any(|t| &t.id == id);
            match (state, attached) {
                (State::Merged, false) => mismatches.push(format!("{} {} is missing tag {}", key.member_type, key.id, name)),
                (State::Deleted, true) => mismatches.push(format!("{} {} still carries tag {}", key.member_type, key.id, name)),
                _ => {}
            }
        }
    }
    mismatches
}

fn over_limit_label(record: &OutcomeRecord, count: usize) -> String {
    let base = record.device_value.as_deref().unwrap_or("-");
    match &record.interface_name {
        Some(interface) => format!("{}:{} ({} tags)", base, interface, count),
        None => format!("{} ({} tags)", base, count),
    }
}
