//! Tag create/update/delete, including force delete.

use super::diff::{self, ScopeState, TagAction};
use super::membership::{self, MemberKey};
use super::model::{ScopeCategory, ScopeWant, TagWant};
use crate::config::State;
use crate::driver::Context;
use crate::error::WorkflowError;
use crate::outcome::{Bucket, Family, OutcomeRecord, OutcomeReport};
use crate::paginator;
use controller_client::{ControllerClientTrait, MemberTags, MemberType, Tag};
use std::collections::BTreeSet;
use tracing::{debug, info, warn};

/// Current state for a tag definition
#[derive(Debug, Clone, Default)]
pub struct TagHave {
    pub existing: Option<Tag>,
    /// Requested scope with members resolved to ids
    pub scope: Option<ScopeState>,
}

impl TagHave {
    pub async fn read(ctx: &mut Context<'_>, want: &TagWant, state: State) -> Result<Self, WorkflowError> {
        let existing = find_tag(ctx.client, &want.name).await?;
        let scope = match want.port_rules.as_ref().and_then(|p| p.scope.as_ref()) {
            Some(scope) => Some(resolve_scope(ctx, scope, state).await?),
            None => None,
        };
        Ok(Self { existing, scope })
    }

    /// Lifecycle action for this state
    pub fn plan(&self, want: &TagWant, state: State) -> Result<TagAction, WorkflowError> {
        diff::plan_tag(want, self.existing.as_ref(), self.scope.as_ref(), state)
    }
}

/// Exact-name tag lookup
pub async fn find_tag(client: &dyn ControllerClientTrait, name: &str) -> Result<Option<Tag>, WorkflowError> {
    Ok(client.query_tags(name).await?.into_iter().find(|t| t.name == name))
}

/// Resolve scope members (tag names or site paths) to ids
///
/// An unknown member fails a `merged` run; on `deleted` it cannot be part of
/// the scope and is skipped.
async fn resolve_scope(ctx: &mut Context<'_>, scope: &ScopeWant, state: State) -> Result<ScopeState, WorkflowError> {
    let mut members = BTreeSet::new();
    for name in &scope.members {
        let id = match scope.category {
            ScopeCategory::Tag => find_tag(ctx.client, name).await?.map(|t| t.id),
            ScopeCategory::Site => match ctx.resolver.site_id(name).await {
                Ok(id) => Some(id),
                Err(e) if !e.is_fatal() => None,
                Err(e) => return Err(e),
            },
        };
        match (id, state) {
            (Some(id), _) => {
                members.insert(id);
            }
            (None, State::Merged) => {
                return Err(WorkflowError::InvalidInput(format!(
                    "Scope member '{}' doesn't exist in Controller",
                    name
                )));
            }
            (None, State::Deleted) => debug!("Scope member {} not found, nothing to remove", name),
        }
    }
    Ok(ScopeState {
        category: scope.category,
        inherit: scope.inherit,
        members,
    })
}

/// Apply the tag lifecycle step
pub async fn apply_tag(
    ctx: &mut Context<'_>,
    want: &TagWant,
    have: &TagHave,
    state: State,
    report: &mut OutcomeReport,
) -> Result<(), WorkflowError> {
    let record = OutcomeRecord::named(&want.name);
    let executor = ctx.executor();
    let client = ctx.client;

    match have.plan(want, state)? {
        TagAction::Create(tag) => {
            info!("Creating tag {}", tag.name);
            match executor
                .execute(report, &format!("create tag {}", tag.name), client.create_tag(&tag))
                .await
            {
                Ok(()) => {
                    let id = find_tag(client, &tag.name).await?.map(|t| t.id);
                    let record = match id {
                        Some(id) => record.with_id(id),
                        None => record,
                    };
                    report.record(Family::Tag, Bucket::Created, record);
                }
                Err(reason) => report.record(Family::Tag, Bucket::NotUpdated, record.with_reason(reason)),
            }
        }
        TagAction::Update(tag) => {
            info!("Updating tag {} ({})", tag.name, tag.id);
            let record = record.with_id(&tag.id);
            match executor
                .execute(report, &format!("update tag {}", tag.name), client.update_tag(&tag))
                .await
            {
                Ok(()) => report.record(Family::Tag, Bucket::Updated, record),
                Err(reason) => report.record(Family::Tag, Bucket::NotUpdated, record.with_reason(reason)),
            }
        }
        TagAction::NoOp(reason) => {
            debug!("Tag {}: {}", want.name, reason);
            let record = match &have.existing {
                Some(tag) => record.with_id(&tag.id),
                None => record,
            };
            report.record(Family::Tag, Bucket::NotUpdated, record.with_reason(reason));
        }
        TagAction::Absent => {
            debug!("Tag {} is already absent", want.name);
            report.record(Family::Tag, Bucket::Absent, record);
        }
        TagAction::Delete(tag) => {
            info!("Deleting tag {} ({})", tag.name, tag.id);
            delete(ctx, &tag, record, report).await;
        }
        TagAction::ForceDelete(tag) => {
            info!("Force deleting tag {} ({})", tag.name, tag.id);
            force_delete(ctx, &tag, record, report).await?;
        }
    }
    Ok(())
}

async fn delete(ctx: &Context<'_>, tag: &Tag, record: OutcomeRecord, report: &mut OutcomeReport) {
    let record = record.with_id(&tag.id);
    match ctx
        .executor()
        .execute(report, &format!("delete tag {}", tag.name), ctx.client.delete_tag(&tag.id))
        .await
    {
        Ok(()) => report.record(Family::Tag, Bucket::Deleted, record),
        Err(reason) => report.record(Family::Tag, Bucket::NotDeleted, record.with_reason(reason)),
    }
}

/// Clear rules, detach every member, then delete
///
/// Stops at the first failed step; the tag is then reported `not_deleted`.
async fn force_delete(
    ctx: &Context<'_>,
    tag: &Tag,
    record: OutcomeRecord,
    report: &mut OutcomeReport,
) -> Result<(), WorkflowError> {
    let executor = ctx.executor();
    let client = ctx.client;
    let record = record.with_id(&tag.id);

    if !tag.dynamic_rules.is_empty() || tag.description.is_some() {
        let cleared = Tag {
            description: None,
            dynamic_rules: Vec::new(),
            ..tag.clone()
        };
        if let Err(reason) = executor
            .execute(report, &format!("clear rules of tag {}", tag.name), client.update_tag(&cleared))
            .await
        {
            report.record(Family::Tag, Bucket::NotDeleted, record.with_reason(reason));
            return Ok(());
        }
    }

    let mut keys = Vec::new();
    for member_type in [MemberType::NetworkDevice, MemberType::Interface] {
        let members = paginator::fetch_all(|offset, limit| client.query_tag_members(&tag.id, member_type, offset, limit))
            .await?;
        debug!("Tag {} has {} {} members", tag.name, members.len(), member_type);
        keys.extend(members.into_iter().map(|m| MemberKey { member_type, id: m.id }));
    }
    let current = membership::read_member_tags(client, ctx.options, &keys).await?;

    for member_type in [MemberType::NetworkDevice, MemberType::Interface] {
        let updates: Vec<MemberTags> = keys
            .iter()
            .filter(|k| k.member_type == member_type)
            .map(|k| MemberTags {
                id: k.id.clone(),
                tags: current
                    .get(k)
                    .map(|tags| tags.iter().filter(|t| t.id != tag.id).cloned().collect())
                    .unwrap_or_default(),
            })
            .collect();
        if updates.is_empty() {
            continue;
        }
        info!("Detaching tag {} from {} {} members", tag.name, updates.len(), member_type);
        let failures =
            membership::write_member_tags(executor, client, ctx.options, report, member_type, &updates).await;
        if let Some(reason) = failures.values().next() {
            warn!("Could not detach tag {} from {} members", tag.name, failures.len());
            report.record(
                Family::Tag,
                Bucket::NotDeleted,
                record.with_reason(format!("Failed to detach members: {}", reason)),
            );
            return Ok(());
        }
    }

    match executor
        .execute(report, &format!("delete tag {}", tag.name), client.delete_tag(&tag.id))
        .await
    {
        Ok(()) => report.record(Family::Tag, Bucket::Deleted, record),
        Err(reason) => report.record(Family::Tag, Bucket::NotDeleted, record.with_reason(reason)),
    }
    Ok(())
}

/// Mismatches between the request and the freshly read tag
pub fn verify_tag(want: &TagWant, have: &TagHave, state: State) -> Vec<String> {
    if state == State::Deleted && (want.force_delete || want.has_no_spec()) {
        return match &have.existing {
            Some(tag) => vec![format!("Tag {} still exists", tag.name)],
            None => Vec::new(),
        };
    }
    match have.plan(want, state) {
        Ok(TagAction::NoOp(_) | TagAction::Absent) => Vec::new(),
        Ok(_) => vec![format!("Tag {} does not match the requested definition", want.name)],
        Err(e) => vec![e.to_string()],
    }
}
