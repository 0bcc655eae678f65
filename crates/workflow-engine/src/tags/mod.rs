//! Tags Workflow
//!
//! Reconciles tag definitions (description, device rules, port rules with
//! scope) and explicit tag membership of devices and interfaces.
//!
//! Within one entry the tag is written before membership on `merged`, and
//! membership is removed before the tag on `deleted`.

pub mod diff;
pub mod lifecycle;
pub mod membership;
pub mod model;
pub mod rules;

#[cfg(test)]
mod tags_test;

use crate::config::State;
use crate::driver::{Context, Verification, Workflow};
use crate::error::WorkflowError;
use crate::outcome::OutcomeReport;
use lifecycle::TagHave;
use membership::MembershipHave;
pub use model::{TagsEntry, TagsWant};

/// Oldest Controller release with the tag APIs the workflow uses
pub const TAGS_MIN_VERSION: &str = "2.3.7.9";

/// Current state for one tags entry
#[derive(Debug, Clone, Default)]
pub struct TagsHave {
    pub tag: Option<TagHave>,
    pub membership: Option<MembershipHave>,
}

/// Tags workflow
#[derive(Debug, Clone, Copy, Default)]
pub struct TagsWorkflow;

#[async_trait::async_trait]
impl Workflow for TagsWorkflow {
    type Entry = TagsEntry;
    type Want = TagsWant;
    type Have = TagsHave;

    fn name(&self) -> &'static str {
        "tags"
    }

    fn minimum_version(&self) -> &'static str {
        TAGS_MIN_VERSION
    }

    fn validate_input(&self, entries: &[TagsEntry], _state: State) -> Result<(), WorkflowError> {
        if entries.is_empty() {
            return Err(WorkflowError::InvalidInput("config must contain at least one entry".to_string()));
        }
        Ok(())
    }

    fn get_want(&self, entry: &TagsEntry, state: State) -> Result<TagsWant, WorkflowError> {
        TagsWant::from_entry(entry, state)
    }

    async fn get_have(&self, ctx: &mut Context<'_>, want: &TagsWant, state: State) -> Result<TagsHave, WorkflowError> {
        let tag = match &want.tag {
            Some(tag) => Some(TagHave::read(ctx, tag, state).await?),
            None => None,
        };
        let membership = match &want.membership {
            Some(membership) => Some(MembershipHave::read(ctx, membership).await?),
            None => None,
        };
        Ok(TagsHave { tag, membership })
    }

    async fn apply(
        &self,
        ctx: &mut Context<'_>,
        want: &TagsWant,
        have: &TagsHave,
        state: State,
        report: &mut OutcomeReport,
    ) -> Result<(), WorkflowError> {
        let tag = want.tag.as_ref().zip(have.tag.as_ref());
        let membership = want.membership.as_ref().zip(have.membership.as_ref());

        match state {
            State::Merged => {
                if let Some((want, have)) = tag {
                    lifecycle::apply_tag(ctx, want, have, state, report).await?;
                }
                if let Some((want, have)) = membership {
                    membership::apply_membership(ctx, want, have, state, report).await?;
                }
            }
            State::Deleted => {
                if let Some((want, have)) = membership {
                    membership::apply_membership(ctx, want, have, state, report).await?;
                }
                if let Some((want, have)) = tag {
                    lifecycle::apply_tag(ctx, want, have, state, report).await?;
                }
            }
        }
        Ok(())
    }

    fn verify(&self, want: &TagsWant, have: &TagsHave, state: State) -> Verification {
        let mut verification = Verification::default();
        if let Some((want, have)) = want.tag.as_ref().zip(have.tag.as_ref()) {
            verification.mismatches.extend(lifecycle::verify_tag(want, have, state));
        }
        if let Some((want, have)) = want.membership.as_ref().zip(have.membership.as_ref()) {
            verification
                .mismatches
                .extend(membership::verify_membership(want, have, state));
        }
        verification
    }
}
