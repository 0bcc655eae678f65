//! Tag definition diff.
//!
//! Existing tags and requested definitions are both reduced to a
//! [`TagState`]: description plus canonical leaf sets and scope. `merged`
//! unions the request into the existing state, a partial `deleted` subtracts
//! it, and the result is compared for equality.

use super::model::{ScopeCategory, TagWant};
use super::rules::{self, RuleLeaf};
use crate::config::State;
use crate::error::WorkflowError;
use crate::validate;
use controller_client::{DynamicRule, MemberType, ScopeRule, Tag};
use std::collections::BTreeSet;

/// Port rule scope with members resolved to Controller ids
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScopeState {
    pub category: ScopeCategory,
    pub inherit: bool,
    pub members: BTreeSet<String>,
}

impl ScopeState {
    fn from_rule(rule: &ScopeRule) -> Result<Self, WorkflowError> {
        let category = ScopeCategory::parse(&rule.scope_category).ok_or_else(|| {
            WorkflowError::PreconditionViolation(format!("Scope category '{}' is not supported", rule.scope_category))
        })?;
        Ok(Self {
            category,
            inherit: rule.inherit,
            members: rule.values.iter().cloned().collect(),
        })
    }

    fn to_rule(&self) -> ScopeRule {
        ScopeRule {
            scope_category: self.category.as_str().to_string(),
            inherit: self.inherit,
            values: self.members.iter().cloned().collect(),
        }
    }
}

/// Canonical content of a tag
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagState {
    pub description: Option<String>,
    pub device_leaves: BTreeSet<RuleLeaf>,
    pub port_leaves: BTreeSet<RuleLeaf>,
    pub scope: Option<ScopeState>,
}

impl TagState {
    pub fn from_tag(tag: &Tag) -> Result<Self, WorkflowError> {
        let mut state = TagState {
            description: validate::non_empty(tag.description.as_deref()),
            ..Default::default()
        };
        for rule in &tag.dynamic_rules {
            let leaves = rules::leaf_set(rule.rules.as_ref())?;
            match rule.member_type {
                MemberType::NetworkDevice => state.device_leaves.extend(leaves),
                MemberType::Interface => {
                    state.port_leaves.extend(leaves);
                    if let Some(scope) = &rule.scope_rule {
                        state.scope = Some(ScopeState::from_rule(scope)?);
                    }
                }
            }
        }
        Ok(state.normalized())
    }

    /// State a new tag is created with
    pub fn from_want(want: &TagWant, scope: Option<&ScopeState>) -> Self {
        TagState {
            description: want.description.clone(),
            device_leaves: want.device_rules.clone().unwrap_or_default(),
            port_leaves: want.port_rules.as_ref().map(|p| p.leaves.clone()).unwrap_or_default(),
            scope: scope.cloned(),
        }
        .normalized()
    }

    /// Union of the existing state and the request
    pub fn merged_with(&self, want: &TagWant, scope: Option<&ScopeState>) -> Result<Self, WorkflowError> {
        let mut next = self.clone();
        if want.description.is_some() {
            next.description = want.description.clone();
        }
        if let Some(leaves) = &want.device_rules {
            next.device_leaves.extend(leaves.iter().cloned());
        }
        if let Some(port) = &want.port_rules {
            next.port_leaves.extend(port.leaves.iter().cloned());
        }
        if let Some(requested) = scope {
            next.scope = Some(match &self.scope {
                Some(current) if current.category == requested.category => ScopeState {
                    category: current.category,
                    inherit: requested.inherit,
                    members: current.members.union(&requested.members).cloned().collect(),
                },
                Some(current) if requested.members.is_empty() => {
                    return Err(WorkflowError::PreconditionViolation(format!(
                        "Changing the scope category from {} to {} needs scope_members",
                        current.category.as_str(),
                        requested.category.as_str()
                    )));
                }
                _ => requested.clone(),
            });
        }
        Ok(next.normalized())
    }

    /// Existing state with the requested fields removed
    pub fn without(&self, want: &TagWant, scope: Option<&ScopeState>) -> Result<Self, WorkflowError> {
        let mut next = self.clone();
        if want.description.is_some() && want.description == self.description {
            next.description = None;
        }
        if let Some(leaves) = &want.device_rules {
            next.device_leaves.retain(|l| !leaves.contains(l));
        }
        if let Some(port) = &want.port_rules {
            next.port_leaves.retain(|l| !port.leaves.contains(l));
        }
        if let (Some(requested), Some(current)) = (scope, &self.scope) {
            if requested.category != current.category {
                return Err(WorkflowError::PreconditionViolation(format!(
                    "Scope category {} does not match the existing {} scope",
                    requested.category.as_str(),
                    current.category.as_str()
                )));
            }
            let members: BTreeSet<String> = current.members.difference(&requested.members).cloned().collect();
            next.scope = (!members.is_empty()).then(|| ScopeState {
                members,
                ..current.clone()
            });
        }
        Ok(next.normalized())
    }

    /// Dynamic rules in Controller form
    pub fn dynamic_rules(&self) -> Vec<DynamicRule> {
        let mut dynamic = Vec::new();
        if let Some(tree) = rules::regroup(&self.device_leaves) {
            dynamic.push(DynamicRule {
                member_type: MemberType::NetworkDevice,
                rules: Some(tree),
                scope_rule: None,
            });
        }
        if let Some(tree) = rules::regroup(&self.port_leaves) {
            dynamic.push(DynamicRule {
                member_type: MemberType::Interface,
                rules: Some(tree),
                scope_rule: self.scope.as_ref().map(ScopeState::to_rule),
            });
        }
        dynamic
    }

    // A scope without port rules is never stored
    fn normalized(mut self) -> Self {
        if self.port_leaves.is_empty() {
            self.scope = None;
        }
        self
    }
}

/// What the tag lifecycle step has to do
#[derive(Debug, Clone, PartialEq)]
pub enum TagAction {
    Create(Tag),
    Update(Tag),
    NoOp(String),
    Delete(Tag),
    ForceDelete(Tag),
    Absent,
}

/// Plan the lifecycle of one tag
pub fn plan_tag(
    want: &TagWant,
    existing: Option<&Tag>,
    scope: Option<&ScopeState>,
    state: State,
) -> Result<TagAction, WorkflowError> {
    match (state, existing) {
        (State::Merged, None) => {
            let target = TagState::from_want(want, scope);
            Ok(TagAction::Create(Tag {
                id: String::new(),
                name: want.name.clone(),
                description: target.description.clone(),
                dynamic_rules: target.dynamic_rules(),
                system_tag: false,
            }))
        }
        (State::Merged, Some(tag)) => {
            let current = TagState::from_tag(tag)?;
            let target = current.merged_with(want, scope)?;
            if target == current {
                Ok(TagAction::NoOp("Tag already in the requested state".to_string()))
            } else {
                Ok(TagAction::Update(with_state(tag, &target)))
            }
        }
        (State::Deleted, None) => Ok(TagAction::Absent),
        (State::Deleted, Some(tag)) if want.force_delete => Ok(TagAction::ForceDelete(tag.clone())),
        (State::Deleted, Some(tag)) if want.has_no_spec() => Ok(TagAction::Delete(tag.clone())),
        (State::Deleted, Some(tag)) => {
            let current = TagState::from_tag(tag)?;
            let target = current.without(want, scope)?;
            if target == current {
                Ok(TagAction::NoOp("Requested fields are already absent".to_string()))
            } else {
                Ok(TagAction::Update(with_state(tag, &target)))
            }
        }
    }
}

fn with_state(tag: &Tag, state: &TagState) -> Tag {
    Tag {
        description: state.description.clone(),
        dynamic_rules: state.dynamic_rules(),
        ..tag.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tags::model::{PortRulesWant, RuleDescription};
    use crate::tags::rules::RuleKind;

    fn leaves(kind: RuleKind, rules: &[(&str, &str, &str)]) -> BTreeSet<RuleLeaf> {
        let descriptions: Vec<RuleDescription> = rules
            .iter()
            .map(|(name, pattern, value)| RuleDescription {
                rule_name: (*name).to_string(),
                search_pattern: (*pattern).to_string(),
                value: (*value).to_string(),
                operation: None,
            })
            .collect();
        rules::canonical_leaves(&descriptions, kind).unwrap()
    }

    fn want(name: &str) -> TagWant {
        TagWant {
            name: name.to_string(),
            description: None,
            force_delete: false,
            device_rules: None,
            port_rules: None,
        }
    }

    fn existing(state: &TagState) -> Tag {
        Tag {
            id: "tag-1".into(),
            name: "Edge".into(),
            description: state.description.clone(),
            dynamic_rules: state.dynamic_rules(),
            system_tag: false,
        }
    }

    fn site_scope(members: &[&str]) -> ScopeState {
        ScopeState {
            category: ScopeCategory::Site,
            inherit: true,
            members: members.iter().map(|m| (*m).to_string()).collect(),
        }
    }

    #[test]
    fn test_create_when_absent() {
        let mut w = want("Edge");
        w.device_rules = Some(leaves(RuleKind::Device, &[("device_name", "contains", "edge")]));
        match plan_tag(&w, None, None, State::Merged).unwrap() {
            TagAction::Create(tag) => {
                assert_eq!(tag.name, "Edge");
                assert_eq!(tag.dynamic_rules.len(), 1);
                assert_eq!(tag.dynamic_rules[0].member_type, MemberType::NetworkDevice);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_merged_unions_leaves_and_noop_when_contained() {
        let current = TagState {
            device_leaves: leaves(
                RuleKind::Device,
                &[("device_name", "contains", "edge"), ("device_family", "equals", "Switches")],
            ),
            ..Default::default()
        };
        let tag = existing(&current);

        let mut subset = want("Edge");
        subset.device_rules = Some(leaves(RuleKind::Device, &[("device_name", "contains", "edge")]));
        assert!(matches!(
            plan_tag(&subset, Some(&tag), None, State::Merged).unwrap(),
            TagAction::NoOp(_)
        ));

        let mut extra = want("Edge");
        extra.device_rules = Some(leaves(RuleKind::Device, &[("device_name", "contains", "core")]));
        match plan_tag(&extra, Some(&tag), None, State::Merged).unwrap() {
            TagAction::Update(updated) => {
                let state = TagState::from_tag(&updated).unwrap();
                assert_eq!(state.device_leaves.len(), 3);
                assert_eq!(updated.id, "tag-1");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_empty_description_is_absent() {
        let mut tag = existing(&TagState::default());
        tag.description = Some(String::new());
        let w = want("Edge");
        assert!(matches!(plan_tag(&w, Some(&tag), None, State::Merged).unwrap(), TagAction::NoOp(_)));
    }

    #[test]
    fn test_scope_same_category_unions_members() {
        let current = TagState {
            port_leaves: leaves(RuleKind::Port, &[("port_name", "starts_with", "Gi")]),
            scope: Some(site_scope(&["s1"])),
            ..Default::default()
        };
        let mut w = want("Edge");
        w.port_rules = Some(PortRulesWant::default());
        let merged = current.merged_with(&w, Some(&site_scope(&["s2"]))).unwrap();
        assert_eq!(merged.scope.unwrap().members.len(), 2);
    }

    #[test]
    fn test_scope_category_change_replaces_on_merged_and_fails_on_deleted() {
        let current = TagState {
            port_leaves: leaves(RuleKind::Port, &[("port_name", "starts_with", "Gi")]),
            scope: Some(site_scope(&["s1"])),
            ..Default::default()
        };
        let tag_scope = ScopeState {
            category: ScopeCategory::Tag,
            inherit: false,
            members: ["tag-9".to_string()].into_iter().collect(),
        };
        let w = want("Edge");
        let merged = current.merged_with(&w, Some(&tag_scope)).unwrap();
        assert_eq!(merged.scope, Some(tag_scope.clone()));

        let err = current.without(&w, Some(&tag_scope)).unwrap_err();
        assert!(err.is_fatal());

        let empty = ScopeState {
            members: BTreeSet::new(),
            ..tag_scope
        };
        assert!(current.merged_with(&w, Some(&empty)).is_err());
    }

    #[test]
    fn test_deleted_paths() {
        let current = TagState {
            description: Some("edge switches".into()),
            device_leaves: leaves(
                RuleKind::Device,
                &[("device_name", "contains", "edge"), ("device_family", "equals", "Switches")],
            ),
            ..Default::default()
        };
        let tag = existing(&current);

        assert_eq!(plan_tag(&want("Edge"), None, None, State::Deleted).unwrap(), TagAction::Absent);
        assert!(matches!(
            plan_tag(&want("Edge"), Some(&tag), None, State::Deleted).unwrap(),
            TagAction::Delete(_)
        ));

        let mut force = want("Edge");
        force.force_delete = true;
        assert!(matches!(
            plan_tag(&force, Some(&tag), None, State::Deleted).unwrap(),
            TagAction::ForceDelete(_)
        ));

        let mut partial = want("Edge");
        partial.device_rules = Some(leaves(RuleKind::Device, &[("device_family", "equals", "Switches")]));
        partial.description = Some("edge switches".into());
        match plan_tag(&partial, Some(&tag), None, State::Deleted).unwrap() {
            TagAction::Update(updated) => {
                let state = TagState::from_tag(&updated).unwrap();
                assert_eq!(state.description, None);
                assert_eq!(state.device_leaves.len(), 1);
            }
            other => panic!("unexpected {:?}", other),
        }

        let mut gone = want("Edge");
        gone.device_rules = Some(leaves(RuleKind::Device, &[("device_series", "equals", "9300")]));
        assert!(matches!(
            plan_tag(&gone, Some(&tag), None, State::Deleted).unwrap(),
            TagAction::NoOp(_)
        ));
    }

    #[test]
    fn test_removing_last_port_leaf_drops_port_rule() {
        let current = TagState {
            port_leaves: leaves(RuleKind::Port, &[("port_name", "starts_with", "Gi")]),
            scope: Some(site_scope(&["s1"])),
            ..Default::default()
        };
        let mut w = want("Edge");
        w.port_rules = Some(PortRulesWant {
            leaves: leaves(RuleKind::Port, &[("port_name", "starts_with", "Gi")]),
            scope: None,
        });
        let next = current.without(&w, None).unwrap();
        assert!(next.port_leaves.is_empty());
        assert!(next.scope.is_none());
        assert!(next.dynamic_rules().is_empty());
    }
}
