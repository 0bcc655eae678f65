//! Tags config entries and their canonical form.

use super::rules::{self, RuleKind, RuleLeaf};
use crate::config::State;
use crate::error::WorkflowError;
use crate::resolver::DeviceHandle;
use crate::validate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// One `config` entry of the tags workflow
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TagsEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<TagSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag_memberships: Option<TagMembershipSpec>,
}

/// Tag definition
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TagSpec {
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub force_delete: bool,
    #[serde(default)]
    pub device_rules: Option<DeviceRulesSpec>,
    #[serde(default)]
    pub port_rules: Option<PortRulesSpec>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DeviceRulesSpec {
    #[serde(default)]
    pub rule_descriptions: Vec<RuleDescription>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PortRulesSpec {
    #[serde(default)]
    pub scope_description: Option<ScopeDescription>,
    #[serde(default)]
    pub rule_descriptions: Vec<RuleDescription>,
}

/// One rule leaf as written in the config
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuleDescription {
    pub rule_name: String,
    pub search_pattern: String,
    pub value: String,
    #[serde(default)]
    pub operation: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScopeDescription {
    pub scope_category: String,
    #[serde(default)]
    pub inherit: Option<bool>,
    #[serde(default)]
    pub scope_members: Vec<String>,
}

/// Explicit tag membership
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TagMembershipSpec {
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub device_details: Vec<DeviceDetails>,
    #[serde(default)]
    pub site_details: Vec<SiteDetails>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DeviceDetails {
    #[serde(default)]
    pub ip_addresses: Vec<String>,
    #[serde(default)]
    pub hostnames: Vec<String>,
    #[serde(default)]
    pub mac_addresses: Vec<String>,
    #[serde(default)]
    pub serial_numbers: Vec<String>,
    #[serde(default)]
    pub port_names: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SiteDetails {
    #[serde(default)]
    pub site_names: Vec<String>,
    #[serde(default)]
    pub port_names: Vec<String>,
}

// ============================================================================
// Canonical form
// ============================================================================

/// Scope category of a port rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScopeCategory {
    Tag,
    Site,
}

impl ScopeCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            ScopeCategory::Tag => "TAG",
            ScopeCategory::Site => "SITE",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "TAG" => Some(ScopeCategory::Tag),
            "SITE" => Some(ScopeCategory::Site),
            _ => None,
        }
    }

    /// `inherit` when the config leaves it out
    pub fn default_inherit(self) -> bool {
        self == ScopeCategory::Site
    }
}

/// Scope as requested; members are tag names or site paths
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScopeWant {
    pub category: ScopeCategory,
    pub inherit: bool,
    pub members: BTreeSet<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PortRulesWant {
    pub leaves: BTreeSet<RuleLeaf>,
    pub scope: Option<ScopeWant>,
}

/// Canonical tag definition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagWant {
    pub name: String,
    pub description: Option<String>,
    pub force_delete: bool,
    pub device_rules: Option<BTreeSet<RuleLeaf>>,
    pub port_rules: Option<PortRulesWant>,
}

impl TagWant {
    /// Nothing besides the name was given
    pub fn has_no_spec(&self) -> bool {
        self.description.is_none() && self.device_rules.is_none() && self.port_rules.is_none()
    }
}

/// Devices a membership applies to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemberTarget {
    /// Device handle, optionally narrowed to some of its interfaces
    Device {
        handle: DeviceHandle,
        port_names: Vec<String>,
    },
    /// Every device assigned to a site
    Site { site_name: String, port_names: Vec<String> },
}

/// Canonical membership request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MembershipWant {
    pub tags: Vec<String>,
    pub targets: Vec<MemberTarget>,
}

/// Canonical tags entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagsWant {
    pub tag: Option<TagWant>,
    pub membership: Option<MembershipWant>,
}

impl TagsWant {
    /// Validate and canonicalize one entry
    pub fn from_entry(entry: &TagsEntry, state: State) -> Result<Self, WorkflowError> {
        if entry.tag.is_none() && entry.tag_memberships.is_none() {
            return Err(WorkflowError::InvalidInput(
                "each config entry needs 'tag' or 'tag_memberships'".to_string(),
            ));
        }
        let tag = entry.tag.as_ref().map(|t| canonical_tag(t, state)).transpose()?;
        let membership = entry.tag_memberships.as_ref().map(canonical_membership).transpose()?;
        Ok(Self { tag, membership })
    }
}

fn canonical_tag(spec: &TagSpec, state: State) -> Result<TagWant, WorkflowError> {
    let name = validate::required("tag.name", spec.name.as_deref())?.to_string();
    if spec.force_delete && state != State::Deleted {
        return Err(WorkflowError::InvalidInput(
            "tag.force_delete is only valid with state 'deleted'".to_string(),
        ));
    }

    let device_rules = spec
        .device_rules
        .as_ref()
        .map(|d| rules::canonical_leaves(&d.rule_descriptions, RuleKind::Device))
        .transpose()?;

    let port_rules = spec
        .port_rules
        .as_ref()
        .map(|p| -> Result<PortRulesWant, WorkflowError> {
            Ok(PortRulesWant {
                leaves: rules::canonical_leaves(&p.rule_descriptions, RuleKind::Port)?,
                scope: p.scope_description.as_ref().map(canonical_scope).transpose()?,
            })
        })
        .transpose()?;

    Ok(TagWant {
        name,
        description: validate::non_empty(spec.description.as_deref()),
        force_delete: spec.force_delete,
        device_rules,
        port_rules,
    })
}

fn canonical_scope(scope: &ScopeDescription) -> Result<ScopeWant, WorkflowError> {
    let category = ScopeCategory::parse(&scope.scope_category).ok_or_else(|| {
        WorkflowError::InvalidInput(format!(
            "'{}' is not a valid scope_category; expected one of: TAG, SITE",
            scope.scope_category
        ))
    })?;
    let members: BTreeSet<String> = scope
        .scope_members
        .iter()
        .filter_map(|m| validate::non_empty(Some(m.as_str())))
        .collect();
    if members.is_empty() {
        return Err(WorkflowError::InvalidInput(
            "scope_members is required with scope_category".to_string(),
        ));
    }
    Ok(ScopeWant {
        category,
        inherit: scope.inherit.unwrap_or_else(|| category.default_inherit()),
        members,
    })
}

fn canonical_membership(spec: &TagMembershipSpec) -> Result<MembershipWant, WorkflowError> {
    let mut tags: Vec<String> = Vec::new();
    for tag in &spec.tags {
        let tag = validate::required("tag_memberships.tags", Some(tag.as_str()))?.to_string();
        if !tags.contains(&tag) {
            tags.push(tag);
        }
    }
    if tags.is_empty() {
        return Err(WorkflowError::InvalidInput("tag_memberships.tags is required".to_string()));
    }
    if spec.device_details.is_empty() && spec.site_details.is_empty() {
        return Err(WorkflowError::InvalidInput(
            "tag_memberships needs device_details or site_details".to_string(),
        ));
    }

    let mut targets = Vec::new();
    for details in &spec.device_details {
        let handles = device_handles(details)?;
        if handles.is_empty() {
            let field = if details.port_names.is_empty() {
                "device_details"
            } else {
                "port_names"
            };
            return Err(WorkflowError::InvalidInput(format!(
                "{} needs at least one of ip_addresses, hostnames, mac_addresses, serial_numbers",
                field
            )));
        }
        let port_names = port_names(&details.port_names);
        for handle in handles {
            targets.push(MemberTarget::Device {
                handle,
                port_names: port_names.clone(),
            });
        }
    }
    for details in &spec.site_details {
        if details.site_names.is_empty() {
            return Err(WorkflowError::InvalidInput("site_details.site_names is required".to_string()));
        }
        let port_names = port_names(&details.port_names);
        for site in &details.site_names {
            targets.push(MemberTarget::Site {
                site_name: validate::required("site_names", Some(site.as_str()))?.to_string(),
                port_names: port_names.clone(),
            });
        }
    }

    Ok(MembershipWant { tags, targets })
}

fn device_handles(details: &DeviceDetails) -> Result<Vec<DeviceHandle>, WorkflowError> {
    let groups: [(&str, &Vec<String>); 4] = [
        ("ip_address", &details.ip_addresses),
        ("hostname", &details.hostnames),
        ("mac_address", &details.mac_addresses),
        ("serial_number", &details.serial_numbers),
    ];
    let mut handles: Vec<DeviceHandle> = Vec::new();
    for (identifier, values) in groups {
        for value in values {
            let handle = DeviceHandle::parse(identifier, value)?;
            if !handles.contains(&handle) {
                handles.push(handle);
            }
        }
    }
    Ok(handles)
}

fn port_names(names: &[String]) -> Vec<String> {
    let mut ports: Vec<String> = Vec::new();
    for name in names.iter().filter_map(|n| validate::non_empty(Some(n.as_str()))) {
        if !ports.contains(&name) {
            ports.push(name);
        }
    }
    ports
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(yaml: &str) -> TagsEntry {
        serde_yaml::from_str(yaml).unwrap()
    }

    #[test]
    fn test_tag_entry_canonicalizes() {
        let e = entry(
            r#"
tag:
  name: Campus-Edge
  description: ""
  device_rules:
    rule_descriptions:
      - rule_name: device_name
        search_pattern: contains
        value: edge
  port_rules:
    scope_description:
      scope_category: site
      scope_members: [Global/USA]
    rule_descriptions:
      - rule_name: speed
        search_pattern: equals
        value: "1000"
"#,
        );
        let want = TagsWant::from_entry(&e, State::Merged).unwrap();
        let tag = want.tag.unwrap();
        assert_eq!(tag.name, "Campus-Edge");
        assert_eq!(tag.description, None);
        assert_eq!(tag.device_rules.unwrap().len(), 1);
        let port = tag.port_rules.unwrap();
        let scope = port.scope.unwrap();
        assert_eq!(scope.category, ScopeCategory::Site);
        assert!(scope.inherit);
        assert_eq!(port.leaves.iter().next().unwrap().value, "1000000");
    }

    #[test]
    fn test_canonicalize_is_idempotent_on_duplicates() {
        let e = entry(
            r#"
tag_memberships:
  tags: [A, A, B]
  device_details:
    - ip_addresses: [10.0.0.1, 10.0.0.1]
      port_names: [Gi1/0/1, Gi1/0/1]
"#,
        );
        let want = TagsWant::from_entry(&e, State::Merged).unwrap();
        let membership = want.membership.unwrap();
        assert_eq!(membership.tags, vec!["A", "B"]);
        assert_eq!(
            membership.targets,
            vec![MemberTarget::Device {
                handle: DeviceHandle::Ip("10.0.0.1".into()),
                port_names: vec!["Gi1/0/1".into()],
            }]
        );
    }

    #[test]
    fn test_invalid_entries() {
        let no_name = entry("tag:\n  description: x\n");
        assert!(TagsWant::from_entry(&no_name, State::Merged).is_err());

        let empty = entry("{}");
        assert!(TagsWant::from_entry(&empty, State::Merged).is_err());

        let ports_only = entry("tag_memberships:\n  tags: [A]\n  device_details:\n    - port_names: [Gi1/0/1]\n");
        let err = TagsWant::from_entry(&ports_only, State::Merged).unwrap_err();
        assert!(err.to_string().contains("port_names"));

        let bad_scope = entry(
            "tag:\n  name: T\n  port_rules:\n    scope_description:\n      scope_category: TAG\n    rule_descriptions: []\n",
        );
        assert!(TagsWant::from_entry(&bad_scope, State::Merged).is_err());

        let force_on_merge = entry("tag:\n  name: T\n  force_delete: true\n");
        assert!(TagsWant::from_entry(&force_on_merge, State::Merged).is_err());
        assert!(TagsWant::from_entry(&force_on_merge, State::Deleted).is_ok());

        let bad_ip = entry("tag_memberships:\n  tags: [A]\n  device_details:\n    - ip_addresses: [10.0.0]\n");
        assert!(TagsWant::from_entry(&bad_ip, State::Merged).is_err());
    }

    #[test]
    fn test_tag_scope_inherit_default_is_false() {
        let e = entry(
            "tag:\n  name: T\n  port_rules:\n    scope_description:\n      scope_category: TAG\n      scope_members: [Core]\n    rule_descriptions:\n      - {rule_name: port_name, search_pattern: starts_with, value: Gi}\n",
        );
        let want = TagsWant::from_entry(&e, State::Merged).unwrap();
        let scope = want.tag.unwrap().port_rules.unwrap().scope.unwrap();
        assert!(!scope.inherit);
    }
}
