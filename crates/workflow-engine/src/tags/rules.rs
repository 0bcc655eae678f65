//! Dynamic rule trees.
//!
//! The Controller stores tag rules as a binary tree of `AND`/`OR` branches
//! over `{operation, name, value}` leaves. The engine works on the flat,
//! sorted leaf set and only rebuilds a tree when writing:
//!
//! - leaves sharing a field are OR-ed together
//! - distinct fields are AND-ed
//! - branches with more than two children are folded pairwise from the left
//!
//! Two rule sets are equal when their canonical leaf sets are equal.

use super::model::RuleDescription;
use crate::error::WorkflowError;
use crate::validate;
use controller_client::RuleNode;
use std::collections::{BTreeSet, VecDeque};

/// Which rule set a leaf belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleKind {
    Device,
    Port,
}

/// Attribute a rule leaf matches on, in sort priority order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RuleField {
    Hostname,
    Family,
    Series,
    MgmtIp,
    GroupNameHierarchy,
    SoftwareVersion,
    Speed,
    AdminStatus,
    PortName,
    Status,
    Description,
}

impl RuleField {
    const ALL: [RuleField; 11] = [
        RuleField::Hostname,
        RuleField::Family,
        RuleField::Series,
        RuleField::MgmtIp,
        RuleField::GroupNameHierarchy,
        RuleField::SoftwareVersion,
        RuleField::Speed,
        RuleField::AdminStatus,
        RuleField::PortName,
        RuleField::Status,
        RuleField::Description,
    ];

    /// Field name in the Controller rule tree
    pub fn api_name(self) -> &'static str {
        match self {
            RuleField::Hostname => "hostname",
            RuleField::Family => "family",
            RuleField::Series => "series",
            RuleField::MgmtIp => "managementIpAddress",
            RuleField::GroupNameHierarchy => "groupNameHierarchy",
            RuleField::SoftwareVersion => "softwareVersion",
            RuleField::Speed => "speed",
            RuleField::AdminStatus => "adminStatus",
            RuleField::PortName => "portName",
            RuleField::Status => "status",
            RuleField::Description => "description",
        }
    }

    /// Rule name as written in the config
    pub fn rule_name(self) -> &'static str {
        match self {
            RuleField::Hostname => "device_name",
            RuleField::Family => "device_family",
            RuleField::Series => "device_series",
            RuleField::MgmtIp => "ip_address",
            RuleField::GroupNameHierarchy => "location",
            RuleField::SoftwareVersion => "version",
            RuleField::Speed => "speed",
            RuleField::AdminStatus => "admin_status",
            RuleField::PortName => "port_name",
            RuleField::Status => "operational_status",
            RuleField::Description => "description",
        }
    }

    /// Rule set this field belongs to
    pub fn kind(self) -> RuleKind {
        match self {
            RuleField::Hostname
            | RuleField::Family
            | RuleField::Series
            | RuleField::MgmtIp
            | RuleField::GroupNameHierarchy
            | RuleField::SoftwareVersion => RuleKind::Device,
            _ => RuleKind::Port,
        }
    }

    pub fn from_api_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.api_name() == name)
    }

    /// Parse a config rule name valid for `kind`
    pub fn from_rule_name(name: &str, kind: RuleKind) -> Option<Self> {
        let name = name.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|f| f.kind() == kind && f.rule_name() == name)
    }

    fn allowed_rule_names(kind: RuleKind) -> Vec<&'static str> {
        Self::ALL
            .into_iter()
            .filter(|f| f.kind() == kind)
            .map(RuleField::rule_name)
            .collect()
    }
}

/// How a config value is wildcarded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchPattern {
    Contains,
    Equals,
    StartsWith,
    EndsWith,
}

impl SearchPattern {
    fn parse(value: &str) -> Result<Self, WorkflowError> {
        match validate::one_of("search_pattern", value, &["contains", "equals", "starts_with", "ends_with"])?.as_str()
        {
            "contains" => Ok(SearchPattern::Contains),
            "equals" => Ok(SearchPattern::Equals),
            "starts_with" => Ok(SearchPattern::StartsWith),
            _ => Ok(SearchPattern::EndsWith),
        }
    }

    /// Apply the SQL-style wildcard for this pattern
    pub fn wildcard(self, value: &str) -> String {
        match self {
            SearchPattern::Contains => format!("%{}%", value),
            SearchPattern::Equals => value.to_string(),
            SearchPattern::StartsWith => format!("{}%", value),
            SearchPattern::EndsWith => format!("%{}", value),
        }
    }
}

/// Match operation of a leaf
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RuleOp {
    Ilike,
    Like,
}

impl RuleOp {
    pub fn as_str(self) -> &'static str {
        match self {
            RuleOp::Ilike => "ILIKE",
            RuleOp::Like => "LIKE",
        }
    }

    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "ILIKE" => Some(RuleOp::Ilike),
            "LIKE" => Some(RuleOp::Like),
            _ => None,
        }
    }
}

/// Canonical rule leaf; ordering is `(field priority, value, op)`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RuleLeaf {
    pub field: RuleField,
    pub value: String,
    pub op: RuleOp,
}

impl RuleLeaf {
    fn to_node(&self) -> RuleNode {
        RuleNode::Leaf {
            operation: self.op.as_str().to_string(),
            name: self.field.api_name().to_string(),
            value: self.value.clone(),
        }
    }
}

/// Canonicalize one config rule
pub fn canonical_leaf(rule: &RuleDescription, kind: RuleKind) -> Result<RuleLeaf, WorkflowError> {
    let field = RuleField::from_rule_name(&rule.rule_name, kind).ok_or_else(|| {
        WorkflowError::InvalidInput(format!(
            "'{}' is not a valid rule_name; expected one of: {}",
            rule.rule_name,
            RuleField::allowed_rule_names(kind).join(", ")
        ))
    })?;
    let pattern = SearchPattern::parse(&rule.search_pattern)?;
    let op = match rule.operation.as_deref() {
        None => RuleOp::Ilike,
        Some(op) => RuleOp::parse(op)
            .ok_or_else(|| WorkflowError::InvalidInput(format!("'{}' is not a valid operation; expected ILIKE or LIKE", op)))?,
    };
    let raw = validate::required("rule value", Some(&rule.value))?;

    // Speeds are written in Mbps and stored in Kbps
    let value = if field == RuleField::Speed {
        let mbps: u64 = raw
            .parse()
            .map_err(|_| WorkflowError::InvalidInput(format!("speed value '{}' must be a whole number", raw)))?;
        mbps.checked_mul(1000)
            .ok_or_else(|| WorkflowError::InvalidInput(format!("speed value '{}' is out of range", raw)))?
            .to_string()
    } else {
        raw.to_string()
    };

    Ok(RuleLeaf {
        field,
        value: pattern.wildcard(&value),
        op,
    })
}

/// Canonicalize a list of config rules into a leaf set
pub fn canonical_leaves(rules: &[RuleDescription], kind: RuleKind) -> Result<BTreeSet<RuleLeaf>, WorkflowError> {
    rules.iter().map(|r| canonical_leaf(r, kind)).collect()
}

/// Collect the leaves of a Controller rule tree
pub fn flatten(node: &RuleNode) -> Result<Vec<RuleLeaf>, WorkflowError> {
    let mut leaves = Vec::new();
    collect_leaves(node, &mut leaves)?;
    Ok(leaves)
}

fn collect_leaves(node: &RuleNode, leaves: &mut Vec<RuleLeaf>) -> Result<(), WorkflowError> {
    match node {
        RuleNode::Branch { items, .. } => {
            for item in items {
                collect_leaves(item, leaves)?;
            }
        }
        RuleNode::Leaf { operation, name, value } => {
            let field = RuleField::from_api_name(name).ok_or_else(|| {
                WorkflowError::PreconditionViolation(format!("Tag rule field '{}' is not supported", name))
            })?;
            let op = RuleOp::parse(operation).ok_or_else(|| {
                WorkflowError::PreconditionViolation(format!("Tag rule operation '{}' is not supported", operation))
            })?;
            leaves.push(RuleLeaf {
                field,
                value: value.clone(),
                op,
            });
        }
    }
    Ok(())
}

/// Canonical leaf set of an optional Controller tree
pub fn leaf_set(node: Option<&RuleNode>) -> Result<BTreeSet<RuleLeaf>, WorkflowError> {
    match node {
        Some(node) => Ok(flatten(node)?.into_iter().collect()),
        None => Ok(BTreeSet::new()),
    }
}

/// Build the deterministic Controller tree for a leaf set
pub fn regroup<'a>(leaves: impl IntoIterator<Item = &'a RuleLeaf>) -> Option<RuleNode> {
    let sorted: BTreeSet<&RuleLeaf> = leaves.into_iter().collect();
    let mut groups: Vec<Vec<RuleNode>> = Vec::new();
    let mut current_field = None;
    for leaf in sorted {
        if current_field != Some(leaf.field) {
            groups.push(Vec::new());
            current_field = Some(leaf.field);
        }
        if let Some(group) = groups.last_mut() {
            group.push(leaf.to_node());
        }
    }
    let grouped: Vec<RuleNode> = groups.into_iter().filter_map(|g| fold("OR", g)).collect();
    fold("AND", grouped)
}

/// Left-fold nodes into binary branches of `operation`
fn fold(operation: &str, nodes: Vec<RuleNode>) -> Option<RuleNode> {
    let mut queue: VecDeque<RuleNode> = nodes.into();
    if queue.len() <= 1 {
        return queue.pop_front();
    }
    while queue.len() > 2 {
        if let (Some(first), Some(second)) = (queue.pop_front(), queue.pop_front()) {
            queue.push_front(RuleNode::Branch {
                operation: operation.to_string(),
                items: vec![first, second],
            });
        }
    }
    Some(RuleNode::Branch {
        operation: operation.to_string(),
        items: queue.into(),
    })
}
