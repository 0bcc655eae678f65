//! Outcome Aggregator
//!
//! Every input item lands in exactly one bucket of an [`OutcomeReport`].
//! Bucket keys follow the Controller module conventions: tag lifecycle uses
//! `created_tag`, `updated_tag`, ...; tag membership uses the bare bucket
//! names; every other entity family is suffixed with its family name
//! (`created_port_assignments`, `updated_access_points`, ...).

use crate::error::WorkflowError;
use controller_client::MemberType;
use serde::Serialize;
use std::collections::BTreeMap;

/// Classification of an input item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Bucket {
    Created,
    Updated,
    NotUpdated,
    Deleted,
    Absent,
    NotDeleted,
}

impl Bucket {
    /// Bucket name used in report keys
    pub fn as_str(self) -> &'static str {
        match self {
            Bucket::Created => "created",
            Bucket::Updated => "updated",
            Bucket::NotUpdated => "not_updated",
            Bucket::Deleted => "deleted",
            Bucket::Absent => "absent",
            Bucket::NotDeleted => "not_deleted",
        }
    }

    /// Whether an item in this bucket means the Controller was changed
    pub fn is_change(self) -> bool {
        matches!(self, Bucket::Created | Bucket::Updated | Bucket::Deleted)
    }
}

/// Entity family an outcome belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Family {
    Tag,
    TagMembership,
    PortAssignments,
    PortChannels,
    VlanSsidMappings,
    AccessPoints,
    ApProvision,
    ApReboot,
    ApFactoryReset,
}

impl Family {
    /// Family name used in report keys
    pub fn as_str(self) -> &'static str {
        match self {
            Family::Tag => "tag",
            Family::TagMembership => "membership",
            Family::PortAssignments => "port_assignments",
            Family::PortChannels => "port_channels",
            Family::VlanSsidMappings => "vlan_ssid_mappings",
            Family::AccessPoints => "access_points",
            Family::ApProvision => "ap_provision",
            Family::ApReboot => "ap_reboot",
            Family::ApFactoryReset => "ap_factory_reset",
        }
    }

    /// Report key for a bucket of this family
    pub fn bucket_key(self, bucket: Bucket) -> String {
        match self {
            Family::TagMembership => bucket.as_str().to_string(),
            other => format!("{}_{}", bucket.as_str(), other.as_str()),
        }
    }
}

/// Tag reference inside a membership outcome
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TagListEntry {
    pub tag_name: String,
    pub tag_id: String,
}

/// One input item's outcome
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct OutcomeRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_type: Option<MemberType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_identifier: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interface_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub site_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags_list: Option<Vec<TagListEntry>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl OutcomeRecord {
    /// Record for a named entity (tag, VLAN, port channel)
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Default::default()
        }
    }

    /// Record for a device addressed by `identifier = value`
    pub fn device(identifier: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            device_type: Some(MemberType::NetworkDevice),
            device_identifier: Some(identifier.into()),
            device_value: Some(value.into()),
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Mark the record as an interface of the device
    #[must_use]
    pub fn with_interface(mut self, interface_name: impl Into<String>) -> Self {
        self.device_type = Some(MemberType::Interface);
        self.interface_name = Some(interface_name.into());
        self
    }

    #[must_use]
    pub fn with_site(mut self, site_name: impl Into<String>) -> Self {
        self.site_name = Some(site_name.into());
        self
    }

    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn with_tags(mut self, tags: Vec<TagListEntry>) -> Self {
        self.tags_list = Some(tags);
        self
    }

    #[must_use]
    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    fn label(&self) -> String {
        let base = self
            .name
            .clone()
            .or_else(|| self.device_value.clone())
            .or_else(|| self.site_name.clone())
            .or_else(|| self.id.clone())
            .unwrap_or_else(|| "-".to_string());
        match &self.interface_name {
            Some(interface) if self.name.is_none() => format!("{}:{}", base, interface),
            _ => base,
        }
    }
}

/// Result of one workflow run
#[derive(Debug, Clone, Default, Serialize)]
pub struct OutcomeReport {
    /// Any mutation succeeded
    pub changed: bool,
    /// A fatal error fired, verification failed, or every attempted write failed
    pub failed: bool,
    /// Newline-joined summary of the populated buckets
    pub msg: String,
    /// Outcome records per bucket key
    pub response: BTreeMap<String, Vec<OutcomeRecord>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
    #[serde(skip)]
    fatal: bool,
    #[serde(skip)]
    writes_attempted: usize,
    #[serde(skip)]
    writes_succeeded: usize,
}

impl OutcomeReport {
    /// Create an empty report
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an item outcome
    pub fn record(&mut self, family: Family, bucket: Bucket, record: OutcomeRecord) {
        if bucket.is_change() {
            self.changed = true;
        }
        self.response.entry(family.bucket_key(bucket)).or_default().push(record);
    }

    /// Record a fatal error
    pub fn fail(&mut self, error: &WorkflowError) {
        self.fatal = true;
        self.errors.push(error.to_string());
    }

    /// Record a verification mismatch that fails the run
    pub fn verification_failed(&mut self, mismatch: impl Into<String>) {
        self.fatal = true;
        self.errors.push(format!("Verification failed: {}", mismatch.into()));
    }

    /// Record a non-fatal note
    pub fn warn(&mut self, warning: impl Into<String>) {
        self.warnings.push(warning.into());
    }

    /// Count one Controller write and whether it succeeded
    pub fn count_write(&mut self, succeeded: bool) {
        self.writes_attempted += 1;
        if succeeded {
            self.writes_succeeded += 1;
        }
    }

    /// Number of writes attempted so far
    pub fn writes_attempted(&self) -> usize {
        self.writes_attempted
    }

    /// Records of one bucket
    pub fn bucket(&self, family: Family, bucket: Bucket) -> &[OutcomeRecord] {
        self.response
            .get(&family.bucket_key(bucket))
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Whether a fatal error has been recorded
    pub fn has_fatal(&self) -> bool {
        self.fatal
    }

    /// Compute `failed` and `msg`
    pub fn finish(&mut self) {
        self.failed = self.fatal || (self.writes_attempted > 0 && self.writes_succeeded == 0);

        let mut lines: Vec<String> = self
            .response
            .iter()
            .filter(|(_, records)| !records.is_empty())
            .map(|(key, records)| {
                let items: Vec<String> = records
                    .iter()
                    .map(|r| match &r.reason {
                        Some(reason) => format!("{} ({})", r.label(), reason),
                        None => r.label(),
                    })
                    .collect();
                format!("{}: {}", key, items.join(", "))
            })
            .collect();
        lines.extend(self.errors.iter().map(|e| format!("error: {}", e)));
        lines.extend(self.warnings.iter().map(|w| format!("warning: {}", w)));
        self.msg = if lines.is_empty() {
            "No changes required".to_string()
        } else {
            lines.join("\n")
        };
    }
}
