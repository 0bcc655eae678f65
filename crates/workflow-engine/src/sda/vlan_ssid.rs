//! VLAN to SSID mappings of a fabric site.
//!
//! The Controller replaces the whole mapping list on every write, so the
//! final list is composed from the current one and sent in a single PUT.

use super::model::VlanSsidWant;
use crate::config::State;
use crate::driver::Context;
use crate::outcome::{Bucket, Family, OutcomeRecord, OutcomeReport};
use controller_client::{SsidDetail, VlanSsidMapping};
use tracing::{debug, info};

/// Outcome of one requested VLAN before the write
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VlanOutcome {
    pub vlan_name: String,
    pub bucket: Bucket,
    pub reason: Option<String>,
}

/// Final mapping list plus what happened to each requested VLAN
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VlanSsidPlan {
    pub mappings: Vec<VlanSsidMapping>,
    pub outcomes: Vec<VlanOutcome>,
}

impl VlanSsidPlan {
    /// Whether the composed list differs from the current one
    pub fn needs_write(&self) -> bool {
        self.outcomes.iter().any(|o| o.bucket.is_change())
    }
}

fn outcome(vlan_name: &str, bucket: Bucket, reason: Option<&str>) -> VlanOutcome {
    VlanOutcome {
        vlan_name: vlan_name.to_string(),
        bucket,
        reason: reason.map(str::to_string),
    }
}

/// Compose the mapping list the fabric site should end up with
pub fn compose(want: &[VlanSsidWant], have: &[VlanSsidMapping], state: State) -> VlanSsidPlan {
    let mut mappings = have.to_vec();
    let mut outcomes = Vec::with_capacity(want.len());

    for requested in want {
        let position = mappings.iter().position(|m| m.vlan_name == requested.vlan_name);
        match state {
            State::Merged => {
                let ssids = requested.ssids.as_deref().unwrap_or_default();
                let Some(index) = position else {
                    mappings.push(VlanSsidMapping {
                        vlan_name: requested.vlan_name.clone(),
                        ssid_details: ssids
                            .iter()
                            .map(|s| SsidDetail {
                                name: s.name.clone(),
                                security_group_tag: s.security_group_tag.clone(),
                            })
                            .collect(),
                    });
                    outcomes.push(outcome(&requested.vlan_name, Bucket::Created, None));
                    continue;
                };
                let mapping = &mut mappings[index];
                let mut changed = false;
                for ssid in ssids {
                    match mapping.ssid_details.iter_mut().find(|d| d.name == ssid.name) {
                        None => {
                            mapping.ssid_details.push(SsidDetail {
                                name: ssid.name.clone(),
                                security_group_tag: ssid.security_group_tag.clone(),
                            });
                            changed = true;
                        }
                        Some(detail) => {
                            if ssid.security_group_tag.is_some() && detail.security_group_tag != ssid.security_group_tag {
                                detail.security_group_tag = ssid.security_group_tag.clone();
                                changed = true;
                            }
                        }
                    }
                }
                outcomes.push(if changed {
                    outcome(&requested.vlan_name, Bucket::Updated, None)
                } else {
                    outcome(
                        &requested.vlan_name,
                        Bucket::NotUpdated,
                        Some("VLAN already mapped to the requested SSIDs"),
                    )
                });
            }
            State::Deleted => {
                let Some(index) = position else {
                    outcomes.push(outcome(&requested.vlan_name, Bucket::Absent, None));
                    continue;
                };
                let removed = match &requested.ssids {
                    None => {
                        mappings.remove(index);
                        true
                    }
                    Some(ssids) => {
                        let mapping = &mut mappings[index];
                        let before = mapping.ssid_details.len();
                        mapping
                            .ssid_details
                            .retain(|d| !ssids.iter().any(|s| s.name == d.name));
                        let removed = mapping.ssid_details.len() < before;
                        if mapping.ssid_details.is_empty() {
                            mappings.remove(index);
                        }
                        removed
                    }
                };
                outcomes.push(outcome(
                    &requested.vlan_name,
                    if removed { Bucket::Deleted } else { Bucket::Absent },
                    None,
                ));
            }
        }
    }

    mappings.retain(|m| !m.ssid_details.is_empty());
    VlanSsidPlan { mappings, outcomes }
}

/// Compose and write the mappings of one fabric site
pub async fn apply(
    ctx: &Context<'_>,
    fabric_site: &str,
    fabric_id: &str,
    want: &[VlanSsidWant],
    have: &[VlanSsidMapping],
    state: State,
    report: &mut OutcomeReport,
) {
    let plan = compose(want, have, state);
    let result = if plan.needs_write() {
        info!(
            "Writing {} VLAN to SSID mappings for fabric site {}",
            plan.mappings.len(),
            fabric_site
        );
        ctx.executor()
            .execute(
                report,
                &format!("update VLAN to SSID mappings of {}", fabric_site),
                ctx.client.update_vlan_ssid_mappings(fabric_id, &plan.mappings),
            )
            .await
    } else {
        debug!("VLAN to SSID mappings of {} already in the requested state", fabric_site);
        Ok(())
    };

    let not_done = match state {
        State::Merged => Bucket::NotUpdated,
        State::Deleted => Bucket::NotDeleted,
    };
    for item in plan.outcomes {
        let record = OutcomeRecord::named(&item.vlan_name).with_site(fabric_site);
        let record = match (&result, item.bucket.is_change()) {
            (Err(reason), true) => {
                report.record(Family::VlanSsidMappings, not_done, record.with_reason(reason.clone()));
                continue;
            }
            _ => match item.reason {
                Some(reason) => record.with_reason(reason),
                None => record,
            },
        };
        report.record(Family::VlanSsidMappings, item.bucket, record);
    }
}

/// Mismatches between the request and freshly read mappings
pub fn verify(want: &[VlanSsidWant], have: &[VlanSsidMapping], state: State) -> Vec<String> {
    compose(want, have, state)
        .outcomes
        .into_iter()
        .filter(|o| o.bucket.is_change())
        .map(|o| match state {
            State::Merged => format!("VLAN {} is not mapped to the requested SSIDs", o.vlan_name),
            State::Deleted => format!("VLAN {} still carries the removed SSIDs", o.vlan_name),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sda::model::SsidWant;

    fn mapping(vlan: &str, ssids: &[&str]) -> VlanSsidMapping {
        VlanSsidMapping {
            vlan_name: vlan.to_string(),
            ssid_details: ssids
                .iter()
                .map(|s| SsidDetail {
                    name: s.to_string(),
                    security_group_tag: None,
                })
                .collect(),
        }
    }

    fn request(vlan: &str, ssids: Option<&[(&str, Option<&str>)]>) -> VlanSsidWant {
        VlanSsidWant {
            vlan_name: vlan.to_string(),
            ssids: ssids.map(|list| {
                list.iter()
                    .map(|(name, sgt)| SsidWant {
                        name: name.to_string(),
                        security_group_tag: sgt.map(str::to_string),
                    })
                    .collect()
            }),
        }
    }

    #[test]
    fn test_partial_delete_keeps_other_ssids() {
        let have = [mapping("V1", &["A", "B"]), mapping("V2", &["C"])];
        let plan = compose(&[request("V1", Some(&[("A", None)]))], &have, State::Deleted);
        assert_eq!(plan.mappings, vec![mapping("V1", &["B"]), mapping("V2", &["C"])]);
        assert_eq!(plan.outcomes[0].bucket, Bucket::Deleted);
    }

    #[test]
    fn test_delete_without_ssids_removes_vlan() {
        let have = [mapping("V1", &["A", "B"]), mapping("V2", &["C"])];
        let plan = compose(&[request("V1", None), request("V9", None)], &have, State::Deleted);
        assert_eq!(plan.mappings, vec![mapping("V2", &["C"])]);
        assert_eq!(plan.outcomes[1].bucket, Bucket::Absent);
    }

    #[test]
    fn test_merge_adds_ssids_and_updates_sgt() {
        let have = [mapping("V1", &["A"])];
        let plan = compose(
            &[
                request("V1", Some(&[("A", Some("Employees")), ("B", None)])),
                request("V2", Some(&[("C", None)])),
            ],
            &have,
            State::Merged,
        );
        assert_eq!(plan.mappings.len(), 2);
        assert_eq!(plan.mappings[0].ssid_details[0].security_group_tag.as_deref(), Some("Employees"));
        assert_eq!(plan.mappings[0].ssid_details[1].name, "B");
        assert_eq!(plan.outcomes[0].bucket, Bucket::Updated);
        assert_eq!(plan.outcomes[1].bucket, Bucket::Created);
    }

    #[test]
    fn test_unchanged_merge_needs_no_write() {
        let have = [mapping("V1", &["A", "B"])];
        let plan = compose(&[request("V1", Some(&[("B", None)]))], &have, State::Merged);
        assert!(!plan.needs_write());
        assert_eq!(plan.outcomes[0].bucket, Bucket::NotUpdated);
        assert!(verify(&[request("V1", Some(&[("B", None)]))], &have, State::Merged).is_empty());
    }
}
