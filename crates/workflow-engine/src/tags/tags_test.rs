//! Unit tests for the tags workflow

#[cfg(test)]
mod tests {
    use crate::config::State;
    use crate::outcome::{Bucket, Family};
    use crate::resolver::{DEVICE_NOT_FOUND, INTERFACE_NOT_FOUND};
    use crate::run_tags_workflow;
    use crate::tags::TagsEntry;
    use crate::tags::diff::TagState;
    use crate::test_utils::*;
    use controller_client::{ControllerClientTrait, DynamicRule, MemberType, MockControllerClient, RuleNode, Tag};

    fn tagged_campus() -> (MockControllerClient, String) {
        let mock = campus();
        mock.add_device(switch("dev-edge2", "edge2.campus", "10.10.0.2"));
        mock.add_device(switch("dev-edge3", "edge3.campus", "10.10.0.3"));
        let id = mock.add_tag(Tag {
            name: "Campus-Edge".to_string(),
            ..Default::default()
        });
        (mock, id)
    }

    fn hostname_rule(value: &str) -> DynamicRule {
        DynamicRule {
            member_type: MemberType::NetworkDevice,
            rules: Some(RuleNode::Leaf {
                operation: "ILIKE".to_string(),
                name: "hostname".to_string(),
                value: value.to_string(),
            }),
            scope_rule: None,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_membership_soft_miss() {
        let (mock, tag_id) = tagged_campus();
        let entries: Vec<TagsEntry> = yaml(
            r#"
- tag_memberships:
    tags: [Campus-Edge]
    device_details:
      - ip_addresses: [10.10.0.1, 10.10.0.2, 10.10.0.9]
"#,
        );

        let report = run_tags_workflow(&mock, &entries, State::Merged, &options()).await;

        assert!(!report.failed, "{}", report.msg);
        assert!(report.changed);
        assert_eq!(report.bucket(Family::TagMembership, Bucket::Updated).len(), 2);
        let missed = report.bucket(Family::TagMembership, Bucket::NotUpdated);
        assert_eq!(missed.len(), 1);
        assert_eq!(missed[0].device_value.as_deref(), Some("10.10.0.9"));
        assert_eq!(missed[0].reason.as_deref(), Some(DEVICE_NOT_FOUND));

        assert!(mock.member_tag_ids(MemberType::NetworkDevice, EDGE_ID).contains(&tag_id));
        assert!(mock.member_tag_ids(MemberType::NetworkDevice, "dev-edge2").contains(&tag_id));
        // Both devices in one batched write
        assert_eq!(mock.writes_for("update_member_tags").len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_force_delete_issues_four_writes() {
        let (mock, tag_id) = tagged_campus();
        mock.add_tag(Tag {
            id: tag_id.clone(),
            name: "Campus-Edge".to_string(),
            description: Some("edge switches".to_string()),
            dynamic_rules: vec![hostname_rule("%edge%")],
            system_tag: false,
        });
        let other = mock.add_tag(Tag {
            name: "Floor-1".to_string(),
            ..Default::default()
        });
        for device in [EDGE_ID, "dev-edge2", "dev-edge3"] {
            mock.attach_tag(MemberType::NetworkDevice, device, &tag_id);
        }
        mock.attach_tag(MemberType::NetworkDevice, EDGE_ID, &other);
        mock.attach_tag(MemberType::Interface, "if-edge1-1", &tag_id);
        mock.attach_tag(MemberType::Interface, "if-edge1-2", &tag_id);

        let entries: Vec<TagsEntry> = yaml("- tag:\n    name: Campus-Edge\n    force_delete: true\n");
        let report = run_tags_workflow(&mock, &entries, State::Deleted, &options()).await;

        assert!(!report.failed, "{}", report.msg);
        let operations: Vec<&str> = mock.writes().iter().map(|w| w.operation).collect();
        assert_eq!(
            operations,
            vec!["update_tag", "update_member_tags", "update_member_tags", "delete_tag"]
        );
        let cleared = &mock.writes_for("update_tag")[0].payload;
        assert_eq!(cleared["dynamicRules"], serde_json::json!([]));

        assert!(mock.query_tags("Campus-Edge").await.unwrap().is_empty());
        assert_eq!(report.bucket(Family::Tag, Bucket::Deleted).len(), 1);
        // Unrelated tags survive the detach
        assert!(mock.member_tag_ids(MemberType::NetworkDevice, EDGE_ID).contains(&other));
    }

    #[tokio::test(start_paused = true)]
    async fn test_force_delete_stops_when_detach_fails() {
        let (mock, tag_id) = tagged_campus();
        mock.attach_tag(MemberType::NetworkDevice, EDGE_ID, &tag_id);
        mock.fail_task("update_member_tags", "Member is locked");

        let entries: Vec<TagsEntry> = yaml("- tag:\n    name: Campus-Edge\n    force_delete: true\n");
        let report = run_tags_workflow(&mock, &entries, State::Deleted, &options()).await;

        assert!(mock.writes_for("delete_tag").is_empty());
        let not_deleted = report.bucket(Family::Tag, Bucket::NotDeleted);
        assert_eq!(not_deleted.len(), 1);
        assert!(not_deleted[0].reason.as_deref().unwrap().contains("Member is locked"));
        assert!(report.failed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_create_with_membership_then_idempotent() {
        let mock = campus();
        let entries: Vec<TagsEntry> = yaml(
            r#"
- tag:
    name: Access-Ports
    description: Access layer ports
    port_rules:
      scope_description:
        scope_category: SITE
        scope_members: [Global/USA/SJC/BLD23]
      rule_descriptions:
        - rule_name: port_name
          search_pattern: starts_with
          value: GigabitEthernet1/0/
        - rule_name: speed
          search_pattern: equals
          value: "1000"
  tag_memberships:
    tags: [Access-Ports]
    device_details:
      - hostnames: [edge1.campus]
        port_names: [GigabitEthernet1/0/1, GigabitEthernet1/0/9]
"#,
        );

        let first = run_tags_workflow(&mock, &entries, State::Merged, &options()).await;
        assert!(!first.failed, "{}", first.msg);
        assert!(first.changed);
        assert_eq!(first.bucket(Family::Tag, Bucket::Created).len(), 1);
        assert_eq!(first.bucket(Family::TagMembership, Bucket::Updated).len(), 1);
        let missed = first.bucket(Family::TagMembership, Bucket::NotUpdated);
        assert_eq!(missed[0].interface_name.as_deref(), Some("GigabitEthernet1/0/9"));
        assert_eq!(missed[0].reason.as_deref(), Some(INTERFACE_NOT_FOUND));

        let tag = mock.tag_by_name("Access-Ports").unwrap();
        let state = TagState::from_tag(&tag).unwrap();
        assert_eq!(state.port_leaves.len(), 2);
        let scope = state.scope.unwrap();
        assert!(scope.inherit);
        assert!(scope.members.contains(FABRIC_SITE_ID));
        assert!(mock.member_tag_ids(MemberType::Interface, "if-edge1-1").contains(&tag.id));

        mock.reset_writes();
        let second = run_tags_workflow(&mock, &entries, State::Merged, &options()).await;
        assert!(!second.changed, "{}", second.msg);
        assert!(!second.failed);
        assert!(mock.writes().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_membership_deleted_keeps_other_tags() {
        let (mock, tag_id) = tagged_campus();
        let keep = mock.add_tag(Tag {
            name: "Keep".to_string(),
            ..Default::default()
        });
        mock.attach_tag(MemberType::NetworkDevice, EDGE_ID, &tag_id);
        mock.attach_tag(MemberType::NetworkDevice, EDGE_ID, &keep);

        let entries: Vec<TagsEntry> = yaml(
            "- tag_memberships:\n    tags: [Campus-Edge]\n    device_details:\n      - ip_addresses: [10.10.0.1, 10.10.0.2]\n",
        );
        let report = run_tags_workflow(&mock, &entries, State::Deleted, &options()).await;

        assert!(!report.failed, "{}", report.msg);
        assert_eq!(report.bucket(Family::TagMembership, Bucket::Deleted).len(), 1);
        assert_eq!(report.bucket(Family::TagMembership, Bucket::NotDeleted).len(), 1);
        let remaining = mock.member_tag_ids(MemberType::NetworkDevice, EDGE_ID);
        assert!(!remaining.contains(&tag_id));
        assert!(remaining.contains(&keep));
    }

    #[tokio::test(start_paused = true)]
    async fn test_tag_limit_fails_before_any_write() {
        let (mock, _) = tagged_campus();
        for n in 0..500 {
            let id = mock.add_tag(Tag {
                name: format!("bulk-{}", n),
                ..Default::default()
            });
            mock.attach_tag(MemberType::NetworkDevice, EDGE_ID, &id);
        }

        let entries: Vec<TagsEntry> = yaml(
            "- tag_memberships:\n    tags: [Campus-Edge]\n    device_details:\n      - ip_addresses: [10.10.0.1, 10.10.0.2]\n",
        );
        let report = run_tags_workflow(&mock, &entries, State::Merged, &options()).await;

        assert!(report.failed);
        assert!(mock.writes().is_empty());
        assert_eq!(report.bucket(Family::TagMembership, Bucket::NotUpdated).len(), 2);
        assert!(report.errors[0].contains("More than 500 tags"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_merged_rules_union_and_partial_delete() {
        let (mock, tag_id) = tagged_campus();
        mock.add_tag(Tag {
            id: tag_id.clone(),
            name: "Campus-Edge".to_string(),
            description: None,
            dynamic_rules: vec![hostname_rule("%edge%")],
            system_tag: false,
        });

        let merge: Vec<TagsEntry> = yaml(
            r#"
- tag:
    name: Campus-Edge
    device_rules:
      rule_descriptions:
        - {rule_name: device_name, search_pattern: contains, value: core}
        - {rule_name: device_family, search_pattern: equals, value: Switches and Hubs}
"#,
        );
        let report = run_tags_workflow(&mock, &merge, State::Merged, &options()).await;
        assert_eq!(report.bucket(Family::Tag, Bucket::Updated).len(), 1, "{}", report.msg);
        let state = TagState::from_tag(&mock.tag_by_name("Campus-Edge").unwrap()).unwrap();
        assert_eq!(state.device_leaves.len(), 3);

        let remove: Vec<TagsEntry> = yaml(
            r#"
- tag:
    name: Campus-Edge
    device_rules:
      rule_descriptions:
        - {rule_name: device_name, search_pattern: contains, value: edge}
"#,
        );
        let report = run_tags_workflow(&mock, &remove, State::Deleted, &options()).await;
        assert_eq!(report.bucket(Family::Tag, Bucket::Updated).len(), 1, "{}", report.msg);
        let state = TagState::from_tag(&mock.tag_by_name("Campus-Edge").unwrap()).unwrap();
        assert_eq!(state.device_leaves.len(), 2);
        assert!(state.device_leaves.iter().all(|l| l.value != "%edge%"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_delete_absent_tag_is_not_a_change() {
        let mock = campus();
        let entries: Vec<TagsEntry> = yaml("- tag:\n    name: Missing\n");
        let report = run_tags_workflow(&mock, &entries, State::Deleted, &options()).await;

        assert!(!report.changed);
        assert!(!report.failed);
        assert_eq!(report.bucket(Family::Tag, Bucket::Absent).len(), 1);
        assert!(mock.writes().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_old_controller_is_rejected() {
        let mock = campus();
        mock.set_release_version("2.3.7.6");
        let entries: Vec<TagsEntry> = yaml("- tag:\n    name: Campus-Edge\n");
        let report = run_tags_workflow(&mock, &entries, State::Merged, &options()).await;

        assert!(report.failed);
        assert!(report.errors[0].contains("2.3.7.9"));
        assert!(mock.writes().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalid_entry_prevents_all_writes() {
        let mock = campus();
        let entries: Vec<TagsEntry> = yaml(
            r#"
- tag:
    name: Valid
- tag:
    name: Broken
    device_rules:
      rule_descriptions:
        - {rule_name: port_name, search_pattern: contains, value: Gi}
"#,
        );
        let report = run_tags_workflow(&mock, &entries, State::Merged, &options()).await;

        assert!(report.failed);
        assert!(mock.writes().is_empty());
        assert!(mock.tag_by_name("Valid").is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_site_details_and_verify() {
        let (mock, tag_id) = tagged_campus();
        let mut opts = options();
        opts.config_verify = true;
        let entries: Vec<TagsEntry> = yaml(
            "- tag_memberships:\n    tags: [Campus-Edge]\n    site_details:\n      - site_names: [Global/USA/SJC/BLD23]\n",
        );

        let report = run_tags_workflow(&mock, &entries, State::Merged, &opts).await;

        assert!(!report.failed, "{}", report.msg);
        let updated = report.bucket(Family::TagMembership, Bucket::Updated);
        assert_eq!(updated.len(), 1);
        assert_eq!(updated[0].site_name.as_deref(), Some(FABRIC_SITE));
        assert_eq!(updated[0].device_value.as_deref(), Some("edge1.campus"));
        assert_eq!(updated[0].tags_list.as_ref().unwrap()[0].tag_id, tag_id);
    }
}
