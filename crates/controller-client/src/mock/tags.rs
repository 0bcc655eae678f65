//! Tag operations for the mock client
//!
//! Membership is explicit only: the mock never evaluates dynamic rules.

use super::{lock, page, MockControllerClient};
use crate::error::ApiError;
use crate::models::{MemberTags, MemberType, Tag, TagMember, TagRef, TaskCreated};
use std::collections::BTreeSet;

/// Per-member ceiling enforced by the Controller
const MAX_TAGS_PER_MEMBER: usize = 500;

impl MockControllerClient {
    /// Seed a tag; returns its id
    pub fn add_tag(&self, mut tag: Tag) -> String {
        if tag.id.is_empty() {
            tag.id = self.next_id("tag");
        }
        let id = tag.id.clone();
        lock(&self.tags).insert(id.clone(), tag);
        id
    }

    /// Attach a tag to a device or interface
    pub fn attach_tag(&self, member_type: MemberType, member_id: &str, tag_id: &str) {
        lock(&self.member_tags)
            .entry((member_type, member_id.to_string()))
            .or_default()
            .insert(tag_id.to_string());
    }

    /// Look up a tag by name
    pub fn tag_by_name(&self, name: &str) -> Option<Tag> {
        lock(&self.tags).values().find(|t| t.name == name).cloned()
    }

    /// Ids of the tags attached to a member
    pub fn member_tag_ids(&self, member_type: MemberType, member_id: &str) -> BTreeSet<String> {
        lock(&self.member_tags)
            .get(&(member_type, member_id.to_string()))
            .cloned()
            .unwrap_or_default()
    }

    fn tag_member(&self, member_type: MemberType, member_id: &str) -> TagMember {
        match member_type {
            MemberType::NetworkDevice => {
                let device = lock(&self.devices).iter().find(|d| d.id == member_id).cloned();
                TagMember {
                    id: member_id.to_string(),
                    hostname: device.as_ref().and_then(|d| d.hostname.clone()),
                    management_ip_address: device.and_then(|d| d.management_ip_address),
                    ..Default::default()
                }
            }
            MemberType::Interface => {
                let interface = lock(&self.interfaces).iter().find(|i| i.id == member_id).cloned();
                TagMember {
                    id: member_id.to_string(),
                    port_name: interface.as_ref().map(|i| i.port_name.clone()),
                    device_id: interface.and_then(|i| i.device_id),
                    ..Default::default()
                }
            }
        }
    }
}

pub(crate) fn query_tags(client: &MockControllerClient, name: &str) -> Result<Vec<Tag>, ApiError> {
    Ok(lock(&client.tags).values().filter(|t| t.name == name).cloned().collect())
}

pub(crate) fn create_tag(client: &MockControllerClient, tag: &Tag) -> Result<TaskCreated, ApiError> {
    let injected = client.begin_write("create_tag", serde_json::to_value(tag)?)?;
    let outcome = match injected {
        Some(reason) => Err(reason),
        None if client.tag_by_name(&tag.name).is_some() => Err(format!("Tag {} already exists", tag.name)),
        None => {
            client.add_tag(Tag {
                id: String::new(),
                ..tag.clone()
            });
            Ok(())
        }
    };
    Ok(client.finish_write(outcome))
}

pub(crate) fn update_tag(client: &MockControllerClient, tag: &Tag) -> Result<TaskCreated, ApiError> {
    let injected = client.begin_write("update_tag", serde_json::to_value(tag)?)?;
    let outcome = match injected {
        Some(reason) => Err(reason),
        None => {
            let mut tags = lock(&client.tags);
            match tags.get_mut(&tag.id) {
                Some(existing) => {
                    *existing = tag.clone();
                    Ok(())
                }
                None => Err(format!("Tag {} not found", tag.id)),
            }
        }
    };
    Ok(client.finish_write(outcome))
}

pub(crate) fn delete_tag(client: &MockControllerClient, id: &str) -> Result<TaskCreated, ApiError> {
    let injected = client.begin_write("delete_tag", serde_json::json!({ "id": id }))?;
    let outcome = match injected {
        Some(reason) => Err(reason),
        None => {
            if lock(&client.tags).remove(id).is_some() {
                for tags in lock(&client.member_tags).values_mut() {
                    tags.remove(id);
                }
                Ok(())
            } else {
                Err(format!("Tag {} not found", id))
            }
        }
    };
    Ok(client.finish_write(outcome))
}

pub(crate) fn query_tag_members(
    client: &MockControllerClient,
    tag_id: &str,
    member_type: MemberType,
    offset: u32,
    limit: u32,
) -> Result<Vec<TagMember>, ApiError> {
    if !lock(&client.tags).contains_key(tag_id) {
        return Err(ApiError::NotFound(format!("Tag {} not found", tag_id)));
    }
    let member_ids: Vec<String> = lock(&client.member_tags)
        .iter()
        .filter(|((kind, _), tags)| *kind == member_type && tags.contains(tag_id))
        .map(|((_, id), _)| id.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    let members: Vec<TagMember> = member_ids
        .iter()
        .map(|id| client.tag_member(member_type, id))
        .collect();
    Ok(page(&members, offset, limit))
}

pub(crate) fn query_member_tags(
    client: &MockControllerClient,
    member_type: MemberType,
    ids: &[String],
) -> Result<Vec<MemberTags>, ApiError> {
    let tags = lock(&client.tags);
    let members = lock(&client.member_tags);
    Ok(ids
        .iter()
        .map(|id| MemberTags {
            id: id.clone(),
            tags: members
                .get(&(member_type, id.clone()))
                .map(|set| {
                    set.iter()
                        .map(|tag_id| TagRef {
                            id: tag_id.clone(),
                            name: tags.get(tag_id).map(|t| t.name.clone()),
                        })
                        .collect()
                })
                .unwrap_or_default(),
        })
        .collect())
}

pub(crate) fn update_member_tags(
    client: &MockControllerClient,
    member_type: MemberType,
    updates: &[MemberTags],
) -> Result<TaskCreated, ApiError> {
    let payload = serde_json::json!({
        "memberType": member_type.as_str(),
        "members": updates,
    });
    let injected = client.begin_write("update_member_tags", payload)?;
    let outcome = match injected {
        Some(reason) => Err(reason),
        None => match updates.iter().find(|u| u.tags.len() > MAX_TAGS_PER_MEMBER) {
            Some(over) => Err(format!(
                "Member {} would carry {} tags, maximum is {}",
                over.id,
                over.tags.len(),
                MAX_TAGS_PER_MEMBER
            )),
            None => {
                let mut members = lock(&client.member_tags);
                for update in updates {
                    members.insert(
                        (member_type, update.id.clone()),
                        update.tags.iter().map(|t| t.id.clone()).collect(),
                    );
                }
                Ok(())
            }
        },
    };
    Ok(client.finish_write(outcome))
}

#[cfg(test)]
mod tests {
    use crate::controller_trait::ControllerClientTrait;
    use crate::mock::MockControllerClient;
    use crate::models::{MemberTags, MemberType, Tag, TagRef};

    #[tokio::test]
    async fn test_delete_tag_detaches_members() {
        let mock = MockControllerClient::new("https://mock");
        let id = mock.add_tag(Tag { name: "edge".to_string(), ..Default::default() });
        mock.attach_tag(MemberType::NetworkDevice, "d1", &id);
        mock.attach_tag(MemberType::Interface, "if1", &id);

        let members = mock.query_tag_members(&id, MemberType::NetworkDevice, 1, 500).await.unwrap();
        assert_eq!(members.len(), 1);

        mock.delete_tag(&id).await.unwrap();
        assert!(mock.query_tags("edge").await.unwrap().is_empty());
        assert!(mock.member_tag_ids(MemberType::Interface, "if1").is_empty());
    }

    #[tokio::test]
    async fn test_update_member_tags_replaces_set() {
        let mock = MockControllerClient::new("https://mock");
        let a = mock.add_tag(Tag { name: "a".to_string(), ..Default::default() });
        let b = mock.add_tag(Tag { name: "b".to_string(), ..Default::default() });
        mock.attach_tag(MemberType::NetworkDevice, "d1", &a);

        mock.update_member_tags(
            MemberType::NetworkDevice,
            &[MemberTags { id: "d1".to_string(), tags: vec![TagRef { id: b.clone(), name: None }] }],
        )
        .await
        .unwrap();

        let current = mock.query_member_tags(MemberType::NetworkDevice, &["d1".to_string()]).await.unwrap();
        assert_eq!(current[0].tags.len(), 1);
        assert_eq!(current[0].tags[0].id, b);
        assert_eq!(current[0].tags[0].name.as_deref(), Some("b"));
    }
}
