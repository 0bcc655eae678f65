//! Task bookkeeping for the mock client
//!
//! Every write opens a task. The mutation is applied (or refused) when the
//! write is issued; the task then reports `PENDING` for the configured number
//! of polls before exposing its terminal status.

use super::{lock, MockControllerClient, WriteCall};
use crate::error::ApiError;
use crate::models::{Task, TaskCreated, TaskDetail};

/// Task state kept by the mock
#[derive(Debug, Clone)]
pub(crate) struct MockTask {
    pub(crate) task: Task,
    pub(crate) detail: TaskDetail,
    pub(crate) polls_remaining: u32,
}

fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

impl MockControllerClient {
    /// Record a write and report the injected task failure for it, if any
    ///
    /// Returns `Err` when a transport failure was injected for `operation`;
    /// in that case nothing is recorded as a task.
    pub(crate) fn begin_write(
        &self,
        operation: &'static str,
        payload: serde_json::Value,
    ) -> Result<Option<String>, ApiError> {
        self.check_transport(operation)?;
        lock(&self.writes).push(WriteCall { operation, payload });
        Ok(lock(&self.task_failures).get(operation).cloned())
    }

    /// Open a task that will finish with `outcome`
    pub(crate) fn finish_write(&self, outcome: Result<(), String>) -> TaskCreated {
        let id = self.next_id("task");
        let started = now_millis();
        let (status, failure_reason) = match outcome {
            Ok(()) => ("SUCCESS", None),
            Err(reason) => ("FAILURE", Some(reason)),
        };
        let task = Task {
            id: id.clone(),
            status: Some(status.to_string()),
            start_time: Some(started),
            end_time: Some(started),
            result_location: Some(format!("/dna/intent/api/v1/tasks/{}/detail", id)),
            error_code: failure_reason.as_ref().map(|_| "NCND00001".to_string()),
        };
        let detail = TaskDetail {
            id: Some(id.clone()),
            is_error: Some(failure_reason.is_some()),
            failure_reason,
            progress: Some(status.to_string()),
            data: None,
        };
        let polls_remaining = *lock(&self.task_polls);
        lock(&self.tasks).insert(
            id.clone(),
            MockTask {
                task,
                detail,
                polls_remaining,
            },
        );
        TaskCreated {
            url: Some(format!("/dna/intent/api/v1/tasks/{}", id)),
            task_id: id,
        }
    }
}

pub(crate) fn get_task_by_id(client: &MockControllerClient, task_id: &str) -> Result<Task, ApiError> {
    let mut tasks = lock(&client.tasks);
    let entry = tasks
        .get_mut(task_id)
        .ok_or_else(|| ApiError::NotFound(format!("Task {} not found", task_id)))?;

    if entry.polls_remaining > 0 {
        if entry.polls_remaining != u32::MAX {
            entry.polls_remaining -= 1;
        }
        return Ok(Task {
            id: entry.task.id.clone(),
            status: Some("PENDING".to_string()),
            start_time: entry.task.start_time,
            end_time: None,
            result_location: None,
            error_code: None,
        });
    }
    Ok(entry.task.clone())
}

pub(crate) fn get_task_detail(client: &MockControllerClient, task_id: &str) -> Result<TaskDetail, ApiError> {
    lock(&client.tasks)
        .get(task_id)
        .map(|entry| entry.detail.clone())
        .ok_or_else(|| ApiError::NotFound(format!("Task {} not found", task_id)))
}

#[cfg(test)]
mod tests {
    use crate::controller_trait::ControllerClientTrait;
    use crate::mock::MockControllerClient;
    use crate::models::{MemberTags, MemberType};

    #[tokio::test]
    async fn test_task_reports_pending_for_configured_polls() {
        let mock = MockControllerClient::new("https://mock");
        mock.set_task_polls(2);
        let created = mock.update_member_tags(MemberType::NetworkDevice, &[]).await.unwrap();

        assert!(!mock.get_task_by_id(&created.task_id).await.unwrap().is_terminal());
        assert!(!mock.get_task_by_id(&created.task_id).await.unwrap().is_terminal());
        let task = mock.get_task_by_id(&created.task_id).await.unwrap();
        assert!(task.is_terminal());
        assert!(task.is_success());
    }

    #[tokio::test]
    async fn test_injected_task_failure_skips_mutation() {
        let mock = MockControllerClient::new("https://mock");
        mock.fail_task("update_member_tags", "tag is read-only");
        let created = mock
            .update_member_tags(
                MemberType::NetworkDevice,
                &[MemberTags { id: "d1".to_string(), tags: vec![] }],
            )
            .await
            .unwrap();

        let task = mock.get_task_by_id(&created.task_id).await.unwrap();
        assert!(task.is_terminal());
        assert!(!task.is_success());
        let detail = mock.get_task_detail(&created.task_id).await.unwrap();
        assert_eq!(detail.failure_reason.as_deref(), Some("tag is read-only"));
        assert_eq!(mock.writes_for("update_member_tags").len(), 1);
    }

    #[tokio::test]
    async fn test_transport_failure_records_nothing() {
        let mock = MockControllerClient::new("https://mock");
        mock.fail_transport("delete_tag", "connection reset");
        assert!(mock.delete_tag("t-1").await.is_err());
        assert!(mock.writes().is_empty());
    }
}
