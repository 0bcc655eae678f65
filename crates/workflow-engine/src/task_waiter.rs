//! Task Waiter
//!
//! Polls an asynchronous Controller operation until it is terminal. Two
//! handle kinds exist: task ids (most writes) and execution ids (legacy AP
//! provisioning). Both are polled through the same [`TaskWaiter::wait`].
//!
//! The waiter never returns an error: transport problems while polling and
//! timeouts become a [`TaskOutcome::Failure`] so the caller can record the
//! affected items and carry on.

use controller_client::{ControllerClientTrait, ExecutionCreated, TaskCreated};
use std::time::Duration;
use tracing::{debug, warn};

/// Handle of an in-flight Controller operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AsyncHandle {
    /// Task-id model, polled through the task API
    Task(String),
    /// Execution-id model, polled through the execution status API
    Execution(String),
}

impl AsyncHandle {
    /// Raw id of the operation
    pub fn id(&self) -> &str {
        match self {
            AsyncHandle::Task(id) | AsyncHandle::Execution(id) => id,
        }
    }
}

impl From<TaskCreated> for AsyncHandle {
    fn from(created: TaskCreated) -> Self {
        AsyncHandle::Task(created.task_id)
    }
}

impl From<ExecutionCreated> for AsyncHandle {
    fn from(created: ExecutionCreated) -> Self {
        AsyncHandle::Execution(created.execution_id)
    }
}

/// Terminal result of an operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutcome {
    Success,
    Failure(String),
}

impl TaskOutcome {
    /// Convert into a `Result` carrying the failure reason
    pub fn into_result(self) -> Result<(), String> {
        match self {
            TaskOutcome::Success => Ok(()),
            TaskOutcome::Failure(reason) => Err(reason),
        }
    }
}

/// Polls operations every `poll_interval` for at most `task_timeout`
#[derive(Debug, Clone, Copy)]
pub struct TaskWaiter {
    poll_interval: Duration,
    task_timeout: Duration,
}

impl TaskWaiter {
    /// Create a waiter
    pub fn new(poll_interval: Duration, task_timeout: Duration) -> Self {
        Self {
            poll_interval,
            task_timeout,
        }
    }

    /// Wait for `handle` to finish
    pub async fn wait(&self, client: &dyn ControllerClientTrait, handle: &AsyncHandle) -> TaskOutcome {
        match tokio::time::timeout(self.task_timeout, self.poll_until_terminal(client, handle)).await {
            Ok(outcome) => outcome,
            Err(_) => {
                warn!("{:?} did not finish within {}s", handle, self.task_timeout.as_secs());
                TaskOutcome::Failure(format!(
                    "Task {} did not complete within {} seconds",
                    handle.id(),
                    self.task_timeout.as_secs()
                ))
            }
        }
    }

    async fn poll_until_terminal(&self, client: &dyn ControllerClientTrait, handle: &AsyncHandle) -> TaskOutcome {
        loop {
            let polled = match handle {
                AsyncHandle::Task(id) => poll_task(client, id).await,
                AsyncHandle::Execution(id) => poll_execution(client, id).await,
            };
            match polled {
                Ok(Some(outcome)) => return outcome,
                Ok(None) => {
                    debug!("{:?} still running, polling again in {:?}", handle, self.poll_interval);
                    tokio::time::sleep(self.poll_interval).await;
                }
                Err(reason) => return TaskOutcome::Failure(reason),
            }
        }
    }
}

async fn poll_task(client: &dyn ControllerClientTrait, task_id: &str) -> Result<Option<TaskOutcome>, String> {
    let task = client
        .get_task_by_id(task_id)
        .await
        .map_err(|e| format!("Failed to poll task {}: {}", task_id, e))?;
    if !task.is_terminal() {
        return Ok(None);
    }
    if task.is_success() {
        debug!("Task {} succeeded", task_id);
        return Ok(Some(TaskOutcome::Success));
    }

    // Failure detail lives on a separate endpoint
    let reason = match client.get_task_detail(task_id).await {
        Ok(detail) => detail
            .failure_reason
            .or(detail.progress)
            .unwrap_or_else(|| format!("Task {} failed", task_id)),
        Err(e) => format!("Task {} failed; details unavailable: {}", task_id, e),
    };
    warn!("Task {} failed: {}", task_id, reason);
    Ok(Some(TaskOutcome::Failure(reason)))
}

async fn poll_execution(client: &dyn ControllerClientTrait, execution_id: &str) -> Result<Option<TaskOutcome>, String> {
    let status = client
        .get_execution_status(execution_id)
        .await
        .map_err(|e| format!("Failed to poll execution {}: {}", execution_id, e))?;
    match status.status.as_str() {
        "SUCCESS" => Ok(Some(TaskOutcome::Success)),
        "FAILURE" => {
            let reason = status
                .bapi_error
                .unwrap_or_else(|| format!("Execution {} failed", execution_id));
            warn!("Execution {} failed: {}", execution_id, reason);
            Ok(Some(TaskOutcome::Failure(reason)))
        }
        _ => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use controller_client::{MemberTags, MemberType, MockControllerClient};

    fn waiter() -> TaskWaiter {
        TaskWaiter::new(Duration::from_secs(2), Duration::from_secs(20))
    }

    #[tokio::test(start_paused = true)]
    async fn test_waits_through_pending_polls() {
        let mock = MockControllerClient::new("https://mock");
        mock.set_task_polls(3);
        let created = mock.update_member_tags(MemberType::NetworkDevice, &[]).await.unwrap();

        let started = tokio::time::Instant::now();
        let outcome = waiter().wait(&mock, &created.into()).await;
        assert_eq!(outcome, TaskOutcome::Success);
        assert!(started.elapsed() >= Duration::from_secs(6));
        assert!(started.elapsed() < Duration::from_secs(8));
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_carries_detail_reason() {
        let mock = MockControllerClient::new("https://mock");
        mock.fail_task("update_member_tags", "Tag limit reached");
        let created = mock
            .update_member_tags(MemberType::NetworkDevice, &[MemberTags { id: "d1".into(), tags: vec![] }])
            .await
            .unwrap();

        let outcome = waiter().wait(&mock, &created.into()).await;
        assert_eq!(outcome, TaskOutcome::Failure("Tag limit reached".to_string()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_is_a_failure_not_an_error() {
        let mock = MockControllerClient::new("https://mock");
        mock.set_task_polls(u32::MAX);
        let created = mock.update_member_tags(MemberType::NetworkDevice, &[]).await.unwrap();

        let outcome = waiter().wait(&mock, &created.into()).await;
        match outcome {
            TaskOutcome::Failure(reason) => assert!(reason.contains("did not complete within 20 seconds")),
            TaskOutcome::Success => panic!("expected timeout"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_unknown_task_is_a_failure() {
        let mock = MockControllerClient::new("https://mock");
        let outcome = waiter().wait(&mock, &AsyncHandle::Task("missing".into())).await;
        assert!(matches!(outcome, TaskOutcome::Failure(_)));
    }
}
