//! Workflow engine error types.
//!
//! Every failure the engine can observe falls into one of six classes. The
//! class decides whether the run stops (`is_fatal`) or the affected item is
//! recorded in a `not_*` bucket and the run continues.

use controller_client::ApiError;
use thiserror::Error;

/// Errors that can occur while reconciling a workflow.
#[derive(Debug, Error)]
pub enum WorkflowError {
    /// Schema, format, range or interdependent-constraint violation
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Controller release is older than the workflow supports
    #[error("The {workflow} workflow requires Controller {required} or later, found {found}")]
    UnsupportedVersion {
        workflow: &'static str,
        required: String,
        found: String,
    },

    /// A handle did not resolve to a Controller entity
    #[error("{0}")]
    HandleNotFound(String),

    /// An immutable field would change or a cardinality ceiling would be exceeded
    #[error("Precondition violated: {0}")]
    PreconditionViolation(String),

    /// A Controller task finished with FAILURE or timed out
    #[error("Task failed: {0}")]
    TaskFailure(String),

    /// Controller API error
    #[error("Controller error: {0}")]
    Transport(#[from] ApiError),
}

impl WorkflowError {
    /// Whether this error fails the run.
    ///
    /// Resolver misses and task failures only affect the item they belong to.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, WorkflowError::HandleNotFound(_) | WorkflowError::TaskFailure(_))
    }

    /// Reason text for an outcome record
    pub fn reason(&self) -> String {
        match self {
            WorkflowError::HandleNotFound(reason) | WorkflowError::TaskFailure(reason) => reason.clone(),
            other => other.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_classification() {
        assert!(WorkflowError::InvalidInput("x".into()).is_fatal());
        assert!(WorkflowError::PreconditionViolation("x".into()).is_fatal());
        assert!(WorkflowError::Transport(ApiError::Api("boom".into())).is_fatal());
        assert!(!WorkflowError::HandleNotFound("Device doesn't exist in Controller".into()).is_fatal());
        assert!(!WorkflowError::TaskFailure("x".into()).is_fatal());
    }

    #[test]
    fn test_soft_miss_reason_is_bare() {
        let err = WorkflowError::HandleNotFound("Device doesn't exist in Controller".into());
        assert_eq!(err.reason(), "Device doesn't exist in Controller");
    }
}
