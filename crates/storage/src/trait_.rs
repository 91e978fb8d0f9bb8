//! Persistence service abstraction.

use async_trait::async_trait;
use chrono::NaiveDate;
use dayflow_core::{OwnerId, ReceiptId, TaskId, TaskStatus, Time, Workflow, WorkflowError, WorkflowId, WorkflowStatus};
use serde::{Deserialize, Serialize};

/// Error type for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;

/// Errors that can occur during storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Building the workflow failed
    #[error(transparent)]
    Workflow(#[from] WorkflowError),

    /// Item not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl From<StorageError> for WorkflowError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Workflow(e) => e,
            other => WorkflowError::TransportFailure(other.to_string()),
        }
    }
}

/// Acknowledgement of an accepted write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ack {
    /// Receipt for the write
    pub receipt: ReceiptId,

    /// When the write was accepted
    pub persisted_at: Time,
}

impl Ack {
    /// Fresh acknowledgement stamped now.
    pub fn now() -> Self {
        Self {
            receipt: ReceiptId::new(),
            persisted_at: chrono::Utc::now(),
        }
    }
}

/// Persistence/transport service behind the workflow store.
///
/// Any error means the write did not happen; callers roll back.
#[async_trait]
pub trait WorkflowService: Send + Sync {
    /// Return the owner's workflow for `date`, building it on first request.
    async fn build_workflow(&self, owner: &OwnerId, date: NaiveDate) -> Result<Workflow>;

    /// Record a task status.
    async fn persist_task_status(
        &self,
        workflow: &WorkflowId,
        task: &TaskId,
        status: TaskStatus,
    ) -> Result<Ack>;

    /// Record the workflow status.
    async fn persist_workflow_status(&self, workflow: &WorkflowId, status: WorkflowStatus) -> Result<Ack>;

    /// Load a workflow by id.
    async fn load_workflow(&self, id: &WorkflowId) -> Result<Option<Workflow>>;
}
