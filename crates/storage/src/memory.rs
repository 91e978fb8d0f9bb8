//! In-memory storage backend.

use std::collections::HashMap;
use chrono::NaiveDate;
use dayflow_core::{OwnerId, TaskId, TaskStatus, Workflow, WorkflowId, WorkflowStatus};
use dayflow_registry::{OwnerContext, TaskRegistry, WorkflowBuilder};
use super::{Ack, Result, StorageError, WorkflowService};
use tokio::sync::Mutex;
use tracing::debug;

/// Keeps workflows in a map. Nothing survives the process.
pub struct MemoryStorage {
    registry: TaskRegistry,
    owners: HashMap<OwnerId, OwnerContext>,
    workflows: Mutex<HashMap<WorkflowId, Workflow>>,
}

impl MemoryStorage {
    /// Create an empty store over a registry.
    pub fn new(registry: TaskRegistry) -> Self {
        Self {
            registry,
            owners: HashMap::new(),
            workflows: Mutex::new(HashMap::new()),
        }
    }

    /// Use a specific owner context when building that owner's workflows.
    pub fn with_owner_context(mut self, context: OwnerContext) -> Self {
        self.owners.insert(context.owner_id.clone(), context);
        self
    }

    /// Number of workflows held.
    pub async fn len(&self) -> usize {
        self.workflows.lock().await.len()
    }

    /// Whether no workflow has been built yet.
    pub async fn is_empty(&self) -> bool {
        self.workflows.lock().await.is_empty()
    }
}

#[async_trait::async_trait]
impl WorkflowService for MemoryStorage {
    async fn build_workflow(&self, owner: &OwnerId, date: NaiveDate) -> Result<Workflow> {
        let id = WorkflowId::for_day(owner, date);
        let mut workflows = self.workflows.lock().await;

        if let Some(existing) = workflows.get(&id) {
            return Ok(existing.clone());
        }

        let context = self
            .owners
            .get(owner)
            .cloned()
            .unwrap_or_else(|| OwnerContext::new(owner.clone()));
        let workflow = WorkflowBuilder::new(&self.registry).build(&context, date)?;
        workflows.insert(id, workflow.clone());
        Ok(workflow)
    }

    async fn persist_task_status(
        &self,
        workflow: &WorkflowId,
        task: &TaskId,
        status: TaskStatus,
    ) -> Result<Ack> {
        let mut workflows = self.workflows.lock().await;
        let wf = workflows
            .get_mut(workflow)
            .ok_or_else(|| StorageError::NotFound(format!("workflow {}", workflow)))?;
        let t = wf
            .task_mut(task)
            .ok_or_else(|| StorageError::NotFound(format!("task {}", task)))?;
        t.status = status;
        debug!(workflow = %workflow, task = %task, status = %status, "Persisted task status");
        Ok(Ack::now())
    }

    async fn persist_workflow_status(&self, workflow: &WorkflowId, status: WorkflowStatus) -> Result<Ack> {
        let mut workflows = self.workflows.lock().await;
        let wf = workflows
            .get_mut(workflow)
            .ok_or_else(|| StorageError::NotFound(format!("workflow {}", workflow)))?;
        wf.status = status;
        Ok(Ack::now())
    }

    async fn load_workflow(&self, id: &WorkflowId) -> Result<Option<Workflow>> {
        Ok(self.workflows.lock().await.get(id).cloned())
    }
}
