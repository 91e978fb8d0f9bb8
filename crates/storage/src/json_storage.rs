//! JSON file storage implementation.
//!
//! Stores one pretty-printed JSON document per workflow under
//! `<root>/workflows/`, plus navigation cursors under `<root>/sessions/` for
//! front ends that do not stay resident between calls.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use chrono::NaiveDate;
use dayflow_core::{
    NavigationCursor, OwnerId, TaskId, TaskStatus, Workflow, WorkflowId, WorkflowStatus,
};
use dayflow_registry::{OwnerContext, TaskRegistry, WorkflowBuilder};
use super::{Ack, Result, StorageError, WorkflowService};
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{debug, info};

/// File-based JSON storage backend.
pub struct JsonStorage {
    root: PathBuf,
    registry: TaskRegistry,
    owners: HashMap<OwnerId, OwnerContext>,
    // Serializes read-modify-write of workflow documents.
    write_lock: Mutex<()>,
}

impl JsonStorage {
    /// Create storage, creating the `workflows/` and `sessions/` directories.
    pub async fn new(root: impl AsRef<Path>, registry: TaskRegistry) -> Result<Self> {
        let root = root.as_ref().to_path_buf();

        fs::create_dir_all(root.join("workflows")).await?;
        fs::create_dir_all(root.join("sessions")).await?;

        Ok(Self {
            root,
            registry,
            owners: HashMap::new(),
            write_lock: Mutex::new(()),
        })
    }

    /// Use a specific owner context when building that owner's workflows.
    pub fn with_owner_context(mut self, context: OwnerContext) -> Self {
        self.owners.insert(context.owner_id.clone(), context);
        self
    }

    /// The registry workflows are built from.
    pub fn registry(&self) -> &TaskRegistry {
        &self.registry
    }

    fn workflow_path(&self, id: &WorkflowId) -> PathBuf {
        self.root.join("workflows").join(format!("{}.json", id.file_stem()))
    }

    fn session_path(&self, id: &WorkflowId) -> PathBuf {
        self.root.join("sessions").join(format!("{}.json", id.file_stem()))
    }

    /// All stored workflows, oldest day first.
    pub async fn list_workflows(&self) -> Result<Vec<Workflow>> {
        let mut workflows = list_dir(&self.root.join("workflows")).await?;
        workflows.sort_by(|a: &Workflow, b| a.date.cmp(&b.date).then_with(|| a.id.as_str().cmp(b.id.as_str())));
        Ok(workflows)
    }

    /// Saved navigation cursor for a workflow, or a fresh one.
    pub async fn load_cursor(&self, id: &WorkflowId) -> Result<NavigationCursor> {
        Ok(read_json(&self.session_path(id)).await?.unwrap_or_default())
    }

    /// Save the navigation cursor for a workflow.
    pub async fn save_cursor(&self, id: &WorkflowId, cursor: &NavigationCursor) -> Result<()> {
        write_json(&self.session_path(id), cursor).await
    }

    /// Read the workflow stored for `id`, refusing a document that belongs to
    /// another workflow.
    async fn read_workflow(&self, id: &WorkflowId) -> Result<Option<Workflow>> {
        let path = self.workflow_path(id);
        match read_json::<Workflow>(&path).await? {
            Some(workflow) if workflow.id != *id => Err(StorageError::Other(format!(
                "{} holds workflow {}, expected {}",
                path.display(),
                workflow.id,
                id
            ))),
            found => Ok(found),
        }
    }

    async fn update<F>(&self, id: &WorkflowId, apply: F) -> Result<Ack>
    where
        F: FnOnce(&mut Workflow) -> Result<()> + Send,
    {
        let _guard = self.write_lock.lock().await;
        let mut workflow = self
            .read_workflow(id)
            .await?
            .ok_or_else(|| StorageError::NotFound(format!("workflow {}", id)))?;
        apply(&mut workflow)?;
        write_json(&self.workflow_path(id), &workflow).await?;
        Ok(Ack::now())
    }
}

#[async_trait::async_trait]
impl WorkflowService for JsonStorage {
    async fn build_workflow(&self, owner: &OwnerId, date: NaiveDate) -> Result<Workflow> {
        let id = WorkflowId::for_day(owner, date);
        let _guard = self.write_lock.lock().await;
        let path = self.workflow_path(&id);

        if let Some(existing) = self.read_workflow(&id).await? {
            debug!(workflow = %id, "Reusing stored workflow");
            return Ok(existing);
        }

        let context = self
            .owners
            .get(owner)
            .cloned()
            .unwrap_or_else(|| OwnerContext::new(owner.clone()));
        let workflow = WorkflowBuilder::new(&self.registry).build(&context, date)?;
        write_json(&path, &workflow).await?;

        info!(workflow = %id, path = %path.display(), "Stored new workflow");
        Ok(workflow)
    }

    async fn persist_task_status(
        &self,
        workflow: &WorkflowId,
        task: &TaskId,
        status: TaskStatus,
    ) -> Result<Ack> {
        let ack = self
            .update(workflow, |wf| {
                let t = wf
                    .task_mut(task)
                    .ok_or_else(|| StorageError::NotFound(format!("task {}", task)))?;
                t.status = status;
                Ok(())
            })
            .await?;
        debug!(workflow = %workflow, task = %task, status = %status, "Persisted task status");
        Ok(ack)
    }

    async fn persist_workflow_status(&self, workflow: &WorkflowId, status: WorkflowStatus) -> Result<Ack> {
        let ack = self
            .update(workflow, |wf| {
                wf.status = status;
                Ok(())
            })
            .await?;
        debug!(workflow = %workflow, status = %status, "Persisted workflow status");
        Ok(ack)
    }

    async fn load_workflow(&self, id: &WorkflowId) -> Result<Option<Workflow>> {
        self.read_workflow(id).await
    }
}

async fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    match fs::read_to_string(path).await {
        Ok(json) => {
            let value = serde_json::from_str(&json)?;
            Ok(Some(value))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Write through a temp file and rename, so readers never see half a document.
async fn write_json<T: serde::Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, json.as_bytes()).await?;
    fs::rename(&tmp, path).await?;
    Ok(())
}

async fn list_dir<T: serde::de::DeserializeOwned>(dir: &Path) -> Result<Vec<T>> {
    let mut items = Vec::new();
    let mut rd = fs::read_dir(dir).await?;
    while let Some(entry) = rd.next_entry().await? {
        if entry.path().extension().and_then(|s| s.to_str()) != Some("json") {
            continue;
        }
        if let Ok(Some(item)) = read_json(&entry.path()).await {
            items.push(item);
        }
    }
    Ok(items)
}
