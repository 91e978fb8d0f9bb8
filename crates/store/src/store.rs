//! The workflow store.

use crate::guard::InFlightGuard;
use chrono::NaiveDate;
use dayflow_core::{
    NavigationCursor, NavigationState, OwnerId, PillarProgress, TaskId, TaskStatus, Time, Workflow,
    WorkflowError, WorkflowId, WorkflowProgress, WorkflowStatus,
};
use dayflow_execution::{Changeset, NavigationController, Resolution, WorkflowChange};
use dayflow_progress::{CompletionEstimator, ProgressAggregator, TimeEstimation};
use dayflow_storage::{Ack, WorkflowService};
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, WorkflowError>;

/// Store configuration.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Upper bound on each persistence call
    pub persist_timeout: Duration,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            persist_timeout: Duration::from_secs(10),
        }
    }
}

impl StoreConfig {
    /// Set the persistence timeout.
    pub fn with_persist_timeout(mut self, timeout: Duration) -> Self {
        self.persist_timeout = timeout;
        self
    }
}

#[derive(Debug, Clone)]
struct Session {
    workflow: Workflow,
    cursor: NavigationCursor,
}

/// One status write the store owes the persistence service.
#[derive(Debug, Clone)]
enum StatusWrite {
    Task { id: TaskId, from: TaskStatus, to: TaskStatus },
    Workflow { from: WorkflowStatus, to: WorkflowStatus },
}

impl StatusWrite {
    fn from_changeset(changes: &Changeset) -> Vec<Self> {
        let mut writes: Vec<Self> = changes
            .task_changes
            .iter()
            .map(|c| Self::Task {
                id: c.task_id.clone(),
                from: c.from,
                to: c.to,
            })
            .collect();
        writes.extend(changes.workflow_change.map(Self::from_workflow_change));
        writes
    }

    fn from_workflow_change(change: WorkflowChange) -> Self {
        Self::Workflow {
            from: change.from,
            to: change.to,
        }
    }

    /// The write that puts the previous value back.
    fn reverted(&self) -> Self {
        match self {
            Self::Task { id, from, to } => Self::Task {
                id: id.clone(),
                from: *to,
                to: *from,
            },
            Self::Workflow { from, to } => Self::Workflow { from: *to, to: *from },
        }
    }
}

/// Acknowledged writes of a call still in flight.
///
/// Dropped while armed, which only happens when the call's future is
/// cancelled mid-persist, it reverts those writes on a spawned task.
struct AckedWrites<S: WorkflowService + 'static> {
    service: Arc<S>,
    workflow: WorkflowId,
    timeout: Duration,
    writes: Vec<StatusWrite>,
    armed: bool,
}

impl<S: WorkflowService + 'static> AckedWrites<S> {
    fn new(service: Arc<S>, workflow: WorkflowId, timeout: Duration) -> Self {
        Self {
            service,
            workflow,
            timeout,
            writes: Vec::new(),
            armed: true,
        }
    }

    fn push(&mut self, write: StatusWrite) {
        self.writes.push(write);
    }

    /// Hand the writes back to the caller; dropping no longer reverts them.
    fn disarm(mut self) -> Vec<StatusWrite> {
        self.armed = false;
        std::mem::take(&mut self.writes)
    }
}

impl<S: WorkflowService + 'static> Drop for AckedWrites<S> {
    fn drop(&mut self) {
        if !self.armed || self.writes.is_empty() {
            return;
        }
        let writes = std::mem::take(&mut self.writes);
        warn!(workflow = %self.workflow, acked = writes.len(), "Call cancelled mid-persist, reverting");
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let service = self.service.clone();
                let workflow = self.workflow.clone();
                let timeout = self.timeout;
                handle.spawn(async move { revert(service.as_ref(), &workflow, &writes, timeout).await });
            }
            Err(_) => error!(workflow = %self.workflow, "No runtime to revert acknowledged writes"),
        }
    }
}

/// Owns the live workflow and cursor for one owner's session.
///
/// Every operation that changes state first takes the in-flight guard; a
/// call that finds it held fails with [`WorkflowError::Busy`]. Mutations are
/// staged on a copy of the session and persisted change by change; the copy
/// replaces the live session only once every write is acknowledged, so
/// readers never observe unpersisted state. If any write fails or times out,
/// writes that were already acknowledged are reverted on a best-effort basis
/// and the call fails with [`WorkflowError::TransportFailure`]. A call whose
/// future is dropped mid-persist leaves the live session untouched and
/// reverts its acknowledged writes in the background.
pub struct WorkflowStore<S: WorkflowService + 'static> {
    service: Arc<S>,
    session: RwLock<Option<Session>>,
    in_flight: AtomicBool,
    controller: NavigationController,
    aggregator: ProgressAggregator,
    config: StoreConfig,
}

impl<S: WorkflowService + 'static> WorkflowStore<S> {
    /// Create a store with default configuration.
    pub fn new(service: Arc<S>) -> Self {
        Self::with_config(service, StoreConfig::default())
    }

    /// Create a store with explicit configuration.
    pub fn with_config(service: Arc<S>, config: StoreConfig) -> Self {
        Self {
            service,
            session: RwLock::new(None),
            in_flight: AtomicBool::new(false),
            controller: NavigationController::new(),
            aggregator: ProgressAggregator::new(),
            config,
        }
    }

    /// The persistence service behind this store.
    pub fn service(&self) -> &Arc<S> {
        &self.service
    }

    /// Whether a call currently holds the in-flight guard.
    pub fn is_busy(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Load or build the owner's workflow for `date` and make it the live
    /// session with a fresh cursor.
    pub async fn open(&self, owner: &OwnerId, date: NaiveDate) -> Result<Workflow> {
        let _guard = InFlightGuard::acquire(&self.in_flight)?;

        let workflow = bounded(
            "build_workflow",
            self.service.build_workflow(owner, date),
            self.config.persist_timeout,
        )
        .await?;

        info!(workflow = %workflow.id, tasks = workflow.tasks.len(), status = %workflow.status, "Workflow opened");

        *self.session.write().await = Some(Session {
            workflow: workflow.clone(),
            cursor: NavigationCursor::new(),
        });
        Ok(workflow)
    }

    /// Put back a cursor saved by an earlier session.
    ///
    /// Ids the workflow does not know are dropped and positions re-derived.
    pub async fn restore_cursor(&self, cursor: NavigationCursor) -> Result<()> {
        let _guard = InFlightGuard::acquire(&self.in_flight)?;
        let mut session = self.session.write().await;
        let session = session.as_mut().ok_or(WorkflowError::NoWorkflow)?;
        let workflow = &session.workflow;

        let mut restored = NavigationCursor::new();
        restored.anchor = cursor.anchor.filter(|&a| a < workflow.tasks.len());
        if let Some(current) = cursor.current {
            match workflow.position(&current) {
                Some(index) => restored.point_at(current, index),
                None => warn!(task = %current, "Dropping unknown task from saved cursor"),
            }
        }
        let before = cursor.history.len();
        restored.history = cursor
            .history
            .into_iter()
            .filter(|id| workflow.position(id).is_some())
            .collect();
        if restored.history.len() != before {
            warn!(dropped = before - restored.history.len(), "Dropped unknown tasks from saved history");
        }

        session.cursor = restored;
        Ok(())
    }

    /// not_started → in_progress. Returns `None` when already in progress.
    pub async fn start_workflow(&self) -> Result<Option<WorkflowChange>> {
        self.apply("start_workflow", |controller, workflow, _| {
            let change = controller.start_workflow(workflow)?;
            let writes = change.into_iter().map(StatusWrite::from_workflow_change).collect();
            Ok((change, writes))
        })
        .await
    }

    /// Start a ready task and point the cursor at it.
    pub async fn start_task(&self, id: &TaskId) -> Result<Changeset> {
        self.apply("start_task", |controller, workflow, cursor| {
            let changes = controller.start_task(workflow, cursor, id)?;
            let writes = StatusWrite::from_changeset(&changes);
            Ok((changes, writes))
        })
        .await
    }

    /// Mark a task completed.
    pub async fn complete_task(&self, id: &TaskId) -> Result<Changeset> {
        self.apply("complete_task", |controller, workflow, cursor| {
            let changes = controller.complete_task(workflow, cursor, id)?;
            let writes = StatusWrite::from_changeset(&changes);
            Ok((changes, writes))
        })
        .await
    }

    /// Mark a task skipped.
    pub async fn skip_task(&self, id: &TaskId) -> Result<Changeset> {
        self.apply("skip_task", |controller, workflow, cursor| {
            let changes = controller.skip_task(workflow, cursor, id)?;
            let writes = StatusWrite::from_changeset(&changes);
            Ok((changes, writes))
        })
        .await
    }

    /// Move the pointer to the next ready task ahead.
    pub async fn move_to_next_task(&self) -> Result<TaskId> {
        self.navigate(|controller, workflow, cursor| controller.move_to_next_task(workflow, cursor))
            .await
    }

    /// Step back through the history.
    pub async fn move_to_previous_task(&self) -> Result<TaskId> {
        self.navigate(|controller, workflow, cursor| controller.move_to_previous_task(workflow, cursor))
            .await
    }

    /// Snapshot of the live workflow.
    pub async fn workflow(&self) -> Result<Workflow> {
        self.read(|s| s.workflow.clone()).await
    }

    /// Snapshot of the cursor.
    pub async fn cursor(&self) -> Result<NavigationCursor> {
        self.read(|s| s.cursor.clone()).await
    }

    /// Current/next/previous projection.
    pub async fn navigation_state(&self) -> Result<NavigationState> {
        self.read(|s| self.controller.state(&s.workflow, &s.cursor)).await
    }

    /// Workflow-wide progress.
    pub async fn progress(&self) -> Result<WorkflowProgress> {
        self.read(|s| self.aggregator.compute(&s.workflow)).await
    }

    /// Progress per pillar, display order.
    pub async fn pillar_progress(&self) -> Result<Vec<PillarProgress>> {
        self.read(|s| self.aggregator.pillar_progress(&s.workflow)).await
    }

    /// Ready/blocked classification.
    pub async fn resolution(&self) -> Result<Resolution> {
        self.read(|s| self.controller.resolve(&s.workflow)).await
    }

    /// Ready tasks whose pillar is unlocked.
    pub async fn eligible_tasks(&self) -> Result<Vec<TaskId>> {
        self.read(|s| self.controller.eligible_tasks(&s.workflow)).await
    }

    /// Remaining time from `now`.
    pub async fn estimate(&self, now: Time) -> Result<TimeEstimation> {
        self.read(|s| CompletionEstimator.estimate(&s.workflow, now)).await
    }

    async fn read<T>(&self, f: impl FnOnce(&Session) -> T) -> Result<T> {
        let session = self.session.read().await;
        session.as_ref().map(f).ok_or(WorkflowError::NoWorkflow)
    }

    /// Cursor-only moves; nothing to persist.
    async fn navigate<F>(&self, f: F) -> Result<TaskId>
    where
        F: FnOnce(&NavigationController, &Workflow, &mut NavigationCursor) -> Result<TaskId> + Send,
    {
        let _guard = InFlightGuard::acquire(&self.in_flight)?;
        let mut session = self.session.write().await;
        let session = session.as_mut().ok_or(WorkflowError::NoWorkflow)?;
        f(&self.controller, &session.workflow, &mut session.cursor)
    }

    /// Two-phase apply: stage the mutation on a copy of the session,
    /// persist every resulting write, and commit the copy only when all of
    /// them are acknowledged.
    async fn apply<T, F>(&self, op: &'static str, mutate: F) -> Result<T>
    where
        T: Send,
        F: FnOnce(&NavigationController, &mut Workflow, &mut NavigationCursor) -> Result<(T, Vec<StatusWrite>)>
            + Send,
    {
        let _guard = InFlightGuard::acquire(&self.in_flight)?;

        let mut staged = self.read(Session::clone).await?;
        let (output, writes) = mutate(&self.controller, &mut staged.workflow, &mut staged.cursor)?;
        let workflow_id = staged.workflow.id.clone();

        let timeout = self.config.persist_timeout;
        let mut acked = AckedWrites::new(self.service.clone(), workflow_id.clone(), timeout);
        for write in writes {
            match persist(self.service.as_ref(), &workflow_id, &write, timeout).await {
                Ok(ack) => {
                    debug!(op, receipt = %ack.receipt, write = ?write, "Write acknowledged");
                    acked.push(write);
                }
                Err(err) => {
                    warn!(op, workflow = %workflow_id, error = %err, "Persist failed, rolling back");
                    let acked = acked.disarm();
                    revert(self.service.as_ref(), &workflow_id, &acked, timeout).await;
                    return Err(match err {
                        WorkflowError::TransportFailure(msg) => WorkflowError::TransportFailure(msg),
                        other => WorkflowError::TransportFailure(other.to_string()),
                    });
                }
            }
        }

        let mut session = self.session.write().await;
        *session = Some(staged);
        acked.disarm();
        Ok(output)
    }
}

/// Revert acknowledged writes, newest first.
async fn revert<S: WorkflowService>(service: &S, workflow: &WorkflowId, acked: &[StatusWrite], timeout: Duration) {
    for write in acked.iter().rev() {
        let undo = write.reverted();
        match persist(service, workflow, &undo, timeout).await {
            Ok(_) => debug!(write = ?undo, "Compensating write acknowledged"),
            Err(err) => error!(workflow = %workflow, write = ?undo, error = %err, "Compensating write failed"),
        }
    }
}

async fn persist<S: WorkflowService>(
    service: &S,
    workflow: &WorkflowId,
    write: &StatusWrite,
    timeout: Duration,
) -> Result<Ack> {
    match write {
        StatusWrite::Task { id, to, .. } => {
            bounded("persist_task_status", service.persist_task_status(workflow, id, *to), timeout).await
        }
        StatusWrite::Workflow { to, .. } => {
            bounded("persist_workflow_status", service.persist_workflow_status(workflow, *to), timeout).await
        }
    }
}

/// Run a service call under a timeout.
async fn bounded<T>(
    call: &'static str,
    fut: impl Future<Output = dayflow_storage::Result<T>>,
    timeout: Duration,
) -> Result<T> {
    match tokio::time::timeout(timeout, fut).await {
        Ok(result) => result.map_err(WorkflowError::from),
        Err(_) => Err(WorkflowError::TransportFailure(format!("{} timed out after {:?}", call, timeout))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use dayflow_core::{Pillar, PillarId};
    use dayflow_registry::{OwnerContext, TaskRegistry, TaskTemplate};
    use dayflow_storage::{MemoryStorage, StorageError};
    use std::sync::atomic::AtomicUsize;
    use tokio::sync::Semaphore;

    /// Pillar A = {a1, a2}, pillar B = {b1 depends on a1}.
    fn registry() -> TaskRegistry {
        TaskRegistry::new(
            vec![Pillar::new("a", "A", 1), Pillar::new("b", "B", 2)],
            vec![
                TaskTemplate::new("a1", "a", "First", 10),
                TaskTemplate::new("a2", "a", "Second", 20),
                TaskTemplate::new("b1", "b", "Third", 30).depends_on("a1"),
            ],
        )
        .unwrap()
    }

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 19).unwrap()
    }

    fn id(s: &str) -> TaskId {
        TaskId::new(s)
    }

    /// Memory storage that refuses its n-th write (zero-based), and can be
    /// made to wait on a gate before every write.
    struct FlakyService {
        inner: MemoryStorage,
        fail_on: Option<usize>,
        writes: AtomicUsize,
        gate: Option<Semaphore>,
    }

    impl FlakyService {
        fn new() -> Self {
            Self {
                inner: MemoryStorage::new(registry()),
                fail_on: None,
                writes: AtomicUsize::new(0),
                gate: None,
            }
        }

        fn failing_write(mut self, n: usize) -> Self {
            self.fail_on = Some(n);
            self
        }

        fn gated(mut self) -> Self {
            self.gate = Some(Semaphore::new(0));
            self
        }

        async fn admit(&self) -> dayflow_storage::Result<()> {
            if let Some(gate) = &self.gate {
                let permit = gate.acquire().await.map_err(|e| StorageError::Other(e.to_string()))?;
                permit.forget();
            }
            let n = self.writes.fetch_add(1, Ordering::SeqCst);
            if self.fail_on == Some(n) {
                return Err(StorageError::Other("connection reset".into()));
            }
            Ok(())
        }
    }

    #[async_trait]
    impl WorkflowService for FlakyService {
        async fn build_workflow(&self, owner: &OwnerId, date: NaiveDate) -> dayflow_storage::Result<Workflow> {
            self.inner.build_workflow(owner, date).await
        }

        async fn persist_task_status(
            &self,
            workflow: &WorkflowId,
            task: &TaskId,
            status: TaskStatus,
        ) -> dayflow_storage::Result<Ack> {
            self.admit().await?;
            self.inner.persist_task_status(workflow, task, status).await
        }

        async fn persist_workflow_status(
            &self,
            workflow: &WorkflowId,
            status: WorkflowStatus,
        ) -> dayflow_storage::Result<Ack> {
            self.admit().await?;
            self.inner.persist_workflow_status(workflow, status).await
        }

        async fn load_workflow(&self, id: &WorkflowId) -> dayflow_storage::Result<Option<Workflow>> {
            self.inner.load_workflow(id).await
        }
    }

    async fn open(service: FlakyService) -> WorkflowStore<FlakyService> {
        let store = WorkflowStore::new(Arc::new(service));
        store.open(&OwnerId::new("ada"), day()).await.unwrap();
        store
    }

    #[tokio::test]
    async fn test_no_workflow_before_open() {
        let store = WorkflowStore::new(Arc::new(FlakyService::new()));
        assert_eq!(store.progress().await.unwrap_err(), WorkflowError::NoWorkflow);
        assert_eq!(store.complete_task(&id("a1")).await.unwrap_err(), WorkflowError::NoWorkflow);
        assert!(!store.is_busy());
    }

    #[tokio::test]
    async fn test_happy_path_persists_every_change() {
        let store = open(FlakyService::new()).await;

        assert!(store.start_workflow().await.unwrap().is_some());
        assert_eq!(store.move_to_next_task().await.unwrap(), id("a1"));
        store.complete_task(&id("a1")).await.unwrap();
        let changes = store.skip_task(&id("a2")).await.unwrap();
        assert_eq!(changes.progress.completion_percentage, 67);

        assert_eq!(store.eligible_tasks().await.unwrap(), vec![id("b1")]);
        assert_eq!(store.move_to_next_task().await.unwrap(), id("b1"));
        let changes = store.complete_task(&id("b1")).await.unwrap();
        assert_eq!(changes.progress.completion_percentage, 100);
        assert_eq!(
            changes.workflow_change,
            Some(WorkflowChange {
                from: WorkflowStatus::InProgress,
                to: WorkflowStatus::Completed
            })
        );

        let live = store.workflow().await.unwrap();
        let stored = store.service().load_workflow(&live.id).await.unwrap().unwrap();
        assert_eq!(stored, live);
        assert_eq!(stored.status, WorkflowStatus::Completed);
    }

    #[tokio::test]
    async fn test_start_task_advances_workflow() {
        let store = open(FlakyService::new()).await;

        let changes = store.start_task(&id("a2")).await.unwrap();
        assert_eq!(changes.task_changes.len(), 1);
        assert!(changes.workflow_change.is_some());
        assert_eq!(store.cursor().await.unwrap().current, Some(id("a2")));

        let live = store.workflow().await.unwrap();
        let stored = store.service().load_workflow(&live.id).await.unwrap().unwrap();
        assert_eq!(stored.status, WorkflowStatus::InProgress);
        assert_eq!(stored.task(&id("a2")).unwrap().status, TaskStatus::InProgress);
    }

    #[tokio::test]
    async fn test_failed_persist_leaves_session_untouched() {
        let store = open(FlakyService::new().failing_write(0)).await;
        store.restore_cursor({
            let mut cursor = NavigationCursor::new();
            cursor.point_at(id("a1"), 0);
            cursor
        })
        .await
        .unwrap();

        let workflow_before = store.workflow().await.unwrap();
        let cursor_before = store.cursor().await.unwrap();

        let err = store.complete_task(&id("a1")).await.unwrap_err();
        assert!(matches!(err, WorkflowError::TransportFailure(_)));

        assert_eq!(store.workflow().await.unwrap(), workflow_before);
        assert_eq!(store.cursor().await.unwrap(), cursor_before);
        assert!(!store.is_busy());
    }

    #[tokio::test]
    async fn test_partial_failure_compensates_acked_writes() {
        // Task write is acked, workflow status write fails.
        let store = open(FlakyService::new().failing_write(1)).await;
        let before = store.workflow().await.unwrap();

        let err = store.start_task(&id("a1")).await.unwrap_err();
        assert!(matches!(err, WorkflowError::TransportFailure(_)));
        assert_eq!(store.workflow().await.unwrap(), before);
        assert_eq!(store.cursor().await.unwrap(), NavigationCursor::new());

        let stored = store.service().load_workflow(&before.id).await.unwrap().unwrap();
        assert_eq!(stored.task(&id("a1")).unwrap().status, TaskStatus::Pending);
        assert_eq!(stored.status, WorkflowStatus::NotStarted);
        assert_eq!(store.service().writes.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_validation_errors_skip_persistence() {
        let store = open(FlakyService::new().failing_write(0)).await;
        let err = store.start_task(&id("b1")).await.unwrap_err();
        assert!(matches!(err, WorkflowError::InvalidTransition { .. }));

        let err = store.complete_task(&id("ghost")).await.unwrap_err();
        assert_eq!(err, WorkflowError::TaskNotFound(id("ghost")));
        assert_eq!(store.service().writes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_concurrent_call_is_busy() {
        let store = Arc::new(open(FlakyService::new().gated()).await);

        let first = {
            let store = store.clone();
            tokio::spawn(async move { store.complete_task(&TaskId::new("a1")).await })
        };
        while !store.is_busy() {
            tokio::task::yield_now().await;
        }

        assert_eq!(store.skip_task(&id("a2")).await.unwrap_err(), WorkflowError::Busy);
        assert_eq!(store.move_to_next_task().await.unwrap_err(), WorkflowError::Busy);

        if let Some(gate) = &store.service().gate {
            gate.add_permits(1);
        }
        first.await.unwrap().unwrap();

        assert!(!store.is_busy());
        let live = store.workflow().await.unwrap();
        assert_eq!(live.task(&id("a1")).unwrap().status, TaskStatus::Completed);
        assert_eq!(live.task(&id("a2")).unwrap().status, TaskStatus::Pending);
    }

    #[tokio::test]
    async fn test_timeout_is_transport_failure() {
        let service = Arc::new(FlakyService::new().gated());
        let store = WorkflowStore::with_config(
            service,
            StoreConfig::default().with_persist_timeout(Duration::from_millis(20)),
        );
        store.open(&OwnerId::new("ada"), day()).await.unwrap();
        let before = store.workflow().await.unwrap();

        let err = store.skip_task(&id("a1")).await.unwrap_err();
        assert!(matches!(err, WorkflowError::TransportFailure(msg) if msg.contains("timed out")));
        assert_eq!(store.workflow().await.unwrap(), before);
    }

    #[tokio::test]
    async fn test_cancelled_call_leaves_session_untouched() {
        let store = open(FlakyService::new().gated()).await;
        let before = store.workflow().await.unwrap();

        let cancelled = tokio::time::timeout(Duration::from_millis(20), store.complete_task(&id("a1"))).await;
        assert!(cancelled.is_err());

        assert!(!store.is_busy());
        assert_eq!(store.workflow().await.unwrap(), before);
        assert_eq!(store.workflow().await.unwrap().task(&id("a1")).unwrap().status, TaskStatus::Pending);

        if let Some(gate) = &store.service().gate {
            gate.add_permits(1);
        }
        store.complete_task(&id("a1")).await.unwrap();
        assert_eq!(store.workflow().await.unwrap().task(&id("a1")).unwrap().status, TaskStatus::Completed);
    }

    #[tokio::test]
    async fn test_cancelled_call_reverts_acked_writes() {
        let store = open(FlakyService::new().gated()).await;
        let workflow_id = store.workflow().await.unwrap().id;
        let gate = || store.service().gate.as_ref().unwrap();

        // The task write goes through, the workflow status write hangs.
        gate().add_permits(1);
        let cancelled = tokio::time::timeout(Duration::from_millis(20), store.start_task(&id("a1"))).await;
        assert!(cancelled.is_err());

        let live = store.workflow().await.unwrap();
        assert_eq!(live.task(&id("a1")).unwrap().status, TaskStatus::Pending);
        assert_eq!(live.status, WorkflowStatus::NotStarted);
        assert!(!store.is_busy());

        gate().add_permits(1);
        tokio::time::timeout(Duration::from_secs(1), async {
            loop {
                let stored = store.service().load_workflow(&workflow_id).await.unwrap().unwrap();
                if stored.task(&id("a1")).unwrap().status == TaskStatus::Pending {
                    break;
                }
                tokio::task::yield_now().await;
            }
        })
        .await
        .unwrap();
        assert_eq!(store.service().writes.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_start_completed_workflow_is_rejected() {
        let store = open(FlakyService::new()).await;
        for task in ["a1", "a2", "b1"] {
            store.complete_task(&id(task)).await.unwrap();
        }
        let before = store.workflow().await.unwrap();
        assert_eq!(before.status, WorkflowStatus::Completed);
        let writes = store.service().writes.load(Ordering::SeqCst);

        let err = store.start_workflow().await.unwrap_err();
        assert!(matches!(err, WorkflowError::InvalidTransition { .. }));
        assert_eq!(store.workflow().await.unwrap(), before);
        assert_eq!(store.service().writes.load(Ordering::SeqCst), writes);
        assert!(!store.is_busy());
    }

    #[tokio::test]
    async fn test_owner_disabled_dependency_does_not_block() {
        let owner = OwnerId::new("ada");
        let service = MemoryStorage::new(dayflow_registry::default_registry())
            .with_owner_context(OwnerContext::new(owner.clone()).disable_task("plan.keyword-research"));
        let store = WorkflowStore::new(Arc::new(service));
        store.open(&owner, day()).await.unwrap();

        let pick = id("plan.pick-topic");
        assert!(store.eligible_tasks().await.unwrap().contains(&pick));
        assert!(store.resolution().await.unwrap().is_ready(&pick));
        store.start_task(&pick).await.unwrap();
        assert_eq!(store.workflow().await.unwrap().task(&pick).unwrap().status, TaskStatus::InProgress);
    }

    #[tokio::test]
    async fn test_back_navigation_through_store() {
        let store = open(FlakyService::new()).await;

        let first = store.move_to_next_task().await.unwrap();
        store.move_to_next_task().await.unwrap();
        assert_eq!(store.move_to_previous_task().await.unwrap(), first);
        assert_eq!(store.navigation_state().await.unwrap().current_task, Some(first));
        assert_eq!(store.move_to_previous_task().await.unwrap_err(), WorkflowError::NoHistory);
    }

    #[tokio::test]
    async fn test_restore_cursor_drops_unknown_ids() {
        let store = open(FlakyService::new()).await;
        let mut saved = NavigationCursor::new();
        saved.point_at(id("gone"), 1);
        saved.history = vec![id("a1"), id("gone")];

        store.restore_cursor(saved).await.unwrap();
        let cursor = store.cursor().await.unwrap();
        assert_eq!(cursor.current, None);
        assert_eq!(cursor.anchor, Some(1));
        assert_eq!(cursor.history, vec![id("a1")]);
    }

    #[tokio::test]
    async fn test_projections() {
        let store = open(FlakyService::new()).await;
        store.complete_task(&id("a1")).await.unwrap();

        let pillars = store.pillar_progress().await.unwrap();
        assert_eq!(pillars[0].pillar_id, PillarId::new("a"));
        assert_eq!(pillars[0].percentage, 50);
        assert!(!pillars[1].unlocked);

        assert!(store.resolution().await.unwrap().is_ready(&id("b1")));
        let estimate = store.estimate(chrono::Utc::now()).await.unwrap();
        assert_eq!(estimate.remaining_minutes, 50);
    }
}
