//! Guided navigation through a workflow.
//!
//! The controller is stateless: every operation takes the `Workflow` and the
//! session's `NavigationCursor` explicitly. Each mutation validates first and
//! only then applies, so a rejected call leaves both untouched.

use crate::dependency::{DependencyResolver, Resolution};
use crate::gating::PillarGate;
use dayflow_core::{
    NavigationCursor, NavigationState, TaskId, TaskStatus, Workflow, WorkflowError,
    WorkflowProgress, WorkflowStatus,
};
use dayflow_progress::ProgressAggregator;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// One task status change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskChange {
    /// Task
    pub task_id: TaskId,
    /// Status before
    pub from: TaskStatus,
    /// Status after
    pub to: TaskStatus,
}

/// A workflow status change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowChange {
    /// Status before
    pub from: WorkflowStatus,
    /// Status after
    pub to: WorkflowStatus,
}

/// Everything a mutation changed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Changeset {
    /// Task status changes, in the order applied
    pub task_changes: Vec<TaskChange>,
    /// Workflow status change, if any
    pub workflow_change: Option<WorkflowChange>,
    /// Tasks that became ready
    pub unlocked: Vec<TaskId>,
    /// Progress after the change
    pub progress: WorkflowProgress,
}

impl Changeset {
    /// Whether nothing changed.
    pub fn is_empty(&self) -> bool {
        self.task_changes.is_empty() && self.workflow_change.is_none()
    }
}

/// Computes navigation and applies lifecycle transitions.
#[derive(Debug, Clone, Copy, Default)]
pub struct NavigationController {
    resolver: DependencyResolver,
    gate: PillarGate,
    aggregator: ProgressAggregator,
}

impl NavigationController {
    /// Create a new controller.
    pub fn new() -> Self {
        Self::default()
    }

    /// Dependency classification of the workflow's tasks.
    pub fn resolve(&self, workflow: &Workflow) -> Resolution {
        self.resolver.resolve(&workflow.tasks)
    }

    /// Ready tasks whose pillar is unlocked.
    pub fn eligible_tasks(&self, workflow: &Workflow) -> Vec<TaskId> {
        self.resolve(workflow)
            .ready
            .into_iter()
            .filter(|id| {
                workflow
                    .task(id)
                    .map(|t| self.gate.is_unlocked(workflow, &t.pillar_id))
                    .unwrap_or(false)
            })
            .collect()
    }

    /// Current progress.
    pub fn progress(&self, workflow: &Workflow) -> WorkflowProgress {
        self.aggregator.compute(workflow)
    }

    /// Navigation projection.
    pub fn state(&self, workflow: &Workflow, cursor: &NavigationCursor) -> NavigationState {
        let resolution = self.resolve(workflow);
        let next = self.next_candidate(workflow, cursor, &resolution);

        let can_go_forward = next
            .map(|i| self.gate.is_unlocked(workflow, &workflow.tasks[i].pillar_id))
            .unwrap_or(false);

        NavigationState {
            current_task: cursor.current.clone(),
            next_task: next.map(|i| workflow.tasks[i].id.clone()),
            previous_task: cursor.previous().cloned(),
            can_go_back: !cursor.history.is_empty(),
            can_go_forward,
        }
    }

    /// Move the pointer to the next ready task ahead.
    pub fn move_to_next_task(
        &self,
        workflow: &Workflow,
        cursor: &mut NavigationCursor,
    ) -> Result<TaskId, WorkflowError> {
        let resolution = self.resolve(workflow);
        let index = self
            .next_candidate(workflow, cursor, &resolution)
            .ok_or(WorkflowError::NoTaskAhead)?;

        let target = &workflow.tasks[index];
        self.gate.check(workflow, &target.pillar_id)?;

        self.point_at(workflow, cursor, index);
        debug!(task = %target.id, pillar = %target.pillar_id, "Moved to next task");
        Ok(target.id.clone())
    }

    /// Pop the back-history into the pointer. Task statuses are not touched.
    pub fn move_to_previous_task(
        &self,
        workflow: &Workflow,
        cursor: &mut NavigationCursor,
    ) -> Result<TaskId, WorkflowError> {
        let previous = cursor.previous().cloned().ok_or(WorkflowError::NoHistory)?;
        let index = workflow
            .position(&previous)
            .ok_or_else(|| WorkflowError::TaskNotFound(previous.clone()))?;

        cursor.history.pop();
        cursor.point_at(previous.clone(), index);
        debug!(task = %previous, "Moved back");
        Ok(previous)
    }

    /// pending → in_progress, pointing the cursor at the task.
    ///
    /// The task must be enabled, ready and in an unlocked pillar.
    pub fn start_task(
        &self,
        workflow: &mut Workflow,
        cursor: &mut NavigationCursor,
        id: &TaskId,
    ) -> Result<Changeset, WorkflowError> {
        let index = workflow
            .position(id)
            .ok_or_else(|| WorkflowError::TaskNotFound(id.clone()))?;
        let task = &workflow.tasks[index];

        if !task.enabled {
            return Err(WorkflowError::invalid_transition(id, "disabled", TaskStatus::InProgress));
        }
        if task.status != TaskStatus::Pending {
            return Err(WorkflowError::invalid_transition(id, task.status, TaskStatus::InProgress));
        }
        if !self.resolve(workflow).is_ready(id) {
            return Err(WorkflowError::invalid_transition(id, "blocked", TaskStatus::InProgress));
        }
        self.gate.check(workflow, &task.pillar_id)?;

        workflow.tasks[index].status = TaskStatus::InProgress;
        let workflow_change = self.advance_workflow(workflow, WorkflowStatus::InProgress);
        self.point_at(workflow, cursor, index);

        info!(task = %id, "Task started");

        Ok(Changeset {
            task_changes: vec![TaskChange {
                task_id: id.clone(),
                from: TaskStatus::Pending,
                to: TaskStatus::InProgress,
            }],
            workflow_change,
            unlocked: Vec::new(),
            progress: self.aggregator.compute(workflow),
        })
    }

    /// Mark a pending or in-progress task completed.
    pub fn complete_task(
        &self,
        workflow: &mut Workflow,
        cursor: &mut NavigationCursor,
        id: &TaskId,
    ) -> Result<Changeset, WorkflowError> {
        self.resolve_task(workflow, cursor, id, TaskStatus::Completed)
    }

    /// Mark a pending or in-progress task skipped.
    ///
    /// Skipping satisfies dependents exactly like completion.
    pub fn skip_task(
        &self,
        workflow: &mut Workflow,
        cursor: &mut NavigationCursor,
        id: &TaskId,
    ) -> Result<Changeset, WorkflowError> {
        self.resolve_task(workflow, cursor, id, TaskStatus::Skipped)
    }

    /// not_started → in_progress. A no-op when already in progress.
    pub fn start_workflow(&self, workflow: &mut Workflow) -> Result<Option<WorkflowChange>, WorkflowError> {
        match workflow.status {
            WorkflowStatus::NotStarted => {
                workflow.status = WorkflowStatus::InProgress;
                info!(workflow = %workflow.id, "Workflow started");
                Ok(Some(WorkflowChange {
                    from: WorkflowStatus::NotStarted,
                    to: WorkflowStatus::InProgress,
                }))
            }
            WorkflowStatus::InProgress => Ok(None),
            WorkflowStatus::Completed => Err(WorkflowError::invalid_transition(
                &workflow.id,
                WorkflowStatus::Completed,
                WorkflowStatus::InProgress,
            )),
        }
    }

    fn resolve_task(
        &self,
        workflow: &mut Workflow,
        cursor: &mut NavigationCursor,
        id: &TaskId,
        to: TaskStatus,
    ) -> Result<Changeset, WorkflowError> {
        let index = workflow
            .position(id)
            .ok_or_else(|| WorkflowError::TaskNotFound(id.clone()))?;
        let task = &workflow.tasks[index];

        if !task.enabled {
            return Err(WorkflowError::invalid_transition(id, "disabled", to));
        }
        let from = task.status;
        if !from.can_transition_to(to) {
            return Err(WorkflowError::invalid_transition(id, from, to));
        }

        let before = self.resolve(workflow);
        workflow.tasks[index].status = to;
        let unlocked = self.resolve(workflow).newly_ready(&before);

        cursor.release(id);

        let progress = self.aggregator.compute(workflow);
        let workflow_change = if progress.is_complete() {
            self.advance_workflow(workflow, WorkflowStatus::Completed)
        } else {
            None
        };

        info!(
            task = %id,
            status = %to,
            percentage = progress.completion_percentage,
            unlocked = unlocked.len(),
            "Task resolved"
        );

        Ok(Changeset {
            task_changes: vec![TaskChange {
                task_id: id.clone(),
                from,
                to,
            }],
            workflow_change,
            unlocked,
            progress,
        })
    }

    /// System-driven forward move of the workflow status; never regresses.
    fn advance_workflow(&self, workflow: &mut Workflow, to: WorkflowStatus) -> Option<WorkflowChange> {
        let from = workflow.status;
        if !from.can_transition_to(to) {
            return None;
        }
        workflow.status = to;
        info!(workflow = %workflow.id, from = %from, to = %to, "Workflow status advanced");
        Some(WorkflowChange { from, to })
    }

    /// First ready task strictly after the anchor, or from the start when
    /// there is no anchor.
    fn next_candidate(
        &self,
        workflow: &Workflow,
        cursor: &NavigationCursor,
        resolution: &Resolution,
    ) -> Option<usize> {
        let start = cursor.anchor.map(|a| a + 1).unwrap_or(0);
        workflow
            .tasks
            .iter()
            .enumerate()
            .skip(start)
            .find(|(_, t)| resolution.is_ready(&t.id))
            .map(|(i, _)| i)
    }

    /// Move the pointer to `index`, keeping history within a pillar and
    /// dropping it on a pillar switch.
    fn point_at(&self, workflow: &Workflow, cursor: &mut NavigationCursor, index: usize) {
        let target = &workflow.tasks[index];
        let same_pillar = cursor
            .anchor
            .and_then(|a| workflow.tasks.get(a))
            .map(|t| t.pillar_id == target.pillar_id)
            .unwrap_or(false);

        if !same_pillar {
            cursor.history.clear();
        } else if let Some(outgoing) = cursor.current.take() {
            if outgoing != target.id {
                cursor.history.push(outgoing);
            }
        }

        cursor.point_at(target.id.clone(), index);
    }
}
