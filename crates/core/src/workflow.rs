//! Workflow model - one owner's dated set of tasks.

use serde::{Deserialize, Serialize};
use crate::id::{OwnerId, PillarId, TaskId, WorkflowId};
use crate::pillar::Pillar;
use crate::task::Task;
use crate::Time;

/// The complete, dated set of tasks and statuses for one owner.
///
/// Tasks are sorted by pillar display order, then registry order within a
/// pillar. Tasks are never added or removed after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Workflow {
    /// Unique identifier (`owner:date`)
    pub id: WorkflowId,

    /// Owner this workflow belongs to
    pub owner_id: OwnerId,

    /// Day the workflow covers
    pub date: chrono::NaiveDate,

    /// Creation timestamp
    pub created_at: Time,

    /// Pillars in display order
    pub pillars: Vec<Pillar>,

    /// Tasks in pillar-then-registry order
    pub tasks: Vec<Task>,

    /// Overall status
    pub status: WorkflowStatus,
}

impl Workflow {
    /// Look up a task.
    pub fn task(&self, id: &TaskId) -> Option<&Task> {
        self.tasks.iter().find(|t| &t.id == id)
    }

    /// Look up a task mutably.
    pub fn task_mut(&mut self, id: &TaskId) -> Option<&mut Task> {
        self.tasks.iter_mut().find(|t| &t.id == id)
    }

    /// Position of a task in the sequence.
    pub fn position(&self, id: &TaskId) -> Option<usize> {
        self.tasks.iter().position(|t| &t.id == id)
    }

    /// Look up a pillar.
    pub fn pillar(&self, id: &PillarId) -> Option<&Pillar> {
        self.pillars.iter().find(|p| &p.id == id)
    }

    /// Index of a pillar in display order.
    pub fn pillar_index(&self, id: &PillarId) -> Option<usize> {
        self.pillars.iter().position(|p| &p.id == id)
    }

    /// Tasks belonging to a pillar, in registry order.
    pub fn tasks_in_pillar<'a>(&'a self, id: &'a PillarId) -> impl Iterator<Item = &'a Task> + 'a {
        self.tasks.iter().filter(move |t| &t.pillar_id == id)
    }

    /// Whether every enabled task in the pillar is completed or skipped.
    ///
    /// Disabled tasks can never leave pending, so they do not hold a pillar open.
    pub fn are_all_tasks_completed(&self, pillar: &PillarId) -> bool {
        self.tasks_in_pillar(pillar)
            .filter(|t| t.enabled)
            .all(|t| t.is_resolved())
    }

    /// Whether every enabled task is completed or skipped.
    pub fn is_terminal(&self) -> bool {
        self.tasks.iter().filter(|t| t.enabled).all(|t| t.is_resolved())
    }
}

/// Overall workflow status. Transitions are monotonic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStatus {
    /// Built, nothing started
    NotStarted,
    /// Started by the owner
    InProgress,
    /// Every enabled task completed or skipped
    Completed,
}

impl WorkflowStatus {
    /// Whether moving from `self` to `to` keeps the status monotonic.
    pub fn can_transition_to(self, to: WorkflowStatus) -> bool {
        to > self
    }

    /// Lowercase name.
    pub fn as_str(self) -> &'static str {
        match self {
            WorkflowStatus::NotStarted => "not_started",
            WorkflowStatus::InProgress => "in_progress",
            WorkflowStatus::Completed => "completed",
        }
    }
}

impl std::fmt::Display for WorkflowStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
