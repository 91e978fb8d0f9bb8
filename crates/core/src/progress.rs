//! Derived projections read by the presentation layer.

use serde::{Deserialize, Serialize};
use crate::id::{PillarId, TaskId};

/// Workflow-wide progress. Always derived from task statuses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct WorkflowProgress {
    /// Enabled tasks completed or skipped
    pub completed_tasks: usize,

    /// Enabled tasks
    pub total_tasks: usize,

    /// Rounded percentage (0-100)
    pub completion_percentage: u8,

    /// Minutes estimated for completed tasks (skipped tasks excluded)
    pub actual_time_spent: u32,

    /// Minutes estimated for pending and in-progress tasks
    pub estimated_time_remaining: u32,
}

impl WorkflowProgress {
    /// Whether every enabled task is resolved.
    pub fn is_complete(&self) -> bool {
        self.total_tasks > 0 && self.completed_tasks == self.total_tasks
    }
}

/// Progress of a single pillar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PillarProgress {
    /// Pillar
    pub pillar_id: PillarId,

    /// Enabled tasks completed or skipped
    pub completed_tasks: usize,

    /// Enabled tasks
    pub total_tasks: usize,

    /// Rounded percentage (0-100)
    pub percentage: u8,

    /// Every enabled task resolved
    pub all_completed: bool,

    /// Every earlier pillar resolved
    pub unlocked: bool,
}

/// Navigation projection: where the owner is and where they can go.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NavigationState {
    /// Task under the pointer
    pub current_task: Option<TaskId>,

    /// Task `move_to_next_task` would select
    pub next_task: Option<TaskId>,

    /// Task `move_to_previous_task` would return to
    pub previous_task: Option<TaskId>,

    /// Back-history is non-empty
    pub can_go_back: bool,

    /// A ready task lies ahead and its pillar is unlocked
    pub can_go_forward: bool,
}
