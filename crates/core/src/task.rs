//! Task model - the unit of work in a daily workflow.

use serde::{Deserialize, Serialize};
use crate::id::{PillarId, TaskId};

/// A task inside a workflow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// Unique identifier within the workflow
    pub id: TaskId,

    /// Owning pillar
    pub pillar_id: PillarId,

    /// Task title
    pub title: String,

    /// Detailed description
    pub description: String,

    /// Lifecycle status
    pub status: TaskStatus,

    /// Priority hint for presentation
    pub priority: Priority,

    /// Estimated effort in minutes
    pub estimated_time_minutes: u32,

    /// Tasks that must be completed or skipped first
    #[serde(default)]
    pub depends_on: Vec<TaskId>,

    /// Disabled tasks stay pending forever
    pub enabled: bool,

    /// What the presentation layer does when the user acts on this task
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<TaskAction>,
}

impl Task {
    /// Whether the task still counts as open work.
    pub fn is_open(&self) -> bool {
        self.status.is_open()
    }

    /// Whether the task reached a terminal status.
    pub fn is_resolved(&self) -> bool {
        self.status.is_resolved()
    }
}

/// Task lifecycle status.
///
/// ```text
/// pending → in_progress → completed
///    │           └──────→ skipped
///    ├──────────────────→ completed
///    └──────────────────→ skipped
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Not started
    Pending,
    /// Being worked on
    InProgress,
    /// Done
    Completed,
    /// Opted out; satisfies dependents like completion
    Skipped,
}

impl TaskStatus {
    /// Pending or in progress.
    pub fn is_open(self) -> bool {
        matches!(self, TaskStatus::Pending | TaskStatus::InProgress)
    }

    /// Completed or skipped. Resolved tasks satisfy dependencies.
    pub fn is_resolved(self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Skipped)
    }

    /// Whether the lifecycle allows moving from `self` to `to`.
    pub fn can_transition_to(self, to: TaskStatus) -> bool {
        match (self, to) {
            (TaskStatus::Pending, TaskStatus::InProgress) => true,
            (TaskStatus::Pending | TaskStatus::InProgress, TaskStatus::Completed) => true,
            (TaskStatus::Pending | TaskStatus::InProgress, TaskStatus::Skipped) => true,
            _ => false,
        }
    }

    /// Lowercase name used in messages and on the wire.
    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Completed => "completed",
            TaskStatus::Skipped => "skipped",
        }
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Task priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    /// Nice to have
    Low,
    /// Default
    #[default]
    Medium,
    /// Do first
    High,
}

impl Priority {
    /// Lowercase name.
    pub fn as_str(self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
        }
    }
}

/// Opaque action reference attached to a task.
///
/// The engine records and exposes it; only the presentation layer resolves it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TaskAction {
    /// Navigate to a target (route, screen, url)
    Navigate {
        /// Where to go
        target: String,
    },

    /// Invoke an inline handler by id
    Invoke {
        /// Handler registered by the presentation layer
        handler_id: String,
    },
}

impl std::fmt::Display for TaskAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskAction::Navigate { target } => write!(f, "navigate:{}", target),
            TaskAction::Invoke { handler_id } => write!(f, "invoke:{}", handler_id),
        }
    }
}
