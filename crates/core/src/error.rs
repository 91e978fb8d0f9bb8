//! Error taxonomy for workflow operations.

use crate::id::{PillarId, TaskId, WorkflowId};

/// Result alias for workflow operations.
pub type Result<T> = std::result::Result<T, WorkflowError>;

/// Errors surfaced by workflow mutations and navigation.
///
/// Everything except `TransportFailure` is raised before any state changes.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WorkflowError {
    /// Unknown task
    #[error("task not found: {0}")]
    TaskNotFound(TaskId),

    /// Unknown workflow
    #[error("workflow not found: {0}")]
    WorkflowNotFound(WorkflowId),

    /// Forward navigation found no ready task ahead
    #[error("no ready task ahead")]
    NoTaskAhead,

    /// Status change violates the lifecycle
    #[error("invalid transition for {subject}: {from} -> {to}")]
    InvalidTransition {
        /// Task id or workflow id
        subject: String,
        /// Status before
        from: String,
        /// Requested status
        to: String,
    },

    /// Cross-pillar navigation while an earlier pillar is unfinished
    #[error("pillar {blocking} must be finished before entering {target}")]
    PillarIncomplete {
        /// Earliest unfinished pillar
        blocking: PillarId,
        /// Pillar navigation tried to enter
        target: PillarId,
    },

    /// Back-navigation with an empty history
    #[error("no navigation history")]
    NoHistory,

    /// Build produced no tasks
    #[error("registry produced no tasks")]
    EmptyRegistry,

    /// Persistence call failed; local state was rolled back
    #[error("transport failure: {0}")]
    TransportFailure(String),

    /// Another mutation is in flight
    #[error("another operation is in progress")]
    Busy,

    /// Store has no workflow loaded
    #[error("no workflow is open")]
    NoWorkflow,
}

impl WorkflowError {
    /// Shorthand for an invalid transition.
    pub fn invalid_transition(
        subject: impl std::fmt::Display,
        from: impl std::fmt::Display,
        to: impl std::fmt::Display,
    ) -> Self {
        Self::InvalidTransition {
            subject: subject.to_string(),
            from: from.to_string(),
            to: to.to_string(),
        }
    }

    /// Whether this is one of the not-found kinds.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::TaskNotFound(_) | Self::WorkflowNotFound(_) | Self::NoTaskAhead
        )
    }

    /// Actionable message for the user.
    pub fn hint(&self) -> &'static str {
        match self {
            Self::TaskNotFound(_) => "Check the task id; list tasks to see what is in today's workflow.",
            Self::WorkflowNotFound(_) => "Open today's workflow before acting on it.",
            Self::NoTaskAhead => "Nothing is ready ahead. Finish in-progress work or go back.",
            Self::InvalidTransition { .. } => "This task or workflow has already moved past that state.",
            Self::PillarIncomplete { .. } => "Complete or skip the remaining tasks to proceed.",
            Self::NoHistory => "You are at the start of this pillar; move forward instead.",
            Self::EmptyRegistry => "The task registry has no enabled tasks for this owner.",
            Self::TransportFailure(_) => "Saving failed and the change was undone. Try again.",
            Self::Busy => "Wait for the previous action to finish.",
            Self::NoWorkflow => "Open today's workflow first.",
        }
    }
}
