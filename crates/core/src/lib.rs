//! Dayflow core data models.
//!
//! Pillars, tasks and workflows, the projections derived from them, and the
//! error taxonomy shared by every dayflow crate.

#![warn(missing_docs)]

// Identities
mod id;

// Workflow structure
mod pillar;
mod task;
mod workflow;

// Derived state
mod navigation;
mod progress;

mod error;

// Re-exports
pub use id::*;

pub use pillar::Pillar;
pub use task::{Priority, Task, TaskAction, TaskStatus};
pub use workflow::{Workflow, WorkflowStatus};

pub use navigation::NavigationCursor;
pub use progress::{NavigationState, PillarProgress, WorkflowProgress};

pub use error::{Result, WorkflowError};

/// Timestamp type
pub type Time = chrono::DateTime<chrono::Utc>;
