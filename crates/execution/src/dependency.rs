//! Dependency resolution for tasks.

use dayflow_core::{Task, TaskId, TaskStatus};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::warn;

/// A pending task still waiting on dependencies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockedTask {
    /// The blocked task
    pub task_id: TaskId,
    /// Dependencies not yet completed or skipped (missing ids included)
    pub waiting_on: Vec<TaskId>,
}

/// A task whose dependencies name ids outside the workflow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Inconsistency {
    /// Offending task
    pub task_id: TaskId,
    /// Ids not present in the workflow
    pub missing: Vec<TaskId>,
}

/// Ready/blocked classification of a task set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    /// Pending, enabled, every dependency resolved; sequence order
    pub ready: Vec<TaskId>,
    /// Pending with at least one unresolved dependency; sequence order
    pub blocked: Vec<BlockedTask>,
    /// Dependencies pointing outside the workflow
    pub inconsistencies: Vec<Inconsistency>,
}

impl Resolution {
    /// Whether a task is ready.
    pub fn is_ready(&self, id: &TaskId) -> bool {
        self.ready.contains(id)
    }

    /// Whether a task is blocked.
    pub fn is_blocked(&self, id: &TaskId) -> bool {
        self.blocked.iter().any(|b| &b.task_id == id)
    }

    /// What a blocked task waits on.
    pub fn waiting_on(&self, id: &TaskId) -> Option<&[TaskId]> {
        self.blocked
            .iter()
            .find(|b| &b.task_id == id)
            .map(|b| b.waiting_on.as_slice())
    }

    /// Tasks ready in `self` that were not ready in `before`.
    pub fn newly_ready(&self, before: &Resolution) -> Vec<TaskId> {
        let was: HashSet<&TaskId> = before.ready.iter().collect();
        self.ready.iter().filter(|id| !was.contains(id)).cloned().collect()
    }
}

/// Classifies tasks as ready or blocked.
///
/// Fails closed: a dependency on an id that is not in the task set keeps the
/// task blocked forever and is reported as an inconsistency. Cycles are ruled
/// out when the registry is built and are not checked here.
#[derive(Debug, Clone, Copy, Default)]
pub struct DependencyResolver;

impl DependencyResolver {
    /// Create a new resolver.
    pub fn new() -> Self {
        Self
    }

    /// Classify every pending task. One pass to index, one pass to classify.
    pub fn resolve(&self, tasks: &[Task]) -> Resolution {
        let status: HashMap<&TaskId, TaskStatus> = tasks.iter().map(|t| (&t.id, t.status)).collect();

        let mut resolution = Resolution::default();

        for task in tasks.iter().filter(|t| t.status == TaskStatus::Pending) {
            let mut waiting_on = Vec::new();
            let mut missing = Vec::new();

            for dep in &task.depends_on {
                match status.get(dep) {
                    Some(s) if s.is_resolved() => {}
                    Some(_) => waiting_on.push(dep.clone()),
                    None => {
                        waiting_on.push(dep.clone());
                        missing.push(dep.clone());
                    }
                }
            }

            if !missing.is_empty() {
                warn!(task = %task.id, missing = ?missing, "Task depends on ids outside the workflow");
                resolution.inconsistencies.push(Inconsistency {
                    task_id: task.id.clone(),
                    missing,
                });
            }

            if !waiting_on.is_empty() {
                resolution.blocked.push(BlockedTask {
                    task_id: task.id.clone(),
                    waiting_on,
                });
            } else if task.enabled {
                resolution.ready.push(task.id.clone());
            }
        }

        resolution
    }

    /// Tasks that list `id` in their dependencies.
    pub fn dependents_of(&self, tasks: &[Task], id: &TaskId) -> Vec<TaskId> {
        tasks
            .iter()
            .filter(|t| t.depends_on.contains(id))
            .map(|t| t.id.clone())
            .collect()
    }
}
