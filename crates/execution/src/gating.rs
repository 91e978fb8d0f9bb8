//! Pillar gating.

use dayflow_core::{PillarId, Workflow, WorkflowError};

/// Decides whether forward navigation may enter a pillar.
///
/// A pillar is unlocked when every earlier pillar has all of its enabled
/// tasks completed or skipped. The first pillar is always unlocked.
#[derive(Debug, Clone, Copy, Default)]
pub struct PillarGate;

impl PillarGate {
    /// Create a new gate.
    pub fn new() -> Self {
        Self
    }

    /// Earliest pillar before `target` that still has open work.
    pub fn first_incomplete_before(&self, workflow: &Workflow, target: &PillarId) -> Option<PillarId> {
        workflow
            .pillars
            .iter()
            .take_while(|p| &p.id != target)
            .find(|p| !workflow.are_all_tasks_completed(&p.id))
            .map(|p| p.id.clone())
    }

    /// Whether `target` is unlocked.
    pub fn is_unlocked(&self, workflow: &Workflow, target: &PillarId) -> bool {
        self.first_incomplete_before(workflow, target).is_none()
    }

    /// `Ok` when `target` is unlocked, `PillarIncomplete` otherwise.
    pub fn check(&self, workflow: &Workflow, target: &PillarId) -> Result<(), WorkflowError> {
        match self.first_incomplete_before(workflow, target) {
            None => Ok(()),
            Some(blocking) => Err(WorkflowError::PillarIncomplete {
                blocking,
                target: target.clone(),
            }),
        }
    }
}
