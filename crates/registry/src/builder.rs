//! Workflow builder - instantiates a dated workflow from the registry.

use crate::registry::TaskRegistry;
use chrono::NaiveDate;
use dayflow_core::{
    OwnerId, PillarId, Task, TaskId, TaskStatus, Workflow, WorkflowError, WorkflowId, WorkflowStatus,
};
use std::collections::HashSet;
use tracing::info;

/// What the builder knows about the owner.
#[derive(Debug, Clone)]
pub struct OwnerContext {
    /// Owner
    pub owner_id: OwnerId,

    /// Tasks switched off for this owner
    pub disabled_tasks: HashSet<TaskId>,

    /// Pillars switched off for this owner
    pub disabled_pillars: HashSet<PillarId>,
}

impl OwnerContext {
    /// Context with nothing disabled.
    pub fn new(owner_id: OwnerId) -> Self {
        Self {
            owner_id,
            disabled_tasks: HashSet::new(),
            disabled_pillars: HashSet::new(),
        }
    }

    /// Disable a task.
    pub fn disable_task(mut self, key: impl Into<String>) -> Self {
        self.disabled_tasks.insert(TaskId::new(key));
        self
    }

    /// Disable every task of a pillar.
    pub fn disable_pillar(mut self, id: impl Into<String>) -> Self {
        self.disabled_pillars.insert(PillarId::new(id));
        self
    }

    fn allows(&self, task: &TaskId, pillar: &PillarId) -> bool {
        !self.disabled_tasks.contains(task) && !self.disabled_pillars.contains(pillar)
    }
}

/// Assembles a workflow from a validated registry.
///
/// Output is deterministic for a given registry, owner and date: same ids,
/// same order, every task pending, workflow not started.
///
/// A disabled task does not apply to the day, so dependency edges pointing
/// at it are dropped: its enabled dependents are gated only by their other
/// dependencies. Edges to ids the registry does not know are kept and
/// surface as inconsistencies during resolution.
pub struct WorkflowBuilder<'a> {
    registry: &'a TaskRegistry,
}

impl<'a> WorkflowBuilder<'a> {
    /// Create a builder over a registry.
    pub fn new(registry: &'a TaskRegistry) -> Self {
        Self { registry }
    }

    /// Build the workflow for an owner and a day.
    pub fn build(&self, owner: &OwnerContext, date: NaiveDate) -> Result<Workflow, WorkflowError> {
        let templates = self.registry.ordered();
        let disabled: HashSet<&TaskId> = templates
            .iter()
            .filter(|t| !(t.enabled && owner.allows(&t.key, &t.pillar_id)))
            .map(|t| &t.key)
            .collect();

        let tasks: Vec<Task> = templates
            .iter()
            .map(|template| Task {
                id: template.key.clone(),
                pillar_id: template.pillar_id.clone(),
                title: template.title.clone(),
                description: template.description.clone(),
                status: TaskStatus::Pending,
                priority: template.priority,
                estimated_time_minutes: template.estimated_time_minutes,
                depends_on: template
                    .depends_on
                    .iter()
                    .filter(|dep| !disabled.contains(dep))
                    .cloned()
                    .collect(),
                enabled: template.enabled && owner.allows(&template.key, &template.pillar_id),
                action: template.action.clone(),
            })
            .collect();

        if !tasks.iter().any(|t| t.enabled) {
            return Err(WorkflowError::EmptyRegistry);
        }

        let workflow = Workflow {
            id: WorkflowId::for_day(&owner.owner_id, date),
            owner_id: owner.owner_id.clone(),
            date,
            created_at: chrono::Utc::now(),
            pillars: self.registry.pillars().to_vec(),
            tasks,
            status: WorkflowStatus::NotStarted,
        };

        info!(
            workflow = %workflow.id,
            tasks = workflow.tasks.len(),
            "Built daily workflow"
        );

        Ok(workflow)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::TaskTemplate;
    use dayflow_core::Pillar;

    fn registry() -> TaskRegistry {
        TaskRegistry::new(
            vec![Pillar::new("a", "A", 1), Pillar::new("b", "B", 2)],
            vec![
                TaskTemplate::new("b1", "b", "B1", 15).depends_on("a1"),
                TaskTemplate::new("a1", "a", "A1", 10),
                TaskTemplate::new("a2", "a", "A2", 20),
            ],
        )
        .unwrap()
    }

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 19).unwrap()
    }

    #[test]
    fn test_build_orders_and_resets() {
        let registry = registry();
        let owner = OwnerContext::new(OwnerId::new("ada"));
        let wf = WorkflowBuilder::new(&registry).build(&owner, day()).unwrap();

        let ids: Vec<_> = wf.tasks.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["a1", "a2", "b1"]);
        assert!(wf.tasks.iter().all(|t| t.status == TaskStatus::Pending));
        assert_eq!(wf.status, WorkflowStatus::NotStarted);
        assert_eq!(wf.id.as_str(), "ada:2026-10-19");
    }

    #[test]
    fn test_build_is_deterministic() {
        let registry = registry();
        let owner = OwnerContext::new(OwnerId::new("ada"));
        let builder = WorkflowBuilder::new(&registry);
        let first = builder.build(&owner, day()).unwrap();
        let second = builder.build(&owner, day()).unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(first.tasks, second.tasks);
    }

    #[test]
    fn test_owner_context_disables() {
        let registry = registry();
        let owner = OwnerContext::new(OwnerId::new("ada"))
            .disable_task("a2")
            .disable_pillar("b");
        let wf = WorkflowBuilder::new(&registry).build(&owner, day()).unwrap();
        let enabled: Vec<_> = wf.tasks.iter().filter(|t| t.enabled).map(|t| t.id.as_str()).collect();
        assert_eq!(enabled, vec!["a1"]);
        assert_eq!(wf.tasks.len(), 3);
    }

    #[test]
    fn test_disabled_dependency_is_dropped() {
        let registry = registry();
        let owner = OwnerContext::new(OwnerId::new("ada")).disable_task("a1");
        let wf = WorkflowBuilder::new(&registry).build(&owner, day()).unwrap();

        let b1 = wf.task(&TaskId::new("b1")).unwrap();
        assert!(b1.enabled);
        assert!(b1.depends_on.is_empty());
        assert!(!wf.task(&TaskId::new("a1")).unwrap().enabled);
    }

    #[test]
    fn test_disabled_default_task_unblocks_dependent() {
        let registry = crate::default_registry();
        let owner = OwnerContext::new(OwnerId::new("ada")).disable_task("plan.keyword-research");
        let wf = WorkflowBuilder::new(&registry).build(&owner, day()).unwrap();

        let pick = wf.task(&TaskId::new("plan.pick-topic")).unwrap();
        assert!(pick.enabled);
        assert!(!pick.depends_on.contains(&TaskId::new("plan.keyword-research")));

        let draft = wf.task(&TaskId::new("generate.draft-article")).unwrap();
        assert_eq!(draft.depends_on, vec![TaskId::new("plan.pick-topic")]);
    }

    #[test]
    fn test_empty_registry() {
        let registry = TaskRegistry::new(vec![Pillar::new("a", "A", 1)], vec![]).unwrap();
        let owner = OwnerContext::new(OwnerId::new("ada"));
        let result = WorkflowBuilder::new(&registry).build(&owner, day());
        assert_eq!(result.unwrap_err(), WorkflowError::EmptyRegistry);
    }
}
