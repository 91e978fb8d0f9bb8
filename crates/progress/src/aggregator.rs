//! Progress aggregation.

use dayflow_core::{PillarProgress, TaskStatus, Workflow, WorkflowProgress};

/// Derives progress projections from a workflow.
///
/// Only enabled tasks count: a disabled task can never leave pending, so
/// counting it would make 100% unreachable.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProgressAggregator;

impl ProgressAggregator {
    /// Create a new aggregator.
    pub fn new() -> Self {
        Self
    }

    /// Workflow-wide progress.
    pub fn compute(&self, workflow: &Workflow) -> WorkflowProgress {
        let mut progress = WorkflowProgress::default();

        for task in workflow.tasks.iter().filter(|t| t.enabled) {
            progress.total_tasks += 1;
            match task.status {
                TaskStatus::Completed => {
                    progress.completed_tasks += 1;
                    progress.actual_time_spent = progress.actual_time_spent.saturating_add(task.estimated_time_minutes);
                }
                TaskStatus::Skipped => {
                    progress.completed_tasks += 1;
                }
                TaskStatus::Pending | TaskStatus::InProgress => {
                    progress.estimated_time_remaining =
                        progress.estimated_time_remaining.saturating_add(task.estimated_time_minutes);
                }
            }
        }

        progress.completion_percentage = percentage(progress.completed_tasks, progress.total_tasks);
        progress
    }

    /// Progress of every pillar, in display order.
    pub fn pillar_progress(&self, workflow: &Workflow) -> Vec<PillarProgress> {
        let mut unlocked = true;
        let mut out = Vec::with_capacity(workflow.pillars.len());

        for pillar in &workflow.pillars {
            let (completed, total) = workflow
                .tasks_in_pillar(&pillar.id)
                .filter(|t| t.enabled)
                .fold((0, 0), |(done, total), t| {
                    (done + usize::from(t.is_resolved()), total + 1)
                });
            let all_completed = completed == total;

            out.push(PillarProgress {
                pillar_id: pillar.id.clone(),
                completed_tasks: completed,
                total_tasks: total,
                percentage: if total == 0 { 100 } else { percentage(completed, total) },
                all_completed,
                unlocked,
            });

            unlocked = unlocked && all_completed;
        }

        out
    }
}

/// `round(100 × done / total)`, 0 when there is nothing to do.
///
/// Only a fully resolved set reports 100; anything short of it is capped at 99.
pub fn percentage(done: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    let rounded = ((done as f64 * 100.0) / total as f64).round() as u8;
    if done < total {
        rounded.min(99)
    } else {
        rounded
    }
}
