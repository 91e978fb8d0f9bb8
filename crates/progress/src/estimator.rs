//! Completion time estimation.

use chrono::Duration;
use dayflow_core::{PillarId, Time, Workflow};
use serde::{Deserialize, Serialize};

use crate::ProgressAggregator;

/// Remaining-time breakdown for a workflow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeEstimation {
    /// Minutes left across the workflow
    pub remaining_minutes: u32,

    /// Minutes left per pillar, display order
    pub by_pillar: Vec<(PillarId, u32)>,

    /// When the workflow would finish if work started now
    pub projected_finish: Time,
}

/// Completion time estimator.
#[derive(Debug, Clone, Copy, Default)]
pub struct CompletionEstimator;

impl CompletionEstimator {
    /// Estimate remaining time from `now`.
    pub fn estimate(&self, workflow: &Workflow, now: Time) -> TimeEstimation {
        let remaining_minutes = ProgressAggregator::new()
            .compute(workflow)
            .estimated_time_remaining;

        let by_pillar = workflow
            .pillars
            .iter()
            .map(|p| {
                let minutes = workflow
                    .tasks_in_pillar(&p.id)
                    .filter(|t| t.enabled && t.is_open())
                    .map(|t| t.estimated_time_minutes)
                    .fold(0u32, u32::saturating_add);
                (p.id.clone(), minutes)
            })
            .collect();

        TimeEstimation {
            remaining_minutes,
            by_pillar,
            projected_finish: now + Duration::minutes(i64::from(remaining_minutes)),
        }
    }
}
