//! Pillar model - ordered phases of a daily workflow.

use serde::{Deserialize, Serialize};
use crate::id::PillarId;

/// A pillar groups related tasks into one phase of the day.
///
/// Pillars form a linear sequence by `display_order`, e.g.
/// Plan → Generate → Publish → Analyze → Engage → Remarket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pillar {
    /// Unique identifier
    pub id: PillarId,

    /// Display title
    pub title: String,

    /// Position in the pillar sequence (unique, contiguous)
    pub display_order: u32,
}

impl Pillar {
    /// Create a pillar.
    pub fn new(id: impl Into<String>, title: impl Into<String>, display_order: u32) -> Self {
        Self {
            id: PillarId::new(id),
            title: title.into(),
            display_order,
        }
    }
}
