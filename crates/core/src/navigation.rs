//! Session navigation cursor.

use serde::{Deserialize, Serialize};
use crate::id::TaskId;

/// Current pointer plus back-history for one navigation session.
///
/// `anchor` remembers the sequence position of the last task the pointer was
/// on, so forward navigation keeps its place after the current task is
/// completed and the pointer cleared.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NavigationCursor {
    /// Task under the pointer
    pub current: Option<TaskId>,

    /// Sequence position forward search starts after
    pub anchor: Option<usize>,

    /// Back-history stack, most recent last
    pub history: Vec<TaskId>,
}

impl NavigationCursor {
    /// Fresh cursor with no pointer and no history.
    pub fn new() -> Self {
        Self::default()
    }

    /// Point at a task at a sequence position.
    pub fn point_at(&mut self, id: TaskId, position: usize) {
        self.current = Some(id);
        self.anchor = Some(position);
    }

    /// Clear the pointer if it is on `id`. The anchor stays.
    pub fn release(&mut self, id: &TaskId) -> bool {
        if self.current.as_ref() == Some(id) {
            self.current = None;
            true
        } else {
            false
        }
    }

    /// Top of the back-history stack.
    pub fn previous(&self) -> Option<&TaskId> {
        self.history.last()
    }
}
