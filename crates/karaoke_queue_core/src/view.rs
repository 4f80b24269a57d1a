//! crates/karaoke_queue_core/src/view.rs
//!
//! Pure derivation of what the queue screen shows from a raw item list.

use crate::domain::{Item, ItemId};

/// Which of the three queue layouts applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueState {
    /// Nobody has queued anything yet.
    Empty,
    /// Every song is done and completed songs are hidden.
    AllCompleted,
    /// At least one row is visible.
    Queue,
}

/// Derived view state. Recomputing it is cheap and side-effect free.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueView {
    pub visible_items: Vec<Item>,
    pub completed_count: usize,
    pub total_count: usize,
    /// First incomplete item of the full list, not of `visible_items`.
    pub next_to_play: Option<ItemId>,
    pub show_completed: bool,
}

impl QueueView {
    pub fn derive(items: &[Item], show_completed: bool) -> Self {
        let completed_count = items.iter().filter(|item| item.is_completed).count();
        let next_to_play = items
            .iter()
            .find(|item| !item.is_completed)
            .map(|item| item.id.clone());
        let visible_items = items
            .iter()
            .filter(|item| show_completed || !item.is_completed)
            .cloned()
            .collect();

        Self {
            visible_items,
            completed_count,
            total_count: items.len(),
            next_to_play,
            show_completed,
        }
    }

    /// Whether the row for `id` gets the "up next" treatment.
    pub fn is_next_to_play(&self, id: &ItemId) -> bool {
        self.next_to_play.as_ref() == Some(id)
    }

    pub fn state(&self) -> QueueState {
        if self.total_count == 0 {
            QueueState::Empty
        } else if self.visible_items.is_empty() && !self.show_completed {
            QueueState::AllCompleted
        } else {
            QueueState::Queue
        }
    }

    /// Completion percentage, 0 for an empty queue.
    pub fn progress_percent(&self) -> f64 {
        if self.total_count == 0 {
            return 0.0;
        }
        self.completed_count as f64 / self.total_count as f64 * 100.0
    }
}
