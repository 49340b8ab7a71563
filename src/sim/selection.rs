//! Per-level selection counting
//!
//! Orb selection is a toggle: every select must be paired with a deselect.
//! An unpaired deselect is a caller bug and is reported, never clamped.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::state::EntityId;

/// Selection edge reported by an orb toggle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Toggle {
    Selected,
    Deselected,
}

impl From<bool> for Toggle {
    fn from(selected: bool) -> Self {
        if selected { Toggle::Selected } else { Toggle::Deselected }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectionError {
    #[error("orb count underflow on body {0}: deselect without matching select")]
    Underflow(EntityId),
    #[error("no body is the current selection target")]
    NoTarget,
}

/// Counters for the current selection target
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionCounts {
    /// Orbs selected on the current body
    pub orbs: u32,
    /// Bodies picked over the run
    pub bodies: u32,
}

/// Tracks selection counts and answers completion queries
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SelectionAggregator {
    target: Option<EntityId>,
    counts: SelectionCounts,
}

impl SelectionAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn counts(&self) -> SelectionCounts {
        self.counts
    }

    pub fn target(&self) -> Option<EntityId> {
        self.target
    }

    /// Make `body` the selection target, zeroing its orb count
    pub fn begin_body(&mut self, body: EntityId) {
        self.target = Some(body);
        self.counts.orbs = 0;
        self.counts.bodies += 1;
        log::debug!("selection target is now body {} ({} picked so far)", body, self.counts.bodies);
    }

    /// Apply one orb toggle, returning the new orb count
    pub fn record(&mut self, toggle: Toggle) -> Result<u32, SelectionError> {
        let body = self.target.ok_or(SelectionError::NoTarget)?;
        match toggle {
            Toggle::Selected => self.counts.orbs += 1,
            Toggle::Deselected => {
                debug_assert!(self.counts.orbs > 0, "orb deselected on body {body} with zero selected");
                self.counts.orbs = self
                    .counts
                    .orbs
                    .checked_sub(1)
                    .ok_or(SelectionError::Underflow(body))?;
            }
        }
        log::debug!("selected orbs on body {}: {}", body, self.counts.orbs);
        Ok(self.counts.orbs)
    }

    /// True when every orb of the target body is selected
    pub fn is_level_complete(&self, body: EntityId, orb_total: usize) -> bool {
        self.target == Some(body) && self.counts.orbs as usize == orb_total
    }

    /// Forget everything (restart)
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}
