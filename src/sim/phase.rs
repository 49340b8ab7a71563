//! Interaction phases
//!
//! One play-through walks `BodySelection -> LevelSelection -> LeafReveal`.
//! Only the immediate successor of the current phase is reachable; skips and
//! backward moves are rejected and leave the phase untouched. Stage-entry side
//! effects are the session's job, driven by the returned [`Transition`].

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::state::EntityId;

/// Current stage of interaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    /// Player picks one body out of the field
    BodySelection,
    /// Player toggles orbs on the chosen body
    LevelSelection { body: EntityId },
    /// Orbs are regrouped and can be hit open (terminal)
    LeafReveal { body: EntityId },
}

/// Hierarchy level an input targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InputLevel {
    Body,
    Orb,
    Leaf,
}

impl Phase {
    pub fn ordinal(&self) -> u8 {
        match self {
            Phase::BodySelection => 0,
            Phase::LevelSelection { .. } => 1,
            Phase::LeafReveal { .. } => 2,
        }
    }

    /// Body carried as stage context
    pub fn body(&self) -> Option<EntityId> {
        match *self {
            Phase::BodySelection => None,
            Phase::LevelSelection { body } | Phase::LeafReveal { body } => Some(body),
        }
    }

    /// Level whose handlers are live in this phase
    pub fn input_level(&self) -> InputLevel {
        match self {
            Phase::BodySelection => InputLevel::Body,
            Phase::LevelSelection { .. } => InputLevel::Orb,
            Phase::LeafReveal { .. } => InputLevel::Leaf,
        }
    }

    pub fn accepts(&self, level: InputLevel) -> bool {
        self.input_level() == level
    }

    /// Whether `next` is the single legal successor of `self`
    fn leads_to(&self, next: &Phase) -> bool {
        match (*self, *next) {
            (Phase::BodySelection, Phase::LevelSelection { .. }) => true,
            (Phase::LevelSelection { body }, Phase::LeafReveal { body: next_body }) => body == next_body,
            _ => false,
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Phase::BodySelection => write!(f, "BodySelection"),
            Phase::LevelSelection { body } => write!(f, "LevelSelection({body})"),
            Phase::LeafReveal { body } => write!(f, "LeafReveal({body})"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PhaseError {
    #[error("illegal transition from {from} to {to}")]
    IllegalTransition { from: Phase, to: Phase },
    #[error("{level:?} input is not accepted during {phase}")]
    IllegalInput { level: InputLevel, phase: Phase },
}

/// A phase change that just happened
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transition {
    pub from: Phase,
    pub to: Phase,
}

/// Owner of the process-wide current phase
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhaseMachine {
    phase: Phase,
    transitions: u32,
}

impl Default for PhaseMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl PhaseMachine {
    pub fn new() -> Self {
        Self {
            phase: Phase::BodySelection,
            transitions: 0,
        }
    }

    pub fn current(&self) -> Phase {
        self.phase
    }

    /// Transitions taken since the last reset
    pub fn transitions(&self) -> u32 {
        self.transitions
    }

    /// Check that input at `level` is legal right now
    pub fn gate(&self, level: InputLevel) -> Result<(), PhaseError> {
        if self.phase.accepts(level) {
            Ok(())
        } else {
            Err(PhaseError::IllegalInput {
                level,
                phase: self.phase,
            })
        }
    }

    /// Move to `to` if it is the immediate successor of the current phase
    pub fn transition(&mut self, to: Phase) -> Result<Transition, PhaseError> {
        let from = self.phase;
        if !from.leads_to(&to) {
            return Err(PhaseError::IllegalTransition { from, to });
        }
        self.phase = to;
        self.transitions += 1;
        log::info!("phase {} -> {}", from, to);
        Ok(Transition { from, to })
    }

    pub fn select_body(&mut self, body: EntityId) -> Result<Transition, PhaseError> {
        self.transition(Phase::LevelSelection { body })
    }

    pub fn complete_level(&mut self, body: EntityId) -> Result<Transition, PhaseError> {
        self.transition(Phase::LeafReveal { body })
    }

    /// Back to the initial phase (restart only)
    pub fn reset(&mut self) {
        *self = Self::new();
    }
}
