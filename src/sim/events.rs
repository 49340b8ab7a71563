//! Synchronous publish/subscribe
//!
//! Delivery is in subscription order and finishes before `publish` returns.
//! Handlers may subscribe, unsubscribe or publish from inside a callback; a
//! publish snapshots the subscriber list first, so changes apply from the
//! next publish on.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use super::phase::{InputLevel, Phase};
use super::sampler::Placement;
use super::state::{BodyKind, EntityId};
use crate::services::Handle;

/// Subscription token returned by [`EventBus::subscribe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Handler<E> = Rc<dyn Fn(&E)>;

/// Single-threaded multi-subscriber event bus
pub struct EventBus<E> {
    handlers: RefCell<Vec<(SubscriptionId, Handler<E>)>>,
    next_id: Cell<u64>,
}

impl<E> Default for EventBus<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> EventBus<E> {
    pub fn new() -> Self {
        Self {
            handlers: RefCell::new(Vec::new()),
            next_id: Cell::new(1),
        }
    }

    pub fn subscribe(&self, handler: impl Fn(&E) + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.get());
        self.next_id.set(id.0 + 1);
        self.handlers.borrow_mut().push((id, Rc::new(handler)));
        id
    }

    /// Returns `true` when a subscription was found and removed
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut handlers = self.handlers.borrow_mut();
        let before = handlers.len();
        handlers.retain(|(existing, _)| *existing != id);
        handlers.len() != before
    }

    pub fn subscriber_count(&self) -> usize {
        self.handlers.borrow().len()
    }

    pub fn publish(&self, event: &E) {
        let snapshot: Vec<Handler<E>> = self.handlers.borrow().iter().map(|(_, h)| h.clone()).collect();
        for handler in snapshot {
            handler(event);
        }
    }
}

impl<E> std::fmt::Debug for EventBus<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

/// Where a placement batch ran
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlacementScope {
    /// Orbs on a body surface
    Orbs { body: EntityId },
    /// Cells inside an orb
    Cells { orb: EntityId },
}

/// Domain input delivered by the host
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum InputEvent {
    BodyPicked(Handle),
    OrbPicked(Handle),
}

/// Events published by the simulation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GameEvent {
    BodySpawned { body: EntityId, kind: BodyKind, orbs: usize },
    FieldSpawned { bodies: usize, orbs: usize },
    PlacementDegraded { scope: PlacementScope, requested: usize, placed: usize },
    SubsetClamped { orb: EntityId, requested: usize, available: usize },
    PhaseChanged { from: Phase, to: Phase },
    BodySelected { body: EntityId },
    OrbToggled { body: EntityId, orb: EntityId, selected: bool, count: u32 },
    LevelComplete { body: EntityId },
    OrbsRegrouped { body: EntityId, container: Handle, center: Vec3 },
    OrbHit { orb: EntityId, hits: u8 },
    OrbCollapsed { orb: EntityId, energized: usize, dormant: usize },
    BodyDeactivated { body: EntityId },
    /// Input arrived for a level the current phase does not handle
    InputRejected { input: InputEvent, level: InputLevel, phase: Phase },
    Restarted { seed: u64 },
}

impl GameEvent {
    pub fn placement_degraded(scope: PlacementScope, placement: &Placement) -> Self {
        GameEvent::PlacementDegraded {
            scope,
            requested: placement.requested,
            placed: placement.points.len(),
        }
    }
}
