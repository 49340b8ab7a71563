//! Fire-once deferred actions on a logical clock
//!
//! Nothing blocks: the host advances the clock every tick and runs whatever
//! came due.

use serde::{Deserialize, Serialize};

use super::state::EntityId;

/// Work that runs after a delay
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeferredAction {
    /// Deactivate a body superseded by leaf reveal
    DeactivateBody(EntityId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ActionId(u64);

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Pending {
    id: ActionId,
    due: f64,
    action: DeferredAction,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Scheduler {
    /// Logical time in seconds
    now: f64,
    pending: Vec<Pending>,
    next_id: u64,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn now(&self) -> f64 {
        self.now
    }

    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    pub fn schedule(&mut self, delay_secs: f32, action: DeferredAction) -> ActionId {
        self.next_id += 1;
        let id = ActionId(self.next_id);
        let due = self.now + f64::from(delay_secs.max(0.0));
        log::debug!("scheduled {:?} at t={:.3}", action, due);
        self.pending.push(Pending { id, due, action });
        id
    }

    /// Returns `true` if the action had not fired yet
    pub fn cancel(&mut self, id: ActionId) -> bool {
        let before = self.pending.len();
        self.pending.retain(|p| p.id != id);
        self.pending.len() != before
    }

    /// Drop everything still pending
    pub fn clear(&mut self) {
        if !self.pending.is_empty() {
            log::debug!("dropping {} pending actions", self.pending.len());
        }
        self.pending.clear();
    }

    /// Advance the clock and return due actions in scheduling order
    pub fn advance(&mut self, dt: f32) -> Vec<DeferredAction> {
        self.now += f64::from(dt);
        let now = self.now;
        let (due, waiting): (Vec<Pending>, Vec<Pending>) =
            std::mem::take(&mut self.pending).into_iter().partition(|p| p.due <= now);
        self.pending = waiting;
        due.into_iter().map(|p| p.action).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BODY: EntityId = EntityId(4);

    #[test]
    fn test_fires_once_after_delay() {
        let mut scheduler = Scheduler::new();
        scheduler.schedule(1.0, DeferredAction::DeactivateBody(BODY));

        assert!(scheduler.advance(0.5).is_empty());
        assert_eq!(scheduler.advance(0.5), vec![DeferredAction::DeactivateBody(BODY)]);
        assert!(scheduler.advance(5.0).is_empty());
        assert_eq!(scheduler.pending(), 0);
    }

    #[test]
    fn test_due_in_scheduling_order() {
        let mut scheduler = Scheduler::new();
        scheduler.schedule(0.2, DeferredAction::DeactivateBody(EntityId(1)));
        scheduler.schedule(0.1, DeferredAction::DeactivateBody(EntityId(2)));
        assert_eq!(
            scheduler.advance(1.0),
            vec![
                DeferredAction::DeactivateBody(EntityId(1)),
                DeferredAction::DeactivateBody(EntityId(2)),
            ]
        );
    }

    #[test]
    fn test_cancel_and_clear() {
        let mut scheduler = Scheduler::new();
        let id = scheduler.schedule(1.0, DeferredAction::DeactivateBody(BODY));
        assert!(scheduler.cancel(id));
        assert!(!scheduler.cancel(id));

        scheduler.schedule(1.0, DeferredAction::DeactivateBody(BODY));
        scheduler.clear();
        assert!(scheduler.advance(2.0).is_empty());
    }

    #[test]
    fn test_zero_delay_fires_next_advance() {
        let mut scheduler = Scheduler::new();
        scheduler.schedule(0.0, DeferredAction::DeactivateBody(BODY));
        assert_eq!(scheduler.advance(0.0).len(), 1);
    }
}
