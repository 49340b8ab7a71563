//! Session and fixed-step tick
//!
//! The session owns the state, the collaborators and the event bus. Input is
//! gated by the current phase before it reaches any handler; stage-entry side
//! effects run right after the phase machine accepts a transition.
//!
//! Selection toggles are routed by the session itself: it records them in the
//! aggregator, checks completion and drives the phase machine, then publishes
//! the matching [`GameEvent`]s. The bus carries events out to host listeners
//! in that same order; the core never subscribes to it.

use glam::{Quat, Vec2, Vec3};
use rand::SeedableRng;
use rand_pcg::Pcg32;

use super::events::{EventBus, GameEvent, InputEvent};
use super::phase::{InputLevel, Phase, PhaseError, Transition};
use super::scheduler::{DeferredAction, Scheduler};
use super::selection::Toggle;
use super::spawn::{field_bounds, spawn_field};
use super::state::{CellStack, EntityId, GameState};
use crate::config::{ConfigError, GameConfig};
use crate::consts::ORB_COLLAPSE_HITS;
use crate::services::{FocusTarget, Handle, Prefab, Services, VisualState};

/// Input commands for a single tick (deterministic)
#[derive(Debug, Clone, Default)]
pub struct TickInput {
    /// Picks delivered this frame, in order
    pub picks: Vec<InputEvent>,
    /// Rotation axis (x = yaw, y = pitch), each in [-1, 1]
    pub rotate: Vec2,
    /// Restart with this seed before anything else
    pub restart: Option<u64>,
}

/// One play-through and everything it talks to
pub struct Session {
    config: GameConfig,
    state: GameState,
    services: Services,
    bus: EventBus<GameEvent>,
    scheduler: Scheduler,
}

impl Session {
    /// Validate `config`, spawn a field from `seed` and start in body selection
    pub fn new(config: GameConfig, seed: u64, services: Services) -> Result<Self, ConfigError> {
        config.validate()?;
        let mut session = Self {
            config,
            state: GameState::new(seed),
            services,
            bus: EventBus::new(),
            scheduler: Scheduler::new(),
        };
        session.spawn();
        Ok(session)
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn phase(&self) -> Phase {
        self.state.phase.current()
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    /// Subscribe here to observe simulation events
    pub fn events(&self) -> &EventBus<GameEvent> {
        &self.bus
    }

    fn emit(&self, event: GameEvent) {
        self.bus.publish(&event);
    }

    fn spawn(&mut self) {
        let mut rng = Pcg32::seed_from_u64(self.state.seed);
        let events = spawn_field(
            &mut self.state,
            &self.config,
            &mut rng,
            self.services.spawner.as_mut(),
            self.services.visuals.as_mut(),
        );
        for event in events {
            if matches!(event, GameEvent::PlacementDegraded { .. } | GameEvent::SubsetClamped { .. }) {
                log::warn!("spawn degraded: {:?}", event);
            }
            self.emit(event);
        }
        if let Some((center, half_extents)) = field_bounds(&self.state.bodies) {
            self.services.camera.focus_on(FocusTarget::Bounds { center, half_extents });
        }
    }

    /// Tear everything down and respawn from `seed`.
    ///
    /// Pending deferred actions from the old field are dropped.
    pub fn restart(&mut self, seed: u64) {
        let spawner = self.services.spawner.as_mut();
        for stack in &self.state.stacks {
            spawner.despawn(stack.handle);
        }
        for body in &self.state.bodies {
            if let Some(container) = body.orb_container {
                spawner.despawn(container);
            }
            spawner.despawn(body.handle);
        }
        self.scheduler.clear();
        self.state = GameState::new(seed);
        log::info!("Restarting with seed {}", seed);
        self.spawn();
        self.emit(GameEvent::Restarted { seed });
    }

    /// Advance the session by one step
    pub fn tick(&mut self, input: &TickInput, dt: f32) {
        if let Some(seed) = input.restart {
            self.restart(seed);
        }

        for pick in &input.picks {
            self.handle(*pick);
        }

        match self.phase() {
            Phase::LevelSelection { body } => {
                let speed = self.config.rotation_speed_deg;
                if let Some(body) = self.state.body_mut(body) {
                    body.rotate(input.rotate, speed, dt);
                }
            }
            phase if input.rotate != Vec2::ZERO => {
                log::trace!("rotation ignored during {}", phase);
            }
            _ => {}
        }

        self.state.step_cells(dt);

        for action in self.scheduler.advance(dt) {
            self.run_deferred(action);
        }

        self.state.time_ticks += 1;
    }

    /// Route one input to the handler for the current phase
    pub fn handle(&mut self, input: InputEvent) {
        let phase = self.phase();
        let level = match input {
            InputEvent::BodyPicked(_) => InputLevel::Body,
            InputEvent::OrbPicked(_) if matches!(phase, Phase::LeafReveal { .. }) => InputLevel::Leaf,
            InputEvent::OrbPicked(_) => InputLevel::Orb,
        };

        if let Err(err) = self.state.phase.gate(level) {
            log::debug!("ignoring {:?}: {}", input, err);
            self.emit(GameEvent::InputRejected { input, level, phase });
            return;
        }

        match (input, level) {
            (InputEvent::BodyPicked(handle), _) => self.pick_body(handle),
            (InputEvent::OrbPicked(handle), InputLevel::Leaf) => self.hit_orb(handle),
            (InputEvent::OrbPicked(handle), _) => self.toggle_orb(handle),
        }
    }

    fn pick_body(&mut self, handle: Handle) {
        let Some(body) = self.state.body_by_handle(handle).filter(|b| b.active) else {
            log::debug!("pick on unknown or inactive body {:?}", handle);
            return;
        };
        let body = body.id;

        match self.state.phase.select_body(body) {
            Ok(transition) => {
                self.emit(GameEvent::BodySelected { body });
                self.enter(transition);
            }
            Err(err) => self.reject(err),
        }
    }

    /// Orb-level handler: toggle selection on the focused body
    fn toggle_orb(&mut self, handle: Handle) {
        let Some(body_id) = self.phase().body() else {
            return;
        };
        let Some((bi, oi)) = self.locate_orb(body_id, handle) else {
            return;
        };

        let orb = &mut self.state.bodies[bi].orbs[oi];
        let selected = orb.toggle_selected();
        let (orb_id, orb_handle) = (orb.id, orb.handle);
        let tag = if selected { VisualState::Selected } else { VisualState::Default };
        self.services.visuals.set_visual_state(orb_handle, tag);

        let count = match self.state.selection.record(Toggle::from(selected)) {
            Ok(count) => count,
            Err(err) => {
                log::error!("selection invariant broken: {}", err);
                return;
            }
        };
        self.emit(GameEvent::OrbToggled {
            body: body_id,
            orb: orb_id,
            selected,
            count,
        });

        let orb_total = self.state.bodies[bi].orb_total();
        if self.state.selection.is_level_complete(body_id, orb_total) {
            self.complete_level(body_id);
        }
    }

    fn complete_level(&mut self, body: EntityId) {
        match self.state.phase.complete_level(body) {
            Ok(transition) => {
                log::info!("All orbs selected on body {}", body);
                self.emit(GameEvent::LevelComplete { body });
                self.enter(transition);
            }
            Err(err) => self.reject(err),
        }
    }

    /// Leaf-level handler: count hits, collapse on the third
    fn hit_orb(&mut self, handle: Handle) {
        let Some(body_id) = self.phase().body() else {
            return;
        };
        let Some((bi, oi)) = self.locate_orb(body_id, handle) else {
            return;
        };

        let orb = &mut self.state.bodies[bi].orbs[oi];
        let hits = orb.register_hit();
        let (orb_id, orb_handle) = (orb.id, orb.handle);
        log::debug!("{} has been hit {} times", orb.name, hits);
        self.emit(GameEvent::OrbHit { orb: orb_id, hits });

        match hits {
            1 => self.services.visuals.set_visual_state(orb_handle, VisualState::HitOnce),
            2 => self.services.visuals.set_visual_state(orb_handle, VisualState::HitTwice),
            _ if hits >= ORB_COLLAPSE_HITS => self.collapse_orb(bi, oi),
            _ => {}
        }
    }

    /// Active orb on `body` with this handle
    fn locate_orb(&self, body: EntityId, handle: Handle) -> Option<(usize, usize)> {
        let found = self.state.find_orb(handle).filter(|&(bi, oi)| {
            let owner = &self.state.bodies[bi];
            owner.id == body && owner.orbs[oi].active
        });
        if found.is_none() {
            log::debug!("pick on orb {:?} outside body {} or already collapsed", handle, body);
        }
        found
    }

    /// Split an orb's cells into energized/dormant stacks and retire the orb
    fn collapse_orb(&mut self, bi: usize, oi: usize) {
        let body = &mut self.state.bodies[bi];
        let origin = body.orb_world_position(&body.orbs[oi]);
        let orb = &mut body.orbs[oi];
        let spawner = self.services.spawner.as_mut();

        let stack_handle = spawner.instantiate(Prefab::Container, &format!("{}_Cells", orb.name), origin, Quat::IDENTITY);
        let (mut energized, mut dormant): (Vec<_>, Vec<_>) =
            std::mem::take(&mut orb.cells).into_iter().partition(|c| c.energized);

        let step = self.config.cell_stack_offset;
        // Dormant cells stack upward from the origin, energized ones below it
        for (i, cell) in dormant.iter_mut().enumerate() {
            cell.stop();
            cell.local_pos = Vec3::Y * (i as f32 * step);
        }
        for (i, cell) in energized.iter_mut().enumerate() {
            cell.stop();
            cell.local_pos = -Vec3::Y * ((i + 1) as f32 * step);
        }
        for cell in dormant.iter().chain(energized.iter()) {
            spawner.set_parent(cell.handle, stack_handle);
            spawner.set_position(cell.handle, origin + cell.local_pos);
        }

        orb.active = false;
        spawner.set_active(orb.handle, false);
        log::info!(
            "{} collapsed: {} energized, {} dormant",
            orb.name,
            energized.len(),
            dormant.len()
        );

        let event = GameEvent::OrbCollapsed {
            orb: orb.id,
            energized: energized.len(),
            dormant: dormant.len(),
        };
        self.state.stacks.push(CellStack {
            orb: orb.id,
            handle: stack_handle,
            origin,
            energized,
            dormant,
        });
        self.emit(event);
    }

    fn reject(&self, err: PhaseError) {
        log::debug!("transition refused: {}", err);
    }

    /// Stage-entry side effects
    fn enter(&mut self, transition: Transition) {
        self.emit(GameEvent::PhaseChanged {
            from: transition.from,
            to: transition.to,
        });
        match transition.to {
            Phase::BodySelection => {}
            Phase::LevelSelection { body } => self.enter_level_selection(body),
            Phase::LeafReveal { body } => self.enter_leaf_reveal(body),
        }
    }

    fn enter_level_selection(&mut self, body_id: EntityId) {
        let spawner = self.services.spawner.as_mut();
        let mut focus = None;
        for body in &mut self.state.bodies {
            if body.id == body_id {
                body.rotation_enabled = true;
                focus = Some(body.handle);
            } else if body.active {
                body.active = false;
                body.rotation_enabled = false;
                spawner.set_active(body.handle, false);
            }
        }
        if let Some(handle) = focus {
            self.services.camera.focus_on(FocusTarget::Entity(handle));
        }

        self.state.selection.begin_body(body_id);

        // A body without orbs has nothing to select
        let orb_total = self.state.body(body_id).map_or(0, |b| b.orb_total());
        if self.state.selection.is_level_complete(body_id, orb_total) {
            self.complete_level(body_id);
        }
    }

    fn enter_leaf_reveal(&mut self, body_id: EntityId) {
        let Some(body) = self.state.bodies.iter_mut().find(|b| b.id == body_id) else {
            return;
        };
        body.rotation_enabled = false;

        let bounds = body.orb_bounds();
        let center = bounds.map_or(body.position, |(center, _)| center);
        let spawner = self.services.spawner.as_mut();
        let container = spawner.instantiate(Prefab::Container, &format!("{}_Orbs", body.name), center, Quat::IDENTITY);
        for orb in &body.orbs {
            let world = body.orb_world_position(orb);
            spawner.set_parent(orb.handle, container);
            spawner.set_position(orb.handle, world);
            self.services.visuals.set_visual_state(orb.handle, VisualState::Default);
        }
        body.orb_container = Some(container);

        self.scheduler
            .schedule(self.config.settle_delay_secs, DeferredAction::DeactivateBody(body_id));

        let target = match bounds {
            Some((center, half_extents)) => FocusTarget::Bounds { center, half_extents },
            None => FocusTarget::Entity(container),
        };
        self.services.camera.focus_on(target);
        self.emit(GameEvent::OrbsRegrouped {
            body: body_id,
            container,
            center,
        });
    }

    fn run_deferred(&mut self, action: DeferredAction) {
        match action {
            DeferredAction::DeactivateBody(id) => {
                let Some(body) = self.state.body_mut(id) else {
                    return;
                };
                body.active = false;
                self.services.spawner.set_active(body.handle, false);
                log::info!("{} deactivated after settle delay", body.name);
                self.emit(GameEvent::BodyDeactivated { body: id });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::SIM_DT;
    use crate::services::{Recorder, ServiceCall};
    use std::cell::RefCell;
    use std::rc::Rc;

    fn session_with(config: GameConfig, seed: u64) -> (Session, Recorder, Rc<RefCell<Vec<GameEvent>>>) {
        let (services, recorder) = Services::recording();
        let session = Session::new(config, seed, services).expect("valid config");
        let log = Rc::new(RefCell::new(Vec::new()));
        let sink = log.clone();
        session.events().subscribe(move |e: &GameEvent| sink.borrow_mut().push(e.clone()));
        (session, recorder, log)
    }

    /// Single body with exactly `orbs` orbs
    fn config_with_orbs(orbs: u32) -> GameConfig {
        GameConfig {
            body_count: 1,
            min_orbs: orbs,
            max_orbs: orbs,
            ..Default::default()
        }
    }

    fn pick_body(session: &mut Session, index: usize) {
        let handle = session.state().bodies[index].handle;
        session.handle(InputEvent::BodyPicked(handle));
    }

    fn orb_handles(session: &Session, body: usize) -> Vec<Handle> {
        session.state().bodies[body].orbs.iter().map(|o| o.handle).collect()
    }

    fn count_level_complete(log: &Rc<RefCell<Vec<GameEvent>>>) -> usize {
        log.borrow()
            .iter()
            .filter(|e| matches!(e, GameEvent::LevelComplete { .. }))
            .count()
    }

    #[test]
    fn test_starts_in_body_selection() {
        let (session, recorder, _) = session_with(GameConfig::default(), 1);
        assert_eq!(session.phase(), Phase::BodySelection);
        assert_eq!(session.state().bodies.len(), 2);
        assert!(matches!(recorder.focus_requests().as_slice(), [FocusTarget::Bounds { .. }]));
    }

    #[test]
    fn test_body_pick_enters_level_selection() {
        let (mut session, recorder, log) = session_with(GameConfig::default(), 4);
        pick_body(&mut session, 1);

        let chosen = &session.state().bodies[1];
        let other = &session.state().bodies[0];
        assert_eq!(session.phase(), Phase::LevelSelection { body: chosen.id });
        assert!(!other.active);
        assert!(!recorder.is_active(other.handle));
        assert!(chosen.rotation_enabled);
        assert_eq!(recorder.focus_requests().last(), Some(&FocusTarget::Entity(chosen.handle)));
        assert_eq!(session.state().selection.counts().orbs, 0);
        assert_eq!(session.state().selection.counts().bodies, 1);
        assert!(log.borrow().contains(&GameEvent::BodySelected { body: chosen.id }));
    }

    #[test]
    fn test_second_body_pick_is_rejected() {
        let (mut session, _, log) = session_with(GameConfig::default(), 4);
        pick_body(&mut session, 0);
        let phase = session.phase();
        pick_body(&mut session, 1);
        assert_eq!(session.phase(), phase);
        assert!(
            log.borrow()
                .iter()
                .any(|e| matches!(e, GameEvent::InputRejected { level: InputLevel::Body, .. }))
        );
    }

    #[test]
    fn test_orb_pick_before_body_is_rejected() {
        let (mut session, recorder, log) = session_with(GameConfig::default(), 4);
        let orb = orb_handles(&session, 0)[0];
        session.handle(InputEvent::OrbPicked(orb));
        assert_eq!(session.phase(), Phase::BodySelection);
        assert!(!session.state().bodies[0].orbs[0].selected);
        assert_eq!(recorder.visual_state(orb), None);
        assert!(matches!(
            log.borrow().last(),
            Some(GameEvent::InputRejected {
                level: InputLevel::Orb,
                phase: Phase::BodySelection,
                ..
            })
        ));
    }

    #[test]
    fn test_five_orbs_complete_on_fifth_selection() {
        let (mut session, _, log) = session_with(config_with_orbs(5), 9);
        assert_eq!(session.state().bodies[0].orb_total(), 5);
        pick_body(&mut session, 0);
        let body = session.state().bodies[0].id;

        let orbs = orb_handles(&session, 0);
        for (i, orb) in orbs.iter().enumerate() {
            assert_eq!(session.phase(), Phase::LevelSelection { body }, "early completion at {i}");
            session.handle(InputEvent::OrbPicked(*orb));
        }
        assert_eq!(session.phase(), Phase::LeafReveal { body });
        assert_eq!(count_level_complete(&log), 1);
    }

    #[test]
    fn test_deselect_delays_completion() {
        let (mut session, recorder, log) = session_with(config_with_orbs(4), 2);
        pick_body(&mut session, 0);
        let orbs = orb_handles(&session, 0);

        session.handle(InputEvent::OrbPicked(orbs[0]));
        assert_eq!(recorder.visual_state(orbs[0]), Some(VisualState::Selected));
        session.handle(InputEvent::OrbPicked(orbs[0]));
        assert_eq!(recorder.visual_state(orbs[0]), Some(VisualState::Default));
        assert_eq!(session.state().selection.counts().orbs, 0);

        for orb in &orbs[..3] {
            session.handle(InputEvent::OrbPicked(*orb));
        }
        assert!(matches!(session.phase(), Phase::LevelSelection { .. }));
        session.handle(InputEvent::OrbPicked(orbs[3]));
        assert!(matches!(session.phase(), Phase::LeafReveal { .. }));
        assert_eq!(count_level_complete(&log), 1);
    }

    #[test]
    fn test_orb_on_other_body_is_ignored() {
        let (mut session, _, _) = session_with(GameConfig::default(), 6);
        pick_body(&mut session, 0);
        let foreign = orb_handles(&session, 1)[0];
        session.handle(InputEvent::OrbPicked(foreign));
        assert!(!session.state().bodies[1].orbs[0].selected);
        assert_eq!(session.state().selection.counts().orbs, 0);
    }

    fn reveal(seed: u64, orbs: u32) -> (Session, Recorder, Rc<RefCell<Vec<GameEvent>>>) {
        let (mut session, recorder, log) = session_with(config_with_orbs(orbs), seed);
        pick_body(&mut session, 0);
        for orb in orb_handles(&session, 0) {
            session.handle(InputEvent::OrbPicked(orb));
        }
        (session, recorder, log)
    }

    #[test]
    fn test_leaf_reveal_entry_effects() {
        let (mut session, recorder, _) = reveal(3, 4);
        let body = session.state().bodies[0].clone();
        let container = body.orb_container.expect("orbs regrouped");

        assert!(!body.rotation_enabled);
        for orb in &body.orbs {
            assert!(recorder.calls().contains(&ServiceCall::SetParent {
                child: orb.handle,
                parent: container
            }));
        }
        assert!(matches!(recorder.focus_requests().last(), Some(FocusTarget::Bounds { .. })));

        // Body deactivates only after the settle delay
        assert!(body.active);
        assert_eq!(session.scheduler().pending(), 1);
        let ticks = (session.config().settle_delay_secs / SIM_DT).ceil() as usize + 1;
        for _ in 0..ticks {
            session.tick(&TickInput::default(), SIM_DT);
        }
        assert!(!session.state().bodies[0].active);
        assert!(!recorder.is_active(body.handle));
        assert_eq!(session.scheduler().pending(), 0);
    }

    #[test]
    fn test_three_hits_collapse_orb() {
        let config = GameConfig {
            cell_counts: crate::config::CellCounts {
                red: 7,
                blue: 7,
                green: 7,
            },
            ..config_with_orbs(3)
        };
        let (services, recorder) = Services::recording();
        let mut session = Session::new(config, 21, services).expect("valid config");
        pick_body(&mut session, 0);
        let orbs = orb_handles(&session, 0);
        for orb in &orbs {
            session.handle(InputEvent::OrbPicked(*orb));
        }

        let target = orbs[1];
        let cell_ids: Vec<EntityId> = session.state().bodies[0].orbs[1].cells.iter().map(|c| c.id).collect();
        assert_eq!(cell_ids.len(), 7);

        session.handle(InputEvent::OrbPicked(target));
        assert_eq!(recorder.visual_state(target), Some(VisualState::HitOnce));
        session.handle(InputEvent::OrbPicked(target));
        assert_eq!(recorder.visual_state(target), Some(VisualState::HitTwice));
        assert!(session.state().stacks.is_empty());
        session.handle(InputEvent::OrbPicked(target));

        let orb = &session.state().bodies[0].orbs[1];
        assert!(!orb.active);
        assert!(orb.cells.is_empty());
        assert!(!recorder.is_active(target));

        let stack = &session.state().stacks[0];
        assert_eq!(stack.energized.len(), 4);
        assert_eq!(stack.dormant.len(), 3);
        assert!(stack.energized.iter().all(|c| c.energized && !c.can_move));
        assert!(stack.dormant.iter().all(|c| !c.energized && !c.can_move));
        for id in &cell_ids {
            let in_energized = stack.energized.iter().any(|c| c.id == *id);
            let in_dormant = stack.dormant.iter().any(|c| c.id == *id);
            assert!(in_energized ^ in_dormant);
        }
        assert!(stack.energized.iter().all(|c| c.local_pos.y < 0.0));
        assert!(stack.dormant.iter().all(|c| c.local_pos.y >= 0.0));

        // Further hits on a collapsed orb do nothing
        session.handle(InputEvent::OrbPicked(target));
        assert_eq!(session.state().stacks.len(), 1);
        assert_eq!(session.state().bodies[0].orbs[1].hit_count, 3);
    }

    #[test]
    fn test_hits_are_per_orb() {
        let (mut session, _, _) = reveal(8, 3);
        let orbs = orb_handles(&session, 0);
        session.handle(InputEvent::OrbPicked(orbs[0]));
        session.handle(InputEvent::OrbPicked(orbs[0]));
        session.handle(InputEvent::OrbPicked(orbs[1]));
        let state = session.state();
        assert_eq!(state.bodies[0].orbs[0].hit_count, 2);
        assert_eq!(state.bodies[0].orbs[1].hit_count, 1);
        assert_eq!(state.bodies[0].orbs[2].hit_count, 0);
    }

    #[test]
    fn test_rotation_only_in_level_selection() {
        let (mut session, _, _) = session_with(config_with_orbs(4), 12);
        let input = TickInput {
            rotate: Vec2::new(1.0, 0.5),
            ..Default::default()
        };
        session.tick(&input, SIM_DT);
        assert_eq!(session.state().bodies[0].orientation, Quat::IDENTITY);

        pick_body(&mut session, 0);
        session.tick(&input, SIM_DT);
        assert_ne!(session.state().bodies[0].orientation, Quat::IDENTITY);
    }

    #[test]
    fn test_tick_applies_picks_in_order() {
        let (mut session, _, _) = session_with(config_with_orbs(4), 13);
        let body = session.state().bodies[0].handle;
        let orb = orb_handles(&session, 0)[0];
        let input = TickInput {
            picks: vec![InputEvent::BodyPicked(body), InputEvent::OrbPicked(orb)],
            ..Default::default()
        };
        session.tick(&input, SIM_DT);
        assert!(session.state().bodies[0].orbs[0].selected);
        assert_eq!(session.state().time_ticks, 1);
    }

    #[test]
    fn test_restart_supersedes_pending_deactivation() {
        let (mut session, recorder, log) = reveal(5, 4);
        let old_body = session.state().bodies[0].handle;
        assert_eq!(session.scheduler().pending(), 1);

        session.tick(
            &TickInput {
                restart: Some(5),
                ..Default::default()
            },
            SIM_DT,
        );
        assert_eq!(session.phase(), Phase::BodySelection);
        assert_eq!(session.scheduler().pending(), 0);
        assert_eq!(session.state().selection.counts().orbs, 0);
        assert!(recorder.calls().contains(&ServiceCall::Despawn { handle: old_body }));
        assert!(log.borrow().contains(&GameEvent::Restarted { seed: 5 }));

        for _ in 0..200 {
            session.tick(&TickInput::default(), SIM_DT);
        }
        assert!(session.state().bodies[0].active);
        assert!(!log.borrow().iter().any(|e| matches!(e, GameEvent::BodyDeactivated { .. })));
    }

    #[test]
    fn test_determinism() {
        let run = |seed| {
            let (mut session, _, log) = reveal(seed, 5);
            let orbs = orb_handles(&session, 0);
            for _ in 0..3 {
                session.handle(InputEvent::OrbPicked(orbs[0]));
            }
            for _ in 0..30 {
                session.tick(&TickInput::default(), SIM_DT);
            }
            let events = log.borrow().clone();
            (serde_json::to_string(session.state()).expect("serializable"), events)
        };
        assert_eq!(run(77), run(77));
    }

    #[test]
    fn test_cells_keep_moving_until_collapse() {
        let (mut session, _, _) = session_with(config_with_orbs(4), 14);
        let before = session.state().bodies[0].orbs[0].cells[0].local_pos;
        for _ in 0..10 {
            session.tick(&TickInput::default(), SIM_DT);
        }
        let cell = &session.state().bodies[0].orbs[0].cells[0];
        assert_ne!(cell.local_pos, before);
        assert!(cell.local_pos.length() <= cell.bound + 1e-4);
    }

    #[test]
    fn test_regrouped_cells_move_after_body_deactivates() {
        let (mut session, _, _) = reveal(9, 3);
        let ticks = (session.config().settle_delay_secs / SIM_DT).ceil() as usize + 5;
        for _ in 0..ticks {
            session.tick(&TickInput::default(), SIM_DT);
        }
        assert!(!session.state().bodies[0].active);

        let before = session.state().bodies[0].orbs[0].cells[0].local_pos;
        for _ in 0..30 {
            session.tick(&TickInput::default(), SIM_DT);
        }
        let orb = &session.state().bodies[0].orbs[0];
        assert!(orb.active);
        assert!(orb.cells[0].can_move);
        assert_ne!(orb.cells[0].local_pos, before);
    }

    #[test]
    fn test_unpicked_body_cells_stay_still() {
        let (mut session, _, _) = session_with(GameConfig::default(), 6);
        pick_body(&mut session, 0);
        let before = session.state().bodies[1].orbs[0].cells[0].local_pos;
        for _ in 0..10 {
            session.tick(&TickInput::default(), SIM_DT);
        }
        assert!(!session.state().bodies[1].active);
        assert_eq!(session.state().bodies[1].orbs[0].cells[0].local_pos, before);
    }

    #[test]
    fn test_new_rejects_inverted_orb_range() {
        let (services, recorder) = Services::recording();
        let config = GameConfig {
            min_orbs: 8,
            max_orbs: 4,
            ..Default::default()
        };
        let result = Session::new(config, 1, services);
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
        assert!(recorder.calls().is_empty());
    }
}
