//! Entity hierarchy and core simulation state
//!
//! Bodies own orbs, orbs own cells. Nothing is shared across bodies; cells only
//! leave their orb when it collapses into a [`CellStack`].

use glam::{Quat, Vec2, Vec3};
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::phase::PhaseMachine;
use super::selection::SelectionAggregator;
use crate::reflect;
use crate::services::Handle;

/// Stable simulation-side identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityId(pub u32);

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Body (asteroid) category, fixed at creation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BodyKind {
    Red,
    Blue,
    Green,
}

impl BodyKind {
    pub const ALL: [BodyKind; 3] = [BodyKind::Red, BodyKind::Blue, BodyKind::Green];

    pub fn random<R: Rng>(rng: &mut R) -> Self {
        Self::ALL[rng.random_range(0..Self::ALL.len())]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BodyKind::Red => "Red",
            BodyKind::Blue => "Blue",
            BodyKind::Green => "Green",
        }
    }
}

/// Leaf element drifting inside an orb
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cell {
    pub id: EntityId,
    pub handle: Handle,
    pub name: String,
    /// Position relative to the owning orb (or stack after collapse)
    pub local_pos: Vec3,
    /// Unit movement direction
    pub direction: Vec3,
    pub speed: f32,
    /// Orb bounding radius the cell is confined to
    pub bound: f32,
    pub energized: bool,
    pub can_move: bool,
}

impl Cell {
    /// Advance a mobile cell, bouncing off the orb boundary
    pub fn step(&mut self, dt: f32) {
        if !self.can_move {
            return;
        }

        self.local_pos += self.direction * self.speed * dt;

        if self.local_pos.length() > self.bound {
            let normal = self.local_pos.normalize_or_zero();
            self.direction = reflect(self.direction, normal).normalize_or_zero();
            self.local_pos = normal * self.bound;
        }
    }

    pub fn stop(&mut self) {
        self.can_move = false;
    }
}

/// Mid-level entity sitting on a body's surface
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Orb {
    pub id: EntityId,
    pub handle: Handle,
    pub name: String,
    /// Position relative to the body centre (on its surface sphere)
    pub position: Vec3,
    /// Bounding radius for cells
    pub radius: f32,
    pub cells: Vec<Cell>,
    pub selected: bool,
    pub hit_count: u8,
    pub active: bool,
}

impl Orb {
    /// Flip the selection flag, returning the new value
    pub fn toggle_selected(&mut self) -> bool {
        self.selected = !self.selected;
        self.selected
    }

    /// Count one leaf-reveal hit, returning the new total
    pub fn register_hit(&mut self) -> u8 {
        self.hit_count = self.hit_count.saturating_add(1);
        self.hit_count
    }

    pub fn energized_count(&self) -> usize {
        self.cells.iter().filter(|c| c.energized).count()
    }
}

/// Top-level asteroid
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Body {
    pub id: EntityId,
    pub handle: Handle,
    pub name: String,
    pub kind: BodyKind,
    pub scale: f32,
    /// Surface radius (collider radius * scale)
    pub radius: f32,
    pub position: Vec3,
    pub orientation: Quat,
    pub orbs: Vec<Orb>,
    pub active: bool,
    pub rotation_enabled: bool,
    /// Container the orbs were regrouped under on leaf reveal
    pub orb_container: Option<Handle>,
}

impl Body {
    pub fn orb_total(&self) -> usize {
        self.orbs.len()
    }

    /// World-space position of one of this body's orbs
    pub fn orb_world_position(&self, orb: &Orb) -> Vec3 {
        self.position + self.orientation * orb.position
    }

    pub fn orb_index_by_handle(&self, handle: Handle) -> Option<usize> {
        self.orbs.iter().position(|o| o.handle == handle)
    }

    /// Rotate in world space from axis input (x = yaw, y = pitch)
    pub fn rotate(&mut self, axis: Vec2, speed_deg: f32, dt: f32) {
        if !self.rotation_enabled || axis == Vec2::ZERO {
            return;
        }
        let yaw = (axis.x * speed_deg * dt).to_radians();
        let pitch = (axis.y * speed_deg * dt).to_radians();
        let delta = Quat::from_axis_angle(Vec3::Y, yaw) * Quat::from_axis_angle(Vec3::X, -pitch);
        self.orientation = (delta * self.orientation).normalize();
    }

    /// Axis-aligned bounds of the active orbs in world space, padded by orb radius
    pub fn orb_bounds(&self) -> Option<(Vec3, Vec3)> {
        let mut active = self.orbs.iter().filter(|o| o.active);
        let first = active.next()?;
        let pad = Vec3::splat(first.radius);
        let start = self.orb_world_position(first);
        let (min, max) = active.fold((start - pad, start + pad), |(min, max), orb| {
            let p = self.orb_world_position(orb);
            let pad = Vec3::splat(orb.radius);
            (min.min(p - pad), max.max(p + pad))
        });
        Some(((min + max) * 0.5, (max - min) * 0.5))
    }
}

/// Cells of a collapsed orb, split by energization and stacked
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CellStack {
    pub orb: EntityId,
    pub handle: Handle,
    /// World-space origin (the orb's position when it collapsed)
    pub origin: Vec3,
    /// Stacked below the origin
    pub energized: Vec<Cell>,
    /// Stacked above the origin
    pub dormant: Vec<Cell>,
}

impl CellStack {
    pub fn len(&self) -> usize {
        self.energized.len() + self.dormant.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Complete simulation state (deterministic, serializable)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameState {
    /// Run seed for reproducibility
    pub seed: u64,
    /// Simulation tick counter
    pub time_ticks: u64,
    /// Interaction phase
    pub phase: PhaseMachine,
    /// Per-level selection counters
    pub selection: SelectionAggregator,
    /// Bodies in spawn order
    pub bodies: Vec<Body>,
    /// Collapsed orbs' cells
    pub stacks: Vec<CellStack>,
    /// Next entity ID
    next_id: u32,
}

impl GameState {
    /// Empty state; bodies are filled in by the spawn pass
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            time_ticks: 0,
            phase: PhaseMachine::new(),
            selection: SelectionAggregator::new(),
            bodies: Vec::new(),
            stacks: Vec::new(),
            next_id: 1,
        }
    }

    /// Allocate a new entity ID
    pub fn next_entity_id(&mut self) -> EntityId {
        let id = self.next_id;
        self.next_id += 1;
        EntityId(id)
    }

    pub fn body(&self, id: EntityId) -> Option<&Body> {
        self.bodies.iter().find(|b| b.id == id)
    }

    pub fn body_mut(&mut self, id: EntityId) -> Option<&mut Body> {
        self.bodies.iter_mut().find(|b| b.id == id)
    }

    pub fn body_by_handle(&self, handle: Handle) -> Option<&Body> {
        self.bodies.iter().find(|b| b.handle == handle)
    }

    /// Locate an orb by host handle: (body index, orb index)
    pub fn find_orb(&self, handle: Handle) -> Option<(usize, usize)> {
        self.bodies
            .iter()
            .enumerate()
            .find_map(|(bi, body)| body.orb_index_by_handle(handle).map(|oi| (bi, oi)))
    }

    pub fn orb_count(&self) -> usize {
        self.bodies.iter().map(Body::orb_total).sum()
    }

    /// Advance every mobile cell still inside an active orb.
    ///
    /// Regrouped orbs outlive their body, so they keep moving after the body
    /// itself is deactivated.
    pub fn step_cells(&mut self, dt: f32) {
        for body in self.bodies.iter_mut().filter(|b| b.active || b.orb_container.is_some()) {
            for orb in body.orbs.iter_mut().filter(|o| o.active) {
                for cell in &mut orb.cells {
                    cell.step(dt);
                }
            }
        }
    }
}
