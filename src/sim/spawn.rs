//! Field generation
//!
//! One spawn pass creates every body, orb and cell. Draw order is fixed
//! (per body: scale, kind, orb count, orb placement, then per orb: cells,
//! directions, energized subset), so a seed reproduces the whole field.

use glam::{Quat, Vec3};
use rand::Rng;

use super::events::{GameEvent, PlacementScope};
use super::sampler::{Domain, random_unit_vector};
use super::state::{Body, BodyKind, Cell, GameState, Orb};
use super::subset::select_subset;
use crate::config::GameConfig;
use crate::energized_count;
use crate::services::{Prefab, SpawnService, VisualService, VisualState};

/// Populate `state` with a fresh field, returning the events to publish
pub fn spawn_field<R: Rng>(
    state: &mut GameState,
    config: &GameConfig,
    rng: &mut R,
    spawner: &mut dyn SpawnService,
    visuals: &mut dyn VisualService,
) -> Vec<GameEvent> {
    let mut events = Vec::new();
    let count = config.body_count as usize;

    // Lay bodies out in a row along X, centred on the origin
    let row_width = count.saturating_sub(1) as f32 * config.body_spacing;
    for i in 0..count {
        let x = -row_width / 2.0 + i as f32 * config.body_spacing;
        let body = spawn_body(state, config, rng, spawner, visuals, i, Vec3::new(x, 0.0, 0.0), &mut events);
        events.push(GameEvent::BodySpawned {
            body: body.id,
            kind: body.kind,
            orbs: body.orb_total(),
        });
        state.bodies.push(body);
    }

    let orbs = state.orb_count();
    log::info!("Spawned {} bodies with {} orbs (seed {})", count, orbs, state.seed);
    events.push(GameEvent::FieldSpawned { bodies: count, orbs });
    events
}

#[allow(clippy::too_many_arguments)]
fn spawn_body<R: Rng>(
    state: &mut GameState,
    config: &GameConfig,
    rng: &mut R,
    spawner: &mut dyn SpawnService,
    visuals: &mut dyn VisualService,
    index: usize,
    position: Vec3,
    events: &mut Vec<GameEvent>,
) -> Body {
    let (min_scale, max_scale) = config.scale_range();
    let scale = if max_scale > min_scale {
        rng.random_range(min_scale..=max_scale)
    } else {
        min_scale
    };
    let kind = BodyKind::random(rng);
    let radius = config.body_collider_radius * scale;
    let id = state.next_entity_id();
    let name = format!("body{}_{}", index, kind.as_str());
    let handle = spawner.instantiate(Prefab::Body, &name, position, Quat::IDENTITY);

    let orb_target = rng.random_range(config.min_orbs..=config.max_orbs) as usize;
    let placement = Domain::SphereSurface { radius }.place(
        rng,
        orb_target,
        config.orb_spacing,
        config.max_attempts_per_point,
    );
    if placement.is_degraded() {
        events.push(GameEvent::placement_degraded(PlacementScope::Orbs { body: id }, &placement));
    }

    let cells_per_orb = config.cell_counts.for_kind(kind) as usize;
    let mut orbs = Vec::with_capacity(placement.points.len());
    for (j, local) in placement.points.into_iter().enumerate() {
        let normal = local.normalize_or_zero();
        let orientation = if normal == Vec3::ZERO {
            Quat::IDENTITY
        } else {
            Quat::from_rotation_arc(Vec3::Z, normal)
        };
        let orb_name = format!("orb{}.body{}", j, index);
        let orb_world = position + local;
        let orb_handle = spawner.instantiate(Prefab::Orb, &orb_name, orb_world, orientation);
        spawner.set_parent(orb_handle, handle);

        let mut orb = Orb {
            id: state.next_entity_id(),
            handle: orb_handle,
            name: orb_name,
            position: local,
            radius: config.orb_radius,
            cells: Vec::with_capacity(cells_per_orb),
            selected: false,
            hit_count: 0,
            active: true,
        };
        spawn_cells(state, config, rng, spawner, visuals, &mut orb, orb_world, cells_per_orb, events);
        log::debug!("{} at {} with {} cells", orb.name, local, orb.cells.len());
        orbs.push(orb);
    }

    Body {
        id,
        handle,
        name,
        kind,
        scale,
        radius,
        position,
        orientation: Quat::IDENTITY,
        orbs,
        active: true,
        rotation_enabled: false,
        orb_container: None,
    }
}

#[allow(clippy::too_many_arguments)]
fn spawn_cells<R: Rng>(
    state: &mut GameState,
    config: &GameConfig,
    rng: &mut R,
    spawner: &mut dyn SpawnService,
    visuals: &mut dyn VisualService,
    orb: &mut Orb,
    orb_world: Vec3,
    count: usize,
    events: &mut Vec<GameEvent>,
) {
    let placement = Domain::Ball {
        radius: config.cell_spawn_radius.min(orb.radius),
    }
    .place(rng, count, config.cell_spacing, config.max_attempts_per_point);
    if placement.is_degraded() {
        events.push(GameEvent::placement_degraded(PlacementScope::Cells { orb: orb.id }, &placement));
    }

    for (k, local) in placement.points.into_iter().enumerate() {
        let name = format!("cell{}.{}", k, orb.name);
        let handle = spawner.instantiate(Prefab::Cell, &name, orb_world + local, Quat::IDENTITY);
        spawner.set_parent(handle, orb.handle);
        orb.cells.push(Cell {
            id: state.next_entity_id(),
            handle,
            name,
            local_pos: local,
            direction: random_unit_vector(rng),
            speed: config.cell_speed,
            bound: orb.radius,
            energized: false,
            can_move: true,
        });
    }

    // Energize ceil(n/2) of the cells that were actually placed. The count is
    // derived from the placed cells so it never exceeds them; the clamp check
    // only fires if the energize rule is ever fed from config.
    let indices: Vec<usize> = (0..orb.cells.len()).collect();
    let wanted = energized_count(orb.cells.len());
    let subset = select_subset(rng, &indices, wanted);
    if subset.was_clamped() {
        events.push(GameEvent::SubsetClamped {
            orb: orb.id,
            requested: subset.requested,
            available: orb.cells.len(),
        });
    }
    for i in subset.chosen {
        let cell = &mut orb.cells[i];
        cell.energized = true;
        visuals.set_visual_state(cell.handle, VisualState::Energized);
    }
}

/// Overview bounds of every active body: (center, half extents)
pub fn field_bounds(bodies: &[Body]) -> Option<(Vec3, Vec3)> {
    let mut active = bodies.iter().filter(|b| b.active);
    let first = active.next()?;
    let start = (first.position - Vec3::splat(first.radius), first.position + Vec3::splat(first.radius));
    let (min, max) = active.fold(start, |(min, max), body| {
        let pad = Vec3::splat(body.radius);
        (min.min(body.position - pad), max.max(body.position + pad))
    });
    Some(((min + max) * 0.5, (max - min) * 0.5))
}
