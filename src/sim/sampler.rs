//! Spacing-constrained random placement
//!
//! Bounded rejection sampling: each requested point draws candidates until one
//! is at least `min_spacing` from every point already accepted in the batch, or
//! the attempt budget runs out and the point is skipped.

use std::f32::consts::{PI, TAU};

use glam::Vec3;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::spherical_to_cartesian;

/// Where candidates are drawn from
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Domain {
    /// Sphere surface via independent latitude/longitude draws
    SphereSurface { radius: f32 },
    /// Solid ball via a random unit direction scaled by a random radius
    Ball { radius: f32 },
}

impl Domain {
    pub fn sample<R: Rng>(&self, rng: &mut R) -> Vec3 {
        match *self {
            Domain::SphereSurface { radius } => {
                let latitude = rng.random_range(0.0..PI);
                let longitude = rng.random_range(0.0..TAU);
                spherical_to_cartesian(radius, latitude, longitude)
            }
            Domain::Ball { radius } => {
                // cbrt keeps the density uniform over volume
                let r = radius * rng.random::<f32>().cbrt();
                random_unit_vector(rng) * r
            }
        }
    }

    /// Run a placement batch against this domain
    pub fn place<R: Rng>(&self, rng: &mut R, count: usize, min_spacing: f32, max_attempts: u32) -> Placement {
        place_points(rng, count, |rng| self.sample(rng), min_spacing, max_attempts)
    }
}

/// Uniformly distributed unit vector
pub fn random_unit_vector<R: Rng>(rng: &mut R) -> Vec3 {
    let z: f32 = rng.random_range(-1.0..=1.0);
    let phi = rng.random_range(0.0..TAU);
    let r = (1.0 - z * z).max(0.0).sqrt();
    Vec3::new(r * phi.cos(), r * phi.sin(), z)
}

/// Result of one placement batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Placement {
    /// Accepted positions in acceptance order
    pub points: Vec<Vec3>,
    /// Requested points
    pub requested: usize,
}

impl Placement {
    /// Points dropped after exhausting their attempt budget
    pub fn skipped(&self) -> usize {
        self.requested - self.points.len()
    }

    pub fn is_degraded(&self) -> bool {
        self.skipped() > 0
    }
}

/// Place up to `count` points drawn by `draw`, each at least `min_spacing`
/// from all previously accepted points in this batch.
///
/// A point that cannot be placed within `max_attempts` draws is skipped and a
/// warning is logged; the caller sees the shortfall through
/// [`Placement::skipped`].
pub fn place_points<R, F>(rng: &mut R, count: usize, mut draw: F, min_spacing: f32, max_attempts: u32) -> Placement
where
    R: Rng,
    F: FnMut(&mut R) -> Vec3,
{
    let min_sq = min_spacing * min_spacing;
    let mut points: Vec<Vec3> = Vec::with_capacity(count);

    for index in 0..count {
        let mut accepted = None;

        for _ in 0..max_attempts {
            let candidate = draw(rng);
            if points.iter().all(|p| p.distance_squared(candidate) >= min_sq) {
                accepted = Some(candidate);
                break;
            }
        }

        match accepted {
            Some(point) => points.push(point),
            None => log::warn!(
                "failed to place point {}/{} after {} attempts (spacing {})",
                index + 1,
                count,
                max_attempts,
                min_spacing
            ),
        }
    }

    Placement {
        points,
        requested: count,
    }
}
