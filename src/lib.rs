//! Asteroid Quest - procedural asteroid field and phase-gated selection core
//!
//! Core modules:
//! - `sim`: Deterministic simulation (placement, selection, phases, events)
//! - `services`: Narrow interfaces to the host runtime (spawning, visuals, camera)
//! - `config`: Data-driven spawn and pacing parameters

pub mod config;
pub mod services;
pub mod sim;

pub use config::{ConfigError, GameConfig};

use glam::Vec3;

/// Game configuration constants
pub mod consts {
    /// Default host timestep (60 Hz)
    pub const SIM_DT: f32 = 1.0 / 60.0;

    /// Rejection sampling budget per requested point
    pub const MAX_ATTEMPTS_PER_POINT: u32 = 100;

    /// Delay between a level completing and the parent body deactivating (seconds)
    pub const SETTLE_DELAY_SECS: f32 = 1.0;

    /// Vertical distance between stacked cells after an orb collapses
    pub const CELL_STACK_OFFSET: f32 = 0.2;

    /// Hits needed to collapse an orb during leaf reveal
    pub const ORB_COLLAPSE_HITS: u8 = 3;

    /// Tolerance for "point lies on the sphere" checks
    pub const SURFACE_EPSILON: f32 = 1e-3;
}

/// Convert spherical (r, latitude, longitude) to cartesian.
///
/// Latitude is measured from +Z, longitude around it from +X.
#[inline]
pub fn spherical_to_cartesian(r: f32, latitude: f32, longitude: f32) -> Vec3 {
    Vec3::new(
        r * latitude.sin() * longitude.cos(),
        r * latitude.sin() * longitude.sin(),
        r * latitude.cos(),
    )
}

/// Reflect a direction about a surface normal
#[inline]
pub fn reflect(dir: Vec3, normal: Vec3) -> Vec3 {
    dir - 2.0 * dir.dot(normal) * normal
}

/// Ceil-half energized count for a cell total
#[inline]
pub fn energized_count(total: usize) -> usize {
    total.div_ceil(2)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::{FRAC_PI_2, PI};

    #[test]
    fn test_spherical_poles_and_equator() {
        let north = spherical_to_cartesian(2.0, 0.0, 1.3);
        assert!((north - Vec3::new(0.0, 0.0, 2.0)).length() < 1e-5);

        let equator = spherical_to_cartesian(2.0, FRAC_PI_2, 0.0);
        assert!((equator - Vec3::new(2.0, 0.0, 0.0)).length() < 1e-5);

        let south = spherical_to_cartesian(2.0, PI, 0.0);
        assert!((south.length() - 2.0).abs() < 1e-5);
    }

    #[test]
    fn test_reflect_flips_normal_component() {
        let out = reflect(Vec3::new(1.0, 1.0, 0.0), Vec3::X);
        assert!((out - Vec3::new(-1.0, 1.0, 0.0)).length() < 1e-6);
    }

    #[test]
    fn test_energized_count_rounds_up() {
        assert_eq!(energized_count(0), 0);
        assert_eq!(energized_count(3), 2);
        assert_eq!(energized_count(5), 3);
        assert_eq!(energized_count(7), 4);
    }
}
