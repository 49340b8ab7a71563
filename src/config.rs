//! Spawn and pacing configuration
//!
//! Loaded from JSON by the host; every field has a default so partial files work.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::consts::*;
use crate::sim::BodyKind;

/// Errors raised while loading or validating a [`GameConfig`]
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Cells spawned per orb, by body kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CellCounts {
    pub red: u32,
    pub blue: u32,
    pub green: u32,
}

impl Default for CellCounts {
    fn default() -> Self {
        Self {
            red: 3,
            blue: 5,
            green: 7,
        }
    }
}

impl CellCounts {
    pub fn for_kind(&self, kind: BodyKind) -> u32 {
        match kind {
            BodyKind::Red => self.red,
            BodyKind::Blue => self.blue,
            BodyKind::Green => self.green,
        }
    }
}

/// Game configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Run seed (None = host picks one)
    pub seed: Option<u64>,

    // === Bodies ===
    /// Number of bodies in the field
    pub body_count: u32,
    /// Distance between neighbouring bodies along X
    pub body_spacing: f32,
    /// Unscaled collider radius of a body
    pub body_collider_radius: f32,
    pub min_scale: f32,
    pub max_scale: f32,
    /// Rotation speed while a body is focused (degrees/sec at full axis input)
    pub rotation_speed_deg: f32,

    // === Orbs ===
    /// Inclusive orb count range per body
    pub min_orbs: u32,
    pub max_orbs: u32,
    /// Minimum distance between orbs on the same body
    pub orb_spacing: f32,
    /// Bounding radius cells move within
    pub orb_radius: f32,

    // === Cells ===
    pub cell_counts: CellCounts,
    /// Radius of the ball cells are scattered in at spawn
    pub cell_spawn_radius: f32,
    pub cell_spacing: f32,
    pub cell_speed: f32,
    /// Vertical step between stacked cells after an orb collapses
    pub cell_stack_offset: f32,

    // === Pacing ===
    pub max_attempts_per_point: u32,
    pub settle_delay_secs: f32,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            seed: None,

            body_count: 2,
            body_spacing: 20.0,
            body_collider_radius: 0.5,
            min_scale: 5.0,
            max_scale: 15.0,
            rotation_speed_deg: 50.0,

            min_orbs: 4,
            max_orbs: 8,
            orb_spacing: 1.5,
            orb_radius: 0.5,

            cell_counts: CellCounts::default(),
            cell_spawn_radius: 0.5,
            cell_spacing: 0.05,
            cell_speed: 1.0,
            cell_stack_offset: CELL_STACK_OFFSET,

            max_attempts_per_point: MAX_ATTEMPTS_PER_POINT,
            settle_delay_secs: SETTLE_DELAY_SECS,
        }
    }
}

impl GameConfig {
    /// Parse and validate a JSON config
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a JSON config from disk
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)?;
        let config = Self::from_json(&json)?;
        log::info!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Check ranges and signs
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: &str| Err(ConfigError::Invalid(msg.to_string()));

        if self.body_count == 0 {
            return invalid("body_count must be at least 1");
        }
        if self.min_scale <= 0.0 || self.max_scale < self.min_scale {
            return invalid("scale range must be positive with min_scale <= max_scale");
        }
        if self.body_collider_radius <= 0.0 || self.orb_radius <= 0.0 || self.cell_spawn_radius < 0.0 {
            return invalid("radii must be positive");
        }
        if self.min_orbs > self.max_orbs {
            return invalid("min_orbs must not exceed max_orbs");
        }
        if self.body_spacing < 0.0 || self.orb_spacing < 0.0 || self.cell_spacing < 0.0 {
            return invalid("spacing must not be negative");
        }
        if self.cell_speed < 0.0 || self.settle_delay_secs < 0.0 || self.rotation_speed_deg < 0.0 {
            return invalid("speeds and delays must not be negative");
        }
        Ok(())
    }

    /// Scale range clamped so it can always be sampled
    pub fn scale_range(&self) -> (f32, f32) {
        (self.min_scale, self.max_scale.max(self.min_scale))
    }
}
