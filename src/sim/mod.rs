//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Seeded RNG only (one `Pcg32` per spawn pass)
//! - Stable iteration order (spawn order)
//! - No rendering or platform dependencies; the host is reached through `services`

pub mod events;
pub mod phase;
pub mod sampler;
pub mod scheduler;
pub mod selection;
pub mod spawn;
pub mod state;
pub mod subset;
pub mod tick;

pub use events::{EventBus, GameEvent, InputEvent, PlacementScope, SubscriptionId};
pub use phase::{InputLevel, Phase, PhaseError, PhaseMachine, Transition};
pub use sampler::{Domain, Placement, place_points, random_unit_vector};
pub use scheduler::{ActionId, DeferredAction, Scheduler};
pub use selection::{SelectionAggregator, SelectionCounts, SelectionError, Toggle};
pub use spawn::{field_bounds, spawn_field};
pub use state::{Body, BodyKind, Cell, CellStack, EntityId, GameState, Orb};
pub use subset::{Subset, select_subset};
pub use tick::{Session, TickInput};
