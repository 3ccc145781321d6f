//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Caller-supplied timestep only
//! - Seeded RNG only
//! - Stable iteration order (player first, then agents by ID)
//! - No rendering or platform dependencies

pub mod ai;
pub mod boundary;
pub mod interaction;
pub mod state;
pub mod terrain;
pub mod tick;
pub mod track;
pub mod vehicle;

pub use ai::{AgentControl, AiAgent};
pub use boundary::{BoundaryResult, clamp_to_arena, guide_to_track};
pub use interaction::{
    DamageableProp, PickupItem, PickupStatus, Projectile, TopplableProp, WorldEntities,
};
pub use state::{GameEvent, GamePhase, PLAYER_ID, SessionState, VehiclePose, World};
pub use terrain::{Bridge, MudPit, RampCone, TerrainSample, Tunnel, WorldLayout};
pub use tick::{TickInput, tick};
pub use track::Track;
pub use vehicle::{DriveCommand, InputCommand, Throttle, Vehicle, VehicleConfig, VisualState};
