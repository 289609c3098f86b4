//! Deterministic race simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Fixed timestep only
//! - Seeded RNG only
//! - Stable update order (player first, then AIs by index)
//! - No rendering or platform dependencies

pub mod ai;
pub mod collision;
pub mod items;
pub mod race;
pub mod track;
pub mod vehicle;

pub use ai::{AiDriver, Difficulty, steer_toward};
pub use collision::{
    Contact, band_contact, circle_contact, circles_touch, resolve_static, resolve_vehicle_pair,
};
pub use items::{Hazard, ItemBox, ItemCategory, ItemKind, roll_item};
pub use race::{
    ConfigError, RaceConfig, RaceOutcome, RacePhase, RaceSnapshot, RaceState, RngState, Standing,
    VehicleSnapshot, VehicleTelemetry,
};
pub use track::{Checkpoint, Pillar, Track, TrackDef, TrackTheme};
pub use vehicle::{ActiveEffects, DriveInput, KartClass, KartStats, Vehicle};
