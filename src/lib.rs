//! Kart Sim - a deterministic kart race simulation core
//!
//! Core modules:
//! - `sim`: Deterministic simulation (vehicle dynamics, AI drivers, track
//!   geometry, item effects, race director)
//!
//! The crate never touches a drawing surface, audio device, or storage.
//! Hosts feed a per-tick [`sim::DriveInput`] for the player, call
//! [`sim::RaceState::tick`], and read back poses and telemetry snapshots.

pub mod sim;

pub use sim::{DriveInput, RaceConfig, RaceState};

use glam::Vec2;

/// Simulation tuning constants
pub mod consts {
    /// Fixed simulation timestep (60 Hz)
    pub const SIM_DT: f32 = 1.0 / 60.0;
    /// Ticks per second at the fixed timestep
    pub const TICKS_PER_SECOND: u32 = 60;

    /// Turn rate at handling 1.0 and full speed (radians/s)
    pub const BASE_TURN_RATE: f32 = 2.8;
    /// Braking decelerates this much harder than the archetype accelerates
    pub const BRAKE_FACTOR: f32 = 2.5;
    /// Reverse gear is capped at this fraction of max speed
    pub const REVERSE_SPEED_FACTOR: f32 = 0.4;
    /// How quickly sideways velocity bleeds off on full grip (1/s)
    pub const LATERAL_GRIP: f32 = 6.0;
    /// Velocity decay while coasting on full grip (1/s)
    pub const ROLLING_FRICTION: f32 = 0.8;

    /// Kart collision radius
    pub const VEHICLE_RADIUS: f32 = 14.0;
    /// Distance at which a checkpoint counts as passed
    pub const CHECKPOINT_RADIUS: f32 = 60.0;
    /// Item box pickup radius
    pub const ITEM_BOX_RADIUS: f32 = 18.0;
    /// Mine trigger radius
    pub const HAZARD_RADIUS: f32 = 16.0;
}

/// Normalize an angle to [-π, π)
#[inline]
pub fn normalize_angle(angle: f32) -> f32 {
    use std::f32::consts::{PI, TAU};
    (angle + PI).rem_euclid(TAU) - PI
}

/// Unit forward vector for a heading angle
#[inline]
pub fn heading_vec(heading: f32) -> Vec2 {
    Vec2::new(heading.cos(), heading.sin())
}

/// Convert polar (r, theta) to cartesian (x, y)
#[inline]
pub fn polar_to_cartesian(r: f32, theta: f32) -> Vec2 {
    Vec2::new(r * theta.cos(), r * theta.sin())
}
