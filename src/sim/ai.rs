//! AI drivers: waypoint steering, rubberband pacing, item policy
//!
//! An AI driver reads the world immutably and emits the same [`DriveInput`]
//! shape the player produces. It never mutates its kart; the race director
//! feeds the returned input into the vehicle update like any other input.

use glam::Vec2;
use rand::Rng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::items::{Hazard, ItemCategory};
use super::track::Track;
use super::vehicle::{DriveInput, Vehicle};
use crate::normalize_angle;

/// Rubberband output floor
pub const MIN_THROTTLE: f32 = 0.35;
/// Rubberband output ceiling
pub const MAX_THROTTLE: f32 = 1.0;

/// Progress gap (in checkpoints) tolerated before the rubberband engages
const RUBBERBAND_DEADBAND: f32 = 1.0;

/// Steering command per radian of heading error
const STEER_GAIN: f32 = 2.0;

/// Armed mines closer than this and ahead count as a threat
const THREAT_RADIUS: f32 = 140.0;
/// Rivals closer than this and behind invite a mine drop
const AMBUSH_RADIUS: f32 = 160.0;

/// Per-tick item use probabilities by situation
const BOOST_USE_CHANCE: f32 = 0.02;
const DEFENSE_REACT_CHANCE: f32 = 0.5;
const DEFENSE_IDLE_CHANCE: f32 = 0.002;
const OFFENSE_AMBUSH_CHANCE: f32 = 0.05;
const OFFENSE_IDLE_CHANCE: f32 = 0.004;

/// Pacing presets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    /// Throttle before rubberband correction
    pub fn base_throttle(self) -> f32 {
        match self {
            Difficulty::Easy => 0.70,
            Difficulty::Medium => 0.82,
            Difficulty::Hard => 0.92,
        }
    }

    /// Throttle correction per checkpoint of progress gap
    pub fn rubberband_gain(self) -> f32 {
        match self {
            Difficulty::Easy => 0.10,
            Difficulty::Medium => 0.08,
            Difficulty::Hard => 0.06,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }
}

/// Control policy for one AI kart
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiDriver {
    /// Index of the controlled kart in the race's vehicle list
    pub vehicle_index: usize,
    pub difficulty: Difficulty,
    /// Small fixed throttle offset so drivers don't pace in lockstep
    pub pacing_jitter: f32,
}

impl AiDriver {
    pub fn new(vehicle_index: usize, difficulty: Difficulty, pacing_jitter: f32) -> Self {
        Self {
            vehicle_index,
            difficulty,
            pacing_jitter,
        }
    }

    /// Compute this tick's controls for `kart`.
    ///
    /// `player_progress` (in checkpoints) feeds the rubberband; the vehicle
    /// and hazard lists feed the item policy.
    pub fn drive(
        &self,
        kart: &Vehicle,
        track: &Track,
        player_progress: u32,
        vehicles: &[Vehicle],
        hazards: &[Hazard],
        rng: &mut Pcg32,
    ) -> DriveInput {
        let target = track.checkpoint(kart.next_checkpoint);

        DriveInput {
            throttle: self.paced_throttle(kart, track, player_progress),
            steer: steer_toward(kart, target.pos),
            use_item: self.should_use_item(kart, vehicles, hazards, rng),
        }
    }

    /// Base pacing plus bounded rubberband against the player's progress
    fn paced_throttle(&self, kart: &Vehicle, track: &Track, player_progress: u32) -> f32 {
        let own = kart.progress(track.checkpoint_count()) as f32;
        let gap = player_progress as f32 - own;

        let push = if gap.abs() <= RUBBERBAND_DEADBAND {
            0.0
        } else {
            gap - gap.signum() * RUBBERBAND_DEADBAND
        };

        (self.difficulty.base_throttle()
            + self.pacing_jitter
            + push * self.difficulty.rubberband_gain())
        .clamp(MIN_THROTTLE, MAX_THROTTLE)
    }

    /// Probabilistic per-tick item use, conditioned on the item's category
    fn should_use_item(
        &self,
        kart: &Vehicle,
        vehicles: &[Vehicle],
        hazards: &[Hazard],
        rng: &mut Pcg32,
    ) -> bool {
        let Some(kind) = kart.held_item else {
            return false;
        };

        let chance = match kind.category() {
            ItemCategory::Boost => {
                if kart.effects.boosted() {
                    0.0
                } else {
                    BOOST_USE_CHANCE
                }
            }
            ItemCategory::Defense => {
                if threat_ahead(kart, hazards) {
                    DEFENSE_REACT_CHANCE
                } else {
                    DEFENSE_IDLE_CHANCE
                }
            }
            ItemCategory::Offense => {
                if rival_behind(kart, vehicles) {
                    OFFENSE_AMBUSH_CHANCE
                } else {
                    OFFENSE_IDLE_CHANCE
                }
            }
        };

        chance > 0.0 && rng.random::<f32>() < chance
    }
}

/// Signed steering command toward a target point, clamped to [-1, 1].
///
/// A zero-length to-target vector yields no steering correction.
pub fn steer_toward(kart: &Vehicle, target: Vec2) -> f32 {
    let to_target = target - kart.pos;
    if to_target.length_squared() < 1e-6 {
        return 0.0;
    }

    let desired = to_target.y.atan2(to_target.x);
    let error = normalize_angle(desired - kart.heading);
    (error * STEER_GAIN).clamp(-1.0, 1.0)
}

/// Any armed mine in front of the kart within the threat radius?
fn threat_ahead(kart: &Vehicle, hazards: &[Hazard]) -> bool {
    hazards.iter().any(|h| {
        h.armed()
            && (h.pos - kart.pos).length() < THREAT_RADIUS
            && (h.pos - kart.pos).dot(kart.forward()) > 0.0
    })
}

/// Any rival close behind the kart?
fn rival_behind(kart: &Vehicle, vehicles: &[Vehicle]) -> bool {
    vehicles.iter().any(|v| {
        v.id != kart.id
            && (v.pos - kart.pos).length() < AMBUSH_RADIUS
            && (v.pos - kart.pos).dot(kart.forward()) < 0.0
    })
}
