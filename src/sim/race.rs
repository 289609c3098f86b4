//! Race director: configuration, phases, the per-tick update pass, ranking
//!
//! The director owns the track, the vehicle list, the AI drivers and every
//! live world entity, all built at construction. One [`RaceState::tick`] call
//! advances the whole race by a fixed timestep; hosts read poses and
//! telemetry back out through [`RaceState::snapshot`].

use std::error::Error;
use std::fmt::{self, Display, Formatter};

use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::ai::{AiDriver, Difficulty};
use super::collision::{
    band_contact, circle_contact, circles_touch, resolve_static, resolve_vehicle_pair,
};
use super::items::{Hazard, ItemBox, ItemKind, roll_item};
use super::track::{MAX_GRID_SLOTS, Track, TrackDef};
use super::vehicle::{DriveInput, KartClass, Vehicle};
use crate::consts::*;

/// Mines drop this far behind the kart's tail
const MINE_DROP_GAP: f32 = 2.5 * VEHICLE_RADIUS;

/// Race setup parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RaceConfig {
    /// Seed for every random draw in the race
    pub seed: u64,
    /// Laps required to finish (at least 1)
    pub laps: u32,
    pub track: TrackDef,
    pub player_class: KartClass,
    /// Number of AI opponents
    pub ai_count: usize,
    pub difficulty: Difficulty,
    /// Countdown phase length (ticks)
    pub countdown_ticks: u32,
    /// Player final position at or above which the race counts as passed
    pub target_position: u32,
}

impl Default for RaceConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            laps: 3,
            track: TrackDef::default(),
            player_class: KartClass::Balanced,
            ai_count: 5,
            difficulty: Difficulty::Medium,
            countdown_ticks: 3 * TICKS_PER_SECOND,
            target_position: 3,
        }
    }
}

impl RaceConfig {
    /// Reject configurations that could wedge mid-race. Everything caught
    /// here is an error only at setup; nothing mid-sim ever returns one.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.laps == 0 {
            return Err(ConfigError::ZeroLaps);
        }
        if self.track.checkpoint_count < 3 {
            return Err(ConfigError::TooFewCheckpoints(self.track.checkpoint_count));
        }
        if self.track.half_width <= 2.0 * VEHICLE_RADIUS
            || self.track.centerline_radius <= self.track.half_width
        {
            return Err(ConfigError::BadGeometry {
                centerline_radius: self.track.centerline_radius,
                half_width: self.track.half_width,
            });
        }
        let racers = self.ai_count + 1;
        if racers > MAX_GRID_SLOTS {
            return Err(ConfigError::TooManyRacers {
                racers,
                max: MAX_GRID_SLOTS,
            });
        }
        Ok(())
    }
}

/// Rejected race setup
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    ZeroLaps,
    TooFewCheckpoints(usize),
    BadGeometry {
        centerline_radius: f32,
        half_width: f32,
    },
    TooManyRacers {
        racers: usize,
        max: usize,
    },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::ZeroLaps => write!(f, "`laps` must be at least 1"),
            ConfigError::TooFewCheckpoints(n) => {
                write!(f, "`track.checkpoint_count` must be at least 3, got {n}")
            }
            ConfigError::BadGeometry {
                centerline_radius,
                half_width,
            } => write!(
                f,
                "track geometry is degenerate: centerline_radius={centerline_radius}, \
                 half_width={half_width} (band must fit a kart and stay off the origin)"
            ),
            ConfigError::TooManyRacers { racers, max } => {
                write!(f, "{racers} racers exceed the {max} start grid slots")
            }
        }
    }
}

impl Error for ConfigError {}

/// Current phase of the race
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RacePhase {
    /// Fixed pre-race countdown; no vehicle responds to input
    Countdown,
    /// Active racing
    Racing,
    /// The player has finished; ticks are no-ops
    Finished,
}

/// RNG state wrapper for serialization.
///
/// Each materialization advances the draw counter, so a state restored from
/// a snapshot continues the same deterministic sequence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RngState {
    pub seed: u64,
    pub draws: u64,
}

impl RngState {
    pub fn new(seed: u64) -> Self {
        Self { seed, draws: 0 }
    }

    /// Next RNG in the draw sequence
    pub fn next_rng(&mut self) -> Pcg32 {
        self.draws += 1;
        Pcg32::seed_from_u64(
            self.seed
                .wrapping_add(self.draws.wrapping_mul(0x9E37_79B9_7F4A_7C15)),
        )
    }
}

/// One line of the final standings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Standing {
    pub vehicle_id: u32,
    pub class: KartClass,
    /// 1-based final place
    pub final_position: u32,
    /// Seconds of race time at the finish line; `None` for vehicles whose
    /// position froze when the player finished
    pub finish_time: Option<f32>,
}

/// The pass/fail + standings signal emitted when the player finishes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RaceOutcome {
    /// Player final position ≤ the configured target position
    pub passed: bool,
    pub player_position: u32,
    pub standings: Vec<Standing>,
}

/// HUD-facing race telemetry for one vehicle
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VehicleTelemetry {
    /// 1-based place
    pub position: u32,
    pub total_racers: u32,
    pub current_lap: u32,
    pub total_laps: u32,
    /// Elapsed seconds, frozen at the finish line for finished vehicles
    pub race_time: f32,
    pub current_item: Option<ItemKind>,
    pub is_finished: bool,
}

/// Read-only pose + telemetry for one vehicle
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VehicleSnapshot {
    pub id: u32,
    pub class: KartClass,
    pub pos: Vec2,
    pub heading: f32,
    pub telemetry: VehicleTelemetry,
}

impl VehicleSnapshot {
    fn new(vehicle: &Vehicle, telemetry: VehicleTelemetry) -> Self {
        Self {
            id: vehicle.id,
            class: vehicle.class,
            pos: vehicle.pos,
            heading: vehicle.heading,
            telemetry,
        }
    }
}

/// Whole-race view for the presentation layer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RaceSnapshot {
    pub phase: RacePhase,
    pub countdown_ticks: u32,
    pub race_time: f32,
    pub vehicles: Vec<VehicleSnapshot>,
    pub outcome: Option<RaceOutcome>,
}

/// Complete race state (deterministic, serializable)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RaceState {
    pub config: RaceConfig,
    pub track: Track,
    /// Index 0 is the player; AIs follow in fixed index order
    pub vehicles: Vec<Vehicle>,
    pub drivers: Vec<AiDriver>,
    pub item_boxes: Vec<ItemBox>,
    pub hazards: Vec<Hazard>,
    pub phase: RacePhase,
    /// Ticks left in the countdown phase
    pub countdown_ticks: u32,
    /// Simulation tick counter, advanced only while racing
    pub time_ticks: u64,
    pub rng_state: RngState,
    pub outcome: Option<RaceOutcome>,
    /// Vehicle indices in rank order; re-sorted stably each tick so ties
    /// keep arrival order
    order: Vec<usize>,
    next_hazard_id: u32,
}

impl RaceState {
    /// Validate the configuration and set up the grid.
    pub fn new(config: RaceConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        let track = Track::generate(&config.track);
        let mut rng_state = RngState::new(config.seed);
        let mut rng = rng_state.next_rng();

        let mut vehicles = Vec::with_capacity(config.ai_count + 1);
        let (pos, heading) = track.start_position(0);
        vehicles.push(Vehicle::new(0, config.player_class, pos, heading));

        // AI chassis cycle through the archetypes; a small pacing jitter
        // keeps the pack from throttling in lockstep
        let roster = [
            KartClass::Speedster,
            KartClass::Balanced,
            KartClass::Heavyweight,
        ];
        let mut drivers = Vec::with_capacity(config.ai_count);
        for i in 0..config.ai_count {
            let (pos, heading) = track.start_position(i + 1);
            vehicles.push(Vehicle::new((i + 1) as u32, roster[i % 3], pos, heading));
            drivers.push(AiDriver::new(
                i + 1,
                config.difficulty,
                rng.random_range(-0.04..0.04),
            ));
        }

        let item_boxes = track
            .item_box_spots
            .iter()
            .enumerate()
            .map(|(i, &pos)| ItemBox::new(i as u32, pos))
            .collect();

        let order = (0..vehicles.len()).collect();
        let countdown_ticks = config.countdown_ticks;

        log::info!(
            "Race set up: {} karts, {} laps, {} checkpoints, {} theme, {} AI, seed {}",
            vehicles.len(),
            config.laps,
            track.checkpoint_count(),
            track.def.theme.as_str(),
            config.difficulty.as_str(),
            config.seed
        );

        Ok(Self {
            config,
            track,
            vehicles,
            drivers,
            item_boxes,
            hazards: Vec::new(),
            phase: RacePhase::Countdown,
            countdown_ticks,
            time_ticks: 0,
            rng_state,
            outcome: None,
            order,
            next_hazard_id: 0,
        })
    }

    /// Advance the race by one fixed timestep.
    ///
    /// `player_input` drives vehicle 0; every AI computes its own input from
    /// the tick-start state. Calls after the race finished are no-ops.
    pub fn tick(&mut self, player_input: &DriveInput) {
        match self.phase {
            RacePhase::Countdown => {
                self.countdown_ticks = self.countdown_ticks.saturating_sub(1);
                if self.countdown_ticks == 0 {
                    self.phase = RacePhase::Racing;
                    log::info!("Countdown complete: racing");
                }
            }
            RacePhase::Racing => self.racing_tick(player_input),
            RacePhase::Finished => {}
        }
    }

    /// Elapsed race time in seconds
    #[inline]
    pub fn race_time(&self) -> f32 {
        self.time_ticks as f32 * SIM_DT
    }

    /// Allocate an id for a spawned hazard
    fn alloc_hazard_id(&mut self) -> u32 {
        let id = self.next_hazard_id;
        self.next_hazard_id += 1;
        id
    }

    /// One Racing-phase update pass over every entity, in a fixed order:
    /// inputs, integration, item activation, collisions, hazards, progress,
    /// boxes, effect timers, rank, finish detection.
    fn racing_tick(&mut self, player_input: &DriveInput) {
        self.time_ticks += 1;
        let mut rng = self.rng_state.next_rng();
        let dt = SIM_DT;

        // Inputs are computed from the tick-start state so AI order can
        // never influence what an AI sees
        let player_progress = self.vehicles[0].progress(self.track.checkpoint_count());
        let mut inputs = vec![*player_input; self.vehicles.len()];
        for driver in &self.drivers {
            inputs[driver.vehicle_index] = driver.drive(
                &self.vehicles[driver.vehicle_index],
                &self.track,
                player_progress,
                &self.vehicles,
                &self.hazards,
                &mut rng,
            );
        }

        // Integrate in index order, player first. Finished karts coast.
        let grip = self.track.surface_grip();
        for (vehicle, input) in self.vehicles.iter_mut().zip(&inputs) {
            if vehicle.finished {
                vehicle.integrate(&DriveInput::default(), grip, dt);
            } else {
                vehicle.integrate(input, grip, dt);
            }
        }

        // Item activation; a consumed mine becomes a world entity
        for (i, input) in inputs.iter().enumerate() {
            if !input.use_item || self.vehicles[i].finished {
                continue;
            }
            if let Some(ItemKind::Mine) = self.vehicles[i].activate_item() {
                let id = self.alloc_hazard_id();
                let kart = &self.vehicles[i];
                let pos = kart.pos - kart.forward() * MINE_DROP_GAP;
                log::debug!("kart {} dropped a mine at {pos}", kart.id);
                self.hazards.push(Hazard::new(id, pos, kart.id));
            }
        }

        self.resolve_vehicle_collisions();
        self.resolve_geometry_collisions();
        self.resolve_hazard_contacts();
        self.advance_checkpoints();
        self.update_item_boxes(&mut rng);

        for vehicle in &mut self.vehicles {
            vehicle.effects.step();
        }
        for hazard in &mut self.hazards {
            hazard.step();
        }

        self.recompute_ranks();
        self.detect_finishes();
    }

    /// Kart-on-kart contact, every pair once, separation split by mass
    fn resolve_vehicle_collisions(&mut self) {
        for i in 0..self.vehicles.len() {
            for j in i + 1..self.vehicles.len() {
                let (head, tail) = self.vehicles.split_at_mut(j);
                let a = &mut head[i];
                let b = &mut tail[0];
                let (mass_a, mass_b) = (a.class.stats().mass, b.class.stats().mass);
                resolve_vehicle_pair(
                    &mut a.pos,
                    &mut a.vel,
                    mass_a,
                    &mut b.pos,
                    &mut b.vel,
                    mass_b,
                    VEHICLE_RADIUS,
                );
            }
        }
    }

    /// Band walls, then pillars
    fn resolve_geometry_collisions(&mut self) {
        let inner = self.track.inner_radius();
        let outer = self.track.outer_radius();

        for vehicle in &mut self.vehicles {
            let contact = band_contact(vehicle.pos, VEHICLE_RADIUS, inner, outer);
            resolve_static(&mut vehicle.pos, &mut vehicle.vel, &contact);

            for pillar in &self.track.pillars {
                let contact = circle_contact(vehicle.pos, VEHICLE_RADIUS, pillar.pos, pillar.radius);
                resolve_static(&mut vehicle.pos, &mut vehicle.vel, &contact);
            }
        }
    }

    /// Armed mines against every non-ghosted kart. The mine is spent on any
    /// such contact; only unprotected karts take the hit.
    fn resolve_hazard_contacts(&mut self) {
        let mut spent = Vec::new();

        for (hi, hazard) in self.hazards.iter().enumerate() {
            if !hazard.armed() {
                continue;
            }
            for vehicle in &mut self.vehicles {
                if vehicle.effects.ghosted() {
                    continue;
                }
                if !circles_touch(vehicle.pos, VEHICLE_RADIUS, hazard.pos, HAZARD_RADIUS) {
                    continue;
                }
                if !vehicle.effects.invulnerable() {
                    log::debug!("kart {} hit mine {}", vehicle.id, hazard.id);
                    vehicle.take_hit();
                }
                spent.push(hi);
                break;
            }
        }

        for hi in spent.into_iter().rev() {
            self.hazards.remove(hi);
        }
    }

    /// Gate pass check for every unfinished kart. Passing the last gate
    /// wraps the target back to 0 and increments the lap by exactly 1.
    fn advance_checkpoints(&mut self) {
        for vehicle in &mut self.vehicles {
            if vehicle.finished {
                continue;
            }
            let gate = self.track.checkpoint(vehicle.next_checkpoint);
            if (vehicle.pos - gate.pos).length() < CHECKPOINT_RADIUS {
                let next = self.track.next_checkpoint_index(vehicle.next_checkpoint);
                if next == 0 {
                    vehicle.lap += 1;
                }
                vehicle.next_checkpoint = next;
            }
        }
    }

    /// Item pickup pass plus respawn countdowns. A kart with a full slot
    /// drives through boxes without collecting.
    fn update_item_boxes(&mut self, rng: &mut Pcg32) {
        let total_racers = self.vehicles.len() as u32;

        for item_box in &mut self.item_boxes {
            if item_box.active {
                for vehicle in &mut self.vehicles {
                    if vehicle.held_item.is_some() || vehicle.finished {
                        continue;
                    }
                    if circles_touch(vehicle.pos, VEHICLE_RADIUS, item_box.pos, ITEM_BOX_RADIUS) {
                        let item = roll_item(rng, vehicle.rank, total_racers);
                        log::debug!("kart {} collected {}", vehicle.id, item.as_str());
                        vehicle.held_item = Some(item);
                        item_box.collect();
                        break;
                    }
                }
            }
            item_box.step();
        }
    }

    /// Stable re-sort of the rank order by descending progress score, then
    /// 1-based rank assignment. Ties keep the previous ordering, which is
    /// the order the tied karts arrived at that progress.
    ///
    /// The lap weight is the checkpoint count itself, so a full lap always
    /// outweighs any checkpoint index no matter how fine the track is cut.
    fn recompute_ranks(&mut self) {
        let count = self.track.checkpoint_count() as u64;
        let scores: Vec<u64> = self
            .vehicles
            .iter()
            .map(|v| v.lap as u64 * count + v.next_checkpoint as u64)
            .collect();

        self.order.sort_by_key(|&i| std::cmp::Reverse(scores[i]));
        for (place, &i) in self.order.iter().enumerate() {
            self.vehicles[i].rank = place as u32 + 1;
        }
    }

    /// Finish check in vehicle index order, player first. The race as a
    /// whole ends when the player finishes.
    fn detect_finishes(&mut self) {
        let ticks = self.time_ticks;
        for vehicle in &mut self.vehicles {
            if !vehicle.finished && vehicle.lap > self.config.laps {
                vehicle.finished = true;
                vehicle.finish_tick = Some(ticks);
                log::info!(
                    "kart {} ({}) finished in place {} at {:.2}s",
                    vehicle.id,
                    vehicle.class.as_str(),
                    vehicle.rank,
                    ticks as f32 * SIM_DT
                );
            }
        }

        if self.vehicles[0].finished {
            self.phase = RacePhase::Finished;
            let outcome = self.build_outcome();
            log::info!(
                "Race over: player placed {} of {} ({})",
                outcome.player_position,
                self.vehicles.len(),
                if outcome.passed { "pass" } else { "fail" }
            );
            self.outcome = Some(outcome);
        }
    }

    /// Final standings: finishers in finish order, then everyone else frozen
    /// at their rank when the player crossed the line.
    fn build_outcome(&self) -> RaceOutcome {
        let mut order: Vec<usize> = (0..self.vehicles.len()).collect();
        order.sort_by_key(|&i| {
            let v = &self.vehicles[i];
            (v.finish_tick.is_none(), v.finish_tick.unwrap_or(u64::MAX), v.rank)
        });

        let standings: Vec<Standing> = order
            .iter()
            .enumerate()
            .map(|(place, &i)| {
                let v = &self.vehicles[i];
                Standing {
                    vehicle_id: v.id,
                    class: v.class,
                    final_position: place as u32 + 1,
                    finish_time: v.finish_tick.map(|t| t as f32 * SIM_DT),
                }
            })
            .collect();

        let player_position = standings
            .iter()
            .find(|s| s.vehicle_id == self.vehicles[0].id)
            .map(|s| s.final_position)
            .unwrap_or(0);

        RaceOutcome {
            passed: player_position <= self.config.target_position,
            player_position,
            standings,
        }
    }

    /// Telemetry block for the vehicle at `index`
    pub fn telemetry(&self, index: usize) -> VehicleTelemetry {
        let vehicle = &self.vehicles[index % self.vehicles.len()];
        VehicleTelemetry {
            position: vehicle.rank,
            total_racers: self.vehicles.len() as u32,
            current_lap: vehicle.lap.min(self.config.laps),
            total_laps: self.config.laps,
            race_time: vehicle
                .finish_tick
                .map(|t| t as f32 * SIM_DT)
                .unwrap_or_else(|| self.race_time()),
            current_item: vehicle.held_item,
            is_finished: vehicle.finished,
        }
    }

    /// Whole-race view for the presentation layer
    pub fn snapshot(&self) -> RaceSnapshot {
        RaceSnapshot {
            phase: self.phase,
            countdown_ticks: self.countdown_ticks,
            race_time: self.race_time(),
            vehicles: self
                .vehicles
                .iter()
                .enumerate()
                .map(|(i, v)| VehicleSnapshot::new(v, self.telemetry(i)))
                .collect(),
            outcome: self.outcome.clone(),
        }
    }
}
