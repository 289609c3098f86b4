//! Kart entities and per-tick dynamics integration
//!
//! A kart is position + velocity + a scalar heading, driven by a
//! [`DriveInput`] each tick. Speed is clamped to the archetype cap (scaled by
//! an active boost) before every position integration, so positions can never
//! diverge. Collision response lives in `collision`; this module only moves
//! a single kart.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::items::{BOOST_FACTOR, BOOST_TICKS, GHOST_TICKS, INVULN_TICKS, ItemKind};
use crate::consts::*;
use crate::{heading_vec, normalize_angle};

/// Spin-out duration after an unprotected hazard hit (ticks)
pub const SPIN_OUT_TICKS: u32 = 90;
/// Velocity kept per tick while spinning out
const SPIN_DAMPING: f32 = 0.93;
/// Rotation rate while spinning out (radians/s)
const SPIN_RATE: f32 = 9.0;
/// Throttle magnitudes below this count as coasting
const COAST_THRESHOLD: f32 = 0.05;

/// Chassis archetypes with fixed stat blocks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum KartClass {
    Balanced,
    Speedster,
    Heavyweight,
}

/// Stat block resolved from a [`KartClass`]
#[derive(Debug, Clone, Copy)]
pub struct KartStats {
    /// Top speed without boost (units/s)
    pub max_speed: f32,
    /// Forward acceleration (units/s²)
    pub acceleration: f32,
    /// Steering authority multiplier
    pub handling: f32,
    /// Collision weight
    pub mass: f32,
}

impl KartClass {
    pub fn stats(self) -> KartStats {
        match self {
            KartClass::Balanced => KartStats {
                max_speed: 300.0,
                acceleration: 450.0,
                handling: 1.0,
                mass: 1.0,
            },
            KartClass::Speedster => KartStats {
                max_speed: 345.0,
                acceleration: 400.0,
                handling: 0.85,
                mass: 0.85,
            },
            KartClass::Heavyweight => KartStats {
                max_speed: 265.0,
                acceleration: 520.0,
                handling: 0.75,
                mass: 1.4,
            },
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            KartClass::Balanced => "balanced",
            KartClass::Speedster => "speedster",
            KartClass::Heavyweight => "heavyweight",
        }
    }
}

/// Per-tick control input. The host produces one for the player; `AiDriver`
/// produces the same shape for everyone else.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct DriveInput {
    /// Forward drive in [-1, 1]; negative brakes, then reverses
    pub throttle: f32,
    /// Steering in [-1, 1]; positive turns counterclockwise
    pub steer: f32,
    /// Activate the held item this tick
    pub use_item: bool,
}

/// Transient effect timers and flags
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ActiveEffects {
    pub boost_ticks: u32,
    pub invuln_ticks: u32,
    pub ghost_ticks: u32,
    pub shield_active: bool,
    pub spin_ticks: u32,
}

impl ActiveEffects {
    /// Current speed and acceleration multiplier
    #[inline]
    pub fn boost_factor(&self) -> f32 {
        if self.boosted() { BOOST_FACTOR } else { 1.0 }
    }

    #[inline]
    pub fn boosted(&self) -> bool {
        self.boost_ticks > 0 || self.invuln_ticks > 0
    }

    #[inline]
    pub fn invulnerable(&self) -> bool {
        self.invuln_ticks > 0
    }

    #[inline]
    pub fn ghosted(&self) -> bool {
        self.ghost_ticks > 0
    }

    #[inline]
    pub fn spinning(&self) -> bool {
        self.spin_ticks > 0
    }

    /// Per-tick countdown of all timed effects
    pub fn step(&mut self) {
        self.boost_ticks = self.boost_ticks.saturating_sub(1);
        self.invuln_ticks = self.invuln_ticks.saturating_sub(1);
        self.ghost_ticks = self.ghost_ticks.saturating_sub(1);
        self.spin_ticks = self.spin_ticks.saturating_sub(1);
    }
}

/// One racer: the player's kart or an AI kart
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vehicle {
    pub id: u32,
    pub class: KartClass,
    pub pos: Vec2,
    pub vel: Vec2,
    /// Facing angle (radians)
    pub heading: f32,
    /// Held item; the slot holds at most one
    pub held_item: Option<ItemKind>,
    pub effects: ActiveEffects,
    /// Current lap, 1-based
    pub lap: u32,
    /// Next gate to pass
    pub next_checkpoint: usize,
    /// 1-based place from the latest ranking pass
    pub rank: u32,
    pub finished: bool,
    /// Tick at which the required laps were completed
    pub finish_tick: Option<u64>,
}

impl Vehicle {
    pub fn new(id: u32, class: KartClass, pos: Vec2, heading: f32) -> Self {
        Self {
            id,
            class,
            pos,
            vel: Vec2::ZERO,
            heading: normalize_angle(heading),
            held_item: None,
            effects: ActiveEffects::default(),
            lap: 1,
            next_checkpoint: 0,
            rank: id + 1,
            finished: false,
            finish_tick: None,
        }
    }

    #[inline]
    pub fn speed(&self) -> f32 {
        self.vel.length()
    }

    #[inline]
    pub fn forward(&self) -> Vec2 {
        heading_vec(self.heading)
    }

    /// Race progress in whole checkpoints, the rubberbanding currency
    #[inline]
    pub fn progress(&self, checkpoint_count: usize) -> u32 {
        self.lap * checkpoint_count as u32 + self.next_checkpoint as u32
    }

    /// Advance velocity, heading and position by one step of `dt`.
    ///
    /// Inputs are clamped to their contract range. A spinning kart ignores
    /// control entirely until the timer runs down.
    pub fn integrate(&mut self, input: &DriveInput, surface_grip: f32, dt: f32) {
        let stats = self.class.stats();

        if self.effects.spinning() {
            self.heading = normalize_angle(self.heading + SPIN_RATE * dt);
            self.vel *= SPIN_DAMPING;
            self.pos += self.vel * dt;
            return;
        }

        let throttle = input.throttle.clamp(-1.0, 1.0);
        let steer = input.steer.clamp(-1.0, 1.0);

        // Steering authority grows with speed; a parked kart cannot turn
        let max_speed = stats.max_speed * self.effects.boost_factor();
        let speed_ratio = (self.speed() / max_speed).clamp(0.0, 1.0);
        let turn_rate = BASE_TURN_RATE * stats.handling * speed_ratio;
        self.heading = normalize_angle(self.heading + steer * turn_rate * dt);

        let forward = heading_vec(self.heading);

        // Drive force along the facing axis; braking bites harder
        let accel = if throttle >= 0.0 {
            stats.acceleration * throttle * self.effects.boost_factor()
        } else {
            stats.acceleration * BRAKE_FACTOR * throttle
        };
        self.vel += forward * accel * dt;

        // Sideways velocity bleeds off with grip; coasting rolls to a stop
        let forward_speed = self.vel.dot(forward);
        let lateral = self.vel - forward * forward_speed;
        let keep = (1.0 - LATERAL_GRIP * surface_grip * dt).max(0.0);
        self.vel = forward * forward_speed + lateral * keep;

        if throttle.abs() < COAST_THRESHOLD {
            let roll = (1.0 - ROLLING_FRICTION * surface_grip * dt).max(0.0);
            self.vel *= roll;
        }

        // Clamp before integrating so the position can never diverge
        self.vel = self.vel.clamp_length_max(max_speed);
        if self.vel.dot(forward) < 0.0 {
            self.vel = self
                .vel
                .clamp_length_max(stats.max_speed * REVERSE_SPEED_FACTOR);
        }

        self.pos += self.vel * dt;
    }

    /// Consume the held item and apply its effect to this kart.
    ///
    /// Returns the consumed kind so the director can spawn world entities
    /// (mines). With an empty slot this is a no-op returning `None`.
    pub fn activate_item(&mut self) -> Option<ItemKind> {
        let kind = self.held_item.take()?;

        match kind {
            ItemKind::Boost => {
                self.effects.boost_ticks = self.effects.boost_ticks.max(BOOST_TICKS);
            }
            ItemKind::Invulnerability => {
                self.effects.invuln_ticks = self.effects.invuln_ticks.max(INVULN_TICKS);
            }
            ItemKind::Shield => {
                self.effects.shield_active = true;
            }
            ItemKind::Ghost => {
                self.effects.ghost_ticks = self.effects.ghost_ticks.max(GHOST_TICKS);
            }
            ItemKind::Mine => {}
        }

        Some(kind)
    }

    /// Take one incoming hit. A shield absorbs it and clears; otherwise the
    /// kart spins out and loses any running boost. Invulnerable and ghosted
    /// karts never reach this (the director filters contacts first).
    pub fn take_hit(&mut self) {
        if self.effects.shield_active {
            self.effects.shield_active = false;
        } else {
            self.effects.spin_ticks = SPIN_OUT_TICKS;
            self.effects.boost_ticks = 0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::SIM_DT;
    use proptest::prelude::*;

    fn full_throttle() -> DriveInput {
        DriveInput {
            throttle: 1.0,
            steer: 0.0,
            use_item: false,
        }
    }

    #[test]
    fn test_speed_caps_at_archetype_max() {
        let mut v = Vehicle::new(0, KartClass::Balanced, Vec2::ZERO, 0.0);
        for _ in 0..600 {
            v.integrate(&full_throttle(), 1.0, SIM_DT);
            assert!(v.speed() <= 300.0 + 1e-3);
        }
        // Actually reaches the cap
        assert!(v.speed() > 295.0);
    }

    #[test]
    fn test_boost_raises_the_cap_then_expires() {
        let mut v = Vehicle::new(0, KartClass::Balanced, Vec2::ZERO, 0.0);
        v.held_item = Some(ItemKind::Boost);
        assert_eq!(v.activate_item(), Some(ItemKind::Boost));
        assert!(v.effects.boosted());

        for _ in 0..BOOST_TICKS {
            v.integrate(&full_throttle(), 1.0, SIM_DT);
            assert!(v.speed() <= 300.0 * BOOST_FACTOR + 1e-3);
            v.effects.step();
        }
        assert!(!v.effects.boosted());

        // Back under the unboosted cap once the timer is out
        for _ in 0..120 {
            v.integrate(&full_throttle(), 1.0, SIM_DT);
        }
        assert!(v.speed() <= 300.0 + 1e-3);
    }

    #[test]
    fn test_braking_beats_coasting() {
        let mut braking = Vehicle::new(0, KartClass::Balanced, Vec2::ZERO, 0.0);
        let mut coasting = Vehicle::new(1, KartClass::Balanced, Vec2::ZERO, 0.0);
        for _ in 0..300 {
            braking.integrate(&full_throttle(), 1.0, SIM_DT);
            coasting.integrate(&full_throttle(), 1.0, SIM_DT);
        }

        let brake = DriveInput {
            throttle: -1.0,
            ..DriveInput::default()
        };
        for _ in 0..20 {
            braking.integrate(&brake, 1.0, SIM_DT);
            coasting.integrate(&DriveInput::default(), 1.0, SIM_DT);
        }
        assert!(braking.speed() < coasting.speed());
    }

    #[test]
    fn test_reverse_speed_is_capped() {
        let mut v = Vehicle::new(0, KartClass::Balanced, Vec2::ZERO, 0.0);
        let reverse = DriveInput {
            throttle: -1.0,
            ..DriveInput::default()
        };
        for _ in 0..600 {
            v.integrate(&reverse, 1.0, SIM_DT);
        }
        assert!(v.speed() <= 300.0 * crate::consts::REVERSE_SPEED_FACTOR + 1e-3);
    }

    #[test]
    fn test_steering_needs_speed() {
        let mut parked = Vehicle::new(0, KartClass::Balanced, Vec2::ZERO, 0.0);
        let steer_only = DriveInput {
            throttle: 0.0,
            steer: 1.0,
            use_item: false,
        };
        parked.integrate(&steer_only, 1.0, SIM_DT);
        assert!(parked.heading.abs() < 1e-6);

        let mut moving = Vehicle::new(1, KartClass::Balanced, Vec2::ZERO, 0.0);
        for _ in 0..120 {
            moving.integrate(&full_throttle(), 1.0, SIM_DT);
        }
        let drive_and_steer = DriveInput {
            throttle: 1.0,
            steer: 1.0,
            use_item: false,
        };
        moving.integrate(&drive_and_steer, 1.0, SIM_DT);
        assert!(moving.heading > 1e-4);
    }

    #[test]
    fn test_use_item_with_empty_slot_is_noop() {
        let mut v = Vehicle::new(0, KartClass::Balanced, Vec2::ZERO, 0.0);
        assert_eq!(v.activate_item(), None);
        assert!(!v.effects.boosted());
        assert!(v.held_item.is_none());
    }

    #[test]
    fn test_item_slot_consumed_on_use() {
        let mut v = Vehicle::new(0, KartClass::Balanced, Vec2::ZERO, 0.0);
        v.held_item = Some(ItemKind::Shield);
        assert_eq!(v.activate_item(), Some(ItemKind::Shield));
        assert!(v.effects.shield_active);
        // Slot is empty now, second use is a no-op
        assert_eq!(v.activate_item(), None);
    }

    #[test]
    fn test_shield_absorbs_exactly_one_hit() {
        let mut v = Vehicle::new(0, KartClass::Balanced, Vec2::ZERO, 0.0);
        v.held_item = Some(ItemKind::Mine);
        v.effects.shield_active = true;

        v.take_hit();
        assert!(!v.effects.shield_active);
        assert!(!v.effects.spinning());
        // Held item survives the hit
        assert_eq!(v.held_item, Some(ItemKind::Mine));

        v.take_hit();
        assert!(v.effects.spinning());
    }

    #[test]
    fn test_spinning_kart_ignores_input() {
        let mut v = Vehicle::new(0, KartClass::Balanced, Vec2::ZERO, 0.0);
        for _ in 0..120 {
            v.integrate(&full_throttle(), 1.0, SIM_DT);
        }
        v.take_hit();
        let speed_at_hit = v.speed();

        for _ in 0..30 {
            v.integrate(&full_throttle(), 1.0, SIM_DT);
            v.effects.step();
        }
        assert!(v.speed() < speed_at_hit);
        assert!(v.effects.spinning());
    }

    proptest! {
        /// Post-integration speed never exceeds the boosted archetype cap,
        /// for any input stream on any surface.
        #[test]
        fn prop_speed_never_exceeds_cap(
            class_pick in 0usize..3,
            grip in 0.3f32..1.0,
            inputs in proptest::collection::vec((-1.5f32..1.5, -1.5f32..1.5), 1..300),
        ) {
            let class = [KartClass::Balanced, KartClass::Speedster, KartClass::Heavyweight][class_pick];
            let mut v = Vehicle::new(0, class, Vec2::ZERO, 0.0);
            for (throttle, steer) in inputs {
                let input = DriveInput { throttle, steer, use_item: false };
                v.integrate(&input, grip, SIM_DT);
                let cap = class.stats().max_speed * v.effects.boost_factor();
                prop_assert!(v.speed() <= cap + 1e-3);
                prop_assert!(v.pos.is_finite());
            }
        }
    }
}
