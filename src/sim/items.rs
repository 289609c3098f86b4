//! Item pickups, the single-slot inventory, and dropped hazards
//!
//! Items are tagged variants, never strings. A kart holds at most one item;
//! collecting is handled by the race director, activation by the vehicle
//! update. Mines are the one item that outlives its use as a world entity.

use glam::Vec2;
use rand::Rng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

/// Speed multiplier while a boost or invulnerability is running
pub const BOOST_FACTOR: f32 = 1.45;

/// Boost duration (ticks)
pub const BOOST_TICKS: u32 = 150;
/// Invulnerability duration (ticks)
pub const INVULN_TICKS: u32 = 180;
/// Ghost duration (ticks)
pub const GHOST_TICKS: u32 = 300;

/// Item box respawn delay after being collected (ticks)
pub const ITEM_BOX_RESPAWN_TICKS: u32 = 300;

/// Delay before a dropped mine arms; unarmed mines are inert (ticks)
pub const MINE_ARM_TICKS: u32 = 45;

/// Discrete pickup types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ItemKind {
    /// Timed speed boost
    Boost,
    /// Timed invincibility, which also boosts
    Invulnerability,
    /// Absorbs exactly one incoming hit
    Shield,
    /// Timed immunity to hazards
    Ghost,
    /// Hazard dropped behind the kart
    Mine,
}

/// Coarse grouping used by the AI use policy and the rank-weighted roll
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemCategory {
    Boost,
    Defense,
    Offense,
}

impl ItemKind {
    pub fn category(self) -> ItemCategory {
        match self {
            ItemKind::Boost | ItemKind::Invulnerability => ItemCategory::Boost,
            ItemKind::Shield | ItemKind::Ghost => ItemCategory::Defense,
            ItemKind::Mine => ItemCategory::Offense,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ItemKind::Boost => "boost",
            ItemKind::Invulnerability => "invulnerability",
            ItemKind::Shield => "shield",
            ItemKind::Ghost => "ghost",
            ItemKind::Mine => "mine",
        }
    }
}

/// Roll table for one tier of the field
type WeightRow = [(ItemKind, u32); 5];

/// Front runners get utility, the back of the field gets raw speed.
fn roll_table(rank: u32, total_racers: u32) -> WeightRow {
    let fraction = if total_racers <= 1 {
        1.0
    } else {
        (rank.saturating_sub(1)) as f32 / (total_racers - 1) as f32
    };

    if fraction < 1.0 / 3.0 {
        [
            (ItemKind::Mine, 3),
            (ItemKind::Shield, 3),
            (ItemKind::Ghost, 2),
            (ItemKind::Boost, 2),
            (ItemKind::Invulnerability, 0),
        ]
    } else if fraction <= 2.0 / 3.0 {
        [
            (ItemKind::Boost, 3),
            (ItemKind::Shield, 2),
            (ItemKind::Mine, 2),
            (ItemKind::Ghost, 2),
            (ItemKind::Invulnerability, 1),
        ]
    } else {
        [
            (ItemKind::Boost, 4),
            (ItemKind::Invulnerability, 3),
            (ItemKind::Ghost, 2),
            (ItemKind::Shield, 1),
            (ItemKind::Mine, 0),
        ]
    }
}

/// Draw a random item weighted by the collector's current rank
pub fn roll_item(rng: &mut Pcg32, rank: u32, total_racers: u32) -> ItemKind {
    let table = roll_table(rank, total_racers);
    let total: u32 = table.iter().map(|(_, w)| w).sum();

    let mut pick = rng.random_range(0..total);
    for (kind, weight) in table {
        if pick < weight {
            return kind;
        }
        pick -= weight;
    }
    // Weights sum to `total`, so the loop always returns
    ItemKind::Boost
}

/// A floating item box on the track
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemBox {
    pub id: u32,
    pub pos: Vec2,
    pub active: bool,
    /// Ticks until an inactive box comes back
    pub respawn_ticks: u32,
}

impl ItemBox {
    pub fn new(id: u32, pos: Vec2) -> Self {
        Self {
            id,
            pos,
            active: true,
            respawn_ticks: 0,
        }
    }

    /// Deactivate the box and start the respawn countdown
    pub fn collect(&mut self) {
        self.active = false;
        self.respawn_ticks = ITEM_BOX_RESPAWN_TICKS;
    }

    /// Per-tick respawn countdown
    pub fn step(&mut self) {
        if !self.active {
            self.respawn_ticks = self.respawn_ticks.saturating_sub(1);
            if self.respawn_ticks == 0 {
                self.active = true;
            }
        }
    }
}

/// A dropped mine waiting on the track
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Hazard {
    pub id: u32,
    pub pos: Vec2,
    /// Vehicle id that dropped it
    pub owner: u32,
    /// Ticks until armed
    pub arm_ticks: u32,
}

impl Hazard {
    pub fn new(id: u32, pos: Vec2, owner: u32) -> Self {
        Self {
            id,
            pos,
            owner,
            arm_ticks: MINE_ARM_TICKS,
        }
    }

    #[inline]
    pub fn armed(&self) -> bool {
        self.arm_ticks == 0
    }

    /// Per-tick arming countdown
    pub fn step(&mut self) {
        self.arm_ticks = self.arm_ticks.saturating_sub(1);
    }
}
