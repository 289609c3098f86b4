//! Track geometry: checkpoints, boundaries, obstacles, start grid
//!
//! A track is an annular band around the origin. Checkpoints sit at equal
//! angles on the driving centerline and racers travel counterclockwise
//! (increasing angle). The whole structure is immutable after generation and
//! shared read-only by every vehicle and AI driver for the life of a race.
//!
//! Different tracks vary surface grip and decoration through [`TrackTheme`];
//! the structural contract (ordered cyclic checkpoints, deterministic
//! non-overlapping start slots) is the same for all of them.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::{normalize_angle, polar_to_cartesian};

/// Maximum racers the start grid can seat without overlapping slots
pub const MAX_GRID_SLOTS: usize = 12;

/// Angular spacing between start grid rows (radians)
const START_ROW_SPACING: f32 = 0.07;

/// Lateral offset of grid columns from the centerline, as a fraction of the
/// band half-width
const START_COLUMN_OFFSET: f32 = 0.35;

/// Surface flavor of a track. Changes grip, never geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrackTheme {
    Meadow,
    Desert,
    Ice,
}

impl TrackTheme {
    /// Grip multiplier applied to lateral and rolling friction
    pub fn surface_grip(self) -> f32 {
        match self {
            TrackTheme::Meadow => 1.0,
            TrackTheme::Desert => 0.8,
            TrackTheme::Ice => 0.45,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TrackTheme::Meadow => "meadow",
            TrackTheme::Desert => "desert",
            TrackTheme::Ice => "ice",
        }
    }
}

/// Parameters a track is generated from
///
/// Validated by `RaceConfig::validate` before generation; see the field docs
/// for the accepted ranges.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackDef {
    /// Number of checkpoint gates on the loop (at least 3)
    pub checkpoint_count: usize,
    /// Radius of the driving centerline (positive, larger than `half_width`)
    pub centerline_radius: f32,
    /// Half the width of the drivable band (positive)
    pub half_width: f32,
    /// Surface flavor
    pub theme: TrackTheme,
    /// Place a pillar obstacle after every this many checkpoints (0 = none)
    pub pillar_interval: usize,
    /// Place an item box row at every this many checkpoints (0 = none)
    pub item_box_interval: usize,
}

impl Default for TrackDef {
    fn default() -> Self {
        Self {
            checkpoint_count: 12,
            centerline_radius: 480.0,
            half_width: 80.0,
            theme: TrackTheme::Meadow,
            pillar_interval: 3,
            item_box_interval: 4,
        }
    }
}

/// One gate on the driving line
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Checkpoint {
    pub pos: Vec2,
    /// Direction of travel through the gate (radians)
    pub heading: f32,
}

/// A solid circular obstacle inside the band
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Pillar {
    pub pos: Vec2,
    pub radius: f32,
}

/// Generated track geometry, immutable for the life of a race
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Track {
    pub def: TrackDef,
    /// Ordered cyclic checkpoint sequence; index 0 is the start/finish line
    pub checkpoints: Vec<Checkpoint>,
    /// Static obstacles inside the band
    pub pillars: Vec<Pillar>,
    /// Item box spawn points (live box state belongs to the race)
    pub item_box_spots: Vec<Vec2>,
}

impl Track {
    /// Generate a track from a definition.
    ///
    /// Expects a definition that passed `RaceConfig::validate`; a degenerate
    /// definition produces a degenerate (but memory-safe) track.
    pub fn generate(def: &TrackDef) -> Self {
        use std::f32::consts::{FRAC_PI_2, TAU};

        let n = def.checkpoint_count;
        let step = if n > 0 { TAU / n as f32 } else { TAU };

        let checkpoints = (0..n)
            .map(|i| {
                let theta = i as f32 * step;
                Checkpoint {
                    pos: polar_to_cartesian(def.centerline_radius, theta),
                    heading: normalize_angle(theta + FRAC_PI_2),
                }
            })
            .collect();

        // Pillars sit midway between two gates, hugging alternating walls so
        // they shape the racing line without ever blocking a gate.
        let mut pillars = Vec::new();
        if def.pillar_interval > 0 {
            let radius = def.half_width * 0.22;
            for i in (def.pillar_interval..n).step_by(def.pillar_interval) {
                let theta = (i as f32 + 0.5) * step;
                let side = if (i / def.pillar_interval) % 2 == 0 {
                    1.0
                } else {
                    -1.0
                };
                let r = def.centerline_radius + side * def.half_width * 0.55;
                pillars.push(Pillar {
                    pos: polar_to_cartesian(r, theta),
                    radius,
                });
            }
        }

        // Item boxes come in rows of three spanning the band, placed just
        // past their gate. Gate 0 is skipped to keep the grid clear.
        let mut item_box_spots = Vec::new();
        if def.item_box_interval > 0 {
            for i in (def.item_box_interval..n).step_by(def.item_box_interval) {
                let theta = i as f32 * step + 0.03;
                for lateral in [-0.5_f32, 0.0, 0.5] {
                    let r = def.centerline_radius + lateral * def.half_width;
                    item_box_spots.push(polar_to_cartesian(r, theta));
                }
            }
        }

        Self {
            def: def.clone(),
            checkpoints,
            pillars,
            item_box_spots,
        }
    }

    /// Number of checkpoints on the loop
    #[inline]
    pub fn checkpoint_count(&self) -> usize {
        self.checkpoints.len()
    }

    /// Checkpoint lookup; indices wrap modulo the loop length so a stale or
    /// advanced index never panics mid-race.
    pub fn checkpoint(&self, index: usize) -> &Checkpoint {
        &self.checkpoints[index % self.checkpoints.len()]
    }

    /// Index following `index` on the loop
    #[inline]
    pub fn next_checkpoint_index(&self, index: usize) -> usize {
        (index + 1) % self.checkpoints.len()
    }

    /// Inner boundary radius (keep-out wall)
    #[inline]
    pub fn inner_radius(&self) -> f32 {
        self.def.centerline_radius - self.def.half_width
    }

    /// Outer boundary radius (keep-in wall)
    #[inline]
    pub fn outer_radius(&self) -> f32 {
        self.def.centerline_radius + self.def.half_width
    }

    /// Grip multiplier of the track surface
    #[inline]
    pub fn surface_grip(&self) -> f32 {
        self.def.theme.surface_grip()
    }

    /// Start pose (position, heading) for a grid slot.
    ///
    /// Deterministic for a given track; slots never overlap. Slots pair up
    /// into rows behind the start/finish line, slot 0 closest to it.
    pub fn start_position(&self, slot: usize) -> (Vec2, f32) {
        use std::f32::consts::FRAC_PI_2;

        let row = (slot / 2) as f32;
        let theta = -(row + 1.0) * START_ROW_SPACING;
        let side = if slot % 2 == 0 { -1.0 } else { 1.0 };
        let r = self.def.centerline_radius + side * START_COLUMN_OFFSET * self.def.half_width;

        (
            polar_to_cartesian(r, theta),
            normalize_angle(theta + FRAC_PI_2),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::VEHICLE_RADIUS;
    use std::f32::consts::TAU;

    #[test]
    fn test_checkpoints_are_ordered_and_cyclic() {
        let track = Track::generate(&TrackDef::default());
        assert_eq!(track.checkpoint_count(), 12);

        let step = TAU / 12.0;
        for (i, cp) in track.checkpoints.iter().enumerate() {
            let expected = polar_to_cartesian(480.0, i as f32 * step);
            assert!((cp.pos - expected).length() < 1e-3);
        }

        // Wrapping lookup never panics and lands back on gate 0
        let wrapped = track.checkpoint(12);
        assert!((wrapped.pos - track.checkpoints[0].pos).length() < 1e-6);
        assert_eq!(track.next_checkpoint_index(11), 0);
    }

    #[test]
    fn test_start_positions_deterministic_and_disjoint() {
        let def = TrackDef::default();
        let a = Track::generate(&def);
        let b = Track::generate(&def);

        let slots: Vec<_> = (0..MAX_GRID_SLOTS).map(|i| a.start_position(i)).collect();
        for (i, &(pos, heading)) in slots.iter().enumerate() {
            let (pos_b, heading_b) = b.start_position(i);
            assert!((pos - pos_b).length() < 1e-6);
            assert!((heading - heading_b).abs() < 1e-6);

            // Inside the drivable band
            assert!(pos.length() > a.inner_radius() + VEHICLE_RADIUS);
            assert!(pos.length() < a.outer_radius() - VEHICLE_RADIUS);

            for &(other, _) in &slots[..i] {
                assert!((pos - other).length() >= 2.0 * VEHICLE_RADIUS);
            }
        }
    }

    #[test]
    fn test_pillars_stay_inside_band_and_off_gates() {
        let track = Track::generate(&TrackDef::default());
        assert!(!track.pillars.is_empty());

        for pillar in &track.pillars {
            let r = pillar.pos.length();
            assert!(r - pillar.radius > track.inner_radius());
            assert!(r + pillar.radius < track.outer_radius());

            for cp in &track.checkpoints {
                assert!((pillar.pos - cp.pos).length() > pillar.radius + VEHICLE_RADIUS);
            }
        }
    }

    #[test]
    fn test_item_box_rows_skip_start_gate() {
        let track = Track::generate(&TrackDef::default());
        // Rows at gates 4 and 8, three boxes each
        assert_eq!(track.item_box_spots.len(), 6);
        let start = track.checkpoints[0].pos;
        for spot in &track.item_box_spots {
            assert!((*spot - start).length() > 100.0);
        }
    }

    #[test]
    fn test_theme_grip_ordering() {
        assert!(TrackTheme::Ice.surface_grip() < TrackTheme::Desert.surface_grip());
        assert!(TrackTheme::Desert.surface_grip() < TrackTheme::Meadow.surface_grip());
        assert_eq!(TrackTheme::Meadow.surface_grip(), 1.0);
    }
}
