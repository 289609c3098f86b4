//! Collision detection and response for the track band and its occupants
//!
//! Everything that can touch is a circle (karts, pillars, boxes, mines) or
//! one of the two boundary walls of the annular band. Response is positional
//! correction plus removal of the velocity component on the contact normal;
//! there is no restitution.

use glam::Vec2;

/// Tangential speed kept after scraping a wall or pillar
const STATIC_SCRUB: f32 = 0.9;

/// Result of a contact check
#[derive(Debug, Clone, Copy)]
pub struct Contact {
    /// Whether a contact occurred
    pub hit: bool,
    /// Normal pointing out of the obstacle, toward the mover
    pub normal: Vec2,
    /// Penetration depth (for position correction)
    pub penetration: f32,
}

impl Contact {
    pub fn miss() -> Self {
        Self {
            hit: false,
            normal: Vec2::ZERO,
            penetration: 0.0,
        }
    }
}

/// Direction guard for degenerate separations: a zero-length axis gets a
/// fixed fallback so resolution stays deterministic and NaN-free.
#[inline]
fn safe_dir(v: Vec2) -> Vec2 {
    let dir = v.normalize_or_zero();
    if dir == Vec2::ZERO { Vec2::X } else { dir }
}

/// Check a circle against both walls of the annular band
pub fn band_contact(pos: Vec2, radius: f32, inner_r: f32, outer_r: f32) -> Contact {
    let dist = pos.length();

    if dist + radius > outer_r {
        return Contact {
            hit: true,
            normal: -safe_dir(pos),
            penetration: dist + radius - outer_r,
        };
    }

    if dist - radius < inner_r {
        return Contact {
            hit: true,
            normal: safe_dir(pos),
            penetration: inner_r - (dist - radius),
        };
    }

    Contact::miss()
}

/// Check a moving circle against a static circle (pillar)
pub fn circle_contact(pos: Vec2, radius: f32, center: Vec2, static_radius: f32) -> Contact {
    let delta = pos - center;
    let dist = delta.length();
    let reach = radius + static_radius;

    if dist < reach {
        Contact {
            hit: true,
            normal: safe_dir(delta),
            penetration: reach - dist,
        }
    } else {
        Contact::miss()
    }
}

/// Whether two circles overlap (trigger volumes: boxes, mines, gates)
#[inline]
pub fn circles_touch(a: Vec2, a_radius: f32, b: Vec2, b_radius: f32) -> bool {
    (a - b).length_squared() < (a_radius + b_radius) * (a_radius + b_radius)
}

/// Resolve a contact against static geometry: push the mover out along the
/// normal, drop the velocity component driving it in, and scrub a little
/// tangential speed.
pub fn resolve_static(pos: &mut Vec2, vel: &mut Vec2, contact: &Contact) {
    if !contact.hit {
        return;
    }

    *pos += contact.normal * contact.penetration;

    let vn = vel.dot(contact.normal);
    if vn < 0.0 {
        *vel -= contact.normal * vn;
        *vel *= STATIC_SCRUB;
    }
}

/// Resolve two overlapping karts: separate along the penetration axis split
/// by inverse mass, then cancel the closing velocity on that axis. Returns
/// whether the pair was actually touching.
pub fn resolve_vehicle_pair(
    pos_a: &mut Vec2,
    vel_a: &mut Vec2,
    mass_a: f32,
    pos_b: &mut Vec2,
    vel_b: &mut Vec2,
    mass_b: f32,
    radius: f32,
) -> bool {
    let delta = *pos_b - *pos_a;
    let dist = delta.length();
    let reach = 2.0 * radius;

    if dist >= reach {
        return false;
    }

    let normal = safe_dir(delta);
    let penetration = reach - dist;

    let inv_a = 1.0 / mass_a.max(f32::EPSILON);
    let inv_b = 1.0 / mass_b.max(f32::EPSILON);
    let total = inv_a + inv_b;

    *pos_a -= normal * penetration * (inv_a / total);
    *pos_b += normal * penetration * (inv_b / total);

    // Closing speed along the axis; negative while approaching
    let closing = (*vel_b - *vel_a).dot(normal);
    if closing < 0.0 {
        *vel_a += normal * closing * (inv_a / total);
        *vel_b -= normal * closing * (inv_b / total);
    }

    true
}
