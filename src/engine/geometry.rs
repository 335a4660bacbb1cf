// 2D geometry helpers for the avoidance solver.
//
// All routines work on the XZ ground plane (glam::Vec2, x = world X,
// y = world Z) and answer degenerate input with "no intersection"
// instead of dividing by zero.

use glam::Vec2;

/// Determinants below this are treated as parallel lines.
pub const DETERMINANT_EPSILON: f32 = 1e-13;
/// Slack allowed when testing whether a point lies on a segment.
/// Absorbs accumulated floating error at segment ends.
pub const SEGMENT_SLACK: f32 = 7e-4;

/// 2D determinant / cross product: det(a, b) = a.x·b.y − a.y·b.x
#[inline]
pub fn det(a: Vec2, b: Vec2) -> f32 {
    a.x * b.y - a.y * b.x
}

/// Intersection point of segments `p1→p2` and `q1→q2`.
///
/// Returns `None` for parallel or collinear segments and for zero-length
/// segments. The crossing point must lie on both segments, with
/// [`SEGMENT_SLACK`] tolerance on each bounding box.
pub fn line_line_intersection(p1: Vec2, p2: Vec2, q1: Vec2, q2: Vec2) -> Option<Vec2> {
    let r = p2 - p1;
    let s = q2 - q1;
    let denom = det(r, s);
    if denom.abs() < DETERMINANT_EPSILON {
        return None;
    }

    let t = det(q1 - p1, s) / denom;
    let point = p1 + r * t;

    if on_segment(point, p1, p2) && on_segment(point, q1, q2) {
        Some(point)
    } else {
        None
    }
}

/// True if `point` (assumed collinear) sits inside the segment's
/// bounding box grown by [`SEGMENT_SLACK`].
#[inline]
fn on_segment(point: Vec2, a: Vec2, b: Vec2) -> bool {
    let min = a.min(b) - Vec2::splat(SEGMENT_SLACK);
    let max = a.max(b) + Vec2::splat(SEGMENT_SLACK);
    point.cmpge(min).all() && point.cmple(max).all()
}

/// Closest point to `p` on segment `a→b`. A zero-length segment yields `a`.
pub fn closest_point_on_segment(p: Vec2, a: Vec2, b: Vec2) -> Vec2 {
    let ab = b - a;
    let len_sq = ab.length_squared();
    if len_sq < DETERMINANT_EPSILON {
        return a;
    }
    let t = ((p - a).dot(ab) / len_sq).clamp(0.0, 1.0);
    a + ab * t
}

/// Time until a point at `rel_pos` moving with `rel_vel` first comes within
/// `radius` of the origin.
///
/// Solves `|rel_pos + t·rel_vel|² = radius²` for the smallest root.
/// * already inside the radius → `Some(0.0)`
/// * diverging, grazing or stationary → `None`
pub fn time_to_collision(rel_pos: Vec2, rel_vel: Vec2, radius: f32) -> Option<f32> {
    let c = rel_pos.length_squared() - radius * radius;
    if c < 0.0 {
        return Some(0.0);
    }

    let a = rel_vel.length_squared();
    if a < DETERMINANT_EPSILON {
        return None;
    }
    let b = 2.0 * rel_pos.dot(rel_vel);
    let disc = b * b - 4.0 * a * c;
    if disc <= 0.0 {
        return None;
    }

    let t = (-b - disc.sqrt()) / (2.0 * a);
    if t < 0.0 { None } else { Some(t) }
}

/// Time until a circle of `radius` centred at `pos`, moving with `vel`,
/// touches the segment `a→b`.
///
/// Three cases, cheapest first:
/// 1. the circle already touches the segment → `0.0`
/// 2. the velocity ray crosses the segment shifted towards the circle by
///    `radius` → time of that crossing
/// 3. the circle grazes one of the endpoints → earliest endpoint hit
///
/// `reach` bounds how far along the ray we look (in seconds).
pub fn time_to_segment_collision(
    pos: Vec2,
    vel: Vec2,
    radius: f32,
    a: Vec2,
    b: Vec2,
    reach: f32,
) -> Option<f32> {
    let closest = closest_point_on_segment(pos, a, b);
    if pos.distance_squared(closest) < radius * radius {
        return Some(0.0);
    }

    let speed_sq = vel.length_squared();
    if speed_sq < DETERMINANT_EPSILON {
        return None;
    }

    let mut best: Option<f32> = None;

    let along = b - a;
    if along.length_squared() >= DETERMINANT_EPSILON {
        // Unit normal on the side the circle is on.
        let mut n = Vec2::new(-along.y, along.x).normalize();
        if (pos - a).dot(n) < 0.0 {
            n = -n;
        }
        let shift = n * radius;
        let ray_end = pos + vel * reach;
        if let Some(hit) = line_line_intersection(pos, ray_end, a + shift, b + shift) {
            best = Some(hit.distance(pos) / speed_sq.sqrt());
        }
    }

    for end in [a, b] {
        if let Some(t) = time_to_collision(end - pos, -vel, radius) {
            best = Some(best.map_or(t, |cur| cur.min(t)));
        }
    }

    best
}
