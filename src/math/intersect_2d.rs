use super::{Point3, Vector3, TOLERANCE};

/// Parametric 2D line-line intersection.
///
/// Given lines `p1 + t * d1` and `p2 + u * d2`, returns `(t, u)` if not parallel.
/// Elevation is ignored.
#[must_use]
pub fn line_line_intersect_2d(
    p1: &Point3,
    d1: &Vector3,
    p2: &Point3,
    d2: &Vector3,
) -> Option<(f64, f64)> {
    let cross = d1.x * d2.y - d1.y * d2.x;
    let scale = (d1.x.hypot(d1.y) * d2.x.hypot(d2.y)).max(TOLERANCE);
    if (cross / scale).abs() < TOLERANCE {
        return None;
    }
    let dx = p2.x - p1.x;
    let dy = p2.y - p1.y;
    let t = (dx * d2.y - dy * d2.x) / cross;
    let u = (dx * d1.y - dy * d1.x) / cross;
    Some((t, u))
}

/// Bounded segment-segment intersection in 2D.
///
/// Returns `(intersection_point, t, u)` where `t` and `u` are in `[0, 1]`.
#[must_use]
pub fn segment_segment_intersect_2d(
    a0: &Point3,
    a1: &Point3,
    b0: &Point3,
    b1: &Point3,
) -> Option<(Point3, f64, f64)> {
    let da = a1 - a0;
    let db = b1 - b0;
    let (t, u) = line_line_intersect_2d(a0, &da, b0, &db)?;

    let eps = TOLERANCE;
    if t >= -eps && t <= 1.0 + eps && u >= -eps && u <= 1.0 + eps {
        let t = t.clamp(0.0, 1.0);
        Some((point_at(a0, &da, t), t, u.clamp(0.0, 1.0)))
    } else {
        None
    }
}

/// Linear interpolation: `origin + dir * t`, elevation included.
#[must_use]
pub fn point_at(origin: &Point3, dir: &Vector3, t: f64) -> Point3 {
    origin + dir * t
}

/// Signed distance from `point` to the line through `origin` with unit direction `dir`.
///
/// Positive on the left side.
#[must_use]
pub fn side_distance(origin: &Point3, dir: &Vector3, point: &Point3) -> f64 {
    let dx = point.x - origin.x;
    let dy = point.y - origin.y;
    dir.x * dy - dir.y * dx
}
