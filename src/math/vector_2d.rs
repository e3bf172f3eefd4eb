//! Planar direction helpers. All functions ignore `z`.

use super::{Point3, Vector3, TOLERANCE};

/// Returns the XY part of `v`, normalized. Zero vectors stay zero.
#[must_use]
pub fn flat_normalize(v: &Vector3) -> Vector3 {
    let len = flat_length(v);
    if len < TOLERANCE {
        Vector3::zeros()
    } else {
        Vector3::new(v.x / len, v.y / len, 0.0)
    }
}

/// Length of the XY part of `v`.
#[must_use]
pub fn flat_length(v: &Vector3) -> f64 {
    v.x.hypot(v.y)
}

/// Planar distance between two points.
#[must_use]
pub fn flat_distance(a: &Point3, b: &Point3) -> f64 {
    (b.x - a.x).hypot(b.y - a.y)
}

/// Absolute angle of a direction, measured from +X towards +Y.
#[must_use]
pub fn absolute_angle(dir: &Vector3) -> f64 {
    dir.y.atan2(dir.x)
}

/// Unit direction for an absolute angle.
#[must_use]
pub fn direction(angle: f64) -> Vector3 {
    Vector3::new(angle.cos(), angle.sin(), 0.0)
}

/// Returns the left-pointing normal of a direction vector in the XY plane.
#[must_use]
pub fn left_normal(dir: &Vector3) -> Vector3 {
    Vector3::new(-dir.y, dir.x, 0.0)
}

/// Rotates a direction by `angle` radians, clockwise when `clockwise` is set.
#[must_use]
pub fn turn(dir: &Vector3, angle: f64, clockwise: bool) -> Vector3 {
    let angle = if clockwise { -angle } else { angle };
    let (sin, cos) = angle.sin_cos();
    Vector3::new(dir.x * cos - dir.y * sin, dir.x * sin + dir.y * cos, dir.z)
}

/// Unsigned acute angle between two lines with the given directions, in `[0, π/2]`.
#[must_use]
pub fn line_angle(a: &Vector3, b: &Vector3) -> f64 {
    let a = flat_normalize(a);
    let b = flat_normalize(b);
    let cross = a.x * b.y - a.y * b.x;
    let dot = a.x * b.x + a.y * b.y;
    cross.abs().atan2(dot.abs())
}
