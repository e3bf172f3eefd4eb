use crate::math::polygon_2d::Rect;
use crate::math::vector_2d::{flat_distance, flat_normalize};
use crate::math::{Point3, Vector3, TOLERANCE};

use super::ParametricCurve;

/// A straight trajectory between two points.
///
/// When `is_section` is false the trajectory describes the infinite line
/// through both points, and intersections may report parameters outside
/// `[0, 1]`.
#[derive(Debug, Clone, PartialEq)]
pub struct StraightTrajectory {
    start: Point3,
    end: Point3,
    is_section: bool,
}

impl StraightTrajectory {
    /// Creates a bounded segment.
    #[must_use]
    pub fn new(start: Point3, end: Point3) -> Self {
        Self {
            start,
            end,
            is_section: true,
        }
    }

    /// Creates an infinite line through `start` and `end`.
    #[must_use]
    pub fn line(start: Point3, end: Point3) -> Self {
        Self {
            start,
            end,
            is_section: false,
        }
    }

    /// Creates a segment from `start` of `length` along `dir`.
    #[must_use]
    pub fn from_direction(start: Point3, dir: &Vector3, length: f64) -> Self {
        Self::new(start, start + flat_normalize(dir) * length)
    }

    #[must_use]
    pub fn is_section(&self) -> bool {
        self.is_section
    }

    /// Unit direction from start to end in the XY plane.
    #[must_use]
    pub fn direction(&self) -> Vector3 {
        flat_normalize(&(self.end - self.start))
    }

    /// Moves both ends along the trajectory: the start forward by `start`,
    /// the end backward by `end`. Negative values extend the segment.
    #[must_use]
    pub fn shift(&self, start: f64, end: f64) -> Self {
        let dir = self.direction();
        Self {
            start: self.start + dir * start,
            end: self.end - dir * end,
            is_section: self.is_section,
        }
    }
}

impl ParametricCurve for StraightTrajectory {
    fn position(&self, t: f64) -> Point3 {
        self.start + (self.end - self.start) * t
    }

    fn tangent(&self, _t: f64) -> Vector3 {
        self.end - self.start
    }

    fn start_position(&self) -> Point3 {
        self.start
    }

    fn end_position(&self) -> Point3 {
        self.end
    }

    fn start_direction(&self) -> Vector3 {
        self.direction()
    }

    fn end_direction(&self) -> Vector3 {
        -self.direction()
    }

    fn length(&self) -> f64 {
        flat_distance(&self.start, &self.end)
    }

    fn cut(&self, t0: f64, t1: f64) -> Self {
        Self {
            start: self.position(t0),
            end: self.position(t1),
            is_section: true,
        }
    }

    fn invert(&self) -> Self {
        Self {
            start: self.end,
            end: self.start,
            is_section: self.is_section,
        }
    }

    fn travel(&self, t: f64, distance: f64) -> f64 {
        let length = self.length();
        if length < TOLERANCE {
            return match distance.partial_cmp(&0.0) {
                Some(std::cmp::Ordering::Greater) => 1.0,
                Some(std::cmp::Ordering::Less) => 0.0,
                _ => t.clamp(0.0, 1.0),
            };
        }
        (t + distance / length).clamp(0.0, 1.0)
    }

    fn bounds(&self) -> Rect {
        Rect::from_points([&self.start, &self.end])
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;

    fn segment() -> StraightTrajectory {
        StraightTrajectory::new(Point3::new(0.0, 0.0, 0.0), Point3::new(10.0, 0.0, 2.0))
    }

    #[test]
    fn position_interpolates_elevation() {
        let p = segment().position(0.25);
        assert_abs_diff_eq!(p, Point3::new(2.5, 0.0, 0.5), epsilon = 1e-12);
    }

    #[test]
    fn length_ignores_elevation() {
        assert!((segment().length() - 10.0).abs() < TOLERANCE);
    }

    #[test]
    fn end_direction_points_back() {
        let s = segment();
        assert_abs_diff_eq!(s.end_direction(), Vector3::new(-1.0, 0.0, 0.0), epsilon = 1e-12);
    }

    #[test]
    fn from_direction_flattens_dir() {
        let s = StraightTrajectory::from_direction(Point3::origin(), &Vector3::new(0.0, 2.0, 5.0), 3.0);
        assert_abs_diff_eq!(s.end_position(), Point3::new(0.0, 3.0, 0.0), epsilon = 1e-12);
    }

    #[test]
    fn travel_clamps() {
        let s = segment();
        assert!((s.travel(0.0, 2.5) - 0.25).abs() < TOLERANCE);
        assert!((s.travel(0.9, 5.0) - 1.0).abs() < TOLERANCE);
        assert!(s.travel(0.1, -5.0).abs() < TOLERANCE);
    }

    #[test]
    fn zero_length_travel_reaches_end() {
        let p = Point3::new(1.0, 1.0, 0.0);
        let s = StraightTrajectory::new(p, p);
        assert!((s.travel(0.0, 1.0) - 1.0).abs() < TOLERANCE);
        assert!(s.travel(0.5, -1.0).abs() < TOLERANCE);
    }

    #[test]
    fn reversed_cut_runs_backwards() {
        let cut = segment().cut(0.8, 0.2);
        assert!((cut.start_position().x - 8.0).abs() < TOLERANCE);
        assert!((cut.end_position().x - 2.0).abs() < TOLERANCE);
    }

    #[test]
    fn shift_moves_ends_inwards() {
        let shifted = segment().shift(1.0, 2.0);
        assert!((shifted.start_position().x - 1.0).abs() < TOLERANCE);
        assert!((shifted.end_position().x - 8.0).abs() < TOLERANCE);
    }
}
