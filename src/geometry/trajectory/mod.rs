mod bezier;
mod straight;

pub use bezier::BezierTrajectory;
pub use straight::StraightTrajectory;

use crate::math::polygon_2d::Rect;
use crate::math::vector_2d::{absolute_angle, flat_length, flat_normalize};
use crate::math::{Point3, Vector3};

/// Parametric curve over the domain `[0, 1]`.
///
/// Implementations map `t` monotonically to arc length. `cut` and `invert`
/// return the same variant; neither mutates the receiver.
pub trait ParametricCurve: Sized {
    /// Point at parameter `t`.
    fn position(&self, t: f64) -> Point3;

    /// Derivative `dP/dt` at parameter `t`. Not normalized.
    fn tangent(&self, t: f64) -> Vector3;

    fn start_position(&self) -> Point3;

    fn end_position(&self) -> Point3;

    /// Unit direction leaving the start point.
    fn start_direction(&self) -> Vector3;

    /// Unit direction from the end point back into the curve.
    fn end_direction(&self) -> Vector3;

    /// Arc length in the XY plane.
    fn length(&self) -> f64;

    /// Sub-curve from `P(t0)` to `P(t1)`, re-parametrized to `[0, 1]`.
    fn cut(&self, t0: f64, t1: f64) -> Self;

    /// Same locus traversed in the opposite direction.
    fn invert(&self) -> Self;

    /// Parameter reached after moving a signed arc `distance` from `t`.
    ///
    /// The result is clamped to `[0, 1]`; callers compare it against the
    /// bounds to detect running off the curve.
    fn travel(&self, t: f64, distance: f64) -> f64;

    /// Conservative XY bounding rectangle.
    fn bounds(&self) -> Rect;
}

/// A straight or cubic Bézier trajectory.
#[derive(Debug, Clone, PartialEq)]
pub enum Trajectory {
    Straight(StraightTrajectory),
    Bezier(BezierTrajectory),
}

impl Trajectory {
    /// Bounded straight segment.
    #[must_use]
    pub fn straight(start: Point3, end: Point3) -> Self {
        Self::Straight(StraightTrajectory::new(start, end))
    }

    /// Infinite straight line through two points.
    #[must_use]
    pub fn line(start: Point3, end: Point3) -> Self {
        Self::Straight(StraightTrajectory::line(start, end))
    }

    #[must_use]
    pub fn bezier(a: Point3, b: Point3, c: Point3, d: Point3) -> Self {
        Self::Bezier(BezierTrajectory::new(a, b, c, d))
    }

    /// False only for infinite straight lines.
    #[must_use]
    pub fn is_section(&self) -> bool {
        match self {
            Self::Straight(s) => s.is_section(),
            Self::Bezier(_) => true,
        }
    }

    #[must_use]
    pub fn is_straight(&self) -> bool {
        matches!(self, Self::Straight(_))
    }

    /// Unit XY direction at `t`, falling back to the chord where the
    /// derivative vanishes.
    #[must_use]
    pub fn direction(&self, t: f64) -> Vector3 {
        let tangent = self.tangent(t);
        if flat_length(&tangent) > crate::math::TOLERANCE {
            flat_normalize(&tangent)
        } else {
            flat_normalize(&(self.end_position() - self.start_position()))
        }
    }

    /// Absolute angle of the direction at `t`.
    #[must_use]
    pub fn angle(&self, t: f64) -> f64 {
        absolute_angle(&self.direction(t))
    }

    /// Angle between the start direction and the reversed end direction.
    #[must_use]
    pub fn delta_angle(&self) -> f64 {
        let a = self.start_direction();
        let b = -self.end_direction();
        let cross = a.x * b.y - a.y * b.x;
        let dot = a.x * b.x + a.y * b.y;
        cross.atan2(dot).abs()
    }
}

macro_rules! dispatch {
    ($self:ident, $inner:ident => $expr:expr) => {
        match $self {
            Trajectory::Straight($inner) => $expr,
            Trajectory::Bezier($inner) => $expr,
        }
    };
}

impl ParametricCurve for Trajectory {
    fn position(&self, t: f64) -> Point3 {
        dispatch!(self, c => c.position(t))
    }

    fn tangent(&self, t: f64) -> Vector3 {
        dispatch!(self, c => c.tangent(t))
    }

    fn start_position(&self) -> Point3 {
        dispatch!(self, c => c.start_position())
    }

    fn end_position(&self) -> Point3 {
        dispatch!(self, c => c.end_position())
    }

    fn start_direction(&self) -> Vector3 {
        dispatch!(self, c => c.start_direction())
    }

    fn end_direction(&self) -> Vector3 {
        dispatch!(self, c => c.end_direction())
    }

    fn length(&self) -> f64 {
        dispatch!(self, c => c.length())
    }

    fn cut(&self, t0: f64, t1: f64) -> Self {
        match self {
            Self::Straight(s) => Self::Straight(s.cut(t0, t1)),
            Self::Bezier(b) => Self::Bezier(b.cut(t0, t1)),
        }
    }

    fn invert(&self) -> Self {
        match self {
            Self::Straight(s) => Self::Straight(s.invert()),
            Self::Bezier(b) => Self::Bezier(b.invert()),
        }
    }

    fn travel(&self, t: f64, distance: f64) -> f64 {
        dispatch!(self, c => c.travel(t, distance))
    }

    fn bounds(&self) -> Rect {
        dispatch!(self, c => c.bounds())
    }
}

impl From<StraightTrajectory> for Trajectory {
    fn from(value: StraightTrajectory) -> Self {
        Self::Straight(value)
    }
}

impl From<BezierTrajectory> for Trajectory {
    fn from(value: BezierTrajectory) -> Self {
        Self::Bezier(value)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::f64::consts::FRAC_PI_2;

    use approx::assert_abs_diff_eq;

    use super::*;

    #[test]
    fn cut_then_travel_is_consistent() {
        let trajectories = [
            Trajectory::straight(Point3::new(0.0, 0.0, 0.0), Point3::new(3.0, 4.0, 0.0)),
            Trajectory::bezier(
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(2.0, 6.0, 0.0),
                Point3::new(8.0, 6.0, 0.0),
                Point3::new(10.0, 0.0, 0.0),
            ),
        ];
        for trajectory in &trajectories {
            for t in [0.2, 0.5, 0.8] {
                let head = trajectory.cut(0.0, t);
                assert_abs_diff_eq!(head.end_position(), trajectory.position(t), epsilon = 1e-9);
                let reached = trajectory.travel(0.0, head.length());
                assert_abs_diff_eq!(reached, t, epsilon = 1e-6);
            }
        }
    }

    #[test]
    fn delta_angle_of_quarter_turn() {
        let bezier = Trajectory::bezier(
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(0.0, 5.0, 0.0),
            Point3::new(5.0, 10.0, 0.0),
            Point3::new(10.0, 10.0, 0.0),
        );
        assert_abs_diff_eq!(bezier.delta_angle(), FRAC_PI_2, epsilon = 1e-12);
        let straight = Trajectory::straight(Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 0.0, 0.0));
        assert_abs_diff_eq!(straight.delta_angle(), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn degenerate_direction_falls_back_to_chord() {
        let bezier = Trajectory::bezier(
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(4.0, 0.0, 0.0),
            Point3::new(4.0, 0.0, 0.0),
        );
        assert_abs_diff_eq!(bezier.direction(0.0), Vector3::new(1.0, 0.0, 0.0), epsilon = 1e-12);
    }
}
