use crate::math::intersect_2d::line_line_intersect_2d;
use crate::math::polygon_2d::Rect;
use crate::math::vector_2d::{flat_distance, flat_length, flat_normalize};
use crate::math::{Point3, Vector3, TOLERANCE};

use super::ParametricCurve;

/// 5-point Gauss-Legendre abscissae on `[-1, 1]`.
const GAUSS_X: [f64; 5] = [
    0.0,
    -0.538_469_310_105_683_1,
    0.538_469_310_105_683_1,
    -0.906_179_845_938_664,
    0.906_179_845_938_664,
];

/// Matching Gauss-Legendre weights.
const GAUSS_W: [f64; 5] = [
    0.568_888_888_888_888_9,
    0.478_628_670_499_366_5,
    0.478_628_670_499_366_5,
    0.236_926_885_056_189_1,
    0.236_926_885_056_189_1,
];

/// Integration sub-intervals over the full `[0, 1]` domain.
const LENGTH_SEGMENTS: usize = 16;

/// Arc-length residual at which travel stops refining.
const TRAVEL_TOLERANCE: f64 = 1e-9;

/// A cubic Bézier trajectory with cached arc length.
#[derive(Debug, Clone, PartialEq)]
pub struct BezierTrajectory {
    a: Point3,
    b: Point3,
    c: Point3,
    d: Point3,
    length: f64,
}

impl BezierTrajectory {
    /// Creates a cubic from its four control points.
    #[must_use]
    pub fn new(a: Point3, b: Point3, c: Point3, d: Point3) -> Self {
        let mut bezier = Self {
            a,
            b,
            c,
            d,
            length: 0.0,
        };
        bezier.length = bezier.arc_length(0.0, 1.0);
        bezier
    }

    /// Builds a smooth cubic leaving `start` along `start_dir` and arriving at
    /// `end` from `end_dir`, where `end_dir` points from `end` back into the curve.
    ///
    /// Control distances follow the usual road-segment heuristic: a fixed
    /// fraction of the chord for straight connections, otherwise derived
    /// from where the two end rays meet.
    #[must_use]
    pub fn from_directions(
        start: Point3,
        start_dir: &Vector3,
        end: Point3,
        end_dir: &Vector3,
        smooth_start: bool,
        smooth_end: bool,
    ) -> Self {
        let start_dir = flat_normalize(start_dir);
        let end_dir = flat_normalize(end_dir);
        let (start_control, end_control) =
            middle_control_distances(&start, &start_dir, &end, &end_dir, smooth_start, smooth_end);
        Self::new(
            start,
            start + start_dir * start_control,
            end + end_dir * end_control,
            end,
        )
    }

    /// Control points `[a, b, c, d]`.
    #[must_use]
    pub fn points(&self) -> [Point3; 4] {
        [self.a, self.b, self.c, self.d]
    }

    /// Arc length between two parameters, `t0 <= t1`.
    #[must_use]
    pub fn arc_length(&self, t0: f64, t1: f64) -> f64 {
        let (t0, t1) = if t0 <= t1 { (t0, t1) } else { (t1, t0) };
        let span = t1 - t0;
        if span < TOLERANCE {
            return 0.0;
        }
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
        let segments = ((LENGTH_SEGMENTS as f64 * span).ceil() as usize).max(1);
        #[allow(clippy::cast_precision_loss)]
        let step = span / segments as f64;
        let mut sum = 0.0;
        for i in 0..segments {
            #[allow(clippy::cast_precision_loss)]
            let lo = t0 + step * i as f64;
            let half = step * 0.5;
            let mid = lo + half;
            for (x, w) in GAUSS_X.iter().zip(GAUSS_W.iter()) {
                sum += w * flat_length(&self.tangent(mid + half * x)) * half;
            }
        }
        sum
    }

    /// Splits at `t` with De Casteljau, returning both halves' control points.
    fn split(&self, t: f64) -> ([Point3; 4], [Point3; 4]) {
        let lerp = |p: &Point3, q: &Point3| p + (q - p) * t;
        let ab = lerp(&self.a, &self.b);
        let bc = lerp(&self.b, &self.c);
        let cd = lerp(&self.c, &self.d);
        let abc = lerp(&ab, &bc);
        let bcd = lerp(&bc, &cd);
        let mid = lerp(&abc, &bcd);
        ([self.a, ab, abc, mid], [mid, bcd, cd, self.d])
    }

    /// Solves `arc_length(lo..x) == distance` for `x` inside `[lo, hi]`.
    fn solve_forward(&self, origin: f64, hi: f64, distance: f64) -> f64 {
        let (mut lo, mut hi) = (origin, hi);
        let total = self.arc_length(origin, hi);
        let mut x = origin + (hi - origin) * (distance / total);
        for _ in 0..48 {
            let f = self.arc_length(origin, x) - distance;
            if f.abs() < TRAVEL_TOLERANCE {
                break;
            }
            if f > 0.0 {
                hi = x;
            } else {
                lo = x;
            }
            let speed = flat_length(&self.tangent(x));
            let newton = x - f / speed;
            x = if speed > TOLERANCE && newton > lo && newton < hi {
                newton
            } else {
                (lo + hi) * 0.5
            };
        }
        x
    }

    /// Solves `arc_length(x..origin) == distance` for `x` inside `[lo, origin]`.
    fn solve_backward(&self, lo: f64, origin: f64, distance: f64) -> f64 {
        let (mut lo, mut hi) = (lo, origin);
        let total = self.arc_length(lo, origin);
        let mut x = origin - (origin - lo) * (distance / total);
        for _ in 0..48 {
            let f = self.arc_length(x, origin) - distance;
            if f.abs() < TRAVEL_TOLERANCE {
                break;
            }
            if f > 0.0 {
                lo = x;
            } else {
                hi = x;
            }
            let speed = flat_length(&self.tangent(x));
            let newton = x + f / speed;
            x = if speed > TOLERANCE && newton > lo && newton < hi {
                newton
            } else {
                (lo + hi) * 0.5
            };
        }
        x
    }
}

impl ParametricCurve for BezierTrajectory {
    fn position(&self, t: f64) -> Point3 {
        let mt = 1.0 - t;
        let (w0, w1, w2, w3) = (mt * mt * mt, 3.0 * mt * mt * t, 3.0 * mt * t * t, t * t * t);
        Point3::from(
            self.a.coords * w0 + self.b.coords * w1 + self.c.coords * w2 + self.d.coords * w3,
        )
    }

    fn tangent(&self, t: f64) -> Vector3 {
        let mt = 1.0 - t;
        (self.b - self.a) * (3.0 * mt * mt)
            + (self.c - self.b) * (6.0 * mt * t)
            + (self.d - self.c) * (3.0 * t * t)
    }

    fn start_position(&self) -> Point3 {
        self.a
    }

    fn end_position(&self) -> Point3 {
        self.d
    }

    fn start_direction(&self) -> Vector3 {
        [self.b, self.c, self.d]
            .iter()
            .map(|p| flat_normalize(&(p - self.a)))
            .find(|dir| flat_length(dir) > 0.5)
            .unwrap_or_else(Vector3::zeros)
    }

    fn end_direction(&self) -> Vector3 {
        [self.c, self.b, self.a]
            .iter()
            .map(|p| flat_normalize(&(p - self.d)))
            .find(|dir| flat_length(dir) > 0.5)
            .unwrap_or_else(Vector3::zeros)
    }

    fn length(&self) -> f64 {
        self.length
    }

    fn cut(&self, t0: f64, t1: f64) -> Self {
        if t0 > t1 {
            return self.cut(t1, t0).invert();
        }
        let t0 = t0.clamp(0.0, 1.0);
        let t1 = t1.clamp(0.0, 1.0);
        let [a, b, c, d] = if t1 < TOLERANCE {
            [self.a; 4]
        } else {
            self.split(t1).0
        };
        let left = Self::new(a, b, c, d);
        let local = if t1 < TOLERANCE { 0.0 } else { t0 / t1 };
        let [a, b, c, d] = left.split(local).1;
        Self::new(a, b, c, d)
    }

    fn invert(&self) -> Self {
        Self {
            a: self.d,
            b: self.c,
            c: self.b,
            d: self.a,
            length: self.length,
        }
    }

    fn travel(&self, t: f64, distance: f64) -> f64 {
        let t = t.clamp(0.0, 1.0);
        if distance > 0.0 {
            let remaining = self.arc_length(t, 1.0);
            if remaining <= distance {
                1.0
            } else {
                self.solve_forward(t, 1.0, distance)
            }
        } else if distance < 0.0 {
            let before = self.arc_length(0.0, t);
            if before <= -distance {
                0.0
            } else {
                self.solve_backward(0.0, t, -distance)
            }
        } else {
            t
        }
    }

    fn bounds(&self) -> Rect {
        Rect::from_points([&self.a, &self.b, &self.c, &self.d])
    }
}

/// Control distances for a cubic joining two directed ends.
fn middle_control_distances(
    start: &Point3,
    start_dir: &Vector3,
    end: &Point3,
    end_dir: &Vector3,
    smooth_start: bool,
    smooth_end: bool,
) -> (f64, f64) {
    let distance = flat_distance(start, end);
    if is_straight(start, start_dir, end, end_dir, distance) {
        let factor = |smooth: bool| if smooth { 0.15 } else { 0.276 };
        return (distance * factor(smooth_start), distance * factor(smooth_end));
    }

    let dot = start_dir.x * end_dir.x + start_dir.y * end_dir.y;
    if dot >= -0.999 {
        if let Some((u, v)) = line_line_intersect_2d(start, start_dir, end, end_dir) {
            let u = u.clamp(distance * 0.1, distance);
            let v = v.clamp(distance * 0.1, distance);
            let sum = u + v;
            return (u.min(sum * 0.276), v.min(sum * 0.276));
        }
    }
    (distance * 0.276, distance * 0.276)
}

fn is_straight(start: &Point3, start_dir: &Vector3, end: &Point3, end_dir: &Vector3, distance: f64) -> bool {
    if distance < TOLERANCE {
        return true;
    }
    let chord = flat_normalize(&(end - start));
    let forward = chord.x * start_dir.x + chord.y * start_dir.y;
    let backward = -(chord.x * end_dir.x + chord.y * end_dir.y);
    forward > 0.999 && backward > 0.999
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;

    fn arc_like() -> BezierTrajectory {
        BezierTrajectory::new(
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(0.0, 5.0, 0.0),
            Point3::new(5.0, 10.0, 0.0),
            Point3::new(10.0, 10.0, 0.0),
        )
    }

    #[test]
    fn straight_bezier_length() {
        let bezier = BezierTrajectory::new(
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(9.0, 0.0, 0.0),
            Point3::new(10.0, 0.0, 0.0),
        );
        assert_abs_diff_eq!(bezier.length(), 10.0, epsilon = 1e-9);
    }

    #[test]
    fn cut_end_matches_position() {
        let bezier = arc_like();
        for t in [0.1, 0.35, 0.5, 0.9] {
            let cut = bezier.cut(0.0, t);
            assert_abs_diff_eq!(cut.end_position(), bezier.position(t), epsilon = 1e-9);
        }
    }

    #[test]
    fn cut_middle_keeps_locus() {
        let bezier = arc_like();
        let cut = bezier.cut(0.2, 0.6);
        assert_abs_diff_eq!(cut.start_position(), bezier.position(0.2), epsilon = 1e-9);
        assert_abs_diff_eq!(cut.position(0.5), bezier.position(0.4), epsilon = 1e-9);
        assert_abs_diff_eq!(cut.end_position(), bezier.position(0.6), epsilon = 1e-9);
    }

    #[test]
    fn travel_reaches_cut_end() {
        let bezier = arc_like();
        let (t0, t1) = (0.15, 0.7);
        let sub = bezier.cut(t0, t1).length();
        assert_abs_diff_eq!(bezier.travel(t0, sub), t1, epsilon = 1e-6);
        assert_abs_diff_eq!(bezier.travel(t1, -sub), t0, epsilon = 1e-6);
    }

    #[test]
    fn travel_overrun_clamps() {
        let bezier = arc_like();
        assert!((bezier.travel(0.5, 1000.0) - 1.0).abs() < TOLERANCE);
        assert!(bezier.travel(0.5, -1000.0).abs() < TOLERANCE);
    }

    #[test]
    fn invert_keeps_locus() {
        let bezier = arc_like();
        let inverted = bezier.invert();
        assert_abs_diff_eq!(inverted.position(0.3), bezier.position(0.7), epsilon = 1e-12);
        assert_abs_diff_eq!(inverted.length(), bezier.length(), epsilon = 1e-12);
    }

    #[test]
    fn directions_follow_controls() {
        let bezier = arc_like();
        assert_abs_diff_eq!(bezier.start_direction(), Vector3::new(0.0, 1.0, 0.0), epsilon = 1e-12);
        assert_abs_diff_eq!(bezier.end_direction(), Vector3::new(-1.0, 0.0, 0.0), epsilon = 1e-12);
    }

    #[test]
    fn from_directions_straight_uses_chord_fraction() {
        let bezier = BezierTrajectory::from_directions(
            Point3::new(0.0, 0.0, 0.0),
            &Vector3::new(1.0, 0.0, 0.0),
            Point3::new(10.0, 0.0, 0.0),
            &Vector3::new(-1.0, 0.0, 0.0),
            true,
            false,
        );
        let [_, b, c, _] = bezier.points();
        assert_abs_diff_eq!(b.x, 1.5, epsilon = 1e-12);
        assert_abs_diff_eq!(c.x, 10.0 - 2.76, epsilon = 1e-12);
    }

    #[test]
    fn from_directions_corner_uses_ray_meeting() {
        let bezier = BezierTrajectory::from_directions(
            Point3::new(0.0, 0.0, 0.0),
            &Vector3::new(0.0, 1.0, 0.0),
            Point3::new(10.0, 10.0, 0.0),
            &Vector3::new(-1.0, 0.0, 0.0),
            true,
            true,
        );
        // Rays meet at (0, 10): u = v = 10, control = min(10, 20 * 0.276).
        let [_, b, c, _] = bezier.points();
        assert_abs_diff_eq!(b, Point3::new(0.0, 5.52, 0.0), epsilon = 1e-12);
        assert_abs_diff_eq!(c, Point3::new(4.48, 10.0, 0.0), epsilon = 1e-12);
    }
}
