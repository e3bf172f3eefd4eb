//! Intersections between trajectories.
//!
//! Straight/straight pairs are solved in closed form, straight/curve pairs by
//! substituting the curve into the implicit line equation, and curve/curve
//! pairs by recursive subdivision with bounding-box pruning. Elevation is
//! ignored throughout.

use std::cmp::Ordering;

use tracing::trace;

use crate::math::intersect_2d::line_line_intersect_2d;
use crate::math::polygon_2d::Rect;
use crate::math::roots::cubic_roots;
use crate::math::vector_2d::{flat_distance, line_angle};
use crate::math::{Point3, Vector3, EPSILON};

use super::trajectory::{BezierTrajectory, ParametricCurve, StraightTrajectory, Trajectory};

/// Parameter slack when deciding whether a root lies inside `[0, 1]`.
const DOMAIN_EPSILON: f64 = 1e-6;

/// Recursion limit for curve/curve subdivision.
const MAX_DEPTH: u32 = 48;

/// Call budget for one curve/curve query.
const MAX_CALLS: u32 = 4096;

/// Control-polygon flatness under which a curve piece is treated as its chord.
const FLATNESS: f64 = 1e-4;

/// Where two trajectories cross.
///
/// `first_t` and `second_t` are only meaningful when `is_intersect` is set.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Intersection {
    pub first_t: f64,
    pub second_t: f64,
    /// Unsigned acute angle between the tangents, in `[0, π/2]`.
    pub angle: f64,
    pub is_intersect: bool,
}

impl Intersection {
    /// Result for trajectories that do not cross.
    pub const NOT_INTERSECT: Intersection = Intersection {
        first_t: -1.0,
        second_t: -1.0,
        angle: 0.0,
        is_intersect: false,
    };

    #[must_use]
    pub fn new(first_t: f64, second_t: f64, angle: f64) -> Self {
        Self {
            first_t,
            second_t,
            angle,
            is_intersect: true,
        }
    }

    /// Same crossing seen from the second trajectory.
    #[must_use]
    pub fn swapped(&self) -> Self {
        Self {
            first_t: self.second_t,
            second_t: self.first_t,
            ..*self
        }
    }

    /// Ascending order by `first_t`.
    #[must_use]
    pub fn cmp_first(a: &Self, b: &Self) -> Ordering {
        a.first_t.total_cmp(&b.first_t)
    }

    /// All crossings of `first` and `second`, unordered.
    #[must_use]
    pub fn calculate(first: &Trajectory, second: &Trajectory) -> Vec<Intersection> {
        let raw = match (first, second) {
            (Trajectory::Straight(a), Trajectory::Straight(b)) => straight_straight(a, b),
            (Trajectory::Straight(a), Trajectory::Bezier(b)) => straight_bezier(a, b),
            (Trajectory::Bezier(a), Trajectory::Straight(b)) => straight_bezier(b, a)
                .into_iter()
                .map(|(t, u)| (u, t))
                .collect(),
            (Trajectory::Bezier(a), Trajectory::Bezier(b)) => bezier_bezier(a, b),
        };

        raw.into_iter()
            .map(|(t, u)| Self::new(t, u, line_angle(&first.tangent(t), &second.tangent(u))))
            .collect()
    }

    /// The crossing with the smallest `first_t`, or [`Intersection::NOT_INTERSECT`].
    #[must_use]
    pub fn calculate_single(first: &Trajectory, second: &Trajectory) -> Intersection {
        Self::calculate(first, second)
            .into_iter()
            .min_by(Self::cmp_first)
            .unwrap_or(Self::NOT_INTERSECT)
    }

    /// Crossings of `first` with every trajectory in `others`, sorted by `first_t`.
    ///
    /// The sort is stable, so ties keep the order of `others`.
    #[must_use]
    pub fn calculate_many<'a>(
        first: &Trajectory,
        others: impl IntoIterator<Item = &'a Trajectory>,
    ) -> Vec<Intersection> {
        let mut all: Vec<Intersection> = others
            .into_iter()
            .flat_map(|other| Self::calculate(first, other))
            .collect();
        all.sort_by(Self::cmp_first);
        all
    }

    /// Groups sorted crossings into `(enter, exit)` spans.
    ///
    /// An odd count means the probe starts inside the region; a synthetic
    /// crossing at `t = 0` is inserted so that the first span opens at the
    /// probe origin.
    #[must_use]
    pub fn pairs(mut intersections: Vec<Intersection>) -> Vec<(Intersection, Intersection)> {
        if intersections.len() % 2 == 1 {
            intersections.push(Self::new(0.0, 0.0, 0.0));
        }
        intersections.sort_by(Self::cmp_first);
        intersections
            .chunks_exact(2)
            .map(|pair| (pair[0], pair[1]))
            .collect()
    }
}

fn in_domain(t: f64) -> bool {
    (-DOMAIN_EPSILON..=1.0 + DOMAIN_EPSILON).contains(&t)
}

fn clamp_domain(t: f64, bounded: bool) -> f64 {
    if bounded {
        t.clamp(0.0, 1.0)
    } else {
        t
    }
}

fn straight_straight(a: &StraightTrajectory, b: &StraightTrajectory) -> Vec<(f64, f64)> {
    let da = a.end_position() - a.start_position();
    let db = b.end_position() - b.start_position();
    let Some((t, u)) = line_line_intersect_2d(&a.start_position(), &da, &b.start_position(), &db)
    else {
        return Vec::new();
    };
    if (a.is_section() && !in_domain(t)) || (b.is_section() && !in_domain(u)) {
        return Vec::new();
    }
    vec![(clamp_domain(t, a.is_section()), clamp_domain(u, b.is_section()))]
}

/// Power-basis coefficients `[p0, p1, p2, p3]` with `P(s) = p0 + p1·s + p2·s² + p3·s³`.
fn power_basis(points: &[Point3; 4]) -> [Vector3; 4] {
    let [a, b, c, d] = (*points).map(|p| p.coords);
    [a, (b - a) * 3.0, (c - b * 2.0 + a) * 3.0, d - c * 3.0 + b * 3.0 - a]
}

fn straight_bezier(line: &StraightTrajectory, curve: &BezierTrajectory) -> Vec<(f64, f64)> {
    let origin = line.start_position();
    let dir = line.end_position() - origin;
    let dir_sq = dir.x * dir.x + dir.y * dir.y;
    if dir_sq < crate::math::TOLERANCE {
        return Vec::new();
    }
    let normal = Vector3::new(-dir.y, dir.x, 0.0);
    let [p0, p1, p2, p3] = power_basis(&curve.points());
    let dot = |v: &Vector3| normal.x * v.x + normal.y * v.y;
    let offset = dot(&(p0 - origin.coords));

    let mut result: Vec<(f64, f64)> = Vec::new();
    for s in cubic_roots(dot(&p3), dot(&p2), dot(&p1), offset) {
        if !in_domain(s) {
            continue;
        }
        let s = s.clamp(0.0, 1.0);
        let point = curve.position(s);
        let t = ((point.x - origin.x) * dir.x + (point.y - origin.y) * dir.y) / dir_sq;
        if line.is_section() && !in_domain(t) {
            continue;
        }
        let t = clamp_domain(t, line.is_section());
        if !result
            .iter()
            .any(|(rt, rs)| (rt - t).abs() < EPSILON && (rs - s).abs() < EPSILON)
        {
            result.push((t, s));
        }
    }
    result
}

struct Subdivision {
    calls: u32,
    result: Vec<(f64, f64)>,
}

type Piece = ([Point3; 4], f64, f64);

fn bezier_bezier(a: &BezierTrajectory, b: &BezierTrajectory) -> Vec<(f64, f64)> {
    let mut state = Subdivision {
        calls: 0,
        result: Vec::new(),
    };
    subdivide(&mut state, (a.points(), 0.0, 1.0), (b.points(), 0.0, 1.0), 0);
    if state.calls >= MAX_CALLS {
        trace!(calls = state.calls, "curve intersection hit the call budget");
    }
    state.result
}

fn subdivide(state: &mut Subdivision, a: Piece, b: Piece, depth: u32) {
    state.calls += 1;
    if state.calls >= MAX_CALLS {
        return;
    }
    let (ref pa, a0, a1) = a;
    let (ref pb, b0, b1) = b;
    let rect_a = Rect::from_points(pa);
    let rect_b = Rect::from_points(pb);
    if !rect_a.overlaps(&rect_b, FLATNESS) {
        return;
    }

    let flat_a = flatness(pa) < FLATNESS;
    let flat_b = flatness(pb) < FLATNESS;
    if (flat_a && flat_b) || depth >= MAX_DEPTH {
        let da = pa[3] - pa[0];
        let db = pb[3] - pb[0];
        if let Some((t, u)) = line_line_intersect_2d(&pa[0], &da, &pb[0], &db) {
            if in_domain(t) && in_domain(u) {
                let t = a0 + (a1 - a0) * t.clamp(0.0, 1.0);
                let u = b0 + (b1 - b0) * u.clamp(0.0, 1.0);
                push_unique(&mut state.result, t, u);
            }
        }
        return;
    }

    // Split whichever piece is larger and less flat.
    if !flat_a && (flat_b || rect_a.diagonal() >= rect_b.diagonal()) {
        let (left, right) = split_half(pa);
        let mid = (a0 + a1) * 0.5;
        subdivide(state, (left, a0, mid), b, depth + 1);
        subdivide(state, (right, mid, a1), b, depth + 1);
    } else {
        let (left, right) = split_half(pb);
        let mid = (b0 + b1) * 0.5;
        subdivide(state, a, (left, b0, mid), depth + 1);
        subdivide(state, a, (right, mid, b1), depth + 1);
    }
}

fn push_unique(result: &mut Vec<(f64, f64)>, t: f64, u: f64) {
    let slack = EPSILON * 10.0;
    if !result
        .iter()
        .any(|(rt, ru)| (rt - t).abs() < slack && (ru - u).abs() < slack)
    {
        result.push((t, u));
    }
}

/// Max distance of the inner control points from the chord.
fn flatness(points: &[Point3; 4]) -> f64 {
    let chord = points[3] - points[0];
    let len = chord.x.hypot(chord.y);
    if len < crate::math::TOLERANCE {
        return flat_distance(&points[0], &points[1]).max(flat_distance(&points[0], &points[2]));
    }
    let dist = |p: &Point3| ((p.x - points[0].x) * chord.y - (p.y - points[0].y) * chord.x).abs() / len;
    dist(&points[1]).max(dist(&points[2]))
}

fn split_half(p: &[Point3; 4]) -> ([Point3; 4], [Point3; 4]) {
    let mid = |a: &Point3, b: &Point3| Point3::from((a.coords + b.coords) * 0.5);
    let ab = mid(&p[0], &p[1]);
    let bc = mid(&p[1], &p[2]);
    let cd = mid(&p[2], &p[3]);
    let abc = mid(&ab, &bc);
    let bcd = mid(&bc, &cd);
    let center = mid(&abc, &bcd);
    ([p[0], ab, abc, center], [center, bcd, cd, p[3]])
}
