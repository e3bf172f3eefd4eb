//! Periodic parallel stripes clipped to the contour.

use tracing::trace;

use crate::config::MarkupConfig;
use crate::geometry::{Intersection, ParametricCurve, Trajectory};
use crate::math::intersect_2d::point_at;
use crate::math::polygon_2d::Rect;
use crate::math::vector_2d::{direction, left_normal};
use crate::math::{Point3, Vector3, EPSILON, TOLERANCE};
use crate::style::helper::{get_parts, offset_by_sin};
use crate::style::{Color32, MarkupStyleDash, MaterialType};

/// Stripe width of the solid filler.
pub(super) const SOLID_WIDTH: f64 = 0.2;

/// Upper bound on probe lines for one stripe pass.
const MAX_PROBES: usize = 20_000;

pub(super) fn contour_bounds(contour: &[Trajectory]) -> Rect {
    contour
        .iter()
        .fold(Rect::empty(), |rect, t| rect.union(&t.bounds()))
}

/// Spans `(enter, exit)` of the infinite line through `origin` along `dir`
/// inside the contour. With `forward_only`, crossings behind the origin are
/// ignored and a probe starting inside opens its first span at the origin.
pub(super) fn probe(
    contour: &[Trajectory],
    origin: &Point3,
    dir: &Vector3,
    forward_only: bool,
) -> Vec<(Intersection, Intersection)> {
    let line = Trajectory::line(*origin, origin + dir);
    let mut crossings: Vec<(Intersection, f64)> = contour
        .iter()
        .flat_map(|side| {
            Intersection::calculate(&line, side)
                .into_iter()
                .map(move |i| (i, vertex_side(dir, side, i.second_t)))
        })
        .collect();
    if forward_only {
        crossings.retain(|(i, _)| i.first_t > 0.0);
    }
    crossings.sort_by(|a, b| Intersection::cmp_first(&a.0, &b.0));

    let mut kept = Vec::with_capacity(crossings.len());
    let mut rest = crossings.as_slice();
    while let Some(((crossing, side), tail)) = rest.split_first() {
        match tail.first() {
            Some((next, next_side)) if (next.first_t - crossing.first_t).abs() < EPSILON => {
                // Two sides meeting on the probe: passing through counts once,
                // touching a corner not at all.
                if side * next_side <= 0.0 {
                    kept.push(*crossing);
                }
                rest = &tail[1..];
            }
            _ => {
                kept.push(*crossing);
                rest = tail;
            }
        }
    }
    Intersection::pairs(kept)
}

/// Which side of the probe `side` leaves to when the crossing sits on one of
/// its ends: the sign of `dir × away`. Zero away from the ends.
fn vertex_side(dir: &Vector3, side: &Trajectory, t: f64) -> f64 {
    let away = if t < EPSILON {
        side.start_direction()
    } else if t > 1.0 - EPSILON {
        side.end_direction()
    } else {
        return 0.0;
    };
    let cross = dir.x * away.y - dir.y * away.x;
    if cross.abs() < EPSILON {
        0.0
    } else {
        cross.signum()
    }
}

pub(super) fn stripes(
    contour: &[Trajectory],
    angle: f64,
    width: f64,
    step: f64,
    offset: f64,
    color: Color32,
    config: &MarkupConfig,
) -> Vec<MarkupStyleDash> {
    let mut dashes = Vec::new();
    let rect = contour_bounds(contour);
    let period = width * step;
    if rect.is_empty() || width <= 0.0 || period < TOLERANCE {
        return dashes;
    }

    let dir = direction(angle.to_radians());
    let normal = left_normal(&dir);
    let project = |p: &Point3| p.x * normal.x + p.y * normal.y;
    let (lo, hi) = rect
        .corners()
        .iter()
        .map(project)
        .fold((f64::MAX, f64::MIN), |(lo, hi), v| (lo.min(v), hi.max(v)));
    let center = rect.center();
    let center_projection = project(&center);

    let (count, part_width) = get_parts(width, 0.0);
    let mut band = (lo / period).floor() * period;
    let mut probes = 0;
    while band < hi {
        for i in 0..count {
            #[allow(clippy::cast_precision_loss)]
            let along = band + part_width * (i as f64 + 0.5);
            let origin = center + normal * (along - center_projection);
            for (enter, exit) in probe(contour, &origin, &dir, false) {
                let start_t = enter.first_t + offset_by_sin(&enter, offset, config);
                let end_t = exit.first_t - offset_by_sin(&exit, offset, config);
                if end_t - start_t < TOLERANCE {
                    continue;
                }
                dashes.push(MarkupStyleDash::from_ends(
                    point_at(&origin, &dir, start_t),
                    point_at(&origin, &dir, end_t),
                    part_width,
                    color,
                    MaterialType::RectangleFillers,
                ));
            }
        }
        probes += count;
        if probes > MAX_PROBES {
            trace!(probes, period, "stripe probe limit reached");
            break;
        }
        band += period;
    }
    dashes
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::super::tests::rectangle;
    use super::*;

    #[test]
    fn stripes_cover_square() {
        let contour = rectangle(10.0, 10.0);
        let dashes = stripes(&contour, 0.0, 0.5, 3.0, 0.0, Color32::DEFAULT, &MarkupConfig::default());
        assert_eq!(dashes.len(), 35);
        for dash in &dashes {
            assert_abs_diff_eq!(dash.length, 10.0, epsilon = 1e-9);
            assert_abs_diff_eq!(dash.position.x, 5.0, epsilon = 1e-9);
            assert_abs_diff_eq!(dash.width, 0.1, epsilon = 1e-12);
            assert_eq!(dash.material, MaterialType::RectangleFillers);
        }
    }

    fn kite(apex: f64) -> Vec<Trajectory> {
        let corners = [
            Point3::new(0.0, -3.0, 0.0),
            Point3::new(5.0, 0.0, 0.0),
            Point3::new(2.0, apex, 0.0),
            Point3::new(-3.0, 0.0, 0.0),
        ];
        (0..4)
            .map(|i| Trajectory::straight(corners[i], corners[(i + 1) % 4]))
            .collect()
    }

    #[test]
    fn touching_a_corner_is_not_a_span() {
        let contour = kite(3.0);
        let spans = probe(&contour, &Point3::new(0.0, 3.0, 0.0), &Vector3::x(), false);
        assert!(spans.is_empty());
    }

    #[test]
    fn passing_through_corners_counts_once() {
        let contour = kite(3.0);
        let spans = probe(&contour, &Point3::origin(), &Vector3::x(), false);
        assert_eq!(spans.len(), 1);
        assert_abs_diff_eq!(spans[0].0.first_t, -3.0, epsilon = 1e-9);
        assert_abs_diff_eq!(spans[0].1.first_t, 5.0, epsilon = 1e-9);
    }

    #[test]
    fn stripes_stay_below_the_apex() {
        let contour = kite(3.05);
        let dashes = stripes(&contour, 0.0, 0.5, 3.0, 0.0, Color32::DEFAULT, &MarkupConfig::default());
        assert!(!dashes.is_empty());
        for dash in &dashes {
            let (start, end) = dash.ends();
            for p in [start, end] {
                assert!(p.y < 3.05 - 1e-6 || (p.x - 2.0).abs() < 1e-6);
            }
        }
    }

    #[test]
    fn offset_shortens_stripes() {
        let contour = rectangle(10.0, 10.0);
        let dashes = stripes(&contour, 0.0, 0.5, 3.0, 0.5, Color32::DEFAULT, &MarkupConfig::default());
        assert!(dashes.iter().all(|d| (d.length - 9.0).abs() < 1e-9));
    }

    #[test]
    fn solid_fill_covers_area() {
        let contour = rectangle(10.0, 10.0);
        let dashes = stripes(&contour, 0.0, SOLID_WIDTH, 1.0, 0.0, Color32::DEFAULT, &MarkupConfig::default());
        let area: f64 = dashes.iter().map(|d| d.length * d.width).sum();
        assert_abs_diff_eq!(area, 100.0, epsilon = 1e-6);
    }

    #[test]
    fn rotated_stripes_stay_inside() {
        let contour = rectangle(8.0, 5.0);
        let dashes = stripes(&contour, 30.0, 0.5, 2.0, 0.0, Color32::DEFAULT, &MarkupConfig::default());
        assert!(!dashes.is_empty());
        for dash in &dashes {
            let (start, end) = dash.ends();
            for p in [start, end] {
                assert!((-1e-6..=8.0 + 1e-6).contains(&p.x));
                assert!((-1e-6..=5.0 + 1e-6).contains(&p.y));
            }
        }
    }
}
