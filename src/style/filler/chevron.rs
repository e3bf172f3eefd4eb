//! Chevron filler: nested V shapes following the bisector of two sides.
//!
//! The middle path starts where the two chosen sides meet (or at the middle
//! of the side between them) and ends halfway between their far ends. It is
//! extended by straight lead lines on both ends so the arms still cover the
//! area beyond the path. Every item on the path emits two arms, turned by
//! half the angle between them.

use tracing::trace;

use crate::config::MarkupConfig;
use crate::geometry::{BezierTrajectory, Intersection, ParametricCurve, Trajectory};
use crate::math::intersect_2d::{line_line_intersect_2d, point_at};
use crate::math::vector_2d::{flat_length, flat_normalize, turn};
use crate::math::{Point3, Vector3, TOLERANCE};
use crate::style::helper::get_parts;
use crate::style::{MarkupStyleDash, MaterialType};

use super::simple::{contour_bounds, probe};
use super::{ChevronFiller, ChevronFrom};

/// Middle path crossings closer to its start than this are ignored.
const MIN_MIDDLE_CUT: f64 = 0.1;

/// Lead lines shorter than this are dropped.
const MIN_LEAD_LENGTH: f64 = 0.1;

pub(super) fn calculate(
    style: &ChevronFiller,
    contour: &[Trajectory],
    config: &MarkupConfig,
) -> Vec<MarkupStyleDash> {
    let count = contour.len();
    if count < 3 || style.width <= 0.0 || style.step < 1.0 {
        return Vec::new();
    }

    let angle = if style.invert {
        360.0 - style.angle_between
    } else {
        style.angle_between
    };
    let half = (angle / 2.0).to_radians();
    let coef = half.sin();
    if coef.abs() < TOLERANCE {
        return Vec::new();
    }
    let width_along = style.width / coef;

    let Some(path) = path(style, contour, half, config) else {
        trace!(output = style.output, "chevron has no middle path");
        return Vec::new();
    };

    let (part_count, part_width) = get_parts(style.width, 0.0);
    let part_step = part_width / coef;
    let items = items(
        &path,
        width_along,
        width_along * (style.step - 1.0),
        config,
    );

    let mut dashes = Vec::new();
    for (p0, p1) in items {
        let dir = flat_normalize(&(p1 - p0));
        if flat_length(&dir) < TOLERANCE {
            continue;
        }
        let arms = [turn(&dir, half, true), turn(&dir, half, false)];
        for i in 0..part_count {
            #[allow(clippy::cast_precision_loss)]
            let origin = p0 + dir * (part_step / 2.0 + part_step * i as f64);
            for arm in &arms {
                for (enter, exit) in probe(contour, &origin, arm, true) {
                    if exit.first_t - enter.first_t < TOLERANCE {
                        continue;
                    }
                    dashes.push(MarkupStyleDash::from_ends(
                        point_at(&origin, arm, enter.first_t),
                        point_at(&origin, arm, exit.first_t),
                        part_width,
                        style.color,
                        MaterialType::RectangleFillers,
                    ));
                }
            }
        }
    }
    dashes
}

/// Lead-in, middle and lead-out pieces, in walking order.
fn path(
    style: &ChevronFiller,
    contour: &[Trajectory],
    half: f64,
    config: &MarkupConfig,
) -> Option<Vec<Trajectory>> {
    let count = contour.len();
    let back = match style.starting_from {
        ChevronFrom::Vertex => 1,
        ChevronFrom::Edge => 2,
    };
    let output = style.output as usize % count;
    let opposite = (output + count - back) % count;
    let mut left = contour[output].clone();
    let mut right = contour[opposite].clone();

    let length = left.length().min(right.length());
    if length < TOLERANCE {
        return None;
    }
    left = left.cut(0.0, left.travel(0.0, length));
    let inverted = right.invert();
    right = inverted.cut(0.0, inverted.travel(0.0, length)).invert();

    let start = midpoint(&right.end_position(), &left.start_position());
    let end = midpoint(&right.start_position(), &left.end_position());
    let start_dir = (right.end_direction() + left.start_direction()) / 2.0;
    let end_dir = (right.start_direction() + left.end_direction()) / 2.0;
    if flat_length(&start_dir) < TOLERANCE || flat_length(&end_dir) < TOLERANCE {
        return None;
    }

    let middle = BezierTrajectory::from_directions(start, &start_dir, end, &end_dir, true, true);
    let [_, b, c, _] = middle.points();
    let mut middle = Trajectory::Bezier(middle);

    let cut_t = middle_cut(&middle, contour, [output, opposite]);
    if cut_t < 1.0 {
        middle = middle.cut(0.0, cut_t);
    }
    let end = middle.end_position();

    let rect = contour_bounds(contour);
    let lead = |origin: Point3, dir: Vector3| -> Option<Trajectory> {
        let dir = flat_normalize(&dir);
        if flat_length(&dir) < TOLERANCE {
            return None;
        }
        let reach = rect
            .corners()
            .iter()
            .flat_map(|corner| {
                [true, false].into_iter().filter_map(move |clockwise| {
                    line_line_intersect_2d(&origin, &dir, corner, &turn(&dir, half, clockwise))
                        .map(|(t, _)| t)
                })
            })
            .fold(0.0_f64, f64::max)
            .min(config.parallel_fallback_offset);
        (reach > MIN_LEAD_LENGTH).then(|| Trajectory::straight(origin, origin + dir * reach))
    };

    let mut pieces = Vec::with_capacity(3);
    if let Some(before) = lead(start, start - b) {
        pieces.push(before.invert());
    }
    pieces.push(middle);
    if let Some(after) = lead(end, end - c) {
        pieces.push(after);
    }
    Some(pieces)
}

/// First crossing of the middle path with a contour side past
/// `MIN_MIDDLE_CUT`, ignoring the two sides it is built from.
fn middle_cut(middle: &Trajectory, contour: &[Trajectory], own: [usize; 2]) -> f64 {
    contour
        .iter()
        .enumerate()
        .filter(|(i, _)| !own.contains(i))
        .flat_map(|(_, side)| Intersection::calculate(middle, side))
        .map(|crossing| crossing.first_t)
        .filter(|t| *t >= MIN_MIDDLE_CUT)
        .fold(1.0, f64::min)
}

fn midpoint(a: &Point3, b: &Point3) -> Point3 {
    Point3::from((a.coords + b.coords) / 2.0)
}

/// Position at arc distance `distance` along consecutive pieces.
fn position_along(path: &[Trajectory], mut distance: f64) -> Point3 {
    for piece in path {
        let length = piece.length();
        if distance <= length {
            return piece.position(piece.travel(0.0, distance));
        }
        distance -= length;
    }
    path.last()
        .map_or_else(Point3::origin, ParametricCurve::end_position)
}

/// Item spans along the path, spread so that leading and trailing spaces
/// come out roughly equal.
fn items(
    path: &[Trajectory],
    dash: f64,
    space: f64,
    config: &MarkupConfig,
) -> Vec<(Point3, Point3)> {
    let total: f64 = path.iter().map(ParametricCurve::length).sum();
    if dash <= 0.0 || total < dash {
        return Vec::new();
    }
    let space = space.max(0.0);
    let period = dash + space;
    let start_space = start_space(total, dash, space, config);
    let count = item_count(total, dash, period, start_space);
    (0..count)
        .map(|i| {
            #[allow(clippy::cast_precision_loss)]
            let from = start_space + period * i as f64;
            (position_along(path, from), position_along(path, from + dash))
        })
        .collect()
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn item_count(total: f64, dash: f64, period: f64, start_space: f64) -> usize {
    let fits = ((total - start_space - dash) / period).floor();
    if fits < 0.0 {
        0
    } else {
        fits as usize + 1
    }
}

/// Leading space of the item layout.
///
/// Starts from half a space and moves towards the trailing space until the
/// two differ by less than `chevron_balance_threshold` of their sum. A
/// trailing gap shorter than half a space is counted together with the last
/// item.
fn start_space(total: f64, dash: f64, space: f64, config: &MarkupConfig) -> f64 {
    let period = dash + space;
    let mut next = space / 2.0;
    let mut chosen = next;
    for _ in 0..config.chevron_balance_iterations {
        chosen = next;
        let count = item_count(total, dash, period, chosen);
        #[allow(clippy::cast_precision_loss)]
        let used = chosen + period * count.saturating_sub(1) as f64 + dash;
        let rest = (total - used).max(0.0);
        let end_space = if count > 0 && rest < space / 2.0 { rest + dash } else { rest };

        next = (chosen + end_space) / 2.0;
        let sum = next + end_space;
        if sum < TOLERANCE || (next - end_space).abs() / sum < config.chevron_balance_threshold {
            break;
        }
    }
    chosen
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::super::tests::rectangle;
    use super::*;
    use crate::style::Color32;

    fn chevron(starting_from: ChevronFrom, invert: bool) -> ChevronFiller {
        ChevronFiller::new(Color32::DEFAULT, 0.5, 0.0, 90.0, 3.0, 0, invert, starting_from)
    }

    fn assert_inside(dashes: &[MarkupStyleDash], width: f64, height: f64) {
        for dash in dashes {
            let (start, end) = dash.ends();
            for p in [start, end] {
                assert!((-1e-6..=width + 1e-6).contains(&p.x), "{p:?}");
                assert!((-1e-6..=height + 1e-6).contains(&p.y), "{p:?}");
            }
        }
    }

    #[test]
    fn vertex_chevron_fills_square() {
        let contour = rectangle(10.0, 10.0);
        let dashes = calculate(&chevron(ChevronFrom::Vertex, false), &contour, &MarkupConfig::default());
        assert!(!dashes.is_empty());
        assert_inside(&dashes, 10.0, 10.0);
        assert!(dashes.iter().all(|d| (d.width - 0.1).abs() < 1e-12));
        assert!(dashes.iter().all(|d| d.material == MaterialType::RectangleFillers));
    }

    #[test]
    fn edge_chevron_and_invert_stay_inside() {
        let contour = rectangle(12.0, 6.0);
        let config = MarkupConfig::default();
        for style in [chevron(ChevronFrom::Edge, false), chevron(ChevronFrom::Vertex, true)] {
            let dashes = calculate(&style, &contour, &config);
            assert!(!dashes.is_empty());
            assert_inside(&dashes, 12.0, 6.0);
        }
    }

    #[test]
    fn too_few_sides_is_empty() {
        let contour = rectangle(10.0, 10.0);
        let dashes = calculate(
            &chevron(ChevronFrom::Vertex, false),
            &contour[..2],
            &MarkupConfig::default(),
        );
        assert!(dashes.is_empty());
    }

    #[test]
    fn items_are_balanced() {
        let path = vec![Trajectory::straight(Point3::origin(), Point3::new(10.0, 0.0, 0.0))];
        let spans = items(&path, 1.0, 2.0, &MarkupConfig::default());
        assert_eq!(spans.len(), 3);
        assert_abs_diff_eq!(spans[0].0.x, 1.5, epsilon = 1e-9);
        assert_abs_diff_eq!(10.0 - spans[2].1.x, 1.5, epsilon = 1e-9);
    }

    #[test]
    fn start_space_begins_at_half_a_space() {
        let config = MarkupConfig::default();
        // Zero leading space would fit four items with nothing left over.
        assert_abs_diff_eq!(start_space(10.0, 1.0, 2.0, &config), 1.5, epsilon = 1e-9);
        // A short trailing gap counts with the last item.
        assert_abs_diff_eq!(start_space(8.5, 1.0, 2.0, &config), 1.25, epsilon = 1e-9);

        let config = MarkupConfig {
            chevron_balance_iterations: 0,
            ..MarkupConfig::default()
        };
        assert_abs_diff_eq!(start_space(10.0, 1.0, 2.0, &config), 1.0, epsilon = 1e-9);
    }

    #[test]
    fn middle_cut_skips_its_own_sides() {
        let middle = Trajectory::straight(Point3::origin(), Point3::new(10.0, 0.0, 0.0));
        let contour = vec![
            Trajectory::straight(Point3::new(5.0, -1.0, 0.0), Point3::new(5.0, 1.0, 0.0)),
            Trajectory::straight(Point3::new(8.0, -1.0, 0.0), Point3::new(8.0, 1.0, 0.0)),
            Trajectory::straight(Point3::new(0.5, -1.0, 0.0), Point3::new(0.5, 1.0, 0.0)),
        ];
        assert_abs_diff_eq!(middle_cut(&middle, &contour, [1, 2]), 0.5, epsilon = 1e-9);
        assert_abs_diff_eq!(middle_cut(&middle, &contour, [0, 2]), 0.8, epsilon = 1e-9);
        // Crossings near the start never cut.
        assert_abs_diff_eq!(middle_cut(&middle, &contour[2..], [1, 2]), 1.0, epsilon = 1e-9);
    }
}
