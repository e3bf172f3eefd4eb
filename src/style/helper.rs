//! Placement of dashes along trajectories.

use tracing::trace;

use crate::config::{MarkupConfig, MarkupLod};
use crate::geometry::{Intersection, ParametricCurve, Trajectory};
use crate::math::vector_2d::left_normal;
use crate::math::TOLERANCE;

use super::{Color32, MarkupStyleDash, MaterialType};

/// Recursion cap for solid chunking.
const MAX_SOLID_DEPTH: u32 = 16;

/// Splits `trajectory` into chunks short and straight enough to be drawn
/// as one rectangle each, and maps every chunk through `make`.
pub fn calculate_solid<F>(
    trajectory: &Trajectory,
    lod: MarkupLod,
    config: &MarkupConfig,
    mut make: F,
) -> Vec<MarkupStyleDash>
where
    F: FnMut(&Trajectory) -> Vec<MarkupStyleDash>,
{
    if trajectory.length() < TOLERANCE {
        return Vec::new();
    }
    split_smooth(trajectory, lod, config)
        .iter()
        .flat_map(&mut make)
        .collect()
}

/// Pieces of `trajectory` each within the chunk length and the LOD angle tolerance.
#[must_use]
pub fn split_smooth(trajectory: &Trajectory, lod: MarkupLod, config: &MarkupConfig) -> Vec<Trajectory> {
    let mut parts = Vec::new();
    solid_parts(trajectory, 0, config.angle_tolerance(lod), config, &mut parts);
    parts
}

fn solid_parts(
    trajectory: &Trajectory,
    depth: u32,
    angle_tolerance: f64,
    config: &MarkupConfig,
    parts: &mut Vec<Trajectory>,
) {
    let length = trajectory.length();
    let needs_split = length > config.max_solid_length
        || trajectory.delta_angle() > angle_tolerance;
    if needs_split && length >= config.min_solid_length && depth < MAX_SOLID_DEPTH {
        let middle = trajectory.travel(0.0, length / 2.0);
        solid_parts(&trajectory.cut(0.0, middle), depth + 1, angle_tolerance, config, parts);
        solid_parts(&trajectory.cut(middle, 1.0), depth + 1, angle_tolerance, config, parts);
    } else {
        parts.push(trajectory.clone());
    }
}

/// Walks `trajectory` from `t = 0`, alternating `dash_length` and
/// `space_length`, and maps every dash span `(start_t, end_t)` through `make`.
///
/// A trailing partial dash is kept when it is at least
/// `min_partial_dash_ratio` of the dash length.
pub fn calculate_dashed<F>(
    trajectory: &Trajectory,
    dash_length: f64,
    space_length: f64,
    config: &MarkupConfig,
    mut make: F,
) -> Vec<MarkupStyleDash>
where
    F: FnMut(&Trajectory, f64, f64) -> Vec<MarkupStyleDash>,
{
    let mut dashes = Vec::new();
    if trajectory.length() < TOLERANCE || dash_length <= 0.0 || space_length < 0.0 {
        return dashes;
    }

    let mut start_t = 0.0;
    loop {
        let end_t = trajectory.travel(start_t, dash_length);
        if end_t <= start_t {
            trace!(start_t, "dash pattern made no progress");
            break;
        }
        if end_t >= 1.0 {
            let rest = trajectory.cut(start_t, 1.0).length();
            if rest >= dash_length * config.min_partial_dash_ratio {
                dashes.extend(make(trajectory, start_t, 1.0));
            }
            break;
        }
        dashes.extend(make(trajectory, start_t, end_t));

        let next_t = trajectory.travel(end_t, space_length);
        if next_t >= 1.0 {
            break;
        }
        start_t = next_t;
    }
    dashes
}

/// Dash over `[start_t, end_t]` shifted left of the trajectory by `offset`.
#[must_use]
pub fn dashed_dash(
    trajectory: &Trajectory,
    start_t: f64,
    end_t: f64,
    offset: f64,
    width: f64,
    color: Color32,
    material: MaterialType,
) -> MarkupStyleDash {
    let mut start = trajectory.position(start_t);
    let mut end = trajectory.position(end_t);
    if offset != 0.0 {
        start += left_normal(&trajectory.direction(start_t)) * offset;
        end += left_normal(&trajectory.direction(end_t)) * offset;
    }
    MarkupStyleDash::from_ends(start, end, width, color, material)
}

/// One line dash over the whole trajectory.
#[must_use]
pub fn solid_dash(
    trajectory: &Trajectory,
    offset: f64,
    width: f64,
    color: Color32,
) -> MarkupStyleDash {
    dashed_dash(
        trajectory,
        0.0,
        1.0,
        offset,
        width,
        color,
        MaterialType::RectangleLines,
    )
}

/// Splits a wide stroke into equal parts between 0.10 and 0.30 wide.
///
/// Returns `(count, part_width)`. Narrow or offset strokes stay whole.
#[must_use]
pub fn get_parts(width: f64, offset: f64) -> (usize, f64) {
    if width < 0.2 || offset != 0.0 {
        return (1, width);
    }

    #[allow(clippy::cast_possible_truncation)]
    let int_width = (width * 100.0).round() as i64;
    let mut best_num = 10;
    let mut best_rest = i64::MAX;
    for num in 10..=30 {
        let rest = int_width % num;
        if rest < best_rest {
            best_num = num;
            best_rest = rest;
        }
        if rest == 0 {
            break;
        }
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let count = (int_width / best_num).max(1) as usize;
    #[allow(clippy::cast_precision_loss)]
    let part_width = best_num as f64 / 100.0;
    (count, part_width)
}

/// `half_width / tan(angle)`, or the configured fallback for parallel lines.
#[must_use]
pub fn offset_by_tan(intersection: &Intersection, half_width: f64, config: &MarkupConfig) -> f64 {
    if half_width == 0.0 {
        return 0.0;
    }
    let tan = intersection.angle.tan();
    if tan.abs() < TOLERANCE {
        config.parallel_fallback_offset
    } else {
        half_width / tan
    }
}

/// `offset / sin(angle)`, or the configured fallback for parallel lines.
#[must_use]
pub fn offset_by_sin(intersection: &Intersection, offset: f64, config: &MarkupConfig) -> f64 {
    if offset == 0.0 {
        return 0.0;
    }
    let sin = intersection.angle.sin();
    if sin.abs() < TOLERANCE {
        config.parallel_fallback_offset
    } else {
        offset / sin
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;
    use crate::math::Point3;

    fn straight(length: f64) -> Trajectory {
        Trajectory::straight(Point3::origin(), Point3::new(length, 0.0, 0.0))
    }

    fn line_dash(trajectory: &Trajectory, start_t: f64, end_t: f64) -> Vec<MarkupStyleDash> {
        vec![dashed_dash(
            trajectory,
            start_t,
            end_t,
            0.0,
            0.15,
            Color32::DEFAULT,
            MaterialType::RectangleLines,
        )]
    }

    #[test]
    fn solid_short_line_is_one_dash() {
        let config = MarkupConfig::default();
        let dashes = calculate_solid(&straight(10.0), MarkupLod::Lod0, &config, |t| {
            vec![solid_dash(t, 0.0, 0.15, Color32::DEFAULT)]
        });
        assert_eq!(dashes.len(), 1);
        assert_abs_diff_eq!(dashes[0].position, Point3::new(5.0, 0.0, 0.0), epsilon = 1e-12);
        assert_abs_diff_eq!(dashes[0].length, 10.0, epsilon = 1e-12);
    }

    #[test]
    fn solid_long_line_is_chunked() {
        let config = MarkupConfig::default();
        let dashes = calculate_solid(&straight(35.0), MarkupLod::Lod1, &config, |t| {
            vec![solid_dash(t, 0.0, 0.15, Color32::DEFAULT)]
        });
        assert!(dashes.len() > 1);
        assert!(dashes.iter().all(|d| d.length <= config.max_solid_length));
        let total: f64 = dashes.iter().map(|d| d.length).sum();
        assert_abs_diff_eq!(total, 35.0, epsilon = 1e-9);
    }

    #[test]
    fn solid_curve_respects_angle_tolerance() {
        let config = MarkupConfig::default();
        let curve = Trajectory::bezier(
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(0.0, 4.0, 0.0),
            Point3::new(4.0, 8.0, 0.0),
            Point3::new(8.0, 8.0, 0.0),
        );
        let mut pieces = Vec::new();
        let _ = calculate_solid(&curve, MarkupLod::Lod0, &config, |t| {
            pieces.push(t.clone());
            Vec::new()
        });
        assert!(pieces.len() > 1);
        for piece in &pieces {
            assert!(
                piece.delta_angle() <= config.angle_tolerance(MarkupLod::Lod0)
                    || piece.length() < config.min_solid_length
            );
        }
    }

    #[test]
    fn dashed_periods() {
        let config = MarkupConfig::default();
        let dashes = calculate_dashed(&straight(10.0), 1.5, 1.5, &config, line_dash);
        let centers: Vec<f64> = dashes.iter().map(|d| d.position.x).collect();
        assert_eq!(centers.len(), 4);
        for (center, expected) in centers.iter().zip([0.75, 3.75, 6.75]) {
            assert_abs_diff_eq!(*center, expected, epsilon = 1e-9);
        }
        let full = dashes
            .iter()
            .filter(|d| (d.length - 1.5).abs() < 1e-9)
            .count();
        assert_eq!(full, 3);
        assert!(dashes.iter().all(|d| d.length <= 1.5 + 1e-9));
    }

    #[test]
    fn dashed_drops_trailing_sliver() {
        let config = MarkupConfig::default();
        let dashes = calculate_dashed(&straight(9.1), 1.5, 1.5, &config, line_dash);
        assert_eq!(dashes.len(), 3);
    }

    #[test]
    fn dashed_tolerates_degenerate_input() {
        let config = MarkupConfig::default();
        assert!(calculate_dashed(&straight(0.0), 1.5, 1.5, &config, line_dash).is_empty());
        assert!(calculate_dashed(&straight(5.0), 0.0, 1.5, &config, line_dash).is_empty());
        let touching = calculate_dashed(&straight(3.0), 1.0, 0.0, &config, line_dash);
        assert_eq!(touching.len(), 3);
    }

    #[test]
    fn offset_dash_moves_left() {
        let dash = solid_dash(&straight(4.0), 0.5, 0.1, Color32::DEFAULT);
        assert_abs_diff_eq!(dash.position, Point3::new(2.0, 0.5, 0.0), epsilon = 1e-12);
    }

    #[test]
    fn parts_split_wide_strokes() {
        assert_eq!(get_parts(0.15, 0.0), (1, 0.15));
        assert_eq!(get_parts(2.0, 0.5), (1, 2.0));
        let (count, width) = get_parts(2.0, 0.0);
        assert_eq!(count, 20);
        assert_abs_diff_eq!(width, 0.1, epsilon = 1e-12);
        let (count, width) = get_parts(0.37, 0.0);
        assert_abs_diff_eq!(count as f64 * width, 0.37, epsilon = 0.1);
        assert!((0.1..=0.3).contains(&width));
    }

    #[test]
    fn parallel_fallback() {
        let config = MarkupConfig::default();
        let parallel = Intersection::new(0.5, 0.5, 0.0);
        assert_abs_diff_eq!(offset_by_tan(&parallel, 1.0, &config), 1000.0);
        assert_abs_diff_eq!(offset_by_sin(&parallel, 0.0, &config), 0.0);
        let square = Intersection::new(0.5, 0.5, std::f64::consts::FRAC_PI_4);
        assert_abs_diff_eq!(offset_by_tan(&square, 1.0, &config), 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(
            offset_by_sin(&square, 1.0, &config),
            std::f64::consts::SQRT_2,
            epsilon = 1e-12
        );
    }
}
