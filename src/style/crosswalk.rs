//! Crosswalk styles and the band they fill.

use xmltree::Element;

use crate::config::{MarkupConfig, MarkupLod};
use crate::error::StyleError;
use crate::geometry::{Intersection, ParametricCurve, Trajectory};
use crate::math::vector_2d::{flat_normalize, left_normal, line_angle};
use crate::math::{Point3, Vector3, TOLERANCE};

use super::helper::{
    calculate_dashed, calculate_solid, dashed_dash, get_parts, offset_by_tan, solid_dash,
};
use super::xml::{attr, flag, set_attr, set_flag};
use super::{
    capabilities, capability, dispatch_style, properties, Capabilities, ChangeNotifier, Color32,
    MarkupStyleDash, MaterialType, StyleType,
};

pub const DEFAULT_CROSSWALK_WIDTH: f64 = 2.0;
pub const DEFAULT_CROSSWALK_DASH_LENGTH: f64 = 0.4;
pub const DEFAULT_CROSSWALK_SPACE_LENGTH: f64 = 0.6;
pub const DEFAULT_CROSSWALK_OFFSET: f64 = 0.3;
pub const DEFAULT_SQUARE_SIDE: f64 = 1.0;
pub const DEFAULT_LINE_COUNT: u32 = 2;

/// A line bounding the crosswalk on one side.
#[derive(Debug, Clone, PartialEq)]
pub struct BorderLine {
    pub trajectory: Trajectory,
    /// Whether the line starts at one of the crosswalk's enter points.
    pub starts_on_enter: bool,
}

/// Band between the enter and the crossing line, clipped by the borders.
#[derive(Debug, Clone, PartialEq)]
pub struct CrosswalkGeometry {
    start: Point3,
    end: Point3,
    normal_dir: Vector3,
    corner_dir: Vector3,
    enter_line: Trajectory,
    crosswalk_line: Trajectory,
    right_border: Trajectory,
    left_border: Trajectory,
}

impl CrosswalkGeometry {
    /// Builds the band for enter points `start` and `end`.
    ///
    /// `normal_dir` points from the enter across the band; the right
    /// border belongs to `start` and the left one to `end`.
    #[must_use]
    pub fn new(
        start: Point3,
        end: Point3,
        normal_dir: &Vector3,
        corner_dir: &Vector3,
        total_width: f64,
        right_border: Option<&BorderLine>,
        left_border: Option<&BorderLine>,
    ) -> Self {
        let normal_dir = flat_normalize(normal_dir);
        let far_line = Trajectory::line(
            start + normal_dir * total_width,
            end + normal_dir * total_width,
        );
        let crossing_t = |border: Option<&BorderLine>, default: f64| {
            border
                .map(|b| Intersection::calculate_single(&far_line, &b.trajectory))
                .filter(|i| i.is_intersect)
                .map_or(default, |i| i.first_t)
        };
        let crosswalk_line = far_line.cut(crossing_t(right_border, 0.0), crossing_t(left_border, 1.0));

        let border_trajectory = |border: Option<&BorderLine>, anchor: Point3| {
            if let Some(border) = border {
                let crossing = Intersection::calculate_single(&border.trajectory, &far_line);
                if crossing.is_intersect {
                    return if border.starts_on_enter {
                        border.trajectory.cut(0.0, crossing.first_t)
                    } else {
                        border.trajectory.cut(crossing.first_t, 1.0)
                    };
                }
            }
            Trajectory::straight(anchor, anchor + normal_dir * total_width)
        };

        Self {
            start,
            end,
            normal_dir,
            corner_dir: flat_normalize(corner_dir),
            enter_line: Trajectory::straight(start, end),
            right_border: border_trajectory(right_border, start),
            left_border: border_trajectory(left_border, end),
            crosswalk_line,
        }
    }

    #[must_use]
    pub fn normal_dir(&self) -> Vector3 {
        self.normal_dir
    }

    #[must_use]
    pub fn corner_dir(&self) -> Vector3 {
        self.corner_dir
    }

    #[must_use]
    pub fn enter_line(&self) -> &Trajectory {
        &self.enter_line
    }

    /// The far edge of the band.
    #[must_use]
    pub fn crosswalk_line(&self) -> &Trajectory {
        &self.crosswalk_line
    }

    #[must_use]
    pub fn right_border(&self) -> &Trajectory {
        &self.right_border
    }

    #[must_use]
    pub fn left_border(&self) -> &Trajectory {
        &self.left_border
    }

    /// Enter line, crossing line, right and left border.
    #[must_use]
    pub fn borders(&self) -> [&Trajectory; 4] {
        [
            &self.enter_line,
            &self.crosswalk_line,
            &self.right_border,
            &self.left_border,
        ]
    }

    /// Row of the band at `offset` from the enter, clipped by the borders.
    #[must_use]
    pub fn trajectory_at(&self, offset: f64) -> Trajectory {
        let line = Trajectory::line(
            self.start + self.normal_dir * offset,
            self.end + self.normal_dir * offset,
        );
        let clip = |border: &Trajectory, default: f64| {
            let crossing = Intersection::calculate_single(&line, border);
            if crossing.is_intersect {
                crossing.first_t
            } else {
                default
            }
        };
        let start_t = clip(&self.right_border, 0.0);
        let end_t = clip(&self.left_border, 1.0);
        line.cut(start_t, end_t)
    }

    /// Direction of crossing dashes: the enter normal when `parallel`,
    /// else the perpendicular of the enter corner.
    #[must_use]
    pub fn dash_direction(&self, parallel: bool) -> Vector3 {
        if parallel {
            return self.normal_dir;
        }
        let across = left_normal(&self.corner_dir);
        if across.dot(&self.normal_dir) < 0.0 {
            -across
        } else {
            across
        }
    }

    /// Stretch of lengths measured along the enter when dashes follow `direction`.
    #[must_use]
    pub fn along_coefficient(&self, direction: &Vector3) -> f64 {
        let sin = line_angle(direction, &self.corner_dir).sin();
        if sin < TOLERANCE {
            1.0
        } else {
            1.0 / sin
        }
    }
}

/// Dashes of `length` along `direction` centred on the middle of
/// `[start_t, end_t]`, clipped to the band.
///
/// A probe through the centre is intersected with the band borders; each
/// inside span is shrunk so the `width`-wide dash does not cross a border.
#[allow(clippy::too_many_arguments)]
#[must_use]
pub fn crosswalk_dash(
    geometry: &CrosswalkGeometry,
    trajectory: &Trajectory,
    start_t: f64,
    end_t: f64,
    direction: &Vector3,
    length: f64,
    width: f64,
    color: Color32,
    config: &MarkupConfig,
) -> Vec<MarkupStyleDash> {
    let direction = flat_normalize(direction);
    let position = trajectory.position((start_t + end_t) / 2.0);
    let probe = Trajectory::line(position, position + direction);
    let crossings = Intersection::calculate_many(&probe, geometry.borders());

    let half_length = length / 2.0;
    let half_width = width / 2.0;
    let mut dashes = Vec::new();
    for i in (1..crossings.len()).step_by(2) {
        let before = crossings[i - 1];
        let after = crossings[i];
        let start = (before.first_t + offset_by_tan(&before, half_width, config))
            .clamp(-half_length, half_length);
        let end = (after.first_t - offset_by_tan(&after, half_width, config))
            .clamp(-half_length, half_length);
        let delta = end - start;
        if delta < config.crosswalk_min_length_ratio * length
            && delta < config.crosswalk_min_width_ratio * width
        {
            continue;
        }
        dashes.push(MarkupStyleDash::from_ends(
            position + direction * start,
            position + direction * end,
            width,
            color,
            MaterialType::RectangleLines,
        ));
    }
    dashes
}

/// Crosswalk painted by the game itself; only reserves space.
#[derive(Debug, Clone, PartialEq)]
pub struct ExistentCrosswalk {
    width: f64,
    notifier: ChangeNotifier,
}

impl ExistentCrosswalk {
    #[must_use]
    pub fn new(width: f64) -> Self {
        Self {
            width,
            notifier: ChangeNotifier::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ZebraCrosswalk {
    color: Color32,
    width: f64,
    offset_before: f64,
    offset_after: f64,
    dash_length: f64,
    space_length: f64,
    parallel: bool,
    notifier: ChangeNotifier,
}

impl ZebraCrosswalk {
    #[must_use]
    pub fn new(
        color: Color32,
        width: f64,
        offset_before: f64,
        offset_after: f64,
        dash_length: f64,
        space_length: f64,
        parallel: bool,
    ) -> Self {
        Self {
            color,
            width,
            offset_before,
            offset_after,
            dash_length,
            space_length,
            parallel,
            notifier: ChangeNotifier::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DoubleZebraCrosswalk {
    color: Color32,
    width: f64,
    offset_before: f64,
    offset_after: f64,
    dash_length: f64,
    space_length: f64,
    parallel: bool,
    offset: f64,
    notifier: ChangeNotifier,
}

impl DoubleZebraCrosswalk {
    #[allow(clippy::too_many_arguments)]
    #[must_use]
    pub fn new(
        color: Color32,
        width: f64,
        offset_before: f64,
        offset_after: f64,
        dash_length: f64,
        space_length: f64,
        parallel: bool,
        offset: f64,
    ) -> Self {
        Self {
            color,
            width,
            offset_before,
            offset_after,
            dash_length,
            space_length,
            parallel,
            offset,
            notifier: ChangeNotifier::default(),
        }
    }
}

/// Two solid lines along the band edges.
#[derive(Debug, Clone, PartialEq)]
pub struct ParallelSolidLinesCrosswalk {
    color: Color32,
    width: f64,
    offset_before: f64,
    offset_after: f64,
    line_width: f64,
    notifier: ChangeNotifier,
}

impl ParallelSolidLinesCrosswalk {
    #[must_use]
    pub fn new(
        color: Color32,
        width: f64,
        offset_before: f64,
        offset_after: f64,
        line_width: f64,
    ) -> Self {
        Self {
            color,
            width,
            offset_before,
            offset_after,
            line_width,
            notifier: ChangeNotifier::default(),
        }
    }
}

/// Two dashed lines along the band edges.
#[derive(Debug, Clone, PartialEq)]
pub struct ParallelDashedLinesCrosswalk {
    color: Color32,
    width: f64,
    offset_before: f64,
    offset_after: f64,
    line_width: f64,
    dash_length: f64,
    space_length: f64,
    notifier: ChangeNotifier,
}

impl ParallelDashedLinesCrosswalk {
    #[allow(clippy::too_many_arguments)]
    #[must_use]
    pub fn new(
        color: Color32,
        width: f64,
        offset_before: f64,
        offset_after: f64,
        line_width: f64,
        dash_length: f64,
        space_length: f64,
    ) -> Self {
        Self {
            color,
            width,
            offset_before,
            offset_after,
            line_width,
            dash_length,
            space_length,
            notifier: ChangeNotifier::default(),
        }
    }
}

/// Zebra rungs between two solid rails.
#[derive(Debug, Clone, PartialEq)]
pub struct LadderCrosswalk {
    color: Color32,
    width: f64,
    offset_before: f64,
    offset_after: f64,
    dash_length: f64,
    space_length: f64,
    line_width: f64,
    notifier: ChangeNotifier,
}

impl LadderCrosswalk {
    #[allow(clippy::too_many_arguments)]
    #[must_use]
    pub fn new(
        color: Color32,
        width: f64,
        offset_before: f64,
        offset_after: f64,
        dash_length: f64,
        space_length: f64,
        line_width: f64,
    ) -> Self {
        Self {
            color,
            width,
            offset_before,
            offset_after,
            dash_length,
            space_length,
            line_width,
            notifier: ChangeNotifier::default(),
        }
    }
}

/// Fully painted band.
#[derive(Debug, Clone, PartialEq)]
pub struct SolidCrosswalk {
    color: Color32,
    width: f64,
    offset_before: f64,
    offset_after: f64,
    notifier: ChangeNotifier,
}

impl SolidCrosswalk {
    #[must_use]
    pub fn new(color: Color32, width: f64, offset_before: f64, offset_after: f64) -> Self {
        Self {
            color,
            width,
            offset_before,
            offset_after,
            notifier: ChangeNotifier::default(),
        }
    }
}

/// `line_count` rows of alternating squares.
#[derive(Debug, Clone, PartialEq)]
pub struct ChessBoardCrosswalk {
    color: Color32,
    offset_before: f64,
    offset_after: f64,
    square_side: f64,
    line_count: u32,
    invert: bool,
    notifier: ChangeNotifier,
}

impl ChessBoardCrosswalk {
    #[must_use]
    pub fn new(
        color: Color32,
        offset_before: f64,
        offset_after: f64,
        square_side: f64,
        line_count: u32,
        invert: bool,
    ) -> Self {
        Self {
            color,
            offset_before,
            offset_after,
            square_side,
            line_count,
            invert,
            notifier: ChangeNotifier::default(),
        }
    }
}

properties!(ZebraCrosswalk { parallel / set_parallel: bool });
properties!(DoubleZebraCrosswalk { parallel / set_parallel: bool });
properties!(ChessBoardCrosswalk {
    square_side / set_square_side: f64,
    line_count / set_line_count: u32,
});

capability!(HasColor { color / set_color: Color32 } for
    ZebraCrosswalk, DoubleZebraCrosswalk, ParallelSolidLinesCrosswalk,
    ParallelDashedLinesCrosswalk, LadderCrosswalk, SolidCrosswalk, ChessBoardCrosswalk);
capability!(HasWidth { width / set_width: f64 } for
    ExistentCrosswalk, ZebraCrosswalk, DoubleZebraCrosswalk, ParallelSolidLinesCrosswalk,
    ParallelDashedLinesCrosswalk, LadderCrosswalk, SolidCrosswalk);
capability!(HasBandOffsets {
    offset_before / set_offset_before: f64,
    offset_after / set_offset_after: f64,
} for
    ZebraCrosswalk, DoubleZebraCrosswalk, ParallelSolidLinesCrosswalk,
    ParallelDashedLinesCrosswalk, LadderCrosswalk, SolidCrosswalk, ChessBoardCrosswalk);
capability!(HasDashPattern {
    dash_length / set_dash_length: f64,
    space_length / set_space_length: f64,
} for ZebraCrosswalk, DoubleZebraCrosswalk, ParallelDashedLinesCrosswalk, LadderCrosswalk);
capability!(HasOffset { offset / set_offset: f64 } for DoubleZebraCrosswalk);
capability!(HasLineWidth { line_width / set_line_width: f64 } for
    ParallelSolidLinesCrosswalk, ParallelDashedLinesCrosswalk, LadderCrosswalk);
capability!(HasInvert { invert / set_invert: bool } for ChessBoardCrosswalk);

capabilities!(ExistentCrosswalk: width);
capabilities!(ZebraCrosswalk: color, width, band_offsets, dash_pattern);
capabilities!(DoubleZebraCrosswalk: color, width, band_offsets, dash_pattern, offset);
capabilities!(ParallelSolidLinesCrosswalk: color, width, band_offsets, line_width);
capabilities!(ParallelDashedLinesCrosswalk: color, width, band_offsets, line_width, dash_pattern);
capabilities!(LadderCrosswalk: color, width, band_offsets, dash_pattern, line_width);
capabilities!(SolidCrosswalk: color, width, band_offsets);
capabilities!(ChessBoardCrosswalk: color, band_offsets, invert);

#[derive(Debug, Clone, PartialEq)]
pub enum CrosswalkStyle {
    Existent(ExistentCrosswalk),
    Zebra(ZebraCrosswalk),
    DoubleZebra(DoubleZebraCrosswalk),
    ParallelSolidLines(ParallelSolidLinesCrosswalk),
    ParallelDashedLines(ParallelDashedLinesCrosswalk),
    Ladder(LadderCrosswalk),
    Solid(SolidCrosswalk),
    ChessBoard(ChessBoardCrosswalk),
}

macro_rules! each_crosswalk {
    ($value:expr, $inner:ident => $body:expr) => {
        dispatch_style!(CrosswalkStyle, $value, $inner => $body, [
            Existent, Zebra, DoubleZebra, ParallelSolidLines, ParallelDashedLines, Ladder,
            Solid, ChessBoard,
        ])
    };
}

/// Perpendicular dashes of one zebra row centred `offset` from the enter.
#[allow(clippy::too_many_arguments)]
fn zebra_row(
    geometry: &CrosswalkGeometry,
    offset: f64,
    width: f64,
    dash_length: f64,
    space_length: f64,
    parallel: bool,
    color: Color32,
    config: &MarkupConfig,
) -> Vec<MarkupStyleDash> {
    let trajectory = geometry.trajectory_at(offset);
    let direction = geometry.dash_direction(parallel);
    let coef = geometry.along_coefficient(&direction);
    calculate_dashed(
        &trajectory,
        dash_length * coef,
        space_length * coef,
        config,
        |t, start, end| {
            crosswalk_dash(geometry, t, start, end, &direction, width, dash_length, color, config)
        },
    )
}

/// Longitudinal lines at both edges of a band `width` wide.
fn edge_lines(
    geometry: &CrosswalkGeometry,
    offset_before: f64,
    width: f64,
    line_width: f64,
    mut stroke: impl FnMut(&Trajectory) -> Vec<MarkupStyleDash>,
) -> Vec<MarkupStyleDash> {
    [
        offset_before + line_width / 2.0,
        offset_before + width - line_width / 2.0,
    ]
    .into_iter()
    .flat_map(|offset| stroke(&geometry.trajectory_at(offset)))
    .collect()
}

impl CrosswalkStyle {
    #[must_use]
    pub fn style_type(&self) -> StyleType {
        match self {
            CrosswalkStyle::Existent(_) => StyleType::CrosswalkExistent,
            CrosswalkStyle::Zebra(_) => StyleType::CrosswalkZebra,
            CrosswalkStyle::DoubleZebra(_) => StyleType::CrosswalkDoubleZebra,
            CrosswalkStyle::ParallelSolidLines(_) => StyleType::CrosswalkParallelSolidLines,
            CrosswalkStyle::ParallelDashedLines(_) => StyleType::CrosswalkParallelDashedLines,
            CrosswalkStyle::Ladder(_) => StyleType::CrosswalkLadder,
            CrosswalkStyle::Solid(_) => StyleType::CrosswalkSolid,
            CrosswalkStyle::ChessBoard(_) => StyleType::CrosswalkChessBoard,
        }
    }

    #[must_use]
    pub fn capabilities(&self) -> &dyn Capabilities {
        each_crosswalk!(self, s => s as &dyn Capabilities)
    }

    pub fn capabilities_mut(&mut self) -> &mut dyn Capabilities {
        each_crosswalk!(self, s => s as &mut dyn Capabilities)
    }

    /// Depth of the band measured from the enter.
    #[must_use]
    pub fn total_width(&self) -> f64 {
        match self {
            CrosswalkStyle::Existent(s) => s.width,
            CrosswalkStyle::Zebra(s) => s.offset_before + s.width + s.offset_after,
            CrosswalkStyle::DoubleZebra(s) => {
                s.offset_before + 2.0 * s.width + s.offset + s.offset_after
            }
            CrosswalkStyle::ParallelSolidLines(s) => s.offset_before + s.width + s.offset_after,
            CrosswalkStyle::ParallelDashedLines(s) => s.offset_before + s.width + s.offset_after,
            CrosswalkStyle::Ladder(s) => s.offset_before + s.width + s.offset_after,
            CrosswalkStyle::Solid(s) => s.offset_before + s.width + s.offset_after,
            CrosswalkStyle::ChessBoard(s) => {
                s.offset_before + s.square_side * f64::from(s.line_count) + s.offset_after
            }
        }
    }

    #[must_use]
    pub fn calculate(
        &self,
        geometry: &CrosswalkGeometry,
        lod: MarkupLod,
        config: &MarkupConfig,
    ) -> Vec<MarkupStyleDash> {
        match self {
            CrosswalkStyle::Existent(_) => Vec::new(),
            CrosswalkStyle::Zebra(s) => zebra_row(
                geometry,
                s.offset_before + s.width / 2.0,
                s.width,
                s.dash_length,
                s.space_length,
                s.parallel,
                s.color,
                config,
            ),
            CrosswalkStyle::DoubleZebra(s) => [
                s.offset_before + s.width / 2.0,
                s.offset_before + s.width * 1.5 + s.offset,
            ]
            .into_iter()
            .flat_map(|offset| {
                zebra_row(
                    geometry,
                    offset,
                    s.width,
                    s.dash_length,
                    s.space_length,
                    s.parallel,
                    s.color,
                    config,
                )
            })
            .collect(),
            CrosswalkStyle::ParallelSolidLines(s) => {
                edge_lines(geometry, s.offset_before, s.width, s.line_width, |t| {
                    calculate_solid(t, lod, config, |part| {
                        vec![solid_dash(part, 0.0, s.line_width, s.color)]
                    })
                })
            }
            CrosswalkStyle::ParallelDashedLines(s) => {
                edge_lines(geometry, s.offset_before, s.width, s.line_width, |t| {
                    calculate_dashed(t, s.dash_length, s.space_length, config, |part, start, end| {
                        vec![dashed_dash(
                            part,
                            start,
                            end,
                            0.0,
                            s.line_width,
                            s.color,
                            MaterialType::RectangleLines,
                        )]
                    })
                })
            }
            CrosswalkStyle::Ladder(s) => {
                let mut dashes = edge_lines(geometry, s.offset_before, s.width, s.line_width, |t| {
                    calculate_solid(t, lod, config, |part| {
                        vec![solid_dash(part, 0.0, s.line_width, s.color)]
                    })
                });
                dashes.extend(zebra_row(
                    geometry,
                    s.offset_before + s.width / 2.0,
                    s.width - 2.0 * s.line_width,
                    s.dash_length,
                    s.space_length,
                    true,
                    s.color,
                    config,
                ));
                dashes
            }
            CrosswalkStyle::Solid(s) => {
                let trajectory = geometry.trajectory_at(s.offset_before + s.width / 2.0);
                let direction = geometry.dash_direction(true);
                let coef = geometry.along_coefficient(&direction);
                let (_, part_width) = get_parts(trajectory.length() / coef, 0.0);
                calculate_dashed(&trajectory, part_width * coef, 0.0, config, |t, start, end| {
                    crosswalk_dash(
                        geometry, t, start, end, &direction, s.width, part_width, s.color, config,
                    )
                })
            }
            CrosswalkStyle::ChessBoard(s) => {
                let direction = geometry.dash_direction(true);
                let coef = geometry.along_coefficient(&direction);
                let side = s.square_side;
                (0..s.line_count)
                    .flat_map(|row| {
                        let offset = s.offset_before + side * (f64::from(row) + 0.5);
                        let mut trajectory = geometry.trajectory_at(offset);
                        if (row % 2 == 1) != s.invert {
                            let skip = trajectory.travel(0.0, side * coef);
                            trajectory = trajectory.cut(skip, 1.0);
                        }
                        calculate_dashed(
                            &trajectory,
                            side * coef,
                            side * coef,
                            config,
                            |t, start, end| {
                                crosswalk_dash(
                                    geometry, t, start, end, &direction, side, side, s.color,
                                    config,
                                )
                            },
                        )
                    })
                    .collect()
            }
        }
    }

    pub(super) fn write_xml(&self, element: &mut Element) {
        match self {
            CrosswalkStyle::Zebra(s) => set_flag(element, "P", s.parallel),
            CrosswalkStyle::DoubleZebra(s) => set_flag(element, "P", s.parallel),
            CrosswalkStyle::ChessBoard(s) => {
                set_attr(element, "SS", s.square_side);
                set_attr(element, "LC", s.line_count);
            }
            _ => {}
        }
    }

    pub(super) fn read_xml(&mut self, element: &Element) -> Result<(), StyleError> {
        match self {
            CrosswalkStyle::Zebra(s) => {
                if let Some(parallel) = flag(element, "P")? {
                    s.parallel = parallel;
                }
            }
            CrosswalkStyle::DoubleZebra(s) => {
                if let Some(parallel) = flag(element, "P")? {
                    s.parallel = parallel;
                }
            }
            CrosswalkStyle::ChessBoard(s) => {
                if let Some(side) = attr(element, "SS")? {
                    s.square_side = side;
                }
                if let Some(count) = attr(element, "LC")? {
                    s.line_count = count;
                }
            }
            _ => {}
        }
        Ok(())
    }
}
