//! Regular line styles: lines drawn between two points along a trajectory.

use xmltree::Element;

use crate::config::{MarkupConfig, MarkupLod};
use crate::error::StyleError;
use crate::geometry::{Intersection, Trajectory};
use crate::math::vector_2d::{direction, turn};
use crate::math::Point3;

use super::helper::{calculate_dashed, calculate_solid, dashed_dash, solid_dash};
use super::xml::{attr, set_attr};
use super::{
    capabilities, capability, dispatch_style, properties, Alignment, Capabilities,
    ChangeNotifier, Color32, MarkupStyleDash, MaterialType, StyleType,
};

pub const DEFAULT_WIDTH: f64 = 0.15;
pub const DEFAULT_DASH_LENGTH: f64 = 1.5;
pub const DEFAULT_SPACE_LENGTH: f64 = 1.5;
pub const DEFAULT_OFFSET: f64 = 0.15;
pub const DEFAULT_SHARK_BASE: f64 = 0.5;
pub const DEFAULT_SHARK_HEIGHT: f64 = 0.6;
pub const DEFAULT_SHARK_SPACE: f64 = 0.5;

/// Surroundings of the line being drawn.
#[derive(Debug, Clone, Copy)]
pub struct LineContext<'a> {
    /// Centre of the owning markup.
    pub position: Point3,
    /// Outer contour of the owning markup.
    pub contour: &'a [Trajectory],
}

impl LineContext<'_> {
    /// A context with no surroundings; nothing is occluded.
    #[must_use]
    pub fn detached() -> LineContext<'static> {
        LineContext {
            position: Point3::origin(),
            contour: &[],
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SolidLine {
    color: Color32,
    width: f64,
    notifier: ChangeNotifier,
}

impl SolidLine {
    #[must_use]
    pub fn new(color: Color32, width: f64) -> Self {
        Self {
            color,
            width,
            notifier: ChangeNotifier::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DashedLine {
    color: Color32,
    width: f64,
    dash_length: f64,
    space_length: f64,
    notifier: ChangeNotifier,
}

impl DashedLine {
    #[must_use]
    pub fn new(color: Color32, width: f64, dash_length: f64, space_length: f64) -> Self {
        Self {
            color,
            width,
            dash_length,
            space_length,
            notifier: ChangeNotifier::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DoubleSolidLine {
    color: Color32,
    width: f64,
    offset: f64,
    alignment: Alignment,
    notifier: ChangeNotifier,
}

impl DoubleSolidLine {
    #[must_use]
    pub fn new(color: Color32, width: f64, offset: f64, alignment: Alignment) -> Self {
        Self {
            color,
            width,
            offset,
            alignment,
            notifier: ChangeNotifier::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DoubleDashedLine {
    color: Color32,
    width: f64,
    dash_length: f64,
    space_length: f64,
    offset: f64,
    alignment: Alignment,
    notifier: ChangeNotifier,
}

impl DoubleDashedLine {
    #[must_use]
    pub fn new(
        color: Color32,
        width: f64,
        dash_length: f64,
        space_length: f64,
        offset: f64,
        alignment: Alignment,
    ) -> Self {
        Self {
            color,
            width,
            dash_length,
            space_length,
            offset,
            alignment,
            notifier: ChangeNotifier::default(),
        }
    }
}

/// A solid stroke beside a dashed one. `invert` swaps their sides.
#[derive(Debug, Clone, PartialEq)]
pub struct SolidAndDashedLine {
    color: Color32,
    width: f64,
    dash_length: f64,
    space_length: f64,
    offset: f64,
    alignment: Alignment,
    invert: bool,
    notifier: ChangeNotifier,
}

impl SolidAndDashedLine {
    #[must_use]
    pub fn new(
        color: Color32,
        width: f64,
        dash_length: f64,
        space_length: f64,
        offset: f64,
        alignment: Alignment,
        invert: bool,
    ) -> Self {
        Self {
            color,
            width,
            dash_length,
            space_length,
            offset,
            alignment,
            invert,
            notifier: ChangeNotifier::default(),
        }
    }

    /// Lateral offsets `(solid, dashed)`.
    #[must_use]
    pub fn offsets(&self) -> (f64, f64) {
        let o = self.offset;
        let solid = match (self.alignment, self.invert) {
            (Alignment::Left, false) | (Alignment::Right, true) => 0.0,
            (Alignment::Left, true) => 2.0 * o,
            (Alignment::Centre, false) => -o,
            (Alignment::Centre, true) => o,
            (Alignment::Right, false) => -2.0 * o,
        };
        let dashed = match (self.alignment, self.invert) {
            (Alignment::Left, false) => 2.0 * o,
            (Alignment::Left, true) | (Alignment::Right, false) => 0.0,
            (Alignment::Centre, false) => o,
            (Alignment::Centre, true) => -o,
            (Alignment::Right, true) => -2.0 * o,
        };
        (solid, dashed)
    }
}

/// Triangles ("give way" teeth) along the trajectory.
#[derive(Debug, Clone, PartialEq)]
pub struct SharkTeethLine {
    color: Color32,
    base: f64,
    height: f64,
    space: f64,
    invert: bool,
    notifier: ChangeNotifier,
}

impl SharkTeethLine {
    #[must_use]
    pub fn new(color: Color32, base: f64, height: f64, space: f64, invert: bool) -> Self {
        Self {
            color,
            base,
            height,
            space,
            invert,
            notifier: ChangeNotifier::default(),
        }
    }

    /// Teeth shifted left by `offset`, apexes flipped when inverted.
    pub(super) fn teeth(
        &self,
        trajectory: &Trajectory,
        offset: f64,
        config: &MarkupConfig,
    ) -> Vec<MarkupStyleDash> {
        calculate_dashed(trajectory, self.base, self.space, config, |t, start, end| {
            let (from, to) = if self.invert { (end, start) } else { (start, end) };
            vec![dashed_dash(
                t,
                from,
                to,
                offset,
                self.height,
                self.color,
                MaterialType::Triangle,
            )]
        })
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct EmptyLine {
    notifier: ChangeNotifier,
}

properties!(SharkTeethLine {
    base / set_base: f64,
    height / set_height: f64,
    space / set_space: f64,
});

capability!(HasColor { color / set_color: Color32 } for
    SolidLine, DashedLine, DoubleSolidLine, DoubleDashedLine, SolidAndDashedLine, SharkTeethLine);
capability!(HasWidth { width / set_width: f64 } for
    SolidLine, DashedLine, DoubleSolidLine, DoubleDashedLine, SolidAndDashedLine);
capability!(HasDashPattern {
    dash_length / set_dash_length: f64,
    space_length / set_space_length: f64,
} for DashedLine, DoubleDashedLine, SolidAndDashedLine);
capability!(HasOffset { offset / set_offset: f64 } for
    DoubleSolidLine, DoubleDashedLine, SolidAndDashedLine);
capability!(HasAlignment { alignment / set_alignment: Alignment } for
    DoubleSolidLine, DoubleDashedLine, SolidAndDashedLine);
capability!(HasInvert { invert / set_invert: bool } for SolidAndDashedLine, SharkTeethLine);

capabilities!(SolidLine: color, width);
capabilities!(DashedLine: color, width, dash_pattern);
capabilities!(DoubleSolidLine: color, width, offset, alignment);
capabilities!(DoubleDashedLine: color, width, dash_pattern, offset, alignment);
capabilities!(SolidAndDashedLine: color, width, dash_pattern, offset, alignment, invert);
capabilities!(SharkTeethLine: color, invert);
capabilities!(EmptyLine);

/// Lateral offsets `(first, second)` of a double line.
#[must_use]
pub fn double_offsets(alignment: Alignment, offset: f64) -> (f64, f64) {
    match alignment {
        Alignment::Left => (2.0 * offset, 0.0),
        Alignment::Centre => (offset, -offset),
        Alignment::Right => (0.0, -2.0 * offset),
    }
}

/// Style of a line between two points of different enters.
#[derive(Debug, Clone, PartialEq)]
pub enum LineStyle {
    Solid(SolidLine),
    Dashed(DashedLine),
    DoubleSolid(DoubleSolidLine),
    DoubleDashed(DoubleDashedLine),
    SolidAndDashed(SolidAndDashedLine),
    SharkTeeth(SharkTeethLine),
    Empty(EmptyLine),
}

macro_rules! each_line {
    ($value:expr, $inner:ident => $body:expr) => {
        dispatch_style!(LineStyle, $value, $inner => $body,
            [Solid, Dashed, DoubleSolid, DoubleDashed, SolidAndDashed, SharkTeeth, Empty])
    };
}

impl LineStyle {
    #[must_use]
    pub fn style_type(&self) -> StyleType {
        match self {
            LineStyle::Solid(_) => StyleType::LineSolid,
            LineStyle::Dashed(_) => StyleType::LineDashed,
            LineStyle::DoubleSolid(_) => StyleType::LineDoubleSolid,
            LineStyle::DoubleDashed(_) => StyleType::LineDoubleDashed,
            LineStyle::SolidAndDashed(_) => StyleType::LineSolidAndDashed,
            LineStyle::SharkTeeth(_) => StyleType::LineSharkTeeth,
            LineStyle::Empty(_) => StyleType::EmptyLine,
        }
    }

    #[must_use]
    pub fn capabilities(&self) -> &dyn Capabilities {
        each_line!(self, s => s as &dyn Capabilities)
    }

    pub fn capabilities_mut(&mut self) -> &mut dyn Capabilities {
        each_line!(self, s => s as &mut dyn Capabilities)
    }

    /// Dashes for `trajectory`, left offsets measured from its direction.
    #[must_use]
    pub fn calculate(
        &self,
        trajectory: &Trajectory,
        context: &LineContext<'_>,
        lod: MarkupLod,
        config: &MarkupConfig,
    ) -> Vec<MarkupStyleDash> {
        match self {
            LineStyle::Solid(s) => calculate_solid(trajectory, lod, config, |t| {
                vec![solid_dash(t, 0.0, s.width, s.color)]
            }),
            LineStyle::Dashed(s) => calculate_dashed(
                trajectory,
                s.dash_length,
                s.space_length,
                config,
                |t, start, end| {
                    vec![dashed_dash(
                        t,
                        start,
                        end,
                        0.0,
                        s.width,
                        s.color,
                        MaterialType::RectangleLines,
                    )]
                },
            ),
            LineStyle::DoubleSolid(s) => {
                let (first, second) = double_offsets(s.alignment, s.offset);
                calculate_solid(trajectory, lod, config, |t| {
                    vec![
                        solid_dash(t, first, s.width, s.color),
                        solid_dash(t, second, s.width, s.color),
                    ]
                })
            }
            LineStyle::DoubleDashed(s) => {
                let (first, second) = double_offsets(s.alignment, s.offset);
                calculate_dashed(
                    trajectory,
                    s.dash_length,
                    s.space_length,
                    config,
                    |t, start, end| {
                        [first, second]
                            .into_iter()
                            .map(|offset| {
                                dashed_dash(
                                    t,
                                    start,
                                    end,
                                    offset,
                                    s.width,
                                    s.color,
                                    MaterialType::RectangleLines,
                                )
                            })
                            .collect()
                    },
                )
            }
            LineStyle::SolidAndDashed(s) => {
                let (solid_offset, dashed_offset) = s.offsets();
                let mut dashes = calculate_solid(trajectory, lod, config, |t| {
                    vec![solid_dash(t, solid_offset, s.width, s.color)]
                });
                dashes.extend(calculate_dashed(
                    trajectory,
                    s.dash_length,
                    s.space_length,
                    config,
                    |t, start, end| {
                        vec![dashed_dash(
                            t,
                            start,
                            end,
                            dashed_offset,
                            s.width,
                            s.color,
                            MaterialType::RectangleLines,
                        )]
                    },
                ));
                dashes
            }
            LineStyle::SharkTeeth(s) => {
                let offset = if s.invert { -s.height } else { s.height } / 2.0;
                let mut teeth = s.teeth(trajectory, offset, config);
                teeth.retain(|tooth| !is_occluded(tooth, context));
                teeth
            }
            LineStyle::Empty(_) => Vec::new(),
        }
    }

    pub(super) fn write_xml(&self, element: &mut Element) {
        if let LineStyle::SharkTeeth(s) = self {
            write_shark_teeth(s, element);
        }
    }

    pub(super) fn read_xml(&mut self, element: &Element) -> Result<(), StyleError> {
        if let LineStyle::SharkTeeth(s) = self {
            read_shark_teeth(s, element)?;
        }
        Ok(())
    }
}

/// A tooth is dropped when the way from the markup centre to either side
/// of it crosses the markup contour.
fn is_occluded(tooth: &MarkupStyleDash, context: &LineContext<'_>) -> bool {
    if context.contour.is_empty() {
        return false;
    }
    let across = turn(&direction(tooth.angle), std::f64::consts::FRAC_PI_2, true);
    [1.0, -1.0].into_iter().any(|side| {
        let corner = tooth.position + across * (side * tooth.width / 2.0);
        let ray = Trajectory::straight(context.position, corner);
        context
            .contour
            .iter()
            .any(|border| !Intersection::calculate(&ray, border).is_empty())
    })
}

pub(super) fn write_shark_teeth(style: &SharkTeethLine, element: &mut Element) {
    set_attr(element, "B", style.base);
    set_attr(element, "H", style.height);
    set_attr(element, "S", style.space);
}

pub(super) fn read_shark_teeth(
    style: &mut SharkTeethLine,
    element: &Element,
) -> Result<(), StyleError> {
    if let Some(base) = attr(element, "B")? {
        style.base = base;
    }
    if let Some(height) = attr(element, "H")? {
        style.height = height;
    }
    if let Some(space) = attr(element, "S")? {
        style.space = space;
    }
    Ok(())
}
