//! Filler styles: areas bounded by a closed contour.

mod chevron;
mod mesh;
mod simple;

use xmltree::Element;

use crate::config::{MarkupConfig, MarkupLod};
use crate::error::StyleError;
use crate::geometry::{ParametricCurve, Trajectory};

use super::xml::{attr, set_attr};
use super::{
    capabilities, capability, dispatch_style, properties, Capabilities, ChangeNotifier, Color32,
    MaterialType, StyleData, StyleType,
};

pub use mesh::triangulate_contour;

pub const DEFAULT_ANGLE: f64 = 0.0;
pub const DEFAULT_STEP_STRIPE: f64 = 3.0;
pub const DEFAULT_STEP_GRID: f64 = 6.0;
pub const DEFAULT_FILLER_OFFSET: f64 = 0.0;
pub const DEFAULT_STRIPE_WIDTH: f64 = 0.5;
pub const DEFAULT_ANGLE_BETWEEN: f64 = 90.0;
pub const DEFAULT_ELEVATION: f64 = 0.3;

/// One side of a filler contour.
#[derive(Debug, Clone, PartialEq)]
pub struct FillerPart {
    pub trajectory: Trajectory,
    /// Side running along an enter rather than a markup line.
    pub is_enter_line: bool,
}

/// Shrinks every line side adjacent to an enter side by `median_offset`
/// and re-anchors the enter side to the new end, keeping the loop closed.
///
/// Enter sides always become straight chords, even for a zero offset.
/// Contours without enter sides are returned unchanged.
#[must_use]
pub fn apply_median_offset(parts: &[FillerPart], median_offset: f64) -> Vec<Trajectory> {
    let mut trajectories: Vec<Trajectory> = parts.iter().map(|p| p.trajectory.clone()).collect();
    let count = parts.len();
    if count < 3 || !parts.iter().any(|p| p.is_enter_line) {
        return trajectories;
    }

    for i in 0..count {
        if parts[i].is_enter_line {
            continue;
        }
        let prev = (i + count - 1) % count;
        let next = (i + 1) % count;

        if parts[prev].is_enter_line {
            let t = trajectories[i].travel(0.0, median_offset);
            trajectories[i] = trajectories[i].cut(t, 1.0);
            trajectories[prev] = Trajectory::straight(
                trajectories[prev].start_position(),
                trajectories[i].start_position(),
            );
        }
        if parts[next].is_enter_line {
            let inverted = trajectories[i].invert();
            let t = inverted.travel(0.0, median_offset);
            trajectories[i] = inverted.cut(t, 1.0).invert();
            trajectories[next] = Trajectory::straight(
                trajectories[i].end_position(),
                trajectories[next].end_position(),
            );
        }
    }
    trajectories
}

/// Parallel stripes across the area. Used for both stripe and grid fillers.
#[derive(Debug, Clone, PartialEq)]
pub struct SimpleFiller {
    color: Color32,
    width: f64,
    /// Degrees.
    angle: f64,
    /// Stripe period in stripe widths.
    step: f64,
    /// Gap kept between stripes and the contour.
    offset: f64,
    median_offset: f64,
    notifier: ChangeNotifier,
}

impl SimpleFiller {
    #[must_use]
    pub fn new(
        color: Color32,
        width: f64,
        angle: f64,
        step: f64,
        offset: f64,
        median_offset: f64,
    ) -> Self {
        Self {
            color,
            width,
            angle,
            step,
            offset,
            median_offset,
            notifier: ChangeNotifier::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SolidFiller {
    color: Color32,
    median_offset: f64,
    notifier: ChangeNotifier,
}

impl SolidFiller {
    #[must_use]
    pub fn new(color: Color32, median_offset: f64) -> Self {
        Self {
            color,
            median_offset,
            notifier: ChangeNotifier::default(),
        }
    }
}

/// Where the chevron's middle line starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ChevronFrom {
    /// At the vertex shared by two neighbouring sides.
    #[default]
    Vertex,
    /// At the middle of the side between them.
    Edge,
}

impl ChevronFrom {
    #[must_use]
    pub fn index(self) -> i32 {
        match self {
            ChevronFrom::Vertex => 0,
            ChevronFrom::Edge => 1,
        }
    }

    #[must_use]
    pub fn from_index(index: i32) -> Option<Self> {
        match index {
            0 => Some(ChevronFrom::Vertex),
            1 => Some(ChevronFrom::Edge),
            _ => None,
        }
    }
}

/// Nested V shapes along the bisector of two contour sides.
#[derive(Debug, Clone, PartialEq)]
pub struct ChevronFiller {
    color: Color32,
    width: f64,
    median_offset: f64,
    /// Degrees between the arms.
    angle_between: f64,
    step: f64,
    /// Index of the side the pattern is built from.
    output: u32,
    invert: bool,
    starting_from: ChevronFrom,
    notifier: ChangeNotifier,
}

impl ChevronFiller {
    #[allow(clippy::too_many_arguments)]
    #[must_use]
    pub fn new(
        color: Color32,
        width: f64,
        median_offset: f64,
        angle_between: f64,
        step: f64,
        output: u32,
        invert: bool,
        starting_from: ChevronFrom,
    ) -> Self {
        Self {
            color,
            width,
            median_offset,
            angle_between,
            step,
            output,
            invert,
            starting_from,
            notifier: ChangeNotifier::default(),
        }
    }
}

/// Raised textured surface (pavement or grass).
#[derive(Debug, Clone, PartialEq)]
pub struct MeshFiller {
    elevation: f64,
    median_offset: f64,
    notifier: ChangeNotifier,
}

impl MeshFiller {
    #[must_use]
    pub fn new(elevation: f64, median_offset: f64) -> Self {
        Self {
            elevation,
            median_offset,
            notifier: ChangeNotifier::default(),
        }
    }
}

properties!(SimpleFiller {
    angle / set_angle: f64,
    step / set_step: f64,
    offset / set_offset: f64,
});
properties!(ChevronFiller {
    angle_between / set_angle_between: f64,
    step / set_step: f64,
    output / set_output: u32,
    starting_from / set_starting_from: ChevronFrom,
});
properties!(MeshFiller { elevation / set_elevation: f64 });

capability!(HasColor { color / set_color: Color32 } for SimpleFiller, SolidFiller, ChevronFiller);
capability!(HasWidth { width / set_width: f64 } for SimpleFiller, ChevronFiller);
capability!(HasMedianOffset { median_offset / set_median_offset: f64 } for
    SimpleFiller, SolidFiller, ChevronFiller, MeshFiller);
capability!(HasInvert { invert / set_invert: bool } for ChevronFiller);

capabilities!(SimpleFiller: color, width, median_offset);
capabilities!(SolidFiller: color, median_offset);
capabilities!(ChevronFiller: color, width, median_offset, invert);
capabilities!(MeshFiller: median_offset);

#[derive(Debug, Clone, PartialEq)]
pub enum FillerStyle {
    Stripe(SimpleFiller),
    Grid(SimpleFiller),
    Solid(SolidFiller),
    Chevron(ChevronFiller),
    Pavement(MeshFiller),
    Grass(MeshFiller),
}

macro_rules! each_filler {
    ($value:expr, $inner:ident => $body:expr) => {
        dispatch_style!(FillerStyle, $value, $inner => $body,
            [Stripe, Grid, Solid, Chevron, Pavement, Grass])
    };
}

impl FillerStyle {
    #[must_use]
    pub fn style_type(&self) -> StyleType {
        match self {
            FillerStyle::Stripe(_) => StyleType::FillerStripe,
            FillerStyle::Grid(_) => StyleType::FillerGrid,
            FillerStyle::Solid(_) => StyleType::FillerSolid,
            FillerStyle::Chevron(_) => StyleType::FillerChevron,
            FillerStyle::Pavement(_) => StyleType::FillerPavement,
            FillerStyle::Grass(_) => StyleType::FillerGrass,
        }
    }

    #[must_use]
    pub fn capabilities(&self) -> &dyn Capabilities {
        each_filler!(self, s => s as &dyn Capabilities)
    }

    pub fn capabilities_mut(&mut self) -> &mut dyn Capabilities {
        each_filler!(self, s => s as &mut dyn Capabilities)
    }

    #[must_use]
    pub fn median_offset(&self) -> f64 {
        each_filler!(self, s => s.median_offset)
    }

    /// Fills the closed contour described by `parts`.
    #[must_use]
    pub fn calculate(
        &self,
        parts: &[FillerPart],
        lod: MarkupLod,
        config: &MarkupConfig,
    ) -> StyleData {
        let trajectories = apply_median_offset(parts, self.median_offset());
        if trajectories.len() < 3 {
            return StyleData::Empty;
        }
        match self {
            FillerStyle::Stripe(s) => StyleData::Dashes(simple::stripes(
                &trajectories,
                s.angle,
                s.width,
                s.step,
                s.offset,
                s.color,
                config,
            )),
            FillerStyle::Grid(s) => {
                let cross = if s.angle < 0.0 { s.angle + 90.0 } else { s.angle - 90.0 };
                let mut dashes = Vec::new();
                for angle in [s.angle, cross] {
                    dashes.extend(simple::stripes(
                        &trajectories,
                        angle,
                        s.width,
                        s.step,
                        s.offset,
                        s.color,
                        config,
                    ));
                }
                StyleData::Dashes(dashes)
            }
            FillerStyle::Solid(s) => StyleData::Dashes(simple::stripes(
                &trajectories,
                0.0,
                simple::SOLID_WIDTH,
                1.0,
                0.0,
                s.color,
                config,
            )),
            FillerStyle::Chevron(s) => StyleData::Dashes(chevron::calculate(s, &trajectories, config)),
            FillerStyle::Pavement(s) => {
                mesh::calculate(&trajectories, s.elevation, MaterialType::Pavement, lod, config)
            }
            FillerStyle::Grass(s) => {
                mesh::calculate(&trajectories, s.elevation, MaterialType::Grass, lod, config)
            }
        }
    }

    pub(super) fn write_xml(&self, element: &mut Element) {
        match self {
            FillerStyle::Stripe(s) | FillerStyle::Grid(s) => {
                set_attr(element, "A", s.angle);
                set_attr(element, "S", s.step);
                set_attr(element, "O", s.offset);
            }
            FillerStyle::Chevron(s) => {
                set_attr(element, "A", s.angle_between);
                set_attr(element, "S", s.step);
                set_attr(element, "O", s.output);
                set_attr(element, "SF", s.starting_from.index());
            }
            FillerStyle::Pavement(s) | FillerStyle::Grass(s) => {
                set_attr(element, "E", s.elevation);
            }
            FillerStyle::Solid(_) => {}
        }
    }

    pub(super) fn read_xml(&mut self, element: &Element) -> Result<(), StyleError> {
        match self {
            FillerStyle::Stripe(s) | FillerStyle::Grid(s) => {
                if let Some(angle) = attr(element, "A")? {
                    s.angle = angle;
                }
                if let Some(step) = attr(element, "S")? {
                    s.step = step;
                }
                if let Some(offset) = attr(element, "O")? {
                    s.offset = offset;
                }
            }
            FillerStyle::Chevron(s) => {
                if let Some(angle) = attr(element, "A")? {
                    s.angle_between = angle;
                }
                if let Some(step) = attr(element, "S")? {
                    s.step = step;
                }
                if let Some(output) = attr(element, "O")? {
                    s.output = output;
                }
                if let Some(index) = attr::<i32>(element, "SF")? {
                    s.starting_from = ChevronFrom::from_index(index).ok_or_else(|| {
                        StyleError::InvalidAttribute {
                            key: "SF",
                            value: index.to_string(),
                        }
                    })?;
                }
            }
            FillerStyle::Pavement(s) | FillerStyle::Grass(s) => {
                if let Some(elevation) = attr(element, "E")? {
                    s.elevation = elevation;
                }
            }
            FillerStyle::Solid(_) => {}
        }
        Ok(())
    }
}
