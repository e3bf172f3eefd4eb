//! Stop line styles.
//!
//! A stop line joins two points of the same enter. Its trajectory is
//! oriented so that the left normal points away from the junction, and
//! every stroke is drawn entirely on that side.

use xmltree::Element;

use crate::config::{MarkupConfig, MarkupLod};
use crate::error::StyleError;
use crate::geometry::Trajectory;

use super::helper::{calculate_dashed, calculate_solid, dashed_dash, solid_dash};
use super::line::{
    read_shark_teeth, write_shark_teeth, DashedLine, DoubleDashedLine, DoubleSolidLine,
    SharkTeethLine, SolidAndDashedLine, SolidLine,
};
use super::{
    dispatch_style, Capabilities, Color32, HasDashPattern, HasInvert, HasOffset, HasWidth,
    MarkupStyleDash, MaterialType, StyleType,
};

pub const DEFAULT_STOP_WIDTH: f64 = 0.3;
pub const DEFAULT_STOP_OFFSET: f64 = 0.3;

#[derive(Debug, Clone, PartialEq)]
pub enum StopLineStyle {
    Solid(SolidLine),
    Dashed(DashedLine),
    DoubleSolid(DoubleSolidLine),
    DoubleDashed(DoubleDashedLine),
    SolidAndDashed(SolidAndDashedLine),
    SharkTeeth(SharkTeethLine),
}

macro_rules! each_stop_line {
    ($value:expr, $inner:ident => $body:expr) => {
        dispatch_style!(StopLineStyle, $value, $inner => $body,
            [Solid, Dashed, DoubleSolid, DoubleDashed, SolidAndDashed, SharkTeeth])
    };
}

/// Offsets `(near, far)` of the two strokes of a double stop line.
fn double_offsets(width: f64, offset: f64) -> (f64, f64) {
    (width / 2.0, width * 1.5 + offset)
}

fn dashed(
    trajectory: &Trajectory,
    pattern: &dyn HasDashPattern,
    offsets: &[f64],
    width: f64,
    color: Color32,
    config: &MarkupConfig,
) -> Vec<MarkupStyleDash> {
    calculate_dashed(
        trajectory,
        pattern.dash_length(),
        pattern.space_length(),
        config,
        |t, start, end| {
            offsets
                .iter()
                .map(|&offset| {
                    dashed_dash(t, start, end, offset, width, color, MaterialType::RectangleLines)
                })
                .collect()
        },
    )
}

fn solid(
    trajectory: &Trajectory,
    offsets: &[f64],
    width: f64,
    color: Color32,
    lod: MarkupLod,
    config: &MarkupConfig,
) -> Vec<MarkupStyleDash> {
    calculate_solid(trajectory, lod, config, |t| {
        offsets
            .iter()
            .map(|&offset| solid_dash(t, offset, width, color))
            .collect()
    })
}

impl StopLineStyle {
    #[must_use]
    pub fn style_type(&self) -> StyleType {
        match self {
            StopLineStyle::Solid(_) => StyleType::StopLineSolid,
            StopLineStyle::Dashed(_) => StyleType::StopLineDashed,
            StopLineStyle::DoubleSolid(_) => StyleType::StopLineDoubleSolid,
            StopLineStyle::DoubleDashed(_) => StyleType::StopLineDoubleDashed,
            StopLineStyle::SolidAndDashed(_) => StyleType::StopLineSolidAndDashed,
            StopLineStyle::SharkTeeth(_) => StyleType::StopLineSharkTeeth,
        }
    }

    #[must_use]
    pub fn capabilities(&self) -> &dyn Capabilities {
        each_stop_line!(self, s => s as &dyn Capabilities)
    }

    pub fn capabilities_mut(&mut self) -> &mut dyn Capabilities {
        each_stop_line!(self, s => s as &mut dyn Capabilities)
    }

    #[must_use]
    pub fn calculate(
        &self,
        trajectory: &Trajectory,
        lod: MarkupLod,
        config: &MarkupConfig,
    ) -> Vec<MarkupStyleDash> {
        use super::HasColor;

        match self {
            StopLineStyle::Solid(s) => {
                solid(trajectory, &[s.width() / 2.0], s.width(), s.color(), lod, config)
            }
            StopLineStyle::Dashed(s) => {
                dashed(trajectory, s, &[s.width() / 2.0], s.width(), s.color(), config)
            }
            StopLineStyle::DoubleSolid(s) => {
                let (near, far) = double_offsets(s.width(), s.offset());
                solid(trajectory, &[near, far], s.width(), s.color(), lod, config)
            }
            StopLineStyle::DoubleDashed(s) => {
                let (near, far) = double_offsets(s.width(), s.offset());
                dashed(trajectory, s, &[near, far], s.width(), s.color(), config)
            }
            StopLineStyle::SolidAndDashed(s) => {
                let (near, far) = double_offsets(s.width(), s.offset());
                let (solid_offset, dashed_offset) =
                    if s.invert() { (far, near) } else { (near, far) };
                let mut dashes =
                    solid(trajectory, &[solid_offset], s.width(), s.color(), lod, config);
                dashes.extend(dashed(
                    trajectory,
                    s,
                    &[dashed_offset],
                    s.width(),
                    s.color(),
                    config,
                ));
                dashes
            }
            StopLineStyle::SharkTeeth(s) => s.teeth(trajectory, s.height() / 2.0, config),
        }
    }

    pub(super) fn write_xml(&self, element: &mut Element) {
        if let StopLineStyle::SharkTeeth(s) = self {
            write_shark_teeth(s, element);
        }
    }

    pub(super) fn read_xml(&mut self, element: &Element) -> Result<(), StyleError> {
        if let StopLineStyle::SharkTeeth(s) = self {
            read_shark_teeth(s, element)?;
        }
        Ok(())
    }
}
