//! Default style instances keyed by type.

use std::collections::HashMap;

use crate::error::StyleError;

use super::crosswalk::{
    ChessBoardCrosswalk, DoubleZebraCrosswalk, ExistentCrosswalk, LadderCrosswalk,
    ParallelDashedLinesCrosswalk, ParallelSolidLinesCrosswalk, SolidCrosswalk, ZebraCrosswalk,
    DEFAULT_CROSSWALK_DASH_LENGTH, DEFAULT_CROSSWALK_OFFSET, DEFAULT_CROSSWALK_SPACE_LENGTH,
    DEFAULT_CROSSWALK_WIDTH, DEFAULT_LINE_COUNT, DEFAULT_SQUARE_SIDE,
};
use super::filler::{
    ChevronFiller, ChevronFrom, MeshFiller, SimpleFiller, SolidFiller, DEFAULT_ANGLE,
    DEFAULT_ANGLE_BETWEEN, DEFAULT_ELEVATION, DEFAULT_FILLER_OFFSET, DEFAULT_STEP_GRID,
    DEFAULT_STEP_STRIPE, DEFAULT_STRIPE_WIDTH,
};
use super::line::{
    DashedLine, DoubleDashedLine, DoubleSolidLine, EmptyLine, SharkTeethLine, SolidAndDashedLine,
    SolidLine, DEFAULT_DASH_LENGTH, DEFAULT_OFFSET, DEFAULT_SHARK_BASE, DEFAULT_SHARK_HEIGHT,
    DEFAULT_SHARK_SPACE, DEFAULT_SPACE_LENGTH, DEFAULT_WIDTH,
};
use super::stop_line::{DEFAULT_STOP_OFFSET, DEFAULT_STOP_WIDTH};
use super::{
    Alignment, Color32, CrosswalkStyle, FillerStyle, LineStyle, StopLineStyle, Style, StyleType,
};

/// Read-only table of default styles.
///
/// Built once and passed by reference to whatever creates styles. Entries
/// can be replaced while building, e.g. from user templates.
#[derive(Debug, Clone)]
pub struct StyleRegistry {
    styles: HashMap<StyleType, Style>,
}

impl Default for StyleRegistry {
    fn default() -> Self {
        Self {
            styles: StyleType::ALL
                .into_iter()
                .map(|style_type| (style_type, builtin(style_type)))
                .collect(),
        }
    }
}

impl StyleRegistry {
    /// Replaces the default for the style's own type.
    #[must_use]
    pub fn with_default(mut self, style: Style) -> Self {
        self.styles.insert(style.style_type(), style);
        self
    }

    /// A fresh copy of the default for `style_type`.
    #[must_use]
    pub fn default_style(&self, style_type: StyleType) -> Style {
        self.styles
            .get(&style_type)
            .cloned()
            .unwrap_or_else(|| builtin(style_type))
    }

    /// Default of a regular line type.
    ///
    /// # Errors
    ///
    /// [`StyleError::WrongFamily`] when `style_type` is not a regular line type.
    pub fn line_style(&self, style_type: StyleType) -> Result<LineStyle, StyleError> {
        self.default_style(style_type).try_into()
    }

    /// Default of a stop line type.
    ///
    /// # Errors
    ///
    /// [`StyleError::WrongFamily`] when `style_type` is not a stop line type.
    pub fn stop_line_style(&self, style_type: StyleType) -> Result<StopLineStyle, StyleError> {
        self.default_style(style_type).try_into()
    }

    /// # Errors
    ///
    /// [`StyleError::WrongFamily`] when `style_type` is not a crosswalk type.
    pub fn crosswalk_style(&self, style_type: StyleType) -> Result<CrosswalkStyle, StyleError> {
        self.default_style(style_type).try_into()
    }

    /// # Errors
    ///
    /// [`StyleError::WrongFamily`] when `style_type` is not a filler type.
    pub fn filler_style(&self, style_type: StyleType) -> Result<FillerStyle, StyleError> {
        self.default_style(style_type).try_into()
    }
}

fn builtin(style_type: StyleType) -> Style {
    let color = Color32::DEFAULT;
    match style_type {
        StyleType::LineSolid => LineStyle::Solid(SolidLine::new(color, DEFAULT_WIDTH)).into(),
        StyleType::LineDashed => LineStyle::Dashed(DashedLine::new(
            color,
            DEFAULT_WIDTH,
            DEFAULT_DASH_LENGTH,
            DEFAULT_SPACE_LENGTH,
        ))
        .into(),
        StyleType::LineDoubleSolid => LineStyle::DoubleSolid(DoubleSolidLine::new(
            color,
            DEFAULT_WIDTH,
            DEFAULT_OFFSET,
            Alignment::Centre,
        ))
        .into(),
        StyleType::LineDoubleDashed => LineStyle::DoubleDashed(DoubleDashedLine::new(
            color,
            DEFAULT_WIDTH,
            DEFAULT_DASH_LENGTH,
            DEFAULT_SPACE_LENGTH,
            DEFAULT_OFFSET,
            Alignment::Centre,
        ))
        .into(),
        StyleType::LineSolidAndDashed => LineStyle::SolidAndDashed(SolidAndDashedLine::new(
            color,
            DEFAULT_WIDTH,
            DEFAULT_DASH_LENGTH,
            DEFAULT_SPACE_LENGTH,
            DEFAULT_OFFSET,
            Alignment::Centre,
            false,
        ))
        .into(),
        StyleType::LineSharkTeeth => LineStyle::SharkTeeth(shark_teeth()).into(),
        StyleType::EmptyLine => LineStyle::Empty(EmptyLine::default()).into(),

        StyleType::StopLineSolid => {
            StopLineStyle::Solid(SolidLine::new(color, DEFAULT_STOP_WIDTH)).into()
        }
        StyleType::StopLineDashed => StopLineStyle::Dashed(DashedLine::new(
            color,
            DEFAULT_STOP_WIDTH,
            DEFAULT_DASH_LENGTH,
            DEFAULT_SPACE_LENGTH,
        ))
        .into(),
        StyleType::StopLineDoubleSolid => StopLineStyle::DoubleSolid(DoubleSolidLine::new(
            color,
            DEFAULT_STOP_WIDTH,
            DEFAULT_STOP_OFFSET,
            Alignment::Centre,
        ))
        .into(),
        StyleType::StopLineDoubleDashed => StopLineStyle::DoubleDashed(DoubleDashedLine::new(
            color,
            DEFAULT_STOP_WIDTH,
            DEFAULT_DASH_LENGTH,
            DEFAULT_SPACE_LENGTH,
            DEFAULT_STOP_OFFSET,
            Alignment::Centre,
        ))
        .into(),
        StyleType::StopLineSolidAndDashed => {
            StopLineStyle::SolidAndDashed(SolidAndDashedLine::new(
                color,
                DEFAULT_STOP_WIDTH,
                DEFAULT_DASH_LENGTH,
                DEFAULT_SPACE_LENGTH,
                DEFAULT_STOP_OFFSET,
                Alignment::Centre,
                false,
            ))
            .into()
        }
        StyleType::StopLineSharkTeeth => StopLineStyle::SharkTeeth(shark_teeth()).into(),

        StyleType::FillerStripe => FillerStyle::Stripe(SimpleFiller::new(
            color,
            DEFAULT_STRIPE_WIDTH,
            DEFAULT_ANGLE,
            DEFAULT_STEP_STRIPE,
            DEFAULT_FILLER_OFFSET,
            0.0,
        ))
        .into(),
        StyleType::FillerGrid => FillerStyle::Grid(SimpleFiller::new(
            color,
            DEFAULT_STRIPE_WIDTH,
            DEFAULT_ANGLE,
            DEFAULT_STEP_GRID,
            DEFAULT_FILLER_OFFSET,
            0.0,
        ))
        .into(),
        StyleType::FillerSolid => FillerStyle::Solid(SolidFiller::new(color, 0.0)).into(),
        StyleType::FillerChevron => FillerStyle::Chevron(ChevronFiller::new(
            color,
            DEFAULT_STRIPE_WIDTH,
            0.0,
            DEFAULT_ANGLE_BETWEEN,
            DEFAULT_STEP_STRIPE,
            0,
            false,
            ChevronFrom::Vertex,
        ))
        .into(),
        StyleType::FillerPavement => {
            FillerStyle::Pavement(MeshFiller::new(DEFAULT_ELEVATION, 0.0)).into()
        }
        StyleType::FillerGrass => FillerStyle::Grass(MeshFiller::new(DEFAULT_ELEVATION, 0.0)).into(),

        StyleType::CrosswalkExistent => {
            CrosswalkStyle::Existent(ExistentCrosswalk::new(DEFAULT_CROSSWALK_WIDTH)).into()
        }
        StyleType::CrosswalkZebra => CrosswalkStyle::Zebra(ZebraCrosswalk::new(
            color,
            DEFAULT_CROSSWALK_WIDTH,
            DEFAULT_CROSSWALK_OFFSET,
            DEFAULT_CROSSWALK_OFFSET,
            DEFAULT_CROSSWALK_DASH_LENGTH,
            DEFAULT_CROSSWALK_SPACE_LENGTH,
            true,
        ))
        .into(),
        StyleType::CrosswalkDoubleZebra => CrosswalkStyle::DoubleZebra(DoubleZebraCrosswalk::new(
            color,
            DEFAULT_CROSSWALK_WIDTH,
            DEFAULT_CROSSWALK_OFFSET,
            DEFAULT_CROSSWALK_OFFSET,
            DEFAULT_CROSSWALK_DASH_LENGTH,
            DEFAULT_CROSSWALK_SPACE_LENGTH,
            true,
            DEFAULT_CROSSWALK_OFFSET,
        ))
        .into(),
        StyleType::CrosswalkParallelSolidLines => {
            CrosswalkStyle::ParallelSolidLines(ParallelSolidLinesCrosswalk::new(
                color,
                DEFAULT_CROSSWALK_WIDTH,
                DEFAULT_CROSSWALK_OFFSET,
                DEFAULT_CROSSWALK_OFFSET,
                DEFAULT_WIDTH,
            ))
            .into()
        }
        StyleType::CrosswalkParallelDashedLines => {
            CrosswalkStyle::ParallelDashedLines(ParallelDashedLinesCrosswalk::new(
                color,
                DEFAULT_CROSSWALK_WIDTH,
                DEFAULT_CROSSWALK_OFFSET,
                DEFAULT_CROSSWALK_OFFSET,
                DEFAULT_WIDTH,
                DEFAULT_DASH_LENGTH,
                DEFAULT_SPACE_LENGTH,
            ))
            .into()
        }
        StyleType::CrosswalkLadder => CrosswalkStyle::Ladder(LadderCrosswalk::new(
            color,
            DEFAULT_CROSSWALK_WIDTH,
            DEFAULT_CROSSWALK_OFFSET,
            DEFAULT_CROSSWALK_OFFSET,
            DEFAULT_CROSSWALK_DASH_LENGTH,
            DEFAULT_CROSSWALK_SPACE_LENGTH,
            DEFAULT_WIDTH,
        ))
        .into(),
        StyleType::CrosswalkSolid => CrosswalkStyle::Solid(SolidCrosswalk::new(
            color,
            DEFAULT_CROSSWALK_WIDTH,
            DEFAULT_CROSSWALK_OFFSET,
            DEFAULT_CROSSWALK_OFFSET,
        ))
        .into(),
        StyleType::CrosswalkChessBoard => CrosswalkStyle::ChessBoard(ChessBoardCrosswalk::new(
            color,
            DEFAULT_CROSSWALK_OFFSET,
            DEFAULT_CROSSWALK_OFFSET,
            DEFAULT_SQUARE_SIDE,
            DEFAULT_LINE_COUNT,
            false,
        ))
        .into(),
    }
}

fn shark_teeth() -> SharkTeethLine {
    SharkTeethLine::new(
        Color32::DEFAULT,
        DEFAULT_SHARK_BASE,
        DEFAULT_SHARK_HEIGHT,
        DEFAULT_SHARK_SPACE,
        false,
    )
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::style::StyleFamily;

    #[test]
    fn every_type_has_a_default() {
        let registry = StyleRegistry::default();
        for style_type in StyleType::ALL {
            assert_eq!(registry.default_style(style_type).style_type(), style_type);
        }
    }

    #[test]
    fn typed_lookups_check_family() {
        let registry = StyleRegistry::default();
        assert!(registry.line_style(StyleType::LineDashed).is_ok());
        assert!(registry.filler_style(StyleType::FillerGrass).is_ok());
        let err = registry.stop_line_style(StyleType::LineSolid).unwrap_err();
        assert!(matches!(
            err,
            StyleError::WrongFamily { expected: "stop line", found: "regular line" }
        ));
        assert_eq!(
            registry.default_style(StyleType::CrosswalkLadder).family(),
            StyleFamily::Crosswalk
        );
    }

    #[test]
    fn overridden_default_is_copied() {
        let custom = LineStyle::Solid(SolidLine::new(Color32::DEFAULT, 0.4));
        let registry = StyleRegistry::default().with_default(custom.clone().into());
        let mut first = registry.line_style(StyleType::LineSolid).unwrap();
        first.capabilities_mut().as_width_mut().unwrap().set_width(1.0);
        let second = registry.line_style(StyleType::LineSolid).unwrap();
        assert_eq!(second.capabilities().as_width().unwrap().width(), 0.4);
        assert_eq!(second, custom);
    }
}
