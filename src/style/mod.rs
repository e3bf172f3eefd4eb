//! Marking styles.
//!
//! Every family (regular lines, stop lines, crosswalks, fillers) is a closed
//! enum of small value types. Shared properties are exposed through the
//! capability traits below so that [`copy_properties`] can move values
//! between unrelated variants.

pub mod crosswalk;
pub mod dash;
pub mod filler;
pub mod helper;
pub mod line;
pub mod registry;
pub mod stop_line;
pub(crate) mod xml;

use std::fmt;
use std::rc::Rc;

use xmltree::Element;

use crate::error::StyleError;

pub use crosswalk::CrosswalkStyle;
pub use dash::{LodCache, MarkupStyleDash, MarkupStyleMesh, MaterialType, StyleData};
pub use filler::FillerStyle;
pub use line::LineStyle;
pub use registry::StyleRegistry;
pub use stop_line::StopLineStyle;

/// Every concrete style, grouped by family in the upper bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum StyleType {
    LineSolid = 0x101,
    LineDashed = 0x102,
    LineDoubleSolid = 0x103,
    LineDoubleDashed = 0x104,
    LineSolidAndDashed = 0x105,
    LineSharkTeeth = 0x106,
    EmptyLine = 0x107,

    StopLineSolid = 0x201,
    StopLineDashed = 0x202,
    StopLineDoubleSolid = 0x203,
    StopLineDoubleDashed = 0x204,
    StopLineSolidAndDashed = 0x205,
    StopLineSharkTeeth = 0x206,

    FillerStripe = 0x401,
    FillerGrid = 0x402,
    FillerSolid = 0x403,
    FillerChevron = 0x404,
    FillerPavement = 0x481,
    FillerGrass = 0x482,

    CrosswalkExistent = 0x801,
    CrosswalkZebra = 0x802,
    CrosswalkDoubleZebra = 0x803,
    CrosswalkParallelSolidLines = 0x804,
    CrosswalkParallelDashedLines = 0x805,
    CrosswalkLadder = 0x806,
    CrosswalkSolid = 0x807,
    CrosswalkChessBoard = 0x808,
}

impl StyleType {
    pub const ALL: [StyleType; 27] = [
        StyleType::LineSolid,
        StyleType::LineDashed,
        StyleType::LineDoubleSolid,
        StyleType::LineDoubleDashed,
        StyleType::LineSolidAndDashed,
        StyleType::LineSharkTeeth,
        StyleType::EmptyLine,
        StyleType::StopLineSolid,
        StyleType::StopLineDashed,
        StyleType::StopLineDoubleSolid,
        StyleType::StopLineDoubleDashed,
        StyleType::StopLineSolidAndDashed,
        StyleType::StopLineSharkTeeth,
        StyleType::FillerStripe,
        StyleType::FillerGrid,
        StyleType::FillerSolid,
        StyleType::FillerChevron,
        StyleType::FillerPavement,
        StyleType::FillerGrass,
        StyleType::CrosswalkExistent,
        StyleType::CrosswalkZebra,
        StyleType::CrosswalkDoubleZebra,
        StyleType::CrosswalkParallelSolidLines,
        StyleType::CrosswalkParallelDashedLines,
        StyleType::CrosswalkLadder,
        StyleType::CrosswalkSolid,
        StyleType::CrosswalkChessBoard,
    ];

    /// Raw enum value.
    #[must_use]
    pub fn value(self) -> i32 {
        self as i32
    }

    /// Looks up a style type by its raw enum value.
    #[must_use]
    pub fn from_value(value: i32) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.value() == value)
    }

    #[must_use]
    pub fn family(self) -> StyleFamily {
        match self.value() & !0xFF {
            0x100 => StyleFamily::RegularLine,
            0x200 => StyleFamily::StopLine,
            0x400 => StyleFamily::Filler,
            _ => StyleFamily::Crosswalk,
        }
    }

    /// Packs the type into the persisted integer: the group bits shifted
    /// down by one, plus the zero-based index inside the group.
    #[must_use]
    pub fn encode(self) -> i32 {
        let value = self.value();
        let group = value & !0xFF;
        let num = (value & 0xFF) - 1;
        ((group >> 1) & !0xFF) + num
    }

    /// Inverse of [`StyleType::encode`].
    ///
    /// # Errors
    ///
    /// Returns [`StyleError::UnknownType`] when `raw` names no style.
    pub fn decode(raw: i32) -> Result<Self, StyleError> {
        let group = raw & !0xFF;
        let num = (raw & 0xFF) + 1;
        let value = if group == 0 { 0x100 } else { group << 1 } + num;
        Self::from_value(value).ok_or(StyleError::UnknownType(raw))
    }
}

/// Style family, one per markup entity kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StyleFamily {
    RegularLine,
    StopLine,
    Crosswalk,
    Filler,
}

impl StyleFamily {
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            StyleFamily::RegularLine => "regular line",
            StyleFamily::StopLine => "stop line",
            StyleFamily::Crosswalk => "crosswalk",
            StyleFamily::Filler => "filler",
        }
    }
}

/// 8-bit RGBA color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Color32 {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color32 {
    /// Default paint color.
    pub const DEFAULT: Color32 = Color32::new(136, 136, 136, 224);

    #[must_use]
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// `0xRRGGBBAA`, as persisted.
    #[must_use]
    pub fn to_packed(self) -> u32 {
        u32::from_be_bytes([self.r, self.g, self.b, self.a])
    }

    #[must_use]
    pub fn from_packed(packed: u32) -> Self {
        let [r, g, b, a] = packed.to_be_bytes();
        Self { r, g, b, a }
    }
}

impl Default for Color32 {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Lateral placement of a double line relative to its trajectory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Alignment {
    Left,
    #[default]
    Centre,
    Right,
}

impl Alignment {
    #[must_use]
    pub fn index(self) -> i32 {
        match self {
            Alignment::Left => 0,
            Alignment::Centre => 1,
            Alignment::Right => 2,
        }
    }

    #[must_use]
    pub fn from_index(index: i32) -> Option<Self> {
        match index {
            0 => Some(Alignment::Left),
            1 => Some(Alignment::Centre),
            2 => Some(Alignment::Right),
            _ => None,
        }
    }

    /// Left and right swapped.
    #[must_use]
    pub fn mirrored(self) -> Self {
        match self {
            Alignment::Left => Alignment::Right,
            Alignment::Centre => Alignment::Centre,
            Alignment::Right => Alignment::Left,
        }
    }
}

/// Callback fired by every property setter.
///
/// Cloning a style detaches the copy from the original's owner, so
/// `clone` yields an empty notifier. Notifiers never take part in equality.
#[derive(Default)]
pub struct ChangeNotifier {
    callback: Option<Rc<dyn Fn()>>,
}

impl ChangeNotifier {
    pub fn set(&mut self, callback: impl Fn() + 'static) {
        self.callback = Some(Rc::new(callback));
    }

    pub fn clear(&mut self) {
        self.callback = None;
    }

    pub fn notify(&self) {
        if let Some(callback) = &self.callback {
            callback();
        }
    }
}

impl Clone for ChangeNotifier {
    fn clone(&self) -> Self {
        Self::default()
    }
}

impl PartialEq for ChangeNotifier {
    fn eq(&self, _: &Self) -> bool {
        true
    }
}

impl fmt::Debug for ChangeNotifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChangeNotifier")
            .field("attached", &self.callback.is_some())
            .finish()
    }
}

pub trait HasColor {
    fn color(&self) -> Color32;
    fn set_color(&mut self, value: Color32);
}

pub trait HasWidth {
    fn width(&self) -> f64;
    fn set_width(&mut self, value: f64);
}

pub trait HasDashPattern {
    fn dash_length(&self) -> f64;
    fn set_dash_length(&mut self, value: f64);
    fn space_length(&self) -> f64;
    fn set_space_length(&mut self, value: f64);
}

/// Distance between the two strokes of a double style.
pub trait HasOffset {
    fn offset(&self) -> f64;
    fn set_offset(&mut self, value: f64);
}

pub trait HasAlignment {
    fn alignment(&self) -> Alignment;
    fn set_alignment(&mut self, value: Alignment);
}

pub trait HasInvert {
    fn invert(&self) -> bool;
    fn set_invert(&mut self, value: bool);
}

pub trait HasMedianOffset {
    fn median_offset(&self) -> f64;
    fn set_median_offset(&mut self, value: f64);
}

/// Empty space kept on both sides of a crosswalk band.
pub trait HasBandOffsets {
    fn offset_before(&self) -> f64;
    fn set_offset_before(&mut self, value: f64);
    fn offset_after(&self) -> f64;
    fn set_offset_after(&mut self, value: f64);
}

pub trait HasLineWidth {
    fn line_width(&self) -> f64;
    fn set_line_width(&mut self, value: f64);
}

/// Runtime lookup of the capability traits a style implements.
pub trait Capabilities {
    fn notifier_mut(&mut self) -> &mut ChangeNotifier;

    fn as_color(&self) -> Option<&dyn HasColor> {
        None
    }
    fn as_color_mut(&mut self) -> Option<&mut dyn HasColor> {
        None
    }
    fn as_width(&self) -> Option<&dyn HasWidth> {
        None
    }
    fn as_width_mut(&mut self) -> Option<&mut dyn HasWidth> {
        None
    }
    fn as_dash_pattern(&self) -> Option<&dyn HasDashPattern> {
        None
    }
    fn as_dash_pattern_mut(&mut self) -> Option<&mut dyn HasDashPattern> {
        None
    }
    fn as_offset(&self) -> Option<&dyn HasOffset> {
        None
    }
    fn as_offset_mut(&mut self) -> Option<&mut dyn HasOffset> {
        None
    }
    fn as_alignment(&self) -> Option<&dyn HasAlignment> {
        None
    }
    fn as_alignment_mut(&mut self) -> Option<&mut dyn HasAlignment> {
        None
    }
    fn as_invert(&self) -> Option<&dyn HasInvert> {
        None
    }
    fn as_invert_mut(&mut self) -> Option<&mut dyn HasInvert> {
        None
    }
    fn as_median_offset(&self) -> Option<&dyn HasMedianOffset> {
        None
    }
    fn as_median_offset_mut(&mut self) -> Option<&mut dyn HasMedianOffset> {
        None
    }
    fn as_band_offsets(&self) -> Option<&dyn HasBandOffsets> {
        None
    }
    fn as_band_offsets_mut(&mut self) -> Option<&mut dyn HasBandOffsets> {
        None
    }
    fn as_line_width(&self) -> Option<&dyn HasLineWidth> {
        None
    }
    fn as_line_width_mut(&mut self) -> Option<&mut dyn HasLineWidth> {
        None
    }
}

/// Implements a property trait over same-named fields, notifying on set.
macro_rules! capability {
    (@impl $trait:ident $ty:ty { $($get:ident / $set:ident : $t:ty),+ $(,)? }) => {
        impl $crate::style::$trait for $ty {
            $(
                fn $get(&self) -> $t {
                    self.$get
                }

                fn $set(&mut self, value: $t) {
                    self.$get = value;
                    self.notifier.notify();
                }
            )+
        }
    };
    ($trait:ident $props:tt for $($ty:ty),+ $(,)?) => {
        $(capability!(@impl $trait $ty $props);)+
    };
}

/// Implements [`Capabilities`] for a style struct with a `notifier` field.
macro_rules! capabilities {
    (@cap color) => {
        fn as_color(&self) -> Option<&dyn $crate::style::HasColor> { Some(self) }
        fn as_color_mut(&mut self) -> Option<&mut dyn $crate::style::HasColor> { Some(self) }
    };
    (@cap width) => {
        fn as_width(&self) -> Option<&dyn $crate::style::HasWidth> { Some(self) }
        fn as_width_mut(&mut self) -> Option<&mut dyn $crate::style::HasWidth> { Some(self) }
    };
    (@cap dash_pattern) => {
        fn as_dash_pattern(&self) -> Option<&dyn $crate::style::HasDashPattern> { Some(self) }
        fn as_dash_pattern_mut(&mut self) -> Option<&mut dyn $crate::style::HasDashPattern> { Some(self) }
    };
    (@cap offset) => {
        fn as_offset(&self) -> Option<&dyn $crate::style::HasOffset> { Some(self) }
        fn as_offset_mut(&mut self) -> Option<&mut dyn $crate::style::HasOffset> { Some(self) }
    };
    (@cap alignment) => {
        fn as_alignment(&self) -> Option<&dyn $crate::style::HasAlignment> { Some(self) }
        fn as_alignment_mut(&mut self) -> Option<&mut dyn $crate::style::HasAlignment> { Some(self) }
    };
    (@cap invert) => {
        fn as_invert(&self) -> Option<&dyn $crate::style::HasInvert> { Some(self) }
        fn as_invert_mut(&mut self) -> Option<&mut dyn $crate::style::HasInvert> { Some(self) }
    };
    (@cap median_offset) => {
        fn as_median_offset(&self) -> Option<&dyn $crate::style::HasMedianOffset> { Some(self) }
        fn as_median_offset_mut(&mut self) -> Option<&mut dyn $crate::style::HasMedianOffset> { Some(self) }
    };
    (@cap band_offsets) => {
        fn as_band_offsets(&self) -> Option<&dyn $crate::style::HasBandOffsets> { Some(self) }
        fn as_band_offsets_mut(&mut self) -> Option<&mut dyn $crate::style::HasBandOffsets> { Some(self) }
    };
    (@cap line_width) => {
        fn as_line_width(&self) -> Option<&dyn $crate::style::HasLineWidth> { Some(self) }
        fn as_line_width_mut(&mut self) -> Option<&mut dyn $crate::style::HasLineWidth> { Some(self) }
    };
    ($ty:ty $(: $($cap:ident),+)?) => {
        impl $crate::style::Capabilities for $ty {
            fn notifier_mut(&mut self) -> &mut $crate::style::ChangeNotifier {
                &mut self.notifier
            }

            $($(capabilities!(@cap $cap);)+)?
        }
    };
}

/// Inherent getter/setter pairs for variant-specific fields.
macro_rules! properties {
    ($ty:ty { $($get:ident / $set:ident : $t:ty),+ $(,)? }) => {
        impl $ty {
            $(
                #[must_use]
                pub fn $get(&self) -> $t {
                    self.$get
                }

                pub fn $set(&mut self, value: $t) {
                    self.$get = value;
                    self.notifier.notify();
                }
            )+
        }
    };
}

/// Dispatches an expression over every variant of a style family enum.
macro_rules! dispatch_style {
    ($family:ident, $value:expr, $inner:ident => $body:expr, [$($variant:ident),+ $(,)?]) => {
        match $value {
            $($family::$variant($inner) => $body,)+
        }
    };
}

pub(crate) use {capabilities, capability, dispatch_style, properties};

/// Copies every property the source and target have in common.
pub fn copy_properties(source: &dyn Capabilities, target: &mut dyn Capabilities) {
    if let (Some(s), Some(t)) = (source.as_color(), target.as_color_mut()) {
        t.set_color(s.color());
    }
    if let (Some(s), Some(t)) = (source.as_width(), target.as_width_mut()) {
        t.set_width(s.width());
    }
    if let (Some(s), Some(t)) = (source.as_dash_pattern(), target.as_dash_pattern_mut()) {
        t.set_dash_length(s.dash_length());
        t.set_space_length(s.space_length());
    }
    if let (Some(s), Some(t)) = (source.as_offset(), target.as_offset_mut()) {
        t.set_offset(s.offset());
    }
    if let (Some(s), Some(t)) = (source.as_alignment(), target.as_alignment_mut()) {
        t.set_alignment(s.alignment());
    }
    if let (Some(s), Some(t)) = (source.as_invert(), target.as_invert_mut()) {
        t.set_invert(s.invert());
    }
    if let (Some(s), Some(t)) = (source.as_median_offset(), target.as_median_offset_mut()) {
        t.set_median_offset(s.median_offset());
    }
    if let (Some(s), Some(t)) = (source.as_band_offsets(), target.as_band_offsets_mut()) {
        t.set_offset_before(s.offset_before());
        t.set_offset_after(s.offset_after());
    }
    if let (Some(s), Some(t)) = (source.as_line_width(), target.as_line_width_mut()) {
        t.set_line_width(s.line_width());
    }
}

/// A style of any family.
#[derive(Debug, Clone, PartialEq)]
pub enum Style {
    Line(LineStyle),
    StopLine(StopLineStyle),
    Crosswalk(CrosswalkStyle),
    Filler(FillerStyle),
}

impl Style {
    #[must_use]
    pub fn style_type(&self) -> StyleType {
        match self {
            Style::Line(s) => s.style_type(),
            Style::StopLine(s) => s.style_type(),
            Style::Crosswalk(s) => s.style_type(),
            Style::Filler(s) => s.style_type(),
        }
    }

    #[must_use]
    pub fn family(&self) -> StyleFamily {
        self.style_type().family()
    }

    #[must_use]
    pub fn capabilities(&self) -> &dyn Capabilities {
        match self {
            Style::Line(s) => s.capabilities(),
            Style::StopLine(s) => s.capabilities(),
            Style::Crosswalk(s) => s.capabilities(),
            Style::Filler(s) => s.capabilities(),
        }
    }

    pub fn capabilities_mut(&mut self) -> &mut dyn Capabilities {
        match self {
            Style::Line(s) => s.capabilities_mut(),
            Style::StopLine(s) => s.capabilities_mut(),
            Style::Crosswalk(s) => s.capabilities_mut(),
            Style::Filler(s) => s.capabilities_mut(),
        }
    }

    /// Installs the callback fired by every property setter.
    pub fn set_on_changed(&mut self, callback: impl Fn() + 'static) {
        self.capabilities_mut().notifier_mut().set(callback);
    }

    /// Copies the properties this style shares with `target` into it.
    pub fn copy_to(&self, target: &mut Style) {
        copy_properties(self.capabilities(), target.capabilities_mut());
    }

    /// Serializes into an `<S>` element.
    #[must_use]
    pub fn to_xml(&self) -> Element {
        xml::write_style(self)
    }

    /// Reads an `<S>` element, starting from the registry default for its type.
    ///
    /// With `mirror` set, invert flags are flipped and legacy centre-solid
    /// alignments are swapped so that mirrored imports keep their sides.
    ///
    /// # Errors
    ///
    /// Fails on unknown type tags and malformed attribute values.
    pub fn from_xml(
        element: &Element,
        registry: &StyleRegistry,
        mirror: bool,
    ) -> Result<Style, StyleError> {
        xml::read_style(element, registry, mirror)
    }

    fn family_error(&self, expected: StyleFamily) -> StyleError {
        StyleError::WrongFamily {
            expected: expected.name(),
            found: self.family().name(),
        }
    }
}

macro_rules! family_conversions {
    ($variant:ident, $ty:ty, $family:expr) => {
        impl From<$ty> for Style {
            fn from(value: $ty) -> Self {
                Style::$variant(value)
            }
        }

        impl TryFrom<Style> for $ty {
            type Error = StyleError;

            fn try_from(value: Style) -> Result<Self, Self::Error> {
                match value {
                    Style::$variant(style) => Ok(style),
                    other => Err(other.family_error($family)),
                }
            }
        }
    };
}

family_conversions!(Line, LineStyle, StyleFamily::RegularLine);
family_conversions!(StopLine, StopLineStyle, StyleFamily::StopLine);
family_conversions!(Crosswalk, CrosswalkStyle, StyleFamily::Crosswalk);
family_conversions!(Filler, FillerStyle, StyleFamily::Filler);

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::cell::Cell;

    use super::*;

    #[test]
    fn encode_known_values() {
        assert_eq!(StyleType::LineSolid.encode(), 0);
        assert_eq!(StyleType::StopLineSolid.encode(), 256);
        assert_eq!(StyleType::FillerStripe.encode(), 512);
        assert_eq!(StyleType::FillerPavement.encode(), 640);
        assert_eq!(StyleType::CrosswalkZebra.encode(), 1025);
    }

    #[test]
    fn decode_inverts_encode() {
        for style_type in StyleType::ALL {
            assert_eq!(StyleType::decode(style_type.encode()).unwrap(), style_type);
        }
        assert!(matches!(
            StyleType::decode(0x7F),
            Err(StyleError::UnknownType(0x7F))
        ));
    }

    #[test]
    fn families_follow_group_bits() {
        assert_eq!(StyleType::EmptyLine.family(), StyleFamily::RegularLine);
        assert_eq!(StyleType::StopLineSharkTeeth.family(), StyleFamily::StopLine);
        assert_eq!(StyleType::FillerGrass.family(), StyleFamily::Filler);
        assert_eq!(StyleType::CrosswalkChessBoard.family(), StyleFamily::Crosswalk);
    }

    #[test]
    fn packed_color() {
        let color = Color32::new(1, 2, 3, 4);
        assert_eq!(color.to_packed(), 0x0102_0304);
        assert_eq!(Color32::from_packed(0x0102_0304), color);
    }

    #[test]
    fn setters_notify_and_clones_detach() {
        let registry = StyleRegistry::default();
        let fired = Rc::new(Cell::new(0));
        let mut style = registry.default_style(StyleType::LineDashed);
        let counter = Rc::clone(&fired);
        style.set_on_changed(move || counter.set(counter.get() + 1));

        style.capabilities_mut().as_width_mut().unwrap().set_width(0.3);
        style
            .capabilities_mut()
            .as_dash_pattern_mut()
            .unwrap()
            .set_dash_length(2.0);
        assert_eq!(fired.get(), 2);

        let mut copy = style.clone();
        copy.capabilities_mut().as_color_mut().unwrap().set_color(Color32::new(255, 255, 255, 255));
        assert_eq!(fired.get(), 2);
        assert_eq!(copy.capabilities().as_width().unwrap().width(), 0.3);
    }

    #[test]
    fn copy_to_moves_shared_properties_only() {
        let registry = StyleRegistry::default();
        let mut source = registry.default_style(StyleType::LineDoubleDashed);
        {
            let caps = source.capabilities_mut();
            caps.as_width_mut().unwrap().set_width(0.4);
            caps.as_offset_mut().unwrap().set_offset(0.5);
            caps.as_alignment_mut().unwrap().set_alignment(Alignment::Left);
        }

        let mut solid = registry.default_style(StyleType::LineSolid);
        source.copy_to(&mut solid);
        assert_eq!(solid.capabilities().as_width().unwrap().width(), 0.4);
        assert!(solid.capabilities().as_offset().is_none());

        let mut double = registry.default_style(StyleType::LineDoubleSolid);
        source.copy_to(&mut double);
        let caps = double.capabilities();
        assert_eq!(caps.as_offset().unwrap().offset(), 0.5);
        assert_eq!(caps.as_alignment().unwrap().alignment(), Alignment::Left);
    }

    #[test]
    fn family_conversion_checks_family() {
        let registry = StyleRegistry::default();
        let filler = registry.default_style(StyleType::FillerGrid);
        let err = LineStyle::try_from(filler).unwrap_err();
        assert!(matches!(err, StyleError::WrongFamily { expected: "regular line", .. }));
    }
}
