//! `<S>` element reading and writing.
//!
//! Attributes shared through the capability traits are handled here; each
//! family adds its own variant-specific keys.

use std::fmt::Display;
use std::str::FromStr;

use xmltree::Element;

use crate::error::StyleError;

use super::{Alignment, Color32, Style, StyleRegistry, StyleType};

pub(crate) const STYLE_ELEMENT: &str = "S";

/// Current color encoding version.
const COLOR_VERSION: i32 = 1;

pub(crate) fn set_attr(element: &mut Element, key: &str, value: impl Display) {
    element.attributes.insert(key.to_owned(), value.to_string());
}

pub(crate) fn set_flag(element: &mut Element, key: &str, value: bool) {
    set_attr(element, key, i32::from(value));
}

/// Parses an optional attribute.
pub(crate) fn attr<T: FromStr>(element: &Element, key: &'static str) -> Result<Option<T>, StyleError> {
    match element.attributes.get(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| StyleError::InvalidAttribute {
                key,
                value: raw.clone(),
            }),
    }
}

/// Parses a required attribute.
pub(crate) fn required<T: FromStr>(element: &Element, key: &'static str) -> Result<T, StyleError> {
    attr(element, key)?.ok_or_else(|| StyleError::InvalidAttribute {
        key,
        value: String::new(),
    })
}

/// Integer flag, any non-zero value is set.
pub(crate) fn flag(element: &Element, key: &'static str) -> Result<Option<bool>, StyleError> {
    Ok(attr::<i32>(element, key)?.map(|v| v != 0))
}

pub(super) fn write_style(style: &Style) -> Element {
    let mut element = Element::new(STYLE_ELEMENT);
    set_attr(&mut element, "T", style.style_type().encode());

    let caps = style.capabilities();
    if let Some(c) = caps.as_color() {
        set_attr(&mut element, "C", c.color().to_packed());
        set_attr(&mut element, "CV", COLOR_VERSION);
    }
    if let Some(c) = caps.as_width() {
        set_attr(&mut element, "W", c.width());
    }
    if let Some(c) = caps.as_dash_pattern() {
        set_attr(&mut element, "DL", c.dash_length());
        set_attr(&mut element, "SL", c.space_length());
    }
    if let Some(c) = caps.as_offset() {
        set_attr(&mut element, "O", c.offset());
    }
    if let Some(c) = caps.as_alignment() {
        set_attr(&mut element, "A", c.alignment().index());
    }
    if let Some(c) = caps.as_invert() {
        set_flag(&mut element, "I", c.invert());
    }
    if let Some(c) = caps.as_median_offset() {
        set_attr(&mut element, "MO", c.median_offset());
    }
    if let Some(c) = caps.as_band_offsets() {
        set_attr(&mut element, "OB", c.offset_before());
        set_attr(&mut element, "OA", c.offset_after());
    }
    if let Some(c) = caps.as_line_width() {
        set_attr(&mut element, "LW", c.line_width());
    }

    match style {
        Style::Line(s) => s.write_xml(&mut element),
        Style::StopLine(s) => s.write_xml(&mut element),
        Style::Crosswalk(s) => s.write_xml(&mut element),
        Style::Filler(s) => s.write_xml(&mut element),
    }
    element
}

pub(super) fn read_style(
    element: &Element,
    registry: &StyleRegistry,
    mirror: bool,
) -> Result<Style, StyleError> {
    if element.name != STYLE_ELEMENT {
        return Err(StyleError::MissingElement(STYLE_ELEMENT));
    }
    let style_type = StyleType::decode(required(element, "T")?)?;
    let mut style = registry.default_style(style_type);

    let caps = style.capabilities_mut();
    if let Some(c) = caps.as_color_mut() {
        if let Some(packed) = attr::<u32>(element, "C")? {
            c.set_color(Color32::from_packed(packed));
        }
    }
    if let Some(c) = caps.as_width_mut() {
        if let Some(width) = attr(element, "W")? {
            c.set_width(width);
        }
    }
    if let Some(c) = caps.as_dash_pattern_mut() {
        if let Some(dash) = attr(element, "DL")? {
            c.set_dash_length(dash);
        }
        if let Some(space) = attr(element, "SL")? {
            c.set_space_length(space);
        }
    }
    if let Some(c) = caps.as_offset_mut() {
        if let Some(offset) = attr(element, "O")? {
            c.set_offset(offset);
        }
    }
    let invert = flag(element, "I")?;
    if let Some(c) = caps.as_alignment_mut() {
        let alignment = match attr::<i32>(element, "A")? {
            Some(index) => Some(Alignment::from_index(index).ok_or_else(|| {
                StyleError::InvalidAttribute {
                    key: "A",
                    value: index.to_string(),
                }
            })?),
            // Centre-solid flag of older documents.
            None => flag(element, "CS")?.map(|centre_solid| {
                if !centre_solid {
                    Alignment::Centre
                } else if invert.unwrap_or(false) {
                    Alignment::Right
                } else {
                    Alignment::Left
                }
            }),
        };
        if let Some(alignment) = alignment {
            c.set_alignment(if mirror { alignment.mirrored() } else { alignment });
        } else if mirror {
            let current = c.alignment();
            c.set_alignment(current.mirrored());
        }
    }
    if let Some(c) = caps.as_invert_mut() {
        let value = invert.unwrap_or_else(|| c.invert());
        c.set_invert(value ^ mirror);
    }
    if let Some(c) = caps.as_median_offset_mut() {
        if let Some(offset) = attr(element, "MO")? {
            c.set_median_offset(offset);
        }
    }
    if let Some(c) = caps.as_band_offsets_mut() {
        if let Some(before) = attr(element, "OB")? {
            c.set_offset_before(before);
        }
        if let Some(after) = attr(element, "OA")? {
            c.set_offset_after(after);
        }
    }
    if let Some(c) = caps.as_line_width_mut() {
        if let Some(width) = attr(element, "LW")? {
            c.set_line_width(width);
        }
    }

    match &mut style {
        Style::Line(s) => s.read_xml(element)?,
        Style::StopLine(s) => s.read_xml(element)?,
        Style::Crosswalk(s) => s.read_xml(element)?,
        Style::Filler(s) => s.read_xml(element)?,
    }
    Ok(style)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::style::line::{LineStyle, SolidAndDashedLine};
    use crate::style::{HasAlignment, HasInvert};

    fn element(attributes: &[(&str, &str)]) -> Element {
        let mut element = Element::new(STYLE_ELEMENT);
        for (key, value) in attributes {
            element
                .attributes
                .insert((*key).to_owned(), (*value).to_owned());
        }
        element
    }

    #[test]
    fn missing_attributes_keep_defaults() {
        let registry = StyleRegistry::default();
        let raw = StyleType::LineDashed.encode().to_string();
        let style = read_style(&element(&[("T", raw.as_str()), ("W", "0.4")]), &registry, false).unwrap();
        let caps = style.capabilities();
        assert_eq!(caps.as_width().unwrap().width(), 0.4);
        assert_eq!(caps.as_dash_pattern().unwrap().dash_length(), 1.5);
    }

    #[test]
    fn malformed_values_are_rejected() {
        let registry = StyleRegistry::default();
        let raw = StyleType::LineSolid.encode().to_string();
        let err = read_style(&element(&[("T", raw.as_str()), ("W", "wide")]), &registry, false)
            .unwrap_err();
        assert!(matches!(err, StyleError::InvalidAttribute { key: "W", .. }));

        let err = read_style(&element(&[("T", "99")]), &registry, false).unwrap_err();
        assert!(matches!(err, StyleError::UnknownType(99)));

        let err = read_style(&element(&[("W", "1")]), &registry, false).unwrap_err();
        assert!(matches!(err, StyleError::InvalidAttribute { key: "T", .. }));
    }

    fn solid_and_dashed(style: Style) -> SolidAndDashedLine {
        match style {
            Style::Line(LineStyle::SolidAndDashed(line)) => line,
            other => panic!("unexpected style {other:?}"),
        }
    }

    #[test]
    fn legacy_centre_solid_and_mirror() {
        let registry = StyleRegistry::default();
        let raw = StyleType::LineSolidAndDashed.encode().to_string();
        let legacy = element(&[("T", raw.as_str()), ("CS", "1"), ("I", "1")]);

        let line = solid_and_dashed(read_style(&legacy, &registry, false).unwrap());
        assert_eq!(line.alignment(), Alignment::Right);
        assert!(line.invert());

        let line = solid_and_dashed(read_style(&legacy, &registry, true).unwrap());
        assert_eq!(line.alignment(), Alignment::Left);
        assert!(!line.invert());
    }

    #[test]
    fn write_then_read_keeps_style() {
        let registry = StyleRegistry::default();
        for style_type in StyleType::ALL {
            let style = registry.default_style(style_type);
            let read = read_style(&style.to_xml(), &registry, false).unwrap();
            assert_eq!(read, style, "{style_type:?}");
        }
    }
}
