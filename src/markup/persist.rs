//! Saving and loading the entities of a markup.
//!
//! Points are never stored: they are rebuilt from the enters, and entities
//! refer to them by persistent id. Lines are keyed by the pair hash of
//! their ends, which fillers and crosswalks reuse to name lines.

use tracing::{debug, warn};
use xmltree::{Element, XMLNode};

use crate::error::{EntityError, Result, StyleError};
use crate::style::xml::{attr, required, set_attr, STYLE_ELEMENT};
use crate::style::{CrosswalkStyle, FillerStyle, Style, StyleRegistry};

use super::point::{pair_hash, split_pair_hash};
use super::{FillerContour, FillerVertex, LineId, LinePair, Markup, PointId};

const MARKUP_ELEMENT: &str = "M";
const LINE_ELEMENT: &str = "L";
const FILLER_ELEMENT: &str = "F";
const VERTEX_ELEMENT: &str = "V";
const CROSSWALK_ELEMENT: &str = "C";

const ENTER_VERTEX: u8 = 1;
const INTERSECT_VERTEX: u8 = 2;

/// Outcome of [`Markup::load_xml`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub lines: usize,
    pub fillers: usize,
    pub crosswalks: usize,
    /// Entities skipped because they failed to load.
    pub errors: usize,
}

impl Markup {
    /// Serializes lines, fillers and crosswalks into an `<M>` element.
    #[must_use]
    pub fn to_xml(&self) -> Element {
        let mut root = Element::new(MARKUP_ELEMENT);

        for (_, line) in self.lines() {
            let mut element = Element::new(LINE_ELEMENT);
            if let Some(hash) = self.point_pair_hash(line.from(), line.to()) {
                set_attr(&mut element, "L", hash);
            }
            element.children.push(XMLNode::Element(line.style().to_xml()));
            root.children.push(XMLNode::Element(element));
        }

        for (_, filler) in self.fillers() {
            let mut element = Element::new(FILLER_ELEMENT);
            element
                .children
                .push(XMLNode::Element(Style::Filler(filler.style().clone()).to_xml()));
            for vertex in filler.contour().vertices() {
                if let Some(child) = self.vertex_to_xml(vertex) {
                    element.children.push(XMLNode::Element(child));
                }
            }
            root.children.push(XMLNode::Element(element));
        }

        for (_, crosswalk) in self.crosswalks() {
            let mut element = Element::new(CROSSWALK_ELEMENT);
            let (from, to) = crosswalk.points();
            if let Some(hash) = self.point_pair_hash(from, to) {
                set_attr(&mut element, "L", hash);
            }
            for (key, border) in [("RB", crosswalk.right_border()), ("LB", crosswalk.left_border())] {
                if let Some(hash) = border.and_then(|id| self.line_hash(id)) {
                    set_attr(&mut element, key, hash);
                }
            }
            element
                .children
                .push(XMLNode::Element(Style::Crosswalk(crosswalk.style().clone()).to_xml()));
            root.children.push(XMLNode::Element(element));
        }
        root
    }

    /// Replaces lines, fillers and crosswalks with those stored in `element`.
    ///
    /// Entities that fail to load are logged and counted in
    /// [`LoadReport::errors`]; the rest still load. With `mirror` set,
    /// styles are mirrored and crosswalk borders swap sides.
    ///
    /// # Errors
    ///
    /// Fails only when `element` is not a markup element.
    pub fn load_xml(
        &mut self,
        element: &Element,
        registry: &StyleRegistry,
        mirror: bool,
    ) -> Result<LoadReport> {
        if element.name != MARKUP_ELEMENT {
            return Err(StyleError::MissingElement(MARKUP_ELEMENT).into());
        }
        self.clear();
        let mut report = LoadReport::default();
        let children: Vec<&Element> = element.children.iter().filter_map(XMLNode::as_element).collect();

        // Fillers and crosswalks name lines, so lines go first.
        for child in children.iter().filter(|c| c.name == LINE_ELEMENT) {
            let loaded = self.load_line(child, registry, mirror);
            tally(loaded, &mut report.lines, &mut report.errors, LINE_ELEMENT);
        }
        for child in &children {
            match child.name.as_str() {
                FILLER_ELEMENT => {
                    let loaded = self.load_filler(child, registry, mirror);
                    tally(loaded, &mut report.fillers, &mut report.errors, FILLER_ELEMENT);
                }
                CROSSWALK_ELEMENT => {
                    let loaded = self.load_crosswalk(child, registry, mirror);
                    tally(loaded, &mut report.crosswalks, &mut report.errors, CROSSWALK_ELEMENT);
                }
                _ => {}
            }
        }
        debug!(?report, "markup loaded");
        Ok(report)
    }

    /// [`Markup::to_xml`] as a document string.
    ///
    /// # Errors
    ///
    /// Fails if the XML writer fails.
    pub fn save_string(&self) -> Result<String> {
        let mut buffer = Vec::new();
        self.to_xml()
            .write(&mut buffer)
            .map_err(|e| StyleError::Xml(e.to_string()))?;
        Ok(String::from_utf8(buffer).map_err(|e| StyleError::Xml(e.to_string()))?)
    }

    /// Parses `xml` and loads it with [`Markup::load_xml`].
    ///
    /// # Errors
    ///
    /// Fails on malformed XML or a root that is not a markup element.
    pub fn load_string(
        &mut self,
        xml: &str,
        registry: &StyleRegistry,
        mirror: bool,
    ) -> Result<LoadReport> {
        let element = Element::parse(xml.as_bytes()).map_err(|e| StyleError::Xml(e.to_string()))?;
        self.load_xml(&element, registry, mirror)
    }

    fn point_pair_hash(&self, a: PointId, b: PointId) -> Option<u64> {
        Some(pair_hash(self.point(a).ok()?.id, self.point(b).ok()?.id))
    }

    fn line_hash(&self, line: LineId) -> Option<u64> {
        let line = self.line(line).ok()?;
        self.point_pair_hash(line.from(), line.to())
    }

    fn points_of_hash(&self, hash: u64) -> std::result::Result<(PointId, PointId), EntityError> {
        let (a, b) = split_pair_hash(hash);
        let find = |id| {
            self.point_by_id(id)
                .ok_or_else(|| EntityError::NotFound(format!("point {id}")))
        };
        Ok((find(a)?, find(b)?))
    }

    fn line_of_hash(&self, hash: u64) -> std::result::Result<LineId, EntityError> {
        let (a, b) = self.points_of_hash(hash)?;
        self.line_between(a, b)
            .ok_or_else(|| EntityError::NotFound(format!("line {hash}")))
    }

    fn vertex_to_xml(&self, vertex: &FillerVertex) -> Option<Element> {
        let mut element = Element::new(VERTEX_ELEMENT);
        match vertex {
            FillerVertex::Enter(point) => {
                set_attr(&mut element, "T", ENTER_VERTEX);
                set_attr(&mut element, "P", self.point(*point).ok()?.id);
            }
            FillerVertex::Intersect(pair) => {
                set_attr(&mut element, "T", INTERSECT_VERTEX);
                set_attr(&mut element, "L1", self.line_hash(pair.first())?);
                set_attr(&mut element, "L2", self.line_hash(pair.second())?);
            }
        }
        Some(element)
    }

    fn vertex_from_xml(&self, element: &Element) -> Result<FillerVertex> {
        match required::<u8>(element, "T")? {
            ENTER_VERTEX => {
                let id: u32 = required(element, "P")?;
                let point = self
                    .point_by_id(id)
                    .ok_or_else(|| EntityError::NotFound(format!("point {id}")))?;
                Ok(FillerVertex::Enter(point))
            }
            INTERSECT_VERTEX => {
                let first = self.line_of_hash(required(element, "L1")?)?;
                let second = self.line_of_hash(required(element, "L2")?)?;
                Ok(FillerVertex::Intersect(LinePair::new(first, second)))
            }
            other => Err(StyleError::InvalidAttribute {
                key: "T",
                value: other.to_string(),
            }
            .into()),
        }
    }

    fn load_line(&mut self, element: &Element, registry: &StyleRegistry, mirror: bool) -> Result<LineId> {
        let (a, b) = self.points_of_hash(required(element, "L")?)?;
        let style = style_child(element, registry, mirror)?;
        self.add_line(a, b, style)
    }

    fn load_filler(&mut self, element: &Element, registry: &StyleRegistry, mirror: bool) -> Result<()> {
        let style = FillerStyle::try_from(style_child(element, registry, mirror)?)?;
        let vertices = element
            .children
            .iter()
            .filter_map(XMLNode::as_element)
            .filter(|c| c.name == VERTEX_ELEMENT)
            .map(|c| self.vertex_from_xml(c))
            .collect::<Result<Vec<_>>>()?;
        let contour = FillerContour::closed_from(self, vertices)?;
        self.add_filler(contour, style)?;
        Ok(())
    }

    fn load_crosswalk(&mut self, element: &Element, registry: &StyleRegistry, mirror: bool) -> Result<()> {
        let (a, b) = self.points_of_hash(required(element, "L")?)?;
        let style = CrosswalkStyle::try_from(style_child(element, registry, mirror)?)?;
        let border = |key| -> Result<Option<LineId>> {
            match attr::<u64>(element, key)? {
                Some(hash) => Ok(Some(self.line_of_hash(hash)?)),
                None => Ok(None),
            }
        };
        let (mut right, mut left) = (border("RB")?, border("LB")?);
        if mirror {
            std::mem::swap(&mut right, &mut left);
        }
        self.add_crosswalk(a, b, style, right, left)?;
        Ok(())
    }
}

fn tally<T>(result: Result<T>, loaded: &mut usize, errors: &mut usize, entity: &str) {
    match result {
        Ok(_) => *loaded += 1,
        Err(error) => {
            warn!(entity, %error, "entity failed to load");
            *errors += 1;
        }
    }
}

fn style_child(element: &Element, registry: &StyleRegistry, mirror: bool) -> Result<Style> {
    let child = element
        .get_child(STYLE_ELEMENT)
        .ok_or(StyleError::MissingElement(STYLE_ELEMENT))?;
    Ok(Style::from_xml(child, registry, mirror)?)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::config::{MarkupConfig, MarkupLod};
    use crate::markup::test_support::{four_way, four_way_enters, point};
    use crate::style::{HasInvert, StyleType};

    fn populated(registry: &StyleRegistry) -> Markup {
        let mut markup = four_way(3);
        let [e1, e2, e3, n2, w2, s2] =
            [(0, 1), (0, 2), (0, 3), (1, 2), (2, 2), (3, 2)].map(|(enter, num)| point(&markup, enter, num));
        let horizontal = markup
            .add_line(e2, w2, registry.default_style(StyleType::LineDashed))
            .unwrap();
        let vertical = markup
            .add_line(n2, s2, registry.default_style(StyleType::LineSolid))
            .unwrap();
        markup
            .add_line(e1, e3, registry.default_style(StyleType::StopLineSolid))
            .unwrap();

        let centre = FillerVertex::Intersect(LinePair::new(horizontal, vertical));
        let n1 = point(&markup, 1, 1);
        let mut contour = FillerContour::new();
        for vertex in [
            centre,
            FillerVertex::Enter(e2),
            FillerVertex::Enter(e3),
            FillerVertex::Enter(n1),
            FillerVertex::Enter(n2),
            centre,
        ] {
            contour.add(&markup, vertex).unwrap();
        }
        markup
            .add_filler(contour, registry.filler_style(StyleType::FillerStripe).unwrap())
            .unwrap();

        let (w1, w3) = (point(&markup, 2, 1), point(&markup, 2, 3));
        markup
            .add_crosswalk(
                w1,
                w3,
                registry.crosswalk_style(StyleType::CrosswalkZebra).unwrap(),
                Some(horizontal),
                None,
            )
            .unwrap();
        markup
    }

    fn fresh() -> Markup {
        Markup::new(four_way_enters(3), MarkupConfig::default()).unwrap()
    }

    #[test]
    fn save_then_load_restores_entities() {
        let registry = StyleRegistry::default();
        let mut markup = populated(&registry);
        let xml = markup.save_string().unwrap();

        let mut loaded = fresh();
        let report = loaded.load_string(&xml, &registry, false).unwrap();
        assert_eq!(
            report,
            LoadReport {
                lines: 3,
                fillers: 1,
                crosswalks: 1,
                errors: 0
            }
        );

        let (_, crosswalk) = loaded.crosswalks().next().unwrap();
        assert!(crosswalk.right_border().is_some());
        assert!(crosswalk.left_border().is_none());

        let (_, filler) = loaded.fillers().next().unwrap();
        assert_eq!(filler.contour().len(), 5);

        markup.update();
        loaded.update();
        let dashes = |m: &Markup| -> usize {
            m.fillers()
                .map(|(_, f)| f.data(MarkupLod::Lod0).unwrap().dashes().len())
                .sum()
        };
        assert_eq!(dashes(&markup), dashes(&loaded));
    }

    #[test]
    fn broken_entities_are_counted() {
        let registry = StyleRegistry::default();
        let markup = populated(&registry);
        let mut root = markup.to_xml();

        // A line to a point that does not exist.
        let mut stray = Element::new(LINE_ELEMENT);
        set_attr(&mut stray, "L", pair_hash(1 + (1 << 16), 99 + (1 << 16)));
        stray
            .children
            .push(XMLNode::Element(registry.default_style(StyleType::LineSolid).to_xml()));
        root.children.push(XMLNode::Element(stray));

        // A crosswalk without a style.
        let mut bare = Element::new(CROSSWALK_ELEMENT);
        set_attr(&mut bare, "L", pair_hash(1 + (1 << 16), 1 + (3 << 16)));
        root.children.push(XMLNode::Element(bare));

        let mut loaded = fresh();
        let report = loaded.load_xml(&root, &registry, false).unwrap();
        assert_eq!(report.lines, 3);
        assert_eq!(report.fillers, 1);
        assert_eq!(report.crosswalks, 1);
        assert_eq!(report.errors, 2);
    }

    #[test]
    fn dependants_of_a_missing_line_fail() {
        let registry = StyleRegistry::default();
        let markup = populated(&registry);
        let (_, first) = markup.lines().next().unwrap();
        let hash = markup
            .point_pair_hash(first.from(), first.to())
            .unwrap()
            .to_string();
        let mut root = markup.to_xml();
        root.children.retain(|node| {
            node.as_element()
                .map_or(true, |e| e.name != LINE_ELEMENT || e.attributes.get("L") != Some(&hash))
        });

        // The filler crosses the line and the crosswalk is bordered by it.
        let mut loaded = fresh();
        let report = loaded.load_xml(&root, &registry, false).unwrap();
        assert_eq!(report.lines, 2);
        assert_eq!(report.fillers, 0);
        assert_eq!(report.crosswalks, 0);
        assert_eq!(report.errors, 2);
    }

    #[test]
    fn mirror_swaps_borders_and_inverts() {
        let registry = StyleRegistry::default();
        let markup = populated(&registry);
        let xml = markup.save_string().unwrap();

        let mut mirrored = fresh();
        let report = mirrored.load_string(&xml, &registry, true).unwrap();
        assert_eq!(report.errors, 0);
        let (_, crosswalk) = mirrored.crosswalks().next().unwrap();
        assert!(crosswalk.right_border().is_none());
        assert!(crosswalk.left_border().is_some());

        let (_, original) = markup.crosswalks().next().unwrap();
        let caps = crosswalk.style().capabilities();
        if let (Some(a), Some(b)) = (caps.as_invert(), original.style().capabilities().as_invert()) {
            assert_ne!(a.invert(), b.invert());
        }
    }

    #[test]
    fn wrong_root_is_rejected() {
        let registry = StyleRegistry::default();
        let mut markup = fresh();
        let element = Element::new("X");
        assert!(markup.load_xml(&element, &registry, false).is_err());
        assert!(markup.load_string("<M", &registry, false).is_err());
    }
}
