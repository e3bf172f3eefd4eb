//! Fillers: styled areas bounded by a loop of lines and enter edges.

mod contour;
mod vertex;

pub use contour::{ContourState, FillerContour};
pub use vertex::{ContourLine, FillerVertex, LinePair};

use std::cell::Cell;
use std::rc::Rc;

use crate::config::{MarkupConfig, MarkupLod};
use crate::style::filler::FillerPart;
use crate::style::{FillerStyle, LodCache, StyleData};

slotmap::new_key_type! {
    /// Unique identifier for a filler in a markup.
    pub struct FillerId;
}

#[derive(Debug)]
pub struct MarkupFiller {
    contour: FillerContour,
    style: FillerStyle,
    parts: Vec<FillerPart>,
    data: LodCache<StyleData>,
    pub(in crate::markup) dirty: Rc<Cell<bool>>,
}

impl MarkupFiller {
    pub(in crate::markup) fn new(contour: FillerContour, mut style: FillerStyle) -> Self {
        let dirty = Rc::new(Cell::new(true));
        let flag = Rc::clone(&dirty);
        style
            .capabilities_mut()
            .notifier_mut()
            .set(move || flag.set(true));
        Self {
            contour,
            style,
            parts: Vec::new(),
            data: LodCache::new(),
            dirty,
        }
    }

    #[must_use]
    pub fn contour(&self) -> &FillerContour {
        &self.contour
    }

    #[must_use]
    pub fn style(&self) -> &FillerStyle {
        &self.style
    }

    /// Mutable style access. Property setters mark the filler for recalculation.
    pub fn style_mut(&mut self) -> &mut FillerStyle {
        &mut self.style
    }

    /// Replaces the style, keeping the contour.
    pub fn set_style(&mut self, style: FillerStyle) {
        let contour = std::mem::take(&mut self.contour);
        *self = Self::new(contour, style);
    }

    /// Contour sides as of the last recalculation.
    #[must_use]
    pub fn parts(&self) -> &[FillerPart] {
        &self.parts
    }

    #[must_use]
    pub fn data(&self, lod: MarkupLod) -> Option<&StyleData> {
        self.data.get(lod)
    }

    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.dirty.get()
    }

    pub(in crate::markup) fn recalculate(&mut self, parts: &[FillerPart], config: &MarkupConfig) {
        for lod in MarkupLod::ALL {
            self.data.set(lod, self.style.calculate(parts, lod, config));
        }
        self.parts = parts.to_vec();
        self.dirty.set(false);
    }

    /// Drops cached output after the contour stopped resolving.
    pub(in crate::markup) fn clear(&mut self) {
        self.parts.clear();
        for lod in MarkupLod::ALL {
            self.data.set(lod, StyleData::Empty);
        }
        self.dirty.set(false);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::markup::test_support::{four_way, point};
    use crate::markup::Markup;
    use crate::style::{Color32, HasColor, StyleRegistry, StyleType};

    /// Square-ish area in the north-east corner: two crossing lines and
    /// the corner between east and north.
    fn corner_filler(markup: &mut Markup, registry: &StyleRegistry, style_type: StyleType) -> FillerId {
        let [e2, e3, n1, n2, w2, s2] =
            [(0, 2), (0, 3), (1, 1), (1, 2), (2, 2), (3, 2)].map(|(enter, num)| point(markup, enter, num));
        let horizontal = markup
            .add_line(e2, w2, registry.default_style(StyleType::LineSolid))
            .unwrap();
        let vertical = markup
            .add_line(n2, s2, registry.default_style(StyleType::LineSolid))
            .unwrap();
        let centre = FillerVertex::Intersect(LinePair::new(horizontal, vertical));
        let mut contour = FillerContour::new();
        for vertex in [
            centre,
            FillerVertex::Enter(e2),
            FillerVertex::Enter(e3),
            FillerVertex::Enter(n1),
            FillerVertex::Enter(n2),
            centre,
        ] {
            contour.add(markup, vertex).unwrap();
        }
        markup
            .add_filler(contour, registry.filler_style(style_type).unwrap())
            .unwrap()
    }

    #[test]
    fn stripes_fill_the_corner() {
        let registry = StyleRegistry::default();
        let mut markup = four_way(3);
        let id = corner_filler(&mut markup, &registry, StyleType::FillerStripe);
        markup.update();

        let filler = markup.filler(id).unwrap();
        assert!(!filler.is_dirty());
        assert_eq!(filler.parts().len(), 5);
        let dashes = filler.data(MarkupLod::Lod0).unwrap().dashes();
        assert!(!dashes.is_empty());
        // Stay inside the corner's bounding box.
        for dash in dashes {
            assert!(dash.position.x > -0.1 && dash.position.x < 5.1);
            assert!(dash.position.y > -0.1 && dash.position.y < 5.1);
        }
    }

    #[test]
    fn style_changes_mark_the_filler() {
        let registry = StyleRegistry::default();
        let mut markup = four_way(3);
        let id = corner_filler(&mut markup, &registry, StyleType::FillerSolid);
        markup.update();

        let color = Color32::new(200, 10, 10, 255);
        markup
            .filler_mut(id)
            .unwrap()
            .style_mut()
            .capabilities_mut()
            .as_color_mut()
            .unwrap()
            .set_color(color);
        assert!(markup.filler(id).unwrap().is_dirty());
        markup.update();
        let dashes = markup.filler(id).unwrap().data(MarkupLod::Lod1).unwrap().dashes();
        assert!(dashes.iter().all(|d| d.color == color));

        markup
            .filler_mut(id)
            .unwrap()
            .set_style(registry.filler_style(StyleType::FillerPavement).unwrap());
        assert!(markup.filler(id).unwrap().is_dirty());
        markup.update();
        assert!(markup.filler(id).unwrap().data(MarkupLod::Lod0).unwrap().mesh().is_some());
    }

    #[test]
    fn removing_a_line_removes_its_fillers() {
        let registry = StyleRegistry::default();
        let mut markup = four_way(3);
        let id = corner_filler(&mut markup, &registry, StyleType::FillerGrid);
        let line = markup.lines().map(|(id, _)| id).next().unwrap();
        markup.remove_line(line).unwrap();
        assert!(markup.filler(id).is_err());
    }

    #[test]
    fn open_contours_are_refused() {
        let registry = StyleRegistry::default();
        let mut markup = four_way(3);
        let contour = FillerContour::new();
        assert!(markup
            .add_filler(contour, registry.filler_style(StyleType::FillerStripe).unwrap())
            .is_err());
    }
}
