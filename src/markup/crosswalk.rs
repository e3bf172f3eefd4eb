use std::cell::Cell;
use std::rc::Rc;

use crate::config::{MarkupConfig, MarkupLod};
use crate::geometry::ParametricCurve;
use crate::math::Vector3;
use crate::style::crosswalk::{BorderLine, CrosswalkGeometry};
use crate::style::{CrosswalkStyle, LodCache, StyleData};

use super::line::{LineId, MarkupLine};
use super::point::{MarkupPoint, PointId};

slotmap::new_key_type! {
    /// Unique identifier for a crosswalk in a markup.
    pub struct CrosswalkId;
}

/// A crosswalk band along one enter, between two of its points.
#[derive(Debug)]
pub struct MarkupCrosswalk {
    pub(super) from: PointId,
    pub(super) to: PointId,
    pub(super) right_border: Option<LineId>,
    pub(super) left_border: Option<LineId>,
    pub(super) style: CrosswalkStyle,
    pub(super) geometry: CrosswalkGeometry,
    pub(super) data: LodCache<StyleData>,
    pub(super) dirty: Rc<Cell<bool>>,
}

impl MarkupCrosswalk {
    pub(super) fn new(
        from: PointId,
        to: PointId,
        right_border: Option<LineId>,
        left_border: Option<LineId>,
        mut style: CrosswalkStyle,
        geometry: CrosswalkGeometry,
    ) -> Self {
        let dirty = Rc::new(Cell::new(true));
        let flag = Rc::clone(&dirty);
        style
            .capabilities_mut()
            .notifier_mut()
            .set(move || flag.set(true));
        Self {
            from,
            to,
            right_border,
            left_border,
            style,
            geometry,
            data: LodCache::new(),
            dirty,
        }
    }

    #[must_use]
    pub fn points(&self) -> (PointId, PointId) {
        (self.from, self.to)
    }

    #[must_use]
    pub fn right_border(&self) -> Option<LineId> {
        self.right_border
    }

    #[must_use]
    pub fn left_border(&self) -> Option<LineId> {
        self.left_border
    }

    #[must_use]
    pub fn style(&self) -> &CrosswalkStyle {
        &self.style
    }

    /// Mutable style access. Property setters mark the crosswalk for recalculation.
    pub fn style_mut(&mut self) -> &mut CrosswalkStyle {
        &mut self.style
    }

    #[must_use]
    pub fn geometry(&self) -> &CrosswalkGeometry {
        &self.geometry
    }

    #[must_use]
    pub fn data(&self, lod: MarkupLod) -> Option<&StyleData> {
        self.data.get(lod)
    }

    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.dirty.get()
    }

    pub(super) fn recalculate(&mut self, config: &MarkupConfig) {
        for lod in MarkupLod::ALL {
            let dashes = self.style.calculate(&self.geometry, lod, config);
            self.data.set(lod, StyleData::Dashes(dashes));
        }
        self.dirty.set(false);
    }
}

/// Border description of `line` seen from the crosswalk's enter.
pub(super) fn border_line(
    line: &MarkupLine,
    enter: usize,
    from: &MarkupPoint,
    to: &MarkupPoint,
) -> BorderLine {
    if from.enter == enter {
        BorderLine {
            trajectory: line.trajectory().clone(),
            starts_on_enter: true,
        }
    } else if to.enter == enter {
        BorderLine {
            trajectory: line.trajectory().invert(),
            starts_on_enter: true,
        }
    } else {
        BorderLine {
            trajectory: line.trajectory().clone(),
            starts_on_enter: false,
        }
    }
}

/// Band geometry for a crosswalk from `start` to `end` with the given borders.
pub(super) fn crosswalk_geometry(
    start: &MarkupPoint,
    end: &MarkupPoint,
    corner_dir: &Vector3,
    total_width: f64,
    right: Option<&BorderLine>,
    left: Option<&BorderLine>,
) -> CrosswalkGeometry {
    CrosswalkGeometry::new(
        start.position,
        end.position,
        &start.direction,
        corner_dir,
        total_width,
        right,
        left,
    )
}
