use std::cell::Cell;
use std::rc::Rc;

use crate::config::{MarkupConfig, MarkupLod};
use crate::geometry::{BezierTrajectory, Trajectory};
use crate::math::vector_2d::left_normal;
use crate::style::line::LineContext;
use crate::style::{LodCache, Style, StyleData};

use super::point::{MarkupPoint, PointId};

slotmap::new_key_type! {
    /// Unique identifier for a line in a markup.
    pub struct LineId;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LineKind {
    /// Connects points of two different enters.
    Regular,
    /// Connects two points of the same enter.
    Stop,
}

/// A styled line between two markup points.
#[derive(Debug)]
pub struct MarkupLine {
    pub(super) from: PointId,
    pub(super) to: PointId,
    pub(super) kind: LineKind,
    pub(super) style: Style,
    pub(super) trajectory: Trajectory,
    pub(super) data: LodCache<StyleData>,
    pub(super) dirty: Rc<Cell<bool>>,
}

impl MarkupLine {
    pub(super) fn new(
        from: PointId,
        to: PointId,
        kind: LineKind,
        mut style: Style,
        trajectory: Trajectory,
    ) -> Self {
        let dirty = Rc::new(Cell::new(true));
        let flag = Rc::clone(&dirty);
        style.set_on_changed(move || flag.set(true));
        Self {
            from,
            to,
            kind,
            style,
            trajectory,
            data: LodCache::new(),
            dirty,
        }
    }

    /// Point the trajectory starts at.
    #[must_use]
    pub fn from(&self) -> PointId {
        self.from
    }

    /// Point the trajectory ends at.
    #[must_use]
    pub fn to(&self) -> PointId {
        self.to
    }

    #[must_use]
    pub fn kind(&self) -> LineKind {
        self.kind
    }

    #[must_use]
    pub fn style(&self) -> &Style {
        &self.style
    }

    /// Mutable style access. Property setters mark the line for recalculation.
    pub fn style_mut(&mut self) -> &mut Style {
        &mut self.style
    }

    #[must_use]
    pub fn trajectory(&self) -> &Trajectory {
        &self.trajectory
    }

    #[must_use]
    pub fn contains(&self, point: PointId) -> bool {
        self.from == point || self.to == point
    }

    /// The end opposite to `point`, if the line touches it.
    #[must_use]
    pub fn other(&self, point: PointId) -> Option<PointId> {
        if self.from == point {
            Some(self.to)
        } else if self.to == point {
            Some(self.from)
        } else {
            None
        }
    }

    /// Cached output for `lod`.
    #[must_use]
    pub fn data(&self, lod: MarkupLod) -> Option<&StyleData> {
        self.data.get(lod)
    }

    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.dirty.get()
    }

    pub(super) fn recalculate(&mut self, context: &LineContext<'_>, config: &MarkupConfig) {
        for lod in MarkupLod::ALL {
            let dashes = match &self.style {
                Style::Line(style) => style.calculate(&self.trajectory, context, lod, config),
                Style::StopLine(style) => style.calculate(&self.trajectory, lod, config),
                Style::Crosswalk(_) | Style::Filler(_) => Vec::new(),
            };
            self.data.set(lod, StyleData::Dashes(dashes));
        }
        self.dirty.set(false);
    }
}

/// Whether a line between `a` and `b` is a stop line.
pub(super) fn kind_between(a: &MarkupPoint, b: &MarkupPoint) -> LineKind {
    if a.enter == b.enter {
        LineKind::Stop
    } else {
        LineKind::Regular
    }
}

/// Whether a stop line from `a` to `b` keeps its left side off the junction.
pub(super) fn is_stop_order(a: &MarkupPoint, b: &MarkupPoint) -> bool {
    left_normal(&(b.position - a.position)).dot(&a.direction) <= 0.0
}

/// Trajectory of a line from `a` to `b`.
///
/// Regular lines leave and enter along the point directions; stop lines
/// are straight.
pub(super) fn line_trajectory(a: &MarkupPoint, b: &MarkupPoint, kind: LineKind) -> Trajectory {
    match kind {
        LineKind::Stop => Trajectory::straight(a.position, b.position),
        LineKind::Regular => Trajectory::Bezier(BezierTrajectory::from_directions(
            a.position,
            &a.direction,
            b.position,
            &b.direction,
            true,
            true,
        )),
    }
}
