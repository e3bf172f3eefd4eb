//! Filler contour vertices and the rules for which vertex may follow which.

use crate::geometry::{BezierTrajectory, ParametricCurve, Trajectory};
use crate::markup::line::{LineId, LineKind};
use crate::markup::point::PointId;
use crate::markup::Markup;
use crate::math::Point3;

use super::contour::FillerContour;

/// Two lines, stored in a canonical order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LinePair {
    first: LineId,
    second: LineId,
}

impl LinePair {
    #[must_use]
    pub fn new(a: LineId, b: LineId) -> Self {
        if a <= b {
            Self { first: a, second: b }
        } else {
            Self { first: b, second: a }
        }
    }

    #[must_use]
    pub fn first(&self) -> LineId {
        self.first
    }

    #[must_use]
    pub fn second(&self) -> LineId {
        self.second
    }

    #[must_use]
    pub fn contains(&self, line: LineId) -> bool {
        self.first == line || self.second == line
    }
}

/// A corner of a filler contour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FillerVertex {
    /// A point on an enter.
    Enter(PointId),
    /// The crossing of two lines.
    Intersect(LinePair),
}

/// Line joining two consecutive contour vertices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContourLine {
    Line(LineId),
    /// Synthetic chord between two enter points. It has no identity in the markup.
    Enter(PointId, PointId),
}

impl FillerVertex {
    /// Position of the vertex, if everything it refers to still exists.
    #[must_use]
    pub fn position(&self, markup: &Markup) -> Option<Point3> {
        match *self {
            FillerVertex::Enter(point) => markup.point(point).ok().map(|p| p.position),
            FillerVertex::Intersect(pair) => {
                let t = self.t_on(markup, pair.first)?;
                let line = markup.line(pair.first).ok()?;
                Some(line.trajectory().position(t))
            }
        }
    }

    /// Parameter of the vertex along `line`.
    #[must_use]
    pub fn t_on(&self, markup: &Markup, line: LineId) -> Option<f64> {
        let data = markup.line(line).ok()?;
        match *self {
            FillerVertex::Enter(point) if data.from() == point => Some(0.0),
            FillerVertex::Enter(point) if data.to() == point => Some(1.0),
            FillerVertex::Enter(_) => None,
            FillerVertex::Intersect(pair) if pair.first == line => {
                markup.crossing(pair.first, pair.second).map(|(t, _)| t)
            }
            FillerVertex::Intersect(pair) if pair.second == line => {
                markup.crossing(pair.first, pair.second).map(|(_, u)| u)
            }
            FillerVertex::Intersect(_) => None,
        }
    }

    /// Whether `line` passes through this vertex.
    #[must_use]
    pub fn lies_on(&self, markup: &Markup, line: LineId) -> bool {
        self.t_on(markup, line).is_some()
    }

    /// The line a contour side from `self` to `other` follows.
    ///
    /// Two enter points on the same enter, or without a line between
    /// them, are joined by a synthetic enter line.
    #[must_use]
    pub fn common_line(&self, other: &FillerVertex, markup: &Markup) -> Option<ContourLine> {
        match (*self, *other) {
            (FillerVertex::Enter(a), FillerVertex::Enter(b)) => {
                let same_enter = markup.point(a).ok()?.enter == markup.point(b).ok()?.enter;
                match markup.line_between(a, b) {
                    Some(line) if !same_enter => Some(ContourLine::Line(line)),
                    _ => Some(ContourLine::Enter(a, b)),
                }
            }
            (FillerVertex::Enter(point), FillerVertex::Intersect(pair))
            | (FillerVertex::Intersect(pair), FillerVertex::Enter(point)) => {
                let enter = FillerVertex::Enter(point);
                [pair.first, pair.second]
                    .into_iter()
                    .find(|&line| enter.lies_on(markup, line))
                    .map(ContourLine::Line)
            }
            (FillerVertex::Intersect(a), FillerVertex::Intersect(b)) => [b.first, b.second]
                .into_iter()
                .find(|&line| a.contains(line))
                .map(ContourLine::Line),
        }
    }

    /// Vertices that may follow `self` when it is the last vertex of
    /// `contour` and `prev` the one before it.
    pub(super) fn next_candidates(
        &self,
        prev: Option<&FillerVertex>,
        contour: &FillerContour,
        markup: &Markup,
    ) -> Vec<FillerVertex> {
        let mut candidates = match *self {
            FillerVertex::Enter(point) => enter_candidates(point, prev, contour, markup),
            FillerVertex::Intersect(pair) => {
                let lines = match prev {
                    Some(&FillerVertex::Enter(point)) => {
                        let enter = FillerVertex::Enter(point);
                        if enter.lies_on(markup, pair.first) {
                            vec![pair.second]
                        } else {
                            vec![pair.first]
                        }
                    }
                    Some(FillerVertex::Intersect(prev_pair)) => {
                        if prev_pair.contains(pair.first) {
                            vec![pair.second]
                        } else {
                            vec![pair.first]
                        }
                    }
                    None => vec![pair.first, pair.second],
                };
                lines
                    .into_iter()
                    .flat_map(|line| line_neighbours(self, line, contour, markup))
                    .collect()
            }
        };

        let mut seen = Vec::with_capacity(candidates.len());
        candidates.retain(|v| {
            if seen.contains(v) {
                false
            } else {
                seen.push(*v);
                true
            }
        });
        candidates
    }
}

fn enter_candidates(
    point_id: PointId,
    prev: Option<&FillerVertex>,
    contour: &FillerContour,
    markup: &Markup,
) -> Vec<FillerVertex> {
    let mut candidates = Vec::new();
    let Ok(point) = markup.point(point_id) else {
        return candidates;
    };

    let from_same_enter = matches!(
        prev,
        Some(&FillerVertex::Enter(p)) if markup.point(p).is_ok_and(|p| p.enter == point.enter)
    );
    if !from_same_enter {
        let (min, max) = contour.min_max_num(markup, point_id);
        for &other in markup.enter_points(point.enter) {
            let Ok(data) = markup.point(other) else {
                continue;
            };
            if data.num != point.num
                && min < data.num
                && data.num < max
                && (data.is_edge() || markup.has_lines(other))
            {
                candidates.push(FillerVertex::Enter(other));
            }
        }
        if let Some(&FillerVertex::Enter(first)) = contour.first() {
            if let Ok(data) = markup.point(first) {
                if data.enter == point.enter
                    && (data.num == min || data.num == max)
                    && contour.can_close()
                {
                    candidates.push(FillerVertex::Enter(first));
                }
            }
        }
    }

    if point.is_edge() {
        if let Some(other) = markup.adjacent_enter_point(point_id) {
            let vertex = FillerVertex::Enter(other);
            let can_end = contour.first() == Some(&vertex) && contour.can_close();
            let used = contour.contains(&vertex);
            let edge_line = markup.line_between(point_id, other).is_some();
            if (can_end || !used) && !edge_line {
                candidates.push(vertex);
            }
        }
    }

    let vertex = FillerVertex::Enter(point_id);
    for (line, data) in markup.lines_of(point_id) {
        if data.kind() != LineKind::Stop {
            candidates.extend(line_neighbours(&vertex, line, contour, markup));
        }
    }
    candidates
}

/// Immediate neighbours of `vertex` along `line` that the contour may visit.
fn line_neighbours(
    vertex: &FillerVertex,
    line: LineId,
    contour: &FillerContour,
    markup: &Markup,
) -> Vec<FillerVertex> {
    let along = markup.line_vertices(line);
    let Some(index) = along.iter().position(|(_, v)| v == vertex) else {
        return Vec::new();
    };
    [index.checked_sub(1), Some(index + 1)]
        .into_iter()
        .flatten()
        .filter_map(|i| along.get(i).map(|(_, v)| *v))
        .filter(|v| !contour.contains(v) || (contour.first() == Some(v) && contour.can_close()))
        .collect()
}

/// Trajectory of a synthetic enter line from `a` to `b`.
pub(super) fn enter_line_trajectory(markup: &Markup, a: PointId, b: PointId) -> Option<Trajectory> {
    let a = markup.point(a).ok()?;
    let b = markup.point(b).ok()?;
    Some(if a.enter == b.enter {
        Trajectory::straight(a.position, b.position)
    } else {
        Trajectory::Bezier(BezierTrajectory::from_directions(
            a.position,
            &a.direction,
            b.position,
            &b.direction,
            true,
            true,
        ))
    })
}
