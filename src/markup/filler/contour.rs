use crate::error::ContourError;
use crate::geometry::ParametricCurve;
use crate::markup::line::LineId;
use crate::markup::point::PointId;
use crate::markup::Markup;
use crate::style::filler::FillerPart;

use super::vertex::{enter_line_trajectory, ContourLine, FillerVertex};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContourState {
    Empty,
    Building,
    Closed,
}

/// Closed loop of filler vertices, built one vertex at a time.
///
/// Only vertices offered by [`FillerContour::candidates`] are accepted.
/// Adding the first vertex again closes the loop.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FillerContour {
    vertices: Vec<FillerVertex>,
    closed: bool,
}

impl FillerContour {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds a stored contour without replaying the placement rules.
    ///
    /// # Errors
    ///
    /// Fails for fewer than 3 distinct vertices or when a side does not
    /// resolve to a line of `markup`.
    pub fn closed_from(markup: &Markup, vertices: Vec<FillerVertex>) -> Result<Self, ContourError> {
        if vertices.is_empty() {
            return Err(ContourError::Empty);
        }
        let distinct = vertices
            .iter()
            .enumerate()
            .all(|(i, v)| !vertices[..i].contains(v));
        if vertices.len() < 3 || !distinct {
            return Err(ContourError::TooFewVertices);
        }
        let contour = Self {
            vertices,
            closed: true,
        };
        contour.parts(markup)?;
        Ok(contour)
    }

    #[must_use]
    pub fn state(&self) -> ContourState {
        if self.closed {
            ContourState::Closed
        } else if self.vertices.is_empty() {
            ContourState::Empty
        } else {
            ContourState::Building
        }
    }

    /// Distinct vertices in placement order. The closing vertex is not repeated.
    #[must_use]
    pub fn vertices(&self) -> &[FillerVertex] {
        &self.vertices
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    #[must_use]
    pub fn first(&self) -> Option<&FillerVertex> {
        self.vertices.first()
    }

    #[must_use]
    pub fn last(&self) -> Option<&FillerVertex> {
        self.vertices.last()
    }

    #[must_use]
    pub fn contains(&self, vertex: &FillerVertex) -> bool {
        self.vertices.contains(vertex)
    }

    /// Whether adding the first vertex again would close the loop.
    #[must_use]
    pub fn can_close(&self) -> bool {
        !self.closed && self.vertices.len() >= 3
    }

    /// Numbers of the nearest used points on either side of `point` along
    /// its enter, defaulting to the enter bounds `0` and `count + 1`.
    #[must_use]
    pub fn min_max_num(&self, markup: &Markup, point: PointId) -> (u8, u8) {
        let Ok(data) = markup.point(point) else {
            return (0, u8::MAX);
        };
        let mut min = 0;
        let mut max = data.count.saturating_add(1);
        for vertex in &self.vertices {
            let FillerVertex::Enter(other) = *vertex else {
                continue;
            };
            let Ok(other) = markup.point(other) else {
                continue;
            };
            if other.enter != data.enter || other.num == data.num {
                continue;
            }
            if other.num < data.num {
                min = min.max(other.num);
            } else {
                max = max.min(other.num);
            }
        }
        (min, max)
    }

    /// Vertices that may be added next.
    #[must_use]
    pub fn candidates(&self, markup: &Markup) -> Vec<FillerVertex> {
        if self.closed {
            return Vec::new();
        }
        let count = self.vertices.len();
        match self.vertices.last() {
            None => markup.filler_vertices(),
            Some(last) => {
                let prev = count.checked_sub(2).map(|i| &self.vertices[i]);
                last.next_candidates(prev, self, markup)
            }
        }
    }

    /// Appends `vertex`, closing the loop when it is the first vertex.
    ///
    /// # Errors
    ///
    /// Fails on a closed contour, and for vertices that are not candidates.
    pub fn add(&mut self, markup: &Markup, vertex: FillerVertex) -> Result<ContourState, ContourError> {
        if self.closed {
            return Err(ContourError::Closed);
        }
        if self.first() == Some(&vertex) && !self.can_close() {
            return Err(ContourError::TooFewVertices);
        }
        if !self.candidates(markup).contains(&vertex) {
            return Err(ContourError::IllegalVertex);
        }
        if self.first() == Some(&vertex) {
            self.closed = true;
        } else {
            self.vertices.push(vertex);
        }
        Ok(self.state())
    }

    /// Undoes the last [`FillerContour::add`]: reopens a closed contour or
    /// drops the last vertex.
    pub fn remove(&mut self) -> Option<FillerVertex> {
        if self.closed {
            self.closed = false;
            self.vertices.first().copied()
        } else {
            self.vertices.pop()
        }
    }

    /// Line followed by each side of the closed loop.
    ///
    /// # Errors
    ///
    /// Fails for an open contour or when a side has no common line.
    pub fn lines(&self, markup: &Markup) -> Result<Vec<ContourLine>, ContourError> {
        if self.vertices.is_empty() {
            return Err(ContourError::Empty);
        }
        if !self.closed {
            return Err(ContourError::Open);
        }
        self.sides()
            .map(|(a, b)| a.common_line(b, markup).ok_or(ContourError::NoCommonLine))
            .collect()
    }

    /// Trajectories of the sides of the closed loop, head to tail.
    ///
    /// # Errors
    ///
    /// Fails for an open contour or when a side no longer resolves.
    pub fn parts(&self, markup: &Markup) -> Result<Vec<FillerPart>, ContourError> {
        let lines = self.lines(markup)?;
        self.sides()
            .zip(lines)
            .map(|((a, b), line)| match line {
                ContourLine::Line(id) => {
                    let (Some(t0), Some(t1)) = (a.t_on(markup, id), b.t_on(markup, id)) else {
                        return Err(ContourError::NoCommonLine);
                    };
                    let trajectory = markup
                        .line(id)
                        .map_err(|_| ContourError::NoCommonLine)?
                        .trajectory()
                        .cut(t0, t1);
                    Ok(FillerPart {
                        trajectory,
                        is_enter_line: false,
                    })
                }
                ContourLine::Enter(p, q) => enter_line_trajectory(markup, p, q)
                    .map(|trajectory| FillerPart {
                        trajectory,
                        is_enter_line: true,
                    })
                    .ok_or(ContourError::NoCommonLine),
            })
            .collect()
    }

    /// Whether the loop passes through or along `line`.
    #[must_use]
    pub fn uses_line(&self, markup: &Markup, line: LineId) -> bool {
        let crosses = self
            .vertices
            .iter()
            .any(|v| matches!(v, FillerVertex::Intersect(pair) if pair.contains(line)));
        crosses
            || self
                .sides()
                .any(|(a, b)| a.common_line(b, markup) == Some(ContourLine::Line(line)))
    }

    /// Consecutive vertex pairs, wrapping around when closed.
    fn sides(&self) -> impl Iterator<Item = (&FillerVertex, &FillerVertex)> {
        let count = self.vertices.len();
        let wrap = usize::from(self.closed && count > 1);
        (0..count.saturating_sub(1) + wrap)
            .map(move |i| (&self.vertices[i], &self.vertices[(i + 1) % count]))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;
    use crate::markup::test_support::{four_way, point};
    use crate::markup::LinePair;
    use crate::style::{StyleRegistry, StyleType};

    /// East points 1 and 3 both joined to the middle north point.
    fn fan() -> (Markup, [FillerVertex; 3]) {
        let registry = StyleRegistry::default();
        let mut markup = four_way(3);
        let (e1, e3, n2) = (point(&markup, 0, 1), point(&markup, 0, 3), point(&markup, 1, 2));
        markup
            .add_line(e1, n2, registry.default_style(StyleType::LineSolid))
            .unwrap();
        markup
            .add_line(e3, n2, registry.default_style(StyleType::LineSolid))
            .unwrap();
        let vertices = [
            FillerVertex::Enter(e1),
            FillerVertex::Enter(n2),
            FillerVertex::Enter(e3),
        ];
        (markup, vertices)
    }

    #[test]
    fn three_vertices_close() {
        let (markup, [e1, n2, e3]) = fan();
        let mut contour = FillerContour::new();
        assert_eq!(contour.state(), ContourState::Empty);
        assert_eq!(contour.add(&markup, e1).unwrap(), ContourState::Building);
        assert!(contour.candidates(&markup).contains(&n2));
        contour.add(&markup, n2).unwrap();
        contour.add(&markup, e3).unwrap();

        assert_eq!(contour.add(&markup, n2), Err(ContourError::IllegalVertex));
        assert!(!contour.candidates(&markup).contains(&n2));

        assert_eq!(contour.add(&markup, e1).unwrap(), ContourState::Closed);
        assert_eq!(contour.len(), 3);
        assert_eq!(contour.add(&markup, e3), Err(ContourError::Closed));
    }

    #[test]
    fn closing_needs_three_vertices() {
        let (markup, [e1, n2, _]) = fan();
        let mut contour = FillerContour::new();
        contour.add(&markup, e1).unwrap();
        contour.add(&markup, n2).unwrap();
        assert!(!contour.candidates(&markup).contains(&e1));
        assert_eq!(contour.add(&markup, e1), Err(ContourError::TooFewVertices));
    }

    #[test]
    fn remove_steps_back() {
        let (markup, [e1, n2, e3]) = fan();
        let mut contour = FillerContour::new();
        for v in [e1, n2, e3, e1] {
            contour.add(&markup, v).unwrap();
        }
        assert_eq!(contour.remove(), Some(e1));
        assert_eq!(contour.state(), ContourState::Building);
        assert_eq!(contour.remove(), Some(e3));
        assert_eq!(contour.remove(), Some(n2));
        assert_eq!(contour.remove(), Some(e1));
        assert_eq!(contour.state(), ContourState::Empty);
        assert_eq!(contour.remove(), None);
    }

    #[test]
    fn parts_follow_lines_and_enters() {
        let (markup, vertices) = fan();
        let contour = FillerContour::closed_from(&markup, vertices.to_vec()).unwrap();
        let parts = contour.parts(&markup).unwrap();
        assert_eq!(parts.len(), 3);
        assert_eq!(
            parts.iter().map(|p| p.is_enter_line).collect::<Vec<_>>(),
            [false, false, true]
        );
        for i in 0..3 {
            assert_abs_diff_eq!(
                parts[i].trajectory.end_position(),
                parts[(i + 1) % 3].trajectory.start_position(),
                epsilon = 1e-9
            );
        }
        assert_abs_diff_eq!(parts[2].trajectory.length(), 8.0, epsilon = 1e-9);
    }

    #[test]
    fn open_contours_have_no_parts() {
        let (markup, [e1, n2, _]) = fan();
        let mut contour = FillerContour::new();
        assert_eq!(contour.parts(&markup), Err(ContourError::Empty));
        contour.add(&markup, e1).unwrap();
        contour.add(&markup, n2).unwrap();
        assert_eq!(contour.parts(&markup), Err(ContourError::Open));
    }

    #[test]
    fn stored_contours_are_checked() {
        let (markup, [e1, n2, e3]) = fan();
        assert_eq!(
            FillerContour::closed_from(&markup, vec![e1, n2]),
            Err(ContourError::TooFewVertices)
        );
        assert_eq!(
            FillerContour::closed_from(&markup, vec![e1, n2, e1]),
            Err(ContourError::TooFewVertices)
        );
        let lines: Vec<LineId> = markup.lines().map(|(id, _)| id).collect();
        // The two fan lines only meet at their shared end.
        let crossing = FillerVertex::Intersect(LinePair::new(lines[0], lines[1]));
        assert_eq!(
            FillerContour::closed_from(&markup, vec![e1, crossing, e3]),
            Err(ContourError::NoCommonLine)
        );
        assert!(FillerContour::closed_from(&markup, vec![e1, n2, e3]).is_ok());
    }

    #[test]
    fn intersections_are_walked_without_backtracking() {
        let registry = StyleRegistry::default();
        let mut markup = four_way(3);
        let horizontal = markup
            .add_line(
                point(&markup, 0, 2),
                point(&markup, 2, 2),
                registry.default_style(StyleType::LineSolid),
            )
            .unwrap();
        let vertical = markup
            .add_line(
                point(&markup, 1, 2),
                point(&markup, 3, 2),
                registry.default_style(StyleType::LineSolid),
            )
            .unwrap();
        let centre = FillerVertex::Intersect(LinePair::new(horizontal, vertical));

        let mut contour = FillerContour::new();
        contour.add(&markup, centre).unwrap();
        assert_eq!(contour.candidates(&markup).len(), 4);

        let east = FillerVertex::Enter(point(&markup, 0, 2));
        contour.add(&markup, east).unwrap();
        let north = FillerVertex::Enter(point(&markup, 1, 2));
        // East middle point walks its enter towards the north-east corner.
        let e3 = FillerVertex::Enter(point(&markup, 0, 3));
        assert!(contour.candidates(&markup).contains(&e3));
        contour.add(&markup, e3).unwrap();
        let n1 = FillerVertex::Enter(point(&markup, 1, 1));
        contour.add(&markup, n1).unwrap();
        contour.add(&markup, north).unwrap();
        assert!(contour.candidates(&markup).contains(&centre));
        assert_eq!(contour.add(&markup, centre).unwrap(), ContourState::Closed);

        let parts = contour.parts(&markup).unwrap();
        assert_eq!(parts.len(), 5);
        assert!(contour.uses_line(&markup, horizontal));
    }

    /// Depth-first search over candidates for a closing loop.
    fn find_loop(markup: &Markup, contour: &mut FillerContour, depth: usize) -> bool {
        if contour.is_closed() {
            return true;
        }
        if depth == 0 {
            return false;
        }
        for candidate in contour.candidates(markup) {
            contour.add(markup, candidate).unwrap();
            if find_loop(markup, contour, depth - 1) {
                return true;
            }
            contour.remove();
        }
        false
    }

    #[test]
    fn candidates_reach_a_closed_loop_from_any_enter_point() {
        let registry = StyleRegistry::default();
        let mut markup = four_way(2);
        markup
            .add_line(
                point(&markup, 0, 2),
                point(&markup, 2, 1),
                registry.default_style(StyleType::LineDashed),
            )
            .unwrap();
        let starts: Vec<PointId> = markup.points().map(|(id, _)| id).collect();
        for start in starts {
            let mut contour = FillerContour::new();
            contour.add(&markup, FillerVertex::Enter(start)).unwrap();
            assert!(find_loop(&markup, &mut contour, 10), "no loop from {start:?}");
            assert!(contour.len() >= 3);
            assert_eq!(contour.parts(&markup).unwrap().len(), contour.len());
        }
    }
}
