//! Markup of one junction: enters, their points, and the lines, fillers
//! and crosswalks placed between them.

pub mod crosswalk;
pub mod filler;
pub mod line;
pub mod persist;
pub mod point;

pub use crosswalk::{CrosswalkId, MarkupCrosswalk};
pub use filler::{ContourLine, ContourState, FillerContour, FillerId, FillerVertex, LinePair, MarkupFiller};
pub use line::{LineId, LineKind, MarkupLine};
pub use persist::LoadReport;
pub use point::{MarkupPoint, PointId};

use slotmap::SlotMap;
use tracing::debug;

use crate::config::MarkupConfig;
use crate::error::{EntityError, GeometryError, Result};
use crate::geometry::{BezierTrajectory, Intersection, Trajectory};
use crate::math::vector_2d::{flat_length, flat_normalize};
use crate::math::{Point3, Vector3, EPSILON, TOLERANCE};
use crate::style::line::LineContext;
use crate::style::{CrosswalkStyle, FillerStyle, Style, StyleFamily};

/// Crossings closer than this to a line end are not line intersections.
const END_MARGIN: f64 = 1e-3;

/// Where a road meets the junction.
#[derive(Debug, Clone, PartialEq)]
pub struct EnterData {
    /// Persistent id, unique within the markup.
    pub id: u16,
    /// Centre of the enter edge.
    pub position: Point3,
    /// Direction from the road into the junction.
    pub normal_dir: Vector3,
    /// Direction along the enter edge, towards the next enter.
    pub corner_dir: Vector3,
    /// Length of the enter edge.
    pub width: f64,
    pub point_count: u8,
}

impl EnterData {
    /// Position of point `num` (1-based) along the enter edge.
    #[must_use]
    pub fn point_position(&self, num: u8) -> Point3 {
        let offset = if self.point_count <= 1 {
            0.0
        } else {
            -self.width / 2.0
                + self.width * f64::from(num - 1) / f64::from(self.point_count - 1)
        };
        self.position + flat_normalize(&self.corner_dir) * offset
    }
}

#[derive(Debug)]
struct Enter {
    data: EnterData,
    points: Vec<PointId>,
}

/// Arena owning every entity of one junction's markup.
///
/// Entities reference each other through typed ids. Style changes only
/// flag the owning entity; [`Markup::update`] recomputes what is flagged.
#[derive(Debug)]
pub struct Markup {
    config: MarkupConfig,
    enters: Vec<Enter>,
    points: SlotMap<PointId, MarkupPoint>,
    lines: SlotMap<LineId, MarkupLine>,
    fillers: SlotMap<FillerId, MarkupFiller>,
    crosswalks: SlotMap<CrosswalkId, MarkupCrosswalk>,
    position: Point3,
    contour: Vec<Trajectory>,
}

impl Markup {
    /// Creates a markup for `enters`, given in cyclic order.
    ///
    /// # Errors
    ///
    /// Fails when an enter has no points, a zero direction, or an id
    /// already used by another enter.
    pub fn new(enters: Vec<EnterData>, config: MarkupConfig) -> Result<Self> {
        let mut markup = Self {
            config,
            enters: Vec::with_capacity(enters.len()),
            points: SlotMap::with_key(),
            lines: SlotMap::with_key(),
            fillers: SlotMap::with_key(),
            crosswalks: SlotMap::with_key(),
            position: Point3::origin(),
            contour: Vec::new(),
        };
        for data in enters {
            validate_enter(&data)?;
            if markup.enters.iter().any(|e| e.data.id == data.id) {
                return Err(GeometryError::Degenerate(format!("duplicate enter id {}", data.id)).into());
            }
            let index = markup.enters.len();
            let points = (1..=data.point_count)
                .map(|num| markup.points.insert(make_point(index, num, &data)))
                .collect();
            markup.enters.push(Enter { data, points });
        }
        markup.update_outline();
        Ok(markup)
    }

    #[must_use]
    pub fn config(&self) -> &MarkupConfig {
        &self.config
    }

    /// Centre of the junction.
    #[must_use]
    pub fn position(&self) -> Point3 {
        self.position
    }

    /// Corner curves joining consecutive enters.
    #[must_use]
    pub fn contour(&self) -> &[Trajectory] {
        &self.contour
    }

    #[must_use]
    pub fn enter_count(&self) -> usize {
        self.enters.len()
    }

    #[must_use]
    pub fn enter(&self, index: usize) -> Option<&EnterData> {
        self.enters.get(index).map(|e| &e.data)
    }

    /// Points of enter `index`, ordered by number.
    #[must_use]
    pub fn enter_points(&self, index: usize) -> &[PointId] {
        self.enters.get(index).map_or(&[], |e| e.points.as_slice())
    }

    // --- Point operations ---

    /// Returns the point, or an error if not found.
    ///
    /// # Errors
    ///
    /// Returns an error if the entity is not found in the markup.
    pub fn point(&self, id: PointId) -> std::result::Result<&MarkupPoint, EntityError> {
        self.points
            .get(id)
            .ok_or_else(|| EntityError::NotFound("point".into()))
    }

    pub fn points(&self) -> impl Iterator<Item = (PointId, &MarkupPoint)> {
        self.points.iter()
    }

    /// Looks a point up by its persistent id.
    #[must_use]
    pub fn point_by_id(&self, id: u32) -> Option<PointId> {
        self.points.iter().find(|(_, p)| p.id == id).map(|(key, _)| key)
    }

    /// The edge point of the neighbouring enter next to `point`.
    ///
    /// The first point of an enter faces the previous enter's last point
    /// and the last point faces the next enter's first one.
    #[must_use]
    pub fn adjacent_enter_point(&self, point: PointId) -> Option<PointId> {
        let data = self.points.get(point)?;
        let count = self.enters.len();
        if count < 2 {
            return None;
        }
        if data.is_first() {
            let prev = (data.enter + count - 1) % count;
            self.enters[prev].points.last().copied()
        } else if data.is_last() {
            let next = (data.enter + 1) % count;
            self.enters[next].points.first().copied()
        } else {
            None
        }
    }

    // --- Line operations ---

    /// Returns the line, or an error if not found.
    ///
    /// # Errors
    ///
    /// Returns an error if the entity is not found in the markup.
    pub fn line(&self, id: LineId) -> std::result::Result<&MarkupLine, EntityError> {
        self.lines
            .get(id)
            .ok_or_else(|| EntityError::NotFound("line".into()))
    }

    /// Returns a mutable reference to the line, or an error if not found.
    ///
    /// # Errors
    ///
    /// Returns an error if the entity is not found in the markup.
    pub fn line_mut(&mut self, id: LineId) -> std::result::Result<&mut MarkupLine, EntityError> {
        self.lines
            .get_mut(id)
            .ok_or_else(|| EntityError::NotFound("line".into()))
    }

    pub fn lines(&self) -> impl Iterator<Item = (LineId, &MarkupLine)> {
        self.lines.iter()
    }

    /// Lines with an end at `point`.
    pub fn lines_of(&self, point: PointId) -> impl Iterator<Item = (LineId, &MarkupLine)> {
        self.lines.iter().filter(move |(_, line)| line.contains(point))
    }

    #[must_use]
    pub fn has_lines(&self, point: PointId) -> bool {
        self.lines_of(point).next().is_some()
    }

    #[must_use]
    pub fn line_between(&self, a: PointId, b: PointId) -> Option<LineId> {
        self.lines
            .iter()
            .find(|(_, line)| line.contains(a) && line.other(a) == Some(b))
            .map(|(id, _)| id)
    }

    /// Adds a line between two points.
    ///
    /// Points of the same enter make a stop line, which needs a stop line
    /// style; other pairs need a regular line style.
    ///
    /// # Errors
    ///
    /// Fails for unknown or identical points, an already connected pair,
    /// or a style of the wrong family.
    pub fn add_line(&mut self, a: PointId, b: PointId, style: Style) -> Result<LineId> {
        if a == b {
            return Err(EntityError::InvalidLine("a line needs two distinct points".into()).into());
        }
        let (pa, pb) = (self.point(a)?, self.point(b)?);
        if self.line_between(a, b).is_some() {
            return Err(EntityError::InvalidLine("points are already connected".into()).into());
        }
        let kind = line::kind_between(pa, pb);
        check_line_family(kind, &style)?;
        let (from, to) = if kind == LineKind::Stop && !line::is_stop_order(pa, pb) {
            (b, a)
        } else {
            (a, b)
        };
        let trajectory = line::line_trajectory(self.point(from)?, self.point(to)?, kind);
        let id = self.lines.insert(MarkupLine::new(from, to, kind, style, trajectory));
        debug!(?id, ?kind, "line added");
        Ok(id)
    }

    /// Replaces the style of a line, keeping its kind.
    ///
    /// # Errors
    ///
    /// Fails for unknown lines or a style of the wrong family.
    pub fn set_line_style(&mut self, id: LineId, style: Style) -> Result<()> {
        let line = self.line(id)?;
        check_line_family(line.kind(), &style)?;
        let (from, to, kind, trajectory) = (line.from, line.to, line.kind, line.trajectory.clone());
        self.lines[id] = MarkupLine::new(from, to, kind, style, trajectory);
        Ok(())
    }

    /// Removes a line together with the fillers built on it. Crosswalks
    /// bordered by it lose that border.
    ///
    /// # Errors
    ///
    /// Returns an error if the line is not found.
    pub fn remove_line(&mut self, id: LineId) -> Result<()> {
        self.line(id)?;
        let fillers: Vec<FillerId> = self
            .fillers
            .iter()
            .filter(|(_, f)| f.contour().uses_line(self, id))
            .map(|(key, _)| key)
            .collect();
        for filler in &fillers {
            self.fillers.remove(*filler);
        }

        let mut bordered = Vec::new();
        for (key, crosswalk) in &mut self.crosswalks {
            if crosswalk.right_border == Some(id) {
                crosswalk.right_border = None;
                bordered.push(key);
            }
            if crosswalk.left_border == Some(id) {
                crosswalk.left_border = None;
                bordered.push(key);
            }
        }
        self.lines.remove(id);
        for key in bordered {
            self.rebuild_crosswalk(key);
        }
        debug!(?id, fillers = fillers.len(), "line removed");
        Ok(())
    }

    /// Parameters where lines `a` and `b` cross away from their ends, on
    /// `a` and on `b`.
    #[must_use]
    pub fn crossing(&self, a: LineId, b: LineId) -> Option<(f64, f64)> {
        if a == b {
            return None;
        }
        let first = self.lines.get(a)?.trajectory();
        let second = self.lines.get(b)?.trajectory();
        let inner = |t: f64| t > END_MARGIN && t < 1.0 - END_MARGIN;
        Intersection::calculate(first, second)
            .into_iter()
            .filter(|i| i.is_intersect && inner(i.first_t) && inner(i.second_t))
            .min_by(Intersection::cmp_first)
            .map(|i| (i.first_t, i.second_t))
    }

    /// Vertices along `line` ordered by parameter: its start point, its
    /// crossings with other lines, its end point.
    #[must_use]
    pub fn line_vertices(&self, line: LineId) -> Vec<(f64, FillerVertex)> {
        let Some(data) = self.lines.get(line) else {
            return Vec::new();
        };
        let mut crossings: Vec<(f64, FillerVertex)> = self
            .lines
            .keys()
            .filter_map(|other| {
                self.crossing(line, other)
                    .map(|(t, _)| (t, FillerVertex::Intersect(LinePair::new(line, other))))
            })
            .collect();
        crossings.sort_by(|a, b| a.0.total_cmp(&b.0));

        let mut vertices = Vec::with_capacity(crossings.len() + 2);
        vertices.push((0.0, FillerVertex::Enter(data.from())));
        vertices.extend(crossings);
        vertices.push((1.0, FillerVertex::Enter(data.to())));
        vertices
    }

    /// Every vertex a filler contour may start from.
    #[must_use]
    pub fn filler_vertices(&self) -> Vec<FillerVertex> {
        let mut vertices: Vec<FillerVertex> = self
            .enters
            .iter()
            .flat_map(|e| e.points.iter().map(|&p| FillerVertex::Enter(p)))
            .collect();
        let keys: Vec<LineId> = self.lines.keys().collect();
        for (i, &a) in keys.iter().enumerate() {
            for &b in &keys[i + 1..] {
                if self.crossing(a, b).is_some() {
                    vertices.push(FillerVertex::Intersect(LinePair::new(a, b)));
                }
            }
        }
        vertices
    }

    // --- Filler operations ---

    /// Returns the filler, or an error if not found.
    ///
    /// # Errors
    ///
    /// Returns an error if the entity is not found in the markup.
    pub fn filler(&self, id: FillerId) -> std::result::Result<&MarkupFiller, EntityError> {
        self.fillers
            .get(id)
            .ok_or_else(|| EntityError::NotFound("filler".into()))
    }

    /// Returns a mutable reference to the filler, or an error if not found.
    ///
    /// # Errors
    ///
    /// Returns an error if the entity is not found in the markup.
    pub fn filler_mut(&mut self, id: FillerId) -> std::result::Result<&mut MarkupFiller, EntityError> {
        self.fillers
            .get_mut(id)
            .ok_or_else(|| EntityError::NotFound("filler".into()))
    }

    pub fn fillers(&self) -> impl Iterator<Item = (FillerId, &MarkupFiller)> {
        self.fillers.iter()
    }

    /// Adds a filler over a closed contour.
    ///
    /// # Errors
    ///
    /// Fails when the contour is not closed or a side has no common line.
    pub fn add_filler(&mut self, contour: FillerContour, style: FillerStyle) -> Result<FillerId> {
        contour.parts(self)?;
        let id = self.fillers.insert(MarkupFiller::new(contour, style));
        debug!(?id, "filler added");
        Ok(id)
    }

    /// # Errors
    ///
    /// Returns an error if the filler is not found.
    pub fn remove_filler(&mut self, id: FillerId) -> Result<MarkupFiller> {
        Ok(self
            .fillers
            .remove(id)
            .ok_or_else(|| EntityError::NotFound("filler".into()))?)
    }

    // --- Crosswalk operations ---

    /// Returns the crosswalk, or an error if not found.
    ///
    /// # Errors
    ///
    /// Returns an error if the entity is not found in the markup.
    pub fn crosswalk(&self, id: CrosswalkId) -> std::result::Result<&MarkupCrosswalk, EntityError> {
        self.crosswalks
            .get(id)
            .ok_or_else(|| EntityError::NotFound("crosswalk".into()))
    }

    /// Returns a mutable reference to the crosswalk, or an error if not found.
    ///
    /// A changed total width takes effect on the next [`Markup::update`].
    ///
    /// # Errors
    ///
    /// Returns an error if the entity is not found in the markup.
    pub fn crosswalk_mut(
        &mut self,
        id: CrosswalkId,
    ) -> std::result::Result<&mut MarkupCrosswalk, EntityError> {
        self.crosswalks
            .get_mut(id)
            .ok_or_else(|| EntityError::NotFound("crosswalk".into()))
    }

    pub fn crosswalks(&self) -> impl Iterator<Item = (CrosswalkId, &MarkupCrosswalk)> {
        self.crosswalks.iter()
    }

    /// Adds a crosswalk along the enter of `a` and `b`, optionally bounded
    /// by regular lines on its right and left.
    ///
    /// # Errors
    ///
    /// Fails when the points are not two distinct points of one enter,
    /// already carry a crosswalk, or a border is unknown or a stop line.
    pub fn add_crosswalk(
        &mut self,
        a: PointId,
        b: PointId,
        style: CrosswalkStyle,
        right_border: Option<LineId>,
        left_border: Option<LineId>,
    ) -> Result<CrosswalkId> {
        let (pa, pb) = (self.point(a)?, self.point(b)?);
        if a == b || pa.enter != pb.enter {
            return Err(EntityError::InvalidLine(
                "a crosswalk needs two points of one enter".into(),
            )
            .into());
        }
        if self
            .crosswalks
            .values()
            .any(|c| (c.from == a && c.to == b) || (c.from == b && c.to == a))
        {
            return Err(EntityError::InvalidLine("points already carry a crosswalk".into()).into());
        }
        for border in [right_border, left_border].into_iter().flatten() {
            if self.line(border)?.kind() == LineKind::Stop {
                return Err(EntityError::InvalidLine("a stop line cannot border a crosswalk".into()).into());
            }
        }
        let (from, to) = if line::is_stop_order(pa, pb) { (a, b) } else { (b, a) };
        let geometry = self.crosswalk_geometry(from, to, &style, right_border, left_border)?;
        let id = self.crosswalks.insert(MarkupCrosswalk::new(
            from,
            to,
            right_border,
            left_border,
            style,
            geometry,
        ));
        debug!(?id, "crosswalk added");
        Ok(id)
    }

    /// Replaces the borders of a crosswalk.
    ///
    /// # Errors
    ///
    /// Fails for unknown crosswalks or lines, or stop line borders.
    pub fn set_crosswalk_borders(
        &mut self,
        id: CrosswalkId,
        right_border: Option<LineId>,
        left_border: Option<LineId>,
    ) -> Result<()> {
        self.crosswalk(id)?;
        for border in [right_border, left_border].into_iter().flatten() {
            if self.line(border)?.kind() == LineKind::Stop {
                return Err(EntityError::InvalidLine("a stop line cannot border a crosswalk".into()).into());
            }
        }
        let crosswalk = &mut self.crosswalks[id];
        crosswalk.right_border = right_border;
        crosswalk.left_border = left_border;
        self.rebuild_crosswalk(id);
        Ok(())
    }

    /// # Errors
    ///
    /// Returns an error if the crosswalk is not found.
    pub fn remove_crosswalk(&mut self, id: CrosswalkId) -> Result<MarkupCrosswalk> {
        Ok(self
            .crosswalks
            .remove(id)
            .ok_or_else(|| EntityError::NotFound("crosswalk".into()))?)
    }

    fn crosswalk_geometry(
        &self,
        from: PointId,
        to: PointId,
        style: &CrosswalkStyle,
        right_border: Option<LineId>,
        left_border: Option<LineId>,
    ) -> std::result::Result<crate::style::crosswalk::CrosswalkGeometry, EntityError> {
        let (start, end) = (self.point(from)?, self.point(to)?);
        let corner_dir = self.enters[start.enter].data.corner_dir;
        let border = |line: Option<LineId>| -> std::result::Result<_, EntityError> {
            line.map(|id| -> std::result::Result<_, EntityError> {
                let line = self.line(id)?;
                Ok(crosswalk::border_line(
                    line,
                    start.enter,
                    self.point(line.from())?,
                    self.point(line.to())?,
                ))
            })
            .transpose()
        };
        let (right, left) = (border(right_border)?, border(left_border)?);
        Ok(crosswalk::crosswalk_geometry(
            start,
            end,
            &corner_dir,
            style.total_width(),
            right.as_ref(),
            left.as_ref(),
        ))
    }

    fn rebuild_crosswalk(&mut self, id: CrosswalkId) {
        let Some(c) = self.crosswalks.get(id) else {
            return;
        };
        match self.crosswalk_geometry(c.from, c.to, &c.style, c.right_border, c.left_border) {
            Ok(geometry) => {
                let crosswalk = &mut self.crosswalks[id];
                crosswalk.geometry = geometry;
                crosswalk.dirty.set(true);
            }
            Err(error) => debug!(?id, %error, "crosswalk geometry not rebuilt"),
        }
    }

    // --- Recalculation ---

    /// Moves an enter. Points are re-laid along the new edge; points
    /// beyond a reduced point count are removed with everything built on
    /// them. Every entity is recalculated on the next update.
    ///
    /// # Errors
    ///
    /// Fails for an unknown enter index or invalid enter data.
    pub fn update_enter(&mut self, index: usize, data: EnterData) -> Result<()> {
        validate_enter(&data)?;
        let Some(enter) = self.enters.get(index) else {
            return Err(EntityError::NotFound("enter".into()).into());
        };
        if self
            .enters
            .iter()
            .enumerate()
            .any(|(i, e)| i != index && e.data.id == data.id)
        {
            return Err(GeometryError::Degenerate(format!("duplicate enter id {}", data.id)).into());
        }

        let removed: Vec<PointId> = enter.points.iter().skip(usize::from(data.point_count)).copied().collect();
        for point in removed {
            self.remove_point(point);
        }
        let enter = &mut self.enters[index];
        enter.points.truncate(usize::from(data.point_count));
        for (point, num) in enter.points.iter().zip(1..) {
            self.points[*point] = make_point(index, num, &data);
        }
        for num in (enter.points.len() + 1)..=usize::from(data.point_count) {
            #[allow(clippy::cast_possible_truncation)]
            let point = self.points.insert(make_point(index, num as u8, &data));
            enter.points.push(point);
        }
        enter.data = data;

        self.update_outline();
        self.refresh_geometry();
        Ok(())
    }

    fn remove_point(&mut self, point: PointId) {
        let lines: Vec<LineId> = self.lines_of(point).map(|(id, _)| id).collect();
        for line in lines {
            let _ = self.remove_line(line);
        }
        let vertex = FillerVertex::Enter(point);
        self.fillers.retain(|_, f| !f.contour().contains(&vertex));
        self.crosswalks.retain(|_, c| c.from != point && c.to != point);
        self.points.remove(point);
    }

    fn update_outline(&mut self) {
        let count = self.enters.len();
        self.position = if count == 0 {
            Point3::origin()
        } else {
            #[allow(clippy::cast_precision_loss)]
            let n = count as f64;
            Point3::from(self.enters.iter().map(|e| e.data.position.coords).sum::<Vector3>() / n)
        };

        self.contour.clear();
        if count < 2 {
            return;
        }
        for i in 0..count {
            let next = (i + 1) % count;
            let (Some(&last), Some(&first)) =
                (self.enters[i].points.last(), self.enters[next].points.first())
            else {
                continue;
            };
            let (a, b) = (&self.points[last], &self.points[first]);
            self.contour.push(Trajectory::Bezier(BezierTrajectory::from_directions(
                a.position,
                &a.direction,
                b.position,
                &b.direction,
                true,
                true,
            )));
        }
    }

    /// Recomputes line trajectories and crosswalk geometry after points moved.
    fn refresh_geometry(&mut self) {
        let keys: Vec<LineId> = self.lines.keys().collect();
        for id in keys {
            let line = &self.lines[id];
            let (Ok(from), Ok(to)) = (self.point(line.from), self.point(line.to)) else {
                continue;
            };
            let trajectory = line::line_trajectory(from, to, line.kind);
            let line = &mut self.lines[id];
            line.trajectory = trajectory;
            line.dirty.set(true);
        }
        let keys: Vec<CrosswalkId> = self.crosswalks.keys().collect();
        for id in keys {
            self.rebuild_crosswalk(id);
        }
        for filler in self.fillers.values() {
            filler.dirty.set(true);
        }
    }

    /// Recalculates every entity whose style or geometry changed since the
    /// last update. Returns how many entities were recalculated.
    pub fn update(&mut self) -> usize {
        let mut count = 0;

        let context = LineContext {
            position: self.position,
            contour: &self.contour,
        };
        for line in self.lines.values_mut().filter(|l| l.is_dirty()) {
            line.recalculate(&context, &self.config);
            count += 1;
        }

        let dirty: Vec<CrosswalkId> = self
            .crosswalks
            .iter()
            .filter(|(_, c)| c.is_dirty())
            .map(|(id, _)| id)
            .collect();
        for id in dirty {
            self.rebuild_crosswalk(id);
            self.crosswalks[id].recalculate(&self.config);
            count += 1;
        }

        let dirty: Vec<FillerId> = self
            .fillers
            .iter()
            .filter(|(_, f)| f.is_dirty())
            .map(|(id, _)| id)
            .collect();
        for id in dirty {
            match self.fillers[id].contour().parts(self) {
                Ok(parts) => {
                    let config = self.config;
                    self.fillers[id].recalculate(&parts, &config);
                }
                Err(error) => {
                    debug!(?id, %error, "filler contour no longer resolves");
                    self.fillers[id].clear();
                }
            }
            count += 1;
        }

        if count > 0 {
            debug!(count, "markup recalculated");
        }
        count
    }

    /// Flags every entity and recalculates them all.
    pub fn recalculate_all(&mut self) -> usize {
        for line in self.lines.values() {
            line.dirty.set(true);
        }
        for crosswalk in self.crosswalks.values() {
            crosswalk.dirty.set(true);
        }
        for filler in self.fillers.values() {
            filler.dirty.set(true);
        }
        self.update()
    }

    /// Removes every line, filler and crosswalk. Enters and points stay.
    pub fn clear(&mut self) {
        self.lines.clear();
        self.fillers.clear();
        self.crosswalks.clear();
    }
}

fn validate_enter(data: &EnterData) -> std::result::Result<(), GeometryError> {
    if data.point_count == 0 {
        return Err(GeometryError::Degenerate(format!("enter {} has no points", data.id)));
    }
    if flat_length(&data.normal_dir) < TOLERANCE || flat_length(&data.corner_dir) < TOLERANCE {
        return Err(GeometryError::ZeroVector);
    }
    if data.width < -EPSILON {
        return Err(GeometryError::Degenerate(format!("enter {} has a negative width", data.id)));
    }
    Ok(())
}

fn make_point(enter: usize, num: u8, data: &EnterData) -> MarkupPoint {
    MarkupPoint {
        enter,
        num,
        count: data.point_count,
        position: data.point_position(num),
        direction: flat_normalize(&data.normal_dir),
        id: MarkupPoint::persistent_id(data.id, num),
    }
}

fn check_line_family(kind: LineKind, style: &Style) -> std::result::Result<(), EntityError> {
    let expected = match kind {
        LineKind::Regular => StyleFamily::RegularLine,
        LineKind::Stop => StyleFamily::StopLine,
    };
    if style.family() == expected {
        Ok(())
    } else {
        Err(EntityError::InvalidLine(format!(
            "{} style on a {} line",
            style.family().name(),
            expected.name()
        )))
    }
}


#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::test_support::{four_way, four_way_enters, point};
    use super::*;
    use crate::config::MarkupLod;
    use crate::error::MarkupError;
    use crate::geometry::ParametricCurve;
    use crate::style::{HasWidth, StyleRegistry, StyleType};

    #[test]
    fn points_are_laid_along_the_corner_direction() {
        let markup = four_way(3);
        let east: Vec<Point3> = markup
            .enter_points(0)
            .iter()
            .map(|&p| markup.point(p).unwrap().position)
            .collect();
        assert_abs_diff_eq!(east[0], Point3::new(5.0, -4.0, 0.0), epsilon = 1e-9);
        assert_abs_diff_eq!(east[1], Point3::new(5.0, 0.0, 0.0), epsilon = 1e-9);
        assert_abs_diff_eq!(east[2], Point3::new(5.0, 4.0, 0.0), epsilon = 1e-9);

        let single = EnterData {
            point_count: 1,
            ..four_way_enters(1)[0].clone()
        };
        assert_abs_diff_eq!(single.point_position(1), single.position, epsilon = 1e-12);
    }

    #[test]
    fn outline_joins_consecutive_enters() {
        let markup = four_way(3);
        assert_eq!(markup.contour().len(), 4);
        assert_abs_diff_eq!(markup.position(), Point3::origin(), epsilon = 1e-12);
        let corner = &markup.contour()[0];
        assert_abs_diff_eq!(corner.start_position(), Point3::new(5.0, 4.0, 0.0), epsilon = 1e-9);
        assert_abs_diff_eq!(corner.end_position(), Point3::new(4.0, 5.0, 0.0), epsilon = 1e-9);
    }

    #[test]
    fn adjacent_edge_points() {
        let markup = four_way(3);
        assert_eq!(markup.adjacent_enter_point(point(&markup, 0, 3)), Some(point(&markup, 1, 1)));
        assert_eq!(markup.adjacent_enter_point(point(&markup, 0, 1)), Some(point(&markup, 3, 3)));
        assert_eq!(markup.adjacent_enter_point(point(&markup, 0, 2)), None);
    }

    #[test]
    fn invalid_enters_are_rejected() {
        let mut enters = four_way_enters(2);
        enters[1].point_count = 0;
        assert!(Markup::new(enters, MarkupConfig::default()).is_err());

        let mut enters = four_way_enters(2);
        enters[1].id = enters[0].id;
        assert!(Markup::new(enters, MarkupConfig::default()).is_err());
    }

    #[test]
    fn point_lookup_by_persistent_id() {
        let markup = four_way(2);
        let id = MarkupPoint::persistent_id(3, 2);
        let found = markup.point_by_id(id).unwrap();
        assert_eq!(found, point(&markup, 2, 2));
        assert!(markup.point_by_id(MarkupPoint::persistent_id(9, 1)).is_none());
    }

    #[test]
    fn line_kinds_follow_enters() {
        let registry = StyleRegistry::default();
        let mut markup = four_way(3);
        let (a, b, c) = (point(&markup, 0, 1), point(&markup, 0, 3), point(&markup, 2, 2));

        let regular = markup
            .add_line(a, c, registry.default_style(StyleType::LineSolid))
            .unwrap();
        assert_eq!(markup.line(regular).unwrap().kind(), LineKind::Regular);

        let wrong = markup.add_line(a, b, registry.default_style(StyleType::LineSolid));
        assert!(matches!(wrong, Err(MarkupError::Entity(EntityError::InvalidLine(_)))));

        let stop = markup
            .add_line(a, b, registry.default_style(StyleType::StopLineSolid))
            .unwrap();
        let stop = markup.line(stop).unwrap();
        assert_eq!(stop.kind(), LineKind::Stop);
        // Ordered from the higher numbered point.
        assert_eq!((stop.from(), stop.to()), (b, a));

        let duplicate = markup.add_line(c, a, registry.default_style(StyleType::LineDashed));
        assert!(duplicate.is_err());
        assert!(markup.add_line(a, a, registry.default_style(StyleType::LineSolid)).is_err());
    }

    #[test]
    fn update_recalculates_only_dirty_entities() {
        let registry = StyleRegistry::default();
        let mut markup = four_way(2);
        let west = point(&markup, 2, 1);
        let east = point(&markup, 0, 2);
        let id = markup
            .add_line(east, west, registry.default_style(StyleType::LineSolid))
            .unwrap();

        assert_eq!(markup.update(), 1);
        assert_eq!(markup.update(), 0);
        let before = markup.line(id).unwrap().data(MarkupLod::Lod0).unwrap().clone();
        assert!(!before.dashes().is_empty());

        markup
            .line_mut(id)
            .unwrap()
            .style_mut()
            .capabilities_mut()
            .as_width_mut()
            .unwrap()
            .set_width(0.4);
        assert!(markup.line(id).unwrap().is_dirty());
        assert_eq!(markup.update(), 1);
        let after = markup.line(id).unwrap().data(MarkupLod::Lod0).unwrap();
        assert!(after.dashes().iter().all(|d| (d.width - 0.4).abs() < 1e-12));
        assert!(markup.line(id).unwrap().data(MarkupLod::Lod1).is_some());
    }

    #[test]
    fn straight_line_crosses_the_junction() {
        let registry = StyleRegistry::default();
        let mut markup = four_way(3);
        let id = markup
            .add_line(
                point(&markup, 0, 2),
                point(&markup, 2, 2),
                registry.default_style(StyleType::LineSolid),
            )
            .unwrap();
        let line = markup.line(id).unwrap();
        assert_abs_diff_eq!(line.trajectory().length(), 10.0, epsilon = 1e-6);
    }

    #[test]
    fn crossing_lines_make_vertices() {
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

        let (t, u) = markup.crossing(horizontal, vertical).unwrap();
        assert_abs_diff_eq!(t, 0.5, epsilon = 1e-6);
        assert_abs_diff_eq!(u, 0.5, epsilon = 1e-6);

        let along = markup.line_vertices(horizontal);
        assert_eq!(along.len(), 3);
        assert_eq!(along[1].1, FillerVertex::Intersect(LinePair::new(horizontal, vertical)));
        assert_eq!(markup.filler_vertices().len(), 12 + 1);

        let pos = along[1].1.position(&markup).unwrap();
        assert_abs_diff_eq!(pos, Point3::origin(), epsilon = 1e-6);
    }

    #[test]
    fn lines_sharing_an_end_do_not_cross() {
        let registry = StyleRegistry::default();
        let mut markup = four_way(3);
        let shared = point(&markup, 1, 2);
        let a = markup
            .add_line(point(&markup, 0, 1), shared, registry.default_style(StyleType::LineSolid))
            .unwrap();
        let b = markup
            .add_line(point(&markup, 2, 3), shared, registry.default_style(StyleType::LineSolid))
            .unwrap();
        assert!(markup.crossing(a, b).is_none());
    }

    #[test]
    fn crosswalk_follows_style_width() {
        let registry = StyleRegistry::default();
        let mut markup = four_way(3);
        let style = registry.crosswalk_style(StyleType::CrosswalkZebra).unwrap();
        let width = style.total_width();
        let id = markup
            .add_crosswalk(point(&markup, 0, 1), point(&markup, 0, 3), style, None, None)
            .unwrap();
        let crosswalk = markup.crosswalk(id).unwrap();
        let far = crosswalk.geometry().crosswalk_line().start_position();
        assert_abs_diff_eq!(far.x, 5.0 - width, epsilon = 1e-9);

        markup.update();
        assert!(!markup.crosswalk(id).unwrap().data(MarkupLod::Lod0).unwrap().dashes().is_empty());

        let same_enter = markup.add_crosswalk(
            point(&markup, 0, 1),
            point(&markup, 1, 1),
            registry.crosswalk_style(StyleType::CrosswalkZebra).unwrap(),
            None,
            None,
        );
        assert!(same_enter.is_err());
    }

    #[test]
    fn removing_a_border_line_clears_the_border() {
        let registry = StyleRegistry::default();
        let mut markup = four_way(3);
        let border = markup
            .add_line(
                point(&markup, 0, 3),
                point(&markup, 2, 1),
                registry.default_style(StyleType::LineSolid),
            )
            .unwrap();
        let id = markup
            .add_crosswalk(
                point(&markup, 0, 1),
                point(&markup, 0, 3),
                registry.crosswalk_style(StyleType::CrosswalkSolid).unwrap(),
                Some(border),
                None,
            )
            .unwrap();
        markup.remove_line(border).unwrap();
        assert_eq!(markup.crosswalk(id).unwrap().right_border(), None);
        assert!(markup.line(border).is_err());
    }

    #[test]
    fn moving_an_enter_updates_lines() {
        let registry = StyleRegistry::default();
        let mut markup = four_way(3);
        let id = markup
            .add_line(
                point(&markup, 0, 2),
                point(&markup, 2, 2),
                registry.default_style(StyleType::LineSolid),
            )
            .unwrap();
        markup.update();

        let mut east = markup.enter(0).unwrap().clone();
        east.position = Point3::new(7.0, 0.0, 0.0);
        markup.update_enter(0, east).unwrap();
        assert!(markup.line(id).unwrap().is_dirty());
        assert_abs_diff_eq!(markup.line(id).unwrap().trajectory().length(), 12.0, epsilon = 1e-6);
        assert_eq!(markup.update(), 1);
    }

    #[test]
    fn shrinking_an_enter_removes_its_lines() {
        let registry = StyleRegistry::default();
        let mut markup = four_way(3);
        let id = markup
            .add_line(
                point(&markup, 0, 3),
                point(&markup, 2, 2),
                registry.default_style(StyleType::LineSolid),
            )
            .unwrap();
        let mut east = markup.enter(0).unwrap().clone();
        east.point_count = 2;
        markup.update_enter(0, east).unwrap();
        assert!(markup.line(id).is_err());
        assert_eq!(markup.enter_points(0).len(), 2);
        assert_eq!(markup.points().count(), 11);
    }
}
