//! Raised surfaces (pavement, grass) built from a constrained Delaunay
//! triangulation of the flattened contour.

use std::collections::{HashMap, HashSet, VecDeque};

use spade::handles::{FixedFaceHandle, InnerTag};
use spade::{ConstrainedDelaunayTriangulation, InsertionError, Point2 as SpadePoint2, Triangulation};
use tracing::debug;

use crate::config::{MarkupConfig, MarkupLod};
use crate::error::GeometryError;
use crate::geometry::{ParametricCurve, Trajectory};
use crate::math::polygon_2d::Rect;
use crate::math::vector_2d::flat_distance;
use crate::math::{Point2, Point3, EPSILON};
use crate::style::helper::split_smooth;
use crate::style::{MarkupStyleMesh, MaterialType, StyleData};

type Cdt = ConstrainedDelaunayTriangulation<SpadePoint2<f64>>;

pub(super) fn calculate(
    contour: &[Trajectory],
    elevation: f64,
    material: MaterialType,
    lod: MarkupLod,
    config: &MarkupConfig,
) -> StyleData {
    let points = flatten(contour, lod, config);
    let triangles = match triangulate_contour(&points) {
        Ok(triangles) if !triangles.is_empty() => triangles,
        Ok(_) => return StyleData::Empty,
        Err(err) => {
            debug!(%err, "mesh filler skipped");
            return StyleData::Empty;
        }
    };

    let rect = Rect::from_points(&points);
    let position = rect.center();
    let count = points.len();
    let index = |i: usize| u32::try_from(i).unwrap_or(u32::MAX);

    let mut vertices = Vec::with_capacity(count * 3);
    let mut uvs = Vec::with_capacity(count * 3);
    let uv = |p: &Point3| {
        Point2::new(
            (p.x - rect.min_x) / rect.width().max(EPSILON),
            (p.y - rect.min_y) / rect.height().max(EPSILON),
        )
    };

    // Top face.
    for p in &points {
        vertices.push(Point3::new(p.x - position.x, p.y - position.y, elevation));
        uvs.push(uv(p));
    }
    let mut faces: Vec<[u32; 3]> = triangles
        .iter()
        .map(|[a, b, c]| [index(*a), index(*b), index(*c)])
        .collect();

    // Side walls down to the road surface, one quad per contour edge.
    let mut walked = 0.0;
    for i in 0..count {
        let a = &points[i];
        let b = &points[(i + 1) % count];
        let base = index(vertices.len());
        let length = flat_distance(a, b);
        for (p, u, z) in [
            (a, walked, elevation),
            (b, walked + length, elevation),
            (a, walked, 0.0),
            (b, walked + length, 0.0),
        ] {
            vertices.push(Point3::new(p.x - position.x, p.y - position.y, z));
            uvs.push(Point2::new(u, z));
        }
        faces.push([base, base + 2, base + 1]);
        faces.push([base + 1, base + 2, base + 3]);
        walked += length;
    }

    StyleData::Mesh(MarkupStyleMesh {
        position,
        vertices,
        triangles: faces,
        uvs,
        rect,
        elevation,
        material,
    })
}

/// Contour as a closed point loop without repeated points.
fn flatten(contour: &[Trajectory], lod: MarkupLod, config: &MarkupConfig) -> Vec<Point3> {
    let mut points: Vec<Point3> = Vec::new();
    for side in contour {
        if side.is_straight() {
            points.push(side.start_position());
        } else {
            points.extend(split_smooth(side, lod, config).iter().map(ParametricCurve::start_position));
        }
    }
    points.dedup_by(|b, a| flat_distance(a, b) < EPSILON);
    while points.len() > 1
        && points
            .first()
            .zip(points.last())
            .is_some_and(|(first, last)| flat_distance(first, last) < EPSILON)
    {
        points.pop();
    }
    points
}

/// Triangulates a simple closed polygon.
///
/// Returns triangles as indices into `points`. Points are in order, the
/// loop is closed implicitly.
///
/// # Errors
///
/// Returns [`GeometryError::Degenerate`] for fewer than three points or
/// points the triangulation cannot accept.
pub fn triangulate_contour(points: &[Point3]) -> Result<Vec<[usize; 3]>, GeometryError> {
    if points.len() < 3 {
        return Err(GeometryError::Degenerate(
            "contour needs at least 3 points".into(),
        ));
    }

    let mut cdt = Cdt::new();
    let mut vertex_to_point: HashMap<usize, usize> = HashMap::new();
    let mut handles = Vec::with_capacity(points.len());
    for (i, p) in points.iter().enumerate() {
        let handle = cdt
            .insert(SpadePoint2::new(p.x, p.y))
            .map_err(|e: InsertionError| GeometryError::Degenerate(format!("CDT insert: {e}")))?;
        vertex_to_point.entry(handle.index()).or_insert(i);
        handles.push(handle);
    }

    for i in 0..handles.len() {
        let from = handles[i];
        let to = handles[(i + 1) % handles.len()];
        if from == to {
            continue;
        }
        if cdt.can_add_constraint(from, to) {
            cdt.add_constraint(from, to);
        } else {
            debug!(from = i, "self-intersecting contour edge skipped");
        }
    }

    let interior = classify_interior_faces(&cdt);
    let mut triangles = Vec::new();
    for face in cdt.inner_faces() {
        if !interior.contains(&face.fix().index()) {
            continue;
        }
        let mut triangle = [0usize; 3];
        for (slot, vertex) in triangle.iter_mut().zip(face.vertices()) {
            let Some(&point) = vertex_to_point.get(&vertex.fix().index()) else {
                return Err(GeometryError::Degenerate("unknown CDT vertex".into()));
            };
            *slot = point;
        }
        triangles.push(triangle);
    }
    Ok(triangles)
}

/// Flood fill from the outer face; crossing a constraint toggles inside.
fn classify_interior_faces(cdt: &Cdt) -> HashSet<usize> {
    let mut interior = HashSet::new();
    let mut depth_map: HashMap<usize, u32> = HashMap::new();
    let mut queue: VecDeque<(FixedFaceHandle<InnerTag>, u32)> = VecDeque::new();

    let outer = cdt.outer_face().fix();
    for edge in cdt.directed_edges() {
        if edge.face().fix() != outer {
            continue;
        }
        if let Some(inner) = edge.rev().face().as_inner() {
            let index = inner.fix().index();
            if depth_map.contains_key(&index) {
                continue;
            }
            let depth = u32::from(cdt.is_constraint_edge(edge.as_undirected().fix()));
            depth_map.insert(index, depth);
            if depth % 2 == 1 {
                interior.insert(index);
            }
            queue.push_back((inner.fix(), depth));
        }
    }

    while let Some((face, depth)) = queue.pop_front() {
        for edge in cdt.face(face).adjacent_edges() {
            let Some(neighbor) = edge.rev().face().as_inner() else {
                continue;
            };
            let index = neighbor.fix().index();
            if depth_map.contains_key(&index) {
                continue;
            }
            let next = depth + u32::from(cdt.is_constraint_edge(edge.as_undirected().fix()));
            depth_map.insert(index, next);
            if next % 2 == 1 {
                interior.insert(index);
            }
            queue.push_back((neighbor.fix(), next));
        }
    }
    interior
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::super::tests::rectangle;
    use super::*;
    use crate::math::polygon_2d::signed_area_2d;

    fn p(x: f64, y: f64) -> Point3 {
        Point3::new(x, y, 0.0)
    }

    fn area(points: &[Point3], triangles: &[[usize; 3]]) -> f64 {
        triangles
            .iter()
            .map(|t| signed_area_2d(&[points[t[0]], points[t[1]], points[t[2]]]).abs())
            .sum()
    }

    #[test]
    fn square_is_two_triangles() {
        let points = [p(0.0, 0.0), p(2.0, 0.0), p(2.0, 2.0), p(0.0, 2.0)];
        let triangles = triangulate_contour(&points).unwrap();
        assert_eq!(triangles.len(), 2);
        assert_abs_diff_eq!(area(&points, &triangles), 4.0, epsilon = 1e-9);
    }

    #[test]
    fn concave_contour_keeps_notch_open() {
        let points = [
            p(0.0, 0.0),
            p(4.0, 0.0),
            p(4.0, 4.0),
            p(2.0, 1.0),
            p(0.0, 4.0),
        ];
        let triangles = triangulate_contour(&points).unwrap();
        let expected = signed_area_2d(&points).abs();
        assert_abs_diff_eq!(area(&points, &triangles), expected, epsilon = 1e-9);
    }

    #[test]
    fn too_few_points_is_degenerate() {
        let err = triangulate_contour(&[p(0.0, 0.0), p(1.0, 0.0)]).unwrap_err();
        assert!(matches!(err, GeometryError::Degenerate(_)));
    }

    #[test]
    fn mesh_is_relative_to_center_with_walls() {
        let data = calculate(
            &rectangle(4.0, 2.0),
            0.3,
            MaterialType::Pavement,
            MarkupLod::Lod0,
            &MarkupConfig::default(),
        );
        let mesh = data.mesh().unwrap();
        assert_abs_diff_eq!(mesh.position, p(2.0, 1.0), epsilon = 1e-12);
        // 4 top vertices and 4 walls of 4 vertices each.
        assert_eq!(mesh.vertices.len(), 20);
        assert_eq!(mesh.triangles.len(), 2 + 8);
        assert_eq!(mesh.uvs.len(), mesh.vertices.len());
        assert!(mesh.vertices[..4].iter().all(|v| (v.z - 0.3).abs() < 1e-12));
        assert!(mesh.vertices[..4].iter().all(|v| v.x.abs() <= 2.0 && v.y.abs() <= 1.0));
    }

    #[test]
    fn curved_sides_are_sampled() {
        let contour = vec![
            Trajectory::straight(p(0.0, 0.0), p(6.0, 0.0)),
            Trajectory::bezier(p(6.0, 0.0), p(8.0, 2.0), p(8.0, 4.0), p(6.0, 6.0)),
            Trajectory::straight(p(6.0, 6.0), p(0.0, 6.0)),
            Trajectory::straight(p(0.0, 6.0), p(0.0, 0.0)),
        ];
        let points = flatten(&contour, MarkupLod::Lod0, &MarkupConfig::default());
        assert!(points.len() > 4);
        let data = calculate(&contour, 0.3, MaterialType::Grass, MarkupLod::Lod0, &MarkupConfig::default());
        assert!(!data.is_empty());
    }
}
