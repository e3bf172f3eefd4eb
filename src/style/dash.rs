use crate::config::MarkupLod;
use crate::math::polygon_2d::Rect;
use crate::math::vector_2d::{absolute_angle, flat_length};
use crate::math::{Point2, Point3, TOLERANCE};

use super::Color32;

/// Render material of a primitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MaterialType {
    RectangleLines,
    RectangleFillers,
    Triangle,
    Pavement,
    Grass,
}

/// One drawable decal: a rectangle (or triangle) centred on `position`
/// and rotated by `angle` around the vertical axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MarkupStyleDash {
    pub position: Point3,
    /// Absolute angle of the length axis.
    pub angle: f64,
    pub length: f64,
    pub width: f64,
    pub color: Color32,
    pub material: MaterialType,
}

impl MarkupStyleDash {
    #[must_use]
    pub fn new(
        position: Point3,
        angle: f64,
        length: f64,
        width: f64,
        color: Color32,
        material: MaterialType,
    ) -> Self {
        Self {
            position,
            angle,
            length,
            width,
            color,
            material,
        }
    }

    /// Dash spanning `start` to `end`.
    #[must_use]
    pub fn from_ends(
        start: Point3,
        end: Point3,
        width: f64,
        color: Color32,
        material: MaterialType,
    ) -> Self {
        let delta = end - start;
        let length = flat_length(&delta);
        let angle = if length < TOLERANCE {
            0.0
        } else {
            absolute_angle(&delta)
        };
        Self::new(
            Point3::from((start.coords + end.coords) / 2.0),
            angle,
            length,
            width,
            color,
            material,
        )
    }

    /// End points of the length axis.
    #[must_use]
    pub fn ends(&self) -> (Point3, Point3) {
        let half = crate::math::vector_2d::direction(self.angle) * (self.length / 2.0);
        (self.position - half, self.position + half)
    }
}

/// A textured surface produced by the mesh fillers.
///
/// `vertices` are relative to `position`; the top face sits at
/// `elevation` and side walls drop to zero.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkupStyleMesh {
    pub position: Point3,
    pub vertices: Vec<Point3>,
    pub triangles: Vec<[u32; 3]>,
    pub uvs: Vec<Point2>,
    pub rect: Rect,
    pub elevation: f64,
    pub material: MaterialType,
}

/// Output of one style calculation.
#[derive(Debug, Clone, PartialEq)]
pub enum StyleData {
    Dashes(Vec<MarkupStyleDash>),
    Mesh(MarkupStyleMesh),
    Empty,
}

impl StyleData {
    #[must_use]
    pub fn dashes(&self) -> &[MarkupStyleDash] {
        match self {
            StyleData::Dashes(dashes) => dashes,
            StyleData::Mesh(_) | StyleData::Empty => &[],
        }
    }

    #[must_use]
    pub fn mesh(&self) -> Option<&MarkupStyleMesh> {
        match self {
            StyleData::Mesh(mesh) => Some(mesh),
            StyleData::Dashes(_) | StyleData::Empty => None,
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            StyleData::Dashes(dashes) => dashes.is_empty(),
            StyleData::Mesh(mesh) => mesh.triangles.is_empty(),
            StyleData::Empty => true,
        }
    }
}

impl From<Vec<MarkupStyleDash>> for StyleData {
    fn from(value: Vec<MarkupStyleDash>) -> Self {
        StyleData::Dashes(value)
    }
}

/// Per-LOD slots, overwritten on every recalculation.
#[derive(Debug, Clone, PartialEq)]
pub struct LodCache<T> {
    slots: [Option<T>; 2],
}

impl<T> LodCache<T> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            slots: [None, None],
        }
    }

    #[must_use]
    pub fn get(&self, lod: MarkupLod) -> Option<&T> {
        self.slots[lod.index()].as_ref()
    }

    pub fn set(&mut self, lod: MarkupLod, value: T) {
        self.slots[lod.index()] = Some(value);
    }

    pub fn clear(&mut self) {
        self.slots = [None, None];
    }

    /// True when every LOD holds data.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.slots.iter().all(Option::is_some)
    }
}

impl<T> Default for LodCache<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::f64::consts::FRAC_PI_2;

    use approx::assert_abs_diff_eq;

    use super::*;

    #[test]
    fn dash_from_ends() {
        let dash = MarkupStyleDash::from_ends(
            Point3::new(1.0, 1.0, 0.0),
            Point3::new(1.0, 5.0, 0.0),
            0.2,
            Color32::DEFAULT,
            MaterialType::RectangleLines,
        );
        assert_abs_diff_eq!(dash.position, Point3::new(1.0, 3.0, 0.0), epsilon = 1e-12);
        assert_abs_diff_eq!(dash.angle, FRAC_PI_2, epsilon = 1e-12);
        assert_abs_diff_eq!(dash.length, 4.0, epsilon = 1e-12);

        let (start, end) = dash.ends();
        assert_abs_diff_eq!(start, Point3::new(1.0, 1.0, 0.0), epsilon = 1e-12);
        assert_abs_diff_eq!(end, Point3::new(1.0, 5.0, 0.0), epsilon = 1e-12);
    }

    #[test]
    fn lod_cache_slots_are_independent() {
        let mut cache = LodCache::new();
        cache.set(MarkupLod::Lod1, StyleData::Empty);
        assert!(cache.get(MarkupLod::Lod0).is_none());
        assert!(!cache.is_complete());
        cache.set(MarkupLod::Lod0, StyleData::Dashes(Vec::new()));
        assert!(cache.is_complete());
        cache.clear();
        assert!(cache.get(MarkupLod::Lod1).is_none());
    }
}
