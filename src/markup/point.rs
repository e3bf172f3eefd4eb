use crate::math::{Point3, Vector3};

slotmap::new_key_type! {
    /// Unique identifier for a point in a markup.
    pub struct PointId;
}

/// A point on the edge of an enter where lines start and end.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkupPoint {
    /// Index of the owning enter in the markup's cyclic order.
    pub enter: usize,
    /// 1-based number along the enter's corner direction.
    pub num: u8,
    /// Number of points on the owning enter.
    pub count: u8,
    pub position: Point3,
    /// Unit direction into the junction.
    pub direction: Vector3,
    /// Persistent id: enter id in the low 16 bits, `num` above.
    pub id: u32,
}

impl MarkupPoint {
    /// Persistent id for point `num` of the enter with id `enter_id`.
    #[must_use]
    pub fn persistent_id(enter_id: u16, num: u8) -> u32 {
        u32::from(enter_id) + (u32::from(num) << 16)
    }

    #[must_use]
    pub fn is_first(&self) -> bool {
        self.num == 1
    }

    #[must_use]
    pub fn is_last(&self) -> bool {
        self.num == self.count
    }

    /// Points at either side of the enter.
    #[must_use]
    pub fn is_edge(&self) -> bool {
        self.is_first() || self.is_last()
    }
}

/// Order-independent key of two persistent point ids.
#[must_use]
pub fn pair_hash(a: u32, b: u32) -> u64 {
    let (min, max) = if a <= b { (a, b) } else { (b, a) };
    (u64::from(min) << 32) + u64::from(max)
}

/// Splits a [`pair_hash`] back into its two ids, smaller first.
#[must_use]
pub fn split_pair_hash(hash: u64) -> (u32, u32) {
    #[allow(clippy::cast_possible_truncation)]
    let pair = ((hash >> 32) as u32, hash as u32);
    pair
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn persistent_ids() {
        assert_eq!(MarkupPoint::persistent_id(7, 1), 7 + (1 << 16));
        assert_eq!(MarkupPoint::persistent_id(0xffff, 3), 0xffff + (3 << 16));
    }

    #[test]
    fn pair_hash_is_symmetric() {
        let a = MarkupPoint::persistent_id(1, 2);
        let b = MarkupPoint::persistent_id(4, 1);
        assert_eq!(pair_hash(a, b), pair_hash(b, a));
        assert_eq!(split_pair_hash(pair_hash(b, a)), (a.min(b), a.max(b)));
    }
}
