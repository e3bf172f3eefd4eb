/// Level of detail at which style data is cached and recomputed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MarkupLod {
    /// Close-up rendering.
    Lod0,
    /// Distant rendering.
    Lod1,
}

impl MarkupLod {
    /// All levels in recomputation order.
    pub const ALL: [MarkupLod; 2] = [MarkupLod::Lod0, MarkupLod::Lod1];

    #[must_use]
    pub fn index(self) -> usize {
        match self {
            MarkupLod::Lod0 => 0,
            MarkupLod::Lod1 => 1,
        }
    }
}

/// Numeric parameters shared by every style calculation.
#[derive(Debug, Clone, Copy)]
pub struct MarkupConfig {
    /// Longest single solid dash; longer solid runs are chunked.
    pub max_solid_length: f64,
    /// Chunks shorter than this are never split again.
    pub min_solid_length: f64,
    /// Max tangent deviation (radians) of one solid chunk, per LOD.
    pub lod_angle_tolerance: [f64; 2],
    /// A trailing partial dash is kept only if at least this fraction of the dash length.
    pub min_partial_dash_ratio: f64,
    /// Width compensation used when two lines are nearly parallel.
    pub parallel_fallback_offset: f64,
    /// Crosswalk dashes shorter than this fraction of their length...
    pub crosswalk_min_length_ratio: f64,
    /// ...and narrower than this fraction of their width are dropped.
    pub crosswalk_min_width_ratio: f64,
    /// Passes used to balance leading and trailing chevron space.
    pub chevron_balance_iterations: usize,
    /// Relative space difference at which chevron balancing stops.
    pub chevron_balance_threshold: f64,
}

impl MarkupConfig {
    /// Returns the solid chunk angle tolerance for a LOD.
    #[must_use]
    pub fn angle_tolerance(&self, lod: MarkupLod) -> f64 {
        self.lod_angle_tolerance[lod.index()]
    }
}

impl Default for MarkupConfig {
    fn default() -> Self {
        Self {
            max_solid_length: 10.0,
            min_solid_length: 0.1,
            lod_angle_tolerance: [5f64.to_radians(), 15f64.to_radians()],
            min_partial_dash_ratio: 0.1,
            parallel_fallback_offset: 1000.0,
            crosswalk_min_length_ratio: 0.9,
            crosswalk_min_width_ratio: 0.67,
            chevron_balance_iterations: 3,
            chevron_balance_threshold: 0.05,
        }
    }
}
