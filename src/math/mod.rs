pub mod intersect_2d;
pub mod polygon_2d;
pub mod roots;
pub mod vector_2d;

/// 2D point type.
pub type Point2 = nalgebra::Point2<f64>;

/// 3D point type. Markings live in the XY plane, `z` is elevation.
pub type Point3 = nalgebra::Point3<f64>;

/// 3D vector type.
pub type Vector3 = nalgebra::Vector3<f64>;

/// Global geometric tolerance for floating-point comparisons.
pub const TOLERANCE: f64 = 1e-10;

/// Tolerance for comparing positions and parameters produced by iterative math.
pub const EPSILON: f64 = 1e-5;
