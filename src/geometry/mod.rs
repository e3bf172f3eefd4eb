pub mod intersect;
pub mod trajectory;

pub use intersect::Intersection;
pub use trajectory::{BezierTrajectory, ParametricCurve, StraightTrajectory, Trajectory};
