//! Road surface marking geometry.
//!
//! Lines, crosswalks and fillers placed on a junction are turned into
//! drawable dashes and meshes. [`markup::Markup`] owns the entities,
//! [`style`] holds the per-family styles that compute the primitives and
//! [`geometry`] the trajectories and intersections both are built on.

pub mod config;
pub mod error;
pub mod geometry;
pub mod markup;
pub mod math;
pub mod style;

pub use error::{MarkupError, Result};
