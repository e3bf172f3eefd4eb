use thiserror::Error;

/// Top-level error type for the markup engine.
#[derive(Debug, Error)]
pub enum MarkupError {
    #[error(transparent)]
    Geometry(#[from] GeometryError),

    #[error(transparent)]
    Style(#[from] StyleError),

    #[error(transparent)]
    Contour(#[from] ContourError),

    #[error(transparent)]
    Entity(#[from] EntityError),
}

/// Errors related to geometric construction.
#[derive(Debug, Error)]
pub enum GeometryError {
    #[error("degenerate geometry: {0}")]
    Degenerate(String),

    #[error("zero-length vector")]
    ZeroVector,
}

/// Errors raised while decoding or converting styles.
#[derive(Debug, Error)]
pub enum StyleError {
    #[error("unknown style type {0}")]
    UnknownType(i32),

    #[error("style family mismatch: expected {expected}, found {found}")]
    WrongFamily {
        expected: &'static str,
        found: &'static str,
    },

    #[error("invalid value {value:?} for attribute {key}")]
    InvalidAttribute { key: &'static str, value: String },

    #[error("missing element <{0}>")]
    MissingElement(&'static str),

    #[error("xml: {0}")]
    Xml(String),
}

/// Errors related to interactive filler contour construction.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ContourError {
    #[error("vertex is not a legal next candidate")]
    IllegalVertex,

    #[error("contour is already closed")]
    Closed,

    #[error("contour is empty")]
    Empty,

    #[error("contour is not closed")]
    Open,

    #[error("no common line between consecutive vertices")]
    NoCommonLine,

    #[error("a closed contour needs at least 3 distinct vertices")]
    TooFewVertices,
}

/// Errors related to markup entities (points, lines, fillers, crosswalks).
#[derive(Debug, Error)]
pub enum EntityError {
    #[error("entity not found: {0}")]
    NotFound(String),

    #[error("invalid line: {0}")]
    InvalidLine(String),
}

/// Convenience type alias for results using [`MarkupError`].
pub type Result<T> = std::result::Result<T, MarkupError>;
