use thiserror::Error;

/// Top-level error type for the capmesh model generator.
#[derive(Debug, Error)]
pub enum CapmeshError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Geometry(#[from] GeometryError),

    #[error(transparent)]
    Triangulation(#[from] TriangulationError),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised while declaring materials and layers, before any
/// geometric work starts.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("material {0:?} is already registered")]
    DuplicateMaterial(String),

    #[error("unknown material {0:?} - register it before declaring a dielectric")]
    UnknownMaterial(String),

    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
}

/// Errors related to 2-D region computations.
#[derive(Debug, Error)]
pub enum GeometryError {
    #[error("region sizing distance must be non-negative, got {0}")]
    NegativeSizing(i64),
}

/// Errors related to constrained Delaunay triangulation.
#[derive(Debug, Error)]
pub enum TriangulationError {
    #[error("constraint loop needs at least 3 points, got {0}")]
    ShortConstraintLoop(usize),

    #[error("triangulation failed: {0}")]
    Failed(String),
}

/// Convenience type alias for results using [`CapmeshError`].
pub type Result<T> = std::result::Result<T, CapmeshError>;
