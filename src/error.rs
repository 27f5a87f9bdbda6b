use thiserror::Error;

/// Top-level error type for the curve core.
#[derive(Debug, Error)]
pub enum CurveError {
    #[error(transparent)]
    Geometry(#[from] GeometryError),

    #[error(transparent)]
    Tessellation(#[from] TessellationError),
}

/// Errors raised while constructing curves and chains.
#[derive(Debug, Error)]
pub enum GeometryError {
    #[error("degenerate geometry: {0}")]
    Degenerate(String),

    #[error("zero-length vector")]
    ZeroVector,

    #[error("curve chain has no children")]
    EmptyChain,
}

/// Errors related to stroking curves.
#[derive(Debug, Error)]
pub enum TessellationError {
    #[error("invalid stroke options: {0}")]
    InvalidParameters(String),

    #[error("tessellation failed: {0}")]
    Failed(String),
}

/// Convenience type alias for results using [`CurveError`].
pub type Result<T> = std::result::Result<T, CurveError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn geometry_error_converts_into_curve_error() {
        let err: CurveError = GeometryError::EmptyChain.into();
        assert!(matches!(err, CurveError::Geometry(GeometryError::EmptyChain)));
        assert_eq!(err.to_string(), "curve chain has no children");
    }
}
