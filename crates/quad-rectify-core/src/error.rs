/// Errors produced while estimating a homography or sizing the output canvas.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum RectifyError {
    /// Malformed input, rejected before any numeric work.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Coincident or collinear corners, or a solve that produced no usable matrix.
    #[error("degenerate geometry: {0}")]
    DegenerateGeometry(&'static str),

    /// The destination bounding box collapses in at least one dimension.
    #[error("invalid output size {width}x{height} (both dimensions must be at least one pixel)")]
    InvalidOutputSize { width: f64, height: f64 },
}
