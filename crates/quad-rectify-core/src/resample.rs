//! Parameters handed to the perspective resampler.
//!
//! Resampling works backwards: for every pixel of the output canvas the
//! resampler needs the source location it came from. The sampling map is
//! therefore the destination -> origin homography, and the forward
//! origin -> destination map is kept alongside it for bookkeeping.

use crate::{estimate_homography, Homography, Quadrilateral, RectifyError};
use serde::{Deserialize, Serialize};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Output image dimensions in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CanvasSize {
    pub width: u32,
    pub height: u32,
}

impl CanvasSize {
    /// Bounding box of the destination quadrilateral, rounded to whole pixels.
    pub fn from_destination(dst: &Quadrilateral) -> Result<Self, RectifyError> {
        let (min, max) = dst.bounds();
        let width = max.x - min.x;
        let height = max.y - min.y;
        let w = width.round();
        let h = height.round();
        if w < 1.0 || h < 1.0 || w > u32::MAX as f64 || h > u32::MAX as f64 {
            return Err(RectifyError::InvalidOutputSize { width, height });
        }
        Ok(Self {
            width: w as u32,
            height: h as u32,
        })
    }
}

/// Everything the resampler needs for one rectification.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ResamplingParams {
    /// Canonical destination -> origin map, used to sample the source.
    pub dst_to_src: Homography,
    /// Canonical origin -> destination map, the inverse of `dst_to_src`.
    pub src_to_dst: Homography,
    pub canvas: CanvasSize,
}

impl ResamplingParams {
    /// Row-major coefficients `[a, b, c, d, e, f, g, h]` of the destination ->
    /// origin map; the ninth entry is implicitly 1.
    pub fn coefficients(&self) -> [f64; 8] {
        self.dst_to_src.coefficients()
    }
}

/// Estimate the resampling map that carries the `origin` region of a source
/// image onto the `destination` quadrilateral of the output canvas.
#[cfg_attr(feature = "tracing", instrument(level = "debug", skip_all))]
pub fn build_resampling_params(
    origin: &Quadrilateral,
    destination: &Quadrilateral,
) -> Result<ResamplingParams, RectifyError> {
    // Validate the canvas before any numeric work.
    let canvas = CanvasSize::from_destination(destination)?;

    // Reversed on purpose: sampling needs destination -> origin.
    let dst_to_src = estimate_homography(destination, origin)?;
    let src_to_dst = dst_to_src
        .inverse()
        .ok_or(RectifyError::DegenerateGeometry("homography is not invertible"))?
        .canonicalize()?;

    log::debug!(
        "resampling canvas {}x{}, coefficients {:?}",
        canvas.width,
        canvas.height,
        dst_to_src.coefficients()
    );

    Ok(ResamplingParams {
        dst_to_src,
        src_to_dst,
        canvas,
    })
}

/// Destination used when none is supplied: the image's own corners, so the
/// origin region is straightened into the full frame.
pub fn default_destination(width: u32, height: u32) -> Result<Quadrilateral, RectifyError> {
    Quadrilateral::image_corners(width as f64, height as f64)
}

/// [`build_resampling_params`] with the destination defaulting to
/// [`default_destination`] for a `width` x `height` source image.
pub fn resampling_params_for_image(
    origin: &Quadrilateral,
    destination: Option<&Quadrilateral>,
    width: u32,
    height: u32,
) -> Result<ResamplingParams, RectifyError> {
    match destination {
        Some(dst) => build_resampling_params(origin, dst),
        None => build_resampling_params(origin, &default_destination(width, height)?),
    }
}
