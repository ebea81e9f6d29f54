use crate::RectifyError;
use serde::{Deserialize, Serialize};

/// Borrowed interleaved 8-bit image with 1..=4 channels.
#[derive(Clone, Copy, Debug)]
pub struct ImageView<'a> {
    pub width: usize,
    pub height: usize,
    pub channels: usize,
    pub data: &'a [u8], // row-major, len = w*h*channels
}

impl<'a> ImageView<'a> {
    pub fn new(
        width: usize,
        height: usize,
        channels: usize,
        data: &'a [u8],
    ) -> Result<Self, RectifyError> {
        check_layout(width, height, channels, data.len())?;
        Ok(Self {
            width,
            height,
            channels,
            data,
        })
    }
}

/// Owned interleaved 8-bit image.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImageBuf {
    pub width: usize,
    pub height: usize,
    pub channels: usize,
    pub data: Vec<u8>,
}

impl ImageBuf {
    pub fn new(
        width: usize,
        height: usize,
        channels: usize,
        data: Vec<u8>,
    ) -> Result<Self, RectifyError> {
        check_layout(width, height, channels, data.len())?;
        Ok(Self {
            width,
            height,
            channels,
            data,
        })
    }

    pub fn view(&self) -> ImageView<'_> {
        ImageView {
            width: self.width,
            height: self.height,
            channels: self.channels,
            data: &self.data,
        }
    }
}

fn check_layout(
    width: usize,
    height: usize,
    channels: usize,
    len: usize,
) -> Result<(), RectifyError> {
    if !(1..=4).contains(&channels) {
        return Err(RectifyError::InvalidInput(format!(
            "unsupported channel count {channels} (expected 1..=4)"
        )));
    }
    let expected = width
        .checked_mul(height)
        .and_then(|n| n.checked_mul(channels))
        .ok_or_else(|| {
            RectifyError::InvalidInput(format!("image dimensions {width}x{height} overflow"))
        })?;
    if expected != len {
        return Err(RectifyError::InvalidInput(format!(
            "image buffer length {len} does not match {width}x{height}x{channels}"
        )));
    }
    Ok(())
}

/// Sampling kernel used by the resampler.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Interpolation {
    Nearest,
    Bilinear,
    /// Sharper than bilinear at a modest throughput cost.
    #[default]
    Bicubic,
}

#[inline]
fn tap(src: &ImageView<'_>, x: i32, y: i32, c: usize) -> f32 {
    let xi = x.clamp(0, src.width as i32 - 1) as usize;
    let yi = y.clamp(0, src.height as i32 - 1) as usize;
    src.data[(yi * src.width + xi) * src.channels + c] as f32
}

#[inline]
fn inside(src: &ImageView<'_>, x: f32, y: f32) -> bool {
    // pixel centers sit at integer coordinates, so the image spans [-0.5, size - 0.5)
    x >= -0.5 && y >= -0.5 && x < src.width as f32 - 0.5 && y < src.height as f32 - 0.5
}

#[inline]
pub fn sample_nearest(src: &ImageView<'_>, x: f32, y: f32, c: usize) -> f32 {
    tap(src, x.round() as i32, y.round() as i32, c)
}

#[inline]
pub fn sample_bilinear(src: &ImageView<'_>, x: f32, y: f32, c: usize) -> f32 {
    let x0 = x.floor() as i32;
    let y0 = y.floor() as i32;
    let fx = x - x0 as f32;
    let fy = y - y0 as f32;

    let p00 = tap(src, x0, y0, c);
    let p10 = tap(src, x0 + 1, y0, c);
    let p01 = tap(src, x0, y0 + 1, c);
    let p11 = tap(src, x0 + 1, y0 + 1, c);

    let a = p00 + fx * (p10 - p00);
    let b = p01 + fx * (p11 - p01);
    a + fy * (b - a)
}

/// Keys cubic convolution weight with a = -0.5.
#[inline]
fn cubic_weight(t: f32) -> f32 {
    let t = t.abs();
    if t <= 1.0 {
        1.5 * t * t * t - 2.5 * t * t + 1.0
    } else if t < 2.0 {
        -0.5 * t * t * t + 2.5 * t * t - 4.0 * t + 2.0
    } else {
        0.0
    }
}

#[inline]
pub fn sample_bicubic(src: &ImageView<'_>, x: f32, y: f32, c: usize) -> f32 {
    let x0 = x.floor() as i32;
    let y0 = y.floor() as i32;
    let fx = x - x0 as f32;
    let fy = y - y0 as f32;

    let wx = [
        cubic_weight(fx + 1.0),
        cubic_weight(fx),
        cubic_weight(fx - 1.0),
        cubic_weight(fx - 2.0),
    ];

    let mut sum = 0.0;
    for dy in -1..3 {
        let wy = cubic_weight(fy - dy as f32);
        if wy == 0.0 {
            continue;
        }
        let mut row = 0.0;
        for (i, dx) in (-1..3).enumerate() {
            row += wx[i] * tap(src, x0 + dx, y0 + dy, c);
        }
        sum += wy * row;
    }
    sum
}

/// Sample channel `c` at `(x, y)` (pixel centers at integer coordinates).
///
/// Positions outside the image return `None`; the caller decides the fill.
#[inline]
pub fn sample(
    src: &ImageView<'_>,
    x: f32,
    y: f32,
    c: usize,
    interpolation: Interpolation,
) -> Option<f32> {
    if !inside(src, x, y) {
        return None;
    }
    Some(match interpolation {
        Interpolation::Nearest => sample_nearest(src, x, y, c),
        Interpolation::Bilinear => sample_bilinear(src, x, y, c),
        Interpolation::Bicubic => sample_bicubic(src, x, y, c),
    })
}

#[inline]
pub fn to_u8(v: f32) -> u8 {
    v.round().clamp(0.0, 255.0) as u8
}
