use crate::image::{sample, to_u8, ImageBuf, ImageView, Interpolation};
use crate::{CanvasSize, ResamplingParams};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Value written where the sampling map lands outside the source.
pub const FILL_VALUE: u8 = 0;

/// Inverse-map every pixel of a `canvas`-sized output through the projective
/// `coefficients` `[a, b, c, d, e, f, g, h]` and sample the source there:
///
/// `x = (a*X + b*Y + c) / (g*X + h*Y + 1)`, `y = (d*X + e*Y + f) / (g*X + h*Y + 1)`
///
/// Pixel centers are used on both sides. Samples falling outside `src` are
/// filled with [`FILL_VALUE`].
#[cfg_attr(
    feature = "tracing",
    instrument(
        level = "info",
        skip(src, coefficients),
        fields(src_w = src.width, src_h = src.height, channels = src.channels)
    )
)]
pub fn warp_perspective(
    src: &ImageView<'_>,
    coefficients: &[f64; 8],
    canvas: CanvasSize,
    interpolation: Interpolation,
) -> ImageBuf {
    let [a, b, c, d, e, f, g, h] = *coefficients;
    let out_w = canvas.width as usize;
    let out_h = canvas.height as usize;
    let channels = src.channels;
    let mut out = vec![FILL_VALUE; out_w * out_h * channels];

    if src.width > 0 && src.height > 0 {
        for y in 0..out_h {
            let yc = y as f64 + 0.5;
            for x in 0..out_w {
                // sample at pixel center
                let xc = x as f64 + 0.5;
                let w = g * xc + h * yc + 1.0;
                if w.abs() < f64::EPSILON {
                    continue;
                }
                let sx = ((a * xc + b * yc + c) / w - 0.5) as f32;
                let sy = ((d * xc + e * yc + f) / w - 0.5) as f32;

                let base = (y * out_w + x) * channels;
                for ch in 0..channels {
                    if let Some(v) = sample(src, sx, sy, ch, interpolation) {
                        out[base + ch] = to_u8(v);
                    }
                }
            }
        }
    }

    ImageBuf {
        width: out_w,
        height: out_h,
        channels,
        data: out,
    }
}

/// Resample `src` with previously estimated [`ResamplingParams`].
pub fn rectify_view(
    src: &ImageView<'_>,
    params: &ResamplingParams,
    interpolation: Interpolation,
) -> ImageBuf {
    warp_perspective(src, &params.coefficients(), params.canvas, interpolation)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{build_resampling_params, Quadrilateral};

    const IDENTITY: [f64; 8] = [1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0];

    fn checker(w: usize, h: usize, channels: usize) -> ImageBuf {
        let mut data = Vec::with_capacity(w * h * channels);
        for y in 0..h {
            for x in 0..w {
                for c in 0..channels {
                    let on = ((x / 4) + (y / 4)) % 2 == 0;
                    data.push(if on { 200 } else { 30 } + c as u8);
                }
            }
        }
        ImageBuf::new(w, h, channels, data).expect("image")
    }

    #[test]
    fn identity_coefficients_reproduce_the_image() {
        let img = checker(16, 12, 3);
        let canvas = CanvasSize {
            width: 16,
            height: 12,
        };
        for interp in [
            Interpolation::Nearest,
            Interpolation::Bilinear,
            Interpolation::Bicubic,
        ] {
            let out = warp_perspective(&img.view(), &IDENTITY, canvas, interp);
            assert_eq!(out, img, "{interp:?}");
        }
    }

    #[test]
    fn translation_shifts_content_and_fills_outside() {
        let img = checker(16, 16, 1);
        // output (X, Y) samples source (X + 4, Y)
        let coeffs = [1.0, 0.0, 4.0, 0.0, 1.0, 0.0, 0.0, 0.0];
        let canvas = CanvasSize {
            width: 16,
            height: 16,
        };
        let out = warp_perspective(&img.view(), &coeffs, canvas, Interpolation::Bilinear);
        for y in 0..16 {
            for x in 0..12 {
                assert_eq!(out.data[y * 16 + x], img.data[y * 16 + x + 4]);
            }
            for x in 12..16 {
                assert_eq!(out.data[y * 16 + x], FILL_VALUE);
            }
        }
    }

    #[test]
    fn canvas_size_drives_output_shape() {
        let img = checker(8, 8, 4);
        let canvas = CanvasSize {
            width: 5,
            height: 3,
        };
        let out = warp_perspective(&img.view(), &IDENTITY, canvas, Interpolation::Bicubic);
        assert_eq!((out.width, out.height, out.channels), (5, 3, 4));
        assert_eq!(out.data.len(), 5 * 3 * 4);
    }

    #[test]
    fn rectifying_a_square_region_upsamples_it() {
        let img = checker(32, 32, 1);
        let origin =
            Quadrilateral::from_array([[8.0, 8.0], [8.0, 24.0], [24.0, 24.0], [24.0, 8.0]])
                .expect("origin");
        let dst = Quadrilateral::image_corners(64.0, 64.0).expect("dst");
        let params = build_resampling_params(&origin, &dst).expect("params");

        let out = rectify_view(&img.view(), &params, Interpolation::Nearest);
        assert_eq!((out.width, out.height), (64, 64));
        // output column X samples source 8 + (X + 0.5) / 4 - 0.5, which rounds to 8 + X / 4
        for (ox, oy) in [(2usize, 2usize), (18, 34), (62, 6)] {
            let sx = 8 + ox / 4;
            let sy = 8 + oy / 4;
            assert_eq!(out.data[oy * 64 + ox], img.data[sy * 32 + sx], "at ({ox},{oy})");
        }
    }
}
