use crate::RectifyError;
use nalgebra::{Matrix3, Point2, Vector3};

/// Added to the isotropic scale so points sharing a coordinate do not divide by zero.
pub const SCALE_EPSILON: f64 = 1e-9;

/// Conditioning transform `C = [[1/s, 0, -mx/s], [0, 1/s, -my/s], [0, 0, 1]]`.
pub fn conditioning_transform(mean: Point2<f64>, scale: f64) -> Matrix3<f64> {
    let inv = 1.0 / scale;
    Matrix3::new(
        inv, 0.0, -mean.x * inv, //
        0.0, inv, -mean.y * inv, //
        0.0, 0.0, 1.0,
    )
}

/// Recenter `pts` on their mean and divide by the larger of the two per-axis
/// (population) standard deviations.
///
/// Returns the normalized points together with the 3x3 matrix that performs
/// the normalization in homogeneous coordinates, so the caller can undo it
/// after solving. Collinear or coincident inputs are not rejected here; the
/// epsilon floor only keeps the transform finite.
pub fn normalize_points(
    pts: &[Point2<f64>],
) -> Result<(Vec<Point2<f64>>, Matrix3<f64>), RectifyError> {
    if pts.is_empty() {
        return Err(RectifyError::InvalidInput(
            "cannot normalize an empty point set".to_string(),
        ));
    }

    let n = pts.len() as f64;
    let mut cx = 0.0;
    let mut cy = 0.0;
    for p in pts {
        cx += p.x;
        cy += p.y;
    }
    cx /= n;
    cy /= n;

    let mut var_x = 0.0;
    let mut var_y = 0.0;
    for p in pts {
        let dx = p.x - cx;
        let dy = p.y - cy;
        var_x += dx * dx;
        var_y += dy * dy;
    }
    let std_x = (var_x / n).sqrt();
    let std_y = (var_y / n).sqrt();
    let scale = std_x.max(std_y) + SCALE_EPSILON;

    let t = conditioning_transform(Point2::new(cx, cy), scale);

    let out = pts
        .iter()
        .map(|p| {
            let v = t * Vector3::new(p.x, p.y, 1.0);
            Point2::new(v[0], v[1])
        })
        .collect();
    Ok((out, t))
}
