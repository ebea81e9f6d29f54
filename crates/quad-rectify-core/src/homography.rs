use crate::normalize::normalize_points;
use crate::{Quadrilateral, RectifyError};
use nalgebra::{Matrix3, Point2, SMatrix, Vector3};
use serde::{Deserialize, Serialize};

#[cfg(feature = "tracing")]
use tracing::instrument;

// Below this the canonicalizing entry is treated as zero.
const MIN_SCALE_ENTRY: f64 = 1e-12;

/// A 3x3 projective map acting on homogeneous 2D points.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Homography {
    pub h: Matrix3<f64>,
}

impl Homography {
    pub fn new(h: Matrix3<f64>) -> Self {
        Self { h }
    }

    pub fn identity() -> Self {
        Self::new(Matrix3::identity())
    }

    pub fn from_array(rows: [[f64; 3]; 3]) -> Self {
        Self::new(Matrix3::from_row_slice(&[
            rows[0][0], rows[0][1], rows[0][2], rows[1][0], rows[1][1], rows[1][2], rows[2][0],
            rows[2][1], rows[2][2],
        ]))
    }

    pub fn to_array(&self) -> [[f64; 3]; 3] {
        [
            [self.h[(0, 0)], self.h[(0, 1)], self.h[(0, 2)]],
            [self.h[(1, 0)], self.h[(1, 1)], self.h[(1, 2)]],
            [self.h[(2, 0)], self.h[(2, 1)], self.h[(2, 2)]],
        ]
    }

    /// Rebuild a canonical homography from its 8 row-major coefficients.
    pub fn from_coefficients(c: [f64; 8]) -> Self {
        Self::new(Matrix3::new(
            c[0], c[1], c[2], //
            c[3], c[4], c[5], //
            c[6], c[7], 1.0,
        ))
    }

    /// The 8 leading row-major entries. Meaningful once canonicalized, when the
    /// implicit ninth entry is 1.
    pub fn coefficients(&self) -> [f64; 8] {
        let h = &self.h;
        [
            h[(0, 0)],
            h[(0, 1)],
            h[(0, 2)],
            h[(1, 0)],
            h[(1, 1)],
            h[(1, 2)],
            h[(2, 0)],
            h[(2, 1)],
        ]
    }

    #[inline]
    pub fn apply(&self, p: Point2<f64>) -> Point2<f64> {
        let v = self.h * Vector3::new(p.x, p.y, 1.0);
        let w = v[2];
        Point2::new(v[0] / w, v[1] / w)
    }

    pub fn inverse(&self) -> Option<Self> {
        self.h.try_inverse().map(Self::new)
    }

    /// `self` applied after `first`.
    pub fn compose(&self, first: &Homography) -> Self {
        Self::new(self.h * first.h)
    }

    pub fn is_finite(&self) -> bool {
        self.h.iter().all(|v| v.is_finite())
    }

    /// Divide through by `h[2][2]` so the bottom-right entry equals 1.
    pub fn canonicalize(&self) -> Result<Self, RectifyError> {
        let s = self.h[(2, 2)];
        if !s.is_finite() || s.abs() < MIN_SCALE_ENTRY {
            return Err(RectifyError::DegenerateGeometry(
                "canonicalizing entry h[2][2] is zero or non-finite",
            ));
        }
        let out = Self::new(self.h / s);
        if !out.is_finite() {
            return Err(RectifyError::DegenerateGeometry(
                "homography has non-finite entries",
            ));
        }
        Ok(out)
    }
}

fn denormalize_homography(
    hn: Matrix3<f64>,
    t_src: Matrix3<f64>,
    t_dst: Matrix3<f64>,
) -> Option<Matrix3<f64>> {
    let t_dst_inv = t_dst.try_inverse()?;
    Some(t_dst_inv * hn * t_src)
}

/// Estimate the canonical homography H with `dst ~ H * src` from four
/// positional correspondences, using the normalized linear DLT.
///
/// Both point sets are conditioned first, the 8x9 constraint matrix is solved
/// for its null vector by SVD, and the result is mapped back to pixel
/// coordinates and divided through by `h[2][2]`.
#[cfg_attr(feature = "tracing", instrument(level = "debug", skip_all))]
pub fn estimate_homography(
    src: &Quadrilateral,
    dst: &Quadrilateral,
) -> Result<Homography, RectifyError> {
    src.check_non_degenerate()?;
    dst.check_non_degenerate()?;

    let (s, t_src) = normalize_points(src.corners())?;
    let (d, t_dst) = normalize_points(dst.corners())?;

    // 8 constraint rows plus one zero row, so the SVD yields a full 9x9 V^T.
    let mut a = SMatrix::<f64, 9, 9>::zeros();

    for k in 0..4 {
        let x = s[k].x;
        let y = s[k].y;
        let u = d[k].x;
        let v = d[k].y;

        // [ -x -y -1   0  0  0   u*x u*y u ]
        a[(2 * k, 0)] = -x;
        a[(2 * k, 1)] = -y;
        a[(2 * k, 2)] = -1.0;
        a[(2 * k, 6)] = u * x;
        a[(2 * k, 7)] = u * y;
        a[(2 * k, 8)] = u;

        // [ 0  0  0  -x -y -1   v*x v*y v ]
        a[(2 * k + 1, 3)] = -x;
        a[(2 * k + 1, 4)] = -y;
        a[(2 * k + 1, 5)] = -1.0;
        a[(2 * k + 1, 6)] = v * x;
        a[(2 * k + 1, 7)] = v * y;
        a[(2 * k + 1, 8)] = v;
    }

    // Solve Ah = 0 -> h is the right singular vector of the smallest singular value
    let svd = a.svd(true, true);
    let smallest = svd.singular_values.imin();
    log::debug!(
        "DLT singular values {:?}, null vector index {}",
        svd.singular_values.as_slice(),
        smallest
    );
    let vt = svd
        .v_t
        .ok_or(RectifyError::DegenerateGeometry("SVD did not produce V^T"))?;
    let h = vt.row(smallest);

    let hn = Matrix3::<f64>::from_row_slice(&[
        h[0], h[1], h[2], h[3], h[4], h[5], h[6], h[7], h[8],
    ]);

    // Denormalize: H = Td^{-1} * Hn * Ts
    let h_den = denormalize_homography(hn, t_src, t_dst).ok_or(
        RectifyError::DegenerateGeometry("destination conditioning transform is singular"),
    )?;
    log::debug!("de-normalized h[2][2] = {:e}", h_den[(2, 2)]);

    Homography::new(h_den).canonicalize()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn assert_close(a: Point2<f64>, b: Point2<f64>, tol: f64) {
        let dx = (a.x - b.x).abs();
        let dy = (a.y - b.y).abs();
        assert!(
            dx < tol && dy < tol,
            "expected ({:.6},{:.6}) ~ ({:.6},{:.6}) within {}",
            a.x,
            a.y,
            b.x,
            b.y,
            tol
        );
    }

    fn quad(pts: [[f64; 2]; 4]) -> Quadrilateral {
        Quadrilateral::from_array(pts).expect("quad")
    }

    fn skewed_sign() -> Quadrilateral {
        quad([[32.0, 41.0], [18.0, 260.0], [301.0, 233.0], [276.0, 22.0]])
    }

    fn upright() -> Quadrilateral {
        quad([[0.0, 0.0], [0.0, 240.0], [320.0, 240.0], [320.0, 0.0]])
    }

    #[test]
    fn inverse_round_trips_points() {
        let h = Homography::new(Matrix3::new(
            1.2, 0.1, 5.0, //
            -0.05, 0.9, 3.0, //
            0.001, 0.0005, 1.0,
        ));
        let inv = h.inverse().expect("invertible");

        for p in [
            Point2::new(0.0, 0.0),
            Point2::new(50.0, -20.0),
            Point2::new(320.0, 200.0),
        ] {
            let q = h.apply(p);
            let back = inv.apply(q);
            assert_close(back, p, 1e-9);
        }
    }

    #[test]
    fn identical_quadrilaterals_give_identity() {
        let q = skewed_sign();
        let h = estimate_homography(&q, &q).expect("estimate");
        assert_abs_diff_eq!(h.h, Matrix3::identity(), epsilon = 1e-9);
    }

    #[test]
    fn recovers_known_homography() {
        let ground_truth = Homography::new(Matrix3::new(
            0.8, 0.05, 120.0, //
            -0.02, 1.1, 80.0, //
            0.0009, -0.0004, 1.0,
        ));

        let src = quad([[0.0, 0.0], [180.0, 0.0], [180.0, 130.0], [0.0, 130.0]]);
        let dst = Quadrilateral::new(src.corners().map(|p| ground_truth.apply(p))).expect("dst");

        let recovered = estimate_homography(&src, &dst).expect("recoverable");
        assert_abs_diff_eq!(recovered.h, ground_truth.h, epsilon = 1e-7);

        for p in [
            Point2::new(0.0, 0.0),
            Point2::new(60.0, 40.0),
            Point2::new(150.0, 120.0),
        ] {
            assert_close(recovered.apply(p), ground_truth.apply(p), 1e-6);
        }
    }

    #[test]
    fn maps_every_corner_in_index_order() {
        let src = skewed_sign();
        let dst = upright();
        let h = estimate_homography(&src, &dst).expect("estimate");
        for (s, d) in src.corners().iter().zip(dst.corners()) {
            assert_close(h.apply(*s), *d, 1e-6);
        }
    }

    #[test]
    fn forward_and_reverse_estimates_compose_to_identity() {
        let q1 = skewed_sign();
        let q2 = upright();
        let fwd = estimate_homography(&q1, &q2).expect("forward");
        let back = estimate_homography(&q2, &q1).expect("reverse");
        let round = back.compose(&fwd).canonicalize().expect("canonical");
        assert_abs_diff_eq!(round.h, Matrix3::identity(), epsilon = 1e-8);
    }

    #[test]
    fn scaling_inputs_conjugates_the_homography() {
        let q1 = skewed_sign();
        let q2 = upright();
        let k = 3.5;
        let h = estimate_homography(&q1, &q2).expect("estimate");
        let hk = estimate_homography(&q1.scaled(k).expect("q1"), &q2.scaled(k).expect("q2"))
            .expect("scaled estimate");

        let s = Matrix3::new(k, 0.0, 0.0, 0.0, k, 0.0, 0.0, 0.0, 1.0);
        let s_inv = Matrix3::new(1.0 / k, 0.0, 0.0, 0.0, 1.0 / k, 0.0, 0.0, 0.0, 1.0);
        let expected = Homography::new(s * h.h * s_inv).canonicalize().expect("canonical");
        assert_abs_diff_eq!(hk.h, expected.h, epsilon = 1e-8);

        let p = Point2::new(120.0, 95.0);
        let mapped = h.apply(p);
        assert_close(
            hk.apply(Point2::new(p.x * k, p.y * k)),
            Point2::new(mapped.x * k, mapped.y * k),
            1e-6,
        );
    }

    #[test]
    fn result_is_canonical() {
        let h = estimate_homography(&skewed_sign(), &upright()).expect("estimate");
        assert_eq!(h.h[(2, 2)], 1.0);
        let c = h.coefficients();
        assert_eq!(Homography::from_coefficients(c), h);
    }

    #[test]
    fn collinear_origin_is_degenerate() {
        let src = quad([[0.0, 0.0], [0.0, 50.0], [0.0, 100.0], [100.0, 0.0]]);
        let err = estimate_homography(&src, &upright()).unwrap_err();
        assert!(matches!(err, RectifyError::DegenerateGeometry(_)));
    }

    #[test]
    fn collinear_destination_is_degenerate() {
        let dst = quad([[0.0, 0.0], [10.0, 10.0], [20.0, 20.0], [30.0, 0.0]]);
        let err = estimate_homography(&skewed_sign(), &dst).unwrap_err();
        assert!(matches!(err, RectifyError::DegenerateGeometry(_)));
    }

    #[test]
    fn canonicalize_rejects_zero_scale_entry() {
        let h = Homography::new(Matrix3::new(1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0));
        assert!(matches!(
            h.canonicalize(),
            Err(RectifyError::DegenerateGeometry(_))
        ));

        let h = Homography::new(Matrix3::new(
            f64::NAN,
            0.0,
            0.0,
            0.0,
            1.0,
            0.0,
            0.0,
            0.0,
            1.0,
        ));
        assert!(h.canonicalize().is_err());
    }
}
