use crate::RectifyError;
use nalgebra::Point2;
use serde::{Deserialize, Serialize};

// Relative to the squared extent of the quadrilateral.
const COLLINEAR_REL_TOL: f64 = 1e-9;

/// Four corners of a planar region, in a caller-defined winding order.
///
/// Correspondence between an origin and a destination quadrilateral is
/// positional: corner `i` of one maps to corner `i` of the other. A winding
/// mismatch (clockwise vs counter-clockwise) is not detected and yields a
/// mirrored transform.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<[f64; 2]>", into = "Vec<[f64; 2]>")]
pub struct Quadrilateral {
    corners: [Point2<f64>; 4],
}

impl Quadrilateral {
    /// Build from four corners. All coordinates must be finite.
    pub fn new(corners: [Point2<f64>; 4]) -> Result<Self, RectifyError> {
        for (index, p) in corners.iter().enumerate() {
            if !p.x.is_finite() || !p.y.is_finite() {
                return Err(RectifyError::InvalidInput(format!(
                    "corner {index} has a non-finite coordinate ({}, {})",
                    p.x, p.y
                )));
            }
        }
        Ok(Self { corners })
    }

    pub fn from_array(corners: [[f64; 2]; 4]) -> Result<Self, RectifyError> {
        Self::new(corners.map(|[x, y]| Point2::new(x, y)))
    }

    pub fn to_array(&self) -> [[f64; 2]; 4] {
        self.corners.map(|p| [p.x, p.y])
    }

    /// Build from a slice of points; exactly four are required.
    pub fn from_points(points: &[Point2<f64>]) -> Result<Self, RectifyError> {
        let corners: [Point2<f64>; 4] = points.try_into().map_err(|_| {
            RectifyError::InvalidInput(format!(
                "expected exactly 4 points per quadrilateral, got {}",
                points.len()
            ))
        })?;
        Self::new(corners)
    }

    /// Build from a flat `[x1, y1, x2, y2, x3, y3, x4, y4]` list.
    pub fn from_flat(coords: &[f64]) -> Result<Self, RectifyError> {
        if coords.len() != 8 {
            return Err(RectifyError::InvalidInput(format!(
                "expected 8 coordinates (4 points), got {}",
                coords.len()
            )));
        }
        let points: Vec<Point2<f64>> = coords
            .chunks_exact(2)
            .map(|xy| Point2::new(xy[0], xy[1]))
            .collect();
        Self::from_points(&points)
    }

    /// The corners of a `width` x `height` image: top-left, bottom-left,
    /// bottom-right, top-right.
    pub fn image_corners(width: f64, height: f64) -> Result<Self, RectifyError> {
        Self::from_array([[0.0, 0.0], [0.0, height], [width, height], [width, 0.0]])
    }

    #[inline]
    pub fn corners(&self) -> &[Point2<f64>; 4] {
        &self.corners
    }

    /// Axis-aligned bounds as `(min, max)`.
    pub fn bounds(&self) -> (Point2<f64>, Point2<f64>) {
        let mut min = self.corners[0];
        let mut max = self.corners[0];
        for p in &self.corners[1..] {
            min.x = min.x.min(p.x);
            min.y = min.y.min(p.y);
            max.x = max.x.max(p.x);
            max.y = max.y.max(p.y);
        }
        (min, max)
    }

    /// Scale every coordinate by `k`.
    pub fn scaled(&self, k: f64) -> Result<Self, RectifyError> {
        Self::new(self.corners.map(|p| Point2::new(p.x * k, p.y * k)))
    }

    /// Reject quadrilaterals whose corners coincide or where any three corners
    /// are collinear. Either case makes the DLT system rank deficient.
    pub fn check_non_degenerate(&self) -> Result<(), RectifyError> {
        let (min, max) = self.bounds();
        let extent = (max.x - min.x).max(max.y - min.y);
        if extent <= 0.0 {
            return Err(RectifyError::DegenerateGeometry("all corners coincide"));
        }

        for i in 0..4 {
            for j in (i + 1)..4 {
                if (self.corners[i] - self.corners[j]).norm() <= COLLINEAR_REL_TOL * extent {
                    return Err(RectifyError::DegenerateGeometry("two corners coincide"));
                }
            }
        }

        let tol = COLLINEAR_REL_TOL * extent * extent;
        for skip in 0..4 {
            let [a, b, c] = triple_without(&self.corners, skip);
            let ab = b - a;
            let ac = c - a;
            let cross = ab.x * ac.y - ab.y * ac.x;
            if cross.abs() <= tol {
                return Err(RectifyError::DegenerateGeometry("three corners are collinear"));
            }
        }
        Ok(())
    }
}

fn triple_without(pts: &[Point2<f64>; 4], skip: usize) -> [Point2<f64>; 3] {
    let mut out = [Point2::origin(); 3];
    let mut k = 0;
    for (i, p) in pts.iter().enumerate() {
        if i != skip {
            out[k] = *p;
            k += 1;
        }
    }
    out
}

impl TryFrom<Vec<[f64; 2]>> for Quadrilateral {
    type Error = RectifyError;

    fn try_from(value: Vec<[f64; 2]>) -> Result<Self, Self::Error> {
        let points: Vec<Point2<f64>> = value.iter().map(|&[x, y]| Point2::new(x, y)).collect();
        Self::from_points(&points)
    }
}

impl From<Quadrilateral> for Vec<[f64; 2]> {
    fn from(q: Quadrilateral) -> Self {
        q.to_array().to_vec()
    }
}
