//! Polygon moments, Hu invariants and moment-based shape distance.
//!
//! Moments are integrated exactly over the polygon interior with Green's
//! theorem, so they depend on the enclosed region rather than on how densely
//! the boundary is sampled.

use crate::error::GeometryError;
use crate::Point;
use serde::{Deserialize, Serialize};

const AREA_EPS: f64 = 1e-9;
const HU_EPS: f64 = 1e-5;

/// Raw spatial moments up to third order.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Moments {
    pub m00: f64,
    pub m10: f64,
    pub m01: f64,
    pub m20: f64,
    pub m11: f64,
    pub m02: f64,
    pub m30: f64,
    pub m21: f64,
    pub m12: f64,
    pub m03: f64,
}

/// Central moments (second and third order).
#[derive(Clone, Copy, Debug, Default, PartialEq)]
struct Central {
    mu20: f64,
    mu11: f64,
    mu02: f64,
    mu30: f64,
    mu21: f64,
    mu12: f64,
    mu03: f64,
}

impl Moments {
    /// Area-weighted centroid `(m10/m00, m01/m00)`.
    pub fn centroid(&self) -> Result<Point, GeometryError> {
        if self.m00.abs() < AREA_EPS {
            return Err(GeometryError::DegenerateMoments);
        }
        Ok(Point::new(self.m10 / self.m00, self.m01 / self.m00))
    }

    fn central(&self) -> Result<Central, GeometryError> {
        let c = self.centroid()?;
        let (cx, cy) = (c.x, c.y);
        let mu20 = self.m20 - cx * self.m10;
        let mu11 = self.m11 - cx * self.m01;
        let mu02 = self.m02 - cy * self.m01;
        Ok(Central {
            mu20,
            mu11,
            mu02,
            mu30: self.m30 - cx * (3.0 * mu20 + cx * self.m10),
            mu21: self.m21 - cx * (2.0 * mu11 + cx * self.m01) - cy * mu20,
            mu12: self.m12 - cy * (2.0 * mu11 + cy * self.m10) - cx * mu02,
            mu03: self.m03 - cy * (3.0 * mu02 + cy * self.m01),
        })
    }
}

/// Moments of the region bounded by `poly`, independent of winding direction.
pub fn polygon_moments(poly: &[Point]) -> Moments {
    let n = poly.len();
    if n < 3 {
        return Moments::default();
    }

    let mut a = [0.0f64; 10];
    let mut prev = poly[n - 1];
    for &cur in poly {
        let (x0, y0) = (prev.x, prev.y);
        let (x1, y1) = (cur.x, cur.y);
        let x0s = x0 * x0;
        let y0s = y0 * y0;
        let x1s = x1 * x1;
        let y1s = y1 * y1;
        let dxy = x0 * y1 - x1 * y0;
        let xs = x0 + x1;
        let ys = y0 + y1;

        a[0] += dxy;
        a[1] += dxy * xs;
        a[2] += dxy * ys;
        a[3] += dxy * (x0 * xs + x1s);
        a[4] += dxy * (x0 * (ys + y0) + x1 * (ys + y1));
        a[5] += dxy * (y0 * ys + y1s);
        a[6] += dxy * xs * (x0s + x1s);
        a[7] += dxy * (x0s * (3.0 * y0 + y1) + 2.0 * x1 * x0 * ys + x1s * (y0 + 3.0 * y1));
        a[8] += dxy * (y0s * (3.0 * x0 + x1) + 2.0 * y1 * y0 * xs + y1s * (x0 + 3.0 * x1));
        a[9] += dxy * ys * (y0s + y1s);

        prev = cur;
    }

    let sign = if a[0] < 0.0 { -1.0 } else { 1.0 };
    Moments {
        m00: sign * a[0] / 2.0,
        m10: sign * a[1] / 6.0,
        m01: sign * a[2] / 6.0,
        m20: sign * a[3] / 12.0,
        m11: sign * a[4] / 24.0,
        m02: sign * a[5] / 12.0,
        m30: sign * a[6] / 20.0,
        m21: sign * a[7] / 60.0,
        m12: sign * a[8] / 60.0,
        m03: sign * a[9] / 20.0,
    }
}

/// The seven Hu invariants of scale-normalized central moments.
pub fn hu_invariants(m: &Moments) -> Result<[f64; 7], GeometryError> {
    let c = m.central()?;
    let s2 = 1.0 / (m.m00 * m.m00);
    let s3 = s2 / m.m00.sqrt();

    let n20 = c.mu20 * s2;
    let n11 = c.mu11 * s2;
    let n02 = c.mu02 * s2;
    let n30 = c.mu30 * s3;
    let n21 = c.mu21 * s3;
    let n12 = c.mu12 * s3;
    let n03 = c.mu03 * s3;

    let t0 = n30 + n12;
    let t1 = n21 + n03;
    let q0 = n20 - n02;
    let q1 = n30 - 3.0 * n12;
    let q2 = 3.0 * n21 - n03;

    Ok([
        n20 + n02,
        q0 * q0 + 4.0 * n11 * n11,
        q1 * q1 + q2 * q2,
        t0 * t0 + t1 * t1,
        q1 * t0 * (t0 * t0 - 3.0 * t1 * t1) + q2 * t1 * (3.0 * t0 * t0 - t1 * t1),
        q0 * (t0 * t0 - t1 * t1) + 4.0 * n11 * t0 * t1,
        q2 * t0 * (t0 * t0 - 3.0 * t1 * t1) - q1 * t1 * (3.0 * t0 * t0 - t1 * t1),
    ])
}

/// Hu-moment distance flavour. Lower scores mean more similar shapes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShapeMetric {
    /// `Σ |1/mA - 1/mB|`
    #[default]
    I1,
    /// `Σ |mA - mB|`
    I2,
    /// `max |mA - mB| / |mA|`
    I3,
}

/// Distance between two contours on log-scaled Hu invariants.
///
/// Invariant to translation, rotation and uniform scale. Invariants with
/// magnitude below `1e-5` on either side are skipped.
pub fn match_shapes(a: &[Point], b: &[Point], metric: ShapeMetric) -> Result<f64, GeometryError> {
    let ha = hu_invariants(&polygon_moments(a))?;
    let hb = hu_invariants(&polygon_moments(b))?;

    let mut score = 0.0f64;
    for (&va, &vb) in ha.iter().zip(hb.iter()) {
        let (aa, ab) = (va.abs(), vb.abs());
        if aa <= HU_EPS || ab <= HU_EPS {
            continue;
        }
        let ma = va.signum() * aa.log10();
        let mb = vb.signum() * ab.log10();
        match metric {
            ShapeMetric::I1 => score += (1.0 / ma - 1.0 / mb).abs(),
            ShapeMetric::I2 => score += (ma - mb).abs(),
            ShapeMetric::I3 => score = score.max(((ma - mb) / ma).abs()),
        }
    }
    Ok(score)
}

/// Centroid from polygon moments plus the angle, in degrees within `[0, 360)`,
/// from the centroid to the contour point farthest from it.
pub fn centroid_and_orientation(contour: &[Point]) -> Result<(Point, f64), GeometryError> {
    let centroid = polygon_moments(contour).centroid()?;

    let mut far = None;
    let mut best = -1.0f64;
    for p in contour {
        let d = (*p - centroid).norm_squared();
        if d > best {
            best = d;
            far = Some(*p);
        }
    }
    let far = far.ok_or(GeometryError::DegenerateMoments)?;
    let angle = (far.y - centroid.y)
        .atan2(far.x - centroid.x)
        .to_degrees()
        .rem_euclid(360.0);
    // rem_euclid may round a tiny negative up to 360.0
    let angle = if angle >= 360.0 { 0.0 } else { angle };
    Ok((centroid, angle))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::rotate_point;
    use approx::assert_relative_eq;

    fn square(side: f64) -> Vec<Point> {
        vec![
            Point::new(0.0, 0.0),
            Point::new(side, 0.0),
            Point::new(side, side),
            Point::new(0.0, side),
        ]
    }

    fn transform(poly: &[Point], angle_deg: f64, scale: f64, dx: f64, dy: f64) -> Vec<Point> {
        poly.iter()
            .map(|&p| {
                let r = rotate_point(p, Point::origin(), angle_deg);
                Point::new(r.x * scale + dx, r.y * scale + dy)
            })
            .collect()
    }

    #[test]
    fn rectangle_moments_match_closed_form() {
        let rect = vec![
            Point::new(1.0, 2.0),
            Point::new(5.0, 2.0),
            Point::new(5.0, 4.0),
            Point::new(1.0, 4.0),
        ];
        let m = polygon_moments(&rect);
        assert_relative_eq!(m.m00, 8.0, epsilon = 1e-9);
        let c = m.centroid().expect("non-degenerate");
        assert_relative_eq!(c.x, 3.0, epsilon = 1e-9);
        assert_relative_eq!(c.y, 3.0, epsilon = 1e-9);

        // winding must not matter
        let rev: Vec<Point> = rect.iter().rev().copied().collect();
        let mr = polygon_moments(&rev);
        assert_relative_eq!(mr.m00, m.m00, epsilon = 1e-9);
        assert_relative_eq!(mr.m21, m.m21, epsilon = 1e-9);
    }

    #[test]
    fn degenerate_contour_reports_error() {
        let line = vec![Point::new(0.0, 0.0), Point::new(5.0, 0.0), Point::new(10.0, 0.0)];
        assert_eq!(
            centroid_and_orientation(&line),
            Err(GeometryError::DegenerateMoments)
        );
        assert!(match_shapes(&line, &square(1.0), ShapeMetric::I1).is_err());
    }

    #[test]
    fn square_matches_itself_under_rotation_and_translation() {
        let unit = square(1.0);
        let moved = transform(&unit, 90.0, 1.0, 40.0, -7.0);
        for metric in [ShapeMetric::I1, ShapeMetric::I2, ShapeMetric::I3] {
            let s = match_shapes(&unit, &moved, metric).expect("score");
            assert!(s < 1e-6, "{metric:?}: {s}");
        }
    }

    #[test]
    fn metric_is_scale_invariant() {
        let unit = square(1.0);
        let big = transform(&unit, 30.0, 3.0, 10.0, 10.0);
        let s = match_shapes(&unit, &big, ShapeMetric::I1).expect("score");
        assert!(s < 1e-6, "score {s}");
    }

    #[test]
    fn different_shapes_score_higher() {
        let unit = square(10.0);
        let triangle = vec![
            Point::new(0.0, 0.0),
            Point::new(10.0, 0.0),
            Point::new(0.0, 10.0),
        ];
        let slab = vec![
            Point::new(0.0, 0.0),
            Point::new(40.0, 0.0),
            Point::new(40.0, 5.0),
            Point::new(0.0, 5.0),
        ];
        let tri = match_shapes(&unit, &triangle, ShapeMetric::I1).expect("score");
        let long = match_shapes(&unit, &slab, ShapeMetric::I1).expect("score");
        assert!(tri > 0.15, "triangle {tri}");
        assert!(long > 1.0, "slab {long}");
    }

    #[test]
    fn orientation_points_at_the_farthest_vertex() {
        let kite = vec![
            Point::new(0.0, 0.0),
            Point::new(10.0, -2.0),
            Point::new(30.0, 0.0),
            Point::new(10.0, 2.0),
        ];
        let (c, angle) = centroid_and_orientation(&kite).expect("pose");
        assert!(c.x > 0.0 && c.x < 30.0);
        assert_relative_eq!(angle, 0.0, epsilon = 1e-9);

        let turned = transform(&kite, 90.0, 1.0, 0.0, 0.0);
        let (_, angle) = centroid_and_orientation(&turned).expect("pose");
        assert_relative_eq!(angle, 90.0, epsilon = 1e-6);
    }
}
