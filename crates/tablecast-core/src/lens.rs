//! Pinhole intrinsics with Brown-Conrady distortion.

use crate::image::sample_bilinear_rgb;
use crate::Point;
use ::image::{Rgb, RgbImage};
use serde::{Deserialize, Serialize};

#[cfg(feature = "tracing")]
use tracing::instrument;

const UNDISTORT_ITERS: usize = 30;
const UNDISTORT_EPS: f64 = 1e-12;

/// Radial (`k1`, `k2`, `k3`) and tangential (`p1`, `p2`) coefficients.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct Distortion {
    pub k1: f64,
    pub k2: f64,
    pub p1: f64,
    pub p2: f64,
    pub k3: f64,
}

impl Distortion {
    /// Coefficients in the conventional `[k1, k2, p1, p2, k3]` order.
    pub fn coefficients(&self) -> [f64; 5] {
        [self.k1, self.k2, self.p1, self.p2, self.k3]
    }

    pub fn is_zero(&self) -> bool {
        self.coefficients().iter().all(|c| *c == 0.0)
    }

    /// Ideal normalized coordinates → distorted normalized coordinates.
    pub fn distort_normalized(&self, x: f64, y: f64) -> (f64, f64) {
        let r2 = x * x + y * y;
        let r4 = r2 * r2;
        let r6 = r4 * r2;
        let radial = 1.0 + self.k1 * r2 + self.k2 * r4 + self.k3 * r6;
        let x_tan = 2.0 * self.p1 * x * y + self.p2 * (r2 + 2.0 * x * x);
        let y_tan = self.p1 * (r2 + 2.0 * y * y) + 2.0 * self.p2 * x * y;
        (x * radial + x_tan, y * radial + y_tan)
    }

    /// Fixed-point inversion of [`Distortion::distort_normalized`].
    pub fn undistort_normalized(&self, xd: f64, yd: f64) -> (f64, f64) {
        let (mut x, mut y) = (xd, yd);
        for _ in 0..UNDISTORT_ITERS {
            let r2 = x * x + y * y;
            let radial = 1.0 + self.k1 * r2 + self.k2 * r2 * r2 + self.k3 * r2 * r2 * r2;
            if radial.abs() < 1e-12 || !radial.is_finite() {
                break;
            }
            let x_tan = 2.0 * self.p1 * x * y + self.p2 * (r2 + 2.0 * x * x);
            let y_tan = self.p1 * (r2 + 2.0 * y * y) + 2.0 * self.p2 * x * y;
            let nx = (xd - x_tan) / radial;
            let ny = (yd - y_tan) / radial;
            let delta = (nx - x).hypot(ny - y);
            x = nx;
            y = ny;
            if delta < UNDISTORT_EPS {
                break;
            }
        }
        (x, y)
    }
}

/// Camera matrix entries plus distortion, in camera pixel units.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct LensIntrinsics {
    pub fx: f64,
    pub fy: f64,
    pub cx: f64,
    pub cy: f64,
    pub skew: f64,
    pub distortion: Distortion,
}

impl LensIntrinsics {
    /// Row-major `K`.
    pub fn camera_matrix(&self) -> [[f64; 3]; 3] {
        [
            [self.fx, self.skew, self.cx],
            [0.0, self.fy, self.cy],
            [0.0, 0.0, 1.0],
        ]
    }

    pub fn distortion_coefficients(&self) -> [f64; 5] {
        self.distortion.coefficients()
    }

    fn to_normalized(&self, p: Point) -> (f64, f64) {
        let y = (p.y - self.cy) / self.fy;
        let x = (p.x - self.cx - self.skew * y) / self.fx;
        (x, y)
    }

    fn to_pixel(&self, x: f64, y: f64) -> Point {
        Point::new(self.fx * x + self.skew * y + self.cx, self.fy * y + self.cy)
    }

    /// Observed (distorted) pixel → ideal pinhole pixel.
    pub fn undistort_pixel(&self, p: Point) -> Point {
        let (xd, yd) = self.to_normalized(p);
        let (x, y) = self.distortion.undistort_normalized(xd, yd);
        self.to_pixel(x, y)
    }

    /// Ideal pinhole pixel → observed (distorted) pixel.
    pub fn distort_pixel(&self, p: Point) -> Point {
        let (x, y) = self.to_normalized(p);
        let (xd, yd) = self.distortion.distort_normalized(x, y);
        self.to_pixel(xd, yd)
    }
}

/// Remove lens distortion from a full frame, keeping the same camera matrix.
///
/// Every output pixel is pulled from its distorted location in `frame`.
#[cfg_attr(feature = "tracing", instrument(level = "debug", skip(frame, lens), fields(w = frame.width(), h = frame.height())))]
pub fn undistort_image(frame: &RgbImage, lens: &LensIntrinsics) -> RgbImage {
    if lens.distortion.is_zero() {
        return frame.clone();
    }
    RgbImage::from_fn(frame.width(), frame.height(), |x, y| {
        let src = lens.distort_pixel(Point::new(x as f64, y as f64));
        let [r, g, b] = sample_bilinear_rgb(frame, src.x, src.y);
        Rgb([
            r.round().clamp(0.0, 255.0) as u8,
            g.round().clamp(0.0, 255.0) as u8,
            b.round().clamp(0.0, 255.0) as u8,
        ])
    })
}
