//! Closed-form camera intrinsics and distortion from planar pattern views.

use crate::{CalibrationError, LensCalibParams};
use nalgebra::{DMatrix, DVector, Matrix3, SVector, Vector3};
use tablecast_core::{estimate_homography, Distortion, Homography, LensIntrinsics, Point};

/// One observation of the calibration board.
#[derive(Clone, Debug)]
pub struct PatternView {
    /// Board-plane coordinates (z = 0), row-major.
    pub board: Vec<Point>,
    /// Matching observed camera pixels (distorted).
    pub image: Vec<Point>,
    /// Board → camera homography fitted to the observed pixels.
    pub homography: Homography,
}

impl PatternView {
    pub fn new(board: Vec<Point>, image: Vec<Point>) -> Result<Self, CalibrationError> {
        let homography =
            estimate_homography(&board, &image).ok_or(CalibrationError::DegenerateIntrinsics)?;
        Ok(Self {
            board,
            image,
            homography,
        })
    }
}

/// Board points of a `cols × rows` inner-corner grid, row-major.
pub fn board_points(cols: usize, rows: usize, square_size: f64) -> Vec<Point> {
    (0..rows)
        .flat_map(|r| {
            (0..cols).map(move |c| Point::new(c as f64 * square_size, r as f64 * square_size))
        })
        .collect()
}

fn v_ij(h: &Matrix3<f64>, i: usize, j: usize) -> SVector<f64, 6> {
    let hi = h.column(i);
    let hj = h.column(j);
    SVector::<f64, 6>::from_row_slice(&[
        hi[0] * hj[0],
        hi[0] * hj[1] + hi[1] * hj[0],
        hi[1] * hj[1],
        hi[2] * hj[0] + hi[0] * hj[2],
        hi[2] * hj[1] + hi[1] * hj[2],
        hi[2] * hj[2],
    ])
}

fn finite_positive(v: f64) -> Result<f64, CalibrationError> {
    if v.is_finite() && v > 0.0 {
        Ok(v)
    } else {
        Err(CalibrationError::DegenerateIntrinsics)
    }
}

/// Zhang's closed form from three or more homographies.
fn zhang_camera_matrix(homographies: &[Matrix3<f64>]) -> Result<LensIntrinsics, CalibrationError> {
    if homographies.len() < 3 {
        return Err(CalibrationError::DegenerateIntrinsics);
    }
    let mut v = DMatrix::<f64>::zeros(2 * homographies.len(), 6);
    for (k, h) in homographies.iter().enumerate() {
        let v11 = v_ij(h, 0, 0);
        let v22 = v_ij(h, 1, 1);
        let v12 = v_ij(h, 0, 1);
        v.row_mut(2 * k).copy_from(&v12.transpose());
        v.row_mut(2 * k + 1).copy_from(&(v11 - v22).transpose());
    }

    let svd = v.svd(false, true);
    let v_t = svd.v_t.ok_or(CalibrationError::DegenerateIntrinsics)?;
    let last = v_t
        .nrows()
        .checked_sub(1)
        .ok_or(CalibrationError::DegenerateIntrinsics)?;
    let b = v_t.row(last);
    let (b11, b12, b22, b13, b23, b33) = (b[0], b[1], b[2], b[3], b[4], b[5]);

    let denom = b11 * b22 - b12 * b12;
    let denom_norm = b11 * b11 + b22 * b22;
    if denom_norm <= 0.0 || denom.abs() / denom_norm <= 1e-6 {
        return Err(CalibrationError::DegenerateIntrinsics);
    }

    let v0 = (b12 * b13 - b11 * b23) / denom;
    let lambda = b33 - (b13 * b13 + v0 * (b12 * b13 - b11 * b23)) / b11;
    if lambda.signum() != b11.signum() {
        return Err(CalibrationError::DegenerateIntrinsics);
    }

    let alpha = finite_positive((lambda / b11).sqrt())?;
    let beta = finite_positive((lambda * b11 / denom).sqrt())?;
    let gamma = -b12 * alpha * alpha * beta / lambda;
    let u0 = gamma * v0 / beta - b13 * alpha * alpha / lambda;

    Ok(LensIntrinsics {
        fx: alpha,
        fy: beta,
        cx: u0,
        cy: v0,
        skew: gamma,
        distortion: Distortion::default(),
    })
}

/// Focal length from one homography, with the principal point fixed at the
/// image centre and square pixels.
///
/// Orthogonality and equal norm of the first two rotation columns each give a
/// linear equation in `1/f²`; both are combined in least squares.
fn single_view_camera_matrix(
    h: &Matrix3<f64>,
    width: u32,
    height: u32,
) -> Result<LensIntrinsics, CalibrationError> {
    let cx = width as f64 / 2.0;
    let cy = height as f64 / 2.0;
    let t_inv = Matrix3::new(1.0, 0.0, -cx, 0.0, 1.0, -cy, 0.0, 0.0, 1.0);
    let hc = t_inv * h;
    let a = hc.column(0);
    let b = hc.column(1);

    let p1 = a[0] * b[0] + a[1] * b[1];
    let q1 = a[2] * b[2];
    let p2 = a[0] * a[0] + a[1] * a[1] - b[0] * b[0] - b[1] * b[1];
    let q2 = a[2] * a[2] - b[2] * b[2];

    let den = p1 * p1 + p2 * p2;
    let scale = a[0] * a[0] + a[1] * a[1] + b[0] * b[0] + b[1] * b[1];
    if den <= 1e-10 * scale * scale {
        return Err(CalibrationError::DegenerateIntrinsics);
    }
    let inv_f2 = finite_positive(-(p1 * q1 + p2 * q2) / den)?;
    let f = finite_positive(1.0 / inv_f2.sqrt())?;

    Ok(LensIntrinsics {
        fx: f,
        fy: f,
        cx,
        cy,
        skew: 0.0,
        distortion: Distortion::default(),
    })
}

/// Linear least-squares Brown-Conrady fit on normalized homography residuals.
fn fit_distortion(
    lens: &LensIntrinsics,
    views: &[PatternView],
    params: &LensCalibParams,
) -> Result<Distortion, CalibrationError> {
    let k = Matrix3::new(
        lens.fx, lens.skew, lens.cx, //
        0.0, lens.fy, lens.cy, //
        0.0, 0.0, 1.0,
    );
    let k_inv = k.try_inverse().ok_or(CalibrationError::DegenerateIntrinsics)?;

    let n_params = 2 + usize::from(!params.fix_k3) + if params.fix_tangential { 0 } else { 2 };
    let total: usize = views.iter().map(|v| v.board.len()).sum();
    if total * 2 < n_params + 2 {
        return Err(CalibrationError::DegenerateIntrinsics);
    }

    let normalize = |p: Point| {
        let n = k_inv * Vector3::new(p.x, p.y, 1.0);
        (n.x / n.z, n.y / n.z)
    };

    let mut a = DMatrix::<f64>::zeros(2 * total, n_params);
    let mut rhs = DVector::<f64>::zeros(2 * total);
    let mut max_r2 = 0.0f64;
    let mut row = 0;
    for view in views {
        for (board, observed) in view.board.iter().zip(&view.image) {
            let (x, y) = normalize(view.homography.apply(*board));
            let (ox, oy) = normalize(*observed);
            let r2 = x * x + y * y;
            max_r2 = max_r2.max(r2);

            let mut col = 0;
            a[(row, col)] = x * r2;
            a[(row + 1, col)] = y * r2;
            col += 1;
            a[(row, col)] = x * r2 * r2;
            a[(row + 1, col)] = y * r2 * r2;
            col += 1;
            if !params.fix_k3 {
                a[(row, col)] = x * r2 * r2 * r2;
                a[(row + 1, col)] = y * r2 * r2 * r2;
                col += 1;
            }
            if !params.fix_tangential {
                a[(row, col)] = 2.0 * x * y;
                a[(row + 1, col)] = r2 + 2.0 * y * y;
                col += 1;
                a[(row, col)] = r2 + 2.0 * x * x;
                a[(row + 1, col)] = 2.0 * x * y;
            }
            rhs[row] = ox - x;
            rhs[row + 1] = oy - y;
            row += 2;
        }
    }
    if max_r2 < 1e-6 {
        return Err(CalibrationError::DegenerateIntrinsics);
    }

    let sol = a
        .svd(true, true)
        .solve(&rhs, 1e-10)
        .map_err(|_| CalibrationError::DegenerateIntrinsics)?;

    let mut d = Distortion {
        k1: sol[0],
        k2: sol[1],
        ..Distortion::default()
    };
    let mut col = 2;
    if !params.fix_k3 {
        d.k3 = sol[col];
        col += 1;
    }
    if !params.fix_tangential {
        d.p1 = sol[col];
        d.p2 = sol[col + 1];
    }
    Ok(d)
}

/// Solve intrinsics and distortion from the accumulated views.
///
/// With at least `params.min_views_for_full_intrinsics` views (and never fewer
/// than three) the full camera matrix is solved; otherwise a single-view focal
/// estimate is used.
pub fn solve_intrinsics(
    views: &[PatternView],
    image_width: u32,
    image_height: u32,
    params: &LensCalibParams,
) -> Result<LensIntrinsics, CalibrationError> {
    let latest = views.last().ok_or(CalibrationError::DegenerateIntrinsics)?;

    let mut lens = if views.len() >= params.min_views_for_full_intrinsics.max(3) {
        let hs: Vec<Matrix3<f64>> = views.iter().map(|v| v.homography.h).collect();
        zhang_camera_matrix(&hs)?
    } else {
        single_view_camera_matrix(&latest.homography.h, image_width, image_height)?
    };

    lens.distortion = fit_distortion(&lens, views, params)?;
    log::info!(
        "lens: fx={:.1} fy={:.1} cx={:.1} cy={:.1} k1={:.4} k2={:.4} ({} views)",
        lens.fx,
        lens.fy,
        lens.cx,
        lens.cy,
        lens.distortion.k1,
        lens.distortion.k2,
        views.len()
    );
    Ok(lens)
}
