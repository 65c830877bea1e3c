//! Chessboard pattern corners in the rectified image.

use crate::{CalibrationError, LensCalibParams};
use chess_corners::{find_chess_corners_image, ChessConfig};
use image::GrayImage;
use nalgebra::{Matrix2, Vector2};
use tablecast_core::Point;

#[cfg(feature = "tracing")]
use tracing::instrument;

fn chess_config(params: &LensCalibParams) -> ChessConfig {
    let mut cfg = ChessConfig::single_scale();
    cfg.params.threshold_rel = params.corner_threshold_rel as _;
    cfg.params.nms_radius = params.corner_nms_radius as _;
    cfg
}

/// Arrange `points` into row-major grid order (top row first, left to right).
///
/// The board is assumed roughly axis aligned, which holds in the rectified
/// canvas. Returns `None` when rows overlap vertically.
pub(crate) fn order_grid(points: &[Point], cols: usize, rows: usize) -> Option<Vec<Point>> {
    if cols == 0 || rows == 0 || points.len() != cols * rows {
        return None;
    }
    let mut by_y = points.to_vec();
    by_y.sort_by(|a, b| a.y.total_cmp(&b.y));

    let mut grid = Vec::with_capacity(points.len());
    let mut prev_max_y = f64::NEG_INFINITY;
    for row in by_y.chunks(cols) {
        let min_y = row.iter().map(|p| p.y).fold(f64::INFINITY, f64::min);
        let max_y = row.iter().map(|p| p.y).fold(f64::NEG_INFINITY, f64::max);
        if min_y <= prev_max_y {
            return None;
        }
        prev_max_y = max_y;

        let mut sorted = row.to_vec();
        sorted.sort_by(|a, b| a.x.total_cmp(&b.x));
        grid.extend(sorted);
    }

    // Rows must be separated by more than their own vertical spread.
    for r in 1..rows {
        let above = &grid[(r - 1) * cols..r * cols];
        let below = &grid[r * cols..(r + 1) * cols];
        let gap = below.iter().map(|p| p.y).sum::<f64>() / cols as f64
            - above.iter().map(|p| p.y).sum::<f64>() / cols as f64;
        let spread = below
            .iter()
            .map(|p| p.y)
            .fold(f64::NEG_INFINITY, f64::max)
            - below.iter().map(|p| p.y).fold(f64::INFINITY, f64::min);
        if gap <= spread {
            return None;
        }
    }
    Some(grid)
}

#[inline]
fn px(img: &GrayImage, x: i64, y: i64) -> f64 {
    let xc = x.clamp(0, img.width() as i64 - 1) as u32;
    let yc = y.clamp(0, img.height() as i64 - 1) as u32;
    img.get_pixel(xc, yc)[0] as f64
}

/// Gradient-orthogonality refinement of a saddle point.
///
/// Every pixel `p` in the window satisfies `g(p)ᵀ (q - p) ≈ 0` at the true
/// corner `q`; the normal equations are solved iteratively.
pub(crate) fn refine_corner_subpix(
    img: &GrayImage,
    start: Point,
    half_window: u32,
    max_iters: usize,
) -> Point {
    if img.width() < 3 || img.height() < 3 {
        return start;
    }
    let hw = half_window as i64;
    let mut q = Vector2::new(start.x, start.y);

    for _ in 0..max_iters {
        let cx = q.x.round() as i64;
        let cy = q.y.round() as i64;
        let mut a = Matrix2::<f64>::zeros();
        let mut b = Vector2::<f64>::zeros();
        for y in (cy - hw)..=(cy + hw) {
            for x in (cx - hw)..=(cx + hw) {
                let gx = 0.5 * (px(img, x + 1, y) - px(img, x - 1, y));
                let gy = 0.5 * (px(img, x, y + 1) - px(img, x, y - 1));
                let g = Vector2::new(gx, gy);
                let ggt = g * g.transpose();
                a += ggt;
                b += ggt * Vector2::new(x as f64, y as f64);
            }
        }
        let Some(next) = a.try_inverse().map(|inv| inv * b) else {
            break;
        };
        if (next - Vector2::new(start.x, start.y)).amax() > half_window as f64 {
            // ran off the window: keep the detector's estimate
            return start;
        }
        let shift = (next - q).norm();
        q = next;
        if shift < 1e-3 {
            break;
        }
    }
    Point::new(q.x, q.y)
}

/// Detect exactly `cols × rows` inner corners, refine them, and return them
/// in row-major order.
#[cfg_attr(
    feature = "tracing",
    instrument(level = "info", skip(gray, params), fields(width = gray.width(), height = gray.height()))
)]
pub fn find_pattern_corners(
    gray: &GrayImage,
    params: &LensCalibParams,
) -> Result<Vec<Point>, CalibrationError> {
    let expected = params.expected_corners();
    let raw: Vec<Point> = find_chess_corners_image(gray, &chess_config(params))
        .iter()
        .map(|c| Point::new(c.x as f64, c.y as f64))
        .collect();
    log::debug!("pattern: {} raw corners, expecting {expected}", raw.len());

    if raw.len() != expected {
        return Err(CalibrationError::PatternMissing {
            found: raw.len(),
            expected,
        });
    }

    let ordered = order_grid(&raw, params.pattern_cols, params.pattern_rows).ok_or(
        CalibrationError::PatternMissing {
            found: raw.len(),
            expected,
        },
    )?;

    Ok(ordered
        .into_iter()
        .map(|p| refine_corner_subpix(gray, p, params.subpix_window, params.subpix_iters))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    #[test]
    fn grid_is_ordered_row_major() {
        let mut pts = Vec::new();
        for r in 0..3 {
            for c in 0..4 {
                // slight tilt and jitter
                pts.push(Point::new(
                    10.0 + c as f64 * 20.0,
                    15.0 + r as f64 * 20.0 + c as f64 * 0.7,
                ));
            }
        }
        pts.reverse();
        pts.swap(2, 7);
        let grid = order_grid(&pts, 4, 3).expect("grid");
        let near = |p: Point, x: f64, y: f64| (p.x - x).abs() < 1e-9 && (p.y - y).abs() < 1e-9;
        assert!(near(grid[0], 10.0, 15.0));
        assert!(near(grid[3], 70.0, 17.1));
        assert!(near(grid[4], 10.0, 35.0));
        assert!(near(grid[11], 70.0, 57.1));
    }

    #[test]
    fn overlapping_rows_are_rejected() {
        let pts: Vec<Point> = [0.0, 1.0, 2.0, 3.0, 30.0, 31.0]
            .iter()
            .enumerate()
            .map(|(i, &y)| Point::new(i as f64 * 10.0, y))
            .collect();
        assert!(order_grid(&pts, 3, 2).is_none());
        assert!(order_grid(&pts, 4, 2).is_none());
    }

    #[test]
    fn subpix_pulls_toward_checker_saddle() {
        // 2×2 checker with the saddle at (20, 20) in pixel-edge coordinates,
        // which is (19.5, 19.5) in pixel-center coordinates.
        let img = GrayImage::from_fn(40, 40, |x, y| {
            if (x < 20) ^ (y < 20) {
                Luma([230])
            } else {
                Luma([20])
            }
        });
        let refined = refine_corner_subpix(&img, Point::new(21.0, 18.0), 4, 20);
        assert!((refined.x - 19.5).abs() < 0.3, "{refined:?}");
        assert!((refined.y - 19.5).abs() < 0.3, "{refined:?}");
    }
}
