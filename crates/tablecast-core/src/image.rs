use crate::color::rgb_to_hue;
use ::image::{GrayImage, RgbImage};

#[inline]
fn get_gray(src: &GrayImage, x: i64, y: i64) -> f64 {
    if x < 0 || y < 0 || x >= src.width() as i64 || y >= src.height() as i64 {
        return 0.0;
    }
    src.get_pixel(x as u32, y as u32)[0] as f64
}

#[inline]
fn get_rgb(src: &RgbImage, x: i64, y: i64) -> [f64; 3] {
    if x < 0 || y < 0 || x >= src.width() as i64 || y >= src.height() as i64 {
        return [0.0; 3];
    }
    let p = src.get_pixel(x as u32, y as u32);
    [p[0] as f64, p[1] as f64, p[2] as f64]
}

/// Bilinear sample at pixel-index coordinates; outside the image reads as black.
#[inline]
pub fn sample_bilinear_gray(src: &GrayImage, x: f64, y: f64) -> f64 {
    if !x.is_finite() || !y.is_finite() {
        return 0.0;
    }
    let x0 = x.floor() as i64;
    let y0 = y.floor() as i64;
    let fx = x - x0 as f64;
    let fy = y - y0 as f64;

    let p00 = get_gray(src, x0, y0);
    let p10 = get_gray(src, x0 + 1, y0);
    let p01 = get_gray(src, x0, y0 + 1);
    let p11 = get_gray(src, x0 + 1, y0 + 1);

    let a = p00 + fx * (p10 - p00);
    let b = p01 + fx * (p11 - p01);
    a + fy * (b - a)
}

/// Per-channel bilinear sample; same conventions as [`sample_bilinear_gray`].
#[inline]
pub fn sample_bilinear_rgb(src: &RgbImage, x: f64, y: f64) -> [f64; 3] {
    if !x.is_finite() || !y.is_finite() {
        return [0.0; 3];
    }
    let x0 = x.floor() as i64;
    let y0 = y.floor() as i64;
    let fx = x - x0 as f64;
    let fy = y - y0 as f64;

    let p00 = get_rgb(src, x0, y0);
    let p10 = get_rgb(src, x0 + 1, y0);
    let p01 = get_rgb(src, x0, y0 + 1);
    let p11 = get_rgb(src, x0 + 1, y0 + 1);

    let mut out = [0.0; 3];
    for c in 0..3 {
        let a = p00[c] + fx * (p10[c] - p00[c]);
        let b = p01[c] + fx * (p11[c] - p01[c]);
        out[c] = a + fy * (b - a);
    }
    out
}

/// Hue of the mean color in a `(2r+1)²` window around `(x, y)`.
///
/// Pixels outside the image are skipped. Returns `None` when the window misses
/// the image entirely.
pub fn mean_hue_at(src: &RgbImage, x: f64, y: f64, radius: u32) -> Option<f64> {
    let cx = x.round() as i64;
    let cy = y.round() as i64;
    let r = radius as i64;
    let mut sum = [0.0f64; 3];
    let mut count = 0usize;
    for yy in (cy - r)..=(cy + r) {
        for xx in (cx - r)..=(cx + r) {
            if xx < 0 || yy < 0 || xx >= src.width() as i64 || yy >= src.height() as i64 {
                continue;
            }
            let p = src.get_pixel(xx as u32, yy as u32);
            sum[0] += p[0] as f64;
            sum[1] += p[1] as f64;
            sum[2] += p[2] as f64;
            count += 1;
        }
    }
    if count == 0 {
        return None;
    }
    let n = count as f64 * 255.0;
    Some(rgb_to_hue([sum[0] / n, sum[1] / n, sum[2] / n]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ::image::{Luma, Rgb};

    #[test]
    fn bilinear_interpolates_between_neighbours() {
        let img = GrayImage::from_fn(2, 1, |x, _| Luma([if x == 0 { 0 } else { 100 }]));
        assert!((sample_bilinear_gray(&img, 0.25, 0.0) - 25.0).abs() < 1e-9);
        assert_eq!(sample_bilinear_gray(&img, -3.0, 0.0), 0.0);
    }

    #[test]
    fn hue_window_ignores_out_of_bounds() {
        let img = RgbImage::from_pixel(4, 4, Rgb([0, 0, 255]));
        let hue = mean_hue_at(&img, 0.0, 0.0, 2).expect("inside");
        assert!((hue - 2.0 / 3.0).abs() < 1e-9);
        assert!(mean_hue_at(&img, -10.0, -10.0, 1).is_none());
    }
}
