//! Locating the projected screen quad in a camera frame.

use crate::{CalibrationError, SurfaceDetectParams};
use image::{GrayImage, Luma, RgbImage};
use tablecast_core::{
    approximate_polygon, bounding_box, external_contours, is_convex, order_corners, polygon_area,
    polygon_arc_length, Contour, Point,
};

#[cfg(feature = "tracing")]
use tracing::instrument;

fn binarize(gray: &GrayImage, threshold: u8) -> GrayImage {
    GrayImage::from_fn(gray.width(), gray.height(), |x, y| {
        if gray.get_pixel(x, y)[0] > threshold {
            Luma([255])
        } else {
            Luma([0])
        }
    })
}

fn largest_contour(contours: Vec<Contour>) -> Option<Contour> {
    contours
        .into_iter()
        .max_by(|a, b| polygon_area(a).total_cmp(&polygon_area(b)))
}

/// Accept `contour` if it simplifies to a convex, large enough quad lying
/// strictly inside the frame.
fn as_screen_quad(
    contour: &[Point],
    width: u32,
    height: u32,
    params: &SurfaceDetectParams,
) -> Option<[Point; 4]> {
    let eps = params.approx_epsilon_frac * polygon_arc_length(contour);
    let poly = approximate_polygon(contour, eps);
    if poly.len() != 4 || !is_convex(&poly) {
        return None;
    }
    if polygon_area(&poly) <= params.min_area_px {
        return None;
    }
    let bb = bounding_box(&poly)?;
    if !bb.strictly_inside(width, height, params.border_margin_px as f64) {
        return None;
    }
    Some(order_corners(&[poly[0], poly[1], poly[2], poly[3]]))
}

/// Sweep binary thresholds over the blurred grayscale frame and return the
/// first band's screen quad, ordered TL, BL, BR, TR.
#[cfg_attr(
    feature = "tracing",
    instrument(level = "info", skip(frame, params), fields(width = frame.width(), height = frame.height()))
)]
pub fn detect_surface_corners(
    frame: &RgbImage,
    params: &SurfaceDetectParams,
) -> Result<[Point; 4], CalibrationError> {
    let mut gray = image::imageops::grayscale(frame);
    if params.blur_sigma > 0.0 {
        gray = imageproc::filter::gaussian_blur_f32(&gray, params.blur_sigma);
    }

    let thresholds = params.thresholds();
    for &t in &thresholds {
        let mask = binarize(&gray, t);
        let Some(contour) = largest_contour(external_contours(&mask)) else {
            continue;
        };
        if let Some(quad) = as_screen_quad(&contour, frame.width(), frame.height(), params) {
            log::info!(
                "screen quad found at threshold {t}: {:?}",
                quad.map(|p| (p.x, p.y))
            );
            return Ok(quad);
        }
        log::debug!("threshold {t}: largest contour is not a screen quad");
    }

    log::warn!("no screen quad in {} threshold bands", thresholds.len());
    Err(CalibrationError::NoRectangleFound {
        thresholds_tried: thresholds.len(),
    })
}
