//! Background-difference segmentation shared by template capture and tracking.
//!
//! `|base - frame|` → value channel → median smoothing → Canny edges →
//! morphological closing → outermost contours.

use crate::contour::Contour;
use crate::Point;
use ::image::{GrayImage, Luma, Rgb, RgbImage};
use imageproc::contours::{find_contours, BorderType};
use imageproc::distance_transform::Norm;
use serde::{Deserialize, Serialize};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Tuning for the segmentation pipeline.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SegmentationParams {
    /// Median filter radius in pixels; `0` disables smoothing.
    pub median_radius: u32,
    /// Canny hysteresis thresholds on the smoothed value channel.
    pub canny_low: f32,
    pub canny_high: f32,
    /// Closing radius (L∞) used to bridge edge gaps; `0` disables closing.
    pub close_radius: u8,
}

impl Default for SegmentationParams {
    fn default() -> Self {
        Self {
            median_radius: 1,
            canny_low: 20.0,
            canny_high: 60.0,
            close_radius: 2,
        }
    }
}

/// Per-channel `|a - b|` over the overlapping area.
pub fn absolute_difference(a: &RgbImage, b: &RgbImage) -> RgbImage {
    let w = a.width().min(b.width());
    let h = a.height().min(b.height());
    RgbImage::from_fn(w, h, |x, y| {
        let pa = a.get_pixel(x, y);
        let pb = b.get_pixel(x, y);
        Rgb([
            pa[0].abs_diff(pb[0]),
            pa[1].abs_diff(pb[1]),
            pa[2].abs_diff(pb[2]),
        ])
    })
}

/// HSV value channel: `max(r, g, b)`.
pub fn value_channel(img: &RgbImage) -> GrayImage {
    GrayImage::from_fn(img.width(), img.height(), |x, y| {
        let p = img.get_pixel(x, y);
        Luma([p[0].max(p[1]).max(p[2])])
    })
}

/// Closed edge mask of everything that differs from `base`.
pub fn foreground_edges(base: &RgbImage, frame: &RgbImage, params: &SegmentationParams) -> GrayImage {
    let diff = absolute_difference(base, frame);
    let mut value = value_channel(&diff);
    if params.median_radius > 0 {
        value = imageproc::filter::median_filter(&value, params.median_radius, params.median_radius);
    }
    let edges = imageproc::edges::canny(&value, params.canny_low, params.canny_high);
    if params.close_radius > 0 {
        imageproc::morphology::close(&edges, Norm::LInf, params.close_radius)
    } else {
        edges
    }
}

/// Outer borders of the top-level connected regions of a binary mask
/// (non-zero = foreground), in pixel coordinates.
pub fn external_contours(mask: &GrayImage) -> Vec<Contour> {
    find_contours::<i32>(mask)
        .into_iter()
        .filter(|c| c.border_type == BorderType::Outer && c.parent.is_none())
        .map(|c| {
            c.points
                .iter()
                .map(|p| Point::new(p.x as f64, p.y as f64))
                .collect::<Contour>()
        })
        .filter(|c| c.len() >= 3)
        .collect()
}

/// Run the full pipeline and return the external contours of the foreground.
///
/// A frame identical to `base` produces no contours.
#[cfg_attr(feature = "tracing", instrument(level = "debug", skip(base, frame, params), fields(w = frame.width(), h = frame.height())))]
pub fn segment_foreground(
    base: &RgbImage,
    frame: &RgbImage,
    params: &SegmentationParams,
) -> Vec<Contour> {
    let closed = foreground_edges(base, frame, params);
    let contours = external_contours(&closed);
    log::debug!("segmentation found {} external contours", contours.len());
    contours
}
