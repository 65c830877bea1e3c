//! Picking the object silhouette out of a rectified frame and bringing it
//! into the canonical template frame.

use crate::{CaptureError, TemplateParams};
use image::RgbImage;
use tablecast_core::{
    bounding_box, centroid_and_orientation, merge_nearby_contours, polygon_area, rotate_point,
    segment_foreground, Contour, GeometryError, Point,
};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Centroid and orientation in the y-up canvas frame (origin at canvas center).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ObjectPose {
    pub centroid: Point,
    /// Degrees in `[0, 360)`, counter-clockwise from +x.
    pub orientation_deg: f64,
}

impl ObjectPose {
    /// The centroid back in rectified-image pixel coordinates.
    pub fn pixel_centroid(&self, width: u32, height: u32) -> Point {
        Point::new(
            self.centroid.x + width as f64 / 2.0,
            height as f64 / 2.0 - self.centroid.y,
        )
    }
}

/// One object isolated from a rectified frame.
#[derive(Clone, Debug, PartialEq)]
pub struct ObjectObservation {
    /// Outline in rectified-image pixels.
    pub contour: Contour,
    /// Enclosed area in pixels².
    pub area: f64,
    pub pose: ObjectPose,
    pub canonical_contour: Contour,
}

/// Rectified pixels → canvas frame: origin at the canvas center, y up.
pub fn to_canvas_frame(contour: &[Point], width: u32, height: u32) -> Contour {
    let hw = width as f64 / 2.0;
    let hh = height as f64 / 2.0;
    contour
        .iter()
        .map(|p| Point::new(p.x - hw, hh - p.y))
        .collect()
}

/// Canonical contour (centroid at origin, rotated by the negative orientation)
/// together with the pose it was taken from.
pub fn normalize_contour(
    contour: &[Point],
    width: u32,
    height: u32,
) -> Result<(Contour, ObjectPose), GeometryError> {
    let canvas = to_canvas_frame(contour, width, height);
    let (centroid, orientation_deg) = centroid_and_orientation(&canvas)?;
    let origin = Point::origin();
    let canonical = canvas
        .iter()
        .map(|p| {
            let rel = Point::new(p.x - centroid.x, p.y - centroid.y);
            rotate_point(rel, origin, -orientation_deg)
        })
        .collect();
    Ok((
        canonical,
        ObjectPose {
            centroid,
            orientation_deg,
        },
    ))
}

fn touches_border(contour: &[Point], width: u32, height: u32, margin: u32) -> bool {
    bounding_box(contour)
        .map(|bb| !bb.strictly_inside(width, height, margin as f64))
        .unwrap_or(true)
}

/// Merge fragments, take the largest contour that stays off the canvas border,
/// and check its area against the accepted window.
pub fn select_candidate(
    contours: &[Contour],
    width: u32,
    height: u32,
    params: &TemplateParams,
) -> Result<Contour, CaptureError> {
    let mut merged = merge_nearby_contours(contours, params.merge_distance);
    if merged.is_empty() {
        return Err(CaptureError::no_object("no foreground contours"));
    }
    merged.sort_by(|a, b| polygon_area(b).total_cmp(&polygon_area(a)));

    let Some(winner) = merged
        .into_iter()
        .find(|c| !touches_border(c, width, height, params.border_margin_px))
    else {
        return Err(CaptureError::no_object("every contour touches the canvas border"));
    };

    let canvas_area = width as f64 * height as f64;
    let fraction = polygon_area(&winner) / canvas_area.max(1.0);
    if fraction < params.min_area_fraction || fraction > params.max_area_fraction {
        return Err(CaptureError::no_object(format!(
            "area fraction {fraction:.4} outside [{}, {}]",
            params.min_area_fraction, params.max_area_fraction
        )));
    }
    Ok(winner)
}

/// Segment `frame` against `base` and return the single placed object.
///
/// Both images are rectified canvas images of the same size.
#[cfg_attr(
    feature = "tracing",
    instrument(level = "info", skip_all, fields(w = frame.width(), h = frame.height()))
)]
pub fn extract_object(
    base: &RgbImage,
    frame: &RgbImage,
    params: &TemplateParams,
) -> Result<ObjectObservation, CaptureError> {
    let (width, height) = frame.dimensions();
    let contours = segment_foreground(base, frame, &params.segmentation);
    let contour = select_candidate(&contours, width, height, params)?;
    let (canonical_contour, pose) = normalize_contour(&contour, width, height)?;
    let area = polygon_area(&contour);
    log::debug!(
        "object at ({:.1}, {:.1}), {:.1}°, area {area:.1}",
        pose.centroid.x,
        pose.centroid.y,
        pose.orientation_deg
    );
    Ok(ObjectObservation {
        contour,
        area,
        pose,
        canonical_contour,
    })
}
