//! Core types and utilities for projector-camera tabletop tracking.
//!
//! This crate holds everything the calibrator, the template builder and the
//! tracking engine share:
//! - projective geometry (homographies, corner ordering, rectification),
//! - polygon/contour math (area, moments, hull, merging, Hu shape distance),
//! - raster helpers (bilinear sampling, perspective warp, undistortion, hue),
//! - the background-difference segmentation pipeline,
//! - the frame/projector seams and the settle timer used by every phase.
//!
//! Nothing here owns display or input handling.

mod color;
mod contour;
mod error;
mod geometry;
mod homography;
mod image;
mod lens;
mod logger;
mod moments;
mod rectify;
mod segment;
mod source;
mod timer;

pub use color::{hsv_to_rgb, hue_distance, rgb_to_hue, rotate_hue, RgbColor};
pub use contour::{merge_nearby_contours, Contour};
pub use error::GeometryError;
pub use geometry::{
    approximate_polygon, bounding_box, convex_hull, is_convex, min_point_distance, order_corners,
    polygon_area, polygon_arc_length, rotate_point, BoundingBox,
};
pub use homography::{
    estimate_homography, homography_from_4pt, warp_perspective_gray, warp_perspective_rgb,
    Homography,
};
pub use self::image::{mean_hue_at, sample_bilinear_gray, sample_bilinear_rgb};
pub use lens::{undistort_image, Distortion, LensIntrinsics};
pub use moments::{
    centroid_and_orientation, hu_invariants, match_shapes, polygon_moments, Moments, ShapeMetric,
};
pub use rectify::{compute_rectification, destination_corners, Rectifier, RotationMode};
pub use segment::{
    absolute_difference, external_contours, foreground_edges, segment_foreground, value_channel,
    SegmentationParams,
};
pub use source::{ColorProjector, FrameSource, NullProjector, StaticFrames};
pub use timer::SettleTimer;

#[cfg(feature = "tracing")]
pub use logger::init_tracing;

pub use logger::init_with_level;

/// 2D point type used by every geometric API in the workspace.
pub type Point = nalgebra::Point2<f64>;
