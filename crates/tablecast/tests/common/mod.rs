//! Synthetic camera scenes: a 400×300 camera looking at a 300×220 projected
//! surface whose top-left corner sits at (50, 40).

#![allow(dead_code)]

use image::{Rgb, RgbImage};

pub const CAMERA_W: u32 = 400;
pub const CAMERA_H: u32 = 300;
pub const CANVAS_W: u32 = 300;
pub const CANVAS_H: u32 = 220;

const TABLE: Rgb<u8> = Rgb([15, 15, 15]);
const SURFACE_X: std::ops::RangeInclusive<u32> = 50..=349;
const SURFACE_Y: std::ops::RangeInclusive<u32> = 40..=259;

pub const RED: [u8; 3] = [200, 40, 40];

fn camera(surface: Option<[u8; 3]>, object: Option<(u32, u32, [u8; 3])>) -> RgbImage {
    RgbImage::from_fn(CAMERA_W, CAMERA_H, |x, y| {
        if let Some((ox, oy, c)) = object {
            if (ox..ox + 40).contains(&x) && (oy..oy + 40).contains(&y) {
                return Rgb(c);
            }
        }
        match surface {
            Some(c) if SURFACE_X.contains(&x) && SURFACE_Y.contains(&y) => Rgb(c),
            _ => TABLE,
        }
    })
}

/// Projector showing a white rectangle.
pub fn surface_frame() -> RgbImage {
    camera(Some([200, 200, 200]), None)
}

/// Empty surface under neutral projector light.
pub fn base_frame() -> RgbImage {
    camera(Some([120, 120, 120]), None)
}

/// Surface with a 40×40 block whose camera top-left corner is `(x, y)`.
pub fn object_frame(x: u32, y: u32, color: [u8; 3]) -> RgbImage {
    camera(Some([120, 120, 120]), Some((x, y, color)))
}
