//! In-process seams to the camera and the projector.

use crate::color::RgbColor;
use ::image::RgbImage;

/// Supplies the most recent camera frame. Older frames are never queued.
pub trait FrameSource {
    /// `None` until the camera has delivered a frame.
    fn latest_frame(&mut self) -> Option<RgbImage>;
}

impl<F> FrameSource for F
where
    F: FnMut() -> Option<RgbImage>,
{
    fn latest_frame(&mut self) -> Option<RgbImage> {
        self()
    }
}

/// Holds a single frame that can be swapped between ticks.
#[derive(Clone, Debug, Default)]
pub struct StaticFrames {
    frame: Option<RgbImage>,
}

impl StaticFrames {
    pub fn new(frame: RgbImage) -> Self {
        Self { frame: Some(frame) }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn set(&mut self, frame: RgbImage) {
        self.frame = Some(frame);
    }

    pub fn clear(&mut self) {
        self.frame = None;
    }
}

impl FrameSource for StaticFrames {
    fn latest_frame(&mut self) -> Option<RgbImage> {
        self.frame.clone()
    }
}

/// "Project color X now" signal to the display.
pub trait ColorProjector {
    fn project_color(&mut self, color: RgbColor);
}

impl<F> ColorProjector for F
where
    F: FnMut(RgbColor),
{
    fn project_color(&mut self, color: RgbColor) {
        self(color)
    }
}

/// Projector stand-in for headless runs.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullProjector;

impl ColorProjector for NullProjector {
    fn project_color(&mut self, color: RgbColor) {
        log::debug!("projector: ignoring color {:?}", color);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ::image::Rgb;

    #[test]
    fn closures_act_as_seams() {
        let mut n = 0;
        let mut source = || {
            n += 1;
            Some(RgbImage::from_pixel(1, 1, Rgb([n as u8, 0, 0])))
        };
        let f = FrameSource::latest_frame(&mut source).expect("frame");
        assert_eq!(f.get_pixel(0, 0)[0], 1);

        let mut seen = Vec::new();
        let mut projector = |c: RgbColor| seen.push(c);
        projector.project_color([1, 2, 3]);
        assert_eq!(seen, vec![[1, 2, 3]]);
    }

    #[test]
    fn static_frames_swap_and_clear() {
        let mut s = StaticFrames::empty();
        assert!(s.latest_frame().is_none());
        s.set(RgbImage::new(2, 2));
        assert!(s.latest_frame().is_some());
        s.clear();
        assert!(s.latest_frame().is_none());
    }
}
