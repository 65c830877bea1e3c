use crate::IdentityKey;
use tablecast_core::RgbColor;
use tablecast_template::ObjectPose;

/// A live object in the instance table.
#[derive(Clone, Debug, PartialEq)]
pub struct TrackedInstance {
    /// Unique per creation; a reappearing object gets a new id.
    pub id: u64,
    pub key: IdentityKey,
    pub template_index: usize,
    pub template_name: String,
    /// Color to project on the proxy.
    pub assigned_color: RgbColor,
    pub pose: ObjectPose,
    pub last_seen_tick: u64,
    /// Orientation carried by the last rotation event (or the initial pose).
    pub notified_orientation_deg: f64,
}

/// Circular difference between two angles in degrees, in `[0, 180]`.
pub fn angle_difference_deg(a: f64, b: f64) -> f64 {
    let d = (a - b).rem_euclid(360.0);
    if d > 180.0 {
        360.0 - d
    } else {
        d
    }
}
