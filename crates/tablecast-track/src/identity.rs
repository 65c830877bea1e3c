use serde::{Deserialize, Serialize};
use tablecast_core::Point;

/// Quantized (position, size) identity of a tracked object.
///
/// Detections whose centroid and template perimeter fall in the same buckets
/// across ticks are the same logical object.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct IdentityKey {
    pub px: i64,
    pub py: i64,
    pub size: i64,
}

impl IdentityKey {
    /// Bucket a centroid and perimeter. A non-positive margin leaves that
    /// axis unquantized; the engine only passes validated margins.
    pub fn quantize(centroid: Point, arc_length: f64, position_margin: f64, size_margin: f64) -> Self {
        let bucket = |v: f64, margin: f64| {
            if margin > 0.0 {
                (v / margin).round() as i64
            } else {
                v.round() as i64
            }
        };
        Self {
            px: bucket(centroid.x, position_margin),
            py: bucket(centroid.y, position_margin),
            size: bucket(arc_length, size_margin),
        }
    }
}

impl std::fmt::Display for IdentityKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {}; {})", self.px, self.py, self.size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn jitter_below_margin_keeps_the_key() {
        let a = IdentityKey::quantize(Point::new(101.0, -39.0), 150.0, 20.0, 40.0);
        let b = IdentityKey::quantize(Point::new(106.0, -44.0), 150.0, 20.0, 40.0);
        assert_eq!(a, b);
        assert_eq!(a, IdentityKey { px: 5, py: -2, size: 4 });
    }

    #[test]
    fn different_size_is_a_different_object() {
        let a = IdentityKey::quantize(Point::new(0.0, 0.0), 100.0, 20.0, 40.0);
        let b = IdentityKey::quantize(Point::new(0.0, 0.0), 200.0, 20.0, 40.0);
        assert_ne!(a, b);
    }

    #[test]
    fn keys_order_by_position_then_size() {
        let mut keys = vec![
            IdentityKey { px: 1, py: 0, size: 0 },
            IdentityKey { px: 0, py: 2, size: 1 },
            IdentityKey { px: 0, py: 2, size: 0 },
        ];
        keys.sort();
        assert_eq!(keys[0], IdentityKey { px: 0, py: 2, size: 0 });
        assert_eq!(keys[2].px, 1);
    }
}
