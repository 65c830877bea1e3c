use crate::geometry::{bounding_box, convex_hull, min_point_distance};
use crate::Point;

/// Ordered boundary points of a connected region.
pub type Contour = Vec<Point>;

fn within_margin(a: &Contour, b: &Contour, margin: f64) -> bool {
    match (bounding_box(a), bounding_box(b)) {
        (Some(ba), Some(bb)) if ba.inflate(margin).intersects(&bb) => {
            min_point_distance(a, b) <= margin
        }
        _ => false,
    }
}

/// Union contours that come within `margin` of each other.
///
/// Each merged pair is replaced by the convex hull of its combined points, and
/// the scan repeats until no two contours are within `margin`. Contours that
/// never merge are returned untouched, so a second pass is a no-op.
pub fn merge_nearby_contours(contours: &[Contour], margin: f64) -> Vec<Contour> {
    let mut out: Vec<Contour> = contours.iter().filter(|c| !c.is_empty()).cloned().collect();

    loop {
        let mut pair = None;
        'scan: for i in 0..out.len() {
            for j in (i + 1)..out.len() {
                if within_margin(&out[i], &out[j], margin) {
                    pair = Some((i, j));
                    break 'scan;
                }
            }
        }

        let Some((i, j)) = pair else {
            break;
        };
        let b = out.swap_remove(j);
        let mut union = std::mem::take(&mut out[i]);
        union.extend(b);
        out[i] = convex_hull(&union);
        log::trace!("merged contours {i} and {j}, {} remain", out.len());
    }
    out
}
