//! Stateless polygon helpers shared by every pipeline stage.
//!
//! Polygons are closed implicitly: the last point connects back to the first.

use crate::Point;
use serde::{Deserialize, Serialize};

/// Axis-aligned bounding box in the polygon's own coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl BoundingBox {
    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    /// Expand by `margin` on every side.
    pub fn inflate(&self, margin: f64) -> Self {
        Self {
            min_x: self.min_x - margin,
            min_y: self.min_y - margin,
            max_x: self.max_x + margin,
            max_y: self.max_y + margin,
        }
    }

    pub fn intersects(&self, other: &BoundingBox) -> bool {
        self.min_x <= other.max_x
            && other.min_x <= self.max_x
            && self.min_y <= other.max_y
            && other.min_y <= self.max_y
    }

    /// `true` when the box lies inside `[margin, w-1-margin] x [margin, h-1-margin]`.
    pub fn strictly_inside(&self, width: u32, height: u32, margin: f64) -> bool {
        self.min_x >= margin
            && self.min_y >= margin
            && self.max_x <= width as f64 - 1.0 - margin
            && self.max_y <= height as f64 - 1.0 - margin
    }
}

pub fn bounding_box(points: &[Point]) -> Option<BoundingBox> {
    let first = points.first()?;
    let mut bb = BoundingBox {
        min_x: first.x,
        min_y: first.y,
        max_x: first.x,
        max_y: first.y,
    };
    for p in &points[1..] {
        bb.min_x = bb.min_x.min(p.x);
        bb.min_y = bb.min_y.min(p.y);
        bb.max_x = bb.max_x.max(p.x);
        bb.max_y = bb.max_y.max(p.y);
    }
    Some(bb)
}

/// Order four corners as top-left, bottom-left, bottom-right, top-right
/// (counter-clockwise on screen, image y axis pointing down).
///
/// Points are sorted by polar angle around their centroid, starting from the
/// top-left diagonal. If the first point is not up-and-left of the opposite one
/// the ordering is rotated by one slot. The result depends only on the point set,
/// so ordering an ordered set is a no-op.
pub fn order_corners(points: &[Point; 4]) -> [Point; 4] {
    let cx = points.iter().map(|p| p.x).sum::<f64>() / 4.0;
    let cy = points.iter().map(|p| p.y).sum::<f64>() / 4.0;

    let key = |p: &Point| {
        let theta = (p.y - cy).atan2(p.x - cx).to_degrees();
        (-135.0 - theta).rem_euclid(360.0)
    };

    let mut ordered = *points;
    ordered.sort_by(|a, b| key(a).total_cmp(&key(b)));

    if !(ordered[0].x < ordered[2].x && ordered[0].y < ordered[2].y) {
        ordered.rotate_right(1);
    }
    ordered
}

/// Rotate `p` around `center` by `angle_deg` (positive = counter-clockwise in a y-up frame).
pub fn rotate_point(p: Point, center: Point, angle_deg: f64) -> Point {
    let (s, c) = angle_deg.to_radians().sin_cos();
    let dx = p.x - center.x;
    let dy = p.y - center.y;
    Point::new(center.x + c * dx - s * dy, center.y + s * dx + c * dy)
}

/// Signed shoelace sum (positive for counter-clockwise in a y-up frame).
pub(crate) fn signed_area(poly: &[Point]) -> f64 {
    if poly.len() < 3 {
        return 0.0;
    }
    let mut acc = 0.0;
    let mut j = poly.len() - 1;
    for i in 0..poly.len() {
        acc += poly[j].x * poly[i].y - poly[i].x * poly[j].y;
        j = i;
    }
    0.5 * acc
}

/// Enclosed area of a simple polygon.
pub fn polygon_area(poly: &[Point]) -> f64 {
    signed_area(poly).abs()
}

/// Perimeter of the closed polygon.
pub fn polygon_arc_length(poly: &[Point]) -> f64 {
    let n = poly.len();
    if n < 2 {
        return 0.0;
    }
    let mut total = 0.0;
    let mut j = n - 1;
    for i in 0..n {
        total += (poly[i] - poly[j]).norm();
        j = i;
    }
    total
}

#[inline]
fn cross(o: &Point, a: &Point, b: &Point) -> f64 {
    (a.x - o.x) * (b.y - o.y) - (a.y - o.y) * (b.x - o.x)
}

/// `true` when every turn of the closed polygon has the same sign.
pub fn is_convex(poly: &[Point]) -> bool {
    let n = poly.len();
    if n < 3 {
        return false;
    }
    let mut sign = 0.0f64;
    for i in 0..n {
        let z = cross(&poly[i], &poly[(i + 1) % n], &poly[(i + 2) % n]);
        if z.abs() < 1e-12 {
            continue;
        }
        if sign == 0.0 {
            sign = z.signum();
        } else if z.signum() != sign {
            return false;
        }
    }
    sign != 0.0
}

/// Andrew's monotone chain. Collinear points are dropped.
pub fn convex_hull(points: &[Point]) -> Vec<Point> {
    let mut pts: Vec<Point> = points
        .iter()
        .copied()
        .filter(|p| p.x.is_finite() && p.y.is_finite())
        .collect();
    pts.sort_by(|a, b| a.x.total_cmp(&b.x).then(a.y.total_cmp(&b.y)));
    pts.dedup();
    if pts.len() < 3 {
        return pts;
    }

    let mut hull: Vec<Point> = Vec::with_capacity(pts.len() * 2);
    for p in &pts {
        while hull.len() >= 2 && cross(&hull[hull.len() - 2], &hull[hull.len() - 1], p) <= 0.0 {
            hull.pop();
        }
        hull.push(*p);
    }
    let lower_len = hull.len() + 1;
    for p in pts.iter().rev().skip(1) {
        while hull.len() >= lower_len
            && cross(&hull[hull.len() - 2], &hull[hull.len() - 1], p) <= 0.0
        {
            hull.pop();
        }
        hull.push(*p);
    }
    hull.pop();
    hull
}

/// Smallest distance between any point of `a` and any point of `b`.
///
/// Returns `f64::INFINITY` when either side is empty.
pub fn min_point_distance(a: &[Point], b: &[Point]) -> f64 {
    let mut best = f64::INFINITY;
    for p in a {
        for q in b {
            let d = (*p - *q).norm_squared();
            if d < best {
                best = d;
            }
        }
    }
    best.sqrt()
}

fn dist_to_segment(p: &Point, a: &Point, b: &Point) -> f64 {
    let ab = *b - *a;
    let len_sq = ab.norm_squared();
    if len_sq < 1e-18 {
        return (*p - *a).norm();
    }
    (ab.x * (p.y - a.y) - ab.y * (p.x - a.x)).abs() / len_sq.sqrt()
}

/// Douglas-Peucker on the open chain `pts[start..=end]`, pushing kept vertices
/// except `end` onto `out`.
fn simplify_chain(pts: &[Point], start: usize, end: usize, epsilon: f64, out: &mut Vec<Point>) {
    let mut stack = vec![(start, end)];
    let mut keep = vec![false; end + 1];
    keep[start] = true;
    keep[end] = true;

    while let Some((s, e)) = stack.pop() {
        if e <= s + 1 {
            continue;
        }
        let mut max_dist = 0.0;
        let mut split = s;
        for i in (s + 1)..e {
            let d = dist_to_segment(&pts[i], &pts[s], &pts[e]);
            if d > max_dist {
                max_dist = d;
                split = i;
            }
        }
        if max_dist > epsilon {
            keep[split] = true;
            stack.push((split, e));
            stack.push((s, split));
        }
    }

    out.extend((start..end).filter(|&i| keep[i]).map(|i| pts[i]));
}

/// Closed-contour Douglas-Peucker simplification with tolerance `epsilon` (pixels).
///
/// The contour is split at the point farthest from its first point, both halves
/// are simplified independently, and near-collinear vertices left at the seams
/// are removed. Inputs with fewer than three points are returned unchanged.
pub fn approximate_polygon(contour: &[Point], epsilon: f64) -> Vec<Point> {
    let n = contour.len();
    if n < 3 {
        return contour.to_vec();
    }

    let far = (1..n)
        .max_by(|&a, &b| {
            (contour[a] - contour[0])
                .norm_squared()
                .total_cmp(&(contour[b] - contour[0]).norm_squared())
        })
        .unwrap_or(n / 2);

    // Walk the ring as one open chain 0..=n, where index n is point 0 again.
    let mut ring: Vec<Point> = contour.to_vec();
    ring.push(contour[0]);

    let mut poly = Vec::new();
    simplify_chain(&ring, 0, far, epsilon, &mut poly);
    simplify_chain(&ring, far, n, epsilon, &mut poly);

    // Seam points 0 and `far` are always kept; drop them if they turned out collinear.
    let mut changed = true;
    while changed && poly.len() > 3 {
        changed = false;
        let m = poly.len();
        for i in 0..m {
            let prev = poly[(i + m - 1) % m];
            let next = poly[(i + 1) % m];
            if dist_to_segment(&poly[i], &prev, &next) <= epsilon {
                poly.remove(i);
                changed = true;
                break;
            }
        }
    }
    poly
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn square(x0: f64, y0: f64, side: f64) -> Vec<Point> {
        vec![
            Point::new(x0, y0),
            Point::new(x0 + side, y0),
            Point::new(x0 + side, y0 + side),
            Point::new(x0, y0 + side),
        ]
    }

    #[test]
    fn order_corners_starts_top_left_and_goes_down_first() {
        let shuffled = [
            Point::new(300.0, 210.0),
            Point::new(20.0, 15.0),
            Point::new(290.0, 10.0),
            Point::new(30.0, 200.0),
        ];
        let ordered = order_corners(&shuffled);
        assert_eq!(ordered[0], Point::new(20.0, 15.0));
        assert_eq!(ordered[1], Point::new(30.0, 200.0));
        assert_eq!(ordered[2], Point::new(300.0, 210.0));
        assert_eq!(ordered[3], Point::new(290.0, 10.0));
    }

    #[test]
    fn order_corners_is_idempotent() {
        let quads = [
            [
                Point::new(10.0, 10.0),
                Point::new(200.0, 30.0),
                Point::new(190.0, 160.0),
                Point::new(5.0, 150.0),
            ],
            // rotated quad whose top-left sits just past the diagonal
            [
                Point::new(100.0, 0.0),
                Point::new(200.0, 90.0),
                Point::new(110.0, 200.0),
                Point::new(0.0, 105.0),
            ],
        ];
        for q in quads {
            let once = order_corners(&q);
            let twice = order_corners(&once);
            assert_eq!(once, twice);
            assert!(once[0].x < once[2].x && once[0].y < once[2].y);
        }
    }

    #[test]
    fn area_perimeter_and_convexity() {
        let sq = square(0.0, 0.0, 10.0);
        assert_relative_eq!(polygon_area(&sq), 100.0);
        assert_relative_eq!(polygon_arc_length(&sq), 40.0);
        assert!(is_convex(&sq));

        let dart = vec![
            Point::new(0.0, 0.0),
            Point::new(10.0, 5.0),
            Point::new(0.0, 10.0),
            Point::new(3.0, 5.0),
        ];
        assert!(!is_convex(&dart));
    }

    #[test]
    fn hull_drops_interior_points() {
        let mut pts = square(0.0, 0.0, 4.0);
        pts.push(Point::new(2.0, 2.0));
        pts.push(Point::new(2.0, 0.0));
        let hull = convex_hull(&pts);
        assert_eq!(hull.len(), 4);
        assert_relative_eq!(polygon_area(&hull), 16.0);
    }

    #[test]
    fn min_distance_between_point_sets() {
        let a = square(0.0, 0.0, 2.0);
        let b = square(5.0, 0.0, 2.0);
        assert_relative_eq!(min_point_distance(&a, &b), 3.0);
        assert!(min_point_distance(&a, &[]).is_infinite());
    }

    #[test]
    fn rotate_point_quarter_turn() {
        let p = rotate_point(Point::new(1.0, 0.0), Point::new(0.0, 0.0), 90.0);
        assert_relative_eq!(p.x, 0.0, epsilon = 1e-12);
        assert_relative_eq!(p.y, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn approximate_polygon_recovers_square_from_dense_outline() {
        let mut dense = Vec::new();
        for i in 0..20 {
            dense.push(Point::new(i as f64, 0.0));
        }
        for i in 0..20 {
            dense.push(Point::new(20.0, i as f64));
        }
        for i in 0..20 {
            dense.push(Point::new(20.0 - i as f64, 20.0));
        }
        for i in 0..20 {
            dense.push(Point::new(0.0, 20.0 - i as f64));
        }
        let poly = approximate_polygon(&dense, 1.0);
        assert_eq!(poly.len(), 4);
        assert!(is_convex(&poly));
        assert_relative_eq!(polygon_area(&poly), 400.0);
    }

    #[test]
    fn bounding_box_interior_check() {
        let bb = bounding_box(&square(1.0, 1.0, 5.0)).expect("non-empty");
        assert!(bb.strictly_inside(10, 10, 1.0));
        assert!(!bb.strictly_inside(7, 7, 1.0));
        assert!(bounding_box(&[]).is_none());
    }
}
