//! Hue helpers on the circular `[0, 1)` hue scale.

/// 8-bit RGB triple.
pub type RgbColor = [u8; 3];

const CHROMA_EPS: f64 = 1e-9;

/// Hexagonal RGB → hue projection. Channels are in `[0, 1]`; output is in `[0, 1)`.
///
/// Achromatic colors (chroma below a small epsilon) map to hue `0`.
pub fn rgb_to_hue(rgb: [f64; 3]) -> f64 {
    let [r, g, b] = rgb;
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let chroma = max - min;
    if chroma < CHROMA_EPS {
        return 0.0;
    }

    let sector = if max == r {
        ((g - b) / chroma).rem_euclid(6.0)
    } else if max == g {
        (b - r) / chroma + 2.0
    } else {
        (r - g) / chroma + 4.0
    };
    wrap_unit(sector / 6.0)
}

/// Circular distance between two hues, in `[0, 0.5]`.
pub fn hue_distance(a: f64, b: f64) -> f64 {
    let d = (wrap_unit(a) - wrap_unit(b)).abs();
    if d > 0.5 {
        1.0 - d
    } else {
        d
    }
}

/// Shift a hue around the circle.
pub fn rotate_hue(hue: f64, by: f64) -> f64 {
    wrap_unit(hue + by)
}

/// HSV → 8-bit RGB, with `h` in `[0, 1)` and `s`, `v` in `[0, 1]`.
pub fn hsv_to_rgb(h: f64, s: f64, v: f64) -> RgbColor {
    let h6 = wrap_unit(h) * 6.0;
    let c = v * s;
    let x = c * (1.0 - (h6.rem_euclid(2.0) - 1.0).abs());
    let m = v - c;
    let (r, g, b) = match h6 as u32 {
        0 => (c, x, 0.0),
        1 => (x, c, 0.0),
        2 => (0.0, c, x),
        3 => (0.0, x, c),
        4 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };
    let q = |v: f64| ((v + m) * 255.0).round().clamp(0.0, 255.0) as u8;
    [q(r), q(g), q(b)]
}

#[inline]
fn wrap_unit(h: f64) -> f64 {
    let w = h.rem_euclid(1.0);
    // rem_euclid of a tiny negative rounds up to exactly 1.0
    if w >= 1.0 {
        0.0
    } else {
        w
    }
}
