use image::{GrayImage, Luma};
use tablecast_calib::{find_pattern_corners, CalibrationError, LensCalibParams};

const SQUARE: u32 = 24;
const MARGIN: u32 = 40;

/// `cols × rows` inner corners, i.e. `(cols + 1) × (rows + 1)` squares.
fn chessboard(cols: u32, rows: u32) -> GrayImage {
    let w = 2 * MARGIN + (cols + 1) * SQUARE;
    let h = 2 * MARGIN + (rows + 1) * SQUARE;
    GrayImage::from_fn(w, h, |x, y| {
        let inside = x >= MARGIN && y >= MARGIN && x < w - MARGIN && y < h - MARGIN;
        if !inside {
            return Luma([255]);
        }
        let cx = (x - MARGIN) / SQUARE;
        let cy = (y - MARGIN) / SQUARE;
        if (cx + cy) % 2 == 0 {
            Luma([20])
        } else {
            Luma([235])
        }
    })
}

#[test]
fn finds_full_grid_in_row_major_order() {
    let params = LensCalibParams::default();
    let img = chessboard(params.pattern_cols as u32, params.pattern_rows as u32);
    let corners = find_pattern_corners(&img, &params).expect("pattern");
    assert_eq!(corners.len(), params.expected_corners());

    for (i, p) in corners.iter().enumerate() {
        let col = (i % params.pattern_cols) as f64;
        let row = (i / params.pattern_cols) as f64;
        let ex = (MARGIN + SQUARE) as f64 + col * SQUARE as f64 - 0.5;
        let ey = (MARGIN + SQUARE) as f64 + row * SQUARE as f64 - 0.5;
        assert!(
            (p.x - ex).abs() < 1.5 && (p.y - ey).abs() < 1.5,
            "corner {i}: {p:?} vs ({ex}, {ey})"
        );
    }
}

#[test]
fn wrong_board_size_is_pattern_missing() {
    let params = LensCalibParams::default();
    let img = chessboard(5, 4);
    let err = find_pattern_corners(&img, &params).unwrap_err();
    assert!(matches!(
        err,
        CalibrationError::PatternMissing { expected: 54, .. }
    ));
}
