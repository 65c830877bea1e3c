use criterion::{black_box, criterion_group, criterion_main, Criterion};
use image::{Rgb, RgbImage};
use tablecast::core::{segment_foreground, SegmentationParams};
use tablecast::track::{extract_candidates, TrackerParams};

fn canvas(objects: &[(u32, u32)]) -> RgbImage {
    RgbImage::from_fn(640, 360, |x, y| {
        let hit = objects
            .iter()
            .any(|&(ox, oy)| (ox..ox + 48).contains(&x) && (oy..oy + 32).contains(&y));
        if hit {
            Rgb([190, 60, 40])
        } else {
            Rgb([110, 110, 110])
        }
    })
}

fn bench_segmentation(c: &mut Criterion) {
    let base = canvas(&[]);
    let frame = canvas(&[(80, 60), (300, 200), (500, 90)]);
    let seg = SegmentationParams::default();
    let tracker = TrackerParams::default();

    c.bench_function("segment_foreground_640x360", |b| {
        b.iter(|| segment_foreground(black_box(&base), black_box(&frame), &seg))
    });
    c.bench_function("extract_candidates_640x360", |b| {
        b.iter(|| extract_candidates(black_box(&base), black_box(&frame), 1200.0, &tracker))
    });
}

criterion_group!(benches, bench_segmentation);
criterion_main!(benches);
