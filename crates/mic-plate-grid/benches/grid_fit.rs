use criterion::{black_box, criterion_group, criterion_main, Criterion};
use mic_plate_grid::GridFitter;
use nalgebra::Point2;

fn plate_points(noise: usize) -> Vec<Point2<f32>> {
    let mut pts = Vec::new();
    for r in 0..8 {
        for c in 0..12 {
            // Mild deterministic jitter.
            let j = ((r * 12 + c) % 7) as f32 - 3.0;
            pts.push(Point2::new(
                62.0 + c as f32 * 97.0 + j,
                58.0 + r as f32 * 97.0 - 0.5 * j,
            ));
        }
    }
    let mut state = 0x2545_f491_4f6c_dd1du64;
    for _ in 0..noise {
        state ^= state << 13;
        state ^= state >> 7;
        state ^= state << 17;
        let x = (state % 1200) as f32;
        let y = ((state >> 32) % 800) as f32;
        pts.push(Point2::new(x, y));
    }
    pts
}

fn bench_fit_points(c: &mut Criterion) {
    let fitter = GridFitter::default();
    let clean = plate_points(0);
    let noisy = plate_points(40);

    c.bench_function("fit_points_clean_96", |b| {
        b.iter(|| fitter.fit_points(black_box(&clean), 1200.0, 800.0))
    });
    c.bench_function("fit_points_noisy_136", |b| {
        b.iter(|| fitter.fit_points(black_box(&noisy), 1200.0, 800.0))
    });
}

criterion_group!(benches, bench_fit_points);
criterion_main!(benches);
