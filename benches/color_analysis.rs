use criterion::{black_box, criterion_group, criterion_main, Criterion};
use peroxide_scan::{
    analyze_strip, delta_e2000, srgb_to_lab, CalibrationPatch, Frame, LabColor, Pixel, Region,
};

fn reference_scale() -> Vec<CalibrationPatch> {
    [
        (0.0, 88.4, -6.2, 62.1),
        (50.0, 86.1, -4.8, 55.3),
        (100.0, 82.7, -2.1, 46.8),
        (200.0, 77.9, 0.6, 38.2),
        (300.0, 72.4, 2.9, 30.4),
        (400.0, 66.8, 4.7, 23.1),
        (500.0, 61.5, 6.1, 17.6),
    ]
    .into_iter()
    .map(|(ppm, l, a, b)| CalibrationPatch::new(ppm, LabColor::new(l, a, b)))
    .collect()
}

fn benchmark_conversion(c: &mut Criterion) {
    c.bench_function("srgb_to_lab", |b| {
        b.iter(|| srgb_to_lab(black_box(Pixel::new(210, 158, 96))))
    });
}

fn benchmark_delta_e2000(c: &mut Criterion) {
    let x = LabColor::new(72.4, 2.9, 30.4);
    let y = LabColor::new(66.8, 4.7, 23.1);
    c.bench_function("delta_e2000", |b| {
        b.iter(|| delta_e2000(black_box(x), black_box(y)))
    });
}

fn benchmark_pipeline(c: &mut Criterion) {
    // Textured pad so every quality check does real work
    let mut pixels = Vec::with_capacity(640 * 480);
    for y in 0..480u32 {
        for x in 0..640u32 {
            let jitter = ((x * 7 + y * 13) % 5) as u8;
            pixels.push(Pixel::new(205 + jitter, 150 + jitter, 90 + jitter));
        }
    }
    let frame = Frame::new(640, 480, pixels).expect("frame");
    let region = Region::new(160, 120, 320, 240).expect("region");
    let scale = reference_scale();

    c.bench_function("analyze_strip_640x480", |b| {
        b.iter(|| analyze_strip(black_box(&frame), black_box(&region), black_box(&scale)))
    });
}

criterion_group!(benches, benchmark_conversion, benchmark_delta_e2000, benchmark_pipeline);
criterion_main!(benches);
