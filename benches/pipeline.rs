//! Benchmarks for the pmug pipeline.

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use pmug::normalize::{InputFormat, NormalizeOptions, Normalizer};
use pmug::render::{Animation, Assembler, AssemblerOptions, Compositor, Frame, LoopCount, PalettePolicy};
use pmug::types::{Pixel, PixelMatrix};

fn hex_grid(width: u32, height: u32) -> InputFormat {
    InputFormat::HexGrid(
        (0..height)
            .map(|y| {
                (0..width)
                    .map(|x| Pixel::rgb((x * 8) as u8, (y * 8) as u8, ((x + y) * 4) as u8).to_hex())
                    .collect()
            })
            .collect(),
    )
}

fn gradient_matrix(width: u32, height: u32, shift: u32) -> PixelMatrix {
    let rows = (0..height)
        .map(|y| {
            (0..width)
                .map(|x| Pixel::rgb(((x + shift) * 8) as u8, (y * 16) as u8, (shift * 30) as u8))
                .collect()
        })
        .collect();
    PixelMatrix::from_rows(rows, width, height).unwrap()
}

// -- Normalization benchmarks --

fn bench_normalize(c: &mut Criterion) {
    let mut group = c.benchmark_group("normalize");
    let normalizer = Normalizer::default();

    let small = hex_grid(16, 16);
    let large = hex_grid(128, 128);

    group.bench_function("hex_16x16", |b| {
        b.iter(|| normalizer.normalize(black_box(&small), &NormalizeOptions::new(16, 16)).unwrap())
    });

    group.bench_function("hex_128x128", |b| {
        b.iter(|| normalizer.normalize(black_box(&large), &NormalizeOptions::new(128, 128)).unwrap())
    });

    group.finish();
}

// -- Compositing benchmarks --

fn bench_composite(c: &mut Criterion) {
    let mut group = c.benchmark_group("composite");
    let compositor = Compositor::default();

    let tiny = gradient_matrix(2, 2, 0);
    let square = gradient_matrix(64, 64, 0);

    group.bench_function("2x2_to_device", |b| {
        b.iter(|| compositor.composite(black_box(&tiny)).unwrap())
    });

    group.bench_function("64x64_to_device", |b| {
        b.iter(|| compositor.composite(black_box(&square)).unwrap())
    });

    group.finish();
}

// -- Assembly benchmarks --

fn bench_assemble(c: &mut Criterion) {
    let mut group = c.benchmark_group("assemble");

    let frames: Vec<Frame> = (0..8)
        .map(|i| Frame::new(i as usize, gradient_matrix(32, 16, i), Some(100)))
        .collect();
    let animation = Animation::new(frames, LoopCount::Infinite, 100);

    let per_frame = Assembler::default();
    let shared = Assembler::new(AssemblerOptions {
        palette_policy: PalettePolicy::Shared,
        ..AssemblerOptions::default()
    });

    group.bench_function("8_frames_per_frame_palette", |b| {
        b.iter(|| per_frame.assemble(black_box(&animation)).unwrap())
    });

    group.bench_function("8_frames_shared_palette", |b| {
        b.iter(|| shared.assemble(black_box(&animation)).unwrap())
    });

    group.finish();
}

criterion_group!(benches, bench_normalize, bench_composite, bench_assemble);
criterion_main!(benches);
