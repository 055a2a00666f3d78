//! Compositing and stitching benchmarks
//!
//! Measures the per-frame cost of the two image-space passes of the adaptor:
//! - Depth merge of partial images as the rank count grows
//! - Alpha-over merge with the depth test disabled
//! - Cubemap to panorama stitching at several face sizes

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};

use vantage_foundation::FrameBuffer;
use vantage_runtime::compositor::merge;
use vantage_runtime::{CubeFace, SphericalBuffer};

/// Partial image of one rank: a vertical band in front, background elsewhere.
fn partial(rank: usize, ranks: usize, width: usize, height: usize) -> FrameBuffer {
    let mut frame = FrameBuffer::background(width, height, [0, 0, 0]);
    let band = width / ranks.max(1);
    for y in 0..height {
        for x in rank * band..((rank + 1) * band).min(width) {
            let depth = 0.25 + 0.5 * (x as f32 / width as f32);
            frame.set_pixel(x, y, [(x % 256) as u8, (y % 256) as u8, 128, 255], depth);
        }
    }
    frame
}

fn bench_depth_merge(c: &mut Criterion) {
    let mut group = c.benchmark_group("depth_merge_512");
    let (width, height) = (512, 512);

    for ranks in [2, 4, 8, 16] {
        let partials: Vec<FrameBuffer> = (0..ranks)
            .map(|r| partial(r, ranks, width, height))
            .collect();
        group.throughput(Throughput::Elements((width * height * ranks) as u64));
        group.bench_with_input(BenchmarkId::from_parameter(ranks), &partials, |b, p| {
            b.iter(|| merge(black_box(p.clone()), true))
        });
    }

    group.finish();
}

fn bench_alpha_merge(c: &mut Criterion) {
    let mut group = c.benchmark_group("alpha_merge_512");
    let (width, height) = (512, 512);

    for ranks in [2, 8] {
        let partials: Vec<FrameBuffer> = (0..ranks)
            .map(|r| partial(r, ranks, width, height))
            .collect();
        group.bench_with_input(BenchmarkId::from_parameter(ranks), &partials, |b, p| {
            b.iter(|| merge(black_box(p.clone()), false))
        });
    }

    group.finish();
}

fn bench_stitch(c: &mut Criterion) {
    let mut group = c.benchmark_group("panorama_stitch");

    for face in [64, 128, 256] {
        let mut buffer = SphericalBuffer::new(face, face);
        for (i, cube_face) in CubeFace::ALL.into_iter().enumerate() {
            let shade = (i * 40) as u8;
            let frame = FrameBuffer::filled(face, face, [shade, shade, shade, 255], 0.5);
            if buffer.set_face(cube_face, frame).is_err() {
                return;
            }
        }
        group.throughput(Throughput::Elements((16 * face * face) as u64));
        group.bench_with_input(BenchmarkId::from_parameter(face), &buffer, |b, buf| {
            b.iter(|| black_box(buf).stitch())
        });
    }

    group.finish();
}

criterion_group!(benches, bench_depth_merge, bench_alpha_merge, bench_stitch);
criterion_main!(benches);
