#[macro_use]
extern crate criterion;
extern crate mandel;

use criterion::{black_box, Criterion};
use mandel::kernel::{EscapeTime, Kernel};
use mandel::planes::{Pixel, PlaneMapper};

fn partition(c: &mut Criterion) {
    c.bench_function("partition 600 rows, 8 workers", |b| {
        b.iter(|| mandel::compute_partition(black_box(0.3), black_box(600), black_box(8)))
    });
}

fn kernel_row(c: &mut Criterion) {
    let plane = PlaneMapper::square(600).unwrap();
    let kernel = EscapeTime::default();
    c.bench_function("escape time, one 600 pixel row", move |b| {
        b.iter(|| {
            (0..600)
                .map(|x| kernel.color(plane.pixel_to_point(&Pixel(x, 300)))[0] as u64)
                .sum::<u64>()
        })
    });
}

criterion_group!(benches, partition, kernel_row);
criterion_main!(benches);
