//! Stepping throughput.
//!
//! Run with: cargo bench --bench step_bench

use apbd_sim::{Body, Model, Shape};
use cgmath::{Matrix4, Vector3};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

/// A grid of boxes dropping onto the ground, alternating rigid and affine.
fn box_grid(n: usize) -> Model {
    let mut model = Model::new();
    model.t_end = f32::MAX;
    model.substeps = 10;
    model.iters = 2;
    let cube = Shape::cuboid(Vector3::new(1.0, 1.0, 1.0));
    let side = (n as f32).sqrt().ceil() as usize;
    for i in 0..n {
        let mut body = if i % 2 == 0 {
            Body::rigid(cube, 1.0)
        } else {
            Body::affine(cube, 1.0)
        }
        .expect("valid cube");
        let (x, y) = ((i % side) as f32 * 2.0, (i / side) as f32 * 2.0);
        body.set_init_transform(Matrix4::from_translation(Vector3::new(x, y, 2.0)));
        model.add_body(body).expect("uninitialized model");
    }
    let mut model = model.with_ground_contact().expect("uninitialized model");
    model.init().expect("valid parameters");
    model
}

fn bench_step(c: &mut Criterion) {
    let mut group = c.benchmark_group("model_step");
    for n in [16, 256, 4096] {
        group.throughput(Throughput::Elements(n as u64));
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, &n| {
            let mut model = box_grid(n);
            b.iter(|| black_box(model.step().expect("step")));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_step);
criterion_main!(benches);
