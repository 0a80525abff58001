//! Benchmarks for the edge collapse simplifier and the model driver

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use meshlod_core::{Model, Point3f, TorusKnot};
use meshlod_simplification::{
    target_index_count, EdgeCollapseSimplifier, IndexSimplifier, SimplificationDriver,
    SimplificationParameters, SimplifyOptions,
};

fn generate_grid(size: usize) -> (Vec<u32>, Vec<Point3f>) {
    let mut positions = Vec::with_capacity(size * size);
    for y in 0..size {
        for x in 0..size {
            let fx = x as f32 / (size - 1) as f32 * std::f32::consts::PI;
            let fy = y as f32 / (size - 1) as f32 * std::f32::consts::PI;
            positions.push(Point3f::new(x as f32, y as f32, (fx.sin() * fy.sin()) * 2.0));
        }
    }
    let mut indices = Vec::with_capacity((size - 1) * (size - 1) * 6);
    for y in 0..(size - 1) {
        for x in 0..(size - 1) {
            let tl = (y * size + x) as u32;
            let tr = tl + 1;
            let bl = ((y + 1) * size + x) as u32;
            let br = bl + 1;
            indices.extend([tl, bl, tr, tr, bl, br]);
        }
    }
    (indices, positions)
}

fn bench_edge_collapse(c: &mut Criterion) {
    let sizes = [10, 20, 40];
    let ratios = [0.3, 0.5, 0.7];

    let mut group = c.benchmark_group("edge_collapse");

    for &size in &sizes {
        let (indices, positions) = generate_grid(size);
        let face_count = indices.len() / 3;

        for &ratio in &ratios {
            let target = target_index_count(ratio, indices.len());
            group.bench_with_input(
                BenchmarkId::new("grid", format!("{}f_r{}", face_count, (ratio * 100.0) as u32)),
                &target,
                |b, &target| {
                    let simplifier = EdgeCollapseSimplifier::new();
                    b.iter(|| {
                        let result = simplifier
                            .simplify(
                                black_box(&indices),
                                black_box(&positions),
                                target,
                                0.25,
                                SimplifyOptions::LOCK_BORDER,
                            )
                            .unwrap();
                        black_box(result);
                    });
                },
            );
        }
    }

    group.finish();
}

fn bench_driver(c: &mut Criterion) {
    // The viewer's built-in test knot
    let knot = TorusKnot::new(5.0, 2.5, 124, 32).build();
    let model = Model::from_geometries(vec![("knot", knot)]).unwrap();
    let driver = SimplificationDriver::default();

    let mut group = c.benchmark_group("driver");
    for &ratio in &[0.1f32, 0.5] {
        let params = SimplificationParameters::new(ratio, 0.01, true);
        group.bench_with_input(
            BenchmarkId::new("torus_knot", format!("r{}", (ratio * 100.0) as u32)),
            &params,
            |b, params| {
                b.iter_batched(
                    || model.clone(),
                    |mut model| {
                        let report = driver.simplify(&mut model, params).unwrap();
                        black_box(report);
                    },
                    criterion::BatchSize::LargeInput,
                );
            },
        );
    }
    group.finish();
}

criterion_group!(benches, bench_edge_collapse, bench_driver);
criterion_main!(benches);
