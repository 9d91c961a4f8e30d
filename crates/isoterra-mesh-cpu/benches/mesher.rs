use std::sync::Arc;

use criterion::{Criterion, black_box, criterion_group, criterion_main};

use isoterra_geom::Vec3;
use isoterra_mesh_cpu::{ChunkMeshScratch, build_chunk_mesh};
use isoterra_sdf::{SdfField, Shape, ShapeKind, ShapeList, ShapeOp};
use isoterra_world::{ChunkCoord, MesherConfig, SolverKind};

fn scene() -> Arc<dyn SdfField> {
    let mut shapes = ShapeList::new();
    shapes.add(Shape::new(ShapeKind::Sphere { radius: 10.0 }, Vec3::splat(12.0)));
    shapes.add(
        Shape::new(
            ShapeKind::Box {
                half_extents: [6.0, 3.0, 6.0],
                corner_radius: 1.0,
            },
            Vec3::new(12.0, 20.0, 12.0),
        )
        .with_op(ShapeOp::SmoothUnion, 2.0)
        .with_order(1),
    );
    shapes.commit_pending();
    shapes.snapshot()
}

fn bench_chunk(c: &mut Criterion) {
    let mut group = c.benchmark_group("build_chunk_mesh");
    let field = scene();
    for (name, solver) in [("scalar", SolverKind::Scalar), ("batched", SolverKind::Batched)] {
        let cfg = MesherConfig {
            solver,
            ..MesherConfig::default()
        };
        let mut scratch = ChunkMeshScratch::new(&cfg);
        group.bench_function(format!("sphere_box_24_{name}"), |b| {
            b.iter(|| {
                let out = build_chunk_mesh(&mut scratch, &field, ChunkCoord::new(0, 0, 0), 24, &cfg);
                black_box(out)
            })
        });
    }
    group.finish();
}

fn bench_empty_chunk(c: &mut Criterion) {
    let field = scene();
    let cfg = MesherConfig::default();
    let mut scratch = ChunkMeshScratch::new(&cfg);
    c.bench_function("build_chunk_mesh_far", |b| {
        b.iter(|| {
            let out = build_chunk_mesh(&mut scratch, &field, ChunkCoord::new(8, 0, 0), 24, &cfg);
            black_box(out)
        })
    });
}

criterion_group!(benches, bench_chunk, bench_empty_chunk);
criterion_main!(benches);
