use std::sync::Arc;

use isoterra_chunk::{ChunkStore, RaycastParams, VertexCount, VertexCountCache};
use isoterra_geom::{Aabb, IVec3, Vec3};
use isoterra_mesh_cpu::{ChunkMeshScratch, build_chunk_mesh};
use isoterra_sdf::{FnField, SdfField};
use isoterra_world::{BlockType, ChunkCoord, LightingConfig, MesherConfig};
use proptest::prelude::*;

const SIZE: u32 = 24;

fn sphere(center: Vec3, r: f32) -> Arc<dyn SdfField> {
    Arc::new(FnField::new(
        Aabb::from_center_half(center, Vec3::splat(r)),
        move |p: Vec3| (p - center).length() - r,
    ))
}

#[test]
fn installed_chunk_answers_voxel_and_ray_queries() {
    let cfg = MesherConfig::default();
    let mut scratch = ChunkMeshScratch::new(&cfg);
    let coord = ChunkCoord::new(0, 0, 0);
    let out = build_chunk_mesh(&mut scratch, &sphere(Vec3::splat(12.0), 7.5), coord, SIZE, &cfg)
        .expect("build");

    let mut store = ChunkStore::new(SIZE, 4);
    store.try_alloc(coord).expect("room");
    let chunk = store.get_mut(coord).unwrap();
    chunk.install(out);
    assert!(chunk.light_dirty);
    chunk.compute_light(&LightingConfig::default());
    assert!(!chunk.light_dirty);

    let chunk = store.get(coord).unwrap();
    assert_eq!(chunk.block_world(IVec3::new(12, 12, 12)), Some(BlockType::Interior));
    assert_eq!(chunk.block_world(IVec3::new(0, 0, 0)), Some(BlockType::Exterior));
    assert_eq!(chunk.block_world(IVec3::new(30, 0, 0)), None);
    let light = chunk.light_world(IVec3::new(3, 3, 3)).unwrap();
    assert!((light - LightingConfig::default().voxel_light()).abs() < 1e-6);

    let top = IVec3::new(12, 19, 12);
    assert_eq!(chunk.block_world(top), Some(BlockType::Surface));
    let v = chunk.vertex_world(top).expect("surface voxel has a vertex");
    assert!(((v.position - Vec3::splat(12.0)).length() - 7.5).abs() < 0.2);

    let hit = chunk
        .collision()
        .raycast(&RaycastParams::segment(
            Vec3::new(12.2, 23.5, 12.3),
            Vec3::new(0.0, -20.0, 0.0),
        ))
        .expect("ray from above hits the sphere");
    assert!((hit.position.y - 19.5).abs() < 0.3);
    assert!(hit.normal.y > 0.8);
}

#[test]
fn rebuild_reuses_mesh_buffers() {
    let cfg = MesherConfig::default();
    let mut scratch = ChunkMeshScratch::new(&cfg);
    let coord = ChunkCoord::new(0, 0, 0);
    let field = sphere(Vec3::splat(12.0), 7.5);
    let mut store = ChunkStore::new(SIZE, 1);
    store.try_alloc(coord).unwrap();

    let first = build_chunk_mesh(&mut scratch, &field, coord, SIZE, &cfg).expect("build");
    store.get_mut(coord).unwrap().install(first);
    let (ptr, verts, tris) = {
        let m = store.get(coord).unwrap().mesh().expect("meshed");
        (m.build.vertices.as_ptr(), m.build.vertices.len(), m.build.triangle_count())
    };

    let second = build_chunk_mesh(&mut scratch, &field, coord, SIZE, &cfg).expect("build");
    let chunk = store.get_mut(coord).unwrap();
    chunk.install(second);
    let m = chunk.mesh().expect("meshed");
    assert_eq!(m.build.vertices.as_ptr(), ptr);
    assert_eq!(m.build.vertices.len(), verts);
    assert_eq!(m.build.triangle_count(), tris);
    assert_eq!(chunk.block_world(IVec3::new(12, 19, 12)), Some(BlockType::Surface));
    assert_eq!(chunk.collision().len(), tris);
}

#[test]
fn alloc_evicts_farthest_inactive_chunk() {
    let mut store = ChunkStore::new(SIZE, 3);
    for x in 0..3 {
        store.try_alloc(ChunkCoord::new(x, 0, 0)).unwrap();
    }
    store.get_mut(ChunkCoord::new(2, 0, 0)).unwrap().active = true;
    store.alloc(ChunkCoord::new(-1, 0, 0), ChunkCoord::new(0, 0, 0));
    assert!(store.contains(ChunkCoord::new(2, 0, 0)));
    assert!(!store.contains(ChunkCoord::new(1, 0, 0)));
    assert!(store.contains(ChunkCoord::new(-1, 0, 0)));
    assert_eq!(store.len(), 3);
}

#[test]
#[should_panic(expected = "chunk store exhausted")]
fn alloc_panics_when_every_chunk_is_active() {
    let mut store = ChunkStore::new(SIZE, 1);
    store.try_alloc(ChunkCoord::new(0, 0, 0)).unwrap();
    store.get_mut(ChunkCoord::new(0, 0, 0)).unwrap().active = true;
    store.alloc(ChunkCoord::new(5, 0, 0), ChunkCoord::new(0, 0, 0));
}

#[test]
fn counts_survive_eviction() {
    let mut store = ChunkStore::new(SIZE, 1);
    let mut counts = VertexCountCache::new();
    let a = ChunkCoord::new(0, 0, 0);
    store.try_alloc(a).unwrap();
    counts.set(a, VertexCount::Vertices(120));
    store.alloc(ChunkCoord::new(3, 0, 0), a);
    assert!(!store.contains(a));
    assert_eq!(counts.get(a), VertexCount::Vertices(120));
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    // Residency never exceeds capacity and the map agrees with iteration.
    #[test]
    fn store_respects_capacity(
        cap in 1usize..12,
        ops in proptest::collection::vec((-4i32..4, -4i32..4, -4i32..4, any::<bool>()), 1..80),
    ) {
        let mut store = ChunkStore::new(SIZE, cap);
        let view = ChunkCoord::new(0, 0, 0);
        for (x, y, z, free) in ops {
            let c = ChunkCoord::new(x, y, z);
            if free {
                store.free(c);
            } else {
                store.alloc(c, view);
                prop_assert!(store.contains(c));
            }
            prop_assert!(store.len() <= cap);
            prop_assert_eq!(store.iter().count(), store.len());
            for chunk in store.iter() {
                prop_assert_eq!(store.get(chunk.coord).map(|c| c.coord), Some(chunk.coord));
            }
        }
    }
}
