use std::sync::Arc;

use hashbrown::HashSet;
use isoterra_geom::{Aabb, Vec3};
use isoterra_mesh_cpu::{ChunkMeshScratch, ChunkSurface, build_chunk_mesh};
use isoterra_sdf::{FnField, SdfField};
use isoterra_world::{ChunkCoord, MesherConfig};
use proptest::prelude::*;

fn sphere(center: Vec3, r: f32) -> Arc<dyn SdfField> {
    Arc::new(FnField::new(
        Aabb::from_center_half(center, Vec3::splat(r)),
        move |p: Vec3| (p - center).length() - r,
    ))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    // Any sphere straddling the chunk meshes onto its own surface, one vertex per voxel.
    #[test]
    fn sphere_surface_adherence(
        cx in 4.0f32..20.0, cy in 4.0f32..20.0, cz in 4.0f32..20.0,
        r in 4.0f32..10.0,
    ) {
        let c = Vec3::new(cx, cy, cz);
        let cfg = MesherConfig::default();
        let mut scratch = ChunkMeshScratch::new(&cfg);
        let out = build_chunk_mesh(&mut scratch, &sphere(c, r), ChunkCoord::new(0, 0, 0), 24, &cfg)
            .expect("fits default caps");
        prop_assert_eq!(out.surface, ChunkSurface::Surface);
        prop_assert!(out.errors.is_empty());
        let m = &out.mesh.as_ref().unwrap().build;
        let mut voxels = HashSet::new();
        for v in &m.vertices {
            let err = ((v.position - c).length() - r).abs();
            prop_assert!(err < 0.2, "vertex {:?} off by {}", v.position, err);
            prop_assert!(voxels.insert(v.position.floor()));
        }
    }

    // A sphere wholly outside the chunk never produces geometry.
    #[test]
    fn distant_sphere_leaves_chunk_empty(
        dx in 40.0f32..200.0, r in 1.0f32..10.0,
    ) {
        let cfg = MesherConfig::default();
        let mut scratch = ChunkMeshScratch::new(&cfg);
        let out = build_chunk_mesh(
            &mut scratch,
            &sphere(Vec3::new(12.0 + dx, 12.0, 12.0), r),
            ChunkCoord::new(0, 0, 0),
            24,
            &cfg,
        ).unwrap();
        prop_assert_eq!(out.surface, ChunkSurface::Empty);
        prop_assert_eq!(out.vertex_count(), 0);
    }
}
