use std::fmt;

use hashbrown::HashMap;
use isoterra_geom::{IVec3, Vec3};
use isoterra_world::{MesherConfig, SolverKind};

use crate::occlusion::OcclusionCache;
use crate::solve::{CrossingPlanes, solve_scalar};
use crate::vertex::{
    DEFAULT_INFO, TerrainIndex, TerrainMeshBuild, TerrainVertex, material_weights,
};

const EDGE_BITS: [u8; 3] = [1 << 0, 1 << 1, 1 << 2];

/// The far end of each owned edge. Edge `e` runs along axis `e` from
/// `CORNER_OFFSETS[e]` to `SHARED_CORNER`.
const CORNER_OFFSETS: [IVec3; 3] = [
    IVec3::new(0, 1, 1),
    IVec3::new(1, 0, 1),
    IVec3::new(1, 1, 0),
];
const SHARED_CORNER: IVec3 = IVec3::new(1, 1, 1);

/// The four voxels around each owned edge, in quad order.
const QUAD_OFFSETS: [[IVec3; 4]; 3] = [
    [
        IVec3::new(0, 0, 0),
        IVec3::new(0, 1, 0),
        IVec3::new(0, 0, 1),
        IVec3::new(0, 1, 1),
    ],
    [
        IVec3::new(0, 0, 0),
        IVec3::new(1, 0, 0),
        IVec3::new(0, 0, 1),
        IVec3::new(1, 0, 1),
    ],
    [
        IVec3::new(0, 0, 0),
        IVec3::new(0, 1, 0),
        IVec3::new(1, 0, 0),
        IVec3::new(1, 1, 0),
    ],
];

/// Voxels whose owned edges bound the cube of the voxel at the origin, and
/// which of their edges do.
const CUBE_EDGE_OWNERS: [(IVec3, &[usize]); 7] = [
    (IVec3::new(0, 0, 0), &[0, 1, 2]),
    (IVec3::new(-1, 0, 0), &[1, 2]),
    (IVec3::new(0, -1, 0), &[0, 2]),
    (IVec3::new(-1, -1, 0), &[2]),
    (IVec3::new(-1, 0, -1), &[1]),
    (IVec3::new(0, -1, -1), &[0]),
    (IVec3::new(0, 0, -1), &[0, 1]),
];

/// Upper bound of the solved in-voxel offset, keeping a vertex inside its
/// own voxel.
const MAX_VOXEL_OFFSET: f32 = 0.999;

/// Zero samples would put two vertices on one surface point.
#[inline]
fn nudge(v: f32) -> f32 {
    if v == 0.0 { 0.0001 } else { v }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MeshError {
    /// Emitting the next quad would overflow the vertex or index cap. Holds
    /// the counts reached before the abort.
    CapacityExceeded { verts: u32, indices: u32 },
}

impl fmt::Display for MeshError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MeshError::CapacityExceeded { verts, indices } => write!(
                f,
                "mesh capacity exceeded at {} vertices, {} indices",
                verts, indices
            ),
        }
    }
}

impl std::error::Error for MeshError {}

/// Region and limits for one `VoxelMesher::generate` pass.
#[derive(Clone, Debug)]
pub struct MeshParams {
    /// World voxel of local (0,0,0).
    pub origin: IVec3,
    /// Edge length of the region in voxels.
    pub size: u32,
    pub max_verts: u32,
    pub max_indices: u32,
    pub surface_band: f32,
    pub lipschitz_tolerance: f32,
    pub trace_steps: u32,
    pub trace_epsilon: f32,
    pub solve_iterations: u32,
    pub centroid_bias: f32,
    pub solver: SolverKind,
}

impl MeshParams {
    pub fn new(origin: IVec3, size: u32, cfg: &MesherConfig) -> Self {
        Self {
            origin,
            size,
            max_verts: cfg.max_chunk_verts,
            max_indices: cfg.max_chunk_indices,
            surface_band: cfg.surface_band,
            lipschitz_tolerance: cfg.lipschitz_tolerance,
            trace_steps: cfg.trace_steps,
            trace_epsilon: cfg.trace_epsilon,
            solve_iterations: cfg.solve_iterations,
            centroid_bias: cfg.centroid_bias,
            solver: cfg.solver,
        }
    }

    /// First and last local voxel visited; one voxel past each side so
    /// border vertices see every crossing around them.
    #[inline]
    fn visit_range(&self) -> (IVec3, IVec3) {
        (IVec3::splat(-1), IVec3::splat(self.size as i32))
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MeshStats {
    pub voxels_visited: u32,
    pub crossing_voxels: u32,
    pub vertices: u32,
    pub indices: u32,
    pub continuity_errors: u32,
}

/// Crossing data for the three edges a voxel owns.
#[derive(Clone, Copy, Debug, Default)]
struct TempEdges {
    bits: u8,
    p: [Vec3; 3],
    n: [Vec3; 3],
}

/// Dual-contouring mesher with reusable scratch.
///
/// Each voxel owns the three edges meeting at its `(1,1,1)` corner. A sign
/// change on an owned edge is located by sphere tracing, recorded with its
/// normal, and expanded into a quad over the four voxels sharing the edge.
/// Vertices are created once per voxel and looked up by voxel coordinate, so
/// no two triangles reference different vertices for the same voxel. A
/// second pass moves each vertex to the point best fitting the crossing
/// planes on its voxel's twelve edges.
pub struct VoxelMesher {
    edges: Vec<TempEdges>,
    edge_dim: i32,
    vertex_map: HashMap<IVec3, TerrainIndex>,
    vertex_voxels: Vec<IVec3>,
    build: TerrainMeshBuild,
    errors: Vec<Vec3>,
    batch: Vec<CrossingPlanes>,
}

impl Default for VoxelMesher {
    fn default() -> Self {
        Self::new()
    }
}

impl VoxelMesher {
    pub fn new() -> Self {
        Self {
            edges: Vec::new(),
            edge_dim: 0,
            vertex_map: HashMap::new(),
            vertex_voxels: Vec::new(),
            build: TerrainMeshBuild::default(),
            errors: Vec::new(),
            batch: Vec::new(),
        }
    }

    fn reset(&mut self, size: u32) {
        self.edge_dim = size as i32 + 2;
        let n = (self.edge_dim * self.edge_dim * self.edge_dim) as usize;
        self.edges.clear();
        self.edges.resize(n, TempEdges::default());
        self.clear_output();
        self.errors.clear();
    }

    fn clear_output(&mut self) {
        self.vertex_map.clear();
        self.vertex_voxels.clear();
        self.build.clear_keep_capacity();
    }

    #[inline]
    fn edge_index(&self, local: IVec3) -> usize {
        let d = self.edge_dim;
        ((local.x + 1) + d * ((local.y + 1) + d * (local.z + 1))) as usize
    }

    /// Meshes every marked voxel of `cache` within `params`' region.
    ///
    /// On `Err` every partial vertex and index is discarded; continuity
    /// errors gathered so far are kept. An `Ok` with no indices means the
    /// region holds no surface.
    pub fn generate(
        &mut self,
        cache: &OcclusionCache,
        params: &MeshParams,
    ) -> Result<MeshStats, MeshError> {
        self.reset(params.size);
        let mut stats = MeshStats::default();
        let (lo, hi) = params.visit_range();

        for zone in cache.zones() {
            for cell in zone.marked_cells() {
                let l = cell - params.origin;
                if l.x < lo.x || l.y < lo.y || l.z < lo.z || l.x > hi.x || l.y > hi.y || l.z > hi.z {
                    continue;
                }
                stats.voxels_visited += 1;
                if let Err(e) = self.do_voxel(cache, params, l, &mut stats) {
                    self.clear_output();
                    return Err(e);
                }
            }
        }

        stats.continuity_errors = self.errors.len() as u32;
        if self.build.indices.is_empty() {
            self.clear_output();
            return Ok(stats);
        }

        match params.solver {
            SolverKind::Scalar => self.place_vertices_scalar(cache, params),
            SolverKind::Batched => self.place_vertices_batched(cache, params),
        }
        stats.vertices = self.build.vertices.len() as u32;
        stats.indices = self.build.indices.len() as u32;
        Ok(stats)
    }

    fn do_voxel(
        &mut self,
        cache: &OcclusionCache,
        params: &MeshParams,
        l: IVec3,
        stats: &mut MeshStats,
    ) -> Result<(), MeshError> {
        let base = params.origin + l;
        let shared = nudge(cache.value(Vec3::from(base + SHARED_CORNER)));
        if shared.abs() > params.surface_band {
            return Ok(());
        }

        let mut corner = [0.0f32; 3];
        for (e, c) in corner.iter_mut().enumerate() {
            let wp = Vec3::from(base + CORNER_OFFSETS[e]);
            let v = nudge(cache.value(wp));
            if (v - shared).abs() > params.lipschitz_tolerance {
                self.errors.push(wp);
                return Ok(());
            }
            *c = v;
        }

        let mut bits = 0u8;
        for e in 0..3 {
            if corner[e] * shared <= 0.0 {
                bits |= EDGE_BITS[e];
            }
        }
        if bits == 0 {
            return Ok(());
        }
        stats.crossing_voxels += 1;

        let ti = self.edge_index(l);
        self.edges[ti].bits = bits;
        let size = params.size as i32;
        let emits = l.x >= 0 && l.y >= 0 && l.z >= 0 && l.x < size && l.y < size && l.z < size;

        for e in 0..3 {
            if bits & EDGE_BITS[e] == 0 {
                continue;
            }
            let verts = self.build.vertices.len() as u32;
            let indices = self.build.indices.len() as u32;
            if verts + 4 > params.max_verts || indices + 6 > params.max_indices {
                return Err(MeshError::CapacityExceeded { verts, indices });
            }

            let t = trace_edge(cache, params, base, e, corner[e]);
            let mut local = Vec3::ONE;
            local[e] = t;
            self.edges[ti].p[e] = local;
            self.edges[ti].n[e] = cache.gradient(Vec3::from(base) + local);

            if emits {
                self.emit_quad(params, l, e, shared);
            }
        }
        Ok(())
    }

    fn vertex_for(&mut self, params: &MeshParams, voxel: IVec3) -> TerrainIndex {
        if let Some(&i) = self.vertex_map.get(&voxel) {
            return i;
        }
        let i = self.build.vertices.len() as TerrainIndex;
        self.build
            .vertices
            .push(TerrainVertex::at_voxel_center(params.origin + voxel));
        self.vertex_voxels.push(voxel);
        self.vertex_map.insert(voxel, i);
        i
    }

    fn emit_quad(&mut self, params: &MeshParams, l: IVec3, e: usize, shared: f32) {
        let mut ind = [0 as TerrainIndex; 4];
        for (j, off) in QUAD_OFFSETS[e].iter().enumerate() {
            ind[j] = self.vertex_for(params, l + *off);
        }
        // Faces point toward positive distance with counter-clockwise winding.
        let flip = if e == 0 { shared > 0.0 } else { shared < 0.0 };
        let tris = if flip {
            [ind[0], ind[1], ind[2], ind[1], ind[3], ind[2]]
        } else {
            [ind[0], ind[2], ind[1], ind[1], ind[2], ind[3]]
        };
        self.build.indices.extend_from_slice(&tris);
    }

    fn gather_planes(&self, voxel: IVec3, out: &mut CrossingPlanes) {
        out.clear();
        for (off, owned) in CUBE_EDGE_OWNERS.iter() {
            let te = &self.edges[self.edge_index(voxel + *off)];
            if te.bits == 0 {
                continue;
            }
            let shift = Vec3::from(*off);
            for &e in owned.iter() {
                if te.bits & EDGE_BITS[e] != 0 {
                    out.push(te.p[e] + shift, te.n[e]);
                }
            }
        }
    }

    fn finish_vertex(
        &mut self,
        cache: &OcclusionCache,
        params: &MeshParams,
        i: usize,
        planes: &CrossingPlanes,
        solved: Vec3,
    ) {
        debug_assert!(!planes.is_empty(), "vertex without crossings");
        debug_assert!(solved.is_finite(), "non-finite vertex offset {:?}", solved);
        let offset = if solved.is_finite() {
            Vec3::new(
                solved.x.clamp(0.0, MAX_VOXEL_OFFSET),
                solved.y.clamp(0.0, MAX_VOXEL_OFFSET),
                solved.z.clamp(0.0, MAX_VOXEL_OFFSET),
            )
        } else {
            Vec3::splat(0.5)
        };
        let position = Vec3::from(params.origin + self.vertex_voxels[i]) + offset;
        let material = cache.material(Vec3::from(position.floor()));
        let v = &mut self.build.vertices[i];
        v.position = position;
        v.normal = planes.average_normal();
        v.materials = material_weights(material);
        v.info = DEFAULT_INFO;
    }

    fn place_vertices_scalar(&mut self, cache: &OcclusionCache, params: &MeshParams) {
        let mut planes = CrossingPlanes::default();
        for i in 0..self.build.vertices.len() {
            self.gather_planes(self.vertex_voxels[i], &mut planes);
            let solved = solve_scalar(&planes, params.solve_iterations, params.centroid_bias);
            self.finish_vertex(cache, params, i, &planes, solved);
        }
    }

    #[cfg(feature = "batched_solver")]
    fn place_vertices_batched(&mut self, cache: &OcclusionCache, params: &MeshParams) {
        use crate::solve::{LANES, solve_batched};

        let mut batch = std::mem::take(&mut self.batch);
        let n = self.build.vertices.len();
        let mut start = 0;
        while start < n {
            let end = (start + LANES).min(n);
            batch.clear();
            for i in start..end {
                let mut planes = CrossingPlanes::default();
                self.gather_planes(self.vertex_voxels[i], &mut planes);
                batch.push(planes);
            }
            let solved = solve_batched(&batch, params.solve_iterations, params.centroid_bias);
            for (k, planes) in batch.iter().enumerate() {
                self.finish_vertex(cache, params, start + k, planes, solved[k]);
            }
            start = end;
        }
        self.batch = batch;
    }

    #[cfg(not(feature = "batched_solver"))]
    fn place_vertices_batched(&mut self, cache: &OcclusionCache, params: &MeshParams) {
        self.place_vertices_scalar(cache, params);
    }

    pub fn vertices(&self) -> &[TerrainVertex] {
        &self.build.vertices
    }

    pub fn indices(&self) -> &[TerrainIndex] {
        &self.build.indices
    }

    pub fn build(&self) -> &TerrainMeshBuild {
        &self.build
    }

    /// Moves the finished buffers out, leaving empty ones behind.
    pub fn take_build(&mut self) -> TerrainMeshBuild {
        std::mem::take(&mut self.build)
    }

    /// World points where neighbouring samples broke the continuity bound.
    pub fn errors(&self) -> &[Vec3] {
        &self.errors
    }

    /// Vertex created for the region-local `voxel`, if any.
    #[inline]
    pub fn vertex_index(&self, voxel: IVec3) -> Option<TerrainIndex> {
        self.vertex_map.get(&voxel).copied()
    }

    /// Local voxel that owns each vertex, in vertex order.
    pub fn vertex_voxels(&self) -> &[IVec3] {
        &self.vertex_voxels
    }
}

/// Sphere-traces owned edge `e` of the voxel at world `base` from its outside
/// end toward its inside end. Returns the crossing as a parameter in `[0,1]`
/// measured from `CORNER_OFFSETS[e]`.
fn trace_edge(cache: &OcclusionCache, params: &MeshParams, base: IVec3, e: usize, corner: f32) -> f32 {
    let (start, dir) = if corner > 0.0 { (0.0, 1.0) } else { (1.0, -1.0) };
    let origin = Vec3::from(base);
    let mut depth = 0.0f32;
    for _ in 0..params.trace_steps {
        let mut p = Vec3::ONE;
        p[e] = start + dir * depth;
        let d = cache.value(origin + p);
        if d < params.trace_epsilon {
            break;
        }
        depth += d;
        if depth >= 1.0 {
            depth = 1.0;
            break;
        }
    }
    let t = start + dir * depth;
    debug_assert!((0.0..=1.0).contains(&t), "edge parameter {t} out of range");
    if t.is_finite() { t.clamp(0.0, 1.0) } else { 0.5 }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use isoterra_geom::Aabb;
    use isoterra_sdf::{FnField, SdfField};

    fn plane_y(h: f32) -> Arc<dyn SdfField> {
        Arc::new(FnField::new(
            Aabb::new(Vec3::splat(-1.0e6), Vec3::new(1.0e6, h, 1.0e6)),
            move |p: Vec3| p.y - h,
        ))
    }

    fn run(field: Arc<dyn SdfField>, origin: IVec3, size: u32, cfg: &MesherConfig) -> (VoxelMesher, Result<MeshStats, MeshError>) {
        let mut cache = OcclusionCache::new(cfg);
        cache.generate(field, origin - IVec3::splat(1), origin + IVec3::splat(size as i32));
        let mut mesher = VoxelMesher::new();
        let r = mesher.generate(&cache, &MeshParams::new(origin, size, cfg));
        (mesher, r)
    }

    #[test]
    fn flat_plane_gives_one_quad_per_column() {
        let cfg = MesherConfig::default();
        let (m, r) = run(plane_y(4.3), IVec3::ZERO, 8, &cfg);
        let stats = r.expect("mesh");
        assert_eq!(stats.indices as usize, 8 * 8 * 6);
        for v in m.vertices() {
            assert!((v.position.y - 4.3).abs() < 1e-3, "{:?}", v.position);
            assert!((v.normal - Vec3::UP).length() < 1e-3);
        }
    }

    #[test]
    fn plane_normals_follow_winding() {
        let cfg = MesherConfig::default();
        let (m, _) = run(plane_y(4.3), IVec3::ZERO, 8, &cfg);
        for t in 0..m.build().triangle_count() {
            let [a, b, c] = m.build().triangle(t);
            let n = (b - a).cross(c - a);
            assert!(n.y > 0.0, "triangle {t} faces {:?}", n);
        }
    }

    #[test]
    fn capacity_abort_discards_output() {
        let cfg = MesherConfig {
            max_chunk_verts: 16,
            max_chunk_indices: 96,
            ..MesherConfig::default()
        };
        let (m, r) = run(plane_y(4.3), IVec3::ZERO, 8, &cfg);
        assert!(matches!(r, Err(MeshError::CapacityExceeded { .. })));
        assert!(m.vertices().is_empty());
        assert!(m.indices().is_empty());
    }

    #[test]
    fn discontinuous_field_reports_points() {
        let step: Arc<dyn SdfField> = Arc::new(FnField::new(
            Aabb::new(Vec3::splat(-100.0), Vec3::splat(100.0)),
            |p: Vec3| if p.x < 4.0 { p.y - 4.5 } else { p.y - 1.5 },
        ));
        let (m, r) = run(step, IVec3::ZERO, 8, &MesherConfig::default());
        assert!(r.is_ok());
        assert!(!m.errors().is_empty());
    }
}
