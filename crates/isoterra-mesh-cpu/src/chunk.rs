use std::sync::Arc;
use std::time::Instant;

use isoterra_geom::{Aabb, IVec3, Vec3};
use isoterra_sdf::SdfField;
use isoterra_world::{BlockType, ChunkCoord, MesherConfig};

use crate::mesher::{MeshError, MeshParams, MeshStats, VoxelMesher};
use crate::occlusion::OcclusionCache;
use crate::vertex::{INVALID_INDEX, TerrainIndex, TerrainMeshBuild};

/// Render mesh of one chunk in world space.
#[derive(Clone, Debug)]
pub struct ChunkMeshCPU {
    pub coord: ChunkCoord,
    pub bbox: Aabb,
    pub build: TerrainMeshBuild,
}

/// What a chunk turned out to contain.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChunkSurface {
    /// Entirely outside the surface.
    Empty,
    /// Entirely inside the surface.
    Solid,
    Surface,
}

#[derive(Clone, Copy, Debug, Default)]
pub struct BuildTimings {
    pub octree_ms: u32,
    pub mesh_ms: u32,
    pub total_ms: u32,
}

/// Everything a worker hands back for one chunk.
#[derive(Debug)]
pub struct ChunkBuildOutput {
    pub coord: ChunkCoord,
    pub surface: ChunkSurface,
    /// Present only for `ChunkSurface::Surface`.
    pub mesh: Option<ChunkMeshCPU>,
    /// Per-voxel classification, x-fastest; empty unless meshed.
    pub blocks: Vec<BlockType>,
    /// Per-voxel vertex index or `INVALID_INDEX`; empty unless meshed.
    pub vertex_ids: Vec<TerrainIndex>,
    pub errors: Vec<Vec3>,
    /// Octree leaves, kept for debug drawing.
    pub leaves: Vec<Aabb>,
    pub estimated_vertices: u32,
    pub stats: MeshStats,
    pub timings: BuildTimings,
}

impl ChunkBuildOutput {
    pub fn vertex_count(&self) -> usize {
        self.mesh.as_ref().map_or(0, |m| m.build.vertices.len())
    }
}

/// Per-worker scratch, reused across chunks.
pub struct ChunkMeshScratch {
    pub cache: OcclusionCache,
    pub mesher: VoxelMesher,
}

impl ChunkMeshScratch {
    pub fn new(cfg: &MesherConfig) -> Self {
        Self {
            cache: OcclusionCache::new(cfg),
            mesher: VoxelMesher::new(),
        }
    }
}

#[inline]
fn elapsed_ms(start: Instant) -> u32 {
    start.elapsed().as_millis().min(u128::from(u32::MAX)) as u32
}

#[inline]
pub fn grid_index(x: usize, y: usize, z: usize, size: usize) -> usize {
    (y * size + z) * size + x
}

/// Runs the octree and mesher over one chunk and classifies its voxels.
///
/// A chunk with no surface comes back `Empty` or `Solid` (decided by the
/// sign at the chunk center) without a mesh or grids.
pub fn build_chunk_mesh(
    scratch: &mut ChunkMeshScratch,
    field: &Arc<dyn SdfField>,
    coord: ChunkCoord,
    chunk_size: u32,
    cfg: &MesherConfig,
) -> Result<ChunkBuildOutput, MeshError> {
    let t0 = Instant::now();
    let origin = coord.origin(chunk_size);
    let size = chunk_size as i32;
    scratch.cache.generate(
        Arc::clone(field),
        origin - IVec3::splat(1),
        origin + IVec3::splat(size),
    );
    let octree_ms = elapsed_ms(t0);

    let t_mesh = Instant::now();
    let params = MeshParams::new(origin, chunk_size, cfg);
    let stats = if scratch.cache.is_empty() {
        MeshStats::default()
    } else {
        scratch.mesher.generate(&scratch.cache, &params)?
    };
    let mesh_ms = elapsed_ms(t_mesh);
    let errors = if scratch.cache.is_empty() {
        Vec::new()
    } else {
        scratch.mesher.errors().to_vec()
    };
    if !errors.is_empty() {
        log::warn!(
            target: "mesh",
            "chunk {:?}: {} continuity violations",
            coord,
            errors.len()
        );
    }

    let mut out = ChunkBuildOutput {
        coord,
        surface: ChunkSurface::Empty,
        mesh: None,
        blocks: Vec::new(),
        vertex_ids: Vec::new(),
        errors,
        leaves: scratch.cache.leaves().to_vec(),
        estimated_vertices: scratch.cache.estimated_vertex_count(),
        stats,
        timings: BuildTimings::default(),
    };

    if stats.indices == 0 {
        let center = coord.center(chunk_size);
        out.surface = if scratch.cache.value(center) < 0.0 {
            ChunkSurface::Solid
        } else {
            ChunkSurface::Empty
        };
    } else {
        let (blocks, vertex_ids) = classify(&scratch.cache, &scratch.mesher, origin, chunk_size);
        let build = scratch.mesher.take_build();
        out.surface = ChunkSurface::Surface;
        out.blocks = blocks;
        out.vertex_ids = vertex_ids;
        out.mesh = Some(ChunkMeshCPU {
            coord,
            bbox: build.bbox(),
            build,
        });
    }

    out.timings = BuildTimings {
        octree_ms,
        mesh_ms,
        total_ms: elapsed_ms(t0),
    };
    Ok(out)
}

/// Surface where a vertex was placed, otherwise the sign at the voxel
/// center. Voxels centered in a pruned interior octant skip sampling.
fn classify(
    cache: &OcclusionCache,
    mesher: &VoxelMesher,
    origin: IVec3,
    chunk_size: u32,
) -> (Vec<BlockType>, Vec<TerrainIndex>) {
    let s = chunk_size as usize;
    let mut blocks = vec![BlockType::Exterior; s * s * s];
    let mut vertex_ids = vec![INVALID_INDEX; s * s * s];

    let hi = chunk_size as i32 - 1;
    let base = Vec3::from(origin) + Vec3::splat(0.5);
    for octant in cache.interior_octants() {
        let lo_v = (octant.min - base).ceil().max(IVec3::ZERO);
        let hi_v = (octant.max - base).floor().min(IVec3::splat(hi));
        for z in lo_v.z..=hi_v.z {
            for y in lo_v.y..=hi_v.y {
                for x in lo_v.x..=hi_v.x {
                    blocks[grid_index(x as usize, y as usize, z as usize, s)] = BlockType::Interior;
                }
            }
        }
    }

    let in_chunk = |l: IVec3| l.x >= 0 && l.y >= 0 && l.z >= 0 && l.x <= hi && l.y <= hi && l.z <= hi;
    for zone in cache.zones() {
        for cell in zone.marked_cells() {
            let l = cell - origin;
            if !in_chunk(l) {
                continue;
            }
            let center = Vec3::from(cell) + Vec3::splat(0.5);
            blocks[grid_index(l.x as usize, l.y as usize, l.z as usize, s)] =
                if cache.value(center) > 0.0 {
                    BlockType::Exterior
                } else {
                    BlockType::Interior
                };
        }
    }

    for (v, l) in mesher.vertex_voxels().iter().enumerate() {
        if !in_chunk(*l) {
            continue;
        }
        let i = grid_index(l.x as usize, l.y as usize, l.z as usize, s);
        blocks[i] = BlockType::Surface;
        vertex_ids[i] = v as TerrainIndex;
    }
    (blocks, vertex_ids)
}
