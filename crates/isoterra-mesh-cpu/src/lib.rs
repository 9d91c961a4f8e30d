//! CPU isosurface extraction: octree occlusion cache, dual-contouring mesher
//! and per-chunk build entry point.
#![forbid(unsafe_code)]

mod chunk;
mod mesher;
mod occlusion;
pub mod solve;
mod vertex;

pub use chunk::{
    BuildTimings, ChunkBuildOutput, ChunkMeshCPU, ChunkMeshScratch, ChunkSurface,
    build_chunk_mesh, grid_index,
};
pub use mesher::{MeshError, MeshParams, MeshStats, VoxelMesher};
pub use occlusion::{OcclusionCache, Zone};
pub use vertex::{
    INVALID_INDEX, TerrainIndex, TerrainMeshBuild, TerrainVertex, material_weights,
};
