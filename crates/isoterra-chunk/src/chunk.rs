use isoterra_geom::{Aabb, IVec3};
use isoterra_mesh_cpu::{
    ChunkBuildOutput, ChunkMeshCPU, INVALID_INDEX, TerrainIndex, TerrainVertex, grid_index,
};
use isoterra_world::{BlockType, ChunkCoord, LightingConfig};

use crate::collision::CollisionMesh;

/// Resident chunk record. Grid buffers are kept between reuses of the same
/// pool slot; mesh buffers are kept across rebuilds while resident.
#[derive(Debug)]
pub struct Chunk {
    pub coord: ChunkCoord,
    size: u32,
    blocks: Vec<BlockType>,
    light: Vec<f32>,
    vertex_ids: Vec<TerrainIndex>,
    mesh: Option<ChunkMeshCPU>,
    collision: CollisionMesh,
    /// Geometry must be rebuilt (shapes changed since the last mesh).
    pub geo_dirty: bool,
    pub light_dirty: bool,
    /// Selected for rendering this tick.
    pub active: bool,
}

impl Chunk {
    pub fn new(coord: ChunkCoord, size: u32) -> Self {
        Self {
            coord,
            size,
            blocks: Vec::new(),
            light: Vec::new(),
            vertex_ids: Vec::new(),
            mesh: None,
            collision: CollisionMesh::default(),
            geo_dirty: false,
            light_dirty: true,
            active: false,
        }
    }

    /// Rebinds a pooled record to `coord`, dropping mesh data.
    pub(crate) fn reset(&mut self, coord: ChunkCoord) {
        self.coord = coord;
        self.blocks.clear();
        self.light.clear();
        self.vertex_ids.clear();
        self.mesh = None;
        self.collision.clear();
        self.geo_dirty = false;
        self.light_dirty = true;
        self.active = false;
    }

    #[inline]
    pub fn size(&self) -> u32 {
        self.size
    }

    #[inline]
    pub fn idx(&self, x: usize, y: usize, z: usize) -> usize {
        grid_index(x, y, z, self.size as usize)
    }

    pub fn aabb(&self) -> Aabb {
        self.coord.aabb(self.size)
    }

    /// Local index of world voxel `v`, if it lies in this chunk.
    #[inline]
    fn local(&self, v: IVec3) -> Option<usize> {
        let l = v - self.coord.origin(self.size);
        let s = self.size as i32;
        if l.x < 0 || l.y < 0 || l.z < 0 || l.x >= s || l.y >= s || l.z >= s {
            return None;
        }
        Some(self.idx(l.x as usize, l.y as usize, l.z as usize))
    }

    #[inline]
    pub fn contains_world(&self, v: IVec3) -> bool {
        self.local(v).is_some()
    }

    /// Classification of world voxel `v`. `None` outside the chunk or before
    /// the chunk has been meshed.
    pub fn block_world(&self, v: IVec3) -> Option<BlockType> {
        self.local(v).and_then(|i| self.blocks.get(i).copied())
    }

    pub fn light_world(&self, v: IVec3) -> Option<f32> {
        self.local(v).and_then(|i| self.light.get(i).copied())
    }

    /// Vertex placed in world voxel `v`, if any.
    pub fn vertex_world(&self, v: IVec3) -> Option<&TerrainVertex> {
        let i = self.local(v)?;
        let id = *self.vertex_ids.get(i)?;
        if id == INVALID_INDEX {
            return None;
        }
        self.mesh
            .as_ref()
            .and_then(|m| m.build.vertices.get(id as usize))
    }

    /// Copies a finished build into this chunk's grids and mesh buffers and
    /// rebuilds the collision mesh. Existing buffers are reused and only grow
    /// when the new build does not fit.
    pub fn install(&mut self, out: ChunkBuildOutput) {
        debug_assert_eq!(out.coord, self.coord);
        self.blocks.clear();
        self.blocks.extend_from_slice(&out.blocks);
        self.vertex_ids.clear();
        self.vertex_ids.extend_from_slice(&out.vertex_ids);
        match &out.mesh {
            Some(m) => self.collision.rebuild(&m.build),
            None => self.collision.clear(),
        }
        match (self.mesh.as_mut(), out.mesh) {
            (Some(cur), Some(new)) => {
                cur.coord = new.coord;
                cur.bbox = new.bbox;
                cur.build.clear_keep_capacity();
                cur.build.vertices.extend_from_slice(&new.build.vertices);
                cur.build.indices.extend_from_slice(&new.build.indices);
            }
            (_, new) => self.mesh = new,
        }
        self.light_dirty = true;
    }

    /// Fills the light grid with the constant ambient term.
    pub fn compute_light(&mut self, cfg: &LightingConfig) {
        let n = (self.size * self.size * self.size) as usize;
        self.light.clear();
        self.light.resize(n, cfg.voxel_light());
        self.light_dirty = false;
    }

    pub fn mesh(&self) -> Option<&ChunkMeshCPU> {
        self.mesh.as_ref()
    }

    pub fn has_mesh(&self) -> bool {
        self.mesh.is_some()
    }

    pub fn collision(&self) -> &CollisionMesh {
        &self.collision
    }

    pub fn vertex_count(&self) -> usize {
        self.mesh.as_ref().map_or(0, |m| m.build.vertices.len())
    }

    pub fn blocks(&self) -> &[BlockType] {
        &self.blocks
    }
}
