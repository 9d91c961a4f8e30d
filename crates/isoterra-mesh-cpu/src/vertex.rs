use isoterra_geom::{Aabb, IVec3, Vec3};
use isoterra_sdf::MaterialId;

/// 16-bit render index. `INVALID_INDEX` marks voxels without a vertex.
pub type TerrainIndex = u16;
pub const INVALID_INDEX: TerrainIndex = u16::MAX;

/// Vertex layout handed to the renderer.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct TerrainVertex {
    pub position: Vec3,
    pub normal: Vec3,
    /// One weight per blendable material slot.
    pub materials: [u8; 4],
    /// Light and terrain info bytes.
    pub info: [u8; 4],
}

impl TerrainVertex {
    /// Placeholder vertex at the center of `voxel`, before the position solve.
    #[inline]
    pub fn at_voxel_center(voxel: IVec3) -> Self {
        Self {
            position: Vec3::from(voxel) + Vec3::splat(0.5),
            ..Self::default()
        }
    }
}

/// Full weight on the slot matching `id`; ids past the last slot get no weight.
#[inline]
pub fn material_weights(id: MaterialId) -> [u8; 4] {
    let mut w = [0u8; 4];
    if let Some(slot) = w.get_mut(id as usize) {
        *slot = 255;
    }
    w
}

pub(crate) const DEFAULT_INFO: [u8; 4] = [0, 1, 255, 0];

/// Vertex and index buffers for one generation pass.
#[derive(Default, Clone, Debug)]
pub struct TerrainMeshBuild {
    pub vertices: Vec<TerrainVertex>,
    pub indices: Vec<TerrainIndex>,
}

impl TerrainMeshBuild {
    /// Clears both buffers but keeps capacity for the next pass.
    #[inline]
    pub fn clear_keep_capacity(&mut self) {
        self.vertices.clear();
        self.indices.clear();
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn bbox(&self) -> Aabb {
        let mut b = Aabb::empty();
        for v in &self.vertices {
            b.expand_point(v.position);
        }
        b
    }

    /// World-space corners of triangle `t`.
    #[inline]
    pub fn triangle(&self, t: usize) -> [Vec3; 3] {
        let i = t * 3;
        [
            self.vertices[self.indices[i] as usize].position,
            self.vertices[self.indices[i + 1] as usize].position,
            self.vertices[self.indices[i + 2] as usize].position,
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weights_are_one_hot() {
        assert_eq!(material_weights(0), [255, 0, 0, 0]);
        assert_eq!(material_weights(3), [0, 0, 0, 255]);
        assert_eq!(material_weights(9), [0, 0, 0, 0]);
    }
}
