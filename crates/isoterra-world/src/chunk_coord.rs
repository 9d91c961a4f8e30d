use isoterra_geom::{Aabb, IVec3, Vec3};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChunkCoord {
    pub cx: i32,
    pub cy: i32,
    pub cz: i32,
}

impl ChunkCoord {
    #[inline]
    pub const fn new(cx: i32, cy: i32, cz: i32) -> Self {
        Self { cx, cy, cz }
    }

    #[inline]
    pub fn offset(self, dx: i32, dy: i32, dz: i32) -> Self {
        Self {
            cx: self.cx + dx,
            cy: self.cy + dy,
            cz: self.cz + dz,
        }
    }

    #[inline]
    pub fn distance_sq(self, other: ChunkCoord) -> i64 {
        let dx = i64::from(self.cx - other.cx);
        let dy = i64::from(self.cy - other.cy);
        let dz = i64::from(self.cz - other.cz);
        dx * dx + dy * dy + dz * dz
    }

    /// The six face-adjacent neighbours.
    #[inline]
    pub fn face_neighbors(self) -> [ChunkCoord; 6] {
        [
            self.offset(1, 0, 0),
            self.offset(-1, 0, 0),
            self.offset(0, 1, 0),
            self.offset(0, -1, 0),
            self.offset(0, 0, 1),
            self.offset(0, 0, -1),
        ]
    }

    /// Chunk containing the world voxel `v`.
    #[inline]
    pub fn from_voxel(v: IVec3, chunk_size: u32) -> Self {
        let s = chunk_size as i32;
        Self::new(v.x.div_euclid(s), v.y.div_euclid(s), v.z.div_euclid(s))
    }

    /// Chunk containing the world point `p`.
    #[inline]
    pub fn from_world(p: Vec3, chunk_size: u32) -> Self {
        Self::from_voxel(p.floor(), chunk_size)
    }

    /// Chunk whose origin corner is nearest to `p`.
    #[inline]
    pub fn nearest(p: Vec3, chunk_size: u32) -> Self {
        let s = chunk_size as f32;
        Self::new(
            (p.x / s).round() as i32,
            (p.y / s).round() as i32,
            (p.z / s).round() as i32,
        )
    }

    /// World voxel at the chunk's minimum corner.
    #[inline]
    pub fn origin(self, chunk_size: u32) -> IVec3 {
        IVec3::new(self.cx, self.cy, self.cz) * chunk_size as i32
    }

    #[inline]
    pub fn center(self, chunk_size: u32) -> Vec3 {
        let s = chunk_size as f32;
        Vec3::new(
            (self.cx as f32 + 0.5) * s,
            (self.cy as f32 + 0.5) * s,
            (self.cz as f32 + 0.5) * s,
        )
    }

    #[inline]
    pub fn aabb(self, chunk_size: u32) -> Aabb {
        let min = Vec3::from(self.origin(chunk_size));
        Aabb::new(min, min + Vec3::splat(chunk_size as f32))
    }
}

impl From<(i32, i32, i32)> for ChunkCoord {
    fn from(value: (i32, i32, i32)) -> Self {
        Self::new(value.0, value.1, value.2)
    }
}

impl From<ChunkCoord> for (i32, i32, i32) {
    fn from(value: ChunkCoord) -> Self {
        (value.cx, value.cy, value.cz)
    }
}
