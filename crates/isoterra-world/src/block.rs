/// Per-voxel classification stored in each chunk grid.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum BlockType {
    #[default]
    Exterior = 0,
    Interior = 1,
    Surface = 2,
    Blocking = 3,
    Unloaded = 4,
}

impl BlockType {
    /// Whether gameplay collision treats this voxel as solid.
    #[inline]
    pub fn is_collidable(self) -> bool {
        matches!(
            self,
            BlockType::Interior | BlockType::Surface | BlockType::Blocking
        )
    }
}
