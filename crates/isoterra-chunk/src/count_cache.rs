use hashbrown::HashMap;
use isoterra_world::ChunkCoord;

/// What is known about a chunk's geometry, independent of residency.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VertexCount {
    /// Never meshed, or invalidated by an edit.
    Dirty,
    /// Wholly outside the surface.
    Empty,
    /// Wholly inside the surface.
    Interior,
    Vertices(u32),
}

impl VertexCount {
    /// Empty and interior chunks never need meshing again until dirtied.
    #[inline]
    pub fn is_settled_without_surface(self) -> bool {
        matches!(self, VertexCount::Empty | VertexCount::Interior)
    }

    #[inline]
    pub fn has_vertices(self) -> bool {
        matches!(self, VertexCount::Vertices(n) if n > 0)
    }
}

/// Sparse per-coordinate vertex counts that outlive chunk eviction.
#[derive(Default, Debug)]
pub struct VertexCountCache {
    counts: HashMap<ChunkCoord, VertexCount>,
}

impl VertexCountCache {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn get(&self, coord: ChunkCoord) -> VertexCount {
        self.counts
            .get(&coord)
            .copied()
            .unwrap_or(VertexCount::Dirty)
    }

    #[inline]
    pub fn set(&mut self, coord: ChunkCoord, count: VertexCount) {
        if count == VertexCount::Dirty {
            self.counts.remove(&coord);
        } else {
            self.counts.insert(coord, count);
        }
    }

    #[inline]
    pub fn mark_dirty(&mut self, coord: ChunkCoord) {
        self.counts.remove(&coord);
    }

    /// Forgets every cached count for which `pred` holds. Returns how many
    /// were dropped.
    pub fn invalidate_where(&mut self, mut pred: impl FnMut(ChunkCoord) -> bool) -> usize {
        let before = self.counts.len();
        self.counts.retain(|coord, _| !pred(*coord));
        before - self.counts.len()
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_coords_are_dirty() {
        let mut c = VertexCountCache::new();
        let at = ChunkCoord::new(1, -2, 3);
        assert_eq!(c.get(at), VertexCount::Dirty);
        c.set(at, VertexCount::Interior);
        assert!(c.get(at).is_settled_without_surface());
        c.mark_dirty(at);
        assert_eq!(c.get(at), VertexCount::Dirty);
        assert!(c.is_empty());
    }

    #[test]
    fn invalidate_where_keeps_unmatched() {
        let mut c = VertexCountCache::new();
        for x in 0..4 {
            c.set(ChunkCoord::new(x, 0, 0), VertexCount::Empty);
        }
        assert_eq!(c.invalidate_where(|at| at.cx >= 2), 2);
        assert_eq!(c.get(ChunkCoord::new(1, 0, 0)), VertexCount::Empty);
        assert_eq!(c.get(ChunkCoord::new(3, 0, 0)), VertexCount::Dirty);
    }
}
