use hashbrown::HashMap;
use isoterra_world::ChunkCoord;

use crate::chunk::Chunk;

/// Stable index of a resident chunk. Valid until the chunk is freed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ChunkHandle(pub u32);

/// Fixed-capacity arena of resident chunks keyed by coordinate.
///
/// Freed slots keep their grid buffers and are handed out again before new
/// ones are created, so steady-state streaming does not allocate chunk
/// records. The mesh of a freed chunk is dropped.
#[derive(Debug)]
pub struct ChunkStore {
    chunk_size: u32,
    capacity: usize,
    slots: Vec<Chunk>,
    live: Vec<bool>,
    free: Vec<u32>,
    map: HashMap<ChunkCoord, ChunkHandle>,
}

impl ChunkStore {
    pub fn new(chunk_size: u32, capacity: usize) -> Self {
        Self {
            chunk_size,
            capacity,
            slots: Vec::with_capacity(capacity),
            live: Vec::with_capacity(capacity),
            free: Vec::new(),
            map: HashMap::with_capacity(capacity),
        }
    }

    #[inline]
    pub fn chunk_size(&self) -> u32 {
        self.chunk_size
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.map.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.map.len() >= self.capacity
    }

    #[inline]
    pub fn contains(&self, coord: ChunkCoord) -> bool {
        self.map.contains_key(&coord)
    }

    #[inline]
    pub fn handle(&self, coord: ChunkCoord) -> Option<ChunkHandle> {
        self.map.get(&coord).copied()
    }

    pub fn get(&self, coord: ChunkCoord) -> Option<&Chunk> {
        let h = self.handle(coord)?;
        self.slots.get(h.0 as usize)
    }

    pub fn get_mut(&mut self, coord: ChunkCoord) -> Option<&mut Chunk> {
        let h = self.handle(coord)?;
        self.slots.get_mut(h.0 as usize)
    }

    /// Makes `coord` resident if there is room. Returns the existing handle
    /// when it already is.
    pub fn try_alloc(&mut self, coord: ChunkCoord) -> Option<ChunkHandle> {
        if let Some(h) = self.handle(coord) {
            return Some(h);
        }
        if self.is_full() {
            return None;
        }
        let h = match self.free.pop() {
            Some(i) => {
                self.slots[i as usize].reset(coord);
                self.live[i as usize] = true;
                ChunkHandle(i)
            }
            None => {
                let i = self.slots.len() as u32;
                self.slots.push(Chunk::new(coord, self.chunk_size));
                self.live.push(true);
                ChunkHandle(i)
            }
        };
        self.map.insert(coord, h);
        Some(h)
    }

    /// Makes `coord` resident, evicting the inactive chunk farthest from
    /// `view` when the store is full.
    ///
    /// # Panics
    /// When the store is full and every resident chunk is active.
    pub fn alloc(&mut self, coord: ChunkCoord, view: ChunkCoord) -> ChunkHandle {
        if let Some(h) = self.try_alloc(coord) {
            return h;
        }
        let Some(victim) = self.farthest_inactive(view) else {
            panic!(
                "chunk store exhausted: {} chunks resident and all are active",
                self.len()
            );
        };
        log::debug!(target: "store", "evict {:?} for {:?}", victim, coord);
        self.free(victim);
        match self.try_alloc(coord) {
            Some(h) => h,
            None => unreachable!("slot freed above"),
        }
    }

    /// Inactive resident chunk farthest from `view`, ties broken by
    /// coordinate for determinism.
    pub fn farthest_inactive(&self, view: ChunkCoord) -> Option<ChunkCoord> {
        self.iter()
            .filter(|c| !c.active)
            .map(|c| (c.coord.distance_sq(view), c.coord))
            .max_by(|a, b| {
                a.0.cmp(&b.0)
                    .then_with(|| (a.1.cx, a.1.cy, a.1.cz).cmp(&(b.1.cx, b.1.cy, b.1.cz)))
            })
            .map(|(_, c)| c)
    }

    /// Returns the chunk's slot to the free list. Unknown coords are ignored.
    pub fn free(&mut self, coord: ChunkCoord) -> bool {
        let Some(h) = self.map.remove(&coord) else {
            return false;
        };
        let i = h.0 as usize;
        self.live[i] = false;
        self.slots[i].reset(coord);
        self.free.push(h.0);
        true
    }

    pub fn iter(&self) -> impl Iterator<Item = &Chunk> {
        self.slots
            .iter()
            .zip(self.live.iter())
            .filter_map(|(c, live)| live.then_some(c))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Chunk> {
        self.slots
            .iter_mut()
            .zip(self.live.iter())
            .filter_map(|(c, live)| live.then_some(c))
    }

    pub fn coords(&self) -> Vec<ChunkCoord> {
        self.iter().map(|c| c.coord).collect()
    }
}
