use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicUsize, Ordering};

use crossbeam_channel::{Receiver, Sender, bounded};
use isoterra_mesh_cpu::ChunkMeshScratch;
use isoterra_world::MesherConfig;

/// Lock-free pool of mesher scratch buffers shared by the workers. Octree
/// zones and mesher tables stay allocated between chunks.
pub struct ScratchPool {
    available_tx: Sender<ChunkMeshScratch>,
    available_rx: Receiver<ChunkMeshScratch>,
    allocated: AtomicUsize,
    max_scratch: usize,
    cfg: MesherConfig,
}

impl ScratchPool {
    pub fn new(max_scratch: usize, cfg: MesherConfig) -> Self {
        debug_assert!(max_scratch > 0);
        let (tx, rx) = bounded(max_scratch);
        Self {
            available_tx: tx,
            available_rx: rx,
            allocated: AtomicUsize::new(0),
            max_scratch,
            cfg,
        }
    }

    /// Takes a scratch from the pool, creating one while under capacity and
    /// blocking for a returned one otherwise.
    pub fn acquire(&self) -> PooledScratch<'_> {
        if let Ok(scratch) = self.available_rx.try_recv() {
            return self.wrap(scratch);
        }

        loop {
            let current = self.allocated.load(Ordering::Acquire);
            if current < self.max_scratch {
                let prev = self.allocated.fetch_add(1, Ordering::AcqRel);
                if prev < self.max_scratch {
                    return self.wrap(ChunkMeshScratch::new(&self.cfg));
                }
                self.allocated.fetch_sub(1, Ordering::AcqRel);
            }

            if let Ok(scratch) = self.available_rx.recv() {
                return self.wrap(scratch);
            }
        }
    }

    #[inline]
    fn wrap(&self, scratch: ChunkMeshScratch) -> PooledScratch<'_> {
        PooledScratch {
            scratch: Some(scratch),
            pool: self,
        }
    }

    fn release(&self, scratch: ChunkMeshScratch) {
        let _ = self.available_tx.send(scratch);
    }

    pub fn mesher_config(&self) -> &MesherConfig {
        &self.cfg
    }

    /// Scratch buffers created so far.
    pub fn allocated(&self) -> usize {
        self.allocated.load(Ordering::Relaxed)
    }
}

pub struct PooledScratch<'pool> {
    scratch: Option<ChunkMeshScratch>,
    pool: &'pool ScratchPool,
}

impl Deref for PooledScratch<'_> {
    type Target = ChunkMeshScratch;

    fn deref(&self) -> &Self::Target {
        self.scratch.as_ref().expect("scratch already released")
    }
}

impl DerefMut for PooledScratch<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.scratch.as_mut().expect("scratch already released")
    }
}

impl Drop for PooledScratch<'_> {
    fn drop(&mut self) {
        if let Some(scratch) = self.scratch.take() {
            self.pool.release(scratch);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn released_scratch_is_reused() {
        let pool = ScratchPool::new(2, MesherConfig::default());
        {
            let _a = pool.acquire();
        }
        {
            let _b = pool.acquire();
        }
        assert_eq!(pool.allocated(), 1);
        let _a = pool.acquire();
        let _b = pool.acquire();
        assert_eq!(pool.allocated(), 2);
    }
}
