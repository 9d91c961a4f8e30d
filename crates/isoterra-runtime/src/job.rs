use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

use crossbeam_channel::Sender;
use isoterra_mesh_cpu::{ChunkBuildOutput, MeshError, build_chunk_mesh};
use isoterra_sdf::SdfField;
use isoterra_world::ChunkCoord;

use crate::scratch_pool::ScratchPool;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum JobState {
    /// Waiting in the queue.
    Idle,
    Running,
    /// Result sent; waiting for the main thread to drain it.
    PendingFinish,
}

impl JobState {
    fn from_u8(v: u8) -> Self {
        match v {
            1 => JobState::Running,
            2 => JobState::PendingFinish,
            _ => JobState::Idle,
        }
    }
}

/// Mesh one chunk from a frozen field.
pub struct MeshJob {
    pub coord: ChunkCoord,
    /// Token matched against the scheduler's record when the result comes
    /// back; results for a replaced or dropped token are discarded.
    pub generation: u64,
    pub chunk_size: u32,
    pub field: Arc<dyn SdfField>,
    pub(crate) state: Arc<AtomicU8>,
}

impl MeshJob {
    pub fn new(
        coord: ChunkCoord,
        generation: u64,
        chunk_size: u32,
        field: Arc<dyn SdfField>,
    ) -> Self {
        Self {
            coord,
            generation,
            chunk_size,
            field,
            state: Arc::new(AtomicU8::new(JobState::Idle as u8)),
        }
    }

    pub(crate) fn handle(&self) -> JobHandle {
        JobHandle {
            coord: self.coord,
            generation: self.generation,
            state: Arc::clone(&self.state),
        }
    }
}

/// Main-thread view of a submitted job. Dropping it does not cancel the job;
/// the scheduler ignores results it holds no handle for.
#[derive(Clone, Debug)]
pub struct JobHandle {
    pub coord: ChunkCoord,
    pub generation: u64,
    state: Arc<AtomicU8>,
}

impl JobHandle {
    #[inline]
    pub fn state(&self) -> JobState {
        JobState::from_u8(self.state.load(Ordering::Acquire))
    }

    #[inline]
    pub fn is_pending_finish(&self) -> bool {
        self.state() == JobState::PendingFinish
    }
}

pub struct JobResult {
    pub coord: ChunkCoord,
    pub generation: u64,
    pub output: Result<ChunkBuildOutput, MeshError>,
}

pub(crate) fn process_mesh_job(job: MeshJob, scratch_pool: &ScratchPool, tx: &Sender<JobResult>) {
    let MeshJob {
        coord,
        generation,
        chunk_size,
        field,
        state,
    } = job;
    state.store(JobState::Running as u8, Ordering::Release);

    let output = {
        let mut scratch = scratch_pool.acquire();
        build_chunk_mesh(
            &mut scratch,
            &field,
            coord,
            chunk_size,
            scratch_pool.mesher_config(),
        )
    };
    match &output {
        Ok(out) => log::trace!(
            target: "mesh",
            "chunk {:?} gen {}: {:?} verts={} t_total_ms={} t_octree_ms={} t_mesh_ms={}",
            coord,
            generation,
            out.surface,
            out.vertex_count(),
            out.timings.total_ms,
            out.timings.octree_ms,
            out.timings.mesh_ms
        ),
        Err(e) => log::warn!(target: "mesh", "chunk {:?} gen {}: {}", coord, generation, e),
    }

    state.store(JobState::PendingFinish as u8, Ordering::Release);
    let _ = tx.send(JobResult {
        coord,
        generation,
        output,
    });
}
