//! Worker pool, mesh jobs and the streaming scheduler that keeps chunks
//! meshed around a moving view.
#![forbid(unsafe_code)]

mod debug;
mod job;
mod runtime;
mod scheduler;
mod scratch_pool;
mod terrain;

pub use debug::{DebugSink, LogDebugSink, NullDebugSink, StreamingStats};
pub use job::{JobHandle, JobResult, JobState, MeshJob};
pub use runtime::{Runtime, RuntimeError};
pub use scheduler::StreamingScheduler;
pub use scratch_pool::{PooledScratch, ScratchPool};
pub use terrain::Terrain;
