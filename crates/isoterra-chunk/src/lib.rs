//! Resident chunk records, the fixed-size chunk pool, per-coordinate vertex
//! counts and per-chunk collision queries.
#![forbid(unsafe_code)]

mod chunk;
mod collision;
mod count_cache;
mod store;

pub use chunk::Chunk;
pub use collision::{CollisionMesh, PushOut, PushOutHit, RayHit, RaycastParams};
pub use count_cache::{VertexCount, VertexCountCache};
pub use store::{ChunkHandle, ChunkStore};
