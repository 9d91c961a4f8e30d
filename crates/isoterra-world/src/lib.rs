//! World-space addressing, voxel classification and terrain configuration.
#![forbid(unsafe_code)]

pub mod block;
pub mod chunk_coord;
pub mod config;

pub use block::BlockType;
pub use chunk_coord::ChunkCoord;
pub use config::{
    ConfigError, LightingConfig, MesherConfig, SolverKind, StreamingConfig, TerrainConfig,
    load_config_from_path,
};
