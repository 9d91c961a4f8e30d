use serde::Deserialize;
use std::fmt;
use std::fs;
use std::path::Path;

/// Every tunable of the streaming terrain. Passed explicitly to the runtime;
/// nothing here is global.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct TerrainConfig {
    #[serde(default)]
    pub streaming: StreamingConfig,
    #[serde(default)]
    pub mesher: MesherConfig,
    #[serde(default)]
    pub lighting: LightingConfig,
}

#[derive(Clone, Debug, Deserialize)]
pub struct StreamingConfig {
    #[serde(default = "default_chunk_size")]
    pub chunk_size: u32,
    #[serde(default = "default_max_active")]
    pub max_active_chunks: usize,
    #[serde(default = "default_max_loaded")]
    pub max_loaded_chunks: usize,
    #[serde(default = "default_worker_fraction")]
    pub worker_fraction: f32,
    /// Fixed worker count; overrides `worker_fraction` when set.
    #[serde(default)]
    pub worker_threads: Option<usize>,
    /// Depth of the job queue; `None` means two slots per worker.
    #[serde(default)]
    pub queue_capacity: Option<usize>,
    #[serde(default = "default_sdf_boundary")]
    pub sdf_boundary: f32,
}

fn default_chunk_size() -> u32 {
    24
}
fn default_max_active() -> usize {
    1536
}
fn default_max_loaded() -> usize {
    default_max_active() * 2
}
fn default_worker_fraction() -> f32 {
    0.75
}
fn default_sdf_boundary() -> f32 {
    2.0
}

impl Default for StreamingConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            max_active_chunks: default_max_active(),
            max_loaded_chunks: default_max_loaded(),
            worker_fraction: default_worker_fraction(),
            worker_threads: None,
            queue_capacity: None,
            sdf_boundary: default_sdf_boundary(),
        }
    }
}

impl StreamingConfig {
    /// Worker count for a machine with `hardware_threads` threads.
    pub fn worker_count(&self, hardware_threads: usize) -> usize {
        if let Some(n) = self.worker_threads {
            return n;
        }
        ((hardware_threads as f32 * self.worker_fraction).floor() as usize).max(1)
    }
}

#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SolverKind {
    #[default]
    Scalar,
    Batched,
}

#[derive(Clone, Debug, Deserialize)]
pub struct MesherConfig {
    #[serde(default = "default_max_verts")]
    pub max_chunk_verts: u32,
    #[serde(default = "default_max_indices")]
    pub max_chunk_indices: u32,
    #[serde(default = "default_normal_offset")]
    pub normal_sample_offset: f32,
    #[serde(default = "default_min_octant")]
    pub min_octant_half_size: f32,
    /// Estimated vertices per unit of leaf volume.
    #[serde(default = "default_vertex_estimate")]
    pub vertex_estimate_factor: f32,
    /// Edge length, in voxels, of one occupancy page.
    #[serde(default = "default_zone_size")]
    pub zone_size: u32,
    /// Voxels whose shared corner is farther than this from the surface are skipped.
    #[serde(default = "default_surface_band")]
    pub surface_band: f32,
    #[serde(default = "default_lipschitz")]
    pub lipschitz_tolerance: f32,
    #[serde(default = "default_trace_steps")]
    pub trace_steps: u32,
    #[serde(default = "default_trace_epsilon")]
    pub trace_epsilon: f32,
    #[serde(default = "default_solve_iterations")]
    pub solve_iterations: u32,
    #[serde(default = "default_centroid_bias")]
    pub centroid_bias: f32,
    #[serde(default)]
    pub solver: SolverKind,
}

fn default_max_verts() -> u32 {
    u32::from(u16::MAX)
}
fn default_max_indices() -> u32 {
    default_max_verts() * 6
}
fn default_normal_offset() -> f32 {
    0.25
}
fn default_min_octant() -> f32 {
    1.05
}
fn default_vertex_estimate() -> f32 {
    0.25
}
fn default_zone_size() -> u32 {
    32
}
fn default_surface_band() -> f32 {
    2.0
}
fn default_lipschitz() -> f32 {
    1.01
}
fn default_trace_steps() -> u32 {
    8
}
fn default_trace_epsilon() -> f32 {
    0.01
}
fn default_solve_iterations() -> u32 {
    10
}
fn default_centroid_bias() -> f32 {
    0.1
}

impl Default for MesherConfig {
    fn default() -> Self {
        Self {
            max_chunk_verts: default_max_verts(),
            max_chunk_indices: default_max_indices(),
            normal_sample_offset: default_normal_offset(),
            min_octant_half_size: default_min_octant(),
            vertex_estimate_factor: default_vertex_estimate(),
            zone_size: default_zone_size(),
            surface_band: default_surface_band(),
            lipschitz_tolerance: default_lipschitz(),
            trace_steps: default_trace_steps(),
            trace_epsilon: default_trace_epsilon(),
            solve_iterations: default_solve_iterations(),
            centroid_bias: default_centroid_bias(),
            solver: SolverKind::Scalar,
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct LightingConfig {
    #[serde(default = "default_sky")]
    pub sky_brightness: f32,
    #[serde(default = "default_ambient")]
    pub ambient_occlusion: f32,
    #[serde(default = "default_exposure")]
    pub exposure: f32,
}

fn default_sky() -> f32 {
    5.0
}
fn default_ambient() -> f32 {
    0.7125
}
fn default_exposure() -> f32 {
    0.85
}

impl Default for LightingConfig {
    fn default() -> Self {
        Self {
            sky_brightness: default_sky(),
            ambient_occlusion: default_ambient(),
            exposure: default_exposure(),
        }
    }
}

impl LightingConfig {
    #[inline]
    pub fn voxel_light(&self) -> f32 {
        self.sky_brightness * self.ambient_occlusion * self.exposure
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
    Invalid(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "reading terrain config: {}", e),
            ConfigError::Parse(e) => write!(f, "parsing terrain config: {}", e),
            ConfigError::Invalid(msg) => write!(f, "invalid terrain config: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io(e) => Some(e),
            ConfigError::Parse(e) => Some(e),
            ConfigError::Invalid(_) => None,
        }
    }
}

impl From<std::io::Error> for ConfigError {
    fn from(e: std::io::Error) -> Self {
        ConfigError::Io(e)
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(e: toml::de::Error) -> Self {
        ConfigError::Parse(e)
    }
}

impl TerrainConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let cfg: TerrainConfig = toml::from_str(s)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Rejects combinations the runtime cannot honour. An active cap above the
    /// resident cap would leave the store with nothing it may evict.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let s = &self.streaming;
        let m = &self.mesher;
        if s.chunk_size == 0 {
            return Err(ConfigError::Invalid("chunk_size must be positive".into()));
        }
        if s.max_loaded_chunks == 0 {
            return Err(ConfigError::Invalid(
                "max_loaded_chunks must be positive".into(),
            ));
        }
        if s.max_active_chunks > s.max_loaded_chunks {
            return Err(ConfigError::Invalid(format!(
                "max_active_chunks ({}) exceeds max_loaded_chunks ({})",
                s.max_active_chunks, s.max_loaded_chunks
            )));
        }
        if !(s.worker_fraction > 0.0 && s.worker_fraction <= 1.0) {
            return Err(ConfigError::Invalid(
                "worker_fraction must be in (0, 1]".into(),
            ));
        }
        if m.max_chunk_verts > u32::from(u16::MAX) {
            return Err(ConfigError::Invalid(format!(
                "max_chunk_verts ({}) does not fit 16-bit indices",
                m.max_chunk_verts
            )));
        }
        if !(0.0..=1.0).contains(&m.centroid_bias) {
            return Err(ConfigError::Invalid(
                "centroid_bias must be in [0, 1]".into(),
            ));
        }
        if m.zone_size == 0 || m.trace_steps == 0 {
            return Err(ConfigError::Invalid(
                "zone_size and trace_steps must be positive".into(),
            ));
        }
        if m.min_octant_half_size <= 0.0 || m.normal_sample_offset <= 0.0 {
            return Err(ConfigError::Invalid(
                "min_octant_half_size and normal_sample_offset must be positive".into(),
            ));
        }
        Ok(())
    }
}

pub fn load_config_from_path(path: &Path) -> Result<TerrainConfig, ConfigError> {
    let s = fs::read_to_string(path)?;
    TerrainConfig::from_toml_str(&s)
}
