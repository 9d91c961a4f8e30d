use std::sync::Arc;

use hashbrown::{HashMap, HashSet};
use isoterra_chunk::{Chunk, ChunkStore, VertexCount, VertexCountCache};
use isoterra_geom::{Aabb, Vec3};
use isoterra_mesh_cpu::ChunkSurface;
use isoterra_sdf::SdfField;
use isoterra_world::{ChunkCoord, LightingConfig, TerrainConfig};

use crate::debug::{DebugSink, StreamingStats};
use crate::job::{JobHandle, MeshJob};
use crate::runtime::{Runtime, RuntimeError};

/// Decides which chunks to mesh, applies finished jobs and picks the
/// render set. All state here is owned by the main thread.
pub struct StreamingScheduler {
    chunk_size: u32,
    max_active: usize,
    sdf_boundary: f32,
    lighting: LightingConfig,
    store: ChunkStore,
    counts: VertexCountCache,
    in_flight: HashMap<ChunkCoord, JobHandle>,
    /// Submitted jobs whose results have not been drained, including ones
    /// whose handle was dropped on eviction.
    outstanding: usize,
    next_generation: u64,
    runtime: Runtime,
    active: Vec<ChunkCoord>,
    diagnostics: Vec<Vec3>,
    view: ChunkCoord,
    stats: StreamingStats,
}

impl StreamingScheduler {
    pub fn new(cfg: &TerrainConfig) -> Result<Self, RuntimeError> {
        let runtime = Runtime::new(&cfg.streaming, &cfg.mesher)?;
        Ok(Self::with_runtime(cfg, runtime))
    }

    pub fn with_runtime(cfg: &TerrainConfig, runtime: Runtime) -> Self {
        let s = &cfg.streaming;
        Self {
            chunk_size: s.chunk_size,
            max_active: s.max_active_chunks,
            sdf_boundary: s.sdf_boundary,
            lighting: cfg.lighting.clone(),
            store: ChunkStore::new(s.chunk_size, s.max_loaded_chunks),
            counts: VertexCountCache::new(),
            in_flight: HashMap::new(),
            outstanding: 0,
            next_generation: 0,
            runtime,
            active: Vec::new(),
            diagnostics: Vec::new(),
            view: ChunkCoord::default(),
            stats: StreamingStats::default(),
        }
    }

    /// One full tick: apply finished jobs, start new ones around `center`
    /// when `field` is given, then reselect the active set.
    pub fn update(
        &mut self,
        center: Vec3,
        radius: f32,
        field: Option<&Arc<dyn SdfField>>,
        debug: &mut dyn DebugSink,
    ) -> Result<StreamingStats, RuntimeError> {
        self.begin_tick();
        self.finish_jobs(debug)?;
        self.refresh_light();
        if let Some(field) = field {
            self.start_jobs(center, radius, field, debug)?;
        }
        self.select_active(center);
        Ok(self.end_tick())
    }

    pub fn begin_tick(&mut self) {
        self.stats = StreamingStats::default();
    }

    pub fn end_tick(&mut self) -> StreamingStats {
        let (queued, _) = self.runtime.queue_debug_counts();
        self.stats.resident = self.store.len();
        self.stats.active = self.active.len();
        self.stats.in_flight = self.outstanding;
        self.stats.queued = queued;
        log::debug!(target: "stream", "{:?}", self.stats);
        self.stats
    }

    /// Drains worker results and applies the ones still wanted.
    pub fn finish_jobs(&mut self, debug: &mut dyn DebugSink) -> Result<(), RuntimeError> {
        if self.outstanding == 0 {
            return Ok(());
        }
        let results = self.runtime.drain_results()?;
        if !results.is_empty() {
            self.diagnostics.clear();
        }
        for r in results {
            self.outstanding = self.outstanding.saturating_sub(1);
            let current = self
                .in_flight
                .get(&r.coord)
                .is_some_and(|h| h.generation == r.generation);
            if !current {
                self.stats.discarded += 1;
                continue;
            }
            self.in_flight.remove(&r.coord);
            let Some(chunk) = self.store.get_mut(r.coord) else {
                self.stats.discarded += 1;
                continue;
            };

            let out = match r.output {
                Ok(out) => out,
                Err(e) => {
                    log::warn!(target: "stream", "chunk {:?} dropped: {}", r.coord, e);
                    self.store.free(r.coord);
                    self.counts.mark_dirty(r.coord);
                    continue;
                }
            };
            self.stats.completed += 1;
            self.diagnostics.extend_from_slice(&out.errors);
            if debug.enabled() {
                for leaf in &out.leaves {
                    debug.aabb(leaf);
                }
            }

            let edited_meanwhile = chunk.geo_dirty;
            match out.surface {
                ChunkSurface::Empty | ChunkSurface::Solid => {
                    let count = if out.surface == ChunkSurface::Empty {
                        VertexCount::Empty
                    } else {
                        VertexCount::Interior
                    };
                    self.counts.set(
                        r.coord,
                        if edited_meanwhile { VertexCount::Dirty } else { count },
                    );
                    self.store.free(r.coord);
                }
                ChunkSurface::Surface => {
                    self.counts
                        .set(r.coord, VertexCount::Vertices(out.vertex_count() as u32));
                    chunk.install(out);
                }
            }
        }
        Ok(())
    }

    pub fn refresh_light(&mut self) {
        let lighting = &self.lighting;
        for chunk in self.store.iter_mut() {
            if chunk.light_dirty && chunk.has_mesh() {
                chunk.compute_light(lighting);
            }
        }
    }

    /// Squared distance from `center` to the chunk center, paired with
    /// whether no face neighbour is known to hold geometry. Ordering by this
    /// tuple puts closer chunks first and, at equal distance, the ones next to
    /// surface.
    pub fn priority(&self, center: Vec3, coord: ChunkCoord) -> (f32, bool) {
        let d2 = (coord.center(self.chunk_size) - center).length_sq();
        let isolated = !coord
            .face_neighbors()
            .iter()
            .any(|n| self.counts.get(*n).has_vertices());
        (d2, isolated)
    }

    /// Starts mesh jobs for missing or dirty chunks, closest first, until the
    /// queue is full or no chunk slot can be had.
    pub fn start_jobs(
        &mut self,
        center: Vec3,
        radius: f32,
        field: &Arc<dyn SdfField>,
        debug: &mut dyn DebugSink,
    ) -> Result<(), RuntimeError> {
        let size = self.chunk_size;
        let view = ChunkCoord::nearest(center, size);
        self.view = view;
        let reach = (radius / size as f32).ceil().max(0.0) as i32;

        let mut candidates: Vec<((f32, bool), ChunkCoord)> = Vec::new();
        for dz in -reach..=reach {
            for dy in -reach..=reach {
                for dx in -reach..=reach {
                    let coord = view.offset(dx, dy, dz);
                    if self.counts.get(coord).is_settled_without_surface() {
                        self.stats.cache_hits += 1;
                        continue;
                    }
                    if self.in_flight.contains_key(&coord) {
                        continue;
                    }
                    if self
                        .store
                        .get(coord)
                        .is_some_and(|c| c.has_mesh() && !c.geo_dirty)
                    {
                        continue;
                    }
                    candidates.push((self.priority(center, coord), coord));
                }
            }
        }
        candidates.sort_by(|(a, _), (b, _)| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));

        for ((d2, _), coord) in candidates {
            if self.runtime.is_queue_full() {
                break;
            }
            if debug.enabled() {
                debug.text(coord.center(size), &format!("{:.1}", d2.sqrt()));
            }
            if !self.store.contains(coord) && self.store.is_full() {
                // Only a strictly farther inactive chunk may make room.
                match self.store.farthest_inactive(view) {
                    Some(victim) if coord.distance_sq(view) < victim.distance_sq(view) => {
                        self.evict(victim)
                    }
                    _ => break,
                }
            }
            self.store.alloc(coord, view);
            let Some(chunk) = self.store.get_mut(coord) else {
                continue;
            };
            let was_dirty = chunk.geo_dirty;
            chunk.geo_dirty = false;

            let generation = self.next_generation;
            let job = MeshJob::new(coord, generation, size, Arc::clone(field));
            match self.runtime.submit(job)? {
                Some(handle) => {
                    self.next_generation += 1;
                    self.in_flight.insert(coord, handle);
                    self.outstanding += 1;
                    self.stats.started += 1;
                }
                None => {
                    if let Some(chunk) = self.store.get_mut(coord) {
                        chunk.geo_dirty = was_dirty;
                    }
                    break;
                }
            }
        }
        Ok(())
    }

    fn evict(&mut self, coord: ChunkCoord) {
        log::debug!(target: "store", "evict {:?}", coord);
        self.store.free(coord);
        self.in_flight.remove(&coord);
        self.stats.evicted += 1;
    }

    /// Marks the closest `max_active` meshed chunks active, the rest inactive.
    pub fn select_active(&mut self, center: Vec3) {
        let size = self.chunk_size;
        let mut ready: Vec<(f32, ChunkCoord)> = self
            .store
            .iter()
            .filter(|c| c.has_mesh())
            .map(|c| ((c.coord.center(size) - center).length_sq(), c.coord))
            .collect();
        ready.sort_by(|a, b| a.0.total_cmp(&b.0));
        ready.truncate(self.max_active);

        self.active.clear();
        self.active.extend(ready.iter().map(|(_, c)| *c));
        let active: HashSet<ChunkCoord> = self.active.iter().copied().collect();
        for chunk in self.store.iter_mut() {
            chunk.active = active.contains(&chunk.coord);
        }
    }

    /// Invalidates everything within `sdf_boundary` of `aabb`: resident
    /// chunks are flagged for rebuild and cached counts are forgotten.
    pub fn dirty(&mut self, aabb: &Aabb) {
        let grown = aabb.grow(self.sdf_boundary);
        let size = self.chunk_size;
        let mut flagged = 0usize;
        for chunk in self.store.iter_mut() {
            if chunk.aabb().intersects(&grown) {
                chunk.geo_dirty = true;
                flagged += 1;
            }
        }
        let forgotten = self
            .counts
            .invalidate_where(|coord| coord.aabb(size).intersects(&grown));
        log::debug!(
            target: "stream",
            "dirty {:?}..{:?}: {} resident, {} cached",
            grown.min,
            grown.max,
            flagged,
            forgotten
        );
    }

    /// Nothing submitted is still outstanding.
    #[inline]
    pub fn is_idle(&self) -> bool {
        self.outstanding == 0
    }

    #[inline]
    pub fn outstanding(&self) -> usize {
        self.outstanding
    }

    pub fn job(&self, coord: ChunkCoord) -> Option<&JobHandle> {
        self.in_flight.get(&coord)
    }

    pub fn active_chunks(&self) -> impl Iterator<Item = &Chunk> {
        self.active.iter().filter_map(|c| self.store.get(*c))
    }

    pub fn store(&self) -> &ChunkStore {
        &self.store
    }

    pub fn counts(&self) -> &VertexCountCache {
        &self.counts
    }

    pub fn diagnostics(&self) -> &[Vec3] {
        &self.diagnostics
    }

    pub fn lighting(&self) -> &LightingConfig {
        &self.lighting
    }

    pub fn chunk_size(&self) -> u32 {
        self.chunk_size
    }

    pub fn view(&self) -> ChunkCoord {
        self.view
    }

    pub fn runtime(&self) -> &Runtime {
        &self.runtime
    }
}
