use std::sync::Arc;

use hashbrown::HashMap;
use isoterra_geom::{Aabb, IVec3, Vec3};
use isoterra_sdf::{EMPTY_DISTANCE, MaterialId, SdfField};
use isoterra_world::MesherConfig;

const SQRT_3: f32 = 1.732_050_8;

/// Extra room around the generation cells so octants straddling the border
/// are still tested.
const ROOT_PADDING: f32 = 2.0;

/// Cubic page of per-voxel occupancy flags at a fixed world offset.
#[derive(Clone, Debug)]
pub struct Zone {
    offset: IVec3,
    size: i32,
    cells: Vec<u8>,
    occupied: u32,
}

impl Zone {
    fn new(offset: IVec3, size: i32) -> Self {
        Self {
            offset,
            size,
            cells: vec![0; (size * size * size) as usize],
            occupied: 0,
        }
    }

    fn reset(&mut self, offset: IVec3) {
        self.offset = offset;
        self.cells.fill(0);
        self.occupied = 0;
    }

    #[inline]
    fn local_index(&self, cell: IVec3) -> Option<usize> {
        let l = cell - self.offset;
        let s = self.size;
        if l.x < 0 || l.y < 0 || l.z < 0 || l.x >= s || l.y >= s || l.z >= s {
            return None;
        }
        Some((l.x + s * (l.y + s * l.z)) as usize)
    }

    #[inline]
    fn mark(&mut self, cell: IVec3) {
        if let Some(i) = self.local_index(cell) {
            if self.cells[i] == 0 {
                self.cells[i] = 1;
                self.occupied += 1;
            }
        }
    }

    /// World voxel of the page's minimum corner.
    pub fn offset(&self) -> IVec3 {
        self.offset
    }

    pub fn occupied(&self) -> u32 {
        self.occupied
    }

    #[inline]
    pub fn is_marked(&self, cell: IVec3) -> bool {
        self.local_index(cell).is_some_and(|i| self.cells[i] != 0)
    }

    /// Marked world voxels in x-fastest order.
    pub fn marked_cells(&self) -> impl Iterator<Item = IVec3> + '_ {
        let s = self.size;
        self.cells
            .iter()
            .enumerate()
            .filter(|(_, f)| **f != 0)
            .map(move |(i, _)| {
                let i = i as i32;
                self.offset + IVec3::new(i % s, (i / s) % s, i / (s * s))
            })
    }
}

#[derive(Clone, Copy, Debug)]
struct Octant {
    center: Vec3,
    half: f32,
}

impl Octant {
    fn aabb(&self) -> Aabb {
        Aabb::from_center_half(self.center, Vec3::splat(self.half))
    }
}

/// Octree-pruned view of an SDF over one generation region.
///
/// `generate` walks an octree from the region bounds, discarding octants
/// whose center distance proves they cannot hold the surface, and marks every
/// voxel touched by a surviving leaf (dilated by one voxel, so the owner of
/// any crossing edge is covered) in lazily allocated zone pages. Sampling
/// calls forward to the field that was last generated.
pub struct OcclusionCache {
    field: Option<Arc<dyn SdfField>>,
    zones: Vec<Zone>,
    zone_lookup: HashMap<IVec3, usize>,
    spare_zones: Vec<Zone>,
    leaves: Vec<Aabb>,
    interior: Vec<Aabb>,
    surface_aabb: Aabb,
    estimated_vertex_count: f32,
    octants_visited: u32,
    zone_size: i32,
    min_octant_half_size: f32,
    vertex_estimate_factor: f32,
    normal_sample_offset: f32,
}

impl OcclusionCache {
    pub fn new(cfg: &MesherConfig) -> Self {
        Self {
            field: None,
            zones: Vec::new(),
            zone_lookup: HashMap::new(),
            spare_zones: Vec::new(),
            leaves: Vec::new(),
            interior: Vec::new(),
            surface_aabb: Aabb::empty(),
            estimated_vertex_count: 0.0,
            octants_visited: 0,
            zone_size: cfg.zone_size.max(1) as i32,
            min_octant_half_size: cfg.min_octant_half_size,
            vertex_estimate_factor: cfg.vertex_estimate_factor,
            normal_sample_offset: cfg.normal_sample_offset,
        }
    }

    fn reset(&mut self) {
        for z in self.zones.drain(..) {
            self.spare_zones.push(z);
        }
        self.zone_lookup.clear();
        self.leaves.clear();
        self.interior.clear();
        self.surface_aabb = Aabb::empty();
        self.estimated_vertex_count = 0.0;
        self.octants_visited = 0;
    }

    /// Rebuilds the cache for the voxels `cell_min..=cell_max` (world voxel
    /// coordinates). An empty result, with no zones and an empty surface box,
    /// means no surface passes through the region.
    pub fn generate(&mut self, field: Arc<dyn SdfField>, cell_min: IVec3, cell_max: IVec3) {
        self.reset();
        let lo = Vec3::from(cell_min);
        let hi = Vec3::from(cell_max) + Vec3::ONE;
        let region = Aabb::new(lo, hi);
        let root = Octant {
            center: region.center(),
            half: region.half_size().max_component() + ROOT_PADDING,
        };
        let skip = !field.may_intersect(&root.aabb());
        self.field = Some(field);
        if skip {
            self.octants_visited = 1;
            let d = self.value(root.center);
            if d < 0.0 {
                self.interior.push(root.aabb());
            }
            return;
        }

        let mut stack = vec![root];
        while let Some(node) = stack.pop() {
            self.octants_visited += 1;
            let d = self.value(node.center);
            if d.abs() >= node.half * SQRT_3 {
                if d < 0.0 {
                    self.interior.push(node.aabb());
                }
                continue;
            }
            let next = node.half * 0.5;
            if next <= self.min_octant_half_size {
                self.mark_leaf(&node, cell_min, cell_max);
                continue;
            }
            for i in 0..8 {
                let offset = Vec3::new(
                    if i & 1 != 0 { next } else { -next },
                    if i & 2 != 0 { next } else { -next },
                    if i & 4 != 0 { next } else { -next },
                );
                stack.push(Octant {
                    center: node.center + offset,
                    half: next,
                });
            }
        }
        log::trace!(
            target: "mesh",
            "occlusion: {} octants, {} leaves, {} zones",
            self.octants_visited,
            self.leaves.len(),
            self.zones.len()
        );
    }

    fn mark_leaf(&mut self, node: &Octant, cell_min: IVec3, cell_max: IVec3) {
        let aabb = node.aabb();
        self.leaves.push(aabb);
        self.surface_aabb.expand_aabb(&aabb);
        let side = node.half * 2.0;
        self.estimated_vertex_count += side * side * side * self.vertex_estimate_factor;

        let grown = aabb.grow(1.0);
        let lo = grown.min.floor().max(cell_min);
        let hi = (grown.max.ceil() - IVec3::splat(1)).min(cell_max);
        for z in lo.z..=hi.z {
            for y in lo.y..=hi.y {
                for x in lo.x..=hi.x {
                    let cell = IVec3::new(x, y, z);
                    let zone = self.zone_for(cell);
                    self.zones[zone].mark(cell);
                }
            }
        }
    }

    fn zone_for(&mut self, cell: IVec3) -> usize {
        let s = self.zone_size;
        let key = IVec3::new(cell.x.div_euclid(s), cell.y.div_euclid(s), cell.z.div_euclid(s));
        if let Some(&i) = self.zone_lookup.get(&key) {
            return i;
        }
        let offset = key * s;
        let zone = match self.spare_zones.pop() {
            Some(mut z) if z.size == s => {
                z.reset(offset);
                z
            }
            _ => Zone::new(offset, s),
        };
        let i = self.zones.len();
        self.zones.push(zone);
        self.zone_lookup.insert(key, i);
        i
    }

    #[inline]
    pub fn value(&self, p: Vec3) -> f32 {
        match &self.field {
            Some(f) => f.distance(p),
            None => EMPTY_DISTANCE,
        }
    }

    /// Normalized sum of the normalized forward and backward differences.
    /// Zero where the field is flat.
    pub fn gradient(&self, p: Vec3) -> Vec3 {
        let h = self.normal_sample_offset;
        let c = self.value(p);
        let dx = Vec3::new(h, 0.0, 0.0);
        let dy = Vec3::new(0.0, h, 0.0);
        let dz = Vec3::new(0.0, 0.0, h);
        let fwd = Vec3::new(
            self.value(p + dx) - c,
            self.value(p + dy) - c,
            self.value(p + dz) - c,
        );
        let bwd = Vec3::new(
            c - self.value(p - dx),
            c - self.value(p - dy),
            c - self.value(p - dz),
        );
        (fwd.safe_normalized() + bwd.safe_normalized()).safe_normalized()
    }

    #[inline]
    pub fn material(&self, p: Vec3) -> MaterialId {
        self.field.as_ref().map_or(0, |f| f.material(p))
    }

    pub fn zones(&self) -> &[Zone] {
        &self.zones
    }

    pub fn is_marked(&self, cell: IVec3) -> bool {
        let s = self.zone_size;
        let key = IVec3::new(cell.x.div_euclid(s), cell.y.div_euclid(s), cell.z.div_euclid(s));
        self.zone_lookup
            .get(&key)
            .is_some_and(|&i| self.zones[i].is_marked(cell))
    }

    /// Leaf octants that may hold the surface.
    pub fn leaves(&self) -> &[Aabb] {
        &self.leaves
    }

    /// Pruned octants lying wholly inside the surface.
    pub fn interior_octants(&self) -> &[Aabb] {
        &self.interior
    }

    pub fn surface_aabb(&self) -> Aabb {
        self.surface_aabb
    }

    pub fn estimated_vertex_count(&self) -> u32 {
        self.estimated_vertex_count as u32
    }

    pub fn octants_visited(&self) -> u32 {
        self.octants_visited
    }

    pub fn is_empty(&self) -> bool {
        self.zones.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use isoterra_sdf::FnField;

    fn sphere(center: Vec3, r: f32) -> Arc<dyn SdfField> {
        Arc::new(FnField::new(
            Aabb::from_center_half(center, Vec3::splat(r)),
            move |p: Vec3| (p - center).length() - r,
        ))
    }

    #[test]
    fn far_region_has_no_zones() {
        let mut cache = OcclusionCache::new(&MesherConfig::default());
        cache.generate(
            sphere(Vec3::splat(500.0), 4.0),
            IVec3::splat(-1),
            IVec3::splat(24),
        );
        assert!(cache.is_empty());
        assert!(cache.surface_aabb().is_empty());
        assert_eq!(cache.estimated_vertex_count(), 0);
    }

    #[test]
    fn marks_cells_near_surface_only() {
        let c = Vec3::splat(12.0);
        let mut cache = OcclusionCache::new(&MesherConfig::default());
        cache.generate(sphere(c, 10.0), IVec3::splat(-1), IVec3::splat(24));
        assert!(!cache.is_empty());
        assert!(cache.estimated_vertex_count() > 0);
        // cell straddling the surface
        assert!(cache.is_marked(IVec3::new(21, 12, 12)));
        // deep inside and far outside
        assert!(!cache.is_marked(IVec3::new(12, 12, 12)));
        assert!(!cache.is_marked(IVec3::new(0, 0, 0)));
        assert!(!cache.interior_octants().is_empty());
    }

    #[test]
    fn gradient_points_outward_and_degenerates_to_zero() {
        let c = Vec3::ZERO;
        let mut cache = OcclusionCache::new(&MesherConfig::default());
        cache.generate(sphere(c, 5.0), IVec3::splat(-8), IVec3::splat(8));
        let g = cache.gradient(Vec3::new(5.0, 0.0, 0.0));
        assert!((g - Vec3::new(1.0, 0.0, 0.0)).length() < 1e-3);

        let flat: Arc<dyn SdfField> = Arc::new(FnField::new(Aabb::empty(), |_p: Vec3| 1.0));
        cache.generate(flat, IVec3::ZERO, IVec3::splat(4));
        assert_eq!(cache.gradient(Vec3::ONE), Vec3::ZERO);
    }
}
