use std::sync::Arc;

use isoterra_geom::{Aabb, Vec3};

use crate::shape::{Shape, ShapeOp};
use crate::{MaterialId, SdfField};

/// Distance reported where no solid shape exists. Large enough that every
/// octree node prunes, small enough to keep arithmetic finite.
pub const EMPTY_DISTANCE: f32 = 1.0e6;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ShapeId(pub u32);

#[derive(Clone, Debug)]
enum PendingEdit {
    Insert(ShapeId, Shape),
    Update(ShapeId, Shape),
    Remove(ShapeId),
}

/// Editable shape set. Edits are staged and only become visible to sampling
/// after [`ShapeList::commit_pending`], so jobs holding a snapshot never see a
/// half-applied change.
#[derive(Default)]
pub struct ShapeList {
    live: Vec<(ShapeId, Shape)>,
    pending: Vec<PendingEdit>,
    next_id: u32,
    snapshot: Option<Arc<SdfSnapshot>>,
}

impl ShapeList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, shape: Shape) -> ShapeId {
        let id = ShapeId(self.next_id);
        self.next_id += 1;
        self.pending.push(PendingEdit::Insert(id, shape));
        id
    }

    pub fn update(&mut self, id: ShapeId, shape: Shape) {
        self.pending.push(PendingEdit::Update(id, shape));
    }

    pub fn remove(&mut self, id: ShapeId) {
        self.pending.push(PendingEdit::Remove(id));
    }

    #[inline]
    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    pub fn len(&self) -> usize {
        self.live.len()
    }

    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }

    pub fn get(&self, id: ShapeId) -> Option<&Shape> {
        self.live.iter().find(|(sid, _)| *sid == id).map(|(_, s)| s)
    }

    /// Applies staged edits and returns the world regions whose distance may
    /// have changed (old and new bounds of every touched shape).
    pub fn commit_pending(&mut self) -> Vec<Aabb> {
        let mut touched = Vec::new();
        for edit in self.pending.drain(..) {
            match edit {
                PendingEdit::Insert(id, shape) => {
                    touched.push(shape.aabb());
                    self.live.push((id, shape));
                }
                PendingEdit::Update(id, shape) => {
                    if let Some(slot) = self.live.iter_mut().find(|(sid, _)| *sid == id) {
                        touched.push(slot.1.aabb());
                        touched.push(shape.aabb());
                        slot.1 = shape;
                    } else {
                        log::warn!(target: "sdf", "update for unknown shape {:?}", id);
                    }
                }
                PendingEdit::Remove(id) => {
                    if let Some(pos) = self.live.iter().position(|(sid, _)| *sid == id) {
                        let (_, old) = self.live.remove(pos);
                        touched.push(old.aabb());
                    }
                }
            }
        }
        if !touched.is_empty() {
            // Stable sort keeps insertion order among equal priorities.
            self.live.sort_by_key(|(_, s)| s.order);
            self.snapshot = None;
        }
        touched
    }

    /// Immutable copy of the committed shapes for off-thread sampling.
    pub fn snapshot(&mut self) -> Arc<SdfSnapshot> {
        if let Some(s) = &self.snapshot {
            return Arc::clone(s);
        }
        let snap = Arc::new(SdfSnapshot::new(
            self.live.iter().map(|(_, s)| *s).collect(),
        ));
        self.snapshot = Some(Arc::clone(&snap));
        snap
    }
}

/// Frozen, priority-sorted shapes. Cheap to share between workers.
#[derive(Clone, Debug)]
pub struct SdfSnapshot {
    shapes: Arc<[Shape]>,
    bounds: Aabb,
}

impl SdfSnapshot {
    /// Sorts `shapes` by `order` (stable) and caches the solid bounds.
    pub fn new(mut shapes: Vec<Shape>) -> Self {
        shapes.sort_by_key(|s| s.order);
        let mut bounds = Aabb::empty();
        for s in shapes.iter().filter(|s| s.op != ShapeOp::Material) {
            bounds.expand_aabb(&s.aabb());
        }
        Self {
            shapes: shapes.into(),
            bounds,
        }
    }

    pub fn shapes(&self) -> &[Shape] {
        &self.shapes
    }
}

impl SdfField for SdfSnapshot {
    fn distance(&self, p: Vec3) -> f32 {
        let mut acc = EMPTY_DISTANCE;
        for shape in self.shapes.iter() {
            if shape.op == ShapeOp::Material {
                continue;
            }
            acc = shape.combine(acc, shape.distance(p));
        }
        debug_assert!(!acc.is_nan(), "shape list produced NaN at {:?}", p);
        acc
    }

    fn bounds(&self) -> Aabb {
        self.bounds
    }

    /// Last material shape (in priority order) that contains `p`.
    fn material(&self, p: Vec3) -> MaterialId {
        let mut id = 0;
        for shape in self.shapes.iter() {
            if shape.op == ShapeOp::Material && shape.distance(p) <= 0.0 {
                id = shape.material;
            }
        }
        id
    }

    fn may_intersect(&self, aabb: &Aabb) -> bool {
        self.shapes
            .iter()
            .filter(|s| s.op != ShapeOp::Material)
            .any(|s| s.aabb().intersects(aabb))
    }
}
