//! Signed distance fields: primitives, combine operators and the ordered
//! shape list that drives terrain generation.
#![forbid(unsafe_code)]

pub mod ops;
pub mod shape;
pub mod shape_list;

use isoterra_geom::{Aabb, Vec3};

pub use shape::{Shape, ShapeKind, ShapeOp};
pub use shape_list::{EMPTY_DISTANCE, SdfSnapshot, ShapeId, ShapeList};

/// Material id used where no material shape covers a point.
pub type MaterialId = u8;

/// A side-effect free signed distance function over a bounded region.
///
/// Implementations are sampled from worker threads, so they must be `Send +
/// Sync` and must not mutate anything when queried. Distances are expected to
/// be roughly Lipschitz-1: neighbouring unit samples never differ by much more
/// than one.
pub trait SdfField: Send + Sync {
    fn distance(&self, p: Vec3) -> f32;

    /// Region outside of which the field has no surface.
    fn bounds(&self) -> Aabb;

    fn material(&self, _p: Vec3) -> MaterialId {
        0
    }

    /// Whether any surface may lie inside `aabb`. Used to skip chunks without
    /// sampling.
    fn may_intersect(&self, aabb: &Aabb) -> bool {
        self.bounds().intersects(aabb)
    }
}

/// Adapts a plain closure into an [`SdfField`].
pub struct FnField<F> {
    f: F,
    bounds: Aabb,
}

impl<F> FnField<F>
where
    F: Fn(Vec3) -> f32 + Send + Sync,
{
    pub fn new(bounds: Aabb, f: F) -> Self {
        Self { f, bounds }
    }
}

impl<F> SdfField for FnField<F>
where
    F: Fn(Vec3) -> f32 + Send + Sync,
{
    #[inline]
    fn distance(&self, p: Vec3) -> f32 {
        (self.f)(p)
    }

    fn bounds(&self) -> Aabb {
        self.bounds
    }
}

impl<T: SdfField + ?Sized> SdfField for std::sync::Arc<T> {
    #[inline]
    fn distance(&self, p: Vec3) -> f32 {
        (**self).distance(p)
    }

    fn bounds(&self) -> Aabb {
        (**self).bounds()
    }

    fn material(&self, p: Vec3) -> MaterialId {
        (**self).material(p)
    }

    fn may_intersect(&self, aabb: &Aabb) -> bool {
        (**self).may_intersect(aabb)
    }
}
