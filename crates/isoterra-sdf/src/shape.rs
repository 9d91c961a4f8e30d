use isoterra_geom::{Aabb, Vec3};
use serde::Deserialize;

use crate::MaterialId;
use crate::ops;

/// How a shape combines with everything ordered before it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShapeOp {
    #[default]
    Union,
    Subtraction,
    SmoothUnion,
    SmoothSubtraction,
    /// Leaves distance untouched; paints `material` where the shape is solid.
    Material,
}

/// Closed set of primitive kinds. Each is evaluated in the shape's local
/// frame, centered on the origin.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ShapeKind {
    Sphere {
        radius: f32,
    },
    Box {
        half_extents: [f32; 3],
        #[serde(default)]
        corner_radius: f32,
    },
    /// Y-up, elliptical in XZ. `top`/`bottom` taper each cap (0..=1).
    Cylinder {
        half_extents: [f32; 3],
        #[serde(default = "default_taper")]
        top: f32,
        #[serde(default = "default_taper")]
        bottom: f32,
    },
    /// Everything below the plane through the shape center.
    Plane {
        normal: [f32; 3],
    },
}

fn default_taper() -> f32 {
    1.0
}

const UNBOUNDED: f32 = 1.0e30;

impl ShapeKind {
    #[inline]
    pub fn distance_local(&self, p: Vec3) -> f32 {
        match *self {
            ShapeKind::Sphere { radius } => ops::sphere(p, radius),
            ShapeKind::Box {
                half_extents,
                corner_radius,
            } => ops::rounded_box(p, vec3(half_extents), corner_radius),
            ShapeKind::Cylinder {
                half_extents,
                top,
                bottom,
            } => ops::tapered_cylinder(p, vec3(half_extents), top, bottom),
            ShapeKind::Plane { normal } => ops::half_space(p, vec3(normal).safe_normalized()),
        }
    }

    fn local_half_extents(&self) -> Vec3 {
        match *self {
            ShapeKind::Sphere { radius } => Vec3::splat(radius),
            ShapeKind::Box { half_extents, .. } | ShapeKind::Cylinder { half_extents, .. } => {
                vec3(half_extents)
            }
            ShapeKind::Plane { .. } => Vec3::splat(UNBOUNDED),
        }
    }
}

#[inline]
fn vec3(a: [f32; 3]) -> Vec3 {
    Vec3::new(a[0], a[1], a[2])
}

#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
pub struct Shape {
    #[serde(flatten)]
    pub kind: ShapeKind,
    pub center: [f32; 3],
    #[serde(default)]
    pub op: ShapeOp,
    #[serde(default)]
    pub material: MaterialId,
    /// Blend radius for the smooth operators.
    #[serde(default)]
    pub smoothing: f32,
    /// Evaluation priority; lower runs first.
    #[serde(default)]
    pub order: i32,
}

impl Shape {
    pub fn new(kind: ShapeKind, center: Vec3) -> Self {
        Self {
            kind,
            center: [center.x, center.y, center.z],
            op: ShapeOp::Union,
            material: 0,
            smoothing: 0.0,
            order: 0,
        }
    }

    pub fn with_op(mut self, op: ShapeOp, smoothing: f32) -> Self {
        self.op = op;
        self.smoothing = smoothing;
        self
    }

    pub fn with_material(mut self, material: MaterialId) -> Self {
        self.op = ShapeOp::Material;
        self.material = material;
        self
    }

    pub fn with_order(mut self, order: i32) -> Self {
        self.order = order;
        self
    }

    #[inline]
    pub fn center(&self) -> Vec3 {
        vec3(self.center)
    }

    #[inline]
    pub fn distance(&self, p: Vec3) -> f32 {
        self.kind.distance_local(p - self.center())
    }

    /// World bounds, padded by the smoothing radius since smooth operators
    /// reach that far past the primitive.
    pub fn aabb(&self) -> Aabb {
        Aabb::from_center_half(self.center(), self.kind.local_half_extents())
            .grow(self.smoothing.max(0.0))
    }

    /// Folds this shape into the running distance `acc`.
    #[inline]
    pub fn combine(&self, acc: f32, d: f32) -> f32 {
        match self.op {
            ShapeOp::Union => ops::union(acc, d),
            ShapeOp::Subtraction => ops::subtraction(d, acc),
            ShapeOp::SmoothUnion => ops::smooth_union(acc, d, self.smoothing),
            ShapeOp::SmoothSubtraction => ops::smooth_subtraction(d, acc, self.smoothing),
            ShapeOp::Material => acc,
        }
    }
}
