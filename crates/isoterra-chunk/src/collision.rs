use isoterra_geom::{Aabb, Sphere, Vec3, closest_point_on_triangle, ray_aabb, ray_triangle};
use isoterra_mesh_cpu::TerrainMeshBuild;

/// Closest hit of a ray against terrain triangles.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RayHit {
    pub position: Vec3,
    pub normal: Vec3,
    /// Distance from the ray source along the ray direction.
    pub distance: f32,
}

#[derive(Clone, Copy, Debug)]
pub struct RaycastParams {
    pub source: Vec3,
    pub direction: Vec3,
    /// Hits farther than this are ignored; zero means unbounded.
    pub max_length: f32,
    /// Hit triangles whose front faces the ray.
    pub hit_front: bool,
    pub hit_back: bool,
}

impl RaycastParams {
    /// Front-facing hits only, along `ray` and no farther than its length.
    pub fn segment(source: Vec3, ray: Vec3) -> Self {
        Self {
            source,
            direction: ray,
            max_length: ray.length(),
            hit_front: true,
            hit_back: false,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PushOutHit {
    pub position: Vec3,
    pub normal: Vec3,
}

/// Running state of a sphere being pushed out of one or more meshes.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PushOut {
    pub sphere: Sphere,
    pub velocity: Vec3,
    pub hits: Vec<PushOutHit>,
}

impl PushOut {
    pub fn new(sphere: Sphere, velocity: Vec3) -> Self {
        Self {
            sphere,
            velocity,
            hits: Vec::new(),
        }
    }

    /// Total displacement applied so far relative to `start`.
    pub fn offset_from(&self, start: Vec3) -> Vec3 {
        self.sphere.center - start
    }
}

/// Removes the part of `v` heading along `dir` (unit length).
#[inline]
fn zero_direction(v: Vec3, dir: Vec3) -> Vec3 {
    let d = v.dot(dir);
    if d > 0.0 { v - dir * d } else { v }
}

/// World-space triangle soup of one chunk for ray and sphere queries.
#[derive(Clone, Debug)]
pub struct CollisionMesh {
    triangles: Vec<[Vec3; 3]>,
    aabb: Aabb,
}

impl Default for CollisionMesh {
    fn default() -> Self {
        Self {
            triangles: Vec::new(),
            aabb: Aabb::empty(),
        }
    }
}

impl CollisionMesh {
    pub fn from_build(build: &TerrainMeshBuild) -> Self {
        let mut m = Self::default();
        m.rebuild(build);
        m
    }

    /// Replaces the triangles, keeping the allocation.
    pub fn rebuild(&mut self, build: &TerrainMeshBuild) {
        self.clear();
        self.triangles.reserve(build.triangle_count());
        for t in 0..build.triangle_count() {
            let tri = build.triangle(t);
            for p in tri {
                self.aabb.expand_point(p);
            }
            self.triangles.push(tri);
        }
    }

    pub fn clear(&mut self) {
        self.triangles.clear();
        self.aabb = Aabb::empty();
    }

    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }

    pub fn len(&self) -> usize {
        self.triangles.len()
    }

    pub fn aabb(&self) -> Aabb {
        self.aabb
    }

    pub fn raycast(&self, params: &RaycastParams) -> Option<RayHit> {
        if self.is_empty() || params.max_length < 0.0 {
            return None;
        }
        let limit = params.max_length > 0.0;
        let ray = if limit {
            params.direction.safe_normalized() * params.max_length
        } else {
            params.direction
        };
        let dir = ray.safe_normalized();
        if dir == Vec3::ZERO {
            return None;
        }
        let entry = ray_aabb(params.source, ray, &self.aabb)?;
        if limit && entry > 1.0 {
            return None;
        }

        let mut best: Option<RayHit> = None;
        for [a, b, c] in &self.triangles {
            let Some(hit) = ray_triangle(
                params.source,
                ray,
                *a,
                *b,
                *c,
                limit,
                params.hit_front,
                params.hit_back,
            ) else {
                continue;
            };
            let distance = dir.dot(hit.position - params.source);
            if best.is_none_or(|b| distance < b.distance) {
                best = Some(RayHit {
                    position: hit.position,
                    normal: hit.normal,
                    distance,
                });
            }
        }
        best
    }

    /// Pushes `info.sphere` out of every front-facing triangle it overlaps.
    /// Returns `info` unchanged when nothing is touched; otherwise the moved
    /// sphere, the velocity with into-surface motion removed, and the new
    /// hits ahead of the earlier ones.
    pub fn push_out(&self, info: &PushOut) -> PushOut {
        if self.is_empty() || !self.aabb.intersects_sphere(&info.sphere) {
            return info.clone();
        }
        let mut sphere = info.sphere;
        let mut velocity = info.velocity;
        let mut hits = Vec::new();

        for [a, b, c] in &self.triangles {
            let (a, b, c) = (*a, *b, *c);
            let normal = (b - a).cross(c - a).safe_normalized();
            let center = (a + b + c) / 3.0;
            if normal.dot(sphere.center - center) < 0.0 {
                continue;
            }
            let closest = closest_point_on_triangle(sphere.center, a, b, c);
            let to_center = sphere.center - closest;
            if to_center.length_sq() > sphere.radius * sphere.radius {
                continue;
            }
            if normal.dot(to_center) < 0.0 {
                continue;
            }
            let surface_point =
                sphere.center + (closest - sphere.center).safe_normalized() * sphere.radius;
            sphere.center += closest - surface_point;
            velocity = zero_direction(velocity, -normal);
            hits.push(PushOutHit {
                position: closest,
                normal,
            });
        }

        if hits.is_empty() {
            return info.clone();
        }
        hits.extend_from_slice(&info.hits);
        PushOut {
            sphere,
            velocity,
            hits,
        }
    }
}
