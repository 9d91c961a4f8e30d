use crate::{Aabb, Vec3};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RayTriangleHit {
    pub position: Vec3,
    pub normal: Vec3,
    /// Parameter along `dir`; multiply by `dir.length()` for a distance.
    pub t: f32,
}

/// Ray/triangle test returning the hit parameter along `dir`.
///
/// `front` and `back` choose which windings are hittable: a triangle faces the
/// ray when `(b - a) x (c - a)` points against `dir`. With `limit` set, `dir`
/// is treated as a segment and hits past `t = 1` are rejected.
#[allow(clippy::too_many_arguments)]
pub fn ray_triangle(
    p: Vec3,
    dir: Vec3,
    a: Vec3,
    b: Vec3,
    c: Vec3,
    limit: bool,
    front: bool,
    back: bool,
) -> Option<RayTriangleHit> {
    let ab = b - a;
    let ac = c - a;
    let n = ab.cross(ac);
    let qp = -dir;

    let d = qp.dot(n);
    if !front && d > 0.0 {
        return None;
    }
    if !back && d < 0.0 {
        return None;
    }
    if d * d < 1e-12 {
        return None;
    }
    let ood = 1.0 / d;

    let ap = p - a;
    let t = ap.dot(n) * ood;
    if t < 0.0 || (limit && t > 1.0) {
        return None;
    }

    let e = qp.cross(ap);
    let v = ac.dot(e) * ood;
    if !(0.0..=1.0).contains(&v) {
        return None;
    }
    let w = -ab.dot(e) * ood;
    if w < 0.0 || v + w > 1.0 {
        return None;
    }

    Some(RayTriangleHit {
        position: p + dir * t,
        normal: n.safe_normalized(),
        t,
    })
}

/// Closest point to `p` on triangle `abc` (Voronoi region walk).
pub fn closest_point_on_triangle(p: Vec3, a: Vec3, b: Vec3, c: Vec3) -> Vec3 {
    let ab = b - a;
    let ac = c - a;
    let ap = p - a;
    let d1 = ab.dot(ap);
    let d2 = ac.dot(ap);
    if d1 <= 0.0 && d2 <= 0.0 {
        return a;
    }

    let bp = p - b;
    let d3 = ab.dot(bp);
    let d4 = ac.dot(bp);
    if d3 >= 0.0 && d4 <= d3 {
        return b;
    }

    let vc = d1 * d4 - d3 * d2;
    if vc <= 0.0 && d1 >= 0.0 && d3 <= 0.0 {
        let v = d1 / (d1 - d3);
        return a + ab * v;
    }

    let cp = p - c;
    let d5 = ab.dot(cp);
    let d6 = ac.dot(cp);
    if d6 >= 0.0 && d5 <= d6 {
        return c;
    }

    let vb = d5 * d2 - d1 * d6;
    if vb <= 0.0 && d2 >= 0.0 && d6 <= 0.0 {
        let w = d2 / (d2 - d6);
        return a + ac * w;
    }

    let va = d3 * d6 - d5 * d4;
    if va <= 0.0 && (d4 - d3) >= 0.0 && (d5 - d6) >= 0.0 {
        let w = (d4 - d3) / ((d4 - d3) + (d5 - d6));
        return b + (c - b) * w;
    }

    let denom = 1.0 / (va + vb + vc);
    let v = vb * denom;
    let w = vc * denom;
    a + ab * v + ac * w
}

/// Slab test. Returns the entry parameter along `dir` (0 when `p` starts
/// inside), or `None` when the ray misses the box.
pub fn ray_aabb(p: Vec3, dir: Vec3, aabb: &Aabb) -> Option<f32> {
    let mut tmin = 0.0f32;
    let mut tmax = f32::MAX;
    for axis in 0..3 {
        if dir[axis].abs() < 1e-8 {
            if p[axis] < aabb.min[axis] || p[axis] > aabb.max[axis] {
                return None;
            }
            continue;
        }
        let ood = 1.0 / dir[axis];
        let mut t1 = (aabb.min[axis] - p[axis]) * ood;
        let mut t2 = (aabb.max[axis] - p[axis]) * ood;
        if t1 > t2 {
            core::mem::swap(&mut t1, &mut t2);
        }
        tmin = tmin.max(t1);
        tmax = tmax.min(t2);
        if tmin > tmax {
            return None;
        }
    }
    Some(tmin)
}
