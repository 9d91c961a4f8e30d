//! Distance primitives and boolean operators. Negative is inside.

use isoterra_geom::Vec3;

#[inline]
fn clip01(v: f32) -> f32 {
    v.clamp(0.0, 1.0)
}

#[inline]
fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

#[inline]
pub fn union(d1: f32, d2: f32) -> f32 {
    d1.min(d2)
}

/// Carves `d1` out of `d2`.
#[inline]
pub fn subtraction(d1: f32, d2: f32) -> f32 {
    (-d1).max(d2)
}

#[inline]
pub fn intersection(d1: f32, d2: f32) -> f32 {
    d1.max(d2)
}

/// Polynomial smooth minimum with blend radius `k`.
#[inline]
pub fn smooth_union(d1: f32, d2: f32, k: f32) -> f32 {
    if k <= 0.0 {
        return union(d1, d2);
    }
    let h = clip01(0.5 + 0.5 * (d2 - d1) / k);
    lerp(d2, d1, h) - k * h * (1.0 - h)
}

#[inline]
pub fn smooth_subtraction(d1: f32, d2: f32, k: f32) -> f32 {
    if k <= 0.0 {
        return subtraction(d1, d2);
    }
    let h = clip01(0.5 - 0.5 * (d2 + d1) / k);
    lerp(d2, -d1, h) + k * h * (1.0 - h)
}

#[inline]
pub fn sphere(p: Vec3, radius: f32) -> f32 {
    p.length() - radius
}

/// Rounded box centered at the origin. `corner_radius` is clamped to the
/// smallest half extent.
#[inline]
pub fn rounded_box(p: Vec3, half: Vec3, corner_radius: f32) -> f32 {
    let r = corner_radius.clamp(0.0, half.x.min(half.y).min(half.z));
    let q = p.abs() - (half - Vec3::splat(r));
    q.max(Vec3::ZERO).length() + q.max_component().min(0.0) - r
}

/// Capped cone along +Y, elliptical in XZ. `top` and `bottom` scale the
/// radius at each cap and are clamped to [0, 1].
pub fn tapered_cylinder(p: Vec3, half: Vec3, top: f32, bottom: f32) -> f32 {
    let (mut px, mut pz) = (p.x, p.z);
    let scale = if half.x > half.z {
        pz *= half.x / half.z;
        half.x
    } else {
        px *= half.z / half.x;
        half.z
    };
    let r1 = clip01(bottom) * scale;
    let r2 = clip01(top) * scale;
    let h = half.y;

    let qx = (px * px + pz * pz).sqrt();
    let qy = p.y;
    let (k1x, k1y) = (r2, h);
    let (k2x, k2y) = (r2 - r1, 2.0 * h);
    let cap_r = if qy < 0.0 { r1 } else { r2 };
    let (cax, cay) = (qx - qx.min(cap_r), qy.abs() - h);
    let k2_len_sq = k2x * k2x + k2y * k2y;
    let t = clip01(((k1x - qx) * k2x + (k1y - qy) * k2y) / k2_len_sq);
    let (cbx, cby) = (qx - k1x + k2x * t, qy - k1y + k2y * t);
    let s = if cbx < 0.0 && cay < 0.0 { -1.0 } else { 1.0 };
    s * (cax * cax + cay * cay).min(cbx * cbx + cby * cby).sqrt()
}

/// Half-space below the plane through the origin with unit `normal`.
#[inline]
pub fn half_space(p: Vec3, normal: Vec3) -> f32 {
    p.dot(normal)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn smooth_ops_match_hard_ops_far_apart() {
        assert!((smooth_union(-3.0, 5.0, 1.0) - -3.0).abs() < 1e-6);
        assert!((smooth_subtraction(5.0, -3.0, 1.0) - -3.0).abs() < 1e-6);
    }

    #[test]
    fn smooth_union_bulges_inward_at_seam() {
        assert!(smooth_union(0.0, 0.0, 1.0) < 0.0);
    }

    #[test]
    fn cylinder_axis_and_caps() {
        let half = Vec3::new(2.0, 3.0, 2.0);
        assert!((tapered_cylinder(Vec3::ZERO, half, 1.0, 1.0) - -2.0).abs() < 1e-5);
        assert!((tapered_cylinder(Vec3::new(0.0, 4.0, 0.0), half, 1.0, 1.0) - 1.0).abs() < 1e-5);
        assert!((tapered_cylinder(Vec3::new(3.0, 0.0, 0.0), half, 1.0, 1.0) - 1.0).abs() < 1e-5);
    }

    #[test]
    fn rounded_box_corner() {
        let half = Vec3::splat(1.0);
        assert!((rounded_box(Vec3::new(2.0, 0.0, 0.0), half, 0.0) - 1.0).abs() < 1e-6);
        let corner = rounded_box(Vec3::splat(1.0), half, 0.5);
        let expected = (Vec3::splat(0.5)).length() - 0.5;
        assert!((corner - expected).abs() < 1e-5);
    }
}
