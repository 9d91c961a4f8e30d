use isoterra_geom::{IVec3, Vec3};
use proptest::prelude::*;

fn approx(a: f32, b: f32, eps: f32) -> bool {
    (a - b).abs() <= eps
}
fn vapprox(a: Vec3, b: Vec3, eps: f32) -> bool {
    approx(a.x, b.x, eps) && approx(a.y, b.y, eps) && approx(a.z, b.z, eps)
}

fn arb_vec3() -> impl Strategy<Value = Vec3> {
    (-1e4f32..1e4, -1e4f32..1e4, -1e4f32..1e4).prop_map(|(x, y, z)| Vec3::new(x, y, z))
}

proptest! {
    // safe_normalized is unit length or exactly zero
    #[test]
    fn safe_normalized_unit_or_zero(v in arb_vec3()) {
        let n = v.safe_normalized();
        if n == Vec3::ZERO {
            prop_assert!(v.length() <= f32::EPSILON);
        } else {
            prop_assert!(approx(n.length(), 1.0, 1e-4));
        }
    }

    // Lerp hits both endpoints
    #[test]
    fn lerp_endpoints(a in arb_vec3(), b in arb_vec3()) {
        prop_assert!(vapprox(a.lerp(b, 0.0), a, 1e-3));
        prop_assert!(vapprox(a.lerp(b, 1.0), b, 1e-2));
    }

    // floor <= v <= ceil on every axis, and they differ by at most one
    #[test]
    fn floor_ceil_bracket(v in arb_vec3()) {
        let f = v.floor();
        let c = v.ceil();
        for (fi, ci, vi) in [(f.x, c.x, v.x), (f.y, c.y, v.y), (f.z, c.z, v.z)] {
            prop_assert!(fi as f32 <= vi && vi <= ci as f32);
            prop_assert!(ci - fi <= 1);
        }
    }

    // Axis indexing agrees with field access
    #[test]
    fn index_matches_fields(v in arb_vec3()) {
        prop_assert_eq!(v[0], v.x);
        prop_assert_eq!(v[1], v.y);
        prop_assert_eq!(v[2], v.z);
    }

    // Neighbouring voxel keys never share a spread hash
    #[test]
    fn spread_hash_separates_neighbours(x in -4096i32..4096, y in -4096i32..4096, z in -4096i32..4096) {
        let base = IVec3::new(x, y, z);
        let h = base.spread_hash();
        for d in [IVec3::new(1, 0, 0), IVec3::new(0, 1, 0), IVec3::new(0, 0, 1)] {
            prop_assert_ne!(h, (base + d).spread_hash());
        }
    }
}
