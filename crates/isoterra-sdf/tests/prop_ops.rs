use isoterra_geom::Vec3;
use isoterra_sdf::ops;
use proptest::prelude::*;

fn dist() -> impl Strategy<Value = f32> {
    -100.0f32..100.0
}
fn point() -> impl Strategy<Value = Vec3> {
    (-20.0f32..20.0, -20.0f32..20.0, -20.0f32..20.0).prop_map(|(x, y, z)| Vec3::new(x, y, z))
}

proptest! {
    // Smooth union never exceeds the hard union and stays within k/4 of it
    #[test]
    fn smooth_union_bounded(a in dist(), b in dist(), k in 0.01f32..10.0) {
        let s = ops::smooth_union(a, b, k);
        let h = ops::union(a, b);
        prop_assert!(s <= h + 1e-4);
        prop_assert!(h - s <= k * 0.25 + 1e-4);
    }

    // Smooth subtraction never falls below the hard subtraction
    #[test]
    fn smooth_subtraction_bounded(a in dist(), b in dist(), k in 0.01f32..10.0) {
        let s = ops::smooth_subtraction(a, b, k);
        let h = ops::subtraction(a, b);
        prop_assert!(s >= h - 1e-4);
        prop_assert!(s - h <= k * 0.25 + 1e-4);
    }

    // Primitive distances are 1-Lipschitz between unit-spaced samples
    #[test]
    fn primitives_lipschitz(p in point(), axis in 0usize..3) {
        let mut q = p;
        q[axis] += 1.0;
        let half = Vec3::new(4.0, 2.0, 3.0);
        // Elliptical cylinders stretch space, so only the circular case is exact
        let round = Vec3::new(3.0, 2.0, 3.0);
        let pairs = [
            (ops::sphere(p, 5.0), ops::sphere(q, 5.0)),
            (ops::rounded_box(p, half, 0.5), ops::rounded_box(q, half, 0.5)),
            (ops::tapered_cylinder(p, round, 1.0, 0.5), ops::tapered_cylinder(q, round, 1.0, 0.5)),
        ];
        for (a, b) in pairs {
            prop_assert!((a - b).abs() <= 1.0 + 1e-3);
        }
    }

    // Box sign agrees with containment
    #[test]
    fn box_sign_matches_containment(p in point()) {
        let half = Vec3::new(4.0, 2.0, 3.0);
        let d = ops::rounded_box(p, half, 0.0);
        let inside = p.x.abs() < half.x && p.y.abs() < half.y && p.z.abs() < half.z;
        if inside {
            prop_assert!(d <= 0.0);
        } else {
            prop_assert!(d >= -1e-5);
        }
    }
}
