use isoterra_geom::{Aabb, Sphere, Vec3};
use proptest::prelude::*;

fn coord() -> impl Strategy<Value = f32> {
    -1_000.0f32..1_000.0
}
fn arb_vec3() -> impl Strategy<Value = Vec3> {
    (coord(), coord(), coord()).prop_map(|(x, y, z)| Vec3::new(x, y, z))
}
fn arb_box() -> impl Strategy<Value = Aabb> {
    (arb_vec3(), arb_vec3()).prop_map(|(a, b)| Aabb::new(a.min(b), a.max(b)))
}

proptest! {
    // Expanding an empty box by points yields a box containing every point
    #[test]
    fn expand_contains_points(points in prop::collection::vec(arb_vec3(), 1..16)) {
        let mut bx = Aabb::empty();
        prop_assert!(bx.is_empty());
        for p in &points {
            bx.expand_point(*p);
        }
        prop_assert!(!bx.is_empty());
        for p in &points {
            prop_assert!(bx.contains(*p));
        }
    }

    // Merging boxes is order independent
    #[test]
    fn expand_aabb_commutes(a in arb_box(), b in arb_box()) {
        let mut ab = a;
        ab.expand_aabb(&b);
        let mut ba = b;
        ba.expand_aabb(&a);
        prop_assert_eq!(ab, ba);
        prop_assert!(ab.intersects(&a) && ab.intersects(&b));
    }

    // Growing keeps the center and adds to the half size
    #[test]
    fn grow_keeps_center(a in arb_box(), amount in 0.0f32..50.0) {
        let g = a.grow(amount);
        let dc = (g.center() - a.center()).length();
        prop_assert!(dc <= 1e-3);
        let dh = g.half_size() - a.half_size();
        prop_assert!((dh.x - amount).abs() <= 1e-3);
        prop_assert!((dh.y - amount).abs() <= 1e-3);
        prop_assert!((dh.z - amount).abs() <= 1e-3);
    }

    // Intersection is symmetric
    #[test]
    fn intersects_symmetric(a in arb_box(), b in arb_box()) {
        prop_assert_eq!(a.intersects(&b), b.intersects(&a));
    }

    // A sphere centered inside a box always overlaps it
    #[test]
    fn sphere_inside_overlaps(a in arb_box(), r in 0.0f32..10.0) {
        let s = Sphere::new(a.center(), r);
        prop_assert!(a.intersects_sphere(&s));
        prop_assert!(s.aabb().contains(a.center()));
    }
}
