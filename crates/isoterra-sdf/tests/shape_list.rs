use isoterra_geom::{Aabb, Vec3};
use isoterra_sdf::{SdfField, SdfSnapshot, Shape, ShapeKind, ShapeList, ShapeOp};

fn sphere(center: Vec3, radius: f32) -> Shape {
    Shape::new(ShapeKind::Sphere { radius }, center)
}

#[test]
fn edits_are_invisible_until_committed() {
    let mut list = ShapeList::new();
    let id = list.add(sphere(Vec3::ZERO, 4.0));
    assert!(list.has_pending());
    assert!(list.is_empty());
    assert!(list.snapshot().distance(Vec3::ZERO) > 1000.0);

    let touched = list.commit_pending();
    assert_eq!(touched.len(), 1);
    assert!(!list.has_pending());
    let snap = list.snapshot();
    assert!((snap.distance(Vec3::ZERO) + 4.0).abs() < 1e-5);

    list.update(id, sphere(Vec3::new(10.0, 0.0, 0.0), 2.0));
    // An outstanding snapshot keeps the old shapes
    let touched = list.commit_pending();
    assert_eq!(touched.len(), 2);
    assert!((snap.distance(Vec3::ZERO) + 4.0).abs() < 1e-5);
    assert!((list.snapshot().distance(Vec3::new(10.0, 0.0, 0.0)) + 2.0).abs() < 1e-5);

    list.remove(id);
    list.commit_pending();
    assert!(list.is_empty());
    assert!(list.get(id).is_none());
}

#[test]
fn subtraction_carves_union() {
    let snap = SdfSnapshot::new(vec![
        Shape::new(
            ShapeKind::Box {
                half_extents: [8.0, 8.0, 8.0],
                corner_radius: 0.0,
            },
            Vec3::ZERO,
        ),
        sphere(Vec3::ZERO, 3.0)
            .with_op(ShapeOp::Subtraction, 0.0)
            .with_order(1),
    ]);
    assert!(snap.distance(Vec3::ZERO) > 0.0);
    assert!(snap.distance(Vec3::new(5.0, 0.0, 0.0)) < 0.0);
    assert!(snap.distance(Vec3::new(9.0, 0.0, 0.0)) > 0.0);
}

#[test]
fn order_field_controls_evaluation() {
    // The subtraction sorts first here, so it carves nothing.
    let snap = SdfSnapshot::new(vec![
        Shape::new(
            ShapeKind::Box {
                half_extents: [8.0, 8.0, 8.0],
                corner_radius: 0.0,
            },
            Vec3::ZERO,
        )
        .with_order(5),
        sphere(Vec3::ZERO, 3.0)
            .with_op(ShapeOp::Subtraction, 0.0)
            .with_order(-1),
    ]);
    assert!(snap.distance(Vec3::ZERO) < 0.0);
}

#[test]
fn material_shapes_paint_without_changing_distance() {
    let base = sphere(Vec3::ZERO, 6.0);
    let plain = SdfSnapshot::new(vec![base]);
    let painted = SdfSnapshot::new(vec![
        base,
        sphere(Vec3::new(6.0, 0.0, 0.0), 2.0).with_material(2).with_order(1),
        sphere(Vec3::new(6.0, 0.0, 0.0), 1.0).with_material(3).with_order(2),
    ]);
    for p in [Vec3::ZERO, Vec3::new(6.0, 0.0, 0.0), Vec3::new(0.0, 7.0, 0.0)] {
        assert_eq!(plain.distance(p), painted.distance(p));
    }
    assert_eq!(painted.material(Vec3::ZERO), 0);
    assert_eq!(painted.material(Vec3::new(4.5, 0.0, 0.0)), 2);
    assert_eq!(painted.material(Vec3::new(6.0, 0.0, 0.0)), 3);
}

#[test]
fn bounds_skip_far_regions() {
    let snap = SdfSnapshot::new(vec![sphere(Vec3::ZERO, 4.0)]);
    let near = Aabb::new(Vec3::splat(2.0), Vec3::splat(10.0));
    let far = Aabb::new(Vec3::splat(50.0), Vec3::splat(60.0));
    assert!(snap.may_intersect(&near));
    assert!(!snap.may_intersect(&far));
}

#[test]
fn shapes_load_from_toml() {
    #[derive(serde::Deserialize)]
    struct Scene {
        shapes: Vec<Shape>,
    }
    let scene: Scene = toml::from_str(
        r#"
        [[shapes]]
        kind = "box"
        half_extents = [10.0, 2.0, 10.0]
        center = [0.0, 0.0, 0.0]

        [[shapes]]
        kind = "sphere"
        radius = 3.0
        center = [0.0, 2.0, 0.0]
        op = "smooth_union"
        smoothing = 1.5
        order = 1
        "#,
    )
    .unwrap();
    assert_eq!(scene.shapes.len(), 2);
    assert_eq!(scene.shapes[1].op, ShapeOp::SmoothUnion);
    assert!(matches!(scene.shapes[0].kind, ShapeKind::Box { .. }));
}
