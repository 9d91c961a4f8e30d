use std::error::Error;
use std::fs;
use std::path::Path;

use clap::ValueEnum;
use isoterra_geom::Vec3;
use isoterra_sdf::{Shape, ShapeKind, ShapeList, ShapeOp};
use serde::Deserialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum SceneKind {
    /// One large sphere.
    Sphere,
    /// Rounded box with a carved hole and a painted cap.
    Box,
    /// Rolling ground made of blended primitives over a half-space.
    Terrain,
}

/// `[[shape]]` tables as accepted by `--shapes`.
#[derive(Debug, Deserialize)]
struct ShapesFile {
    #[serde(default)]
    shape: Vec<Shape>,
}

pub fn load_shapes(path: &Path) -> Result<ShapeList, Box<dyn Error>> {
    let text = fs::read_to_string(path)?;
    let file: ShapesFile = toml::from_str(&text)?;
    log::info!("loaded {} shapes from {}", file.shape.len(), path.display());
    let mut shapes = ShapeList::new();
    for s in file.shape {
        shapes.add(s);
    }
    Ok(shapes)
}

pub fn build(kind: SceneKind) -> ShapeList {
    let mut shapes = ShapeList::new();
    match kind {
        SceneKind::Sphere => {
            shapes.add(Shape::new(
                ShapeKind::Sphere { radius: 40.0 },
                Vec3::new(0.0, 0.0, 0.0),
            ));
        }
        SceneKind::Box => {
            shapes.add(Shape::new(
                ShapeKind::Box {
                    half_extents: [30.0, 18.0, 30.0],
                    corner_radius: 4.0,
                },
                Vec3::ZERO,
            ));
            shapes.add(
                Shape::new(
                    ShapeKind::Cylinder {
                        half_extents: [10.0, 40.0, 10.0],
                        top: 1.0,
                        bottom: 1.0,
                    },
                    Vec3::ZERO,
                )
                .with_op(ShapeOp::SmoothSubtraction, 3.0)
                .with_order(1),
            );
            shapes.add(
                Shape::new(ShapeKind::Sphere { radius: 40.0 }, Vec3::new(0.0, 50.0, 0.0))
                    .with_material(1)
                    .with_order(2),
            );
        }
        SceneKind::Terrain => {
            shapes.add(Shape::new(
                ShapeKind::Plane {
                    normal: [0.0, 1.0, 0.0],
                },
                Vec3::ZERO,
            ));
            for i in 0..12 {
                let x = i as f32 * 37.0 - 200.0;
                let z = ((i * 7) % 5) as f32 * 29.0 - 60.0;
                let r = 10.0 + (i % 4) as f32 * 6.0;
                shapes.add(
                    Shape::new(ShapeKind::Sphere { radius: r }, Vec3::new(x, -r * 0.3, z))
                        .with_op(ShapeOp::SmoothUnion, 8.0)
                        .with_order(1),
                );
            }
            shapes.add(
                Shape::new(
                    ShapeKind::Cylinder {
                        half_extents: [14.0, 30.0, 9.0],
                        top: 0.3,
                        bottom: 1.0,
                    },
                    Vec3::new(60.0, 20.0, 20.0),
                )
                .with_op(ShapeOp::SmoothUnion, 6.0)
                .with_order(2),
            );
            shapes.add(
                Shape::new(ShapeKind::Sphere { radius: 12.0 }, Vec3::new(-40.0, 0.0, 0.0))
                    .with_op(ShapeOp::Subtraction, 0.0)
                    .with_order(3),
            );
            shapes.add(
                Shape::new(ShapeKind::Sphere { radius: 30.0 }, Vec3::new(60.0, 50.0, 20.0))
                    .with_material(2)
                    .with_order(4),
            );
        }
    }
    shapes
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_scene_has_shapes() {
        for kind in [SceneKind::Sphere, SceneKind::Box, SceneKind::Terrain] {
            let mut shapes = build(kind);
            assert!(shapes.has_pending());
            assert!(!shapes.commit_pending().is_empty());
        }
    }
}
