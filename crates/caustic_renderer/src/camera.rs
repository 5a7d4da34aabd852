//! Pinhole camera and primary ray generation.
//!
//! The camera sits at the origin of its scene node looking along +z with +y
//! up, so image right runs along -x. The field of view spans the larger
//! image dimension. Row 0 is the top of the image.

use caustic_core::{NodeId, SceneGraph, SceneResult};
use caustic_math::{Ray, Transform, Vec2, Vec3};
use rand::Rng;

use crate::config::CameraConfig;

/// A pinhole camera attached to a scene node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PinholeCamera {
    node: NodeId,
}

impl PinholeCamera {
    pub fn new(node: NodeId) -> Self {
        Self { node }
    }

    pub fn node(&self) -> NodeId {
        self.node
    }

    /// Resolve the camera's world placement for one render.
    pub fn projection(&self, graph: &SceneGraph, config: &CameraConfig) -> SceneResult<Projection> {
        let to_world = graph.world_transform(self.node)?;
        let (width, height) = config.pixel_resolution;
        let half_extent = (0.5 * config.field_of_view).to_radians().tan();
        Ok(Projection {
            to_world,
            width: width as f32,
            height: height as f32,
            scale: half_extent / width.max(height) as f32,
        })
    }
}

/// A camera frozen at its world placement.
#[derive(Debug, Clone, Copy)]
pub struct Projection {
    to_world: Transform,
    width: f32,
    height: f32,
    /// Image plane units per half pixel at unit distance
    scale: f32,
}

impl Projection {
    /// Pinhole position in world space.
    pub fn origin(&self) -> Vec3 {
        self.to_world.transform_point(Vec3::ZERO)
    }

    /// Ray through pixel (`x`, `y`) at `offset` in `[0, 1)²` within the pixel.
    pub fn primary_ray(&self, x: u32, y: u32, offset: Vec2) -> Ray {
        let image_x = (2.0 * (x as f32 + offset.x) - self.width) * self.scale;
        let image_y = (self.height - 2.0 * (y as f32 + offset.y)) * self.scale;
        let local = Vec3::new(-image_x, image_y, 1.0);
        Ray::new(
            self.origin(),
            self.to_world.transform_vector(local).normalize(),
        )
    }
}

/// Position inside the pixel for sample `index` of `count`.
///
/// Stratified sampling spreads samples over a `n x n` grid of cells
/// (`n = ceil(sqrt(count))`) and jitters within the cell; otherwise every
/// sample goes through the pixel centre.
pub fn sub_pixel_offset<R: Rng + ?Sized>(index: u32, count: u32, stratified: bool, rng: &mut R) -> Vec2 {
    if !stratified {
        return Vec2::splat(0.5);
    }
    let n = (count as f32).sqrt().ceil().max(1.0) as u32;
    let cell = index % (n * n);
    let (cx, cy) = (cell % n, cell / n);
    Vec2::new(
        (cx as f32 + rng.gen::<f32>()) / n as f32,
        (cy as f32 + rng.gen::<f32>()) / n as f32,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use caustic_math::{rotate, translate};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn setup(transform: Transform, width: u32, height: u32, fov: f32) -> Projection {
        let mut graph = SceneGraph::new();
        let node = graph.create_node(SceneGraph::ROOT, transform).unwrap();
        let config = CameraConfig::default()
            .with_resolution(width, height)
            .with_field_of_view(fov);
        PinholeCamera::new(node).projection(&graph, &config).unwrap()
    }

    #[test]
    fn test_centre_ray_looks_along_z() {
        let projection = setup(translate(1.0, 2.0, 3.0), 3, 3, 45.0);
        let ray = projection.primary_ray(1, 1, Vec2::splat(0.5));
        assert!((ray.origin - Vec3::new(1.0, 2.0, 3.0)).length() < 1e-6);
        assert!((ray.direction - Vec3::Z).length() < 1e-6);
    }

    #[test]
    fn test_field_of_view_spans_wider_dimension() {
        let projection = setup(Transform::IDENTITY, 4, 2, 90.0);

        // left edge of a 90 degree view is 45 degrees off axis, on +x
        let left = projection.primary_ray(0, 1, Vec2::new(0.0, 0.0));
        assert!((left.direction.x - 45f32.to_radians().sin()).abs() < 1e-5);
        assert!(left.direction.y.abs() < 1e-6);

        // top row points up
        let top = projection.primary_ray(2, 0, Vec2::new(0.0, 0.0));
        assert!(top.direction.y > 0.0);
        let bottom = projection.primary_ray(2, 1, Vec2::new(0.0, 1.0));
        assert!((top.direction.y + bottom.direction.y).abs() < 1e-6);
    }

    #[test]
    fn test_camera_follows_node_rotation() {
        let projection = setup(rotate(90.0, 0.0, 0.0), 5, 5, 40.0);
        let ray = projection.primary_ray(2, 2, Vec2::splat(0.5));
        assert!((ray.direction - Vec3::NEG_X).length() < 1e-5);

        let tilted = setup(rotate(0.0, -12.0, 0.0), 5, 5, 40.0);
        assert!(tilted.primary_ray(2, 2, Vec2::splat(0.5)).direction.y < 0.0);
    }

    #[test]
    fn test_stratified_offsets_cover_cells() {
        let mut rng = StdRng::seed_from_u64(5);
        let offsets: Vec<Vec2> = (0..4).map(|i| sub_pixel_offset(i, 4, true, &mut rng)).collect();
        for (i, o) in offsets.iter().enumerate() {
            let cell = ((o.x * 2.0) as usize, (o.y * 2.0) as usize);
            assert_eq!(cell, (i % 2, i / 2));
        }
        assert_eq!(sub_pixel_offset(3, 4, false, &mut rng), Vec2::splat(0.5));
    }
}
