//! The illuminated glass pedestal scene.

use std::sync::Arc;

use anyhow::{Context, Result};
use caustic_core::{d65_white, schott, Mesh};
use caustic_math::{rotate, translate, Transform, Vec3};
use caustic_renderer::{
    CsgOp, Dielectric, Material, PinholeCamera, Scene, Solid, UniformVolumeEmitter,
};

/// Gap between nested shells so their surfaces never coincide.
const PADDING: f32 = 1e-5;
const ENCLOSURE_THICKNESS: f32 = 0.001 + PADDING;
const GLASS_THICKNESS: f32 = 0.003;
const EMISSION_SCALE: f32 = 50.0;

fn cuboid(lower: [f32; 3], upper: [f32; 3]) -> Solid {
    Solid::cuboid(Vec3::from(lower), Vec3::from(upper))
}

/// Build the light box with a diamond object on top, and the camera.
///
/// `gem` replaces the default diamond cube when given.
pub fn pedestal_scene(gem: Option<Mesh>) -> Result<(Scene, PinholeCamera)> {
    let mut scene = Scene::new();
    let root = scene.root();
    let diamond = Arc::new(Material::from(Dielectric::new(
        schott("DIAMOND").context("diamond missing from the glass library")?,
    )));

    match gem {
        Some(mesh) => {
            scene.create_primitive(
                "gem",
                Solid::mesh(Arc::new(mesh))?,
                diamond,
                root,
                translate(0.0, 0.0, 0.0) * rotate(165.0, 0.0, 0.0),
            )?;
        }
        None => {
            let half = 0.025;
            scene.create_primitive(
                "gem",
                cuboid([-half, 0.0, -half], [half, 2.0 * half, half]),
                diamond,
                root,
                translate(0.0, PADDING, 0.0) * rotate(30.0, 0.0, 0.0),
            )?;
        }
    }

    let light_box = scene.create_node(root, Transform::IDENTITY)?;
    let absorber = Arc::new(Material::AbsorbingSurface);

    // Open-topped black tray around the pedestal
    let t = ENCLOSURE_THICKNESS;
    let outer = scene.create_primitive(
        "enclosure outer",
        cuboid([-0.10 - t, -0.02 - t, -0.10 - t], [0.10 + t, 0.0, 0.10 + t]),
        absorber.clone(),
        light_box,
        Transform::IDENTITY,
    )?;
    let p = PADDING;
    let inner = scene.create_primitive(
        "enclosure inner",
        cuboid([-0.10 - p, -0.02 - p, -0.10 - p], [0.10 + p, 0.001, 0.10 + p]),
        absorber.clone(),
        light_box,
        Transform::IDENTITY,
    )?;
    scene.combine("enclosure", CsgOp::Subtract, outer, inner, absorber, light_box, Transform::IDENTITY)?;

    // Hollow N-BK7 shell
    let g = GLASS_THICKNESS;
    let bk7 = Arc::new(Material::from(Dielectric::new(
        schott("N-BK7").context("N-BK7 missing from the glass library")?,
    )));
    let glass_outer = scene.create_primitive(
        "glass outer",
        cuboid([-0.10, -0.02, -0.10], [0.10, 0.0, 0.10]),
        bk7.clone(),
        light_box,
        Transform::IDENTITY,
    )?;
    let glass_inner = scene.create_primitive(
        "glass inner",
        cuboid([-0.10 + g, -0.02 + g, -0.10 + g], [0.10 - g, -g, 0.10 - g]),
        bk7.clone(),
        light_box,
        Transform::IDENTITY,
    )?;
    scene.combine("glass", CsgOp::Subtract, glass_outer, glass_inner, bk7, light_box, Transform::IDENTITY)?;

    // Daylight filling the shell
    let e = g + PADDING;
    scene.create_primitive(
        "emitter",
        cuboid([-0.10 + e, -0.02 + e, -0.10 + e], [0.10 - e, -e, 0.10 - e]),
        Material::from(UniformVolumeEmitter::new(d65_white(), EMISSION_SCALE)),
        light_box,
        Transform::IDENTITY,
    )?;

    let camera_node = scene.create_node(root, translate(0.0, 0.16, -0.4) * rotate(0.0, -12.0, 0.0))?;
    log::info!("Built pedestal scene with {} primitives", scene.primitives().count());
    Ok((scene, PinholeCamera::new(camera_node)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use caustic_math::Ray;

    #[test]
    fn test_camera_sees_the_pedestal() {
        let (scene, camera) = pedestal_scene(None).unwrap();
        assert_eq!(scene.primitives().count(), 4);

        let config = caustic_renderer::CameraConfig::default().with_resolution(9, 9).with_field_of_view(40.0);
        let projection = camera.projection(scene.graph(), &config).unwrap();
        let world = scene.prepare(config.degeneracy_epsilon).unwrap();

        // lower part of the frame looks down onto the light box
        let ray = projection.primary_ray(4, 7, caustic_math::Vec2::splat(0.5));
        assert!(world.nearest_hit(&ray).is_some());

        // looking straight up from the camera escapes
        let up = Ray::new(projection.origin(), Vec3::Y);
        assert!(world.nearest_hit(&up).is_none());
    }
}
