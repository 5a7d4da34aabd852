//! Wavefront OBJ import into a closed render mesh.

use std::path::Path;

use anyhow::{Context, Result};
use caustic_core::Mesh;
use caustic_math::Vec3;

/// Load every model of an OBJ file into one triangle mesh, scaled about the
/// origin.
pub fn load_obj<P: AsRef<Path>>(path: P, scale: f32) -> Result<Mesh> {
    let path = path.as_ref();
    let (models, _materials) = tobj::load_obj(
        path,
        &tobj::LoadOptions {
            single_index: true,
            triangulate: true,
            ..Default::default()
        },
    )
    .with_context(|| format!("failed to read OBJ file {}", path.display()))?;

    if models.is_empty() {
        anyhow::bail!("No models found in {}", path.display());
    }

    let mut positions = Vec::new();
    let mut indices = Vec::new();
    for model in &models {
        let offset = positions.len() as u32;
        positions.extend(
            model
                .mesh
                .positions
                .chunks_exact(3)
                .map(|p| Vec3::new(p[0], p[1], p[2])),
        );
        indices.extend(model.mesh.indices.iter().map(|i| i + offset));
    }

    let mut mesh = Mesh::new(positions, indices);
    mesh.validate()
        .with_context(|| format!("invalid mesh in {}", path.display()))?;
    if scale != 1.0 {
        mesh.scale(scale);
    }

    log::info!(
        "Loaded {} ({} models, {} triangles)",
        path.display(),
        models.len(),
        mesh.triangle_count()
    );
    Ok(mesh)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TETRAHEDRON: &str = "\
v 0 0 0
v 1 0 0
v 0 1 0
v 0 0 1
f 1 3 2
f 1 2 4
f 1 4 3
f 2 3 4
";

    #[test]
    fn test_load_scaled_tetrahedron() {
        let path = std::env::temp_dir().join(format!("caustic_tetra_{}.obj", std::process::id()));
        std::fs::write(&path, TETRAHEDRON).unwrap();

        let mesh = load_obj(&path, 2.0).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(mesh.triangle_count(), 4);
        assert!(mesh.is_watertight());
        assert!(mesh.positions.contains(&Vec3::new(2.0, 0.0, 0.0)));
        assert_eq!(mesh.bounds.max(), Vec3::splat(2.0));
    }

    #[test]
    fn test_missing_file_is_an_error() {
        assert!(load_obj("/nonexistent/caustic.obj", 1.0).is_err());
    }
}
