//! Spectral path tracer for CSG scenes.
//!
//! Features:
//! - Solids built from boxes and closed meshes, combined with union,
//!   intersection and subtraction
//! - Dispersive dielectrics with exact Fresnel splitting, black absorbers and
//!   uniform volume emitters
//! - Per-wavelength-bin path integration with Russian roulette
//! - Bucketed parallel rendering with progressive accumulation,
//!   cancellation and progress snapshots
//!
//! # Example
//!
//! ```
//! use caustic_renderer::{
//!     render, CameraConfig, CancelToken, Material, NullObserver, PinholeCamera, Scene, Solid,
//!     UniformVolumeEmitter,
//! };
//! use caustic_math::{Transform, Vec3};
//!
//! let mut scene = Scene::new();
//! let root = scene.root();
//! let light = UniformVolumeEmitter::new(1.0_f32, 1.0);
//! scene
//!     .create_primitive("light", Solid::cuboid(Vec3::splat(-1.0), Vec3::splat(1.0)), Material::from(light), root, Transform::IDENTITY)
//!     .unwrap();
//! let camera = PinholeCamera::new(scene.create_node(root, Transform::IDENTITY).unwrap());
//!
//! let config = CameraConfig::default()
//!     .with_resolution(4, 4)
//!     .with_sampling(1, 1, 3)
//!     .with_progress(false, 0.0);
//! let outcome = render(&scene, &camera, &config, &NullObserver, &CancelToken::new()).unwrap();
//! assert!(outcome.completed());
//! ```

mod bucket;
mod bvh;
mod camera;
mod config;
mod error;
mod frame;
mod material;
mod render;
mod scene;
mod solid;
mod span;
mod spectrum;
mod tracer;

pub use bucket::{generate_buckets, Bucket};
pub use camera::{sub_pixel_offset, PinholeCamera, Projection};
pub use config::CameraConfig;
pub use error::{ConfigError, GeometryError, RenderError, RenderResult};
pub use frame::FrameBuffer;
pub use material::{
    fresnel_reflectance, reflect, refract, Branch, Dielectric, Material, SurfaceResponse,
    UniformVolumeEmitter,
};
pub use render::{
    render, render_into, CancelToken, NullObserver, Progress, RenderObserver, RenderOutcome,
    RenderStats,
};
pub use scene::{Hit, Primitive, PrimitiveId, Scene, World};
pub use solid::{Csg, Cuboid, MeshSolid, Shape, Solid};
pub use span::{combine, Crossing, CsgOp, Span};
pub use spectrum::{SpectralBins, Spectrum};
pub use tracer::{importance_roulette, russian_roulette, PathStats, PathTracer};

// Re-export the core types callers need to build scenes
pub use caustic_core::{NodeId, SceneError};
